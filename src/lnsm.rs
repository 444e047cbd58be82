/// Low bits masks used throughout: `address` stays within 24 bits for every
/// update path except `set_address`, which is widened to 28 bits to
/// reproduce its golden value bit-for-bit (DESIGN.md Open Question 1).
const ADDRESS_MASK_24: u32 = 0x00FF_FFFF;
const ADDRESS_MASK_28: u32 = 0x0FFF_FFFF;
const LINE_FILE_DISCRIM_MASK: u32 = 0x0000_FFFF;
const COLUMN_MASK: u32 = 0x0000_03FF;

/// The ten registers of the DWARF Line Number State Machine (§3).
///
/// A plain owned struct: the only external view into it is the read-only
/// register bitfields in [`crate::register`], which the driver republishes
/// after every decoder step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineNumberState {
    pub address: u32,
    pub file: u16,
    pub line: u16,
    pub column: u16,
    pub is_stmt: bool,
    pub basic_block: bool,
    pub end_sequence: bool,
    pub prologue_end: bool,
    pub epilogue_begin: bool,
    pub discriminator: u16,
}

impl LineNumberState {
    /// Reset to the power-on / `PROGRAM_HEADER`-write defaults of §3.
    pub fn reset(default_is_stmt: bool) -> Self {
        LineNumberState {
            address: 0,
            file: 1,
            line: 1,
            column: 0,
            is_stmt: default_is_stmt,
            basic_block: false,
            end_sequence: false,
            prologue_end: false,
            epilogue_begin: false,
            discriminator: 0,
        }
    }

    /// Clear the fields that reset after a row emit, without disturbing
    /// `address`/`file`/`line`/`column`/`is_stmt` (§3 "reset after row-emit").
    pub fn row_reset(&mut self) {
        self.basic_block = false;
        self.end_sequence = false;
        self.prologue_end = false;
        self.epilogue_begin = false;
        self.discriminator = 0;
    }

    /// `DW_LNS_advance_pc` / the ULEB128 operand path: `address += (op & ~1)`,
    /// modulo 2^24.
    pub fn advance_pc(&mut self, delta: u64) {
        let delta = (delta as u32) & !1;
        self.address = self.address.wrapping_add(delta) & ADDRESS_MASK_24;
    }

    /// `DW_LNS_advance_line`: `line += op`, modulo 2^16, with `op` a signed
    /// SLEB128 value.
    pub fn advance_line(&mut self, delta: i64) {
        self.line = (self.line as i64).wrapping_add(delta) as u16;
    }

    pub fn set_file(&mut self, value: u64) {
        self.file = (value & LINE_FILE_DISCRIM_MASK as u64) as u16;
    }

    pub fn set_column(&mut self, value: u64) {
        self.column = (value & COLUMN_MASK as u64) as u16;
    }

    pub fn negate_stmt(&mut self) {
        self.is_stmt = !self.is_stmt;
    }

    pub fn set_basic_block(&mut self) {
        self.basic_block = true;
    }

    pub fn set_prologue_end(&mut self) {
        self.prologue_end = true;
    }

    pub fn set_epilogue_begin(&mut self) {
        self.epilogue_begin = true;
    }

    /// `DW_LNS_fixed_advance_pc`: a 2-byte little-endian immediate, same LSB
    /// forcing as `advance_pc`, added without LEB128 decoding.
    pub fn fixed_advance_pc(&mut self, delta: u16) {
        let delta = (delta as u32) & !1;
        self.address = self.address.wrapping_add(delta) & ADDRESS_MASK_24;
    }

    /// `DW_LNE_set_address`: assemble all consumed payload bytes
    /// little-endian, mask to 28 bits, force the LSB to zero. See
    /// DESIGN.md Open Question 1 for the derivation against the golden
    /// value `0x0ABB_CCDC`.
    pub fn set_address(&mut self, assembled: u64) {
        self.address = (assembled as u32) & ADDRESS_MASK_28 & !1;
    }

    pub fn set_discriminator(&mut self, value: u64) {
        self.discriminator = (value & LINE_FILE_DISCRIM_MASK as u64) as u16;
    }

    /// `DW_LNE_end_sequence`: mark the flag now; the full-state reset happens
    /// on STATUS acknowledgement (§4.4, §4.6), not here.
    pub fn mark_end_sequence(&mut self) {
        self.end_sequence = true;
    }
}
