use crate::leb128::LebAccumulator;
use crate::lnsm::LineNumberState;

/// `DW_LNS_*` / `DW_LNE_*` opcode constants this decoder recognizes (§4.4).
mod opcode {
    pub const EXTENDED_PREFIX: u8 = 0x00;
    pub const COPY: u8 = 0x01;
    pub const ADVANCE_PC: u8 = 0x02;
    pub const ADVANCE_LINE: u8 = 0x03;
    pub const SET_FILE: u8 = 0x04;
    pub const SET_COLUMN: u8 = 0x05;
    pub const NEGATE_STMT: u8 = 0x06;
    pub const SET_BASIC_BLOCK: u8 = 0x07;
    pub const CONST_ADD_PC: u8 = 0x08;
    pub const FIXED_ADVANCE_PC: u8 = 0x09;
    pub const SET_PROLOGUE_END: u8 = 0x0A;
    pub const SET_EPILOGUE_BEGIN: u8 = 0x0B;
    pub const SET_ISA: u8 = 0x0C;

    pub const EXT_END_SEQUENCE: u8 = 0x01;
    pub const EXT_SET_ADDRESS: u8 = 0x02;
    pub const EXT_SET_DISCRIMINATOR: u8 = 0x04;
}

/// What kind of row, if any, a [`Decoder::step`] produced.
///
/// `Copy` and `EndSequence` both latch `STATUS = EMIT_ROW` and pause the
/// decoder (§4.4 "Row emission"); they are distinguished because only
/// `EndSequence` triggers the full state-machine reset on acknowledgement
/// (§4.4, §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowEmit {
    Copy,
    EndSequence,
}

/// Decoder states (§4.4). Each LEB128-driven state owns its own
/// [`LebAccumulator`] rather than sharing one mutable field, since the
/// accumulator's lifetime is exactly the state's.
#[derive(Debug, Clone)]
enum State {
    Idle,
    StdAdvancePc(LebAccumulator),
    StdAdvanceLine(LebAccumulator),
    StdSetFile(LebAccumulator),
    StdSetColumn(LebAccumulator),
    StdSetIsa(LebAccumulator),
    /// `DW_LNS_fixed_advance_pc`: 2-byte little-endian immediate, no LEB128.
    FixedAdvancePc { low: u8, have_low: bool },
    ExtLen(LebAccumulator),
    ExtOpcode { length: u64 },
    ExtSetAddress {
        remaining: u64,
        position: u8,
        assembled: u64,
    },
    ExtSetDiscriminator(LebAccumulator),
    ExtNop { remaining: u64 },
    /// A row has been emitted; no further bytes are consumed until the host
    /// acknowledges `STATUS` (§4.4, §4.6).
    PausedRow,
}

impl Default for State {
    fn default() -> Self {
        State::Idle
    }
}

/// Opcode Decoder & Sequencer (§4.4).
///
/// Consumes one opcode byte per [`Decoder::step`] call, classifying it as an
/// opcode, extended-length prefix, extended opcode, or operand byte, and
/// drives the supplied [`LineNumberState`] accordingly.
#[derive(Debug, Default)]
pub struct Decoder {
    state: State,
}

impl Decoder {
    pub const fn new() -> Self {
        Decoder { state: State::Idle }
    }

    /// `true` while a row is latched and unacknowledged; no further opcode
    /// bytes are consumed in this state (§4.4 PAUSED_ROW, §5 suspension
    /// point 2).
    pub fn is_paused(&self) -> bool {
        matches!(self.state, State::PausedRow)
    }

    /// Return to `IDLE` after the host has acknowledged `STATUS`. Does not
    /// itself reset the LNSM; the caller resets it first when the
    /// acknowledged row was an `end_sequence` (§4.4, §4.6).
    pub fn resume(&mut self) {
        self.state = State::Idle;
    }

    /// Force the decoder back to `IDLE` without going through
    /// acknowledgement, used when `PROGRAM_HEADER` is written mid-stream
    /// (§5 "Cancellation" only resets the LNSM, not the decoder or queue —
    /// this is provided for a hard reset, not the header-write path).
    pub fn reset(&mut self) {
        self.state = State::Idle;
    }

    /// Consume one opcode byte, updating `lnsm` as needed. Returns
    /// `Some(RowEmit)` the cycle a row is produced. Must not be called while
    /// [`Decoder::is_paused`] is `true`.
    pub fn step(&mut self, byte: u8, lnsm: &mut LineNumberState) -> Option<RowEmit> {
        let state = core::mem::take(&mut self.state);
        match state {
            State::Idle => self.step_idle(byte, lnsm),
            State::StdAdvancePc(mut leb) => {
                if leb.push_byte(byte) {
                    lnsm.advance_pc(leb.finish_unsigned());
                    self.state = State::Idle;
                } else {
                    self.state = State::StdAdvancePc(leb);
                }
                None
            }
            State::StdAdvanceLine(mut leb) => {
                if leb.push_byte(byte) {
                    lnsm.advance_line(leb.finish_signed());
                    self.state = State::Idle;
                } else {
                    self.state = State::StdAdvanceLine(leb);
                }
                None
            }
            State::StdSetFile(mut leb) => {
                if leb.push_byte(byte) {
                    lnsm.set_file(leb.finish_unsigned());
                    self.state = State::Idle;
                } else {
                    self.state = State::StdSetFile(leb);
                }
                None
            }
            State::StdSetColumn(mut leb) => {
                if leb.push_byte(byte) {
                    lnsm.set_column(leb.finish_unsigned());
                    self.state = State::Idle;
                } else {
                    self.state = State::StdSetColumn(leb);
                }
                None
            }
            State::StdSetIsa(mut leb) => {
                // DW_LNS_set_isa: value accumulated then discarded (§4.4).
                if leb.push_byte(byte) {
                    self.state = State::Idle;
                } else {
                    self.state = State::StdSetIsa(leb);
                }
                None
            }
            State::FixedAdvancePc { low, have_low } => {
                if !have_low {
                    self.state = State::FixedAdvancePc {
                        low: byte,
                        have_low: true,
                    };
                } else {
                    let value = (low as u16) | ((byte as u16) << 8);
                    lnsm.fixed_advance_pc(value);
                    self.state = State::Idle;
                }
                None
            }
            State::ExtLen(mut leb) => {
                if leb.push_byte(byte) {
                    self.state = State::ExtOpcode {
                        length: leb.finish_unsigned(),
                    };
                } else {
                    self.state = State::ExtLen(leb);
                }
                None
            }
            State::ExtOpcode { length } => self.step_ext_opcode(byte, length, lnsm),
            State::ExtSetAddress {
                mut remaining,
                mut position,
                mut assembled,
            } => {
                // §4.3/§9: bytes past the 8th still advance the byte count
                // so the decoder stays in sync, but stop contributing
                // further shifted bits once the 64-bit assembly window is
                // full.
                if position < 8 {
                    assembled |= (byte as u64) << (8 * position);
                }
                position += 1;
                remaining -= 1;
                if remaining == 0 {
                    lnsm.set_address(assembled);
                    self.state = State::Idle;
                } else {
                    self.state = State::ExtSetAddress {
                        remaining,
                        position,
                        assembled,
                    };
                }
                None
            }
            State::ExtSetDiscriminator(mut leb) => {
                if leb.push_byte(byte) {
                    lnsm.set_discriminator(leb.finish_unsigned());
                    self.state = State::Idle;
                } else {
                    self.state = State::ExtSetDiscriminator(leb);
                }
                None
            }
            State::ExtNop { mut remaining } => {
                remaining -= 1;
                if remaining == 0 {
                    self.state = State::Idle;
                } else {
                    self.state = State::ExtNop { remaining };
                }
                None
            }
            State::PausedRow => {
                // Defensive: the caller is expected not to step() while
                // paused (§5). Leave the byte unconsumed in effect by
                // staying paused rather than corrupting state.
                self.state = State::PausedRow;
                None
            }
        }
    }

    fn step_idle(&mut self, byte: u8, lnsm: &mut LineNumberState) -> Option<RowEmit> {
        match byte {
            opcode::EXTENDED_PREFIX => {
                self.state = State::ExtLen(LebAccumulator::new());
                None
            }
            opcode::COPY => {
                self.state = State::PausedRow;
                Some(RowEmit::Copy)
            }
            opcode::ADVANCE_PC => {
                self.state = State::StdAdvancePc(LebAccumulator::new());
                None
            }
            opcode::ADVANCE_LINE => {
                self.state = State::StdAdvanceLine(LebAccumulator::new());
                None
            }
            opcode::SET_FILE => {
                self.state = State::StdSetFile(LebAccumulator::new());
                None
            }
            opcode::SET_COLUMN => {
                self.state = State::StdSetColumn(LebAccumulator::new());
                None
            }
            opcode::NEGATE_STMT => {
                lnsm.negate_stmt();
                self.state = State::Idle;
                None
            }
            opcode::SET_BASIC_BLOCK => {
                lnsm.set_basic_block();
                self.state = State::Idle;
                None
            }
            opcode::CONST_ADD_PC => {
                // Reserved; NOP in this implementation (§1, §4.4, §9).
                self.state = State::Idle;
                None
            }
            opcode::FIXED_ADVANCE_PC => {
                self.state = State::FixedAdvancePc {
                    low: 0,
                    have_low: false,
                };
                None
            }
            opcode::SET_PROLOGUE_END => {
                lnsm.set_prologue_end();
                self.state = State::Idle;
                None
            }
            opcode::SET_EPILOGUE_BEGIN => {
                lnsm.set_epilogue_begin();
                self.state = State::Idle;
                None
            }
            opcode::SET_ISA => {
                self.state = State::StdSetIsa(LebAccumulator::new());
                None
            }
            // 0x0D..=0xFF: reserved for the special-opcode range, NOP here
            // (§1 non-goals, §4.4, §9 Open Question).
            _ => {
                self.state = State::Idle;
                None
            }
        }
    }

    fn step_ext_opcode(
        &mut self,
        ext_op: u8,
        length: u64,
        lnsm: &mut LineNumberState,
    ) -> Option<RowEmit> {
        match ext_op {
            opcode::EXT_END_SEQUENCE => {
                lnsm.mark_end_sequence();
                self.state = State::PausedRow;
                Some(RowEmit::EndSequence)
            }
            opcode::EXT_SET_ADDRESS => {
                let remaining = length.saturating_sub(1);
                if remaining == 0 {
                    lnsm.set_address(0);
                    self.state = State::Idle;
                } else {
                    self.state = State::ExtSetAddress {
                        remaining,
                        position: 0,
                        assembled: 0,
                    };
                }
                None
            }
            opcode::EXT_SET_DISCRIMINATOR => {
                self.state = State::ExtSetDiscriminator(LebAccumulator::new());
                None
            }
            _ => {
                let remaining = length.saturating_sub(1);
                if remaining == 0 {
                    self.state = State::Idle;
                } else {
                    self.state = State::ExtNop { remaining };
                }
                None
            }
        }
    }
}
