use crate::config::Config;
use crate::decoder::{Decoder, RowEmit};
use crate::error::PeripheralError;
use crate::latch::InterruptLatch;
use crate::lnsm::LineNumberState;
use crate::queue::ByteQueue;
use crate::register::{
    AccessWidth, AmAddress, AmFileDiscrim, AmLineColFlags, ProgramHeader, RegisterBlock, Status,
};

/// Register indices within the 64-slot address space (§3, §6). Only 0..6 are
/// implemented; 7..63 read zero and ignore writes.
mod addr {
    pub const PROGRAM_HEADER: u8 = 0;
    pub const PROGRAM_CODE: u8 = 1;
    pub const AM_ADDRESS: u8 = 2;
    pub const AM_FILE_DISCRIM: u8 = 3;
    pub const AM_LINE_COL_FLAGS: u8 = 4;
    pub const STATUS: u8 = 5;
    pub const INFO: u8 = 6;
}

/// The DWARF-5 line-number state machine peripheral: register file, opcode
/// byte queue, decoder/sequencer, LNSM, and row-emit/interrupt latch wired
/// together (§2, §5, §10.2).
///
/// This owns its `RegisterBlock` directly rather than reaching through a
/// `&'static` MMIO pointer, since (per §1) the bus fabric that would route
/// real memory traffic to it is an external collaborator this crate does not
/// model.
pub struct Peripheral {
    regs: RegisterBlock,
    queue: ByteQueue,
    decoder: Decoder,
    lnsm: LineNumberState,
    latch: InterruptLatch,
    default_is_stmt: bool,
}

impl Peripheral {
    /// Construct a peripheral at its power-on-reset state with the default
    /// [`Config`].
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Construct a peripheral at its reset state, applying `config` (§10.3).
    pub fn with_config(config: Config) -> Self {
        let mut regs = RegisterBlock::default();
        unsafe {
            regs.program_header.write(ProgramHeader::new_with_raw_value(
                RegisterBlock::masked_program_header(config.default_is_stmt as u32),
            ));
        }
        let mut peripheral = Peripheral {
            regs,
            queue: ByteQueue::new(),
            decoder: Decoder::new(),
            lnsm: LineNumberState::reset(config.default_is_stmt),
            latch: InterruptLatch::new(),
            default_is_stmt: config.default_is_stmt,
        };
        peripheral.publish();
        peripheral
    }

    /// Republish the LNSM and latch into the read-only register views.
    /// Called after every state-changing operation so `bus_read` always
    /// observes the latest values (§5 "ordering guarantees"). The `AM_*`
    /// views are read-only (`r`) bitfields with no per-field setters, so
    /// they are rebuilt from a manually packed raw word rather than
    /// `with_*` builder calls.
    fn publish(&mut self) {
        let am_address_raw = self.lnsm.address & 0x0FFF_FFFF;
        let am_file_discrim_raw =
            (self.lnsm.file as u32) | ((self.lnsm.discriminator as u32) << 16);
        let am_line_col_flags_raw = (self.lnsm.line as u32)
            | ((self.lnsm.column as u32) << 16)
            | ((self.lnsm.is_stmt as u32) << 26)
            | ((self.lnsm.basic_block as u32) << 27)
            | ((self.lnsm.end_sequence as u32) << 28)
            | ((self.lnsm.prologue_end as u32) << 29)
            | ((self.lnsm.epilogue_begin as u32) << 30);
        unsafe {
            self.regs
                .am_address
                .write(AmAddress::new_with_raw_value(am_address_raw));
            self.regs
                .am_file_discrim
                .write(AmFileDiscrim::new_with_raw_value(am_file_discrim_raw));
            self.regs
                .am_line_col_flags
                .write(AmLineColFlags::new_with_raw_value(am_line_col_flags_raw));
            self.regs
                .status
                .write(Status::default().with_emit_row(self.latch.is_asserted()));
        }
    }

    /// `true` while the interrupt line is asserted (§4.6, §6).
    pub fn interrupt_asserted(&self) -> bool {
        self.latch.is_asserted()
    }

    /// Read a word-indexed register, applying `width` as a byte/half-word/
    /// word lane mask (§4.1, §6). Addresses 7..63 read zero.
    pub fn bus_read(&mut self, addr: u8, width: AccessWidth) -> u32 {
        let word = match addr {
            addr::PROGRAM_HEADER => self.regs.program_header.read().raw_value(),
            addr::PROGRAM_CODE => 0,
            addr::AM_ADDRESS => self.regs.am_address.read().raw_value(),
            addr::AM_FILE_DISCRIM => self.regs.am_file_discrim.read().raw_value(),
            addr::AM_LINE_COL_FLAGS => self.regs.am_line_col_flags.read().raw_value(),
            addr::STATUS => self.regs.status.read().raw_value(),
            addr::INFO => self.regs.info.read(),
            _ => 0,
        };
        word & width.mask()
    }

    /// Write a word-indexed register, applying `width` as a byte/half-word/
    /// word lane mask. Writes to read-only registers and to 7..63 are
    /// silently dropped (§4.1, §7). Returns [`PeripheralError::QueueFull`]
    /// if a `PROGRAM_CODE` write cannot be fully enqueued.
    pub fn bus_write(
        &mut self,
        addr: u8,
        width: AccessWidth,
        value: u32,
    ) -> Result<(), PeripheralError> {
        let value = value & width.mask();
        match addr {
            addr::PROGRAM_HEADER => self.write_program_header(value),
            addr::PROGRAM_CODE => self.write_program_code(value, width)?,
            addr::AM_ADDRESS | addr::AM_FILE_DISCRIM | addr::AM_LINE_COL_FLAGS | addr::INFO => {}
            addr::STATUS => self.write_status(value),
            _ => {}
        }
        self.publish();
        Ok(())
    }

    /// `PROGRAM_HEADER` write: resets the entire LNSM with the new
    /// `default_is_stmt` (§5 "Cancellation"). Does not flush the opcode
    /// queue or disturb the decoder's in-flight state.
    fn write_program_header(&mut self, value: u32) {
        let masked = RegisterBlock::masked_program_header(value);
        unsafe {
            self.regs
                .program_header
                .write(ProgramHeader::new_with_raw_value(masked));
        }
        self.default_is_stmt = masked & 1 == 1;
        self.lnsm = LineNumberState::reset(self.default_is_stmt);
    }

    /// `PROGRAM_CODE` write: enqueues 1/2/4 bytes little-endian (byte 0
    /// first), per the access width (§4.1).
    fn write_program_code(&mut self, value: u32, width: AccessWidth) -> Result<(), PeripheralError> {
        unsafe {
            self.regs.program_code.write(value);
        }
        let n = match width {
            AccessWidth::Byte => 1,
            AccessWidth::HalfWord => 2,
            AccessWidth::Word => 4,
        };
        for i in 0..n {
            let byte = ((value >> (8 * i)) & 0xFF) as u8;
            self.push_opcode_byte(byte)?;
        }
        Ok(())
    }

    /// Enqueue a single opcode byte directly, bypassing the generic
    /// register-file write path (§10.2) — for host code that wants typed
    /// access instead of addressing `PROGRAM_CODE` through `bus_write`.
    pub fn push_opcode_byte(&mut self, byte: u8) -> Result<(), PeripheralError> {
        if self.queue.push(byte) {
            Ok(())
        } else {
            Err(PeripheralError::QueueFull)
        }
    }

    /// `STATUS` write: only a value with bit 0 set clears the latch and
    /// acknowledges a pending row (§4.6). A write with bit 0 clear is a
    /// no-op, even if the decoder is paused (§10.4). When the acknowledged
    /// row was an `end_sequence`, the entire LNSM resets; otherwise only the
    /// row-scoped fields clear (§3 "reset after row-emit", §4.4).
    fn write_status(&mut self, value: u32) {
        self.latch.acknowledge(value);
        if value & 1 == 1 && self.decoder.is_paused() {
            if self.lnsm.end_sequence {
                self.lnsm = LineNumberState::reset(self.default_is_stmt);
            } else {
                self.lnsm.row_reset();
            }
            self.decoder.resume();
        }
    }

    /// Advance the decoder by one opcode byte, if the queue is non-empty and
    /// the decoder is not paused on an unacknowledged row (§5 suspension
    /// points). Returns `true` the cycle a row is produced.
    pub fn step(&mut self) -> bool {
        self.step_inner().is_some()
    }

    /// Like [`Peripheral::step`] but returns which kind of row was produced,
    /// for callers (and tests) that need to distinguish `DW_LNS_copy` from
    /// `DW_LNE_end_sequence`.
    fn step_inner(&mut self) -> Option<RowEmit> {
        if self.decoder.is_paused() {
            return None;
        }
        let byte = self.queue.pop()?;
        let emit = self.decoder.step(byte, &mut self.lnsm);
        if emit.is_some() {
            self.latch.set();
        }
        self.publish();
        emit
    }

    /// Advance the decoder for up to `max_steps` opcode bytes, stopping
    /// early if the queue empties or a row is emitted (the decoder pauses
    /// until acknowledged, so further steps would be no-ops). Returns the
    /// number of opcode bytes actually consumed (§5, §10.2).
    pub fn drain(&mut self, max_steps: usize) -> usize {
        let mut consumed = 0;
        for _ in 0..max_steps {
            if self.decoder.is_paused() || self.queue.is_empty() {
                break;
            }
            self.step_inner();
            consumed += 1;
            if self.decoder.is_paused() {
                break;
            }
        }
        consumed
    }
}

impl Default for Peripheral {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_bytes(p: &mut Peripheral, bytes: &[u8]) {
        for &b in bytes {
            p.bus_write(addr::PROGRAM_CODE, AccessWidth::Byte, b as u32)
                .unwrap();
        }
    }

    fn ack(p: &mut Peripheral) {
        p.bus_write(addr::STATUS, AccessWidth::Byte, 1).unwrap();
    }

    #[test]
    fn scenario_1_reset_defaults() {
        let mut p = Peripheral::new();
        assert_eq!(p.bus_read(addr::AM_ADDRESS, AccessWidth::Word), 0);
        assert_eq!(
            p.bus_read(addr::AM_FILE_DISCRIM, AccessWidth::Word),
            0x0000_0001
        );
        assert_eq!(
            p.bus_read(addr::AM_LINE_COL_FLAGS, AccessWidth::Word),
            0x0000_0001
        );
        assert_eq!(p.bus_read(addr::STATUS, AccessWidth::Word), 0);
        assert_eq!(p.bus_read(addr::INFO, AccessWidth::Word), 0x0000_0155);
    }

    #[test]
    fn scenario_2_header_bit0_sets_is_stmt() {
        let mut p = Peripheral::new();
        p.bus_write(addr::PROGRAM_HEADER, AccessWidth::Word, 1)
            .unwrap();
        assert_eq!(
            p.bus_read(addr::AM_LINE_COL_FLAGS, AccessWidth::Word),
            0x0400_0001
        );
        p.bus_write(addr::PROGRAM_HEADER, AccessWidth::Word, 0)
            .unwrap();
        assert_eq!(
            p.bus_read(addr::AM_LINE_COL_FLAGS, AccessWidth::Word),
            0x0000_0001
        );
    }

    #[test]
    fn copy_asserts_interrupt_until_acknowledged() {
        let mut p = Peripheral::new();
        push_bytes(&mut p, &[0x01]);
        let consumed = p.drain(8);
        assert_eq!(consumed, 1);
        assert!(p.interrupt_asserted());
        assert_eq!(p.bus_read(addr::STATUS, AccessWidth::Word), 1);
        ack(&mut p);
        assert!(!p.interrupt_asserted());
    }

    #[test]
    fn status_write_of_zero_does_not_acknowledge() {
        let mut p = Peripheral::new();
        push_bytes(&mut p, &[0x01]);
        p.drain(8);
        p.bus_write(addr::STATUS, AccessWidth::Byte, 0).unwrap();
        assert!(p.interrupt_asserted());
    }

    #[test]
    fn basic_block_visible_until_ack_then_clears() {
        let mut p = Peripheral::new();
        push_bytes(&mut p, &[0x07, 0x01]); // set_basic_block, copy
        p.drain(8);
        assert_eq!(
            p.bus_read(addr::AM_LINE_COL_FLAGS, AccessWidth::Word) & (1 << 27),
            1 << 27
        );
        ack(&mut p);
        assert_eq!(
            p.bus_read(addr::AM_LINE_COL_FLAGS, AccessWidth::Word) & (1 << 27),
            0
        );
    }

    #[test]
    fn scenario_7_end_sequence_full_reset_on_ack() {
        let mut p = Peripheral::new();
        push_bytes(
            &mut p,
            &[
                0x04, 10, // set_file 10
                0x03, 4, // advance_line +4 (1 -> 5)
                0x05, 11, // set_column 11
                0x06, // negate_stmt (1 -> 0)
                0x07, // set_basic_block
                0x0A, // set_prologue_end
                0x0B, // set_epilogue_begin
                0x00, 0x02, 0x04, 6, // ext set_discriminator 6
                0x00, 0x01, 0x01, // ext end_sequence
            ],
        );
        let consumed = p.drain(32);
        assert!(consumed > 0);
        assert!(p.interrupt_asserted());
        assert_eq!(
            p.bus_read(addr::AM_LINE_COL_FLAGS, AccessWidth::Word) & (1 << 28),
            1 << 28
        );
        ack(&mut p);
        assert_eq!(p.bus_read(addr::AM_ADDRESS, AccessWidth::Word), 0);
        assert_eq!(
            p.bus_read(addr::AM_FILE_DISCRIM, AccessWidth::Word),
            0x0000_0001
        );
        assert_eq!(
            p.bus_read(addr::AM_LINE_COL_FLAGS, AccessWidth::Word),
            0x0400_0001
        );
    }

    #[test]
    fn out_of_range_register_reads_zero_and_ignores_writes() {
        let mut p = Peripheral::new();
        assert_eq!(p.bus_read(7, AccessWidth::Word), 0);
        p.bus_write(7, AccessWidth::Word, 0xFFFF_FFFF).unwrap();
        assert_eq!(p.bus_read(7, AccessWidth::Word), 0);
        assert_eq!(p.bus_read(63, AccessWidth::Word), 0);
    }

    #[test]
    fn queue_full_reports_error() {
        let mut p = Peripheral::new();
        for _ in 0..4 {
            p.bus_write(addr::PROGRAM_CODE, AccessWidth::Word, 0)
                .unwrap();
        }
        let result = p.bus_write(addr::PROGRAM_CODE, AccessWidth::Word, 0);
        assert_eq!(result, Err(PeripheralError::QueueFull));
    }

    #[test]
    fn program_header_does_not_flush_queue() {
        let mut p = Peripheral::new();
        push_bytes(&mut p, &[0x02, 0x04]); // advance_pc 4, no copy yet
        p.step();
        p.bus_write(addr::PROGRAM_HEADER, AccessWidth::Word, 1)
            .unwrap();
        // the second advance_pc byte is still queued and consumable.
        assert!(!p.step());
        assert_eq!(p.bus_read(addr::AM_ADDRESS, AccessWidth::Word), 4);
    }

    #[test]
    fn push_opcode_byte_bypasses_bus_write() {
        let mut p = Peripheral::new();
        p.push_opcode_byte(0x01).unwrap(); // DW_LNS_copy
        assert_eq!(p.drain(1), 1);
        assert!(p.interrupt_asserted());
    }
}
