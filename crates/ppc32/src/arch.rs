//! The PPC32 user-level register file.

use crate::Address;
use bitos::{BitUtils, bitos, integer::u7};
use strum::FromRepr;

/// A single 4-bit condition field.
#[bitos(4)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cond {
    /// Copy of XER summary overflow at update time.
    #[bits(0)]
    pub ov: bool,
    /// Whether the operands are equal.
    #[bits(1)]
    pub eq: bool,
    /// Whether the first operand is greater than the second.
    #[bits(2)]
    pub gt: bool,
    /// Whether the first operand is less than the second.
    #[bits(3)]
    pub lt: bool,
}

/// The condition register (CR): 8 fields, named CR0-CR7, each containing the
/// flags of some comparison operation.
///
/// Integer instructions with the `Rc` flag set update CR0 with a comparison
/// of the result against zero; explicit compare instructions pick a field.
#[bitos(32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CondReg {
    // NOTE: CR0 is the *top* nibble! PPC bit order is big endian
    #[bits(..)]
    pub fields: [Cond; 8],
}

impl CondReg {
    /// Returns field CRn, with CR0 being the most significant nibble.
    #[inline(always)]
    pub fn field(&self, n: u8) -> Cond {
        Cond::from_bits(self.to_bits().bits(28 - 4 * n as u32, 32 - 4 * n as u32) as u8)
    }

    /// Replaces field CRn.
    #[inline(always)]
    pub fn set_field(&mut self, n: u8, cond: Cond) {
        let lo = 28 - 4 * n as u32;
        *self = Self::from_bits(self.to_bits().with_bits(lo, lo + 4, cond.to_bits() as u32));
    }

    /// Returns CR bit `n`, numbered from the most significant bit the way the
    /// BI branch field numbers them.
    #[inline(always)]
    pub fn bit(&self, n: u8) -> bool {
        self.to_bits().bit(31 - n as u32)
    }

    /// Sets CR bit `n`, numbered from the most significant bit.
    #[inline(always)]
    pub fn set_bit(&mut self, n: u8, value: bool) {
        *self = Self::from_bits(self.to_bits().with_bit(31 - n as u32, value));
    }
}

/// The XER register: carry and overflow state, plus the transfer length used
/// by the string-indexed load/stores.
#[bitos(32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct XerReg {
    /// The number of bytes to be transferred by a lswx or stswx.
    #[bits(0..7)]
    pub byte_count: u7,
    /// Used by carrying instructions, contains the carry bit of the result.
    #[bits(29)]
    pub carry: bool,
    /// Whether an overflow has occured.
    #[bits(30)]
    pub overflow: bool,
    /// Set whenever the overflow bit is set and stays set until cleared by
    /// specific instructions.
    #[bits(31)]
    pub overflow_fuse: bool,
}

/// A special-purpose register the interpreter knows how to move to and from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr)]
#[repr(u16)]
pub enum Spr {
    Xer = 1,
    Lr = 8,
    Ctr = 9,
}

/// The user-level register file. A process-free value: the interpreter owns
/// one and hosts may snapshot it freely.
#[derive(Debug, Clone, PartialEq)]
pub struct Registers {
    /// General Purpose Registers.
    pub gpr: [u32; 32],
    /// Floating Point Registers.
    pub fpr: [f64; 32],
    /// Condition Register.
    pub cr: CondReg,
    /// XER Register.
    pub xer: XerReg,
    /// Link Register.
    pub lr: u32,
    /// Count Register.
    pub ctr: u32,
    /// Program Counter.
    pub pc: Address,
    /// Time Base.
    pub tbr: u64,
    /// How much the time base advances per executed instruction.
    pub tbr_ticks_per_cycle: u64,
    /// The last effective address computed by a load or store. Transparent
    /// to the guest; exists for tracing.
    pub debug_addr: Address,
}

impl Default for Registers {
    fn default() -> Self {
        Self {
            gpr: [0; 32],
            fpr: [0.0; 32],
            cr: CondReg::default(),
            xer: XerReg::default(),
            lr: 0,
            ctr: 0,
            pc: Address(0),
            tbr: 0,
            tbr_ticks_per_cycle: 1,
            debug_addr: Address(0),
        }
    }
}

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    /// The condition field for a result, as record-form instructions compute
    /// it: sign comparisons against zero plus the current summary overflow.
    #[inline(always)]
    pub fn cond_of_result(&self, value: i32) -> Cond {
        Cond::default()
            .with_lt(value < 0)
            .with_gt(value > 0)
            .with_eq(value == 0)
            .with_ov(self.xer.overflow_fuse())
    }

    /// Updates CR0 for a record-form result write.
    #[inline(always)]
    pub fn set_cr0(&mut self, value: i32) {
        let cond = self.cond_of_result(value);
        self.cr.set_field(0, cond);
    }

    /// Writes a signed comparison of `a` and `b` into CR field `crf`.
    pub fn set_cr_signed(&mut self, crf: u8, a: i32, b: i32) {
        let cond = Cond::default()
            .with_lt(a < b)
            .with_gt(a > b)
            .with_eq(a == b)
            .with_ov(self.xer.overflow_fuse());
        self.cr.set_field(crf, cond);
    }

    /// Writes an unsigned comparison of `a` and `b` into CR field `crf`.
    pub fn set_cr_unsigned(&mut self, crf: u8, a: u32, b: u32) {
        let cond = Cond::default()
            .with_lt(a < b)
            .with_gt(a > b)
            .with_eq(a == b)
            .with_ov(self.xer.overflow_fuse());
        self.cr.set_field(crf, cond);
    }

    /// Writes the column headers matching [`Registers::print`] to `w`.
    pub fn print_header(w: &mut impl std::io::Write) -> std::io::Result<()> {
        for i in 0..32 {
            if i != 0 {
                write!(w, "/")?;
            }
            write!(w, "{:-^8}", format!("r{i}"))?;
        }
        write!(w, " {:-^8} {:-^8} {:-^8} {:-^8}", "CR", "LR", "CTR", "PC")
    }

    /// Writes a fixed-width snapshot of the register file to `w`.
    pub fn print(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        for (i, r) in self.gpr.iter().enumerate() {
            if i != 0 {
                write!(w, "/")?;
            }
            write!(w, "{r:08X}")?;
        }

        write!(
            w,
            " {:08X} {:08X} {:08X} {:08X}",
            self.cr.to_bits(),
            self.lr,
            self.ctr,
            self.pc.value(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{Cond, CondReg, Registers, Spr, XerReg};
    use crate::Address;

    #[test]
    fn cr_field_order() {
        let mut cr = CondReg::default();
        cr.set_field(0, Cond::default().with_lt(true));
        assert_eq!(cr.to_bits(), 0x8000_0000);

        cr.set_field(7, Cond::default().with_eq(true).with_ov(true));
        assert_eq!(cr.to_bits(), 0x8000_0003);

        assert!(cr.field(0).lt());
        assert!(cr.field(7).eq());
        assert!(cr.bit(0));
        assert!(cr.bit(30));
        assert!(!cr.bit(2));
    }

    #[test]
    fn xer_bit_positions() {
        let mut xer = XerReg::default();
        xer.set_carry(true);
        assert_eq!(xer.to_bits(), 0x2000_0000);

        xer.set_overflow_fuse(true);
        assert_eq!(xer.to_bits(), 0xA000_0000);
    }

    #[test]
    fn spr_numbers() {
        assert_eq!(Spr::from_repr(8), Some(Spr::Lr));
        assert_eq!(Spr::from_repr(9), Some(Spr::Ctr));
        assert_eq!(Spr::from_repr(2), None);
    }

    #[test]
    fn snapshot_layout() {
        let mut header = Vec::new();
        Registers::print_header(&mut header).unwrap();
        let header = String::from_utf8(header).unwrap();
        assert!(header.starts_with("---r0---/---r1---/"));
        assert!(header.ends_with("---CR--- ---LR--- --CTR--- ---PC---"));

        let mut regs = Registers::new();
        regs.gpr[0] = 0xDEAD_BEEF;
        regs.pc = Address(0x1000);

        let mut out = Vec::new();
        regs.print(&mut out).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.starts_with("DEADBEEF/00000000/"));
        assert!(out.ends_with("00001000"));
        assert_eq!(out.len(), header.len());
    }

    #[test]
    fn fresh_registers_tick_once_per_cycle() {
        let regs = Registers::new();
        assert_eq!(regs.tbr_ticks_per_cycle, 1);
        assert_eq!(regs.gpr, [0; 32]);
    }
}
