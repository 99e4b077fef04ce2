//! The executor family: one method per opcode.
//!
//! Dispatch is structurally parallel to the disassembler's render match, so
//! both paths classify a word identically. Branch handlers write the target
//! minus 4; the step loop unconditionally adds 4 afterwards.

use crate::{Bus, Interpreter, StepError};
use bitos::BitUtils;
use ppc32::{
    Address, Ins, Opcode,
    arch::{Cond, CondReg, Spr, XerReg},
    ins::CtrCond,
};

/// 33-bit addition: returns the 32-bit sum and the carry out.
#[inline(always)]
fn add_carrying(a: u32, b: u32, carry_in: bool) -> (u32, bool) {
    let (sum, c1) = a.overflowing_add(b);
    let (sum, c2) = sum.overflowing_add(carry_in as u32);
    (sum, c1 | c2)
}

/// The rotate mask selecting bits MB..ME (inclusive, numbered from the MSB).
#[inline(always)]
fn rotate_mask(mb: u8, me: u8) -> u32 {
    (0xFFFF_FFFF >> mb) & (0xFFFF_FFFFu32 << (31 - me))
}

impl<M: Bus> Interpreter<M> {
    #[inline(always)]
    fn gpr(&self, index: u8) -> u32 {
        self.machine.regs.gpr[index as usize]
    }

    #[inline(always)]
    fn set_gpr(&mut self, index: u8, value: u32) {
        self.machine.regs.gpr[index as usize] = value;
    }

    /// Effective address of a displacement form, with the r0-as-zero rule.
    /// Also records the address for tracing.
    fn ea(&mut self, ra: u8, disp: i32) -> Address {
        let base = if ra == 0 { 0 } else { self.gpr(ra) };
        let ea = Address(base.wrapping_add_signed(disp));
        self.machine.regs.debug_addr = ea;
        ea
    }

    /// Effective address of an indexed form.
    fn ea_indexed(&mut self, ra: u8, rb: u8) -> Address {
        let base = if ra == 0 { 0 } else { self.gpr(ra) };
        let ea = Address(base.wrapping_add(self.gpr(rb)));
        self.machine.regs.debug_addr = ea;
        ea
    }

    // Guest accesses are big-endian unless noted; the byte-reversed family
    // below reads and writes little-endian. Every store drops the `lwarx`
    // reservation.

    fn read_u8(&mut self, addr: Address) -> Result<u8, StepError> {
        self.machine.mem.read(addr).map_err(|e| self.bus_error(e))
    }

    fn read_u16(&mut self, addr: Address) -> Result<u16, StepError> {
        let v: u16 = self.machine.mem.read(addr).map_err(|e| self.bus_error(e))?;
        Ok(u16::from_be(v))
    }

    fn read_u16_le(&mut self, addr: Address) -> Result<u16, StepError> {
        let v: u16 = self.machine.mem.read(addr).map_err(|e| self.bus_error(e))?;
        Ok(u16::from_le(v))
    }

    fn read_u32(&mut self, addr: Address) -> Result<u32, StepError> {
        let v: u32 = self.machine.mem.read(addr).map_err(|e| self.bus_error(e))?;
        Ok(u32::from_be(v))
    }

    fn read_u32_le(&mut self, addr: Address) -> Result<u32, StepError> {
        let v: u32 = self.machine.mem.read(addr).map_err(|e| self.bus_error(e))?;
        Ok(u32::from_le(v))
    }

    fn read_u64(&mut self, addr: Address) -> Result<u64, StepError> {
        let v: u64 = self.machine.mem.read(addr).map_err(|e| self.bus_error(e))?;
        Ok(u64::from_be(v))
    }

    fn write_u8(&mut self, addr: Address, value: u8) -> Result<(), StepError> {
        self.set_reservation(false);
        self.machine
            .mem
            .write(addr, value)
            .map_err(|e| self.bus_error(e))
    }

    fn write_u16(&mut self, addr: Address, value: u16) -> Result<(), StepError> {
        self.set_reservation(false);
        self.machine
            .mem
            .write(addr, value.to_be())
            .map_err(|e| self.bus_error(e))
    }

    fn write_u16_le(&mut self, addr: Address, value: u16) -> Result<(), StepError> {
        self.set_reservation(false);
        self.machine
            .mem
            .write(addr, value.to_le())
            .map_err(|e| self.bus_error(e))
    }

    fn write_u32(&mut self, addr: Address, value: u32) -> Result<(), StepError> {
        self.set_reservation(false);
        self.machine
            .mem
            .write(addr, value.to_be())
            .map_err(|e| self.bus_error(e))
    }

    fn write_u32_le(&mut self, addr: Address, value: u32) -> Result<(), StepError> {
        self.set_reservation(false);
        self.machine
            .mem
            .write(addr, value.to_le())
            .map_err(|e| self.bus_error(e))
    }

    fn write_u64(&mut self, addr: Address, value: u64) -> Result<(), StepError> {
        self.set_reservation(false);
        self.machine
            .mem
            .write(addr, value.to_be())
            .map_err(|e| self.bus_error(e))
    }

    /// Effective address of an integer load; update forms are
    /// encoding-invalid with a zero base or when the base doubles as the
    /// destination.
    fn load_ea(&mut self, ins: Ins, indexed: bool, update: bool) -> Result<Address, StepError> {
        let ra = ins.field_ra();
        if update && (ra == 0 || ra == ins.field_rd()) {
            return Err(self.invalid_op(ins));
        }

        Ok(if indexed {
            self.ea_indexed(ra, ins.field_rb())
        } else {
            self.ea(ra, ins.field_simm() as i32)
        })
    }

    /// Effective address of an FP load; the destination lives in the FPR
    /// file, so only the zero-base restriction applies.
    fn load_ea_fp(&mut self, ins: Ins, indexed: bool, update: bool) -> Result<Address, StepError> {
        let ra = ins.field_ra();
        if update && ra == 0 {
            return Err(self.invalid_op(ins));
        }

        Ok(if indexed {
            self.ea_indexed(ra, ins.field_rb())
        } else {
            self.ea(ra, ins.field_simm() as i32)
        })
    }

    fn store_ea(&mut self, ins: Ins, indexed: bool, update: bool) -> Result<Address, StepError> {
        let ra = ins.field_ra();
        if update && ra == 0 {
            return Err(self.invalid_op(ins));
        }

        Ok(if indexed {
            self.ea_indexed(ra, ins.field_rb())
        } else {
            self.ea(ra, ins.field_simm() as i32)
        })
    }

    /// Update-form writeback. Only reached after the access succeeded.
    fn write_back(&mut self, ins: Ins, ea: Address) {
        self.set_gpr(ins.field_ra(), ea.value());
    }

    pub(crate) fn dispatch(&mut self, ins: Ins) -> Result<(), StepError> {
        use Opcode as Op;

        match Opcode::decode(ins) {
            Op::Mulli => Ok(self.mulli(ins)),
            Op::Subfic => Ok(self.subfic(ins)),
            Op::Cmpli => self.cmpli(ins),
            Op::Cmpi => self.cmpi(ins),
            Op::Addic => Ok(self.addic(ins)),
            Op::Addi => Ok(self.addi(ins)),
            Op::Addis => Ok(self.addis(ins)),
            Op::Bc => Ok(self.bc(ins)),
            Op::Sc => self.sc(ins),
            Op::B => Ok(self.b(ins)),
            Op::Mcrf => Ok(self.mcrf(ins)),
            Op::Bclr => Ok(self.bclr(ins)),
            Op::Crnor => Ok(self.cr_op(ins, |a, b| !(a | b))),
            Op::Crandc => Ok(self.cr_op(ins, |a, b| a & !b)),
            Op::Isync => self.no_op_fixed(ins, 0x4C00_012C),
            Op::Crxor => Ok(self.cr_op(ins, |a, b| a ^ b)),
            Op::Crnand => Ok(self.cr_op(ins, |a, b| !(a & b))),
            Op::Crand => Ok(self.cr_op(ins, |a, b| a & b)),
            Op::Creqv => Ok(self.cr_op(ins, |a, b| !(a ^ b))),
            Op::Crorc => Ok(self.cr_op(ins, |a, b| a | !b)),
            Op::Cror => Ok(self.cr_op(ins, |a, b| a | b)),
            Op::Bcctr => Ok(self.bcctr(ins)),
            Op::Rlwimi => Ok(self.rlwimi(ins)),
            Op::Rlwinm => Ok(self.rlwinm(ins)),
            Op::Rlwnm => Ok(self.rlwnm(ins)),
            Op::Ori => Ok(self.ori(ins)),
            Op::Oris => Ok(self.oris(ins)),
            Op::Xori => Ok(self.xori(ins)),
            Op::Xoris => Ok(self.xoris(ins)),
            Op::AndiRecord => Ok(self.andi_record(ins)),
            Op::AndisRecord => Ok(self.andis_record(ins)),
            Op::Cmp => self.cmp(ins),
            Op::Subfc => self.subfc(ins),
            Op::Addc => self.addc(ins),
            Op::Mulhwu => Ok(self.mulhwu(ins)),
            Op::Mfcr => Ok(self.mfcr(ins)),
            Op::Lwarx => self.lwarx(ins),
            Op::Lwzx => self.lwzx(ins, false),
            Op::Slw => Ok(self.slw(ins)),
            Op::Cntlzw => Ok(self.cntlzw(ins)),
            Op::And => Ok(self.logical(ins, |s, b| s & b)),
            Op::Cmpl => self.cmpl(ins),
            Op::Subf => self.subf(ins),
            Op::Lwzux => self.lwzx(ins, true),
            Op::Andc => Ok(self.logical(ins, |s, b| s & !b)),
            Op::Mulhw => Ok(self.mulhw(ins)),
            Op::Lbzx => self.lbzx(ins, false),
            Op::Neg => self.neg(ins),
            Op::Lbzux => self.lbzx(ins, true),
            Op::Nor => Ok(self.logical(ins, |s, b| !(s | b))),
            Op::Subfe => self.subfe(ins),
            Op::Adde => self.adde(ins),
            Op::Mtcrf => Ok(self.mtcrf(ins)),
            Op::StwcxRecord => self.stwcx_record(ins),
            Op::Stwx => self.stwx(ins, false),
            Op::Stwux => self.stwx(ins, true),
            Op::Subfze => self.subfze(ins),
            Op::Addze => self.addze(ins),
            Op::Stbx => self.stbx(ins, false),
            Op::Subfme => self.subfme(ins),
            Op::Addme => self.addme(ins),
            Op::Mullw => self.mullw(ins),
            Op::Stbux => self.stbx(ins, true),
            Op::Add => self.add(ins),
            Op::Lhzx => self.lhzx(ins, false),
            Op::Eqv => Ok(self.logical(ins, |s, b| !(s ^ b))),
            Op::Lhzux => self.lhzx(ins, true),
            Op::Xor => Ok(self.logical(ins, |s, b| s ^ b)),
            Op::Mfspr => self.mfspr(ins),
            Op::Lhax => self.lhax(ins, false),
            Op::Tlbia => self.no_op_fixed(ins, 0x7C00_02E4),
            Op::Mftb => self.mftb(ins),
            Op::Lhaux => self.lhax(ins, true),
            Op::Sthx => self.sthx(ins, false),
            Op::Orc => Ok(self.logical(ins, |s, b| s | !b)),
            Op::Sthux => self.sthx(ins, true),
            Op::Or => Ok(self.logical(ins, |s, b| s | b)),
            Op::Divwu => self.divwu(ins),
            Op::Mtspr => self.mtspr(ins),
            Op::Nand => Ok(self.logical(ins, |s, b| !(s & b))),
            Op::Divw => self.divw(ins),
            Op::Mcrxr => Ok(self.mcrxr(ins)),
            Op::Lwbrx => self.lwbrx(ins),
            Op::Lfsx => self.lfs_any(ins, true, false),
            Op::Srw => Ok(self.srw(ins)),
            Op::Tlbsync => self.no_op_fixed(ins, 0x7C00_046C),
            Op::Lfsux => self.lfs_any(ins, true, true),
            Op::Lswi => self.lswi(ins),
            Op::Sync => self.no_op_fixed(ins, 0x7C00_04AC),
            Op::Lfdx => self.lfd_any(ins, true, false),
            Op::Lfdux => self.lfd_any(ins, true, true),
            Op::Stwbrx => self.stwbrx(ins),
            Op::Stfsx => self.stfs_any(ins, true, false),
            Op::Stfsux => self.stfs_any(ins, true, true),
            Op::Stswi => self.stswi(ins),
            Op::Stfdx => self.stfd_any(ins, true, false),
            Op::Stfdux => self.stfd_any(ins, true, true),
            Op::Lhbrx => self.lhbrx(ins),
            Op::Sraw => Ok(self.sraw(ins)),
            Op::Srawi => Ok(self.srawi(ins)),
            Op::Eieio => self.no_op_fixed(ins, 0x7C00_06AC),
            Op::Sthbrx => self.sthbrx(ins),
            Op::Extsh => Ok(self.extsh(ins)),
            Op::Extsb => Ok(self.extsb(ins)),
            Op::Stfiwx => self.stfiwx(ins),
            Op::Dcbz => self.dcbz(ins),
            Op::Lwz => self.lwz(ins),
            Op::Lbz => self.lbz(ins),
            Op::Stw => self.stw(ins),
            Op::Stb => self.stb(ins),
            Op::Lhz => self.lhz(ins),
            Op::Lha => self.lha(ins),
            Op::Sth => self.sth(ins),
            Op::Lmw => self.lmw(ins),
            Op::Stmw => self.stmw(ins),
            Op::Lfs => {
                let update = ins.field_update();
                self.lfs_any(ins, false, update)
            }
            Op::Lfd => {
                let update = ins.field_update();
                self.lfd_any(ins, false, update)
            }
            Op::Stfs => {
                let update = ins.field_update();
                self.stfs_any(ins, false, update)
            }
            Op::Stfd => {
                let update = ins.field_update();
                self.stfd_any(ins, false, update)
            }

            // cache-control hints have no architectural data effect (dcbz is
            // the exception, handled above)
            Op::Dcbst | Op::Dcbf | Op::Dcbtst | Op::Dcbt | Op::Dcbi | Op::Dcba | Op::Icbi => Ok(()),

            // traps, supervisor state, segment registers, external control
            // and the string-indexed transfers stay stubbed, as does all FP
            // arithmetic; they disassemble but fault on execution
            Op::Twi
            | Op::Tw
            | Op::Mfmsr
            | Op::Mtmsr
            | Op::Mtsr
            | Op::Mtsrin
            | Op::Mfsr
            | Op::Mfsrin
            | Op::Tlbie
            | Op::Rfi
            | Op::Eciwx
            | Op::Ecowx
            | Op::Lswx
            | Op::Stswx
            | Op::Fdivs
            | Op::Fsubs
            | Op::Fadds
            | Op::Fsqrts
            | Op::Fres
            | Op::Fmuls
            | Op::Fmsubs
            | Op::Fmadds
            | Op::Fnmsubs
            | Op::Fnmadds
            | Op::Fdiv
            | Op::Fsub
            | Op::Fadd
            | Op::Fsqrt
            | Op::Fsel
            | Op::Fmul
            | Op::Frsqrte
            | Op::Fmsub
            | Op::Fmadd
            | Op::Fnmsub
            | Op::Fnmadd
            | Op::Fcmpu
            | Op::Frsp
            | Op::Fctiw
            | Op::Fctiwz
            | Op::Fcmpo
            | Op::Mtfsb1
            | Op::Fneg
            | Op::Mcrfs
            | Op::Mtfsb0
            | Op::Fmr
            | Op::Mtfsfi
            | Op::Fnabs
            | Op::Fabs
            | Op::Mffs
            | Op::Mtfsf => Err(self.unimplemented_op(ins)),

            Op::Invalid => Err(self.invalid_op(ins)),
        }
    }

    // === integer arithmetic ===

    fn addi(&mut self, ins: Ins) {
        let imm = ins.field_simm() as i32 as u32;
        let value = if ins.field_ra() == 0 {
            imm
        } else {
            self.gpr(ins.field_ra()).wrapping_add(imm)
        };

        self.set_gpr(ins.field_rd(), value);
    }

    fn addis(&mut self, ins: Ins) {
        let imm = (ins.field_uimm() as u32) << 16;
        let value = if ins.field_ra() == 0 {
            imm
        } else {
            self.gpr(ins.field_ra()).wrapping_add(imm)
        };

        self.set_gpr(ins.field_rd(), value);
    }

    fn addic(&mut self, ins: Ins) {
        let ra = self.gpr(ins.field_ra());
        let (value, carry) = add_carrying(ra, ins.field_simm() as i32 as u32, false);

        self.machine.regs.xer.set_carry(carry);
        if ins.field_update() {
            self.machine.regs.set_cr0(value as i32);
        }

        self.set_gpr(ins.field_rd(), value);
    }

    fn subfic(&mut self, ins: Ins) {
        let ra = self.gpr(ins.field_ra());
        let (value, carry) = add_carrying(!ra, ins.field_simm() as i32 as u32, true);

        self.machine.regs.xer.set_carry(carry);
        self.set_gpr(ins.field_rd(), value);
    }

    fn mulli(&mut self, ins: Ins) {
        let ra = self.gpr(ins.field_ra()) as i32;
        let value = ra.wrapping_mul(ins.field_simm() as i32);
        self.set_gpr(ins.field_rd(), value as u32);
    }

    /// Shared tail of the arithmetic family: CR0 update, result write.
    fn finish_arith(&mut self, ins: Ins, value: u32) {
        if ins.field_rc() {
            self.machine.regs.set_cr0(value as i32);
        }
        self.set_gpr(ins.field_rd(), value);
    }

    /// The XER overflow path is out of scope; OE-enabled forms fault.
    fn reject_oe(&mut self, ins: Ins) -> Result<(), StepError> {
        if ins.field_oe() {
            Err(self.unimplemented_op(ins))
        } else {
            Ok(())
        }
    }

    fn add(&mut self, ins: Ins) -> Result<(), StepError> {
        self.reject_oe(ins)?;
        let value = self.gpr(ins.field_ra()).wrapping_add(self.gpr(ins.field_rb()));
        self.finish_arith(ins, value);
        Ok(())
    }

    fn subf(&mut self, ins: Ins) -> Result<(), StepError> {
        self.reject_oe(ins)?;
        let value = self.gpr(ins.field_rb()).wrapping_sub(self.gpr(ins.field_ra()));
        self.finish_arith(ins, value);
        Ok(())
    }

    fn addc(&mut self, ins: Ins) -> Result<(), StepError> {
        self.reject_oe(ins)?;
        let (value, carry) = add_carrying(self.gpr(ins.field_ra()), self.gpr(ins.field_rb()), false);
        self.machine.regs.xer.set_carry(carry);
        self.finish_arith(ins, value);
        Ok(())
    }

    fn subfc(&mut self, ins: Ins) -> Result<(), StepError> {
        self.reject_oe(ins)?;
        let (value, carry) = add_carrying(!self.gpr(ins.field_ra()), self.gpr(ins.field_rb()), true);
        self.machine.regs.xer.set_carry(carry);
        self.finish_arith(ins, value);
        Ok(())
    }

    fn adde(&mut self, ins: Ins) -> Result<(), StepError> {
        self.reject_oe(ins)?;
        let carry_in = self.machine.regs.xer.carry();
        let (value, carry) =
            add_carrying(self.gpr(ins.field_ra()), self.gpr(ins.field_rb()), carry_in);
        self.machine.regs.xer.set_carry(carry);
        self.finish_arith(ins, value);
        Ok(())
    }

    fn subfe(&mut self, ins: Ins) -> Result<(), StepError> {
        self.reject_oe(ins)?;
        let carry_in = self.machine.regs.xer.carry();
        let (value, carry) =
            add_carrying(!self.gpr(ins.field_ra()), self.gpr(ins.field_rb()), carry_in);
        self.machine.regs.xer.set_carry(carry);
        self.finish_arith(ins, value);
        Ok(())
    }

    fn addze(&mut self, ins: Ins) -> Result<(), StepError> {
        self.reject_oe(ins)?;
        let carry_in = self.machine.regs.xer.carry();
        let (value, carry) = add_carrying(self.gpr(ins.field_ra()), 0, carry_in);
        self.machine.regs.xer.set_carry(carry);
        self.finish_arith(ins, value);
        Ok(())
    }

    fn subfze(&mut self, ins: Ins) -> Result<(), StepError> {
        self.reject_oe(ins)?;
        let carry_in = self.machine.regs.xer.carry();
        let (value, carry) = add_carrying(!self.gpr(ins.field_ra()), 0, carry_in);
        self.machine.regs.xer.set_carry(carry);
        self.finish_arith(ins, value);
        Ok(())
    }

    fn addme(&mut self, ins: Ins) -> Result<(), StepError> {
        self.reject_oe(ins)?;
        let carry_in = self.machine.regs.xer.carry();
        let (value, carry) = add_carrying(self.gpr(ins.field_ra()), 0xFFFF_FFFF, carry_in);
        self.machine.regs.xer.set_carry(carry);
        self.finish_arith(ins, value);
        Ok(())
    }

    fn subfme(&mut self, ins: Ins) -> Result<(), StepError> {
        self.reject_oe(ins)?;
        let carry_in = self.machine.regs.xer.carry();
        let (value, carry) = add_carrying(!self.gpr(ins.field_ra()), 0xFFFF_FFFF, carry_in);
        self.machine.regs.xer.set_carry(carry);
        self.finish_arith(ins, value);
        Ok(())
    }

    fn neg(&mut self, ins: Ins) -> Result<(), StepError> {
        self.reject_oe(ins)?;
        let value = (self.gpr(ins.field_ra()) as i32).wrapping_neg() as u32;
        self.finish_arith(ins, value);
        Ok(())
    }

    fn mullw(&mut self, ins: Ins) -> Result<(), StepError> {
        self.reject_oe(ins)?;
        let value = (self.gpr(ins.field_ra()) as i32).wrapping_mul(self.gpr(ins.field_rb()) as i32);
        self.finish_arith(ins, value as u32);
        Ok(())
    }

    fn mulhw(&mut self, ins: Ins) {
        let a = self.gpr(ins.field_ra()) as i32 as i64;
        let b = self.gpr(ins.field_rb()) as i32 as i64;
        self.finish_arith(ins, ((a * b) >> 32) as u32);
    }

    fn mulhwu(&mut self, ins: Ins) {
        let a = self.gpr(ins.field_ra()) as u64;
        let b = self.gpr(ins.field_rb()) as u64;
        self.finish_arith(ins, ((a * b) >> 32) as u32);
    }

    // The quotient of a division by zero (and of i32::MIN / -1) is
    // architecturally undefined; this implementation pins it to 0.

    fn divw(&mut self, ins: Ins) -> Result<(), StepError> {
        self.reject_oe(ins)?;
        let a = self.gpr(ins.field_ra()) as i32;
        let b = self.gpr(ins.field_rb()) as i32;
        let value = if b == 0 || (a == i32::MIN && b == -1) {
            0
        } else {
            a / b
        };
        self.finish_arith(ins, value as u32);
        Ok(())
    }

    fn divwu(&mut self, ins: Ins) -> Result<(), StepError> {
        self.reject_oe(ins)?;
        let a = self.gpr(ins.field_ra());
        let b = self.gpr(ins.field_rb());
        let value = if b == 0 { 0 } else { a / b };
        self.finish_arith(ins, value);
        Ok(())
    }

    // === logic, extends, count ===

    /// The rS/rA/rB logical family.
    fn logical(&mut self, ins: Ins, f: impl Fn(u32, u32) -> u32) {
        let value = f(self.gpr(ins.field_rs()), self.gpr(ins.field_rb()));
        if ins.field_rc() {
            self.machine.regs.set_cr0(value as i32);
        }
        self.set_gpr(ins.field_ra(), value);
    }

    fn ori(&mut self, ins: Ins) {
        let value = self.gpr(ins.field_rs()) | ins.field_uimm() as u32;
        self.set_gpr(ins.field_ra(), value);
    }

    fn oris(&mut self, ins: Ins) {
        let value = self.gpr(ins.field_rs()) | ((ins.field_uimm() as u32) << 16);
        self.set_gpr(ins.field_ra(), value);
    }

    fn xori(&mut self, ins: Ins) {
        let value = self.gpr(ins.field_rs()) ^ ins.field_uimm() as u32;
        self.set_gpr(ins.field_ra(), value);
    }

    fn xoris(&mut self, ins: Ins) {
        let value = self.gpr(ins.field_rs()) ^ ((ins.field_uimm() as u32) << 16);
        self.set_gpr(ins.field_ra(), value);
    }

    fn andi_record(&mut self, ins: Ins) {
        let value = self.gpr(ins.field_rs()) & ins.field_uimm() as u32;
        self.machine.regs.set_cr0(value as i32);
        self.set_gpr(ins.field_ra(), value);
    }

    fn andis_record(&mut self, ins: Ins) {
        let value = self.gpr(ins.field_rs()) & ((ins.field_uimm() as u32) << 16);
        self.machine.regs.set_cr0(value as i32);
        self.set_gpr(ins.field_ra(), value);
    }

    fn extsb(&mut self, ins: Ins) {
        let value = self.gpr(ins.field_rs()) as u8 as i8 as i32 as u32;
        if ins.field_rc() {
            self.machine.regs.set_cr0(value as i32);
        }
        self.set_gpr(ins.field_ra(), value);
    }

    fn extsh(&mut self, ins: Ins) {
        let value = self.gpr(ins.field_rs()) as u16 as i16 as i32 as u32;
        if ins.field_rc() {
            self.machine.regs.set_cr0(value as i32);
        }
        self.set_gpr(ins.field_ra(), value);
    }

    fn cntlzw(&mut self, ins: Ins) {
        let value = self.gpr(ins.field_rs()).leading_zeros();
        if ins.field_rc() {
            self.machine.regs.set_cr0(value as i32);
        }
        self.set_gpr(ins.field_ra(), value);
    }

    // === shifts and rotates ===

    fn slw(&mut self, ins: Ins) {
        let n = self.gpr(ins.field_rb()) & 0x3F;
        let rs = self.gpr(ins.field_rs());
        let value = if n >= 32 { 0 } else { rs << n };

        if ins.field_rc() {
            self.machine.regs.set_cr0(value as i32);
        }
        self.set_gpr(ins.field_ra(), value);
    }

    fn srw(&mut self, ins: Ins) {
        let n = self.gpr(ins.field_rb()) & 0x3F;
        let rs = self.gpr(ins.field_rs());
        let value = if n >= 32 { 0 } else { rs >> n };

        if ins.field_rc() {
            self.machine.regs.set_cr0(value as i32);
        }
        self.set_gpr(ins.field_ra(), value);
    }

    /// CA is set iff the source is negative and any 1-bit was shifted out.
    fn sraw(&mut self, ins: Ins) {
        let n = self.gpr(ins.field_rb()) & 0x3F;
        let rs = self.gpr(ins.field_rs()) as i32;

        let (value, carry) = if n >= 32 {
            (rs >> 31, rs < 0)
        } else {
            let lost = rs as u32 & ((1u32 << n) - 1);
            (rs >> n, rs < 0 && lost != 0)
        };

        self.machine.regs.xer.set_carry(carry);
        if ins.field_rc() {
            self.machine.regs.set_cr0(value);
        }
        self.set_gpr(ins.field_ra(), value as u32);
    }

    fn srawi(&mut self, ins: Ins) {
        let n = ins.field_sh() as u32;
        let rs = self.gpr(ins.field_rs()) as i32;

        let lost = rs as u32 & ((1u32 << n) - 1);
        let value = rs >> n;

        self.machine.regs.xer.set_carry(rs < 0 && lost != 0);
        if ins.field_rc() {
            self.machine.regs.set_cr0(value);
        }
        self.set_gpr(ins.field_ra(), value as u32);
    }

    fn rlwinm(&mut self, ins: Ins) {
        let rotated = self.gpr(ins.field_rs()).rotate_left(ins.field_sh() as u32);
        let value = rotated & rotate_mask(ins.field_mb(), ins.field_me());

        if ins.field_rc() {
            self.machine.regs.set_cr0(value as i32);
        }
        self.set_gpr(ins.field_ra(), value);
    }

    fn rlwnm(&mut self, ins: Ins) {
        let n = self.gpr(ins.field_rb()) & 0x1F;
        let rotated = self.gpr(ins.field_rs()).rotate_left(n);
        let value = rotated & rotate_mask(ins.field_mb(), ins.field_me());

        if ins.field_rc() {
            self.machine.regs.set_cr0(value as i32);
        }
        self.set_gpr(ins.field_ra(), value);
    }

    /// Rotate-and-insert: only the bits selected by the mask change.
    fn rlwimi(&mut self, ins: Ins) {
        let rotated = self.gpr(ins.field_rs()).rotate_left(ins.field_sh() as u32);
        let mask = rotate_mask(ins.field_mb(), ins.field_me());
        let value = (rotated & mask) | (self.gpr(ins.field_ra()) & !mask);

        if ins.field_rc() {
            self.machine.regs.set_cr0(value as i32);
        }
        self.set_gpr(ins.field_ra(), value);
    }

    // === compares ===

    /// Bits 9..10 of the first halfword are reserved in all four compare
    /// encodings.
    fn check_cmp_reserved(&mut self, ins: Ins) -> Result<(), StepError> {
        if ins.0 & 0x0060_0000 != 0 {
            Err(self.invalid_op(ins))
        } else {
            Ok(())
        }
    }

    fn cmp(&mut self, ins: Ins) -> Result<(), StepError> {
        self.check_cmp_reserved(ins)?;
        let a = self.gpr(ins.field_ra()) as i32;
        let b = self.gpr(ins.field_rb()) as i32;
        self.machine.regs.set_cr_signed(ins.field_crfd(), a, b);
        Ok(())
    }

    fn cmpl(&mut self, ins: Ins) -> Result<(), StepError> {
        self.check_cmp_reserved(ins)?;
        let a = self.gpr(ins.field_ra());
        let b = self.gpr(ins.field_rb());
        self.machine.regs.set_cr_unsigned(ins.field_crfd(), a, b);
        Ok(())
    }

    fn cmpi(&mut self, ins: Ins) -> Result<(), StepError> {
        self.check_cmp_reserved(ins)?;
        let a = self.gpr(ins.field_ra()) as i32;
        self.machine
            .regs
            .set_cr_signed(ins.field_crfd(), a, ins.field_simm() as i32);
        Ok(())
    }

    fn cmpli(&mut self, ins: Ins) -> Result<(), StepError> {
        self.check_cmp_reserved(ins)?;
        let a = self.gpr(ins.field_ra());
        self.machine
            .regs
            .set_cr_unsigned(ins.field_crfd(), a, ins.field_uimm() as u32);
        Ok(())
    }

    // === CR field ops ===

    fn cr_op(&mut self, ins: Ins, f: impl Fn(bool, bool) -> bool) {
        let a = self.machine.regs.cr.bit(ins.field_ra());
        let b = self.machine.regs.cr.bit(ins.field_rb());
        self.machine.regs.cr.set_bit(ins.field_rd(), f(a, b));
    }

    fn mcrf(&mut self, ins: Ins) {
        let field = self.machine.regs.cr.field(ins.field_crfs());
        self.machine.regs.cr.set_field(ins.field_crfd(), field);
    }

    /// Moves XER[SO, OV, CA] into a CR field, then clears them.
    fn mcrxr(&mut self, ins: Ins) {
        let xer = self.machine.regs.xer.to_bits();
        let cond = Cond::from_bits(xer.bits(28, 32) as u8);
        self.machine.regs.cr.set_field(ins.field_crfd(), cond);
        self.machine.regs.xer = XerReg::from_bits(xer & 0x0FFF_FFFF);
    }

    fn mfcr(&mut self, ins: Ins) {
        let value = self.machine.regs.cr.to_bits();
        self.set_gpr(ins.field_rd(), value);
    }

    fn mtcrf(&mut self, ins: Ins) {
        let rs = self.gpr(ins.field_rs());
        let crm = ins.field_crm();

        let mut bits = self.machine.regs.cr.to_bits();
        for n in 0..8u32 {
            if crm & (0x80 >> n) != 0 {
                let lo = 28 - 4 * n;
                bits = bits.with_bits(lo, lo + 4, rs.bits(lo, lo + 4));
            }
        }

        self.machine.regs.cr = CondReg::from_bits(bits);
    }

    // === branches ===

    /// Applies the BO protocol: the CTR decrement happens even when the
    /// branch ends up not taken.
    fn should_branch(&mut self, ins: Ins) -> bool {
        let bo = ins.branch_options();
        if !bo.ignore_ctr() {
            self.machine.regs.ctr = self.machine.regs.ctr.wrapping_sub(1);
        }

        let ctr_ok = bo.ignore_ctr()
            || ((self.machine.regs.ctr == 0) == (bo.ctr_cond() == CtrCond::EqZero));
        let cond_ok =
            bo.ignore_cr() || (self.machine.regs.cr.bit(ins.field_bi()) == bo.desired_cr());

        ctr_ok && cond_ok
    }

    /// Branch handlers store the destination minus 4: the step loop adds 4
    /// after every instruction, including ones that wrote the PC.
    fn jump_to(&mut self, target: u32) {
        self.machine.regs.pc = Address(target) - 4u32;
    }

    fn b(&mut self, ins: Ins) {
        let pc = self.machine.regs.pc;
        if ins.field_lk() {
            self.machine.regs.lr = (pc + 4u32).value();
        }

        let displacement = ins.field_li();
        if ins.field_aa() {
            self.jump_to(displacement as u32);
        } else {
            self.jump_to(pc.value().wrapping_add_signed(displacement));
        }
    }

    fn bc(&mut self, ins: Ins) {
        let pc = self.machine.regs.pc;
        if ins.field_lk() {
            self.machine.regs.lr = (pc + 4u32).value();
        }

        if self.should_branch(ins) {
            let displacement = ins.field_bd();
            if ins.field_aa() {
                self.jump_to(displacement as u32);
            } else {
                self.jump_to(pc.value().wrapping_add_signed(displacement));
            }
        }
    }

    fn bclr(&mut self, ins: Ins) {
        let pc = self.machine.regs.pc;
        // the branch target is the LR value from before the link write
        let target = self.machine.regs.lr & !3;

        if ins.field_lk() {
            self.machine.regs.lr = (pc + 4u32).value();
        }

        if self.should_branch(ins) {
            self.jump_to(target);
        }
    }

    fn bcctr(&mut self, ins: Ins) {
        let pc = self.machine.regs.pc;
        if ins.field_lk() {
            self.machine.regs.lr = (pc + 4u32).value();
        }

        if !ins.branch_options().ignore_ctr() {
            tracing::warn!("bcctr with CTR decrement is architecturally invalid");
        }

        if self.should_branch(ins) {
            let target = self.machine.regs.ctr & !3;
            self.jump_to(target);
        }
    }

    // === system ===

    fn sc(&mut self, ins: Ins) -> Result<(), StepError> {
        if ins.0 != 0x4400_0002 {
            return Err(self.invalid_op(ins));
        }

        let Some(handler) = self.hooks.syscall.as_mut() else {
            return Err(self.unimplemented_op(ins));
        };

        if !handler(&mut self.machine) {
            self.request_exit();
        }

        Ok(())
    }

    /// The synchronizing family: no-ops, but the whole word is fixed.
    fn no_op_fixed(&mut self, ins: Ins, expected: u32) -> Result<(), StepError> {
        if ins.0 != expected {
            return Err(self.invalid_op(ins));
        }
        Ok(())
    }

    fn mfspr(&mut self, ins: Ins) -> Result<(), StepError> {
        let value = match Spr::from_repr(ins.field_spr()) {
            Some(Spr::Xer) => self.machine.regs.xer.to_bits(),
            Some(Spr::Lr) => self.machine.regs.lr,
            Some(Spr::Ctr) => self.machine.regs.ctr,
            None => return Err(self.unimplemented_op(ins)),
        };

        self.set_gpr(ins.field_rd(), value);
        Ok(())
    }

    fn mtspr(&mut self, ins: Ins) -> Result<(), StepError> {
        let value = self.gpr(ins.field_rs());
        match Spr::from_repr(ins.field_spr()) {
            Some(Spr::Xer) => self.machine.regs.xer = XerReg::from_bits(value),
            Some(Spr::Lr) => self.machine.regs.lr = value,
            Some(Spr::Ctr) => self.machine.regs.ctr = value,
            None => return Err(self.unimplemented_op(ins)),
        }
        Ok(())
    }

    fn mftb(&mut self, ins: Ins) -> Result<(), StepError> {
        let value = match ins.field_spr() {
            268 => self.machine.regs.tbr as u32,
            269 => (self.machine.regs.tbr >> 32) as u32,
            _ => return Err(self.unimplemented_op(ins)),
        };

        self.set_gpr(ins.field_rd(), value);
        Ok(())
    }

    // === integer loads and stores ===

    fn lwz(&mut self, ins: Ins) -> Result<(), StepError> {
        let update = ins.field_update();
        let ea = self.load_ea(ins, false, update)?;
        let value = self.read_u32(ea)?;
        self.set_gpr(ins.field_rd(), value);
        if update {
            self.write_back(ins, ea);
        }
        Ok(())
    }

    fn lwzx(&mut self, ins: Ins, update: bool) -> Result<(), StepError> {
        let ea = self.load_ea(ins, true, update)?;
        let value = self.read_u32(ea)?;
        self.set_gpr(ins.field_rd(), value);
        if update {
            self.write_back(ins, ea);
        }
        Ok(())
    }

    fn lbz(&mut self, ins: Ins) -> Result<(), StepError> {
        let update = ins.field_update();
        let ea = self.load_ea(ins, false, update)?;
        let value = self.read_u8(ea)?;
        self.set_gpr(ins.field_rd(), value as u32);
        if update {
            self.write_back(ins, ea);
        }
        Ok(())
    }

    fn lbzx(&mut self, ins: Ins, update: bool) -> Result<(), StepError> {
        let ea = self.load_ea(ins, true, update)?;
        let value = self.read_u8(ea)?;
        self.set_gpr(ins.field_rd(), value as u32);
        if update {
            self.write_back(ins, ea);
        }
        Ok(())
    }

    fn lhz(&mut self, ins: Ins) -> Result<(), StepError> {
        let update = ins.field_update();
        let ea = self.load_ea(ins, false, update)?;
        let value = self.read_u16(ea)?;
        self.set_gpr(ins.field_rd(), value as u32);
        if update {
            self.write_back(ins, ea);
        }
        Ok(())
    }

    fn lhzx(&mut self, ins: Ins, update: bool) -> Result<(), StepError> {
        let ea = self.load_ea(ins, true, update)?;
        let value = self.read_u16(ea)?;
        self.set_gpr(ins.field_rd(), value as u32);
        if update {
            self.write_back(ins, ea);
        }
        Ok(())
    }

    fn lha(&mut self, ins: Ins) -> Result<(), StepError> {
        let update = ins.field_update();
        let ea = self.load_ea(ins, false, update)?;
        let value = self.read_u16(ea)? as i16 as i32;
        self.set_gpr(ins.field_rd(), value as u32);
        if update {
            self.write_back(ins, ea);
        }
        Ok(())
    }

    fn lhax(&mut self, ins: Ins, update: bool) -> Result<(), StepError> {
        let ea = self.load_ea(ins, true, update)?;
        let value = self.read_u16(ea)? as i16 as i32;
        self.set_gpr(ins.field_rd(), value as u32);
        if update {
            self.write_back(ins, ea);
        }
        Ok(())
    }

    fn stw(&mut self, ins: Ins) -> Result<(), StepError> {
        let update = ins.field_update();
        let ea = self.store_ea(ins, false, update)?;
        self.write_u32(ea, self.gpr(ins.field_rs()))?;
        if update {
            self.write_back(ins, ea);
        }
        Ok(())
    }

    fn stwx(&mut self, ins: Ins, update: bool) -> Result<(), StepError> {
        let ea = self.store_ea(ins, true, update)?;
        self.write_u32(ea, self.gpr(ins.field_rs()))?;
        if update {
            self.write_back(ins, ea);
        }
        Ok(())
    }

    fn stb(&mut self, ins: Ins) -> Result<(), StepError> {
        let update = ins.field_update();
        let ea = self.store_ea(ins, false, update)?;
        self.write_u8(ea, self.gpr(ins.field_rs()) as u8)?;
        if update {
            self.write_back(ins, ea);
        }
        Ok(())
    }

    fn stbx(&mut self, ins: Ins, update: bool) -> Result<(), StepError> {
        let ea = self.store_ea(ins, true, update)?;
        self.write_u8(ea, self.gpr(ins.field_rs()) as u8)?;
        if update {
            self.write_back(ins, ea);
        }
        Ok(())
    }

    fn sth(&mut self, ins: Ins) -> Result<(), StepError> {
        let update = ins.field_update();
        let ea = self.store_ea(ins, false, update)?;
        self.write_u16(ea, self.gpr(ins.field_rs()) as u16)?;
        if update {
            self.write_back(ins, ea);
        }
        Ok(())
    }

    fn sthx(&mut self, ins: Ins, update: bool) -> Result<(), StepError> {
        let ea = self.store_ea(ins, true, update)?;
        self.write_u16(ea, self.gpr(ins.field_rs()) as u16)?;
        if update {
            self.write_back(ins, ea);
        }
        Ok(())
    }

    fn lmw(&mut self, ins: Ins) -> Result<(), StepError> {
        let rd = ins.field_rd();
        if ins.field_ra() >= rd {
            return Err(self.invalid_op(ins));
        }

        let mut addr = self.ea(ins.field_ra(), ins.field_simm() as i32);
        for reg in rd..32 {
            let value = self.read_u32(addr)?;
            self.set_gpr(reg, value);
            addr += 4u32;
        }
        Ok(())
    }

    fn stmw(&mut self, ins: Ins) -> Result<(), StepError> {
        let mut addr = self.ea(ins.field_ra(), ins.field_simm() as i32);
        for reg in ins.field_rs()..32 {
            self.write_u32(addr, self.gpr(reg))?;
            addr += 4u32;
        }
        Ok(())
    }

    /// String load: `n` bytes packed big-endian into consecutive registers,
    /// wrapping r31 to r0, the final partial word left-justified.
    fn lswi(&mut self, ins: Ins) -> Result<(), StepError> {
        let n = match ins.field_rb() {
            0 => 32,
            n => n,
        };

        let addr = self.ea(ins.field_ra(), 0);
        let mut reg = ins.field_rd();
        let mut word = 0u32;
        let mut shift = 24u32;

        for i in 0..n as u32 {
            let byte = self.read_u8(addr + i)?;
            word |= (byte as u32) << shift;

            if shift == 0 {
                self.set_gpr(reg, word);
                reg = (reg + 1) & 31;
                word = 0;
                shift = 24;
            } else {
                shift -= 8;
            }
        }

        if shift != 24 {
            self.set_gpr(reg, word);
        }
        Ok(())
    }

    fn stswi(&mut self, ins: Ins) -> Result<(), StepError> {
        let n = match ins.field_rb() {
            0 => 32,
            n => n,
        };

        let addr = self.ea(ins.field_ra(), 0);
        let mut reg = ins.field_rs();
        let mut shift = 24u32;

        for i in 0..n as u32 {
            let byte = (self.gpr(reg) >> shift) as u8;
            self.write_u8(addr + i, byte)?;

            if shift == 0 {
                reg = (reg + 1) & 31;
                shift = 24;
            } else {
                shift -= 8;
            }
        }
        Ok(())
    }

    fn lwbrx(&mut self, ins: Ins) -> Result<(), StepError> {
        let ea = self.load_ea(ins, true, false)?;
        let value = self.read_u32_le(ea)?;
        self.set_gpr(ins.field_rd(), value);
        Ok(())
    }

    fn lhbrx(&mut self, ins: Ins) -> Result<(), StepError> {
        let ea = self.load_ea(ins, true, false)?;
        let value = self.read_u16_le(ea)?;
        self.set_gpr(ins.field_rd(), value as u32);
        Ok(())
    }

    fn stwbrx(&mut self, ins: Ins) -> Result<(), StepError> {
        let ea = self.store_ea(ins, true, false)?;
        self.write_u32_le(ea, self.gpr(ins.field_rs()))
    }

    fn sthbrx(&mut self, ins: Ins) -> Result<(), StepError> {
        let ea = self.store_ea(ins, true, false)?;
        self.write_u16_le(ea, self.gpr(ins.field_rs()) as u16)
    }

    /// The reservation is a plain flag: any store drops it, and the matching
    /// `stwcx.` succeeds iff it is still held.
    fn lwarx(&mut self, ins: Ins) -> Result<(), StepError> {
        let ea = self.load_ea(ins, true, false)?;
        let value = self.read_u32(ea)?;
        self.set_gpr(ins.field_rd(), value);
        self.set_reservation(true);
        tracing::debug!("lwarx reservation taken at {ea}");
        Ok(())
    }

    fn stwcx_record(&mut self, ins: Ins) -> Result<(), StepError> {
        let ea = self.ea_indexed(ins.field_ra(), ins.field_rb());
        let success = self.reservation();
        if success {
            self.write_u32(ea, self.gpr(ins.field_rs()))?;
        } else {
            tracing::debug!("stwcx. without a reservation at {ea}");
        }
        self.set_reservation(false);

        let cond = Cond::default()
            .with_eq(success)
            .with_ov(self.machine.regs.xer.overflow_fuse());
        self.machine.regs.cr.set_field(0, cond);
        Ok(())
    }

    /// The one cache op with an architectural data effect: zeroes the
    /// aligned 32-byte block containing the effective address.
    fn dcbz(&mut self, ins: Ins) -> Result<(), StepError> {
        let ea = self.ea_indexed(ins.field_ra(), ins.field_rb());
        let line = Address(ea.value() & !31);
        for i in 0..4u32 {
            self.write_u64(line + i * 8, 0)?;
        }
        Ok(())
    }

    // === FP loads and stores (moves only; FP arithmetic is stubbed) ===

    fn lfs_any(&mut self, ins: Ins, indexed: bool, update: bool) -> Result<(), StepError> {
        let ea = self.load_ea_fp(ins, indexed, update)?;
        let bits = self.read_u32(ea)?;
        self.machine.regs.fpr[ins.field_rd() as usize] = f32::from_bits(bits) as f64;
        if update {
            self.write_back(ins, ea);
        }
        Ok(())
    }

    fn lfd_any(&mut self, ins: Ins, indexed: bool, update: bool) -> Result<(), StepError> {
        let ea = self.load_ea_fp(ins, indexed, update)?;
        let bits = self.read_u64(ea)?;
        self.machine.regs.fpr[ins.field_rd() as usize] = f64::from_bits(bits);
        if update {
            self.write_back(ins, ea);
        }
        Ok(())
    }

    fn stfs_any(&mut self, ins: Ins, indexed: bool, update: bool) -> Result<(), StepError> {
        let ea = self.store_ea(ins, indexed, update)?;
        let value = self.machine.regs.fpr[ins.field_rs() as usize] as f32;
        self.write_u32(ea, value.to_bits())?;
        if update {
            self.write_back(ins, ea);
        }
        Ok(())
    }

    fn stfd_any(&mut self, ins: Ins, indexed: bool, update: bool) -> Result<(), StepError> {
        let ea = self.store_ea(ins, indexed, update)?;
        let value = self.machine.regs.fpr[ins.field_rs() as usize];
        self.write_u64(ea, value.to_bits())?;
        if update {
            self.write_back(ins, ea);
        }
        Ok(())
    }

    /// Stores the low word of the FPR's raw bits, no conversion.
    fn stfiwx(&mut self, ins: Ins) -> Result<(), StepError> {
        let ea = self.store_ea(ins, true, false)?;
        let bits = self.machine.regs.fpr[ins.field_rs() as usize].to_bits();
        self.write_u32(ea, bits as u32)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Interpreter, Ram, StepError};
    use ppc32::{Address, Ins};

    fn interpreter() -> Interpreter<Ram> {
        let mut int = Interpreter::new(Ram::new(Address(0x1000), 0x1000));
        int.machine.regs.pc = Address(0x1000);
        int
    }

    fn exec(int: &mut Interpreter<Ram>, word: u32) {
        int.dispatch(Ins::new(word)).unwrap();
    }

    #[test]
    fn addic_sets_the_carry() {
        let mut int = interpreter();

        // addic r3, r4, -1 with r4 = 0: no carry out
        int.machine.regs.gpr[4] = 0;
        exec(&mut int, 0x3064_FFFF);
        assert_eq!(int.machine.regs.gpr[3], 0xFFFF_FFFF);
        assert!(!int.machine.regs.xer.carry());

        // addic r3, r4, 1 with r4 = 0xFFFFFFFF: wraps, carry out
        int.machine.regs.gpr[4] = 0xFFFF_FFFF;
        exec(&mut int, 0x3064_0001);
        assert_eq!(int.machine.regs.gpr[3], 0);
        assert!(int.machine.regs.xer.carry());
    }

    #[test]
    fn subfic_borrow_semantics() {
        let mut int = interpreter();

        // subfic r3, r4, 10 with r4 = 3: 7, no borrow => CA set
        int.machine.regs.gpr[4] = 3;
        exec(&mut int, 0x2064_000A);
        assert_eq!(int.machine.regs.gpr[3], 7);
        assert!(int.machine.regs.xer.carry());

        // subfic r3, r4, 3 with r4 = 10: borrows => CA clear
        int.machine.regs.gpr[4] = 10;
        exec(&mut int, 0x2064_0003);
        assert_eq!(int.machine.regs.gpr[3], 3u32.wrapping_sub(10));
        assert!(!int.machine.regs.xer.carry());
    }

    #[test]
    fn record_forms_update_cr0() {
        let mut int = interpreter();

        // subf. r3, r4, r5 with r5 < r4: negative result
        int.machine.regs.gpr[4] = 10;
        int.machine.regs.gpr[5] = 3;
        exec(&mut int, 0x7C64_2851);
        let cr0 = int.machine.regs.cr.field(0);
        assert!(cr0.lt());
        assert!(!cr0.gt());
        assert!(!cr0.eq());
    }

    #[test]
    fn oe_forms_fault() {
        let mut int = interpreter();
        // addo r3, r4, r5
        let err = int.dispatch(Ins::new(0x7C64_2E14)).unwrap_err();
        assert!(matches!(err, StepError::Unimplemented { .. }));
    }

    #[test]
    fn rlwinm_applies_the_mask() {
        let mut int = interpreter();

        // rlwinm r3, r3, 0, 0, 27: mask 0xFFFFFFF0
        int.machine.regs.gpr[3] = 0x1234_5678;
        exec(&mut int, 0x5463_0036);
        assert_eq!(int.machine.regs.gpr[3], 0x1234_5670);

        // rlwinm r3, r4, 0, 0, 31 copies
        int.machine.regs.gpr[4] = 0xDEAD_BEEF;
        exec(&mut int, 0x5483_003E);
        assert_eq!(int.machine.regs.gpr[3], 0xDEAD_BEEF);
    }

    #[test]
    fn srawi_carry_needs_lost_ones() {
        let mut int = interpreter();

        // srawi r3, r4, 1 with r4 = -2: no 1s lost, CA clear
        int.machine.regs.gpr[4] = (-2i32) as u32;
        exec(&mut int, 0x7C83_0E70);
        assert_eq!(int.machine.regs.gpr[3] as i32, -1);
        assert!(!int.machine.regs.xer.carry());

        // srawi r3, r4, 1 with r4 = -1: the low 1 is lost, CA set
        int.machine.regs.gpr[4] = (-1i32) as u32;
        exec(&mut int, 0x7C83_0E70);
        assert_eq!(int.machine.regs.gpr[3] as i32, -1);
        assert!(int.machine.regs.xer.carry());
    }

    #[test]
    fn cmpi_sign_extends_the_immediate() {
        let mut int = interpreter();

        // cmpwi r3, -0x8000 with r3 = 0: 0 > -0x8000
        int.machine.regs.gpr[3] = 0;
        exec(&mut int, 0x2C03_8000);
        assert!(int.machine.regs.cr.field(0).gt());
    }

    #[test]
    fn update_form_checks() {
        let mut int = interpreter();

        // lwzu r3, 4(r0) is encoding-invalid
        let err = int.dispatch(Ins::new(0x8460_0004)).unwrap_err();
        assert!(matches!(err, StepError::Invalid { .. }));

        // lwzu r3, 4(r3) is encoding-invalid and leaves r3 untouched
        int.machine.regs.gpr[3] = 0x1234;
        let err = int.dispatch(Ins::new(0x8463_0004)).unwrap_err();
        assert!(matches!(err, StepError::Invalid { .. }));
        assert_eq!(int.machine.regs.gpr[3], 0x1234);
    }

    #[test]
    fn loads_are_big_endian() {
        let mut int = interpreter();
        int.machine.mem.load(Address(0x1100), &[0xDE, 0xAD, 0xBE, 0xEF]);

        // lwz r3, 0x100(r4) with r4 = 0x1000
        int.machine.regs.gpr[4] = 0x1000;
        exec(&mut int, 0x8064_0100);
        assert_eq!(int.machine.regs.gpr[3], 0xDEAD_BEEF);
        assert_eq!(int.machine.regs.debug_addr, Address(0x1100));

        // lwbrx r5, r0, r4 with r4 = 0x1100
        int.machine.regs.gpr[4] = 0x1100;
        exec(&mut int, 0x7CA0_242C);
        assert_eq!(int.machine.regs.gpr[5], 0xEFBE_ADDE);
    }

    #[test]
    fn reservation_flag_protocol() {
        let mut int = interpreter();
        int.machine.regs.gpr[4] = 0x1100;

        // stwcx. r3, r0, r4 without a reservation: fails, EQ clear
        exec(&mut int, 0x7C60_212D);
        assert!(!int.machine.regs.cr.field(0).eq());

        // lwarx r3, r0, r4 then stwcx. r5, r0, r4: succeeds
        int.machine.regs.gpr[5] = 0xCAFE_F00D;
        exec(&mut int, 0x7C60_2028);
        exec(&mut int, 0x7CA0_212D);
        assert!(int.machine.regs.cr.field(0).eq());
        assert_eq!(
            &int.machine.mem.bytes()[0x100..0x104],
            &0xCAFE_F00Du32.to_be_bytes()
        );

        // an intervening store drops the reservation
        exec(&mut int, 0x7C60_2028);
        exec(&mut int, 0x9464_0200); // stwu r3, 0x200(r4)
        exec(&mut int, 0x7CA0_212D);
        assert!(!int.machine.regs.cr.field(0).eq());
    }

    #[test]
    fn dcbz_zeroes_the_block() {
        let mut int = interpreter();
        int.machine.mem.load(Address(0x1100), &[0xFF; 64]);
        int.machine.regs.gpr[4] = 0x1104;

        // dcbz r0, r4
        exec(&mut int, 0x7C00_27EC);

        assert_eq!(&int.machine.mem.bytes()[0x100..0x120], &[0u8; 32]);
        assert_eq!(&int.machine.mem.bytes()[0x120..0x140], &[0xFF; 32]);
    }

    #[test]
    fn mtcrf_respects_the_mask() {
        let mut int = interpreter();
        int.machine.regs.gpr[3] = 0xFFFF_FFFF;

        // mtcrf 0x80, r3: only CR0
        exec(&mut int, 0x7C68_0120);
        assert_eq!(int.machine.regs.cr.to_bits(), 0xF000_0000);

        // mtcr r3
        exec(&mut int, 0x7C6F_F120);
        assert_eq!(int.machine.regs.cr.to_bits(), 0xFFFF_FFFF);
    }

    #[test]
    fn spr_moves() {
        let mut int = interpreter();
        int.machine.regs.gpr[3] = 0x2000;

        // mtlr r3; mflr r4
        exec(&mut int, 0x7C68_03A6);
        assert_eq!(int.machine.regs.lr, 0x2000);
        exec(&mut int, 0x7C88_02A6);
        assert_eq!(int.machine.regs.gpr[4], 0x2000);

        // mfspr r3, 287 faults
        let err = int.dispatch(Ins::new(0x7C7F_42A6)).unwrap_err();
        assert!(matches!(err, StepError::Unimplemented { .. }));
    }

    #[test]
    fn mftb_reads_the_time_base() {
        let mut int = interpreter();
        int.machine.regs.tbr = 0x1122_3344_5566_7788;

        // mftb r3; mftbu r4
        exec(&mut int, 0x7C6C_42E6);
        assert_eq!(int.machine.regs.gpr[3], 0x5566_7788);
        exec(&mut int, 0x7C8D_42E6);
        assert_eq!(int.machine.regs.gpr[4], 0x1122_3344);
    }

    #[test]
    fn lmw_and_stmw_round_trip() {
        let mut int = interpreter();
        int.machine.regs.gpr[1] = 0x1800;
        for (i, r) in (28..32).enumerate() {
            int.machine.regs.gpr[r] = 0x1111_1111 * (i as u32 + 1);
        }

        // stmw r28, 0(r1); clobber; lmw r28, 0(r1)
        exec(&mut int, 0xBF81_0000);
        for r in 28..32 {
            int.machine.regs.gpr[r] = 0;
        }
        exec(&mut int, 0xBB81_0000);

        for (i, r) in (28..32).enumerate() {
            assert_eq!(int.machine.regs.gpr[r], 0x1111_1111 * (i as u32 + 1));
        }
    }

    #[test]
    fn lmw_with_overlapping_base_is_invalid() {
        let mut int = interpreter();
        // lmw r4, 0(r5)
        let err = int.dispatch(Ins::new(0xB885_0000)).unwrap_err();
        assert!(matches!(err, StepError::Invalid { .. }));
    }

    #[test]
    fn fp_moves_convert_precision() {
        let mut int = interpreter();
        int.machine.regs.gpr[4] = 0x1100;
        int.machine.mem.load(Address(0x1100), &1.5f32.to_bits().to_be_bytes());

        // lfsx f1, r0, r4
        exec(&mut int, 0x7C20_242E);
        assert_eq!(int.machine.regs.fpr[1], 1.5);

        // stfdx f1, r0, r5 with r5 = 0x1200
        int.machine.regs.gpr[5] = 0x1200;
        exec(&mut int, 0x7C20_2DAE);
        assert_eq!(
            &int.machine.mem.bytes()[0x200..0x208],
            &1.5f64.to_bits().to_be_bytes()
        );
    }
}
