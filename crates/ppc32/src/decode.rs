//! Instruction classification.
//!
//! Every 32-bit word maps to exactly one [`Opcode`] (possibly
//! [`Opcode::Invalid`]). Paired encodings that the dispatch tables route to a
//! single handler share a variant: the update-form load/store primaries, the
//! `addic`/`addic.` pair and the OE-enabled arithmetic forms all re-read the
//! distinguishing bit from the word itself.

use crate::Ins;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // immediate arithmetic & compares
    Twi,
    Mulli,
    Subfic,
    Cmpli,
    Cmpi,
    /// `addic` and `addic.`; the primary's low bit selects the record form.
    Addic,
    Addi,
    Addis,

    // branches & system entry
    Bc,
    Sc,
    B,

    // 0x13 group
    Mcrf,
    Bclr,
    Crnor,
    Rfi,
    Crandc,
    Isync,
    Crxor,
    Crnand,
    Crand,
    Creqv,
    Crorc,
    Cror,
    Bcctr,

    // rotates & immediate logic
    Rlwimi,
    Rlwinm,
    Rlwnm,
    Ori,
    Oris,
    Xori,
    Xoris,
    AndiRecord,
    AndisRecord,

    // 0x1F group: integer, logic, compares, indexed load/store, system
    Cmp,
    Tw,
    Subfc,
    Addc,
    Mulhwu,
    Mfcr,
    Lwarx,
    Lwzx,
    Slw,
    Cntlzw,
    And,
    Cmpl,
    Subf,
    Dcbst,
    Lwzux,
    Andc,
    Mulhw,
    Mfmsr,
    Dcbf,
    Lbzx,
    Neg,
    Lbzux,
    Nor,
    Subfe,
    Adde,
    Mtcrf,
    Mtmsr,
    StwcxRecord,
    Stwx,
    Stwux,
    Subfze,
    Addze,
    Mtsr,
    Stbx,
    Subfme,
    Addme,
    Mullw,
    Mtsrin,
    Dcbtst,
    Stbux,
    Add,
    Dcbt,
    Lhzx,
    Eqv,
    Tlbie,
    Eciwx,
    Lhzux,
    Xor,
    Mfspr,
    Lhax,
    Tlbia,
    Mftb,
    Lhaux,
    Sthx,
    Orc,
    Ecowx,
    Sthux,
    Or,
    Divwu,
    Mtspr,
    Dcbi,
    Nand,
    Divw,
    Mcrxr,
    Lswx,
    Lwbrx,
    Lfsx,
    Srw,
    Tlbsync,
    Lfsux,
    Mfsr,
    Lswi,
    Sync,
    Lfdx,
    Lfdux,
    Mfsrin,
    Stswx,
    Stwbrx,
    Stfsx,
    Stfsux,
    Stswi,
    Stfdx,
    Dcba,
    Stfdux,
    Lhbrx,
    Sraw,
    Srawi,
    Eieio,
    Sthbrx,
    Extsh,
    Extsb,
    Icbi,
    Stfiwx,
    Dcbz,

    // displacement loads/stores; the primary's low bit selects the update form
    Lwz,
    Lbz,
    Stw,
    Stb,
    Lhz,
    Lha,
    Sth,
    Lmw,
    Stmw,
    Lfs,
    Lfd,
    Stfs,
    Stfd,

    // 0x3B group: single-precision FP
    Fdivs,
    Fsubs,
    Fadds,
    Fsqrts,
    Fres,
    Fmuls,
    Fmsubs,
    Fmadds,
    Fnmsubs,
    Fnmadds,

    // 0x3F group: double-precision FP and FP misc
    Fdiv,
    Fsub,
    Fadd,
    Fsqrt,
    Fsel,
    Fmul,
    Frsqrte,
    Fmsub,
    Fmadd,
    Fnmsub,
    Fnmadd,
    Fcmpu,
    Frsp,
    Fctiw,
    Fctiwz,
    Fcmpo,
    Mtfsb1,
    Fneg,
    Mcrfs,
    Mtfsb0,
    Fmr,
    Mtfsfi,
    Fnabs,
    Fabs,
    Mffs,
    Mtfsf,

    /// No handler is assigned to this encoding.
    Invalid,
}

impl Opcode {
    /// Classifies an instruction word.
    pub fn decode(ins: Ins) -> Self {
        match ins.field_opcd() {
            0x03 => Self::Twi,
            0x07 => Self::Mulli,
            0x08 => Self::Subfic,
            0x0A => Self::Cmpli,
            0x0B => Self::Cmpi,
            0x0C | 0x0D => Self::Addic,
            0x0E => Self::Addi,
            0x0F => Self::Addis,
            0x10 => Self::Bc,
            0x11 => Self::Sc,
            0x12 => Self::B,
            0x13 => Self::decode_cr_group(ins),
            0x14 => Self::Rlwimi,
            0x15 => Self::Rlwinm,
            0x17 => Self::Rlwnm,
            0x18 => Self::Ori,
            0x19 => Self::Oris,
            0x1A => Self::Xori,
            0x1B => Self::Xoris,
            0x1C => Self::AndiRecord,
            0x1D => Self::AndisRecord,
            0x1F => Self::decode_ext_group(ins),
            0x20 | 0x21 => Self::Lwz,
            0x22 | 0x23 => Self::Lbz,
            0x24 | 0x25 => Self::Stw,
            0x26 | 0x27 => Self::Stb,
            0x28 | 0x29 => Self::Lhz,
            0x2A | 0x2B => Self::Lha,
            0x2C | 0x2D => Self::Sth,
            0x2E => Self::Lmw,
            0x2F => Self::Stmw,
            0x30 | 0x31 => Self::Lfs,
            0x32 | 0x33 => Self::Lfd,
            0x34 | 0x35 => Self::Stfs,
            0x36 | 0x37 => Self::Stfd,
            0x3B => Self::decode_fp_single_group(ins),
            0x3F => Self::decode_fp_double_group(ins),
            _ => Self::Invalid,
        }
    }

    /// Secondary dispatch for primary `0x13`: CR logic and extended branches.
    fn decode_cr_group(ins: Ins) -> Self {
        match ins.field_xopcd() {
            0x000 => Self::Mcrf,
            0x010 => Self::Bclr,
            0x021 => Self::Crnor,
            0x031 => Self::Rfi,
            0x081 => Self::Crandc,
            0x096 => Self::Isync,
            0x0C1 => Self::Crxor,
            0x0E1 => Self::Crnand,
            0x101 => Self::Crand,
            0x121 => Self::Creqv,
            0x1A1 => Self::Crorc,
            0x1C1 => Self::Cror,
            0x210 => Self::Bcctr,
            _ => Self::Invalid,
        }
    }

    /// Secondary dispatch for primary `0x1F`, the largest group. The
    /// OE-enabled arithmetic encodings differ from their base form only in
    /// bit 9 of the extended opcode and decode to the same variant.
    fn decode_ext_group(ins: Ins) -> Self {
        match ins.field_xopcd() {
            0x000 => Self::Cmp,
            0x004 => Self::Tw,
            0x008 | 0x208 => Self::Subfc,
            0x00A | 0x20A => Self::Addc,
            0x00B => Self::Mulhwu,
            0x013 => Self::Mfcr,
            0x014 => Self::Lwarx,
            0x017 => Self::Lwzx,
            0x018 => Self::Slw,
            0x01A => Self::Cntlzw,
            0x01C => Self::And,
            0x020 => Self::Cmpl,
            0x028 | 0x228 => Self::Subf,
            0x036 => Self::Dcbst,
            0x037 => Self::Lwzux,
            0x03C => Self::Andc,
            0x04B => Self::Mulhw,
            0x053 => Self::Mfmsr,
            0x056 => Self::Dcbf,
            0x057 => Self::Lbzx,
            0x058 | 0x258 => Self::Neg,
            0x077 => Self::Lbzux,
            0x07C => Self::Nor,
            0x088 | 0x288 => Self::Subfe,
            0x08A | 0x28A => Self::Adde,
            0x090 => Self::Mtcrf,
            0x092 => Self::Mtmsr,
            0x096 => Self::StwcxRecord,
            0x097 => Self::Stwx,
            0x0B7 => Self::Stwux,
            0x0C8 | 0x2C8 => Self::Subfze,
            0x0CA | 0x2CA => Self::Addze,
            0x0D2 => Self::Mtsr,
            0x0D7 => Self::Stbx,
            0x0E8 | 0x2E8 => Self::Subfme,
            0x0EA | 0x2EA => Self::Addme,
            0x0EB | 0x2EB => Self::Mullw,
            0x0F2 => Self::Mtsrin,
            0x0F6 => Self::Dcbtst,
            0x0F7 => Self::Stbux,
            0x10A | 0x30A => Self::Add,
            0x116 => Self::Dcbt,
            0x117 => Self::Lhzx,
            0x11C => Self::Eqv,
            0x132 => Self::Tlbie,
            0x136 => Self::Eciwx,
            0x137 => Self::Lhzux,
            0x13C => Self::Xor,
            0x153 => Self::Mfspr,
            0x157 => Self::Lhax,
            0x172 => Self::Tlbia,
            0x173 => Self::Mftb,
            0x177 => Self::Lhaux,
            0x197 => Self::Sthx,
            0x19C => Self::Orc,
            0x1B6 => Self::Ecowx,
            0x1B7 => Self::Sthux,
            0x1BC => Self::Or,
            0x1CB | 0x3CB => Self::Divwu,
            0x1D3 => Self::Mtspr,
            0x1D6 => Self::Dcbi,
            0x1DC => Self::Nand,
            0x1EB | 0x3EB => Self::Divw,
            0x200 => Self::Mcrxr,
            0x215 => Self::Lswx,
            0x216 => Self::Lwbrx,
            0x217 => Self::Lfsx,
            0x218 => Self::Srw,
            0x236 => Self::Tlbsync,
            0x237 => Self::Lfsux,
            0x253 => Self::Mfsr,
            0x255 => Self::Lswi,
            0x256 => Self::Sync,
            0x257 => Self::Lfdx,
            0x277 => Self::Lfdux,
            0x293 => Self::Mfsrin,
            0x295 => Self::Stswx,
            0x296 => Self::Stwbrx,
            0x297 => Self::Stfsx,
            0x2B7 => Self::Stfsux,
            0x2E5 => Self::Stswi,
            0x2E7 => Self::Stfdx,
            0x2F6 => Self::Dcba,
            0x2F7 => Self::Stfdux,
            0x316 => Self::Lhbrx,
            0x318 => Self::Sraw,
            0x338 => Self::Srawi,
            0x356 => Self::Eieio,
            0x396 => Self::Sthbrx,
            0x39A => Self::Extsh,
            0x3BA => Self::Extsb,
            0x3D6 => Self::Icbi,
            0x3D7 => Self::Stfiwx,
            0x3F6 => Self::Dcbz,
            _ => Self::Invalid,
        }
    }

    /// Secondary dispatch for primary `0x3B`: single-precision FP, keyed on
    /// the 5-bit short extended opcode.
    fn decode_fp_single_group(ins: Ins) -> Self {
        match ins.field_short_xopcd() {
            0x12 => Self::Fdivs,
            0x14 => Self::Fsubs,
            0x15 => Self::Fadds,
            0x16 => Self::Fsqrts,
            0x18 => Self::Fres,
            0x19 => Self::Fmuls,
            0x1C => Self::Fmsubs,
            0x1D => Self::Fmadds,
            0x1E => Self::Fnmsubs,
            0x1F => Self::Fnmadds,
            _ => Self::Invalid,
        }
    }

    /// Secondary dispatch for primary `0x3F`: the short extended opcode when
    /// its 0x10 bit is set (the arithmetic forms, which carry an frC
    /// operand), the full 10-bit field otherwise.
    fn decode_fp_double_group(ins: Ins) -> Self {
        let short = ins.field_short_xopcd();
        if short & 0x10 != 0 {
            match short {
                0x12 => Self::Fdiv,
                0x14 => Self::Fsub,
                0x15 => Self::Fadd,
                0x16 => Self::Fsqrt,
                0x17 => Self::Fsel,
                0x19 => Self::Fmul,
                0x1A => Self::Frsqrte,
                0x1C => Self::Fmsub,
                0x1D => Self::Fmadd,
                0x1E => Self::Fnmsub,
                0x1F => Self::Fnmadd,
                _ => Self::Invalid,
            }
        } else {
            match ins.field_xopcd() {
                0x000 => Self::Fcmpu,
                0x00C => Self::Frsp,
                0x00E => Self::Fctiw,
                0x00F => Self::Fctiwz,
                0x020 => Self::Fcmpo,
                0x026 => Self::Mtfsb1,
                0x028 => Self::Fneg,
                0x040 => Self::Mcrfs,
                0x046 => Self::Mtfsb0,
                0x048 => Self::Fmr,
                0x086 => Self::Mtfsfi,
                0x088 => Self::Fnabs,
                0x108 => Self::Fabs,
                0x247 => Self::Mffs,
                0x2C7 => Self::Mtfsf,
                _ => Self::Invalid,
            }
        }
    }
}
