//! Textual disassembly.
//!
//! Rendering is structurally parallel to the executor: both dispatch on
//! [`Opcode`], so an encoding reaches the same semantic on both paths. The
//! buffer driver is a two-pass linear sweep that collects branch targets on
//! the first pass and interleaves `labelXXXXXXXX:` anchors on the second.

use crate::{
    Address, Ins, Opcode,
    names::{bc_mnemonic, spr_name},
};
use std::collections::BTreeSet;

/// Disassembles a buffer of instruction words (big-endian bytes, length a
/// multiple of 4) starting at `pc`, one line per instruction, with label
/// anchors for every branch target discovered inside the buffer.
pub fn disassemble(data: &[u8], pc: Address) -> String {
    let mut labels = BTreeSet::new();
    let mut lines = Vec::new();

    let mut at = pc;
    for chunk in data.chunks_exact(4) {
        let word = u32::from_be_bytes(chunk.try_into().unwrap());
        lines.push(render(at, Ins::new(word), &mut labels));
        at += 4u32;
    }

    let mut out = String::new();
    let mut pending = labels.into_iter().peekable();
    let mut at = pc;
    for (chunk, line) in data.chunks_exact(4).zip(lines) {
        while let Some(label) = pending.next_if(|&l| l <= at.value()) {
            out.push_str(&format!("label{label:08X}:\n"));
        }

        let word = u32::from_be_bytes(chunk.try_into().unwrap());
        out.push_str(&format!("{:08X}  {word:08X}  {line}\n", at.value()));
        at += 4u32;
    }

    out
}

/// Disassembles a single instruction word. No label anchors are produced.
pub fn disassemble_one(pc: Address, word: u32) -> String {
    let mut labels = BTreeSet::new();
    render(pc, Ins::new(word), &mut labels)
}

fn pad(mnemonic: &str) -> String {
    format!("{mnemonic:<10}")
}

fn suffix_rc(base: &str, rc: bool) -> String {
    if rc { format!("{base}.") } else { base.to_string() }
}

fn suffix_o_rc(base: &str, oe: bool, rc: bool) -> String {
    let mut s = base.to_string();
    if oe {
        s.push('o');
    }
    if rc {
        s.push('.');
    }
    s
}

// The operand-format helper family. Names describe the operand order the
// text carries: `d`, `a`, `b` are register fields, `r` marks an Rc-dot
// suffix, `o` an OE suffix.

fn fmt_a_b(ins: Ins, name: &str) -> String {
    format!("{}r{}, r{}", pad(name), ins.field_ra(), ins.field_rb())
}

fn fmt_d_a_b(ins: Ins, name: &str) -> String {
    format!(
        "{}r{}, r{}, r{}",
        pad(name),
        ins.field_rd(),
        ins.field_ra(),
        ins.field_rb()
    )
}

fn fmt_d_a_b_r(ins: Ins, base: &str) -> String {
    format!(
        "{}r{}, r{}, r{}",
        pad(&suffix_rc(base, ins.field_rc())),
        ins.field_rd(),
        ins.field_ra(),
        ins.field_rb()
    )
}

fn fmt_s_a_b(ins: Ins, name: &str) -> String {
    format!(
        "{}r{}, r{}, r{}",
        pad(name),
        ins.field_ra(),
        ins.field_rs(),
        ins.field_rb()
    )
}

fn fmt_s_a_b_r(ins: Ins, base: &str) -> String {
    fmt_s_a_b(ins, &suffix_rc(base, ins.field_rc()))
}

fn fmt_s_a_r(ins: Ins, base: &str) -> String {
    format!(
        "{}r{}, r{}",
        pad(&suffix_rc(base, ins.field_rc())),
        ins.field_ra(),
        ins.field_rs()
    )
}

fn fmt_d_a_o_r(ins: Ins, base: &str) -> String {
    format!(
        "{}r{}, r{}",
        pad(&suffix_o_rc(base, ins.field_oe(), ins.field_rc())),
        ins.field_rd(),
        ins.field_ra()
    )
}

fn fmt_d_a_b_o_r(ins: Ins, base: &str) -> String {
    format!(
        "{}r{}, r{}, r{}",
        pad(&suffix_o_rc(base, ins.field_oe(), ins.field_rc())),
        ins.field_rd(),
        ins.field_ra(),
        ins.field_rb()
    )
}

fn fmt_crb_d_a_b(ins: Ins, name: &str) -> String {
    format!(
        "{}crb{}, crb{}, crb{}",
        pad(name),
        ins.field_rd(),
        ins.field_ra(),
        ins.field_rb()
    )
}

fn fmt_fp_d_b_r(ins: Ins, base: &str) -> String {
    format!(
        "{}f{}, f{}",
        pad(&suffix_rc(base, ins.field_rc())),
        ins.field_rd(),
        ins.field_rb()
    )
}

fn fmt_fp_d_a_b_r(ins: Ins, base: &str) -> String {
    format!(
        "{}f{}, f{}, f{}",
        pad(&suffix_rc(base, ins.field_rc())),
        ins.field_rd(),
        ins.field_ra(),
        ins.field_rb()
    )
}

fn fmt_fp_d_a_c_r(ins: Ins, base: &str) -> String {
    format!(
        "{}f{}, f{}, f{}",
        pad(&suffix_rc(base, ins.field_rc())),
        ins.field_rd(),
        ins.field_ra(),
        ins.field_frc()
    )
}

fn fmt_fp_d_a_b_c_r(ins: Ins, base: &str) -> String {
    format!(
        "{}f{}, f{}, f{}, f{}",
        pad(&suffix_rc(base, ins.field_rc())),
        ins.field_rd(),
        ins.field_ra(),
        ins.field_rb(),
        ins.field_frc()
    )
}

/// Indexed FP loads keep the integer base/index registers but carry an FP
/// data register.
fn fmt_fp_load_x(ins: Ins, name: &str) -> String {
    format!(
        "{}f{}, r{}, r{}",
        pad(name),
        ins.field_rd(),
        ins.field_ra(),
        ins.field_rb()
    )
}

fn fmt_fp_store_x(ins: Ins, name: &str) -> String {
    format!(
        "{}r{}, f{}, r{}",
        pad(name),
        ins.field_ra(),
        ins.field_rs(),
        ins.field_rb()
    )
}

/// The bracketed effective-address operand of displacement loads/stores.
fn ea_operand(ra: u8, imm: i16) -> String {
    if imm < 0 {
        format!("[r{ra} - 0x{:04X}]", -(imm as i32))
    } else if imm > 0 {
        format!("[r{ra} + 0x{imm:04X}]")
    } else {
        format!("[r{ra}]")
    }
}

fn fmt_load_store_imm(ins: Ins, name: &str, store: bool, fp: bool) -> String {
    let data_prefix = if fp { 'f' } else { 'r' };
    let rsd = ins.field_rd();
    let ea = ea_operand(ins.field_ra(), ins.field_simm());

    if store {
        format!("{}{}, {}{}", pad(name), ea, data_prefix, rsd)
    } else {
        format!("{}{}{}, {}", pad(name), data_prefix, rsd, ea)
    }
}

fn fmt_load_store_imm_u(ins: Ins, name: &str, store: bool, fp: bool) -> String {
    let name = if ins.field_update() {
        format!("{name}u")
    } else {
        name.to_string()
    };
    fmt_load_store_imm(ins, &name, store, fp)
}

fn fmt_rotate_imm(ins: Ins, base: &str) -> String {
    format!(
        "{}r{}, r{}, {}, {}, {}",
        pad(&suffix_rc(base, ins.field_rc())),
        ins.field_ra(),
        ins.field_rs(),
        ins.field_sh(),
        ins.field_mb(),
        ins.field_me()
    )
}

fn fmt_fp_compare(ins: Ins, name: &str) -> String {
    let crf = ins.field_crfd();
    let ra = ins.field_ra();
    let rb = ins.field_rb();
    if crf != 0 {
        format!("{}cr{crf}, f{ra}, f{rb}", pad(name))
    } else {
        format!("{}f{ra}, f{rb}", pad(name))
    }
}

/// The 2-character absolute/link suffix of the plain branch forms.
fn branch_suffix(ins: Ins) -> &'static str {
    match (ins.field_aa(), ins.field_lk()) {
        (true, true) => "la",
        (true, false) => "a ",
        (false, true) => "l ",
        (false, false) => "  ",
    }
}

fn render_bc(pc: Address, ins: Ins, labels: &mut BTreeSet<u32>) -> String {
    let bo = ins.field_bo();
    let bi = ins.field_bi();
    let target = pc.value().wrapping_add(ins.field_simm() as i32 as u32);
    labels.insert(target);

    let suffix = branch_suffix(ins);
    let mut ret = match bc_mnemonic(bo, bi) {
        Some(mnemonic) => {
            let mut s = pad(&format!("b{mnemonic}{suffix}"));
            if bi & 0x1C != 0 {
                s.push_str(&format!("cr{}, ", (bi >> 2) & 7));
            }
            s
        }
        None => format!("bc{suffix}     {bo}, {bi}, "),
    };

    ret.push_str(&format!("label{target:08X}"));
    ret
}

fn render_bclr_bcctr(ins: Ins, to: &str) -> String {
    let bo = ins.field_bo();
    let bi = ins.field_bi();
    let link = ins.field_lk();

    match bc_mnemonic(bo, bi) {
        Some(mnemonic) => {
            let mut ret = format!("b{mnemonic}{to}");
            if link {
                ret.push('l');
            }
            if bi & 0x1C != 0 {
                ret = pad(&ret);
                ret.push_str(&format!("cr{}", (bi >> 2) & 7));
            }
            ret
        }
        None => {
            let l = if link { 'l' } else { ' ' };
            let gap = if to == "lr" { "     " } else { "    " };
            format!("bc{to}{l}{gap}{bo}, {bi}")
        }
    }
}

fn render_b(pc: Address, ins: Ins, labels: &mut BTreeSet<u32>) -> String {
    let target = pc.value().wrapping_add(ins.field_li() as u32);
    labels.insert(target);
    format!("b{}       label{target:08X}", branch_suffix(ins))
}

fn render_mfspr(ins: Ins) -> String {
    let rd = ins.field_rd();
    let spr = ins.field_spr();
    match spr_name(spr) {
        Some(name) => format!("{}r{rd}", pad(&format!("mf{name}"))),
        None => format!("{}r{rd}, {spr}", pad("mfspr")),
    }
}

fn render_mtspr(ins: Ins) -> String {
    let rs = ins.field_rs();
    let spr = ins.field_spr();
    match spr_name(spr) {
        Some(name) => format!("{}r{rs}", pad(&format!("mt{name}"))),
        None => format!("{}{spr}, r{rs}", pad("mtspr")),
    }
}

fn render_mftb(ins: Ins) -> String {
    let rd = ins.field_rd();
    match ins.field_spr() {
        268 => format!("{}r{rd}", pad("mftb")),
        269 => format!("{}r{rd}", pad("mftbu")),
        tbr => format!("{}r{rd}, tbr{tbr}", pad("mftb")),
    }
}

/// Compare renderings omit the `crN,` operand when the target is CR0.
fn render_cmp_reg(ins: Ins, name: &str) -> String {
    if ins.0 & 0x0060_0000 != 0 {
        return format!(".invalid  {name}");
    }
    let crf = ins.field_crfd();
    let ra = ins.field_ra();
    let rb = ins.field_rb();
    if crf != 0 {
        format!("{}cr{crf}, r{ra}, r{rb}", pad(name))
    } else {
        format!("{}r{ra}, r{rb}", pad(name))
    }
}

fn render_cmp_imm(ins: Ins, name: &str, mnemonic: &str) -> String {
    if ins.0 & 0x0060_0000 != 0 {
        return format!(".invalid  {name}");
    }
    let crf = ins.field_crfd();
    let ra = ins.field_ra();
    let imm = ins.field_simm();
    if crf != 0 {
        format!("{}cr{crf}, r{ra}, {imm}", pad(mnemonic))
    } else {
        format!("{}r{ra}, {imm}", pad(mnemonic))
    }
}

/// Renders instructions whose entire word is fixed; anything else in the
/// reserved fields makes the encoding invalid.
fn render_fixed(ins: Ins, expected: u32, name: &str) -> String {
    if ins.0 == expected {
        name.to_string()
    } else {
        format!(".invalid  {name}")
    }
}

fn render_invalid(ins: Ins) -> String {
    match ins.field_opcd() {
        0x13 => ".invalid  4C".to_string(),
        0x1F => ".invalid  7C".to_string(),
        0x3B => ".invalid  EC".to_string(),
        0x3F if ins.field_short_xopcd() & 0x10 != 0 => ".invalid  FC, 1".to_string(),
        0x3F => ".invalid  FC, 0".to_string(),
        _ => ".invalid".to_string(),
    }
}

/// Renders one instruction, adding any branch target it references to
/// `labels`.
pub fn render(pc: Address, ins: Ins, labels: &mut BTreeSet<u32>) -> String {
    use Opcode as Op;

    match Opcode::decode(ins) {
        Op::Twi => format!(
            "{}{}, r{}, {}",
            pad("twi"),
            ins.field_rd(),
            ins.field_ra(),
            ins.field_simm()
        ),
        Op::Mulli => format!(
            "{}r{}, r{}, {}",
            pad("mulli"),
            ins.field_rd(),
            ins.field_ra(),
            ins.field_simm()
        ),
        Op::Subfic => format!(
            "{}r{}, r{}, {}",
            pad("subfic"),
            ins.field_rd(),
            ins.field_ra(),
            ins.field_simm()
        ),
        Op::Cmpli => render_cmp_imm(ins, "cmpli", "cmplwi"),
        Op::Cmpi => render_cmp_imm(ins, "cmpi", "cmpwi"),
        Op::Addic => {
            let base = if ins.field_simm() < 0 { "subic" } else { "addic" };
            let imm = (ins.field_simm() as i32).abs();
            format!(
                "{}r{}, r{}, {imm}",
                pad(&suffix_rc(base, ins.field_update())),
                ins.field_rd(),
                ins.field_ra()
            )
        }
        Op::Addi => {
            let rd = ins.field_rd();
            let ra = ins.field_ra();
            let imm = ins.field_simm() as i32;
            if ra == 0 {
                format!("{}r{rd}, {imm}", pad("li"))
            } else if imm < 0 {
                format!("{}r{rd}, r{ra}, {}", pad("subi"), -imm)
            } else {
                format!("{}r{rd}, r{ra}, {imm}", pad("addi"))
            }
        }
        Op::Addis => {
            let rd = ins.field_rd();
            let ra = ins.field_ra();
            let imm = ins.field_simm();
            if ra == 0 {
                format!("{}r{rd}, {imm}", pad("lis"))
            } else if imm < 0 {
                format!("{}r{rd}, r{ra}, {}", pad("subis"), -(imm as i32))
            } else {
                format!("{}r{rd}, r{ra}, {imm}", pad("addis"))
            }
        }
        Op::Bc => render_bc(pc, ins, labels),
        Op::Sc => render_fixed(ins, 0x4400_0002, "sc"),
        Op::B => render_b(pc, ins, labels),

        Op::Mcrf => format!("{}cr{}, cr{}", pad("mcrf"), ins.field_crfd(), ins.field_crfs()),
        Op::Bclr => render_bclr_bcctr(ins, "lr"),
        Op::Crnor => fmt_crb_d_a_b(ins, "crnor"),
        Op::Rfi => render_fixed(ins, 0x4C00_0064, "rfi"),
        Op::Crandc => fmt_crb_d_a_b(ins, "crandc"),
        Op::Isync => render_fixed(ins, 0x4C00_012C, "isync"),
        Op::Crxor => fmt_crb_d_a_b(ins, "crxor"),
        Op::Crnand => fmt_crb_d_a_b(ins, "crnand"),
        Op::Crand => fmt_crb_d_a_b(ins, "crand"),
        Op::Creqv => fmt_crb_d_a_b(ins, "creqv"),
        Op::Crorc => fmt_crb_d_a_b(ins, "crorc"),
        Op::Cror => fmt_crb_d_a_b(ins, "cror"),
        Op::Bcctr => render_bclr_bcctr(ins, "ctr"),

        Op::Rlwimi => fmt_rotate_imm(ins, "rlwimi"),
        Op::Rlwinm => fmt_rotate_imm(ins, "rlwinm"),
        Op::Rlwnm => format!(
            "{}r{}, r{}, r{}, {}, {}",
            pad(&suffix_rc("rlwnm", ins.field_rc())),
            ins.field_ra(),
            ins.field_rs(),
            ins.field_rb(),
            ins.field_mb(),
            ins.field_me()
        ),
        Op::Ori => {
            let rs = ins.field_rs();
            let ra = ins.field_ra();
            let imm = ins.field_uimm();
            if imm == 0 && rs == ra {
                if rs == 0 {
                    "nop".to_string()
                } else {
                    format!("{}r{rs}", pad("nop"))
                }
            } else {
                format!("{}r{ra}, r{rs}, 0x{imm:04X}", pad("ori"))
            }
        }
        Op::Oris => format!(
            "{}r{}, r{}, 0x{:04X}",
            pad("oris"),
            ins.field_ra(),
            ins.field_rs(),
            ins.field_uimm()
        ),
        Op::Xori => format!(
            "{}r{}, r{}, 0x{:04X}",
            pad("xori"),
            ins.field_ra(),
            ins.field_rs(),
            ins.field_uimm()
        ),
        Op::Xoris => format!(
            "{}r{}, r{}, 0x{:04X}",
            pad("xoris"),
            ins.field_ra(),
            ins.field_rs(),
            ins.field_uimm()
        ),
        Op::AndiRecord => format!(
            "{}r{}, r{}, 0x{:04X}",
            pad("andi."),
            ins.field_ra(),
            ins.field_rs(),
            ins.field_uimm()
        ),
        Op::AndisRecord => format!(
            "{}r{}, r{}, 0x{:04X}",
            pad("andis."),
            ins.field_ra(),
            ins.field_rs(),
            ins.field_uimm()
        ),

        Op::Cmp => render_cmp_reg(ins, "cmp"),
        Op::Tw => format!(
            "{}{}, r{}, r{}",
            pad("tw"),
            ins.field_rd(),
            ins.field_ra(),
            ins.field_rb()
        ),
        Op::Subfc => fmt_d_a_b_o_r(ins, "subfc"),
        Op::Addc => fmt_d_a_b_o_r(ins, "addc"),
        Op::Mulhwu => fmt_d_a_b_r(ins, "mulhwu"),
        Op::Mfcr => format!("{}r{}", pad("mfcr"), ins.field_rd()),
        Op::Lwarx => fmt_d_a_b(ins, "lwarx"),
        Op::Lwzx => fmt_d_a_b(ins, "lwzx"),
        Op::Slw => fmt_s_a_b_r(ins, "slw"),
        Op::Cntlzw => format!(
            "{}r{}, r{}",
            pad(&suffix_rc("cntlzw", ins.field_rc())),
            ins.field_ra(),
            ins.field_rs()
        ),
        Op::And => fmt_s_a_b_r(ins, "and"),
        Op::Cmpl => render_cmp_reg(ins, "cmpl"),
        Op::Subf => fmt_d_a_b_o_r(ins, "subf"),
        Op::Dcbst => fmt_a_b(ins, "dcbst"),
        Op::Lwzux => fmt_d_a_b(ins, "lwzux"),
        Op::Andc => fmt_s_a_b_r(ins, "andc"),
        Op::Mulhw => fmt_d_a_b_r(ins, "mulhw"),
        Op::Mfmsr => format!("{}r{}", pad("mfmsr"), ins.field_rd()),
        Op::Dcbf => fmt_a_b(ins, "dcbf"),
        Op::Lbzx => fmt_d_a_b(ins, "lbzx"),
        Op::Neg => fmt_d_a_o_r(ins, "neg"),
        Op::Lbzux => fmt_d_a_b(ins, "lbzux"),
        Op::Nor => fmt_s_a_b_r(ins, "nor"),
        Op::Subfe => fmt_d_a_b_o_r(ins, "subfe"),
        Op::Adde => fmt_d_a_b_o_r(ins, "adde"),
        Op::Mtcrf => {
            let rs = ins.field_rs();
            let crm = ins.field_crm();
            if crm == 0xFF {
                format!("{}r{rs}", pad("mtcr"))
            } else {
                format!("{}0x{crm:02X}, r{rs}", pad("mtcrf"))
            }
        }
        Op::Mtmsr => format!("{}r{}", pad("mtmsr"), ins.field_rs()),
        Op::StwcxRecord => fmt_s_a_b(ins, "stwcx."),
        Op::Stwx => fmt_s_a_b(ins, "stwx"),
        Op::Stwux => fmt_s_a_b(ins, "stwux"),
        Op::Subfze => fmt_d_a_o_r(ins, "subfze"),
        Op::Addze => fmt_d_a_o_r(ins, "addze"),
        Op::Mtsr => format!("{}{}, r{}", pad("mtsr"), ins.field_sr(), ins.field_rs()),
        Op::Stbx => fmt_s_a_b(ins, "stbx"),
        Op::Subfme => fmt_d_a_o_r(ins, "subfme"),
        Op::Addme => fmt_d_a_o_r(ins, "addme"),
        Op::Mullw => fmt_d_a_b_o_r(ins, "mullw"),
        Op::Mtsrin => format!("{}r{}, r{}", pad("mtsr"), ins.field_ra(), ins.field_rs()),
        Op::Dcbtst => fmt_a_b(ins, "dcbtst"),
        Op::Stbux => fmt_s_a_b(ins, "stbux"),
        Op::Add => fmt_d_a_b_o_r(ins, "add"),
        Op::Dcbt => fmt_a_b(ins, "dcbt"),
        Op::Lhzx => fmt_d_a_b(ins, "lhzx"),
        Op::Eqv => fmt_s_a_b_r(ins, "eqv"),
        Op::Tlbie => format!("{}r{}", pad("tlbie"), ins.field_rd()),
        Op::Eciwx => fmt_d_a_b(ins, "eciwx"),
        Op::Lhzux => fmt_d_a_b(ins, "lhzux"),
        Op::Xor => fmt_s_a_b_r(ins, "xor"),
        Op::Mfspr => render_mfspr(ins),
        Op::Lhax => fmt_d_a_b(ins, "lhax"),
        Op::Tlbia => render_fixed(ins, 0x7C00_02E4, "tlbia"),
        Op::Mftb => render_mftb(ins),
        Op::Lhaux => fmt_d_a_b(ins, "lhaux"),
        Op::Sthx => fmt_d_a_b(ins, "sthx"),
        Op::Orc => fmt_d_a_b_r(ins, "orc"),
        Op::Ecowx => fmt_s_a_b(ins, "ecowx"),
        Op::Sthux => fmt_s_a_b(ins, "sthux"),
        Op::Or => {
            let rs = ins.field_rs();
            let rb = ins.field_rb();
            if rs == rb {
                format!(
                    "{}r{}, r{rs}",
                    pad(&suffix_rc("mr", ins.field_rc())),
                    ins.field_ra()
                )
            } else {
                fmt_s_a_b_r(ins, "or")
            }
        }
        Op::Divwu => fmt_d_a_b_o_r(ins, "divwu"),
        Op::Mtspr => render_mtspr(ins),
        Op::Dcbi => fmt_a_b(ins, "dcbi"),
        Op::Nand => fmt_s_a_b_r(ins, "nand"),
        Op::Divw => fmt_d_a_b_o_r(ins, "divw"),
        Op::Mcrxr => format!("{}cr{}", pad("mcrxr"), ins.field_crfd()),
        Op::Lswx => fmt_d_a_b(ins, "lswx"),
        Op::Lwbrx => fmt_d_a_b(ins, "lwbrx"),
        Op::Lfsx => fmt_fp_load_x(ins, "lfsx"),
        Op::Srw => fmt_s_a_b(ins, "srw"),
        Op::Tlbsync => render_fixed(ins, 0x7C00_046C, "tlbsync"),
        Op::Lfsux => fmt_fp_load_x(ins, "lfsux"),
        Op::Mfsr => format!("{}r{}, {}", pad("mfsr"), ins.field_rd(), ins.field_sr()),
        Op::Lswi => {
            let n = match ins.field_rb() {
                0 => 32,
                n => n,
            };
            format!("{}r{}, r{}, {n}", pad("lswi"), ins.field_rd(), ins.field_ra())
        }
        Op::Sync => render_fixed(ins, 0x7C00_04AC, "sync"),
        Op::Lfdx => fmt_fp_load_x(ins, "lfdx"),
        Op::Lfdux => fmt_fp_load_x(ins, "lfdux"),
        Op::Mfsrin => format!("{}r{}, r{}", pad("mfsrin"), ins.field_rd(), ins.field_ra()),
        Op::Stswx => fmt_s_a_b(ins, "stswx"),
        Op::Stwbrx => fmt_s_a_b(ins, "stwbrx"),
        Op::Stfsx => fmt_fp_store_x(ins, "stfsx"),
        Op::Stfsux => fmt_fp_store_x(ins, "stfsux"),
        Op::Stswi => {
            let n = match ins.field_rb() {
                0 => 32,
                n => n,
            };
            format!("{}r{}, r{}, {n}", pad("stswi"), ins.field_ra(), ins.field_rs())
        }
        Op::Stfdx => fmt_fp_store_x(ins, "stfdx"),
        Op::Dcba => fmt_a_b(ins, "dcba"),
        Op::Stfdux => fmt_fp_store_x(ins, "stfdux"),
        Op::Lhbrx => fmt_d_a_b(ins, "lhbrx"),
        Op::Sraw => fmt_s_a_b(ins, "sraw"),
        Op::Srawi => format!(
            "{}r{}, r{}, {}",
            pad("srawi"),
            ins.field_ra(),
            ins.field_rs(),
            ins.field_sh()
        ),
        Op::Eieio => render_fixed(ins, 0x7C00_06AC, "eieio"),
        Op::Sthbrx => fmt_s_a_b(ins, "sthbrx"),
        Op::Extsh => fmt_s_a_r(ins, "extsh"),
        Op::Extsb => fmt_s_a_r(ins, "extsb"),
        Op::Icbi => fmt_a_b(ins, "icbi"),
        Op::Stfiwx => fmt_fp_store_x(ins, "stfiwx"),
        Op::Dcbz => fmt_a_b(ins, "dcbz"),

        Op::Lwz => fmt_load_store_imm_u(ins, "lwz", false, false),
        Op::Lbz => fmt_load_store_imm_u(ins, "lbz", false, false),
        Op::Stw => fmt_load_store_imm_u(ins, "stw", true, false),
        Op::Stb => fmt_load_store_imm_u(ins, "stb", true, false),
        Op::Lhz => fmt_load_store_imm_u(ins, "lhz", false, false),
        Op::Lha => fmt_load_store_imm_u(ins, "lha", false, false),
        Op::Sth => fmt_load_store_imm_u(ins, "sth", true, false),
        Op::Lmw => fmt_load_store_imm(ins, "lmw", false, false),
        Op::Stmw => fmt_load_store_imm(ins, "stmw", true, false),
        Op::Lfs => fmt_load_store_imm_u(ins, "lfs", false, true),
        Op::Lfd => fmt_load_store_imm_u(ins, "lfd", false, true),
        Op::Stfs => fmt_load_store_imm_u(ins, "stfs", true, true),
        Op::Stfd => fmt_load_store_imm_u(ins, "stfd", true, true),

        Op::Fdivs => fmt_fp_d_a_b_r(ins, "fdivs"),
        Op::Fsubs => fmt_fp_d_a_b_r(ins, "fsubs"),
        Op::Fadds => fmt_fp_d_a_b_r(ins, "fadds"),
        Op::Fsqrts => fmt_fp_d_b_r(ins, "fsqrts"),
        Op::Fres => fmt_fp_d_b_r(ins, "fres"),
        Op::Fmuls => fmt_fp_d_a_c_r(ins, "fmuls"),
        Op::Fmsubs => fmt_fp_d_a_b_c_r(ins, "fmsubs"),
        Op::Fmadds => fmt_fp_d_a_b_c_r(ins, "fmadds"),
        Op::Fnmsubs => fmt_fp_d_a_b_c_r(ins, "fnmsubs"),
        Op::Fnmadds => fmt_fp_d_a_b_c_r(ins, "fnmadds"),

        Op::Fdiv => fmt_fp_d_a_b_r(ins, "fdiv"),
        Op::Fsub => fmt_fp_d_a_b_r(ins, "fsub"),
        Op::Fadd => fmt_fp_d_a_b_r(ins, "fadd"),
        Op::Fsqrt => fmt_fp_d_b_r(ins, "fsqrt"),
        Op::Fsel => fmt_fp_d_a_b_c_r(ins, "fsel"),
        Op::Fmul => fmt_fp_d_a_c_r(ins, "fmul"),
        Op::Frsqrte => fmt_fp_d_b_r(ins, "frsqrte"),
        Op::Fmsub => fmt_fp_d_a_b_c_r(ins, "fmsub"),
        Op::Fmadd => fmt_fp_d_a_b_c_r(ins, "fmadd"),
        Op::Fnmsub => fmt_fp_d_a_b_c_r(ins, "fnmsub"),
        Op::Fnmadd => fmt_fp_d_a_b_c_r(ins, "fnmadd"),
        Op::Fcmpu => fmt_fp_compare(ins, "fcmpu"),
        Op::Fcmpo => fmt_fp_compare(ins, "fcmpo"),
        Op::Frsp => fmt_fp_d_b_r(ins, "frsp"),
        Op::Fctiw => fmt_fp_d_b_r(ins, "fctiw"),
        Op::Fctiwz => fmt_fp_d_b_r(ins, "fctiwz"),
        Op::Mtfsb1 => format!(
            "{}crb{}",
            pad(&suffix_rc("mtfsb1", ins.field_rc())),
            ins.field_rd()
        ),
        Op::Fneg => fmt_fp_d_b_r(ins, "fneg"),
        Op::Mcrfs => format!("{}cr{}, cr{}", pad("mcrfs"), ins.field_crfd(), ins.field_crfs()),
        Op::Mtfsb0 => format!(
            "{}crb{}",
            pad(&suffix_rc("mtfsb0", ins.field_rc())),
            ins.field_rd()
        ),
        Op::Fmr => fmt_fp_d_b_r(ins, "fmr"),
        Op::Mtfsfi => format!(
            "{}cr{}, 0x{:X}",
            pad(&suffix_rc("mtfsfi", ins.field_rc())),
            ins.field_crfd(),
            ins.field_fs_imm()
        ),
        Op::Fnabs => fmt_fp_d_b_r(ins, "fnabs"),
        Op::Fabs => fmt_fp_d_b_r(ins, "fabs"),
        Op::Mffs => format!(
            "{}f{}",
            pad(&suffix_rc("mffs", ins.field_rc())),
            ins.field_rd()
        ),
        Op::Mtfsf => format!(
            "{}0x{:02X}, f{}",
            pad(&suffix_rc("mtfsf", ins.field_rc())),
            ins.field_fm(),
            ins.field_rb()
        ),

        Op::Invalid => render_invalid(ins),
    }
}

#[cfg(test)]
mod tests {
    use super::{disassemble, disassemble_one};
    use crate::Address;

    fn one(word: u32) -> String {
        disassemble_one(Address(0x1000), word)
    }

    #[test]
    fn or_with_equal_sources_renders_as_mr() {
        assert_eq!(one(0x7C6B_1B78), "mr        r11, r3");
        // distinct rB keeps the plain rendering
        assert_eq!(one(0x7C6B_2B78), "or        r11, r3, r5");
    }

    #[test]
    fn addi_with_negative_immediate_renders_as_subi() {
        assert_eq!(one(0x3863_FFFF), "subi      r3, r3, 1");
    }

    #[test]
    fn addi_with_zero_base_renders_as_li() {
        assert_eq!(one(0x3860_0005), "li        r3, 5");
    }

    #[test]
    fn lis_uses_the_two_operand_form() {
        assert_eq!(one(0x3C60_8000), "lis       r3, -32768");
    }

    #[test]
    fn rlwinm_renders_all_five_operands() {
        assert_eq!(one(0x5463_0036), "rlwinm    r3, r3, 0, 0, 27");
    }

    #[test]
    fn branch_mnemonics() {
        assert_eq!(one(0x4E80_0020), "blr");
        assert_eq!(one(0x4E80_0421), "bctrl");
        // beq cr7, forward 8
        assert_eq!(one(0x419E_0008), "beq       cr7, label00001008");
        // bne (cr0), backward 4
        assert_eq!(one(0x4082_FFFC), "bne       label00000FFC");
        // bdnz
        assert_eq!(one(0x4200_FFF8), "bdnz      label00000FF8");
        // plain b
        assert_eq!(one(0x4800_0010), "b         label00001010");
        // bl
        assert_eq!(one(0x4800_0011), "bl        label00001010");
    }

    #[test]
    fn numeric_bc_fallback() {
        // BO=0b00010 (cond false and CTR zero) has no simplified mnemonic
        assert_eq!(one(0x4040_0008), "bc       2, 0, label00001008");
    }

    #[test]
    fn loads_and_stores_use_bracketed_operands() {
        assert_eq!(one(0x8083_0010), "lwz       r4, [r3 + 0x0010]");
        assert_eq!(one(0x8483_FFF0), "lwzu      r4, [r3 - 0x0010]");
        assert_eq!(one(0x9083_0000), "stw       [r3], r4");
        assert_eq!(one(0xC023_0008), "lfs       f1, [r3 + 0x0008]");
        assert_eq!(one(0xD823_0008), "stfd      [r3 + 0x0008], f1");
    }

    #[test]
    fn spr_moves_use_symbolic_names() {
        assert_eq!(one(0x7C68_02A6), "mflr      r3");
        assert_eq!(one(0x7C69_03A6), "mtctr     r3");
        assert_eq!(one(0x7C64_02A6), "mfspr     r3, 4");
    }

    #[test]
    fn fixed_encodings_reject_reserved_bits() {
        assert_eq!(one(0x4400_0002), "sc");
        assert_eq!(one(0x4400_0003), ".invalid  sc");
        assert_eq!(one(0x7C00_04AC), "sync");
        assert_eq!(one(0x7C01_04AC), ".invalid  sync");
        assert_eq!(one(0x4C00_012C), "isync");
    }

    #[test]
    fn compares_omit_cr0() {
        assert_eq!(one(0x2C03_0000), "cmpwi     r3, 0");
        assert_eq!(one(0x2F83_0005), "cmpwi     cr7, r3, 5");
        // cmpi with reserved bits set
        assert_eq!(one(0x2C63_0000), ".invalid  cmpi");
        // negative unsigned-compare immediate still renders signed
        assert_eq!(one(0x2803_8000), "cmplwi    r3, -32768");
    }

    #[test]
    fn invalid_groups_are_tagged() {
        assert_eq!(one(0x0000_0000), ".invalid");
        assert_eq!(one(0x7C00_0002), ".invalid  7C");
        assert_eq!(one(0x4C00_0002), ".invalid  4C");
        assert_eq!(one(0xEC00_0000), ".invalid  EC");
    }

    #[test]
    fn ori_to_self_renders_as_nop() {
        assert_eq!(one(0x6000_0000), "nop");
        assert_eq!(one(0x6063_0000), "nop       r3");
        assert_eq!(one(0x6064_0000), "ori       r4, r3, 0x0000");
    }

    #[test]
    fn buffer_sweep_emits_labels() {
        // 0x1000: b +8; 0x1004: nop; 0x1008: blr
        let words: [u32; 3] = [0x4800_0008, 0x6000_0000, 0x4E80_0020];
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_be_bytes()).collect();

        let text = disassemble(&bytes, Address(0x1000));
        let expected = "\
00001000  48000008  b         label00001008\n\
00001004  60000000  nop\n\
label00001008:\n\
00001008  4E800020  blr\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn rendering_is_stable() {
        let sample = [
            0x7C6B_2B78,
            0x3863_FFFF,
            0x5463_0036,
            0x4E80_0020,
            0x8083_0010,
            0x7C68_02A6,
            0x0000_0000,
            0xFC20_0890,
        ];
        for word in sample {
            assert_eq!(one(word), one(word));
        }
    }

    #[test]
    fn fp_arithmetic_renders() {
        // fadd f1, f2, f3
        assert_eq!(one(0xFC22_182A), "fadd      f1, f2, f3");
        // fmadds f1, f2, f4, f3  (frC is the multiplicand)
        assert_eq!(one(0xEC22_193A), "fmadds    f1, f2, f3, f4");
        // fmr f1, f2
        assert_eq!(one(0xFC20_1090), "fmr       f1, f2");
    }
}
