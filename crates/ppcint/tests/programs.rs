//! End-to-end programs driven through the full step loop.

use ppc32::Address;
use ppcint::{Exit, Interpreter, InterruptCheck, Ram, StepError};

const RAM_BASE: Address = Address(0x1000);

fn machine_with(words: &[u32]) -> Interpreter<Ram> {
    let mut ram = Ram::new(RAM_BASE, bytesize::kib(64u64) as usize);
    let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_be_bytes()).collect();
    ram.load(RAM_BASE, &bytes);

    let mut interp = Interpreter::new(ram);
    interp.regs_mut().pc = RAM_BASE;
    interp
}

#[test]
fn three_instruction_program() {
    // li r3, 5; li r4, 3; add r3, r3, r4
    let mut interp = machine_with(&[0x3860_0005, 0x3880_0003, 0x7C63_2214]);

    for _ in 0..3 {
        assert!(interp.step().unwrap().is_none());
    }

    assert_eq!(interp.regs().gpr[3], 8);
    assert_eq!(interp.regs().gpr[4], 3);
    assert_eq!(interp.regs().pc, Address(0x100C));
    assert_eq!(interp.regs().tbr, 3);
}

#[test]
fn blr_jumps_to_lr() {
    let mut interp = machine_with(&[0x4E80_0020]);
    interp.regs_mut().lr = 0x2000;

    interp.step().unwrap();
    assert_eq!(interp.regs().pc, Address(0x2000));
}

#[test]
fn bl_links_and_branches() {
    // b +4 with LK
    let mut interp = machine_with(&[0x4800_0005, 0x6000_0000]);

    interp.step().unwrap();
    assert_eq!(interp.regs().lr, 0x1004);
    assert_eq!(interp.regs().pc, Address(0x1004));
}

#[test]
fn absolute_branch_with_link() {
    // b with AA=1, LK=1, target 0
    let mut interp = machine_with(&[0x4800_0003]);

    interp.step().unwrap();
    assert_eq!(interp.regs().lr, 0x1004);
    assert_eq!(interp.regs().pc, Address(0));
}

#[test]
fn branch_always_ignores_ctr() {
    // bc with BO=0b10100: always taken, CTR untouched
    let mut interp = machine_with(&[0x4280_0008]);
    interp.regs_mut().ctr = 7;

    interp.step().unwrap();
    assert_eq!(interp.regs().pc, Address(0x1008));
    assert_eq!(interp.regs().ctr, 7);
}

#[test]
fn bdnz_loop_runs_to_completion() {
    // li r3, 0; addi r3, r3, 1; bdnz -4; sc
    let mut interp = machine_with(&[0x3860_0000, 0x3863_0001, 0x4200_FFFC, 0x4400_0002]);
    interp.regs_mut().ctr = 5;
    interp.hooks.syscall = Some(Box::new(|_| false));

    let exit = interp.run().unwrap();
    assert_eq!(exit, Exit::Syscall);
    assert_eq!(interp.regs().gpr[3], 5);
    assert_eq!(interp.regs().ctr, 0);
}

#[test]
fn addis_builds_high_halves() {
    // lis r3, 0x8000
    let mut interp = machine_with(&[0x3C60_8000]);

    interp.step().unwrap();
    assert_eq!(interp.regs().gpr[3], 0x8000_0000);
}

#[test]
fn debug_hook_can_stop_the_run() {
    // an infinite loop: b .
    let mut interp = machine_with(&[0x4800_0000]);

    let mut remaining = 10u32;
    interp.hooks.debug = Some(Box::new(move |_| {
        remaining -= 1;
        remaining > 0
    }));

    let exit = interp.run().unwrap();
    assert_eq!(exit, Exit::DebugHook);
}

struct CycleLimit(u64);

impl InterruptCheck for CycleLimit {
    fn on_cycle_start(&mut self) -> bool {
        if self.0 == 0 {
            return false;
        }
        self.0 -= 1;
        true
    }
}

#[test]
fn interrupt_check_bounds_the_run() {
    let mut interp = machine_with(&[0x4800_0000]);
    interp.set_interrupt_check(Box::new(CycleLimit(25)));

    let exit = interp.run().unwrap();
    assert_eq!(exit, Exit::Interrupt);
    assert_eq!(interp.regs().tbr, 25);
}

#[test]
fn syscall_handler_reads_registers() {
    // li r3, 42; sc; b .
    let mut interp = machine_with(&[0x3860_002A, 0x4400_0002, 0x4800_0000]);
    interp.hooks.syscall = Some(Box::new(|machine| {
        assert_eq!(machine.regs.gpr[3], 42);
        machine.regs.gpr[3] = 0;
        false
    }));

    let exit = interp.run().unwrap();
    assert_eq!(exit, Exit::Syscall);
    assert_eq!(interp.regs().gpr[3], 0);
    // the exiting step still completed
    assert_eq!(interp.regs().pc, Address(0x1008));
}

#[test]
fn sc_without_a_handler_faults() {
    let mut interp = machine_with(&[0x4400_0002]);
    let err = interp.run().unwrap_err();
    assert!(matches!(err, StepError::Unimplemented { .. }));
}

#[test]
fn fetch_outside_memory_faults() {
    let mut interp = machine_with(&[]);
    interp.regs_mut().pc = Address(0);

    let err = interp.run().unwrap_err();
    assert!(matches!(err, StepError::Bus { .. }));
}

#[test]
fn invalid_opcode_faults_and_keeps_state() {
    // li r3, 7; .invalid
    let mut interp = machine_with(&[0x3860_0007, 0x0000_0000]);

    assert!(interp.step().unwrap().is_none());
    let err = interp.step().unwrap_err();

    assert!(matches!(err, StepError::Invalid { .. }));
    assert_eq!(interp.regs().gpr[3], 7);
    assert_eq!(interp.regs().pc, Address(0x1004));
}

#[test]
fn fp_arithmetic_faults_with_disassembly() {
    // fadd f1, f2, f3
    let mut interp = machine_with(&[0xFC22_182A]);

    match interp.run() {
        Err(StepError::Unimplemented { word, dasm, .. }) => {
            assert_eq!(word, 0xFC22_182A);
            assert_eq!(dasm, "fadd      f1, f2, f3");
        }
        other => panic!("expected an unimplemented fault, got {other:?}"),
    }
}

#[test]
fn store_program_round_trips_through_memory() {
    // lis r4, 0x0000 (base); stw [r4 + 0x100], r3 ... then lwz r5, [r4 + 0x100]
    // r4 = 0x1000 built with li
    let mut interp = machine_with(&[
        0x3880_1000, // li r4, 0x1000
        0x3C60_DEAD, // lis r3, 0xDEAD
        0x6063_BEEF, // ori r3, r3, 0xBEEF
        0x9064_0100, // stw [r4 + 0x100], r3
        0x80A4_0100, // lwz r5, [r4 + 0x100]
    ]);

    for _ in 0..5 {
        assert!(interp.step().unwrap().is_none());
    }

    assert_eq!(interp.regs().gpr[5], 0xDEAD_BEEF);
    assert_eq!(interp.regs().debug_addr, Address(0x1100));
}

#[test]
fn update_form_advances_the_base() {
    // li r4, 0x1100; stwu r3, 8(r4); r4 becomes 0x1108
    let mut interp = machine_with(&[0x3880_1100, 0x9464_0008]);
    interp.regs_mut().gpr[3] = 0x55;

    interp.step().unwrap();
    interp.step().unwrap();

    assert_eq!(interp.regs().gpr[4], 0x1108);
    let mem = interp.machine.mem.bytes();
    assert_eq!(&mem[0x108..0x10C], &0x55u32.to_be_bytes());
}

#[test]
fn time_base_scales_with_tick_rate() {
    let mut interp = machine_with(&[0x6000_0000, 0x6000_0000]);
    interp.regs_mut().tbr_ticks_per_cycle = 16;

    interp.step().unwrap();
    interp.step().unwrap();
    assert_eq!(interp.regs().tbr, 32);
}
