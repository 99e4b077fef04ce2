//! A PPC32 user-mode interpreter.
//!
//! The interpreter owns a [`Machine`] (register file plus guest memory) and
//! steps it through a fetch/decode/dispatch cycle. Hosts participate through
//! three hooks: a syscall handler invoked on `sc`, a debug hook consulted
//! before every instruction, and an interrupt check consulted at the start of
//! every cycle. Any of the three can stop the loop.

mod exec;

pub mod mem;

use easyerr::Error;
use ppc32::{Address, Ins, arch::Registers, disasm};

pub use mem::{Bus, BusFault, Ram};

/// The register file and guest memory an [`Interpreter`] drives. Hooks get a
/// mutable view of this while the interpreter itself stays opaque to them.
pub struct Machine<M> {
    pub regs: Registers,
    pub mem: M,
}

/// A host callback with a stop vote: returning `false` ends the run.
pub type Hook<M> = Box<dyn FnMut(&mut Machine<M>) -> bool>;

/// Host-supplied hooks. All optional.
pub struct Hooks<M> {
    /// Invoked by `sc`. Executing `sc` without one installed is a fault.
    pub syscall: Option<Hook<M>>,
    /// Invoked before every instruction.
    pub debug: Option<Hook<M>>,
}

impl<M> Default for Hooks<M> {
    fn default() -> Self {
        Self {
            syscall: None,
            debug: None,
        }
    }
}

/// Per-cycle interrupt arbitration.
pub trait InterruptCheck {
    /// Called at the start of every cycle, before the fetch. Returning
    /// `false` stops the loop.
    fn on_cycle_start(&mut self) -> bool;
}

/// The default interrupt check: never requests a stop.
pub struct NoInterrupts;

impl InterruptCheck for NoInterrupts {
    fn on_cycle_start(&mut self) -> bool {
        true
    }
}

/// Why a run stopped without a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// The debug hook returned `false`.
    DebugHook,
    /// The interrupt check returned `false`.
    Interrupt,
    /// The syscall handler returned `false`.
    Syscall,
}

/// A fatal condition raised while executing one instruction.
#[derive(Debug, Error)]
pub enum StepError {
    /// The decoder sink, or a recognized encoding with non-zero reserved
    /// bits.
    #[error("invalid instruction {word:08X} at {pc}: {dasm}")]
    Invalid { pc: Address, word: u32, dasm: String },
    /// A recognized encoding whose execution is deliberately stubbed.
    #[error("unimplemented instruction {word:08X} at {pc}: {dasm}")]
    Unimplemented { pc: Address, word: u32, dasm: String },
    /// The guest memory rejected an access.
    #[error("memory fault while executing at {pc}")]
    Bus { pc: Address, source: BusFault },
}

/// The interpreter.
pub struct Interpreter<M> {
    pub machine: Machine<M>,
    pub hooks: Hooks<M>,
    interrupts: Box<dyn InterruptCheck>,
    /// Outstanding `lwarx` reservation. Cleared by every store.
    reservation: bool,
    should_exit: bool,
}

impl<M: Bus> Interpreter<M> {
    pub fn new(mem: M) -> Self {
        Self::with_registers(mem, Registers::new())
    }

    pub fn with_registers(mem: M, regs: Registers) -> Self {
        Self {
            machine: Machine { regs, mem },
            hooks: Hooks::default(),
            interrupts: Box::new(NoInterrupts),
            reservation: false,
            should_exit: false,
        }
    }

    pub fn set_interrupt_check(&mut self, interrupts: Box<dyn InterruptCheck>) {
        self.interrupts = interrupts;
    }

    pub fn regs(&self) -> &Registers {
        &self.machine.regs
    }

    pub fn regs_mut(&mut self) -> &mut Registers {
        &mut self.machine.regs
    }

    /// Runs one full cycle: hooks, fetch, dispatch, PC post-increment, time
    /// base. Returns `Some(exit)` when a hook or handler requested a stop.
    pub fn step(&mut self) -> Result<Option<Exit>, StepError> {
        if let Some(hook) = self.hooks.debug.as_mut() {
            if !hook(&mut self.machine) {
                tracing::debug!("debug hook requested exit");
                return Ok(Some(Exit::DebugHook));
            }
        }

        if !self.interrupts.on_cycle_start() {
            tracing::debug!("interrupt check requested exit");
            return Ok(Some(Exit::Interrupt));
        }

        let pc = self.machine.regs.pc;
        let word = u32::from_be(
            self.machine
                .mem
                .read(pc)
                .map_err(|source| StepError::Bus { pc, source })?,
        );

        self.dispatch(Ins::new(word))?;

        self.machine.regs.pc += 4u32;
        self.machine.regs.tbr = self
            .machine
            .regs
            .tbr
            .wrapping_add(self.machine.regs.tbr_ticks_per_cycle);

        if self.should_exit {
            self.should_exit = false;
            tracing::debug!("syscall handler requested exit");
            return Ok(Some(Exit::Syscall));
        }

        Ok(None)
    }

    /// Steps until a hook requests a stop or a fatal condition is raised.
    /// The register state up to the stopping point stays observable.
    pub fn run(&mut self) -> Result<Exit, StepError> {
        loop {
            if let Some(exit) = self.step()? {
                return Ok(exit);
            }
        }
    }

    pub(crate) fn invalid_op(&self, ins: Ins) -> StepError {
        let pc = self.machine.regs.pc;
        StepError::Invalid {
            pc,
            word: ins.0,
            dasm: disasm::disassemble_one(pc, ins.0),
        }
    }

    pub(crate) fn unimplemented_op(&self, ins: Ins) -> StepError {
        let pc = self.machine.regs.pc;
        StepError::Unimplemented {
            pc,
            word: ins.0,
            dasm: disasm::disassemble_one(pc, ins.0),
        }
    }

    pub(crate) fn bus_error(&self, source: BusFault) -> StepError {
        StepError::Bus {
            pc: self.machine.regs.pc,
            source,
        }
    }

    pub(crate) fn request_exit(&mut self) {
        self.should_exit = true;
    }

    pub(crate) fn set_reservation(&mut self, held: bool) {
        self.reservation = held;
    }

    pub(crate) fn reservation(&self) -> bool {
        self.reservation
    }
}
