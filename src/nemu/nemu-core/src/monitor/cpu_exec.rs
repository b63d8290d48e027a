use crate::constants::{ENTRY_START, MAX_INSTR_TO_PRINT, RUN_FOREVER};
use crate::cpu::{Cpu, InstructionTable, Trap};
use crate::error::{ExecFault, ExprError, RegisterError, WatchError};
use crate::instructions::BaseTable;
use crate::loader;
use crate::memory::{MemoryMap, SwAddr};
use crate::monitor::expr::expr;
use crate::monitor::watchpoint::{WatchHit, Watchpoint, WatchpointPool};
use crossbeam_channel::Receiver;
use log::{info, log_enabled, trace, warn, Level};

/// Run state of the emulator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NemuState {
    Stopped,
    Running,
    /// Terminal: the guest program finished
    Ended,
}

/// Why `cpu_exec` returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOutcome {
    /// The requested number of instructions ran
    Exhausted,
    Breakpoint,
    Watchpoint(WatchHit),
    /// An external stop request arrived
    Interrupted,
    Fault(ExecFault),
    Ended,
    /// A run was requested after the program ended
    CannotContinue,
}

/// Emulator context: CPU, instruction table, watchpoints and run state
pub struct Nemu {
    pub cpu: Cpu,
    table: Box<dyn InstructionTable>,
    watchpoints: WatchpointPool,
    state: NemuState,
    stop_signal: Option<Receiver<()>>,
}

impl Nemu {
    pub fn new(mem: MemoryMap) -> Nemu {
        Nemu::with_table(mem, Box::new(BaseTable))
    }

    pub fn with_table(mem: MemoryMap, table: Box<dyn InstructionTable>) -> Nemu {
        Nemu {
            cpu: Cpu::new(mem),
            table,
            watchpoints: WatchpointPool::new(),
            state: NemuState::Stopped,
            stop_signal: None,
        }
    }

    pub fn state(&self) -> NemuState {
        self.state
    }

    /// Poll `signal` once per instruction for stop requests
    pub fn set_stop_signal(&mut self, signal: Receiver<()>) {
        self.stop_signal = Some(signal);
    }

    /// Reset the machine and load `image` at the entry point
    pub fn restart(&mut self, image: &[u8]) {
        self.cpu.reset();
        self.cpu.mem.reset();
        loader::load_image(&mut self.cpu, image);
        self.state = NemuState::Stopped;
        self.watchpoints.refresh(&self.cpu);
        info!(
            "Loaded {} byte image at 0x{:08x}",
            image.len(),
            ENTRY_START
        );
    }

    fn suspend(&mut self) {
        if self.state == NemuState::Running {
            self.state = NemuState::Stopped;
        }
    }

    fn stop_requested(&self) -> bool {
        match &self.stop_signal {
            Some(signal) => signal.try_recv().is_ok(),
            None => false,
        }
    }

    fn trace_step(&self, eip: SwAddr, len: u32, print: bool) {
        if !print && !log_enabled!(Level::Trace) {
            return;
        }
        let mut bytes = String::new();
        for offset in 0..len {
            match self.cpu.mem.checked_read(eip.wrapping_add(offset), 1) {
                Some(byte) => bytes.push_str(&format!("{:02x} ", byte)),
                None => bytes.push_str("?? "),
            }
        }
        if print {
            info!("{:8x}:   {:<24}{}", eip, bytes, self.cpu.assembly);
        } else {
            trace!("{:8x}:   {:<24}{}", eip, bytes, self.cpu.assembly);
        }
    }

    /// Run at most `n` instructions; `RUN_FOREVER` runs until something stops
    /// the machine.
    pub fn cpu_exec(&mut self, n: u64) -> ExecOutcome {
        if self.state == NemuState::Ended {
            warn!("Program execution has ended, cannot continue");
            return ExecOutcome::CannotContinue;
        }

        // drop requests raised while the machine was idle
        if let Some(signal) = &self.stop_signal {
            while signal.try_recv().is_ok() {}
        }

        let print = n < MAX_INSTR_TO_PRINT;
        self.state = NemuState::Running;

        let mut remaining = n;
        while remaining > 0 {
            let eip = self.cpu.regs.eip;

            let executed = match self.table.exec(&mut self.cpu, eip) {
                Ok(executed) => executed,
                Err(fault) => {
                    self.cpu.regs.eip = eip;
                    self.state = NemuState::Stopped;
                    return ExecOutcome::Fault(fault);
                }
            };
            self.cpu.regs.eip = self.cpu.regs.eip.wrapping_add(executed.len);

            self.trace_step(eip, executed.len, print);

            // the trap decides the state even when a watchpoint or a stop
            // request is what gets reported
            match executed.trap {
                Some(Trap::Breakpoint) => self.state = NemuState::Stopped,
                Some(Trap::End) => self.state = NemuState::Ended,
                None => {}
            }

            if let Some(hit) = self.watchpoints.scan(&self.cpu) {
                info!(
                    "Hit watchpoint {} at eip = 0x{:08x}: {} (0x{:08x} -> 0x{:08x})",
                    hit.no, eip, hit.expr, hit.old, hit.new
                );
                self.suspend();
                return ExecOutcome::Watchpoint(hit);
            }

            if self.stop_requested() {
                self.suspend();
                return ExecOutcome::Interrupted;
            }

            match self.state {
                NemuState::Stopped => return ExecOutcome::Breakpoint,
                NemuState::Ended => return ExecOutcome::Ended,
                NemuState::Running => {}
            }

            if n != RUN_FOREVER {
                remaining -= 1;
            }
        }

        self.state = NemuState::Stopped;
        ExecOutcome::Exhausted
    }

    /// Evaluate a debugger expression against the current machine state
    pub fn eval(&self, e: &str) -> Result<u32, ExprError> {
        expr(e, &self.cpu)
    }

    /// `n` consecutive 32-bit words starting at `addr`, stopping at the end
    /// of memory
    pub fn examine(&self, addr: SwAddr, n: usize) -> Vec<(SwAddr, u32)> {
        // `n` comes from the user; the memory size bounds the result
        let mut words = Vec::new();
        for i in 0..n {
            let at = match (i as u32).checked_mul(4).and_then(|off| addr.checked_add(off)) {
                Some(at) => at,
                None => break,
            };
            match self.cpu.mem.checked_read(at, 4) {
                Some(word) => words.push((at, word)),
                None => break,
            }
        }
        words
    }

    /// Write a register by name; watchpoints absorb the new value
    pub fn set_register(&mut self, name: &str, value: u32) -> Result<(), RegisterError> {
        self.cpu.regs.write_by_name(name, value)?;
        self.watchpoints.refresh(&self.cpu);
        Ok(())
    }

    pub fn watch(&mut self, e: &str) -> Result<&Watchpoint, WatchError> {
        self.watchpoints.create(e, &self.cpu)
    }

    pub fn watchpoints(&self) -> &WatchpointPool {
        &self.watchpoints
    }

    pub fn watchpoints_mut(&mut self) -> &mut WatchpointPool {
        &mut self.watchpoints
    }
}
