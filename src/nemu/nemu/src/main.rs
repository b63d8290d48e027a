extern crate clap;
use crossbeam_channel::bounded; // Ctrl-C to emulator stop requests
use log::{error, info};
use std::io::{self, BufRead, Write};

mod command;

use command::{Command, COMMANDS};
use nemu_core::constants::registers::{NR_GPR, REGSL};
use nemu_core::constants::RUN_FOREVER;
use nemu_core::memory::MemoryMap;
use nemu_core::monitor::{ExecOutcome, Nemu};

/// Configures command-line interface using clap
fn get_cli_config<'a>() -> clap::ArgMatches<'a> {
    let description = "i386 emulator with a debugging monitor";
    clap::App::new("NEMU")
        .version("0.1")
        .about(description)
        .arg(
            clap::Arg::with_name("IMAGE")
                .help("Raw guest image loaded at 0x100000 (built-in program if omitted)")
                .index(1),
        )
        .arg(
            clap::Arg::with_name("batch")
                .short("b")
                .long("batch")
                .help("Run the program to completion without the monitor"),
        )
        .get_matches()
}

fn report(outcome: &ExecOutcome) {
    match outcome {
        ExecOutcome::Exhausted | ExecOutcome::Breakpoint => {}
        ExecOutcome::Watchpoint(hit) => {
            println!("Hit watchpoint {}: {}", hit.no, hit.expr);
            println!("Old value = 0x{:08x}", hit.old);
            println!("New value = 0x{:08x}", hit.new);
        }
        ExecOutcome::Interrupted => println!("Interrupted"),
        ExecOutcome::Fault(fault) => println!("Emulation stopped: {}", fault),
        ExecOutcome::Ended => println!("Program ended"),
        ExecOutcome::CannotContinue => {
            println!("Program execution has ended. To restart the program, exit NEMU and run again.")
        }
    }
}

fn print_help(arg: Option<&str>) {
    match arg {
        None => {
            for (name, _, description) in COMMANDS.iter() {
                println!("{} - {}", name, description);
            }
        }
        Some(arg) => match COMMANDS.iter().find(|(name, _, _)| *name == arg) {
            Some((name, usage, description)) => {
                println!("{} - {}", name, description);
                println!("Usage: {}", usage);
            }
            None => println!("Unknown command '{}'", arg),
        },
    }
}

/// Execute one command; returns false when the monitor should exit
fn dispatch(nemu: &mut Nemu, cmd: Command) -> bool {
    match cmd {
        Command::Help(arg) => print_help(arg.as_deref()),
        Command::Continue => report(&nemu.cpu_exec(RUN_FOREVER)),
        Command::Quit => return false,
        Command::Step(n) => report(&nemu.cpu_exec(n)),
        Command::InfoRegisters => {
            for (i, name) in REGSL.iter().enumerate().take(NR_GPR) {
                let value = nemu.cpu.regs.reg_l(i);
                println!("{:<8}0x{:08x}  {}", name, value, value);
            }
            println!("{:<8}0x{:08x}", "eip", nemu.cpu.regs.eip);
            println!("{:<8}0x{:08x}", "eflags", nemu.cpu.regs.eflags.val());
        }
        Command::InfoWatchpoints => {
            if nemu.watchpoints().is_empty() {
                println!("No watchpoints");
            } else {
                println!("{:<4}{:<40}{}", "Num", "What", "Value");
                for wp in nemu.watchpoints().iter() {
                    println!("{:<4}{:<40}0x{:08x}", wp.no, wp.expr, wp.value);
                }
            }
        }
        Command::Print(e) => match nemu.eval(&e) {
            Ok(value) => println!("0x{:08x}  {}", value, value),
            Err(err) => println!("Bad expression: {}", err),
        },
        Command::Examine { n, expr } => match nemu.eval(&expr) {
            Ok(addr) => {
                let words = nemu.examine(addr, n);
                for (at, word) in words.iter() {
                    println!("0x{:08x}:  0x{:08x}", at, word);
                }
                if words.len() < n {
                    println!(
                        "Cannot access memory at address 0x{:08x}",
                        addr.wrapping_add(4 * words.len() as u32)
                    );
                }
            }
            Err(err) => println!("Bad expression: {}", err),
        },
        Command::Watch(e) => match nemu.watch(&e) {
            Ok(wp) => println!("Watchpoint {}: {}", wp.no, wp.expr),
            Err(err) => println!("Cannot set watchpoint: {}", err),
        },
        Command::Delete(no) => {
            // the pool treats deleting from an empty list as a bug
            if nemu.watchpoints().is_empty() {
                println!("No watchpoints");
            } else if let Err(err) = nemu.watchpoints_mut().delete(no) {
                println!("{}", err);
            }
        }
        Command::Set { reg, expr } => match nemu.eval(&expr) {
            Ok(value) => {
                if let Err(err) = nemu.set_register(&reg, value) {
                    println!("{}", err);
                }
            }
            Err(err) => println!("Bad expression: {}", err),
        },
    }
    true
}

fn main_loop(nemu: &mut Nemu) {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("(nemu) ");
        let _ = io::stdout().flush();

        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                error!("Failed to read command: {}", e);
                return;
            }
            None => return,
        };

        match command::parse(&line) {
            Ok(Some(cmd)) => {
                if !dispatch(nemu, cmd) {
                    return;
                }
            }
            Ok(None) => {}
            Err(err) => println!("{}", err),
        }
    }
}

/// Main entry point for the emulator
fn main() {
    env_logger::init();

    // Ctrl-C stops the running program; a second one while the first is
    // still pending exits
    let (signal_sender, signal_receiver) = bounded(1);
    let handler_result = ctrlc::set_handler(move || {
        if signal_sender.is_full() {
            std::process::exit(-1);
        }
        let _send_result = signal_sender.send(());
    });

    if let Err(e) = handler_result {
        error!("Signal handler failed: {:?}", e);
        return;
    }

    let cli_matches = get_cli_config();

    let image = match cli_matches.value_of("IMAGE") {
        Some(path) => match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Cannot read image '{}': {}", path, e);
                return;
            }
        },
        None => {
            info!("No image is given. Use the default built-in image.");
            nemu_images::DEFAULT_ENTRY.to_vec()
        }
    };

    let mem = MemoryMap::new();
    if image.len() > mem.capacity() - nemu_core::constants::ENTRY_START as usize {
        error!("Image of {} bytes does not fit in memory", image.len());
        return;
    }

    let mut nemu = Nemu::new(mem);
    nemu.set_stop_signal(signal_receiver);
    nemu.restart(&image);

    if cli_matches.is_present("batch") {
        report(&nemu.cpu_exec(RUN_FOREVER));
        return;
    }

    main_loop(&mut nemu);
}
