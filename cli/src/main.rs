use std::error::Error;
use std::ffi::OsString;
use std::fs;
use std::io::{self, BufRead};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use clap::ArgAction::{Append, Set, SetTrue};
use clap::{Parser, ValueEnum};
use tracing::{event, span, Level};
use tracing_subscriber::prelude::*;

use cpu::{
    get_address, ArmCore, Core, Cpu, DeviceManager, ExecutionUnit, Fault, FaultKind,
    MemoryConfiguration, MemoryUnit, StepControl, StepEvent, TickOutcome, ADDRESS_MASK, ARM,
    DEFAULT_ROM_START, X86_REAL_MODE,
};

mod console;
mod display;
mod sleep;
mod summary;

use console::{ConsoleDevice, DEFAULT_CONSOLE_PORT};
use display::Terminal;
use sleep::{pace, MinimalSleeper};
use summary::RunSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Arch {
    X86,
    Arm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DumpFormat {
    Text,
    Json,
}

/// Emulator for the 8086 (and, partially, 32-bit ARM) processor
#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
struct Cli {
    /// File containing the program image, which is loaded verbatim.
    #[clap(action = Set)]
    image: OsString,

    #[clap(action = Set, long, value_enum, default_value_t = Arch::X86)]
    arch: Arch,

    /// Linear address at which to load the image.  Defaults to CS:IP
    /// for x86 and 0 for ARM.
    #[clap(action = Set, long, value_parser = parse_u32)]
    load_address: Option<u32>,

    /// Initial code segment (x86 only).  SS, DS and ES start out
    /// equal to it.
    #[clap(action = Set, long, value_parser = parse_u16, default_value = "0")]
    cs: u16,

    /// Initial instruction pointer (x86 only).
    #[clap(action = Set, long, value_parser = parse_u16, default_value = "0x100")]
    ip: u16,

    /// Initial stack pointer.
    #[clap(action = Set, long, value_parser = parse_u32)]
    sp: Option<u32>,

    /// At most 1MiB, the size of the real mode address space.
    #[clap(action = Set, long, value_parser = parse_memory_size, default_value = "0x100000")]
    memory_size: u32,

    /// Writes at or above this address are ignored.
    #[clap(action = Set, long, value_parser = parse_u32)]
    rom_start: Option<u32>,

    /// Make all memory writable.
    #[clap(action = SetTrue, long, conflicts_with = "rom_start")]
    no_rom: bool,

    /// Start in single-step mode.
    #[clap(action = SetTrue, long)]
    step: bool,

    #[clap(action = Set, long, value_parser = parse_u64)]
    max_instructions: Option<u64>,

    /// Fault kinds (for example undefined-instruction) which should
    /// stop execution.  May be repeated.
    #[clap(action = Append, long)]
    unmask: Vec<String>,

    /// Port whose output is printed on stdout.
    #[clap(action = Set, long, value_parser = parse_u16, default_value_t = DEFAULT_CONSOLE_PORT)]
    console_port: u16,

    /// Run this many times faster than real-time ('MAX' for
    /// as-fast-as-possible).
    #[clap(action = Set, long, value_parser = parse_speed_multiplier, default_value = "1")]
    speed_multiplier: SpeedMultiplier,

    /// Print the final machine state.
    #[clap(action = Set, long, value_enum)]
    dump: Option<DumpFormat>,
}

/// `None` means run as fast as possible.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SpeedMultiplier(Option<f64>);

fn parse_number<T: TryFrom<u64>>(s: &str) -> Result<T, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse::<u64>(),
    };
    let n = parsed.map_err(|e| format!("'{s}' is not a number: {e}"))?;
    T::try_from(n).map_err(|_| format!("{s} is out of range"))
}

fn parse_u16(s: &str) -> Result<u16, String> {
    parse_number(s)
}

fn parse_u32(s: &str) -> Result<u32, String> {
    parse_number(s)
}

fn parse_u64(s: &str) -> Result<u64, String> {
    parse_number(s)
}

fn parse_memory_size(s: &str) -> Result<u32, String> {
    let size: u32 = parse_number(s)?;
    if size > ADDRESS_MASK + 1 {
        Err(format!(
            "memory size {s} is larger than the {:#X}-byte address space",
            ADDRESS_MASK + 1
        ))
    } else {
        Ok(size)
    }
}

fn parse_speed_multiplier(s: &str) -> Result<SpeedMultiplier, String> {
    if s == "MAX" {
        return Ok(SpeedMultiplier(None));
    }
    match s.parse::<f64>() {
        Ok(m) if m > 0.0 && m.is_finite() => Ok(SpeedMultiplier(Some(m))),
        Ok(_) => Err(format!("speed multiplier {s} should be positive")),
        Err(e) => Err(format!("'{s}' is not a valid speed multiplier: {e}")),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Step,
    Continue,
    ToggleStepMode,
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    match line.trim() {
        "" | "s" => Some(Command::Step),
        "c" => Some(Command::Continue),
        "t" => Some(Command::ToggleStepMode),
        "q" => Some(Command::Quit),
        _ => None,
    }
}

fn apply_command(control: &StepControl, command: Command) {
    match command {
        Command::Step => control.resume(),
        Command::Continue => control.set_armed(false),
        Command::ToggleStepMode => {
            control.toggle();
        }
        Command::Quit => control.request_stop(),
    }
}

/// Runs the CPU until it stops, pacing it against the wall clock.
fn execute<C: Core>(
    mut cpu: Cpu<C>,
    limit: Option<u64>,
    multiplier: SpeedMultiplier,
) -> (Result<TickOutcome, Fault>, Cpu<C>) {
    let mut sleeper = MinimalSleeper::new(Duration::from_millis(5));
    let result = loop {
        if limit.is_some_and(|n| cpu.instructions_executed() >= n) {
            event!(Level::INFO, "instruction limit reached");
            break Ok(TickOutcome::Continue);
        }
        let before = cpu.elapsed();
        match cpu.tick() {
            Ok(TickOutcome::Continue) => pace(
                &mut sleeper,
                cpu.elapsed().saturating_sub(before),
                multiplier.0,
            ),
            other => break other,
        }
    };
    (result, cpu)
}

/// Forwards lines of standard input.  The thread is left blocked in
/// a read when the program exits.
fn read_commands() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    event!(Level::WARN, "failed to read a command: {e}");
                    break;
                }
            }
        }
    });
    rx
}

/// Runs `cpu` on a worker thread while this thread takes commands
/// from standard input.
fn drive<C>(mut cpu: Cpu<C>, cli: &Cli) -> Result<(), Box<dyn Error>>
where
    C: Core + 'static,
    C::Instruction: 'static,
{
    for name in &cli.unmask {
        cpu.faults_mut().unmask(FaultKind::try_from(name.as_str())?);
    }
    let control = cpu.step_control();
    let mut terminal = Terminal::stdout();
    cpu.set_step_listener(Box::new(move |step: &StepEvent| {
        if let Err(e) = terminal.step_event(step) {
            event!(Level::ERROR, "failed to show step: {e}");
        }
    }));
    control.set_armed(cli.step);

    let limit = cli.max_instructions;
    let multiplier = cli.speed_multiplier;
    let worker = thread::Builder::new()
        .name("cpu".to_string())
        .spawn(move || execute(cpu, limit, multiplier))?;

    let commands = read_commands();
    while !worker.is_finished() {
        match commands.recv_timeout(Duration::from_millis(50)) {
            Ok(line) => match parse_command(&line) {
                Some(command) => apply_command(&control, command),
                None => eprintln!("unknown command '{line}' (try s, c, t or q)"),
            },
            Err(RecvTimeoutError::Timeout) => (),
            Err(RecvTimeoutError::Disconnected) => {
                // No more input, so nobody can step.
                control.set_armed(false);
                break;
            }
        }
    }
    let (result, cpu) = worker.join().map_err(|_| "the CPU thread panicked")?;

    let summary = RunSummary::new(&cpu, &result);
    match cli.dump {
        Some(DumpFormat::Json) => println!("{}", serde_json::to_string_pretty(&summary)?),
        Some(DumpFormat::Text) => Terminal::stdout().summary(&summary)?,
        None => (),
    }
    result?;
    Ok(())
}

fn run_emulator() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    // See
    // https://docs.rs/tracing-subscriber/0.2.19/tracing_subscriber/fmt/index.html#filtering-events-with-environment-variables
    // for instructions on how to select which trace messages get
    // printed.
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    let filter_layer = match tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))
    {
        Err(e) => {
            return Err(Box::new(e));
        }
        Ok(layer) => layer,
    };
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    let span = span!(Level::INFO, "emulate", image = ?cli.image, arch = ?cli.arch);
    let _enter = span.enter();

    let image = fs::read(&cli.image)?;
    let mut memory = MemoryUnit::new(&MemoryConfiguration {
        size: usize::try_from(cli.memory_size)?,
        rom_start: if cli.no_rom {
            None
        } else {
            Some(cli.rom_start.unwrap_or(DEFAULT_ROM_START))
        },
    });
    let mut devices = DeviceManager::new();
    devices.attach(
        cli.console_port..=cli.console_port,
        Box::new(ConsoleDevice::stdout()),
    )?;

    match cli.arch {
        Arch::X86 => {
            let load_address = cli
                .load_address
                .unwrap_or_else(|| get_address(cli.cs, cli.ip));
            memory.load_image(load_address, &image)?;
            let mut eu = ExecutionUnit::new();
            eu.set_entry_point(cli.cs, cli.ip);
            eu.set_data_segments(cli.cs);
            eu.set_stack(cli.cs, u16::try_from(cli.sp.unwrap_or(0xFFFE))?);
            drive(Cpu::new(X86_REAL_MODE, eu, memory, devices), &cli)
        }
        Arch::Arm => {
            let load_address = cli.load_address.unwrap_or(0);
            memory.load_image(load_address, &image)?;
            let mut core = ArmCore::new();
            core.set_entry_point(load_address);
            if let Some(sp) = cli.sp {
                core.set_register(base::arm::Register::SP, sp);
            }
            drive(Cpu::new(ARM, core, memory, devices), &cli)
        }
    }
}

fn main() {
    match run_emulator() {
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
        Ok(()) => {
            std::process::exit(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_accept_hex() {
        assert_eq!(parse_u16("0x100"), Ok(0x100));
        assert_eq!(parse_u16("0XfE"), Ok(0xFE));
        assert_eq!(parse_u32("4096"), Ok(4096));
        assert!(parse_u16("0x10000").is_err());
        assert!(parse_u32("twelve").is_err());
    }

    #[test]
    fn test_memory_size_is_bounded() {
        assert_eq!(parse_memory_size("0x100000"), Ok(0x10_0000));
        assert_eq!(parse_memory_size("65536"), Ok(0x1_0000));
        assert!(parse_memory_size("0x100001").is_err());
        assert!(parse_memory_size("0xFFFFFFFF").is_err());
        assert!(Cli::try_parse_from(["emu86", "x", "--memory-size", "0x200000"]).is_err());
    }

    #[test]
    fn test_speed_multiplier() {
        assert_eq!(parse_speed_multiplier("MAX"), Ok(SpeedMultiplier(None)));
        assert_eq!(parse_speed_multiplier("2.5"), Ok(SpeedMultiplier(Some(2.5))));
        assert!(parse_speed_multiplier("0").is_err());
        assert!(parse_speed_multiplier("fast").is_err());
    }

    #[test]
    fn test_commands() {
        assert_eq!(parse_command(""), Some(Command::Step));
        assert_eq!(parse_command("s\n"), Some(Command::Step));
        assert_eq!(parse_command("c"), Some(Command::Continue));
        assert_eq!(parse_command("t"), Some(Command::ToggleStepMode));
        assert_eq!(parse_command("q"), Some(Command::Quit));
        assert_eq!(parse_command("x"), None);
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "emu86",
            "prog.bin",
            "--arch",
            "arm",
            "--unmask",
            "undefined-instruction",
            "--unmask",
            "unattached-port",
            "--speed-multiplier",
            "MAX",
            "--dump",
            "json",
        ])
        .expect("arguments should parse");
        assert_eq!(cli.arch, Arch::Arm);
        assert_eq!(cli.unmask.len(), 2);
        assert_eq!(cli.speed_multiplier, SpeedMultiplier(None));
        assert_eq!(cli.console_port, 0xE9);
        assert_eq!(cli.ip, 0x100);
        assert_eq!(cli.dump, Some(DumpFormat::Json));
        assert!(Cli::try_parse_from(["emu86", "x", "--no-rom", "--rom-start", "0x1000"]).is_err());
    }

    #[test]
    fn test_instruction_limit() {
        let mut memory = MemoryUnit::new(&MemoryConfiguration::default());
        // JMP $
        memory.load_image(0x100, &[0xEB, 0xFE]).expect("code should fit");
        let mut eu = ExecutionUnit::new();
        eu.set_entry_point(0, 0x100);
        let cpu = Cpu::new(X86_REAL_MODE, eu, memory, DeviceManager::new());
        let (result, cpu) = execute(cpu, Some(25), SpeedMultiplier(None));
        assert_eq!(result, Ok(TickOutcome::Continue));
        assert_eq!(cpu.instructions_executed(), 25);
    }
}
