//! Coloured terminal output for single-stepping and the end-of-run
//! dump.
use std::io::{self, Write};

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use cpu::StepEvent;

use super::summary::RunSummary;

fn get_colour_choice() -> ColorChoice {
    if atty::is(atty::Stream::Stdout) {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}

pub struct Terminal {
    stream: StandardStream,
}

impl Terminal {
    pub fn stdout() -> Terminal {
        Terminal {
            stream: StandardStream::stdout(get_colour_choice()),
        }
    }

    fn coloured(&mut self, colour: Color, bold: bool, text: &str) -> io::Result<()> {
        self.stream
            .set_color(ColorSpec::new().set_fg(Some(colour)).set_bold(bold))?;
        write!(self.stream, "{text}")?;
        self.stream.reset()
    }

    /// Shows the instruction about to execute and the registers.
    pub fn step_event(&mut self, step: &StepEvent) -> io::Result<()> {
        self.coloured(Color::Cyan, false, &format!("{:08X}", step.address))?;
        write!(self.stream, "  ")?;
        self.coloured(Color::Yellow, true, &step.disassembly)?;
        writeln!(self.stream)?;
        writeln!(self.stream, "{}", step.snapshot)?;
        write!(self.stream, "[s]tep [c]ontinue [t]oggle [q]uit> ")?;
        self.stream.flush()
    }

    pub fn summary(&mut self, summary: &RunSummary) -> io::Result<()> {
        let colour = if summary.error.is_some() {
            Color::Red
        } else {
            Color::Green
        };
        self.coloured(
            colour,
            true,
            &format!("{} {}", summary.architecture, summary.outcome),
        )?;
        writeln!(
            self.stream,
            " after {} instructions ({:.6}s simulated)",
            summary.instructions, summary.simulated_seconds
        )?;
        if let Some(error) = &summary.error {
            writeln!(self.stream, "{error}")?;
        }
        writeln!(self.stream, "{}", summary.registers)?;
        for fault in &summary.faults {
            self.coloured(Color::Red, false, &format!("fault {}", fault.name))?;
            writeln!(self.stream, ": {}", fault.message)?;
        }
        self.stream.flush()
    }
}
