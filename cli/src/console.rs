//! A debug console: bytes written to its port appear on the host's
//! standard output.
use std::io::{self, Write};

use tracing::{event, Level};

use base::prelude::*;
use cpu::PortDevice;

pub const DEFAULT_CONSOLE_PORT: u16 = 0xE9;

pub struct ConsoleDevice<W: Write + Send> {
    output: W,
}

impl ConsoleDevice<io::Stdout> {
    pub fn stdout() -> ConsoleDevice<io::Stdout> {
        ConsoleDevice::new(io::stdout())
    }
}

impl<W: Write + Send> ConsoleDevice<W> {
    pub fn new(output: W) -> ConsoleDevice<W> {
        ConsoleDevice { output }
    }

    pub fn into_inner(self) -> W {
        self.output
    }
}

impl<W: Write + Send> PortDevice for ConsoleDevice<W> {
    fn name(&self) -> &str {
        "console"
    }

    /// The console has no input; reads see an idle bus.
    fn port_in(&mut self, width: Width, _port: u16) -> u16 {
        width.mask()
    }

    /// Only the low byte of a word write is printed.
    fn port_out(&mut self, _width: Width, _port: u16, value: u16) {
        let [byte, _] = value.to_le_bytes();
        let result = self.output.write_all(&[byte]).and_then(|()| {
            if byte == b'\n' {
                self.output.flush()
            } else {
                Ok(())
            }
        });
        if let Err(e) = result {
            event!(Level::ERROR, "console output failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_low_byte() {
        let mut console = ConsoleDevice::new(Vec::new());
        for b in b"hi\n" {
            console.port_out(Width::Byte, DEFAULT_CONSOLE_PORT, u16::from(*b));
        }
        console.port_out(Width::Word, DEFAULT_CONSOLE_PORT, 0x1221);
        assert_eq!(console.into_inner(), b"hi\n!".to_vec());
    }

    #[test]
    fn test_reads_idle() {
        let mut console = ConsoleDevice::new(Vec::new());
        assert_eq!(console.port_in(Width::Byte, DEFAULT_CONSOLE_PORT), 0xFF);
        assert_eq!(console.port_in(Width::Word, DEFAULT_CONSOLE_PORT), 0xFFFF);
    }
}
