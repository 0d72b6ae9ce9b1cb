//! This module simulates the I/O port space.  Devices attach to a
//! range of port numbers; IN and OUT instructions are routed to
//! whichever device owns the addressed port.
//!
//! ## Unattached ports
//!
//! An access to a port with no device attached is reported to the
//! caller, which raises the (maskable) unattached-port fault.  When
//! that fault is masked, reads yield all-ones and writes are ignored,
//! as they would on a bus with nothing listening.
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{self, Debug, Display, Formatter};
use std::ops::RangeInclusive;

use tracing::{event, Level};

use base::width::Width;

/// A device which responds to IN and OUT instructions.
pub trait PortDevice: Send {
    /// A short name used in logging.
    fn name(&self) -> &str;

    /// Reads from `port`.  Only the low `width` bits of the result
    /// are used.
    fn port_in(&mut self, width: Width, port: u16) -> u16;

    fn port_out(&mut self, width: Width, port: u16, value: u16);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachError {
    pub requested: RangeInclusive<u16>,
    pub existing: RangeInclusive<u16>,
    pub existing_name: String,
}

impl Display for AttachError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(
            f,
            "ports {:#06X}..={:#06X} overlap ports {:#06X}..={:#06X} already used by {}",
            self.requested.start(),
            self.requested.end(),
            self.existing.start(),
            self.existing.end(),
            self.existing_name
        )
    }
}

impl Error for AttachError {}

/// No device is attached to the port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnattachedPort {
    pub port: u16,
}

struct AttachedDevice {
    last: u16,
    device: Box<dyn PortDevice>,
}

/// Keyed by the first port of each attached range.
#[derive(Default)]
pub struct DeviceManager {
    devices: BTreeMap<u16, AttachedDevice>,
}

impl Debug for DeviceManager {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_list().entries(self.attached()).finish()
    }
}

impl DeviceManager {
    pub fn new() -> DeviceManager {
        DeviceManager::default()
    }

    pub fn attach(
        &mut self,
        ports: RangeInclusive<u16>,
        device: Box<dyn PortDevice>,
    ) -> Result<(), AttachError> {
        let (first, last) = (*ports.start(), *ports.end());
        if let Some((&start, existing)) = self
            .devices
            .iter()
            .find(|(&start, d)| start <= last && first <= d.last)
        {
            return Err(AttachError {
                requested: ports,
                existing: start..=existing.last,
                existing_name: existing.device.name().to_string(),
            });
        }
        event!(
            Level::INFO,
            "attaching {} to ports {first:#06X}..={last:#06X}",
            device.name()
        );
        self.devices.insert(first, AttachedDevice { last, device });
        Ok(())
    }

    /// The port ranges in use, and the names of their devices.
    pub fn attached(&self) -> Vec<(RangeInclusive<u16>, String)> {
        self.devices
            .iter()
            .map(|(&start, d)| (start..=d.last, d.device.name().to_string()))
            .collect()
    }

    fn device_for(&mut self, port: u16) -> Option<&mut AttachedDevice> {
        self.devices
            .range_mut(..=port)
            .next_back()
            .map(|(_, d)| d)
            .filter(|d| port <= d.last)
    }

    pub fn port_in(&mut self, width: Width, port: u16) -> Result<u16, UnattachedPort> {
        match self.device_for(port) {
            Some(attached) => {
                let value = attached.device.port_in(width, port) & width.mask();
                event!(
                    Level::TRACE,
                    "IN {width} port {port:#06X} from {} gave {value:#06X}",
                    attached.device.name()
                );
                Ok(value)
            }
            None => Err(UnattachedPort { port }),
        }
    }

    pub fn port_out(&mut self, width: Width, port: u16, value: u16) -> Result<(), UnattachedPort> {
        match self.device_for(port) {
            Some(attached) => {
                event!(
                    Level::TRACE,
                    "OUT {width} port {port:#06X} to {} value {value:#06X}",
                    attached.device.name()
                );
                attached.device.port_out(width, port, value & width.mask());
                Ok(())
            }
            None => Err(UnattachedPort { port }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Remembers what was written, and reads back the last value.
    struct Latch {
        written: Arc<Mutex<Vec<(u16, u16)>>>,
    }

    impl PortDevice for Latch {
        fn name(&self) -> &str {
            "latch"
        }

        fn port_in(&mut self, _width: Width, _port: u16) -> u16 {
            self.written
                .lock()
                .expect("lock should not be poisoned")
                .last()
                .map_or(0, |(_, v)| *v)
        }

        fn port_out(&mut self, _width: Width, port: u16, value: u16) {
            self.written
                .lock()
                .expect("lock should not be poisoned")
                .push((port, value));
        }
    }

    fn latch() -> (Box<dyn PortDevice>, Arc<Mutex<Vec<(u16, u16)>>>) {
        let written = Arc::new(Mutex::new(Vec::new()));
        (
            Box::new(Latch {
                written: Arc::clone(&written),
            }),
            written,
        )
    }

    #[test]
    fn test_routing_within_range() {
        let mut devices = DeviceManager::new();
        let (dev, written) = latch();
        devices.attach(0x60..=0x64, dev).expect("no overlap");
        assert_eq!(devices.port_out(Width::Byte, 0x64, 0x1FF), Ok(()));
        assert_eq!(devices.port_in(Width::Word, 0x60), Ok(0x00FF));
        assert_eq!(devices.port_in(Width::Byte, 0x65), Err(UnattachedPort { port: 0x65 }));
        assert_eq!(devices.port_in(Width::Byte, 0x5F), Err(UnattachedPort { port: 0x5F }));
        assert_eq!(
            *written.lock().expect("lock should not be poisoned"),
            vec![(0x64, 0xFF)]
        );
    }

    #[test]
    fn test_overlapping_attach_is_refused() {
        let mut devices = DeviceManager::new();
        devices.attach(0x60..=0x64, latch().0).expect("no overlap");
        let err = devices
            .attach(0x50..=0x60, latch().0)
            .expect_err("ranges overlap");
        assert_eq!(err.existing, 0x60..=0x64);
        assert_eq!(err.existing_name, "latch");
        devices.attach(0x65..=0x65, latch().0).expect("adjacent is fine");
        assert_eq!(devices.attached().len(), 2);
    }
}
