use base::prelude::*;
use base::x86::{Port, WordRegister};

use crate::biu::BusInterfaceUnit;
use crate::fault::{Fault, FaultDetails};
use crate::faultunit::FaultUnit;
use crate::io::UnattachedPort;

use super::ExecutionUnit;

/// ## IN and OUT
///
/// Accessing a port with nothing attached raises the unattached-port
/// fault.  If that fault is masked (the default) the access
/// completes: reads see all-ones and writes vanish.
impl ExecutionUnit {
    fn port_number(&self, port: Port) -> u16 {
        match port {
            Port::Immediate(n) => u16::from(n),
            Port::Dx => self.regs.word(WordRegister::DX),
        }
    }

    pub(super) fn op_in(
        &mut self,
        bus: &mut BusInterfaceUnit,
        faults: &mut FaultUnit,
        address: u32,
        width: Width,
        port: Port,
    ) -> Result<(), Fault> {
        let port = self.port_number(port);
        let value = match bus.port_in(width, port) {
            Ok(value) => value,
            Err(UnattachedPort { port }) => {
                faults.fire_if_not_masked(Fault {
                    address: Some(address),
                    details: FaultDetails::UnattachedPort { port, value: None },
                })?;
                width.mask()
            }
        };
        self.set_accumulator(width, value);
        Ok(())
    }

    pub(super) fn op_out(
        &mut self,
        bus: &mut BusInterfaceUnit,
        faults: &mut FaultUnit,
        address: u32,
        width: Width,
        port: Port,
    ) -> Result<(), Fault> {
        let port = self.port_number(port);
        let value = self.accumulator(width);
        match bus.port_out(width, port, value) {
            Ok(()) => Ok(()),
            Err(UnattachedPort { port }) => faults.fire_if_not_masked(Fault {
                address: Some(address),
                details: FaultDetails::UnattachedPort {
                    port,
                    value: Some(value),
                },
            }),
        }
    }
}
