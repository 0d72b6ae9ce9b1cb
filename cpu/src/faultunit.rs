//! Some faults can be "masked", and whether or not this is happening
//! is controlled by the FaultUnit.
use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{event, Level};

use super::fault::{Fault, FaultDetails, FaultKind, FaultMaskability};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FaultStatus {
    pub name: String,
    pub maskable: bool,
    pub masked: bool,
    pub active: bool,
    pub message: String,
}

/// A fault is in one of the following states:
///
/// - inactive: it's not happening
/// - firing: it's happening and not masked (execution will stop)
/// - active but not firing (logged, execution continues)
///
/// A new fault unit masks every maskable fault.
#[derive(Debug)]
pub struct FaultUnit {
    masked: BTreeSet<FaultKind>,
    active: BTreeMap<FaultKind, Fault>,
}

impl Default for FaultUnit {
    fn default() -> FaultUnit {
        FaultUnit {
            masked: FaultKind::all_fault_kinds()
                .into_iter()
                .filter(|kind| kind.maskable() == FaultMaskability::Maskable)
                .collect(),
            active: BTreeMap::new(),
        }
    }
}

impl FaultUnit {
    pub fn new() -> FaultUnit {
        FaultUnit::default()
    }

    fn status_for_fault_kind(&self, kind: &FaultKind) -> FaultStatus {
        let maybe_active: Option<&Fault> = self.active.get(kind);
        FaultStatus {
            name: kind.to_string(),
            maskable: matches!(kind.maskable(), FaultMaskability::Maskable),
            masked: self.masked.contains(kind),
            active: maybe_active.is_some(),
            message: match maybe_active {
                Some(fault) => fault.to_string(),
                None => String::new(),
            },
        }
    }

    pub fn get_fault_statuses(&self) -> Vec<FaultStatus> {
        FaultKind::all_fault_kinds()
            .iter()
            .map(|kind| self.status_for_fault_kind(kind))
            .collect()
    }

    pub fn get_status_of_fault(&self, name: &str) -> Option<FaultStatus> {
        FaultKind::try_from(name)
            .map(|k| self.status_for_fault_kind(&k))
            .ok()
    }

    pub fn mask(&mut self, kind: FaultKind) -> Result<(), Fault> {
        match kind.maskable() {
            FaultMaskability::Unmaskable => Err(self.always_fire(Fault::bug(format!(
                "attempt to mask unmaskable fault {kind}"
            )))),
            FaultMaskability::Maskable => {
                self.masked.insert(kind);
                Ok(())
            }
        }
    }

    pub fn unmask(&mut self, kind: FaultKind) {
        if self.masked.remove(&kind) {
            event!(Level::INFO, "fault {kind} is now unmasked");
        }
    }

    fn is_masked(&self, kind: FaultKind) -> bool {
        match kind.maskable() {
            FaultMaskability::Unmaskable => false,
            FaultMaskability::Maskable => self.masked.contains(&kind),
        }
    }

    pub fn clear_all_faults(&mut self) {
        event!(Level::INFO, "clearing all faults");
        self.active.clear();
    }

    pub fn unmasked_fault_active(&self) -> bool {
        self.active.keys().any(|kind| !self.is_masked(*kind))
    }

    fn set_active(&mut self, fault: Fault) -> Result<(), Fault> {
        let kind = fault.kind();
        if self.is_masked(kind) {
            event!(Level::WARN, "{fault}");
            self.active.insert(kind, fault);
            Ok(())
        } else {
            event!(Level::ERROR, "{fault}");
            self.active.insert(kind, fault.clone());
            Err(fault)
        }
    }

    /// Records `fault`.  If it is masked, execution continues (`Ok`);
    /// otherwise the fault is returned for the caller to propagate.
    pub fn fire_if_not_masked(&mut self, fault: Fault) -> Result<(), Fault> {
        self.set_active(fault)
    }

    /// Records `fault`, which the caller cannot continue after.  If
    /// the fault turns out to be masked, that is itself a bug.
    pub fn always_fire(&mut self, fault: Fault) -> Fault {
        let kind = fault.kind();
        let address = fault.address;
        match self.set_active(fault) {
            Err(f) => f,
            Ok(()) => {
                let bug = Fault {
                    address,
                    details: FaultDetails::Bug {
                        message: format!(
                            "fault {kind} is masked, but the caller assumed it could not be"
                        ),
                    },
                };
                match self.set_active(bug) {
                    Err(f) => f,
                    Ok(()) => unreachable!("bug faults cannot be masked"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoded::QueueError;

    fn undefined() -> Fault {
        Fault {
            address: Some(0x100),
            details: FaultDetails::UndefinedInstruction {
                opcode: 0x0F,
                disassembly: "(bad) 0x0F".to_string(),
            },
        }
    }

    #[test]
    fn unmaskable_faults_are_not_maskable() {
        let mut fault_unit = FaultUnit::new();
        assert!(!fault_unit.unmasked_fault_active());
        // Any attempt to mask an unmaskable fault should itself result in an error.
        assert!(fault_unit.mask(FaultKind::Queue).is_err());
        fault_unit.clear_all_faults();
        assert!(matches!(
            fault_unit.fire_if_not_masked(Fault {
                address: None,
                details: FaultDetails::Queue {
                    error: QueueError::Empty,
                    activity: "execution",
                },
            }),
            Err(Fault {
                details: FaultDetails::Queue { .. },
                ..
            })
        ));
        assert!(fault_unit.unmasked_fault_active());
    }

    #[test]
    fn maskable_faults_are_masked_by_default() {
        let mut fault_unit = FaultUnit::new();
        assert_eq!(fault_unit.fire_if_not_masked(undefined()), Ok(()));
        assert!(!fault_unit.unmasked_fault_active());
        let status = fault_unit
            .get_status_of_fault("undefined-instruction")
            .expect("fault name is known");
        assert!(status.active);
        assert!(status.masked);
        assert!(status.message.contains("unrecognized opcode"));
    }

    #[test]
    fn unmasked_faults_fire() {
        let mut fault_unit = FaultUnit::new();
        fault_unit.unmask(FaultKind::UndefinedInstruction);
        assert_eq!(fault_unit.fire_if_not_masked(undefined()), Err(undefined()));
        assert!(fault_unit.unmasked_fault_active());
        fault_unit.clear_all_faults();
        assert!(!fault_unit.unmasked_fault_active());
    }

    #[test]
    fn always_fire_on_masked_fault_reports_bug() {
        let mut fault_unit = FaultUnit::new();
        let fired = fault_unit.always_fire(undefined());
        assert_eq!(fired.kind(), FaultKind::Bug);
        assert_eq!(fired.address, Some(0x100));
    }

    #[test]
    fn statuses_cover_every_kind() {
        let fault_unit = FaultUnit::new();
        let names: Vec<String> = fault_unit
            .get_fault_statuses()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(
            names,
            ["undefined-instruction", "unattached-port", "queue", "bug"]
        );
    }
}
