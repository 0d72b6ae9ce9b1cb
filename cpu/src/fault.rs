//! Faults: conditions detected by the emulated CPU which may stop
//! execution.
use std::error::Error;
use std::fmt::{self, Display, Formatter};

use serde::Serialize;

use crate::decoded::QueueError;

/// Describes whether a particular kind of fault can be masked.
#[derive(Debug, PartialEq, Eq)]
pub enum FaultMaskability {
    Maskable,
    Unmaskable,
}

/// The kinds of fault the emulator can raise.  The meanings of the
/// values are described in [`FaultDetails`].
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord, Serialize)]
pub enum FaultKind {
    UndefinedInstruction,
    UnattachedPort,
    Queue,
    Bug,
}

impl Display for FaultKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        f.write_str(match self {
            FaultKind::UndefinedInstruction => "undefined-instruction",
            FaultKind::UnattachedPort => "unattached-port",
            FaultKind::Queue => "queue",
            FaultKind::Bug => "bug",
        })
    }
}

impl FaultKind {
    /// Indicates whether a fault can be masked.
    #[must_use]
    pub fn maskable(&self) -> FaultMaskability {
        match self {
            FaultKind::Queue | FaultKind::Bug => FaultMaskability::Unmaskable,
            FaultKind::UndefinedInstruction | FaultKind::UnattachedPort => {
                FaultMaskability::Maskable
            }
        }
    }

    #[must_use]
    pub const fn all_fault_kinds() -> [FaultKind; 4] {
        [
            FaultKind::UndefinedInstruction,
            FaultKind::UnattachedPort,
            FaultKind::Queue,
            FaultKind::Bug,
        ]
    }
}

#[derive(Debug)]
pub struct UnknownFaultName(String);

impl Display for UnknownFaultName {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "unknown fault name '{}'", self.0)
    }
}

impl Error for UnknownFaultName {}

impl TryFrom<&str> for FaultKind {
    type Error = UnknownFaultName;
    fn try_from(s: &str) -> Result<FaultKind, UnknownFaultName> {
        match s {
            "undefined-instruction" => Ok(FaultKind::UndefinedInstruction),
            "unattached-port" => Ok(FaultKind::UnattachedPort),
            "queue" => Ok(FaultKind::Queue),
            "bug" => Ok(FaultKind::Bug),
            _ => Err(UnknownFaultName(s.to_owned())),
        }
    }
}

#[test]
fn test_fault_kind_round_trip() {
    for orig_kind in FaultKind::all_fault_kinds() {
        let name = orig_kind.to_string();
        match FaultKind::try_from(name.as_str()) {
            Ok(k) => {
                assert_eq!(k, orig_kind);
            }
            Err(_) => {
                panic!("unable to round-trip fault kind {orig_kind:?}");
            }
        }
    }
    assert!(FaultKind::try_from("this is not a fault name").is_err());
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultDetails {
    /// The execution unit met an instruction it does not recognise
    /// (or recognises but does not model).
    UndefinedInstruction {
        opcode: u32,
        disassembly: String,
    },

    /// An IN or OUT instruction addressed a port to which no device
    /// is attached.  `value` is the value being written, for OUT.
    UnattachedPort { port: u16, value: Option<u16> },

    /// A pipeline queue was used incorrectly.
    Queue {
        error: QueueError,
        activity: &'static str,
    },

    /// There is a bug in the emulator.
    Bug { message: String },
}

impl FaultDetails {
    #[must_use]
    pub fn kind(&self) -> FaultKind {
        match self {
            FaultDetails::UndefinedInstruction { .. } => FaultKind::UndefinedInstruction,
            FaultDetails::UnattachedPort { .. } => FaultKind::UnattachedPort,
            FaultDetails::Queue { .. } => FaultKind::Queue,
            FaultDetails::Bug { .. } => FaultKind::Bug,
        }
    }
}

impl Display for FaultDetails {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            FaultDetails::UndefinedInstruction {
                opcode,
                disassembly,
            } => write!(f, "unrecognized opcode {opcode:#04X} ({disassembly})"),
            FaultDetails::UnattachedPort {
                port,
                value: Some(value),
            } => write!(
                f,
                "write of {value:#06X} to port {port:#06X}, which has no device attached"
            ),
            FaultDetails::UnattachedPort { port, value: None } => {
                write!(f, "read from port {port:#06X}, which has no device attached")
            }
            FaultDetails::Queue { error, activity } => write!(f, "{error} during {activity}"),
            FaultDetails::Bug { message } => write!(f, "emulator bug: {message}"),
        }
    }
}

/// Describes a fault, together with the address of the instruction
/// which caused it (if any).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub address: Option<u32>,
    pub details: FaultDetails,
}

impl Fault {
    #[must_use]
    pub fn kind(&self) -> FaultKind {
        self.details.kind()
    }

    pub(crate) fn bug(message: String) -> Fault {
        Fault {
            address: None,
            details: FaultDetails::Bug { message },
        }
    }
}

impl Display for Fault {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        if let Some(address) = self.address {
            write!(f, "{} at address {address:#07X}", self.details)
        } else {
            write!(f, "{}", self.details)
        }
    }
}

impl Error for Fault {}

#[test]
fn test_undefined_instruction_message() {
    let fault = Fault {
        address: Some(0x7C00),
        details: FaultDetails::UndefinedInstruction {
            opcode: 0x0F,
            disassembly: "(bad) 0x0F".to_string(),
        },
    };
    assert_eq!(
        fault.to_string(),
        "unrecognized opcode 0x0F ((bad) 0x0F) at address 0x07C00"
    );
}
