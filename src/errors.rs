use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum SimulatorError {
    // Decode errors
    UnknownInstruction(u32),
    UnknownOperation {
        opcode: u32,
        funct3: u32,
        funct7: u32,
    },
    UndispatchableType(String),

    // Modelling bugs surfaced at runtime
    InvariantViolation(String),

    // System errors
    IoError(std::io::Error),
    MalformedInput(String),
}

impl fmt::Display for SimulatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulatorError::UnknownInstruction(raw) => {
                write!(f, "Unknown instruction encoding: 0x{:08X}", raw)
            },
            SimulatorError::UnknownOperation { opcode, funct3, funct7 } => {
                write!(
                    f,
                    "Unknown operation: opcode=0b{:07b} funct3=0b{:03b} funct7=0b{:07b}",
                    opcode, funct3, funct7
                )
            },
            SimulatorError::UndispatchableType(tag) => {
                write!(f, "No execution unit mapped for instruction type {}", tag)
            },
            SimulatorError::InvariantViolation(msg) => {
                write!(f, "Invariant violation: {}", msg)
            },
            SimulatorError::IoError(err) => write!(f, "I/O error: {}", err),
            SimulatorError::MalformedInput(msg) => {
                write!(f, "Malformed input file: {}", msg)
            },
        }
    }
}

impl Error for SimulatorError {}

impl From<std::io::Error> for SimulatorError {
    fn from(error: std::io::Error) -> Self {
        SimulatorError::IoError(error)
    }
}
