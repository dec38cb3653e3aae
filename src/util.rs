//! Defines the `Error` type for the ijgp library

use std::error::Error;
use std::fmt;
use std::io;
use std::result;

pub type Result<T> = result::Result<T, IjgpError>;

#[derive(Debug)]
pub enum IjgpError {

    /// An unknown property key, or a property value that could not be parsed
    InvalidConfig(String),

    /// An elimination order that does not cover every variable of the model
    InvalidOrder,

    /// An elimination operator outside of the supported sum/max pair
    UnknownElimOp,

    /// An operation this algorithm cannot provide (e.g. bounds on the
    /// partition function, which IJGP does not compute due to overcounting)
    NotSupported(String),

    /// Represents an incomplete assignment where a complete assignment was required
    IncompleteAssignment,

    /// Represents an error where a certain constraint on a scope was not satisfied
    InvalidScope,

    /// A variable that was declared twice with conflicting cardinalities
    DuplicateVariable,

    /// Failure to open or write the solution file
    Io(io::Error),

    /// A general error with the given description
    General(String)

}

impl fmt::Display for IjgpError {

    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            &IjgpError::InvalidConfig(ref msg) => write!(f, "Invalid configuration: {}", msg),
            &IjgpError::InvalidOrder => write!(f, "The elimination order does not cover the model"),
            &IjgpError::UnknownElimOp => write!(f, "Unknown elimination operator"),
            &IjgpError::NotSupported(ref msg) => write!(f, "Not supported: {}", msg),
            &IjgpError::IncompleteAssignment => write!(f, "Missing assignments to the required Variables"),
            &IjgpError::InvalidScope => write!(f, "Provided scope did not satisfy constraints"),
            &IjgpError::DuplicateVariable => write!(f, "A variable was declared twice with conflicting cardinalities"),
            &IjgpError::Io(ref err) => write!(f, "I/O error: {}", err),
            &IjgpError::General(ref err) => write!(f, "{}", err)
        }
    }

}

impl Error for IjgpError {

    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            &IjgpError::Io(ref err) => Some(err),
            _ => None
        }
    }

}

impl From<io::Error> for IjgpError {

    fn from(err: io::Error) -> IjgpError {
        IjgpError::Io(err)
    }

}
