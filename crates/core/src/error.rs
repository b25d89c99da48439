//! Error types for the tabula table engine.

use crate::row::RowKey;
use alloc::string::String;
use core::fmt;

/// Result type alias for tabula operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types for tabula operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Referencing a column name that does not exist.
    UnknownColumn {
        column: String,
    },
    /// Using a view, statement or record whose table or column is gone.
    DeadReference {
        what: String,
    },
    /// The storage driver does not implement the requested tier.
    UnsupportedCapability {
        driver: String,
        capability: String,
    },
    /// Invalid caller-supplied argument.
    InvalidArgument {
        message: String,
    },
    /// An aggregate that needs at least one element saw none.
    EmptyAggregate {
        aggregate: String,
    },
    /// A stat module with this name is already registered.
    DuplicateModuleName {
        name: String,
    },
    /// No stat module with this name is registered.
    UnknownModule {
        name: String,
    },
    /// Row key not present in the storage driver.
    NotFound {
        key: RowKey,
    },
    /// Failure reported by an external collaborator.
    External {
        message: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnknownColumn { column } => {
                write!(f, "Unknown column: {}", column)
            }
            Error::DeadReference { what } => {
                write!(f, "Dead reference: {} no longer exists", what)
            }
            Error::UnsupportedCapability { driver, capability } => {
                write!(f, "Driver {} does not support {}", driver, capability)
            }
            Error::InvalidArgument { message } => {
                write!(f, "Invalid argument: {}", message)
            }
            Error::EmptyAggregate { aggregate } => {
                write!(f, "Aggregate {} needs at least one value", aggregate)
            }
            Error::DuplicateModuleName { name } => {
                write!(f, "Stat module already registered: {}", name)
            }
            Error::UnknownModule { name } => {
                write!(f, "No such stat: {}", name)
            }
            Error::NotFound { key } => {
                write!(f, "Row not found: {}", key)
            }
            Error::External { message } => {
                write!(f, "External engine error: {}", message)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

impl Error {
    /// Creates an unknown column error.
    pub fn unknown_column(column: impl Into<String>) -> Self {
        Error::UnknownColumn {
            column: column.into(),
        }
    }

    /// Creates a dead reference error.
    pub fn dead_reference(what: impl Into<String>) -> Self {
        Error::DeadReference { what: what.into() }
    }

    /// Creates an unsupported capability error.
    pub fn unsupported(driver: impl Into<String>, capability: impl Into<String>) -> Self {
        Error::UnsupportedCapability {
            driver: driver.into(),
            capability: capability.into(),
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an empty aggregate error.
    pub fn empty_aggregate(aggregate: impl Into<String>) -> Self {
        Error::EmptyAggregate {
            aggregate: aggregate.into(),
        }
    }

    /// Creates a duplicate module name error.
    pub fn duplicate_module(name: impl Into<String>) -> Self {
        Error::DuplicateModuleName { name: name.into() }
    }

    /// Creates an unknown module error.
    pub fn unknown_module(name: impl Into<String>) -> Self {
        Error::UnknownModule { name: name.into() }
    }

    /// Creates a not found error.
    pub fn not_found(key: RowKey) -> Self {
        Error::NotFound { key }
    }

    /// Creates an external collaborator error.
    pub fn external(message: impl Into<String>) -> Self {
        Error::External {
            message: message.into(),
        }
    }

    /// Returns true if this is a `NotFound` error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Returns true if this is a `DeadReference` error.
    pub fn is_dead_reference(&self) -> bool {
        matches!(self, Error::DeadReference { .. })
    }
}
