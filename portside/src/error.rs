//! Error types for the portside library.
//!
//! One crate-level [`Error`] enum covers every failure a caller can see,
//! using `thiserror`. Leaf validation errors defined next to their types
//! (`InvalidPortError`, `InvalidPortRangeError`) convert into it via `From`.

use thiserror::Error;

use crate::host::HostError;
use crate::port::PortRange;

/// Result type alias for operations that may fail with a portside error.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the portside library.
///
/// Construction and registration errors (`InvalidPort`, `InvalidPortRange`,
/// `Capacity`, `Validation`, `MissingArgument`, `InvalidAddress`,
/// `DuplicateAddress`) indicate a programming or configuration mistake and
/// are never retried. `PortExhausted` is the escalation of environmental
/// contention after a full scan of the range.
#[derive(Debug, Error)]
pub enum Error {
    /// An invalid port number was provided.
    #[error("invalid port {value}: {reason}")]
    InvalidPort {
        /// The invalid port value.
        value: u16,
        /// The reason the port is invalid.
        reason: String,
    },

    /// An invalid port range was specified.
    #[error("invalid port range {min}-{max}: {reason}")]
    InvalidPortRange {
        /// The minimum port in the range.
        min: u16,
        /// The maximum port in the range.
        max: u16,
        /// The reason the range is invalid.
        reason: String,
    },

    /// More slot names were registered than the range has candidate ports.
    #[error("cannot reserve {requested} port(s) in range {range}: only {capacity} candidate port(s)")]
    Capacity {
        /// Total number of slots after the rejected registration.
        requested: usize,
        /// Number of candidate ports in the range.
        capacity: usize,
        /// The configured range.
        range: PortRange,
    },

    /// No candidate port in the range could be reserved after a full scan.
    #[error("unable to reserve a port for '{slot}' in range {range}")]
    PortExhausted {
        /// The slot that could not be reserved.
        slot: String,
        /// The range that was scanned.
        range: PortRange,
    },

    /// A slot name was queried that was never registered.
    #[error("no registered slot named '{name}'")]
    SlotNotFound {
        /// The unknown slot name.
        name: String,
    },

    /// A required publish argument was empty.
    #[error("missing required argument: {name}")]
    MissingArgument {
        /// The name of the missing argument.
        name: &'static str,
    },

    /// An endpoint address could not be parsed.
    #[error("invalid address '{address}': {reason}")]
    InvalidAddress {
        /// The address that failed to parse.
        address: String,
        /// The reason the address is invalid.
        reason: String,
    },

    /// An instance is already published at the given address.
    #[error("an instance is already published at {address}")]
    DuplicateAddress {
        /// The conflicting address.
        address: String,
    },

    /// A validation error occurred.
    #[error("validation error for '{field}': {message}")]
    Validation {
        /// The field that failed validation.
        field: String,
        /// A description of the validation failure.
        message: String,
    },

    /// The hosting framework reported a failure.
    #[error("hosting framework error: {0}")]
    Host(#[from] HostError),

    /// A configuration error occurred.
    #[error("configuration error: {0}")]
    Configuration(#[from] serde_yaml::Error),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<crate::port::InvalidPortError> for Error {
    fn from(err: crate::port::InvalidPortError) -> Self {
        Self::InvalidPort {
            value: err.value,
            reason: err.reason,
        }
    }
}

impl From<crate::port::InvalidPortRangeError> for Error {
    fn from(err: crate::port::InvalidPortRangeError) -> Self {
        Self::InvalidPortRange {
            min: err.min.value(),
            max: err.max.value(),
            reason: err.reason,
        }
    }
}

impl Error {
    /// Check if the error names an unknown slot.
    #[must_use]
    pub fn is_slot_not_found(&self) -> bool {
        matches!(self, Self::SlotNotFound { .. })
    }

    /// Check if the error is an address conflict.
    #[must_use]
    pub fn is_duplicate_address(&self) -> bool {
        matches!(self, Self::DuplicateAddress { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::PortRange;

    #[test]
    fn test_capacity_error_display() {
        let err = Error::Capacity {
            requested: 3,
            capacity: 2,
            range: PortRange::from_bounds(10000, 10001).unwrap(),
        };
        let display = format!("{err}");
        assert!(display.contains("3 port(s)"));
        assert!(display.contains("10000-10001"));
        assert!(display.contains("only 2"));
    }

    #[test]
    fn test_port_exhausted_names_slot() {
        let err = Error::PortExhausted {
            slot: "myPort".to_string(),
            range: PortRange::from_bounds(5000, 5010).unwrap(),
        };
        let display = format!("{err}");
        assert!(display.contains("myPort"));
        assert!(display.contains("5000-5010"));
    }

    #[test]
    fn test_slot_not_found_predicate() {
        let err = Error::SlotNotFound {
            name: "missing".to_string(),
        };
        assert!(err.is_slot_not_found());
        assert!(!err.is_duplicate_address());
        assert!(format!("{err}").contains("missing"));
    }

    #[test]
    fn test_duplicate_address_predicate() {
        let err = Error::DuplicateAddress {
            address: "http://localhost:8080/ws".to_string(),
        };
        assert!(err.is_duplicate_address());
        assert!(format!("{err}").contains("http://localhost:8080/ws"));
    }

    #[test]
    fn test_missing_argument_display() {
        let err = Error::MissingArgument { name: "address" };
        assert_eq!(format!("{err}"), "missing required argument: address");
    }

    #[test]
    fn test_invalid_port_conversion() {
        let err: Error = crate::port::Port::try_from(0).unwrap_err().into();
        assert!(matches!(err, Error::InvalidPort { value: 0, .. }));
    }

    #[test]
    fn test_invalid_range_conversion() {
        let min = crate::port::Port::try_from(5010).unwrap();
        let max = crate::port::Port::try_from(5000).unwrap();
        let err: Error = PortRange::new(min, max).unwrap_err().into();
        assert!(matches!(
            err,
            Error::InvalidPortRange {
                min: 5010,
                max: 5000,
                ..
            }
        ));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use");
        let err: Error = io_err.into();
        assert!(format!("{err}").contains("I/O error"));
    }
}
