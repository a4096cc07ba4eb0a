//! Configuration for the reservation range.
//!
//! Settings come from an optional YAML document with `PORTSIDE_*`
//! environment variables taking precedence, so CI can widen or narrow the
//! scan range without touching checked-in test configuration.

use std::env;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::PortRange;

/// Default first port of the scan range (first non-privileged port).
pub const DEFAULT_RANGE_START: u16 = 1025;

/// Default last port of the scan range.
pub const DEFAULT_RANGE_END: u16 = 65535;

/// Reservation configuration.
///
/// # Examples
///
/// ```
/// use portside::config::Config;
///
/// let config = Config::from_yaml_str("port_min: 40000\nport_max: 50000\n").unwrap();
/// let range = config.port_range().unwrap();
/// assert_eq!(range.min().value(), 40000);
/// assert_eq!(range.max().value(), 50000);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// First candidate port; defaults to [`DEFAULT_RANGE_START`].
    pub port_min: Option<u16>,
    /// Last candidate port; defaults to [`DEFAULT_RANGE_END`].
    pub port_max: Option<u16>,
}

impl Config {
    /// Parses configuration from a YAML document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the document does not parse.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Loads configuration from the environment alone.
    ///
    /// # Errors
    ///
    /// Returns an error if an override value is not a valid port number.
    pub fn load() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Applies `PORTSIDE_PORT_MIN` / `PORTSIDE_PORT_MAX` overrides, which
    /// take precedence over values already present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] naming the offending variable if a
    /// value does not parse as a port number.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(value) = env::var("PORTSIDE_PORT_MIN") {
            self.port_min = Some(parse_port_var("PORTSIDE_PORT_MIN", &value)?);
        }
        if let Ok(value) = env::var("PORTSIDE_PORT_MAX") {
            self.port_max = Some(parse_port_var("PORTSIDE_PORT_MAX", &value)?);
        }
        Ok(())
    }

    /// Resolves the configured (or default) scan range.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting bounds do not form a valid range.
    pub fn port_range(&self) -> Result<PortRange> {
        PortRange::from_bounds(
            self.port_min.unwrap_or(DEFAULT_RANGE_START),
            self.port_max.unwrap_or(DEFAULT_RANGE_END),
        )
    }
}

fn parse_port_var(name: &str, value: &str) -> Result<u16> {
    value.parse().map_err(|_| Error::Validation {
        field: name.to_string(),
        message: format!("'{value}' is not a valid port number"),
    })
}
