//! Endpoint address parsing and validation.
//!
//! Addresses are `scheme://host[:port][/path]` strings. The `local` scheme
//! designates in-process loopback: such addresses name a purely in-memory
//! double with no real socket, so they bypass host and port validation
//! entirely.

use std::fmt;

use crate::error::{Error, Result};
use crate::Port;

/// Scheme prefix that bypasses network address validation.
const LOCAL_SCHEME: &str = "local";

/// A parsed endpoint address.
///
/// The raw string is kept verbatim — it is the registry key — alongside the
/// parsed parts needed to match an address against a reserved port.
///
/// # Examples
///
/// ```
/// use portside::address::Address;
///
/// let addr = Address::parse("http://localhost:8080/ws/bank").unwrap();
/// assert_eq!(addr.scheme(), "http");
/// assert_eq!(addr.host(), Some("localhost"));
/// assert_eq!(addr.port().unwrap().value(), 8080);
/// assert_eq!(addr.path(), "/ws/bank");
///
/// let local = Address::parse("local://bank").unwrap();
/// assert!(local.is_local());
/// assert_eq!(local.port(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    raw: String,
    scheme: String,
    host: Option<String>,
    port: Option<Port>,
    path: String,
}

impl Address {
    /// Parses and validates an address string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] when the scheme is missing, the
    /// host is empty, or the port is not a valid number — except for
    /// `local://` addresses, which skip all of that.
    pub fn parse(raw: &str) -> Result<Self> {
        let (scheme, rest) = raw.split_once("://").ok_or_else(|| invalid(raw, "missing scheme"))?;

        if scheme.is_empty() {
            return Err(invalid(raw, "missing scheme"));
        }

        if scheme == LOCAL_SCHEME {
            return Ok(Self {
                raw: raw.to_string(),
                scheme: scheme.to_string(),
                host: None,
                port: None,
                path: rest.to_string(),
            });
        }

        let (authority, path) = match rest.find('/') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, ""),
        };

        let (host, port) = split_authority(raw, authority)?;
        if host.is_empty() {
            return Err(invalid(raw, "empty host"));
        }

        Ok(Self {
            raw: raw.to_string(),
            scheme: scheme.to_string(),
            host: Some(host.to_string()),
            port,
            path: path.to_string(),
        })
    }

    /// The verbatim address string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The address scheme.
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The host, absent for `local://` addresses.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// The explicit port, if the address carries one.
    #[must_use]
    pub fn port(&self) -> Option<Port> {
        self.port
    }

    /// The path component (may be empty).
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns `true` for in-process loopback addresses.
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.scheme == LOCAL_SCHEME
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Splits `host[:port]`, handling bracketed IPv6 hosts.
fn split_authority<'a>(raw: &str, authority: &'a str) -> Result<(&'a str, Option<Port>)> {
    if let Some(stripped) = authority.strip_prefix('[') {
        let end = stripped
            .find(']')
            .ok_or_else(|| invalid(raw, "unterminated IPv6 host"))?;
        let host = &authority[..end + 2];
        let rest = &stripped[end + 1..];
        return match rest.strip_prefix(':') {
            Some(port) => Ok((host, Some(parse_port(raw, port)?))),
            None if rest.is_empty() => Ok((host, None)),
            None => Err(invalid(raw, "garbage after IPv6 host")),
        };
    }

    match authority.rsplit_once(':') {
        Some((host, port)) => Ok((host, Some(parse_port(raw, port)?))),
        None => Ok((authority, None)),
    }
}

fn parse_port(raw: &str, text: &str) -> Result<Port> {
    let value: u16 = text
        .parse()
        .map_err(|_| invalid(raw, &format!("invalid port '{text}'")))?;
    Port::try_from(value).map_err(|err| invalid(raw, &err.reason))
}

fn invalid(address: &str, reason: &str) -> Error {
    Error::InvalidAddress {
        address: address.to_string(),
        reason: reason.to_string(),
    }
}
