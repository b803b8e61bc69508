//! Address representations shared by every backend.
//!
//! Backends operate on unsigned integers: a 32-bit magnitude for IPv4 and a
//! 128-bit magnitude for IPv6, both carried in a `u128`. This module converts
//! between that form, `std::net::IpAddr` and the canonical textual notation.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::error::{Error, Result};

/// Address family of an input or output address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    /// Number of address bits for this family.
    pub const fn bits(self) -> u32 {
        match self {
            Family::V4 => 32,
            Family::V6 => 128,
        }
    }

    /// Largest integer that is a valid address of this family.
    pub const fn max_value(self) -> u128 {
        match self {
            Family::V4 => u32::MAX as u128,
            Family::V6 => u128::MAX,
        }
    }

    pub fn of(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => Family::V4,
            IpAddr::V6(_) => Family::V6,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Family::V4 => f.write_str("IPv4"),
            Family::V6 => f.write_str("IPv6"),
        }
    }
}

/// An address in one of its two external representations.
///
/// Anonymizing an `Address` returns the same variant it was given: text in,
/// text out; numeric in, numeric out with the same family.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Address {
    /// Dotted-quad IPv4 or colon-separated IPv6 notation.
    Text(String),
    /// Integer magnitude of an address of the given family.
    Numeric { value: u128, family: Family },
}

impl Address {
    /// Returns `true` for the empty textual address, which carries no data.
    pub fn is_empty(&self) -> bool {
        matches!(self, Address::Text(s) if s.is_empty())
    }

    /// Interprets this address as an `IpAddr`.
    pub fn to_ipaddr(&self) -> Result<IpAddr> {
        match self {
            Address::Text(s) => parse_ip(s),
            Address::Numeric { value, family } => numeric_to_ip(*value, *family),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Text(s) => f.write_str(s),
            Address::Numeric { value, family } => match numeric_to_ip(*value, *family) {
                Ok(ip) => write!(f, "{ip}"),
                Err(_) => write!(f, "{value} ({family}, out of range)"),
            },
        }
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Address::Text(s.to_owned())
    }
}

impl From<String> for Address {
    fn from(s: String) -> Self {
        Address::Text(s)
    }
}

impl From<IpAddr> for Address {
    fn from(ip: IpAddr) -> Self {
        let (value, family) = ip_to_numeric(ip);
        Address::Numeric { value, family }
    }
}

impl From<Ipv4Addr> for Address {
    fn from(ip: Ipv4Addr) -> Self {
        Address::from(u32::from(ip))
    }
}

impl From<Ipv6Addr> for Address {
    fn from(ip: Ipv6Addr) -> Self {
        Address::from(u128::from(ip))
    }
}

/// A bare `u32` is an IPv4 address.
impl From<u32> for Address {
    fn from(value: u32) -> Self {
        Address::Numeric {
            value: value.into(),
            family: Family::V4,
        }
    }
}

/// A bare `u128` is an IPv6 address.
impl From<u128> for Address {
    fn from(value: u128) -> Self {
        Address::Numeric {
            value,
            family: Family::V6,
        }
    }
}

/// Parses an IPv4 or IPv6 literal.
pub fn parse_ip(text: &str) -> Result<IpAddr> {
    text.parse::<IpAddr>()
        .map_err(|_| Error::malformed(text, "not an IPv4 or IPv6 literal"))
}

/// Converts an IP address to its integer magnitude and family.
pub fn ip_to_numeric(ip: IpAddr) -> (u128, Family) {
    match ip {
        IpAddr::V4(v4) => (u32::from(v4).into(), Family::V4),
        IpAddr::V6(v6) => (u128::from(v6), Family::V6),
    }
}

/// Converts an integer magnitude back to an IP address of the given family.
///
/// Fails if `value` does not fit in the family's address width.
pub fn numeric_to_ip(value: u128, family: Family) -> Result<IpAddr> {
    check_range(value, family)?;
    Ok(match family {
        Family::V4 => IpAddr::V4(Ipv4Addr::from(value as u32)),
        Family::V6 => IpAddr::V6(Ipv6Addr::from(value)),
    })
}

pub(crate) fn check_range(value: u128, family: Family) -> Result<()> {
    if value > family.max_value() {
        return Err(Error::malformed(
            value,
            "integer exceeds the address width of its family",
        ));
    }
    Ok(())
}

/// Left-aligns an address in a 128-bit block: IPv4 occupies the top 32 bits.
pub(crate) fn left_align(value: u128, family: Family) -> u128 {
    match family {
        Family::V4 => value << 96,
        Family::V6 => value,
    }
}
