use std::fmt;
use std::str::FromStr;

use crate::ua::{self, base64};
use crate::{Error, Result};

/// Identifier kind and payload of a [`NodeId`].
///
/// The discriminant values match the wire encoding of the identifier type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Identifier {
    Numeric(u32),
    String(ua::String),
    Guid(ua::Guid),
    ByteString(ua::ByteString),
}

impl Identifier {
    /// Wire value of the identifier type.
    #[must_use]
    pub const fn type_value(&self) -> u8 {
        match self {
            Self::Numeric(_) => 0x00,
            Self::String(_) => 0x01,
            Self::Guid(_) => 0x02,
            Self::ByteString(_) => 0x03,
        }
    }
}

/// OPC UA node identifier: a namespace index and a typed identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId {
    pub namespace: u16,
    pub identifier: Identifier,
}

impl NodeId {
    /// Creates a node ID with a numeric identifier.
    #[must_use]
    pub const fn numeric(namespace: u16, numeric: u32) -> Self {
        Self {
            namespace,
            identifier: Identifier::Numeric(numeric),
        }
    }

    /// Creates a node ID with a string identifier.
    #[must_use]
    pub fn string(namespace: u16, string: &str) -> Self {
        Self {
            namespace,
            identifier: Identifier::String(ua::String::from(string)),
        }
    }

    /// Creates a node ID with a GUID identifier.
    #[must_use]
    pub const fn guid(namespace: u16, guid: ua::Guid) -> Self {
        Self {
            namespace,
            identifier: Identifier::Guid(guid),
        }
    }

    /// Creates a node ID with a byte string identifier.
    #[must_use]
    pub fn byte_string(namespace: u16, bytes: &[u8]) -> Self {
        Self {
            namespace,
            identifier: Identifier::ByteString(ua::ByteString::from(bytes)),
        }
    }

    /// The null node ID `(ns=0, i=0)`.
    #[must_use]
    pub const fn null() -> Self {
        Self::numeric(0, 0)
    }

    /// Checks for the null node ID in any of its wire spellings.
    #[must_use]
    pub fn is_null(&self) -> bool {
        if self.namespace != 0 {
            return false;
        }
        match &self.identifier {
            Identifier::Numeric(numeric) => *numeric == 0,
            Identifier::String(string) => string.is_null() || string.is_empty(),
            Identifier::Guid(guid) => guid.is_null(),
            Identifier::ByteString(bytes) => bytes.is_null() || bytes.is_empty(),
        }
    }

    /// Returns the numeric identifier, if this is a numeric node ID.
    #[must_use]
    pub const fn numeric_value(&self) -> Option<u32> {
        match &self.identifier {
            Identifier::Numeric(numeric) => Some(*numeric),
            _ => None,
        }
    }

    pub fn clear(&mut self) {
        *self = Self::null();
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::null()
    }
}

impl FromStr for NodeId {
    type Err = Error;

    /// Parses the textual form `[ns=<digits>;]{i=<u32>|s=<utf8>|g=<uuid>|b=<base64>}`.
    fn from_str(text: &str) -> Result<Self> {
        let (namespace, rest) = match text.strip_prefix("ns=") {
            Some(rest) => {
                let (digits, rest) = rest.split_once(';').ok_or(Error::InvalidParameters)?;
                let namespace = digits.parse::<u16>().map_err(|_| Error::InvalidParameters)?;
                (namespace, rest)
            }
            None => (0, text),
        };

        let (kind, payload) = rest.split_once('=').ok_or(Error::InvalidParameters)?;
        let identifier = match kind {
            "i" => {
                let numeric = payload.parse::<u32>().map_err(|_| Error::InvalidParameters)?;
                Identifier::Numeric(numeric)
            }
            "s" => Identifier::String(ua::String::from(payload)),
            "g" => Identifier::Guid(ua::Guid::from_str(payload)?),
            "b" => Identifier::ByteString(ua::ByteString::from_bytes(base64::decode(payload)?)),
            _ => return Err(Error::InvalidParameters),
        };

        Ok(Self {
            namespace,
            identifier,
        })
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace != 0 {
            write!(f, "ns={};", self.namespace)?;
        }
        match &self.identifier {
            Identifier::Numeric(numeric) => write!(f, "i={numeric}"),
            Identifier::String(string) => write!(f, "s={string}"),
            Identifier::Guid(guid) => write!(f, "g={guid}"),
            Identifier::ByteString(bytes) => {
                let encoded = base64::encode(bytes.as_bytes().unwrap_or_default());
                write!(f, "b={encoded}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_all_identifier_kinds() {
        assert_eq!(NodeId::from_str("i=84").unwrap(), NodeId::numeric(0, 84));
        assert_eq!(
            NodeId::from_str("ns=4;s=Counter").unwrap(),
            NodeId::string(4, "Counter")
        );
        let guid = NodeId::from_str("g=72962b91-fa75-4ae6-8d28-b404dc7daf63").unwrap();
        assert!(matches!(guid.identifier, Identifier::Guid(_)));
        assert_eq!(
            NodeId::from_str("b=SGVsbG8=").unwrap(),
            NodeId::byte_string(0, b"Hello")
        );
    }

    #[test]
    fn to_string_round_trip() {
        for text in ["i=84", "ns=2;i=1000", "s=Obj", "ns=12;s=a;b", "b=SGVsbG8="] {
            let id = NodeId::from_str(text).unwrap();
            assert_eq!(NodeId::from_str(&id.to_string()).unwrap(), id);
        }
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(NodeId::from_str("x=1").is_err());
        assert!(NodeId::from_str("ns=4").is_err());
        assert!(NodeId::from_str("ns=70000;i=1").is_err());
        assert!(NodeId::from_str("i=foo").is_err());
        assert!(NodeId::from_str("").is_err());
    }

    #[test]
    fn null_spellings() {
        assert!(NodeId::null().is_null());
        assert!(NodeId::string(0, "").is_null());
        assert!(!NodeId::numeric(1, 0).is_null());
        assert!(!NodeId::numeric(0, 84).is_null());
    }
}
