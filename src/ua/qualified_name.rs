use std::fmt;
use std::str::FromStr;

use crate::ua;
use crate::{Error, Result};

/// OPC UA qualified name: a namespace index and a name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QualifiedName {
    pub namespace_index: u16,
    pub name: ua::String,
}

impl QualifiedName {
    #[must_use]
    pub fn new(namespace_index: u16, name: &str) -> Self {
        Self {
            namespace_index,
            name: ua::String::from(name),
        }
    }

    #[must_use]
    pub const fn null() -> Self {
        Self {
            namespace_index: 0,
            name: ua::String::null(),
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        self.namespace_index == 0 && self.name.len() <= 0
    }

    pub fn clear(&mut self) {
        *self = Self::null();
    }
}

impl FromStr for QualifiedName {
    type Err = Error;

    /// Parses the textual form `[<namespace-digits>:]<name>`.
    ///
    /// Without an all-digits namespace prefix the whole text is the name in
    /// namespace 0. A digits prefix exceeding the namespace index range is
    /// rejected.
    fn from_str(text: &str) -> Result<Self> {
        match text.split_once(':') {
            Some((digits, name)) if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
                let namespace_index = digits.parse::<u16>().map_err(|_| Error::InvalidParameters)?;
                Ok(Self::new(namespace_index, name))
            }
            _ => Ok(Self::new(0, text)),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace_index != 0 {
            write!(f, "{}:", self.namespace_index)?;
        }
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_with_and_without_namespace() {
        assert_eq!(
            QualifiedName::from_str("0:Foo").unwrap(),
            QualifiedName::new(0, "Foo")
        );
        assert_eq!(
            QualifiedName::from_str("2:Counter").unwrap(),
            QualifiedName::new(2, "Counter")
        );
        assert_eq!(
            QualifiedName::from_str("Plain").unwrap(),
            QualifiedName::new(0, "Plain")
        );
    }

    #[test]
    fn namespace_prefix_edge_cases() {
        assert!(QualifiedName::from_str("99999:Too").is_err());
        assert_eq!(
            QualifiedName::from_str("x1:NotDigits").unwrap(),
            QualifiedName::new(0, "x1:NotDigits")
        );
    }
}
