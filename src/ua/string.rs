use std::fmt;
use std::str;

/// OPC UA string.
///
/// A length-prefixed byte sequence on the wire. The null string (wire length
/// `-1`) is distinct from the empty string (wire length `0`); both compare
/// unequal. Content is expected to be UTF-8 but is kept as raw bytes, as on
/// the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct String(Option<Vec<u8>>);

impl String {
    /// Creates the null string.
    #[must_use]
    pub const fn null() -> Self {
        Self(None)
    }

    /// Creates the empty (non-null) string.
    #[must_use]
    pub const fn empty() -> Self {
        Self(Some(Vec::new()))
    }

    /// Creates a string holding the given bytes.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        debug_assert!(bytes.len() <= i32::MAX as usize);
        Self(Some(bytes))
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.0.is_none()
    }

    /// Checks for the empty string. The null string is not empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(&self.0, Some(bytes) if bytes.is_empty())
    }

    /// Returns the wire length, `-1` for the null string.
    #[must_use]
    pub fn len(&self) -> i32 {
        match &self.0 {
            // Lengths beyond `i32::MAX` are rejected on construction.
            Some(bytes) => i32::try_from(bytes.len()).unwrap_or(i32::MAX),
            None => -1,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        self.0.as_deref()
    }

    /// Returns the content as UTF-8 text, `None` for null or invalid UTF-8.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.0.as_deref().and_then(|bytes| str::from_utf8(bytes).ok())
    }

    /// Resets to the null string, releasing owned storage.
    pub fn clear(&mut self) {
        self.0 = None;
    }
}

impl From<&str> for String {
    /// # Panics
    ///
    /// The text must not be longer than `i32::MAX` bytes (the wire length is
    /// a signed 32-bit value).
    fn from(text: &str) -> Self {
        assert!(text.len() <= i32::MAX as usize, "string exceeds wire length");
        Self(Some(text.as_bytes().to_vec()))
    }
}

impl From<std::string::String> for String {
    fn from(text: std::string::String) -> Self {
        Self::from(text.as_str())
    }
}

impl fmt::Display for String {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(bytes) => f.write_str(&std::string::String::from_utf8_lossy(bytes)),
            None => Ok(()),
        }
    }
}

/// OPC UA XML element, carried as a string on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct XmlElement(pub String);

impl XmlElement {
    #[must_use]
    pub const fn null() -> Self {
        Self(String::null())
    }

    #[must_use]
    pub fn len(&self) -> i32 {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for XmlElement {
    fn from(text: &str) -> Self {
        Self(String::from(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_is_not_empty() {
        assert_ne!(String::null(), String::empty());
        assert_eq!(String::null().len(), -1);
        assert_eq!(String::empty().len(), 0);
        assert!(String::null().is_null());
        assert!(!String::null().is_empty());
        assert!(String::empty().is_empty());
    }

    #[test]
    fn from_text_round_trips() {
        let s = String::from("Hello");
        assert_eq!(s.len(), 5);
        assert_eq!(s.as_str(), Some("Hello"));
    }

    #[test]
    fn clear_resets_to_null() {
        let mut s = String::from("x");
        s.clear();
        assert!(s.is_null());
    }
}
