use std::fmt;

/// OPC UA byte string.
///
/// Same wire shape as [`crate::ua::String`]: a signed 32-bit length prefix
/// where `-1` denotes the null byte string, followed by raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ByteString(Option<Vec<u8>>);

impl ByteString {
    #[must_use]
    pub const fn null() -> Self {
        Self(None)
    }

    #[must_use]
    pub const fn empty() -> Self {
        Self(Some(Vec::new()))
    }

    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        debug_assert!(bytes.len() <= i32::MAX as usize);
        Self(Some(bytes))
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.0.is_none()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(&self.0, Some(bytes) if bytes.is_empty())
    }

    /// Returns the wire length, `-1` for the null byte string.
    #[must_use]
    pub fn len(&self) -> i32 {
        match &self.0 {
            Some(bytes) => i32::try_from(bytes.len()).unwrap_or(i32::MAX),
            None => -1,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        self.0.as_deref()
    }

    pub fn clear(&mut self) {
        self.0 = None;
    }
}

impl From<&[u8]> for ByteString {
    fn from(bytes: &[u8]) -> Self {
        Self(Some(bytes.to_vec()))
    }
}

impl fmt::Display for ByteString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(bytes) => {
                for byte in bytes {
                    write!(f, "{byte:02X}")?;
                }
                Ok(())
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_and_empty_are_distinct() {
        assert_ne!(ByteString::null(), ByteString::empty());
        assert_eq!(ByteString::null().len(), -1);
    }

    #[test]
    fn hex_display() {
        let bs = ByteString::from(&[0x48_u8, 0x65][..]);
        assert_eq!(bs.to_string(), "4865");
    }
}
