use std::fmt;

/// Supported OPC UA security policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SecurityPolicy {
    #[default]
    None,
    Basic256,
    Basic256Sha256,
}

impl SecurityPolicy {
    /// The policy URI used on the wire.
    #[must_use]
    pub const fn uri(self) -> &'static str {
        match self {
            Self::None => "http://opcfoundation.org/UA/SecurityPolicy#None",
            Self::Basic256 => "http://opcfoundation.org/UA/SecurityPolicy#Basic256",
            Self::Basic256Sha256 => "http://opcfoundation.org/UA/SecurityPolicy#Basic256Sha256",
        }
    }

    /// Returns the policy for a URI, `None` for unsupported policies.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        [Self::None, Self::Basic256, Self::Basic256Sha256]
            .into_iter()
            .find(|policy| policy.uri() == uri)
    }
}

impl fmt::Display for SecurityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uri_round_trip() {
        for policy in [
            SecurityPolicy::None,
            SecurityPolicy::Basic256,
            SecurityPolicy::Basic256Sha256,
        ] {
            assert_eq!(SecurityPolicy::from_uri(policy.uri()), Some(policy));
        }
        assert_eq!(
            SecurityPolicy::from_uri("http://opcfoundation.org/UA/SecurityPolicy#Basic128Rsa15"),
            None
        );
    }
}
