use std::fmt;

/// OPC UA status code.
///
/// The two most significant bits carry the severity: `00` good, `01`
/// uncertain, `10` bad. The named constants below are the subset of
/// well-known codes used by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusCode(u32);

impl StatusCode {
    pub const GOOD: Self = Self(0x0000_0000);

    pub const UNCERTAIN_INITIAL_VALUE: Self = Self(0x4092_0000);

    pub const BAD_UNEXPECTED_ERROR: Self = Self(0x8001_0000);
    pub const BAD_INTERNAL_ERROR: Self = Self(0x8002_0000);
    pub const BAD_OUT_OF_MEMORY: Self = Self(0x8003_0000);
    pub const BAD_RESOURCE_UNAVAILABLE: Self = Self(0x8004_0000);
    pub const BAD_COMMUNICATION_ERROR: Self = Self(0x8005_0000);
    pub const BAD_ENCODING_ERROR: Self = Self(0x8006_0000);
    pub const BAD_DECODING_ERROR: Self = Self(0x8007_0000);
    pub const BAD_TIMEOUT: Self = Self(0x800A_0000);
    pub const BAD_SERVICE_UNSUPPORTED: Self = Self(0x800B_0000);
    pub const BAD_NOTHING_TO_DO: Self = Self(0x800F_0000);
    pub const BAD_TOO_MANY_OPERATIONS: Self = Self(0x8010_0000);
    pub const BAD_SECURITY_CHECKS_FAILED: Self = Self(0x8013_0000);
    pub const BAD_SERVER_URI_INVALID: Self = Self(0x8014_0000);
    pub const BAD_SERVER_NAME_MISSING: Self = Self(0x8015_0000);
    pub const BAD_DISCOVERY_URL_MISSING: Self = Self(0x8016_0000);
    pub const BAD_USER_ACCESS_DENIED: Self = Self(0x801F_0000);
    pub const BAD_SESSION_ID_INVALID: Self = Self(0x8025_0000);
    pub const BAD_SESSION_CLOSED: Self = Self(0x8026_0000);
    pub const BAD_SESSION_NOT_ACTIVATED: Self = Self(0x8027_0000);
    pub const BAD_NODE_ID_INVALID: Self = Self(0x8033_0000);
    pub const BAD_NODE_ID_UNKNOWN: Self = Self(0x8034_0000);
    pub const BAD_ATTRIBUTE_ID_INVALID: Self = Self(0x8035_0000);
    pub const BAD_INDEX_RANGE_INVALID: Self = Self(0x8036_0000);
    pub const BAD_NOT_READABLE: Self = Self(0x803A_0000);
    pub const BAD_NOT_WRITABLE: Self = Self(0x803B_0000);
    pub const BAD_PARENT_NODE_ID_INVALID: Self = Self(0x805B_0000);
    pub const BAD_REFERENCE_TYPE_ID_INVALID: Self = Self(0x805C_0000);
    pub const BAD_NODE_ID_REJECTED: Self = Self(0x805D_0000);
    pub const BAD_NODE_ID_EXISTS: Self = Self(0x805E_0000);
    pub const BAD_NODE_CLASS_INVALID: Self = Self(0x805F_0000);
    pub const BAD_BROWSE_NAME_INVALID: Self = Self(0x8060_0000);
    pub const BAD_NODE_ATTRIBUTES_INVALID: Self = Self(0x8062_0000);
    pub const BAD_TYPE_DEFINITION_INVALID: Self = Self(0x8063_0000);
    pub const BAD_TCP_MESSAGE_TYPE_INVALID: Self = Self(0x807E_0000);
    pub const BAD_INVALID_ARGUMENT: Self = Self(0x80AB_0000);
    pub const BAD_CONNECTION_CLOSED: Self = Self(0x80AE_0000);
    pub const BAD_INVALID_STATE: Self = Self(0x80AF_0000);

    const SEVERITY_MASK: u32 = 0xC000_0000;
    const SEVERITY_UNCERTAIN: u32 = 0x4000_0000;
    const SEVERITY_BAD: u32 = 0x8000_0000;

    /// Creates a status code from its numeric value.
    #[must_use]
    pub const fn new(code: u32) -> Self {
        Self(code)
    }

    /// Returns the numeric value.
    #[must_use]
    pub const fn code(self) -> u32 {
        self.0
    }

    /// Checks for good severity (includes `Good` itself).
    #[must_use]
    pub const fn is_good(self) -> bool {
        self.0 & Self::SEVERITY_MASK == 0
    }

    /// Checks for uncertain severity.
    #[must_use]
    pub const fn is_uncertain(self) -> bool {
        self.0 & Self::SEVERITY_MASK == Self::SEVERITY_UNCERTAIN
    }

    /// Checks for bad severity.
    #[must_use]
    pub const fn is_bad(self) -> bool {
        self.0 & Self::SEVERITY_MASK == Self::SEVERITY_BAD
    }

    fn name(self) -> Option<&'static str> {
        Some(match self {
            Self::GOOD => "Good",
            Self::UNCERTAIN_INITIAL_VALUE => "UncertainInitialValue",
            Self::BAD_UNEXPECTED_ERROR => "BadUnexpectedError",
            Self::BAD_INTERNAL_ERROR => "BadInternalError",
            Self::BAD_OUT_OF_MEMORY => "BadOutOfMemory",
            Self::BAD_RESOURCE_UNAVAILABLE => "BadResourceUnavailable",
            Self::BAD_COMMUNICATION_ERROR => "BadCommunicationError",
            Self::BAD_ENCODING_ERROR => "BadEncodingError",
            Self::BAD_DECODING_ERROR => "BadDecodingError",
            Self::BAD_TIMEOUT => "BadTimeout",
            Self::BAD_SERVICE_UNSUPPORTED => "BadServiceUnsupported",
            Self::BAD_NOTHING_TO_DO => "BadNothingToDo",
            Self::BAD_TOO_MANY_OPERATIONS => "BadTooManyOperations",
            Self::BAD_SECURITY_CHECKS_FAILED => "BadSecurityChecksFailed",
            Self::BAD_SERVER_URI_INVALID => "BadServerUriInvalid",
            Self::BAD_SERVER_NAME_MISSING => "BadServerNameMissing",
            Self::BAD_DISCOVERY_URL_MISSING => "BadDiscoveryUrlMissing",
            Self::BAD_USER_ACCESS_DENIED => "BadUserAccessDenied",
            Self::BAD_SESSION_ID_INVALID => "BadSessionIdInvalid",
            Self::BAD_SESSION_CLOSED => "BadSessionClosed",
            Self::BAD_SESSION_NOT_ACTIVATED => "BadSessionNotActivated",
            Self::BAD_NODE_ID_INVALID => "BadNodeIdInvalid",
            Self::BAD_NODE_ID_UNKNOWN => "BadNodeIdUnknown",
            Self::BAD_ATTRIBUTE_ID_INVALID => "BadAttributeIdInvalid",
            Self::BAD_INDEX_RANGE_INVALID => "BadIndexRangeInvalid",
            Self::BAD_NOT_READABLE => "BadNotReadable",
            Self::BAD_NOT_WRITABLE => "BadNotWritable",
            Self::BAD_PARENT_NODE_ID_INVALID => "BadParentNodeIdInvalid",
            Self::BAD_REFERENCE_TYPE_ID_INVALID => "BadReferenceTypeIdInvalid",
            Self::BAD_NODE_ID_REJECTED => "BadNodeIdRejected",
            Self::BAD_NODE_ID_EXISTS => "BadNodeIdExists",
            Self::BAD_NODE_CLASS_INVALID => "BadNodeClassInvalid",
            Self::BAD_BROWSE_NAME_INVALID => "BadBrowseNameInvalid",
            Self::BAD_NODE_ATTRIBUTES_INVALID => "BadNodeAttributesInvalid",
            Self::BAD_TYPE_DEFINITION_INVALID => "BadTypeDefinitionInvalid",
            Self::BAD_TCP_MESSAGE_TYPE_INVALID => "BadTcpMessageTypeInvalid",
            Self::BAD_INVALID_ARGUMENT => "BadInvalidArgument",
            Self::BAD_CONNECTION_CLOSED => "BadConnectionClosed",
            Self::BAD_INVALID_STATE => "BadInvalidState",
            _ => return None,
        })
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "0x{:08X}", self.0),
        }
    }
}

impl From<u32> for StatusCode {
    fn from(code: u32) -> Self {
        Self(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity() {
        assert!(StatusCode::GOOD.is_good());
        assert!(StatusCode::UNCERTAIN_INITIAL_VALUE.is_uncertain());
        assert!(StatusCode::BAD_NOTHING_TO_DO.is_bad());
        assert!(!StatusCode::BAD_NOTHING_TO_DO.is_good());
    }

    #[test]
    fn display_known_and_unknown() {
        assert_eq!(StatusCode::GOOD.to_string(), "Good");
        assert_eq!(StatusCode::new(0x8FFF_0000).to_string(), "0x8FFF0000");
    }
}
