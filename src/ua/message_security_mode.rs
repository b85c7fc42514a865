use std::fmt;

/// OPC UA message security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u32)]
pub enum MessageSecurityMode {
    Invalid = 0,
    #[default]
    None = 1,
    Sign = 2,
    SignAndEncrypt = 3,
}

impl MessageSecurityMode {
    #[must_use]
    pub const fn from_value(value: u32) -> Self {
        match value {
            1 => Self::None,
            2 => Self::Sign,
            3 => Self::SignAndEncrypt,
            _ => Self::Invalid,
        }
    }

    #[must_use]
    pub const fn value(self) -> u32 {
        self as u32
    }
}

crate::binary::impl_binary_enum!(MessageSecurityMode, MessageSecurityMode::from_value);

impl fmt::Display for MessageSecurityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Invalid => "Invalid",
            Self::None => "None",
            Self::Sign => "Sign",
            Self::SignAndEncrypt => "SignAndEncrypt",
        })
    }
}
