use std::fmt;

use crate::ua;

/// OPC UA localized text: a locale identifier and the text itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LocalizedText {
    pub locale: ua::String,
    pub text: ua::String,
}

impl LocalizedText {
    #[must_use]
    pub fn new(locale: &str, text: &str) -> Self {
        Self {
            locale: ua::String::from(locale),
            text: ua::String::from(text),
        }
    }

    /// Creates localized text without a locale.
    #[must_use]
    pub fn text_only(text: &str) -> Self {
        Self {
            locale: ua::String::null(),
            text: ua::String::from(text),
        }
    }

    #[must_use]
    pub const fn null() -> Self {
        Self {
            locale: ua::String::null(),
            text: ua::String::null(),
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        self.locale.len() <= 0 && self.text.len() <= 0
    }

    pub fn clear(&mut self) {
        *self = Self::null();
    }
}

impl fmt::Display for LocalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}
