use crate::ua;

/// OPC UA diagnostic information attached to operation results.
///
/// The string fields are indices into the response string table, `-1` when
/// absent.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiagnosticInfo {
    pub symbolic_id: i32,
    pub namespace_uri: i32,
    pub locale: i32,
    pub localized_text: i32,
    pub additional_info: ua::String,
    pub inner_status_code: ua::StatusCode,
    pub inner_diagnostic_info: Option<Box<DiagnosticInfo>>,
}

impl DiagnosticInfo {
    #[must_use]
    pub const fn null() -> Self {
        Self {
            symbolic_id: -1,
            namespace_uri: -1,
            locale: -1,
            localized_text: -1,
            additional_info: ua::String::null(),
            inner_status_code: ua::StatusCode::GOOD,
            inner_diagnostic_info: None,
        }
    }

    pub fn clear(&mut self) {
        *self = Self::null();
    }
}

impl Default for DiagnosticInfo {
    fn default() -> Self {
        Self::null()
    }
}
