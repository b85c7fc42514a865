use crate::ua;

/// OPC UA data value: a variant with quality and timestamps.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataValue {
    pub value: ua::Variant,
    pub status: ua::StatusCode,
    pub source_timestamp: ua::DateTime,
    pub server_timestamp: ua::DateTime,
    pub source_picoseconds: u16,
    pub server_picoseconds: u16,
}

impl DataValue {
    /// Creates a good-quality value with the current server timestamp.
    #[must_use]
    pub fn new(value: ua::Variant) -> Self {
        Self {
            value,
            status: ua::StatusCode::GOOD,
            source_timestamp: ua::DateTime::null(),
            server_timestamp: ua::DateTime::now(),
            source_picoseconds: 0,
            server_picoseconds: 0,
        }
    }

    /// Creates a value-less result carrying only a status.
    #[must_use]
    pub fn from_status(status: ua::StatusCode) -> Self {
        Self {
            value: ua::Variant::Empty,
            status,
            source_timestamp: ua::DateTime::null(),
            server_timestamp: ua::DateTime::null(),
            source_picoseconds: 0,
            server_picoseconds: 0,
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
