use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// OPC UA GUID with the 16-byte wire layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Guid {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

impl Guid {
    /// The all-zero GUID.
    #[must_use]
    pub const fn null() -> Self {
        Self {
            data1: 0,
            data2: 0,
            data3: 0,
            data4: [0; 8],
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        *self == Self::null()
    }

    pub fn clear(&mut self) {
        *self = Self::null();
    }
}

fn parse_hex_group(text: &str, digits: usize) -> Result<u64> {
    if text.len() != digits || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::InvalidParameters);
    }
    u64::from_str_radix(text, 16).map_err(|_| Error::InvalidParameters)
}

impl FromStr for Guid {
    type Err = Error;

    /// Parses the textual form `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`.
    fn from_str(text: &str) -> Result<Self> {
        let mut groups = text.split('-');
        let g1 = parse_hex_group(groups.next().ok_or(Error::InvalidParameters)?, 8)?;
        let g2 = parse_hex_group(groups.next().ok_or(Error::InvalidParameters)?, 4)?;
        let g3 = parse_hex_group(groups.next().ok_or(Error::InvalidParameters)?, 4)?;
        let g4 = parse_hex_group(groups.next().ok_or(Error::InvalidParameters)?, 4)?;
        let g5 = parse_hex_group(groups.next().ok_or(Error::InvalidParameters)?, 12)?;
        if groups.next().is_some() {
            return Err(Error::InvalidParameters);
        }

        let mut data4 = [0_u8; 8];
        data4[0] = (g4 >> 8) as u8;
        data4[1] = (g4 & 0xFF) as u8;
        for (i, byte) in data4[2..].iter_mut().enumerate() {
            *byte = ((g5 >> (8 * (5 - i))) & 0xFF) as u8;
        }

        Ok(Self {
            data1: g1 as u32,
            data2: g2 as u16,
            data3: g3 as u16,
            data4,
        })
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            self.data1,
            self.data2,
            self.data3,
            self.data4[0],
            self.data4[1],
            self.data4[2],
            self.data4[3],
            self.data4[4],
            self.data4[5],
            self.data4[6],
            self.data4[7],
        )
    }
}

#[cfg(feature = "uuid")]
impl From<uuid::Uuid> for Guid {
    fn from(uuid: uuid::Uuid) -> Self {
        let (data1, data2, data3, data4) = uuid.as_fields();
        Self {
            data1,
            data2,
            data3,
            data4: *data4,
        }
    }
}

#[cfg(feature = "uuid")]
impl From<Guid> for uuid::Uuid {
    fn from(guid: Guid) -> Self {
        uuid::Uuid::from_fields(guid.data1, guid.data2, guid.data3, &guid.data4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_round_trip() {
        let text = "72962b91-fa75-4ae6-8d28-b404dc7daf63";
        let guid = Guid::from_str(text).unwrap();
        assert_eq!(guid.data1, 0x7296_2b91);
        assert_eq!(guid.data2, 0xfa75);
        assert_eq!(guid.data3, 0x4ae6);
        assert_eq!(guid.data4, [0x8d, 0x28, 0xb4, 0x04, 0xdc, 0x7d, 0xaf, 0x63]);
        assert_eq!(guid.to_string(), text);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(Guid::from_str("not-a-guid").is_err());
        assert!(Guid::from_str("72962b91-fa75-4ae6-8d28").is_err());
        assert!(Guid::from_str("72962b91-fa75-4ae6-8d28-b404dc7daf6z").is_err());
    }
}
