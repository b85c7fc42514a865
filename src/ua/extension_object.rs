use std::any::Any;
use std::fmt;
use std::io;

use crate::ua;
use crate::{Error, Result};

/// A structured type that can travel inside an [`ExtensionObject`].
///
/// Implementations provide the binary encoding id and body codec; the
/// static registry in [`find_encodeable_type()`] maps ids back to decoders.
/// Clearing a decoded object is its `Drop` implementation.
pub trait Encodeable: fmt::Debug + Send {
    /// Node ID of the binary encoding of the type.
    fn type_id(&self) -> ua::NodeId;

    /// Human-readable type name used for logging.
    fn type_name(&self) -> &'static str;

    fn clone_encodeable(&self) -> Box<dyn Encodeable>;

    fn eq_encodeable(&self, other: &dyn Encodeable) -> bool;

    fn as_any(&self) -> &dyn Any;

    /// Encodes the body (without the extension-object envelope).
    ///
    /// # Errors
    ///
    /// Fails with an encoding error when the stream rejects writes.
    fn encode_body(&self, stream: &mut dyn io::Write) -> Result<()>;
}

/// Decoder signature for registered encodeable types.
pub type EncodeableDecodeFn = fn(&mut dyn io::Read) -> Result<Box<dyn Encodeable>>;

/// Registry entry tying a binary encoding id to its decoder.
#[derive(Debug, Clone, Copy)]
pub struct EncodeableType {
    pub id: u32,
    pub name: &'static str,
    pub decode: EncodeableDecodeFn,
}

/// Looks up a known encodeable type by the node ID found on the wire.
///
/// Only namespace-0 numeric ids can match; everything else stays opaque.
#[must_use]
pub fn find_encodeable_type(type_id: &ua::NodeId) -> Option<&'static EncodeableType> {
    if type_id.namespace != 0 {
        return None;
    }
    let id = type_id.numeric_value()?;
    ua::data_types::KNOWN_ENCODEABLE_TYPES
        .iter()
        .find(|known| known.id == id)
}

/// Body of an [`ExtensionObject`].
#[derive(Debug, Default)]
pub enum ExtensionObjectBody {
    /// No body (encoding discriminant 0).
    #[default]
    None,
    /// Opaque binary body (encoding discriminant 1).
    Binary(ua::ByteString),
    /// Opaque XML body (encoding discriminant 2).
    Xml(ua::XmlElement),
    /// Decoded object; produced only by decoders and local construction.
    Decoded(Box<dyn Encodeable>),
}

impl Clone for ExtensionObjectBody {
    fn clone(&self) -> Self {
        match self {
            Self::None => Self::None,
            Self::Binary(data) => Self::Binary(data.clone()),
            Self::Xml(data) => Self::Xml(data.clone()),
            Self::Decoded(object) => Self::Decoded(object.clone_encodeable()),
        }
    }
}

impl PartialEq for ExtensionObjectBody {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Binary(a), Self::Binary(b)) => a == b,
            (Self::Xml(a), Self::Xml(b)) => a == b,
            (Self::Decoded(a), Self::Decoded(b)) => a.eq_encodeable(b.as_ref()),
            _ => false,
        }
    }
}

/// OPC UA extension object: a value of a structured type, either opaque
/// (binary or XML) or decoded through a registered encodeable type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtensionObject {
    pub type_id: ua::NodeId,
    pub body: ExtensionObjectBody,
}

impl ExtensionObject {
    /// The empty extension object.
    #[must_use]
    pub fn null() -> Self {
        Self::default()
    }

    /// Wraps a decoded object; the type id is taken from the object.
    #[must_use]
    pub fn decoded(object: impl Encodeable + 'static) -> Self {
        Self {
            type_id: object.type_id(),
            body: ExtensionObjectBody::Decoded(Box::new(object)),
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self.body, ExtensionObjectBody::None)
    }

    /// Returns the decoded object as a concrete type, if it is one.
    #[must_use]
    pub fn decoded_as<T: 'static>(&self) -> Option<&T> {
        match &self.body {
            ExtensionObjectBody::Decoded(object) => object.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Decodes an opaque binary body through the registered type, in place.
    ///
    /// # Errors
    ///
    /// Fails with `NotSupported` when the type is not registered, or with a
    /// decoding error when the body does not parse.
    pub fn decode_body(&mut self) -> Result<()> {
        let ExtensionObjectBody::Binary(data) = &self.body else {
            return Err(Error::InvalidState);
        };
        let known = find_encodeable_type(&self.type_id).ok_or(Error::NotSupported)?;
        let bytes = data.as_bytes().ok_or(Error::InvalidParameters)?;
        let mut cursor = io::Cursor::new(bytes);
        let object = (known.decode)(&mut cursor)?;
        self.body = ExtensionObjectBody::Decoded(object);
        Ok(())
    }

    /// Releases the body; a decoded object runs its own drop logic.
    pub fn clear(&mut self) {
        self.type_id.clear();
        self.body = ExtensionObjectBody::None;
    }
}

/// Implements [`Encodeable`] for a message struct with a known encoding id.
macro_rules! impl_encodeable {
    ($type:ty, $name:literal, $id:expr) => {
        impl $crate::ua::Encodeable for $type {
            fn type_id(&self) -> $crate::ua::NodeId {
                $crate::ua::NodeId::numeric(0, $id)
            }

            fn type_name(&self) -> &'static str {
                $name
            }

            fn clone_encodeable(&self) -> Box<dyn $crate::ua::Encodeable> {
                Box::new(self.clone())
            }

            fn eq_encodeable(&self, other: &dyn $crate::ua::Encodeable) -> bool {
                other
                    .as_any()
                    .downcast_ref::<$type>()
                    .is_some_and(|other| self == other)
            }

            fn as_any(&self) -> &dyn std::any::Any {
                self
            }

            fn encode_body(&self, stream: &mut dyn std::io::Write) -> $crate::Result<()> {
                $crate::binary::BinaryEncodable::encode(self, stream)
            }
        }
    };
}

pub(crate) use impl_encodeable;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_extension_object() {
        let object = ExtensionObject::null();
        assert!(object.is_null());
        assert!(object.type_id.is_null());
    }

    #[test]
    fn decoded_round_trip_through_any() {
        let token = ua::AnonymousIdentityToken {
            policy_id: ua::String::from("anonymous"),
        };
        let object = ExtensionObject::decoded(token.clone());
        assert!(!object.is_null());
        assert_eq!(object.decoded_as::<ua::AnonymousIdentityToken>(), Some(&token));
        assert_eq!(object.type_id, ua::NodeId::numeric(0, 321));
    }
}
