//! OPC UA binary encoding.
//!
//! Little-endian primitives, `i32`-length-prefixed strings and byte strings
//! (`-1` = null), the compact NodeId encodings, and the mask-driven
//! composite encodings for Variant, DataValue, DiagnosticInfo and
//! ExtensionObject.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::ua;
use crate::{Error, Result};

/// Upper bound accepted for decoded string/byte-string lengths.
const MAX_BYTE_LENGTH: i32 = 16 * 1024 * 1024;

/// Upper bound accepted for decoded array lengths.
const MAX_ARRAY_LENGTH: i32 = 1024 * 1024;

/// A value that can be written in OPC UA binary form.
pub trait BinaryEncodable {
    /// Encodes the value onto the stream.
    ///
    /// # Errors
    ///
    /// Fails when the underlying stream rejects writes.
    fn encode(&self, stream: &mut dyn Write) -> Result<()>;
}

/// A value that can be read from OPC UA binary form.
pub trait BinaryDecodable: Sized {
    /// Decodes a value from the stream.
    ///
    /// # Errors
    ///
    /// Fails with a decoding error on malformed or truncated input.
    fn decode(stream: &mut dyn Read) -> Result<Self>;
}

fn decoding_error<T>() -> Result<T> {
    Err(Error::Status(ua::StatusCode::BAD_DECODING_ERROR))
}

macro_rules! impl_primitive {
    ($type:ty, $write:ident, $read:ident) => {
        impl BinaryEncodable for $type {
            fn encode(&self, stream: &mut dyn Write) -> Result<()> {
                stream.$write::<LittleEndian>(*self)?;
                Ok(())
            }
        }

        impl BinaryDecodable for $type {
            fn decode(stream: &mut dyn Read) -> Result<Self> {
                Ok(stream.$read::<LittleEndian>()?)
            }
        }
    };
}

impl_primitive!(i16, write_i16, read_i16);
impl_primitive!(u16, write_u16, read_u16);
impl_primitive!(i32, write_i32, read_i32);
impl_primitive!(u32, write_u32, read_u32);
impl_primitive!(i64, write_i64, read_i64);
impl_primitive!(u64, write_u64, read_u64);
impl_primitive!(f32, write_f32, read_f32);
impl_primitive!(f64, write_f64, read_f64);

impl BinaryEncodable for u8 {
    fn encode(&self, stream: &mut dyn Write) -> Result<()> {
        stream.write_u8(*self)?;
        Ok(())
    }
}

impl BinaryDecodable for u8 {
    fn decode(stream: &mut dyn Read) -> Result<Self> {
        Ok(stream.read_u8()?)
    }
}

impl BinaryEncodable for i8 {
    fn encode(&self, stream: &mut dyn Write) -> Result<()> {
        stream.write_i8(*self)?;
        Ok(())
    }
}

impl BinaryDecodable for i8 {
    fn decode(stream: &mut dyn Read) -> Result<Self> {
        Ok(stream.read_i8()?)
    }
}

impl BinaryEncodable for bool {
    fn encode(&self, stream: &mut dyn Write) -> Result<()> {
        stream.write_u8(u8::from(*self))?;
        Ok(())
    }
}

impl BinaryDecodable for bool {
    fn decode(stream: &mut dyn Read) -> Result<Self> {
        Ok(stream.read_u8()? != 0)
    }
}

fn encode_bytes(stream: &mut dyn Write, bytes: Option<&[u8]>) -> Result<()> {
    match bytes {
        Some(bytes) => {
            let length = i32::try_from(bytes.len()).map_err(|_| Error::InvalidParameters)?;
            length.encode(stream)?;
            stream.write_all(bytes)?;
        }
        None => (-1_i32).encode(stream)?,
    }
    Ok(())
}

fn decode_bytes(stream: &mut dyn Read) -> Result<Option<Vec<u8>>> {
    let length = i32::decode(stream)?;
    if length < 0 {
        return Ok(None);
    }
    if length > MAX_BYTE_LENGTH {
        return decoding_error();
    }
    let mut bytes = vec![0_u8; usize::try_from(length).map_err(|_| Error::Nok)?];
    stream.read_exact(&mut bytes)?;
    Ok(Some(bytes))
}

impl BinaryEncodable for ua::String {
    fn encode(&self, stream: &mut dyn Write) -> Result<()> {
        encode_bytes(stream, self.as_bytes())
    }
}

impl BinaryDecodable for ua::String {
    fn decode(stream: &mut dyn Read) -> Result<Self> {
        Ok(match decode_bytes(stream)? {
            Some(bytes) => Self::from_bytes(bytes),
            None => Self::null(),
        })
    }
}

impl BinaryEncodable for ua::ByteString {
    fn encode(&self, stream: &mut dyn Write) -> Result<()> {
        encode_bytes(stream, self.as_bytes())
    }
}

impl BinaryDecodable for ua::ByteString {
    fn decode(stream: &mut dyn Read) -> Result<Self> {
        Ok(match decode_bytes(stream)? {
            Some(bytes) => Self::from_bytes(bytes),
            None => Self::null(),
        })
    }
}

impl BinaryEncodable for ua::XmlElement {
    fn encode(&self, stream: &mut dyn Write) -> Result<()> {
        self.0.encode(stream)
    }
}

impl BinaryDecodable for ua::XmlElement {
    fn decode(stream: &mut dyn Read) -> Result<Self> {
        Ok(Self(ua::String::decode(stream)?))
    }
}

impl BinaryEncodable for ua::DateTime {
    fn encode(&self, stream: &mut dyn Write) -> Result<()> {
        self.ticks().encode(stream)
    }
}

impl BinaryDecodable for ua::DateTime {
    fn decode(stream: &mut dyn Read) -> Result<Self> {
        Ok(Self::from_ticks(i64::decode(stream)?))
    }
}

impl BinaryEncodable for ua::Guid {
    fn encode(&self, stream: &mut dyn Write) -> Result<()> {
        self.data1.encode(stream)?;
        self.data2.encode(stream)?;
        self.data3.encode(stream)?;
        stream.write_all(&self.data4)?;
        Ok(())
    }
}

impl BinaryDecodable for ua::Guid {
    fn decode(stream: &mut dyn Read) -> Result<Self> {
        let data1 = u32::decode(stream)?;
        let data2 = u16::decode(stream)?;
        let data3 = u16::decode(stream)?;
        let mut data4 = [0_u8; 8];
        stream.read_exact(&mut data4)?;
        Ok(Self {
            data1,
            data2,
            data3,
            data4,
        })
    }
}

impl BinaryEncodable for ua::StatusCode {
    fn encode(&self, stream: &mut dyn Write) -> Result<()> {
        self.code().encode(stream)
    }
}

impl BinaryDecodable for ua::StatusCode {
    fn decode(stream: &mut dyn Read) -> Result<Self> {
        Ok(Self::new(u32::decode(stream)?))
    }
}

// NodeId encoding formats (Part 6).
const NODE_ID_TWO_BYTE: u8 = 0x00;
const NODE_ID_FOUR_BYTE: u8 = 0x01;
const NODE_ID_NUMERIC: u8 = 0x02;
const NODE_ID_STRING: u8 = 0x03;
const NODE_ID_GUID: u8 = 0x04;
const NODE_ID_BYTE_STRING: u8 = 0x05;

const EXPANDED_NODE_ID_NAMESPACE_URI: u8 = 0x80;
const EXPANDED_NODE_ID_SERVER_INDEX: u8 = 0x40;

fn encode_node_id(stream: &mut dyn Write, node_id: &ua::NodeId, flags: u8) -> Result<()> {
    match &node_id.identifier {
        ua::Identifier::Numeric(numeric) => {
            if node_id.namespace == 0 && *numeric <= u32::from(u8::MAX) {
                stream.write_u8(NODE_ID_TWO_BYTE | flags)?;
                stream.write_u8(*numeric as u8)?;
            } else if node_id.namespace <= u16::from(u8::MAX) && *numeric <= u32::from(u16::MAX) {
                stream.write_u8(NODE_ID_FOUR_BYTE | flags)?;
                stream.write_u8(node_id.namespace as u8)?;
                (*numeric as u16).encode(stream)?;
            } else {
                stream.write_u8(NODE_ID_NUMERIC | flags)?;
                node_id.namespace.encode(stream)?;
                numeric.encode(stream)?;
            }
        }
        ua::Identifier::String(string) => {
            stream.write_u8(NODE_ID_STRING | flags)?;
            node_id.namespace.encode(stream)?;
            string.encode(stream)?;
        }
        ua::Identifier::Guid(guid) => {
            stream.write_u8(NODE_ID_GUID | flags)?;
            node_id.namespace.encode(stream)?;
            guid.encode(stream)?;
        }
        ua::Identifier::ByteString(bytes) => {
            stream.write_u8(NODE_ID_BYTE_STRING | flags)?;
            node_id.namespace.encode(stream)?;
            bytes.encode(stream)?;
        }
    }
    Ok(())
}

fn decode_node_id(stream: &mut dyn Read) -> Result<(ua::NodeId, u8)> {
    let format = stream.read_u8()?;
    let flags = format & 0xC0;
    let node_id = match format & 0x3F {
        NODE_ID_TWO_BYTE => ua::NodeId::numeric(0, u32::from(stream.read_u8()?)),
        NODE_ID_FOUR_BYTE => {
            let namespace = u16::from(stream.read_u8()?);
            let numeric = u32::from(u16::decode(stream)?);
            ua::NodeId::numeric(namespace, numeric)
        }
        NODE_ID_NUMERIC => {
            let namespace = u16::decode(stream)?;
            let numeric = u32::decode(stream)?;
            ua::NodeId::numeric(namespace, numeric)
        }
        NODE_ID_STRING => {
            let namespace = u16::decode(stream)?;
            let string = ua::String::decode(stream)?;
            ua::NodeId {
                namespace,
                identifier: ua::Identifier::String(string),
            }
        }
        NODE_ID_GUID => {
            let namespace = u16::decode(stream)?;
            let guid = ua::Guid::decode(stream)?;
            ua::NodeId::guid(namespace, guid)
        }
        NODE_ID_BYTE_STRING => {
            let namespace = u16::decode(stream)?;
            let bytes = ua::ByteString::decode(stream)?;
            ua::NodeId {
                namespace,
                identifier: ua::Identifier::ByteString(bytes),
            }
        }
        _ => return decoding_error(),
    };
    Ok((node_id, flags))
}

impl BinaryEncodable for ua::NodeId {
    fn encode(&self, stream: &mut dyn Write) -> Result<()> {
        encode_node_id(stream, self, 0)
    }
}

impl BinaryDecodable for ua::NodeId {
    fn decode(stream: &mut dyn Read) -> Result<Self> {
        let (node_id, flags) = decode_node_id(stream)?;
        if flags != 0 {
            // Expanded flags are not valid on a plain node ID.
            return decoding_error();
        }
        Ok(node_id)
    }
}

impl BinaryEncodable for ua::ExpandedNodeId {
    fn encode(&self, stream: &mut dyn Write) -> Result<()> {
        let mut flags = 0;
        if !self.namespace_uri.is_null() {
            flags |= EXPANDED_NODE_ID_NAMESPACE_URI;
        }
        if self.server_index != 0 {
            flags |= EXPANDED_NODE_ID_SERVER_INDEX;
        }
        encode_node_id(stream, &self.node_id, flags)?;
        if flags & EXPANDED_NODE_ID_NAMESPACE_URI != 0 {
            self.namespace_uri.encode(stream)?;
        }
        if flags & EXPANDED_NODE_ID_SERVER_INDEX != 0 {
            self.server_index.encode(stream)?;
        }
        Ok(())
    }
}

impl BinaryDecodable for ua::ExpandedNodeId {
    fn decode(stream: &mut dyn Read) -> Result<Self> {
        let (node_id, flags) = decode_node_id(stream)?;
        let namespace_uri = if flags & EXPANDED_NODE_ID_NAMESPACE_URI != 0 {
            ua::String::decode(stream)?
        } else {
            ua::String::null()
        };
        let server_index = if flags & EXPANDED_NODE_ID_SERVER_INDEX != 0 {
            u32::decode(stream)?
        } else {
            0
        };
        Ok(Self {
            node_id,
            namespace_uri,
            server_index,
        })
    }
}

impl BinaryEncodable for ua::QualifiedName {
    fn encode(&self, stream: &mut dyn Write) -> Result<()> {
        self.namespace_index.encode(stream)?;
        self.name.encode(stream)
    }
}

impl BinaryDecodable for ua::QualifiedName {
    fn decode(stream: &mut dyn Read) -> Result<Self> {
        let namespace_index = u16::decode(stream)?;
        let name = ua::String::decode(stream)?;
        Ok(Self {
            namespace_index,
            name,
        })
    }
}

const LOCALIZED_TEXT_LOCALE: u8 = 0x01;
const LOCALIZED_TEXT_TEXT: u8 = 0x02;

impl BinaryEncodable for ua::LocalizedText {
    fn encode(&self, stream: &mut dyn Write) -> Result<()> {
        let mut mask = 0;
        if !self.locale.is_null() {
            mask |= LOCALIZED_TEXT_LOCALE;
        }
        if !self.text.is_null() {
            mask |= LOCALIZED_TEXT_TEXT;
        }
        stream.write_u8(mask)?;
        if mask & LOCALIZED_TEXT_LOCALE != 0 {
            self.locale.encode(stream)?;
        }
        if mask & LOCALIZED_TEXT_TEXT != 0 {
            self.text.encode(stream)?;
        }
        Ok(())
    }
}

impl BinaryDecodable for ua::LocalizedText {
    fn decode(stream: &mut dyn Read) -> Result<Self> {
        let mask = stream.read_u8()?;
        let locale = if mask & LOCALIZED_TEXT_LOCALE != 0 {
            ua::String::decode(stream)?
        } else {
            ua::String::null()
        };
        let text = if mask & LOCALIZED_TEXT_TEXT != 0 {
            ua::String::decode(stream)?
        } else {
            ua::String::null()
        };
        Ok(Self { locale, text })
    }
}

const EXTENSION_OBJECT_NONE: u8 = 0x00;
const EXTENSION_OBJECT_BINARY: u8 = 0x01;
const EXTENSION_OBJECT_XML: u8 = 0x02;

impl BinaryEncodable for ua::ExtensionObject {
    fn encode(&self, stream: &mut dyn Write) -> Result<()> {
        match &self.body {
            ua::ExtensionObjectBody::None => {
                self.type_id.encode(stream)?;
                stream.write_u8(EXTENSION_OBJECT_NONE)?;
            }
            ua::ExtensionObjectBody::Binary(data) => {
                self.type_id.encode(stream)?;
                stream.write_u8(EXTENSION_OBJECT_BINARY)?;
                data.encode(stream)?;
            }
            ua::ExtensionObjectBody::Xml(data) => {
                self.type_id.encode(stream)?;
                stream.write_u8(EXTENSION_OBJECT_XML)?;
                data.encode(stream)?;
            }
            ua::ExtensionObjectBody::Decoded(object) => {
                // Decoded objects go back out in their binary encoding.
                object.type_id().encode(stream)?;
                stream.write_u8(EXTENSION_OBJECT_BINARY)?;
                let mut body = Vec::new();
                object.encode_body(&mut body)?;
                encode_bytes(stream, Some(&body))?;
            }
        }
        Ok(())
    }
}

impl BinaryDecodable for ua::ExtensionObject {
    fn decode(stream: &mut dyn Read) -> Result<Self> {
        let type_id = ua::NodeId::decode(stream)?;
        let encoding = stream.read_u8()?;
        let body = match encoding {
            EXTENSION_OBJECT_NONE => ua::ExtensionObjectBody::None,
            EXTENSION_OBJECT_BINARY => ua::ExtensionObjectBody::Binary(ua::ByteString::decode(stream)?),
            EXTENSION_OBJECT_XML => ua::ExtensionObjectBody::Xml(ua::XmlElement::decode(stream)?),
            _ => return decoding_error(),
        };
        Ok(Self { type_id, body })
    }
}

const DATA_VALUE_VALUE: u8 = 0x01;
const DATA_VALUE_STATUS: u8 = 0x02;
const DATA_VALUE_SOURCE_TIMESTAMP: u8 = 0x04;
const DATA_VALUE_SERVER_TIMESTAMP: u8 = 0x08;
const DATA_VALUE_SOURCE_PICOSECONDS: u8 = 0x10;
const DATA_VALUE_SERVER_PICOSECONDS: u8 = 0x20;

impl BinaryEncodable for ua::DataValue {
    fn encode(&self, stream: &mut dyn Write) -> Result<()> {
        let mut mask = 0;
        if !self.value.is_empty_variant() {
            mask |= DATA_VALUE_VALUE;
        }
        if self.status != ua::StatusCode::GOOD {
            mask |= DATA_VALUE_STATUS;
        }
        if !self.source_timestamp.is_null() {
            mask |= DATA_VALUE_SOURCE_TIMESTAMP;
        }
        if !self.server_timestamp.is_null() {
            mask |= DATA_VALUE_SERVER_TIMESTAMP;
        }
        if self.source_picoseconds != 0 {
            mask |= DATA_VALUE_SOURCE_PICOSECONDS;
        }
        if self.server_picoseconds != 0 {
            mask |= DATA_VALUE_SERVER_PICOSECONDS;
        }
        stream.write_u8(mask)?;
        if mask & DATA_VALUE_VALUE != 0 {
            self.value.encode(stream)?;
        }
        if mask & DATA_VALUE_STATUS != 0 {
            self.status.encode(stream)?;
        }
        if mask & DATA_VALUE_SOURCE_TIMESTAMP != 0 {
            self.source_timestamp.encode(stream)?;
        }
        if mask & DATA_VALUE_SOURCE_PICOSECONDS != 0 {
            self.source_picoseconds.encode(stream)?;
        }
        if mask & DATA_VALUE_SERVER_TIMESTAMP != 0 {
            self.server_timestamp.encode(stream)?;
        }
        if mask & DATA_VALUE_SERVER_PICOSECONDS != 0 {
            self.server_picoseconds.encode(stream)?;
        }
        Ok(())
    }
}

impl BinaryDecodable for ua::DataValue {
    fn decode(stream: &mut dyn Read) -> Result<Self> {
        let mask = stream.read_u8()?;
        let mut data_value = Self::from_status(ua::StatusCode::GOOD);
        if mask & DATA_VALUE_VALUE != 0 {
            data_value.value = ua::Variant::decode(stream)?;
        }
        if mask & DATA_VALUE_STATUS != 0 {
            data_value.status = ua::StatusCode::decode(stream)?;
        }
        if mask & DATA_VALUE_SOURCE_TIMESTAMP != 0 {
            data_value.source_timestamp = ua::DateTime::decode(stream)?;
        }
        if mask & DATA_VALUE_SOURCE_PICOSECONDS != 0 {
            data_value.source_picoseconds = u16::decode(stream)?;
        }
        if mask & DATA_VALUE_SERVER_TIMESTAMP != 0 {
            data_value.server_timestamp = ua::DateTime::decode(stream)?;
        }
        if mask & DATA_VALUE_SERVER_PICOSECONDS != 0 {
            data_value.server_picoseconds = u16::decode(stream)?;
        }
        Ok(data_value)
    }
}

const DIAGNOSTIC_INFO_SYMBOLIC_ID: u8 = 0x01;
const DIAGNOSTIC_INFO_NAMESPACE_URI: u8 = 0x02;
const DIAGNOSTIC_INFO_LOCALIZED_TEXT: u8 = 0x04;
const DIAGNOSTIC_INFO_LOCALE: u8 = 0x08;
const DIAGNOSTIC_INFO_ADDITIONAL_INFO: u8 = 0x10;
const DIAGNOSTIC_INFO_INNER_STATUS: u8 = 0x20;
const DIAGNOSTIC_INFO_INNER_INFO: u8 = 0x40;

impl BinaryEncodable for ua::DiagnosticInfo {
    fn encode(&self, stream: &mut dyn Write) -> Result<()> {
        let mut mask = 0;
        if self.symbolic_id >= 0 {
            mask |= DIAGNOSTIC_INFO_SYMBOLIC_ID;
        }
        if self.namespace_uri >= 0 {
            mask |= DIAGNOSTIC_INFO_NAMESPACE_URI;
        }
        if self.localized_text >= 0 {
            mask |= DIAGNOSTIC_INFO_LOCALIZED_TEXT;
        }
        if self.locale >= 0 {
            mask |= DIAGNOSTIC_INFO_LOCALE;
        }
        if !self.additional_info.is_null() {
            mask |= DIAGNOSTIC_INFO_ADDITIONAL_INFO;
        }
        if self.inner_status_code != ua::StatusCode::GOOD {
            mask |= DIAGNOSTIC_INFO_INNER_STATUS;
        }
        if self.inner_diagnostic_info.is_some() {
            mask |= DIAGNOSTIC_INFO_INNER_INFO;
        }
        stream.write_u8(mask)?;
        if mask & DIAGNOSTIC_INFO_SYMBOLIC_ID != 0 {
            self.symbolic_id.encode(stream)?;
        }
        if mask & DIAGNOSTIC_INFO_NAMESPACE_URI != 0 {
            self.namespace_uri.encode(stream)?;
        }
        if mask & DIAGNOSTIC_INFO_LOCALIZED_TEXT != 0 {
            self.localized_text.encode(stream)?;
        }
        if mask & DIAGNOSTIC_INFO_LOCALE != 0 {
            self.locale.encode(stream)?;
        }
        if mask & DIAGNOSTIC_INFO_ADDITIONAL_INFO != 0 {
            self.additional_info.encode(stream)?;
        }
        if mask & DIAGNOSTIC_INFO_INNER_STATUS != 0 {
            self.inner_status_code.encode(stream)?;
        }
        if let Some(inner) = &self.inner_diagnostic_info {
            inner.encode(stream)?;
        }
        Ok(())
    }
}

impl BinaryDecodable for ua::DiagnosticInfo {
    fn decode(stream: &mut dyn Read) -> Result<Self> {
        let mask = stream.read_u8()?;
        let mut info = Self::null();
        if mask & DIAGNOSTIC_INFO_SYMBOLIC_ID != 0 {
            info.symbolic_id = i32::decode(stream)?;
        }
        if mask & DIAGNOSTIC_INFO_NAMESPACE_URI != 0 {
            info.namespace_uri = i32::decode(stream)?;
        }
        if mask & DIAGNOSTIC_INFO_LOCALIZED_TEXT != 0 {
            info.localized_text = i32::decode(stream)?;
        }
        if mask & DIAGNOSTIC_INFO_LOCALE != 0 {
            info.locale = i32::decode(stream)?;
        }
        if mask & DIAGNOSTIC_INFO_ADDITIONAL_INFO != 0 {
            info.additional_info = ua::String::decode(stream)?;
        }
        if mask & DIAGNOSTIC_INFO_INNER_STATUS != 0 {
            info.inner_status_code = ua::StatusCode::decode(stream)?;
        }
        if mask & DIAGNOSTIC_INFO_INNER_INFO != 0 {
            info.inner_diagnostic_info = Some(Box::new(Self::decode(stream)?));
        }
        Ok(info)
    }
}

const VARIANT_ARRAY_VALUES: u8 = 0x80;
const VARIANT_ARRAY_DIMENSIONS: u8 = 0x40;

fn encode_variant_scalar(stream: &mut dyn Write, value: &ua::Variant) -> Result<()> {
    match value {
        ua::Variant::Empty | ua::Variant::Array(_) => Err(Error::InvalidParameters),
        ua::Variant::Boolean(v) => v.encode(stream),
        ua::Variant::SByte(v) => v.encode(stream),
        ua::Variant::Byte(v) => v.encode(stream),
        ua::Variant::Int16(v) => v.encode(stream),
        ua::Variant::UInt16(v) => v.encode(stream),
        ua::Variant::Int32(v) => v.encode(stream),
        ua::Variant::UInt32(v) => v.encode(stream),
        ua::Variant::Int64(v) => v.encode(stream),
        ua::Variant::UInt64(v) => v.encode(stream),
        ua::Variant::Float(v) => v.encode(stream),
        ua::Variant::Double(v) => v.encode(stream),
        ua::Variant::String(v) => v.encode(stream),
        ua::Variant::DateTime(v) => v.encode(stream),
        ua::Variant::Guid(v) => v.encode(stream),
        ua::Variant::ByteString(v) => v.encode(stream),
        ua::Variant::XmlElement(v) => v.encode(stream),
        ua::Variant::NodeId(v) => v.encode(stream),
        ua::Variant::ExpandedNodeId(v) => v.encode(stream),
        ua::Variant::StatusCode(v) => v.encode(stream),
        ua::Variant::QualifiedName(v) => v.encode(stream),
        ua::Variant::LocalizedText(v) => v.encode(stream),
        ua::Variant::ExtensionObject(v) => v.encode(stream),
        ua::Variant::DataValue(v) => v.encode(stream),
        ua::Variant::DiagnosticInfo(v) => v.encode(stream),
    }
}

fn decode_variant_scalar(stream: &mut dyn Read, kind: ua::VariantKind) -> Result<ua::Variant> {
    Ok(match kind {
        ua::VariantKind::Null => return decoding_error(),
        // Inside an array of variants, each element is a full variant.
        ua::VariantKind::Variant => ua::Variant::decode(stream)?,
        ua::VariantKind::Boolean => ua::Variant::Boolean(bool::decode(stream)?),
        ua::VariantKind::SByte => ua::Variant::SByte(i8::decode(stream)?),
        ua::VariantKind::Byte => ua::Variant::Byte(u8::decode(stream)?),
        ua::VariantKind::Int16 => ua::Variant::Int16(i16::decode(stream)?),
        ua::VariantKind::UInt16 => ua::Variant::UInt16(u16::decode(stream)?),
        ua::VariantKind::Int32 => ua::Variant::Int32(i32::decode(stream)?),
        ua::VariantKind::UInt32 => ua::Variant::UInt32(u32::decode(stream)?),
        ua::VariantKind::Int64 => ua::Variant::Int64(i64::decode(stream)?),
        ua::VariantKind::UInt64 => ua::Variant::UInt64(u64::decode(stream)?),
        ua::VariantKind::Float => ua::Variant::Float(f32::decode(stream)?),
        ua::VariantKind::Double => ua::Variant::Double(f64::decode(stream)?),
        ua::VariantKind::String => ua::Variant::String(ua::String::decode(stream)?),
        ua::VariantKind::DateTime => ua::Variant::DateTime(ua::DateTime::decode(stream)?),
        ua::VariantKind::Guid => ua::Variant::Guid(ua::Guid::decode(stream)?),
        ua::VariantKind::ByteString => ua::Variant::ByteString(ua::ByteString::decode(stream)?),
        ua::VariantKind::XmlElement => ua::Variant::XmlElement(ua::XmlElement::decode(stream)?),
        ua::VariantKind::NodeId => ua::Variant::NodeId(Box::new(ua::NodeId::decode(stream)?)),
        ua::VariantKind::ExpandedNodeId => {
            ua::Variant::ExpandedNodeId(Box::new(ua::ExpandedNodeId::decode(stream)?))
        }
        ua::VariantKind::StatusCode => ua::Variant::StatusCode(ua::StatusCode::decode(stream)?),
        ua::VariantKind::QualifiedName => {
            ua::Variant::QualifiedName(Box::new(ua::QualifiedName::decode(stream)?))
        }
        ua::VariantKind::LocalizedText => {
            ua::Variant::LocalizedText(Box::new(ua::LocalizedText::decode(stream)?))
        }
        ua::VariantKind::ExtensionObject => {
            ua::Variant::ExtensionObject(Box::new(ua::ExtensionObject::decode(stream)?))
        }
        ua::VariantKind::DataValue => ua::Variant::DataValue(Box::new(ua::DataValue::decode(stream)?)),
        ua::VariantKind::DiagnosticInfo => {
            ua::Variant::DiagnosticInfo(Box::new(ua::DiagnosticInfo::decode(stream)?))
        }
    })
}

impl BinaryEncodable for ua::Variant {
    fn encode(&self, stream: &mut dyn Write) -> Result<()> {
        match self {
            Self::Empty => {
                stream.write_u8(0)?;
                Ok(())
            }
            Self::Array(array) => {
                let mut mask = array.kind().id() | VARIANT_ARRAY_VALUES;
                if array.dimensions().is_some() {
                    mask |= VARIANT_ARRAY_DIMENSIONS;
                }
                stream.write_u8(mask)?;
                let length =
                    i32::try_from(array.len()).map_err(|_| Error::InvalidParameters)?;
                length.encode(stream)?;
                for value in array.values() {
                    if array.kind() == ua::VariantKind::Variant {
                        value.encode(stream)?;
                    } else {
                        encode_variant_scalar(stream, value)?;
                    }
                }
                if let Some(dimensions) = array.dimensions() {
                    let count =
                        i32::try_from(dimensions.len()).map_err(|_| Error::InvalidParameters)?;
                    count.encode(stream)?;
                    for dimension in dimensions {
                        dimension.encode(stream)?;
                    }
                }
                Ok(())
            }
            scalar => {
                stream.write_u8(scalar.kind().id())?;
                encode_variant_scalar(stream, scalar)
            }
        }
    }
}

impl BinaryDecodable for ua::Variant {
    fn decode(stream: &mut dyn Read) -> Result<Self> {
        let mask = stream.read_u8()?;
        let Some(kind) = ua::VariantKind::from_id(mask & 0x3F) else {
            return decoding_error();
        };
        if kind == ua::VariantKind::Null {
            return Ok(Self::Empty);
        }

        if mask & VARIANT_ARRAY_VALUES == 0 {
            if kind == ua::VariantKind::Variant {
                // A bare nested variant is only legal inside an array.
                return decoding_error();
            }
            return decode_variant_scalar(stream, kind);
        }

        let length = i32::decode(stream)?;
        if length < 0 {
            return Ok(Self::Empty);
        }
        if length > MAX_ARRAY_LENGTH {
            return decoding_error();
        }
        let mut values = Vec::with_capacity(usize::try_from(length).map_err(|_| Error::Nok)?);
        for _ in 0..length {
            values.push(decode_variant_scalar(stream, kind)?);
        }
        let mut array = ua::VariantArray::new(kind, values).map_err(|_| Error::Nok)?;

        if mask & VARIANT_ARRAY_DIMENSIONS != 0 {
            let count = i32::decode(stream)?;
            if !(0..=MAX_ARRAY_LENGTH).contains(&count) {
                return decoding_error();
            }
            let mut dimensions = Vec::with_capacity(usize::try_from(count).map_err(|_| Error::Nok)?);
            for _ in 0..count {
                dimensions.push(i32::decode(stream)?);
            }
            array = array
                .with_dimensions(dimensions)
                .map_err(|_| Error::Status(ua::StatusCode::BAD_DECODING_ERROR))?;
        }

        Ok(Self::Array(Box::new(array)))
    }
}

impl<T: BinaryEncodable> BinaryEncodable for Vec<T> {
    fn encode(&self, stream: &mut dyn Write) -> Result<()> {
        encode_array(stream, self)
    }
}

impl<T: BinaryDecodable> BinaryDecodable for Vec<T> {
    fn decode(stream: &mut dyn Read) -> Result<Self> {
        decode_array(stream)
    }
}

/// Implements the binary codec for a struct by encoding its fields in
/// declaration order, as the OPC UA structure encoding does.
macro_rules! impl_binary_struct {
    ($type:ty { $($field:ident),+ $(,)? }) => {
        impl $crate::binary::BinaryEncodable for $type {
            fn encode(&self, stream: &mut dyn std::io::Write) -> $crate::Result<()> {
                $($crate::binary::BinaryEncodable::encode(&self.$field, stream)?;)+
                Ok(())
            }
        }

        impl $crate::binary::BinaryDecodable for $type {
            fn decode(stream: &mut dyn std::io::Read) -> $crate::Result<Self> {
                Ok(Self {
                    $($field: $crate::binary::BinaryDecodable::decode(stream)?,)+
                })
            }
        }
    };
}

pub(crate) use impl_binary_struct;

/// Implements the binary codec for a `#[repr(u32)]` enum.
macro_rules! impl_binary_enum {
    ($type:ty, $from_value:path) => {
        impl $crate::binary::BinaryEncodable for $type {
            fn encode(&self, stream: &mut dyn std::io::Write) -> $crate::Result<()> {
                $crate::binary::BinaryEncodable::encode(&self.value(), stream)
            }
        }

        impl $crate::binary::BinaryDecodable for $type {
            fn decode(stream: &mut dyn std::io::Read) -> $crate::Result<Self> {
                let value = <u32 as $crate::binary::BinaryDecodable>::decode(stream)?;
                Ok($from_value(value))
            }
        }
    };
}

pub(crate) use impl_binary_enum;

/// Encodes an array field: `i32` count followed by the elements.
pub(crate) fn encode_array<T: BinaryEncodable>(stream: &mut dyn Write, values: &[T]) -> Result<()> {
    let length = i32::try_from(values.len()).map_err(|_| Error::InvalidParameters)?;
    length.encode(stream)?;
    for value in values {
        value.encode(stream)?;
    }
    Ok(())
}

/// Decodes an array field; a null array (`-1`) decodes as empty.
pub(crate) fn decode_array<T: BinaryDecodable>(stream: &mut dyn Read) -> Result<Vec<T>> {
    let length = i32::decode(stream)?;
    if length < 0 {
        return Ok(Vec::new());
    }
    if length > MAX_ARRAY_LENGTH {
        return decoding_error();
    }
    let mut values = Vec::with_capacity(usize::try_from(length).map_err(|_| Error::Nok)?);
    for _ in 0..length {
        values.push(T::decode(stream)?);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn round_trip<T: BinaryEncodable + BinaryDecodable + PartialEq + std::fmt::Debug>(value: &T) {
        let mut buffer = Vec::new();
        value.encode(&mut buffer).unwrap();
        let decoded = T::decode(&mut Cursor::new(&buffer)).unwrap();
        assert_eq!(&decoded, value);
    }

    #[test]
    fn string_null_and_empty_are_distinct_on_the_wire() {
        let mut null = Vec::new();
        ua::String::null().encode(&mut null).unwrap();
        assert_eq!(null, (-1_i32).to_le_bytes());

        let mut empty = Vec::new();
        ua::String::empty().encode(&mut empty).unwrap();
        assert_eq!(empty, 0_i32.to_le_bytes());

        round_trip(&ua::String::null());
        round_trip(&ua::String::empty());
        round_trip(&ua::String::from("Hello"));
    }

    #[test]
    fn node_id_picks_compact_encodings() {
        let mut two_byte = Vec::new();
        ua::NodeId::numeric(0, 84).encode(&mut two_byte).unwrap();
        assert_eq!(two_byte, [0x00, 84]);

        let mut four_byte = Vec::new();
        ua::NodeId::numeric(3, 1024).encode(&mut four_byte).unwrap();
        assert_eq!(four_byte, [0x01, 3, 0x00, 0x04]);

        round_trip(&ua::NodeId::numeric(0, 84));
        round_trip(&ua::NodeId::numeric(47, 70000));
        round_trip(&ua::NodeId::string(2, "Counter"));
        round_trip(&ua::NodeId::byte_string(1, b"\x01\x02"));
    }

    #[test]
    fn expanded_node_id_flags() {
        let expanded = ua::ExpandedNodeId {
            node_id: ua::NodeId::numeric(0, 84),
            namespace_uri: ua::String::from("urn:x"),
            server_index: 7,
        };
        round_trip(&expanded);
        round_trip(&ua::ExpandedNodeId::local(ua::NodeId::string(1, "n")));
    }

    #[test]
    fn variant_scalar_array_matrix() {
        round_trip(&ua::Variant::Empty);
        round_trip(&ua::Variant::Double(1.5));
        round_trip(&ua::Variant::String(ua::String::null()));

        let array = ua::Variant::array(
            ua::VariantKind::Int32,
            vec![ua::Variant::Int32(1), ua::Variant::Int32(2)],
        )
        .unwrap();
        round_trip(&array);

        let matrix = ua::VariantArray::new(
            ua::VariantKind::Byte,
            (0..6).map(ua::Variant::Byte).collect(),
        )
        .unwrap()
        .with_dimensions(vec![2, 3])
        .unwrap();
        round_trip(&ua::Variant::Array(Box::new(matrix)));
    }

    #[test]
    fn data_value_mask() {
        let data_value = ua::DataValue {
            value: ua::Variant::UInt32(42),
            status: ua::StatusCode::UNCERTAIN_INITIAL_VALUE,
            source_timestamp: ua::DateTime::from_ticks(1234),
            server_timestamp: ua::DateTime::null(),
            source_picoseconds: 0,
            server_picoseconds: 0,
        };
        round_trip(&data_value);
    }

    #[test]
    fn rejects_oversized_lengths() {
        let mut buffer = Vec::new();
        (MAX_BYTE_LENGTH + 1).encode(&mut buffer).unwrap();
        assert!(ua::String::decode(&mut Cursor::new(&buffer)).is_err());
    }
}
