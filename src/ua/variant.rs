use std::fmt;

use crate::ua;
use crate::{Error, Result};

/// Built-in type identifier of a [`Variant`] arm.
///
/// The discriminant values are the wire encoding ids of the built-in types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum VariantKind {
    Null = 0,
    Boolean = 1,
    SByte = 2,
    Byte = 3,
    Int16 = 4,
    UInt16 = 5,
    Int32 = 6,
    UInt32 = 7,
    Int64 = 8,
    UInt64 = 9,
    Float = 10,
    Double = 11,
    String = 12,
    DateTime = 13,
    Guid = 14,
    ByteString = 15,
    XmlElement = 16,
    NodeId = 17,
    ExpandedNodeId = 18,
    StatusCode = 19,
    QualifiedName = 20,
    LocalizedText = 21,
    ExtensionObject = 22,
    DataValue = 23,
    Variant = 24,
    DiagnosticInfo = 25,
}

impl VariantKind {
    /// Returns the kind for a wire encoding id.
    #[must_use]
    pub const fn from_id(id: u8) -> Option<Self> {
        Some(match id {
            0 => Self::Null,
            1 => Self::Boolean,
            2 => Self::SByte,
            3 => Self::Byte,
            4 => Self::Int16,
            5 => Self::UInt16,
            6 => Self::Int32,
            7 => Self::UInt32,
            8 => Self::Int64,
            9 => Self::UInt64,
            10 => Self::Float,
            11 => Self::Double,
            12 => Self::String,
            13 => Self::DateTime,
            14 => Self::Guid,
            15 => Self::ByteString,
            16 => Self::XmlElement,
            17 => Self::NodeId,
            18 => Self::ExpandedNodeId,
            19 => Self::StatusCode,
            20 => Self::QualifiedName,
            21 => Self::LocalizedText,
            22 => Self::ExtensionObject,
            23 => Self::DataValue,
            24 => Self::Variant,
            25 => Self::DiagnosticInfo,
            _ => return None,
        })
    }

    /// Wire encoding id of the kind.
    #[must_use]
    pub const fn id(self) -> u8 {
        self as u8
    }
}

/// OPC UA variant: the tagged-union value carrier.
///
/// Scalar values store their payload inline; array and matrix values are
/// carried by [`VariantArray`], which enforces element homogeneity and
/// dimension consistency. Deep copy is `Clone`, clearing restores the empty
/// variant in place.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Variant {
    #[default]
    Empty,
    Boolean(bool),
    SByte(i8),
    Byte(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float(f32),
    Double(f64),
    String(ua::String),
    DateTime(ua::DateTime),
    Guid(ua::Guid),
    ByteString(ua::ByteString),
    XmlElement(ua::XmlElement),
    NodeId(Box<ua::NodeId>),
    ExpandedNodeId(Box<ua::ExpandedNodeId>),
    StatusCode(ua::StatusCode),
    QualifiedName(Box<ua::QualifiedName>),
    LocalizedText(Box<ua::LocalizedText>),
    ExtensionObject(Box<ua::ExtensionObject>),
    DataValue(Box<ua::DataValue>),
    DiagnosticInfo(Box<ua::DiagnosticInfo>),
    Array(Box<VariantArray>),
}

/// Array or matrix form of a [`Variant`].
///
/// All elements are scalar variants of `kind`. With `dimensions` set, the
/// value is a matrix and the dimension lengths multiply up to the element
/// count.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantArray {
    kind: VariantKind,
    values: Vec<Variant>,
    dimensions: Option<Vec<i32>>,
}

impl VariantArray {
    /// Creates a single-dimension array.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidParameters` when an element is not a scalar of
    /// `kind`.
    pub fn new(kind: VariantKind, values: Vec<Variant>) -> Result<Self> {
        for value in &values {
            // An array of kind `Variant` holds arbitrary scalar variants.
            if (kind != VariantKind::Variant && value.kind() != kind) || value.is_array() {
                return Err(Error::InvalidParameters);
            }
        }
        Ok(Self {
            kind,
            values,
            dimensions: None,
        })
    }

    /// Reshapes the array into a matrix.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidParameters` when the product of the dimension
    /// lengths does not equal the element count.
    pub fn with_dimensions(mut self, dimensions: Vec<i32>) -> Result<Self> {
        let mut product: usize = 1;
        for &dim in &dimensions {
            let dim = usize::try_from(dim).map_err(|_| Error::InvalidParameters)?;
            product = product.checked_mul(dim).ok_or(Error::InvalidParameters)?;
        }
        if product != self.values.len() {
            return Err(Error::InvalidParameters);
        }
        self.dimensions = Some(dimensions);
        Ok(self)
    }

    #[must_use]
    pub const fn kind(&self) -> VariantKind {
        self.kind
    }

    #[must_use]
    pub fn values(&self) -> &[Variant] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn dimensions(&self) -> Option<&[i32]> {
        self.dimensions.as_deref()
    }
}

impl Variant {
    /// Returns the built-in kind of the value. For arrays and matrices this
    /// is the element kind.
    #[must_use]
    pub fn kind(&self) -> VariantKind {
        match self {
            Self::Empty => VariantKind::Null,
            Self::Boolean(_) => VariantKind::Boolean,
            Self::SByte(_) => VariantKind::SByte,
            Self::Byte(_) => VariantKind::Byte,
            Self::Int16(_) => VariantKind::Int16,
            Self::UInt16(_) => VariantKind::UInt16,
            Self::Int32(_) => VariantKind::Int32,
            Self::UInt32(_) => VariantKind::UInt32,
            Self::Int64(_) => VariantKind::Int64,
            Self::UInt64(_) => VariantKind::UInt64,
            Self::Float(_) => VariantKind::Float,
            Self::Double(_) => VariantKind::Double,
            Self::String(_) => VariantKind::String,
            Self::DateTime(_) => VariantKind::DateTime,
            Self::Guid(_) => VariantKind::Guid,
            Self::ByteString(_) => VariantKind::ByteString,
            Self::XmlElement(_) => VariantKind::XmlElement,
            Self::NodeId(_) => VariantKind::NodeId,
            Self::ExpandedNodeId(_) => VariantKind::ExpandedNodeId,
            Self::StatusCode(_) => VariantKind::StatusCode,
            Self::QualifiedName(_) => VariantKind::QualifiedName,
            Self::LocalizedText(_) => VariantKind::LocalizedText,
            Self::ExtensionObject(_) => VariantKind::ExtensionObject,
            Self::DataValue(_) => VariantKind::DataValue,
            Self::DiagnosticInfo(_) => VariantKind::DiagnosticInfo,
            Self::Array(array) => array.kind(),
        }
    }

    #[must_use]
    pub const fn is_empty_variant(&self) -> bool {
        matches!(self, Self::Empty)
    }

    #[must_use]
    pub const fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }

    #[must_use]
    pub fn is_matrix(&self) -> bool {
        matches!(self, Self::Array(array) if array.dimensions.is_some())
    }

    /// Creates an array variant from scalar elements of one kind.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidParameters` when an element is not a scalar of
    /// `kind`.
    pub fn array(kind: VariantKind, values: Vec<Self>) -> Result<Self> {
        Ok(Self::Array(Box::new(VariantArray::new(kind, values)?)))
    }

    /// Resets to the empty variant in place, releasing owned storage.
    pub fn clear(&mut self) {
        *self = Self::Empty;
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("(empty)"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::SByte(v) => write!(f, "{v}"),
            Self::Byte(v) => write!(f, "{v}"),
            Self::Int16(v) => write!(f, "{v}"),
            Self::UInt16(v) => write!(f, "{v}"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::UInt32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::UInt64(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v}"),
            Self::DateTime(v) => write!(f, "{v}"),
            Self::Guid(v) => write!(f, "{v}"),
            Self::ByteString(v) => write!(f, "{v}"),
            Self::XmlElement(v) => write!(f, "{}", v.0),
            Self::NodeId(v) => write!(f, "{v}"),
            Self::ExpandedNodeId(v) => write!(f, "{v}"),
            Self::StatusCode(v) => write!(f, "{v}"),
            Self::QualifiedName(v) => write!(f, "{v}"),
            Self::LocalizedText(v) => write!(f, "{v}"),
            Self::ExtensionObject(_) => f.write_str("(extension object)"),
            Self::DataValue(v) => write!(f, "{}", v.value),
            Self::DiagnosticInfo(_) => f.write_str("(diagnostic info)"),
            Self::Array(array) => {
                f.write_str("[")?;
                for (i, value) in array.values().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_arm() {
        assert_eq!(Variant::Empty.kind(), VariantKind::Null);
        assert_eq!(Variant::Boolean(true).kind(), VariantKind::Boolean);
        assert_eq!(
            Variant::String(ua::String::from("x")).kind(),
            VariantKind::String
        );
    }

    #[test]
    fn array_enforces_homogeneity() {
        let ok = Variant::array(
            VariantKind::Int32,
            vec![Variant::Int32(1), Variant::Int32(2)],
        );
        assert!(ok.is_ok());

        let mixed = Variant::array(
            VariantKind::Int32,
            vec![Variant::Int32(1), Variant::Boolean(true)],
        );
        assert!(mixed.is_err());
    }

    #[test]
    fn matrix_dimensions_must_be_consistent() {
        let values = (0..6).map(Variant::Int32).collect::<Vec<_>>();
        let array = VariantArray::new(VariantKind::Int32, values).unwrap();
        assert!(array.clone().with_dimensions(vec![2, 3]).is_ok());
        assert!(array.with_dimensions(vec![2, 2]).is_err());
    }

    #[test]
    fn copy_then_clear_leaves_original_unchanged() {
        let original = Variant::array(
            VariantKind::String,
            vec![
                Variant::String(ua::String::from("a")),
                Variant::String(ua::String::null()),
            ],
        )
        .unwrap();
        let mut copy = original.clone();
        copy.clear();
        assert!(copy.is_empty_variant());
        assert_eq!(original.kind(), VariantKind::String);
        assert_eq!(
            original,
            Variant::array(
                VariantKind::String,
                vec![
                    Variant::String(ua::String::from("a")),
                    Variant::String(ua::String::null()),
                ],
            )
            .unwrap()
        );
    }
}
