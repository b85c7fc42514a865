//! In-memory address space: the server's node directory keyed by
//! [`ua::NodeId`]. Cross-references are by id, not by pointer, so reference
//! cycles end at the map boundary.

pub mod loader;

use crate::collections::Dictionary;
use crate::ua;
use crate::{Error, Result};

/// One outgoing reference of an address-space node.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub reference_type_id: ua::NodeId,
    pub is_inverse: bool,
    pub target_id: ua::ExpandedNodeId,
}

/// Class-specific payload of an [`AddressSpaceItem`].
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    DataType,
    Method,
    Object,
    ObjectType,
    ReferenceType,
    View,
    Variable(VariableData),
    VariableType(VariableTypeData),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableData {
    pub data_type: ua::NodeId,
    pub value_rank: i32,
    pub value: ua::Variant,
    pub value_status: ua::StatusCode,
    pub access_level: u8,
}

impl Default for VariableData {
    fn default() -> Self {
        Self {
            data_type: ua::NodeId::null(),
            value_rank: -1,
            value: ua::Variant::Empty,
            value_status: ua::StatusCode::UNCERTAIN_INITIAL_VALUE,
            access_level: access_level::CURRENT_READ,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableTypeData {
    pub data_type: ua::NodeId,
    pub value_rank: i32,
    pub value: ua::Variant,
    pub value_status: ua::StatusCode,
}

impl Default for VariableTypeData {
    fn default() -> Self {
        Self {
            data_type: ua::NodeId::null(),
            value_rank: -1,
            value: ua::Variant::Empty,
            value_status: ua::StatusCode::UNCERTAIN_INITIAL_VALUE,
        }
    }
}

/// Access level bits of a Variable node.
pub mod access_level {
    pub const CURRENT_READ: u8 = 0x01;
    pub const CURRENT_WRITE: u8 = 0x02;
}

/// One node of the address space.
#[derive(Debug, Clone, PartialEq)]
pub struct AddressSpaceItem {
    pub node_id: ua::NodeId,
    pub browse_name: ua::QualifiedName,
    pub display_name: ua::LocalizedText,
    pub description: ua::LocalizedText,
    pub references: Vec<Reference>,
    pub data: NodeData,
}

impl AddressSpaceItem {
    /// Creates an empty item of the given class.
    #[must_use]
    pub fn new(node_class: ua::NodeClass) -> Self {
        let data = match node_class {
            ua::NodeClass::DataType => NodeData::DataType,
            ua::NodeClass::Method => NodeData::Method,
            ua::NodeClass::Object => NodeData::Object,
            ua::NodeClass::ObjectType => NodeData::ObjectType,
            ua::NodeClass::ReferenceType => NodeData::ReferenceType,
            ua::NodeClass::View => NodeData::View,
            ua::NodeClass::Variable => NodeData::Variable(VariableData::default()),
            ua::NodeClass::VariableType => NodeData::VariableType(VariableTypeData::default()),
        };
        Self {
            node_id: ua::NodeId::null(),
            browse_name: ua::QualifiedName::null(),
            display_name: ua::LocalizedText::null(),
            description: ua::LocalizedText::null(),
            references: Vec::new(),
            data,
        }
    }

    #[must_use]
    pub const fn node_class(&self) -> ua::NodeClass {
        match &self.data {
            NodeData::DataType => ua::NodeClass::DataType,
            NodeData::Method => ua::NodeClass::Method,
            NodeData::Object => ua::NodeClass::Object,
            NodeData::ObjectType => ua::NodeClass::ObjectType,
            NodeData::ReferenceType => ua::NodeClass::ReferenceType,
            NodeData::View => ua::NodeClass::View,
            NodeData::Variable(_) => ua::NodeClass::Variable,
            NodeData::VariableType(_) => ua::NodeClass::VariableType,
        }
    }

    /// The stored value, for Variable and VariableType nodes.
    #[must_use]
    pub const fn value(&self) -> Option<&ua::Variant> {
        match &self.data {
            NodeData::Variable(data) => Some(&data.value),
            NodeData::VariableType(data) => Some(&data.value),
            _ => None,
        }
    }

    #[must_use]
    pub const fn value_status(&self) -> Option<ua::StatusCode> {
        match &self.data {
            NodeData::Variable(data) => Some(data.value_status),
            NodeData::VariableType(data) => Some(data.value_status),
            _ => None,
        }
    }

    #[must_use]
    pub const fn data_type(&self) -> Option<&ua::NodeId> {
        match &self.data {
            NodeData::Variable(data) => Some(&data.data_type),
            NodeData::VariableType(data) => Some(&data.data_type),
            _ => None,
        }
    }

    #[must_use]
    pub const fn access_level(&self) -> Option<u8> {
        match &self.data {
            NodeData::Variable(data) => Some(data.access_level),
            _ => None,
        }
    }

    /// The HasTypeDefinition target, if the node carries one.
    #[must_use]
    pub fn type_definition(&self) -> Option<&ua::ExpandedNodeId> {
        const HAS_TYPE_DEFINITION: u32 = 40;
        self.references
            .iter()
            .find(|reference| {
                !reference.is_inverse
                    && reference.reference_type_id == ua::NodeId::numeric(0, HAS_TYPE_DEFINITION)
            })
            .map(|reference| &reference.target_id)
    }
}

/// The address space: a dictionary from node id to owned item.
#[derive(Debug)]
pub struct AddressSpace {
    items: Dictionary<ua::NodeId, AddressSpaceItem>,
}

impl AddressSpace {
    /// Node ids in namespace `u16::MAX` are reserved as dictionary
    /// sentinels and cannot name real nodes.
    #[must_use]
    pub fn new() -> Self {
        let mut items = Dictionary::new(ua::NodeId::numeric(u16::MAX, u32::MAX));
        items
            .set_tombstone_key(ua::NodeId::numeric(u16::MAX, u32::MAX - 1))
            .expect("tombstone key on empty dictionary");
        Self { items }
    }

    /// Inserts an item keyed by its own node id, overwriting any previous
    /// item with the same id.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidParameters` when the id uses the reserved
    /// sentinel namespace.
    pub fn append(&mut self, item: AddressSpaceItem) -> Result<()> {
        if item.node_id.namespace == u16::MAX {
            return Err(Error::InvalidParameters);
        }
        self.items.insert(item.node_id.clone(), item)
    }

    #[must_use]
    pub fn get(&self, node_id: &ua::NodeId) -> Option<&AddressSpaceItem> {
        self.items.get(node_id)
    }

    #[must_use]
    pub fn get_mut(&mut self, node_id: &ua::NodeId) -> Option<&mut AddressSpaceItem> {
        self.items.get_mut(node_id)
    }

    pub fn remove(&mut self, node_id: &ua::NodeId) -> Option<AddressSpaceItem> {
        self.items.remove(node_id).unwrap_or_default()
    }

    #[must_use]
    pub fn contains(&self, node_id: &ua::NodeId) -> bool {
        self.items.contains_key(node_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ua::NodeId, &AddressSpaceItem)> {
        self.items.iter()
    }
}

impl Default for AddressSpace {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_get() {
        let mut space = AddressSpace::new();
        let mut item = AddressSpaceItem::new(ua::NodeClass::Object);
        item.node_id = ua::NodeId::numeric(0, 100);
        item.browse_name = ua::QualifiedName::new(0, "Foo");
        space.append(item).unwrap();

        assert_eq!(space.len(), 1);
        let item = space.get(&ua::NodeId::numeric(0, 100)).unwrap();
        assert_eq!(item.node_class(), ua::NodeClass::Object);
        assert_eq!(item.browse_name, ua::QualifiedName::new(0, "Foo"));
        assert!(item.references.is_empty());
    }

    #[test]
    fn sentinel_namespace_is_rejected() {
        let mut space = AddressSpace::new();
        let mut item = AddressSpaceItem::new(ua::NodeClass::Object);
        item.node_id = ua::NodeId::numeric(u16::MAX, 1);
        assert!(space.append(item).is_err());
    }

    #[test]
    fn variable_defaults() {
        let item = AddressSpaceItem::new(ua::NodeClass::Variable);
        assert_eq!(
            item.value_status(),
            Some(ua::StatusCode::UNCERTAIN_INITIAL_VALUE)
        );
        assert_eq!(item.access_level(), Some(access_level::CURRENT_READ));
        assert_eq!(item.value(), Some(&ua::Variant::Empty));
    }
}
