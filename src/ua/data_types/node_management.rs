use crate::binary::impl_binary_struct;
use crate::service::impl_service_pair;
use crate::ua;
use crate::ua::extension_object::impl_encodeable;

/// Attribute-presence bits of the `specified_attributes` masks below.
pub mod specified_attributes {
    pub const ACCESS_LEVEL: u32 = 0x0000_0001;
    pub const DATA_TYPE: u32 = 0x0000_0002;
    pub const DESCRIPTION: u32 = 0x0000_0004;
    pub const DISPLAY_NAME: u32 = 0x0000_0008;
    pub const EVENT_NOTIFIER: u32 = 0x0000_0010;
    pub const VALUE: u32 = 0x0000_0020;
    pub const VALUE_RANK: u32 = 0x0000_0040;
    pub const WRITE_MASK: u32 = 0x0000_0080;
    pub const USER_ACCESS_LEVEL: u32 = 0x0000_0100;
    pub const USER_WRITE_MASK: u32 = 0x0000_0200;
    pub const ARRAY_DIMENSIONS: u32 = 0x0000_0400;
    pub const MINIMUM_SAMPLING_INTERVAL: u32 = 0x0000_0800;
    pub const HISTORIZING: u32 = 0x0000_1000;
}

/// Attributes of a new Object node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectAttributes {
    pub specified_attributes: u32,
    pub display_name: ua::LocalizedText,
    pub description: ua::LocalizedText,
    pub write_mask: u32,
    pub user_write_mask: u32,
    pub event_notifier: u8,
}

impl_binary_struct!(ObjectAttributes {
    specified_attributes,
    display_name,
    description,
    write_mask,
    user_write_mask,
    event_notifier,
});
impl_encodeable!(ObjectAttributes, "ObjectAttributes", 354);

/// Attributes of a new Variable node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VariableAttributes {
    pub specified_attributes: u32,
    pub display_name: ua::LocalizedText,
    pub description: ua::LocalizedText,
    pub write_mask: u32,
    pub user_write_mask: u32,
    pub value: ua::Variant,
    pub data_type: ua::NodeId,
    pub value_rank: i32,
    pub array_dimensions: Vec<u32>,
    pub access_level: u8,
    pub user_access_level: u8,
    pub minimum_sampling_interval: f64,
    pub historizing: bool,
}

impl_binary_struct!(VariableAttributes {
    specified_attributes,
    display_name,
    description,
    write_mask,
    user_write_mask,
    value,
    data_type,
    value_rank,
    array_dimensions,
    access_level,
    user_access_level,
    minimum_sampling_interval,
    historizing,
});
impl_encodeable!(VariableAttributes, "VariableAttributes", 357);

/// One node to add.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AddNodesItem {
    pub parent_node_id: ua::ExpandedNodeId,
    pub reference_type_id: ua::NodeId,
    pub requested_new_node_id: ua::ExpandedNodeId,
    pub browse_name: ua::QualifiedName,
    pub node_class: u32,
    pub node_attributes: ua::ExtensionObject,
    pub type_definition: ua::ExpandedNodeId,
}

impl_binary_struct!(AddNodesItem {
    parent_node_id,
    reference_type_id,
    requested_new_node_id,
    browse_name,
    node_class,
    node_attributes,
    type_definition,
});

/// Result for one added node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AddNodesResult {
    pub status_code: ua::StatusCode,
    pub added_node_id: ua::NodeId,
}

impl AddNodesResult {
    #[must_use]
    pub fn rejected(status_code: ua::StatusCode) -> Self {
        Self {
            status_code,
            added_node_id: ua::NodeId::null(),
        }
    }
}

impl_binary_struct!(AddNodesResult {
    status_code,
    added_node_id,
});

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AddNodesRequest {
    pub request_header: ua::RequestHeader,
    pub nodes_to_add: Vec<AddNodesItem>,
}

impl_binary_struct!(AddNodesRequest {
    request_header,
    nodes_to_add,
});

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AddNodesResponse {
    pub response_header: ua::ResponseHeader,
    pub results: Vec<AddNodesResult>,
    pub diagnostic_infos: Vec<ua::DiagnosticInfo>,
}

impl_binary_struct!(AddNodesResponse {
    response_header,
    results,
    diagnostic_infos,
});

impl_service_pair!(AddNodesRequest => 488, AddNodesResponse => 491);

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UnregisterNodesRequest {
    pub request_header: ua::RequestHeader,
    pub nodes_to_unregister: Vec<ua::NodeId>,
}

impl_binary_struct!(UnregisterNodesRequest {
    request_header,
    nodes_to_unregister,
});

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UnregisterNodesResponse {
    pub response_header: ua::ResponseHeader,
}

impl_binary_struct!(UnregisterNodesResponse { response_header });

impl_service_pair!(UnregisterNodesRequest => 566, UnregisterNodesResponse => 569);
