use crate::binary::{impl_binary_enum, impl_binary_struct};
use crate::service::impl_service_pair;
use crate::ua;

/// Direction of references followed by a Browse operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum BrowseDirection {
    #[default]
    Forward = 0,
    Inverse = 1,
    Both = 2,
}

impl BrowseDirection {
    #[must_use]
    pub const fn from_value(value: u32) -> Self {
        match value {
            1 => Self::Inverse,
            2 => Self::Both,
            _ => Self::Forward,
        }
    }

    #[must_use]
    pub const fn value(self) -> u32 {
        self as u32
    }
}

impl_binary_enum!(BrowseDirection, BrowseDirection::from_value);

/// View to browse in; the null view is the whole address space.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewDescription {
    pub view_id: ua::NodeId,
    pub timestamp: ua::DateTime,
    pub view_version: u32,
}

impl_binary_struct!(ViewDescription {
    view_id,
    timestamp,
    view_version,
});

/// One starting node of a Browse operation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BrowseDescription {
    pub node_id: ua::NodeId,
    pub browse_direction: BrowseDirection,
    pub reference_type_id: ua::NodeId,
    pub include_subtypes: bool,
    pub node_class_mask: u32,
    pub result_mask: u32,
}

impl BrowseDescription {
    /// Browses all forward references of a node.
    #[must_use]
    pub fn all_forward(node_id: ua::NodeId) -> Self {
        Self {
            node_id,
            browse_direction: BrowseDirection::Forward,
            reference_type_id: ua::NodeId::null(),
            include_subtypes: true,
            node_class_mask: 0,
            result_mask: 0x3F,
        }
    }
}

impl_binary_struct!(BrowseDescription {
    node_id,
    browse_direction,
    reference_type_id,
    include_subtypes,
    node_class_mask,
    result_mask,
});

/// One reference returned by Browse.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReferenceDescription {
    pub reference_type_id: ua::NodeId,
    pub is_forward: bool,
    pub node_id: ua::ExpandedNodeId,
    pub browse_name: ua::QualifiedName,
    pub display_name: ua::LocalizedText,
    pub node_class: u32,
    pub type_definition: ua::ExpandedNodeId,
}

impl_binary_struct!(ReferenceDescription {
    reference_type_id,
    is_forward,
    node_id,
    browse_name,
    display_name,
    node_class,
    type_definition,
});

/// Result for one browse description.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BrowseResult {
    pub status_code: ua::StatusCode,
    pub continuation_point: ua::ByteString,
    pub references: Vec<ReferenceDescription>,
}

impl_binary_struct!(BrowseResult {
    status_code,
    continuation_point,
    references,
});

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BrowseRequest {
    pub request_header: ua::RequestHeader,
    pub view: ViewDescription,
    pub requested_max_references_per_node: u32,
    pub nodes_to_browse: Vec<BrowseDescription>,
}

impl_binary_struct!(BrowseRequest {
    request_header,
    view,
    requested_max_references_per_node,
    nodes_to_browse,
});

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BrowseResponse {
    pub response_header: ua::ResponseHeader,
    pub results: Vec<BrowseResult>,
    pub diagnostic_infos: Vec<ua::DiagnosticInfo>,
}

impl_binary_struct!(BrowseResponse {
    response_header,
    results,
    diagnostic_infos,
});

impl_service_pair!(BrowseRequest => 527, BrowseResponse => 530);
