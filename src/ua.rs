//! The OPC UA value model: built-in types, variant, and service messages.

mod attribute_id;
pub mod base64;
mod byte_string;
mod data_types;
mod data_value;
mod date_time;
mod diagnostic_info;
mod expanded_node_id;
pub(crate) mod extension_object;
mod guid;
mod localized_text;
mod message_security_mode;
mod node_class;
mod node_id;
mod qualified_name;
mod security_policy;
mod status_code;
mod string;
mod variant;

pub use self::{
    attribute_id::AttributeId,
    byte_string::ByteString,
    data_types::*,
    data_value::DataValue,
    date_time::DateTime,
    diagnostic_info::DiagnosticInfo,
    expanded_node_id::ExpandedNodeId,
    extension_object::{Encodeable, EncodeableType, ExtensionObject, ExtensionObjectBody},
    guid::Guid,
    localized_text::LocalizedText,
    message_security_mode::MessageSecurityMode,
    node_class::NodeClass,
    node_id::{Identifier, NodeId},
    qualified_name::QualifiedName,
    security_policy::SecurityPolicy,
    status_code::StatusCode,
    string::{String, XmlElement},
    variant::{Variant, VariantArray, VariantKind},
};
