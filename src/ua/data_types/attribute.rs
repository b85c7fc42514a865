use crate::binary::{impl_binary_enum, impl_binary_struct};
use crate::service::impl_service_pair;
use crate::ua;

/// Which timestamps a Read operation should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum TimestampsToReturn {
    Source = 0,
    Server = 1,
    #[default]
    Both = 2,
    Neither = 3,
}

impl TimestampsToReturn {
    #[must_use]
    pub const fn from_value(value: u32) -> Self {
        match value {
            0 => Self::Source,
            1 => Self::Server,
            3 => Self::Neither,
            _ => Self::Both,
        }
    }

    #[must_use]
    pub const fn value(self) -> u32 {
        self as u32
    }
}

impl_binary_enum!(TimestampsToReturn, TimestampsToReturn::from_value);

/// One node/attribute pair to read.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReadValueId {
    pub node_id: ua::NodeId,
    pub attribute_id: u32,
    pub index_range: ua::String,
    pub data_encoding: ua::QualifiedName,
}

impl ReadValueId {
    #[must_use]
    pub fn new(node_id: ua::NodeId, attribute_id: ua::AttributeId) -> Self {
        Self {
            node_id,
            attribute_id: attribute_id.value(),
            index_range: ua::String::null(),
            data_encoding: ua::QualifiedName::null(),
        }
    }
}

impl_binary_struct!(ReadValueId {
    node_id,
    attribute_id,
    index_range,
    data_encoding,
});

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReadRequest {
    pub request_header: ua::RequestHeader,
    pub max_age: f64,
    pub timestamps_to_return: TimestampsToReturn,
    pub nodes_to_read: Vec<ReadValueId>,
}

impl_binary_struct!(ReadRequest {
    request_header,
    max_age,
    timestamps_to_return,
    nodes_to_read,
});

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReadResponse {
    pub response_header: ua::ResponseHeader,
    pub results: Vec<ua::DataValue>,
    pub diagnostic_infos: Vec<ua::DiagnosticInfo>,
}

impl_binary_struct!(ReadResponse {
    response_header,
    results,
    diagnostic_infos,
});

impl_service_pair!(ReadRequest => 631, ReadResponse => 634);

/// One node/attribute pair to write.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WriteValue {
    pub node_id: ua::NodeId,
    pub attribute_id: u32,
    pub index_range: ua::String,
    pub value: ua::DataValue,
}

impl WriteValue {
    #[must_use]
    pub fn new(node_id: ua::NodeId, value: ua::Variant) -> Self {
        Self {
            node_id,
            attribute_id: ua::AttributeId::Value.value(),
            index_range: ua::String::null(),
            value: ua::DataValue::new(value),
        }
    }
}

impl_binary_struct!(WriteValue {
    node_id,
    attribute_id,
    index_range,
    value,
});

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WriteRequest {
    pub request_header: ua::RequestHeader,
    pub nodes_to_write: Vec<WriteValue>,
}

impl_binary_struct!(WriteRequest {
    request_header,
    nodes_to_write,
});

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WriteResponse {
    pub response_header: ua::ResponseHeader,
    pub results: Vec<ua::StatusCode>,
    pub diagnostic_infos: Vec<ua::DiagnosticInfo>,
}

impl_binary_struct!(WriteResponse {
    response_header,
    results,
    diagnostic_infos,
});

impl_service_pair!(WriteRequest => 673, WriteResponse => 676);
