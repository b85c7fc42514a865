//! Service adapters: typed request in, typed response out, against the
//! address space and server state.
//!
//! Cross-cutting rules applied by every adapter: a request with zero
//! operations returns BadNothingToDo, one exceeding the per-service
//! maximum returns BadTooManyOperations, and node ids are validated before
//! any operation executes.

use log::{debug, warn};

use crate::address_space::{access_level, AddressSpace, AddressSpaceItem, NodeData, Reference};
use crate::{config, ua};

const HAS_COMPONENT: u32 = 47;
const HAS_TYPE_DEFINITION: u32 = 40;

/// Per-service operation limits.
#[derive(Debug, Clone, Copy)]
pub struct ServiceLimits {
    pub max_operations_per_request: usize,
}

impl Default for ServiceLimits {
    fn default() -> Self {
        Self {
            max_operations_per_request: config::MAX_OPERATIONS_PER_REQUEST,
        }
    }
}

/// Server state the adapters operate on.
#[derive(Debug)]
pub struct ServicesCore {
    address_space: AddressSpace,
    limits: ServiceLimits,
    server_description: ua::ApplicationDescription,
    endpoints: Vec<ua::EndpointDescription>,
    registered_servers: Vec<ua::RegisteredServer>,
    /// Counter behind server-assigned node ids (namespace 1).
    next_node_id: u32,
}

impl ServicesCore {
    #[must_use]
    pub fn new(address_space: AddressSpace, endpoint_url: &str) -> Self {
        let server_description = ua::ApplicationDescription {
            application_uri: ua::String::from(config::APPLICATION_URI),
            product_uri: ua::String::from(config::PRODUCT_URI),
            application_name: ua::LocalizedText::text_only(config::APPLICATION_NAME),
            application_type: ua::ApplicationType::Server,
            gateway_server_uri: ua::String::null(),
            discovery_profile_uri: ua::String::null(),
            discovery_urls: vec![ua::String::from(endpoint_url)],
        };
        let endpoints = vec![ua::EndpointDescription {
            endpoint_url: ua::String::from(endpoint_url),
            server: server_description.clone(),
            server_certificate: ua::ByteString::null(),
            security_mode: ua::MessageSecurityMode::None,
            security_policy_uri: ua::String::from(ua::SecurityPolicy::None.uri()),
            user_identity_tokens: vec![ua::UserTokenPolicy::anonymous()],
            transport_profile_uri: ua::String::from(
                "http://opcfoundation.org/UA-Profile/Transport/uatcp-uasc-uabinary",
            ),
            security_level: 0,
        }];
        Self {
            address_space,
            limits: ServiceLimits::default(),
            server_description,
            endpoints,
            registered_servers: Vec::new(),
            next_node_id: 1,
        }
    }

    #[must_use]
    pub fn with_limits(mut self, limits: ServiceLimits) -> Self {
        self.limits = limits;
        self
    }

    #[must_use]
    pub const fn address_space(&self) -> &AddressSpace {
        &self.address_space
    }

    #[must_use]
    pub fn address_space_mut(&mut self) -> &mut AddressSpace {
        &mut self.address_space
    }

    /// Zero operations and too-many-operations checks shared by all
    /// services.
    fn check_operation_count(&self, count: usize) -> Option<ua::StatusCode> {
        if count == 0 {
            Some(ua::StatusCode::BAD_NOTHING_TO_DO)
        } else if count > self.limits.max_operations_per_request {
            Some(ua::StatusCode::BAD_TOO_MANY_OPERATIONS)
        } else {
            None
        }
    }

    /// Dispatches any request message to its adapter.
    #[must_use]
    pub fn treat_message(&mut self, request: &ua::Message) -> ua::Message {
        match request {
            ua::Message::GetEndpointsRequest(request) => {
                ua::Message::GetEndpointsResponse(self.treat_get_endpoints(request))
            }
            ua::Message::FindServersRequest(request) => {
                ua::Message::FindServersResponse(self.treat_find_servers(request))
            }
            ua::Message::RegisterServerRequest(request) => {
                ua::Message::RegisterServerResponse(self.treat_register_server(request))
            }
            ua::Message::ReadRequest(request) => {
                ua::Message::ReadResponse(self.treat_read(request))
            }
            ua::Message::WriteRequest(request) => {
                ua::Message::WriteResponse(self.treat_write(request))
            }
            ua::Message::BrowseRequest(request) => {
                ua::Message::BrowseResponse(self.treat_browse(request))
            }
            ua::Message::AddNodesRequest(request) => {
                ua::Message::AddNodesResponse(self.treat_add_nodes(request))
            }
            ua::Message::UnregisterNodesRequest(request) => {
                ua::Message::UnregisterNodesResponse(self.treat_unregister_nodes(request))
            }
            other => {
                warn!("unsupported service request: {:?}", other.type_id());
                let header = other
                    .request_header()
                    .cloned()
                    .unwrap_or_default();
                ua::Message::ServiceFault(ua::ServiceFault::new(
                    &header,
                    ua::StatusCode::BAD_SERVICE_UNSUPPORTED,
                ))
            }
        }
    }

    #[must_use]
    pub fn treat_get_endpoints(&self, request: &ua::GetEndpointsRequest) -> ua::GetEndpointsResponse {
        debug!("GetEndpoints for {}", request.endpoint_url);
        ua::GetEndpointsResponse {
            response_header: ua::ResponseHeader::new(&request.request_header, ua::StatusCode::GOOD),
            endpoints: self.endpoints.clone(),
        }
    }

    #[must_use]
    pub fn treat_find_servers(&self, request: &ua::FindServersRequest) -> ua::FindServersResponse {
        // The response owns its strings: everything is deep-copied in.
        let mut servers = vec![self.server_description.clone()];
        servers.extend(self.registered_servers.iter().map(|registered| {
            ua::ApplicationDescription {
                application_uri: registered.server_uri.clone(),
                product_uri: registered.product_uri.clone(),
                application_name: registered
                    .server_names
                    .first()
                    .cloned()
                    .unwrap_or_else(ua::LocalizedText::null),
                application_type: registered.server_type,
                gateway_server_uri: registered.gateway_server_uri.clone(),
                discovery_profile_uri: ua::String::null(),
                discovery_urls: registered.discovery_urls.clone(),
            }
        }));

        if !request.server_uris.is_empty() {
            servers.retain(|server| {
                request
                    .server_uris
                    .iter()
                    .any(|uri| *uri == server.application_uri)
            });
        }

        ua::FindServersResponse {
            response_header: ua::ResponseHeader::new(&request.request_header, ua::StatusCode::GOOD),
            servers,
        }
    }

    #[must_use]
    pub fn treat_register_server(
        &mut self,
        request: &ua::RegisterServerRequest,
    ) -> ua::RegisterServerResponse {
        let server = &request.server;
        let service_result = if server.server_uri.len() <= 0 {
            ua::StatusCode::BAD_SERVER_URI_INVALID
        } else if server.server_names.is_empty() {
            ua::StatusCode::BAD_SERVER_NAME_MISSING
        } else if server.discovery_urls.is_empty() {
            ua::StatusCode::BAD_DISCOVERY_URL_MISSING
        } else {
            self.registered_servers
                .retain(|registered| registered.server_uri != server.server_uri);
            if server.is_online {
                self.registered_servers.push(server.clone());
            }
            ua::StatusCode::GOOD
        };
        ua::RegisterServerResponse {
            response_header: ua::ResponseHeader::new(&request.request_header, service_result),
        }
    }

    #[must_use]
    pub fn treat_read(&self, request: &ua::ReadRequest) -> ua::ReadResponse {
        if let Some(status) = self.check_operation_count(request.nodes_to_read.len()) {
            return ua::ReadResponse {
                response_header: ua::ResponseHeader::new(&request.request_header, status),
                results: Vec::new(),
                diagnostic_infos: Vec::new(),
            };
        }

        let results = request
            .nodes_to_read
            .iter()
            .map(|to_read| self.read_one(to_read))
            .collect();

        ua::ReadResponse {
            response_header: ua::ResponseHeader::new(&request.request_header, ua::StatusCode::GOOD),
            results,
            diagnostic_infos: Vec::new(),
        }
    }

    fn read_one(&self, to_read: &ua::ReadValueId) -> ua::DataValue {
        if let Err(status) = validate_node_id(&to_read.node_id) {
            return ua::DataValue::from_status(status);
        }
        let Ok(attribute_id) = ua::AttributeId::try_from(to_read.attribute_id) else {
            return ua::DataValue::from_status(ua::StatusCode::BAD_ATTRIBUTE_ID_INVALID);
        };
        if !to_read.index_range.is_null() && !to_read.index_range.is_empty() {
            return ua::DataValue::from_status(ua::StatusCode::BAD_INDEX_RANGE_INVALID);
        }
        let Some(item) = self.address_space.get(&to_read.node_id) else {
            return ua::DataValue::from_status(ua::StatusCode::BAD_NODE_ID_UNKNOWN);
        };

        let variant = match attribute_id {
            ua::AttributeId::NodeId => ua::Variant::NodeId(Box::new(item.node_id.clone())),
            ua::AttributeId::NodeClass => ua::Variant::Int32(
                i32::try_from(item.node_class().value()).unwrap_or(0),
            ),
            ua::AttributeId::BrowseName => {
                ua::Variant::QualifiedName(Box::new(item.browse_name.clone()))
            }
            ua::AttributeId::DisplayName => {
                ua::Variant::LocalizedText(Box::new(item.display_name.clone()))
            }
            ua::AttributeId::Description => {
                ua::Variant::LocalizedText(Box::new(item.description.clone()))
            }
            ua::AttributeId::Value => match &item.data {
                NodeData::Variable(data) => {
                    let mut result = ua::DataValue::new(data.value.clone());
                    result.status = data.value_status;
                    result.source_timestamp = ua::DateTime::now();
                    return result;
                }
                NodeData::VariableType(data) => {
                    let mut result = ua::DataValue::new(data.value.clone());
                    result.status = data.value_status;
                    return result;
                }
                _ => return ua::DataValue::from_status(ua::StatusCode::BAD_ATTRIBUTE_ID_INVALID),
            },
            ua::AttributeId::DataType => match item.data_type() {
                Some(data_type) => ua::Variant::NodeId(Box::new(data_type.clone())),
                None => {
                    return ua::DataValue::from_status(ua::StatusCode::BAD_ATTRIBUTE_ID_INVALID);
                }
            },
            ua::AttributeId::ValueRank => match &item.data {
                NodeData::Variable(data) => ua::Variant::Int32(data.value_rank),
                NodeData::VariableType(data) => ua::Variant::Int32(data.value_rank),
                _ => return ua::DataValue::from_status(ua::StatusCode::BAD_ATTRIBUTE_ID_INVALID),
            },
            ua::AttributeId::AccessLevel | ua::AttributeId::UserAccessLevel => {
                match item.access_level() {
                    Some(level) => ua::Variant::Byte(level),
                    None => {
                        return ua::DataValue::from_status(
                            ua::StatusCode::BAD_ATTRIBUTE_ID_INVALID,
                        );
                    }
                }
            }
            _ => return ua::DataValue::from_status(ua::StatusCode::BAD_ATTRIBUTE_ID_INVALID),
        };
        ua::DataValue::new(variant)
    }

    #[must_use]
    pub fn treat_write(&mut self, request: &ua::WriteRequest) -> ua::WriteResponse {
        if let Some(status) = self.check_operation_count(request.nodes_to_write.len()) {
            return ua::WriteResponse {
                response_header: ua::ResponseHeader::new(&request.request_header, status),
                results: Vec::new(),
                diagnostic_infos: Vec::new(),
            };
        }

        let results = request
            .nodes_to_write
            .iter()
            .map(|to_write| self.write_one(to_write))
            .collect();

        ua::WriteResponse {
            response_header: ua::ResponseHeader::new(&request.request_header, ua::StatusCode::GOOD),
            results,
            diagnostic_infos: Vec::new(),
        }
    }

    fn write_one(&mut self, to_write: &ua::WriteValue) -> ua::StatusCode {
        if let Err(status) = validate_node_id(&to_write.node_id) {
            return status;
        }
        if to_write.attribute_id != ua::AttributeId::Value.value() {
            return ua::StatusCode::BAD_NOT_WRITABLE;
        }
        if !to_write.index_range.is_null() && !to_write.index_range.is_empty() {
            return ua::StatusCode::BAD_INDEX_RANGE_INVALID;
        }
        let Some(item) = self.address_space.get_mut(&to_write.node_id) else {
            return ua::StatusCode::BAD_NODE_ID_UNKNOWN;
        };
        match &mut item.data {
            NodeData::Variable(data) => {
                if data.access_level & access_level::CURRENT_WRITE == 0 {
                    return ua::StatusCode::BAD_NOT_WRITABLE;
                }
                data.value = to_write.value.value.clone();
                data.value_status = to_write.value.status;
                ua::StatusCode::GOOD
            }
            _ => ua::StatusCode::BAD_NOT_WRITABLE,
        }
    }

    #[must_use]
    pub fn treat_browse(&self, request: &ua::BrowseRequest) -> ua::BrowseResponse {
        if let Some(status) = self.check_operation_count(request.nodes_to_browse.len()) {
            return ua::BrowseResponse {
                response_header: ua::ResponseHeader::new(&request.request_header, status),
                results: Vec::new(),
                diagnostic_infos: Vec::new(),
            };
        }

        let results = request
            .nodes_to_browse
            .iter()
            .map(|to_browse| self.browse_one(to_browse, request.requested_max_references_per_node))
            .collect();

        ua::BrowseResponse {
            response_header: ua::ResponseHeader::new(&request.request_header, ua::StatusCode::GOOD),
            results,
            diagnostic_infos: Vec::new(),
        }
    }

    fn browse_one(&self, to_browse: &ua::BrowseDescription, max_references: u32) -> ua::BrowseResult {
        if let Err(status) = validate_node_id(&to_browse.node_id) {
            return ua::BrowseResult {
                status_code: status,
                continuation_point: ua::ByteString::null(),
                references: Vec::new(),
            };
        }
        let Some(item) = self.address_space.get(&to_browse.node_id) else {
            return ua::BrowseResult {
                status_code: ua::StatusCode::BAD_NODE_ID_UNKNOWN,
                continuation_point: ua::ByteString::null(),
                references: Vec::new(),
            };
        };

        let direction_matches = |reference: &Reference| match to_browse.browse_direction {
            ua::BrowseDirection::Forward => !reference.is_inverse,
            ua::BrowseDirection::Inverse => reference.is_inverse,
            ua::BrowseDirection::Both => true,
        };
        let type_matches = |reference: &Reference| {
            to_browse.reference_type_id.is_null()
                || reference.reference_type_id == to_browse.reference_type_id
        };

        let mut references = Vec::new();
        for reference in &item.references {
            if !direction_matches(reference) || !type_matches(reference) {
                continue;
            }
            if max_references != 0 && references.len() >= max_references as usize {
                break;
            }
            references.push(self.describe_reference(reference, to_browse.node_class_mask));
        }
        // Continuation points are not handed out: every result is complete.
        ua::BrowseResult {
            status_code: ua::StatusCode::GOOD,
            continuation_point: ua::ByteString::null(),
            references: references.into_iter().flatten().collect(),
        }
    }

    fn describe_reference(
        &self,
        reference: &Reference,
        node_class_mask: u32,
    ) -> Option<ua::ReferenceDescription> {
        let mut description = ua::ReferenceDescription {
            reference_type_id: reference.reference_type_id.clone(),
            is_forward: !reference.is_inverse,
            node_id: reference.target_id.clone(),
            browse_name: ua::QualifiedName::null(),
            display_name: ua::LocalizedText::null(),
            node_class: 0,
            type_definition: ua::ExpandedNodeId::null(),
        };
        if reference.target_id.is_local() {
            if let Some(target) = self.address_space.get(&reference.target_id.node_id) {
                let node_class = target.node_class().value();
                if node_class_mask != 0 && node_class_mask & node_class == 0 {
                    return None;
                }
                description.browse_name = target.browse_name.clone();
                description.display_name = target.display_name.clone();
                description.node_class = node_class;
                if let Some(type_definition) = target.type_definition() {
                    description.type_definition = type_definition.clone();
                }
            }
        }
        Some(description)
    }

    #[must_use]
    pub fn treat_add_nodes(&mut self, request: &ua::AddNodesRequest) -> ua::AddNodesResponse {
        if let Some(status) = self.check_operation_count(request.nodes_to_add.len()) {
            return ua::AddNodesResponse {
                response_header: ua::ResponseHeader::new(&request.request_header, status),
                results: Vec::new(),
                diagnostic_infos: Vec::new(),
            };
        }

        let results = request
            .nodes_to_add
            .iter()
            .map(|item| self.add_one_node(item))
            .collect();

        ua::AddNodesResponse {
            response_header: ua::ResponseHeader::new(&request.request_header, ua::StatusCode::GOOD),
            results,
            diagnostic_infos: Vec::new(),
        }
    }

    fn add_one_node(&mut self, to_add: &ua::AddNodesItem) -> ua::AddNodesResult {
        // An empty browse name is rejected before anything else.
        if to_add.browse_name.name.len() <= 0 {
            return ua::AddNodesResult::rejected(ua::StatusCode::BAD_BROWSE_NAME_INVALID);
        }
        let Some(node_class) = ua::NodeClass::from_value(to_add.node_class) else {
            return ua::AddNodesResult::rejected(ua::StatusCode::BAD_NODE_CLASS_INVALID);
        };
        // Only Object and Variable nodes can be added at runtime.
        if !matches!(node_class, ua::NodeClass::Object | ua::NodeClass::Variable) {
            return ua::AddNodesResult::rejected(ua::StatusCode::BAD_NODE_CLASS_INVALID);
        }

        // The node attributes extension object must carry a decoded object;
        // an absent or opaque body is as invalid as an undecodable one.
        let mut attributes = to_add.node_attributes.clone();
        if matches!(attributes.body, ua::ExtensionObjectBody::Binary(_)) {
            let _ = attributes.decode_body();
        }
        if !matches!(attributes.body, ua::ExtensionObjectBody::Decoded(_)) {
            return ua::AddNodesResult::rejected(ua::StatusCode::BAD_NODE_ATTRIBUTES_INVALID);
        }

        // A type definition must be present iff the class is Object or
        // Variable (which is every accepted class here).
        if to_add.type_definition.is_null() {
            return ua::AddNodesResult::rejected(ua::StatusCode::BAD_TYPE_DEFINITION_INVALID);
        }

        if !to_add.parent_node_id.is_null() {
            if !to_add.parent_node_id.is_local()
                || !self.address_space.contains(&to_add.parent_node_id.node_id)
            {
                return ua::AddNodesResult::rejected(ua::StatusCode::BAD_PARENT_NODE_ID_INVALID);
            }
        }

        let node_id = if to_add.requested_new_node_id.is_null() {
            self.fresh_node_id()
        } else if !to_add.requested_new_node_id.is_local() {
            return ua::AddNodesResult::rejected(ua::StatusCode::BAD_NODE_ID_REJECTED);
        } else {
            to_add.requested_new_node_id.node_id.clone()
        };
        if let Err(status) = validate_node_id(&node_id) {
            return ua::AddNodesResult::rejected(status);
        }
        if self.address_space.contains(&node_id) {
            return ua::AddNodesResult::rejected(ua::StatusCode::BAD_NODE_ID_EXISTS);
        }

        let mut item = AddressSpaceItem::new(node_class);
        item.node_id = node_id.clone();
        item.browse_name = to_add.browse_name.clone();

        // The decoded object must be the attributes type of the node class.
        match (&mut item.data, node_class) {
            (NodeData::Object, ua::NodeClass::Object) => {
                let Some(object_attributes) = attributes.decoded_as::<ua::ObjectAttributes>()
                else {
                    return ua::AddNodesResult::rejected(
                        ua::StatusCode::BAD_NODE_ATTRIBUTES_INVALID,
                    );
                };
                item.display_name = object_attributes.display_name.clone();
                item.description = object_attributes.description.clone();
            }
            (NodeData::Variable(data), ua::NodeClass::Variable) => {
                let Some(variable_attributes) =
                    attributes.decoded_as::<ua::VariableAttributes>()
                else {
                    return ua::AddNodesResult::rejected(
                        ua::StatusCode::BAD_NODE_ATTRIBUTES_INVALID,
                    );
                };
                item.display_name = variable_attributes.display_name.clone();
                item.description = variable_attributes.description.clone();
                data.value = variable_attributes.value.clone();
                data.data_type = variable_attributes.data_type.clone();
                data.value_rank = variable_attributes.value_rank;
                data.access_level = variable_attributes.access_level;
                data.value_status = ua::StatusCode::GOOD;
            }
            _ => unreachable!("class checked above"),
        }

        item.references.push(Reference {
            reference_type_id: ua::NodeId::numeric(0, HAS_TYPE_DEFINITION),
            is_inverse: false,
            target_id: to_add.type_definition.clone(),
        });
        if !to_add.parent_node_id.is_null() {
            let reference_type_id = if to_add.reference_type_id.is_null() {
                ua::NodeId::numeric(0, HAS_COMPONENT)
            } else {
                to_add.reference_type_id.clone()
            };
            item.references.push(Reference {
                reference_type_id: reference_type_id.clone(),
                is_inverse: true,
                target_id: to_add.parent_node_id.clone(),
            });
            if let Some(parent) = self.address_space.get_mut(&to_add.parent_node_id.node_id) {
                parent.references.push(Reference {
                    reference_type_id,
                    is_inverse: false,
                    target_id: ua::ExpandedNodeId::local(node_id.clone()),
                });
            }
        }

        match self.address_space.append(item) {
            Ok(()) => ua::AddNodesResult {
                status_code: ua::StatusCode::GOOD,
                added_node_id: node_id,
            },
            Err(_) => ua::AddNodesResult::rejected(ua::StatusCode::BAD_INTERNAL_ERROR),
        }
    }

    fn fresh_node_id(&mut self) -> ua::NodeId {
        loop {
            let candidate = ua::NodeId::numeric(1, self.next_node_id);
            self.next_node_id += 1;
            if !self.address_space.contains(&candidate) {
                return candidate;
            }
        }
    }

    #[must_use]
    pub fn treat_unregister_nodes(
        &self,
        request: &ua::UnregisterNodesRequest,
    ) -> ua::UnregisterNodesResponse {
        let service_result = match self.check_operation_count(request.nodes_to_unregister.len()) {
            Some(status) => status,
            // Nothing is tracked per registered node: unknown ids are fine.
            None => ua::StatusCode::GOOD,
        };
        ua::UnregisterNodesResponse {
            response_header: ua::ResponseHeader::new(&request.request_header, service_result),
        }
    }
}

/// NodeId validation preceding operation execution: the namespace index
/// must not be reserved, the id must not be null, and the identifier must
/// be well-formed for its kind (no empty string, GUID or byte string
/// payloads in any namespace).
fn validate_node_id(node_id: &ua::NodeId) -> Result<(), ua::StatusCode> {
    if node_id.is_null() || node_id.namespace == u16::MAX {
        return Err(ua::StatusCode::BAD_NODE_ID_INVALID);
    }
    let well_formed = match &node_id.identifier {
        // The numeric null spelling is already caught above; any other
        // numeric value is well-formed.
        ua::Identifier::Numeric(_) => true,
        ua::Identifier::String(string) => !string.is_null() && !string.is_empty(),
        ua::Identifier::Guid(guid) => !guid.is_null(),
        ua::Identifier::ByteString(bytes) => !bytes.is_null() && !bytes.is_empty(),
    };
    if well_formed {
        Ok(())
    } else {
        Err(ua::StatusCode::BAD_NODE_ID_INVALID)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address_space::VariableData;

    fn core_with_variable() -> ServicesCore {
        let mut space = AddressSpace::new();

        let mut object = AddressSpaceItem::new(ua::NodeClass::Object);
        object.node_id = ua::NodeId::numeric(1, 10);
        object.browse_name = ua::QualifiedName::new(1, "Obj");
        object.references.push(Reference {
            reference_type_id: ua::NodeId::numeric(0, HAS_COMPONENT),
            is_inverse: false,
            target_id: ua::ExpandedNodeId::local(ua::NodeId::numeric(1, 11)),
        });
        space.append(object).unwrap();

        let mut variable = AddressSpaceItem::new(ua::NodeClass::Variable);
        variable.node_id = ua::NodeId::numeric(1, 11);
        variable.browse_name = ua::QualifiedName::new(1, "Var");
        variable.data = NodeData::Variable(VariableData {
            data_type: ua::NodeId::numeric(0, 6),
            value_rank: -1,
            value: ua::Variant::Int32(7),
            value_status: ua::StatusCode::GOOD,
            access_level: access_level::CURRENT_READ | access_level::CURRENT_WRITE,
        });
        variable.references.push(Reference {
            reference_type_id: ua::NodeId::numeric(0, HAS_COMPONENT),
            is_inverse: true,
            target_id: ua::ExpandedNodeId::local(ua::NodeId::numeric(1, 10)),
        });
        space.append(variable).unwrap();

        ServicesCore::new(space, "opc.tcp://localhost:4841")
    }

    fn read_request(nodes: Vec<ua::ReadValueId>) -> ua::ReadRequest {
        ua::ReadRequest {
            request_header: ua::RequestHeader::default(),
            max_age: 0.0,
            timestamps_to_return: ua::TimestampsToReturn::Neither,
            nodes_to_read: nodes,
        }
    }

    #[test]
    fn zero_operations_is_nothing_to_do() {
        let core = core_with_variable();
        let response = core.treat_read(&read_request(Vec::new()));
        assert_eq!(
            response.response_header.service_result,
            ua::StatusCode::BAD_NOTHING_TO_DO
        );
        assert!(response.results.is_empty());
    }

    #[test]
    fn too_many_operations_is_rejected() {
        let core = core_with_variable().with_limits(ServiceLimits {
            max_operations_per_request: 2,
        });
        let nodes = (0..3)
            .map(|i| ua::ReadValueId::new(ua::NodeId::numeric(1, i), ua::AttributeId::Value))
            .collect();
        let response = core.treat_read(&read_request(nodes));
        assert_eq!(
            response.response_header.service_result,
            ua::StatusCode::BAD_TOO_MANY_OPERATIONS
        );
    }

    #[test]
    fn read_value_and_attribute_errors() {
        let core = core_with_variable();
        let response = core.treat_read(&read_request(vec![
            ua::ReadValueId::new(ua::NodeId::numeric(1, 11), ua::AttributeId::Value),
            ua::ReadValueId::new(ua::NodeId::numeric(1, 99), ua::AttributeId::Value),
            ua::ReadValueId {
                node_id: ua::NodeId::numeric(1, 11),
                attribute_id: 99,
                index_range: ua::String::null(),
                data_encoding: ua::QualifiedName::null(),
            },
            ua::ReadValueId::new(ua::NodeId::null(), ua::AttributeId::Value),
        ]));
        assert_eq!(response.response_header.service_result, ua::StatusCode::GOOD);
        assert_eq!(response.results.len(), 4);
        assert_eq!(response.results[0].value, ua::Variant::Int32(7));
        assert_eq!(
            response.results[1].status,
            ua::StatusCode::BAD_NODE_ID_UNKNOWN
        );
        assert_eq!(
            response.results[2].status,
            ua::StatusCode::BAD_ATTRIBUTE_ID_INVALID
        );
        assert_eq!(
            response.results[3].status,
            ua::StatusCode::BAD_NODE_ID_INVALID
        );
    }

    #[test]
    fn node_id_well_formedness_precedes_lookup() {
        let core = core_with_variable();
        let response = core.treat_read(&read_request(vec![
            ua::ReadValueId::new(ua::NodeId::string(1, ""), ua::AttributeId::Value),
            ua::ReadValueId::new(ua::NodeId::byte_string(1, b""), ua::AttributeId::Value),
            ua::ReadValueId::new(ua::NodeId::guid(1, ua::Guid::null()), ua::AttributeId::Value),
            ua::ReadValueId::new(ua::NodeId::numeric(u16::MAX, 5), ua::AttributeId::Value),
        ]));
        for result in &response.results {
            assert_eq!(result.status, ua::StatusCode::BAD_NODE_ID_INVALID);
        }
    }

    #[test]
    fn write_updates_value_and_respects_access_level() {
        let mut core = core_with_variable();
        let response = core.treat_write(&ua::WriteRequest {
            request_header: ua::RequestHeader::default(),
            nodes_to_write: vec![
                ua::WriteValue::new(ua::NodeId::numeric(1, 11), ua::Variant::Int32(42)),
                // Objects have no writable value.
                ua::WriteValue::new(ua::NodeId::numeric(1, 10), ua::Variant::Int32(1)),
            ],
        });
        assert_eq!(response.results[0], ua::StatusCode::GOOD);
        assert_eq!(response.results[1], ua::StatusCode::BAD_NOT_WRITABLE);
        assert_eq!(
            core.address_space()
                .get(&ua::NodeId::numeric(1, 11))
                .unwrap()
                .value(),
            Some(&ua::Variant::Int32(42))
        );
    }

    #[test]
    fn browse_follows_direction_and_type() {
        let core = core_with_variable();
        let response = core.treat_browse(&ua::BrowseRequest {
            request_header: ua::RequestHeader::default(),
            view: ua::ViewDescription::default(),
            requested_max_references_per_node: 0,
            nodes_to_browse: vec![
                ua::BrowseDescription::all_forward(ua::NodeId::numeric(1, 10)),
                ua::BrowseDescription {
                    browse_direction: ua::BrowseDirection::Inverse,
                    ..ua::BrowseDescription::all_forward(ua::NodeId::numeric(1, 10))
                },
            ],
        });
        let forward = &response.results[0];
        assert_eq!(forward.status_code, ua::StatusCode::GOOD);
        assert_eq!(forward.references.len(), 1);
        assert_eq!(
            forward.references[0].node_id,
            ua::ExpandedNodeId::local(ua::NodeId::numeric(1, 11))
        );
        assert_eq!(
            forward.references[0].browse_name,
            ua::QualifiedName::new(1, "Var")
        );
        // No inverse references on the object node.
        assert!(response.results[1].references.is_empty());
    }

    fn add_nodes_item() -> ua::AddNodesItem {
        ua::AddNodesItem {
            parent_node_id: ua::ExpandedNodeId::local(ua::NodeId::numeric(1, 10)),
            reference_type_id: ua::NodeId::numeric(0, HAS_COMPONENT),
            requested_new_node_id: ua::ExpandedNodeId::local(ua::NodeId::numeric(1, 20)),
            browse_name: ua::QualifiedName::new(1, "New"),
            node_class: ua::NodeClass::Object.value(),
            node_attributes: ua::ExtensionObject::decoded(ua::ObjectAttributes {
                display_name: ua::LocalizedText::text_only("New object"),
                ..ua::ObjectAttributes::default()
            }),
            type_definition: ua::ExpandedNodeId::local(ua::NodeId::numeric(0, 58)),
        }
    }

    fn add_nodes_request(items: Vec<ua::AddNodesItem>) -> ua::AddNodesRequest {
        ua::AddNodesRequest {
            request_header: ua::RequestHeader::default(),
            nodes_to_add: items,
        }
    }

    #[test]
    fn add_nodes_validations() {
        let mut core = core_with_variable();

        let mut empty_name = add_nodes_item();
        empty_name.browse_name = ua::QualifiedName::null();
        let mut bad_class = add_nodes_item();
        bad_class.node_class = 3;
        let mut no_type_definition = add_nodes_item();
        no_type_definition.type_definition = ua::ExpandedNodeId::null();
        let mut bad_parent = add_nodes_item();
        bad_parent.parent_node_id = ua::ExpandedNodeId::local(ua::NodeId::numeric(1, 99));
        let mut no_attributes = add_nodes_item();
        no_attributes.node_attributes = ua::ExtensionObject::null();
        let mut wrong_attributes = add_nodes_item();
        wrong_attributes.node_attributes =
            ua::ExtensionObject::decoded(ua::VariableAttributes::default());

        let response = core.treat_add_nodes(&add_nodes_request(vec![
            empty_name,
            bad_class,
            no_type_definition,
            bad_parent,
            no_attributes,
            wrong_attributes,
        ]));
        assert_eq!(
            response.results[0].status_code,
            ua::StatusCode::BAD_BROWSE_NAME_INVALID
        );
        assert_eq!(
            response.results[1].status_code,
            ua::StatusCode::BAD_NODE_CLASS_INVALID
        );
        assert_eq!(
            response.results[2].status_code,
            ua::StatusCode::BAD_TYPE_DEFINITION_INVALID
        );
        assert_eq!(
            response.results[3].status_code,
            ua::StatusCode::BAD_PARENT_NODE_ID_INVALID
        );
        // Absent attributes are rejected, not defaulted.
        assert_eq!(
            response.results[4].status_code,
            ua::StatusCode::BAD_NODE_ATTRIBUTES_INVALID
        );
        // Decoded attributes of the wrong class are rejected too.
        assert_eq!(
            response.results[5].status_code,
            ua::StatusCode::BAD_NODE_ATTRIBUTES_INVALID
        );
        assert!(!core.address_space().contains(&ua::NodeId::numeric(1, 20)));
    }

    #[test]
    fn add_nodes_attributes_checked_before_type_definition() {
        let mut core = core_with_variable();
        // Both the attributes and the type definition are invalid; the
        // attributes failure wins.
        let mut item = add_nodes_item();
        item.node_attributes = ua::ExtensionObject::null();
        item.type_definition = ua::ExpandedNodeId::null();

        let response = core.treat_add_nodes(&add_nodes_request(vec![item]));
        assert_eq!(
            response.results[0].status_code,
            ua::StatusCode::BAD_NODE_ATTRIBUTES_INVALID
        );
    }

    #[test]
    fn add_node_links_parent_and_type() {
        let mut core = core_with_variable();
        let response = core.treat_add_nodes(&add_nodes_request(vec![add_nodes_item()]));
        assert_eq!(response.results[0].status_code, ua::StatusCode::GOOD);
        assert_eq!(response.results[0].added_node_id, ua::NodeId::numeric(1, 20));

        let added = core
            .address_space()
            .get(&ua::NodeId::numeric(1, 20))
            .unwrap();
        assert_eq!(added.node_class(), ua::NodeClass::Object);
        assert_eq!(
            added.type_definition(),
            Some(&ua::ExpandedNodeId::local(ua::NodeId::numeric(0, 58)))
        );
        // The parent gained a forward reference to the new node.
        let parent = core
            .address_space()
            .get(&ua::NodeId::numeric(1, 10))
            .unwrap();
        assert!(parent.references.iter().any(|reference| {
            !reference.is_inverse
                && reference.target_id == ua::ExpandedNodeId::local(ua::NodeId::numeric(1, 20))
        }));

        // Adding the same id again is rejected.
        let response = core.treat_add_nodes(&add_nodes_request(vec![add_nodes_item()]));
        assert_eq!(
            response.results[0].status_code,
            ua::StatusCode::BAD_NODE_ID_EXISTS
        );
    }

    #[test]
    fn register_server_validations() {
        let mut core = core_with_variable();
        let mut server = ua::RegisteredServer {
            server_uri: ua::String::from("urn:test:server"),
            product_uri: ua::String::from("urn:test"),
            server_names: vec![ua::LocalizedText::text_only("Test server")],
            server_type: ua::ApplicationType::Server,
            gateway_server_uri: ua::String::null(),
            discovery_urls: vec![ua::String::from("opc.tcp://host:4840")],
            semaphore_file_path: ua::String::null(),
            is_online: true,
        };

        let ok = core.treat_register_server(&ua::RegisterServerRequest {
            request_header: ua::RequestHeader::default(),
            server: server.clone(),
        });
        assert_eq!(ok.response_header.service_result, ua::StatusCode::GOOD);

        let servers = core.treat_find_servers(&ua::FindServersRequest::default());
        assert_eq!(servers.servers.len(), 2);

        server.server_names = Vec::new();
        let missing_name = core.treat_register_server(&ua::RegisterServerRequest {
            request_header: ua::RequestHeader::default(),
            server,
        });
        assert_eq!(
            missing_name.response_header.service_result,
            ua::StatusCode::BAD_SERVER_NAME_MISSING
        );
    }

    #[test]
    fn unregister_nodes_checks_counts_only() {
        let core = core_with_variable();
        let empty = core.treat_unregister_nodes(&ua::UnregisterNodesRequest::default());
        assert_eq!(
            empty.response_header.service_result,
            ua::StatusCode::BAD_NOTHING_TO_DO
        );

        let unknown = core.treat_unregister_nodes(&ua::UnregisterNodesRequest {
            request_header: ua::RequestHeader::default(),
            nodes_to_unregister: vec![ua::NodeId::numeric(1, 424_242)],
        });
        assert_eq!(unknown.response_header.service_result, ua::StatusCode::GOOD);
    }
}
