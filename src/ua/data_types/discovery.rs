use crate::binary::{impl_binary_enum, impl_binary_struct};
use crate::service::impl_service_pair;
use crate::ua;

/// Kind of application described by an [`ApplicationDescription`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum ApplicationType {
    #[default]
    Server = 0,
    Client = 1,
    ClientAndServer = 2,
    DiscoveryServer = 3,
}

impl ApplicationType {
    #[must_use]
    pub const fn from_value(value: u32) -> Self {
        match value {
            1 => Self::Client,
            2 => Self::ClientAndServer,
            3 => Self::DiscoveryServer,
            _ => Self::Server,
        }
    }

    #[must_use]
    pub const fn value(self) -> u32 {
        self as u32
    }
}

impl_binary_enum!(ApplicationType, ApplicationType::from_value);

/// Description of a client or server application.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ApplicationDescription {
    pub application_uri: ua::String,
    pub product_uri: ua::String,
    pub application_name: ua::LocalizedText,
    pub application_type: ApplicationType,
    pub gateway_server_uri: ua::String,
    pub discovery_profile_uri: ua::String,
    pub discovery_urls: Vec<ua::String>,
}

impl_binary_struct!(ApplicationDescription {
    application_uri,
    product_uri,
    application_name,
    application_type,
    gateway_server_uri,
    discovery_profile_uri,
    discovery_urls,
});

/// Kind of user identity token accepted by an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum UserTokenType {
    #[default]
    Anonymous = 0,
    UserName = 1,
    Certificate = 2,
    IssuedToken = 3,
}

impl UserTokenType {
    #[must_use]
    pub const fn from_value(value: u32) -> Self {
        match value {
            1 => Self::UserName,
            2 => Self::Certificate,
            3 => Self::IssuedToken,
            _ => Self::Anonymous,
        }
    }

    #[must_use]
    pub const fn value(self) -> u32 {
        self as u32
    }
}

impl_binary_enum!(UserTokenType, UserTokenType::from_value);

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserTokenPolicy {
    pub policy_id: ua::String,
    pub token_type: UserTokenType,
    pub issued_token_type: ua::String,
    pub issuer_endpoint_url: ua::String,
    pub security_policy_uri: ua::String,
}

impl UserTokenPolicy {
    /// The anonymous policy offered by default.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            policy_id: ua::String::from("anonymous"),
            token_type: UserTokenType::Anonymous,
            issued_token_type: ua::String::null(),
            issuer_endpoint_url: ua::String::null(),
            security_policy_uri: ua::String::null(),
        }
    }
}

impl_binary_struct!(UserTokenPolicy {
    policy_id,
    token_type,
    issued_token_type,
    issuer_endpoint_url,
    security_policy_uri,
});

/// Description of a server endpoint as returned by GetEndpoints.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EndpointDescription {
    pub endpoint_url: ua::String,
    pub server: ApplicationDescription,
    pub server_certificate: ua::ByteString,
    pub security_mode: ua::MessageSecurityMode,
    pub security_policy_uri: ua::String,
    pub user_identity_tokens: Vec<UserTokenPolicy>,
    pub transport_profile_uri: ua::String,
    pub security_level: u8,
}

impl_binary_struct!(EndpointDescription {
    endpoint_url,
    server,
    server_certificate,
    security_mode,
    security_policy_uri,
    user_identity_tokens,
    transport_profile_uri,
    security_level,
});

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GetEndpointsRequest {
    pub request_header: ua::RequestHeader,
    pub endpoint_url: ua::String,
    pub locale_ids: Vec<ua::String>,
    pub profile_uris: Vec<ua::String>,
}

impl_binary_struct!(GetEndpointsRequest {
    request_header,
    endpoint_url,
    locale_ids,
    profile_uris,
});

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GetEndpointsResponse {
    pub response_header: ua::ResponseHeader,
    pub endpoints: Vec<EndpointDescription>,
}

impl_binary_struct!(GetEndpointsResponse {
    response_header,
    endpoints,
});

impl_service_pair!(GetEndpointsRequest => 428, GetEndpointsResponse => 431);

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FindServersRequest {
    pub request_header: ua::RequestHeader,
    pub endpoint_url: ua::String,
    pub locale_ids: Vec<ua::String>,
    pub server_uris: Vec<ua::String>,
}

impl_binary_struct!(FindServersRequest {
    request_header,
    endpoint_url,
    locale_ids,
    server_uris,
});

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FindServersResponse {
    pub response_header: ua::ResponseHeader,
    pub servers: Vec<ApplicationDescription>,
}

impl_binary_struct!(FindServersResponse {
    response_header,
    servers,
});

impl_service_pair!(FindServersRequest => 422, FindServersResponse => 425);

/// Registration record announced by a server to a discovery server.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RegisteredServer {
    pub server_uri: ua::String,
    pub product_uri: ua::String,
    pub server_names: Vec<ua::LocalizedText>,
    pub server_type: ApplicationType,
    pub gateway_server_uri: ua::String,
    pub discovery_urls: Vec<ua::String>,
    pub semaphore_file_path: ua::String,
    pub is_online: bool,
}

impl_binary_struct!(RegisteredServer {
    server_uri,
    product_uri,
    server_names,
    server_type,
    gateway_server_uri,
    discovery_urls,
    semaphore_file_path,
    is_online,
});

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RegisterServerRequest {
    pub request_header: ua::RequestHeader,
    pub server: RegisteredServer,
}

impl_binary_struct!(RegisterServerRequest {
    request_header,
    server,
});

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RegisterServerResponse {
    pub response_header: ua::ResponseHeader,
}

impl_binary_struct!(RegisterServerResponse { response_header });

impl_service_pair!(RegisterServerRequest => 437, RegisterServerResponse => 440);
