use crate::binary::impl_binary_struct;
use crate::service::impl_service_pair;
use crate::ua;
use crate::ua::extension_object::impl_encodeable;

/// Signature created with a certificate's private key.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureData {
    pub algorithm: ua::String,
    pub signature: ua::ByteString,
}

impl_binary_struct!(SignatureData {
    algorithm,
    signature,
});

/// Software certificate plus signature, unused with security policy None.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignedSoftwareCertificate {
    pub certificate_data: ua::ByteString,
    pub signature: ua::ByteString,
}

impl_binary_struct!(SignedSoftwareCertificate {
    certificate_data,
    signature,
});

/// Identity token of an anonymous user.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnonymousIdentityToken {
    pub policy_id: ua::String,
}

impl_binary_struct!(AnonymousIdentityToken { policy_id });
impl_encodeable!(AnonymousIdentityToken, "AnonymousIdentityToken", 321);

/// Identity token carrying a user name and (possibly encrypted) password.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserNameIdentityToken {
    pub policy_id: ua::String,
    pub user_name: ua::String,
    pub password: ua::ByteString,
    pub encryption_algorithm: ua::String,
}

impl_binary_struct!(UserNameIdentityToken {
    policy_id,
    user_name,
    password,
    encryption_algorithm,
});
impl_encodeable!(UserNameIdentityToken, "UserNameIdentityToken", 324);

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CreateSessionRequest {
    pub request_header: ua::RequestHeader,
    pub client_description: ua::ApplicationDescription,
    pub server_uri: ua::String,
    pub endpoint_url: ua::String,
    pub session_name: ua::String,
    pub client_nonce: ua::ByteString,
    pub client_certificate: ua::ByteString,
    pub requested_session_timeout: f64,
    pub max_response_message_size: u32,
}

impl_binary_struct!(CreateSessionRequest {
    request_header,
    client_description,
    server_uri,
    endpoint_url,
    session_name,
    client_nonce,
    client_certificate,
    requested_session_timeout,
    max_response_message_size,
});

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CreateSessionResponse {
    pub response_header: ua::ResponseHeader,
    pub session_id: ua::NodeId,
    pub authentication_token: ua::NodeId,
    pub revised_session_timeout: f64,
    pub server_nonce: ua::ByteString,
    pub server_certificate: ua::ByteString,
    pub server_endpoints: Vec<ua::EndpointDescription>,
    pub server_software_certificates: Vec<SignedSoftwareCertificate>,
    pub server_signature: SignatureData,
    pub max_request_message_size: u32,
}

impl_binary_struct!(CreateSessionResponse {
    response_header,
    session_id,
    authentication_token,
    revised_session_timeout,
    server_nonce,
    server_certificate,
    server_endpoints,
    server_software_certificates,
    server_signature,
    max_request_message_size,
});

impl_service_pair!(CreateSessionRequest => 461, CreateSessionResponse => 464);

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActivateSessionRequest {
    pub request_header: ua::RequestHeader,
    pub client_signature: SignatureData,
    pub client_software_certificates: Vec<SignedSoftwareCertificate>,
    pub locale_ids: Vec<ua::String>,
    pub user_identity_token: ua::ExtensionObject,
    pub user_token_signature: SignatureData,
}

impl_binary_struct!(ActivateSessionRequest {
    request_header,
    client_signature,
    client_software_certificates,
    locale_ids,
    user_identity_token,
    user_token_signature,
});

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActivateSessionResponse {
    pub response_header: ua::ResponseHeader,
    pub server_nonce: ua::ByteString,
    pub results: Vec<ua::StatusCode>,
    pub diagnostic_infos: Vec<ua::DiagnosticInfo>,
}

impl_binary_struct!(ActivateSessionResponse {
    response_header,
    server_nonce,
    results,
    diagnostic_infos,
});

impl_service_pair!(ActivateSessionRequest => 467, ActivateSessionResponse => 470);

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CloseSessionRequest {
    pub request_header: ua::RequestHeader,
    pub delete_subscriptions: bool,
}

impl_binary_struct!(CloseSessionRequest {
    request_header,
    delete_subscriptions,
});

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CloseSessionResponse {
    pub response_header: ua::ResponseHeader,
}

impl_binary_struct!(CloseSessionResponse { response_header });

impl_service_pair!(CloseSessionRequest => 473, CloseSessionResponse => 476);
