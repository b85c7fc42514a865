use crate::binary::{impl_binary_enum, impl_binary_struct};
use crate::service::impl_service_pair;
use crate::ua;

/// Whether an OpenSecureChannel request issues or renews the token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum SecurityTokenRequestType {
    #[default]
    Issue = 0,
    Renew = 1,
}

impl SecurityTokenRequestType {
    #[must_use]
    pub const fn from_value(value: u32) -> Self {
        match value {
            1 => Self::Renew,
            _ => Self::Issue,
        }
    }

    #[must_use]
    pub const fn value(self) -> u32 {
        self as u32
    }
}

impl_binary_enum!(SecurityTokenRequestType, SecurityTokenRequestType::from_value);

/// Security token negotiated on a secure channel.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChannelSecurityToken {
    pub channel_id: u32,
    pub token_id: u32,
    pub created_at: ua::DateTime,
    pub revised_lifetime: u32,
}

impl_binary_struct!(ChannelSecurityToken {
    channel_id,
    token_id,
    created_at,
    revised_lifetime,
});

#[derive(Debug, Clone, PartialEq, Default)]
pub struct OpenSecureChannelRequest {
    pub request_header: ua::RequestHeader,
    pub client_protocol_version: u32,
    pub request_type: SecurityTokenRequestType,
    pub security_mode: ua::MessageSecurityMode,
    pub client_nonce: ua::ByteString,
    pub requested_lifetime: u32,
}

impl_binary_struct!(OpenSecureChannelRequest {
    request_header,
    client_protocol_version,
    request_type,
    security_mode,
    client_nonce,
    requested_lifetime,
});

#[derive(Debug, Clone, PartialEq, Default)]
pub struct OpenSecureChannelResponse {
    pub response_header: ua::ResponseHeader,
    pub server_protocol_version: u32,
    pub security_token: ChannelSecurityToken,
    pub server_nonce: ua::ByteString,
}

impl_binary_struct!(OpenSecureChannelResponse {
    response_header,
    server_protocol_version,
    security_token,
    server_nonce,
});

impl_service_pair!(OpenSecureChannelRequest => 446, OpenSecureChannelResponse => 449);

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CloseSecureChannelRequest {
    pub request_header: ua::RequestHeader,
}

impl_binary_struct!(CloseSecureChannelRequest { request_header });

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CloseSecureChannelResponse {
    pub response_header: ua::ResponseHeader,
}

impl_binary_struct!(CloseSecureChannelResponse { response_header });

impl_service_pair!(CloseSecureChannelRequest => 452, CloseSecureChannelResponse => 455);
