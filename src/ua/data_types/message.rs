use std::io::{Read, Write};

use crate::binary::{BinaryDecodable, BinaryEncodable};
use crate::ua;
use crate::{Error, Result, ServiceRequest, ServiceResponse};

/// Any service message the runtime can carry, for type-erased transport and
/// dispatch. The wire form is the binary type id node followed by the body.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    OpenSecureChannelRequest(ua::OpenSecureChannelRequest),
    OpenSecureChannelResponse(ua::OpenSecureChannelResponse),
    CloseSecureChannelRequest(ua::CloseSecureChannelRequest),
    CloseSecureChannelResponse(ua::CloseSecureChannelResponse),
    CreateSessionRequest(ua::CreateSessionRequest),
    CreateSessionResponse(ua::CreateSessionResponse),
    ActivateSessionRequest(ua::ActivateSessionRequest),
    ActivateSessionResponse(ua::ActivateSessionResponse),
    CloseSessionRequest(ua::CloseSessionRequest),
    CloseSessionResponse(ua::CloseSessionResponse),
    GetEndpointsRequest(ua::GetEndpointsRequest),
    GetEndpointsResponse(ua::GetEndpointsResponse),
    FindServersRequest(ua::FindServersRequest),
    FindServersResponse(ua::FindServersResponse),
    RegisterServerRequest(ua::RegisterServerRequest),
    RegisterServerResponse(ua::RegisterServerResponse),
    ReadRequest(ua::ReadRequest),
    ReadResponse(ua::ReadResponse),
    WriteRequest(ua::WriteRequest),
    WriteResponse(ua::WriteResponse),
    BrowseRequest(ua::BrowseRequest),
    BrowseResponse(ua::BrowseResponse),
    AddNodesRequest(ua::AddNodesRequest),
    AddNodesResponse(ua::AddNodesResponse),
    UnregisterNodesRequest(ua::UnregisterNodesRequest),
    UnregisterNodesResponse(ua::UnregisterNodesResponse),
    ServiceFault(ua::ServiceFault),
}

macro_rules! for_each_message {
    ($macro:ident) => {
        $macro! {
            OpenSecureChannelRequest => ua::OpenSecureChannelRequest,
            OpenSecureChannelResponse => ua::OpenSecureChannelResponse,
            CloseSecureChannelRequest => ua::CloseSecureChannelRequest,
            CloseSecureChannelResponse => ua::CloseSecureChannelResponse,
            CreateSessionRequest => ua::CreateSessionRequest,
            CreateSessionResponse => ua::CreateSessionResponse,
            ActivateSessionRequest => ua::ActivateSessionRequest,
            ActivateSessionResponse => ua::ActivateSessionResponse,
            CloseSessionRequest => ua::CloseSessionRequest,
            CloseSessionResponse => ua::CloseSessionResponse,
            GetEndpointsRequest => ua::GetEndpointsRequest,
            GetEndpointsResponse => ua::GetEndpointsResponse,
            FindServersRequest => ua::FindServersRequest,
            FindServersResponse => ua::FindServersResponse,
            RegisterServerRequest => ua::RegisterServerRequest,
            RegisterServerResponse => ua::RegisterServerResponse,
            ReadRequest => ua::ReadRequest,
            ReadResponse => ua::ReadResponse,
            WriteRequest => ua::WriteRequest,
            WriteResponse => ua::WriteResponse,
            BrowseRequest => ua::BrowseRequest,
            BrowseResponse => ua::BrowseResponse,
            AddNodesRequest => ua::AddNodesRequest,
            AddNodesResponse => ua::AddNodesResponse,
            UnregisterNodesRequest => ua::UnregisterNodesRequest,
            UnregisterNodesResponse => ua::UnregisterNodesResponse,
        }
    };
}

impl Message {
    /// Binary encoding id of the contained message.
    #[must_use]
    pub fn type_id(&self) -> u32 {
        macro_rules! type_id_arms {
            ($($arm:ident => $type:ty,)+) => {
                match self {
                    $(Self::$arm(_) => message_type_id::<$type>(),)+
                    Self::ServiceFault(_) => ua::ServiceFault::TYPE_ID,
                }
            };
        }
        for_each_message!(type_id_arms)
    }

    /// Encodes the type id node followed by the message body.
    ///
    /// # Errors
    ///
    /// Fails when the underlying stream rejects writes.
    pub fn encode(&self, stream: &mut dyn Write) -> Result<()> {
        ua::NodeId::numeric(0, self.type_id()).encode(stream)?;
        macro_rules! encode_arms {
            ($($arm:ident => $type:ty,)+) => {
                match self {
                    $(Self::$arm(message) => message.encode(stream),)+
                    Self::ServiceFault(message) => message.encode(stream),
                }
            };
        }
        for_each_message!(encode_arms)
    }

    /// Decodes a message: type id node followed by the body.
    ///
    /// # Errors
    ///
    /// Fails with a decoding error on malformed input or an unknown type id.
    pub fn decode(stream: &mut dyn Read) -> Result<Self> {
        let type_id = ua::NodeId::decode(stream)?;
        if type_id.namespace != 0 {
            return Err(Error::Status(ua::StatusCode::BAD_DECODING_ERROR));
        }
        let Some(id) = type_id.numeric_value() else {
            return Err(Error::Status(ua::StatusCode::BAD_DECODING_ERROR));
        };

        macro_rules! decode_arms {
            ($($arm:ident => $type:ty,)+) => {
                $(if id == message_type_id::<$type>() {
                    return Ok(Self::$arm(<$type>::decode(stream)?));
                })+
            };
        }
        for_each_message!(decode_arms);

        if id == ua::ServiceFault::TYPE_ID {
            return Ok(Self::ServiceFault(ua::ServiceFault::decode(stream)?));
        }

        Err(Error::Status(ua::StatusCode::BAD_SERVICE_UNSUPPORTED))
    }

    /// Request header, `None` for responses.
    #[must_use]
    pub const fn request_header(&self) -> Option<&ua::RequestHeader> {
        Some(match self {
            Self::OpenSecureChannelRequest(r) => &r.request_header,
            Self::CloseSecureChannelRequest(r) => &r.request_header,
            Self::CreateSessionRequest(r) => &r.request_header,
            Self::ActivateSessionRequest(r) => &r.request_header,
            Self::CloseSessionRequest(r) => &r.request_header,
            Self::GetEndpointsRequest(r) => &r.request_header,
            Self::FindServersRequest(r) => &r.request_header,
            Self::RegisterServerRequest(r) => &r.request_header,
            Self::ReadRequest(r) => &r.request_header,
            Self::WriteRequest(r) => &r.request_header,
            Self::BrowseRequest(r) => &r.request_header,
            Self::AddNodesRequest(r) => &r.request_header,
            Self::UnregisterNodesRequest(r) => &r.request_header,
            _ => return None,
        })
    }

    /// Mutable request header, `None` for responses.
    #[must_use]
    pub fn request_header_mut(&mut self) -> Option<&mut ua::RequestHeader> {
        Some(match self {
            Self::OpenSecureChannelRequest(r) => r.request_header_mut(),
            Self::CloseSecureChannelRequest(r) => r.request_header_mut(),
            Self::CreateSessionRequest(r) => r.request_header_mut(),
            Self::ActivateSessionRequest(r) => r.request_header_mut(),
            Self::CloseSessionRequest(r) => r.request_header_mut(),
            Self::GetEndpointsRequest(r) => r.request_header_mut(),
            Self::FindServersRequest(r) => r.request_header_mut(),
            Self::RegisterServerRequest(r) => r.request_header_mut(),
            Self::ReadRequest(r) => r.request_header_mut(),
            Self::WriteRequest(r) => r.request_header_mut(),
            Self::BrowseRequest(r) => r.request_header_mut(),
            Self::AddNodesRequest(r) => r.request_header_mut(),
            Self::UnregisterNodesRequest(r) => r.request_header_mut(),
            _ => return None,
        })
    }

    /// Whether this is the response of a discovery service, handled outside
    /// any session.
    #[must_use]
    pub const fn is_discovery_response(&self) -> bool {
        matches!(
            self,
            Self::GetEndpointsResponse(_)
                | Self::FindServersResponse(_)
                | Self::RegisterServerResponse(_)
        )
    }

    /// Service result of a response message, `None` for requests.
    #[must_use]
    pub fn service_result(&self) -> Option<ua::StatusCode> {
        macro_rules! result_arms {
            ($($arm:ident => $type:ty,)+) => {
                match self {
                    $(Self::$arm(message) => response_service_result(message),)+
                    Self::ServiceFault(message) => {
                        Some(message.response_header.service_result)
                    }
                }
            };
        }
        for_each_message!(result_arms)
    }
}

fn response_service_result<T: AnyMessage>(message: &T) -> Option<ua::StatusCode> {
    message.service_result_impl()
}

/// Internal dispatch distinguishing requests from responses.
trait AnyMessage {
    fn service_result_impl(&self) -> Option<ua::StatusCode>;
}

macro_rules! impl_any_request {
    ($($type:ty),+ $(,)?) => {
        $(impl AnyMessage for $type {
            fn service_result_impl(&self) -> Option<ua::StatusCode> {
                None
            }
        })+
    };
}

macro_rules! impl_any_response {
    ($($type:ty),+ $(,)?) => {
        $(impl AnyMessage for $type {
            fn service_result_impl(&self) -> Option<ua::StatusCode> {
                Some(self.response_header.service_result)
            }
        })+
    };
}

impl_any_request!(
    ua::OpenSecureChannelRequest,
    ua::CloseSecureChannelRequest,
    ua::CreateSessionRequest,
    ua::ActivateSessionRequest,
    ua::CloseSessionRequest,
    ua::GetEndpointsRequest,
    ua::FindServersRequest,
    ua::RegisterServerRequest,
    ua::ReadRequest,
    ua::WriteRequest,
    ua::BrowseRequest,
    ua::AddNodesRequest,
    ua::UnregisterNodesRequest,
);

impl_any_response!(
    ua::OpenSecureChannelResponse,
    ua::CloseSecureChannelResponse,
    ua::CreateSessionResponse,
    ua::ActivateSessionResponse,
    ua::CloseSessionResponse,
    ua::GetEndpointsResponse,
    ua::FindServersResponse,
    ua::RegisterServerResponse,
    ua::ReadResponse,
    ua::WriteResponse,
    ua::BrowseResponse,
    ua::AddNodesResponse,
    ua::UnregisterNodesResponse,
);

/// Type id of a message type, request or response.
fn message_type_id<T: MessageTypeId>() -> u32 {
    T::MESSAGE_TYPE_ID
}

trait MessageTypeId {
    const MESSAGE_TYPE_ID: u32;
}

macro_rules! impl_message_type_id_request {
    ($($type:ty),+ $(,)?) => {
        $(impl MessageTypeId for $type {
            const MESSAGE_TYPE_ID: u32 = <$type as ServiceRequest>::TYPE_ID;
        })+
    };
}

macro_rules! impl_message_type_id_response {
    ($($type:ty),+ $(,)?) => {
        $(impl MessageTypeId for $type {
            const MESSAGE_TYPE_ID: u32 = <$type as ServiceResponse>::TYPE_ID;
        })+
    };
}

impl_message_type_id_request!(
    ua::OpenSecureChannelRequest,
    ua::CloseSecureChannelRequest,
    ua::CreateSessionRequest,
    ua::ActivateSessionRequest,
    ua::CloseSessionRequest,
    ua::GetEndpointsRequest,
    ua::FindServersRequest,
    ua::RegisterServerRequest,
    ua::ReadRequest,
    ua::WriteRequest,
    ua::BrowseRequest,
    ua::AddNodesRequest,
    ua::UnregisterNodesRequest,
);

impl_message_type_id_response!(
    ua::OpenSecureChannelResponse,
    ua::CloseSecureChannelResponse,
    ua::CreateSessionResponse,
    ua::ActivateSessionResponse,
    ua::CloseSessionResponse,
    ua::GetEndpointsResponse,
    ua::FindServersResponse,
    ua::RegisterServerResponse,
    ua::ReadResponse,
    ua::WriteResponse,
    ua::BrowseResponse,
    ua::AddNodesResponse,
    ua::UnregisterNodesResponse,
);

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn request_round_trip() {
        let request = ua::ReadRequest {
            request_header: ua::RequestHeader::default(),
            max_age: 0.0,
            timestamps_to_return: ua::TimestampsToReturn::Both,
            nodes_to_read: vec![ua::ReadValueId::new(
                ua::NodeId::numeric(0, 2258),
                ua::AttributeId::Value,
            )],
        };
        let message = Message::ReadRequest(request);

        let mut buffer = Vec::new();
        message.encode(&mut buffer).unwrap();
        let decoded = Message::decode(&mut Cursor::new(&buffer)).unwrap();
        assert_eq!(decoded, message);
        assert_eq!(decoded.service_result(), None);
    }

    #[test]
    fn fault_carries_service_result() {
        let fault = ua::ServiceFault::new(
            &ua::RequestHeader::default(),
            ua::StatusCode::BAD_SERVICE_UNSUPPORTED,
        );
        let message = Message::ServiceFault(fault);
        assert_eq!(
            message.service_result(),
            Some(ua::StatusCode::BAD_SERVICE_UNSUPPORTED)
        );
    }

    #[test]
    fn unknown_type_id_is_rejected() {
        let mut buffer = Vec::new();
        ua::NodeId::numeric(0, 999_999).encode(&mut buffer).unwrap();
        assert!(Message::decode(&mut Cursor::new(&buffer)).is_err());
    }
}
