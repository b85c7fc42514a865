//! Service message types and their binary codecs.

mod attribute;
mod discovery;
mod headers;
mod message;
mod node_management;
mod secure_channel;
mod session;
mod view;

use std::io;

use crate::binary::BinaryDecodable;
use crate::Result;
use crate::ua::extension_object::{Encodeable, EncodeableType};

pub use self::{
    attribute::{
        ReadRequest, ReadResponse, ReadValueId, TimestampsToReturn, WriteRequest, WriteResponse,
        WriteValue,
    },
    discovery::{
        ApplicationDescription, ApplicationType, EndpointDescription, FindServersRequest,
        FindServersResponse, GetEndpointsRequest, GetEndpointsResponse, RegisterServerRequest,
        RegisterServerResponse, RegisteredServer, UserTokenPolicy, UserTokenType,
    },
    headers::{RequestHeader, ResponseHeader, ServiceFault},
    message::Message,
    node_management::{
        specified_attributes, AddNodesItem, AddNodesRequest, AddNodesResponse, AddNodesResult,
        ObjectAttributes, UnregisterNodesRequest, UnregisterNodesResponse, VariableAttributes,
    },
    secure_channel::{
        ChannelSecurityToken, CloseSecureChannelRequest, CloseSecureChannelResponse,
        OpenSecureChannelRequest, OpenSecureChannelResponse, SecurityTokenRequestType,
    },
    session::{
        ActivateSessionRequest, ActivateSessionResponse, AnonymousIdentityToken,
        CloseSessionRequest, CloseSessionResponse, CreateSessionRequest, CreateSessionResponse,
        SignatureData, SignedSoftwareCertificate, UserNameIdentityToken,
    },
    view::{
        BrowseDescription, BrowseDirection, BrowseRequest, BrowseResponse, BrowseResult,
        ReferenceDescription, ViewDescription,
    },
};

fn decode_boxed<T>(stream: &mut dyn io::Read) -> Result<Box<dyn Encodeable>>
where
    T: BinaryDecodable + Encodeable + 'static,
{
    Ok(Box::new(T::decode(stream)?))
}

/// Encodeable types the extension-object decoder knows about.
pub(crate) static KNOWN_ENCODEABLE_TYPES: &[EncodeableType] = &[
    EncodeableType {
        id: 321,
        name: "AnonymousIdentityToken",
        decode: decode_boxed::<AnonymousIdentityToken>,
    },
    EncodeableType {
        id: 324,
        name: "UserNameIdentityToken",
        decode: decode_boxed::<UserNameIdentityToken>,
    },
    EncodeableType {
        id: 354,
        name: "ObjectAttributes",
        decode: decode_boxed::<ObjectAttributes>,
    },
    EncodeableType {
        id: 357,
        name: "VariableAttributes",
        decode: decode_boxed::<VariableAttributes>,
    },
];
