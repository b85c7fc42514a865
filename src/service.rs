use std::fmt;

use crate::binary::{BinaryDecodable, BinaryEncodable};
use crate::ua;

/// A generic service request.
///
/// Defines methods supported by all service request types.
pub trait ServiceRequest: BinaryEncodable + BinaryDecodable + fmt::Debug + Send + 'static {
    /// Binary encoding id of the request type.
    const TYPE_ID: u32;

    type Response: ServiceResponse;

    /// Returns the request header.
    #[must_use]
    fn request_header(&self) -> &ua::RequestHeader;

    /// Returns the mutable request header.
    #[must_use]
    fn request_header_mut(&mut self) -> &mut ua::RequestHeader;
}

/// A generic service response.
///
/// Defines methods supported by all service response types.
pub trait ServiceResponse: BinaryEncodable + BinaryDecodable + fmt::Debug + Send + 'static {
    /// Binary encoding id of the response type.
    const TYPE_ID: u32;

    type Request: ServiceRequest;

    /// Returns the response header.
    #[must_use]
    fn response_header(&self) -> &ua::ResponseHeader;
}

/// Implements the service traits for a request/response pair.
macro_rules! impl_service_pair {
    ($request:ty => $request_id:expr, $response:ty => $response_id:expr) => {
        impl $crate::ServiceRequest for $request {
            const TYPE_ID: u32 = $request_id;

            type Response = $response;

            fn request_header(&self) -> &$crate::ua::RequestHeader {
                &self.request_header
            }

            fn request_header_mut(&mut self) -> &mut $crate::ua::RequestHeader {
                &mut self.request_header
            }
        }

        impl $crate::ServiceResponse for $response {
            const TYPE_ID: u32 = $response_id;

            type Request = $request;

            fn response_header(&self) -> &$crate::ua::ResponseHeader {
                &self.response_header
            }
        }
    };
}

pub(crate) use impl_service_pair;
