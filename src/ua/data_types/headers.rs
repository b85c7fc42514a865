use crate::binary::impl_binary_struct;
use crate::ua;

/// Common header carried by every service request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestHeader {
    pub authentication_token: ua::NodeId,
    pub timestamp: ua::DateTime,
    pub request_handle: u32,
    pub return_diagnostics: u32,
    pub audit_entry_id: ua::String,
    pub timeout_hint: u32,
    pub additional_header: ua::ExtensionObject,
}

impl RequestHeader {
    /// Creates a header stamped with the current time.
    #[must_use]
    pub fn new(authentication_token: ua::NodeId, request_handle: u32, timeout_hint: u32) -> Self {
        Self {
            authentication_token,
            timestamp: ua::DateTime::now(),
            request_handle,
            return_diagnostics: 0,
            audit_entry_id: ua::String::null(),
            timeout_hint,
            additional_header: ua::ExtensionObject::null(),
        }
    }
}

impl Default for RequestHeader {
    fn default() -> Self {
        Self::new(ua::NodeId::null(), 0, 0)
    }
}

impl_binary_struct!(RequestHeader {
    authentication_token,
    timestamp,
    request_handle,
    return_diagnostics,
    audit_entry_id,
    timeout_hint,
    additional_header,
});

/// Common header carried by every service response.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseHeader {
    pub timestamp: ua::DateTime,
    pub request_handle: u32,
    pub service_result: ua::StatusCode,
    pub service_diagnostics: ua::DiagnosticInfo,
    pub string_table: Vec<ua::String>,
    pub additional_header: ua::ExtensionObject,
}

impl ResponseHeader {
    /// Creates a header answering the given request.
    #[must_use]
    pub fn new(request_header: &RequestHeader, service_result: ua::StatusCode) -> Self {
        Self {
            timestamp: ua::DateTime::now(),
            request_handle: request_header.request_handle,
            service_result,
            service_diagnostics: ua::DiagnosticInfo::null(),
            string_table: Vec::new(),
            additional_header: ua::ExtensionObject::null(),
        }
    }
}

impl Default for ResponseHeader {
    fn default() -> Self {
        Self {
            timestamp: ua::DateTime::null(),
            request_handle: 0,
            service_result: ua::StatusCode::GOOD,
            service_diagnostics: ua::DiagnosticInfo::null(),
            string_table: Vec::new(),
            additional_header: ua::ExtensionObject::null(),
        }
    }
}

impl_binary_struct!(ResponseHeader {
    timestamp,
    request_handle,
    service_result,
    service_diagnostics,
    string_table,
    additional_header,
});

/// Response sent when a service fails as a whole.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ServiceFault {
    pub response_header: ResponseHeader,
}

impl ServiceFault {
    pub(crate) const TYPE_ID: u32 = 397;

    #[must_use]
    pub fn new(request_header: &RequestHeader, service_result: ua::StatusCode) -> Self {
        Self {
            response_header: ResponseHeader::new(request_header, service_result),
        }
    }
}

impl_binary_struct!(ServiceFault { response_header });
