//! Request/response headers (§4.8) every service message carries, and the
//! `ServiceFault` response used for unknown or failed requests.

use std::time::Duration;

use crate::core::StatusCode;
use crate::types::{DiagnosticInfo, ExtensionObject, UtcTime};

/// The header every service request carries.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestHeader {
    /// The session's authentication token (empty for requests that precede
    /// session creation, e.g. `GetEndpoints`).
    pub authentication_token: Vec<u8>,
    /// Client-side timestamp when the request was sent.
    pub timestamp: UtcTime,
    /// Client-assigned handle, echoed back in the response header.
    pub request_handle: u32,
    /// Bitmask requesting diagnostic detail in the response.
    pub return_diagnostics: u32,
    /// Optional client-supplied audit correlation id.
    pub audit_entry_id: Option<String>,
    /// How long the client will wait before giving up on this request.
    pub timeout_hint: Duration,
    /// Vendor/profile-specific extension, opaque to the dispatcher.
    pub additional_header: ExtensionObject,
}

/// The header every service response carries.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseHeader {
    /// Server-side timestamp when the response was produced.
    pub timestamp: UtcTime,
    /// Echoes the request's `request_handle`.
    pub request_handle: u32,
    /// Overall result of the service call.
    pub service_result: StatusCode,
    /// Detailed diagnostics, present only if requested and available.
    pub service_diagnostics: DiagnosticInfo,
    /// String table referenced by symbolic/namespace ids in diagnostics.
    pub string_table: Vec<String>,
    /// Vendor/profile-specific extension, opaque to the dispatcher.
    pub additional_header: ExtensionObject,
}

impl ResponseHeader {
    /// Stamp a response header for `request_header`, at `now`, with the
    /// given overall result (§4.8: "stamps the response header (timestamp,
    /// requestHandle echoed, serviceResult)").
    pub fn stamp(request_header: &RequestHeader, now: UtcTime, service_result: StatusCode) -> Self {
        Self {
            timestamp: now,
            request_handle: request_header.request_handle,
            service_result,
            service_diagnostics: DiagnosticInfo::default(),
            string_table: Vec::new(),
            additional_header: ExtensionObject::null(),
        }
    }
}

/// The fixed response shape for a request the dispatcher could not route or
/// execute: just a response header carrying the offending status code
/// (§4.8: "Unknown type-ids map to a ServiceFault carrying the offending
/// status code").
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceFault {
    /// The response header, with `service_result` set to the failure.
    pub response_header: ResponseHeader,
}

impl ServiceFault {
    /// Build a fault response for `request_header` at `now`.
    pub fn new(request_header: &RequestHeader, now: UtcTime, status: StatusCode) -> Self {
        Self { response_header: ResponseHeader::stamp(request_header, now, status) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request_header() -> RequestHeader {
        RequestHeader {
            authentication_token: vec![1, 2, 3],
            timestamp: UtcTime(0),
            request_handle: 42,
            return_diagnostics: 0,
            audit_entry_id: None,
            timeout_hint: Duration::from_secs(10),
            additional_header: ExtensionObject::null(),
        }
    }

    #[test]
    fn stamped_header_echoes_request_handle() {
        let header = ResponseHeader::stamp(&sample_request_header(), UtcTime(123), StatusCode::Good);
        assert_eq!(header.request_handle, 42);
        assert_eq!(header.service_result, StatusCode::Good);
    }

    #[test]
    fn service_fault_carries_the_offending_status() {
        let fault = ServiceFault::new(&sample_request_header(), UtcTime(0), StatusCode::BadRequestTypeInvalid);
        assert_eq!(fault.response_header.service_result, StatusCode::BadRequestTypeInvalid);
    }
}
