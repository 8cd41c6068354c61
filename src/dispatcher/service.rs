//! The service dispatcher (§4.8): routes a decoded request to its
//! registered handler by type-id, and stamps/encodes the response.

use std::collections::HashMap;

use crate::core::{Context, DispatchError, StatusCode};
use crate::types::UtcTime;

use super::header::{RequestHeader, ResponseHeader, ServiceFault};

/// A registered service's handler: given the request body (everything past
/// the request header) and the active context, produce the response body
/// (everything that will follow the stamped response header) or a status
/// code to fault with.
///
/// Operating on pre-encoded bytes rather than a concrete request/response
/// type keeps the dispatcher itself generic over however many service
/// types get registered, while each handler still does ordinary
/// `BinaryDecodable`/`BinaryEncodable` work internally.
pub trait ServiceHandler: Send + Sync {
    /// Execute the service call.
    fn handle(&self, request_body: &[u8], ctx: &Context<'_>) -> Result<Vec<u8>, StatusCode>;
}

impl<F> ServiceHandler for F
where
    F: Fn(&[u8], &Context<'_>) -> Result<Vec<u8>, StatusCode> + Send + Sync,
{
    fn handle(&self, request_body: &[u8], ctx: &Context<'_>) -> Result<Vec<u8>, StatusCode> {
        self(request_body, ctx)
    }
}

/// The outcome of dispatching one request: a stamped response header plus
/// either the handler's encoded response body or a `ServiceFault`.
pub enum DispatchOutcome {
    /// The handler ran successfully; the body is its encoded response.
    Success { response_header: ResponseHeader, body: Vec<u8> },
    /// No handler was registered, or the handler reported a status failure.
    Fault(ServiceFault),
}

/// Maps request type-ids to their registered handlers.
#[derive(Default)]
pub struct Dispatcher {
    handlers: HashMap<u32, Box<dyn ServiceHandler>>,
}

impl Dispatcher {
    /// A dispatcher with no services registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for requests carrying `request_type_id` as their
    /// `ExtensionObject` encoding id.
    pub fn register(&mut self, request_type_id: u32, handler: impl ServiceHandler + 'static) {
        self.handlers.insert(request_type_id, Box::new(handler));
    }

    /// Dispatch one request: locate the handler by `request_type_id`,
    /// invoke it, and stamp the response header either way (§4.8).
    pub fn dispatch(
        &self,
        request_type_id: u32,
        request_header: &RequestHeader,
        request_body: &[u8],
        ctx: &Context<'_>,
        now: UtcTime,
    ) -> DispatchOutcome {
        let Some(handler) = self.handlers.get(&request_type_id) else {
            return DispatchOutcome::Fault(ServiceFault::new(
                request_header,
                now,
                StatusCode::BadRequestTypeInvalid,
            ));
        };

        match handler.handle(request_body, ctx) {
            Ok(body) => DispatchOutcome::Success {
                response_header: ResponseHeader::stamp(request_header, now, StatusCode::Good),
                body,
            },
            Err(status) => DispatchOutcome::Fault(ServiceFault::new(request_header, now, status)),
        }
    }

    /// Asynchronous twin of [`Self::dispatch`]: runs the same handler and
    /// encode/decode path, delivering the outcome to `on_complete` instead
    /// of returning it directly (§4.8: "the async form takes a completion
    /// callback; both share the same encode/decode path").
    pub fn dispatch_async(
        &self,
        request_type_id: u32,
        request_header: &RequestHeader,
        request_body: &[u8],
        ctx: &Context<'_>,
        now: UtcTime,
        on_complete: impl FnOnce(DispatchOutcome),
    ) {
        on_complete(self.dispatch(request_type_id, request_header, request_body, ctx, now));
    }
}

impl From<DispatchError> for StatusCode {
    fn from(err: DispatchError) -> Self {
        err.status_code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sample_request_header() -> RequestHeader {
        RequestHeader {
            authentication_token: vec![],
            timestamp: UtcTime(0),
            request_handle: 1,
            return_diagnostics: 0,
            audit_entry_id: None,
            timeout_hint: Duration::from_secs(1),
            additional_header: crate::types::ExtensionObject::null(),
        }
    }

    #[test]
    fn dispatch_routes_to_the_registered_handler() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(631, |body: &[u8], _ctx: &Context<'_>| Ok(body.to_vec()));

        let ctx = Context::opaque();
        let outcome = dispatcher.dispatch(631, &sample_request_header(), b"payload", &ctx, UtcTime(5));
        match outcome {
            DispatchOutcome::Success { body, response_header } => {
                assert_eq!(body, b"payload");
                assert_eq!(response_header.service_result, StatusCode::Good);
            }
            DispatchOutcome::Fault(_) => panic!("expected success"),
        }
    }

    #[test]
    fn dispatch_faults_on_unknown_type_id() {
        let dispatcher = Dispatcher::new();
        let ctx = Context::opaque();
        let outcome = dispatcher.dispatch(9999, &sample_request_header(), b"", &ctx, UtcTime(0));
        match outcome {
            DispatchOutcome::Fault(fault) => {
                assert_eq!(fault.response_header.service_result, StatusCode::BadRequestTypeInvalid);
            }
            DispatchOutcome::Success { .. } => panic!("expected fault"),
        }
    }

    #[test]
    fn dispatch_faults_when_handler_reports_failure() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(1, |_: &[u8], _ctx: &Context<'_>| Err(StatusCode::BadUserAccessDenied));
        let ctx = Context::opaque();
        let outcome = dispatcher.dispatch(1, &sample_request_header(), b"", &ctx, UtcTime(0));
        match outcome {
            DispatchOutcome::Fault(fault) => {
                assert_eq!(fault.response_header.service_result, StatusCode::BadUserAccessDenied);
            }
            DispatchOutcome::Success { .. } => panic!("expected fault"),
        }
    }
}
