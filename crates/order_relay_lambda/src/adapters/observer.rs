use order_relay_core::RelayError;
use tracing::{debug, warn};

/// Cross-cutting hooks called by every handler at fixed points of an
/// invocation. Implementations attach annotations to whatever tracing
/// backend is in use.
pub trait InvocationObserver {
    fn started(&self, operation: &str);

    fn annotate(&self, operation: &str, key: &str, value: &str);

    fn succeeded(&self, operation: &str);

    fn failed(&self, operation: &str, error: &RelayError);
}

pub struct NoopObserver;

impl InvocationObserver for NoopObserver {
    fn started(&self, _operation: &str) {}

    fn annotate(&self, _operation: &str, _key: &str, _value: &str) {}

    fn succeeded(&self, _operation: &str) {}

    fn failed(&self, _operation: &str, _error: &RelayError) {}
}

/// Emits observer hooks as `tracing` events tagged with the request id.
#[derive(Debug, Clone, Default)]
pub struct TracingObserver {
    request_id: Option<String>,
}

impl TracingObserver {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: Some(request_id.into()),
        }
    }

    fn request_id(&self) -> &str {
        self.request_id.as_deref().unwrap_or("-")
    }
}

impl InvocationObserver for TracingObserver {
    fn started(&self, operation: &str) {
        debug!(
            component = "observer",
            event = "invocation_started",
            operation,
            request_id = self.request_id(),
        );
    }

    fn annotate(&self, operation: &str, key: &str, value: &str) {
        debug!(
            component = "observer",
            event = "annotation",
            operation,
            request_id = self.request_id(),
            key,
            value,
        );
    }

    fn succeeded(&self, operation: &str) {
        debug!(
            component = "observer",
            event = "invocation_succeeded",
            operation,
            request_id = self.request_id(),
        );
    }

    fn failed(&self, operation: &str, error: &RelayError) {
        warn!(
            component = "observer",
            event = "invocation_failed",
            operation,
            request_id = self.request_id(),
            error_code = error.code(),
            error = %error,
        );
    }
}

/// Runs one handler step between `started` and `succeeded`/`failed`.
pub fn observe<T>(
    observer: &dyn InvocationObserver,
    operation: &str,
    run: impl FnOnce() -> Result<T, RelayError>,
) -> Result<T, RelayError> {
    observer.started(operation);
    match run() {
        Ok(value) => {
            observer.succeeded(operation);
            Ok(value)
        }
        Err(error) => {
            observer.failed(operation, &error);
            Err(error)
        }
    }
}
