use std::panic::{catch_unwind, AssertUnwindSafe};

use stoker_http::{Output, Request};
use tracing::error;

use crate::registry::Registry;

/// Run the request through the registered handlers in priority order until
/// one dirties the response. A panicking handler yields a 500 with the body
/// suppressed; the keep-alive decision survives the reset.
pub fn dispatch(registry: &Registry, request: &mut Request, output: &mut Output) {
    let keep_alive = output.keep_alive;
    let version = output.version;

    let candidates: Vec<_> = if registry.has_tagged() {
        registry.tagged().collect()
    } else {
        registry.fallback().into_iter().collect()
    };

    for endpoint in candidates {
        if !endpoint.accepts(request) {
            continue;
        }
        request.route.push(endpoint.id.clone());

        let outcome = catch_unwind(AssertUnwindSafe(|| endpoint.invoke(request, output)));
        if let Err(panic) = outcome {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|text| text.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "opaque panic payload".to_string());
            error!(handler = %endpoint.id, %reason, "handler panicked");

            output.clear();
            output.version = version;
            output.keep_alive = keep_alive;
            output.set_status(500);
            output.send_body = false;
            return;
        }

        if output.is_dirty() {
            break;
        }
    }
}
