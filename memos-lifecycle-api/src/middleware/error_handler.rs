use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

use super::request_id::X_REQUEST_ID;

/// Hooks run inside the host's lifecycle; anything slower than this is
/// visible to the user.
const SLOW_HOOK: Duration = Duration::from_secs(10);

/// Name of the hook a path targets, e.g. `session-start`.
pub fn hook_name(path: &str) -> Option<&str> {
    path.strip_prefix("/hooks/").filter(|name| !name.is_empty())
}

/// Logs every hook call with its latency, and error responses on any route.
pub async fn handle_errors(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let path = req.uri().path().to_string();
    let method = req.method().to_string();

    let response = next.run(req).await;

    let elapsed = start.elapsed();
    let status = response.status();
    let request_id = response
        .headers()
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");

    if status.is_server_error() {
        error!(
            "Server error: {} {} [{}] - Status: {} - Duration: {:?}",
            method, path, request_id, status, elapsed
        );
        return response;
    }
    if status.is_client_error() && status != StatusCode::NOT_FOUND {
        warn!(
            "Client error: {} {} [{}] - Status: {} - Duration: {:?}",
            method, path, request_id, status, elapsed
        );
        return response;
    }

    if let Some(hook) = hook_name(&path) {
        if elapsed > SLOW_HOOK {
            warn!(
                "Hook {} [{}] took {:?}, memory service may be degraded",
                hook, request_id, elapsed
            );
        } else {
            debug!("Hook {} [{}] answered {} in {:?}", hook, request_id, status, elapsed);
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, middleware, routing::post};
    use axum_test::TestServer;

    #[test]
    fn test_hook_name() {
        assert_eq!(hook_name("/hooks/session-start"), Some("session-start"));
        assert_eq!(hook_name("/hooks/tool-result"), Some("tool-result"));
        assert_eq!(hook_name("/hooks/"), None);
        assert_eq!(hook_name("/stats"), None);
    }

    #[tokio::test]
    async fn test_response_passes_through() {
        let app = Router::new()
            .route("/hooks/tool-result", post(|| async { StatusCode::ACCEPTED }))
            .layer(middleware::from_fn(handle_errors));
        let server = TestServer::new(app).unwrap();

        server
            .post("/hooks/tool-result")
            .await
            .assert_status(StatusCode::ACCEPTED);
    }
}
