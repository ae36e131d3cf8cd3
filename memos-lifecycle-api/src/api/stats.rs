use axum::{Json, extract::State};
use memos_lifecycle::{CaptureThrottle, MemosClient, WriterStats};
use serde::Serialize;
use std::sync::Arc;

#[derive(Clone)]
pub struct StatsState {
    pub client: Arc<MemosClient>,
    pub throttle: Arc<CaptureThrottle>,
}

#[derive(Debug, Serialize)]
pub struct CaptureStats {
    pub throttle_secs: u64,
    /// Seconds since the last fact extraction, `None` if none ran yet
    pub last_capture_secs_ago: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct SystemStats {
    pub user_id: String,
    pub writer: WriterStats,
    pub capture: CaptureStats,
    pub version: &'static str,
}

pub async fn get_stats(State(state): State<StatsState>) -> Json<SystemStats> {
    let stats = SystemStats {
        user_id: state.client.user_id().to_string(),
        writer: state.client.writer_stats(),
        capture: CaptureStats {
            throttle_secs: state.throttle.window().as_secs(),
            last_capture_secs_ago: state.throttle.since_last().map(|d| d.as_secs()),
        },
        version: env!("CARGO_PKG_VERSION"),
    };

    Json(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, routing::get};
    use axum_test::TestServer;
    use memos_lifecycle::MemosConfig;
    use serde_json::Value;
    use std::time::Duration;

    #[tokio::test]
    async fn test_stats_report_writer_and_throttle() {
        let client = Arc::new(
            MemosClient::new(MemosConfig::default().with_user_id("bob")).unwrap(),
        );
        let throttle = Arc::new(CaptureThrottle::new(Duration::from_secs(600)));
        let app = Router::new()
            .route("/stats", get(get_stats))
            .with_state(StatsState {
                client,
                throttle: throttle.clone(),
            });
        let server = TestServer::new(app).unwrap();

        let body: Value = server.get("/stats").await.json();
        assert_eq!(body["user_id"], "bob");
        assert_eq!(body["writer"]["submitted"], 0);
        assert_eq!(body["capture"]["throttle_secs"], 600);
        assert!(body["capture"]["last_capture_secs_ago"].is_null());

        assert!(throttle.try_acquire());
        let body: Value = server.get("/stats").await.json();
        assert_eq!(body["capture"]["last_capture_secs_ago"], 0);
    }
}
