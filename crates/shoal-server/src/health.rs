use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

/// Structured health check response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub connected_players: usize,
    pub food: usize,
    /// `null` while spawning is paused.
    pub spawn_period_ms: Option<u64>,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.hub.read().await.stats();
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        connected_players: stats.connected_players,
        food: stats.food,
        spawn_period_ms: stats.spawn_period.map(|p| p.as_millis() as u64),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_response_serializes() {
        let resp = HealthResponse {
            status: "healthy",
            version: "0.1.0",
            connected_players: 2,
            food: 40,
            spawn_period_ms: Some(500),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"healthy\""));
        assert!(json.contains("\"connectedPlayers\":2"));
        assert!(json.contains("\"spawnPeriodMs\":500"));
    }

    #[test]
    fn paused_spawn_serializes_as_null() {
        let resp = HealthResponse {
            status: "healthy",
            version: "0.1.0",
            connected_players: 0,
            food: 0,
            spawn_period_ms: None,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"spawnPeriodMs\":null"));
    }
}
