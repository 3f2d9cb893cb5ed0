//! Local stand-in for the osu! API used by the integration tests

#![allow(dead_code)]

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::get,
};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// How long the `slow` endpoint takes to answer
pub const SLOW_RESPONSE: Duration = Duration::from_millis(300);

/// A request as the mock server saw it
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub endpoint: String,
    pub params: HashMap<String, String>,
}

#[derive(Clone, Default)]
pub struct MockApi {
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl MockApi {
    /// Start the server on an ephemeral port; returns the API base URL
    pub async fn start() -> (Self, String) {
        let mock = MockApi::default();

        let app = Router::new()
            .route("/api/{endpoint}", get(handle))
            .with_state(mock.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (mock, format!("http://{addr}/api/"))
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.seen.lock().clone()
    }
}

/// Base URL of a port nothing listens on
pub async fn refused_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/api/")
}

async fn handle(
    State(mock): State<MockApi>,
    Path(endpoint): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    mock.seen.lock().push(SeenRequest {
        endpoint: endpoint.clone(),
        params: params.clone(),
    });

    let user = params.get("u").map(String::as_str).unwrap_or_default();
    match endpoint.as_str() {
        "get_user" => match user {
            "nobody" => Json(json!({"error": "not found"})).into_response(),
            "ghost" => Json(json!([])).into_response(),
            _ => Json(json!([user_json()])).into_response(),
        },
        "get_beatmaps" => Json(json!([beatmap_json()])).into_response(),
        "get_scores" | "get_user_best" | "get_user_recent" => {
            Json(json!([score_json(), score_json()])).into_response()
        }
        "get_replay" => Json(json!({"content": "XQAAIAA=", "encoding": "base64"})).into_response(),
        "slow" => {
            tokio::time::sleep(SLOW_RESPONSE).await;
            Json(json!([])).into_response()
        }
        "garbage" => "<html>maintenance</html>".into_response(),
        _ => Json(json!({"error": "Please provide a valid API key."})).into_response(),
    }
}

pub fn user_json() -> Value {
    json!({
        "user_id": "2",
        "username": "peppy",
        "count300": "567860",
        "count100": "97193",
        "count50": "17940",
        "playcount": "6847",
        "ranked_score": "693054237",
        "total_score": "3152434395",
        "pp_rank": "171209",
        "level": "81.4728",
        "pp_raw": "1105.31",
        "accuracy": "96.85",
        "count_rank_ss": "12",
        "count_rank_ssh": "0",
        "count_rank_s": "190",
        "count_rank_sh": "3",
        "count_rank_a": "442",
        "country": "AU",
        "pp_country_rank": "4012",
        "events": []
    })
}

pub fn beatmap_json() -> Value {
    json!({
        "approved": "4",
        "approved_date": null,
        "last_update": "2018-01-01 00:00:00",
        "artist": "xi",
        "beatmap_id": "1",
        "beatmapset_id": "2",
        "bpm": "200",
        "creator": "someone",
        "creator_id": "3",
        "difficultyrating": "6.1",
        "diff_size": "4",
        "diff_overall": "9",
        "diff_approach": "9.3",
        "diff_drain": "6",
        "hit_length": "200",
        "source": "",
        "genre_id": "10",
        "language_id": "5",
        "title": "FREEDOM DiVE",
        "total_length": "257",
        "version": "FOUR DIMENSIONS",
        "file_md5": "da8aae79c8f3306b5d65ec951874a7fb",
        "mode": "0",
        "tags": "",
        "favourite_count": "10000",
        "playcount": "1000000",
        "passcount": "50000",
        "max_combo": "2385"
    })
}

pub fn score_json() -> Value {
    json!({
        "beatmap_id": "1",
        "score": "1000",
        "maxcombo": "12",
        "count50": "1",
        "count100": "2",
        "count300": "3",
        "countmiss": "0",
        "countkatu": "0",
        "countgeki": "0",
        "perfect": "0",
        "enabled_mods": "0",
        "user_id": "2",
        "date": "2018-09-01 08:00:00",
        "rank": "A",
        "pp": "12.5"
    })
}
