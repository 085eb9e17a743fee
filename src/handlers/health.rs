use axum::Json;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Local::now().naive_local().format("%Y-%m-%d %H:%M:%S").to_string(),
    }))
}
