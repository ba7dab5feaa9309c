//! REST API endpoints for the EventGateway
//!
//! Intake (`POST /event`), reporting (`GET /events`, `GET /events/summary`) and
//! operational routes (`GET /stats`, `GET /health`, `GET /dead-letters`).

use crate::config::GatewayConfig;
use crate::error::{codes, ErrorResponse};
use crate::messages::{
    DeadLettersResponse, EventsQuery, HealthResponse, QueuedResponse, StatsResponse,
};
use crate::reporting;
use event_store::EventStore;
use ingestion::{IngestionError, IngestionPipeline};
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct ApiState {
    pub pipeline: Arc<IngestionPipeline>,
    pub store: Arc<dyn EventStore>,
    pub config: Arc<GatewayConfig>,
}

/// Accept one event: validate, enqueue, acknowledge
pub async fn submit_event(body: Bytes, state: ApiState) -> Result<Response, Rejection> {
    let raw: Value = match serde_json::from_slice(&body) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::debug!("Rejected malformed event body: {}", e);
            return Ok(ErrorResponse::new(
                codes::VALIDATION_ERROR,
                format!("malformed JSON body: {e}"),
            )
            .into_reply(StatusCode::BAD_REQUEST));
        }
    };

    match state.pipeline.submit(&raw) {
        Ok(admission) => Ok(warp::reply::json(&QueuedResponse::queued(admission.depth)).into_response()),
        Err(IngestionError::Validation(e)) => Ok(ErrorResponse::new(
            codes::VALIDATION_ERROR,
            e.to_string(),
        )
        .with_details(json!({
            "missing_fields": e.missing_fields,
            "invalid_fields": e.invalid_fields,
        }))
        .into_reply(StatusCode::BAD_REQUEST)),
        Err(IngestionError::BufferFull(full)) => {
            let reply = ErrorResponse::new(codes::BUFFER_FULL, "service busy, retry")
                .with_details(json!({ "capacity": full.capacity }))
                .into_reply(StatusCode::SERVICE_UNAVAILABLE);
            Ok(warp::reply::with_header(
                reply,
                "retry-after",
                state.config.retry_after_secs.to_string(),
            )
            .into_response())
        }
        Err(e) => {
            tracing::error!("Unexpected intake failure: {}", e);
            Ok(ErrorResponse::new(codes::INTERNAL_ERROR, e.to_string())
                .into_reply(StatusCode::INTERNAL_SERVER_ERROR))
        }
    }
}

/// List stored records; all of them, or one page after `after_id`
pub async fn list_events(query: EventsQuery, state: ApiState) -> Result<Response, Rejection> {
    let result = match (query.after_id, query.limit) {
        (None, None) => state.store.list_all().await,
        (after_id, limit) => {
            let limit = limit
                .unwrap_or(state.config.default_page_size)
                .min(state.config.max_page_size);
            state.store.list_after(after_id.unwrap_or(0), limit).await
        }
    };

    match result {
        Ok(records) => Ok(warp::reply::json(&records).into_response()),
        Err(e) => {
            tracing::error!("Failed to read events: {}", e);
            Ok(ErrorResponse::new(codes::STORE_READ_ERROR, e.to_string())
                .into_reply(StatusCode::INTERNAL_SERVER_ERROR))
        }
    }
}

/// Aggregates for the dashboard
pub async fn events_summary(state: ApiState) -> Result<Response, Rejection> {
    match state.store.list_all().await {
        Ok(records) => Ok(warp::reply::json(&reporting::summarize(&records)).into_response()),
        Err(e) => {
            tracing::error!("Failed to read events for summary: {}", e);
            Ok(ErrorResponse::new(codes::STORE_READ_ERROR, e.to_string())
                .into_reply(StatusCode::INTERNAL_SERVER_ERROR))
        }
    }
}

pub async fn get_stats(state: ApiState) -> Result<Response, Rejection> {
    let stored_events = match state.store.count().await {
        Ok(count) => Some(count),
        Err(e) => {
            tracing::warn!("Failed to count stored events: {}", e);
            None
        }
    };

    let response = StatsResponse { pipeline: state.pipeline.stats(), stored_events };
    Ok(warp::reply::json(&response).into_response())
}

pub async fn get_health(state: ApiState) -> Result<Response, Rejection> {
    let buffer = state.pipeline.buffer();
    let (status, store, code) = match state.store.health_check().await {
        Ok(()) => ("healthy", "ok".to_string(), StatusCode::OK),
        Err(e) => ("degraded", e.to_string(), StatusCode::SERVICE_UNAVAILABLE),
    };

    let response = HealthResponse {
        status: status.to_string(),
        store,
        buffer_depth: buffer.len(),
        buffer_capacity: buffer.capacity(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };
    Ok(warp::reply::with_status(warp::reply::json(&response), code).into_response())
}

pub async fn get_dead_letters(state: ApiState) -> Result<Response, Rejection> {
    let letters = state.pipeline.dead_letters();
    let response = DeadLettersResponse {
        count: letters.len(),
        evicted: state.pipeline.stats().dead_letters_evicted,
        letters,
    };
    Ok(warp::reply::json(&response).into_response())
}

/// Map warp rejections onto the structured error body
pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let (status, code, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, codes::NOT_FOUND, "route not found".to_string())
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, codes::PAYLOAD_TOO_LARGE, "request body too large".to_string())
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        (StatusCode::LENGTH_REQUIRED, codes::BAD_REQUEST, "content-length required".to_string())
    } else if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, codes::BAD_REQUEST, e.to_string())
    } else if let Some(e) = err.find::<warp::cors::CorsForbidden>() {
        (StatusCode::FORBIDDEN, codes::FORBIDDEN, e.to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, codes::METHOD_NOT_ALLOWED, "method not allowed".to_string())
    } else {
        tracing::error!("Unhandled rejection: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, codes::INTERNAL_ERROR, "internal error".to_string())
    };

    Ok(ErrorResponse::new(code, message).into_reply(status))
}

/// Build all routes
pub fn create_routes(
    state: ApiState,
) -> impl Filter<Extract = impl warp::Reply, Error = Infallible> + Clone {
    let max_body_bytes = state.config.max_body_bytes;
    let allow_any_origin = state.config.cors_allow_any_origin;
    let state_filter = warp::any().map(move || state.clone());

    // Intake
    let submit = warp::path("event")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(max_body_bytes))
        .and(warp::body::bytes())
        .and(state_filter.clone())
        .and_then(submit_event);

    // Reporting
    let events = warp::path("events")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<EventsQuery>())
        .and(state_filter.clone())
        .and_then(list_events);

    let summary = warp::path!("events" / "summary")
        .and(warp::get())
        .and(state_filter.clone())
        .and_then(events_summary);

    // Operations
    let stats =
        warp::path!("stats").and(warp::get()).and(state_filter.clone()).and_then(get_stats);

    let health =
        warp::path!("health").and(warp::get()).and(state_filter.clone()).and_then(get_health);

    let dead_letters = warp::path!("dead-letters")
        .and(warp::get())
        .and(state_filter)
        .and_then(get_dead_letters);

    let mut cors = warp::cors()
        .allow_headers(vec!["content-type"])
        .allow_methods(vec!["GET", "POST", "OPTIONS"]);
    if allow_any_origin {
        cors = cors.allow_any_origin();
    }

    submit
        .or(events)
        .or(summary)
        .or(stats)
        .or(health)
        .or(dead_letters)
        .with(cors)
        .recover(handle_rejection)
        .with(warp::trace::request())
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_store::{Event, InMemoryEventStore};
    use ingestion::{BufferConfig, IngestionConfig};

    struct TestApi {
        pipeline: Arc<IngestionPipeline>,
        store: Arc<InMemoryEventStore>,
        state: ApiState,
    }

    fn test_api(capacity: usize) -> TestApi {
        let config = IngestionConfig {
            buffer: BufferConfig { capacity, high_watermark: Some(0) },
            ..IngestionConfig::default()
        };
        let pipeline = Arc::new(IngestionPipeline::new(config).unwrap());
        let store = Arc::new(InMemoryEventStore::initialized());
        let state = ApiState {
            pipeline: pipeline.clone(),
            store: store.clone(),
            config: Arc::new(GatewayConfig::default()),
        };
        TestApi { pipeline, store, state }
    }

    fn body_json(body: &[u8]) -> Value {
        serde_json::from_slice(body).unwrap()
    }

    #[tokio::test]
    async fn test_post_valid_event_is_queued() {
        let api = test_api(10);
        let routes = create_routes(api.state.clone());

        let resp = warp::test::request()
            .method("POST")
            .path("/event")
            .json(&json!({"site_id": "s1", "event_type": "click"}))
            .reply(&routes)
            .await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp.body());
        assert_eq!(body["status"], "queued");
        assert_eq!(body["depth"], 1);
        assert_eq!(api.pipeline.buffer().len(), 1);
    }

    #[tokio::test]
    async fn test_post_missing_field_is_bad_request() {
        let api = test_api(10);
        let routes = create_routes(api.state.clone());

        let resp = warp::test::request()
            .method("POST")
            .path("/event")
            .json(&json!({"site_id": "s1"}))
            .reply(&routes)
            .await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_json(resp.body());
        assert_eq!(body["error"]["code"], codes::VALIDATION_ERROR);
        assert_eq!(body["error"]["details"]["missing_fields"], json!(["event_type"]));
        assert_eq!(api.pipeline.buffer().len(), 0);
    }

    #[tokio::test]
    async fn test_post_malformed_json_is_bad_request() {
        let api = test_api(10);
        let routes = create_routes(api.state.clone());

        let resp = warp::test::request()
            .method("POST")
            .path("/event")
            .header("content-type", "application/json")
            .body("{not json")
            .reply(&routes)
            .await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(api.pipeline.buffer().len(), 0);
    }

    #[tokio::test]
    async fn test_post_when_full_is_busy_with_retry_after() {
        let api = test_api(2);
        let routes = create_routes(api.state.clone());
        let payload = json!({"site_id": "s1", "event_type": "click"});

        for _ in 0..2 {
            let resp = warp::test::request()
                .method("POST")
                .path("/event")
                .json(&payload)
                .reply(&routes)
                .await;
            assert_eq!(resp.status(), StatusCode::OK);
        }

        let resp = warp::test::request()
            .method("POST")
            .path("/event")
            .json(&payload)
            .reply(&routes)
            .await;

        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(resp.headers()["retry-after"], "1");
        assert_eq!(body_json(resp.body())["error"]["code"], codes::BUFFER_FULL);
        assert_eq!(api.pipeline.buffer().len(), 2);
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let api = test_api(10);
        let routes = create_routes(api.state.clone());
        let huge = "x".repeat(GatewayConfig::default().max_body_bytes as usize + 1);

        let resp = warp::test::request()
            .method("POST")
            .path("/event")
            .json(&json!({"site_id": "s1", "event_type": "click", "path": huge}))
            .reply(&routes)
            .await;

        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_get_events_ordered_by_id() {
        let api = test_api(10);
        api.store.append(Event::new("s1", "click")).await.unwrap();
        api.store.append(Event::new("s2", "view").with_path("/x")).await.unwrap();
        let routes = create_routes(api.state.clone());

        let resp = warp::test::request().method("GET").path("/events").reply(&routes).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp.body());
        let records = body.as_array().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["id"], 1);
        assert_eq!(records[1]["id"], 2);
        assert_eq!(records[1]["path"], "/x");
        for field in ["id", "site_id", "event_type", "path", "user_id", "timestamp"] {
            assert!(records[0].get(field).is_some(), "missing {field}");
        }
    }

    #[tokio::test]
    async fn test_get_events_after_id_pages() {
        let api = test_api(10);
        for i in 0..5 {
            api.store.append(Event::new("s1", format!("e{i}"))).await.unwrap();
        }
        let routes = create_routes(api.state.clone());

        let resp = warp::test::request()
            .method("GET")
            .path("/events?after_id=2&limit=2")
            .reply(&routes)
            .await;

        let body = body_json(resp.body());
        let ids: Vec<i64> =
            body.as_array().unwrap().iter().map(|r| r["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![3, 4]);
    }

    #[tokio::test]
    async fn test_store_read_failure_is_server_error() {
        let api = test_api(10);
        api.store.close().await;
        let routes = create_routes(api.state.clone());

        let resp = warp::test::request().method("GET").path("/events").reply(&routes).await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(resp.body())["error"]["code"], codes::STORE_READ_ERROR);
    }

    #[tokio::test]
    async fn test_summary_counts_events() {
        let api = test_api(10);
        api.store
            .append(Event::new("s1", "click").with_timestamp("2026-05-01T10:00:01Z"))
            .await
            .unwrap();
        api.store.append(Event::new("s1", "click").with_timestamp("garbage")).await.unwrap();
        let routes = create_routes(api.state.clone());

        let resp =
            warp::test::request().method("GET").path("/events/summary").reply(&routes).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp.body());
        assert_eq!(body["total"], 2);
        assert_eq!(body["by_event_type"]["click"], 2);
        assert_eq!(body["timeline"][1]["bucket"], reporting::UNKNOWN_BUCKET);
    }

    #[tokio::test]
    async fn test_stats_and_health() {
        let api = test_api(10);
        api.pipeline.submit(&json!({"site_id": "s1", "event_type": "click"})).unwrap();
        let routes = create_routes(api.state.clone());

        let stats = warp::test::request().method("GET").path("/stats").reply(&routes).await;
        let body = body_json(stats.body());
        assert_eq!(body["buffer_depth"], 1);
        assert_eq!(body["buffer_capacity"], 10);
        assert_eq!(body["metrics"]["events_accepted_total"], 1);
        assert_eq!(body["stored_events"], 0);

        let health = warp::test::request().method("GET").path("/health").reply(&routes).await;
        assert_eq!(health.status(), StatusCode::OK);
        assert_eq!(body_json(health.body())["status"], "healthy");

        api.store.close().await;
        let health = warp::test::request().method("GET").path("/health").reply(&routes).await;
        assert_eq!(health.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let api = test_api(10);
        let routes = create_routes(api.state.clone());

        let resp = warp::test::request().method("GET").path("/nope").reply(&routes).await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp.body())["error"]["code"], codes::NOT_FOUND);
    }
}
