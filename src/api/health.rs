use actix_web::{HttpResponse, Responder, get, web};
use serde::Serialize;
use tracing::warn;

use crate::api::extract::ExtractService;

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    actor: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn actor_state(service: &ExtractService) -> String {
    if service.is_configured() {
        "configured".to_string()
    } else {
        "missing_api_key".to_string()
    }
}

/// Health check endpoint
///
/// General health check reporting whether the actor credential is present.
/// The process itself is healthy either way.
#[get("/health")]
async fn health_check(service: web::Data<ExtractService>) -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        actor: actor_state(&service),
        error: None,
    })
}

/// Readiness check endpoint
///
/// Returns 503 while no actor credential is configured, since every
/// extraction would fail.
#[get("/ready")]
async fn readiness_check(service: web::Data<ExtractService>) -> impl Responder {
    if service.is_configured() {
        HttpResponse::Ok().json(HealthResponse {
            status: "ready".to_string(),
            actor: actor_state(&service),
            error: None,
        })
    } else {
        warn!("Readiness check failed: actor API key missing");
        HttpResponse::ServiceUnavailable().json(HealthResponse {
            status: "not_ready".to_string(),
            actor: actor_state(&service),
            error: Some("API key missing".to_string()),
        })
    }
}

/// Liveness check endpoint
///
/// Simple check that the process is alive. Does not check dependencies.
#[get("/live")]
async fn liveness_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "alive".to_string(),
        actor: "not_checked".to_string(),
        error: None,
    })
}

pub fn health_config(config: &mut web::ServiceConfig) {
    config
        .service(health_check)
        .service(readiness_check)
        .service(liveness_check);
}
