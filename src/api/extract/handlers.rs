use actix_web::{
    HttpResponse, post,
    web::{Data, ServiceConfig},
};
use actix_web_validator::Json;
use tracing::info;

use super::dto::ExtractRequest;
use super::service::{ExtractService, ServiceError};

#[post("/extract-text")]
async fn extract_text(
    service: Data<ExtractService>,
    request: Json<ExtractRequest>,
) -> Result<HttpResponse, ServiceError> {
    let ExtractRequest { points } = request.into_inner();
    info!(points = ?points, "Received points");

    let response = service.extract(points).await?;
    Ok(HttpResponse::Ok().json(response))
}

pub fn extract_config(config: &mut ServiceConfig) {
    config.service(extract_text);
}
