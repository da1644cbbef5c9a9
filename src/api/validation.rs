use actix_web::HttpResponse;
use serde::Serialize;
use tracing::warn;

/// Error envelope shared by every endpoint
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// Creates a configured JsonConfig with standardized error handling for the entire project
pub fn json_config(limit: usize) -> actix_web_validator::JsonConfig {
    actix_web_validator::JsonConfig::default()
        .limit(limit)
        .error_handler(|err, _req| {
            let error_response = match err {
                actix_web_validator::Error::Validate(validation_errors) => {
                    // Field validators carry the client-facing message
                    let message = validation_errors
                        .field_errors()
                        .into_iter()
                        .flat_map(|(field, errors)| {
                            errors.iter().map(move |e| {
                                e.message
                                    .as_ref()
                                    .map(|m| m.to_string())
                                    .unwrap_or_else(|| format!("Validation error in field: {}", field))
                            })
                        })
                        .next()
                        .unwrap_or_else(|| "Validation failed".to_string());

                    warn!("Request validation failed: {}", message);
                    ErrorResponse::new(message)
                }
                other => {
                    let details = other.to_string();
                    warn!("Invalid request body: {}", details);
                    ErrorResponse::with_details("Invalid request body", details)
                }
            };

            actix_web::error::InternalError::from_response(
                "",
                HttpResponse::BadRequest().json(error_response),
            )
            .into()
        })
}
