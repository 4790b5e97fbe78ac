use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use serde::Serialize;

use crate::{
    domain::new_subscriber::SubscribeRequest,
    registry::{RegistryError, SubscribeOutcome, SubscriberRegistry, UNAVAILABLE_MESSAGE},
    utils::error_chain_fmt,
};

#[derive(Serialize)]
pub struct OutcomeBody<'a> {
    pub outcome: &'a str,
    pub message: &'a str,
}

#[derive(Serialize)]
pub struct MessageBody<'a> {
    pub message: &'a str,
}

#[tracing::instrument(
    name = "Subscription request handler",
    skip(body, registry),
    fields(topics = body.fields.len())
)]
pub async fn handle_subscribe(
    body: web::Json<SubscribeRequest>,
    registry: web::Data<SubscriberRegistry>,
) -> Result<HttpResponse, SubscriptionError> {
    let outcome = registry.subscribe(body.into_inner()).await?;

    let mut response = match &outcome {
        SubscribeOutcome::Created => HttpResponse::Created(),
        SubscribeOutcome::Reactivated => HttpResponse::Ok(),
        SubscribeOutcome::AlreadyActive => HttpResponse::Conflict(),
        SubscribeOutcome::ValidationFailed(_) => HttpResponse::BadRequest(),
    };

    Ok(response.json(OutcomeBody {
        outcome: outcome.as_ref(),
        message: outcome.message(),
    }))
}

#[derive(thiserror::Error)]
pub enum SubscriptionError {
    #[error("Failed to update the subscriber registry.")]
    RegistryError(#[from] RegistryError),
}

impl std::fmt::Debug for SubscriptionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for SubscriptionError {
    fn status_code(&self) -> StatusCode {
        match self {
            SubscriptionError::RegistryError(err) if err.is_retryable() => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            SubscriptionError::RegistryError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(MessageBody {
            message: UNAVAILABLE_MESSAGE,
        })
    }
}
