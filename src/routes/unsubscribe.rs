use actix_web::{web, HttpResponse};

use crate::registry::{SubscriberRegistry, UnsubscribeOutcome, UnsubscribeRequest};
use crate::routes::{MessageBody, SubscriptionError};

/// Answers with the same body whether or not the address was subscribed.
#[tracing::instrument(name = "Unsubscribe request handler", skip(body, registry))]
pub async fn handle_unsubscribe(
    body: web::Json<UnsubscribeRequest>,
    registry: web::Data<SubscriberRegistry>,
) -> Result<HttpResponse, SubscriptionError> {
    let outcome = registry.unsubscribe(body.into_inner()).await?;

    let mut response = match &outcome {
        UnsubscribeOutcome::ValidationFailed(_) => HttpResponse::BadRequest(),
        _ => HttpResponse::Ok(),
    };

    Ok(response.json(MessageBody {
        message: outcome.message(),
    }))
}
