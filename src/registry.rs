use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;

use crate::domain::{
    new_subscriber::{NewSubscriber, SubscribeRequest},
    subscriber::{SubscriberPatch, SubscriberRecord},
    subscriber_email::SubscriberEmail,
};
use crate::store::{InsertError, StoreError, SubscriberStore};
use crate::utils::error_chain_fmt;

const SUBSCRIBED_MESSAGE: &str = "Successfully subscribed! Check your inbox tomorrow morning.";
const REACTIVATED_MESSAGE: &str = "Welcome back! Your daily digest subscription is active again.";
const ALREADY_SUBSCRIBED_MESSAGE: &str = "Already subscribed!";
const UNSUBSCRIBED_MESSAGE: &str =
    "If that address was subscribed, it will no longer receive the daily digest.";
pub const UNAVAILABLE_MESSAGE: &str = "Something went wrong, please try again later.";

#[derive(Deserialize, Debug, Clone)]
pub struct UnsubscribeRequest {
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscribeOutcome {
    Created,
    Reactivated,
    AlreadyActive,
    ValidationFailed(String),
}

impl SubscribeOutcome {
    pub fn message(&self) -> &str {
        match self {
            SubscribeOutcome::Created => SUBSCRIBED_MESSAGE,
            SubscribeOutcome::Reactivated => REACTIVATED_MESSAGE,
            SubscribeOutcome::AlreadyActive => ALREADY_SUBSCRIBED_MESSAGE,
            SubscribeOutcome::ValidationFailed(reason) => reason,
        }
    }
}

impl AsRef<str> for SubscribeOutcome {
    fn as_ref(&self) -> &str {
        match self {
            SubscribeOutcome::Created => "created",
            SubscribeOutcome::Reactivated => "reactivated",
            SubscribeOutcome::AlreadyActive => "already_active",
            SubscribeOutcome::ValidationFailed(_) => "validation_failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsubscribeOutcome {
    Unsubscribed,
    AlreadyUnsubscribed,
    NotFound,
    ValidationFailed(String),
}

impl UnsubscribeOutcome {
    /// `Unsubscribed`, `AlreadyUnsubscribed` and `NotFound` share their copy so the response
    /// never tells whether an address was ever subscribed.
    pub fn message(&self) -> &str {
        match self {
            UnsubscribeOutcome::Unsubscribed
            | UnsubscribeOutcome::AlreadyUnsubscribed
            | UnsubscribeOutcome::NotFound => UNSUBSCRIBED_MESSAGE,
            UnsubscribeOutcome::ValidationFailed(reason) => reason,
        }
    }
}

impl AsRef<str> for UnsubscribeOutcome {
    fn as_ref(&self) -> &str {
        match self {
            UnsubscribeOutcome::Unsubscribed => "unsubscribed",
            UnsubscribeOutcome::AlreadyUnsubscribed => "already_unsubscribed",
            UnsubscribeOutcome::NotFound => "not_found",
            UnsubscribeOutcome::ValidationFailed(_) => "validation_failed",
        }
    }
}

#[derive(thiserror::Error)]
pub enum RegistryError {
    #[error("Failed to reach the subscriber store.")]
    Store(#[from] StoreError),
}

impl RegistryError {
    pub fn is_retryable(&self) -> bool {
        match self {
            RegistryError::Store(err) => err.is_retryable(),
        }
    }
}

impl std::fmt::Debug for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Owns the subscriber lifecycle: `(none) -> active <-> unsubscribed`.
///
/// Holds no mutable state of its own. Uniqueness and transitions are enforced by the store
/// with atomic inserts and conditional updates, so the registry can be cloned freely across
/// workers.
#[derive(Clone)]
pub struct SubscriberRegistry {
    store: Arc<dyn SubscriberStore>,
}

impl SubscriberRegistry {
    pub fn new(store: Arc<dyn SubscriberStore>) -> Self {
        Self { store }
    }

    #[tracing::instrument(
        name = "Subscribe to the daily digest",
        skip(self, request),
        fields(subscriber_email = tracing::field::Empty)
    )]
    pub async fn subscribe(
        &self,
        request: SubscribeRequest,
    ) -> Result<SubscribeOutcome, RegistryError> {
        let new_subscriber: NewSubscriber = match request.try_into() {
            Ok(new_subscriber) => new_subscriber,
            Err(reason) => {
                tracing::info!("Rejected subscription request: {}", reason);
                return Ok(SubscribeOutcome::ValidationFailed(reason));
            }
        };
        tracing::Span::current().record(
            "subscriber_email",
            tracing::field::display(new_subscriber.email.redacted()),
        );

        let now = Utc::now();
        let record = SubscriberRecord::active(
            new_subscriber.email.clone(),
            new_subscriber.preferred_fields.clone(),
            now,
        );

        match self.store.insert(&record).await {
            Ok(()) => Ok(SubscribeOutcome::Created),
            Err(InsertError::UniqueViolation) => self.resubscribe(new_subscriber).await,
            Err(InsertError::Store(err)) => {
                tracing::error!("Failed to store new subscriber: {:?}", err);
                Err(err.into())
            }
        }
    }

    /// The email is already known: reactivate it when it was unsubscribed, leave it untouched
    /// otherwise.
    async fn resubscribe(
        &self,
        new_subscriber: NewSubscriber,
    ) -> Result<SubscribeOutcome, RegistryError> {
        let existing = self.store.find_by_email(&new_subscriber.email).await?;

        match existing {
            Some(record) if record.status.is_unsubscribed() => {
                let patch = SubscriberPatch::reactivate(new_subscriber.preferred_fields, Utc::now());

                match self.store.update(&new_subscriber.email, patch).await? {
                    Some(_) => Ok(SubscribeOutcome::Reactivated),
                    // A concurrent request reactivated it first.
                    None => Ok(SubscribeOutcome::AlreadyActive),
                }
            }
            Some(_) => Ok(SubscribeOutcome::AlreadyActive),
            None => {
                tracing::warn!("Subscriber vanished after a unique violation");
                Ok(SubscribeOutcome::AlreadyActive)
            }
        }
    }

    #[tracing::instrument(name = "Unsubscribe from the daily digest", skip(self, request))]
    pub async fn unsubscribe(
        &self,
        request: UnsubscribeRequest,
    ) -> Result<UnsubscribeOutcome, RegistryError> {
        if request.email.trim().is_empty() {
            return Ok(UnsubscribeOutcome::ValidationFailed(String::from(
                "Please enter the email address you subscribed with",
            )));
        }

        // Anything that does not parse as an email can never have been stored.
        let email = match SubscriberEmail::parse(request.email) {
            Ok(email) => email,
            Err(_) => return Ok(UnsubscribeOutcome::NotFound),
        };

        let existing = self.store.find_by_email(&email).await?;

        let outcome = match existing {
            None => UnsubscribeOutcome::NotFound,
            Some(record) if record.status.is_unsubscribed() => {
                UnsubscribeOutcome::AlreadyUnsubscribed
            }
            Some(_) => match self
                .store
                .update(&email, SubscriberPatch::unsubscribe(Utc::now()))
                .await?
            {
                Some(_) => UnsubscribeOutcome::Unsubscribed,
                None => UnsubscribeOutcome::AlreadyUnsubscribed,
            },
        };
        tracing::info!(subscriber_email = %email.redacted(), ?outcome, "Handled unsubscribe request");

        Ok(outcome)
    }

    #[tracing::instrument(name = "Look up a subscriber", skip(self, email))]
    pub async fn find(
        &self,
        email: &SubscriberEmail,
    ) -> Result<Option<SubscriberRecord>, RegistryError> {
        Ok(self.store.find_by_email(email).await?)
    }

    /// Records that downstream digest jobs should deliver to.
    #[tracing::instrument(name = "List active subscribers", skip(self))]
    pub async fn active_subscribers(&self) -> Result<Vec<SubscriberRecord>, RegistryError> {
        Ok(self.store.find_active().await?)
    }
}
