use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};

use crate::domain::{
    preferred_fields::PreferredFields,
    subscriber::{SubscriberPatch, SubscriberRecord},
    subscriber_email::SubscriberEmail,
    subscriber_status::SubscriberStatus,
};
use crate::store::{InsertError, StoreError, SubscriberStore};

const UNIQUE_VIOLATION_CODE: &str = "23505";

pub struct PostgresSubscriberStore {
    db_pool: PgPool,
}

impl PostgresSubscriberStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl SubscriberStore for PostgresSubscriberStore {
    #[tracing::instrument(
        name = "Insert a new subscriber into the database",
        skip(self, record),
        fields(subscriber_email = %record.email.redacted())
    )]
    async fn insert(&self, record: &SubscriberRecord) -> Result<(), InsertError> {
        sqlx::query(
            r#"
            INSERT INTO subscribers (email, preferred_fields, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(record.email.as_ref())
        .bind(record.preferred_fields.to_storage())
        .bind(record.status.as_ref())
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.db_pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                return InsertError::UniqueViolation;
            }
            tracing::error!("Failed to execute query: {:?}", err);
            InsertError::Store(err.into())
        })?;

        Ok(())
    }

    #[tracing::instrument(
        name = "Fetch a subscriber by email",
        skip(self, email),
        fields(subscriber_email = %email.redacted())
    )]
    async fn find_by_email(
        &self,
        email: &SubscriberEmail,
    ) -> Result<Option<SubscriberRecord>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT email, preferred_fields, status, created_at, updated_at
            FROM subscribers
            WHERE email = $1
            "#,
        )
        .bind(email.as_ref())
        .fetch_optional(&self.db_pool)
        .await
        .map_err(|err| {
            tracing::error!("Failed to execute query: {:?}", err);
            StoreError::from(err)
        })?;

        row.as_ref().map(record_from_row).transpose()
    }

    #[tracing::instrument(
        name = "Update a subscriber in the database",
        skip(self, email, patch),
        fields(
            subscriber_email = %email.redacted(),
            status = %patch.status.as_ref()
        )
    )]
    async fn update(
        &self,
        email: &SubscriberEmail,
        patch: SubscriberPatch,
    ) -> Result<Option<SubscriberRecord>, StoreError> {
        let query = match &patch.preferred_fields {
            Some(preferred_fields) => sqlx::query(
                r#"
                UPDATE subscribers
                SET status = $3, updated_at = $4, preferred_fields = $5
                WHERE email = $1 AND status = $2
                RETURNING email, preferred_fields, status, created_at, updated_at
                "#,
            )
            .bind(email.as_ref())
            .bind(patch.expected_status.as_ref())
            .bind(patch.status.as_ref())
            .bind(patch.updated_at)
            .bind(preferred_fields.to_storage()),
            None => sqlx::query(
                r#"
                UPDATE subscribers
                SET status = $3, updated_at = $4
                WHERE email = $1 AND status = $2
                RETURNING email, preferred_fields, status, created_at, updated_at
                "#,
            )
            .bind(email.as_ref())
            .bind(patch.expected_status.as_ref())
            .bind(patch.status.as_ref())
            .bind(patch.updated_at),
        };

        let row = query
            .fetch_optional(&self.db_pool)
            .await
            .map_err(|err| {
                tracing::error!("Failed to execute query: {:?}", err);
                StoreError::from(err)
            })?;

        row.as_ref().map(record_from_row).transpose()
    }

    #[tracing::instrument(name = "Fetch all active subscribers", skip(self))]
    async fn find_active(&self) -> Result<Vec<SubscriberRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT email, preferred_fields, status, created_at, updated_at
            FROM subscribers
            WHERE status = 'active'
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.db_pool)
        .await
        .map_err(|err| {
            tracing::error!("Failed to execute query: {:?}", err);
            StoreError::from(err)
        })?;

        rows.iter().map(record_from_row).collect()
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => StoreError::Unavailable(Box::new(err)),
            _ => StoreError::Failed(Box::new(err)),
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some(UNIQUE_VIOLATION_CODE),
        _ => false,
    }
}

fn record_from_row(row: &PgRow) -> Result<SubscriberRecord, StoreError> {
    let email: String = row.try_get("email")?;
    let preferred_fields: Option<Vec<String>> = row.try_get("preferred_fields")?;
    let status: String = row.try_get("status")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

    Ok(SubscriberRecord {
        email: SubscriberEmail::parse(email).map_err(|err| StoreError::Failed(err.into()))?,
        preferred_fields: PreferredFields::from_storage(preferred_fields)
            .map_err(|err| StoreError::Failed(err.into()))?,
        status: SubscriberStatus::parse(status).map_err(|err| StoreError::Failed(err.into()))?,
        created_at,
        updated_at,
    })
}
