use chrono::{DateTime, Utc};

use crate::domain::preferred_fields::PreferredFields;
use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::subscriber_status::SubscriberStatus;

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SubscriberRecord {
    pub email: SubscriberEmail,
    pub preferred_fields: PreferredFields,
    pub status: SubscriberStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubscriberRecord {
    pub fn active(
        email: SubscriberEmail,
        preferred_fields: PreferredFields,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            email,
            preferred_fields,
            status: SubscriberStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }
}

/// In-place change applied to one record. It only applies while the record is still in
/// `expected_status`, which turns every transition into a single conditional write.
#[derive(Debug, Clone)]
pub struct SubscriberPatch {
    pub expected_status: SubscriberStatus,
    pub status: SubscriberStatus,
    pub preferred_fields: Option<PreferredFields>,
    pub updated_at: DateTime<Utc>,
}

impl SubscriberPatch {
    pub fn reactivate(preferred_fields: PreferredFields, now: DateTime<Utc>) -> Self {
        Self {
            expected_status: SubscriberStatus::Unsubscribed,
            status: SubscriberStatus::Active,
            preferred_fields: Some(preferred_fields),
            updated_at: now,
        }
    }

    pub fn unsubscribe(now: DateTime<Utc>) -> Self {
        Self {
            expected_status: SubscriberStatus::Active,
            status: SubscriberStatus::Unsubscribed,
            preferred_fields: None,
            updated_at: now,
        }
    }

    pub fn apply_to(&self, record: &mut SubscriberRecord) {
        record.status = self.status;
        if let Some(preferred_fields) = &self.preferred_fields {
            record.preferred_fields = preferred_fields.clone();
        }
        record.updated_at = self.updated_at;
    }
}
