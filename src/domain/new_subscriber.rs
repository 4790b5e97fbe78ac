use serde::Deserialize;

use crate::domain::preferred_fields::PreferredFields;
use crate::domain::subscriber_email::SubscriberEmail;

#[derive(Debug)]
pub struct NewSubscriber {
    pub email: SubscriberEmail,
    pub preferred_fields: PreferredFields,
}

/// Raw subscription input as collected by a form or an API client.
#[derive(Deserialize, Debug, Clone)]
pub struct SubscribeRequest {
    pub email: String,
    #[serde(default)]
    pub fields: Vec<String>,
}

impl SubscribeRequest {
    pub fn new(email: impl Into<String>, fields: &[&str]) -> Self {
        Self {
            email: email.into(),
            fields: fields.iter().map(|field| field.to_string()).collect(),
        }
    }
}

impl TryFrom<SubscribeRequest> for NewSubscriber {
    type Error = String;

    fn try_from(request: SubscribeRequest) -> Result<Self, Self::Error> {
        let email = SubscriberEmail::parse(request.email)?;
        let preferred_fields = PreferredFields::parse(request.fields)?;

        Ok(NewSubscriber {
            email,
            preferred_fields,
        })
    }
}
