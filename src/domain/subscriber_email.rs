use validator::validate_email;

/// Normalized email address: trimmed and lower-cased. It is the uniqueness key of the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub struct SubscriberEmail(String);

impl SubscriberEmail {
    pub fn parse(email: String) -> Result<SubscriberEmail, String> {
        let normalized = email.trim().to_lowercase();

        if normalized.is_empty() {
            return Err(String::from("Please enter a valid email address"));
        }

        let has_single_at = match normalized.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty() && !domain.is_empty() && !domain.contains('@')
            }
            None => false,
        };

        // The message never includes the address.
        if !has_single_at || !validate_email(&normalized) {
            return Err(String::from("Please enter a valid email address"));
        }

        Ok(Self(normalized))
    }

    /// Keeps the domain and the first character of the local part, so logs can be correlated
    /// without carrying the full address.
    pub fn redacted(&self) -> String {
        match self.0.split_once('@') {
            Some((local, domain)) => {
                let first = local.chars().next().unwrap_or('*');
                format!("{}***@{}", first, domain)
            }
            None => String::from("***"),
        }
    }
}

impl AsRef<str> for SubscriberEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubscriberEmail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
