pub mod new_subscriber;
pub mod preferred_fields;
pub mod subscriber;
pub mod subscriber_email;
pub mod subscriber_status;
pub mod topic;
