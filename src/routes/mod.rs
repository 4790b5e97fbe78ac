mod health_check;
mod subscriptions;
mod unsubscribe;

pub use health_check::*;
pub use subscriptions::*;
pub use unsubscribe::*;
