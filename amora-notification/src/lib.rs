pub mod models;
pub mod relay;
pub mod schema;

pub use models::{Notification, NotificationKind};
pub use relay::NotificationRelay;
