pub mod conversations;
pub mod dates;
pub mod messages;
pub mod models;
pub mod schema;

pub use conversations::find_or_create_conversation;
pub use models::{Conversation, InviteStatus, Message, MessageKind};
