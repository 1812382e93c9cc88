pub mod clients;
pub mod errors;
pub mod middleware;
pub mod registry;
pub mod types;

pub use errors::{AppError, AppResult, ErrorCode};
pub use registry::{ChannelKind, ConnectionId, ConnectionRegistry};
pub use types::*;
