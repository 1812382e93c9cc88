pub mod blocks;
pub mod candidates;
pub mod geo;
pub mod identity;
pub mod likes;
pub mod models;
pub mod orientation;
pub mod schema;

pub use candidates::{list_candidates, sort_candidates};
pub use likes::{like, unlike, LikeOutcome};
pub use models::{Gender, SexualPreference};
