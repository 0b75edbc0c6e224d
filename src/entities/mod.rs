pub mod prelude;

pub mod ai_summaries;
pub mod messages;
pub mod posts;
pub mod reports;
pub mod threads;
pub mod users;
