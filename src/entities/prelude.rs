pub use super::ai_summaries::Entity as AiSummaries;
pub use super::messages::Entity as Messages;
pub use super::posts::Entity as Posts;
pub use super::reports::Entity as Reports;
pub use super::threads::Entity as Threads;
pub use super::users::Entity as Users;
