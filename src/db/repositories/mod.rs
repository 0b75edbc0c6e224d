pub mod message;
pub mod post;
pub mod report;
pub mod summary;
pub mod thread;
pub mod user;
