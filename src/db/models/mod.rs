//! Database models split into domain-specific modules.

pub mod activity;
pub mod application;
pub mod info_entry;
pub mod mentorship;
pub mod message;
pub mod news;
pub mod suggestion;
pub mod talent;
pub mod user;

pub use activity::*;
pub use application::*;
pub use info_entry::*;
pub use mentorship::*;
pub use message::*;
pub use news::*;
pub use suggestion::*;
pub use talent::*;
pub use user::*;
