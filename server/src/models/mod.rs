pub mod event;
pub mod user;

pub use event::{Event, EventStatus, EventUpdate, NewEvent, SubmissionType};
pub use user::{Profile, Role, Session, User};
