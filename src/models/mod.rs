// Declare modules
pub mod meeting;
pub mod session;

// Re-export all public types to keep imports flat for external callers,
// so `use meetchime::Meeting` works the same as the nested path.
pub use meeting::{Meeting, NewMeeting};
pub use session::{Session, UserProfile};
