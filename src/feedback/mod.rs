//! Coaching feedback on recorded attempts
//!
//! The recording controller never calls into this module. Review is a
//! separate step that reads a stored attempt, asks the generator for
//! feedback, and writes it back.

mod generator;
mod models;
mod openai;
mod prompt;
mod review;

pub use generator::{FeedbackError, FeedbackGenerator};
pub use models::{Feedback, FeedbackRequest, ReviewOutcome, StarFeedback};
pub use openai::OpenAiFeedback;
pub use prompt::{build_prompt, parse_feedback};
pub use review::{ReviewRequest, ReviewService};
