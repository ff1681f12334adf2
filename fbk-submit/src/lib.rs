//! fbk-submit library - review authoring client
//!
//! `ReviewForm` holds what the user typed; `SubmissionClient` posts it to
//! the backend and returns the stored review with any AI feedback.

pub mod client;
pub mod form;

pub use client::{SubmissionClient, SubmissionError};
pub use form::{AiResponse, ReviewForm, SubmissionOutcome, SUCCESS_MESSAGE};
