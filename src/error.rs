//! Error handling for the ledger bot.
//!
//! Infrastructure failures use `anyhow` throughout. Expected conversation-level
//! faults get their own type, `Fault`, because they are outcomes the bot must
//! explain to the user, not errors to bubble up the stack.

use std::fmt;

pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Which piece of staged session state a button press expected to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pending {
    Draft,
    Archive,
}

/// A conversation fault. Each variant maps to exactly one user-visible message
/// and leaves the session in a well-defined state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// The recognition service returned an error marker or unusable output.
    ExtractionFailure(String),
    /// A confirm/edit/archive button arrived with nothing staged.
    NoPendingState(Pending),
    /// A storage backend call failed. The text is surfaced verbatim.
    BackendUnavailable(String),
    /// A category button carried an index outside the registry bounds. This
    /// cannot happen with a correctly rendered picker, so it is logged as a
    /// contract violation and the user sees a generic error.
    InvalidCategorySelection(usize),
}

impl Fault {
    /// The message shown to the user for this fault.
    pub fn user_message(&self) -> String {
        match self {
            Fault::ExtractionFailure(reason) => {
                format!("❌ {reason}\n\nPlease send a clear screenshot of your transaction.")
            }
            Fault::NoPendingState(Pending::Draft) => {
                "❌ No pending transaction found. Please send a screenshot again.".to_string()
            }
            Fault::NoPendingState(Pending::Archive) => {
                "❌ No month selected for archiving.".to_string()
            }
            Fault::BackendUnavailable(detail) => format!("❌ {detail}"),
            Fault::InvalidCategorySelection(_) => {
                "❌ Something went wrong. Please try again.".to_string()
            }
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::ExtractionFailure(reason) => write!(f, "extraction failure: {reason}"),
            Fault::NoPendingState(Pending::Draft) => write!(f, "no pending draft"),
            Fault::NoPendingState(Pending::Archive) => write!(f, "no pending archive request"),
            Fault::BackendUnavailable(detail) => write!(f, "backend unavailable: {detail}"),
            Fault::InvalidCategorySelection(index) => {
                write!(f, "category index {index} is out of range")
            }
        }
    }
}

impl std::error::Error for Fault {}
