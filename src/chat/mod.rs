//! The conversation layer: inbound button vocabulary and outbound render
//! instructions.
//!
//! Nothing in this module knows about the transport. The controller and
//! router produce [`Reply`] values; the run loop turns them into actual
//! messages.

pub(crate) mod controller;
pub(crate) mod render;
pub(crate) mod router;

use anyhow::bail;
use std::fmt;
use std::str::FromStr;

/// An outbound render instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Reply {
    pub text: String,
    pub keyboard: Option<Keyboard>,
    /// When true, the triggering message is edited in place (button presses
    /// rewrite the card they came from); otherwise a new message is sent.
    pub edit: bool,
}

impl Reply {
    /// A new plain message.
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
            edit: false,
        }
    }

    /// An in-place edit of the triggering message.
    pub fn edit(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
            edit: true,
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    /// Converts this reply into an in-place edit.
    pub fn as_edit(mut self) -> Self {
        self.edit = true;
        self
    }
}

/// An inline keyboard: rows of buttons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

/// One inline button carrying a callback payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Button {
    pub label: String,
    pub data: String,
}

impl Button {
    pub fn new(label: impl Into<String>, action: &CallbackAction) -> Self {
        Self {
            label: label.into(),
            data: action.to_string(),
        }
    }
}

/// The button vocabulary consumed by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CallbackAction {
    Confirm,
    EditCategory,
    Cancel,
    BackToConfirm,
    /// A category picked from the picker, by registry index.
    Category(usize),
    ArchiveConfirm,
    ArchiveCancel,
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackAction::Confirm => write!(f, "confirm"),
            CallbackAction::EditCategory => write!(f, "edit_category"),
            CallbackAction::Cancel => write!(f, "cancel"),
            CallbackAction::BackToConfirm => write!(f, "back_to_confirm"),
            CallbackAction::Category(index) => write!(f, "cat_{index}"),
            CallbackAction::ArchiveConfirm => write!(f, "archive_confirm"),
            CallbackAction::ArchiveCancel => write!(f, "archive_cancel"),
        }
    }
}

impl FromStr for CallbackAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let action = match s {
            "confirm" => CallbackAction::Confirm,
            "edit_category" => CallbackAction::EditCategory,
            "cancel" => CallbackAction::Cancel,
            "back_to_confirm" => CallbackAction::BackToConfirm,
            "archive_confirm" => CallbackAction::ArchiveConfirm,
            "archive_cancel" => CallbackAction::ArchiveCancel,
            other => match other.strip_prefix("cat_") {
                Some(index) => CallbackAction::Category(index.parse()?),
                None => bail!("unknown callback data '{other}'"),
            },
        };
        Ok(action)
    }
}
