//! The conversation state machine.
//!
//! A user's state is carried implicitly by which session fields are present:
//! no pending anything is `Idle`, a pending draft is `AwaitingConfirmation`
//! (or `EditingCategory` while the picker is shown), a pending archive
//! request is `AwaitingArchiveConfirmation`. Every transition locks the
//! user's session for its whole duration, so same-user events queue in
//! arrival order.

use crate::chat::render::{self, CardHeading};
use crate::chat::{CallbackAction, Reply};
use crate::error::{Fault, Pending};
use crate::ledger::{label, LedgerService};
use crate::model::{CategoryRegistry, DraftTransaction};
use crate::session::{ArchiveRequest, SessionStore, UserId};
use std::sync::Arc;
use tracing::{debug, error, warn};

pub(crate) struct ConversationController {
    ledger: Arc<LedgerService>,
    sessions: SessionStore,
    registry: CategoryRegistry,
}

impl ConversationController {
    pub fn new(ledger: Arc<LedgerService>, registry: CategoryRegistry) -> Self {
        Self {
            ledger,
            sessions: SessionStore::new(),
            registry,
        }
    }

    /// A new draft arrived: stage it (replacing any previous one) and render
    /// the confirmation card.
    pub async fn draft_received(&self, user: UserId, draft: DraftTransaction) -> Reply {
        let session = self.sessions.get(user);
        let mut session = session.lock().await;
        let reply = render::confirmation_card(&draft, CardHeading::Extracted);
        session.set_draft(draft);
        debug!("Staged a draft for user {user}");
        reply
    }

    /// An archive of the current month was requested: snapshot the summary,
    /// stage the request and render the confirmation prompt.
    pub async fn archive_requested(&self, user: UserId) -> Reply {
        let target = label::for_date(chrono::Local::now().date_naive());
        let summary = match self.ledger.summary_if_exists(&target).await {
            Ok(Some(summary)) => summary,
            Ok(None) => return Reply::message(render::no_worksheet_text(&target)),
            Err(e) => {
                error!("Failed to summarize '{target}' for archiving: {e:#}");
                return Reply::message(
                    Fault::BackendUnavailable(format!("Error: {e:#}")).user_message(),
                );
            }
        };

        let session = self.sessions.get(user);
        let mut session = session.lock().await;
        let reply = render::archive_prompt(&target, &summary);
        session.set_archive_request(ArchiveRequest { target, summary });
        reply
    }

    /// A button was pressed.
    pub async fn callback(&self, user: UserId, data: &str) -> Reply {
        let action = match data.parse::<CallbackAction>() {
            Ok(action) => action,
            Err(e) => {
                // Not part of the button vocabulary; a correctly rendered
                // keyboard cannot produce this.
                warn!("Ignoring unparseable callback from user {user}: {e:#}");
                return Reply::edit("❌ Something went wrong. Please try again.");
            }
        };
        match action {
            CallbackAction::Confirm => self.confirm(user).await,
            CallbackAction::EditCategory => self.edit_category(user).await,
            CallbackAction::Cancel => self.cancel(user).await,
            CallbackAction::BackToConfirm => self.back_to_confirm(user).await,
            CallbackAction::Category(index) => self.category_selected(user, index).await,
            CallbackAction::ArchiveConfirm => self.archive_confirm(user).await,
            CallbackAction::ArchiveCancel => self.archive_cancel(user).await,
        }
    }

    /// Confirm: commit the pending draft. The draft is cleared only after the
    /// commit succeeds, so the user can press confirm again after a backend
    /// failure.
    async fn confirm(&self, user: UserId) -> Reply {
        let session = self.sessions.get(user);
        let mut session = session.lock().await;
        let Some(draft) = session.draft() else {
            return Reply::edit(Fault::NoPendingState(Pending::Draft).user_message());
        };
        match self.ledger.commit(draft).await {
            Ok(row) => {
                session.clear_draft();
                Reply::edit(render::saved_text(&row))
            }
            Err(e) => {
                error!("Commit failed for user {user}: {e:#}");
                Reply::edit(
                    Fault::BackendUnavailable(format!("Error saving to Google Sheets: {e:#}"))
                        .user_message(),
                )
            }
        }
    }

    async fn edit_category(&self, user: UserId) -> Reply {
        let session = self.sessions.get(user);
        let session = session.lock().await;
        if session.draft().is_none() {
            return Reply::edit(Fault::NoPendingState(Pending::Draft).user_message());
        }
        render::category_picker(&self.registry).as_edit()
    }

    async fn cancel(&self, user: UserId) -> Reply {
        let session = self.sessions.get(user);
        session.lock().await.clear_draft();
        Reply::edit(render::cancelled_text())
    }

    async fn back_to_confirm(&self, user: UserId) -> Reply {
        let session = self.sessions.get(user);
        let session = session.lock().await;
        match session.draft() {
            Some(draft) => render::confirmation_card(draft, CardHeading::Review).as_edit(),
            None => Reply::edit(Fault::NoPendingState(Pending::Draft).user_message()),
        }
    }

    /// A category was picked. Edits only the in-memory draft, never the
    /// ledger.
    async fn category_selected(&self, user: UserId, index: usize) -> Reply {
        let Some(category) = self.registry.get(index) else {
            let fault = Fault::InvalidCategorySelection(index);
            error!(
                "User {user} sent category index {index} but the registry has {} entries",
                self.registry.len()
            );
            return Reply::edit(fault.user_message());
        };

        let session = self.sessions.get(user);
        let mut session = session.lock().await;
        let Some(draft) = session.draft_mut() else {
            return Reply::edit(Fault::NoPendingState(Pending::Draft).user_message());
        };
        draft.set_category(category);
        render::confirmation_card(draft, CardHeading::CategoryUpdated).as_edit()
    }

    /// Archive confirm: run the archive. The staged request is cleared either
    /// way; on failure the user is told to start over with /archive.
    async fn archive_confirm(&self, user: UserId) -> Reply {
        let session = self.sessions.get(user);
        let mut session = session.lock().await;
        let Some(request) = session.clear_archive_request() else {
            return Reply::edit(Fault::NoPendingState(Pending::Archive).user_message());
        };
        match self.ledger.archive(&request.target).await {
            Ok(_) => Reply::edit(render::archive_done_text(&request.target, &request.summary)),
            Err(e) => {
                error!("Archive of '{}' failed for user {user}: {e:#}", request.target);
                Reply::edit(
                    Fault::BackendUnavailable(format!("Error archiving: {e:#}")).user_message(),
                )
            }
        }
    }

    async fn archive_cancel(&self, user: UserId) -> Reply {
        let session = self.sessions.get(user);
        session.lock().await.clear_archive_request();
        Reply::edit(render::archive_cancelled_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_client::{TestSheetState, TestWorksheets};
    use crate::model::Extraction;

    const USER: UserId = 42;

    fn controller(spreadsheet_id: &str) -> (ConversationController, TestWorksheets) {
        let handle = TestWorksheets::new(spreadsheet_id);
        handle.set_state(TestSheetState::default());
        let ledger = Arc::new(LedgerService::new(Box::new(TestWorksheets::new(
            spreadsheet_id,
        ))));
        (
            ConversationController::new(ledger, CategoryRegistry::standard()),
            handle,
        )
    }

    /// A draft dated today, so it lands in the current-month partition.
    fn current_month_draft() -> DraftTransaction {
        let extraction: Extraction = serde_json::from_str(
            r#"{"amount": "45.50", "merchant": "Starbucks", "category": "☕ Coffee/Drinks"}"#,
        )
        .unwrap();
        DraftTransaction::from_extraction(
            extraction,
            chrono::Local::now().date_naive(),
            &CategoryRegistry::standard(),
        )
        .unwrap()
    }

    fn current_month() -> String {
        label::for_date(chrono::Local::now().date_naive())
    }

    #[tokio::test]
    async fn test_confirm_commits_and_returns_to_idle() {
        let (controller, handle) = controller("controller-confirm");
        let card = controller.draft_received(USER, current_month_draft()).await;
        assert!(card.keyboard.is_some());
        assert!(!card.edit);

        let reply = controller.callback(USER, "confirm").await;
        assert!(reply.edit);
        assert!(reply.text.contains("✅ Transaction saved successfully!"));
        let state = handle.get_state();
        assert_eq!(state.worksheet(&current_month()).unwrap().rows.len(), 2);

        // The draft is gone: a second confirm finds nothing staged and
        // appends nothing.
        let reply = controller.callback(USER, "confirm").await;
        assert!(reply.text.contains("No pending transaction found"));
        let state = handle.get_state();
        assert_eq!(state.worksheet(&current_month()).unwrap().rows.len(), 2);
    }

    #[tokio::test]
    async fn test_cancel_discards_the_draft_without_touching_the_ledger() {
        let (controller, handle) = controller("controller-cancel");
        controller.draft_received(USER, current_month_draft()).await;

        let reply = controller.callback(USER, "cancel").await;
        assert_eq!(reply.text, "❌ Transaction cancelled.");
        // No partition was ever created.
        assert!(handle.get_state().worksheets.is_empty());

        let reply = controller.callback(USER, "confirm").await;
        assert!(reply.text.contains("No pending transaction found"));
    }

    #[tokio::test]
    async fn test_category_edit_flow() {
        let (controller, handle) = controller("controller-edit");
        controller.draft_received(USER, current_month_draft()).await;

        let picker = controller.callback(USER, "edit_category").await;
        assert!(picker.edit);
        assert_eq!(picker.text, "📂 Select a category:");

        // Index 21 is 🏪 Groceries.
        let card = controller.callback(USER, "cat_21").await;
        assert!(card.text.contains("(Category Updated)"));
        assert!(card.text.contains("📂 Category: 🏪 Groceries"));
        // The ledger is untouched by category edits.
        assert!(handle.get_state().worksheets.is_empty());

        let reply = controller.callback(USER, "confirm").await;
        assert!(reply.text.contains("saved successfully"));
        let state = handle.get_state();
        let rows = &state.worksheet(&current_month()).unwrap().rows;
        assert_eq!(rows[1][3], "🏪 Groceries");
    }

    #[tokio::test]
    async fn test_back_returns_the_card_unchanged() {
        let (controller, _handle) = controller("controller-back");
        controller.draft_received(USER, current_month_draft()).await;
        controller.callback(USER, "edit_category").await;

        let card = controller.callback(USER, "back_to_confirm").await;
        assert!(card.edit);
        assert!(card.text.starts_with("✅ Transaction Details:"));
        assert!(card.text.contains("📂 Category: ☕ Coffee/Drinks"));
    }

    #[tokio::test]
    async fn test_out_of_range_category_leaves_the_session_unchanged() {
        let (controller, handle) = controller("controller-bad-index");
        controller.draft_received(USER, current_month_draft()).await;

        let reply = controller.callback(USER, "cat_999").await;
        assert_eq!(reply.text, "❌ Something went wrong. Please try again.");
        assert!(handle.get_state().worksheets.is_empty());

        // The draft survived and still carries its original category.
        let card = controller.callback(USER, "back_to_confirm").await;
        assert!(card.text.contains("📂 Category: ☕ Coffee/Drinks"));
    }

    #[tokio::test]
    async fn test_confirm_failure_keeps_the_draft_for_retry() {
        let (controller, handle) = controller("controller-confirm-fail");
        controller.draft_received(USER, current_month_draft()).await;

        handle.set_state(TestSheetState {
            fail_message: Some("quota exceeded".to_string()),
            ..TestSheetState::default()
        });
        let reply = controller.callback(USER, "confirm").await;
        assert!(reply.text.contains("Error saving to Google Sheets"));
        assert!(reply.text.contains("quota exceeded"));

        // Backend recovers; the same draft commits on retry.
        handle.set_state(TestSheetState::default());
        let reply = controller.callback(USER, "confirm").await;
        assert!(reply.text.contains("saved successfully"));
        assert_eq!(
            handle
                .get_state()
                .worksheet(&current_month())
                .unwrap()
                .rows
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn test_archive_flow() {
        let (controller, handle) = controller("controller-archive");
        controller.draft_received(USER, current_month_draft()).await;
        controller.callback(USER, "confirm").await;

        let prompt = controller.archive_requested(USER).await;
        assert!(prompt.text.contains("📦 Archive Month:"));
        assert!(prompt.text.contains("• Total Transactions: 1"));
        assert!(prompt.keyboard.is_some());

        let reply = controller.callback(USER, "archive_confirm").await;
        assert!(reply.text.contains("✅ Successfully archived"));
        let titles = handle.get_state().titles();
        assert_eq!(titles, vec![format!("[ARCHIVED] {}", current_month())]);

        // The request was cleared: confirming again finds nothing staged.
        let reply = controller.callback(USER, "archive_confirm").await;
        assert!(reply.text.contains("No month selected for archiving"));
    }

    #[tokio::test]
    async fn test_archive_cancel_clears_the_request() {
        let (controller, handle) = controller("controller-archive-cancel");
        controller.draft_received(USER, current_month_draft()).await;
        controller.callback(USER, "confirm").await;

        controller.archive_requested(USER).await;
        let reply = controller.callback(USER, "archive_cancel").await;
        assert_eq!(reply.text, "❌ Archive cancelled.");

        // Nothing was archived.
        assert_eq!(handle.get_state().titles(), vec![current_month()]);
        let reply = controller.callback(USER, "archive_confirm").await;
        assert!(reply.text.contains("No month selected for archiving"));
    }

    #[tokio::test]
    async fn test_archive_request_without_a_partition() {
        let (controller, _handle) = controller("controller-archive-missing");
        let reply = controller.archive_requested(USER).await;
        assert!(reply.text.contains("No worksheet found"));
        // Nothing was staged.
        let reply = controller.callback(USER, "archive_confirm").await;
        assert!(reply.text.contains("No month selected for archiving"));
    }

    #[tokio::test]
    async fn test_sessions_do_not_leak_across_users() {
        let (controller, _handle) = controller("controller-two-users");
        controller.draft_received(USER, current_month_draft()).await;

        let reply = controller.callback(99, "confirm").await;
        assert!(reply.text.contains("No pending transaction found"));
    }
}
