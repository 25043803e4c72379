//! Builds the user-facing message texts and keyboards.

use crate::chat::{Button, CallbackAction, Keyboard, Reply};
use crate::ledger::{Partitions, Summary};
use crate::model::{CategoryRegistry, DraftTransaction, LedgerRow};

/// Which heading the confirmation card carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CardHeading {
    /// A freshly extracted draft.
    Extracted,
    /// The draft after a category edit.
    CategoryUpdated,
    /// Returning to the card unchanged from the picker.
    Review,
}

pub(crate) fn welcome() -> String {
    "👋 Welcome to Expense Tracker Bot!\n\n\
     📸 Send me a screenshot of your transaction (Apple Pay, Touch n Go, GrabPay, etc.) and I'll automatically:\n\
     ✅ Extract the transaction details\n\
     ✅ Let you confirm/edit the information\n\
     ✅ Log it to your Google Sheet (organized by month!)\n\n\
     🔧 Commands:\n\
     /start - Show this welcome message\n\
     /stats - View spending statistics for current month\n\
     /archive - Archive current month after review\n\
     /months - List all monthly sheets\n\
     /categories - View all available categories\n\
     /help - Get help\n\n\
     📅 Each month gets its own tab automatically!\n\
     Just send a screenshot to get started! 💰"
        .to_string()
}

pub(crate) fn help_text() -> String {
    "ℹ️ How to use Expense Tracker Bot:\n\n\
     1️⃣ Take a screenshot of your transaction (Apple Pay, e-wallet, etc.)\n\
     2️⃣ Send the screenshot to this bot\n\
     3️⃣ Review the extracted details\n\
     4️⃣ Confirm or edit the category\n\
     5️⃣ Save to Google Sheets!\n\n\
     📅 Monthly Organization:\n\
     • Each month gets its own tab automatically\n\
     • Format: \"2025-01 January\", \"2025-02 February\", etc.\n\
     • At month end, use /archive to archive the month\n\
     • Archived tabs are renamed \"[ARCHIVED] 2025-01 January\"\n\n\
     💡 Tips:\n\
     • Make sure the screenshot is clear and readable\n\
     • Amount, merchant, and date should be visible\n\
     • Works with Apple Pay, Touch n Go, GrabPay, Boost, and more!\n\n\
     🔧 Commands:\n\
     /start - Welcome message\n\
     /stats - View current month statistics\n\
     /archive - Archive current month (after review)\n\
     /months - List all monthly sheets\n\
     /categories - View all categories\n\
     /help - Show this help message\n\n\
     🔄 Monthly Workflow:\n\
     1. Track expenses throughout the month\n\
     2. At month end, review with /stats\n\
     3. Verify calculations in Google Sheets\n\
     4. Run /archive to archive the month\n\
     5. Next expense auto-creates new month tab!"
        .to_string()
}

pub(crate) fn categories_text(registry: &CategoryRegistry) -> String {
    format!(
        "📋 Available Categories:\n\n{}",
        registry.entries().join("\n")
    )
}

pub(crate) fn processing_text() -> String {
    "📸 Processing your screenshot... Please wait.".to_string()
}

pub(crate) fn unknown_command_text() -> String {
    "🤔 Unknown command. Use /help to see what I can do.".to_string()
}

/// The confirmation card: the draft's fields plus confirm/edit/cancel buttons.
pub(crate) fn confirmation_card(draft: &DraftTransaction, heading: CardHeading) -> Reply {
    let heading = match heading {
        CardHeading::Extracted => "✅ Transaction Details Extracted:",
        CardHeading::CategoryUpdated => "✅ Transaction Details (Category Updated):",
        CardHeading::Review => "✅ Transaction Details:",
    };
    let text = format!(
        "{heading}\n\n\
         💰 Amount: {currency} {amount}\n\
         🏪 Merchant: {merchant}\n\
         📅 Date: {date}\n\
         ⏰ Time: {time}\n\
         💳 Payment: {payment}\n\
         📂 Category: {category}\n\
         📝 Description: {description}\n\n\
         Is this correct?",
        currency = draft.currency(),
        amount = draft.amount().display_2dp(),
        merchant = or_unknown(draft.merchant()),
        date = draft.date().format("%Y-%m-%d"),
        time = draft
            .time()
            .map(|t| t.format("%H:%M").to_string())
            .unwrap_or_else(|| "N/A".to_string()),
        payment = or_na(draft.payment_method()),
        category = draft.category(),
        description = or_na(draft.description()),
    );
    Reply::message(text).with_keyboard(Keyboard {
        rows: vec![
            vec![
                Button::new("✅ Confirm & Save", &CallbackAction::Confirm),
                Button::new("✏️ Edit Category", &CallbackAction::EditCategory),
            ],
            vec![Button::new("❌ Cancel", &CallbackAction::Cancel)],
        ],
    })
}

/// The category picker: all categories, paired two per row, plus a back
/// control.
pub(crate) fn category_picker(registry: &CategoryRegistry) -> Reply {
    let mut rows: Vec<Vec<Button>> = Vec::new();
    for (row_ix, pair) in registry.entries().chunks(2).enumerate() {
        rows.push(
            pair.iter()
                .enumerate()
                .map(|(col_ix, label)| {
                    Button::new(*label, &CallbackAction::Category(row_ix * 2 + col_ix))
                })
                .collect(),
        );
    }
    rows.push(vec![Button::new("⬅️ Back", &CallbackAction::BackToConfirm)]);
    Reply::message("📂 Select a category:").with_keyboard(Keyboard { rows })
}

pub(crate) fn saved_text(row: &LedgerRow) -> String {
    format!(
        "✅ Transaction saved successfully!\n\n💰 {} {} at {}",
        row.currency,
        row.amount.display_2dp(),
        or_unknown(&row.merchant)
    )
}

pub(crate) fn cancelled_text() -> String {
    "❌ Transaction cancelled.".to_string()
}

pub(crate) fn stats_text(partition: &str, summary: &Summary) -> String {
    let mut text = format!(
        "📊 Your Spending Statistics ({partition})\n\n\
         💰 Total Spent: MYR {total}\n\
         📝 Total Transactions: {count}\n\
         📊 Average per Transaction: MYR {average}\n\n\
         🔝 Top 5 Categories:\n",
        total = format!("{:.2}", summary.total()),
        count = summary.count(),
        average = format!("{:.2}", summary.average()),
    );
    for (rank, (category, total)) in summary.top_categories(5).iter().enumerate() {
        let percentage = summary.percentage(*total);
        text.push_str(&format!(
            "\n{}. {category}: MYR {total:.2} ({percentage:.1}%)",
            rank + 1,
        ));
    }
    text.push_str("\n\n💡 Use /archive to archive this month after review");
    text
}

pub(crate) fn no_stats_text(partition: &str) -> String {
    format!("📊 No expenses recorded for {partition} yet!")
}

pub(crate) fn no_worksheet_text(partition: &str) -> String {
    format!("❌ No worksheet found for {partition}")
}

/// The archive confirmation prompt with the summary snapshot.
pub(crate) fn archive_prompt(partition: &str, summary: &Summary) -> Reply {
    let text = format!(
        "📦 Archive Month: {partition}\n\n\
         📊 Summary:\n\
         • Total Transactions: {count}\n\
         • Total Amount: MYR {total}\n\n\
         ⚠️ This will:\n\
         1. Rename the tab to \"[ARCHIVED] {partition}\"\n\
         2. Move it to the end of your sheets\n\
         3. Create a new tab for the current month\n\n\
         Are you sure you want to archive this month?",
        count = summary.count(),
        total = format!("{:.2}", summary.total()),
    );
    Reply::message(text).with_keyboard(Keyboard {
        rows: vec![vec![
            Button::new("✅ Yes, Archive", &CallbackAction::ArchiveConfirm),
            Button::new("❌ Cancel", &CallbackAction::ArchiveCancel),
        ]],
    })
}

pub(crate) fn archive_done_text(partition: &str, summary: &Summary) -> String {
    format!(
        "✅ Successfully archived {partition}!\n\n\
         📊 Final Summary:\n\
         • Transactions: {count}\n\
         • Total: MYR {total}\n\n\
         The tab has been renamed to '[ARCHIVED] {partition}' and moved to the end of your sheets.",
        count = summary.count(),
        total = format!("{:.2}", summary.total()),
    )
}

pub(crate) fn archive_cancelled_text() -> String {
    "❌ Archive cancelled.".to_string()
}

pub(crate) fn months_text(partitions: &Partitions) -> String {
    let mut text = "📅 Your Expense Sheets:\n\n".to_string();
    if !partitions.active.is_empty() {
        text.push_str("✅ Active Months:\n");
        for month in &partitions.active {
            text.push_str(&format!("  • {month}\n"));
        }
    }
    if !partitions.archived.is_empty() {
        text.push_str("\n📦 Archived Months:\n");
        for month in &partitions.archived {
            text.push_str(&format!("  • {month}\n"));
        }
    }
    if partitions.active.is_empty() && partitions.archived.is_empty() {
        text.push_str("No expense sheets found yet!");
    }
    text
}

fn or_na(value: &str) -> &str {
    if value.is_empty() {
        "N/A"
    } else {
        value
    }
}

fn or_unknown(value: &str) -> &str {
    if value.is_empty() {
        "Unknown"
    } else {
        value
    }
}
