//! Storage-grid automation: delete command generation and batch selection.

use std::ops::Range;
use std::time::Duration;

use crate::domain::errors::AutomationError;
use crate::runtime::helpers::{delay, log};
use crate::runtime::{ClickModifiers, Page};

pub const GRID_ROW_SELECTOR: &str = ".azc-grid-multiselectable tr";
pub const TITLE_SELECTOR: &str = ".fxs-blade-title-titleText";
pub const DELETE_BUTTON_SELECTOR: &str = r#".fxs-blade-commandBarContainer [title="Delete"] div"#;
const TITLE_SEPARATOR: &str = " | ";

/// Rows 0 and 1 of the grid are header rows.
const FIRST_DATA_ROW: usize = 2;
pub const SELECT_BATCH: usize = 10;
pub const DELETE_DELAY: Duration = Duration::from_millis(500);

/// One `az storage blob delete-batch` per visible container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteCommands {
    pub account: String,
    pub commands: Vec<String>,
}

impl DeleteCommands {
    /// A bash snippet that evaluates every command in turn.
    pub fn bash_loop(&self) -> String {
        let quoted: Vec<String> = self
            .commands
            .iter()
            .map(|command| format!("\t\"{command}\""))
            .collect();
        format!(
            "commands=(\n{}\n)\nfor cmd in \"${{commands[@]}}\"\ndo\n\teval $cmd\ndone\n",
            quoted.join("\n")
        )
    }
}

/// Read the storage account from the blade title and build one delete
/// command per labelled grid row.
pub fn container_delete_commands<P: Page>(page: &P) -> Result<DeleteCommands, AutomationError> {
    let rows = page.query_selector_all(GRID_ROW_SELECTOR);
    if rows.is_empty() {
        return Err(AutomationError::not_found(
            "No storage grid rows found. Make sure the container list is open.",
        ));
    }
    let title = page.query_selector(TITLE_SELECTOR).ok_or_else(|| {
        AutomationError::not_found("Could not find the storage account title.")
    })?;
    let title = page.text_content(&title);
    let account = title
        .split(TITLE_SEPARATOR)
        .next()
        .unwrap_or_default()
        .trim()
        .to_owned();
    log("Account name", Some(&account));

    let commands: Vec<String> = rows
        .iter()
        .filter_map(|row| page.attribute(row, "aria-label"))
        .filter(|container| !container.is_empty())
        .map(|container| {
            format!(
                "az storage blob delete-batch --account-name {account} --source https://{account}.blob.core.windows.net/{container}"
            )
        })
        .collect();
    if commands.is_empty() {
        return Err(AutomationError::not_found("No containers found to delete."));
    }
    log(&format!("Generated {} delete commands", commands.len()), None);
    Ok(DeleteCommands { account, commands })
}

/// Rows the batch selection looks at, clamped to the grid.
fn batch_rows(total: usize) -> Range<usize> {
    FIRST_DATA_ROW.min(total)..(FIRST_DATA_ROW + SELECT_BATCH).min(total)
}

/// Select up to ten unselected data rows, wait for the grid to settle, then
/// press the blade's Delete button. Returns how many rows were clicked.
pub async fn select_batch_and_delete<P: Page>(page: &P) -> Result<usize, AutomationError> {
    let rows = page.query_selector_all(GRID_ROW_SELECTOR);
    if rows.is_empty() {
        return Err(AutomationError::not_found(
            "No Azure grid rows found. Make sure you are on the correct Azure portal page.",
        ));
    }
    let labels: Vec<String> = rows
        .iter()
        .filter_map(|row| page.attribute(row, "aria-label"))
        .filter(|label| !label.is_empty())
        .collect();
    log("Found rows", Some(&labels));

    let mut selected = 0;
    for row in &rows[batch_rows(rows.len())] {
        if page.attribute(row, "aria-selected").as_deref() == Some("false") {
            page.click(row, ClickModifiers::PLAIN);
            selected += 1;
        }
    }
    log(&format!("Selected {selected} rows"), None);

    delay(DELETE_DELAY).await;
    let button = page.query_selector(DELETE_BUTTON_SELECTOR).ok_or_else(|| {
        AutomationError::not_found(
            "Delete button not found. Make sure you are on the correct Azure portal page.",
        )
    })?;
    page.click(&button, ClickModifiers::PLAIN);
    log("Delete button clicked", None);
    Ok(selected)
}
