//! Locating the change-log worksheet

use clog_core::{LogError, Workbook};
use tracing::debug;

/// Name-normalized match: case-insensitive, whitespace ignored
pub fn is_change_log(sheet_name: &str) -> bool {
    let normalized: String = sheet_name
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    normalized == "changelog"
}

/// Name of the change-log worksheet, if the workbook has one
pub async fn find_change_log(workbook: &dyn Workbook) -> Result<Option<String>, LogError> {
    let names = workbook.worksheet_names().await?;
    Ok(names.into_iter().find(|name| is_change_log(name)))
}

pub async fn change_log_exists(workbook: &dyn Workbook) -> Result<bool, LogError> {
    Ok(find_change_log(workbook).await?.is_some())
}

/// Like [`find_change_log`] but a missing sheet is [`LogError::StoreNotFound`]
pub async fn resolve_change_log(workbook: &dyn Workbook) -> Result<String, LogError> {
    match find_change_log(workbook).await? {
        Some(name) => Ok(name),
        None => {
            debug!("No change log worksheet in workbook");
            Err(LogError::StoreNotFound)
        }
    }
}
