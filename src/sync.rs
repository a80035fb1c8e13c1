//! Rebuilds the credential artifact from the account columns of the feed.

use crate::auth::CredentialStore;
use crate::error::DashboardError;
use crate::feed::{self, FeedSource};
use crate::types::{ColumnRole, Config, Dataset};

/// The account columns sit at X/Y, so the sheet must reach column Y.
pub const SYNC_MIN_COLUMNS: usize = 25;

/// Spreadsheets export numeric passwords as floats ("123.0").
fn clean_password(raw: &str) -> &str {
    let raw = raw.trim();
    raw.strip_suffix(".0").unwrap_or(raw)
}

/// Build the credential mapping from an already-decoded feed.
///
/// The user id doubles as that user's store. The administrator is always
/// present.
pub fn build_credentials(dataset: &Dataset) -> Result<CredentialStore, DashboardError> {
    if dataset.column_count() < SYNC_MIN_COLUMNS {
        return Err(DashboardError::InsufficientColumns {
            found: dataset.column_count(),
            required: SYNC_MIN_COLUMNS,
        });
    }

    let user_pos = dataset.schema.position(ColumnRole::UserId);
    let password_pos = dataset.schema.position(ColumnRole::Password);

    let mut store = CredentialStore::with_default_admin();
    let mut skipped = 0usize;
    for record in &dataset.records {
        match (record.cell(user_pos), record.cell(password_pos)) {
            (Some(user), Some(password)) => {
                store.grant_store(user, clean_password(password), user);
            }
            _ => skipped += 1,
        }
    }
    log::debug!("{} row(s) without account data", skipped);
    Ok(store)
}

/// Fetch the feed and build the credential mapping.
pub fn sync_credentials(
    source: &dyn FeedSource,
    config: &Config,
) -> Result<CredentialStore, DashboardError> {
    let config = Config {
        min_columns: config.min_columns.max(SYNC_MIN_COLUMNS),
        ..config.clone()
    };
    let dataset = feed::load_dataset(source, &config)?;
    build_credentials(&dataset)
}
