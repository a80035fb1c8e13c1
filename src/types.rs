use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::DashboardError;

pub const DEFAULT_TIMEZONE: &str = "Asia/Seoul";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 600;
pub const DEFAULT_MIN_COLUMNS: usize = 17;
pub const DEFAULT_INTAKE_STATUS: &str = "안내 대기";

// =============================================================================
// Config
// =============================================================================

/// Dashboard configuration stored in ~/.visitboard/config.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Spreadsheet CSV export URL, `file://` URL, or local path.
    #[serde(default)]
    pub feed_url: String,
    /// Credential artifact written by `visitboard-sync-users`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_path: Option<String>,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Status cell value that marks a row for the intake view.
    #[serde(default = "default_intake_status")]
    pub intake_status: String,
    #[serde(default = "default_min_columns")]
    pub min_columns: usize,
    /// Role -> feed header overrides, resolved to positions at load time.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub columns: BTreeMap<ColumnRole, String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_cache_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

fn default_intake_status() -> String {
    DEFAULT_INTAKE_STATUS.to_string()
}

fn default_min_columns() -> usize {
    DEFAULT_MIN_COLUMNS
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed_url: String::new(),
            credentials_path: None,
            cache_ttl_secs: default_cache_ttl_secs(),
            timezone: default_timezone(),
            intake_status: default_intake_status(),
            min_columns: default_min_columns(),
            columns: BTreeMap::new(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Config {
    /// Resolve the configured timezone, falling back to UTC+9 (Asia/Seoul).
    pub fn tz(&self) -> chrono_tz::Tz {
        match self.timezone.parse::<chrono_tz::Tz>() {
            Ok(tz) => tz,
            Err(_) => {
                log::warn!(
                    "Unknown timezone '{}', using {}",
                    self.timezone,
                    DEFAULT_TIMEZONE
                );
                chrono_tz::Asia::Seoul
            }
        }
    }
}

// =============================================================================
// Column schema
// =============================================================================

/// Semantic role of a feed column.
///
/// Each role has a default position matching the export layout of the
/// visit sheet. Config may re-point a role at a named header instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    IntakeDate,
    Name,
    Store,
    ParticipationType,
    ApplicationLink,
    Contact,
    Status,
    VisitDate,
    VisitTime,
    Headcount,
    Menu,
    Feedback,
    Memo,
    ReviewLink,
    PhotoLink,
    ExtraLink,
    Remarks,
    UserId,
    Password,
}

impl ColumnRole {
    pub const ALL: [ColumnRole; 19] = [
        ColumnRole::IntakeDate,
        ColumnRole::Name,
        ColumnRole::Store,
        ColumnRole::ParticipationType,
        ColumnRole::ApplicationLink,
        ColumnRole::Contact,
        ColumnRole::Status,
        ColumnRole::VisitDate,
        ColumnRole::VisitTime,
        ColumnRole::Headcount,
        ColumnRole::Menu,
        ColumnRole::Feedback,
        ColumnRole::Memo,
        ColumnRole::ReviewLink,
        ColumnRole::PhotoLink,
        ColumnRole::ExtraLink,
        ColumnRole::Remarks,
        ColumnRole::UserId,
        ColumnRole::Password,
    ];

    pub fn default_position(self) -> usize {
        match self {
            ColumnRole::IntakeDate => 0,
            ColumnRole::Name => 2,
            ColumnRole::Store => 3,
            ColumnRole::ParticipationType => 4,
            ColumnRole::ApplicationLink => 5,
            ColumnRole::Contact => 6,
            ColumnRole::Status => 7,
            ColumnRole::VisitDate => 8,
            ColumnRole::VisitTime => 9,
            ColumnRole::Headcount => 10,
            ColumnRole::Menu => 11,
            ColumnRole::Feedback => 12,
            ColumnRole::Memo => 13,
            ColumnRole::ReviewLink => 14,
            ColumnRole::PhotoLink => 15,
            ColumnRole::ExtraLink => 16,
            ColumnRole::Remarks => 17,
            ColumnRole::UserId => 23,
            ColumnRole::Password => 24,
        }
    }

    /// Raw value is a URL rendered as a clickable reference.
    pub fn is_link(self) -> bool {
        matches!(
            self,
            ColumnRole::ApplicationLink
                | ColumnRole::ReviewLink
                | ColumnRole::PhotoLink
                | ColumnRole::ExtraLink
        )
    }
}

/// Role -> position mapping resolved against one feed header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    positions: BTreeMap<ColumnRole, usize>,
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            positions: ColumnRole::ALL
                .iter()
                .map(|role| (*role, role.default_position()))
                .collect(),
        }
    }
}

impl Schema {
    /// Resolve roles against `headers`.
    ///
    /// Fails with `InsufficientColumns` when the header is narrower than
    /// `min_columns`, and with `SchemaMismatch` when an override names a
    /// header that does not exist.
    pub fn resolve(
        headers: &[String],
        overrides: &BTreeMap<ColumnRole, String>,
        min_columns: usize,
    ) -> Result<Self, DashboardError> {
        if headers.len() < min_columns {
            return Err(DashboardError::InsufficientColumns {
                found: headers.len(),
                required: min_columns,
            });
        }

        let mut schema = Schema::default();
        for (role, header) in overrides {
            let wanted = header.trim();
            let position = headers
                .iter()
                .position(|h| h.trim() == wanted)
                .ok_or_else(|| DashboardError::SchemaMismatch(wanted.to_string()))?;
            schema.positions.insert(*role, position);
        }
        Ok(schema)
    }

    pub fn position(&self, role: ColumnRole) -> usize {
        self.positions
            .get(&role)
            .copied()
            .unwrap_or_else(|| role.default_position())
    }
}

// =============================================================================
// Dataset
// =============================================================================

/// One feed row. Empty cells are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    pub cells: Vec<Option<String>>,
}

impl Record {
    pub fn from_cells<I, S>(cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            cells: cells.into_iter().map(|c| clean_cell(c.as_ref())).collect(),
        }
    }

    /// Cell at `position`; positions past the end of a short row are absent.
    pub fn cell(&self, position: usize) -> Option<&str> {
        self.cells.get(position).and_then(|c| c.as_deref())
    }
}

/// Normalize a raw CSV field: whitespace-only counts as absent.
pub fn clean_cell(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// A decoded feed snapshot. Immutable once built; shared between sessions.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub schema: Schema,
    pub records: Vec<Record>,
    /// Rows dropped at load for having fewer than `min_columns` cells.
    pub dropped_rows: usize,
}

impl Dataset {
    pub fn header(&self, position: usize) -> &str {
        self.headers.get(position).map(String::as_str).unwrap_or("")
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Distinct partition values in first-seen order.
    pub fn partitions(&self) -> Vec<String> {
        let store = self.schema.position(ColumnRole::Store);
        let mut seen = Vec::new();
        for record in &self.records {
            if let Some(value) = record.cell(store) {
                if !seen.iter().any(|s: &String| s == value) {
                    seen.push(value.to_string());
                }
            }
        }
        seen
    }
}

/// A record paired with its canonical date for the current cycle.
#[derive(Debug, Clone, Copy)]
pub struct DatedRecord<'a> {
    pub record: &'a Record,
    pub date: Option<NaiveDate>,
}
