// Dashboard service
// One render cycle: normalize dates, resolve access, filter, project views.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::access::{allowed_partitions, effective_choice, PartitionChoice};
use crate::auth::{Identity, Session};
use crate::dates;
use crate::error::{DashboardError, UserFacingError};
use crate::pipeline::{self, DateRange, Selection};
use crate::state::AppState;
use crate::types::{ColumnRole, Config, Dataset, DatedRecord};
use crate::views::{
    self, IntakeReport, PendingWork, ViewDef, ViewId, ViewOutcome, ViewScope, INTAKE_VIEW,
    MANAGEMENT_VIEW,
};

/// Everything one cycle reads besides the dataset.
pub struct CycleContext<'a> {
    pub identity: &'a Identity,
    pub selection: &'a Selection,
    pub config: &'a Config,
    /// "Today" in the configured zone; its year completes `M/D` cells.
    pub today: NaiveDate,
}

/// Store selector and date range selector state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    pub identity: String,
    pub options: Vec<String>,
    #[serde(skip)]
    pub selected: PartitionChoice,
    pub selected_label: String,
    /// Min/max valid dates of the selected store; `None` hides the range selector.
    #[serde(skip)]
    pub bounds: Option<DateRange>,
    #[serde(skip)]
    pub range: Option<DateRange>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total: usize,
    pub today_count: usize,
    pub today: String,
    pub selected: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedView {
    pub id: ViewId,
    pub title: &'static str,
    pub outcome: ViewOutcome,
    /// Intake view only: (pending, pending and unscheduled).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intake_counts: Option<(usize, usize)>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub filters: FilterState,
    pub summary: Summary,
    pub views: Vec<RenderedView>,
    /// Management view gaps; admins only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<PendingWork>,
    pub dropped_rows: usize,
}

/// Result of one render cycle.
#[derive(Debug, Serialize)]
#[allow(clippy::large_enum_variant)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum DashboardResult {
    LoginRequired {
        failed: bool,
    },
    Success {
        data: DashboardData,
    },
    /// No dated rows. The intake view still reports pending rows, which
    /// are often undated.
    Empty {
        message: String,
        filters: FilterState,
        #[serde(skip_serializing_if = "Option::is_none")]
        intake: Option<RenderedView>,
    },
    Error {
        error: UserFacingError,
    },
}

const EMPTY_MESSAGE: &str = "No rows match the current filters. Try another store or date range.";

/// Attach canonical dates for this cycle.
pub fn date_records<'a>(dataset: &'a Dataset, reference_year: i32) -> Vec<DatedRecord<'a>> {
    let visit = dataset.schema.position(ColumnRole::VisitDate);
    dataset
        .records
        .iter()
        .map(|record| DatedRecord {
            record,
            date: dates::normalize(record.cell(visit), reference_year),
        })
        .collect()
}

/// Build the dashboard for an authenticated identity over `dataset`.
pub fn build_dashboard(ctx: &CycleContext<'_>, dataset: &Dataset) -> DashboardResult {
    let dated = date_records(dataset, ctx.today.year());
    let store_position = dataset.schema.position(ColumnRole::Store);

    let offered = allowed_partitions(ctx.identity, &dataset.partitions());
    let selected = effective_choice(&offered, ctx.selection.partition.as_ref());

    let in_partition = pipeline::partition_filter(&dated, store_position, &selected);
    let bounds = pipeline::date_bounds(&in_partition);
    // A disjoint request is kept as-is so it selects nothing.
    let range = bounds.and_then(|b| ctx.selection.range.map(|r| r.clamp_to(b).unwrap_or(r)));

    let filters = FilterState {
        identity: ctx.identity.name.clone(),
        options: offered.iter().map(|c| c.label().to_string()).collect(),
        selected_label: selected.label().to_string(),
        selected: selected.clone(),
        bounds,
        range,
    };

    // Partition only; independent of the date range and of dated rows.
    let intake = (selected != PartitionChoice::NoAccess)
        .then(|| intake_view(&dated, dataset, &selected, &ctx.config.intake_status));

    let rows = pipeline::filter(&dated, store_position, &selected, range, true);
    if rows.is_empty() {
        return DashboardResult::Empty {
            message: EMPTY_MESSAGE.to_string(),
            filters,
            intake,
        };
    }

    let summary = Summary {
        total: rows.len(),
        today_count: rows.iter().filter(|r| r.date == Some(ctx.today)).count(),
        today: ctx.today.format("%m-%d").to_string(),
        selected: selected.label().to_string(),
    };

    let is_admin = ctx.identity.is_admin();
    let views: Vec<RenderedView> = views::views_for(is_admin)
        .into_iter()
        .filter_map(|def: &ViewDef| match def.scope {
            ViewScope::Dated => Some(RenderedView {
                id: def.id,
                title: def.title,
                outcome: views::project(&rows, def, dataset),
                intake_counts: None,
            }),
            ViewScope::Intake => intake.clone(),
        })
        .collect();

    // Gaps are only actionable while the management view can be shown.
    let management_ready = views
        .iter()
        .any(|v| v.id == ViewId::Management && matches!(v.outcome, ViewOutcome::Ready(_)));
    let pending = management_ready.then(|| {
        views::pending_work(
            views::missing_field_counts(&rows, &MANAGEMENT_VIEW, dataset),
            rows.len(),
        )
    });

    DashboardResult::Success {
        data: DashboardData {
            filters,
            summary,
            views,
            pending,
            dropped_rows: dataset.dropped_rows,
        },
    }
}

fn intake_view(
    dated: &[DatedRecord<'_>],
    dataset: &Dataset,
    selected: &PartitionChoice,
    status: &str,
) -> RenderedView {
    let IntakeReport {
        view,
        pending,
        unscheduled,
    } = views::intake_report(dated, dataset, selected, status);
    RenderedView {
        id: INTAKE_VIEW.id,
        title: INTAKE_VIEW.title,
        outcome: view,
        intake_counts: Some((pending, unscheduled)),
    }
}

/// Run one cycle for `session`: gate on login, read the cached feed, build.
///
/// Every failure is turned into a displayable result here.
pub fn run_cycle(state: &AppState, session: &Session, today: NaiveDate) -> DashboardResult {
    let Some(identity) = session.identity() else {
        return DashboardResult::LoginRequired {
            failed: session.login_failed(),
        };
    };

    let started = std::time::Instant::now();
    let result = match state.dataset() {
        Ok(dataset) => {
            let ctx = CycleContext {
                identity,
                selection: &session.selection,
                config: &state.config,
                today,
            };
            build_dashboard(&ctx, &dataset)
        }
        Err(e) => error_result(&e),
    };
    log::debug!("Render cycle took {}ms", started.elapsed().as_millis());
    result
}

pub fn error_result(err: &DashboardError) -> DashboardResult {
    log::warn!("Render cycle failed: {}", err);
    DashboardResult::Error {
        error: UserFacingError::from(err),
    }
}
