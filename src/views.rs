//! Static report views and the projector that fills them.

use serde::Serialize;

use crate::access::PartitionChoice;
use crate::dates::format_canonical;
use crate::pipeline::{self, FilteredRow};
use crate::types::{ColumnRole, Dataset, DatedRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewId {
    Schedule,
    Results,
    Management,
    Intake,
}

/// Which row set a view is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewScope {
    /// Partition + validity + range filtered.
    Dated,
    /// Partition filtered only, restricted to the intake status.
    Intake,
}

#[derive(Debug, Clone, Copy)]
pub struct ViewDef {
    pub id: ViewId,
    pub title: &'static str,
    pub columns: &'static [ColumnRole],
    pub scope: ViewScope,
    pub admin_only: bool,
}

pub const SCHEDULE_VIEW: ViewDef = ViewDef {
    id: ViewId::Schedule,
    title: "Schedule",
    columns: &[
        ColumnRole::VisitDate,
        ColumnRole::VisitTime,
        ColumnRole::Name,
        ColumnRole::Headcount,
        ColumnRole::ParticipationType,
        ColumnRole::ApplicationLink,
        ColumnRole::Contact,
    ],
    scope: ViewScope::Dated,
    admin_only: false,
};

pub const RESULTS_VIEW: ViewDef = ViewDef {
    id: ViewId::Results,
    title: "Visit results",
    columns: &[
        ColumnRole::VisitDate,
        ColumnRole::ReviewLink,
        ColumnRole::Headcount,
        ColumnRole::Remarks,
        ColumnRole::PhotoLink,
        ColumnRole::ExtraLink,
    ],
    scope: ViewScope::Dated,
    admin_only: false,
};

pub const MANAGEMENT_VIEW: ViewDef = ViewDef {
    id: ViewId::Management,
    title: "Management",
    columns: &[
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
    ],
    scope: ViewScope::Dated,
    admin_only: true,
};

pub const INTAKE_VIEW: ViewDef = ViewDef {
    id: ViewId::Intake,
    title: "Intake",
    columns: &[
        ColumnRole::IntakeDate,
        ColumnRole::Name,
        ColumnRole::Store,
        ColumnRole::ParticipationType,
        ColumnRole::Status,
        ColumnRole::VisitDate,
    ],
    scope: ViewScope::Intake,
    admin_only: false,
};

pub const ALL_VIEWS: &[ViewDef] = &[SCHEDULE_VIEW, RESULTS_VIEW, MANAGEMENT_VIEW, INTAKE_VIEW];

/// Views offered to an identity, in display order.
pub fn views_for(is_admin: bool) -> Vec<&'static ViewDef> {
    ALL_VIEWS
        .iter()
        .filter(|v| is_admin || !v.admin_only)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Cell {
    Empty,
    Text(String),
    /// URL exposed as a clickable reference.
    Link(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectedRow {
    pub ordinal: usize,
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Projection {
    pub headers: Vec<String>,
    pub rows: Vec<ProjectedRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ViewOutcome {
    Ready(Projection),
    /// The feed lacks some of the view's columns.
    Unavailable { missing: Vec<usize> },
}

/// Positions of `def`'s columns that the dataset does not have.
fn missing_positions(def: &ViewDef, dataset: &Dataset) -> Vec<usize> {
    def.columns
        .iter()
        .map(|role| dataset.schema.position(*role))
        .filter(|pos| *pos >= dataset.column_count())
        .collect()
}

/// Select `def`'s columns from each row, in order.
///
/// The visit-date column shows the canonical date when one exists.
pub fn project(rows: &[FilteredRow<'_>], def: &ViewDef, dataset: &Dataset) -> ViewOutcome {
    let missing = missing_positions(def, dataset);
    if !missing.is_empty() {
        log::warn!("View {:?} unavailable, missing columns {:?}", def.id, missing);
        return ViewOutcome::Unavailable { missing };
    }

    let headers = def
        .columns
        .iter()
        .map(|role| dataset.header(dataset.schema.position(*role)).to_string())
        .collect();

    let rows = rows
        .iter()
        .map(|row| ProjectedRow {
            ordinal: row.ordinal,
            cells: def
                .columns
                .iter()
                .map(|role| {
                    if *role == ColumnRole::VisitDate {
                        if let Some(date) = row.date {
                            return Cell::Text(format_canonical(date));
                        }
                    }
                    match row.record.cell(dataset.schema.position(*role)) {
                        None => Cell::Empty,
                        Some(value) if role.is_link() => Cell::Link(value.to_string()),
                        Some(value) => Cell::Text(value.to_string()),
                    }
                })
                .collect(),
        })
        .collect();

    ViewOutcome::Ready(Projection { headers, rows })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingCount {
    pub position: usize,
    pub header: String,
    pub count: usize,
}

/// Per column of `def`, how many rows have no value there.
///
/// Columns the feed does not have are skipped; they are reported by
/// `project` as unavailable, not as gaps.
pub fn missing_field_counts(
    rows: &[FilteredRow<'_>],
    def: &ViewDef,
    dataset: &Dataset,
) -> Vec<MissingCount> {
    def.columns
        .iter()
        .map(|role| dataset.schema.position(*role))
        .filter(|position| *position < dataset.column_count())
        .map(|position| {
            MissingCount {
                position,
                header: dataset.header(position).to_string(),
                count: rows
                    .iter()
                    .filter(|r| r.record.cell(position).is_none())
                    .count(),
            }
        })
        .collect()
}

/// The "pending work" indicator built from missing-field counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "columns", rename_all = "camelCase")]
pub enum PendingWork {
    /// Columns with at least one gap.
    Pending(Vec<MissingCount>),
    AllComplete,
    NoRows,
}

pub fn pending_work(counts: Vec<MissingCount>, row_count: usize) -> PendingWork {
    if row_count == 0 {
        return PendingWork::NoRows;
    }
    let pending: Vec<MissingCount> = counts.into_iter().filter(|c| c.count > 0).collect();
    if pending.is_empty() {
        PendingWork::AllComplete
    } else {
        PendingWork::Pending(pending)
    }
}

/// Intake rows: partition filtered, not date filtered, status == `status`.
#[derive(Debug, Clone)]
pub struct IntakeReport {
    pub view: ViewOutcome,
    pub pending: usize,
    /// Pending rows that also have no canonical date.
    pub unscheduled: usize,
}

pub fn intake_report(
    records: &[DatedRecord<'_>],
    dataset: &Dataset,
    choice: &PartitionChoice,
    status: &str,
) -> IntakeReport {
    let status_position = dataset.schema.position(ColumnRole::Status);
    let store_position = dataset.schema.position(ColumnRole::Store);

    let waiting: Vec<DatedRecord<'_>> = records
        .iter()
        .filter(|r| r.record.cell(status_position) == Some(status))
        .copied()
        .collect();
    let rows = pipeline::filter(&waiting, store_position, choice, None, false);
    let unscheduled = rows.iter().filter(|r| r.date.is_none()).count();

    IntakeReport {
        view: project(&rows, &INTAKE_VIEW, dataset),
        pending: rows.len(),
        unscheduled,
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::types::{Record, Schema};

    fn dataset(width: usize, rows: Vec<Vec<&str>>) -> Dataset {
        Dataset {
            headers: (0..width).map(|i| format!("h{}", i)).collect(),
            schema: Schema::default(),
            records: rows.into_iter().map(Record::from_cells).collect(),
            dropped_rows: 0,
        }
    }

    fn row18(fill: &[(usize, &'static str)]) -> Vec<&'static str> {
        let mut cells = vec![""; 18];
        for (pos, value) in fill {
            cells[*pos] = value;
        }
        cells
    }

    fn filtered<'a>(ds: &'a Dataset, dates: &[Option<NaiveDate>]) -> Vec<FilteredRow<'a>> {
        ds.records
            .iter()
            .zip(dates)
            .enumerate()
            .map(|(i, (record, date))| FilteredRow {
                ordinal: i + 1,
                record,
                date: *date,
            })
            .collect()
    }

    #[test]
    fn test_views_for_roles() {
        let admin: Vec<ViewId> = views_for(true).iter().map(|v| v.id).collect();
        assert_eq!(
            admin,
            vec![ViewId::Schedule, ViewId::Results, ViewId::Management, ViewId::Intake]
        );
        let staff: Vec<ViewId> = views_for(false).iter().map(|v| v.id).collect();
        assert!(!staff.contains(&ViewId::Management));
    }

    #[test]
    fn test_default_positions_match_sheet_layout() {
        let schema = Schema::default();
        let positions: Vec<usize> = SCHEDULE_VIEW
            .columns
            .iter()
            .map(|r| schema.position(*r))
            .collect();
        assert_eq!(positions, vec![8, 9, 2, 10, 4, 5, 6]);
        let positions: Vec<usize> = RESULTS_VIEW
            .columns
            .iter()
            .map(|r| schema.position(*r))
            .collect();
        assert_eq!(positions, vec![8, 14, 10, 17, 15, 16]);
        let positions: Vec<usize> = MANAGEMENT_VIEW
            .columns
            .iter()
            .map(|r| schema.position(*r))
            .collect();
        assert_eq!(positions, (8..=17).collect::<Vec<_>>());
    }

    #[test]
    fn test_project_links_and_canonical_date() {
        let ds = dataset(
            18,
            vec![row18(&[(8, "10/2"), (2, "Kim"), (5, "https://example.com/a")])],
        );
        let date = NaiveDate::from_ymd_opt(2025, 10, 2);
        let rows = filtered(&ds, &[date]);
        let ViewOutcome::Ready(p) = project(&rows, &SCHEDULE_VIEW, &ds) else {
            panic!("schedule view should be ready");
        };
        assert_eq!(p.headers[0], "h8");
        let cells = &p.rows[0].cells;
        assert_eq!(cells[0], Cell::Text("2025-10-02".into()));
        assert_eq!(cells[2], Cell::Text("Kim".into()));
        assert_eq!(cells[5], Cell::Link("https://example.com/a".into()));
        assert_eq!(cells[6], Cell::Empty);
    }

    #[test]
    fn test_project_degrades_when_columns_missing() {
        let ds = dataset(17, vec![vec![""; 17]]);
        let rows = filtered(&ds, &[None]);
        assert_eq!(
            project(&rows, &RESULTS_VIEW, &ds),
            ViewOutcome::Unavailable { missing: vec![17] }
        );
        assert!(matches!(
            project(&rows, &SCHEDULE_VIEW, &ds),
            ViewOutcome::Ready(_)
        ));
    }

    #[test]
    fn test_missing_counts_and_pending_work() {
        let full: Vec<(usize, &str)> = (8..=17).map(|p| (p, "x")).collect();
        let mut gap = full.clone();
        gap.retain(|(p, _)| *p != 12 && *p != 14);
        let ds = dataset(18, vec![row18(&full), row18(&gap), row18(&gap)]);
        let rows = filtered(&ds, &[None, None, None]);

        let counts = missing_field_counts(&rows, &MANAGEMENT_VIEW, &ds);
        assert_eq!(counts.len(), 10);
        let gaps: Vec<(usize, usize)> = counts
            .iter()
            .filter(|c| c.count > 0)
            .map(|c| (c.position, c.count))
            .collect();
        assert_eq!(gaps, vec![(12, 2), (14, 2)]);

        match pending_work(counts, rows.len()) {
            PendingWork::Pending(cols) => assert_eq!(cols.len(), 2),
            other => panic!("expected pending, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_counts_skip_columns_feed_lacks() {
        let full: Vec<String> = (0..17).map(|p| format!("v{}", p)).collect();
        let ds = dataset(17, vec![full.iter().map(String::as_str).collect()]);
        let rows = filtered(&ds, &[None]);

        let counts = missing_field_counts(&rows, &MANAGEMENT_VIEW, &ds);
        assert_eq!(counts.len(), 9);
        assert!(counts.iter().all(|c| c.position < 17 && c.count == 0));
        assert_eq!(pending_work(counts, 1), PendingWork::AllComplete);
    }

    #[test]
    fn test_pending_work_all_complete_and_no_rows() {
        let full: Vec<(usize, &str)> = (8..=17).map(|p| (p, "x")).collect();
        let ds = dataset(18, vec![row18(&full)]);
        let rows = filtered(&ds, &[None]);
        let counts = missing_field_counts(&rows, &MANAGEMENT_VIEW, &ds);
        assert_eq!(pending_work(counts, 1), PendingWork::AllComplete);
        assert_eq!(pending_work(Vec::new(), 0), PendingWork::NoRows);
    }

    #[test]
    fn test_intake_report_counts_unscheduled() {
        let ds = dataset(
            18,
            vec![
                row18(&[(3, "A"), (7, "안내 대기"), (8, "10/2")]),
                row18(&[(3, "A"), (7, "안내 대기")]),
                row18(&[(3, "B"), (7, "안내 대기")]),
                row18(&[(3, "A"), (7, "완료"), (8, "10/3")]),
            ],
        );
        let d = NaiveDate::from_ymd_opt(2025, 10, 2);
        let dated: Vec<DatedRecord<'_>> = ds
            .records
            .iter()
            .zip([d, None, None, d])
            .map(|(record, date)| DatedRecord { record, date })
            .collect();

        let report = intake_report(&dated, &ds, &PartitionChoice::Store("A".into()), "안내 대기");
        assert_eq!(report.pending, 2);
        assert_eq!(report.unscheduled, 1);

        let all = intake_report(&dated, &ds, &PartitionChoice::All, "안내 대기");
        assert_eq!(all.pending, 3);
        assert_eq!(all.unscheduled, 2);

        let none = intake_report(&dated, &ds, &PartitionChoice::NoAccess, "안내 대기");
        assert_eq!(none.pending, 0);
    }
}
