//! Plain-text rendering of a render cycle for the terminal.

use std::fmt::Write;

use crate::dashboard::{DashboardData, DashboardResult, FilterState, RenderedView};
use crate::dates::format_canonical;
use crate::views::{Cell, PendingWork, Projection, ViewId, ViewOutcome};

const LINK_LABEL: &str = "link";

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Emit OSC 8 hyperlinks; otherwise print the URL itself.
    pub hyperlinks: bool,
}

pub fn render(result: &DashboardResult, opts: RenderOptions) -> String {
    let mut out = String::new();
    match result {
        DashboardResult::LoginRequired { failed } => {
            out.push_str("Restricted access. Sign in with: login <username>\n");
            if *failed {
                out.push_str("Login failed: invalid username or password.\n");
            }
        }
        DashboardResult::Error { error } => {
            let _ = writeln!(out, "Error: {}", error.message);
            let _ = writeln!(out, "  {}", error.recovery_suggestion);
        }
        DashboardResult::Empty {
            message,
            filters,
            intake,
        } => {
            render_filters(&mut out, filters);
            let _ = writeln!(out, "\n{}", message);
            if let Some(view) = intake {
                render_view(&mut out, view, None, opts);
            }
        }
        DashboardResult::Success { data } => render_data(&mut out, data, opts),
    }
    out
}

fn render_filters(out: &mut String, filters: &FilterState) {
    let _ = writeln!(out, "Signed in as {}", filters.identity);
    let _ = writeln!(
        out,
        "Store: {}   (options: {})",
        filters.selected_label,
        filters.options.join(" | ")
    );
    if let Some(bounds) = filters.bounds {
        let shown = filters.range.unwrap_or(bounds);
        let _ = writeln!(
            out,
            "Dates: {} .. {}   (available {} .. {})",
            format_canonical(shown.start),
            format_canonical(shown.end),
            format_canonical(bounds.start),
            format_canonical(bounds.end)
        );
    }
}

fn render_data(out: &mut String, data: &DashboardData, opts: RenderOptions) {
    render_filters(out, &data.filters);
    if data.dropped_rows > 0 {
        let _ = writeln!(out, "({} malformed row(s) skipped)", data.dropped_rows);
    }

    let s = &data.summary;
    let _ = writeln!(
        out,
        "\nSummary: {} rows | today ({}): {} | store: {}",
        s.total, s.today, s.today_count, s.selected
    );

    for view in &data.views {
        render_view(out, view, data.pending.as_ref(), opts);
    }
}

fn render_view(
    out: &mut String,
    view: &RenderedView,
    pending: Option<&PendingWork>,
    opts: RenderOptions,
) {
    let _ = writeln!(out, "\n--- {} ---", view.title);

    if view.id == ViewId::Management {
        match pending {
            Some(PendingWork::Pending(columns)) => {
                for col in columns {
                    let _ = writeln!(out, "! {} missing: {} row(s)", col.header, col.count);
                }
            }
            Some(PendingWork::AllComplete) => {
                out.push_str("All fields are filled in. Nothing pending.\n");
            }
            Some(PendingWork::NoRows) | None => {}
        }
    }

    if let Some((pending, unscheduled)) = view.intake_counts {
        let _ = writeln!(
            out,
            "Awaiting notice: {} ({} without a visit date)",
            pending, unscheduled
        );
    }

    match &view.outcome {
        ViewOutcome::Unavailable { missing } => {
            let _ = writeln!(
                out,
                "Insufficient columns for this view (missing positions {:?}).",
                missing
            );
        }
        ViewOutcome::Ready(projection) if projection.rows.is_empty() => {
            out.push_str("(no rows)\n");
        }
        ViewOutcome::Ready(projection) => render_table(out, projection, opts),
    }
}

/// Text shown for a cell, and its visible width.
fn cell_text(cell: &Cell, opts: RenderOptions) -> (String, usize) {
    match cell {
        Cell::Empty => (String::new(), 0),
        Cell::Text(value) => (value.clone(), value.chars().count()),
        Cell::Link(url) if opts.hyperlinks => (
            format!("\x1b]8;;{}\x1b\\{}\x1b]8;;\x1b\\", url, LINK_LABEL),
            LINK_LABEL.len(),
        ),
        Cell::Link(url) => (url.clone(), url.chars().count()),
    }
}

fn render_table(out: &mut String, projection: &Projection, opts: RenderOptions) {
    let mut header = vec![("#".to_string(), 1)];
    header.extend(
        projection
            .headers
            .iter()
            .map(|h| (h.clone(), h.chars().count())),
    );

    let body: Vec<Vec<(String, usize)>> = projection
        .rows
        .iter()
        .map(|row| {
            let ordinal = row.ordinal.to_string();
            let width = ordinal.len();
            std::iter::once((ordinal, width))
                .chain(row.cells.iter().map(|c| cell_text(c, opts)))
                .collect()
        })
        .collect();

    let mut widths: Vec<usize> = header.iter().map(|(_, w)| *w).collect();
    for row in &body {
        for (i, (_, w)) in row.iter().enumerate() {
            if let Some(max) = widths.get_mut(i) {
                *max = (*max).max(*w);
            }
        }
    }

    write_row(out, &header, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "{}", rule.join("-+-"));
    for row in &body {
        write_row(out, row, &widths);
    }
}

fn write_row(out: &mut String, cells: &[(String, usize)], widths: &[usize]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|((text, width), max)| format!("{}{}", text, " ".repeat(max - width)))
        .collect();
    let _ = writeln!(out, "{}", line.join(" | ").trim_end());
}
