use std::fmt::Write as _;
use std::io;

use chrono::{DateTime, Utc};

use crate::format::{format_date, format_xp};
use crate::models::{project_from_path, Payload, ProjectRow, ProjectStatus};

pub const PAGE_SIZE: usize = 15;

pub trait TableRow {
    const HEADERS: &'static [&'static str];

    /// Text matched by the free-text filter.
    fn search_text(&self) -> String;

    fn cells(&self) -> Vec<String>;

    fn numeric(&self) -> Option<f64> {
        None
    }

    fn time(&self) -> Option<DateTime<Utc>> {
        None
    }

    fn kind(&self) -> Option<&str> {
        None
    }

    fn status(&self) -> Option<ProjectStatus> {
        None
    }
}

/// Inclusive bounds; a missing side is open.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T> Default for Bounds<T> {
    fn default() -> Self {
        Self { min: None, max: None }
    }
}

impl<T: PartialOrd> Bounds<T> {
    pub fn contains(&self, value: &T) -> bool {
        self.min.as_ref().map_or(true, |min| value >= min)
            && self.max.as_ref().map_or(true, |max| value <= max)
    }
}

/// Unset filters pass every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    pub text: Option<String>,
    pub amount: Bounds<f64>,
    pub time: Bounds<DateTime<Utc>>,
    pub kind: Option<String>,
    pub status: Option<ProjectStatus>,
}

impl Filters {
    pub fn matches<R: TableRow>(&self, row: &R) -> bool {
        let text_ok = match self.text.as_deref().map(str::trim) {
            Some(query) if !query.is_empty() => row
                .search_text()
                .to_lowercase()
                .contains(&query.to_lowercase()),
            _ => true,
        };
        // Rows without the field compare as 0 / the epoch.
        let amount_ok = self.amount.contains(&row.numeric().unwrap_or(0.0));
        let time_ok = self
            .time
            .contains(&row.time().unwrap_or(DateTime::<Utc>::UNIX_EPOCH));
        let kind_ok = match self.kind.as_deref() {
            Some(wanted) if !wanted.is_empty() => row
                .kind()
                .is_some_and(|kind| kind.to_lowercase().contains(&wanted.to_lowercase())),
            _ => true,
        };
        let status_ok = self.status.map_or(true, |wanted| row.status() == Some(wanted));

        text_ok && amount_ok && time_ok && kind_ok && status_ok
    }
}

pub fn filter<'a, R: TableRow>(rows: &'a [R], filters: &Filters) -> Vec<&'a R> {
    rows.iter().filter(|row| filters.matches(*row)).collect()
}

/// Zero-based page of `rows`; out-of-range pages are empty.
pub fn page<T>(rows: &[T], page_size: usize, page_index: usize) -> &[T] {
    let start = page_size.saturating_mul(page_index).min(rows.len());
    let end = start.saturating_add(page_size).min(rows.len());
    &rows[start..end]
}

/// Visible row budget. Grows by whole pages on `load_more`; a filter change
/// resets it. The stored count may exceed the rows available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page_size: usize,
    visible: usize,
}

impl Pagination {
    pub fn new(page_size: usize) -> Self {
        let page_size = page_size.max(1);
        Self {
            page_size,
            visible: page_size,
        }
    }

    /// Shows `pages` more pages, saturating at `usize::MAX` rows.
    pub fn load_more(&mut self, pages: usize) {
        self.visible = self
            .visible
            .saturating_add(self.page_size.saturating_mul(pages));
    }

    pub fn reset(&mut self) {
        self.visible = self.page_size;
    }

    pub fn visible_rows<'a, T>(&self, rows: &'a [T]) -> &'a [T] {
        &rows[..self.visible.min(rows.len())]
    }

    pub fn has_more(&self, total: usize) -> bool {
        total > self.visible
    }

    pub fn count_label(&self, total: usize) -> String {
        format!("{} of {}", self.visible.min(total), total)
    }
}

/// Rows of one table with the active filters and "load more" state.
pub struct TableState<'a, R> {
    rows: &'a [R],
    matching: Vec<&'a R>,
    pagination: Pagination,
}

impl<'a, R: TableRow> TableState<'a, R> {
    pub fn new(rows: &'a [R], page_size: usize) -> Self {
        Self {
            rows,
            matching: rows.iter().collect(),
            pagination: Pagination::new(page_size),
        }
    }

    /// Re-filters the rows and drops back to the first page.
    pub fn set_filters(&mut self, filters: &Filters) {
        self.matching = filter(self.rows, filters);
        self.pagination.reset();
    }

    pub fn load_more(&mut self, pages: usize) {
        self.pagination.load_more(pages);
    }

    pub fn matching(&self) -> &[&'a R] {
        &self.matching
    }

    pub fn visible(&self) -> &[&'a R] {
        self.pagination.visible_rows(&self.matching)
    }

    pub fn has_more(&self) -> bool {
        self.pagination.has_more(self.matching.len())
    }

    pub fn count_label(&self) -> String {
        self.pagination.count_label(self.matching.len())
    }
}

/// XP transaction as shown in the transactions table.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRow {
    pub created_at: Option<DateTime<Utc>>,
    pub name: String,
    pub amount: f64,
    pub path: Option<String>,
}

impl TableRow for TransactionRow {
    const HEADERS: &'static [&'static str] = &["date", "project", "xp"];

    fn search_text(&self) -> String {
        self.name.clone()
    }

    fn cells(&self) -> Vec<String> {
        vec![format_date(self.created_at), self.name.clone(), format_xp(self.amount)]
    }

    fn numeric(&self) -> Option<f64> {
        Some(self.amount)
    }

    fn time(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
}

pub fn transaction_rows(payload: &Payload) -> Vec<TransactionRow> {
    payload
        .transactions
        .iter()
        .filter(|t| t.category.as_deref() == Some("xp"))
        .filter_map(|t| {
            t.amount.map(|amount| TransactionRow {
                created_at: t.created_at,
                name: project_from_path(t.path.as_deref()),
                amount,
                path: t.path.clone(),
            })
        })
        .collect()
}

impl TableRow for ProjectRow {
    const HEADERS: &'static [&'static str] = &["name", "type", "object id", "result", "last activity"];

    fn search_text(&self) -> String {
        format!("{} {}", self.name, self.kind)
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.kind.clone(),
            self.object_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string()),
            self.status.to_string(),
            format_date(self.last_activity),
        ]
    }

    fn time(&self) -> Option<DateTime<Utc>> {
        self.last_activity
    }

    fn kind(&self) -> Option<&str> {
        Some(self.kind.as_str())
    }

    fn status(&self) -> Option<ProjectStatus> {
        Some(self.status)
    }
}

/// Fixed-width text rendering with a header row.
pub fn render_text<R: TableRow>(rows: &[&R], empty_message: &str) -> String {
    if rows.is_empty() {
        return format!("{empty_message}\n");
    }

    let cells: Vec<Vec<String>> = rows.iter().map(|row| row.cells()).collect();
    let widths: Vec<usize> = R::HEADERS
        .iter()
        .enumerate()
        .map(|(i, header)| {
            cells
                .iter()
                .filter_map(|row| row.get(i))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut output = String::new();
    let line = |values: Vec<&str>| -> String {
        values
            .iter()
            .zip(&widths)
            .map(|(value, width)| format!("{value:<width$}", width = *width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let _ = writeln!(output, "{}", line(R::HEADERS.to_vec()));
    for row in &cells {
        let _ = writeln!(output, "{}", line(row.iter().map(String::as_str).collect()));
    }
    output
}

pub fn write_csv<W: io::Write, R: TableRow>(writer: W, rows: &[&R]) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(R::HEADERS)?;
    for row in rows {
        csv_writer.write_record(row.cells())?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn tx(name: &str, amount: f64, days_ago: i64) -> TransactionRow {
        TransactionRow {
            created_at: Some(Utc::now() - Duration::days(days_ago)),
            name: name.to_string(),
            amount,
            path: Some(format!("/a/{name}")),
        }
    }

    fn project(name: &str, kind: &str, status: ProjectStatus) -> ProjectRow {
        ProjectRow {
            key: format!("path:/a/{name}"),
            name: name.to_string(),
            kind: kind.to_string(),
            object_id: None,
            status,
            last_activity: None,
        }
    }

    #[test]
    fn unset_filters_pass_everything() {
        let rows = vec![tx("a", 1.0, 0), tx("b", 2.0, 400)];
        assert_eq!(filter(&rows, &Filters::default()).len(), 2);
    }

    #[test]
    fn text_filter_is_case_insensitive_substring() {
        let rows = vec![tx("Go-Reloaded", 1.0, 0), tx("ascii-art", 2.0, 0)];
        let filters = Filters {
            text: Some("RELOAD".to_string()),
            ..Default::default()
        };
        let matched = filter(&rows, &filters);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].name, "Go-Reloaded");
    }

    #[test]
    fn amount_and_time_ranges_are_inclusive() {
        let rows = vec![tx("a", 100.0, 1), tx("b", 200.0, 5), tx("c", 300.0, 20)];
        let filters = Filters {
            amount: Bounds { min: Some(100.0), max: Some(200.0) },
            ..Default::default()
        };
        assert_eq!(filter(&rows, &filters).len(), 2);

        let edge = rows[1].created_at.unwrap();
        let filters = Filters {
            time: Bounds { min: Some(edge), max: None },
            ..Default::default()
        };
        let names: Vec<&str> = filter(&rows, &filters).iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn project_kind_and_status_filters() {
        let rows = vec![
            project("algo", "Exam", ProjectStatus::Fail),
            project("ascii", "project", ProjectStatus::Pass),
            project("quest", "exercise", ProjectStatus::Pass),
            project("wip", "project", ProjectStatus::InProgress),
        ];
        let exams = Filters {
            kind: Some("exam".to_string()),
            ..Default::default()
        };
        assert_eq!(filter(&rows, &exams).len(), 1);

        let passed_projects = Filters {
            kind: Some("project".to_string()),
            status: Some(ProjectStatus::Pass),
            ..Default::default()
        };
        let matched = filter(&rows, &passed_projects);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].name, "ascii");

        let by_type_text = Filters {
            text: Some("exercise".to_string()),
            ..Default::default()
        };
        assert_eq!(filter(&rows, &by_type_text)[0].name, "quest");
    }

    #[test]
    fn pages_are_clamped() {
        let rows: Vec<u32> = (0..40).collect();
        assert_eq!(page(&rows, 15, 0), &rows[0..15]);
        assert_eq!(page(&rows, 15, 2), &rows[30..40]);
        assert!(page(&rows, 15, 3).is_empty());
    }

    #[test]
    fn load_more_grows_and_reset_shrinks() {
        let rows: Vec<u32> = (0..20).collect();
        let mut pagination = Pagination::new(PAGE_SIZE);
        assert_eq!(pagination.visible_rows(&rows).len(), 15);
        assert!(pagination.has_more(rows.len()));
        assert_eq!(pagination.count_label(rows.len()), "15 of 20");

        pagination.load_more(1);
        assert_eq!(pagination.visible_rows(&rows).len(), 20);
        assert!(!pagination.has_more(rows.len()));
        assert_eq!(pagination.count_label(rows.len()), "20 of 20");

        pagination.reset();
        assert_eq!(pagination, Pagination::new(PAGE_SIZE));
    }

    #[test]
    fn huge_page_counts_saturate() {
        let rows: Vec<u32> = (0..40).collect();
        let mut pagination = Pagination::new(PAGE_SIZE);
        pagination.load_more(usize::MAX);
        assert_eq!(pagination.visible_rows(&rows).len(), 40);
        assert!(!pagination.has_more(usize::MAX - 1));
        assert_eq!(pagination.count_label(rows.len()), "40 of 40");

        pagination.load_more(usize::MAX);
        assert_eq!(pagination.visible_rows(&rows).len(), 40);
    }

    #[test]
    fn filter_change_returns_to_first_page() {
        let rows: Vec<TransactionRow> = (0..40).map(|i| tx(&format!("p{i}"), i as f64, 0)).collect();
        let mut table = TableState::new(&rows, PAGE_SIZE);
        table.load_more(2);
        assert_eq!(table.visible().len(), 40);
        assert_eq!(table.count_label(), "40 of 40");

        table.set_filters(&Filters {
            amount: Bounds { min: Some(10.0), max: None },
            ..Default::default()
        });
        assert_eq!(table.matching().len(), 30);
        assert_eq!(table.visible().len(), 15);
        assert_eq!(table.visible()[0].name, "p10");
        assert!(table.has_more());
        assert_eq!(table.count_label(), "15 of 30");
    }

    #[test]
    fn transaction_rows_keep_only_valued_xp() {
        let payload: Payload = serde_json::from_value(serde_json::json!({
            "transactions": [
                { "amount": "12", "type": "xp", "path": "/a/one" },
                { "amount": "x", "type": "xp", "path": "/a/two" },
                { "amount": 5, "type": "up", "path": "/a/three" }
            ]
        }))
        .unwrap();
        let rows = transaction_rows(&payload);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "one");
    }

    #[test]
    fn text_rendering_aligns_columns() {
        let rows = vec![project("a", "project", ProjectStatus::Pass)];
        let refs: Vec<&ProjectRow> = rows.iter().collect();
        let text = render_text(&refs, "No projects found");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "name  type     object id  result  last activity");
        assert_eq!(lines[1], "a     project  -          Pass    —");
        assert_eq!(render_text::<ProjectRow>(&[], "No projects found"), "No projects found\n");
    }

    #[test]
    fn csv_export_writes_header_and_rows() {
        let rows = vec![tx("ascii-art", 1500.0, 0)];
        let refs: Vec<&TransactionRow> = rows.iter().collect();
        let mut out = Vec::new();
        write_csv(&mut out, &refs).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("date,project,xp"));
        assert!(lines.next().unwrap().ends_with(",ascii-art,1.5 kB"));
    }
}
