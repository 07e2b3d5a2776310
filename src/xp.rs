use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::models::{project_from_path, AmountRow, ObjectMap, Payload, Transaction, XpTotals};

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectXp {
    pub name: String,
    pub amount: f64,
}

/// XP transactions with a usable amount.
fn xp_only(transactions: &[Transaction]) -> impl Iterator<Item = (&Transaction, f64)> {
    transactions
        .iter()
        .filter(|t| t.category.as_deref() == Some("xp"))
        .filter_map(|t| t.amount.filter(|a| a.is_finite()).map(|amount| (t, amount)))
}

fn is_exam_or_exercise(transaction: &Transaction, metadata: &ObjectMap) -> bool {
    let kind = transaction
        .object_id
        .and_then(|id| metadata.get(&id))
        .and_then(|object| object.kind.as_deref())
        .map(str::to_lowercase)
        .unwrap_or_default();
    kind.contains("exercise") || kind.contains("exam")
}

/// Total XP plus rolling day/week/month windows.
///
/// The total skips exam and exercise XP when metadata makes that possible,
/// and is replaced outright by a positive `override_sum`. The windows always
/// count every XP transaction that has a timestamp.
pub fn aggregate(
    transactions: &[Transaction],
    metadata: &ObjectMap,
    override_sum: Option<f64>,
    now: DateTime<Utc>,
) -> XpTotals {
    let xp: Vec<(&Transaction, f64)> = xp_only(transactions).collect();

    let can_use_metadata = !metadata.is_empty() && xp.iter().any(|(t, _)| t.object_id.is_some());
    let computed: f64 = xp
        .iter()
        .filter(|(t, _)| !can_use_metadata || !is_exam_or_exercise(t, metadata))
        .map(|(_, amount)| amount)
        .sum();

    let total = match override_sum {
        Some(sum) if sum.is_finite() && sum > 0.0 => sum,
        _ => computed,
    };

    let window = |span: Duration| -> f64 {
        xp.iter()
            .filter(|(t, _)| t.created_at.is_some_and(|at| now - at < span))
            .map(|(_, amount)| amount)
            .sum()
    };

    XpTotals {
        total,
        daily: window(Duration::days(1)),
        weekly: window(Duration::days(7)),
        monthly: window(Duration::days(30)),
    }
}

/// Sum of the alternate XP source, if it is present and positive.
pub fn override_sum_from(rows: Option<&[AmountRow]>) -> Option<f64> {
    let rows = rows.filter(|rows| !rows.is_empty())?;
    let sum: f64 = rows.iter().filter_map(|row| row.amount).sum();
    (sum.is_finite() && sum > 0.0).then_some(sum)
}

/// Aggregates a payload with the metadata resolved for it.
pub fn aggregate_payload(payload: &Payload, metadata: &ObjectMap, now: DateTime<Utc>) -> XpTotals {
    aggregate(
        &payload.transactions,
        metadata,
        override_sum_from(payload.xps_total.as_deref()),
        now,
    )
}

/// Top ten projects by XP. The server's pre-filtered list wins when present;
/// otherwise XP transactions are grouped by project name.
pub fn xp_by_project(payload: &Payload) -> Vec<ProjectXp> {
    if !payload.top_projects.is_empty() {
        return payload
            .top_projects
            .iter()
            .take(10)
            .map(|t| ProjectXp {
                name: project_from_path(t.path.as_deref()),
                amount: t.amount.unwrap_or(0.0),
            })
            .collect();
    }

    let mut grouped: HashMap<String, f64> = HashMap::new();
    for (t, amount) in xp_only(&payload.transactions) {
        *grouped.entry(project_from_path(t.path.as_deref())).or_insert(0.0) += amount;
    }

    let mut projects: Vec<ProjectXp> = grouped
        .into_iter()
        .map(|(name, amount)| ProjectXp { name, amount })
        .collect();
    projects.sort_by(|a, b| {
        b.amount
            .partial_cmp(&a.amount)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });
    projects.truncate(10);
    projects
}

/// Time-ascending XP points for the over-time chart.
pub fn xp_timeline(transactions: &[Transaction]) -> Vec<(DateTime<Utc>, f64)> {
    let mut points: Vec<(DateTime<Utc>, f64)> = xp_only(transactions)
        .filter_map(|(t, amount)| t.created_at.map(|at| (at, amount)))
        .collect();
    points.sort_by_key(|(at, _)| *at);
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ObjectMetadata;

    fn sample_xp(amount: f64, days_ago: i64, object_id: Option<i64>) -> Transaction {
        Transaction {
            amount: Some(amount),
            created_at: Some(Utc::now() - Duration::days(days_ago) - Duration::hours(1)),
            path: Some(format!("/bahrain/bh-module/project-{amount}")),
            category: Some("xp".to_string()),
            object_id,
        }
    }

    fn object(id: i64, kind: &str) -> (i64, ObjectMetadata) {
        (
            id,
            ObjectMetadata {
                id: Some(id),
                name: Some(format!("object-{id}")),
                kind: Some(kind.to_string()),
            },
        )
    }

    #[test]
    fn string_and_number_amounts_sum_without_metadata() {
        let transactions: Vec<Transaction> = serde_json::from_value(serde_json::json!([
            { "amount": "500", "type": "xp", "createdAt": "2026-01-01T00:00:00Z" },
            { "amount": 1500, "type": "xp", "createdAt": "2026-01-01T00:00:00Z" }
        ]))
        .unwrap();

        let totals = aggregate(&transactions, &ObjectMap::new(), None, Utc::now());
        assert_eq!(totals.total, 2000.0);
    }

    #[test]
    fn empty_input_is_all_zero() {
        let totals = aggregate(&[], &ObjectMap::new(), None, Utc::now());
        assert_eq!(totals, XpTotals::default());
    }

    #[test]
    fn non_xp_and_unusable_amounts_are_ignored() {
        let mut audit = sample_xp(999.0, 0, None);
        audit.category = Some("up".to_string());
        let mut broken = sample_xp(0.0, 0, None);
        broken.amount = None;
        let transactions = vec![sample_xp(10.0, 0, None), audit, broken];

        let totals = aggregate(&transactions, &ObjectMap::new(), None, Utc::now());
        assert_eq!(totals.total, 10.0);
        assert_eq!(totals.daily, 10.0);
    }

    #[test]
    fn exams_and_exercises_leave_total_but_stay_in_windows() {
        let metadata: ObjectMap = [object(1, "Exam"), object(2, "EXERCISE"), object(3, "project")]
            .into_iter()
            .collect();
        let transactions = vec![
            sample_xp(100.0, 0, Some(1)),
            sample_xp(200.0, 3, Some(2)),
            sample_xp(400.0, 10, Some(3)),
            sample_xp(800.0, 40, Some(99)),
            sample_xp(1600.0, 40, None),
        ];

        let totals = aggregate(&transactions, &metadata, None, Utc::now());
        assert_eq!(totals.total, 400.0 + 800.0 + 1600.0);
        assert_eq!(totals.daily, 100.0);
        assert_eq!(totals.weekly, 300.0);
        assert_eq!(totals.monthly, 700.0);
    }

    #[test]
    fn metadata_is_ignored_when_no_transaction_has_an_id() {
        let metadata: ObjectMap = [object(1, "exam")].into_iter().collect();
        let transactions = vec![sample_xp(100.0, 0, None), sample_xp(50.0, 0, None)];
        let totals = aggregate(&transactions, &metadata, None, Utc::now());
        assert_eq!(totals.total, 150.0);
    }

    #[test]
    fn override_replaces_total_only() {
        let transactions = vec![sample_xp(100.0, 0, None)];
        let totals = aggregate(&transactions, &ObjectMap::new(), Some(5000.0), Utc::now());
        assert_eq!(totals.total, 5000.0);
        assert_eq!(totals.daily, 100.0);

        let ignored = aggregate(&transactions, &ObjectMap::new(), Some(0.0), Utc::now());
        assert_eq!(ignored.total, 100.0);
    }

    #[test]
    fn override_sum_needs_positive_rows() {
        let rows = vec![AmountRow { amount: Some(300.0) }, AmountRow { amount: None }];
        assert_eq!(override_sum_from(Some(&rows)), Some(300.0));
        assert_eq!(override_sum_from(Some(&[])), None);
        assert_eq!(override_sum_from(Some(&[AmountRow { amount: Some(0.0) }])), None);
        assert_eq!(override_sum_from(None), None);
    }

    #[test]
    fn undated_transactions_count_toward_total_only() {
        let mut undated = sample_xp(70.0, 0, None);
        undated.created_at = None;
        let totals = aggregate(&[undated], &ObjectMap::new(), None, Utc::now());
        assert_eq!(totals.total, 70.0);
        assert_eq!(totals.monthly, 0.0);
    }

    #[test]
    fn project_grouping_falls_back_to_transactions() {
        let mut again = sample_xp(5.0, 1, None);
        again.path = Some("/bahrain/bh-module/project-10".to_string());
        let payload = Payload {
            transactions: vec![sample_xp(10.0, 0, None), sample_xp(20.0, 0, None), again],
            ..Default::default()
        };

        let projects = xp_by_project(&payload);
        assert_eq!(
            projects,
            vec![
                ProjectXp { name: "project-20".to_string(), amount: 20.0 },
                ProjectXp { name: "project-10".to_string(), amount: 15.0 },
            ]
        );
    }

    #[test]
    fn server_top_projects_take_precedence() {
        let payload = Payload {
            top_projects: vec![sample_xp(7.0, 0, None)],
            transactions: vec![sample_xp(10.0, 0, None)],
            ..Default::default()
        };
        assert_eq!(xp_by_project(&payload)[0].name, "project-7");
    }

    #[test]
    fn timeline_is_oldest_first() {
        let points = xp_timeline(&[sample_xp(1.0, 0, None), sample_xp(2.0, 5, None)]);
        assert_eq!(points.iter().map(|(_, a)| *a).collect::<Vec<_>>(), vec![2.0, 1.0]);
    }
}
