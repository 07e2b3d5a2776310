use std::collections::HashMap;

use uuid::Uuid;

use crate::models::{
    project_from_path, ObjectMap, ObjectMetadata, Payload, ProgressRecord, ProjectRow,
    ProjectStatus, ResultRecord,
};

const ADMIN_SELECTION: &str = "admin_selection";

/// Row identity: object id, then path, then a fresh placeholder so records
/// without either never merge with each other.
pub fn identity_key(object_id: Option<i64>, path: Option<&str>) -> String {
    match (object_id, path.filter(|p| !p.is_empty())) {
        (Some(id), _) => format!("id:{id}"),
        (None, Some(path)) => format!("path:{path}"),
        (None, None) => format!("placeholder:{}", Uuid::new_v4()),
    }
}

/// Admin selections only pass from grade 1 up; everything else needs a
/// grade above zero.
pub fn result_status(grade: Option<f64>, kind: Option<&str>) -> ProjectStatus {
    let Some(grade) = grade else {
        return ProjectStatus::Unknown;
    };
    let is_admin_selection = kind.is_some_and(|k| k.eq_ignore_ascii_case(ADMIN_SELECTION));
    let passed = if is_admin_selection { grade >= 1.0 } else { grade > 0.0 };
    if passed {
        ProjectStatus::Pass
    } else {
        ProjectStatus::Fail
    }
}

fn progress_status(grade: Option<f64>) -> ProjectStatus {
    match grade {
        None => ProjectStatus::InProgress,
        Some(g) if g > 0.0 => ProjectStatus::Pass,
        Some(_) => ProjectStatus::Fail,
    }
}

fn display_name(object: Option<&ObjectMetadata>, path: Option<&str>) -> String {
    object
        .and_then(|o| o.name.clone())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| project_from_path(path))
}

fn object_kind(object: Option<&ObjectMetadata>) -> Option<String> {
    object.and_then(|o| o.kind.clone()).filter(|kind| !kind.is_empty())
}

/// One row per project, newest activity first. Results are trusted to be
/// newest-first, so only the first result per identity is kept; progress
/// fills in rows without a finished outcome.
pub fn reconcile(
    results: &[ResultRecord],
    progress: &[ProgressRecord],
    metadata: &ObjectMap,
) -> Vec<ProjectRow> {
    let mut rows: Vec<ProjectRow> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for result in results {
        let key = identity_key(result.object_id, result.path.as_deref());
        if index.contains_key(&key) {
            continue;
        }

        let object = result.object_id.and_then(|id| metadata.get(&id));
        index.insert(key.clone(), rows.len());
        rows.push(ProjectRow {
            key,
            name: display_name(object, result.path.as_deref()),
            kind: object_kind(object)
                .or_else(|| result.kind.clone().filter(|k| !k.is_empty()))
                .unwrap_or_else(|| "-".to_string()),
            object_id: result.object_id,
            status: result_status(result.grade, result.kind.as_deref()),
            last_activity: result.created_at,
        });
    }

    for record in progress {
        let key = identity_key(record.object_id, record.path.as_deref());
        let object = record.object_id.and_then(|id| metadata.get(&id));
        let name = display_name(object, record.path.as_deref());
        let touched = record.updated_at.or(record.created_at);

        match index.get(&key).copied() {
            Some(position) => {
                let row = &mut rows[position];
                if row.status == ProjectStatus::Unknown {
                    row.status = progress_status(record.grade);
                }
                row.name = name;
                if let Some(kind) = object_kind(object) {
                    row.kind = kind;
                }
                row.object_id = row.object_id.or(record.object_id);
                row.last_activity = touched.or(row.last_activity);
            }
            None => {
                index.insert(key.clone(), rows.len());
                rows.push(ProjectRow {
                    key,
                    name,
                    kind: object_kind(object).unwrap_or_else(|| "-".to_string()),
                    object_id: record.object_id,
                    status: progress_status(record.grade),
                    last_activity: touched,
                });
            }
        }
    }

    rows.retain(|row| !row.name.is_empty());
    let activity = |row: &ProjectRow| row.last_activity.map(|t| t.timestamp_millis()).unwrap_or(0);
    rows.sort_by(|a, b| activity(b).cmp(&activity(a)));
    rows
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassFail {
    pub passed: usize,
    pub failed: usize,
}

impl PassFail {
    /// Percentage of passes, 0 when nothing was graded.
    pub fn pass_rate(&self) -> f64 {
        let total = self.passed + self.failed;
        if total == 0 {
            0.0
        } else {
            self.passed as f64 / total as f64 * 100.0
        }
    }
}

/// Pass/fail counts from the server's filtered project lists, or from raw
/// results when both lists are empty.
pub fn pass_fail_counts(payload: &Payload) -> PassFail {
    let counts = PassFail {
        passed: payload.passed_projects.len(),
        failed: payload.failed_projects.len(),
    };
    if counts.passed > 0 || counts.failed > 0 {
        return counts;
    }

    payload
        .results
        .iter()
        .filter_map(|r| r.grade)
        .fold(PassFail::default(), |mut acc, grade| {
            if grade > 0.0 {
                acc.passed += 1;
            } else if grade == 0.0 {
                acc.failed += 1;
            }
            acc
        })
}
