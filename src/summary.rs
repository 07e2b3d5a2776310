use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::format::{format_date, format_xp};
use crate::models::{
    project_from_path, ObjectMap, Payload, ProjectStatus, SkillRow, Transaction, UserProfile,
    XpTotals,
};
use crate::projects::{pass_fail_counts, PassFail};
use crate::skills::rank_skills;
use crate::xp::{aggregate_payload, xp_by_project, xp_timeline, ProjectXp};

/// Entries shown in each recent-activity list.
pub const RECENT_LIMIT: usize = 6;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AuditStats {
    pub done_count: usize,
    pub received_count: usize,
    pub done_xp: f64,
    pub received_xp: f64,
}

impl AuditStats {
    /// Done over received XP. Infinite when only done XP exists.
    pub fn ratio(&self) -> f64 {
        if self.received_xp > 0.0 {
            self.done_xp / self.received_xp
        } else if self.done_xp > 0.0 {
            f64::INFINITY
        } else {
            0.0
        }
    }

    pub fn ratio_label(&self) -> String {
        let ratio = self.ratio();
        if ratio.is_finite() {
            format!("{ratio:.2}")
        } else {
            "∞".to_string()
        }
    }
}

fn xp_sum(records: &[Transaction]) -> f64 {
    records
        .iter()
        .filter_map(|t| t.amount)
        .filter(|a| a.is_finite())
        .sum()
}

pub fn audit_stats(payload: &Payload) -> AuditStats {
    AuditStats {
        done_count: payload.audits_done.len(),
        received_count: payload.audits_received.len(),
        done_xp: xp_sum(&payload.audits_done),
        received_xp: xp_sum(&payload.audits_received),
    }
}

/// Labelled profile fields, skipping anything the backend left out.
pub fn profile_rows(user: Option<&UserProfile>, level: Option<f64>) -> Vec<(&'static str, String)> {
    let mut rows = Vec::new();
    let Some(user) = user else {
        return rows;
    };
    let mut push = |label: &'static str, value: Option<String>| {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            rows.push((label, value));
        }
    };

    push("Login", user.login.clone());
    push("User ID", user.id.map(|id| id.to_string()));
    let full_name = [user.first_name.as_deref(), user.last_name.as_deref()]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    push("Name", Some(full_name));
    push("Email", user.email.clone());
    push("Campus", user.campus.clone());
    push("Level", level.filter(|l| l.is_finite()).map(|l| format!("{l:.2}")));
    push("Audit Ratio", user.audit_ratio.map(|r| format!("{r:.3}")));
    push("GitHub ID", user.github_id.map(|id| id.to_string()));
    push("Discord", user.discord_login.clone());
    push("Created", user.created_at.map(|at| format_date(Some(at))));
    rows
}

/// Everything the summary and report views print.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSummary {
    pub profile: Vec<(&'static str, String)>,
    pub totals: XpTotals,
    pub skills: Vec<SkillRow>,
    pub pass_fail: PassFail,
    pub audits: AuditStats,
    pub top_projects: Vec<ProjectXp>,
    pub xp_transaction_count: usize,
}

pub fn summarize(payload: &Payload, metadata: &ObjectMap, now: DateTime<Utc>) -> DashboardSummary {
    DashboardSummary {
        profile: profile_rows(payload.user.first(), payload.level()),
        totals: aggregate_payload(payload, metadata, now),
        skills: rank_skills(&payload.skills),
        pass_fail: pass_fail_counts(payload),
        audits: audit_stats(payload),
        top_projects: xp_by_project(payload),
        xp_transaction_count: xp_timeline(&payload.transactions).len(),
    }
}

/// One project in the recent-activity list, merged by display name across
/// transactions, results and progress.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityEntry {
    pub name: String,
    pub xp: Option<f64>,
    pub grade: Option<f64>,
    pub progress_grade: Option<f64>,
    xp_at: Option<DateTime<Utc>>,
    result_at: Option<DateTime<Utc>>,
    progress_at: Option<DateTime<Utc>>,
}

impl ActivityEntry {
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        [self.xp_at, self.result_at, self.progress_at]
            .into_iter()
            .flatten()
            .max()
    }

    /// The result grade, else the progress grade.
    pub fn effective_grade(&self) -> Option<f64> {
        self.grade.or(self.progress_grade)
    }

    pub fn status(&self) -> ProjectStatus {
        match self.effective_grade() {
            Some(grade) if grade > 0.0 => ProjectStatus::Pass,
            Some(_) => ProjectStatus::Fail,
            None => ProjectStatus::InProgress,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub name: String,
    pub at: DateTime<Utc>,
    pub amount: f64,
}

impl AuditEntry {
    pub fn xp_label(&self) -> String {
        format_xp(self.amount)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Activity {
    pub projects: Vec<ActivityEntry>,
    pub audits_done: Vec<AuditEntry>,
    pub audits_received: Vec<AuditEntry>,
}

fn entry_for<'a>(
    entries: &'a mut Vec<ActivityEntry>,
    index: &mut HashMap<String, usize>,
    name: String,
) -> &'a mut ActivityEntry {
    let slot = *index.entry(name.clone()).or_insert_with(|| {
        entries.push(ActivityEntry {
            name,
            ..Default::default()
        });
        entries.len() - 1
    });
    &mut entries[slot]
}

/// Latest projects touched by any kind of record, newest first.
pub fn recent_projects(payload: &Payload, limit: usize) -> Vec<ActivityEntry> {
    let mut entries: Vec<ActivityEntry> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for t in &payload.transactions {
        let (Some(at), Some(amount)) = (t.created_at, t.amount) else {
            continue;
        };
        let entry = entry_for(&mut entries, &mut index, project_from_path(t.path.as_deref()));
        entry.xp = Some(amount);
        entry.xp_at = Some(at);
    }
    for r in &payload.results {
        let Some(grade) = r.grade else {
            continue;
        };
        let entry = entry_for(&mut entries, &mut index, project_from_path(r.path.as_deref()));
        entry.grade = Some(grade);
        entry.result_at = r.created_at.or(entry.result_at);
    }
    for p in &payload.progress {
        let Some(path) = p.path.as_deref() else {
            continue;
        };
        let entry = entry_for(&mut entries, &mut index, project_from_path(Some(path)));
        entry.progress_grade = p.grade;
        entry.progress_at = p.updated_at.or(entry.progress_at);
    }

    let millis = |e: &ActivityEntry| e.last_activity().map(|at| at.timestamp_millis()).unwrap_or(0);
    entries.sort_by(|a, b| millis(b).cmp(&millis(a)));
    entries.truncate(limit);
    entries
}

fn recent_audits(records: &[Transaction], limit: usize) -> Vec<AuditEntry> {
    records
        .iter()
        .filter_map(|t| {
            t.created_at.map(|at| AuditEntry {
                name: project_from_path(t.path.as_deref()),
                at,
                amount: t.amount.filter(|a| a.is_finite()).unwrap_or(0.0),
            })
        })
        .take(limit)
        .collect()
}

pub fn activity(payload: &Payload) -> Activity {
    Activity {
        projects: recent_projects(payload, RECENT_LIMIT),
        audits_done: recent_audits(&payload.audits_done, RECENT_LIMIT),
        audits_received: recent_audits(&payload.audits_received, RECENT_LIMIT),
    }
}
