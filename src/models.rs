use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::lenient;

/// Object metadata keyed by backend object id.
pub type ObjectMap = HashMap<i64, ObjectMetadata>;

/// Which slice of the profile a command needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataMode {
    Full,
    Transactions,
    Projects,
}

impl DataMode {
    pub fn as_str(self) -> &'static str {
        match self {
            DataMode::Full => "full",
            DataMode::Transactions => "transactions",
            DataMode::Projects => "projects",
        }
    }

    /// Table pages render once from cache and skip the network.
    pub fn is_interactive(self) -> bool {
        !matches!(self, DataMode::Full)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(default, deserialize_with = "lenient::number")]
    pub amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default, rename = "type")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient::id")]
    pub object_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    #[serde(default, deserialize_with = "lenient::id")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient::id")]
    pub object_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub grade: Option<f64>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    #[serde(default, deserialize_with = "lenient::id")]
    pub object_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub grade: Option<f64>,
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AmountRow {
    #[serde(default, deserialize_with = "lenient::number")]
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, deserialize_with = "lenient::id")]
    pub id: Option<i64>,
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub campus: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub audit_ratio: Option<f64>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub discord_login: Option<String>,
    #[serde(default, deserialize_with = "lenient::id")]
    pub github_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    #[serde(default, deserialize_with = "lenient::id")]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// Decoded core query response. Every list is empty when the query variant
/// that produced it did not select the field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    #[serde(default, deserialize_with = "lenient::list")]
    pub user: Vec<UserProfile>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub nested_check: Vec<Value>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub levels: Vec<AmountRow>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub transactions: Vec<Transaction>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub audits_done: Vec<Transaction>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub audits_received: Vec<Transaction>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub top_projects: Vec<Transaction>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub skills: Vec<Transaction>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub results: Vec<ResultRecord>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub passed_projects: Vec<ResultRecord>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub failed_projects: Vec<ResultRecord>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub progress: Vec<ProgressRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xps_total: Option<Vec<AmountRow>>,
}

/// A result of one optional enrichment query.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadPatch {
    XpsTotal(Vec<AmountRow>),
    NestedCheck(Vec<Value>),
}

impl Payload {
    /// Merges a patch by field. Applying the same patch twice is a no-op.
    pub fn apply(&mut self, patch: PayloadPatch) {
        match patch {
            PayloadPatch::XpsTotal(rows) => self.xps_total = Some(rows),
            PayloadPatch::NestedCheck(rows) => self.nested_check = rows,
        }
    }

    pub fn level(&self) -> Option<f64> {
        self.levels.first().and_then(|row| row.amount)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProjectStatus {
    Pass,
    Fail,
    InProgress,
    Unknown,
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProjectStatus::Pass => "Pass",
            ProjectStatus::Fail => "Fail",
            ProjectStatus::InProgress => "In progress",
            ProjectStatus::Unknown => "-",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectRow {
    pub key: String,
    pub name: String,
    pub kind: String,
    pub object_id: Option<i64>,
    pub status: ProjectStatus,
    pub last_activity: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkillRow {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct XpTotals {
    pub total: f64,
    pub daily: f64,
    pub weekly: f64,
    pub monthly: f64,
}

/// Last non-empty path segment, ignoring any query string.
pub fn project_from_path(path: Option<&str>) -> String {
    let Some(path) = path else {
        return "Unknown".to_string();
    };
    let clean = path.split('?').next().unwrap_or_default();
    clean
        .split('/')
        .filter(|segment| !segment.is_empty())
        .last()
        .map(str::to_string)
        .unwrap_or_else(|| "Unknown".to_string())
}
