use std::collections::HashMap;

use crate::models::{project_from_path, SkillRow, Transaction};

const SKILL_PREFIX: &str = "skill_";
pub const MAX_SKILLS: usize = 12;

fn skill_name(record: &Transaction) -> String {
    let from_type = record
        .category
        .as_deref()
        .map(|kind| kind.replacen(SKILL_PREFIX, "", 1))
        .filter(|name| !name.is_empty());
    if let Some(name) = from_type {
        return name;
    }
    match record.path.as_deref() {
        Some(path) if !path.is_empty() => project_from_path(Some(path)),
        _ => "skill".to_string(),
    }
}

/// Current mastery per skill: the highest value seen for each name, ranked
/// and cut to the top twelve.
pub fn rank_skills(records: &[Transaction]) -> Vec<SkillRow> {
    let mut best: HashMap<String, f64> = HashMap::new();

    for record in records {
        let Some(amount) = record.amount.filter(|a| a.is_finite() && *a > 0.0) else {
            continue;
        };
        let entry = best.entry(skill_name(record)).or_insert(0.0);
        *entry = entry.max(amount);
    }

    let mut skills: Vec<SkillRow> = best
        .into_iter()
        .map(|(name, value)| SkillRow { name, value })
        .collect();
    skills.sort_by(|a, b| {
        b.value
            .partial_cmp(&a.value)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });
    skills.truncate(MAX_SKILLS);
    skills
}
