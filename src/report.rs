use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::format::{format_date, format_grade, format_xp, format_xp_stat};
use crate::models::ProjectRow;
use crate::summary::{Activity, AuditEntry, DashboardSummary};

fn display_name(summary: &DashboardSummary) -> &str {
    summary
        .profile
        .iter()
        .find(|(label, _)| *label == "Login")
        .map(|(_, value)| value.as_str())
        .unwrap_or("unknown learner")
}

/// Terminal rendering of the profile page.
pub fn render_summary(summary: &DashboardSummary) -> String {
    let mut output = String::new();

    if summary.profile.is_empty() {
        let _ = writeln!(output, "Info: No data");
    } else {
        let width = summary.profile.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
        for (label, value) in &summary.profile {
            let _ = writeln!(output, "{label:<width$}  {value}");
        }
    }

    let totals = &summary.totals;
    let _ = writeln!(output);
    let _ = writeln!(output, "Total XP    {}", format_xp_stat(totals.total));
    let _ = writeln!(output, "Last 24h    {}", format_xp_stat(totals.daily));
    let _ = writeln!(output, "Last 7 days {}", format_xp_stat(totals.weekly));
    let _ = writeln!(output, "Last 30 days {}", format_xp_stat(totals.monthly));
    let _ = writeln!(output, "Total Transactions: {}", summary.xp_transaction_count);

    let pass_fail = summary.pass_fail;
    let _ = writeln!(
        output,
        "Pass Rate: {:.1}% ({}:{})",
        pass_fail.pass_rate(),
        pass_fail.passed,
        pass_fail.failed
    );
    let audits = summary.audits;
    let _ = writeln!(
        output,
        "Audits: ratio {} (Done: {} • Received: {})",
        audits.ratio_label(),
        audits.done_count,
        audits.received_count
    );

    let _ = writeln!(output);
    match summary.skills.first() {
        Some(top) => {
            let _ = writeln!(output, "Top skill: {} ({:.1}%)", top.name, top.value);
            for skill in &summary.skills {
                let _ = writeln!(output, "  {:<20} {:.1}%", skill.name, skill.value);
            }
        }
        None => {
            let _ = writeln!(output, "No skills found yet");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "Projects: {}", summary.top_projects.len());
    for project in &summary.top_projects {
        let _ = writeln!(output, "  {:<24} {}", project.name, format_xp(project.amount));
    }

    output
}

fn write_audits(output: &mut String, entries: &[AuditEntry], label: &str) {
    if entries.is_empty() {
        let _ = writeln!(output, "No audits {label} found");
        return;
    }
    for entry in entries {
        let _ = writeln!(
            output,
            "  {}  {:<24} XP: {}",
            format_date(Some(entry.at)),
            entry.name,
            entry.xp_label()
        );
    }
    let _ = writeln!(output, "Showing latest {} audits", entries.len());
}

pub fn render_activity(activity: &Activity) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "Recent projects");
    if activity.projects.is_empty() {
        let _ = writeln!(output, "No recent projects found");
    } else {
        for entry in &activity.projects {
            let xp = entry.xp.map(format_xp_stat).unwrap_or_else(|| "—".to_string());
            let _ = writeln!(
                output,
                "  {}  {:<24} {:<12} Grade: {} • XP: {}",
                format_date(entry.last_activity()),
                entry.name,
                entry.status().to_string(),
                format_grade(entry.effective_grade(), None),
                xp
            );
        }
        let _ = writeln!(output, "Showing latest {} projects", activity.projects.len());
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "Audits done");
    write_audits(&mut output, &activity.audits_done, "done");

    let _ = writeln!(output);
    let _ = writeln!(output, "Audits received");
    write_audits(&mut output, &activity.audits_received, "received");

    output
}

pub fn build_report(
    summary: &DashboardSummary,
    activity: &Activity,
    projects: &[ProjectRow],
    generated_at: DateTime<Utc>,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Learner Dashboard Report");
    let _ = writeln!(
        output,
        "Generated for {} on {}",
        display_name(summary),
        format_date(Some(generated_at))
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Profile");
    if summary.profile.is_empty() {
        let _ = writeln!(output, "No profile data returned.");
    } else {
        for (label, value) in &summary.profile {
            let _ = writeln!(output, "- {label}: {value}");
        }
    }

    let totals = &summary.totals;
    let _ = writeln!(output);
    let _ = writeln!(output, "## XP");
    let _ = writeln!(output, "- Total: {}", format_xp_stat(totals.total));
    let _ = writeln!(
        output,
        "- Last 24h / 7 days / 30 days: {} / {} / {}",
        format_xp_stat(totals.daily),
        format_xp_stat(totals.weekly),
        format_xp_stat(totals.monthly)
    );
    let _ = writeln!(
        output,
        "- Pass rate: {:.1}% ({} passed, {} failed)",
        summary.pass_fail.pass_rate(),
        summary.pass_fail.passed,
        summary.pass_fail.failed
    );
    let _ = writeln!(
        output,
        "- Audit ratio: {} ({} done, {} received)",
        summary.audits.ratio_label(),
        summary.audits.done_count,
        summary.audits.received_count
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Projects by XP");
    if summary.top_projects.is_empty() {
        let _ = writeln!(output, "No XP recorded yet.");
    } else {
        for project in &summary.top_projects {
            let _ = writeln!(output, "- {}: {}", project.name, format_xp(project.amount));
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Skills");
    if summary.skills.is_empty() {
        let _ = writeln!(output, "No skills found yet.");
    } else {
        for skill in &summary.skills {
            let _ = writeln!(output, "- {}: {:.1}%", skill.name, skill.value);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Projects");
    if projects.is_empty() {
        let _ = writeln!(output, "No projects found.");
    } else {
        let _ = writeln!(output, "| Project | Type | Status | Last activity |");
        let _ = writeln!(output, "|---|---|---|---|");
        for row in projects.iter().take(20) {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} |",
                row.name,
                row.kind,
                row.status,
                format_date(row.last_activity)
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Activity");
    if activity.projects.is_empty() {
        let _ = writeln!(output, "No recent projects found.");
    } else {
        for entry in &activity.projects {
            let _ = writeln!(
                output,
                "- {} ({}) on {}",
                entry.name,
                entry.status(),
                format_date(entry.last_activity())
            );
        }
    }

    output
}
