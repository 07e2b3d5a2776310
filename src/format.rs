use chrono::{DateTime, Utc};

/// Precise XP with base-1000 units: `950 B`, `12.3 kB`, `1.25 MB`.
pub fn format_xp(xp: f64) -> String {
    if xp >= 1_000_000.0 {
        format!("{:.2} MB", xp / 1_000_000.0)
    } else if xp >= 1_000.0 {
        format!("{:.1} kB", xp / 1_000.0)
    } else {
        format!("{} B", xp.round())
    }
}

/// Coarse XP for headline stats; kilobytes are rounded to the nearest 10.
pub fn format_xp_stat(xp: f64) -> String {
    let xp = if xp.is_finite() { xp.round() } else { 0.0 };
    if xp >= 1_000_000.0 {
        return format_xp(xp);
    }
    if xp >= 1_000.0 {
        let kb = (xp / 1_000.0).round();
        return format!("{} kB", (kb / 10.0).round() * 10.0);
    }
    format!("{xp} B")
}

pub fn format_grade(grade: Option<f64>, scale: Option<f64>) -> String {
    let Some(grade) = grade.filter(|g| g.is_finite()) else {
        return "—".to_string();
    };
    let rounded = (grade * 10.0).round() / 10.0;
    match scale {
        Some(scale) => format!("{rounded:.1} / {scale:.1}"),
        None => format!("{rounded:.1}"),
    }
}

pub fn format_date(at: Option<DateTime<Utc>>) -> String {
    at.map(|at| at.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "—".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xp_units_follow_base_1000() {
        assert_eq!(format_xp(950.0), "950 B");
        assert_eq!(format_xp(12_345.0), "12.3 kB");
        assert_eq!(format_xp(1_250_000.0), "1.25 MB");
    }

    #[test]
    fn stat_rounds_kilobytes_to_tens() {
        assert_eq!(format_xp_stat(0.0), "0 B");
        assert_eq!(format_xp_stat(999.4), "999 B");
        assert_eq!(format_xp_stat(254_000.0), "250 kB");
        assert_eq!(format_xp_stat(256_000.0), "260 kB");
        assert_eq!(format_xp_stat(2_000_000.0), "2.00 MB");
        assert_eq!(format_xp_stat(f64::NAN), "0 B");
    }

    #[test]
    fn grades_have_one_decimal() {
        assert_eq!(format_grade(Some(1.234), None), "1.2");
        assert_eq!(format_grade(Some(0.96), Some(1.0)), "1.0 / 1.0");
        assert_eq!(format_grade(None, None), "—");
    }

    #[test]
    fn dates_are_iso_days() {
        let at = crate::lenient::parse_timestamp("2026-02-02T23:30:00Z");
        assert_eq!(format_date(at), "2026-02-02");
        assert_eq!(format_date(None), "—");
    }
}
