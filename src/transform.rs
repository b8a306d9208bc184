//! Reshaping helpers shared by the pages: canonical orderings, ratios,
//! bucket partitions and number formatting.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::FrameError;
use crate::frame::Frame;

// =============================================================================
// Canonical orderings
// =============================================================================

pub const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

pub const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Sorts rows by the position of their `column` label in `order`.
///
/// Labels missing from `order` (or non-text cells) sort after every known
/// label and keep their relative order.
pub fn reorder_canonical(frame: &Frame, column: &str, order: &[&str]) -> Result<Frame, FrameError> {
    let idx = frame.column_index(column)?;
    frame.sorted_by_rank(|f, i| {
        let label = f.rows()[i][idx].as_str();
        Ok(label
            .and_then(|l| order.iter().position(|o| *o == l))
            .unwrap_or(order.len()))
    })
}

// =============================================================================
// Ratios
// =============================================================================

/// `part` out of `total`, with an explicit answer for a zero total.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ratio {
    pub part: f64,
    pub total: f64,
}

impl Ratio {
    pub fn new(part: f64, total: f64) -> Self {
        Self { part, total }
    }

    /// Percentage of the total, `None` when the total is zero.
    pub fn percent(&self) -> Option<f64> {
        if self.total == 0.0 {
            None
        } else {
            Some(self.part / self.total * 100.0)
        }
    }

    pub fn percent_label(&self, precision: usize) -> String {
        match self.percent() {
            Some(p) => format!("{:.*}%", precision, p),
            None => "N/A".to_string(),
        }
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} / {} ({})",
            fmt_count(self.part),
            fmt_count(self.total),
            self.percent_label(2)
        )
    }
}

fn fmt_count(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{:.0}", v)
    } else {
        format!("{:.2}", v)
    }
}

// =============================================================================
// Partitions
// =============================================================================

/// Rows grouped under the key `classify` assigns them.
///
/// Every row lands in exactly one bucket; buckets keep first-seen order.
pub fn partition<K, F>(frame: &Frame, mut classify: F) -> Result<Vec<(K, Frame)>, FrameError>
where
    K: PartialEq,
    F: FnMut(&Frame, usize) -> Result<K, FrameError>,
{
    let mut keys: Vec<K> = Vec::new();
    let mut members: Vec<Vec<usize>> = Vec::new();
    for i in 0..frame.len() {
        let key = classify(frame, i)?;
        match keys.iter().position(|k| *k == key) {
            Some(b) => members[b].push(i),
            None => {
                keys.push(key);
                members.push(vec![i]);
            }
        }
    }
    let mut out = Vec::with_capacity(keys.len());
    for (key, rows) in keys.into_iter().zip(members) {
        let bucket = frame.filter(|_, i| Ok(rows.contains(&i)))?;
        out.push((key, bucket));
    }
    Ok(out)
}

/// Sum of `value_col` over the bucket keyed `key`, zero when absent.
pub fn bucket_sum<K: PartialEq>(buckets: &[(K, Frame)], key: &K, value_col: &str) -> Result<f64, FrameError> {
    match buckets.iter().find(|(k, _)| k == key) {
        Some((_, frame)) => frame.sum(value_col),
        None => Ok(0.0),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityLevel {
    Occasional,
    Active,
}

impl ActivityLevel {
    pub const OCCASIONAL_RANGES: [&'static str; 2] = ["1-5 reviews", "6-10 reviews"];

    /// Users with at most ten reviews are occasional; every other range,
    /// unknown labels included, counts as active.
    pub fn from_range(label: &str) -> Self {
        if Self::OCCASIONAL_RANGES.contains(&label) {
            ActivityLevel::Occasional
        } else {
            ActivityLevel::Active
        }
    }
}

/// Label of the harshest severity bucket, the one quoted in the users page.
pub const VERY_SEVERE: &str = "Très sévère (≤1.5★)";

fn star_bound() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(≤|<=|>=|>|<)\s*(\d+(?:[.,]\d+)?)\s*★").expect("static regex"))
}

/// Star bound of a severity label: `Très sévère (≤1.5★)` gives `(1.5, false)`,
/// `(>3.5★)` gives `(3.5, true)`. The flag marks a lower bound.
pub fn severity_bound(label: &str) -> Option<(f64, bool)> {
    let caps = star_bound().captures(label)?;
    let stars = caps[2].replace(',', ".").parse::<f64>().ok()?;
    let lower = caps[1].starts_with('>');
    Some((stars, lower))
}

/// Severity buckets from harshest to most lenient, by the star bound in
/// their labels. Labels without a bound keep their order at the end.
pub fn order_by_severity(frame: &Frame, column: &str) -> Result<Frame, FrameError> {
    let idx = frame.column_index(column)?;
    frame.sorted_by_rank(|f, i| {
        let bound = f.rows()[i][idx].as_str().and_then(severity_bound);
        Ok(match bound {
            Some((stars, lower)) => (stars * 100.0).round().max(0.0) as usize * 2 + lower as usize,
            None => usize::MAX,
        })
    })
}

/// Value of `value_col` on the row whose `label_col` equals `label`,
/// wherever that row sits. Zero when no row carries the label.
pub fn bucket_value(frame: &Frame, label_col: &str, label: &str, value_col: &str) -> Result<f64, FrameError> {
    frame.column_index(value_col)?;
    match frame.find(label_col, label)? {
        Some(row) => frame.f64_at(row, value_col),
        None => Ok(0.0),
    }
}

// =============================================================================
// Formatting
// =============================================================================

/// Integer with comma thousands separators: `1234567` → `1,234,567`.
pub fn fmt_thousands(v: i64) -> String {
    let digits = v.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if v < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn fmt_fixed(v: f64, precision: usize) -> String {
    format!("{:.*}", precision, v)
}

/// Fraction rendered as a percentage: `0.1234` → `12.34%`.
pub fn fmt_percent(fraction: f64, precision: usize) -> String {
    format!("{:.*}%", precision, fraction * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Scalar;

    fn labels(frame: &Frame, col: &str) -> Vec<String> {
        (0..frame.len())
            .map(|i| frame.str_at(i, col).unwrap().to_string())
            .collect()
    }

    fn months(names: &[&str]) -> Frame {
        Frame::from_rows(
            &["month_name", "avg_stars"],
            names.iter().map(|m| vec![(*m).into(), 3.0.into()]).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_months_reordered() {
        let f = months(&["March", "January", "December", "April"]);
        let sorted = reorder_canonical(&f, "month_name", &MONTHS).unwrap();
        assert_eq!(labels(&sorted, "month_name"), vec!["January", "March", "April", "December"]);
    }

    #[test]
    fn test_reorder_idempotent() {
        let f = months(&["Sunday", "Monday", "Friday", "Wednesday"]);
        let once = reorder_canonical(&f, "month_name", &WEEKDAYS).unwrap();
        let twice = reorder_canonical(&once, "month_name", &WEEKDAYS).unwrap();
        assert_eq!(once, twice);
        let canonical = months(&WEEKDAYS);
        assert_eq!(reorder_canonical(&canonical, "month_name", &WEEKDAYS).unwrap(), canonical);
    }

    #[test]
    fn test_unknown_labels_sort_last() {
        let f = months(&["Smarch", "February", "Octember", "January"]);
        let sorted = reorder_canonical(&f, "month_name", &MONTHS).unwrap();
        assert_eq!(
            labels(&sorted, "month_name"),
            vec!["January", "February", "Smarch", "Octember"]
        );
    }

    #[test]
    fn test_reorder_missing_column() {
        let f = months(&["May"]);
        assert!(reorder_canonical(&f, "day_name", &WEEKDAYS).is_err());
    }

    #[test]
    fn test_ratio_display() {
        let r = Ratio::new(120.0, 1000.0);
        assert_eq!(r.to_string(), "120 / 1000 (12.00%)");
        assert_eq!(r.percent(), Ratio::new(120.0, 1000.0).percent());
    }

    #[test]
    fn test_ratio_zero_total() {
        let r = Ratio::new(0.0, 0.0);
        assert_eq!(r.percent(), None);
        assert_eq!(r.to_string(), "0 / 0 (N/A)");
        assert_eq!(r.percent_label(1), "N/A");
    }

    #[test]
    fn test_partition_exhaustive_and_disjoint() {
        let f = Frame::from_rows(
            &["review_range", "nb_users"],
            vec![
                vec!["1-5 reviews".into(), 500.into()],
                vec!["6-10 reviews".into(), 200.into()],
                vec!["11-50 reviews".into(), 250.into()],
                vec!["50+ reviews".into(), 50.into()],
                vec![Scalar::Null, 7.into()],
            ],
        )
        .unwrap();
        let buckets = partition(&f, |f, i| {
            Ok(ActivityLevel::from_range(f.value(i, "review_range")?.as_str().unwrap_or("")))
        })
        .unwrap();
        let sizes: usize = buckets.iter().map(|(_, b)| b.len()).sum();
        assert_eq!(sizes, f.len());
        assert_eq!(buckets.len(), 2);
        assert_eq!(bucket_sum(&buckets, &ActivityLevel::Occasional, "nb_users").unwrap(), 700.0);
        assert_eq!(bucket_sum(&buckets, &ActivityLevel::Active, "nb_users").unwrap(), 307.0);
    }

    #[test]
    fn test_bucket_value_ignores_order() {
        let rows = vec![
            vec!["Mild".into(), 500.into()],
            vec!["Moderate".into(), 300.into()],
            vec!["Sévère (≤2.5★)".into(), 150.into()],
            vec![VERY_SEVERE.into(), 50.into()],
        ];
        let forward = Frame::from_rows(&["severity_category", "nb_users"], rows.clone()).unwrap();
        let reversed =
            Frame::from_rows(&["severity_category", "nb_users"], rows.into_iter().rev().collect()).unwrap();
        let label = VERY_SEVERE;
        assert_eq!(bucket_value(&forward, "severity_category", label, "nb_users").unwrap(), 50.0);
        assert_eq!(bucket_value(&reversed, "severity_category", label, "nb_users").unwrap(), 50.0);
        assert_eq!(forward.sum("nb_users").unwrap(), 1000.0);
    }

    #[test]
    fn test_severity_bound_parsing() {
        assert_eq!(severity_bound(VERY_SEVERE), Some((1.5, false)));
        assert_eq!(severity_bound("Indulgent (>3.5★)"), Some((3.5, true)));
        assert_eq!(severity_bound("Sévère (<= 2,5★)"), Some((2.5, false)));
        assert_eq!(severity_bound("Mild"), None);
    }

    #[test]
    fn test_order_by_severity() {
        let f = Frame::from_rows(
            &["severity_category", "nb_users"],
            vec![
                vec!["Other".into(), 1.into()],
                vec!["Indulgent (>3.5★)".into(), 400.into()],
                vec!["Modéré (≤3.5★)".into(), 300.into()],
                vec![VERY_SEVERE.into(), 50.into()],
                vec!["Sévère (≤2.5★)".into(), 150.into()],
            ],
        )
        .unwrap();
        let sorted = order_by_severity(&f, "severity_category").unwrap();
        let labels: Vec<&str> = (0..sorted.len())
            .map(|i| sorted.str_at(i, "severity_category").unwrap())
            .collect();
        assert_eq!(
            labels,
            vec![VERY_SEVERE, "Sévère (≤2.5★)", "Modéré (≤3.5★)", "Indulgent (>3.5★)", "Other"]
        );
    }

    #[test]
    fn test_bucket_value_missing_label_is_zero() {
        let f = Frame::from_rows(&["severity_category", "nb_users"], vec![vec!["Mild".into(), 5.into()]]).unwrap();
        assert_eq!(bucket_value(&f, "severity_category", "Sévère (≤2.5★)", "nb_users").unwrap(), 0.0);
        assert!(bucket_value(&f, "severity_category", "Mild", "users").is_err());
    }

    #[test]
    fn test_formatting() {
        assert_eq!(fmt_thousands(0), "0");
        assert_eq!(fmt_thousands(999), "999");
        assert_eq!(fmt_thousands(1000), "1,000");
        assert_eq!(fmt_thousands(1234567), "1,234,567");
        assert_eq!(fmt_thousands(-45000), "-45,000");
        assert_eq!(fmt_fixed(2.456, 1), "2.5");
        assert_eq!(fmt_percent(0.1234, 2), "12.34%");
    }
}
