use std::fmt::Write;

use super::{Report, ReportRow};

pub(super) const CSV_HEADER: &str =
    "timestamp,activity,score,tier,duration_seconds,detail,message";

pub(super) fn text(report: &Report) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "BIOMETRIC HEALTH MONITOR REPORT");
    let _ = writeln!(out, "--------------------------------------");
    let _ = writeln!(
        out,
        "Date Generated: {}",
        report.generated_at.format("%Y-%m-%d %H:%M:%S")
    );
    out.push('\n');

    let _ = writeln!(out, "Analysis Summary:");
    for summary in &report.summary.activities {
        let name = summary.kind.display_name();
        let _ = writeln!(out, "- Total {name} Checks: {}", summary.count);
        match summary.tier() {
            Some(tier) => {
                let _ = writeln!(
                    out,
                    "- Average {name} Risk Score: {:.2} ({tier})",
                    summary.average_score
                );
            }
            None => {
                let _ = writeln!(out, "- Average {name} Risk Score: 0.00");
            }
        }
    }
    out.push('\n');

    if report.rows.is_empty() {
        let _ = writeln!(out, "No sessions recorded.");
    } else {
        let _ = writeln!(out, "Sessions:");
        for row in &report.rows {
            text_row(&mut out, row);
        }
    }
    out
}

fn text_row(out: &mut String, row: &ReportRow) {
    let _ = writeln!(
        out,
        "[{}] {} | score {:.2} ({}) | {}",
        row.timestamp, row.activity, row.score, row.tier, row.detail
    );
    if !row.message.is_empty() {
        let _ = writeln!(out, "    {}", row.message);
    }
}

pub(super) fn csv(report: &Report) -> String {
    let mut out = String::new();
    out.push_str(CSV_HEADER);
    out.push('\n');

    for row in &report.rows {
        let fields = [
            csv_escape(&row.timestamp),
            csv_escape(&row.activity),
            format!("{:.2}", row.score),
            row.tier.as_str().to_string(),
            row.duration_seconds.to_string(),
            csv_escape(&row.detail),
            csv_escape(&row.message),
        ];
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

fn csv_escape(s: &str) -> String {
    let needs_quote = s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r');
    if !needs_quote {
        return s.to_string();
    }
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_only_when_needed() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a, b"), "\"a, b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
