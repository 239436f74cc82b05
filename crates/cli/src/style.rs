//! Console styling for mergeval output.

use console::Style;

use mergeval_core::models::{MergeReport, ReportOutcome};

/// Create a success-styled string (green with checkmark).
pub fn success(msg: &str) -> String {
    let style = Style::new().green();
    format!("{} {}", style.apply_to("✓"), msg)
}

/// Create an error-styled string (red with cross).
pub fn error(msg: &str) -> String {
    let style = Style::new().red();
    format!("{} {}", style.apply_to("✗"), msg)
}

/// Create a header-styled string (bold, white).
pub fn header(msg: &str) -> String {
    let style = Style::new().bold();
    style.apply_to(msg).to_string()
}

/// Create a dim-styled string.
pub fn dim(msg: &str) -> String {
    let style = Style::new().dim();
    style.apply_to(msg).to_string()
}

/// One-line summary of a tool run: marker, tool, branch pair, elapsed time.
pub fn outcome(report: &MergeReport) -> String {
    let (marker, style) = match report.outcome {
        ReportOutcome::Clean => ("●", Style::new().green()),
        ReportOutcome::Conflict => ("●", Style::new().yellow()),
        ReportOutcome::DirectoryError | ReportOutcome::SetupError => ("✗", Style::new().red()),
    };
    format!(
        "{} {} {} {} ← {} {}",
        style.apply_to(marker),
        style.apply_to(report.outcome).bold(),
        header(&report.tool),
        report.branch1,
        report.branch2,
        dim(&format!("({} ms, exit {})", report.duration_ms, report.exit_code)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::Duration;

    use chrono::Utc;
    use mergeval_core::merge::MergeOutcome;
    use mergeval_core::MergeError;

    fn report(result: Result<MergeOutcome, MergeError>) -> MergeReport {
        MergeReport::from_result(
            "ort",
            "gitmerge_ort",
            Path::new("/tmp/clone"),
            "main",
            "feature",
            &result,
            Utc::now(),
            Duration::from_millis(7),
        )
    }

    #[test]
    fn test_outcome_line_names_result_and_branches() {
        console::set_colors_enabled(false);
        let line = outcome(&report(Ok(MergeOutcome::Conflict { exit_code: 1 })));
        assert_eq!(line, "● conflict ort main ← feature (7 ms, exit 1)");

        let line = outcome(&report(Err(MergeError::DirectoryError {
            path: "/tmp/clone".into(),
            detail: "no such directory".into(),
        })));
        assert!(line.starts_with("✗ directory_error ort"));
        assert!(line.ends_with("exit 2)"));
    }
}
