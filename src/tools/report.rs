//! Markdown report persistence.

use chrono::{DateTime, Local};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::ToolError;
use crate::workflow::ReportStore;

/// Name used when the caller gives us nothing to work with.
pub const FALLBACK_COMPANY_NAME: &str = "unknown_company";

/// Width of the `=` rule between header and body.
const SEPARATOR_WIDTH: usize = 80;

/// Make a company name safe for a file name.
///
/// Spaces and path separators become `_`; anything else that is not
/// alphanumeric, `_` or `-` is dropped. Applying it twice changes nothing.
pub fn sanitize_company_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            other => other,
        })
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

fn report_file_name(company_name: &str, generated_at: &DateTime<Local>) -> String {
    format!(
        "company_report_{}_{}.md",
        sanitize_company_name(company_name),
        generated_at.format("%Y%m%d_%H%M%S")
    )
}

fn render_report(company_name: &str, report_content: &str, generated_at: &DateTime<Local>) -> String {
    format!(
        "# Company Research Report: {}\n*Generated on: {}*\n\n{}\n\n{}",
        company_name,
        generated_at.format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(SEPARATOR_WIDTH),
        report_content
    )
}

/// Writes finished reports into one directory.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Persist a report; returns a success message naming the file, or an
    /// error message. Never panics, never returns `Err`.
    pub fn save(&self, report_content: &str, company_name: &str) -> String {
        if report_content.trim().is_empty() {
            return "Error: No report content provided to save".to_string();
        }

        let company_name = if company_name.trim().is_empty() {
            FALLBACK_COMPANY_NAME
        } else {
            company_name
        };

        match self.write(report_content, company_name, &Local::now()) {
            Ok(path) => {
                info!(path = %path.display(), "Report saved");
                format!("Report successfully saved to: {}", path.display())
            }
            Err(e) => {
                warn!(company = %company_name, error = %e, "Saving report failed");
                format!("Error saving report: {}", e)
            }
        }
    }

    fn write(
        &self,
        report_content: &str,
        company_name: &str,
        generated_at: &DateTime<Local>,
    ) -> Result<PathBuf, ToolError> {
        fs::create_dir_all(&self.dir)?;

        let base_name = report_file_name(company_name, generated_at);
        let document = render_report(company_name, report_content, generated_at);

        let mut attempt = 1;
        loop {
            let path = candidate_path(&self.dir, &base_name, attempt);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(document.as_bytes())?;
                    return Ok(path);
                }
                // Same company twice within one second
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

fn candidate_path(dir: &Path, base_name: &str, attempt: u32) -> PathBuf {
    if attempt == 1 {
        return dir.join(base_name);
    }
    let stem = base_name.trim_end_matches(".md");
    dir.join(format!("{}_{}.md", stem, attempt))
}

impl ReportStore for ReportWriter {
    fn save_report(&self, report_content: &str, company_name: &str) -> String {
        self.save(report_content, company_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, 11, 9, 5, 7).unwrap()
    }

    #[test]
    fn test_sanitize_company_name() {
        assert_eq!(sanitize_company_name("Acme Corp"), "Acme_Corp");
        assert_eq!(sanitize_company_name("A/B\\C"), "A_B_C");
        assert_eq!(sanitize_company_name("Ben & Jerry's, Inc."), "Ben__Jerrys_Inc");
        assert_eq!(sanitize_company_name("multi-word_name"), "multi-word_name");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let names = [
            "Acme Corp",
            "../../etc/passwd",
            "Société Générale",
            "  spaced  out  ",
            "weird*?<>|:\"chars",
            "",
        ];
        for name in names {
            let once = sanitize_company_name(name);
            assert_eq!(sanitize_company_name(&once), once, "input: {:?}", name);
        }
    }

    #[test]
    fn test_report_file_name_format() {
        assert_eq!(
            report_file_name("ACME", &fixed_time()),
            "company_report_ACME_20250611_090507.md"
        );
    }

    #[test]
    fn test_render_report_layout() {
        let doc = render_report("ACME", "Body text", &fixed_time());
        let expected = format!(
            "# Company Research Report: ACME\n*Generated on: 2025-06-11 09:05:07*\n\n{}\n\nBody text",
            "=".repeat(80)
        );
        assert_eq!(doc, expected);
    }

    #[test]
    fn test_save_writes_report_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path());

        let status = writer.save("## Summary\nAcme sells widgets.", "ACME");
        assert!(status.starts_with("Report successfully saved to: "));

        let path = PathBuf::from(status.trim_start_matches("Report successfully saved to: "));
        let file_name = path.file_name().unwrap().to_str().unwrap().to_string();
        assert!(file_name.starts_with("company_report_ACME_"));
        assert!(file_name.ends_with(".md"));

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("# Company Research Report: ACME\n"));
        assert!(contents.ends_with("\n\n## Summary\nAcme sells widgets."));
    }

    #[test]
    fn test_save_rejects_empty_content() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path());

        let status = writer.save("   \n", "ACME");
        assert_eq!(status, "Error: No report content provided to save");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_save_falls_back_on_blank_company() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path());

        let status = writer.save("content", "  ");
        assert!(status.contains("company_report_unknown_company_"));
    }

    #[test]
    fn test_save_does_not_overwrite_same_second() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path());
        let at = fixed_time();

        let first = writer.write("first", "ACME", &at).unwrap();
        let second = writer.write("second", "ACME", &at).unwrap();

        assert_ne!(first, second);
        assert!(second.to_str().unwrap().ends_with("_20250611_090507_2.md"));
        assert!(fs::read_to_string(&first).unwrap().ends_with("first"));
        assert!(fs::read_to_string(&second).unwrap().ends_with("second"));
    }

    #[test]
    fn test_save_into_unwritable_location_returns_error_string() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "file").unwrap();

        let writer = ReportWriter::new(blocker.join("reports"));
        let status = writer.save("content", "ACME");
        assert!(status.starts_with("Error saving report"));
    }
}
