//! Writes one XML report per processed test document.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::Result;
use crate::escape::{escape_attr, escape_text};
use crate::executor::SuiteOutcome;
use crate::fsutil::write_atomic;
use crate::ns::XSPEC_NS;

pub struct ReportWriter {
    report_dir: PathBuf,
    base_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(report_dir: impl Into<PathBuf>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            report_dir: report_dir.into(),
            base_dir: base_dir.into(),
        }
    }

    /// Report path for a source document: `<stem>-result.xml` under the
    /// report directory, mirroring the source's directories relative to
    /// the base so same-named suites in different places never collide.
    pub fn report_path(&self, source: &Path) -> PathBuf {
        let mut dir = self.report_dir.clone();
        // sources outside the base directory fall back to a flat name
        if let Ok(relative) = source.strip_prefix(&self.base_dir) {
            if let Some(parent) = relative.parent() {
                if !parent.as_os_str().is_empty() {
                    dir = dir.join(parent);
                }
            }
        }
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "xspec".to_string());
        dir.join(format!("{}-result.xml", stem))
    }

    pub fn write(&self, source: &Path, outcome: &SuiteOutcome) -> Result<PathBuf> {
        let path = self.report_path(source);
        write_atomic(&path, self.render(source, outcome).as_bytes())?;
        Ok(path)
    }

    fn render(&self, source: &Path, outcome: &SuiteOutcome) -> String {
        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        let _ = writeln!(
            out,
            "<report xmlns=\"{}\" source=\"{}\" date=\"{}\" passed=\"{}\">",
            XSPEC_NS,
            escape_attr(&source.display().to_string()),
            Utc::now().to_rfc3339(),
            outcome.passed()
        );
        for scenario in &outcome.scenarios {
            let _ = writeln!(
                out,
                "  <scenario label=\"{}\">",
                escape_attr(&scenario.label)
            );
            for assertion in &scenario.assertions {
                match &assertion.detail {
                    Some(detail) => {
                        let _ = writeln!(
                            out,
                            "    <test label=\"{}\" successful=\"{}\">{}</test>",
                            escape_attr(&assertion.label),
                            assertion.passed,
                            escape_text(detail)
                        );
                    }
                    None => {
                        let _ = writeln!(
                            out,
                            "    <test label=\"{}\" successful=\"{}\"/>",
                            escape_attr(&assertion.label),
                            assertion.passed
                        );
                    }
                }
            }
            out.push_str("  </scenario>\n");
        }
        out.push_str("</report>\n");
        out
    }
}
