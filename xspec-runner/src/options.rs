use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Free-form environment properties handed to the runner alongside the
/// runner options.
pub type EnvironmentProperties = BTreeMap<String, String>;

/// Where the runner reads and writes relative to a base directory.
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    pub base_dir: PathBuf,
    pub report_dir: PathBuf,
    pub report_resource_dir: PathBuf,
    pub catalog_path: PathBuf,
}

impl RunnerOptions {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let report_dir = base_dir.join("target").join("xspec-reports");
        let report_resource_dir = report_dir.join("resources");
        let catalog_path = base_dir
            .join("target")
            .join("xspec")
            .join("xspec-catalog.xml");
        Self {
            base_dir,
            report_dir,
            report_resource_dir,
            catalog_path,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

/// Processor behavior knobs, passed to `XSpecRunner::init`.
#[derive(Debug, Clone, Default)]
pub struct ProcessorOptions {
    /// Log each scenario as it executes.
    pub trace: bool,
    /// Requested validation mode; recorded, not yet acted on.
    pub validation: Option<String>,
    /// Serialization parameters for report output.
    pub serialization: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_derive_from_base() {
        let options = RunnerOptions::new("/project");
        assert_eq!(options.report_dir, Path::new("/project/target/xspec-reports"));
        assert_eq!(
            options.report_resource_dir,
            Path::new("/project/target/xspec-reports/resources")
        );
        assert_eq!(
            options.catalog_path,
            Path::new("/project/target/xspec/xspec-catalog.xml")
        );
    }
}
