//! The runner state machine. A runner is configured with resources and
//! an environment, initialized exactly once, and then processes test
//! documents in a batch.

use std::path::{Path, PathBuf};

use url::Url;

use xee_xpath::DocumentHandle;

use crate::catalog::{Catalog, CatalogEntrySource, CatalogWriter};
use crate::error::{Error, Result};
use crate::executor;
use crate::fsutil::write_atomic;
use crate::options::{EnvironmentProperties, ProcessorOptions, RunnerOptions};
use crate::report::ReportWriter;
use crate::resources::{ResourceSet, REPORT_CSS_URI};
use crate::xml::XmlContext;
use crate::xspec::load_suite;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Uninitialized,
    ResourcesSet,
    Initialized,
}

/// Batch counters. `expected` is declared up front; the other three
/// track documents as they are processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessedFiles {
    pub expected: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// A test document loaded into the runner's document pool.
#[derive(Debug)]
pub struct TestDocument {
    handle: DocumentHandle,
    path: PathBuf,
}

impl TestDocument {
    pub fn handle(&self) -> DocumentHandle {
        self.handle
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

enum Mode {
    Xslt,
    Schematron,
}

pub struct XSpecRunner {
    state: State,
    init_called: bool,
    resources: Option<ResourceSet>,
    environment: EnvironmentProperties,
    runner_options: RunnerOptions,
    catalog_sources: Vec<Box<dyn CatalogEntrySource>>,
    xml: Option<XmlContext>,
    processed: ProcessedFiles,
}

impl XSpecRunner {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            state: State::Uninitialized,
            init_called: false,
            resources: None,
            environment: EnvironmentProperties::new(),
            runner_options: RunnerOptions::new(base_dir),
            catalog_sources: Vec::new(),
            xml: None,
            processed: ProcessedFiles::default(),
        }
    }

    /// Set the resource providers. May be called again before `init`;
    /// the last set wins.
    pub fn set_resources(&mut self, resources: ResourceSet) -> Result<()> {
        if self.init_called {
            return Err(Error::AlreadyInitialized);
        }
        self.resources = Some(resources);
        self.state = State::ResourcesSet;
        Ok(())
    }

    /// Replace the environment properties and runner options. Like
    /// `set_resources`, only allowed before `init`.
    pub fn set_environment(
        &mut self,
        environment: EnvironmentProperties,
        options: RunnerOptions,
    ) -> Result<()> {
        if self.init_called {
            return Err(Error::AlreadyInitialized);
        }
        self.environment = environment;
        self.runner_options = options;
        Ok(())
    }

    /// Register an extra catalog source. Sources are consulted in
    /// registration order during `init` and override the bundled
    /// entries.
    pub fn add_catalog_source(&mut self, source: Box<dyn CatalogEntrySource>) -> Result<()> {
        if self.init_called {
            return Err(Error::AlreadyInitialized);
        }
        self.catalog_sources.push(source);
        Ok(())
    }

    pub fn environment(&self) -> &EnvironmentProperties {
        &self.environment
    }

    pub fn options(&self) -> &RunnerOptions {
        &self.runner_options
    }

    /// Initialize the runner: materialize the bundled resources, write
    /// the catalog, extract the report stylesheet and build the XML
    /// context. Fails unless resources were set first; a second call
    /// fails even when the first one returned an error.
    pub fn init(&mut self, processor_options: ProcessorOptions) -> Result<()> {
        if self.init_called {
            return Err(Error::AlreadyInitialized);
        }
        if self.state != State::ResourcesSet {
            return Err(Error::ResourcesNotSet);
        }
        self.init_called = true;

        let catalog = self.build_catalog()?;
        CatalogWriter::write(&catalog, &self.runner_options.catalog_path)?;
        self.extract_css_resource()?;
        log::info!(
            "runner initialized: {} catalog entries, reports under {}",
            catalog.len(),
            self.runner_options.report_dir.display()
        );

        self.xml = Some(XmlContext::new(catalog, processor_options));
        self.state = State::Initialized;
        Ok(())
    }

    fn build_catalog(&self) -> Result<Catalog> {
        let resources = self.resources.as_ref().ok_or(Error::ResourcesNotSet)?;
        let bundle_dir = match self.runner_options.catalog_path.parent() {
            Some(parent) => parent.join("bundle"),
            None => PathBuf::from("bundle"),
        };
        let mut catalog = Catalog::new();
        for provider in resources.providers() {
            for resource in provider.entries() {
                let path = bundle_dir.join(resource.file_name);
                write_atomic(&path, resource.content.as_bytes())?;
                let absolute = std::path::absolute(&path)?;
                let url = Url::from_file_path(&absolute).map_err(|_| Error::Resolution {
                    reference: path.display().to_string(),
                })?;
                catalog.insert(resource.logical_uri, url);
            }
        }
        for source in &self.catalog_sources {
            for entry in source.entries()? {
                catalog.insert(entry.logical, entry.physical);
            }
        }
        Ok(catalog)
    }

    /// Write the bundled report stylesheet to the report resource
    /// directory and return its path.
    pub fn extract_css_resource(&self) -> Result<PathBuf> {
        let resources = self.resources.as_ref().ok_or(Error::ResourcesNotSet)?;
        let css = resources
            .resource(REPORT_CSS_URI)
            .ok_or_else(|| Error::MissingResource {
                logical: REPORT_CSS_URI.to_string(),
            })?;
        let path = self.runner_options.report_resource_dir.join(css.file_name);
        write_atomic(&path, css.content.as_bytes())?;
        Ok(path)
    }

    /// Declare how many documents the coming batch holds and reset the
    /// counters.
    pub fn init_processed_files(&mut self, expected: usize) -> Result<()> {
        if self.state != State::Initialized {
            return Err(Error::NotInitialized);
        }
        self.processed = ProcessedFiles {
            expected,
            ..ProcessedFiles::default()
        };
        Ok(())
    }

    pub fn processed_files(&self) -> ProcessedFiles {
        self.processed
    }

    /// The XML context, available once the runner is initialized.
    pub fn xml(&self) -> Result<&XmlContext> {
        self.xml.as_ref().ok_or(Error::NotInitialized)
    }

    pub fn load_test_document(&mut self, path: &Path) -> Result<TestDocument> {
        let xml = self.xml.as_mut().ok_or(Error::NotInitialized)?;
        let handle = xml.load_document(path)?;
        Ok(TestDocument {
            handle,
            path: path.to_path_buf(),
        })
    }

    /// Process one XSLT test document. Returns whether all of its
    /// assertions passed.
    pub fn process_xslt_xspec(&mut self, document: &TestDocument) -> Result<bool> {
        self.process(document, Mode::Xslt)
    }

    /// Process one Schematron test document.
    pub fn process_schematron_xspec(&mut self, document: &TestDocument) -> Result<bool> {
        self.process(document, Mode::Schematron)
    }

    fn process(&mut self, document: &TestDocument, mode: Mode) -> Result<bool> {
        if self.state != State::Initialized {
            return Err(Error::NotInitialized);
        }
        match self.run_document(document, mode) {
            Ok(outcome) => {
                self.processed.processed += 1;
                let passed = outcome.passed();
                if passed {
                    self.processed.succeeded += 1;
                } else {
                    self.processed.failed += 1;
                }
                let report = ReportWriter::new(
                    &self.runner_options.report_dir,
                    &self.runner_options.base_dir,
                )
                .write(&document.path, &outcome)?;
                log::info!(
                    "{}: {} of {} assertions passed, report at {}",
                    document.path.display(),
                    outcome
                        .scenarios
                        .iter()
                        .flat_map(|s| &s.assertions)
                        .filter(|a| a.passed)
                        .count(),
                    outcome.assertion_count(),
                    report.display()
                );
                Ok(passed)
            }
            Err(error) => {
                // a broken document counts as failed; the batch goes on
                self.processed.processed += 1;
                self.processed.failed += 1;
                log::warn!("{}: {}", document.path.display(), error);
                Err(error)
            }
        }
    }

    fn run_document(
        &mut self,
        document: &TestDocument,
        mode: Mode,
    ) -> Result<executor::SuiteOutcome> {
        let xml = self.xml.as_mut().ok_or(Error::NotInitialized)?;
        let suite = load_suite(xml.documents_mut(), document.handle, &document.path)?;
        match mode {
            Mode::Xslt => executor::execute_xslt(xml, &suite),
            Mode::Schematron => executor::execute_schematron(xml, &suite),
        }
    }
}
