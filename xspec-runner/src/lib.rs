//! Compiles and executes XSpec test documents against XSLT stylesheets
//! and Schematron schemas.
//!
//! The entry point is [`XSpecRunner`]: configure it with a
//! [`ResourceSet`] and an environment, initialize it once, then feed it
//! test documents. Each processed document yields a pass/fail verdict,
//! updates the batch counters and leaves an XML report on disk.

mod catalog;
mod error;
mod escape;
mod executor;
mod fsutil;
pub mod ns;
mod options;
mod report;
mod resources;
mod runner;
mod xml;
mod xspec;

pub use catalog::{Catalog, CatalogEntry, CatalogEntrySource, CatalogWriter};
pub use error::{Error, Result};
pub use executor::{AssertionOutcome, ScenarioOutcome, SuiteOutcome};
pub use options::{EnvironmentProperties, ProcessorOptions, RunnerOptions};
pub use report::ReportWriter;
pub use resources::{
    BundledResource, DefaultPluginResources, DefaultSchematronResources, DefaultXSpecResources,
    ResourceProvider, ResourceSet, REPORT_CSS_URI, SCH_LOCATION_COMPARE_URI, XSPEC_UTILS_URI,
};
pub use runner::{ProcessedFiles, TestDocument, XSpecRunner};
pub use xml::XmlContext;
pub use xspec::{load_suite, Expectation, Scenario, ScenarioContext, XSpecSuite};
