use std::fs;
use std::path::{Path, PathBuf};

use url::Url;

use xspec_runner::{
    CatalogEntry, CatalogEntrySource, Error, ProcessorOptions, ResourceSet, Result, XSpecRunner,
};

const DEMO_XSL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xsl:stylesheet xmlns:xsl="http://www.w3.org/1999/XSL/Transform" version="3.0">
  <xsl:template match="greeting">
    <salute><xsl:value-of select="."/></salute>
  </xsl:template>
</xsl:stylesheet>"#;

const PASSING_XSPEC: &str = r#"<x:description xmlns:x="http://www.jenitennison.com/xslt/xspec"
    stylesheet="demo.xsl">
  <x:scenario label="greeting becomes a salute">
    <x:context>
      <greeting>hello</greeting>
    </x:context>
    <x:expect label="wraps the text" test="$result/self::salute = 'hello'"/>
    <x:expect label="matches the literal">
      <salute>hello</salute>
    </x:expect>
  </x:scenario>
</x:description>"#;

const FAILING_XSPEC: &str = r#"<x:description xmlns:x="http://www.jenitennison.com/xslt/xspec"
    stylesheet="demo.xsl">
  <x:scenario label="greeting becomes a salute">
    <x:context>
      <greeting>hello</greeting>
    </x:context>
    <x:expect label="claims the wrong text" test="$result/self::salute = 'goodbye'"/>
  </x:scenario>
</x:description>"#;

const SCHEMATRON: &str = r#"<sch:schema xmlns:sch="http://purl.oclc.org/dsdl/schematron">
  <sch:pattern id="books">
    <sch:rule context="book">
      <sch:assert test="@id" id="book-id">a book must carry an id</sch:assert>
      <sch:report test="@draft = 'true'" id="draft-book">book is a draft</sch:report>
    </sch:rule>
  </sch:pattern>
</sch:schema>"#;

const SCHEMATRON_XSPEC: &str = r#"<x:description xmlns:x="http://www.jenitennison.com/xslt/xspec"
    schematron="rules.sch">
  <x:scenario label="a book without an id">
    <x:context>
      <library><book/></library>
    </x:context>
    <x:expect-assert id="book-id"/>
    <x:expect-not-report id="draft-book"/>
  </x:scenario>
  <x:scenario label="a draft book with an id">
    <x:context>
      <library><book id="b1" draft="true"/></library>
    </x:context>
    <x:expect-not-assert id="book-id"/>
    <x:expect-report id="draft-book"/>
  </x:scenario>
</x:description>"#;

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn initialized_runner(base: &Path) -> XSpecRunner {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut runner = XSpecRunner::new(base);
    runner.set_resources(ResourceSet::new()).unwrap();
    runner.init(ProcessorOptions::default()).unwrap();
    runner
}

#[test]
fn init_extracts_the_report_css() {
    let dir = tempfile::tempdir().unwrap();
    let runner = initialized_runner(dir.path());
    let css = dir
        .path()
        .join("target/xspec-reports/resources/test-report.css");
    assert!(css.is_file());
    assert!(!fs::read_to_string(&css).unwrap().is_empty());
    drop(runner);
}

#[test]
fn init_writes_the_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let runner = initialized_runner(dir.path());
    let catalog_path = dir.path().join("target/xspec/xspec-catalog.xml");
    assert!(catalog_path.is_file());
    let xml = fs::read_to_string(&catalog_path).unwrap();
    assert!(xml.contains("generate-tests-utils.xsl"));
    assert!(xml.contains("sch-location-compare.xsl"));

    // every catalog entry resolves, and resolution is idempotent
    let context = runner.xml().unwrap();
    for (logical, physical) in runner.xml().unwrap().catalog().iter() {
        let resolved = context.resolve(logical, None).unwrap();
        assert_eq!(&resolved, physical);
        assert!(resolved.to_file_path().unwrap().is_file());
    }
}

struct PinnedUtils(Url);

impl CatalogEntrySource for PinnedUtils {
    fn entries(&self) -> Result<Vec<CatalogEntry>> {
        Ok(vec![CatalogEntry {
            logical: xspec_runner::XSPEC_UTILS_URI.to_string(),
            physical: self.0.clone(),
        }])
    }
}

#[test]
fn catalog_sources_override_bundled_entries() {
    let dir = tempfile::tempdir().unwrap();
    let pinned = Url::parse("file:///pinned/generate-tests-utils.xsl").unwrap();
    let mut runner = XSpecRunner::new(dir.path());
    runner.set_resources(ResourceSet::new()).unwrap();
    runner
        .add_catalog_source(Box::new(PinnedUtils(pinned.clone())))
        .unwrap();
    runner.init(ProcessorOptions::default()).unwrap();
    let resolved = runner
        .xml()
        .unwrap()
        .resolve(xspec_runner::XSPEC_UTILS_URI, None)
        .unwrap();
    assert_eq!(resolved, pinned);
}

#[test]
fn passing_suite_succeeds_and_reports() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "demo.xsl", DEMO_XSL);
    let suite = write(dir.path(), "demo.xspec", PASSING_XSPEC);

    let mut runner = initialized_runner(dir.path());
    runner.init_processed_files(1).unwrap();
    let document = runner.load_test_document(&suite).unwrap();
    assert!(runner.process_xslt_xspec(&document).unwrap());

    let counters = runner.processed_files();
    assert_eq!(counters.expected, 1);
    assert_eq!(counters.processed, 1);
    assert_eq!(counters.succeeded, 1);
    assert_eq!(counters.failed, 0);

    let report = dir
        .path()
        .join("target/xspec-reports/demo-result.xml");
    let xml = fs::read_to_string(&report).unwrap();
    assert!(xml.contains("passed=\"true\""));
    assert!(xml.contains("wraps the text"));
}

#[test]
fn failing_suite_reports_failure() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "demo.xsl", DEMO_XSL);
    let suite = write(dir.path(), "demo.xspec", FAILING_XSPEC);

    let mut runner = initialized_runner(dir.path());
    runner.init_processed_files(1).unwrap();
    let document = runner.load_test_document(&suite).unwrap();
    assert!(!runner.process_xslt_xspec(&document).unwrap());

    let counters = runner.processed_files();
    assert_eq!(counters.succeeded, 0);
    assert_eq!(counters.failed, 1);

    let xml = fs::read_to_string(
        dir.path().join("target/xspec-reports/demo-result.xml"),
    )
    .unwrap();
    assert!(xml.contains("passed=\"false\""));
    assert!(xml.contains("test did not hold"));
}

#[test]
fn schematron_suite_runs_both_polarities() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "rules.sch", SCHEMATRON);
    let suite = write(dir.path(), "rules.xspec", SCHEMATRON_XSPEC);

    let mut runner = initialized_runner(dir.path());
    runner.init_processed_files(1).unwrap();
    let document = runner.load_test_document(&suite).unwrap();
    assert!(runner.process_schematron_xspec(&document).unwrap());
    assert_eq!(runner.processed_files().succeeded, 1);
}

#[test]
fn unresolvable_stylesheet_fails_the_document_but_not_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let bad = write(
        dir.path(),
        "bad.xspec",
        r#"<x:description xmlns:x="http://www.jenitennison.com/xslt/xspec"
    stylesheet="https://example.com/never-fetched.xsl">
  <x:scenario label="never runs">
    <x:context><a/></x:context>
    <x:expect label="irrelevant" test="true()"/>
  </x:scenario>
</x:description>"#,
    );
    write(dir.path(), "demo.xsl", DEMO_XSL);
    let good = write(dir.path(), "demo.xspec", PASSING_XSPEC);

    let mut runner = initialized_runner(dir.path());
    runner.init_processed_files(2).unwrap();

    let document = runner.load_test_document(&bad).unwrap();
    let err = runner.process_xslt_xspec(&document).unwrap_err();
    assert!(matches!(err, Error::Resolution { .. }));
    assert!(err.is_per_document());
    assert_eq!(runner.processed_files().failed, 1);

    // the runner keeps working after a per-document failure
    let document = runner.load_test_document(&good).unwrap();
    assert!(runner.process_xslt_xspec(&document).unwrap());
    let counters = runner.processed_files();
    assert_eq!(counters.processed, 2);
    assert_eq!(counters.succeeded, 1);
}

#[test]
fn same_named_suites_in_different_directories_get_distinct_reports() {
    let dir = tempfile::tempdir().unwrap();
    for sub in ["a", "b"] {
        let subdir = dir.path().join(sub);
        fs::create_dir_all(&subdir).unwrap();
        write(&subdir, "demo.xsl", DEMO_XSL);
        write(&subdir, "demo.xspec", PASSING_XSPEC);
    }

    let mut runner = initialized_runner(dir.path());
    runner.init_processed_files(2).unwrap();
    for sub in ["a", "b"] {
        let document = runner
            .load_test_document(&dir.path().join(sub).join("demo.xspec"))
            .unwrap();
        assert!(runner.process_xslt_xspec(&document).unwrap());
    }
    assert_eq!(runner.processed_files().succeeded, 2);

    let reports = dir.path().join("target/xspec-reports");
    assert!(reports.join("a/demo-result.xml").is_file());
    assert!(reports.join("b/demo-result.xml").is_file());
}

#[test]
fn processing_requires_initialization() {
    let dir = tempfile::tempdir().unwrap();
    let mut runner = XSpecRunner::new(dir.path());
    let err = runner
        .load_test_document(Path::new("missing.xspec"))
        .unwrap_err();
    assert!(matches!(err, Error::NotInitialized));
}
