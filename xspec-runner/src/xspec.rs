//! The XSpec test vocabulary: loading an `x:description` document into
//! suites, scenarios and expectations.

use std::path::{Path, PathBuf};

use xee_xpath::context::StaticContextBuilder;
use xee_xpath::error::Result as XPathResult;
use xee_xpath::{DocumentHandle, Documents, Item, Queries, Query};
use xee_xpath_load::convert_string;
use xot::Node;

use crate::error::{Error, Result};
use crate::ns::XSPEC_NS;

/// One loaded XSpec document. Exactly one of `stylesheet` and
/// `schematron` is expected; which one decides the execution mode.
#[derive(Debug)]
pub struct XSpecSuite {
    pub path: PathBuf,
    pub stylesheet: Option<String>,
    pub schematron: Option<String>,
    pub scenarios: Vec<Scenario>,
}

#[derive(Debug)]
pub struct Scenario {
    pub label: String,
    pub context: Option<ScenarioContext>,
    pub expectations: Vec<Expectation>,
    pub scenarios: Vec<Scenario>,
}

/// The context a scenario runs against. Inline contexts are kept as
/// serialized XML and become documents of their own at execution time.
#[derive(Debug, Clone)]
pub enum ScenarioContext {
    Href(String),
    Inline(String),
}

#[derive(Debug, Clone)]
pub enum Expectation {
    /// `x:expect`: an XPath test over `$result`, a literal result
    /// document, or both.
    Expect {
        label: String,
        test: Option<String>,
        literal: Option<String>,
    },
    /// `x:expect-assert` / `x:expect-not-assert`.
    Assert { id: Option<String>, negate: bool },
    /// `x:expect-report` / `x:expect-not-report`.
    Report { id: Option<String>, negate: bool },
}

fn node_convert(_: &mut Documents, item: &Item) -> XPathResult<Node> {
    Ok(item.to_node()?)
}

/// Load an already parsed XSpec document into a suite.
pub fn load_suite(
    documents: &mut Documents,
    handle: DocumentHandle,
    path: &Path,
) -> Result<XSpecSuite> {
    let cerr = |message: String| Error::compilation(path, message);

    let mut builder = StaticContextBuilder::default();
    builder.default_element_namespace(XSPEC_NS);
    let queries = Queries::new(builder);

    let root = documents
        .document_node(handle)
        .ok_or_else(|| cerr("document has no content".to_string()))?;
    let element = documents
        .xot()
        .document_element(root)
        .map_err(|e| cerr(e.to_string()))?;

    let description_query = queries
        .option("self::description", node_convert)
        .map_err(|e| cerr(e.to_string()))?;
    if description_query
        .execute(documents, element)
        .map_err(|e| cerr(e.to_string()))?
        .is_none()
    {
        return Err(cerr("root element must be x:description".to_string()));
    }

    let stylesheet = attr_query(&queries, documents, element, "@stylesheet/string()", path)?;
    let schematron = attr_query(&queries, documents, element, "@schematron/string()", path)?;

    let scenario_nodes = queries
        .many("scenario", node_convert)
        .map_err(|e| cerr(e.to_string()))?
        .execute(documents, element)
        .map_err(|e| cerr(e.to_string()))?;
    let mut scenarios = Vec::with_capacity(scenario_nodes.len());
    for node in scenario_nodes {
        scenarios.push(load_scenario(&queries, documents, node, path)?);
    }

    Ok(XSpecSuite {
        path: path.to_path_buf(),
        stylesheet,
        schematron,
        scenarios,
    })
}

fn attr_query(
    queries: &Queries,
    documents: &mut Documents,
    node: Node,
    xpath: &str,
    path: &Path,
) -> Result<Option<String>> {
    let query = queries
        .option(xpath, convert_string)
        .map_err(|e| Error::compilation(path, e.to_string()))?;
    query
        .execute(documents, node)
        .map_err(|e| Error::compilation(path, e.to_string()))
}

fn load_scenario(
    queries: &Queries,
    documents: &mut Documents,
    node: Node,
    path: &Path,
) -> Result<Scenario> {
    let cerr = |message: String| Error::compilation(path, message);

    let label = attr_query(queries, documents, node, "@label/string()", path)?
        .or(attr_query(
            queries,
            documents,
            node,
            "label/string()",
            path,
        )?)
        .unwrap_or_default();

    let context_query = queries
        .option("context", node_convert)
        .map_err(|e| cerr(e.to_string()))?;
    let context = match context_query
        .execute(documents, node)
        .map_err(|e| cerr(e.to_string()))?
    {
        Some(context_node) => Some(load_context(queries, documents, context_node, path)?),
        None => None,
    };

    let mut expectations = Vec::new();
    let expect_nodes = queries
        .many("expect", node_convert)
        .map_err(|e| cerr(e.to_string()))?
        .execute(documents, node)
        .map_err(|e| cerr(e.to_string()))?;
    for expect_node in expect_nodes {
        expectations.push(load_expect(queries, documents, expect_node, path)?);
    }
    for (name, is_report, negate) in [
        ("expect-assert", false, false),
        ("expect-not-assert", false, true),
        ("expect-report", true, false),
        ("expect-not-report", true, true),
    ] {
        let nodes = queries
            .many(name, node_convert)
            .map_err(|e| cerr(e.to_string()))?
            .execute(documents, node)
            .map_err(|e| cerr(e.to_string()))?;
        for assertion_node in nodes {
            let id = attr_query(queries, documents, assertion_node, "@id/string()", path)?;
            expectations.push(if is_report {
                Expectation::Report { id, negate }
            } else {
                Expectation::Assert { id, negate }
            });
        }
    }

    let nested_nodes = queries
        .many("scenario", node_convert)
        .map_err(|e| cerr(e.to_string()))?
        .execute(documents, node)
        .map_err(|e| cerr(e.to_string()))?;
    let mut scenarios = Vec::with_capacity(nested_nodes.len());
    for nested in nested_nodes {
        scenarios.push(load_scenario(queries, documents, nested, path)?);
    }

    Ok(Scenario {
        label,
        context,
        expectations,
        scenarios,
    })
}

fn load_context(
    queries: &Queries,
    documents: &mut Documents,
    node: Node,
    path: &Path,
) -> Result<ScenarioContext> {
    let cerr = |message: String| Error::compilation(path, message);

    if let Some(href) = attr_query(queries, documents, node, "@href/string()", path)? {
        return Ok(ScenarioContext::Href(href));
    }
    let inline = first_child_xml(queries, documents, node, path)?;
    match inline {
        Some(xml) => Ok(ScenarioContext::Inline(xml)),
        None => Err(cerr(
            "x:context needs an @href or an inline element".to_string(),
        )),
    }
}

fn load_expect(
    queries: &Queries,
    documents: &mut Documents,
    node: Node,
    path: &Path,
) -> Result<Expectation> {
    let cerr = |message: String| Error::compilation(path, message);

    let label = attr_query(queries, documents, node, "@label/string()", path)?.unwrap_or_default();
    let test = attr_query(queries, documents, node, "@test/string()", path)?;
    let literal = first_child_xml(queries, documents, node, path)?;
    if test.is_none() && literal.is_none() {
        return Err(cerr(
            "x:expect needs a @test or a literal result".to_string(),
        ));
    }
    Ok(Expectation::Expect {
        label,
        test,
        literal,
    })
}

/// The first element child, serialized. Used for inline contexts and
/// literal expected results.
fn first_child_xml(
    queries: &Queries,
    documents: &mut Documents,
    node: Node,
    path: &Path,
) -> Result<Option<String>> {
    let cerr = |message: String| Error::compilation(path, message);

    let child_query = queries
        .option("*[1]", node_convert)
        .map_err(|e| cerr(e.to_string()))?;
    let child = child_query
        .execute(documents, node)
        .map_err(|e| cerr(e.to_string()))?;
    match child {
        Some(child) => {
            // serialize a detached clone so declarations inherited from
            // the surrounding document do not leak into the fragment
            let clone = documents.xot_mut().clone_with_prefixes(child);
            let xml = documents
                .xot()
                .to_string(clone)
                .map_err(|e| cerr(e.to_string()))?;
            Ok(Some(xml))
        }
        None => Ok(None),
    }
}
