//! Executes loaded suites: XSLT suites by compiling and running the
//! stylesheet per scenario, Schematron suites by validating each
//! scenario context against the compiled schema.

use std::path::Path;

use xee_xpath::context::{StaticContextBuilder, Variables};
use xee_xpath::{Documents, Item, Queries, Query, Sequence};
use xot::xmlname::OwnedName;
use xot::Xot;

use xspec_schematron::{AssertionKind, CompiledSchematron};

use crate::error::{Error, Result};
use crate::xml::XmlContext;
use crate::xspec::{Expectation, Scenario, ScenarioContext, XSpecSuite};

/// The result of running one suite.
#[derive(Debug, Default)]
pub struct SuiteOutcome {
    pub scenarios: Vec<ScenarioOutcome>,
}

impl SuiteOutcome {
    pub fn passed(&self) -> bool {
        self.scenarios
            .iter()
            .all(|s| s.assertions.iter().all(|a| a.passed))
    }

    pub fn assertion_count(&self) -> usize {
        self.scenarios.iter().map(|s| s.assertions.len()).sum()
    }
}

#[derive(Debug)]
pub struct ScenarioOutcome {
    pub label: String,
    pub assertions: Vec<AssertionOutcome>,
}

#[derive(Debug)]
pub struct AssertionOutcome {
    pub label: String,
    pub passed: bool,
    pub detail: Option<String>,
}

/// A scenario with inherited context and composed label, ready to run.
struct FlatScenario<'a> {
    label: String,
    context: Option<&'a ScenarioContext>,
    expectations: &'a [Expectation],
}

/// Nested scenarios inherit the context of their nearest ancestor that
/// declares one; labels compose from the outside in.
fn flatten(scenarios: &[Scenario]) -> Vec<FlatScenario> {
    let mut flat = Vec::new();
    for scenario in scenarios {
        push_flat(scenario, None, "", &mut flat);
    }
    flat
}

fn push_flat<'a>(
    scenario: &'a Scenario,
    inherited: Option<&'a ScenarioContext>,
    prefix: &str,
    flat: &mut Vec<FlatScenario<'a>>,
) {
    let context = scenario.context.as_ref().or(inherited);
    let label = if prefix.is_empty() {
        scenario.label.clone()
    } else {
        format!("{} / {}", prefix, scenario.label)
    };
    if !scenario.expectations.is_empty() {
        flat.push(FlatScenario {
            label: label.clone(),
            context,
            expectations: &scenario.expectations,
        });
    }
    for nested in &scenario.scenarios {
        push_flat(nested, context, &label, flat);
    }
}

fn context_handle(
    xml: &mut XmlContext,
    context: &ScenarioContext,
    base: Option<&Path>,
) -> Result<xee_xpath::DocumentHandle> {
    match context {
        ScenarioContext::Href(href) => {
            let url = xml.resolve(href, base)?;
            xml.load_url(&url)
        }
        ScenarioContext::Inline(fragment) => xml.add_inline(fragment),
    }
}

/// Run an XSLT suite: compile the stylesheet once, then apply it to
/// each scenario context and judge every expectation against the
/// transformation result.
pub fn execute_xslt(xml: &mut XmlContext, suite: &XSpecSuite) -> Result<SuiteOutcome> {
    let path = suite.path.as_path();
    if suite.scenarios.is_empty() {
        return Err(Error::compilation(path, "suite has no scenarios"));
    }
    let href = suite
        .stylesheet
        .as_deref()
        .ok_or_else(|| Error::compilation(path, "suite has no @stylesheet"))?;
    let base = path.parent();

    let url = xml.resolve(href, base)?;
    let xslt = xml.resource_text(&url)?;
    let static_context = StaticContextBuilder::default().build();
    let program = xee_xslt_compiler::parse(static_context, &xslt)
        .map_err(|e| Error::compilation(path, e.to_string()))?;

    let flat = flatten(&suite.scenarios);
    check_tests(&flat, path)?;

    let trace = xml.processor_options().trace;
    let mut outcome = SuiteOutcome::default();
    for scenario in &flat {
        if trace {
            log::debug!("running scenario: {}", scenario.label);
        }
        let context = scenario
            .context
            .ok_or_else(|| Error::compilation(path, "scenario has no context"))?;
        let handle = context_handle(xml, context, base)?;
        let context_node = xml.document_node(handle)?;

        let mut builder = program.dynamic_context_builder();
        builder.context_item(Item::from(context_node));
        builder.documents(xml.documents_mut().documents().clone());
        let dynamic_context = builder.build();
        let runnable = program.runnable(&dynamic_context);
        let result = runnable
            .many(xml.documents_mut().xot_mut())
            .map_err(|e| Error::execution(path, e.error.to_string()))?;

        let mut assertions = Vec::with_capacity(scenario.expectations.len());
        for expectation in scenario.expectations {
            match expectation {
                Expectation::Expect {
                    label,
                    test,
                    literal,
                } => {
                    assertions.push(judge_expect(
                        xml,
                        path,
                        label,
                        test.as_deref(),
                        literal.as_deref(),
                        &result,
                    )?);
                }
                Expectation::Assert { .. } | Expectation::Report { .. } => {
                    return Err(Error::compilation(
                        path,
                        "Schematron expectations need an @schematron suite",
                    ));
                }
            }
        }
        outcome.scenarios.push(ScenarioOutcome {
            label: scenario.label.clone(),
            assertions,
        });
    }
    Ok(outcome)
}

/// Reject a suite before execution when any @test expression fails to
/// parse.
fn check_tests(flat: &[FlatScenario], path: &Path) -> Result<()> {
    let queries = Queries::default();
    for scenario in flat {
        for expectation in scenario.expectations {
            if let Expectation::Expect {
                test: Some(test), ..
            } = expectation
            {
                let mut builder = StaticContextBuilder::default();
                builder.variable_names([result_name()]);
                queries
                    .sequence_with_context(test, builder.build())
                    .map_err(|e| {
                        Error::compilation(path, format!("bad test expression {}: {}", test, e))
                    })?;
            }
        }
    }
    Ok(())
}

fn result_name() -> OwnedName {
    OwnedName::new("result".to_string(), String::new(), String::new())
}

fn judge_expect(
    xml: &mut XmlContext,
    path: &Path,
    label: &str,
    test: Option<&str>,
    literal: Option<&str>,
    result: &Sequence,
) -> Result<AssertionOutcome> {
    let mut passed = true;
    let mut detail = None;

    if let Some(test) = test {
        let holds = evaluate_test(xml.documents_mut(), path, test, result)?;
        if !holds {
            passed = false;
            detail = Some(format!("test did not hold: {}", test));
        }
    }
    if let Some(literal) = literal {
        if passed {
            let found = serialize_sequence(xml.xot(), result)
                .map_err(|message| Error::execution(path, message))?;
            if !xml_equal(&found, literal, path)? {
                passed = false;
                detail = Some(format!("expected {} but found {}", literal, found));
            }
        }
    }
    Ok(AssertionOutcome {
        label: label.to_string(),
        passed,
        detail,
    })
}

/// Evaluate an `x:expect/@test` expression with the transformation
/// result bound to `$result` and, when the result has items, the first
/// item as the context item.
fn evaluate_test(
    documents: &mut Documents,
    path: &Path,
    test: &str,
    result: &Sequence,
) -> Result<bool> {
    let eerr = |message: String| Error::execution(path, message);

    let name = result_name();
    let mut builder = StaticContextBuilder::default();
    builder.variable_names([name.clone()]);
    let static_context = builder.build();
    let queries = Queries::default();
    let query = queries
        .sequence_with_context(test, static_context)
        .map_err(|e| Error::compilation(path, e.to_string()))?;

    let context_item = result.iter().next();
    let variables = Variables::from([(name, result.clone())]);
    let value = query
        .execute_build_context(documents, |builder| {
            builder.variables(variables);
            if let Some(item) = context_item {
                builder.context_item(item);
            }
        })
        .map_err(|e| eerr(e.to_string()))?;
    value.effective_boolean_value().map_err(|e| eerr(e.to_string()))
}

/// Serialize a sequence of nodes for comparison. Atomic items have no
/// XML form.
fn serialize_sequence(
    xot: &Xot,
    sequence: &Sequence,
) -> std::result::Result<String, String> {
    let mut xmls = Vec::with_capacity(sequence.len());
    for item in sequence.iter() {
        let node = item
            .to_node()
            .map_err(|_| "result item cannot be represented as XML".to_string())?;
        xmls.push(xot.to_string(node).map_err(|e| e.to_string())?);
    }
    Ok(xmls.join(""))
}

/// Compare two XML fragments by parsing both, wrapped in a shared
/// container element, in a scratch tree.
fn xml_equal(found: &str, expected: &str, path: &Path) -> Result<bool> {
    let mut compare_xot = Xot::new();
    let found = compare_xot
        .parse(&format!("<sequence>{}</sequence>", found))
        .map_err(|e| Error::execution(path, e.to_string()))?;
    let expected = compare_xot
        .parse(&format!("<sequence>{}</sequence>", expected))
        .map_err(|e| Error::compilation(path, format!("bad literal result: {}", e)))?;
    Ok(compare_xot.deep_equal(expected, found))
}

/// Run a Schematron suite: compile the schema once, validate each
/// scenario context and judge fired assertions against the
/// expectations.
pub fn execute_schematron(xml: &mut XmlContext, suite: &XSpecSuite) -> Result<SuiteOutcome> {
    let path = suite.path.as_path();
    if suite.scenarios.is_empty() {
        return Err(Error::compilation(path, "suite has no scenarios"));
    }
    let href = suite
        .schematron
        .as_deref()
        .ok_or_else(|| Error::compilation(path, "suite has no @schematron"))?;
    let base = path.parent();

    let url = xml.resolve(href, base)?;
    let schema_xml = xml.resource_text(&url)?;
    let compiled = CompiledSchematron::compile(&schema_xml)
        .map_err(|e| Error::compilation(path, e.to_string()))?;

    let trace = xml.processor_options().trace;
    let mut outcome = SuiteOutcome::default();
    for scenario in flatten(&suite.scenarios) {
        if trace {
            log::debug!("running scenario: {}", scenario.label);
        }
        let context = scenario
            .context
            .ok_or_else(|| Error::compilation(path, "scenario has no context"))?;
        let handle = context_handle(xml, context, base)?;
        let validation = compiled
            .validate(xml.documents_mut(), handle)
            .map_err(|e| Error::execution(path, e.to_string()))?;

        let mut assertions = Vec::with_capacity(scenario.expectations.len());
        for expectation in scenario.expectations {
            let (kind, id, negate, word) = match expectation {
                Expectation::Assert { id, negate } => {
                    (AssertionKind::Assert, id, *negate, "assert")
                }
                Expectation::Report { id, negate } => {
                    (AssertionKind::Report, id, *negate, "report")
                }
                Expectation::Expect { .. } => {
                    return Err(Error::compilation(
                        path,
                        "x:expect needs an @stylesheet suite",
                    ));
                }
            };
            let fired = validation.has_fired(kind, id.as_deref());
            let passed = fired != negate;
            let label = match (id, negate) {
                (Some(id), false) => format!("expect-{} {}", word, id),
                (Some(id), true) => format!("expect-not-{} {}", word, id),
                (None, false) => format!("expect-{}", word),
                (None, true) => format!("expect-not-{}", word),
            };
            let detail = if passed {
                None
            } else if negate {
                Some(format!("{} fired but was not expected to", word))
            } else {
                Some(format!("{} did not fire", word))
            };
            assertions.push(AssertionOutcome {
                label,
                passed,
                detail,
            });
        }
        outcome.scenarios.push(ScenarioOutcome {
            label: scenario.label.clone(),
            assertions,
        });
    }
    Ok(outcome)
}
