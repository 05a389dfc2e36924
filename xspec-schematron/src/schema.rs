use anyhow::Result;

use xee_xpath::{context::StaticContextBuilder, Queries, Query};
use xee_xpath_load::{convert_string, Loadable};

pub const SCHEMATRON_NS: &str = "http://purl.oclc.org/dsdl/schematron";

/// An ISO Schematron schema, reduced to the parts needed for execution:
/// patterns containing rules, rules containing asserts and reports.
#[derive(Debug, Clone)]
pub struct Schema {
    pub title: Option<String>,
    pub patterns: Vec<Pattern>,
}

#[derive(Debug, Clone)]
pub struct Pattern {
    pub id: Option<String>,
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone)]
pub struct Rule {
    /// The rule context expression. Relative contexts select matching
    /// nodes anywhere in the document.
    pub context: String,
    pub assertions: Vec<Assertion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssertionKind {
    /// Fires when the test is false for a matched node.
    Assert,
    /// Fires when the test is true for a matched node.
    Report,
}

#[derive(Debug, Clone)]
pub struct Assertion {
    pub kind: AssertionKind,
    pub id: Option<String>,
    pub role: Option<String>,
    pub test: String,
    pub message: String,
}

impl Loadable for Schema {
    fn static_context_builder<'n>() -> StaticContextBuilder<'n> {
        let mut builder = StaticContextBuilder::default();
        builder.default_element_namespace(SCHEMATRON_NS);
        builder
    }

    fn load(queries: &Queries) -> Result<impl Query<Self>> {
        let id_query = queries.option("@id/string()", convert_string)?;
        let role_query = queries.option("@role/string()", convert_string)?;
        let test_query = queries.one("@test/string()", convert_string)?;
        let message_query = queries.one("string(.)", convert_string)?;

        let assert_id_query = id_query.clone();
        let assert_role_query = role_query.clone();
        let assert_test_query = test_query.clone();
        let assert_message_query = message_query.clone();
        let assert_query = queries.many("assert", move |documents, item| {
            Ok(Assertion {
                kind: AssertionKind::Assert,
                id: assert_id_query.execute(documents, item)?,
                role: assert_role_query.execute(documents, item)?,
                test: assert_test_query.execute(documents, item)?,
                message: assert_message_query.execute(documents, item)?,
            })
        })?;

        let report_id_query = id_query.clone();
        let report_role_query = role_query.clone();
        let report_test_query = test_query.clone();
        let report_message_query = message_query.clone();
        let report_query = queries.many("report", move |documents, item| {
            Ok(Assertion {
                kind: AssertionKind::Report,
                id: report_id_query.execute(documents, item)?,
                role: report_role_query.execute(documents, item)?,
                test: report_test_query.execute(documents, item)?,
                message: report_message_query.execute(documents, item)?,
            })
        })?;

        let context_query = queries.one("@context/string()", convert_string)?;
        let rule_query = queries.many("rule", move |documents, item| {
            let mut assertions = assert_query.execute(documents, item)?;
            assertions.extend(report_query.execute(documents, item)?);
            Ok(Rule {
                context: context_query.execute(documents, item)?,
                assertions,
            })
        })?;

        let pattern_id_query = id_query.clone();
        let pattern_query = queries.many("pattern", move |documents, item| {
            Ok(Pattern {
                id: pattern_id_query.execute(documents, item)?,
                rules: rule_query.execute(documents, item)?,
            })
        })?;

        let title_query = queries.option("title/string()", convert_string)?;
        let schema_query = queries.one(".", move |documents, item| {
            Ok(Schema {
                title: title_query.execute(documents, item)?,
                patterns: pattern_query.execute(documents, item)?,
            })
        })?;
        Ok(schema_query)
    }
}
