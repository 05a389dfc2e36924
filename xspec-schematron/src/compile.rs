use xee_xpath::Queries;
use xee_xpath_load::Loadable;

use crate::error::{Error, Result};
use crate::schema::Schema;

/// A schema with all of its XPath expressions syntax-checked, ready to
/// validate documents.
#[derive(Debug)]
pub struct CompiledSchematron {
    pub(crate) schema: Schema,
    pub(crate) queries: Queries<'static>,
}

impl CompiledSchematron {
    /// Load a schema from its XML serialization and compile it.
    pub fn compile(xml: &str) -> Result<CompiledSchematron> {
        let schema = Schema::load_from_xml(xml).map_err(|e| Error::Load(e.to_string()))?;
        Self::compile_schema(schema)
    }

    /// Compile an already-loaded schema. Every rule context and assertion
    /// test is checked here, so validation can only fail on evaluation.
    pub fn compile_schema(schema: Schema) -> Result<CompiledSchematron> {
        let queries = Queries::default();
        for pattern in &schema.patterns {
            for rule in &pattern.rules {
                queries
                    .sequence(&context_xpath(&rule.context))
                    .map_err(|e| Error::Compile {
                        location: format!("rule '{}'", rule.context),
                        expression: rule.context.clone(),
                        message: e.to_string(),
                    })?;
                for assertion in &rule.assertions {
                    queries.sequence(&assertion.test).map_err(|e| Error::Compile {
                        location: format!("rule '{}'", rule.context),
                        expression: assertion.test.clone(),
                        message: e.to_string(),
                    })?;
                }
            }
        }
        Ok(CompiledSchematron { schema, queries })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

// Rule contexts are patterns; within the supported subset a relative
// context selects matching nodes anywhere in the document.
pub(crate) fn context_xpath(context: &str) -> String {
    if context.starts_with('/') {
        context.to_string()
    } else {
        format!("//{}", context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_assertion_xpath_is_a_compile_error() {
        let result = CompiledSchematron::compile(
            r#"<sch:schema xmlns:sch="http://purl.oclc.org/dsdl/schematron">
                 <sch:pattern>
                   <sch:rule context="book">
                     <sch:assert test="not(" id="broken">broken</sch:assert>
                   </sch:rule>
                 </sch:pattern>
               </sch:schema>"#,
        );
        assert!(matches!(result, Err(Error::Compile { .. })));
    }

    #[test]
    fn relative_contexts_select_from_anywhere() {
        assert_eq!(context_xpath("book"), "//book");
        assert_eq!(context_xpath("/library/book"), "/library/book");
    }
}
