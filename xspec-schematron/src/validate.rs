use ahash::AHashSet;

use xee_xpath::{DocumentHandle, Documents, Query};

use crate::compile::{context_xpath, CompiledSchematron};
use crate::error::{Error, Result};
use crate::schema::AssertionKind;

/// A single assert or report that fired during validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Fired {
    pub kind: AssertionKind,
    pub id: Option<String>,
    pub role: Option<String>,
    /// The context expression of the rule that matched.
    pub context: String,
    pub message: String,
}

/// The outcome of validating one document.
#[derive(Debug, Default)]
pub struct ValidationOutcome {
    pub fired: Vec<Fired>,
}

impl ValidationOutcome {
    /// A document is valid when no assert fired; fired reports are
    /// informational and do not make a document invalid.
    pub fn is_valid(&self) -> bool {
        !self.fired.iter().any(|f| f.kind == AssertionKind::Assert)
    }

    /// Whether an assertion of the given kind fired. With an id, only
    /// that assertion counts; without, any assertion of the kind does.
    pub fn has_fired(&self, kind: AssertionKind, id: Option<&str>) -> bool {
        self.fired.iter().any(|f| {
            f.kind == kind
                && match id {
                    Some(id) => f.id.as_deref() == Some(id),
                    None => true,
                }
        })
    }
}

impl CompiledSchematron {
    /// Validate a document. Every rule context is matched against the
    /// document; each assertion test is judged by its effective boolean
    /// value for every matched node.
    pub fn validate(
        &self,
        documents: &mut Documents,
        handle: DocumentHandle,
    ) -> Result<ValidationOutcome> {
        let mut outcome = ValidationOutcome::default();
        for pattern in &self.schema.patterns {
            // within a pattern, the first rule to match a node owns it
            let mut matched: AHashSet<xot::Node> = AHashSet::new();
            for rule in &pattern.rules {
                let verr = |message: String| Error::Validate {
                    context: rule.context.clone(),
                    message,
                };
                let context_query = self
                    .queries
                    .sequence(&context_xpath(&rule.context))
                    .map_err(|e| verr(e.to_string()))?;
                let selected = context_query
                    .execute(documents, handle)
                    .map_err(|e| verr(e.to_string()))?;
                for item in selected.iter() {
                    let node = match item.to_node() {
                        Ok(node) => node,
                        // atomic results cannot be a rule context
                        Err(_) => continue,
                    };
                    if !matched.insert(node) {
                        continue;
                    }
                    for assertion in &rule.assertions {
                        let test_query = self
                            .queries
                            .sequence(&assertion.test)
                            .map_err(|e| verr(e.to_string()))?;
                        let value = test_query
                            .execute(documents, &item)
                            .map_err(|e| verr(e.to_string()))?;
                        let holds = value
                            .effective_boolean_value()
                            .map_err(|e| verr(e.to_string()))?;
                        let fires = match assertion.kind {
                            AssertionKind::Assert => !holds,
                            AssertionKind::Report => holds,
                        };
                        if fires {
                            outcome.fired.push(Fired {
                                kind: assertion.kind,
                                id: assertion.id.clone(),
                                role: assertion.role.clone(),
                                context: rule.context.clone(),
                                message: assertion.message.clone(),
                            });
                        }
                    }
                }
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"<sch:schema xmlns:sch="http://purl.oclc.org/dsdl/schematron">
  <sch:title>book rules</sch:title>
  <sch:pattern id="books">
    <sch:rule context="book">
      <sch:assert test="@id" id="book-id">a book must carry an id</sch:assert>
      <sch:report test="@draft = 'true'" id="draft-book">book is a draft</sch:report>
    </sch:rule>
  </sch:pattern>
</sch:schema>"#;

    fn validate_str(xml: &str) -> ValidationOutcome {
        let compiled = CompiledSchematron::compile(SCHEMA).unwrap();
        let mut documents = Documents::new();
        let handle = documents.add_string_without_uri(xml).unwrap();
        compiled.validate(&mut documents, handle).unwrap()
    }

    #[test]
    fn valid_document_fires_nothing() {
        let outcome = validate_str(r#"<library><book id="b1"/><book id="b2"/></library>"#);
        assert!(outcome.is_valid());
        assert!(outcome.fired.is_empty());
    }

    #[test]
    fn missing_id_fires_the_assert() {
        let outcome = validate_str(r#"<library><book/></library>"#);
        assert!(!outcome.is_valid());
        assert!(outcome.has_fired(AssertionKind::Assert, Some("book-id")));
        assert!(!outcome.has_fired(AssertionKind::Report, None));
        assert_eq!(outcome.fired[0].message, "a book must carry an id");
    }

    #[test]
    fn draft_book_fires_the_report_but_stays_valid() {
        let outcome = validate_str(r#"<library><book id="b1" draft="true"/></library>"#);
        assert!(outcome.is_valid());
        assert!(outcome.has_fired(AssertionKind::Report, Some("draft-book")));
    }

    #[test]
    fn each_matched_node_is_judged_separately() {
        let outcome = validate_str(r#"<library><book/><book id="b2"/><book/></library>"#);
        assert_eq!(
            outcome
                .fired
                .iter()
                .filter(|f| f.kind == AssertionKind::Assert)
                .count(),
            2
        );
    }
}
