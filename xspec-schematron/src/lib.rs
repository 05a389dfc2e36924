//! Compile ISO Schematron schemas into executable validators.
//!
//! A schema is loaded from its XML serialization, every rule context and
//! assertion test is syntax-checked up front, and the resulting
//! [`CompiledSchematron`] can validate any number of documents. Validation
//! reports which asserts and reports fired, which is what a test harness
//! needs to judge expectations against a schema.

mod compile;
mod error;
mod schema;
mod validate;

pub use compile::CompiledSchematron;
pub use error::{Error, Result};
pub use schema::{Assertion, AssertionKind, Pattern, Rule, Schema, SCHEMATRON_NS};
pub use validate::{Fired, ValidationOutcome};
