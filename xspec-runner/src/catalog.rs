//! The URI catalog: an ordered map from logical URIs to physical
//! locations, serialized as an OASIS XML catalog.

use std::fmt::Write;
use std::path::Path;

use indexmap::IndexMap;
use url::Url;

use crate::error::Result;
use crate::escape::escape_attr;
use crate::fsutil::write_atomic;
use crate::ns::CATALOG_NS;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub logical: String,
    pub physical: Url,
}

/// Contributes entries to the catalog during runner initialization.
/// Sources registered later override earlier ones for the same logical
/// URI.
pub trait CatalogEntrySource {
    fn entries(&self) -> Result<Vec<CatalogEntry>>;
}

#[derive(Debug, Default)]
pub struct Catalog {
    entries: IndexMap<String, Url>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a mapping. A repeated logical URI keeps its original
    /// position but takes the new physical location.
    pub fn insert(&mut self, logical: impl Into<String>, physical: Url) {
        self.entries.insert(logical.into(), physical);
    }

    pub fn resolve(&self, logical: &str) -> Option<&Url> {
        self.entries.get(logical)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Url)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

pub struct CatalogWriter;

impl CatalogWriter {
    /// Serialize in insertion order, so repeated writes of the same
    /// catalog produce identical bytes.
    pub fn serialize(catalog: &Catalog) -> String {
        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        let _ = writeln!(out, "<catalog xmlns=\"{}\">", CATALOG_NS);
        for (logical, physical) in catalog.iter() {
            let _ = writeln!(
                out,
                "  <uri name=\"{}\" uri=\"{}\"/>",
                escape_attr(logical),
                escape_attr(physical.as_str())
            );
        }
        out.push_str("</catalog>\n");
        out
    }

    pub fn write(catalog: &Catalog, path: &Path) -> Result<()> {
        write_atomic(path, Self::serialize(catalog).as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn later_insert_wins() {
        let mut catalog = Catalog::new();
        catalog.insert("https://example.com/a", url("file:///one.xsl"));
        catalog.insert("https://example.com/a", url("file:///two.xsl"));
        assert_eq!(catalog.len(), 1);
        assert_eq!(
            catalog.resolve("https://example.com/a").unwrap().as_str(),
            "file:///two.xsl"
        );
    }

    #[test]
    fn serialization_is_deterministic() {
        let mut catalog = Catalog::new();
        catalog.insert("https://example.com/b", url("file:///b.xsl"));
        catalog.insert("https://example.com/a", url("file:///a.xsl"));
        let first = CatalogWriter::serialize(&catalog);
        let second = CatalogWriter::serialize(&catalog);
        assert_eq!(first, second);
        // insertion order, not alphabetical
        let b = first.find("example.com/b").unwrap();
        let a = first.find("example.com/a").unwrap();
        assert!(b < a);
    }

    #[test]
    fn attribute_values_are_escaped() {
        let mut catalog = Catalog::new();
        catalog.insert("https://example.com/?q=a&r=b", url("file:///x.xsl"));
        let xml = CatalogWriter::serialize(&catalog);
        assert!(xml.contains("q=a&amp;r=b"));
    }
}
