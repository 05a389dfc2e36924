//! Shared XML processing state: the document pool, the URI catalog
//! used for resolution, and caches for loaded documents and resource
//! text.

use std::fs;
use std::path::Path;
use std::rc::Rc;

use ahash::AHashMap;
use url::Url;

use xee_xpath::{DocumentHandle, Documents};
use xot::{Node, Xot};

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::options::ProcessorOptions;

pub struct XmlContext {
    documents: Documents,
    catalog: Catalog,
    processor_options: ProcessorOptions,
    handles: AHashMap<String, DocumentHandle>,
    sources: AHashMap<String, Rc<String>>,
    inline_count: usize,
}

impl XmlContext {
    pub fn new(catalog: Catalog, processor_options: ProcessorOptions) -> Self {
        Self {
            documents: Documents::new(),
            catalog,
            processor_options,
            handles: AHashMap::new(),
            sources: AHashMap::new(),
            inline_count: 0,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn processor_options(&self) -> &ProcessorOptions {
        &self.processor_options
    }

    pub fn documents_mut(&mut self) -> &mut Documents {
        &mut self.documents
    }

    pub fn xot(&self) -> &Xot {
        self.documents.xot()
    }

    /// Resolve a reference to a physical URL. The catalog is consulted
    /// first; failing that, absolute URLs pass through and anything
    /// else is taken as a path relative to `base`.
    pub fn resolve(&self, reference: &str, base: Option<&Path>) -> Result<Url> {
        if let Some(physical) = self.catalog.resolve(reference) {
            return Ok(physical.clone());
        }
        let unresolvable = || Error::Resolution {
            reference: reference.to_string(),
        };
        if let Ok(url) = Url::parse(reference) {
            if url.scheme() == "file" {
                return Ok(url);
            }
            // a non-file URL not in the catalog cannot be fetched
            return Err(unresolvable());
        }
        let path = match base {
            Some(base) => base.join(reference),
            None => Path::new(reference).to_path_buf(),
        };
        let absolute = std::path::absolute(&path)?;
        Url::from_file_path(&absolute).map_err(|_| unresolvable())
    }

    /// Load a document from a file path, going through URL resolution
    /// so repeated loads share one handle.
    pub fn load_document(&mut self, path: &Path) -> Result<DocumentHandle> {
        let absolute = std::path::absolute(path)?;
        let url = Url::from_file_path(&absolute).map_err(|_| Error::Resolution {
            reference: path.display().to_string(),
        })?;
        self.load_url(&url)
    }

    pub fn load_url(&mut self, url: &Url) -> Result<DocumentHandle> {
        if let Some(handle) = self.handles.get(url.as_str()) {
            return Ok(*handle);
        }
        let path = url.to_file_path().map_err(|_| Error::Resolution {
            reference: url.as_str().to_string(),
        })?;
        let xml = fs::read_to_string(&path)?;
        let uri = url
            .as_str()
            .try_into()
            .map_err(|_| Error::Documents(format!("invalid document URI: {}", url)))?;
        let handle = self
            .documents
            .add_string(uri, &xml)
            .map_err(|e| Error::Documents(e.to_string()))?;
        self.handles.insert(url.as_str().to_string(), handle);
        Ok(handle)
    }

    /// Add an inline fragment as a document of its own, under a
    /// synthetic URI.
    pub fn add_inline(&mut self, xml: &str) -> Result<DocumentHandle> {
        self.inline_count += 1;
        let uri = format!("urn:x-xspec:inline:{}", self.inline_count);
        let iri = uri
            .as_str()
            .try_into()
            .map_err(|_| Error::Documents(format!("invalid document URI: {}", uri)))?;
        self.documents
            .add_string(iri, xml)
            .map_err(|e| Error::Documents(e.to_string()))
    }

    pub fn document_node(&self, handle: DocumentHandle) -> Result<Node> {
        self.documents
            .document_node(handle)
            .ok_or_else(|| Error::Documents("document handle has no node".to_string()))
    }

    /// Text of a resource, cached by URL. Stylesheets under test are
    /// read through this so a suite can reference the same stylesheet
    /// many times without rereading it.
    pub fn resource_text(&mut self, url: &Url) -> Result<Rc<String>> {
        if let Some(text) = self.sources.get(url.as_str()) {
            return Ok(text.clone());
        }
        let path = url.to_file_path().map_err(|_| Error::Resolution {
            reference: url.as_str().to_string(),
        })?;
        let text = Rc::new(fs::read_to_string(&path)?);
        self.sources.insert(url.as_str().to_string(), text.clone());
        Ok(text)
    }
}
