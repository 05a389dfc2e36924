//! Resources bundled into the binary and the provider abstraction over
//! them. Providers map logical URIs to file content; the runner
//! materializes them on disk and records them in the catalog.

pub const XSPEC_UTILS_URI: &str =
    "https://www.jenitennison.com/xslt/xspec/generate-tests-utils.xsl";
pub const SCH_LOCATION_COMPARE_URI: &str =
    "https://www.jenitennison.com/xslt/xspec/schematron/sch-location-compare.xsl";
pub const REPORT_CSS_URI: &str =
    "https://www.jenitennison.com/xslt/xspec/reporter/test-report.css";

/// A resource compiled into the binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundledResource {
    /// URI a test document may use to refer to the resource.
    pub logical_uri: &'static str,
    /// File name when the resource is written to disk.
    pub file_name: &'static str,
    pub content: &'static str,
}

/// A named group of bundled resources.
pub trait ResourceProvider {
    fn entries(&self) -> Vec<BundledResource>;
}

/// The XSpec helper stylesheets.
pub struct DefaultXSpecResources;

impl ResourceProvider for DefaultXSpecResources {
    fn entries(&self) -> Vec<BundledResource> {
        vec![BundledResource {
            logical_uri: XSPEC_UTILS_URI,
            file_name: "generate-tests-utils.xsl",
            content: include_str!("bundled/generate-tests-utils.xsl"),
        }]
    }
}

/// The Schematron helper stylesheets.
pub struct DefaultSchematronResources;

impl ResourceProvider for DefaultSchematronResources {
    fn entries(&self) -> Vec<BundledResource> {
        vec![BundledResource {
            logical_uri: SCH_LOCATION_COMPARE_URI,
            file_name: "sch-location-compare.xsl",
            content: include_str!("bundled/sch-location-compare.xsl"),
        }]
    }
}

/// Report presentation resources.
pub struct DefaultPluginResources;

impl ResourceProvider for DefaultPluginResources {
    fn entries(&self) -> Vec<BundledResource> {
        vec![BundledResource {
            logical_uri: REPORT_CSS_URI,
            file_name: "test-report.css",
            content: include_str!("bundled/test-report.css"),
        }]
    }
}

/// The three provider slots the runner requires before initialization.
pub struct ResourceSet {
    pub xspec: Box<dyn ResourceProvider>,
    pub schematron: Box<dyn ResourceProvider>,
    pub plugin: Box<dyn ResourceProvider>,
}

impl ResourceSet {
    pub fn new() -> Self {
        Self {
            xspec: Box::new(DefaultXSpecResources),
            schematron: Box::new(DefaultSchematronResources),
            plugin: Box::new(DefaultPluginResources),
        }
    }

    pub fn providers(&self) -> [&dyn ResourceProvider; 3] {
        [
            self.xspec.as_ref(),
            self.schematron.as_ref(),
            self.plugin.as_ref(),
        ]
    }

    /// Look up a bundled resource by its logical URI.
    pub fn resource(&self, logical_uri: &str) -> Option<BundledResource> {
        self.providers()
            .iter()
            .flat_map(|provider| provider.entries())
            .find(|resource| resource.logical_uri == logical_uri)
    }
}

impl Default for ResourceSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_set_covers_the_known_uris() {
        let set = ResourceSet::new();
        for uri in [XSPEC_UTILS_URI, SCH_LOCATION_COMPARE_URI, REPORT_CSS_URI] {
            let resource = set.resource(uri).unwrap();
            assert!(!resource.content.is_empty());
        }
        assert!(set.resource("https://example.com/unknown").is_none());
    }

    #[test]
    fn css_resource_is_the_report_stylesheet() {
        let set = ResourceSet::new();
        let css = set.resource(REPORT_CSS_URI).unwrap();
        assert_eq!(css.file_name, "test-report.css");
        assert!(css.content.contains("body"));
    }
}
