pub const XSPEC_NS: &str = "http://www.jenitennison.com/xslt/xspec";
pub const CATALOG_NS: &str = "urn:oasis:names:tc:entity:xmlns:xml:catalog";
