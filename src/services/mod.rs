pub(crate) mod answers;
pub(crate) mod attempts;
pub(crate) mod catalog_import;
pub(crate) mod errors;
pub(crate) mod expiry;
pub(crate) mod results;
pub(crate) mod scoring;
