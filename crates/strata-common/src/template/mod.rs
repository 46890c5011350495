//! Manifest templating for upgrade resources
//!
//! Templates use minijinja's default Jinja syntax (`{{ ... }}`,
//! `{% ... %}`) against a JSON context of upgrade properties.
//! Undefined values are errors, so a missing property fails the render
//! instead of producing an empty field in a manifest.

mod engine;
mod error;
mod filters;

pub use engine::TemplateEngine;
pub use error::TemplateError;

impl From<TemplateError> for crate::Error {
    fn from(err: TemplateError) -> Self {
        crate::Error::template(err.to_string())
    }
}
