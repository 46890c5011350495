//! Template engine backed by minijinja

use minijinja::{Environment, UndefinedBehavior, Value};

use super::error::TemplateError;
use super::filters;

/// Template engine for upgrade manifests
///
/// Strict undefined handling; filters `base64_encode` and `required`.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine {
    /// Create a new template engine
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_trim_blocks(true);
        env.set_keep_trailing_newline(true);

        env.add_filter("base64_encode", filters::base64_encode);
        env.add_filter("required", filters::required);

        Self { env }
    }

    /// Render `source` against a JSON context.
    ///
    /// `name` identifies the template in error messages.
    pub fn render(
        &self,
        name: &str,
        source: &str,
        ctx: &serde_json::Value,
    ) -> Result<String, TemplateError> {
        if !ctx.is_object() {
            return Err(TemplateError::Context(
                "template context must be a JSON object".to_string(),
            ));
        }
        self.env
            .render_named_str(name, source, Value::from_serialize(ctx))
            .map_err(|e| TemplateError::render(name, e))
    }
}
