use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;

use clusterbench_core::{CoreError, CoreResult};

/// Renders `{{ VAR }}` templates for download URLs and generated manifests.
///
/// Undefined variables are errors, so a URL never silently loses a segment.
pub struct TemplateRenderer {
    env: Environment<'static>,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRenderer {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        Self { env }
    }

    pub fn render_str<S: Serialize>(&self, template: &str, variables: S) -> CoreResult<String> {
        self.env
            .render_str(template, variables)
            .map_err(|err| CoreError::Template(err.to_string()))
    }
}
