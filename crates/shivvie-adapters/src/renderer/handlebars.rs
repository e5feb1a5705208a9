//! Handlebars renderer.
//!
//! Output is not HTML-escaped (templates produce source files, not markup).
//! Missing variables render as empty strings.
//!
//! Helpers: `snake`, `kebab`, `pascal`, `camel`, `upper`, `lower`, e.g.
//! `{{pascal name}}`.

use handlebars::{Context, Handlebars, Helper, HelperResult, Output, RenderContext};
use serde_json::Value;
use tracing::instrument;

use shivvie_core::{application::ports::TemplateRenderer, domain::DomainError, error::ShivvieResult};

use super::case::{to_camel_case, to_kebab_case, to_pascal_case, to_snake_case};

/// Renderer backed by a shared Handlebars registry.
pub struct HandlebarsRenderer {
    registry: Handlebars<'static>,
}

impl HandlebarsRenderer {
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        registry.register_helper("snake", Box::new(snake_helper));
        registry.register_helper("kebab", Box::new(kebab_helper));
        registry.register_helper("pascal", Box::new(pascal_helper));
        registry.register_helper("camel", Box::new(camel_helper));
        registry.register_helper("upper", Box::new(upper_helper));
        registry.register_helper("lower", Box::new(lower_helper));
        Self { registry }
    }
}

impl Default for HandlebarsRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRenderer for HandlebarsRenderer {
    #[instrument(skip_all, level = "trace")]
    fn render(&self, template: &str, data: &Value) -> ShivvieResult<String> {
        self.registry
            .render_template(template, data)
            .map_err(|e| DomainError::Rendering { reason: e.to_string() }.into())
    }
}

fn param_text(h: &Helper) -> String {
    match h.param(0).map(|p| p.value()) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn write_converted(h: &Helper, out: &mut dyn Output, convert: fn(&str) -> String) -> HelperResult {
    out.write(&convert(&param_text(h)))?;
    Ok(())
}

fn snake_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    write_converted(h, out, to_snake_case)
}

fn kebab_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    write_converted(h, out, to_kebab_case)
}

fn pascal_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    write_converted(h, out, to_pascal_case)
}

fn camel_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    write_converted(h, out, to_camel_case)
}

fn upper_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    write_converted(h, out, |s| s.to_uppercase())
}

fn lower_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    write_converted(h, out, |s| s.to_lowercase())
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use shivvie_core::error::ShivvieError;

    use super::*;

    #[test]
    fn renders_without_html_escaping() {
        let out = HandlebarsRenderer::new()
            .render("fn {{name}}() -> Vec<&'static str> {}", &json!({"name": "a<b>"}))
            .unwrap();
        assert_eq!(out, "fn a<b>() -> Vec<&'static str> {}");
    }

    #[test]
    fn case_helpers() {
        let out = HandlebarsRenderer::new()
            .render(
                "{{snake name}} {{kebab name}} {{pascal name}} {{camel name}} {{upper name}}",
                &json!({"name": "myApp"}),
            )
            .unwrap();
        assert_eq!(out, "my_app my-app MyApp myApp MYAPP");
    }

    #[test]
    fn missing_variables_render_empty() {
        let out = HandlebarsRenderer::new().render("[{{nope}}]", &json!({})).unwrap();
        assert_eq!(out, "[]");
    }

    #[test]
    fn syntax_errors_are_rendering_errors() {
        let err = HandlebarsRenderer::new()
            .render("{{#if}}", &json!({}))
            .unwrap_err();
        assert!(matches!(
            err,
            ShivvieError::Domain(DomainError::Rendering { .. })
        ));
    }
}
