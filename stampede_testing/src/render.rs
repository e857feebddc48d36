//! Minimal substitution renderer standing in for the external templating
//! engine.

use serde_json::Value;
use stampede::{ExecutionContext, TemplateRenderer};

/// Renderer substituting `{{ name }}` placeholders from the context vars.
///
/// Unknown names render as empty text. This covers what the engine
/// contracts need from a renderer (hook names, payloads, think values)
/// without pulling in a real expression language.
#[derive(Clone, Copy, Debug, Default)]
pub struct MappingRenderer;

impl TemplateRenderer for MappingRenderer {
    fn render(&self, template: &str, context: &ExecutionContext) -> String {
        let mut output = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find("{{") {
            output.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                output.push_str(&rest[start..]);
                return output;
            };
            let name = after[..end].trim();
            if let Some(value) = context.vars.get(name) {
                output.push_str(&value_text(value));
            }
            rest = &after[end + 2..];
        }
        output.push_str(rest);
        output
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn substitutes_known_names() {
        let mut context = ExecutionContext::new();
        context.vars.insert("who".to_owned(), json!("world"));
        let rendered = MappingRenderer.render("hello {{ who }}", &context);
        assert_eq!(rendered, "hello world");
    }

    #[test]
    fn unknown_names_render_empty() {
        let context = ExecutionContext::new();
        assert_eq!(MappingRenderer.render("x{{ gone }}y", &context), "xy");
    }

    #[test]
    fn non_string_values_render_as_json() {
        let mut context = ExecutionContext::new();
        context.vars.insert("n".to_owned(), json!(7));
        assert_eq!(MappingRenderer.render("{{ n }}", &context), "7");
    }

    #[test]
    fn unterminated_placeholder_passes_through() {
        let context = ExecutionContext::new();
        assert_eq!(MappingRenderer.render("a {{ open", &context), "a {{ open");
    }
}
