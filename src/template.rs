//! Template-rendering seam consumed by compiled steps.
//!
//! The expression language itself lives outside this crate; the engine only
//! defines the interface it renders payloads, hook names, and think
//! durations through.

use crate::context::ExecutionContext;

/// External templating engine rendering strings against run state.
///
/// Implementations see the variable bindings as mutated by earlier steps,
/// hooks, and captures, plus the helper capability set registered on the
/// context. Rendering must be deterministic for unchanged bindings: the
/// `pub`/`req` pipeline renders the same payload template twice and relies
/// on identical output when no hook touched the bindings in between.
pub trait TemplateRenderer: Send + Sync {
    /// Render `template` against the current context.
    fn render(&self, template: &str, context: &ExecutionContext) -> String;
}

/// Renderer returning templates verbatim, for scenarios without
/// placeholders.
#[derive(Clone, Copy, Debug, Default)]
pub struct PassthroughRenderer;

impl TemplateRenderer for PassthroughRenderer {
    fn render(&self, template: &str, _context: &ExecutionContext) -> String { template.to_owned() }
}
