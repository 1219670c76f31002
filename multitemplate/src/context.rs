use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::compiler::ir::HtmlContext;
use crate::value::Value;

/// The HTML context pre-rendered content was produced for.
///
/// When a [`RenderedBlock`] is injected at a `yield` site its kind has to
/// accept the context of the call site, otherwise the render fails with
/// [`MismatchedBlockContext`](crate::ErrorKind::MismatchedBlockContext).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BlockKind {
    /// Content supplied by the application that may be used anywhere.
    User,
    /// Markup for the document body.
    Html,
    /// Content for an inline `<style>` element.
    Css,
    /// Content for an inline `<script>` element.
    Js,
}

impl BlockKind {
    /// Returns `true` if content of this kind may be written into `context`.
    pub fn accepts(self, context: HtmlContext) -> bool {
        matches!(
            (self, context),
            (BlockKind::User, _)
                | (BlockKind::Html, HtmlContext::Body)
                | (BlockKind::Css, HtmlContext::Style)
                | (BlockKind::Js, HtmlContext::Script)
        )
    }
}

impl From<HtmlContext> for BlockKind {
    fn from(context: HtmlContext) -> Self {
        match context {
            HtmlContext::Body => BlockKind::Html,
            HtmlContext::Script => BlockKind::Js,
            HtmlContext::Style => BlockKind::Css,
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BlockKind::User => "user",
            BlockKind::Html => "html",
            BlockKind::Css => "css",
            BlockKind::Js => "js",
        })
    }
}

/// Already rendered markup with the context it was rendered for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedBlock {
    content: String,
    kind: BlockKind,
}

impl RenderedBlock {
    /// Creates a new block.
    pub fn new<S: Into<String>>(content: S, kind: BlockKind) -> RenderedBlock {
        RenderedBlock {
            content: content.into(),
            kind,
        }
    }

    /// Returns the markup.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns the context the markup was rendered for.
    pub fn kind(&self) -> BlockKind {
        self.kind
    }
}

/// Everything a single render call works with.
///
/// A context names the main unit and optionally a layout that wraps it,
/// carries the data the templates see as `.` and the two slot tables
/// composition calls resolve against:
///
/// * `yields` maps a slot to the name of a unit that is executed when the
///   slot is yielded.
/// * `blocks` maps a slot to pre-rendered content.
///
/// A context belongs to one render call.  Block captures of the call are
/// recorded on its own copy, so a context can be reused for many renders.
///
/// ```
/// # use multitemplate::{context, BlockKind, RenderContext, RenderedBlock};
/// let ctx = RenderContext::new("pages/index.html")
///     .with_layout("layouts/main.html")
///     .with_yield("sidebar", "partials/sidebar.html")
///     .with_block("styles", RenderedBlock::new("body { margin: 0 }", BlockKind::Css))
///     .with_dot(context! { Title => "Welcome" });
/// ```
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    pub(crate) main: Option<String>,
    pub(crate) layout: Option<String>,
    pub(crate) yields: BTreeMap<String, String>,
    pub(crate) blocks: BTreeMap<String, RenderedBlock>,
    pub(crate) dot: Value,
}

impl RenderContext {
    /// Creates a context that renders the given main unit.
    pub fn new<S: Into<String>>(main: S) -> RenderContext {
        RenderContext {
            main: Some(main.into()),
            ..RenderContext::default()
        }
    }

    /// Wraps the main unit into a layout.
    pub fn with_layout<S: Into<String>>(mut self, layout: S) -> Self {
        self.layout = Some(layout.into());
        self
    }

    /// Maps a slot to a unit.
    pub fn with_yield<K: Into<String>, V: Into<String>>(mut self, slot: K, unit: V) -> Self {
        self.yields.insert(slot.into(), unit.into());
        self
    }

    /// Maps a slot to pre-rendered content.
    pub fn with_block<K: Into<String>>(mut self, slot: K, block: RenderedBlock) -> Self {
        self.blocks.insert(slot.into(), block);
        self
    }

    /// Sets the data the templates render with.
    pub fn with_dot<S: Serialize>(mut self, dot: S) -> Self {
        self.dot = Value::from_serialize(&dot);
        self
    }

    /// Returns the name of the main unit.
    pub fn main(&self) -> Option<&str> {
        self.main.as_deref()
    }

    /// Returns the name of the layout unit.
    pub fn layout(&self) -> Option<&str> {
        self.layout.as_deref()
    }

    /// Returns the unit a slot is mapped to.
    pub fn get_yield(&self, slot: &str) -> Option<&str> {
        self.yields.get(slot).map(|x| x.as_str())
    }

    /// Returns the pre-rendered content of a slot.
    pub fn get_block(&self, slot: &str) -> Option<&RenderedBlock> {
        self.blocks.get(slot)
    }

    /// Returns the render data.
    pub fn dot(&self) -> &Value {
        &self.dot
    }

    /// Returns `true` if a slot is mapped or filled.
    pub(crate) fn is_claimed(&self, slot: &str) -> bool {
        self.yields.contains_key(slot) || self.blocks.contains_key(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_kind_gate() {
        assert!(BlockKind::User.accepts(HtmlContext::Script));
        assert!(BlockKind::Js.accepts(HtmlContext::Script));
        assert!(!BlockKind::Html.accepts(HtmlContext::Script));
        assert!(!BlockKind::Css.accepts(HtmlContext::Script));
        assert!(!BlockKind::Js.accepts(HtmlContext::Style));
        assert_eq!(BlockKind::from(HtmlContext::Style), BlockKind::Css);
    }

    #[test]
    fn test_claimed_slots() {
        let ctx = RenderContext::new("index")
            .with_yield("nav", "partials/nav")
            .with_block("title", RenderedBlock::new("Hi", BlockKind::Html));
        assert!(ctx.is_claimed("nav"));
        assert!(ctx.is_claimed("title"));
        assert!(!ctx.is_claimed("footer"));
        assert_eq!(ctx.get_yield("nav"), Some("partials/nav"));
    }
}
