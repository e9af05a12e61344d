//! Store synchronization core
//!
//! [`SyncEngine`] owns the three stores and every rule that moves data
//! between them:
//!
//! ```text
//!   raw text ──parse──▶ canonical document ──to_graph──▶ graph
//!      ▲                        │
//!      └──────render────────────┘   (discrete edits)
//! ```
//!
//! - Text edits are parsed off the engine (see [`ReparseTicket`]); an
//!   accepted parse replaces the document and schedules a debounced rebuild.
//! - Discrete edits replace the document, regenerate the text and rebuild
//!   the graph synchronously.
//! - A rebuild keeps collapse, selection and focus by node id and drops only
//!   what refers to ids that no longer exist.
//!
//! The engine is single-writer and synchronous apart from the parse itself;
//! [`crate::Session`] puts it behind an ordered message queue.

use crate::adapters::{AdapterRegistry, Format, FormatAdapter};
use crate::config::EngineConfig;
use crate::error::{EditError, FormatParseError, SyncError};
use docgraph_document::{ContentHash, DocPath, Document, Edit, EditValue, Value, Version};
use docgraph_graph::{to_graph, CollapseOutcome, CollapseState, Graph, NodeId, OverflowError};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

/// Raw text as the user last typed or as last regenerated
#[derive(Debug, Clone, Default)]
struct TextStore {
    text: String,
    /// Bumped on every replacement; identifies the text a parse belongs to
    seq: u64,
    /// Last parse failure for the current text
    error: Option<FormatParseError>,
}

impl TextStore {
    fn replace(&mut self, text: String) -> u64 {
        self.text = text;
        self.seq += 1;
        self.seq
    }
}

/// Projection plus the transient UI state laid over it
#[derive(Debug)]
struct GraphStore {
    graph: Arc<Graph>,
    built_from: Version,
    overflow: Option<OverflowError>,
    collapse: CollapseState,
    selection: Option<NodeId>,
    focus: Option<NodeId>,
    rebuild_at: Option<Instant>,
    collapse_on_rebuild: bool,
}

/// What the renderer should draw
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum GraphView {
    /// Graph within the node ceiling
    Ready(Arc<Graph>),
    /// Graph above the ceiling; shown as a notice instead of nodes
    AboveLimit {
        #[serde(rename = "nodeCount")]
        node_count: usize,
        limit: usize,
    },
}

impl GraphView {
    /// Graph, if within the ceiling
    #[inline]
    #[must_use]
    pub fn graph(&self) -> Option<&Arc<Graph>> {
        match self {
            Self::Ready(graph) => Some(graph),
            Self::AboveLimit { .. } => None,
        }
    }

    /// Check if the graph is renderable
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// Point-in-time view handed to graph consumers
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSnapshot {
    /// Document version the graph was built from
    pub version: Version,
    pub view: GraphView,
    pub collapse: CollapseState,
    pub selection: Option<NodeId>,
    pub focus: Option<NodeId>,
    /// Parse error banner for the current text
    pub error: Option<String>,
}

/// Raw text with its format and parse state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextState {
    pub text: String,
    pub format: Format,
    pub error: Option<FormatParseError>,
}

/// Accepted edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditReceipt {
    /// Path that was written
    pub target: DocPath,
    /// Document version after the edit
    pub version: Version,
    /// Document hash after the edit
    pub hash: ContentHash,
}

/// A parse to run off the engine
///
/// Carries the text sequence and document version it started from so that
/// [`SyncEngine::finish_reparse`] can discard results that lost a race.
pub struct ReparseTicket {
    seq: u64,
    base: Version,
    text: String,
    adapter: Arc<dyn FormatAdapter>,
}

impl fmt::Debug for ReparseTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReparseTicket")
            .field("seq", &self.seq)
            .field("base", &self.base)
            .field("format", &self.adapter.format())
            .field("len", &self.text.len())
            .finish()
    }
}

impl ReparseTicket {
    /// Text sequence number
    #[inline]
    #[must_use]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Document version the parse started from
    #[inline]
    #[must_use]
    pub fn base(&self) -> Version {
        self.base
    }

    /// Run the adapter
    pub async fn run(self) -> ParsedText {
        let result = self.adapter.to_canonical(&self.text).await;
        ParsedText {
            seq: self.seq,
            base: self.base,
            result,
        }
    }
}

/// Result of a [`ReparseTicket`]
#[derive(Debug)]
pub struct ParsedText {
    seq: u64,
    base: Version,
    result: Result<Value, FormatParseError>,
}

impl ParsedText {
    /// Text sequence number the parse belongs to
    #[inline]
    #[must_use]
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// What [`SyncEngine::finish_reparse`] did with a parse result
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum ReparseOutcome {
    /// Document replaced; rebuild scheduled
    Applied(Version),
    /// Text parsed to the current document
    Unchanged,
    /// Newer text arrived while parsing
    Superseded,
    /// Document advanced while parsing
    Stale,
    /// Text does not parse; last good state kept
    Failed(FormatParseError),
}

/// Single-writer owner of text, document and graph
pub struct SyncEngine {
    config: EngineConfig,
    adapters: AdapterRegistry,
    format: Format,
    adapter: Arc<dyn FormatAdapter>,
    text: TextStore,
    document: Document,
    graph: GraphStore,
}

impl fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncEngine")
            .field("format", &self.format)
            .field("text_seq", &self.text.seq)
            .field("version", &self.document.version())
            .field("graph_version", &self.graph.built_from)
            .field("nodes", &self.graph.graph.node_count())
            .finish_non_exhaustive()
    }
}

impl SyncEngine {
    /// Engine over an empty object document, with the built-in adapters
    ///
    /// # Errors
    /// Returns [`SyncError::Config`] if the configuration is out of range, or
    /// [`SyncError::Format`] if `config.format` has no built-in adapter
    pub fn new(config: EngineConfig) -> Result<Self, SyncError> {
        Self::with_adapters(config, AdapterRegistry::with_defaults())
    }

    /// Engine over an empty object document
    ///
    /// # Errors
    /// Returns [`SyncError::Config`] if the configuration is out of range, or
    /// [`SyncError::Format`] if `config.format` has no adapter in `adapters`
    /// or the empty document cannot be rendered
    pub fn with_adapters(config: EngineConfig, adapters: AdapterRegistry) -> Result<Self, SyncError> {
        config.validate()?;
        let format = config.format;
        let adapter = adapters.get(format)?;
        let document = Document::default();
        let text = adapter.from_canonical(document.value())?;
        let graph = to_graph(document.value());
        let overflow = graph.check_limit(config.node_limit).err();

        Ok(Self {
            graph: GraphStore {
                graph: Arc::new(graph),
                built_from: document.version(),
                overflow,
                collapse: CollapseState::new(),
                selection: None,
                focus: None,
                rebuild_at: None,
                collapse_on_rebuild: false,
            },
            text: TextStore {
                text,
                seq: 0,
                error: None,
            },
            config,
            adapters,
            format,
            adapter,
            document,
        })
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Registered adapters
    #[inline]
    #[must_use]
    pub fn adapters(&self) -> &AdapterRegistry {
        &self.adapters
    }

    /// Current text format
    #[inline]
    #[must_use]
    pub fn format(&self) -> Format {
        self.format
    }

    /// Raw text
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text.text
    }

    /// Raw text with format and parse state
    #[must_use]
    pub fn text_state(&self) -> TextState {
        TextState {
            text: self.text.text.clone(),
            format: self.format,
            error: self.text.error.clone(),
        }
    }

    /// Parse error for the current text, if any
    #[inline]
    #[must_use]
    pub fn error(&self) -> Option<&FormatParseError> {
        self.text.error.as_ref()
    }

    /// Canonical document
    #[inline]
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Canonical value
    #[inline]
    #[must_use]
    pub fn value(&self) -> &Value {
        self.document.value()
    }

    /// Document version
    #[inline]
    #[must_use]
    pub fn version(&self) -> Version {
        self.document.version()
    }

    /// Current graph (possibly above the ceiling)
    #[inline]
    #[must_use]
    pub fn graph(&self) -> &Arc<Graph> {
        &self.graph.graph
    }

    /// Document version the graph was built from
    #[inline]
    #[must_use]
    pub fn graph_version(&self) -> Version {
        self.graph.built_from
    }

    /// Collapse sets
    #[inline]
    #[must_use]
    pub fn collapse_state(&self) -> &CollapseState {
        &self.graph.collapse
    }

    /// Selected node
    #[inline]
    #[must_use]
    pub fn selection(&self) -> Option<&NodeId> {
        self.graph.selection.as_ref()
    }

    /// Viewport focus
    #[inline]
    #[must_use]
    pub fn focus(&self) -> Option<&NodeId> {
        self.graph.focus.as_ref()
    }

    /// When the pending debounced rebuild is due
    #[inline]
    #[must_use]
    pub fn rebuild_deadline(&self) -> Option<Instant> {
        self.graph.rebuild_at
    }

    // ------------------------------------------------------------------
    // Text path
    // ------------------------------------------------------------------

    /// Record new raw text and hand back the parse to run
    ///
    /// Any earlier ticket is superseded from this point on.
    pub fn set_text(&mut self, text: impl Into<String>) -> ReparseTicket {
        let text = text.into();
        let seq = self.text.replace(text.clone());
        trace!(seq, len = text.len(), "text replaced");
        ReparseTicket {
            seq,
            base: self.document.version(),
            text,
            adapter: Arc::clone(&self.adapter),
        }
    }

    /// Apply a parse result
    ///
    /// Results for superseded text, or started before the document moved on,
    /// are discarded. A failure is recorded as the text's error and leaves
    /// document and graph at the last good state.
    pub fn finish_reparse(&mut self, parsed: ParsedText, now: Instant) -> ReparseOutcome {
        if parsed.seq != self.text.seq {
            trace!(seq = parsed.seq, current = self.text.seq, "discarding superseded parse");
            return ReparseOutcome::Superseded;
        }
        if parsed.base != self.document.version() {
            trace!(base = %parsed.base, current = %self.document.version(), "discarding stale parse");
            return ReparseOutcome::Stale;
        }

        let value = match parsed.result {
            Ok(value) => value,
            Err(err) => {
                warn!(error = %err, "text does not parse; keeping last good document");
                self.text.error = Some(err.clone());
                return ReparseOutcome::Failed(err);
            }
        };
        self.text.error = None;

        if ContentHash::of_value(&value) == *self.document.hash() {
            return ReparseOutcome::Unchanged;
        }

        // Typing keeps the user's collapse state; only the first document auto-collapses
        let first = self.document.version() == Version::INITIAL;
        let version = self.document.replace(value);
        self.graph.rebuild_at = Some(now + self.config.debounce());
        if first && self.config.collapse_on_load {
            self.graph.collapse_on_rebuild = true;
        }
        debug!(%version, "document replaced from text; rebuild scheduled");
        ReparseOutcome::Applied(version)
    }

    /// Replace the text, parse it inline and rebuild immediately
    ///
    /// # Errors
    /// Returns [`FormatParseError`] if the text does not parse; the
    /// previous document and graph stay in place
    pub async fn load(&mut self, text: impl Into<String>) -> Result<Version, FormatParseError> {
        let parsed = self.set_text(text).run().await;
        match self.finish_reparse(parsed, Instant::now()) {
            ReparseOutcome::Failed(err) => return Err(err),
            ReparseOutcome::Applied(_) if self.config.collapse_on_load => {
                self.graph.collapse_on_rebuild = true;
            }
            _ => {}
        }
        self.flush();
        info!(
            version = %self.document.version(),
            format = %self.format,
            nodes = self.graph.graph.node_count(),
            "document loaded"
        );
        Ok(self.document.version())
    }

    // ------------------------------------------------------------------
    // Discrete edit path
    // ------------------------------------------------------------------

    /// Replace the value at a display path
    ///
    /// # Errors
    /// See [`Self::apply`]
    pub fn apply_edit(&mut self, path: &str, value: impl Into<EditValue>) -> Result<EditReceipt, EditError> {
        let edit = Edit::parse(path, value)?;
        self.apply(edit)
    }

    /// Apply an edit: document, text and graph move together
    ///
    /// # Errors
    /// Returns [`EditError`] if the base hash is stale, the path does not
    /// resolve, the value does not parse, or the edited document cannot be
    /// rendered in the current format. Nothing changes on error.
    pub fn apply(&mut self, edit: Edit) -> Result<EditReceipt, EditError> {
        let result = self.try_apply(edit);
        if let Err(err) = &result {
            warn!(error = %err, "edit rejected");
        }
        result
    }

    fn try_apply(&mut self, edit: Edit) -> Result<EditReceipt, EditError> {
        edit.validate_base(self.document.hash())?;
        let target = edit.target().clone();
        let next = edit.apply(self.document.value())?;
        let text = self.adapter.from_canonical(&next)?;

        let version = self.document.replace(next);
        self.text.replace(text);
        self.text.error = None;
        self.rebuild();

        debug!(path = %target, %version, "edit applied");
        Ok(EditReceipt {
            target,
            version,
            hash: *self.document.hash(),
        })
    }

    /// Re-render the text in another format
    ///
    /// The canonical value and graph are untouched. Text that currently
    /// fails to parse is replaced by the rendering of the last good document.
    ///
    /// # Errors
    /// Returns [`FormatParseError`] if the format has no adapter or cannot
    /// represent the document; the previous format and text stay
    pub fn set_format(&mut self, format: Format) -> Result<(), FormatParseError> {
        let adapter = self.adapters.get(format)?;
        let text = adapter.from_canonical(self.document.value())?;

        info!(from = %self.format, to = %format, "format switched");
        self.format = format;
        self.adapter = adapter;
        self.text.replace(text);
        self.text.error = None;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Graph path
    // ------------------------------------------------------------------

    /// Rebuild now if a rebuild is pending or the graph is behind
    pub fn flush(&mut self) -> bool {
        if self.graph.rebuild_at.is_some() || self.graph.built_from != self.document.version() {
            self.rebuild();
            return true;
        }
        false
    }

    /// Rebuild if the debounce deadline has passed
    pub fn rebuild_if_due(&mut self, now: Instant) -> bool {
        match self.graph.rebuild_at {
            Some(deadline) if deadline <= now => {
                self.rebuild();
                true
            }
            _ => false,
        }
    }

    fn rebuild(&mut self) {
        let graph = to_graph(self.document.value());
        let store = &mut self.graph;

        store.overflow = graph.check_limit(self.config.node_limit).err();
        store.collapse.retain(&graph);
        if store.selection.as_ref().is_some_and(|id| !graph.contains(id.as_str())) {
            store.selection = None;
        }
        if store.focus.as_ref().is_some_and(|id| !graph.contains(id.as_str())) {
            store.focus = None;
        }
        if std::mem::take(&mut store.collapse_on_rebuild) {
            store.focus = store.collapse.collapse_all(&graph);
        }

        store.built_from = self.document.version();
        store.rebuild_at = None;
        debug!(
            version = %store.built_from,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "graph rebuilt"
        );
        if let Some(overflow) = &store.overflow {
            info!(%overflow, "graph above node limit");
        }
        store.graph = Arc::new(graph);
    }

    /// Collapse a container
    pub fn collapse(&mut self, id: &str) -> CollapseOutcome {
        let outcome = self.graph.collapse.collapse(&self.graph.graph, id);
        self.after_collapse_change(id, outcome)
    }

    /// Expand a container
    pub fn expand(&mut self, id: &str) -> CollapseOutcome {
        let outcome = self.graph.collapse.expand(&self.graph.graph, id);
        self.after_collapse_change(id, outcome)
    }

    /// Collapse if expanded, expand if collapsed
    pub fn toggle(&mut self, id: &str) -> CollapseOutcome {
        let outcome = self.graph.collapse.toggle(&self.graph.graph, id);
        self.after_collapse_change(id, outcome)
    }

    fn after_collapse_change(&mut self, id: &str, outcome: CollapseOutcome) -> CollapseOutcome {
        if !outcome.is_success() {
            debug!(node = id, ?outcome, "collapse request ignored");
        }
        self.drop_hidden_selection();
        outcome
    }

    // Selection inside a hidden subtree is no longer reachable
    fn drop_hidden_selection(&mut self) {
        let store = &mut self.graph;
        if store
            .selection
            .as_ref()
            .is_some_and(|sel| store.collapse.is_node_hidden(sel.as_str()))
        {
            store.selection = None;
        }
    }

    /// Collapse every top-level container; focus the first one
    pub fn collapse_all(&mut self) -> Option<NodeId> {
        let focus = self.graph.collapse.collapse_all(&self.graph.graph);
        self.graph.focus.clone_from(&focus);
        self.drop_hidden_selection();
        focus
    }

    /// Expand everything
    pub fn expand_all(&mut self) {
        self.graph.collapse.expand_all();
    }

    /// Select a node; unknown ids leave the selection unchanged
    pub fn select(&mut self, id: &str) -> bool {
        match self.graph.graph.node(id) {
            Some(node) => {
                self.graph.selection = Some(node.id.clone());
                true
            }
            None => false,
        }
    }

    /// Clear the selection
    pub fn clear_selection(&mut self) {
        self.graph.selection = None;
    }

    /// Canonical value behind a graph node
    #[must_use]
    pub fn node_value(&self, id: &str) -> Option<&Value> {
        let node = self.graph.graph.node(id)?;
        self.document.get(&node.path)
    }

    /// Ids of nodes matching `query`
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<NodeId> {
        self.graph.graph.search(query).into_iter().cloned().collect()
    }

    /// Snapshot for graph consumers
    #[must_use]
    pub fn snapshot(&self) -> GraphSnapshot {
        let view = match self.graph.overflow {
            Some(OverflowError { node_count, limit }) => GraphView::AboveLimit { node_count, limit },
            None => GraphView::Ready(Arc::clone(&self.graph.graph)),
        };
        GraphSnapshot {
            version: self.graph.built_from,
            view,
            collapse: self.graph.collapse.clone(),
            selection: self.graph.selection.clone(),
            focus: self.graph.focus.clone(),
            error: self.text.error.as_ref().map(ToString::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;

    fn engine() -> SyncEngine {
        SyncEngine::new(EngineConfig::new()).unwrap()
    }

    async fn parse_now(engine: &mut SyncEngine, text: &str) -> ReparseOutcome {
        let parsed = engine.set_text(text).run().await;
        engine.finish_reparse(parsed, Instant::now())
    }

    #[test]
    fn engine_starts_empty() {
        let engine = engine();
        assert_eq!(engine.value(), &json!({}));
        assert_eq!(engine.text(), "{}");
        assert_eq!(engine.graph().node_count(), 1);
        assert_eq!(engine.version(), Version::INITIAL);
    }

    #[test]
    fn engine_rejects_unsupported_format() {
        let err = SyncEngine::new(EngineConfig::new().with_format(Format::Xml)).unwrap_err();
        assert!(matches!(err, SyncError::Format(FormatParseError::Unsupported(Format::Xml))));
    }

    #[test]
    fn engine_rejects_zero_node_limit() {
        let err = SyncEngine::new(EngineConfig::new().with_node_limit(0)).unwrap_err();
        assert!(matches!(
            err,
            SyncError::Config(ConfigError::Invalid { field: "node_limit", .. })
        ));
    }

    #[tokio::test]
    async fn text_parse_schedules_debounced_rebuild() {
        let mut engine = engine();
        let start = Instant::now();
        let parsed = engine.set_text(r#"{"a": 1}"#).run().await;
        let outcome = engine.finish_reparse(parsed, start);

        assert_eq!(outcome, ReparseOutcome::Applied(Version::INITIAL.next()));
        assert_eq!(engine.value(), &json!({"a": 1}));
        assert_eq!(engine.graph_version(), Version::INITIAL);
        assert_eq!(engine.rebuild_deadline(), Some(start + Duration::from_millis(400)));

        assert!(!engine.rebuild_if_due(start + Duration::from_millis(399)));
        assert!(engine.rebuild_if_due(start + Duration::from_millis(400)));
        assert_eq!(engine.graph_version(), engine.version());
        assert!(engine.graph().contains("{Root}.a"));
    }

    #[tokio::test]
    async fn superseded_parse_is_discarded() {
        let mut engine = engine();
        let first = engine.set_text(r#"{"old": true}"#);
        let second = engine.set_text(r#"{"new": true}"#);

        let first = first.run().await;
        let second = second.run().await;
        assert_eq!(engine.finish_reparse(first, Instant::now()), ReparseOutcome::Superseded);
        assert_eq!(engine.value(), &json!({}));
        assert!(matches!(
            engine.finish_reparse(second, Instant::now()),
            ReparseOutcome::Applied(_)
        ));
        assert_eq!(engine.value(), &json!({"new": true}));
    }

    #[tokio::test]
    async fn edit_during_parse_wins() {
        let mut engine = engine();
        engine.load(r#"{"a": 1}"#).await.unwrap();

        let ticket = engine.set_text(r#"{"a": 2}"#);
        engine.apply_edit("{Root}.a", json!(3)).unwrap();
        let parsed = ticket.run().await;

        // The edit regenerated the text, so the older parse lost the race
        assert_eq!(engine.finish_reparse(parsed, Instant::now()), ReparseOutcome::Superseded);
        assert_eq!(engine.value(), &json!({"a": 3}));
    }

    #[test]
    fn stale_parse_is_discarded() {
        let mut engine = engine();
        let parsed = ParsedText {
            seq: engine.text.seq,
            base: engine.version().next(),
            result: Ok(json!({"x": 1})),
        };
        assert_eq!(engine.finish_reparse(parsed, Instant::now()), ReparseOutcome::Stale);
        assert_eq!(engine.value(), &json!({}));
    }

    #[tokio::test]
    async fn parse_failure_keeps_last_good_state() {
        let mut engine = engine();
        engine.load(r#"{"a": 1}"#).await.unwrap();
        let version = engine.version();

        let outcome = parse_now(&mut engine, r#"{"a": "#).await;
        assert!(matches!(outcome, ReparseOutcome::Failed(FormatParseError::Syntax { .. })));
        assert_eq!(engine.version(), version);
        assert_eq!(engine.graph_version(), version);
        assert_eq!(engine.text(), r#"{"a": "#);
        assert!(engine.snapshot().error.is_some());

        assert!(matches!(parse_now(&mut engine, r#"{"a": 1}"#).await, ReparseOutcome::Unchanged));
        assert!(engine.error().is_none());
        assert_eq!(engine.version(), version);
    }

    #[tokio::test]
    async fn key_reorder_counts_as_change() {
        let mut engine = engine();
        engine.load(r#"{"a": 1, "b": 2}"#).await.unwrap();
        let outcome = parse_now(&mut engine, r#"{"b": 2, "a": 1}"#).await;
        assert!(matches!(outcome, ReparseOutcome::Applied(_)));
    }

    #[tokio::test]
    async fn apply_edit_moves_all_stores() {
        let mut engine = engine();
        engine.load(r#"{"fruit": {"name": "Apple"}}"#).await.unwrap();

        let receipt = engine.apply_edit("{Root}.fruit.name", EditValue::Text("Orange".into())).unwrap();
        assert_eq!(receipt.version, engine.version());
        assert_eq!(receipt.hash, *engine.document().hash());
        assert_eq!(engine.text(), "{\n  \"fruit\": {\n    \"name\": \"Orange\"\n  }\n}");
        assert_eq!(engine.graph_version(), engine.version());
        assert_eq!(engine.node_value("{Root}.fruit.name"), Some(&json!("Orange")));
    }

    #[tokio::test]
    async fn rejected_edit_changes_nothing() {
        let mut engine = engine();
        engine.load(r#"{"a": 1}"#).await.unwrap();
        let version = engine.version();
        let text = engine.text().to_string();

        let err = engine.apply_edit("{Root}.b.c", json!(5)).unwrap_err();
        assert!(matches!(err, EditError::PathNotFound { .. }));
        let err = engine.apply_edit("Root[", json!(5)).unwrap_err();
        assert!(matches!(err, EditError::Path(_)));
        let err = engine.apply_edit("{Root}.a", EditValue::Json("{".into())).unwrap_err();
        assert!(matches!(err, EditError::Value(_)));

        let stale = Edit::parse("{Root}.a", json!(2))
            .unwrap()
            .with_base(ContentHash::compute(b"other"));
        assert!(matches!(engine.apply(stale), Err(EditError::StaleBase { .. })));

        assert_eq!(engine.version(), version);
        assert_eq!(engine.text(), text);
    }

    #[tokio::test]
    async fn set_format_rerenders_text_only() {
        let mut engine = engine();
        engine.load(r#"{"a": [1, 2]}"#).await.unwrap();
        let version = engine.version();

        engine.set_format(Format::Yaml).unwrap();
        assert_eq!(engine.format(), Format::Yaml);
        assert_eq!(engine.text(), "a:\n- 1\n- 2\n");
        assert_eq!(engine.version(), version);

        let err = engine.set_format(Format::Csv).unwrap_err();
        assert_eq!(err, FormatParseError::Unsupported(Format::Csv));
        assert_eq!(engine.format(), Format::Yaml);
    }

    #[tokio::test]
    async fn rebuild_keeps_collapse_and_selection_by_id() {
        let mut engine = engine();
        engine.load(r#"{"a": {"x": 1}, "b": {"y": 2}, "c": 3}"#).await.unwrap();
        assert_eq!(engine.collapse("{Root}.a"), CollapseOutcome::Collapsed);
        assert!(engine.select("{Root}.b.y"));
        assert!(!engine.select("{Root}.nope"));
        assert_eq!(engine.selection().map(NodeId::as_str), Some("{Root}.b.y"));

        engine.apply_edit("{Root}.c", json!(4)).unwrap();
        assert!(engine.collapse_state().is_collapsed("{Root}.a"));
        assert_eq!(engine.selection().map(NodeId::as_str), Some("{Root}.b.y"));

        engine.apply_edit("{Root}.b", json!("flat")).unwrap();
        assert_eq!(engine.selection(), None);
    }

    #[tokio::test]
    async fn collapse_hides_selection() {
        let mut engine = engine();
        engine.load(r#"{"a": {"x": 1}}"#).await.unwrap();
        engine.select("{Root}.a.x");
        engine.collapse("{Root}.a");
        assert_eq!(engine.selection(), None);
    }

    #[tokio::test]
    async fn collapse_all_sets_focus() {
        let mut engine = engine();
        engine.load(r#"{"a": {"x": 1}, "b": [1]}"#).await.unwrap();
        let focus = engine.collapse_all();
        assert_eq!(focus.as_ref().map(NodeId::as_str), Some("{Root}.a"));
        assert_eq!(engine.focus(), focus.as_ref());

        engine.expand_all();
        assert!(engine.collapse_state().is_empty());
    }

    #[tokio::test]
    async fn collapse_on_load_collapses_after_rebuild() {
        let config = EngineConfig::new().with_collapse_on_load(true);
        let mut engine = SyncEngine::new(config).unwrap();
        engine.load(r#"{"a": {"x": 1}, "b": 2}"#).await.unwrap();
        assert!(engine.collapse_state().is_collapsed("{Root}.a"));
        assert_eq!(engine.focus().map(NodeId::as_str), Some("{Root}.a"));
    }

    #[tokio::test]
    async fn collapse_on_load_leaves_typing_alone() {
        let config = EngineConfig::new().with_collapse_on_load(true);
        let mut engine = SyncEngine::new(config).unwrap();
        engine.load(r#"{"a": {"x": 1}, "b": {"y": 2}}"#).await.unwrap();
        assert!(engine.collapse_state().is_collapsed("{Root}.b"));

        engine.expand_all();
        assert_eq!(engine.collapse("{Root}.a"), CollapseOutcome::Collapsed);
        let before = engine.collapse_state().clone();

        let outcome = parse_now(&mut engine, r#"{"a": {"x": 1}, "b": {"y": 3}}"#).await;
        assert!(matches!(outcome, ReparseOutcome::Applied(_)));
        assert!(engine.flush());
        assert_eq!(engine.collapse_state(), &before);
        assert!(!engine.collapse_state().is_collapsed("{Root}.b"));

        engine.load(r#"{"c": [1]}"#).await.unwrap();
        assert!(engine.collapse_state().is_collapsed("{Root}.c"));
    }

    #[tokio::test]
    async fn collapse_on_load_applies_to_first_typed_document() {
        let config = EngineConfig::new().with_collapse_on_load(true);
        let mut engine = SyncEngine::new(config).unwrap();
        let outcome = parse_now(&mut engine, r#"{"a": {"x": 1}}"#).await;
        assert!(matches!(outcome, ReparseOutcome::Applied(_)));
        engine.flush();
        assert!(engine.collapse_state().is_collapsed("{Root}.a"));
    }

    #[tokio::test]
    async fn above_limit_view() {
        let config = EngineConfig::new().with_node_limit(3);
        let mut engine = SyncEngine::new(config).unwrap();
        engine.load(r#"{"a": 1, "b": 2, "c": 3}"#).await.unwrap();

        match engine.snapshot().view {
            GraphView::AboveLimit { node_count, limit } => {
                assert_eq!(node_count, 4);
                assert_eq!(limit, 3);
            }
            GraphView::Ready(_) => panic!("expected above-limit view"),
        }

        engine.apply_edit("{Root}", json!({"a": 1, "e": {}})).unwrap();
        assert!(engine.snapshot().view.is_ready());
    }

    #[tokio::test]
    async fn snapshot_serializes_for_renderer() {
        let mut engine = engine();
        engine.load(r#"{"a": 1}"#).await.unwrap();
        let json = serde_json::to_value(engine.snapshot()).unwrap();
        assert_eq!(json["version"], json!(1));
        assert_eq!(json["view"]["state"], json!("ready"));
        assert_eq!(json["view"]["nodes"][1]["id"], json!("{Root}.a"));
        assert_eq!(json["collapse"]["collapsedParents"], json!([]));
        assert_eq!(json["error"], json!(null));
    }

    #[tokio::test]
    async fn search_and_node_value() {
        let mut engine = engine();
        engine.load(r#"{"fruit": {"name": "Apple"}}"#).await.unwrap();
        let hits = engine.search("apple");
        assert_eq!(hits.len(), 2);
        assert_eq!(engine.node_value("{Root}.fruit"), Some(&json!({"name": "Apple"})));
        assert_eq!(engine.node_value("{Root}.missing"), None);
    }
}
