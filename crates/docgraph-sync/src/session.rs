//! Session actor
//!
//! One task owns the [`SyncEngine`]; every surface talks to it through a
//! cloneable [`SessionHandle`]. Messages are handled in submission order,
//! with two refinements:
//!
//! - Text parses run on their own task. A newer `set_text` aborts the
//!   in-flight parse instead of waiting for it.
//! - Writes that depend on the document (edits, format switches, flushes)
//!   are deferred while a parse is in flight and replayed, in order, once it
//!   settles. A `set_text` queued behind deferred writes waits its turn too,
//!   so a later write is never overwritten by an earlier one.
//!
//! Reads, collapse and selection changes are answered immediately from the
//! last built graph.

use crate::adapters::Format;
use crate::engine::{EditReceipt, GraphSnapshot, ParsedText, SyncEngine, TextState};
use crate::error::{EditError, FormatParseError, SyncError};
use docgraph_document::{Edit, EditValue, Value};
use docgraph_graph::{CollapseOutcome, NodeId};
use std::collections::VecDeque;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, trace};

const COMMAND_BUFFER: usize = 64;

type Reply<T> = oneshot::Sender<T>;

#[derive(Debug, Clone, Copy)]
enum CollapseOp {
    Collapse,
    Expand,
    Toggle,
}

/// Message type for session operations
#[derive(Debug)]
enum Command {
    SetText { text: String, reply: Reply<u64> },
    Apply { edit: Edit, reply: Reply<Result<EditReceipt, EditError>> },
    SetFormat { format: Format, reply: Reply<Result<(), FormatParseError>> },
    Flush { reply: Reply<GraphSnapshot> },
    Collapse { id: String, op: CollapseOp, reply: Reply<CollapseOutcome> },
    CollapseAll { reply: Reply<Option<NodeId>> },
    ExpandAll { reply: Reply<()> },
    Select { id: String, reply: Reply<bool> },
    Snapshot { reply: Reply<GraphSnapshot> },
    Text { reply: Reply<TextState> },
    NodeValue { id: String, reply: Reply<Option<Value>> },
    Search { query: String, reply: Reply<Vec<NodeId>> },
}

impl Command {
    /// Must observe the outcome of any parse in flight
    fn waits_for_parse(&self) -> bool {
        matches!(self, Self::Apply { .. } | Self::SetFormat { .. } | Self::Flush { .. })
    }
}

/// Actor owning one [`SyncEngine`]
pub struct Session {
    engine: SyncEngine,
    commands: mpsc::Receiver<Command>,
    parsed_tx: mpsc::Sender<ParsedText>,
    parsed_rx: mpsc::Receiver<ParsedText>,
    in_flight: Option<(u64, JoinHandle<()>)>,
    deferred: VecDeque<Command>,
}

impl Session {
    /// Spawn the actor on the current runtime
    ///
    /// The actor stops once every handle is dropped.
    #[must_use]
    pub fn spawn(engine: SyncEngine) -> SessionHandle {
        let (commands_tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let (parsed_tx, parsed_rx) = mpsc::channel(4);
        let session = Self {
            engine,
            commands,
            parsed_tx,
            parsed_rx,
            in_flight: None,
            deferred: VecDeque::new(),
        };
        tokio::spawn(session.run());
        SessionHandle {
            commands: commands_tx,
        }
    }

    async fn run(mut self) {
        info!("session started");
        loop {
            let deadline = self.engine.rebuild_deadline();
            tokio::select! {
                biased;
                Some(parsed) = self.parsed_rx.recv() => self.on_parsed(parsed),
                command = self.commands.recv() => match command {
                    Some(command) => self.dispatch(command),
                    None => break,
                },
                () = sleep_until_deadline(deadline) => {
                    self.engine.rebuild_if_due(Instant::now());
                }
            }
        }
        if let Some((_, task)) = self.in_flight.take() {
            task.abort();
        }
        info!("session stopped");
    }

    fn on_parsed(&mut self, parsed: ParsedText) {
        let settles = self.in_flight.as_ref().is_some_and(|(seq, _)| *seq == parsed.seq());
        let outcome = self.engine.finish_reparse(parsed, Instant::now());
        trace!(?outcome, "parse finished");
        if settles {
            self.in_flight = None;
            self.drain_deferred();
        }
    }

    fn dispatch(&mut self, command: Command) {
        let defer = match &command {
            Command::SetText { .. } => !self.deferred.is_empty(),
            other if other.waits_for_parse() => self.in_flight.is_some() || !self.deferred.is_empty(),
            _ => false,
        };
        if defer {
            debug!(deferred = self.deferred.len() + 1, "deferring until parse settles");
            self.deferred.push_back(command);
        } else {
            self.handle(command);
        }
    }

    fn drain_deferred(&mut self) {
        while self.in_flight.is_none() {
            let Some(command) = self.deferred.pop_front() else {
                break;
            };
            self.handle(command);
        }
    }

    // Replies are dropped silently when the caller has gone away
    fn handle(&mut self, command: Command) {
        match command {
            Command::SetText { text, reply } => {
                let seq = self.start_parse(text);
                let _ = reply.send(seq);
            }
            Command::Apply { edit, reply } => {
                let _ = reply.send(self.engine.apply(edit));
            }
            Command::SetFormat { format, reply } => {
                let _ = reply.send(self.engine.set_format(format));
            }
            Command::Flush { reply } => {
                self.engine.flush();
                let _ = reply.send(self.engine.snapshot());
            }
            Command::Collapse { id, op, reply } => {
                let outcome = match op {
                    CollapseOp::Collapse => self.engine.collapse(&id),
                    CollapseOp::Expand => self.engine.expand(&id),
                    CollapseOp::Toggle => self.engine.toggle(&id),
                };
                let _ = reply.send(outcome);
            }
            Command::CollapseAll { reply } => {
                let _ = reply.send(self.engine.collapse_all());
            }
            Command::ExpandAll { reply } => {
                self.engine.expand_all();
                let _ = reply.send(());
            }
            Command::Select { id, reply } => {
                let _ = reply.send(self.engine.select(&id));
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.engine.snapshot());
            }
            Command::Text { reply } => {
                let _ = reply.send(self.engine.text_state());
            }
            Command::NodeValue { id, reply } => {
                let _ = reply.send(self.engine.node_value(&id).cloned());
            }
            Command::Search { query, reply } => {
                let _ = reply.send(self.engine.search(&query));
            }
        }
    }

    fn start_parse(&mut self, text: String) -> u64 {
        let ticket = self.engine.set_text(text);
        let seq = ticket.seq();
        if let Some((old, task)) = self.in_flight.take() {
            trace!(seq = old, "cancelling superseded parse");
            task.abort();
        }
        let parsed_tx = self.parsed_tx.clone();
        let task = tokio::spawn(async move {
            let parsed = ticket.run().await;
            let _ = parsed_tx.send(parsed).await;
        });
        self.in_flight = Some((seq, task));
        seq
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Client interface for a running [`Session`]
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
}

impl SessionHandle {
    async fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Result<T, SyncError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| SyncError::Closed)?;
        response.await.map_err(|_| SyncError::Closed)
    }

    /// Replace the raw text; returns its sequence number
    ///
    /// Parsing happens in the background. Use [`Self::flush`] to wait for
    /// the resulting graph.
    ///
    /// # Errors
    /// Returns [`SyncError::Closed`] if the session has stopped
    pub async fn set_text(&self, text: impl Into<String>) -> Result<u64, SyncError> {
        let text = text.into();
        self.request(|reply| Command::SetText { text, reply }).await
    }

    /// Replace the value at a display path
    ///
    /// # Errors
    /// Returns [`SyncError::Edit`] if the edit is rejected
    pub async fn apply_edit(&self, path: &str, value: impl Into<EditValue>) -> Result<EditReceipt, SyncError> {
        let edit = Edit::parse(path, value).map_err(EditError::from)?;
        self.apply(edit).await
    }

    /// Apply a prepared edit
    ///
    /// # Errors
    /// Returns [`SyncError::Edit`] if the edit is rejected
    pub async fn apply(&self, edit: Edit) -> Result<EditReceipt, SyncError> {
        Ok(self.request(|reply| Command::Apply { edit, reply }).await??)
    }

    /// Re-render the text in another format
    ///
    /// # Errors
    /// Returns [`SyncError::Format`] if the format is unsupported or cannot
    /// represent the document
    pub async fn set_format(&self, format: Format) -> Result<(), SyncError> {
        Ok(self.request(|reply| Command::SetFormat { format, reply }).await??)
    }

    /// Wait for pending parses and rebuild now
    ///
    /// # Errors
    /// Returns [`SyncError::Closed`] if the session has stopped
    pub async fn flush(&self) -> Result<GraphSnapshot, SyncError> {
        self.request(|reply| Command::Flush { reply }).await
    }

    /// Current snapshot, without waiting for pending work
    ///
    /// # Errors
    /// Returns [`SyncError::Closed`] if the session has stopped
    pub async fn snapshot(&self) -> Result<GraphSnapshot, SyncError> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Raw text, format and parse error
    ///
    /// # Errors
    /// Returns [`SyncError::Closed`] if the session has stopped
    pub async fn text(&self) -> Result<TextState, SyncError> {
        self.request(|reply| Command::Text { reply }).await
    }

    /// Collapse a container
    ///
    /// # Errors
    /// Returns [`SyncError::Closed`] if the session has stopped
    pub async fn collapse(&self, id: impl Into<String>) -> Result<CollapseOutcome, SyncError> {
        self.collapse_op(id.into(), CollapseOp::Collapse).await
    }

    /// Expand a container
    ///
    /// # Errors
    /// Returns [`SyncError::Closed`] if the session has stopped
    pub async fn expand(&self, id: impl Into<String>) -> Result<CollapseOutcome, SyncError> {
        self.collapse_op(id.into(), CollapseOp::Expand).await
    }

    /// Toggle a container
    ///
    /// # Errors
    /// Returns [`SyncError::Closed`] if the session has stopped
    pub async fn toggle(&self, id: impl Into<String>) -> Result<CollapseOutcome, SyncError> {
        self.collapse_op(id.into(), CollapseOp::Toggle).await
    }

    async fn collapse_op(&self, id: String, op: CollapseOp) -> Result<CollapseOutcome, SyncError> {
        self.request(|reply| Command::Collapse { id, op, reply }).await
    }

    /// Collapse every top-level container
    ///
    /// # Errors
    /// Returns [`SyncError::Closed`] if the session has stopped
    pub async fn collapse_all(&self) -> Result<Option<NodeId>, SyncError> {
        self.request(|reply| Command::CollapseAll { reply }).await
    }

    /// Expand everything
    ///
    /// # Errors
    /// Returns [`SyncError::Closed`] if the session has stopped
    pub async fn expand_all(&self) -> Result<(), SyncError> {
        self.request(|reply| Command::ExpandAll { reply }).await
    }

    /// Select a node
    ///
    /// # Errors
    /// Returns [`SyncError::Closed`] if the session has stopped
    pub async fn select(&self, id: impl Into<String>) -> Result<bool, SyncError> {
        let id = id.into();
        self.request(|reply| Command::Select { id, reply }).await
    }

    /// Canonical value behind a node
    ///
    /// # Errors
    /// Returns [`SyncError::Closed`] if the session has stopped
    pub async fn node_value(&self, id: impl Into<String>) -> Result<Option<Value>, SyncError> {
        let id = id.into();
        self.request(|reply| Command::NodeValue { id, reply }).await
    }

    /// Ids of nodes matching `query`
    ///
    /// # Errors
    /// Returns [`SyncError::Closed`] if the session has stopped
    pub async fn search(&self, query: impl Into<String>) -> Result<Vec<NodeId>, SyncError> {
        let query = query.into();
        self.request(|reply| Command::Search { query, reply }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use docgraph_document::Version;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::sleep;

    fn spawn() -> SessionHandle {
        Session::spawn(SyncEngine::new(EngineConfig::new()).unwrap())
    }

    #[tokio::test]
    async fn session_set_text_then_flush() {
        let session = spawn();
        assert_eq!(session.set_text(r#"{"a": 1}"#).await.unwrap(), 1);

        let snapshot = session.flush().await.unwrap();
        assert_eq!(snapshot.version.get(), 1);
        assert_eq!(snapshot.view.graph().unwrap().node_count(), 2);
    }

    #[tokio::test]
    async fn session_edit_waits_for_parse() {
        let session = spawn();
        session.set_text(r#"{"a": 1}"#).await.unwrap();
        let receipt = session
            .apply_edit("{Root}.a", EditValue::Text("2".into()))
            .await
            .unwrap();
        assert_eq!(receipt.version.get(), 2);

        let text = session.text().await.unwrap();
        assert!(text.text.contains("\"a\": 2"));
        assert_eq!(session.node_value("{Root}.a").await.unwrap(), Some(json!(2)));
    }

    #[tokio::test]
    async fn session_newer_text_wins() {
        let session = spawn();
        session.set_text(r#"{"a": 1}"#).await.unwrap();
        session.set_text(r#"{"b": 2}"#).await.unwrap();

        let snapshot = session.flush().await.unwrap();
        let graph = snapshot.view.graph().unwrap();
        assert!(graph.contains("{Root}.b"));
        assert!(!graph.contains("{Root}.a"));
    }

    #[tokio::test]
    async fn session_parse_error_keeps_graph() {
        let session = spawn();
        session.set_text(r#"{"a": 1}"#).await.unwrap();
        session.flush().await.unwrap();

        session.set_text(r#"{"a": "#).await.unwrap();
        let snapshot = session.flush().await.unwrap();
        assert_eq!(snapshot.version.get(), 1);
        assert!(snapshot.error.is_some());
        assert!(session.text().await.unwrap().error.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn session_rebuild_is_debounced() {
        let session = spawn();
        session.set_text(r#"{"a": 1}"#).await.unwrap();

        sleep(Duration::from_millis(100)).await;
        assert_eq!(session.snapshot().await.unwrap().version, Version::INITIAL);

        sleep(Duration::from_millis(400)).await;
        assert_eq!(session.snapshot().await.unwrap().version.get(), 1);
    }

    #[tokio::test]
    async fn session_collapse_round_trip() {
        let session = spawn();
        session
            .set_text(r#"{"a": {"b": 1}, "c": [1, 2]}"#)
            .await
            .unwrap();
        session.flush().await.unwrap();

        assert_eq!(session.collapse("{Root}.a").await.unwrap(), CollapseOutcome::Collapsed);
        assert_eq!(session.toggle("{Root}.a").await.unwrap(), CollapseOutcome::Expanded);
        assert_eq!(session.expand("{Root}.c").await.unwrap(), CollapseOutcome::AlreadyExpanded);

        assert_eq!(session.collapse_all().await.unwrap(), Some(NodeId::from("{Root}.a")));
        let snapshot = session.snapshot().await.unwrap();
        assert_eq!(snapshot.collapse.collapsed_parents().len(), 2);

        session.expand_all().await.unwrap();
        assert!(session.snapshot().await.unwrap().collapse.is_empty());
    }

    #[tokio::test]
    async fn session_select_and_search() {
        let session = spawn();
        session.set_text(r#"{"fruit": "Apple"}"#).await.unwrap();
        session.flush().await.unwrap();

        assert!(session.select("{Root}.fruit").await.unwrap());
        assert!(!session.select("{Root}.car").await.unwrap());
        assert_eq!(
            session.search("apple").await.unwrap(),
            vec![NodeId::from("{Root}"), NodeId::from("{Root}.fruit")]
        );
    }

    #[tokio::test]
    async fn session_set_format_after_parse() {
        let session = spawn();
        session.set_text(r#"{"a": [1, 2]}"#).await.unwrap();
        session.set_format(Format::Yaml).await.unwrap();

        let text = session.text().await.unwrap();
        assert_eq!(text.format, Format::Yaml);
        assert_eq!(text.text, "a:\n- 1\n- 2\n");
        assert!(matches!(
            session.set_format(Format::Csv).await,
            Err(SyncError::Format(FormatParseError::Unsupported(Format::Csv)))
        ));
    }
}
