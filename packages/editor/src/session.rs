//! # Edit Session Management
//!
//! An EditSession is one editor instance: the document, its history, the
//! selection, the drag controller and the collaborators the editor talks
//! to (asset store, layout).
//!
//! Everything that changes the document funnels through the session, one
//! request at a time. Code outside the session (dialogs, toolbars, other
//! tasks) holds an [`EditorHandle`] and sends [`EditorRequest`]s over the
//! session's channel instead of reaching into it; the session answers on a
//! oneshot and broadcasts [`EditorEvent`]s to subscribers.

use crate::commands::{self, After, Command};
use crate::config::EditorConfig;
use crate::layout::{Layout, ModelLayout};
use crate::manipulation::{Handle, Point, ResizeController, Size};
use crate::raster_jobs::{RasterCompletion, RasterJob, RasterOutcome};
use crate::selection::Selection;
use crate::transaction::Transaction;
use crate::undo_stack::UndoStack;
use crate::{Document, EditorError, Mutation};
use lectern_parser::{AttrValue, NodeId, NodeKind, Tree};
use lectern_raster::{dimensions, AssetStore, DataUrlStore, MirrorAxis, RasterOp, RotateDirection};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};

const EVENT_BUFFER: usize = 64;

/// Work submitted to a session from outside
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "request", rename_all = "camelCase")]
pub enum EditorRequest {
    Command { command: Command },
    /// Swap an image's source, e.g. after an upload or an edit in an
    /// external dialog
    ReplaceImage {
        node: NodeId,
        src: String,
        #[serde(default)]
        width: Option<i64>,
        #[serde(default)]
        height: Option<i64>,
    },
}

/// Broadcast to every subscriber of a session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum EditorEvent {
    Committed {
        version: u64,
        description: Option<String>,
    },
    Rejected {
        command: String,
        error: String,
    },
    RasterDiscarded {
        node: NodeId,
    },
    DragCancelled,
}

/// Result of a command as reported across the session boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandOutcome {
    pub success: bool,
    pub version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandOutcome {
    fn from_result(result: Result<u64, EditorError>, current: u64) -> Self {
        match result {
            Ok(version) => Self {
                success: true,
                version,
                error: None,
            },
            Err(err) => Self {
                success: false,
                version: current,
                error: Some(err.to_string()),
            },
        }
    }
}

type Envelope = (EditorRequest, Option<oneshot::Sender<CommandOutcome>>);

/// Cloneable sender side of a session's request channel
#[derive(Debug, Clone)]
pub struct EditorHandle {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl EditorHandle {
    /// Queue a request without waiting for it
    pub fn send(&self, request: EditorRequest) -> Result<(), EditorError> {
        self.tx
            .send((request, None))
            .map_err(|_| EditorError::SessionClosed)
    }

    /// Queue a request and wait until the session has processed it
    pub async fn request(&self, request: EditorRequest) -> Result<CommandOutcome, EditorError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.tx
            .send((request, Some(response_tx)))
            .map_err(|_| EditorError::SessionClosed)?;
        response_rx.await.map_err(|_| EditorError::SessionClosed)
    }

    pub async fn execute(&self, command: Command) -> Result<CommandOutcome, EditorError> {
        self.request(EditorRequest::Command { command }).await
    }
}

/// Single editor instance
pub struct EditSession {
    /// Unique session identifier
    pub id: String,

    document: Document,
    history: UndoStack,
    selection: Selection,
    resize: ResizeController,
    config: EditorConfig,
    assets: Arc<dyn AssetStore>,
    layout: Box<dyn Layout>,
    request_tx: Option<mpsc::UnboundedSender<Envelope>>,
    request_rx: mpsc::UnboundedReceiver<Envelope>,
    events: broadcast::Sender<EditorEvent>,
}

impl std::fmt::Debug for EditSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditSession")
            .field("id", &self.id)
            .field("version", &self.document.version)
            .field("selection", &self.selection)
            .field("drag", self.resize.state())
            .finish_non_exhaustive()
    }
}

impl EditSession {
    /// Create new edit session with default configuration
    pub fn new(id: impl Into<String>, document: Document) -> Self {
        Self::with_config(id, document, EditorConfig::default())
    }

    pub fn with_config(id: impl Into<String>, document: Document, config: EditorConfig) -> Self {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            id: id.into(),
            document: document.with_sync_scope(config.sync_scope),
            history: UndoStack::with_max_levels(config.undo_levels),
            selection: Selection::None,
            resize: ResizeController::new(config.clone()),
            layout: Box::new(ModelLayout::new(config.clone())),
            assets: Arc::new(DataUrlStore::new()),
            config,
            request_tx: Some(request_tx),
            request_rx,
            events,
        }
    }

    pub fn with_assets(mut self, assets: Arc<dyn AssetStore>) -> Self {
        self.assets = assets;
        self
    }

    pub fn with_layout(mut self, layout: Box<dyn Layout>) -> Self {
        self.layout = layout;
        self
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    pub fn tree(&self) -> &Tree {
        self.document.tree()
    }

    pub fn version(&self) -> u64 {
        self.document.version
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn history(&self) -> &UndoStack {
        &self.history
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn set_selection(&mut self, selection: Selection) -> Result<(), EditorError> {
        if !selection.is_valid(self.tree()) {
            return Err(EditorError::invalid_argument("selection does not fit the document"));
        }
        self.selection = selection;
        Ok(())
    }

    /// Select by child-index path from the root
    pub fn select_path(&mut self, path: &[usize], from: Option<usize>, to: Option<usize>) -> Result<(), EditorError> {
        let tree = self.tree();
        let node = tree
            .node_at_path(path)
            .ok_or_else(|| EditorError::invalid_argument(format!("no node at path {:?}", path)))?;
        let selection = match tree.kind(node) {
            Some(NodeKind::Doc) => Selection::None,
            Some(kind) if kind.is_textblock() => {
                let from = from.unwrap_or(0);
                Selection::Text {
                    block: node,
                    from,
                    to: to.unwrap_or(from),
                }
            }
            Some(kind) if kind.is_cell() => Selection::Cell { cell: node },
            _ => Selection::Node { node },
        };
        self.set_selection(selection)
    }

    /// Handle for submitting requests from elsewhere. Fails once the
    /// session is serving via [`run`](Self::run).
    pub fn handle(&self) -> Result<EditorHandle, EditorError> {
        self.request_tx
            .as_ref()
            .map(|tx| EditorHandle { tx: tx.clone() })
            .ok_or(EditorError::SessionClosed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EditorEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: EditorEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    /// Commit a transaction and record it for undo. Empty transactions are
    /// a no-op.
    pub fn commit(&mut self, transaction: Transaction, after: Option<&After>) -> Result<u64, EditorError> {
        if transaction.is_empty() {
            return Ok(self.document.version);
        }
        let description = transaction.description.clone();
        let before = self.document.tree().clone();
        let result = self.document.apply(transaction)?;

        self.history.record(
            before,
            self.document.tree().clone(),
            result.applied.clone(),
            description.clone(),
        );
        self.selection = match after {
            Some(after) => after.resolve(self.document.tree(), &result, self.selection),
            None => self.selection,
        };
        self.revalidate_selection();
        self.emit(EditorEvent::Committed {
            version: result.version,
            description,
        });
        Ok(result.version)
    }

    fn revalidate_selection(&mut self) {
        if !self.selection.is_valid(self.document.tree()) {
            self.selection = Selection::None;
        }
    }

    /// Run a command that needs no asynchronous work
    pub fn apply_command(&mut self, command: &Command) -> Result<u64, EditorError> {
        match command {
            Command::RotateImage { .. } | Command::MirrorImage { .. } => Err(EditorError::RequiresAsync),
            Command::Undo => {
                self.undo();
                Ok(self.version())
            }
            Command::Redo => {
                self.redo();
                Ok(self.version())
            }
            Command::Select { path, from, to } => {
                self.select_path(path, *from, *to)?;
                Ok(self.version())
            }
            Command::ResizeNode { handle, delta } => self.resize_node(*handle, *delta),
            Command::InsertImage { attrs } => {
                let command = Command::InsertImage {
                    attrs: self.complete_image_attrs(attrs.clone()),
                };
                self.apply_plan(&command)
            }
            _ => self.apply_plan(command),
        }
    }

    fn apply_plan(&mut self, command: &Command) -> Result<u64, EditorError> {
        let plan = commands::plan(command, self.document.tree(), &self.selection, &self.config)?;
        self.commit(plan.transaction, Some(&plan.after))
    }

    /// Fill in missing image dimensions from the pixels, when they load
    fn complete_image_attrs(&self, mut attrs: BTreeMap<String, AttrValue>) -> BTreeMap<String, AttrValue> {
        let missing = |attrs: &BTreeMap<String, AttrValue>, name: &str| {
            attrs.get(name).map_or(true, AttrValue::is_null)
        };
        if !missing(&attrs, "width") && !missing(&attrs, "height") {
            return attrs;
        }
        let Some(src) = attrs.get("src").and_then(AttrValue::as_str) else {
            return attrs;
        };
        let measured = self.assets.load(src).and_then(|bytes| dimensions(&bytes));
        match measured {
            Ok((width, height)) => {
                let (min, max) = self.config.media_bounds();
                let clamp = |v: u32| (v as f64).clamp(min, max).round() as i64;
                if missing(&attrs, "width") {
                    attrs.insert("width".to_string(), AttrValue::Int(clamp(width)));
                }
                if missing(&attrs, "height") {
                    attrs.insert("height".to_string(), AttrValue::Int(clamp(height)));
                }
            }
            Err(err) => tracing::debug!(%err, "image dimensions unavailable"),
        }
        attrs
    }

    /// Run any command, raster ones included. Never fails; the outcome
    /// carries the error.
    pub async fn execute(&mut self, command: Command) -> CommandOutcome {
        let result = match &command {
            Command::RotateImage { direction } => self.rotate_image(*direction).await.map(|_| self.version()),
            Command::MirrorImage { axis } => self.mirror_image(*axis).await.map(|_| self.version()),
            other => self.apply_command(other),
        };
        if let Err(err) = &result {
            tracing::warn!(session = %self.id, command = command.name(), %err, "command rejected");
            self.emit(EditorEvent::Rejected {
                command: command.name().to_string(),
                error: err.to_string(),
            });
        }
        CommandOutcome::from_result(result, self.version())
    }

    pub fn undo(&mut self) -> bool {
        self.resize.cancel();
        let undone = self.history.undo(&mut self.document);
        if undone {
            self.after_history("undo");
        }
        undone
    }

    pub fn redo(&mut self) -> bool {
        self.resize.cancel();
        let redone = self.history.redo(&mut self.document);
        if redone {
            self.after_history("redo");
        }
        redone
    }

    fn after_history(&mut self, description: &str) {
        self.revalidate_selection();
        self.emit(EditorEvent::Committed {
            version: self.document.version,
            description: Some(description.to_string()),
        });
    }

    // ------------------------------------------------------------------
    // Direct manipulation
    // ------------------------------------------------------------------

    /// Node a resize handle belongs to: the selected image or table, or
    /// the table around the selection
    fn resize_target(&self) -> Result<NodeId, EditorError> {
        let tree = self.tree();
        if let Selection::Node { node } = self.selection {
            if matches!(tree.kind(node), Some(NodeKind::Image | NodeKind::Table)) {
                return Ok(node);
            }
        }
        self.selection
            .table(tree)
            .ok_or(EditorError::Selection("an image or table"))
    }

    pub fn pointer_down(&mut self, handle: Handle, point: Point) -> Result<(), EditorError> {
        let node = self.resize_target()?;
        self.resize
            .pointer_down(self.document.tree(), self.layout.as_ref(), node, handle, point)
    }

    pub fn pointer_down_column(&mut self, column: usize, point: Point) -> Result<(), EditorError> {
        let table = self
            .selection
            .table(self.tree())
            .ok_or(EditorError::Selection("a table"))?;
        self.resize
            .pointer_down_column(self.document.tree(), table, column, point)
    }

    pub fn pointer_move(&mut self, point: Point) -> Option<Size> {
        let was_dragging = !self.resize.is_idle();
        let preview = self.resize.pointer_move(self.document.tree(), point);
        if was_dragging && self.resize.is_idle() {
            self.emit(EditorEvent::DragCancelled);
        }
        preview
    }

    /// Release the pointer. Returns the committed version, or `None` when
    /// there was nothing to commit.
    pub fn pointer_up(&mut self, point: Point) -> Result<Option<u64>, EditorError> {
        let released = self
            .resize
            .pointer_up(self.document.tree(), self.layout.as_ref(), point);
        let transaction = match released {
            Ok(Some(transaction)) => transaction,
            Ok(None) => return Ok(None),
            Err(err) => {
                self.resize.cancel();
                return Err(err);
            }
        };
        let committed = self.commit(transaction, None);
        self.resize.finish();
        committed.map(Some)
    }

    pub fn cancel_drag(&mut self) {
        if self.resize.cancel() {
            self.emit(EditorEvent::DragCancelled);
        }
    }

    /// One-shot resize: press on `handle`, move by `delta`, release
    fn resize_node(&mut self, handle: Handle, delta: Point) -> Result<u64, EditorError> {
        self.pointer_down(handle, Point::default())?;
        match self.pointer_up(delta)? {
            Some(version) => Ok(version),
            None => Ok(self.version()),
        }
    }

    // ------------------------------------------------------------------
    // Raster
    // ------------------------------------------------------------------

    fn selected_image(&self) -> Result<NodeId, EditorError> {
        self.selection
            .image(self.tree())
            .ok_or(EditorError::Selection("an image"))
    }

    /// Capture what a raster edit of `node` needs
    pub fn begin_raster(&self, node: NodeId, op: RasterOp) -> Result<RasterJob, EditorError> {
        RasterJob::begin(self.tree(), node, op, self.assets.as_ref())
    }

    /// Commit a finished raster job, unless its target changed meanwhile
    pub fn complete_raster(&mut self, completion: RasterCompletion) -> Result<RasterOutcome, EditorError> {
        let node = completion.node;
        match completion.into_transaction(self.document.tree(), self.assets.as_ref())? {
            Some(transaction) => {
                let version = self.commit(transaction, None)?;
                Ok(RasterOutcome::Applied { version })
            }
            None => {
                self.emit(EditorEvent::RasterDiscarded { node });
                Ok(RasterOutcome::Discarded)
            }
        }
    }

    pub async fn rotate_image(&mut self, direction: RotateDirection) -> Result<RasterOutcome, EditorError> {
        let node = self.selected_image()?;
        let job = self.begin_raster(node, RasterOp::Rotate { direction })?;
        let completion = job.run().await;
        self.complete_raster(completion)
    }

    pub async fn mirror_image(&mut self, axis: MirrorAxis) -> Result<RasterOutcome, EditorError> {
        let node = self.selected_image()?;
        let job = self.begin_raster(node, RasterOp::Mirror { axis })?;
        let completion = job.run().await;
        self.complete_raster(completion)
    }

    /// Point an image at a new source
    pub fn replace_image(
        &mut self,
        node: NodeId,
        src: &str,
        width: Option<i64>,
        height: Option<i64>,
    ) -> Result<u64, EditorError> {
        if self.tree().kind(node) != Some(NodeKind::Image) {
            return Err(EditorError::InvalidTarget(node));
        }
        let mut transaction = Transaction::user()
            .with(Mutation::set_attribute(node, "src", src))
            .describe("replace image");
        if let Some(width) = width {
            transaction.push(Mutation::set_attribute(node, "width", width));
        }
        if let Some(height) = height {
            transaction.push(Mutation::set_attribute(node, "height", height));
        }
        self.commit(transaction, None)
    }

    // ------------------------------------------------------------------
    // Request channel
    // ------------------------------------------------------------------

    async fn serve(&mut self, request: EditorRequest) -> CommandOutcome {
        match request {
            EditorRequest::Command { command } => self.execute(command).await,
            EditorRequest::ReplaceImage {
                node,
                src,
                width,
                height,
            } => {
                let result = self.replace_image(node, &src, width, height);
                if let Err(err) = &result {
                    tracing::warn!(session = %self.id, %node, %err, "image replacement rejected");
                }
                CommandOutcome::from_result(result, self.version())
            }
        }
    }

    /// Serve every request queued so far. Returns how many were handled.
    pub async fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok((request, reply)) = self.request_rx.try_recv() {
            let outcome = self.serve(request).await;
            if let Some(reply) = reply {
                let _ = reply.send(outcome);
            }
            handled += 1;
        }
        handled
    }

    /// Serve requests until every handle is dropped, then hand the session
    /// back
    pub async fn run(mut self) -> Self {
        self.request_tx.take();
        tracing::info!(session = %self.id, "edit session serving requests");
        while let Some((request, reply)) = self.request_rx.recv().await {
            let outcome = self.serve(request).await;
            if let Some(reply) = reply {
                let _ = reply.send(outcome);
            }
        }
        tracing::info!(session = %self.id, version = self.version(), "edit session stopped");
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn session(source: &str) -> EditSession {
        let document = Document::from_source(PathBuf::from("test.html"), source).unwrap();
        EditSession::new("test-session", document)
    }

    #[test]
    fn test_create_session() {
        let session = session("<p>a</p>");
        assert_eq!(session.id, "test-session");
        assert_eq!(session.selection(), Selection::None);
        assert_eq!(session.version(), 0);
    }

    #[test]
    fn test_commands_record_history() {
        let mut session = session("<p>a</p>");
        session.select_path(&[0], Some(1), None).unwrap();
        session
            .apply_command(&Command::InsertText { text: "b".into() })
            .unwrap();
        assert_eq!(session.document().source(), "<p>ab</p>");
        assert_eq!(session.history().undo_description(), Some("insertText"));

        assert!(session.undo());
        assert_eq!(session.document().source(), "<p>a</p>");
        assert!(session.redo());
        assert_eq!(session.document().source(), "<p>ab</p>");
    }

    #[test]
    fn test_raster_commands_need_async() {
        let mut session = session("<p>a</p>");
        assert!(matches!(
            session.apply_command(&Command::RotateImage {
                direction: RotateDirection::Right
            }),
            Err(EditorError::RequiresAsync)
        ));
    }

    #[tokio::test]
    async fn test_failed_command_reports_outcome() {
        let mut session = session("<p>a</p>");
        let mut events = session.subscribe();
        let outcome = session
            .execute(Command::SetCellBackground {
                color: Some("#fff".into()),
            })
            .await;
        assert!(!outcome.success);
        assert_eq!(outcome.version, 0);
        assert!(outcome.error.is_some());
        assert!(matches!(events.try_recv(), Ok(EditorEvent::Rejected { .. })));
    }

    #[tokio::test]
    async fn test_handle_requests_are_served() {
        let mut session = session("<p>a</p>");
        let handle = session.handle().unwrap();
        handle
            .send(EditorRequest::Command {
                command: Command::InsertParagraph { text: "b".into() },
            })
            .unwrap();

        assert_eq!(session.process_pending().await, 1);
        assert_eq!(session.document().source(), "<p>a</p><p>b</p>");
    }

    #[tokio::test]
    async fn test_run_until_handles_drop() {
        let session = session("<p>a</p>");
        let handle = session.handle().unwrap();
        let server = tokio::spawn(session.run());

        let outcome = handle
            .execute(Command::InsertParagraph { text: "b".into() })
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.version, 1);
        drop(handle);

        let session = server.await.unwrap();
        assert_eq!(session.document().source(), "<p>a</p><p>b</p>");
    }
}
