//! # Direct Manipulation
//!
//! Pointer-driven resizing of images and tables.
//!
//! ```text
//!          pointer_down              pointer_up
//!   Idle ───────────────► Dragging ─────────────► Committing ──finish──► Idle
//!    ▲                      │  ▲ pointer_move         │
//!    └──────── cancel ──────┘  └──(preview only)      │
//!    └──────────────────────── cancel ────────────────┘
//! ```
//!
//! Moves only update the preview. Nothing reaches the document until
//! pointer-up, which yields one transaction with integer-rounded values.
//! The drag state lives here, never in the document; a target deleted
//! mid-drag cancels the drag on the next pointer event.

use crate::config::EditorConfig;
use crate::layout::Layout;
use crate::mutations::Mutation;
use crate::table_geometry::{self, TableMap};
use crate::transaction::{Origin, Transaction};
use crate::EditorError;
use lectern_parser::{NodeId, NodeKind, Tree};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn aspect_ratio(&self) -> f64 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }
}

/// Resize handle on a selected node's frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handle {
    N,
    S,
    E,
    W,
    Ne,
    Nw,
    Se,
    Sw,
}

impl Handle {
    pub const ALL: [Handle; 8] = [
        Handle::N,
        Handle::S,
        Handle::E,
        Handle::W,
        Handle::Ne,
        Handle::Nw,
        Handle::Se,
        Handle::Sw,
    ];

    /// Growth direction along x: east grows with +dx, west with -dx
    fn x_sign(self) -> f64 {
        match self {
            Handle::E | Handle::Ne | Handle::Se => 1.0,
            Handle::W | Handle::Nw | Handle::Sw => -1.0,
            Handle::N | Handle::S => 0.0,
        }
    }

    fn y_sign(self) -> f64 {
        match self {
            Handle::S | Handle::Se | Handle::Sw => 1.0,
            Handle::N | Handle::Ne | Handle::Nw => -1.0,
            Handle::E | Handle::W => 0.0,
        }
    }

    pub fn is_corner(self) -> bool {
        self.x_sign() != 0.0 && self.y_sign() != 0.0
    }

    pub fn name(self) -> &'static str {
        match self {
            Handle::N => "n",
            Handle::S => "s",
            Handle::E => "e",
            Handle::W => "w",
            Handle::Ne => "ne",
            Handle::Nw => "nw",
            Handle::Se => "se",
            Handle::Sw => "sw",
        }
    }
}

impl std::str::FromStr for Handle {
    type Err = EditorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Handle::ALL
            .into_iter()
            .find(|handle| handle.name() == s)
            .ok_or_else(|| EditorError::invalid_argument(format!("unknown handle {:?}", s)))
    }
}

/// New image size for a drag of `delta` on `handle`.
///
/// Corners keep the aspect ratio: the axis with the larger absolute delta
/// drives (width on ties) and the other follows. Edges change only their
/// own axis. Each dimension is then clamped to `[min, max]`.
pub fn resize_image(start: Size, handle: Handle, delta: Point, (min, max): (f64, f64)) -> Size {
    let dx = delta.x * handle.x_sign();
    let dy = delta.y * handle.y_sign();
    let ratio = start.aspect_ratio();

    let (width, height) = if handle.is_corner() {
        if dx.abs() >= dy.abs() {
            let width = start.width + dx;
            (width, width / ratio)
        } else {
            let height = start.height + dy;
            (height * ratio, height)
        }
    } else {
        (start.width + dx, start.height + dy)
    };

    Size::new(width.clamp(min, max), height.clamp(min, max))
}

/// New table size for a corner drag; no aspect lock, floor only
pub fn resize_table(start: Size, handle: Handle, delta: Point, min: Size) -> Size {
    Size::new(
        (start.width + delta.x * handle.x_sign()).max(min.width),
        (start.height + delta.y * handle.y_sign()).max(min.height),
    )
}

/// What a drag resizes
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragTarget {
    Image,
    Table,
    /// Right boundary of one table column
    Column(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Drag {
    pub node: NodeId,
    pub target: DragTarget,
    pub handle: Handle,
    pub origin: Point,
    /// Size captured at pointer-down; for a column drag only the width is
    /// meaningful
    pub start: Size,
    pub preview: Size,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(Drag),
    Committing(Drag),
}

#[derive(Debug, Default)]
pub struct ResizeController {
    state: DragState,
    config: EditorConfig,
}

impl ResizeController {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            state: DragState::Idle,
            config,
        }
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == DragState::Idle
    }

    /// Size the host should draw while dragging
    pub fn preview(&self) -> Option<Size> {
        match &self.state {
            DragState::Dragging(drag) => Some(drag.preview),
            _ => None,
        }
    }

    /// Start resizing an image or a table from one of its handles
    pub fn pointer_down(
        &mut self,
        tree: &Tree,
        layout: &dyn Layout,
        node: NodeId,
        handle: Handle,
        origin: Point,
    ) -> Result<(), EditorError> {
        self.ensure_idle()?;
        let (target, start) = match tree.kind(node) {
            Some(NodeKind::Image) => (DragTarget::Image, layout.image_size(tree, node)),
            Some(NodeKind::Table) if handle.is_corner() => {
                (DragTarget::Table, layout.table_size(tree, node))
            }
            Some(NodeKind::Table) => {
                return Err(EditorError::invalid_argument(format!(
                    "tables resize from corners only, not {:?}",
                    handle.name()
                )))
            }
            _ => return Err(EditorError::InvalidTarget(node)),
        };
        self.begin(node, target, handle, origin, start);
        Ok(())
    }

    /// Start dragging the right boundary of `column`
    pub fn pointer_down_column(
        &mut self,
        tree: &Tree,
        table: NodeId,
        column: usize,
        origin: Point,
    ) -> Result<(), EditorError> {
        self.ensure_idle()?;
        if tree.kind(table) != Some(NodeKind::Table) {
            return Err(EditorError::InvalidTarget(table));
        }
        let widths = table_geometry::column_widths(tree, table, &self.config);
        let Some(width) = widths.get(column) else {
            return Err(EditorError::invalid_argument(format!(
                "table has no column {}",
                column
            )));
        };
        let start = Size::new(*width as f64, 0.0);
        self.begin(table, DragTarget::Column(column), Handle::E, origin, start);
        Ok(())
    }

    fn ensure_idle(&mut self) -> Result<(), EditorError> {
        match self.state {
            DragState::Idle => Ok(()),
            // the previous commit was already handed out
            DragState::Committing(_) => {
                self.state = DragState::Idle;
                Ok(())
            }
            DragState::Dragging(_) => Err(EditorError::DragInProgress),
        }
    }

    fn begin(&mut self, node: NodeId, target: DragTarget, handle: Handle, origin: Point, start: Size) {
        tracing::debug!(%node, ?target, handle = handle.name(), "drag started");
        self.state = DragState::Dragging(Drag {
            node,
            target,
            handle,
            origin,
            start,
            preview: start,
        });
    }

    /// Update the preview. Returns `None` when no drag is active or the
    /// target disappeared (which cancels the drag).
    pub fn pointer_move(&mut self, tree: &Tree, point: Point) -> Option<Size> {
        let DragState::Dragging(drag) = &self.state else {
            return None;
        };
        if !target_alive(tree, drag) {
            self.cancel();
            return None;
        }
        let preview = self.geometry(tree, drag, point);
        if let DragState::Dragging(drag) = &mut self.state {
            drag.preview = preview;
        }
        Some(preview)
    }

    /// Finish the drag. Yields the commit transaction and leaves the
    /// controller in `Committing` until [`finish`](Self::finish).
    pub fn pointer_up(
        &mut self,
        tree: &Tree,
        layout: &dyn Layout,
        point: Point,
    ) -> Result<Option<Transaction>, EditorError> {
        let DragState::Dragging(drag) = &self.state else {
            return Ok(None);
        };
        if !target_alive(tree, drag) {
            self.cancel();
            return Ok(None);
        }

        let mut drag = drag.clone();
        drag.preview = self.geometry(tree, &drag, point);
        let transaction = match drag.target {
            DragTarget::Image => Transaction::new(Origin::Manipulation)
                .with(Mutation::set_attribute(
                    drag.node,
                    "width",
                    drag.preview.width.round() as i64,
                ))
                .with(Mutation::set_attribute(
                    drag.node,
                    "height",
                    drag.preview.height.round() as i64,
                ))
                .describe("resize image"),
            DragTarget::Table => {
                table_geometry::commit_table_resize(tree, drag.node, drag.preview, layout, &self.config)?
            }
            DragTarget::Column(column) => table_geometry::resize_column(
                tree,
                drag.node,
                column,
                drag.preview.width.round() as u32,
                &self.config,
            )?,
        };

        tracing::debug!(node = %drag.node, width = drag.preview.width, height = drag.preview.height, "drag released");
        self.state = DragState::Committing(drag);
        Ok(Some(transaction))
    }

    /// The commit was applied (or rejected); accept new drags
    pub fn finish(&mut self) {
        if matches!(self.state, DragState::Committing(_)) {
            self.state = DragState::Idle;
        }
    }

    /// Abandon the drag. Returns whether one was active.
    pub fn cancel(&mut self) -> bool {
        let active = !self.is_idle();
        if active {
            tracing::debug!("drag cancelled");
        }
        self.state = DragState::Idle;
        active
    }

    fn geometry(&self, tree: &Tree, drag: &Drag, point: Point) -> Size {
        let delta = Point::new(point.x - drag.origin.x, point.y - drag.origin.y);
        match drag.target {
            DragTarget::Image => resize_image(drag.start, drag.handle, delta, self.config.media_bounds()),
            DragTarget::Table => {
                let map = TableMap::build(tree, drag.node);
                let min = Size::new(
                    (map.width() as u32 * self.config.min_column_width) as f64,
                    (map.height() as u32 * self.config.min_row_height) as f64,
                );
                resize_table(drag.start, drag.handle, delta, min)
            }
            DragTarget::Column(_) => Size::new(
                (drag.start.width + delta.x).max(self.config.min_column_width as f64),
                0.0,
            ),
        }
    }
}

fn target_alive(tree: &Tree, drag: &Drag) -> bool {
    let expected = match drag.target {
        DragTarget::Image => NodeKind::Image,
        DragTarget::Table | DragTarget::Column(_) => NodeKind::Table,
    };
    tree.kind(drag.node) == Some(expected)
}
