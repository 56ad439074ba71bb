//! # Raster Jobs
//!
//! Rotate and mirror change pixels, not just attributes. A job captures
//! what it needs from the tree up front, does the decode/transform/encode
//! off the editor's thread, and hands back a completion. The completion is
//! checked against the tree as it is *then*:
//!
//! - target gone, no longer an image, or its `src` changed: discarded,
//!   even when the pixel work failed
//! - raster failure: surfaced, attributes untouched
//! - otherwise: one transaction with the new `src` and attributes

use crate::mutations::Mutation;
use crate::transaction::{Origin, Transaction};
use crate::EditorError;
use lectern_parser::{NodeId, NodeKind, Tree};
use lectern_raster::{apply_async, AssetStore, Encoded, RasterOp, RasterResult};

/// A raster edit in flight
#[derive(Debug, Clone)]
pub struct RasterJob {
    pub node: NodeId,
    /// `src` the job was started from
    pub src: String,
    pub op: RasterOp,
    bytes: Vec<u8>,
}

/// Finished pixel work waiting to be committed
#[derive(Debug)]
pub struct RasterCompletion {
    pub node: NodeId,
    pub src: String,
    pub op: RasterOp,
    pub result: RasterResult<Encoded>,
}

/// What happened to a completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterOutcome {
    Applied { version: u64 },
    /// The target changed while the job ran
    Discarded,
}

impl RasterJob {
    /// Capture the image's source bytes for `op`
    pub fn begin(tree: &Tree, node: NodeId, op: RasterOp, assets: &dyn AssetStore) -> Result<Self, EditorError> {
        if tree.kind(node) != Some(NodeKind::Image) {
            return Err(EditorError::InvalidTarget(node));
        }
        let src = tree
            .attr(node, "src")
            .as_str()
            .filter(|src| !src.is_empty())
            .ok_or_else(|| EditorError::invalid_argument("image has no src"))?
            .to_string();
        let bytes = assets.load(&src)?;
        tracing::debug!(%node, ?op, bytes = bytes.len(), "raster job started");
        Ok(Self {
            node,
            src,
            op,
            bytes,
        })
    }

    /// Decode, transform and re-encode on the blocking pool
    pub async fn run(self) -> RasterCompletion {
        let result = apply_async(self.bytes, self.op).await;
        RasterCompletion {
            node: self.node,
            src: self.src,
            op: self.op,
            result,
        }
    }
}

impl RasterCompletion {
    /// Whether the target is still the image the job started from
    pub fn is_current(&self, tree: &Tree) -> bool {
        tree.kind(self.node) == Some(NodeKind::Image)
            && tree.attr(self.node, "src").as_str() == Some(self.src.as_str())
    }

    /// Transaction committing the new pixels. `Ok(None)` means the
    /// completion is stale and was dropped.
    pub fn into_transaction(
        self,
        tree: &Tree,
        assets: &dyn AssetStore,
    ) -> Result<Option<Transaction>, EditorError> {
        let current = self.is_current(tree);
        let RasterCompletion {
            node, op, result, ..
        } = self;

        if !current {
            tracing::debug!(%node, "stale raster completion discarded");
            return Ok(None);
        }
        let encoded = match result {
            Ok(encoded) => encoded,
            Err(err) => {
                tracing::warn!(%node, %err, "raster operation failed");
                return Err(EditorError::Raster(err));
            }
        };

        let src = assets.store(&encoded.bytes, encoded.mime)?;
        let mut transaction = Transaction::new(Origin::Raster).with(Mutation::set_attribute(node, "src", src));

        match op {
            RasterOp::Rotate { direction } => {
                let rotation = tree.attr(node, "rotation").as_int().unwrap_or(0);
                transaction.push(Mutation::set_attribute(
                    node,
                    "rotation",
                    (rotation + direction.degrees()).rem_euclid(360),
                ));
                // width and height trade places; missing values stay missing
                let width = tree.attr(node, "width").clone();
                let height = tree.attr(node, "height").clone();
                transaction.push(Mutation::set_attribute(node, "width", height));
                transaction.push(Mutation::set_attribute(node, "height", width));
                Ok(Some(transaction.describe("rotate image")))
            }
            RasterOp::Mirror { axis } => {
                let flipped = tree.attr(node, axis.attribute()).as_bool().unwrap_or(false);
                transaction.push(Mutation::set_attribute(node, axis.attribute(), !flipped));
                Ok(Some(transaction.describe("mirror image")))
            }
        }
    }
}
