//! Raster operations behind image rotate and mirror.
//!
//! [`transform`] holds the pixel work, [`assets`] resolves the `src`
//! references an image node carries into bytes and back.

pub mod assets;
pub mod error;
pub mod transform;

pub use assets::{decode_data_url, encode_data_url, AssetStore, DataUrlStore, MemoryStore};
pub use error::{RasterError, RasterResult};
pub use transform::{apply, apply_async, dimensions, Encoded, MirrorAxis, RasterOp, RotateDirection};
