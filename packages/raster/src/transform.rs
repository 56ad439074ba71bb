//! Pixel-level rotate and mirror.
//!
//! Every operation decodes the source bytes, applies a single quarter turn
//! or flip to the decoded pixels, and re-encodes as PNG. Operations compose
//! onto whatever pixels they are given, so rotating an already rotated
//! image turns it further instead of resetting it.

use crate::error::{RasterError, RasterResult};
use image::{DynamicImage, GenericImageView, ImageFormat};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotateDirection {
    Left,
    Right,
}

impl RotateDirection {
    /// Signed rotation step in degrees
    pub fn degrees(self) -> i64 {
        match self {
            RotateDirection::Left => -90,
            RotateDirection::Right => 90,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MirrorAxis {
    Horizontal,
    Vertical,
}

impl MirrorAxis {
    /// Image attribute toggled by mirroring on this axis
    pub fn attribute(self) -> &'static str {
        match self {
            MirrorAxis::Horizontal => "flipH",
            MirrorAxis::Vertical => "flipV",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum RasterOp {
    Rotate { direction: RotateDirection },
    Mirror { axis: MirrorAxis },
}

/// Re-encoded image
#[derive(Debug, Clone, PartialEq)]
pub struct Encoded {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
    pub width: u32,
    pub height: u32,
}

pub fn decode(bytes: &[u8]) -> RasterResult<DynamicImage> {
    image::load_from_memory(bytes).map_err(RasterError::Decode)
}

/// Pixel dimensions of an encoded image
pub fn dimensions(bytes: &[u8]) -> RasterResult<(u32, u32)> {
    Ok(decode(bytes)?.dimensions())
}

pub fn encode_png(image: &DynamicImage) -> RasterResult<Encoded> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(RasterError::Encode)?;
    let (width, height) = image.dimensions();
    Ok(Encoded {
        bytes: buffer.into_inner(),
        mime: "image/png",
        width,
        height,
    })
}

/// Decode, transform and re-encode synchronously
pub fn apply(bytes: &[u8], op: RasterOp) -> RasterResult<Encoded> {
    let image = decode(bytes)?;
    let transformed = match op {
        RasterOp::Rotate {
            direction: RotateDirection::Right,
        } => image.rotate90(),
        RasterOp::Rotate {
            direction: RotateDirection::Left,
        } => image.rotate270(),
        RasterOp::Mirror {
            axis: MirrorAxis::Horizontal,
        } => image.fliph(),
        RasterOp::Mirror {
            axis: MirrorAxis::Vertical,
        } => image.flipv(),
    };
    tracing::debug!(?op, width = transformed.width(), height = transformed.height(), "raster transformed");
    encode_png(&transformed)
}

/// [`apply`] on the blocking pool. The only suspension point of a raster
/// edit.
pub async fn apply_async(bytes: Vec<u8>, op: RasterOp) -> RasterResult<Encoded> {
    tokio::task::spawn_blocking(move || apply(&bytes, op))
        .await
        .map_err(|e| RasterError::Task(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    /// 2x1 image: red on the left, blue on the right
    fn two_pixels() -> Vec<u8> {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, RED);
        img.put_pixel(1, 0, BLUE);
        encode_png(&DynamicImage::ImageRgba8(img)).unwrap().bytes
    }

    fn pixel(bytes: &[u8], x: u32, y: u32) -> Rgba<u8> {
        decode(bytes).unwrap().to_rgba8().get_pixel(x, y).to_owned()
    }

    #[test]
    fn test_rotate_right_turns_clockwise() {
        let out = apply(
            &two_pixels(),
            RasterOp::Rotate {
                direction: RotateDirection::Right,
            },
        )
        .unwrap();
        assert_eq!((out.width, out.height), (1, 2));
        // Left edge moves to the top
        assert_eq!(pixel(&out.bytes, 0, 0), RED);
        assert_eq!(pixel(&out.bytes, 0, 1), BLUE);
    }

    #[test]
    fn test_rotations_compose() {
        let right = RasterOp::Rotate {
            direction: RotateDirection::Right,
        };
        let left = RasterOp::Rotate {
            direction: RotateDirection::Left,
        };
        let source = two_pixels();
        let turned = apply(&apply(&source, right).unwrap().bytes, left).unwrap();
        assert_eq!((turned.width, turned.height), (2, 1));
        assert_eq!(pixel(&turned.bytes, 0, 0), RED);
    }

    #[test]
    fn test_mirror_horizontal() {
        let out = apply(
            &two_pixels(),
            RasterOp::Mirror {
                axis: MirrorAxis::Horizontal,
            },
        )
        .unwrap();
        assert_eq!((out.width, out.height), (2, 1));
        assert_eq!(pixel(&out.bytes, 0, 0), BLUE);
        assert_eq!(pixel(&out.bytes, 1, 0), RED);
    }

    #[test]
    fn test_corrupt_source_fails_to_decode() {
        let err = apply(
            b"not an image",
            RasterOp::Mirror {
                axis: MirrorAxis::Vertical,
            },
        )
        .unwrap_err();
        assert!(matches!(err, RasterError::Decode(_)));
    }

    #[tokio::test]
    async fn test_apply_async_runs_on_blocking_pool() {
        let out = apply_async(
            two_pixels(),
            RasterOp::Rotate {
                direction: RotateDirection::Left,
            },
        )
        .await
        .unwrap();
        assert_eq!((out.width, out.height), (1, 2));
        assert_eq!(pixel(&out.bytes, 0, 0), BLUE);
    }
}
