//! Raw frame model
//!
//! A frame is one still image's raw pixel buffer plus its dimensions and
//! pixel layout tag. Buffers are validated at construction; the pipe writer
//! never re-derives sizes from untrusted input.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{EngineError, EngineResult};

pub mod raw_file;

pub use raw_file::RawFileSource;

/// Supported raw pixel layouts
///
/// A closed set: every tag maps to a fixed bytes-per-pixel figure, so frame
/// sizes are always computable up front. Formats with fractional per-pixel
/// sizes (planar chroma-subsampled layouts) are intentionally absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PixelFormat {
    /// 8-bit RGBA, 4 bytes per pixel
    Rgba,
    /// 8-bit BGRA, 4 bytes per pixel
    Bgra,
    /// 8-bit RGB, 3 bytes per pixel
    Rgb24,
    /// 8-bit grayscale, 1 byte per pixel
    Gray8,
    /// 16-bit grayscale, 2 bytes per pixel
    Gray16,
    /// 16-bit RGB, 6 bytes per pixel
    Rgb48,
}

impl PixelFormat {
    /// All supported formats, in tag order
    pub const ALL: [PixelFormat; 6] = [
        PixelFormat::Rgba,
        PixelFormat::Bgra,
        PixelFormat::Rgb24,
        PixelFormat::Gray8,
        PixelFormat::Gray16,
        PixelFormat::Rgb48,
    ];

    /// The tag understood by the external tool's rawvideo de/muxer
    pub fn tag(self) -> &'static str {
        match self {
            PixelFormat::Rgba => "rgba",
            PixelFormat::Bgra => "bgra",
            PixelFormat::Rgb24 => "rgb24",
            PixelFormat::Gray8 => "gray",
            PixelFormat::Gray16 => "gray16le",
            PixelFormat::Rgb48 => "rgb48le",
        }
    }

    /// Bytes occupied by one pixel in this layout
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Gray8 => 1,
            PixelFormat::Gray16 => 2,
            PixelFormat::Rgb24 => 3,
            PixelFormat::Rgba | PixelFormat::Bgra => 4,
            PixelFormat::Rgb48 => 6,
        }
    }

    /// Look up a format by tag; unknown tags are rejected here, never later
    pub fn from_tag(tag: &str) -> EngineResult<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.tag() == tag)
            .ok_or_else(|| EngineError::UnknownPixelFormat(tag.to_string()))
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for PixelFormat {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s)
    }
}

impl TryFrom<String> for PixelFormat {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_tag(&value)
    }
}

impl From<PixelFormat> for String {
    fn from(value: PixelFormat) -> Self {
        value.tag().to_string()
    }
}

/// Geometry and layout of the frames crossing one pipe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSpec {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Pixel layout
    pub format: PixelFormat,
}

impl FrameSpec {
    /// Create a spec, rejecting zero dimensions and geometries whose byte
    /// length does not fit a `usize`
    pub fn new(width: u32, height: u32, format: PixelFormat) -> EngineResult<Self> {
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(format.bytes_per_pixel()));
        if width == 0 || height == 0 || len.is_none() {
            return Err(EngineError::FrameSize {
                format: format.tag().to_string(),
                width,
                height,
                expected: 0,
                actual: 0,
            });
        }
        Ok(Self {
            width,
            height,
            format,
        })
    }

    /// Byte length of one frame in this spec
    ///
    /// Saturates on overflow; specs built through `new` are always exact.
    pub fn frame_len(&self) -> usize {
        (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|pixels| pixels.checked_mul(self.format.bytes_per_pixel()))
            .unwrap_or(usize::MAX)
    }
}

/// One raw video frame
///
/// Owns its pixel buffer. Frames are moved into the pipe writer and dropped
/// as soon as their bytes flush; they are never retained after consumption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    spec: FrameSpec,
    data: Vec<u8>,
}

impl Frame {
    /// Create a frame, validating the buffer length against the spec
    pub fn new(spec: FrameSpec, data: Vec<u8>) -> EngineResult<Self> {
        let expected = spec.frame_len();
        if data.len() != expected {
            return Err(EngineError::FrameSize {
                format: spec.format.tag().to_string(),
                width: spec.width,
                height: spec.height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { spec, data })
    }

    /// Frame geometry and layout
    pub fn spec(&self) -> FrameSpec {
        self.spec
    }

    /// Frame width in pixels
    pub fn width(&self) -> u32 {
        self.spec.width
    }

    /// Frame height in pixels
    pub fn height(&self) -> u32 {
        self.spec.height
    }

    /// Pixel layout
    pub fn format(&self) -> PixelFormat {
        self.spec.format
    }

    /// Raw pixel bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume the frame, yielding its buffer
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> FrameSpec {
        FrameSpec::new(4, 2, PixelFormat::Rgba).unwrap()
    }

    #[test]
    fn frame_len_is_width_height_bpp() {
        assert_eq!(spec().frame_len(), 4 * 2 * 4);
        let gray = FrameSpec::new(10, 10, PixelFormat::Gray8).unwrap();
        assert_eq!(gray.frame_len(), 100);
    }

    #[test]
    fn valid_buffer_is_accepted() {
        let frame = Frame::new(spec(), vec![0u8; 32]).unwrap();
        assert_eq!(frame.data().len(), 32);
        assert_eq!(frame.format(), PixelFormat::Rgba);
    }

    #[test]
    fn short_buffer_is_rejected_at_construction() {
        let err = Frame::new(spec(), vec![0u8; 31]).unwrap_err();
        match err {
            EngineError::FrameSize {
                expected, actual, ..
            } => {
                assert_eq!(expected, 32);
                assert_eq!(actual, 31);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        assert!(FrameSpec::new(0, 2, PixelFormat::Rgba).is_err());
        assert!(FrameSpec::new(2, 0, PixelFormat::Rgba).is_err());
    }

    #[test]
    fn overflowing_geometry_is_rejected() {
        let err = FrameSpec::new(u32::MAX, u32::MAX, PixelFormat::Rgb48).unwrap_err();
        assert!(matches!(err, EngineError::FrameSize { .. }));
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let err = PixelFormat::from_tag("yuv420p").unwrap_err();
        assert!(matches!(err, EngineError::UnknownPixelFormat(_)));
    }

    #[test]
    fn tags_round_trip() {
        for format in PixelFormat::ALL {
            assert_eq!(PixelFormat::from_tag(format.tag()).unwrap(), format);
        }
    }
}
