//! Raw video frames and timing metadata.

use serde::{Deserialize, Serialize};

/// The unit in which a presentation timestamp is expressed, as a rational
/// number of seconds (`num / den`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBase {
    pub num: i32,
    pub den: i32,
}

impl TimeBase {
    pub fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    /// Common 90 kHz RTP video clock.
    pub const VIDEO_90KHZ: TimeBase = TimeBase { num: 1, den: 90_000 };
}

/// One unit of video data carried on a track: an RGB24 pixel buffer plus the
/// presentation timestamp and time-base it was read with.
///
/// Any frame emitted downstream must carry the pts and time-base of the frame
/// it was derived from, whether or not the pixels were modified.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Packed RGB24 pixel data, `width * height * 3` bytes
    pub data: Vec<u8>,
    /// Presentation timestamp in `time_base` units
    pub pts: i64,
    /// Unit of `pts`
    pub time_base: TimeBase,
}

impl VideoFrame {
    /// Create a frame, validating the buffer length.
    pub fn new(width: u32, height: u32, data: Vec<u8>, pts: i64, time_base: TimeBase) -> Option<Self> {
        if data.len() != (width as usize) * (height as usize) * 3 {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
            pts,
            time_base,
        })
    }

    /// A black frame, useful in tests.
    pub fn black(width: u32, height: u32, pts: i64, time_base: TimeBase) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; (width as usize) * (height as usize) * 3],
            pts,
            time_base,
        }
    }

    /// Presentation time in seconds.
    pub fn pts_seconds(&self) -> f64 {
        self.pts as f64 * self.time_base.num as f64 / self.time_base.den as f64
    }
}
