//! Overlay drawing.
//!
//! Detection boxes and captions are drawn into a mutable copy of the input
//! frame; the source buffer is never touched. Captions use an embedded
//! DejaVu Sans face, so the binary carries its own font.

use std::sync::OnceLock;

use ab_glyph::{FontRef, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use lens_models::{Detection, VideoFrame};

/// Detection box and caption color.
pub const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
/// Frame counter caption color.
pub const COUNTER_COLOR: Rgb<u8> = Rgb([255, 255, 0]);

// Outlines are nested 1px rectangles
const BOX_THICKNESS: u32 = 2;
const CAPTION_SCALE: f32 = 16.0;
const COUNTER_SCALE: f32 = 22.0;

static FONT_BYTES: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

fn font() -> &'static FontRef<'static> {
    static FONT: OnceLock<FontRef<'static>> = OnceLock::new();
    FONT.get_or_init(|| FontRef::try_from_slice(FONT_BYTES).expect("embedded font is valid"))
}

/// Produce an annotated copy of `frame` carrying the same pts/time-base.
pub fn annotate(frame: &VideoFrame, detections: &[Detection], frame_counter: u64) -> VideoFrame {
    let mut out = frame.clone();
    let data = std::mem::take(&mut out.data);
    let Some(mut img) = RgbImage::from_raw(frame.width, frame.height, data) else {
        // Buffer does not match the stated dimensions; pass the copy through
        out.data = frame.data.clone();
        return out;
    };

    for det in detections {
        draw_detection(&mut img, det);
    }
    draw_text_mut(
        &mut img,
        COUNTER_COLOR,
        10,
        10,
        PxScale::from(COUNTER_SCALE),
        font(),
        &format!("Frame: {frame_counter}"),
    );

    out.data = img.into_raw();
    out
}

/// Box outline plus a `"{class} {conf:.2}"` caption above the top edge.
fn draw_detection(img: &mut RgbImage, det: &Detection) {
    let x1 = det.bbox.x1.round() as i32;
    let y1 = det.bbox.y1.round() as i32;
    let w = det.bbox.width().round().max(1.0) as u32;
    let h = det.bbox.height().round().max(1.0) as u32;

    for t in 0..BOX_THICKNESS {
        let iw = w.saturating_sub(2 * t).max(1);
        let ih = h.saturating_sub(2 * t).max(1);
        let rect = Rect::at(x1 + t as i32, y1 + t as i32).of_size(iw, ih);
        draw_hollow_rect_mut(img, rect, BOX_COLOR);
    }

    let caption_y = (y1 - CAPTION_SCALE as i32 - 4).max(0);
    draw_text_mut(
        img,
        BOX_COLOR,
        x1.max(0),
        caption_y,
        PxScale::from(CAPTION_SCALE),
        font(),
        &det.caption(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use lens_models::{BoundingBox, TimeBase};

    fn frame(pts: i64) -> VideoFrame {
        VideoFrame::black(320, 240, pts, TimeBase::VIDEO_90KHZ)
    }

    fn cup_at(x1: f32, y1: f32) -> Detection {
        Detection {
            class_id: 41,
            class_name: "cup".to_string(),
            confidence: 0.91,
            bbox: BoundingBox::new(x1, y1, x1 + 40.0, y1 + 40.0),
        }
    }

    #[test]
    fn test_annotate_preserves_timing_and_dimensions() {
        let input = frame(12345);
        let out = annotate(&input, &[cup_at(40.0, 80.0)], 3);
        assert_eq!(out.pts, input.pts);
        assert_eq!(out.time_base, input.time_base);
        assert_eq!(out.width, input.width);
        assert_eq!(out.height, input.height);
        assert_eq!(out.data.len(), input.data.len());
    }

    #[test]
    fn test_annotate_does_not_mutate_input() {
        let input = frame(0);
        let before = input.data.clone();
        let _ = annotate(&input, &[cup_at(40.0, 80.0)], 1);
        assert_eq!(input.data, before);
    }

    #[test]
    fn test_annotate_changes_pixels() {
        let input = frame(0);
        let out = annotate(&input, &[cup_at(40.0, 80.0)], 1);
        assert_ne!(out.data, input.data);
    }

    #[test]
    fn test_caption_renders_for_lowercase_label() {
        let input = frame(0);
        let det = Detection {
            class_id: 9,
            class_name: "traffic light".to_string(),
            confidence: 0.77,
            bbox: BoundingBox::new(40.0, 80.0, 160.0, 200.0),
        };
        let out = annotate(&input, &[det], 1);

        // The caption band sits between the counter and the box top edge.
        // On a black frame its glyphs are the only pure-green coverage there.
        let img = RgbImage::from_raw(320, 240, out.data).unwrap();
        let has_glyph_ink = (40..78u32)
            .any(|y| (40..300u32).any(|x| {
                let p = img.get_pixel(x, y);
                p[0] == 0 && p[1] > 0 && p[2] == 0
            }));
        assert!(has_glyph_ink, "caption text left no pixels");
    }

    #[test]
    fn test_box_fully_outside_is_clipped() {
        let input = frame(0);
        let out = annotate(&input, &[cup_at(500.0, 500.0)], 1);
        // Nothing panics and the buffer keeps its size
        assert_eq!(out.data.len(), input.data.len());
    }
}
