//! Timestamp stamping and "no data" placeholder images.

use ab_glyph::{Font, PxScale};
use image::{GrayImage, Luma};
use imageproc::drawing::{draw_text_mut, text_size};

/// Text size for the timestamp stamped onto a capture.
const STAMP_SCALE: f32 = 30.0;
/// Text size for the placeholder message.
const PLACEHOLDER_SCALE: f32 = 18.0;
/// Placeholder canvas, pixels.
const PLACEHOLDER_SIZE: [u32; 2] = [300, 300];
/// Stamp inset from the bottom-right corner, pixels.
const STAMP_MARGIN: [i32; 2] = [10, 20];

const TEXT_WHITE: Luma<u8> = Luma([255u8]);

/// Anchor for text inset from the bottom-right corner.
fn corner_anchor(canvas: [u32; 2], text: [i32; 2], margin: [i32; 2]) -> [i32; 2] {
    [
        canvas[0] as i32 - text[0] - margin[0],
        canvas[1] as i32 - text[1] - margin[1],
    ]
}

/// Anchor for text centered on the canvas.
fn centered_anchor(canvas: [u32; 2], text: [i32; 2]) -> [i32; 2] {
    [
        (canvas[0] as i32 - text[0]) / 2,
        (canvas[1] as i32 - text[1]) / 2,
    ]
}

/// Stamp the capture timestamp into the bottom-right corner, in place.
pub fn stamp_timestamp(image: &mut GrayImage, stamp: &str, font: &impl Font) {
    let scale = PxScale::from(STAMP_SCALE);
    let (tw, th) = text_size(scale, font, stamp);
    let [x, y] = corner_anchor(
        [image.width(), image.height()],
        [tw as i32, th as i32],
        STAMP_MARGIN,
    );
    draw_text_mut(image, TEXT_WHITE, x, y, scale, font, stamp);
}

/// Render the placeholder shown when a slot's window passed without a match:
/// "No data for <stamp>", centered on a dark canvas.
pub fn placeholder(stamp: &str, font: &impl Font) -> GrayImage {
    let text = format!("No data for {}", stamp);
    let [w, h] = PLACEHOLDER_SIZE;
    let mut image = GrayImage::from_pixel(w, h, Luma([0u8]));

    let scale = PxScale::from(PLACEHOLDER_SCALE);
    let (tw, th) = text_size(scale, font, &text);
    let [x, y] = centered_anchor([w, h], [tw as i32, th as i32]);
    draw_text_mut(&mut image, TEXT_WHITE, x, y, scale, font, &text);
    image
}
