//! Plain-text (P3) pixel format encoding
//!
//! Output layout: a three line header (`P3`, `<width> <height>`, `255`)
//! followed by one line per pixel holding its red, green and blue values,
//! each followed by a single space. Alpha is dropped. Pixels are emitted
//! row-major, top row first, left to right.

use crate::frame::{RenderedFrame, BYTES_PER_PIXEL};
use std::io::{self, Write};

/// Format tag of the ASCII PPM variant
pub const MAGIC: &str = "P3";

/// Maximum channel value written in the header
pub const MAX_VALUE: u8 = 255;

/// Header lines preceding the pixel data
pub const HEADER_LINES: usize = 3;

// "255 255 255 \n" is 13 bytes; reserve for the worst case
const MAX_PIXEL_LINE: usize = 13;

/// Encode a frame as a P3 string
pub fn encode_p3(frame: &RenderedFrame) -> String {
    let mut out = header(frame);
    out.reserve(frame.width() as usize * frame.height() as usize * MAX_PIXEL_LINE);
    for pixel in frame.pixels().chunks_exact(BYTES_PER_PIXEL) {
        push_pixel_line(&mut out, pixel);
    }
    out
}

/// Stream a frame as P3 into any writer
pub fn write_p3<W: Write>(frame: &RenderedFrame, mut writer: W) -> io::Result<()> {
    writer.write_all(header(frame).as_bytes())?;

    let mut line = String::with_capacity(MAX_PIXEL_LINE);
    for pixel in frame.pixels().chunks_exact(BYTES_PER_PIXEL) {
        line.clear();
        push_pixel_line(&mut line, pixel);
        writer.write_all(line.as_bytes())?;
    }
    Ok(())
}

fn header(frame: &RenderedFrame) -> String {
    format!("{}\n{} {}\n{}\n", MAGIC, frame.width(), frame.height(), MAX_VALUE)
}

/// Append `"r g b \n"`; alpha is dropped
fn push_pixel_line(out: &mut String, pixel: &[u8]) {
    for &channel in &pixel[..3] {
        push_decimal(out, channel);
        out.push(' ');
    }
    out.push('\n');
}

fn push_decimal(out: &mut String, value: u8) {
    if value >= 100 {
        out.push(char::from(b'0' + value / 100));
    }
    if value >= 10 {
        out.push(char::from(b'0' + (value / 10) % 10));
    }
    out.push(char::from(b'0' + value % 10));
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn frame(width: u32, height: u32, pixels: Vec<u8>) -> RenderedFrame {
        RenderedFrame::new(width, height, pixels).unwrap()
    }

    #[test]
    fn test_header_and_triplets() {
        let encoded = encode_p3(&frame(2, 1, vec![255, 0, 7, 255, 10, 100, 99, 0]));
        assert_eq!(encoded, "P3\n2 1\n255\n255 0 7 \n10 100 99 \n");
    }

    #[test]
    fn test_line_count_matches_pixel_count() {
        let mut rng = rand::thread_rng();
        for _ in 0..8 {
            let width = rng.gen_range(1..40);
            let height = rng.gen_range(1..40);
            let pixels: Vec<u8> = (0..width * height * 4).map(|_| rng.gen()).collect();
            let encoded = encode_p3(&frame(width, height, pixels));

            assert!(encoded.ends_with('\n'));
            let lines = encoded.lines().count();
            assert_eq!(lines, HEADER_LINES + (width * height) as usize);
        }
    }

    #[test]
    fn test_pixel_lines_follow_framebuffer_rows() {
        let (width, height) = (4u32, 3u32);
        let stride = width as usize * 4;
        let mut data = vec![0u8; stride * height as usize];
        for row in 0..height as usize {
            for col in 0..width as usize {
                let offset = row * stride + col * 4;
                data[offset..offset + 4].copy_from_slice(&[row as u8 * 10, col as u8, 0, 255]);
            }
        }
        let frame = RenderedFrame::from_bottom_up(width, height, &data, stride).unwrap();
        let encoded = encode_p3(&frame);
        let pixel_lines: Vec<&str> = encoded.lines().skip(HEADER_LINES).collect();

        for y in 0..height {
            for x in 0..width {
                let expected = format!("{} {} 0 ", (height - 1 - y) * 10, x);
                assert_eq!(pixel_lines[(y * width + x) as usize], expected);
            }
        }
    }

    #[test]
    fn test_every_channel_value_is_written_in_decimal() {
        let pixels: Vec<u8> = (0..=255u8).flat_map(|v| [v, 255 - v, 0, 255]).collect();
        let encoded = encode_p3(&frame(256, 1, pixels));

        assert!(encoded.starts_with("P3\n256 1\n255\n"));
        for (v, line) in encoded.lines().skip(HEADER_LINES).enumerate() {
            assert_eq!(line, format!("{} {} 0 ", v, 255 - v));
        }
    }

    #[test]
    fn test_alpha_is_dropped() {
        let encoded = encode_p3(&frame(1, 1, vec![1, 2, 3, 200]));
        assert!(!encoded.contains("200"));
    }

    #[test]
    fn test_write_matches_encode() {
        let frame = frame(1, 2, vec![9, 8, 7, 6, 5, 4, 3, 2]);
        let mut streamed = Vec::new();
        write_p3(&frame, &mut streamed).unwrap();
        assert_eq!(String::from_utf8(streamed).unwrap(), encode_p3(&frame));
    }
}
