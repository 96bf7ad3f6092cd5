//! Rasterized preview of an annotation at the current zoom.

use image::imageops::FilterType;
use image::{DynamicImage, Rgba, RgbaImage};

use super::{Annotator, Point};

const SELECTED: Rgba<u8> = Rgba([255, 0, 0, 255]);
const UNSELECTED: Rgba<u8> = Rgba([0, 0, 255, 255]);
const OUTLINE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const EDGE: Rgba<u8> = Rgba([255, 255, 0, 255]);

const SELECTED_RADIUS: f64 = 6.0;
const POINT_RADIUS: f64 = 5.0;

/// Dash pattern for polygon edges, in view pixels.
const DASH_ON: f64 = 4.0;
const DASH_OFF: f64 = 2.0;

/// Longest side of a rendered preview, in pixels.
pub const MAX_PREVIEW_SIDE: u32 = 8192;

/// Draw the annotator's points and polygon over `image` scaled by its zoom.
///
/// Edges join consecutive points and close back to the first one once more
/// than two points exist. Points are drawn last so they sit above the edges.
/// The scale is lowered when the zoomed image would exceed
/// [`MAX_PREVIEW_SIDE`] on its longest side.
pub fn render_overlay(image: &DynamicImage, annotator: &Annotator) -> RgbaImage {
    let longest = image.width().max(image.height()).max(1) as f64;
    let zoom = annotator.zoom().min(MAX_PREVIEW_SIDE as f64 / longest);
    let width = ((image.width() as f64 * zoom).round() as u32).max(1);
    let height = ((image.height() as f64 * zoom).round() as u32).max(1);
    let mut canvas = if width == image.width() && height == image.height() {
        image.to_rgba8()
    } else {
        image::imageops::resize(&image.to_rgba8(), width, height, FilterType::Triangle)
    };

    let view: Vec<Point> = annotator
        .points()
        .iter()
        .map(|p| Point::new(p.x * zoom, p.y * zoom))
        .collect();

    if view.len() > 1 {
        for pair in view.windows(2) {
            draw_dashed_line(&mut canvas, pair[0], pair[1], EDGE);
        }
        if view.len() > 2 {
            draw_dashed_line(&mut canvas, view[view.len() - 1], view[0], EDGE);
        }
    }

    for (i, p) in view.iter().enumerate() {
        let (radius, fill) = if annotator.selected() == Some(i) {
            (SELECTED_RADIUS, SELECTED)
        } else {
            (POINT_RADIUS, UNSELECTED)
        };
        draw_disc(&mut canvas, *p, radius, fill, OUTLINE);
    }

    canvas
}

fn put(canvas: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>) {
    if let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) {
        if x < canvas.width() && y < canvas.height() {
            canvas.put_pixel(x, y, color);
        }
    }
}

/// Filled circle with a one-pixel outline ring.
fn draw_disc(canvas: &mut RgbaImage, center: Point, radius: f64, fill: Rgba<u8>, outline: Rgba<u8>) {
    let r = radius.ceil() as i64 + 1;
    let (cx, cy) = (center.x.round() as i64, center.y.round() as i64);
    for dy in -r..=r {
        for dx in -r..=r {
            let d = ((dx * dx + dy * dy) as f64).sqrt();
            if d <= radius - 1.0 {
                put(canvas, cx + dx, cy + dy, fill);
            } else if d <= radius {
                put(canvas, cx + dx, cy + dy, outline);
            }
        }
    }
}

/// Walk the segment one pixel at a time, painting only "on" dash stretches.
///
/// Only the part of the segment that crosses the canvas is walked; the dash
/// phase is still measured from `from`.
fn draw_dashed_line(canvas: &mut RgbaImage, from: Point, to: Point, color: Rgba<u8>) {
    let (dx, dy) = (to.x - from.x, to.y - from.y);
    let length = (dx * dx + dy * dy).sqrt();
    if !length.is_finite() {
        return;
    }
    let steps = length.ceil() as i64;
    if steps == 0 {
        return;
    }
    let Some((t0, t1)) = clip_range(canvas, from, dx, dy) else {
        return;
    };
    let first = (t0 * steps as f64).floor() as i64;
    let last = (t1 * steps as f64).ceil() as i64;

    let period = DASH_ON + DASH_OFF;
    for step in first.max(0)..=last.min(steps) {
        let along = step as f64 * length / steps as f64;
        if along % period >= DASH_ON {
            continue;
        }
        let t = along / length;
        let x = (from.x + dx * t).round() as i64;
        let y = (from.y + dy * t).round() as i64;
        put(canvas, x, y, color);
    }
}

/// Liang-Barsky clip of `from + t * (dx, dy)`, `t` in `[0, 1]`, against the
/// canvas grown by one pixel on every side.
fn clip_range(canvas: &RgbaImage, from: Point, dx: f64, dy: f64) -> Option<(f64, f64)> {
    let (mut t0, mut t1) = (0.0f64, 1.0f64);
    let edges = [
        (-dx, from.x + 1.0),
        (dx, canvas.width() as f64 - from.x),
        (-dy, from.y + 1.0),
        (dy, canvas.height() as f64 - from.y),
    ];
    for (p, q) in edges {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else if p < 0.0 {
            t0 = t0.max(q / p);
        } else {
            t1 = t1.min(q / p);
        }
    }
    (t0 <= t1).then_some((t0, t1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnnotatorConfig;

    fn blank(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(image::RgbImage::from_pixel(width, height, image::Rgb([0, 0, 0])))
    }

    #[test]
    fn test_overlay_scales_with_zoom() {
        let img = blank(100, 50);
        let mut a = Annotator::new(100, 50, AnnotatorConfig::default());
        assert_eq!(render_overlay(&img, &a).dimensions(), (100, 50));
        a.zoom_in();
        assert_eq!(render_overlay(&img, &a).dimensions(), (120, 60));
    }

    #[test]
    fn test_selected_point_is_red_others_blue() {
        let img = blank(100, 100);
        let mut a = Annotator::new(100, 100, AnnotatorConfig::default());
        a.click(20.0, 20.0);
        a.click(70.0, 70.0);
        let out = render_overlay(&img, &a);
        assert_eq!(*out.get_pixel(70, 70), SELECTED);
        assert_eq!(*out.get_pixel(20, 20), UNSELECTED);
        // The outline ring sits at the radius.
        assert_eq!(*out.get_pixel(20 + 5, 20), OUTLINE);
    }

    #[test]
    fn test_edges_are_dashed() {
        let img = blank(100, 20);
        let mut a = Annotator::new(100, 20, AnnotatorConfig::default());
        a.click(10.0, 10.0);
        a.click(90.0, 10.0);
        let out = render_overlay(&img, &a);
        // Between the discs, 4 pixels on then 2 off along the row.
        assert_eq!(*out.get_pixel(28, 10), EDGE);
        assert_eq!(*out.get_pixel(29, 10), EDGE);
        assert_eq!(*out.get_pixel(32, 10), Rgba([0, 0, 0, 255]));
        assert_eq!(*out.get_pixel(33, 10), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_far_away_edge_is_clipped_to_canvas() {
        let img = blank(100, 20);
        let mut a = Annotator::new(100, 20, AnnotatorConfig::default());
        a.click(10.0, 10.0);
        a.click(1e12, 10.0);
        let out = render_overlay(&img, &a);
        // Same dash phase as a short edge starting at the same point.
        assert_eq!(*out.get_pixel(28, 10), EDGE);
        assert_eq!(*out.get_pixel(32, 10), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_edge_missing_canvas_draws_nothing() {
        let mut canvas = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255]));
        draw_dashed_line(
            &mut canvas,
            Point::new(-1e9, -50.0),
            Point::new(1e9, -50.0),
            EDGE,
        );
        assert!(canvas.pixels().all(|p| *p == Rgba([0, 0, 0, 255])));
        assert_eq!(clip_range(&canvas, Point::new(-5.0, 5.0), 20.0, 0.0), Some((0.2, 0.75)));
    }

    #[test]
    fn test_preview_size_is_capped() {
        let img = blank(1000, 10);
        let mut a = Annotator::new(1000, 10, AnnotatorConfig::default());
        for _ in 0..20 {
            a.zoom_in();
        }
        assert!(a.zoom() * 1000.0 > MAX_PREVIEW_SIDE as f64);
        let out = render_overlay(&img, &a);
        assert_eq!(out.width(), MAX_PREVIEW_SIDE);
        assert!(out.height() <= 82);
    }

    #[test]
    fn test_points_off_canvas_are_clipped() {
        let img = blank(10, 10);
        let mut a = Annotator::new(10, 10, AnnotatorConfig::default());
        a.click(9.0, 9.0);
        let out = render_overlay(&img, &a);
        assert_eq!(out.dimensions(), (10, 10));
    }
}
