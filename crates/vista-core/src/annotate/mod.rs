//! Quadrilateral point annotator.
//!
//! The annotator is a plain state machine over user events (clicks, nudges,
//! zoom). Points live in original image coordinates; clicks arrive in view
//! coordinates, i.e. scaled by the current zoom factor. Front ends feed events
//! in and read `points()`, `selected()`, `zoom()` and `status()` back out.

pub mod overlay;
pub mod quad;

pub use overlay::render_overlay;
pub use quad::Quadrilateral;

use std::path::Path;

pub use image::DynamicImage;

use crate::config::AnnotatorConfig;
use crate::error::AnnotationError;

/// Open the image to annotate.
pub fn open_image(path: &Path) -> Result<DynamicImage, AnnotationError> {
    image::open(path).map_err(|e| AnnotationError::ImageOpen {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Maximum number of points a quadrilateral can have.
pub const MAX_POINTS: usize = 4;

/// A point in original image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Arrow-key direction for nudging the selected point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// What a click did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// An existing point was selected
    Selected(usize),
    /// A new point was placed and selected
    Added(usize),
    /// Four points exist already and none was hit, or the position was not finite
    Refused,
}

pub struct Annotator {
    width: u32,
    height: u32,
    points: Vec<Point>,
    selected: Option<usize>,
    zoom: f64,
    status: String,
    config: AnnotatorConfig,
}

impl Annotator {
    /// Start an empty annotation of a `width`×`height` image at zoom 1.0.
    pub fn new(width: u32, height: u32, config: AnnotatorConfig) -> Self {
        Self {
            width,
            height,
            points: Vec::with_capacity(MAX_POINTS),
            selected: None,
            zoom: 1.0,
            status: String::new(),
            config,
        }
    }

    pub fn image_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Last status line (point added, zoom level, refusals).
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Handle a click at view coordinates.
    ///
    /// A click strictly within `hit_radius` view pixels of an existing point
    /// on both axes selects the first such point. Otherwise a new point is
    /// added, unless four already exist.
    pub fn click(&mut self, view_x: f64, view_y: f64) -> ClickOutcome {
        if !(view_x.is_finite() && view_y.is_finite()) {
            self.status = "Position must be a finite number".to_string();
            return ClickOutcome::Refused;
        }

        let radius = self.config.hit_radius;
        let hit = self.points.iter().position(|p| {
            (p.x * self.zoom - view_x).abs() < radius && (p.y * self.zoom - view_y).abs() < radius
        });

        if let Some(index) = hit {
            self.selected = Some(index);
            self.status = format!("Selected point {}", index + 1);
            return ClickOutcome::Selected(index);
        }

        if self.points.len() >= MAX_POINTS {
            self.status = "Maximum 4 points allowed".to_string();
            return ClickOutcome::Refused;
        }

        let point = Point::new(view_x / self.zoom, view_y / self.zoom);
        self.points.push(point);
        let index = self.points.len() - 1;
        self.selected = Some(index);
        self.status = format!(
            "Added point {} at ({:.0}, {:.0})",
            index + 1,
            point.x,
            point.y
        );
        ClickOutcome::Added(index)
    }

    /// Select a point by index; out-of-range indices are ignored.
    pub fn select(&mut self, index: usize) {
        if index < self.points.len() {
            self.selected = Some(index);
            self.status = format!("Selected point {}", index + 1);
        }
    }

    /// Move the selected point one view pixel (`1 / zoom` image pixels).
    ///
    /// Returns false when nothing is selected.
    pub fn nudge(&mut self, direction: Direction) -> bool {
        let Some(index) = self.selected else {
            return false;
        };
        let step = 1.0 / self.zoom;
        let point = &mut self.points[index];
        match direction {
            Direction::Up => point.y -= step,
            Direction::Down => point.y += step,
            Direction::Left => point.x -= step,
            Direction::Right => point.x += step,
        }
        true
    }

    /// Zoom in by one button step, up to `max_zoom`.
    pub fn zoom_in(&mut self) -> f64 {
        self.zoom = (self.zoom * self.config.button_zoom_step).min(self.config.max_zoom);
        self.zoom_changed()
    }

    pub fn zoom_out(&mut self) -> f64 {
        if self.zoom > self.config.min_zoom {
            self.zoom /= self.config.button_zoom_step;
        }
        self.zoom_changed()
    }

    /// Scroll-wheel zoom: positive delta zooms in, negative zooms out.
    pub fn wheel(&mut self, delta: i32) -> f64 {
        if delta > 0 {
            self.zoom = (self.zoom * self.config.wheel_zoom_step).min(self.config.max_zoom);
        } else if delta < 0 && self.zoom > self.config.min_zoom {
            self.zoom /= self.config.wheel_zoom_step;
        }
        self.zoom_changed()
    }

    fn zoom_changed(&mut self) -> f64 {
        self.status = format!("Zoom: {:.2}x", self.zoom);
        self.zoom
    }

    /// Clear all points and the selection.
    pub fn reset(&mut self) {
        self.points.clear();
        self.selected = None;
        self.status = "Points reset".to_string();
    }

    /// The finished quadrilateral, with coordinates rounded to integers.
    pub fn quad(&self) -> Result<Quadrilateral, AnnotationError> {
        if self.points.len() != MAX_POINTS {
            return Err(AnnotationError::IncompletePolygon {
                count: self.points.len(),
            });
        }
        Ok(Quadrilateral::from_points(&self.points))
    }

    /// Replace the current points with a loaded quadrilateral.
    pub fn load_quad(&mut self, quad: &Quadrilateral) {
        self.points = quad
            .corners()
            .iter()
            .map(|&[x, y]| Point::new(x as f64, y as f64))
            .collect();
        self.selected = None;
        self.status = "Loaded 4 points".to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotator() -> Annotator {
        Annotator::new(800, 600, AnnotatorConfig::default())
    }

    #[test]
    fn test_click_adds_and_selects() {
        let mut a = annotator();
        assert_eq!(a.click(100.0, 50.0), ClickOutcome::Added(0));
        assert_eq!(a.points(), &[Point::new(100.0, 50.0)]);
        assert_eq!(a.selected(), Some(0));
        assert!(a.status().starts_with("Added point 1"));
    }

    #[test]
    fn test_click_near_existing_selects_first_match() {
        let mut a = annotator();
        a.click(100.0, 100.0);
        a.click(300.0, 100.0);
        assert_eq!(a.click(105.0, 95.0), ClickOutcome::Selected(0));
        assert_eq!(a.points().len(), 2);
        assert_eq!(a.selected(), Some(0));
    }

    #[test]
    fn test_hit_radius_is_strict() {
        let mut a = annotator();
        a.click(100.0, 100.0);
        // Exactly 10 px away on one axis is a miss.
        assert_eq!(a.click(110.0, 100.0), ClickOutcome::Added(1));
    }

    #[test]
    fn test_fifth_point_refused() {
        let mut a = annotator();
        for (x, y) in [(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)] {
            a.click(x, y);
        }
        assert_eq!(a.click(50.0, 50.0), ClickOutcome::Refused);
        assert_eq!(a.points().len(), 4);
        assert_eq!(a.status(), "Maximum 4 points allowed");

        // Selecting an existing point still works at the limit.
        assert_eq!(a.click(98.0, 2.0), ClickOutcome::Selected(1));
    }

    #[test]
    fn test_click_respects_zoom() {
        let mut a = annotator();
        a.zoom_in();
        a.zoom_in();
        let z = a.zoom();
        a.click(144.0, 72.0);
        let p = a.points()[0];
        assert!((p.x - 144.0 / z).abs() < 1e-9);
        assert!((p.y - 72.0 / z).abs() < 1e-9);
        assert!((p.x - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_nudge_moves_one_view_pixel() {
        let mut a = annotator();
        assert!(!a.nudge(Direction::Up));

        a.click(10.0, 10.0);
        assert!(a.nudge(Direction::Right));
        assert!(a.nudge(Direction::Down));
        assert_eq!(a.points()[0], Point::new(11.0, 11.0));

        a.wheel(-1);
        let z = a.zoom();
        a.nudge(Direction::Left);
        assert!((a.points()[0].x - (11.0 - 1.0 / z)).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_steps_and_status() {
        let mut a = annotator();
        assert!((a.zoom_in() - 1.2).abs() < 1e-9);
        assert_eq!(a.status(), "Zoom: 1.20x");
        assert!((a.zoom_out() - 1.0).abs() < 1e-9);
        assert!((a.wheel(1) - 1.1).abs() < 1e-9);
        assert!((a.wheel(0) - 1.1).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_out_floor() {
        let mut a = annotator();
        for _ in 0..100 {
            a.zoom_out();
        }
        let floor = a.zoom();
        assert!(floor <= 0.1);
        assert!(floor > 0.1 / 1.2);
        assert_eq!(a.zoom_out(), floor);
        assert_eq!(a.wheel(-3), floor);
    }

    #[test]
    fn test_zoom_in_ceiling() {
        let mut a = annotator();
        for _ in 0..100 {
            a.zoom_in();
            a.wheel(1);
        }
        assert_eq!(a.zoom(), AnnotatorConfig::default().max_zoom);
        assert_eq!(a.status(), "Zoom: 32.00x");
    }

    #[test]
    fn test_non_finite_click_refused() {
        let mut a = annotator();
        assert_eq!(a.click(f64::INFINITY, f64::NAN), ClickOutcome::Refused);
        assert_eq!(a.click(10.0, f64::NEG_INFINITY), ClickOutcome::Refused);
        assert!(a.points().is_empty());
        assert_eq!(a.status(), "Position must be a finite number");
        assert_eq!(a.click(10.0, 10.0), ClickOutcome::Added(0));
    }

    #[test]
    fn test_reset() {
        let mut a = annotator();
        a.click(1.0, 1.0);
        a.reset();
        assert!(a.points().is_empty());
        assert_eq!(a.selected(), None);
    }

    #[test]
    fn test_quad_requires_four_points() {
        let mut a = annotator();
        a.click(10.0, 10.0);
        let err = a.quad().unwrap_err();
        assert!(matches!(err, AnnotationError::IncompletePolygon { count: 1 }));

        a.click(20.4, 10.0);
        a.click(20.5, 30.0);
        a.click(-0.0, 30.0);
        let quad = a.quad().unwrap();
        assert_eq!(quad.corners(), &[[10, 10], [20, 10], [20, 30], [0, 30]]);
    }

    #[test]
    fn test_open_image_errors_carry_path() {
        let err = open_image(Path::new("/definitely/missing.png")).unwrap_err();
        assert!(matches!(err, AnnotationError::ImageOpen { .. }));
        assert!(err.to_string().contains("missing.png"));
    }

    #[test]
    fn test_load_quad_replaces_points() {
        let mut a = annotator();
        a.click(1.0, 1.0);
        let quad = Quadrilateral::new([[0, 0], [5, 0], [5, 5], [0, 5]]);
        a.load_quad(&quad);
        assert_eq!(a.points().len(), 4);
        assert_eq!(a.points()[2], Point::new(5.0, 5.0));
        assert_eq!(a.selected(), None);
    }
}
