//! The saved form of an annotation: four integer corners as JSON.

use std::path::Path;

use crate::error::AnnotationError;

use super::{Point, MAX_POINTS};

/// Four integer `[x, y]` corners in placement order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quadrilateral([[i64; 2]; MAX_POINTS]);

impl Quadrilateral {
    pub fn new(corners: [[i64; 2]; MAX_POINTS]) -> Self {
        Self(corners)
    }

    /// Round four points to the nearest integer, ties to even.
    pub(crate) fn from_points(points: &[Point]) -> Self {
        let mut corners = [[0i64; 2]; MAX_POINTS];
        for (corner, p) in corners.iter_mut().zip(points) {
            *corner = [p.x.round_ties_even() as i64, p.y.round_ties_even() as i64];
        }
        Self(corners)
    }

    pub fn corners(&self) -> &[[i64; 2]; MAX_POINTS] {
        &self.0
    }

    /// Serialize as `[[x,y],[x,y],[x,y],[x,y]]`.
    pub fn to_json(&self) -> String {
        // Fixed-size integer arrays cannot fail to serialize.
        serde_json::to_string(&self.0).unwrap_or_default()
    }

    /// Parse a points document, rejecting anything but four `[x, y]` integer pairs.
    pub fn from_json(text: &str) -> Result<Self, String> {
        let corners: Vec<Vec<i64>> =
            serde_json::from_str(text).map_err(|e| format!("expected [[x, y], ...]: {e}"))?;
        if corners.len() != MAX_POINTS {
            return Err(format!("expected 4 points, found {}", corners.len()));
        }

        let mut out = [[0i64; 2]; MAX_POINTS];
        for (i, pair) in corners.iter().enumerate() {
            match pair.as_slice() {
                [x, y] => out[i] = [*x, *y],
                _ => {
                    return Err(format!(
                        "point {} has {} coordinates, expected 2",
                        i + 1,
                        pair.len()
                    ))
                }
            }
        }
        Ok(Self(out))
    }

    /// Write the points file, overwriting any existing one.
    pub fn save(&self, path: &Path) -> crate::error::Result<()> {
        std::fs::write(path, self.to_json())?;
        tracing::info!("Points saved to {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, AnnotationError> {
        let invalid = |message: String| AnnotationError::InvalidPointsFile {
            path: path.to_path_buf(),
            message,
        };
        let text = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        Self::from_json(&text).map_err(invalid)
    }
}
