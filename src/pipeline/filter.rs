//! Geometric contour filtering.
//!
//! Each contour is tested independently against all seven constraints. The
//! tests run in a fixed order chosen for cost (cheap bounding-box checks
//! before hull computation) and short-circuit on the first failure; the
//! surviving set does not depend on the order.

use serde::Deserialize;

use crate::pipeline::contours::Contour;
use crate::pipeline::geometry::{bounding_rect, closed_perimeter, convex_hull, polygon_area};

/// Constraint set for contour filtering. All bounds are independent;
/// a contour must satisfy every one of them to survive.
///
/// Defaults match the reference deployment: only a minimum bounding-box
/// width of 20 px is restrictive, everything else is wide open.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ShapeConstraints {
    pub min_width: f64,
    pub max_width: f64,
    pub min_height: f64,
    pub max_height: f64,
    pub min_area: f64,
    pub min_perimeter: f64,
    /// Solidity bounds in percent: 100 * area / convex hull area.
    pub min_solidity: f64,
    pub max_solidity: f64,
    pub min_vertices: usize,
    pub max_vertices: usize,
    /// Bounding-box width / height bounds.
    pub min_ratio: f64,
    pub max_ratio: f64,
}

impl Default for ShapeConstraints {
    fn default() -> Self {
        Self {
            min_width: 20.0,
            max_width: 1000.0,
            min_height: 0.0,
            max_height: 1000.0,
            min_area: 0.0,
            min_perimeter: 0.0,
            min_solidity: 0.0,
            max_solidity: 100.0,
            min_vertices: 0,
            max_vertices: 1_000_000,
            min_ratio: 0.0,
            max_ratio: 1000.0,
        }
    }
}

impl ShapeConstraints {
    /// True when the contour passes all seven tests.
    pub fn accepts(&self, contour: &Contour) -> bool {
        let bb = bounding_rect(contour);
        let width = bb.width as f64;
        let height = bb.height as f64;
        if width < self.min_width || width > self.max_width {
            return false;
        }
        if height < self.min_height || height > self.max_height {
            return false;
        }

        let area = polygon_area(contour);
        if area < self.min_area {
            return false;
        }
        if closed_perimeter(contour) < self.min_perimeter {
            return false;
        }

        // A degenerate hull has no area; solidity is undefined, so the
        // contour cannot pass the solidity test.
        let hull_area = polygon_area(&convex_hull(contour));
        if hull_area <= 0.0 {
            return false;
        }
        let solidity = 100.0 * area / hull_area;
        if solidity < self.min_solidity || solidity > self.max_solidity {
            return false;
        }

        if contour.len() < self.min_vertices || contour.len() > self.max_vertices {
            return false;
        }

        let ratio = width / height;
        if ratio < self.min_ratio || ratio > self.max_ratio {
            return false;
        }

        true
    }
}

/// Return the contours passing all constraints. Pure: allocates a fresh list,
/// never aliases or mutates the input.
pub fn filter_contours(contours: &[Contour], constraints: &ShapeConstraints) -> Vec<Contour> {
    contours
        .iter()
        .filter(|c| constraints.accepts(c))
        .cloned()
        .collect()
}
