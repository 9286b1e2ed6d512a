//! Polygon primitives backing the contour filter and the line detector.
//!
//! Everything here operates on closed polygons given as ordered vertex lists.
//! The conventions match the rest of the pipeline: integer pixel vertices,
//! areas and lengths as f64, angles in degrees.

/// Integer pixel coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned bounding rectangle in pixel coordinates.
///
/// Width and height use pixel-count semantics: a rectangle covering a single
/// pixel has width 1 and height 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Minimum-area enclosing rotated rectangle.
///
/// `angle` is the rotation of the `width` side in degrees, normalized into
/// (-90, 90]. The width/height labels come from whichever hull edge produced
/// the minimal rectangle; callers that care about the long axis must apply
/// their own correction (see the detector's +90 rule).
#[derive(Clone, Copy, Debug)]
pub struct OrientedBox {
    pub center: (f64, f64),
    pub width: f64,
    pub height: f64,
    pub angle: f64,
}

impl OrientedBox {
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// The four corner points, walked around the rectangle.
    pub fn corners(&self) -> [(f64, f64); 4] {
        let (sin, cos) = self.angle.to_radians().sin_cos();
        let (hw, hh) = (self.width / 2.0, self.height / 2.0);
        let (cx, cy) = self.center;
        [(-hw, -hh), (hw, -hh), (hw, hh), (-hw, hh)]
            .map(|(u, v)| (cx + u * cos - v * sin, cy + u * sin + v * cos))
    }
}

/// Axis-aligned bounding rectangle of a vertex list.
///
/// An empty list yields a zero-sized rect at the origin.
pub fn bounding_rect(points: &[Point]) -> Rect {
    let Some(first) = points.first() else {
        return Rect {
            x: 0,
            y: 0,
            width: 0,
            height: 0,
        };
    };
    let (mut min_x, mut max_x) = (first.x, first.x);
    let (mut min_y, mut max_y) = (first.y, first.y);
    for p in &points[1..] {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }
    Rect {
        x: min_x,
        y: min_y,
        width: max_x - min_x + 1,
        height: max_y - min_y + 1,
    }
}

/// Unsigned polygon area via the shoelace formula.
pub fn polygon_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice_area = 0i64;
    for i in 0..points.len() {
        let p = points[i];
        let q = points[(i + 1) % points.len()];
        twice_area += p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64;
    }
    (twice_area.abs() as f64) / 2.0
}

/// Perimeter of the closed polygon (last vertex connects back to the first).
pub fn closed_perimeter(points: &[Point]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let mut length = 0.0;
    for i in 0..points.len() {
        let p = points[i];
        let q = points[(i + 1) % points.len()];
        let dx = (q.x - p.x) as f64;
        let dy = (q.y - p.y) as f64;
        length += (dx * dx + dy * dy).sqrt();
    }
    length
}

fn cross(o: Point, a: Point, b: Point) -> i64 {
    (a.x as i64 - o.x as i64) * (b.y as i64 - o.y as i64)
        - (a.y as i64 - o.y as i64) * (b.x as i64 - o.x as i64)
}

/// Convex hull via Andrew's monotone chain, counter-clockwise, no duplicate
/// endpoint. Collinear interior points are dropped.
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    let mut pts: Vec<Point> = points.to_vec();
    pts.sort_by(|a, b| a.x.cmp(&b.x).then(a.y.cmp(&b.y)));
    pts.dedup();
    let n = pts.len();
    if n < 3 {
        return pts;
    }

    let mut hull: Vec<Point> = Vec::with_capacity(2 * n);
    for &p in &pts {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0 {
            hull.pop();
        }
        hull.push(p);
    }
    let lower_len = hull.len() + 1;
    for &p in pts.iter().rev() {
        while hull.len() >= lower_len && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0 {
            hull.pop();
        }
        hull.push(p);
    }
    hull.pop();
    hull
}

/// Normalize an angle in degrees into (-90, 90].
fn fold_angle(mut deg: f64) -> f64 {
    while deg > 90.0 {
        deg -= 180.0;
    }
    while deg <= -90.0 {
        deg += 180.0;
    }
    deg
}

/// Minimum-area enclosing rotated rectangle via rotating calipers over the
/// convex hull.
///
/// Degenerate inputs are well-defined: a single point yields a zero-sized box
/// at that point, two points (or a collinear set) yield a zero-height box
/// along the segment. Both have area 0 and so never pass a positive
/// minimum-area gate downstream.
pub fn min_area_rect(points: &[Point]) -> OrientedBox {
    let hull = convex_hull(points);
    match hull.len() {
        0 => {
            return OrientedBox {
                center: (0.0, 0.0),
                width: 0.0,
                height: 0.0,
                angle: 0.0,
            }
        }
        1 => {
            return OrientedBox {
                center: (hull[0].x as f64, hull[0].y as f64),
                width: 0.0,
                height: 0.0,
                angle: 0.0,
            }
        }
        2 => {
            let (p, q) = (hull[0], hull[1]);
            let dx = (q.x - p.x) as f64;
            let dy = (q.y - p.y) as f64;
            return OrientedBox {
                center: ((p.x + q.x) as f64 / 2.0, (p.y + q.y) as f64 / 2.0),
                width: (dx * dx + dy * dy).sqrt(),
                height: 0.0,
                angle: fold_angle(dy.atan2(dx).to_degrees()),
            };
        }
        _ => {}
    }

    let mut best: Option<OrientedBox> = None;
    for i in 0..hull.len() {
        let p = hull[i];
        let q = hull[(i + 1) % hull.len()];
        let dx = (q.x - p.x) as f64;
        let dy = (q.y - p.y) as f64;
        let len = (dx * dx + dy * dy).sqrt();
        if len == 0.0 {
            continue;
        }
        let dir = (dx / len, dy / len);
        let perp = (-dir.1, dir.0);

        let mut u_min = f64::INFINITY;
        let mut u_max = f64::NEG_INFINITY;
        let mut v_min = f64::INFINITY;
        let mut v_max = f64::NEG_INFINITY;
        for h in &hull {
            let u = h.x as f64 * dir.0 + h.y as f64 * dir.1;
            let v = h.x as f64 * perp.0 + h.y as f64 * perp.1;
            u_min = u_min.min(u);
            u_max = u_max.max(u);
            v_min = v_min.min(v);
            v_max = v_max.max(v);
        }

        let width = u_max - u_min;
        let height = v_max - v_min;
        let area = width * height;
        if best.as_ref().is_some_and(|b| b.area() <= area) {
            continue;
        }

        let u_mid = (u_min + u_max) / 2.0;
        let v_mid = (v_min + v_max) / 2.0;
        best = Some(OrientedBox {
            center: (
                u_mid * dir.0 + v_mid * perp.0,
                u_mid * dir.1 + v_mid * perp.1,
            ),
            width,
            height,
            angle: fold_angle(dir.1.atan2(dir.0).to_degrees()),
        });
    }

    // Hull had at least 3 vertices, so at least one edge produced a candidate.
    best.unwrap_or(OrientedBox {
        center: (0.0, 0.0),
        width: 0.0,
        height: 0.0,
        angle: 0.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: i32) -> Vec<Point> {
        vec![
            Point::new(0, 0),
            Point::new(size, 0),
            Point::new(size, size),
            Point::new(0, size),
        ]
    }

    #[test]
    fn bounding_rect_pixel_semantics() {
        let r = bounding_rect(&[Point::new(2, 3), Point::new(2, 3)]);
        assert_eq!((r.width, r.height), (1, 1));

        let r = bounding_rect(&square(49));
        assert_eq!((r.x, r.y, r.width, r.height), (0, 0, 50, 50));
    }

    #[test]
    fn shoelace_area_of_square() {
        assert_eq!(polygon_area(&square(50)), 2500.0);
        assert_eq!(polygon_area(&[Point::new(0, 0), Point::new(5, 5)]), 0.0);
    }

    #[test]
    fn perimeter_of_square() {
        assert_eq!(closed_perimeter(&square(50)), 200.0);
    }

    #[test]
    fn hull_drops_interior_and_collinear_points() {
        let mut pts = square(10);
        pts.push(Point::new(5, 5)); // interior
        pts.push(Point::new(5, 0)); // collinear on an edge
        let hull = convex_hull(&pts);
        assert_eq!(hull.len(), 4);
        assert_eq!(polygon_area(&hull), 100.0);
    }

    #[test]
    fn min_area_rect_axis_aligned_square() {
        let b = min_area_rect(&square(50));
        assert!((b.width - 50.0).abs() < 1e-9);
        assert!((b.height - 50.0).abs() < 1e-9);
        assert!((b.area() - 2500.0).abs() < 1e-9);
        assert_eq!(b.angle, 0.0);
        assert_eq!(b.center, (25.0, 25.0));
    }

    #[test]
    fn corners_reconstruct_the_square() {
        let b = min_area_rect(&square(50));
        let corners = b.corners();
        for expected in [(0.0, 0.0), (50.0, 0.0), (50.0, 50.0), (0.0, 50.0)] {
            assert!(
                corners
                    .iter()
                    .any(|c| (c.0 - expected.0).abs() < 1e-9 && (c.1 - expected.1).abs() < 1e-9),
                "corner {:?} missing from {:?}",
                expected,
                corners
            );
        }
    }

    #[test]
    fn min_area_rect_rotated_rectangle() {
        // 45-degree line of lattice points: a thin diagonal strip.
        let pts = vec![
            Point::new(0, 0),
            Point::new(1, 0),
            Point::new(10, 9),
            Point::new(9, 10),
            Point::new(10, 10),
            Point::new(0, 1),
        ];
        let b = min_area_rect(&pts);
        // Long side runs along the diagonal.
        let long = b.width.max(b.height);
        let short = b.width.min(b.height);
        assert!(long > 13.0 && long < 15.0);
        assert!(short < 2.0);
        assert!((b.angle.abs() - 45.0).abs() < 1.0);
    }

    #[test]
    fn min_area_rect_degenerate_inputs() {
        assert_eq!(min_area_rect(&[]).area(), 0.0);
        assert_eq!(min_area_rect(&[Point::new(3, 4)]).area(), 0.0);

        let b = min_area_rect(&[Point::new(0, 0), Point::new(3, 4)]);
        assert_eq!(b.area(), 0.0);
        assert!((b.width - 5.0).abs() < 1e-9);
    }
}
