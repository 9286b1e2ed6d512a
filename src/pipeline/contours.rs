//! Contour extraction from a binary mask.
//!
//! Foreground regions are found by connected-component labeling
//! (8-connectivity) and their boundaries traced with Moore neighbor tracing.
//! The traced pixel chain is simplified by collapsing runs of collinear
//! points, so a filled rectangle comes back as its four corners.
//!
//! With `external_only` set, only outermost region boundaries are returned.
//! Otherwise cavities fully enclosed by foreground (background components
//! that never touch the image border, 4-connectivity) contribute their
//! boundary as well.
//!
//! Output order follows the row-major scan and is NOT guaranteed stable
//! between frames; downstream consumers that need determinism must sort.

use crate::frame::Mask;
use crate::pipeline::geometry::Point;

/// Closed polygonal boundary of one connected region. Frame-local; never
/// persisted across frames.
pub type Contour = Vec<Point>;

/// Moore neighborhood, clockwise starting east, in image coordinates
/// (y grows downward).
const NEIGHBORS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

/// Extract the closed boundary contours of a binary mask.
pub fn find_contours(mask: &Mask, external_only: bool) -> Vec<Contour> {
    if mask.is_empty() {
        return Vec::new();
    }

    let mut contours = trace_regions(mask, |x, y| mask.is_set(x, y), Connectivity::Eight);
    if !external_only {
        contours.extend(hole_contours(mask));
    }
    contours
}

enum Connectivity {
    Four,
    Eight,
}

/// Label connected regions of `is_fg` and trace the outer boundary of each.
/// With 4-connectivity, regions touching the image border are skipped
/// (that mode labels background, and the outer background is not a hole).
fn trace_regions<F>(mask: &Mask, is_fg: F, connectivity: Connectivity) -> Vec<Contour>
where
    F: Fn(i32, i32) -> bool,
{
    let width = mask.width() as i32;
    let height = mask.height() as i32;
    let mut seen = vec![false; (width * height) as usize];
    let idx = |x: i32, y: i32| (y * width + x) as usize;

    let four_only = matches!(connectivity, Connectivity::Four);

    let mut contours = Vec::new();
    let mut queue = Vec::new();

    for y in 0..height {
        for x in 0..width {
            if !is_fg(x, y) || seen[idx(x, y)] {
                continue;
            }

            // Flood-fill the component so later scan hits skip it.
            queue.clear();
            queue.push((x, y));
            seen[idx(x, y)] = true;
            let mut touches_border = false;
            while let Some((cx, cy)) = queue.pop() {
                if cx == 0 || cy == 0 || cx == width - 1 || cy == height - 1 {
                    touches_border = true;
                }
                for &(dx, dy) in &NEIGHBORS {
                    if four_only && dx != 0 && dy != 0 {
                        continue;
                    }
                    let (nx, ny) = (cx + dx, cy + dy);
                    if nx < 0 || ny < 0 || nx >= width || ny >= height {
                        continue;
                    }
                    if is_fg(nx, ny) && !seen[idx(nx, ny)] {
                        seen[idx(nx, ny)] = true;
                        queue.push((nx, ny));
                    }
                }
            }

            // Holes are background regions that never reach the border; the
            // outer background always does. Foreground regions are kept
            // unconditionally.
            if four_only && touches_border {
                continue;
            }

            let boundary = trace_boundary(Point::new(x, y), &is_fg, 4 * (width * height) as usize);
            contours.push(simplify(boundary));
        }
    }

    contours
}

/// Boundaries of cavities fully enclosed by foreground.
fn hole_contours(mask: &Mask) -> Vec<Contour> {
    let width = mask.width() as i32;
    let height = mask.height() as i32;
    let in_bounds =
        move |x: i32, y: i32| x >= 0 && y >= 0 && x < width && y < height && !mask.is_set(x, y);
    trace_regions(mask, in_bounds, Connectivity::Four)
}

/// Moore neighbor tracing, clockwise, from the region's topmost-leftmost
/// pixel. `cap` bounds the walk against pathological inputs.
fn trace_boundary<F>(start: Point, is_fg: &F, cap: usize) -> Vec<Point>
where
    F: Fn(i32, i32) -> bool,
{
    let next_from = |p: Point, search_start: usize| -> Option<(Point, usize)> {
        for i in 0..8 {
            let d = (search_start + i) % 8;
            let (dx, dy) = NEIGHBORS[d];
            let q = Point::new(p.x + dx, p.y + dy);
            if is_fg(q.x, q.y) {
                return Some((q, d));
            }
        }
        None
    };

    // Start is topmost-leftmost, so the row above and the pixel to the west
    // are outside the region; searching clockwise from north finds the first
    // boundary neighbor in clockwise order.
    let Some((second, first_dir)) = next_from(start, 6) else {
        return vec![start]; // isolated pixel
    };

    let mut boundary = vec![start, second];
    let mut cur = second;
    let mut dir = first_dir;

    while boundary.len() <= cap {
        let search_start = (dir + 5) % 8;
        let Some((next, next_dir)) = next_from(cur, search_start) else {
            break;
        };
        if next == start {
            // Closed iff re-entering the start would repeat the first move.
            if let Some((peek, _)) = next_from(start, (next_dir + 5) % 8) {
                if peek == second {
                    break;
                }
            }
        }
        boundary.push(next);
        cur = next;
        dir = next_dir;
    }

    boundary
}

/// Collapse runs of collinear points, keeping run endpoints
/// (the chain-approximation used by the rest of the pipeline).
fn simplify(chain: Vec<Point>) -> Contour {
    let n = chain.len();
    if n < 3 {
        return chain;
    }
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let prev = chain[(i + n - 1) % n];
        let cur = chain[i];
        let next = chain[(i + 1) % n];
        let ax = (cur.x - prev.x) as i64;
        let ay = (cur.y - prev.y) as i64;
        let bx = (next.x - cur.x) as i64;
        let by = (next.y - cur.y) as i64;
        let collinear_same_way = ax * by - ay * bx == 0 && ax * bx + ay * by > 0;
        if !collinear_same_way {
            out.push(cur);
        }
    }
    if out.is_empty() {
        // Fully collinear chain (a 1-pixel-wide line); keep its endpoints.
        return vec![chain[0], chain[n / 2]];
    }
    out
}
