use crate::geometry::{DEGENERATE_LENGTH, Point, length, orientation};

/// Radial distortion applied to a node's distance ratio.
///
/// `ratio` is node distance over lens radius. The map is monotone on
/// `[0, inf)`, fixes 0 and 1, and is the identity for `magnification == 0`.
pub fn distorted_ratio(ratio: f64, magnification: f64) -> f64 {
    ((magnification + 1.0) * ratio) / (magnification * ratio + 1.0)
}

/// Target positions of every node under full fisheye distortion.
///
/// A node sitting exactly on the focal point has no direction and stays put.
pub fn compute_fisheye_positions(
    positions: &[Point],
    focal_point: Point,
    radius: f64,
    magnification: f64,
) -> Vec<Point> {
    positions
        .iter()
        .map(|&node| fisheye_position(node, focal_point, radius, magnification))
        .collect()
}

fn fisheye_position(node: Point, focal_point: Point, radius: f64, magnification: f64) -> Point {
    let dir = orientation(node, focal_point);
    let boundary_point = focal_point + dir * radius;
    let boundary_distance = length(boundary_point, focal_point);
    if boundary_distance <= DEGENERATE_LENGTH {
        return node;
    }

    let ratio = length(node, focal_point) / boundary_distance;
    focal_point + dir * radius * distorted_ratio(ratio, magnification)
}
