//! Unit-box normalization of keypoint sequences.
//!
//! Maps a raw point sequence into `[0, 1] × [0, 1]` while preserving the
//! aspect ratio of relative positions:
//!
//! ```text
//! scale  = max(max_x - min_x, max_y - min_y)
//! norm_x = (x - min_x) / scale
//! norm_y = (y - min_y) / scale
//! ```
//!
//! Both axes share one scale, so the longer axis spans exactly `[0, 1]`
//! and the shorter axis spans a proportional sub-interval starting at 0.
//! An axis with zero extent (every point shares that coordinate) is given
//! [`DEGENERATE_EXTENT_EPSILON`] as its extent so the division stays finite.
//!
//! When an extent would exceed `f64::MAX` (coordinates near opposite ends
//! of the `f64` range), every term is computed on halved coordinates. The
//! ratios are unchanged and each output stays finite.

use crate::types::{BoundingBox, Point};

/// Extent substituted for an axis on which all points coincide.
pub const DEGENERATE_EXTENT_EPSILON: f64 = 1e-6;

/// Normalize `points` into the unit box, preserving aspect ratio.
///
/// Output has the same length and order as the input. An empty input
/// yields an empty output. Finite input always yields finite output.
#[must_use]
pub fn normalize_points(points: &[Point]) -> Vec<Point> {
    normalize_points_with(points, DEGENERATE_EXTENT_EPSILON)
}

/// Like [`normalize_points`], with a caller-chosen degenerate extent.
///
/// `epsilon` must be finite and positive; see
/// [`PointsConfig::validate`](crate::PointsConfig::validate).
#[must_use]
pub fn normalize_points_with(points: &[Point], epsilon: f64) -> Vec<Point> {
    let Some(bbox) = BoundingBox::of(points) else {
        return Vec::new();
    };

    let k = if bbox.width().is_finite() && bbox.height().is_finite() {
        1.0
    } else {
        0.5
    };
    let min = Point::new(bbox.min.x * k, bbox.min.y * k);
    let width = non_degenerate(bbox.max.x.mul_add(k, -min.x), epsilon * k);
    let height = non_degenerate(bbox.max.y.mul_add(k, -min.y), epsilon * k);
    let scale = width.max(height);

    points
        .iter()
        .map(|p| {
            Point::new(
                p.x.mul_add(k, -min.x) / scale,
                p.y.mul_add(k, -min.y) / scale,
            )
        })
        .collect()
}

const fn non_degenerate(extent: f64, epsilon: f64) -> f64 {
    if extent == 0.0 { epsilon } else { extent }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-10;

    fn pts(coords: &[(f64, f64)]) -> Vec<Point> {
        coords.iter().copied().map(Point::from).collect()
    }

    fn assert_points_close(actual: &[Point], expected: &[Point]) {
        assert_eq!(actual.len(), expected.len(), "length mismatch");
        for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
            assert!(
                (a.x - e.x).abs() < TOLERANCE && (a.y - e.y).abs() < TOLERANCE,
                "point {i}: expected ({}, {}), got ({}, {})",
                e.x,
                e.y,
                a.x,
                a.y,
            );
        }
    }

    #[test]
    fn rectangle_keeps_aspect_ratio() {
        // 2x1 rectangle: x spans [0, 1], y spans [0, 0.5].
        let input = pts(&[(0.0, 0.0), (2.0, 0.0), (2.0, 1.0), (0.0, 1.0)]);
        let expected = pts(&[(0.0, 0.0), (1.0, 0.0), (1.0, 0.5), (0.0, 0.5)]);
        assert_points_close(&normalize_points(&input), &expected);
    }

    #[test]
    fn identical_points_map_to_origin() {
        let input = pts(&[(3.0, 3.0), (3.0, 3.0)]);
        let result = normalize_points(&input);
        assert_points_close(&result, &pts(&[(0.0, 0.0), (0.0, 0.0)]));
        assert!(result.iter().all(|p| p.x.is_finite() && p.y.is_finite()));
    }

    #[test]
    fn single_point_maps_to_origin() {
        let result = normalize_points(&pts(&[(-7.5, 12.0)]));
        assert_points_close(&result, &pts(&[(0.0, 0.0)]));
    }

    #[test]
    fn vertical_line_uses_height_as_scale() {
        // Zero width: x collapses to 0, y spans the unit interval.
        let input = pts(&[(5.0, 10.0), (5.0, 14.0), (5.0, 12.0)]);
        let expected = pts(&[(0.0, 0.0), (0.0, 1.0), (0.0, 0.5)]);
        assert_points_close(&normalize_points(&input), &expected);
    }

    #[test]
    fn negative_coordinates_shift_to_zero() {
        let input = pts(&[(-4.0, -2.0), (0.0, 0.0)]);
        let expected = pts(&[(0.0, 0.0), (1.0, 0.5)]);
        assert_points_close(&normalize_points(&input), &expected);
    }

    #[test]
    fn order_is_preserved() {
        let input = pts(&[(10.0, 0.0), (0.0, 0.0), (5.0, 0.0)]);
        let result = normalize_points(&input);
        assert!((result[0].x - 1.0).abs() < TOLERANCE);
        assert!(result[1].x.abs() < TOLERANCE);
        assert!((result[2].x - 0.5).abs() < TOLERANCE);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(normalize_points(&[]).is_empty());
    }

    #[test]
    fn normalizing_twice_is_idempotent() {
        let input = pts(&[(1.0, 2.0), (9.0, 4.0), (3.0, 7.0), (6.0, 2.5)]);
        let once = normalize_points(&input);
        let twice = normalize_points(&once);
        assert_points_close(&twice, &once);
    }

    #[test]
    fn output_stays_in_unit_box() {
        let input = pts(&[
            (13.2, -4.1),
            (-8.7, 22.9),
            (0.0, 0.0),
            (101.5, 3.3),
            (-55.0, -19.25),
        ]);
        for p in normalize_points(&input) {
            assert!((-TOLERANCE..=1.0 + TOLERANCE).contains(&p.x), "x={}", p.x);
            assert!((-TOLERANCE..=1.0 + TOLERANCE).contains(&p.y), "y={}", p.y);
        }
    }

    #[test]
    fn extents_keep_input_ratio() {
        let input = pts(&[(2.0, 1.0), (8.0, 3.0), (5.0, 5.0)]);
        let in_box = BoundingBox::of(&input).unwrap();
        let out = normalize_points(&input);
        let out_box = BoundingBox::of(&out).unwrap();

        let in_ratio = in_box.height() / in_box.width();
        let out_ratio = out_box.height() / out_box.width();
        assert!((in_ratio - out_ratio).abs() < TOLERANCE);
        // Longer axis (x) spans exactly [0, 1].
        assert!(out_box.min.x.abs() < TOLERANCE);
        assert!((out_box.max.x - 1.0).abs() < TOLERANCE);
        assert!(out_box.min.y.abs() < TOLERANCE);
    }

    #[test]
    fn extent_beyond_f64_max_stays_finite() {
        let input = pts(&[(-1e308, 0.0), (1e308, 0.0)]);
        let result = normalize_points(&input);
        assert!(result.iter().all(|p| p.x.is_finite() && p.y.is_finite()));
        assert_points_close(&result, &pts(&[(0.0, 0.0), (1.0, 0.0)]));
    }

    #[test]
    fn huge_extent_keeps_aspect_ratio() {
        let input = pts(&[(-1e308, -5e307), (1e308, 5e307), (0.0, 0.0)]);
        let expected = pts(&[(0.0, 0.0), (1.0, 0.5), (0.5, 0.25)]);
        assert_points_close(&normalize_points(&input), &expected);
    }

    #[test]
    fn huge_degenerate_axis_collapses_to_zero() {
        let input = pts(&[(1e308, 0.0), (1e308, 1.0)]);
        let expected = pts(&[(0.0, 0.0), (0.0, 1.0)]);
        assert_points_close(&normalize_points(&input), &expected);
    }

    #[test]
    fn custom_epsilon_only_affects_degenerate_axes() {
        let input = pts(&[(0.0, 0.0), (4.0, 0.0)]);
        let result = normalize_points_with(&input, 0.5);
        assert_points_close(&result, &pts(&[(0.0, 0.0), (1.0, 0.0)]));
    }
}
