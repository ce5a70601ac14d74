//! Signed-radius arc parameterization and sampling.
//!
//! Steering commands are arcs: a signed turning radius (positive = left,
//! zero = straight) and a length along the path. The circle center sits
//! perpendicular-left of the start pose at distance `radius`; a negative
//! radius therefore places it on the right.
//!
//! [`Arc::sample`] is the single source of path points. Collision testing
//! and path publication both consume it, so the point sequences they see
//! are identical by construction.

use crate::core::{Pose2D, WorldPoint};
use std::f32::consts::FRAC_PI_2;

/// An arc of signed radius, traversed for `length` meters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Arc {
    /// Signed turning radius in meters; positive turns left, zero is a
    /// straight line.
    pub radius: f32,
    /// Path length in meters.
    pub length: f32,
}

impl Arc {
    /// Create a new arc.
    #[inline]
    pub fn new(radius: f32, length: f32) -> Self {
        Self { radius, length }
    }

    /// A straight segment of the given length.
    #[inline]
    pub fn straight(length: f32) -> Self {
        Self {
            radius: 0.0,
            length,
        }
    }

    /// Pose at the end of the arc.
    ///
    /// For a curved arc the reported theta is the polar angle of the
    /// endpoint on the turning circle, `(start.theta - pi/2) + length/radius`;
    /// the tangent heading leads it by pi/2.
    pub fn end_pose(&self, start: Pose2D) -> Pose2D {
        if self.radius != 0.0 {
            let center = turn_center(start, self.radius);
            let angle = (start.theta - FRAC_PI_2) + self.length / self.radius;
            Pose2D::new(
                center.x + self.radius * angle.cos(),
                center.y + self.radius * angle.sin(),
                angle,
            )
        } else {
            Pose2D::new(
                start.x + self.length * start.theta.cos(),
                start.y + self.length * start.theta.sin(),
                start.theta,
            )
        }
    }

    /// Lazily sample points along the arc at fixed spacing, starting at
    /// distance zero and stopping before `length`.
    pub fn sample(&self, start: Pose2D, step: f32) -> ArcSampler {
        let center = if self.radius != 0.0 {
            turn_center(start, self.radius)
        } else {
            WorldPoint::ZERO
        };
        ArcSampler {
            start,
            center,
            base_angle: start.theta - FRAC_PI_2,
            radius: self.radius,
            length: self.length,
            step,
            traveled: 0.0,
        }
    }
}

/// Center of the turning circle: perpendicular-left of the start pose at
/// the signed radius.
#[inline]
fn turn_center(start: Pose2D, radius: f32) -> WorldPoint {
    WorldPoint::new(
        start.x + radius * (start.theta + FRAC_PI_2).cos(),
        start.y + radius * (start.theta + FRAC_PI_2).sin(),
    )
}

/// Iterator over points along an arc at fixed spacing.
///
/// Yields the point at distance `0`, then `step`, `2 * step`, ... while
/// the distance stays below the arc length.
pub struct ArcSampler {
    start: Pose2D,
    center: WorldPoint,
    base_angle: f32,
    radius: f32,
    length: f32,
    step: f32,
    traveled: f32,
}

impl Iterator for ArcSampler {
    type Item = WorldPoint;

    fn next(&mut self) -> Option<Self::Item> {
        if self.traveled >= self.length {
            return None;
        }
        let d = self.traveled;
        self.traveled += self.step;

        let point = if self.radius != 0.0 {
            let angle = self.base_angle + d / self.radius;
            WorldPoint::new(
                self.center.x + self.radius * angle.cos(),
                self.center.y + self.radius * angle.sin(),
            )
        } else {
            WorldPoint::new(
                self.start.x + d * self.start.theta.cos(),
                self.start.y + d * self.start.theta.sin(),
            )
        };
        Some(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_straight_end_pose() {
        let arc = Arc::straight(2.0);
        let end = arc.end_pose(Pose2D::new(1.0, 1.0, FRAC_PI_2));
        assert_relative_eq!(end.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(end.y, 3.0, epsilon = 1e-5);
        assert_relative_eq!(end.theta, FRAC_PI_2, epsilon = 1e-6);
    }

    #[test]
    fn test_left_quarter_turn() {
        // Quarter turn left at radius 1 from the origin facing +X ends at
        // (1, 1) on the turning circle centered at (0, 1).
        let r = 1.0;
        let arc = Arc::new(r, r * FRAC_PI_2);
        let end = arc.end_pose(Pose2D::new(0.0, 0.0, 0.0));
        assert_relative_eq!(end.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(end.y, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_right_quarter_turn() {
        let r = -1.0;
        let arc = Arc::new(r, 1.0 * FRAC_PI_2);
        let end = arc.end_pose(Pose2D::new(0.0, 0.0, 0.0));
        assert_relative_eq!(end.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(end.y, -1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_traverse_round_trip() {
        // Drive an arc, then drive it backward from the end; the start
        // pose must come back within epsilon. end_pose reports the polar
        // angle of the endpoint; the tangent heading leads by pi/2, so
        // the reversal starts from the tangent-corrected pose.
        let start = Pose2D::new(0.3, -0.7, 0.4);
        for &(r, l) in &[(1.5, 2.0), (-0.695, 1.0), (2.0, PI)] {
            let end = Arc::new(r, l).end_pose(start);
            let tangent = Pose2D::new(end.x, end.y, end.theta + FRAC_PI_2);
            let back = Arc::new(r, -l).end_pose(tangent);
            assert_relative_eq!(back.x, start.x, epsilon = 1e-4);
            assert_relative_eq!(back.y, start.y, epsilon = 1e-4);
            assert_relative_eq!(back.theta + FRAC_PI_2, start.theta, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_sampler_matches_itself() {
        // Collision testing and path publication share the sampler; two
        // passes over the same arc must produce bit-identical sequences.
        let start = Pose2D::new(0.1, 0.2, 0.3);
        let arc = Arc::new(0.695, 1.09);
        let a: Vec<WorldPoint> = arc.sample(start, 0.05).collect();
        let b: Vec<WorldPoint> = arc.sample(start, 0.05).collect();
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn test_sampler_spacing() {
        let start = Pose2D::new(0.0, 0.0, 0.0);
        let points: Vec<WorldPoint> = Arc::straight(0.98).sample(start, 0.05).collect();
        // 0.0, 0.05, ..., 0.95
        assert_eq!(points.len(), 20);
        for (i, p) in points.iter().enumerate() {
            assert_relative_eq!(p.x, i as f32 * 0.05, epsilon = 1e-5);
            assert_relative_eq!(p.y, 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_sampler_first_point_is_start() {
        let start = Pose2D::new(2.0, -1.0, 1.2);
        let first = Arc::new(1.0, 0.5).sample(start, 0.05).next().unwrap();
        assert_relative_eq!(first.x, start.x, epsilon = 1e-5);
        assert_relative_eq!(first.y, start.y, epsilon = 1e-5);
    }

    #[test]
    fn test_zero_length_samples_nothing() {
        let start = Pose2D::new(0.0, 0.0, 0.0);
        assert_eq!(Arc::new(4.0, 0.0).sample(start, 0.05).count(), 0);
    }
}
