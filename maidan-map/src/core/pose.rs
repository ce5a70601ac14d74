//! Robot pose representation.

use super::point::WorldPoint;
use serde::{Deserialize, Serialize};

/// Robot pose in world coordinates (x, y, theta)
///
/// Theta is normalized where it is derived (odometry, quaternion
/// extraction) but not re-normalized on storage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose2D {
    /// X position in meters
    pub x: f32,
    /// Y position in meters
    pub y: f32,
    /// Orientation in radians (CCW positive from +X)
    pub theta: f32,
}

impl Pose2D {
    /// Create a new pose
    #[inline]
    pub fn new(x: f32, y: f32, theta: f32) -> Self {
        Self { x, y, theta }
    }

    /// Get the position as a WorldPoint
    #[inline]
    pub fn position(&self) -> WorldPoint {
        WorldPoint::new(self.x, self.y)
    }

    /// Transform a point from robot frame to world frame
    #[inline]
    pub fn transform_point(&self, robot_point: WorldPoint) -> WorldPoint {
        let cos_t = self.theta.cos();
        let sin_t = self.theta.sin();
        WorldPoint::new(
            self.x + robot_point.x * cos_t - robot_point.y * sin_t,
            self.y + robot_point.x * sin_t + robot_point.y * cos_t,
        )
    }

    /// Distance to a point (position only)
    #[inline]
    pub fn distance_to(&self, point: &WorldPoint) -> f32 {
        self.position().distance(point)
    }
}

/// Normalize an angle to [-pi, pi]
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    let mut a = angle;
    while a > std::f32::consts::PI {
        a -= 2.0 * std::f32::consts::PI;
    }
    while a < -std::f32::consts::PI {
        a += 2.0 * std::f32::consts::PI;
    }
    a
}
