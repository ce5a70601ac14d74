//! Bus message types.
//!
//! Timestamps are f64 seconds carried on the messages themselves;
//! handlers treat the stamp of the triggering message as "now". Since
//! the bus dispatches callbacks serially, this is indistinguishable from
//! a wall clock to the state machines, and it makes every handler
//! deterministic under replay.

use maidan_map::{Pose2D, WorldPoint};
use serde::{Deserialize, Serialize};

/// One planar laser scan.
#[derive(Clone, Debug)]
pub struct LaserScan {
    /// Frame the ranges are measured in.
    pub frame_id: String,
    /// Acquisition time, seconds.
    pub stamp: f64,
    /// Bearing of the first beam relative to the laser, radians.
    pub angle_min: f32,
    /// Bearing step between consecutive beams, radians.
    pub angle_increment: f32,
    /// Ranges below this carry status codes instead of distances.
    pub range_min: f32,
    /// Measured ranges, meters.
    pub ranges: Vec<f32>,
}

impl LaserScan {
    /// Bearing of beam `i` in the laser frame.
    #[inline]
    pub fn beam_angle(&self, i: usize) -> f32 {
        self.angle_min + i as f32 * self.angle_increment
    }
}

/// Orientation quaternion as delivered by the odometry source.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quaternion {
    /// Identity rotation.
    pub fn identity() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }

    /// Quaternion for a pure yaw rotation.
    pub fn from_yaw(yaw: f32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: (yaw * 0.5).sin(),
            w: (yaw * 0.5).cos(),
        }
    }

    /// Extract the yaw angle, radians in [-pi, pi].
    pub fn yaw(&self) -> f32 {
        let siny_cosp = 2.0 * (self.w * self.z + self.x * self.y);
        let cosy_cosp = 1.0 - 2.0 * (self.y * self.y + self.z * self.z);
        siny_cosp.atan2(cosy_cosp)
    }
}

/// One odometry sample.
#[derive(Clone, Debug)]
pub struct OdomSample {
    /// Frame the pose is expressed in.
    pub frame_id: String,
    /// Sample time, seconds.
    pub stamp: f64,
    /// Position in the odometry frame, meters.
    pub position: WorldPoint,
    /// Orientation in the odometry frame.
    pub orientation: Quaternion,
    /// Measured forward velocity, m/s.
    pub linear_velocity: f32,
}

impl OdomSample {
    /// The sample as a planar pose.
    #[inline]
    pub fn pose(&self) -> Pose2D {
        Pose2D::new(self.position.x, self.position.y, self.orientation.yaw())
    }
}

/// A point tagged with its frame and time.
#[derive(Clone, Debug, PartialEq)]
pub struct StampedPoint {
    pub frame_id: String,
    pub stamp: f64,
    pub point: WorldPoint,
}

/// Velocity command for the base controller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VelocityCommand {
    /// Forward velocity, m/s.
    pub linear: f32,
    /// Yaw rate, rad/s.
    pub angular: f32,
}

impl VelocityCommand {
    /// A full stop.
    pub fn stop() -> Self {
        Self::default()
    }
}
