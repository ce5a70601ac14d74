//! Deterministic simulation harness.
//!
//! A synthetic world of circular obstacles (a traffic cone is just a
//! small circle) that ray-casts laser scans, synthesizes odometry,
//! vision cone angles and bump contacts, and integrates the node's
//! velocity commands. Drives the full node tick by tick for the
//! integration tests and the demo binary; there is no randomness, so
//! every run replays identically.

use crate::bus::{RecordingOutputs, TransformError, TransformService};
use crate::config::NavConfig;
use crate::messages::{LaserScan, OdomSample, Quaternion, StampedPoint};
use crate::node::NavNode;
use maidan_map::{normalize_angle, Pose2D, WorldPoint};

/// Control tick, seconds.
const CONTROL_PERIOD: f64 = 0.1;
/// Time between laser scans, seconds.
const SCAN_PERIOD: f64 = 0.2;
/// Laser sensing limit; beams that reach it report the nothing-in-range
/// status code.
const MAX_SENSE: f32 = 20.0;
/// Vision field of view half-angle, radians.
const VISION_FOV: f32 = 0.6;
/// Vision detection range for cones, meters.
const VISION_RANGE: f32 = 8.0;

/// A circular obstacle.
#[derive(Clone, Copy, Debug)]
pub struct Circle {
    pub center: WorldPoint,
    pub radius: f32,
}

impl Circle {
    pub fn new(x: f32, y: f32, radius: f32) -> Self {
        Self {
            center: WorldPoint::new(x, y),
            radius,
        }
    }
}

/// An axis-aligned rectangular obstacle.
#[derive(Clone, Copy, Debug)]
pub struct Rect {
    pub min: WorldPoint,
    pub max: WorldPoint,
}

impl Rect {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            min: WorldPoint::new(x0, y0),
            max: WorldPoint::new(x1, y1),
        }
    }
}

/// Synthetic world: circular and rectangular obstacles plus an optional
/// traffic cone.
#[derive(Clone, Debug, Default)]
pub struct SimWorld {
    pub obstacles: Vec<Circle>,
    pub walls: Vec<Rect>,
    pub cone: Option<Circle>,
}

impl SimWorld {
    /// Distance along a ray to the nearest circle, if any.
    fn ray_hit(origin: WorldPoint, angle: f32, circle: &Circle) -> Option<f32> {
        let ox = circle.center.x - origin.x;
        let oy = circle.center.y - origin.y;
        let along = ox * angle.cos() + oy * angle.sin();
        let perp_sq = (ox * ox + oy * oy) - along * along;
        let r_sq = circle.radius * circle.radius;
        if perp_sq > r_sq {
            return None;
        }
        let t = along - (r_sq - perp_sq).sqrt();
        (t > 0.0).then_some(t)
    }

    /// Distance along a ray to a rectangle, if it hits (slab test).
    fn ray_rect(origin: WorldPoint, angle: f32, rect: &Rect) -> Option<f32> {
        let dir = WorldPoint::new(angle.cos(), angle.sin());
        let mut t_near = f32::NEG_INFINITY;
        let mut t_far = f32::INFINITY;
        for (o, d, lo, hi) in [
            (origin.x, dir.x, rect.min.x, rect.max.x),
            (origin.y, dir.y, rect.min.y, rect.max.y),
        ] {
            if d.abs() < 1e-9 {
                if o < lo || o > hi {
                    return None;
                }
            } else {
                let (t1, t2) = ((lo - o) / d, (hi - o) / d);
                let (t1, t2) = if t1 <= t2 { (t1, t2) } else { (t2, t1) };
                t_near = t_near.max(t1);
                t_far = t_far.min(t2);
            }
        }
        (t_near <= t_far && t_near > 0.0).then_some(t_near)
    }

    /// Cast one beam against everything in the world.
    fn cast(&self, origin: WorldPoint, angle: f32) -> Option<f32> {
        let circles = self
            .obstacles
            .iter()
            .chain(self.cone.iter())
            .filter_map(|c| Self::ray_hit(origin, angle, c));
        let walls = self
            .walls
            .iter()
            .filter_map(|r| Self::ray_rect(origin, angle, r));
        circles
            .chain(walls)
            .filter(|&t| t <= MAX_SENSE)
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Synthesize a 181-beam front-facing scan from the laser pose.
    pub fn scan(&self, laser: Pose2D, stamp: f64) -> LaserScan {
        let beams = 181;
        let angle_min = -std::f32::consts::FRAC_PI_2;
        let angle_increment = std::f32::consts::PI / 180.0;
        let ranges = (0..beams)
            .map(|i| {
                let bearing = laser.theta + angle_min + i as f32 * angle_increment;
                // A miss reports the nothing-within-range status
                self.cast(laser.position(), bearing).unwrap_or(0.0)
            })
            .collect();
        LaserScan {
            frame_id: "laser".into(),
            stamp,
            angle_min,
            angle_increment,
            range_min: 0.02,
            ranges,
        }
    }
}

/// Transform from the laser frame to the world frame at the pose the
/// scan was taken.
struct LaserTransform {
    laser_pose: Pose2D,
}

impl TransformService for LaserTransform {
    fn transform_point(
        &self,
        target_frame: &str,
        point: &StampedPoint,
    ) -> Result<StampedPoint, TransformError> {
        Ok(StampedPoint {
            frame_id: target_frame.to_string(),
            stamp: point.stamp,
            point: self.laser_pose.transform_point(point.point),
        })
    }
}

/// Closed-loop simulation of the node in a synthetic world.
pub struct Simulation {
    pub world: SimWorld,
    pub node: NavNode,
    pub outputs: RecordingOutputs,
    /// Ground-truth robot pose.
    pub pose: Pose2D,
    laser_offset: f32,
    speed: f32,
    yaw_rate: f32,
    time: f64,
    next_scan: f64,
}

impl Simulation {
    pub fn new(world: SimWorld, config: NavConfig) -> Self {
        let laser_offset = config.mapper.laser_offset;
        Self {
            world,
            node: NavNode::new(config),
            outputs: RecordingOutputs::new(),
            pose: Pose2D::default(),
            laser_offset,
            speed: 0.0,
            yaw_rate: 0.0,
            time: 0.0,
            next_scan: 0.0,
        }
    }

    /// Simulated time, seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Hand the node a goal in the world frame.
    pub fn set_goal(&mut self, x: f32, y: f32) {
        self.node.handle_goal(StampedPoint {
            frame_id: "odom".into(),
            stamp: self.time,
            point: WorldPoint::new(x, y),
        });
    }

    /// Advance one control tick.
    pub fn step(&mut self) {
        // Integrate the last command
        let dt = CONTROL_PERIOD as f32;
        self.pose.theta = normalize_angle(self.pose.theta + self.yaw_rate * dt);
        self.pose.x += self.speed * self.pose.theta.cos() * dt;
        self.pose.y += self.speed * self.pose.theta.sin() * dt;
        self.time += CONTROL_PERIOD;

        // Laser
        if self.time >= self.next_scan {
            let laser_pose = Pose2D::new(
                self.pose.x + self.laser_offset * self.pose.theta.cos(),
                self.pose.y + self.laser_offset * self.pose.theta.sin(),
                self.pose.theta,
            );
            let scan = self.world.scan(laser_pose, self.time);
            let tf = LaserTransform { laser_pose };
            self.node.handle_scan(&scan, &tf, &mut self.outputs);
            self.next_scan += SCAN_PERIOD;
        }

        // Vision cone angle, when the cone is in view
        if let Some(cone) = self.world.cone {
            let bearing =
                normalize_angle(self.pose.position().angle_to(&cone.center) - self.pose.theta);
            let dist = self.pose.distance_to(&cone.center);
            if bearing.abs() < VISION_FOV && dist < VISION_RANGE {
                self.node.handle_cone_angle(bearing, self.time);
            }
        }

        // Bump switch at the front of the footprint
        if let Some(cone) = self.world.cone {
            let front = self.pose.transform_point(WorldPoint::new(0.45, 0.0));
            let touching = front.distance(&cone.center) < cone.radius + 0.05;
            self.node.handle_bump(touching);
        }

        // Odometry tick drives the planner
        let odom = OdomSample {
            frame_id: "odom".into(),
            stamp: self.time,
            position: self.pose.position(),
            orientation: Quaternion::from_yaw(self.pose.theta),
            linear_velocity: self.speed,
        };
        let tf = LaserTransform {
            laser_pose: self.pose,
        };
        self.node.handle_position(&odom, &tf, &mut self.outputs);

        // Latch the newly published command
        if let Some(cmd) = self.outputs.last_command() {
            self.speed = cmd.linear;
            self.yaw_rate = cmd.angular;
        }
    }

    /// Run until the node goes idle or the time limit passes. Returns
    /// true when the node finished on its own.
    pub fn run(&mut self, time_limit: f64) -> bool {
        let deadline = self.time + time_limit;
        while self.time < deadline {
            self.step();
            if !self.node.is_active() {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_hit_straight_on() {
        let circle = Circle::new(2.0, 0.0, 0.5);
        let t = SimWorld::ray_hit(WorldPoint::ZERO, 0.0, &circle).unwrap();
        assert!((t - 1.5).abs() < 1e-5);
    }

    #[test]
    fn test_ray_misses_offset_circle() {
        let circle = Circle::new(2.0, 1.0, 0.5);
        assert!(SimWorld::ray_hit(WorldPoint::ZERO, 0.0, &circle).is_none());
    }

    #[test]
    fn test_ray_behind_is_ignored() {
        let circle = Circle::new(-2.0, 0.0, 0.5);
        assert!(SimWorld::ray_hit(WorldPoint::ZERO, 0.0, &circle).is_none());
    }

    #[test]
    fn test_ray_rect_front_face() {
        let rect = Rect::new(1.0, -0.2, 1.5, 0.2);
        let t = SimWorld::ray_rect(WorldPoint::ZERO, 0.0, &rect).unwrap();
        assert!((t - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_ray_rect_misses_beside() {
        let rect = Rect::new(1.0, -0.2, 1.5, 0.2);
        // A beam steep enough to pass over the near corner
        assert!(SimWorld::ray_rect(WorldPoint::ZERO, 0.5, &rect).is_none());
        assert!(SimWorld::ray_rect(WorldPoint::ZERO, std::f32::consts::PI, &rect).is_none());
    }

    #[test]
    fn test_scan_reports_miss_as_status_zero() {
        let world = SimWorld::default();
        let scan = world.scan(Pose2D::default(), 0.0);
        assert_eq!(scan.ranges.len(), 181);
        assert!(scan.ranges.iter().all(|&r| r == 0.0));
    }

    #[test]
    fn test_scan_sees_obstacle_ahead() {
        let world = SimWorld {
            obstacles: vec![Circle::new(3.0, 0.0, 0.5)],
            ..SimWorld::default()
        };
        let scan = world.scan(Pose2D::default(), 0.0);
        // The center beam looks straight down +X
        assert!((scan.ranges[90] - 2.5).abs() < 1e-4);
    }
}
