//! The navigation node: one owned context for all bus callbacks.
//!
//! The bus dispatches callbacks serially, so `NavNode` holds every piece
//! of mutable state without locks: the obstacle grid (written only by
//! the scan handler, read only by the planner's collision tests), the
//! cone tracks, the planner state machine, and the active goal. Mapper
//! updates from a scan are therefore always visible to planner decisions
//! from any later odometry tick.

use crate::bus::{NavOutputs, TransformService};
use crate::config::NavConfig;
use crate::detector::ConeDetector;
use crate::mapper;
use crate::messages::{LaserScan, OdomSample, StampedPoint, VelocityCommand};
use crate::planner::{limit_acceleration, ArcPlanner, Mode};
use maidan_map::{ObstacleGrid, Pose2D, WorldPoint};

/// Navigation node state; bus callbacks are its methods.
pub struct NavNode {
    config: NavConfig,
    grid: ObstacleGrid,
    detector: ConeDetector,
    planner: ArcPlanner,
    goal: Option<StampedPoint>,
    active: bool,
    here: Pose2D,
    position_frame: String,
}

impl NavNode {
    pub fn new(config: NavConfig) -> Self {
        let grid = ObstacleGrid::new(config.mapper.grid_size, config.mapper.resolution);
        Self {
            config,
            grid,
            detector: ConeDetector::new(),
            planner: ArcPlanner::new(),
            goal: None,
            active: false,
            here: Pose2D::default(),
            position_frame: "odom".to_string(),
        }
    }

    /// Read-only view of the obstacle grid.
    pub fn grid(&self) -> &ObstacleGrid {
        &self.grid
    }

    /// Current planner mode.
    pub fn planner_mode(&self) -> Mode {
        self.planner.mode()
    }

    /// Whether a goal is being pursued.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// New goal: becomes the single active goal.
    pub fn handle_goal(&mut self, goal: StampedPoint) {
        tracing::info!(
            "New goal ({:.2}, {:.2}) in {}",
            goal.point.x,
            goal.point.y,
            goal.frame_id
        );
        self.goal = Some(goal);
        self.active = true;
    }

    /// Bump switch update.
    pub fn handle_bump(&mut self, pressed: bool) {
        self.planner.set_bump(pressed);
    }

    /// Vision cone angle update.
    pub fn handle_cone_angle(&mut self, angle: f32, stamp: f64) {
        self.planner.set_cone_angle(angle, stamp);
    }

    /// Replace every runtime parameter at once. The grid keeps its
    /// startup geometry; it is allocated once for the process lifetime.
    pub fn handle_reconfigure(&mut self, config: NavConfig) {
        tracing::info!("Parameters reconfigured");
        self.config = config;
    }

    /// Laser scan: update the obstacle grid, then run cone detection.
    pub fn handle_scan(
        &mut self,
        scan: &LaserScan,
        tf: &dyn TransformService,
        outputs: &mut dyn NavOutputs,
    ) {
        mapper::integrate_scan(&mut self.grid, scan, self.here, &self.config.mapper);

        match self.detector.process_scan(scan, tf, &self.config.detector) {
            Ok(cones) => outputs.publish_cones(scan.stamp, &cones),
            Err(e) => tracing::error!("Dropping scan for cone detection: {}", e),
        }
    }

    /// Odometry tick: plan and publish a command.
    pub fn handle_position(
        &mut self,
        odom: &OdomSample,
        tf: &dyn TransformService,
        outputs: &mut dyn NavOutputs,
    ) {
        self.here = odom.pose();
        self.position_frame = odom.frame_id.clone();

        // Keep the goal in the position frame
        if let Some(goal) = self.goal.as_mut() {
            if goal.frame_id != self.position_frame {
                match tf.transform_point(&self.position_frame, goal) {
                    Ok(transformed) => *goal = transformed,
                    Err(e) => {
                        tracing::error!("Cannot transform goal: {}", e);
                        return;
                    }
                }
            }
        }

        let goal = match (&self.goal, self.active) {
            (Some(goal), true) => goal.point,
            _ => {
                outputs.publish_command(VelocityCommand::stop());
                return;
            }
        };

        let step = self
            .planner
            .plan(self.here, goal, odom.stamp, &self.grid, &self.config.planner);

        if let Some((start, arc)) = step.path {
            let points: Vec<WorldPoint> =
                arc.sample(start, self.grid.resolution() * 0.5).collect();
            outputs.publish_path(&self.position_frame, &points);
        }
        if let Some(done) = step.done {
            outputs.publish_goal_reached(done);
        }
        if step.clear_goal {
            self.active = false;
        }

        let speed = limit_acceleration(
            step.drive.speed,
            odom.linear_velocity,
            self.config.planner.max_accel,
        );
        let angular = if step.drive.radius != 0.0 {
            speed / step.drive.radius
        } else {
            0.0
        };
        outputs.publish_command(VelocityCommand {
            linear: speed,
            angular,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{IdentityTransform, RecordingOutputs, TransformError};
    use crate::messages::Quaternion;

    fn small_config() -> NavConfig {
        let mut config = NavConfig::default();
        config.mapper.grid_size = 400;
        config.mapper.local_size = 100;
        config
    }

    fn odom(x: f32, y: f32, yaw: f32, speed: f32, stamp: f64) -> OdomSample {
        OdomSample {
            frame_id: "odom".into(),
            stamp,
            position: WorldPoint::new(x, y),
            orientation: Quaternion::from_yaw(yaw),
            linear_velocity: speed,
        }
    }

    fn goal(x: f32, y: f32) -> StampedPoint {
        StampedPoint {
            frame_id: "odom".into(),
            stamp: 0.0,
            point: WorldPoint::new(x, y),
        }
    }

    #[test]
    fn test_idle_without_goal() {
        let mut node = NavNode::new(small_config());
        let mut outputs = RecordingOutputs::new();
        node.handle_position(&odom(0.0, 0.0, 0.0, 0.0, 0.0), &IdentityTransform, &mut outputs);
        assert_eq!(outputs.last_command(), Some(VelocityCommand::stop()));
    }

    #[test]
    fn test_drives_toward_goal_with_ramp() {
        let mut node = NavNode::new(small_config());
        let mut outputs = RecordingOutputs::new();
        node.handle_goal(goal(5.0, 0.0));
        assert!(node.is_active());

        node.handle_position(&odom(0.0, 0.0, 0.0, 0.0, 0.0), &IdentityTransform, &mut outputs);
        let cmd = outputs.last_command().unwrap();
        // First tick ramps from standstill at the acceleration limit
        assert!((cmd.linear - 0.3).abs() < 1e-5);
        assert_eq!(cmd.angular, 0.0);

        node.handle_position(&odom(0.1, 0.0, 0.0, 0.3, 0.1), &IdentityTransform, &mut outputs);
        let cmd = outputs.last_command().unwrap();
        assert!((cmd.linear - 0.6).abs() < 1e-5);
        // The selected arc is published
        assert!(!outputs.paths.is_empty());
    }

    #[test]
    fn test_arrival_clears_goal_and_reports() {
        let mut node = NavNode::new(small_config());
        let mut outputs = RecordingOutputs::new();
        node.handle_goal(goal(5.0, 0.0));

        node.handle_position(&odom(4.9, 0.0, 0.0, 0.5, 0.0), &IdentityTransform, &mut outputs);
        assert_eq!(outputs.goal_events, vec![true]);
        assert!(!node.is_active());
        let cmd = outputs.last_command().unwrap();
        assert_eq!(cmd.linear, 0.0);
        assert_eq!(cmd.angular, 0.0);
    }

    #[test]
    fn test_goal_transform_failure_drops_tick() {
        struct FailingTransform;
        impl TransformService for FailingTransform {
            fn transform_point(
                &self,
                target_frame: &str,
                point: &StampedPoint,
            ) -> Result<StampedPoint, TransformError> {
                Err(TransformError {
                    from: point.frame_id.clone(),
                    to: target_frame.to_string(),
                    reason: "unavailable".into(),
                })
            }
        }

        let mut node = NavNode::new(small_config());
        let mut outputs = RecordingOutputs::new();
        node.handle_goal(StampedPoint {
            frame_id: "utm".into(),
            stamp: 0.0,
            point: WorldPoint::new(5.0, 0.0),
        });

        node.handle_position(&odom(0.0, 0.0, 0.0, 0.0, 0.0), &FailingTransform, &mut outputs);
        // No command published; the goal stays for the next tick
        assert!(outputs.commands.is_empty());
        assert!(node.is_active());
    }

    #[test]
    fn test_scan_populates_grid_and_publishes_cones() {
        let mut node = NavNode::new(small_config());
        let mut outputs = RecordingOutputs::new();

        let scan = LaserScan {
            frame_id: "laser".into(),
            stamp: 0.0,
            angle_min: 0.0,
            angle_increment: 0.0,
            range_min: 0.02,
            ranges: vec![3.0],
        };
        node.handle_scan(&scan, &IdentityTransform, &mut outputs);

        // Hit lands 0.26m past the laser mount offset
        assert!(node.grid().get(3.26, 0.0) > 0);
        // Detector ran and published its (empty) cone set
        assert_eq!(outputs.cones.len(), 1);
        assert!(outputs.cones[0].1.is_empty());
    }

    #[test]
    fn test_reconfigure_swaps_parameters() {
        let mut node = NavNode::new(small_config());
        let mut updated = small_config();
        updated.planner.max_speed = 0.5;
        node.handle_reconfigure(updated);

        let mut outputs = RecordingOutputs::new();
        node.handle_goal(goal(5.0, 0.0));
        node.handle_position(&odom(0.0, 0.0, 0.0, 1.0, 0.0), &IdentityTransform, &mut outputs);
        let cmd = outputs.last_command().unwrap();
        assert!(cmd.linear <= 0.5 + 1e-6);
    }
}
