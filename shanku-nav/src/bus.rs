//! Seams to the message bus: frame transforms in, publications out.
//!
//! The bus runtime itself lives outside this crate. The node sees it
//! through two traits: [`TransformService`] for point transforms between
//! frames, and [`NavOutputs`] for everything the node publishes.

use crate::messages::{StampedPoint, VelocityCommand};
use maidan_map::WorldPoint;
use thiserror::Error;

/// A frame transform could not be produced.
///
/// Implementations may wait a bounded time for the transform to become
/// available; when it does not, the node logs the error and drops the
/// triggering message without mutating state.
#[derive(Error, Debug)]
#[error("cannot transform from {from} to {to}: {reason}")]
pub struct TransformError {
    /// Source frame of the point.
    pub from: String,
    /// Requested target frame.
    pub to: String,
    /// Implementation-specific detail.
    pub reason: String,
}

/// Synchronous point transform between coordinate frames.
pub trait TransformService {
    /// Express a stamped point in `target_frame`.
    fn transform_point(
        &self,
        target_frame: &str,
        point: &StampedPoint,
    ) -> Result<StampedPoint, TransformError>;
}

/// Transform that only relabels the frame. Suitable when every producer
/// already publishes in the world frame.
pub struct IdentityTransform;

impl TransformService for IdentityTransform {
    fn transform_point(
        &self,
        target_frame: &str,
        point: &StampedPoint,
    ) -> Result<StampedPoint, TransformError> {
        Ok(StampedPoint {
            frame_id: target_frame.to_string(),
            stamp: point.stamp,
            point: point.point,
        })
    }
}

/// Everything the node publishes.
pub trait NavOutputs {
    /// Velocity command for the base controller.
    fn publish_command(&mut self, command: VelocityCommand);

    /// World-frame cone positions surviving the current scan.
    fn publish_cones(&mut self, stamp: f64, cones: &[WorldPoint]);

    /// Sampled points of the currently selected arc.
    fn publish_path(&mut self, frame_id: &str, points: &[WorldPoint]);

    /// Goal outcome: true on arrival or cone contact, false when cone
    /// search times out.
    fn publish_goal_reached(&mut self, reached: bool);
}

/// Output sink that records everything, for tests and the harness.
#[derive(Debug, Default)]
pub struct RecordingOutputs {
    pub commands: Vec<VelocityCommand>,
    pub cones: Vec<(f64, Vec<WorldPoint>)>,
    pub paths: Vec<Vec<WorldPoint>>,
    pub goal_events: Vec<bool>,
}

impl RecordingOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent velocity command, if any.
    pub fn last_command(&self) -> Option<VelocityCommand> {
        self.commands.last().copied()
    }
}

impl NavOutputs for RecordingOutputs {
    fn publish_command(&mut self, command: VelocityCommand) {
        self.commands.push(command);
    }

    fn publish_cones(&mut self, stamp: f64, cones: &[WorldPoint]) {
        self.cones.push((stamp, cones.to_vec()));
    }

    fn publish_path(&mut self, _frame_id: &str, points: &[WorldPoint]) {
        self.paths.push(points.to_vec());
    }

    fn publish_goal_reached(&mut self, reached: bool) {
        self.goal_events.push(reached);
    }
}

/// Output sink that logs publications, for running without a bus.
#[derive(Debug, Default)]
pub struct LogOutputs;

impl NavOutputs for LogOutputs {
    fn publish_command(&mut self, command: VelocityCommand) {
        tracing::debug!(
            "cmd_vel: linear={:.3} angular={:.3}",
            command.linear,
            command.angular
        );
    }

    fn publish_cones(&mut self, stamp: f64, cones: &[WorldPoint]) {
        tracing::debug!("cone_markers at {:.2}: {} cones", stamp, cones.len());
    }

    fn publish_path(&mut self, frame_id: &str, points: &[WorldPoint]) {
        tracing::trace!("path in {}: {} poses", frame_id, points.len());
    }

    fn publish_goal_reached(&mut self, reached: bool) {
        tracing::info!("goal_reached: {}", reached);
    }
}
