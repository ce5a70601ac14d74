//! Configuration loading for ShankuNav.
//!
//! Every numeric threshold is re-readable at runtime: a reconfigure
//! event hands the node a complete new `NavConfig`, which it swaps in
//! with a single assignment. Callback dispatch is serial, so the swap is
//! atomic with respect to every handler.

use crate::error::{NavError, Result};
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Clone, Debug, Default, Deserialize)]
pub struct NavConfig {
    #[serde(default)]
    pub mapper: MapperConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub planner: PlannerConfig,
}

/// Laser-to-grid mapping parameters
#[derive(Clone, Debug, Deserialize)]
pub struct MapperConfig {
    /// Grid resolution in meters per cell (default: 0.10)
    #[serde(default = "default_resolution")]
    pub resolution: f32,

    /// Global grid side length in cells (default: 5000)
    #[serde(default = "default_grid_size")]
    pub grid_size: usize,

    /// Local scratch grid side length in cells (default: 150)
    #[serde(default = "default_local_size")]
    pub local_size: usize,

    /// Laser mount offset forward of the base, meters (default: 0.26)
    #[serde(default = "default_laser_offset")]
    pub laser_offset: f32,

    /// Obstacle growth distance, meters (default: 0.4)
    #[serde(default = "default_inflation_distance")]
    pub inflation_distance: f32,
}

/// Cone detector parameters
#[derive(Clone, Debug, Deserialize)]
pub struct DetectorConfig {
    /// Frame cones are reported in (default: "odom")
    #[serde(default = "default_world_frame")]
    pub world_frame: String,

    /// Gap between consecutive points that splits a scan group, meters
    /// (default: 0.05)
    #[serde(default = "default_grouping_threshold")]
    pub grouping_threshold: f32,

    /// Groups with at most this many points are discarded (default: 4)
    #[serde(default = "default_min_circle_size")]
    pub min_circle_size: usize,

    /// Inscribed-angle spread limit, degrees (default: 15.0)
    #[serde(default = "default_std_dev_threshold")]
    pub std_dev_threshold: f32,

    /// Smallest acceptable fitted circle radius, meters (default: 0.10)
    #[serde(default = "default_min_cone_radius")]
    pub min_cone_radius: f32,

    /// Largest acceptable fitted circle radius, meters (default: 0.20)
    #[serde(default = "default_max_cone_radius")]
    pub max_cone_radius: f32,

    /// Detections closer than this replace the existing cone, meters
    /// (default: 0.25)
    #[serde(default = "default_same_cone_threshold")]
    pub same_cone_threshold: f32,

    /// How long an unseen cone is carried forward, seconds
    /// (default: 2.0)
    #[serde(default = "default_retention_window")]
    pub retention_window: f64,
}

/// Arc planner parameters
#[derive(Clone, Debug, Deserialize)]
pub struct PlannerConfig {
    /// Minimum turning radius, meters (default: 0.695)
    #[serde(default = "default_min_radius")]
    pub min_radius: f32,

    /// Maximum planned turning radius, meters (default: 4.0)
    #[serde(default = "default_max_radius")]
    pub max_radius: f32,

    /// Arrival distance at a goal, meters (default: 0.3)
    #[serde(default = "default_goal_err")]
    pub goal_err: f32,

    /// Distance from the goal at which cone homing starts, meters
    /// (default: 6.0)
    #[serde(default = "default_cone_dist")]
    pub cone_dist: f32,

    /// Maximum forward speed, m/s (default: 1.5)
    #[serde(default = "default_max_speed")]
    pub max_speed: f32,

    /// Minimum commanded forward speed, m/s (default: 0.1)
    #[serde(default = "default_min_speed")]
    pub min_speed: f32,

    /// Planning horizon along the arc, meters (default: 4.0)
    #[serde(default = "default_planner_lookahead")]
    pub planner_lookahead: f32,

    /// Speed increase limit per odometry tick, m/s (default: 0.3)
    #[serde(default = "default_max_accel")]
    pub max_accel: f32,

    /// Maximum time spent backing up, seconds (default: 10.0)
    #[serde(default = "default_backup_time")]
    pub backup_time: f64,

    /// Distance that ends a backup, meters (default: 1.0)
    #[serde(default = "default_backup_dist")]
    pub backup_dist: f32,

    /// Time without a valid forward arc before backing up, seconds
    /// (default: 2.0)
    #[serde(default = "default_stuck_timeout")]
    pub stuck_timeout: f64,

    /// Maximum age of the vision cone angle, seconds (default: 1.0)
    #[serde(default = "default_cone_timeout")]
    pub cone_timeout: f64,

    /// Forward speed while homing on a cone, m/s (default: 0.4)
    #[serde(default = "default_cone_speed")]
    pub cone_speed: f32,

    /// Whether to home on cones near goals (default: false)
    #[serde(default)]
    pub track_cones: bool,

    /// Total time allowed in cone mode, seconds (default: 60.0)
    #[serde(default = "default_cone_mode_timeout")]
    pub cone_mode_timeout: f64,

    /// Minimum interval between goal_reached events at the goal, seconds
    /// (default: 0.5)
    #[serde(default = "default_done_interval")]
    pub done_interval: f64,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            grid_size: default_grid_size(),
            local_size: default_local_size(),
            laser_offset: default_laser_offset(),
            inflation_distance: default_inflation_distance(),
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            world_frame: default_world_frame(),
            grouping_threshold: default_grouping_threshold(),
            min_circle_size: default_min_circle_size(),
            std_dev_threshold: default_std_dev_threshold(),
            min_cone_radius: default_min_cone_radius(),
            max_cone_radius: default_max_cone_radius(),
            same_cone_threshold: default_same_cone_threshold(),
            retention_window: default_retention_window(),
        }
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            min_radius: default_min_radius(),
            max_radius: default_max_radius(),
            goal_err: default_goal_err(),
            cone_dist: default_cone_dist(),
            max_speed: default_max_speed(),
            min_speed: default_min_speed(),
            planner_lookahead: default_planner_lookahead(),
            max_accel: default_max_accel(),
            backup_time: default_backup_time(),
            backup_dist: default_backup_dist(),
            stuck_timeout: default_stuck_timeout(),
            cone_timeout: default_cone_timeout(),
            cone_speed: default_cone_speed(),
            track_cones: false,
            cone_mode_timeout: default_cone_mode_timeout(),
            done_interval: default_done_interval(),
        }
    }
}

// Default value functions
fn default_resolution() -> f32 {
    0.10
}
fn default_grid_size() -> usize {
    5000
}
fn default_local_size() -> usize {
    150
}
fn default_laser_offset() -> f32 {
    0.26
}
fn default_inflation_distance() -> f32 {
    0.4
}

fn default_world_frame() -> String {
    "odom".to_string()
}
fn default_grouping_threshold() -> f32 {
    0.05
}
fn default_min_circle_size() -> usize {
    4
}
fn default_std_dev_threshold() -> f32 {
    15.0
}
fn default_min_cone_radius() -> f32 {
    0.10
}
fn default_max_cone_radius() -> f32 {
    0.20
}
fn default_same_cone_threshold() -> f32 {
    0.25
}
fn default_retention_window() -> f64 {
    2.0
}

fn default_min_radius() -> f32 {
    0.695
}
fn default_max_radius() -> f32 {
    4.0
}
fn default_goal_err() -> f32 {
    0.3
}
fn default_cone_dist() -> f32 {
    6.0
}
fn default_max_speed() -> f32 {
    1.5
}
fn default_min_speed() -> f32 {
    0.1
}
fn default_planner_lookahead() -> f32 {
    4.0
}
fn default_max_accel() -> f32 {
    0.3
}
fn default_backup_time() -> f64 {
    10.0
}
fn default_backup_dist() -> f32 {
    1.0
}
fn default_stuck_timeout() -> f64 {
    2.0
}
fn default_cone_timeout() -> f64 {
    1.0
}
fn default_cone_speed() -> f32 {
    0.4
}
fn default_cone_mode_timeout() -> f64 {
    60.0
}
fn default_done_interval() -> f64 {
    0.5
}

impl NavConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NavError::Config(format!("Failed to read config file: {}", e)))?;
        let config: NavConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

impl MapperConfig {
    /// Number of inflation rings for the local grid.
    pub fn inflation_rings(&self) -> i8 {
        (self.inflation_distance / self.resolution).ceil() as i8
    }
}
