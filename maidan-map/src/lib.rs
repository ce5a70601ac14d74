//! # MaidanMap
//!
//! World model for an outdoor wheeled rover: a fixed-extent obstacle grid
//! updated from planar laser scans, a transient per-scan local grid with
//! ring inflation, and signed-radius arc geometry for steering.
//!
//! ## Overview
//!
//! The grid covers a fixed square window centered at the world origin.
//! Cells hold a small saturating obstacle confidence in `[0, 4]`; zero
//! means free or unknown. Laser evidence is accumulated into a scratch
//! [`LocalGrid`] per scan, inflated by the robot radius, and merged into
//! the long-lived [`ObstacleGrid`].
//!
//! Steering is expressed as arcs of signed radius (positive = left turn,
//! zero = straight). [`Arc::sample`] yields the exact point sequence used
//! both for collision testing and for path publication, so the two can
//! never disagree.
//!
//! ## Coordinate System
//!
//! ROS REP-103 convention:
//! - X: Forward (positive ahead of robot)
//! - Y: Left (positive to robot's left)
//! - Theta: Rotation in radians, CCW positive from +X axis

// Core value types
pub mod core;

// Arc parameterization and sampling
pub mod arc;

// Obstacle grid storage and the per-scan local grid
pub mod grid;

pub use arc::{Arc, ArcSampler};
pub use core::{normalize_angle, GridCoord, Pose2D, WorldPoint};
pub use grid::{LocalGrid, ObstacleGrid};
