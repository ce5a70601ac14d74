//! Cone detection from planar laser scans.
//!
//! Based on the arc-extraction approach of Xavier, Pacheco, Castro,
//! Ruano and Nunes: split the scan into groups of adjacent returns, then
//! test each group for circular-arc geometry using the inscribed-angle
//! theorem. Points on a circle subtend the same angle over a fixed
//! chord, so a group whose inscribed angles agree tightly is an arc, and
//! the chord plus the mean inscribed angle fix the circle's center and
//! radius.
//!
//! Accepted circles of cone-compatible radius are fused with recent
//! detections by proximity and carried for a short retention window, so
//! the reported cone set stays stable across scans even when individual
//! scans miss.

use crate::bus::{TransformError, TransformService};
use crate::config::DetectorConfig;
use crate::messages::{LaserScan, StampedPoint};
use maidan_map::WorldPoint;
use std::f32::consts::FRAC_PI_2;

/// One tracked cone.
#[derive(Clone, Debug)]
struct ConeTrack {
    /// Time of the detection that produced or refreshed this track.
    last_seen: f64,
    /// Cone center in the world frame.
    point: WorldPoint,
}

/// Detects traffic cones in laser scans and tracks them over time.
#[derive(Debug, Default)]
pub struct ConeDetector {
    tracks: Vec<ConeTrack>,
}

impl ConeDetector {
    pub fn new() -> Self {
        Self { tracks: Vec::new() }
    }

    /// Currently tracked cone positions.
    pub fn cones(&self) -> Vec<WorldPoint> {
        self.tracks.iter().map(|t| t.point).collect()
    }

    /// Process one scan and return the surviving cone set.
    ///
    /// A transform failure drops the whole scan: the error is returned
    /// before any track is touched.
    pub fn process_scan(
        &mut self,
        scan: &LaserScan,
        tf: &dyn TransformService,
        config: &DetectorConfig,
    ) -> Result<Vec<WorldPoint>, TransformError> {
        let groups = segment_scan(scan, tf, config)?;

        let mut detections = Vec::new();
        for group in &groups {
            if group.len() <= config.min_circle_size {
                continue;
            }
            if let Some(center) = fit_cone(group, config) {
                detections.push(center);
            }
        }

        for center in detections {
            self.associate(center, scan.stamp, config);
        }
        self.tracks
            .retain(|t| scan.stamp - t.last_seen <= config.retention_window);

        Ok(self.cones())
    }

    /// Fuse one detection into the track set: the nearest existing track
    /// within the association threshold is replaced, and the detection
    /// is always stored with the scan time.
    fn associate(&mut self, center: WorldPoint, stamp: f64, config: &DetectorConfig) {
        let nearest = self
            .tracks
            .iter()
            .enumerate()
            .map(|(i, t)| (i, t.point.distance(&center)))
            .min_by(|a, b| a.1.total_cmp(&b.1));

        if let Some((index, distance)) = nearest {
            if distance < config.same_cone_threshold {
                self.tracks.remove(index);
            }
        }
        tracing::debug!("cone at ({:.2}, {:.2})", center.x, center.y);
        self.tracks.push(ConeTrack {
            last_seen: stamp,
            point: center,
        });
    }
}

/// Split a scan into groups of world-frame points.
///
/// A new group starts whenever consecutive valid returns land more than
/// the grouping threshold apart in the world frame. Returns below
/// `range_min` are skipped without breaking the group.
fn segment_scan(
    scan: &LaserScan,
    tf: &dyn TransformService,
    config: &DetectorConfig,
) -> Result<Vec<Vec<WorldPoint>>, TransformError> {
    let mut groups = Vec::new();
    let mut current = Vec::new();
    let mut prev: Option<WorldPoint> = None;

    for (i, &range) in scan.ranges.iter().enumerate() {
        if range < scan.range_min {
            continue;
        }
        let angle = scan.beam_angle(i);
        let stamped = StampedPoint {
            frame_id: scan.frame_id.clone(),
            stamp: scan.stamp,
            point: WorldPoint::new(range * angle.cos(), range * angle.sin()),
        };
        let world = tf.transform_point(&config.world_frame, &stamped)?.point;

        if let Some(p) = prev {
            if p.distance(&world) > config.grouping_threshold {
                groups.push(std::mem::take(&mut current));
            }
        }
        current.push(world);
        prev = Some(world);
    }
    if !current.is_empty() {
        groups.push(current);
    }
    Ok(groups)
}

/// Test a group for cone geometry and fit the circle center.
///
/// Returns the center when every gate passes, None otherwise.
fn fit_cone(group: &[WorldPoint], config: &DetectorConfig) -> Option<WorldPoint> {
    let n = group.len();
    let first = group[0];
    let last = group[n - 1];
    let chord = first.distance(&last);

    // Inscribed angle over the end chord at each interior point; equal
    // for all of them when the group lies on a circle (Thales)
    let angles: Vec<f32> = group[1..n - 1]
        .iter()
        .map(|p| {
            (first.y - p.y).atan2(first.x - p.x) - (last.y - p.y).atan2(last.x - p.x)
        })
        .collect();
    let mean = angles.iter().sum::<f32>() / angles.len() as f32;

    // The midpoint's bulge off the chord must be arc-like: between 10%
    // and 70% of the chord length
    let mid = group[n / 2];
    let theta = (last.x - first.x).atan2(last.y - first.y);
    let bulge = -((mid.x - first.x) * theta.cos() - (mid.y - first.y) * theta.sin());
    if bulge < 0.1 * chord || bulge > 0.7 * chord {
        return None;
    }

    // Roundness: the inscribed angles must agree tightly
    let variance = angles.iter().map(|a| (a - mean).powi(2)).sum::<f32>() / angles.len() as f32;
    let spread_deg = variance.sqrt().to_degrees();
    if spread_deg >= config.std_dev_threshold {
        return None;
    }

    // The chord and the mean inscribed angle fix the circle: the center
    // sits half a chord along it and (d/2)tan(mean - pi/2) off it
    let half = chord * 0.5;
    let offset = WorldPoint::new(half, half * (mean - FRAC_PI_2).tan());
    let radius = offset.x.hypot(offset.y);
    if radius <= config.min_cone_radius || radius >= config.max_cone_radius {
        return None;
    }

    let chord_dir = (last.y - first.y).atan2(last.x - first.x);
    let rotated = offset.rotate(chord_dir);
    Some(WorldPoint::new(first.x + rotated.x, first.y + rotated.y))
}
