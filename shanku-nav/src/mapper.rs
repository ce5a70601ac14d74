//! Laser ingest: ray-trace one scan into a local grid and merge it into
//! the global obstacle grid.
//!
//! The local grid is centered on the robot pose snapped to the global
//! cell lattice, so the merge is a pure per-cell translation. Free-space
//! evidence decrements obstacle confidence, hits (flattened to +2 after
//! inflation) increment it, and every merged value saturates in `[0, 4]`.

use crate::config::MapperConfig;
use crate::messages::LaserScan;
use maidan_map::{LocalGrid, ObstacleGrid, Pose2D, WorldPoint};

/// Robot footprint in the base frame, meters. Cleared after every merge
/// so the robot never maps itself.
const FOOTPRINT_X: (f32, f32) = (-0.16, 0.16);
const FOOTPRINT_Y: (f32, f32) = (-0.17, 0.45);

/// Decode a range reading.
///
/// Readings below `range_min` are SCIP 1.1 status codes, not distances:
/// an exact zero means nothing within range (trace clear out to 22 m),
/// and two narrow bands report the dazzle/no-object conditions with
/// known clear distances. Anything else below `range_min` is dropped.
fn decode_range(range: f32, range_min: f32) -> Option<f32> {
    if range >= range_min {
        Some(range)
    } else if range == 0.0 {
        Some(22.0)
    } else if range > 0.0055 && range < 0.0065 {
        Some(5.7)
    } else if range > 0.0155 && range < 0.0165 {
        Some(5.0)
    } else {
        None
    }
}

/// Integrate one laser scan into the obstacle grid.
pub fn integrate_scan(
    grid: &mut ObstacleGrid,
    scan: &LaserScan,
    pose: Pose2D,
    config: &MapperConfig,
) {
    let res = config.resolution;

    // Center the local grid on the pose snapped to the cell lattice and
    // keep the sub-cell remainder, so local cells line up exactly with
    // global cells at merge time.
    let snap_x = (pose.x / res).round() * res;
    let snap_y = (pose.y / res).round() * res;
    let ox = pose.x - snap_x + config.laser_offset * pose.theta.cos();
    let oy = pose.y - snap_y + config.laser_offset * pose.theta.sin();

    let mut local = LocalGrid::new(config.local_size, res);

    // Free space along each decodable beam
    for (i, &r) in scan.ranges.iter().enumerate() {
        if let Some(range) = decode_range(r, scan.range_min) {
            let theta = pose.theta + scan.beam_angle(i);
            local.trace_free(ox, oy, theta, range);
        }
    }

    // Endpoint hits for beams that measured an actual return
    for (i, &r) in scan.ranges.iter().enumerate() {
        if r >= scan.range_min {
            let theta = pose.theta + scan.beam_angle(i);
            local.mark_hit(ox + r * theta.cos(), oy + r * theta.sin());
        }
    }

    local.inflate(config.inflation_rings());

    // Merge into the global grid
    let half = (config.local_size / 2) as i32;
    for i in 0..config.local_size {
        for j in 0..config.local_size {
            let v = local.get(i, j);
            if v == 0 {
                continue;
            }
            let x = (i as i32 - half) as f32 * res + snap_x;
            let y = (j as i32 - half) as f32 * res + snap_y;
            // Flatten the inflation rings: any positive local value is
            // the same obstacle evidence
            let evidence: i32 = if v > 0 { 2 } else { i32::from(v) };
            let merged = (i32::from(grid.get(x, y)) + evidence).clamp(0, 4);
            grid.set(x, y, merged as i8);
        }
    }

    // Clear the robot's own footprint
    let step = res * 0.5;
    let mut bx = FOOTPRINT_X.0;
    while bx <= FOOTPRINT_X.1 {
        let mut by = FOOTPRINT_Y.0;
        while by < FOOTPRINT_Y.1 {
            let p = pose.transform_point(WorldPoint::new(bx, by));
            grid.set(p.x, p.y, 0);
            by += step;
        }
        bx += step;
    }
}
