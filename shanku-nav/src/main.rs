//! ShankuNav - navigation node for the Shanku outdoor rover.
//!
//! Runs the full perception-and-planning pipeline against the built-in
//! simulation world: a short goal list, an obstacle to steer around, and
//! a traffic cone at the final goal. The same node drives on the robot
//! when wired to the real bus adapters.

use shanku_nav::goals::{GoalList, GpsGoal};
use shanku_nav::harness::{Circle, SimWorld, Simulation};
use shanku_nav::messages::{OdomSample, Quaternion};
use shanku_nav::{NavConfig, Result};

use std::path::Path;
use tracing::info;

/// Earth radius, meters.
const EARTH_RADIUS: f64 = 6_371_000.0;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("shanku_nav=info".parse().unwrap()),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();

    let config = if args.len() > 1 && !args[1].starts_with("--") {
        let config_path = Path::new(&args[1]);
        info!("Loading configuration from {:?}", config_path);
        NavConfig::load(config_path)?
    } else if Path::new("shanku.toml").exists() {
        info!("Loading configuration from shanku.toml");
        NavConfig::load(Path::new("shanku.toml"))?
    } else {
        info!("Using default configuration");
        NavConfig::default()
    };

    info!("ShankuNav v{}", env!("CARGO_PKG_VERSION"));

    // Demo world: an obstacle to steer around and a cone at the final
    // goal
    let world = SimWorld {
        obstacles: vec![Circle::new(4.0, 0.3, 0.4)],
        walls: Vec::new(),
        cone: Some(Circle::new(9.0, 1.0, 0.15)),
    };

    // GPS goal list: a waypoint, then the cone. The robot starts at the
    // base coordinate, which maps to the odom origin.
    let base = GpsGoal {
        latitude: 43.0731,
        longitude: -89.4012,
    };
    let goal_list = vec![offset_goal(base, 0.0, 6.0), offset_goal(base, 1.0, 9.0)];
    info!("Starting mission: {} goals", goal_list.len());
    let mut goals = GoalList::new(goal_list, false);

    let mut sim = Simulation::new(world, config.clone());
    let mut handled_events = 0;
    let mut cone_leg = false;

    while goals.is_active() && sim.time() < 300.0 {
        // The final leg ends on the cone; switch cone tracking on for it
        // through the runtime reconfigure path
        if goals.current_index() == 1 && !cone_leg {
            let mut updated = config.clone();
            updated.planner.track_cones = true;
            sim.node.handle_reconfigure(updated);
            cone_leg = true;
        }

        // The sequencer pairs each GPS fix with the odometry position it
        // was taken at; the sim derives the fix from ground truth
        goals.handle_odometry(&OdomSample {
            frame_id: "odom".into(),
            stamp: sim.time(),
            position: sim.pose.position(),
            orientation: Quaternion::from_yaw(sim.pose.theta),
            linear_velocity: 0.0,
        });
        let fix = offset_goal(base, sim.pose.y as f64, sim.pose.x as f64);
        if let Some(goal) = goals.handle_gps(sim.time(), fix) {
            sim.set_goal(goal.point.x, goal.point.y);
        }

        sim.run(300.0 - sim.time());

        // Feed goal outcomes back to the sequencer
        while handled_events < sim.outputs.goal_events.len() {
            goals.handle_goal_reached();
            handled_events += 1;
        }
    }

    let cones_seen = sim
        .outputs
        .cones
        .iter()
        .map(|(_, c)| c.len())
        .max()
        .unwrap_or(0);
    info!(
        "Mission over at t={:.1}s: pose ({:.2}, {:.2}), {} goal events, {} cones tracked",
        sim.time(),
        sim.pose.x,
        sim.pose.y,
        sim.outputs.goal_events.len(),
        cones_seen,
    );
    Ok(())
}

/// A goal offset north/east of a base coordinate, meters.
fn offset_goal(base: GpsGoal, north: f64, east: f64) -> GpsGoal {
    GpsGoal {
        latitude: base.latitude + (north / EARTH_RADIUS).to_degrees(),
        longitude: base.longitude
            + (east / (EARTH_RADIUS * base.latitude.to_radians().cos())).to_degrees(),
    }
}
