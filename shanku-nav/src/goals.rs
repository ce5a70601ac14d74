//! GPS goal sequencer.
//!
//! Holds an ordered list of (latitude, longitude) goals. Each GPS fix,
//! paired with the most recent odometry position, projects the active
//! goal into the odom frame: the haversine formula gives the distance,
//! the initial-bearing formula gives the direction, and the goal is
//! placed that far from the current odom position. A `goal_reached`
//! event advances to the next goal; the list optionally loops.

use crate::messages::{OdomSample, StampedPoint};
use maidan_map::WorldPoint;

/// Earth radius, meters.
const EARTH_RADIUS: f64 = 6_371_000.0;

/// One GPS goal in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GpsGoal {
    pub latitude: f64,
    pub longitude: f64,
}

/// Sequencer over a list of GPS goals.
pub struct GoalList {
    goals: Vec<GpsGoal>,
    current: usize,
    active: bool,
    loop_goals: bool,
    last_position: WorldPoint,
    position_frame: String,
}

impl GoalList {
    /// Create a sequencer; it is active when the list is non-empty.
    pub fn new(goals: Vec<GpsGoal>, loop_goals: bool) -> Self {
        let active = !goals.is_empty();
        Self {
            goals,
            current: 0,
            active,
            loop_goals,
            last_position: WorldPoint::ZERO,
            position_frame: "odom".to_string(),
        }
    }

    /// Whether a goal is being pursued.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Index of the goal being pursued.
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Track the odom-frame position corresponding to incoming GPS
    /// fixes.
    pub fn handle_odometry(&mut self, odom: &OdomSample) {
        self.last_position = odom.position;
        self.position_frame = odom.frame_id.clone();
    }

    /// The goal was finished (reached, touched, or timed out); move on.
    pub fn handle_goal_reached(&mut self) {
        tracing::info!("Goal {} finished", self.current);
        self.current += 1;
        if self.current >= self.goals.len() {
            if self.loop_goals {
                tracing::info!("Last goal; looping around");
                self.current = 0;
            } else {
                tracing::info!("Last goal; deactivating");
                self.active = false;
            }
        }
    }

    /// Append a goal; reactivates the sequencer.
    pub fn append(&mut self, goal: GpsGoal) {
        self.goals.push(goal);
        self.active = true;
    }

    /// Remove a goal by index, keeping the current selection stable.
    pub fn remove(&mut self, index: usize) {
        if index >= self.goals.len() {
            return;
        }
        self.goals.remove(index);
        if self.current > index {
            self.current -= 1;
        }
        if self.goals.is_empty() {
            tracing::info!("No goals; deactivating");
            self.active = false;
        }
    }

    /// Project the active goal into the odom frame using this GPS fix.
    pub fn handle_gps(&mut self, stamp: f64, fix: GpsGoal) -> Option<StampedPoint> {
        if !self.active {
            return None;
        }
        let goal = self.goals.get(self.current).copied()?;

        let lat1 = fix.latitude.to_radians();
        let lon1 = fix.longitude.to_radians();
        let lat2 = goal.latitude.to_radians();
        let lon2 = goal.longitude.to_radians();
        let dlat = lat2 - lat1;
        let dlon = lon2 - lon1;

        // Haversine distance
        let a = (dlat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let distance = EARTH_RADIUS * 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        // Initial bearing, radians east of north; the odom frame wants
        // radians north of east
        let bearing = (dlon.sin() * lat2.cos())
            .atan2(lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos());
        let heading = std::f64::consts::FRAC_PI_2 - bearing;

        tracing::debug!(
            "Goal {}: distance {:.1}m, heading {:.2}",
            self.current,
            distance,
            heading
        );

        Some(StampedPoint {
            frame_id: self.position_frame.clone(),
            stamp,
            point: WorldPoint::new(
                self.last_position.x + (distance * heading.cos()) as f32,
                self.last_position.y + (distance * heading.sin()) as f32,
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::Quaternion;

    const BASE: GpsGoal = GpsGoal {
        latitude: 43.0,
        longitude: -89.0,
    };

    /// A goal offset from BASE by meters of north and east.
    fn offset_goal(north: f64, east: f64) -> GpsGoal {
        let dlat = (north / EARTH_RADIUS).to_degrees();
        let dlon = (east / (EARTH_RADIUS * BASE.latitude.to_radians().cos())).to_degrees();
        GpsGoal {
            latitude: BASE.latitude + dlat,
            longitude: BASE.longitude + dlon,
        }
    }

    fn odom_at(x: f32, y: f32) -> OdomSample {
        OdomSample {
            frame_id: "odom".into(),
            stamp: 0.0,
            position: WorldPoint::new(x, y),
            orientation: Quaternion::identity(),
            linear_velocity: 0.0,
        }
    }

    #[test]
    fn test_projects_goal_east() {
        let mut list = GoalList::new(vec![offset_goal(0.0, 100.0)], false);
        list.handle_odometry(&odom_at(2.0, 3.0));

        let goal = list.handle_gps(1.0, BASE).unwrap();
        assert!((goal.point.x - 102.0).abs() < 0.5, "x = {}", goal.point.x);
        assert!((goal.point.y - 3.0).abs() < 0.5, "y = {}", goal.point.y);
        assert_eq!(goal.frame_id, "odom");
    }

    #[test]
    fn test_projects_goal_north() {
        let mut list = GoalList::new(vec![offset_goal(50.0, 0.0)], false);
        list.handle_odometry(&odom_at(0.0, 0.0));

        let goal = list.handle_gps(1.0, BASE).unwrap();
        assert!(goal.point.x.abs() < 0.5);
        assert!((goal.point.y - 50.0).abs() < 0.5);
    }

    #[test]
    fn test_advances_and_deactivates() {
        let mut list = GoalList::new(vec![offset_goal(10.0, 0.0), offset_goal(20.0, 0.0)], false);
        assert!(list.is_active());
        list.handle_goal_reached();
        assert_eq!(list.current_index(), 1);
        assert!(list.is_active());
        list.handle_goal_reached();
        assert!(!list.is_active());
        assert_eq!(list.handle_gps(0.0, BASE), None);
    }

    #[test]
    fn test_loops_when_configured() {
        let mut list = GoalList::new(vec![offset_goal(10.0, 0.0), offset_goal(20.0, 0.0)], true);
        list.handle_goal_reached();
        list.handle_goal_reached();
        assert!(list.is_active());
        assert_eq!(list.current_index(), 0);
    }

    #[test]
    fn test_remove_keeps_selection() {
        let mut list = GoalList::new(
            vec![
                offset_goal(10.0, 0.0),
                offset_goal(20.0, 0.0),
                offset_goal(30.0, 0.0),
            ],
            false,
        );
        list.handle_goal_reached();
        assert_eq!(list.current_index(), 1);
        // Removing an earlier goal shifts the index down with the list
        list.remove(0);
        assert_eq!(list.current_index(), 0);
        assert!(list.is_active());
    }

    #[test]
    fn test_empty_list_inactive() {
        let mut list = GoalList::new(vec![], false);
        assert!(!list.is_active());
        assert_eq!(list.handle_gps(0.0, BASE), None);
        list.append(offset_goal(5.0, 5.0));
        assert!(list.is_active());
    }
}
