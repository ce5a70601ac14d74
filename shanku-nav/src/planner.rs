//! Arc planner state machine.
//!
//! Runs on every odometry tick. Normal driving picks the tangent arc
//! through the goal; when that is blocked it samples a fixed fan of
//! arcs and keeps the one ending closest to the goal. Going too long
//! without any valid forward arc triggers a timed backup, and close to
//! the goal (with cone tracking enabled) the planner hands control to
//! the vision cone angle until the bump switch confirms contact.
//!
//! Commands are a forward speed plus a signed turning radius (positive =
//! left); the node converts radius to a yaw rate on publication.

use crate::config::PlannerConfig;
use maidan_map::{Arc, ObstacleGrid, Pose2D, WorldPoint};
use std::f32::consts::{FRAC_PI_2, PI};

/// Planner operating mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Driving toward the goal along planned arcs.
    Forward,
    /// Reversing away from a stuck position or a touched cone.
    Backing,
    /// Homing on a cone using the vision angle.
    Cone,
}

/// Drive command: forward speed and signed turning radius.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Drive {
    /// Forward speed, m/s.
    pub speed: f32,
    /// Signed turning radius, meters; positive turns left, zero drives
    /// straight.
    pub radius: f32,
}

impl Drive {
    fn stop() -> Self {
        Self {
            speed: 0.0,
            radius: 0.0,
        }
    }
}

/// Outcome of one planning step.
#[derive(Clone, Debug)]
pub struct PlanStep {
    /// Command before acceleration limiting.
    pub drive: Drive,
    /// The arc selected this tick, for path publication.
    pub path: Option<(Pose2D, Arc)>,
    /// Goal outcome to publish, when one fired this tick.
    pub done: Option<bool>,
    /// The active goal has been consumed (arrival, cone contact, or
    /// search timeout).
    pub clear_goal: bool,
}

impl PlanStep {
    fn stopped() -> Self {
        Self {
            drive: Drive::stop(),
            path: None,
            done: None,
            clear_goal: false,
        }
    }
}

/// Arc planner with the forward / backing / cone-homing state machine.
pub struct ArcPlanner {
    mode: Mode,
    /// In FORWARD, when the planner first found no valid arc; in BACKING
    /// and CONE, the mode entry time. None once a valid arc is found.
    timer: Option<f64>,
    backup_anchor: Pose2D,
    backup_radius: f32,
    /// Where cone homing started.
    pattern_center: Pose2D,
    last_done: f64,
    cone_angle: f32,
    cone_angle_stamp: f64,
    bump: bool,
}

impl Default for ArcPlanner {
    fn default() -> Self {
        Self::new()
    }
}

impl ArcPlanner {
    pub fn new() -> Self {
        Self {
            mode: Mode::Forward,
            timer: None,
            backup_anchor: Pose2D::default(),
            backup_radius: 0.0,
            pattern_center: Pose2D::default(),
            last_done: f64::NEG_INFINITY,
            cone_angle: 0.0,
            cone_angle_stamp: f64::NEG_INFINITY,
            bump: false,
        }
    }

    /// Current operating mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Latest bump switch state.
    pub fn set_bump(&mut self, pressed: bool) {
        self.bump = pressed;
    }

    /// Latest vision cone angle with its arrival time; staleness beyond
    /// the cone timeout means no cone in view.
    pub fn set_cone_angle(&mut self, angle: f32, stamp: f64) {
        self.cone_angle = angle;
        self.cone_angle_stamp = stamp;
    }

    /// Plan one step toward the goal.
    pub fn plan(
        &mut self,
        here: Pose2D,
        goal: WorldPoint,
        now: f64,
        grid: &ObstacleGrid,
        config: &PlannerConfig,
    ) -> PlanStep {
        let goal_dist = here.distance_to(&goal);

        if config.track_cones && self.mode == Mode::Forward && goal_dist < config.cone_dist {
            self.mode = Mode::Cone;
            self.pattern_center = here;
            self.timer = Some(now);
            tracing::info!("Starting cone search {:.1}m from goal", goal_dist);
        }

        match self.mode {
            Mode::Backing => self.plan_backing(here, now, config),
            Mode::Cone => self.plan_cone(here, now, config),
            Mode::Forward => self.plan_forward(here, goal, goal_dist, now, grid, config),
        }
    }

    fn plan_backing(&mut self, here: Pose2D, now: f64, config: &PlannerConfig) -> PlanStep {
        let drive = Drive {
            speed: -2.0 * config.min_speed,
            radius: self.backup_radius,
        };

        let elapsed = now - self.timer.unwrap_or(now);
        let moved = here.distance_to(&self.backup_anchor.position());
        if elapsed > config.backup_time || moved > config.backup_dist {
            tracing::info!("Backup done after {:.1}s, {:.2}m", elapsed, moved);
            self.mode = Mode::Forward;
            self.timer = None;
        }

        PlanStep {
            drive,
            path: None,
            done: None,
            clear_goal: false,
        }
    }

    fn plan_cone(&mut self, here: Pose2D, now: f64, config: &PlannerConfig) -> PlanStep {
        let speed = config.cone_speed;
        let radius = if now - self.cone_angle_stamp < config.cone_timeout {
            // Steer at the cone; the sign of the vision angle picks the
            // turn direction
            speed / (self.cone_angle * 1.4)
        } else {
            // Nothing in view: circle the area where homing started
            tracing::debug!(
                "No cone in view; circling near ({:.1}, {:.1})",
                self.pattern_center.x,
                self.pattern_center.y
            );
            2.0
        };
        let mut drive = Drive { speed, radius };
        let mut done = None;
        let mut clear_goal = false;

        if self.bump {
            tracing::info!("Cone contact");
            self.timer = Some(now);
            self.backup_anchor = here;
            self.mode = Mode::Backing;
            drive = Drive::stop();
            done = Some(true);
            clear_goal = true;
        }
        if let Some(entered) = self.timer {
            if now - entered > config.cone_mode_timeout {
                tracing::warn!("Cone search timed out");
                self.mode = Mode::Forward;
                drive = Drive::stop();
                done = Some(false);
                clear_goal = true;
            }
        }

        PlanStep {
            drive,
            path: None,
            done,
            clear_goal,
        }
    }

    fn plan_forward(
        &mut self,
        here: Pose2D,
        goal: WorldPoint,
        goal_dist: f32,
        now: f64,
        grid: &ObstacleGrid,
        config: &PlannerConfig,
    ) -> PlanStep {
        if goal_dist < config.goal_err {
            let mut done = None;
            if now - self.last_done > config.done_interval {
                tracing::info!("Goal reached");
                self.last_done = now;
                done = Some(true);
            }
            return PlanStep {
                drive: Drive::stop(),
                path: None,
                done,
                clear_goal: true,
            };
        }

        let bearing = here.position().angle_to(&goal);
        let traverse_dist = goal_dist.min(config.planner_lookahead);

        // Tangent arc through the goal: sweep angle is twice the bearing
        // error, radius follows from the chord
        let mut alpha = 2.0 * (bearing - here.theta);
        while alpha > 2.0 * PI {
            alpha -= 4.0 * PI;
        }
        while alpha < -2.0 * PI {
            alpha += 4.0 * PI;
        }
        let sweep = alpha;
        // Fold into [-pi, pi], reflecting through the half turn
        if alpha > PI {
            alpha = 2.0 * PI - alpha;
        }
        if alpha < -PI {
            alpha = -2.0 * PI - alpha;
        }

        let mut radius;
        let mut arc_len;
        if sweep == 0.0 {
            // Goal dead ahead: the tangent arc degenerates to a line
            radius = 0.0;
            arc_len = goal_dist;
        } else {
            let beta = (PI - alpha.abs()) / 2.0;
            radius = goal_dist * beta.sin() / alpha.sin();
            if sweep.abs() > PI {
                // Turning around: take the tightest turn we can
                radius = if radius > 0.0 {
                    config.min_radius
                } else {
                    -config.min_radius
                };
            }
            arc_len = sweep * radius;
            if radius.abs() < config.min_radius {
                // Too tight to turn: go straight and loop around later
                tracing::debug!("Tangent radius {:.2} below minimum; driving straight", radius);
                radius = 0.0;
                arc_len = config.min_radius;
            }
        }
        radius = radius.min(config.max_radius).max(-config.max_radius);
        arc_len = arc_len.min(config.planner_lookahead);

        let tangent = Arc::new(radius, arc_len);
        if grid.arc_is_clear(here, tangent) {
            let speed = (config.max_speed * 2.0 * arc_len / config.planner_lookahead)
                .clamp(config.min_speed, config.max_speed);
            self.timer = None;
            return PlanStep {
                drive: Drive { speed, radius },
                path: Some((here, tangent)),
                done: None,
                clear_goal: false,
            };
        }
        tracing::warn!("Tangent arc blocked");

        // Fall back to a fixed fan of arcs, at most a quarter turn each
        let mut candidates: Vec<f32> = Vec::new();
        if grid.arc_is_clear(here, Arc::straight(traverse_dist)) {
            candidates.push(0.0);
        }
        let mut k = 1;
        while k < 9 {
            let r = config.min_radius * k as f32;
            let l = traverse_dist.min(r * FRAC_PI_2);
            if grid.arc_is_clear(here, Arc::new(r, l)) {
                candidates.push(r);
            }
            if grid.arc_is_clear(here, Arc::new(-r, l)) {
                candidates.push(-r);
            }
            k *= 2;
        }

        if candidates.is_empty() {
            tracing::warn!("No valid forward arc");
            match self.timer {
                Some(started) if now - started > config.stuck_timeout => {
                    self.mode = Mode::Backing;
                    self.backup_radius = if alpha > 0.0 {
                        -config.min_radius
                    } else {
                        config.min_radius
                    };
                    self.backup_anchor = here;
                    self.timer = Some(now);
                    tracing::warn!("Stuck; backing up");
                }
                Some(_) => {}
                None => self.timer = Some(now),
            }
            return PlanStep::stopped();
        }

        // Keep the candidate whose endpoint lands closest to the goal
        let mut best = candidates[0];
        let mut best_dist = f32::INFINITY;
        for &r in &candidates {
            let l = if r == 0.0 {
                traverse_dist
            } else {
                traverse_dist.min(r.abs() * FRAC_PI_2)
            };
            let end = Arc::new(r, l).end_pose(here);
            let end_dist = end.distance_to(&goal);
            if end_dist < best_dist {
                best = r;
                best_dist = end_dist;
            }
        }

        let arc_len = if best == 0.0 {
            traverse_dist
        } else {
            (best * FRAC_PI_2).abs()
        };
        let speed = (config.max_speed * 2.0 * arc_len / config.planner_lookahead)
            .clamp(config.min_speed, config.max_speed);
        self.timer = None;

        PlanStep {
            drive: Drive {
                speed,
                radius: best,
            },
            path: Some((here, Arc::new(best, traverse_dist.min(arc_len)))),
            done: None,
            clear_goal: false,
        }
    }
}

/// Limit speed changes to `max_accel` per tick, against the measured
/// speed. Deceleration toward zero is unbounded.
pub fn limit_acceleration(desired: f32, measured: f32, max_accel: f32) -> f32 {
    if desired > 0.0 {
        if measured > 0.0 {
            desired.min(measured + max_accel)
        } else {
            max_accel
        }
    } else if desired < 0.0 {
        if measured < 0.0 {
            desired.max(measured - max_accel)
        } else {
            -max_accel
        }
    } else {
        0.0
    }
}
