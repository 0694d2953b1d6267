use planar::Polygon;
use store::{Velocity, Viewport};

use crate::guard;

/// Drive gesture state. A nonzero velocity while `Idle` enters `Moving`;
/// zero velocity or a fully blocked tick returns to `Idle`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum DriveState {
    Idle,
    Moving { last_update_ms: f64 },
}

/// Result of one integration step.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Nothing to integrate (idle, or zero elapsed time).
    NoChange,
    /// Committed displacement; the caller writes this viewport to the store.
    Moved(Viewport),
    /// Every pass was blocked by the boundary; the gesture ended.
    Stopped,
}

/// Per-frame integrator advancing the viewport under a velocity vector.
///
/// The caller owns time: the render loop calls `tick(now_ms, ...)` once per
/// frame. Holding the integrator behind `&mut` means there is exactly one
/// loop instance, so the re-entrancy hazard of a callback-driven loop does
/// not exist here. Velocity publication to the network is the input
/// device's job, throttled there, not this component's.
#[derive(Debug)]
pub struct VelocityIntegrator {
    state: DriveState,
    velocity: Velocity,
}

impl Default for VelocityIntegrator {
    fn default() -> Self {
        Self::new()
    }
}

impl VelocityIntegrator {
    pub fn new() -> Self {
        Self {
            state: DriveState::Idle,
            velocity: Velocity::default(),
        }
    }

    pub fn state(&self) -> DriveState {
        self.state
    }

    pub fn is_moving(&self) -> bool {
        matches!(self.state, DriveState::Moving { .. })
    }

    pub fn velocity(&self) -> Velocity {
        self.velocity
    }

    /// Update the shared velocity vector read by the next tick. A re-sent
    /// velocity while already `Moving` keeps the existing timebase.
    pub fn set_velocity(&mut self, vx: f64, vy: f64, now_ms: f64) {
        self.velocity = Velocity::new(vx, vy);
        if self.velocity.is_zero() {
            self.state = DriveState::Idle;
        } else if self.state == DriveState::Idle {
            self.state = DriveState::Moving {
                last_update_ms: now_ms,
            };
        }
    }

    /// One integration step with three-pass resolution against the bounds:
    /// full 2-axis displacement first, then x-only, then y-only
    /// (axis-sliding along a blocking boundary). All passes blocked means
    /// the gesture is over: velocity is zeroed and the state returns to
    /// `Idle`.
    pub fn tick(
        &mut self,
        now_ms: f64,
        viewport: &Viewport,
        bounds: Option<&Polygon>,
        max_dt_s: f64,
        epsilon: f64,
    ) -> TickOutcome {
        let DriveState::Moving { last_update_ms } = self.state else {
            return TickOutcome::NoChange;
        };

        // Clamp dt so a suspended tab cannot jump on resume.
        let dt = ((now_ms - last_update_ms) / 1000.0).clamp(0.0, max_dt_s);
        self.state = DriveState::Moving {
            last_update_ms: now_ms,
        };

        let dx = self.velocity.vx * dt;
        let dy = self.velocity.vy * dt;
        if dx == 0.0 && dy == 0.0 {
            return TickOutcome::NoChange;
        }

        for (step_x, step_y) in [(dx, dy), (dx, 0.0), (0.0, dy)] {
            if step_x == 0.0 && step_y == 0.0 {
                continue;
            }
            let candidate = viewport.with_bbox(viewport.bbox.translated(step_x, step_y));
            if guard::is_inside_bounds(&candidate, bounds, epsilon) {
                return TickOutcome::Moved(candidate);
            }
        }

        self.velocity = Velocity::default();
        self.state = DriveState::Idle;
        TickOutcome::Stopped
    }
}
