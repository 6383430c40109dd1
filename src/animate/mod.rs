use crate::model::{Position, RenderFrame};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// One in-flight interpolation between a previously rendered position and
/// a newly received target
#[derive(Debug, Clone)]
struct Transition {
    from: Position,
    to: Position,
    started_at: Instant,
    duration: Duration,
}

impl Transition {
    /// Interpolated position at `now`; the bool is true once the
    /// transition has reached its target.
    fn position_at(&self, now: Instant) -> (Position, bool) {
        let progress = if self.duration.is_zero() {
            1.0
        } else {
            let elapsed = now.saturating_duration_since(self.started_at);
            (elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
        };

        if progress >= 1.0 {
            // Report exactly the target, no float residue
            return (self.to, true);
        }

        let position = Position {
            latitude: lerp(self.from.latitude, self.to.latitude, progress),
            longitude: lerp(self.from.longitude, self.to.longitude, progress),
            heading: lerp_heading(self.from.heading, self.to.heading, progress),
        };
        (position, false)
    }
}

fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

/// Heading interpolation along the numerically shorter arc.
///
/// When |to - from| > 180° the path wraps through 0°/360° so a marker
/// never spins the long way around. Result normalized to [0, 360).
fn lerp_heading(from: f64, to: f64, t: f64) -> f64 {
    let mut delta = to - from;
    if delta > 180.0 {
        delta -= 360.0;
    } else if delta < -180.0 {
        delta += 360.0;
    }
    (from + delta * t).rem_euclid(360.0)
}

/// Advances all in-flight transitions from a single driver call per
/// animation frame.
///
/// `now` is explicit so tests advance a virtual clock instead of
/// sleeping. No self-rescheduling: the owner decides the frame cadence
/// and cancellation is dropping the record.
#[derive(Debug, Default)]
pub struct PositionInterpolator {
    transitions: HashMap<String, Transition>,
}

impl PositionInterpolator {
    pub fn new() -> Self {
        Self {
            transitions: HashMap::new(),
        }
    }

    /// Schedule a transition for `name`.
    ///
    /// If one is already in flight, the new transition starts from the
    /// old one's current interpolated position at `now` (not its original
    /// `from`), avoiding a visual discontinuity.
    pub fn begin_transition(
        &mut self,
        name: &str,
        from: Position,
        to: Position,
        duration: Duration,
        now: Instant,
    ) {
        let from = match self.transitions.get(name) {
            Some(in_flight) => in_flight.position_at(now).0,
            None => from,
        };

        self.transitions.insert(
            name.to_string(),
            Transition {
                from,
                to,
                started_at: now,
                duration,
            },
        );
    }

    /// Advance all transitions to `now` and return one frame per entity.
    ///
    /// A transition that has reached its target emits a final frame
    /// exactly at `to` and is removed; later ticks emit nothing for it
    /// (the rendering layer keeps the last frame).
    pub fn tick(&mut self, now: Instant) -> Vec<RenderFrame> {
        let mut frames = Vec::with_capacity(self.transitions.len());
        let mut finished = Vec::new();

        for (name, transition) in &self.transitions {
            let (position, done) = transition.position_at(now);
            frames.push(RenderFrame {
                name: name.clone(),
                latitude: position.latitude,
                longitude: position.longitude,
                heading: position.heading,
            });
            if done {
                finished.push(name.clone());
            }
        }

        for name in finished {
            self.transitions.remove(&name);
        }

        frames
    }

    /// Drop the in-flight transition for `name`, if any
    pub fn cancel(&mut self, name: &str) {
        self.transitions.remove(name);
    }

    /// Drop all in-flight transitions (teardown)
    pub fn clear(&mut self) {
        self.transitions.clear();
    }

    pub fn in_flight(&self) -> usize {
        self.transitions.len()
    }
}
