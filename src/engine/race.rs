//! Race engine: randomized-progress simulation producing a finishing order.
//!
//! Every tick each marble moves forward by a random amount and is pulled
//! toward the pace line `elapsed / duration * track_length` (plus jitter).
//! The pull keeps the whole field near the finish when the deadline
//! arrives, so a race always lasts its configured duration. At the deadline
//! every marble finishes at once and the order is decided by final
//! progress, highest first, with ties going to the lower marble id.

use rand::Rng;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::config::RaceConfig;
use crate::types::{Competitor, CompetitorId, Placing, RaceFrame, RaceResult};

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct RaceEngine {
    config: RaceConfig,
}

impl RaceEngine {
    pub fn new(config: RaceConfig) -> Self {
        Self { config }
    }

    /// Set up a race that the caller advances tick by tick.
    pub fn start(&self, roster: &[Competitor], duration: Duration) -> RaceSimulation {
        RaceSimulation::new(self.config.clone(), roster, duration)
    }

    /// Simulate a whole race in one go.
    pub fn run(&self, roster: &[Competitor], duration: Duration, rng: &mut impl Rng) -> RaceResult {
        let mut sim = self.start(roster, duration);
        loop {
            if let Some(result) = sim.step(rng) {
                return result;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Lane {
    competitor: CompetitorId,
    progress: f64,
    finished: bool,
}

/// A race in flight.
#[derive(Debug, Clone)]
pub struct RaceSimulation {
    race_id: Uuid,
    config: RaceConfig,
    lanes: Vec<Lane>,
    elapsed_ms: u64,
    duration_ms: u64,
    concluded: bool,
}

impl RaceSimulation {
    fn new(config: RaceConfig, roster: &[Competitor], duration: Duration) -> Self {
        let lanes = roster
            .iter()
            .map(|c| Lane {
                competitor: c.id,
                progress: 0.0,
                finished: false,
            })
            .collect();
        Self {
            race_id: Uuid::new_v4(),
            config,
            lanes,
            elapsed_ms: 0,
            duration_ms: duration.as_millis() as u64,
            concluded: false,
        }
    }

    pub fn race_id(&self) -> Uuid {
        self.race_id
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms)
    }

    /// Whether the result has already been produced.
    pub fn is_concluded(&self) -> bool {
        self.concluded
    }

    /// Advance one tick. Returns the result on the tick that reaches the
    /// deadline and `None` on every other tick, including after conclusion.
    pub fn step(&mut self, rng: &mut impl Rng) -> Option<RaceResult> {
        if self.concluded {
            return None;
        }

        self.elapsed_ms = (self.elapsed_ms + self.config.tick_ms).min(self.duration_ms);
        let track = self.config.track_length;
        let pace = if self.duration_ms == 0 {
            track
        } else {
            self.elapsed_ms as f64 / self.duration_ms as f64 * track
        };

        for lane in self.lanes.iter_mut().filter(|l| !l.finished) {
            let speed = self.config.base_speed + rng.gen::<f64>() * self.config.speed_variance;
            let noise = (rng.gen::<f64>() * 2.0 - 1.0) * self.config.jitter;
            let advanced = lane.progress + speed;
            let pulled = advanced + (pace + noise - advanced) * self.config.convergence;
            lane.progress = pulled.clamp(0.0, track);
            if lane.progress >= track {
                lane.finished = true;
            }
        }

        if self.elapsed_ms < self.duration_ms {
            return None;
        }
        Some(self.conclude())
    }

    /// End the race now from the current progress values.
    pub fn force_finish(&mut self) -> RaceResult {
        debug!(
            race_id = %self.race_id,
            elapsed_ms = self.elapsed_ms,
            duration_ms = self.duration_ms,
            "Race force-finished"
        );
        self.conclude()
    }

    /// Current progress of every lane, in roster order.
    pub fn frame(&self) -> RaceFrame {
        RaceFrame {
            elapsed_ms: self.elapsed_ms,
            progress: self
                .lanes
                .iter()
                .map(|l| (l.competitor, l.progress))
                .collect(),
        }
    }

    /// Every lane still running finishes where it stands.
    fn conclude(&mut self) -> RaceResult {
        let stragglers = self.lanes.iter().filter(|l| !l.finished).count();
        if stragglers > 0 {
            debug!(race_id = %self.race_id, stragglers, "Finishing remaining lanes at the deadline");
        }
        for lane in &mut self.lanes {
            lane.finished = true;
        }
        self.concluded = true;

        RaceResult {
            race_id: self.race_id,
            placings: rank(&self.lanes),
            finished_at: chrono::Utc::now(),
        }
    }
}

/// Order lanes by descending progress, lower id first on exact ties.
fn rank(lanes: &[Lane]) -> Vec<Placing> {
    let mut order: Vec<&Lane> = lanes.iter().collect();
    order.sort_by(|a, b| {
        b.progress
            .total_cmp(&a.progress)
            .then_with(|| a.competitor.cmp(&b.competitor))
    });
    order
        .into_iter()
        .enumerate()
        .map(|(i, lane)| Placing {
            competitor: lane.competitor,
            position: i + 1,
            progress: lane.progress,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
