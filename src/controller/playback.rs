//! Realtime playback: one simulated hour per `1000 ms / speed`.
//!
//! The simulator is shared with the playback task behind a single mutex
//! that is held only for the duration of one synchronous tick.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::orchestrator::Simulator;
use crate::error::PlaybackError;

pub type SharedSimulator = Arc<Mutex<Simulator>>;

/// Real time per simulated hour at speed 1
const BASE_INTERVAL: Duration = Duration::from_millis(1000);

pub struct Playback {
    simulator: SharedSimulator,
    speed: f64,
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
    fault: Arc<Mutex<Option<PlaybackError>>>,
}

impl Playback {
    pub fn new(simulator: SharedSimulator, speed: f64) -> Result<Self, PlaybackError> {
        validate_speed(speed)?;
        Ok(Self {
            simulator,
            speed,
            cancel: None,
            task: None,
            fault: Arc::new(Mutex::new(None)),
        })
    }

    pub fn simulator(&self) -> &SharedSimulator {
        &self.simulator
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn interval(&self) -> Duration {
        BASE_INTERVAL.div_f64(self.speed)
    }

    /// Change the playback speed, restarting the timer if running
    pub fn set_speed(&mut self, speed: f64) -> Result<(), PlaybackError> {
        validate_speed(speed)?;
        self.speed = speed;
        if self.is_playing() {
            self.pause();
            self.start();
        }
        Ok(())
    }

    pub fn is_playing(&self) -> bool {
        let cancelled = self.cancel.as_ref().map_or(true, |c| c.is_cancelled());
        let finished = self.task.as_ref().map_or(true, |t| t.is_finished());
        !cancelled && !finished
    }

    /// The error that stopped the last playback run, if any
    pub fn fault(&self) -> Option<PlaybackError> {
        self.fault.lock().clone()
    }

    /// Start the timer; returns false when already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) -> bool {
        if self.is_playing() {
            return false;
        }
        self.pause();
        *self.fault.lock() = None;

        let cancel = CancellationToken::new();
        let period = self.interval();
        let simulator = Arc::clone(&self.simulator);
        let fault = Arc::clone(&self.fault);
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let outcome = {
                            let mut sim = simulator.lock();
                            let next = (sim.hour() + 1) % 24;
                            sim.set_time(next).map_err(|e| PlaybackError::TickFailed {
                                hour: next,
                                message: e.to_string(),
                            })
                        };
                        if let Err(e) = outcome {
                            error!(error = %e, "playback tick failed, stopping playback");
                            *fault.lock() = Some(e);
                            break;
                        }
                    }
                }
            }
        });

        info!(speed = self.speed, interval_ms = period.as_millis() as u64, "playback started");
        self.cancel = Some(cancel);
        self.task = Some(task);
        true
    }

    /// Stop the timer immediately; safe to call repeatedly
    pub fn pause(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        if let Some(task) = self.task.take() {
            task.abort();
            info!("playback paused");
        }
    }

    /// Stop playback and reset the simulator
    pub fn reset(&mut self) {
        self.pause();
        *self.fault.lock() = None;
        self.simulator.lock().reset();
    }
}

impl Drop for Playback {
    fn drop(&mut self) {
        self.pause();
    }
}

fn validate_speed(speed: f64) -> Result<(), PlaybackError> {
    if speed.is_finite() && speed > 0.0 {
        Ok(())
    } else {
        Err(PlaybackError::InvalidSpeed(speed))
    }
}
