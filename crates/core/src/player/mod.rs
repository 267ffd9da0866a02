use serde::{Deserialize, Serialize};

use crate::{config::PlayerConfig, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerState {
    #[default]
    Normal,
    Stumbling,
    Falling,
}

impl PlayerState {
    pub fn is_hazard(self) -> bool {
        self != Self::Normal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryCause {
    /// The hazard state ran for its full configured duration.
    Timeout,
    /// Recovery was requested before the deadline.
    Forced,
}

/// Notifications for presentation and audio hooks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlayerEvent {
    StumblingStarted { at: f32, recover_at: f32 },
    FallingStarted { at: f32, recover_at: f32 },
    Recovered { previous: PlayerState, cause: RecoveryCause },
}

/// Single pending deadline. Arming replaces whatever was pending.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RecoveryTimer {
    deadline: Option<f32>,
}

impl RecoveryTimer {
    pub fn arm(&mut self, deadline: f32) {
        self.deadline = Some(deadline);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<f32> {
        self.deadline
    }

    /// Consumes the deadline once `now` has reached it.
    pub fn poll(&mut self, now: f32) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Normal / stumbling / falling machine with timed recovery.
///
/// Hazard states latch: once stumbling or falling, further hazard triggers are
/// ignored until the player recovers, either through [`Self::recover`] or when
/// [`Self::update`] observes the deadline.
#[derive(Debug, Clone)]
pub struct PlayerStateMachine {
    config: PlayerConfig,
    state: PlayerState,
    timer: RecoveryTimer,
}

impl PlayerStateMachine {
    pub fn new(config: PlayerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: PlayerState::Normal,
            timer: RecoveryTimer::default(),
        })
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn is_normal(&self) -> bool {
        self.state == PlayerState::Normal
    }

    pub fn recover_at(&self) -> Option<f32> {
        self.timer.deadline()
    }

    /// Seconds left until automatic recovery, if a hazard state is active.
    pub fn remaining(&self, now: f32) -> Option<f32> {
        self.timer.deadline().map(|deadline| (deadline - now).max(0.0))
    }

    pub fn start_stumbling(&mut self, now: f32) -> Option<PlayerEvent> {
        let recover_at = self.enter_hazard(PlayerState::Stumbling, now)?;
        tracing::info!(now, recover_at, "player stumbled");
        Some(PlayerEvent::StumblingStarted { at: now, recover_at })
    }

    pub fn start_falling(&mut self, now: f32) -> Option<PlayerEvent> {
        let recover_at = self.enter_hazard(PlayerState::Falling, now)?;
        tracing::info!(now, recover_at, "player fell");
        Some(PlayerEvent::FallingStarted { at: now, recover_at })
    }

    /// Forces an immediate return to [`PlayerState::Normal`].
    pub fn recover(&mut self) -> Option<PlayerEvent> {
        self.finish(RecoveryCause::Forced)
    }

    /// Runs the auto-recovery check for this tick.
    pub fn update(&mut self, now: f32) -> Option<PlayerEvent> {
        if self.timer.poll(now) {
            self.finish(RecoveryCause::Timeout)
        } else {
            None
        }
    }

    fn enter_hazard(&mut self, next: PlayerState, now: f32) -> Option<f32> {
        if !self.is_normal() {
            tracing::debug!(current = ?self.state, requested = ?next, "hazard already latched");
            return None;
        }

        let duration = match next {
            PlayerState::Stumbling => self.config.stumbling_duration,
            PlayerState::Falling => self.config.falling_duration,
            PlayerState::Normal => return None,
        };
        let recover_at = now + duration;
        self.state = next;
        self.timer.cancel();
        self.timer.arm(recover_at);
        Some(recover_at)
    }

    fn finish(&mut self, cause: RecoveryCause) -> Option<PlayerEvent> {
        if self.is_normal() {
            return None;
        }
        let previous = self.state;
        self.timer.cancel();
        self.state = PlayerState::Normal;
        tracing::info!(?previous, ?cause, "player recovered");
        Some(PlayerEvent::Recovered { previous, cause })
    }
}
