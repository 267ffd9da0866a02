use serde::Serialize;

use crate::{
    config::SessionConfig,
    movement::StrideSpeed,
    obstacle::{ActiveObstacleChange, ObstacleEntry, ObstacleId, ObstacleRegistry},
    player::{PlayerEvent, PlayerState, PlayerStateMachine},
    rhythm::RhythmEstimator,
    zone::{classify, Zone, ZoneBounds},
    Result,
};

/// Notification emitted by a session, in the order it happened.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SessionEvent {
    Player(PlayerEvent),
    Obstacle(ActiveObstacleChange),
}

/// What a hazard check dispatched to the player state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dispatch {
    None,
    Stumble,
    Fall,
}

impl From<Zone> for Dispatch {
    fn from(zone: Zone) -> Self {
        match zone {
            Zone::Safe => Self::None,
            Zone::Warning => Self::Stumble,
            Zone::Danger => Self::Fall,
        }
    }
}

/// Result of a single interact pulse.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InteractOutcome {
    /// The player is already stumbling or falling.
    PlayerBusy { state: PlayerState },
    /// No obstacle overlaps the player.
    NoObstacle,
    Classified {
        obstacle: ObstacleId,
        value: f32,
        zone: Zone,
        dispatch: Dispatch,
    },
}

/// Per-player session wiring the estimator, registry and state machine.
///
/// Nothing here runs on its own: the host calls [`Self::advance`] once per
/// frame and forwards input and collision events as they arrive. Emitted
/// notifications queue up until [`Self::drain_events`] is called.
#[derive(Debug)]
pub struct ArbitrationController {
    rhythm: RhythmEstimator,
    obstacles: ObstacleRegistry,
    player: PlayerStateMachine,
    speed: StrideSpeed,
    now: f32,
    events: Vec<SessionEvent>,
}

impl ArbitrationController {
    pub fn new(config: SessionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            rhythm: RhythmEstimator::new(config.rhythm)?,
            obstacles: ObstacleRegistry::new(),
            player: PlayerStateMachine::new(config.player)?,
            speed: StrideSpeed::new(config.movement)?,
            now: 0.0,
            events: Vec::new(),
        })
    }

    pub fn rhythm(&self) -> &RhythmEstimator {
        &self.rhythm
    }

    pub fn obstacles(&self) -> &ObstacleRegistry {
        &self.obstacles
    }

    pub fn player(&self) -> &PlayerStateMachine {
        &self.player
    }

    /// Time of the latest tick or input seen by the session.
    pub fn now(&self) -> f32 {
        self.now
    }

    pub fn record_tap(&mut self, now: f32) {
        self.observe(now);
        self.rhythm.record_tap(now);
    }

    /// Collision layer: the player started overlapping a trigger volume.
    pub fn enter(
        &mut self,
        id: impl Into<ObstacleId>,
        safe_end: f32,
        warning_end: f32,
        danger_start: f32,
        priority: u32,
    ) {
        let bounds = ZoneBounds::new(safe_end, warning_end, danger_start);
        let change = self.obstacles.enter(id.into(), bounds, priority);
        self.push_obstacle_change(change);
    }

    /// Collision layer: the player left a trigger volume.
    pub fn exit(&mut self, id: impl Into<ObstacleId>) {
        let change = self.obstacles.exit(&id.into());
        self.push_obstacle_change(change);
    }

    /// Per-frame driver: idle decay, recovery deadline, speed readout.
    pub fn advance(&mut self, now: f32, dt: f32) {
        self.observe(now);
        self.rhythm.decay(now, dt);
        if let Some(event) = self.player.update(now) {
            self.events.push(SessionEvent::Player(event));
        }
        self.speed.update(self.rhythm.normalized_value(), dt);
    }

    /// Classifies the current tempo against the active obstacle and drives
    /// the player state machine. Edge-triggered: one check per pulse.
    pub fn interact(&mut self, now: f32) -> InteractOutcome {
        self.observe(now);

        if !self.player.is_normal() {
            return InteractOutcome::PlayerBusy {
                state: self.player.state(),
            };
        }
        let Some(active) = self.obstacles.active() else {
            return InteractOutcome::NoObstacle;
        };

        let value = self.rhythm.normalized_value();
        let zone = classify(value, &active.bounds);
        let obstacle = active.id.clone();
        let priority = active.priority;

        let dispatch = Dispatch::from(zone);
        let event = match dispatch {
            Dispatch::None => None,
            Dispatch::Stumble => self.player.start_stumbling(now),
            Dispatch::Fall => self.player.start_falling(now),
        };
        tracing::info!(%obstacle, priority, value, ?zone, ?dispatch, "interaction classified");
        if let Some(event) = event {
            self.events.push(SessionEvent::Player(event));
        }

        InteractOutcome::Classified {
            obstacle,
            value,
            zone,
            dispatch,
        }
    }

    /// Ends any hazard state immediately.
    pub fn recover(&mut self, now: f32) {
        self.observe(now);
        if let Some(event) = self.player.recover() {
            self.events.push(SessionEvent::Player(event));
        }
    }

    pub fn current_normalized_value(&self) -> f32 {
        self.rhythm.normalized_value()
    }

    pub fn current_speed(&self) -> f32 {
        self.speed.current()
    }

    /// Bounds of the active obstacle, or [`ZoneBounds::NEUTRAL`].
    pub fn current_zone_bounds(&self) -> ZoneBounds {
        self.obstacles
            .active()
            .map(|entry| entry.bounds)
            .unwrap_or(ZoneBounds::NEUTRAL)
    }

    pub fn current_player_state(&self) -> PlayerState {
        self.player.state()
    }

    pub fn active_obstacle(&self) -> Option<&ObstacleEntry> {
        self.obstacles.active()
    }

    pub fn pending_events(&self) -> &[SessionEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    fn observe(&mut self, now: f32) {
        self.now = self.now.max(now);
    }

    fn push_obstacle_change(&mut self, change: Option<ActiveObstacleChange>) {
        if let Some(change) = change {
            self.events.push(SessionEvent::Obstacle(change));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RhythmConfig;

    fn session() -> ArbitrationController {
        ArbitrationController::new(SessionConfig {
            rhythm: RhythmConfig {
                ema_alpha: 1.0,
                ..RhythmConfig::default()
            },
            ..SessionConfig::default()
        })
        .unwrap()
    }

    fn tap_at_frequency(session: &mut ArbitrationController, start: f32, frequency: f32) -> f32 {
        let interval = 1.0 / frequency;
        session.record_tap(start);
        session.record_tap(start + interval);
        start + interval
    }

    fn stumbles(events: &[SessionEvent]) -> usize {
        events
            .iter()
            .filter(|event| {
                matches!(
                    event,
                    SessionEvent::Player(PlayerEvent::StumblingStarted { .. })
                )
            })
            .count()
    }

    #[test]
    fn warning_tempo_makes_the_player_stumble() {
        let mut session = session();
        let now = tap_at_frequency(&mut session, 0.0, 2.75);
        assert!((session.current_normalized_value() - 0.5).abs() < 1e-4);

        session.enter("log", 0.33, 0.66, 1.0, 10);
        let outcome = session.interact(now);

        assert!(matches!(
            outcome,
            InteractOutcome::Classified {
                zone: Zone::Warning,
                dispatch: Dispatch::Stumble,
                ..
            }
        ));
        assert_eq!(session.current_player_state(), PlayerState::Stumbling);
        assert_eq!(stumbles(session.pending_events()), 1);
    }

    #[test]
    fn danger_tempo_makes_the_player_fall() {
        let mut session = session();
        let now = tap_at_frequency(&mut session, 0.0, 5.0);
        session.enter("wall", 0.33, 0.66, 1.0, 0);

        session.interact(now);
        assert_eq!(session.current_player_state(), PlayerState::Falling);
    }

    #[test]
    fn safe_tempo_changes_nothing() {
        let mut session = session();
        session.enter("log", 0.33, 0.66, 1.0, 0);
        let outcome = session.interact(0.0);

        assert!(matches!(
            outcome,
            InteractOutcome::Classified {
                zone: Zone::Safe,
                dispatch: Dispatch::None,
                ..
            }
        ));
        assert_eq!(session.current_player_state(), PlayerState::Normal);
    }

    #[test]
    fn pulses_without_obstacle_are_ignored() {
        let mut session = session();
        tap_at_frequency(&mut session, 0.0, 5.0);
        assert_eq!(session.interact(0.2), InteractOutcome::NoObstacle);
        assert_eq!(session.current_player_state(), PlayerState::Normal);
    }

    #[test]
    fn pulses_while_hazard_latched_are_ignored() {
        let mut session = session();
        let now = tap_at_frequency(&mut session, 0.0, 2.75);
        session.enter("log", 0.33, 0.66, 1.0, 10);
        session.interact(now);

        let outcome = session.interact(now + 0.1);
        assert_eq!(
            outcome,
            InteractOutcome::PlayerBusy {
                state: PlayerState::Stumbling
            }
        );
        assert_eq!(stumbles(session.pending_events()), 1);
    }

    #[test]
    fn highest_priority_obstacle_decides() {
        let mut session = session();
        let now = tap_at_frequency(&mut session, 0.0, 2.75);
        session.enter("lenient", 0.9, 0.95, 1.0, 1);
        session.enter("strict", 0.1, 0.2, 1.0, 7);

        let outcome = session.interact(now);
        assert!(matches!(
            outcome,
            InteractOutcome::Classified { ref obstacle, zone: Zone::Danger, .. }
                if obstacle.as_str() == "strict"
        ));
    }

    #[test]
    fn advance_recovers_after_timeout() {
        let mut session = session();
        let now = tap_at_frequency(&mut session, 0.0, 2.75);
        session.enter("log", 0.33, 0.66, 1.0, 10);
        session.interact(now);
        session.drain_events();

        session.advance(now + 1.9, 0.1);
        assert_eq!(session.current_player_state(), PlayerState::Stumbling);

        session.advance(now + 2.01, 0.11);
        assert_eq!(session.current_player_state(), PlayerState::Normal);
        assert_eq!(session.drain_events().len(), 1);
    }

    #[test]
    fn reports_neutral_bounds_without_obstacle() {
        let mut session = session();
        assert_eq!(session.current_zone_bounds(), ZoneBounds::NEUTRAL);

        session.enter("log", 0.2, 0.7, 1.0, 0);
        assert_eq!(session.current_zone_bounds().as_tuple(), (0.2, 0.7, 1.0));

        session.exit("log");
        assert_eq!(session.current_zone_bounds(), ZoneBounds::NEUTRAL);

        let events = session.drain_events();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[1],
            SessionEvent::Obstacle(ActiveObstacleChange::Cleared)
        );
    }

    #[test]
    fn forced_recovery_emits_event() {
        let mut session = session();
        let now = tap_at_frequency(&mut session, 0.0, 5.0);
        session.enter("wall", 0.33, 0.66, 1.0, 0);
        session.interact(now);
        session.recover(now + 0.5);

        assert_eq!(session.current_player_state(), PlayerState::Normal);
        assert!(matches!(
            session.drain_events().last(),
            Some(SessionEvent::Player(PlayerEvent::Recovered {
                previous: PlayerState::Falling,
                ..
            }))
        ));
    }

    #[test]
    fn rejects_invalid_configuration() {
        let mut config = SessionConfig::default();
        config.rhythm.max_tap_frequency = 0.1;
        assert!(ArbitrationController::new(config).is_err());
    }
}
