//! Core library for the Sprint Rhythm mechanic.
//!
//! A player drives a normalised tempo signal by tapping. Each obstacle the
//! player overlaps partitions that signal into safe, warning and danger
//! zones; interacting while in the warning or danger zone makes the player
//! stumble or fall for a while. Every component here is advanced explicitly
//! by the host once per tick and owns no scheduling loop of its own.

pub mod arbitration;
pub mod config;
pub mod error;
pub mod movement;
pub mod obstacle;
pub mod player;
pub mod record;
pub mod rhythm;
pub mod timeline;
pub mod zone;

pub use arbitration::{ArbitrationController, Dispatch, InteractOutcome, SessionEvent};
pub use config::{MovementConfig, PlayerConfig, RhythmConfig, SessionConfig};
pub use error::{Result, SprintRhythmError};
pub use movement::StrideSpeed;
pub use obstacle::{ActiveObstacleChange, ObstacleEntry, ObstacleId, ObstacleRegistry};
pub use player::{PlayerEvent, PlayerState, PlayerStateMachine, RecoveryCause, RecoveryTimer};
pub use record::{RecordingSettings, TimedEvent, Trace, TraceFrame, TraceRecorder};
pub use rhythm::{RhythmEstimator, RhythmSignal};
pub use timeline::{replay, InputAction, InputScript, PlaybackClock, ReplaySettings, ScriptedInput};
pub use zone::{classify, Zone, ZoneBounds};
