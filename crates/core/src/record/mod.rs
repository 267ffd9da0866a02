use serde::{Deserialize, Serialize};

use crate::{
    arbitration::{ArbitrationController, SessionEvent},
    player::PlayerState,
    zone::ZoneBounds,
    Result,
};

/// Configuration options for trace capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingSettings {
    /// Capture one frame every `frame_stride` ticks. Events are always kept.
    pub frame_stride: u32,
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self { frame_stride: 1 }
    }
}

/// Presentation-facing snapshot of a session after one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceFrame {
    pub time: f32,
    pub normalized: f32,
    pub speed: f32,
    pub state: PlayerState,
    pub bounds: ZoneBounds,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimedEvent {
    pub time: f32,
    #[serde(flatten)]
    pub event: SessionEvent,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct Trace {
    pub frames: Vec<TraceFrame>,
    pub events: Vec<TimedEvent>,
}

/// Collects frames and notifications while a session is being driven.
#[derive(Debug, Default)]
pub struct TraceRecorder {
    settings: RecordingSettings,
    is_recording: bool,
    ticks: u64,
    trace: Trace,
}

impl TraceRecorder {
    pub fn new(settings: RecordingSettings) -> Self {
        Self {
            settings,
            is_recording: false,
            ticks: 0,
            trace: Trace::default(),
        }
    }

    pub fn start(&mut self) {
        self.is_recording = true;
    }

    pub fn stop(&mut self) {
        self.is_recording = false;
    }

    pub fn is_recording(&self) -> bool {
        self.is_recording
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    pub fn into_trace(self) -> Trace {
        self.trace
    }

    /// Drains the session's notifications and, on stride ticks, snapshots it.
    pub fn capture(&mut self, session: &mut ArbitrationController, time: f32) {
        let events = session.drain_events();
        if !self.is_recording {
            return;
        }

        self.trace
            .events
            .extend(events.into_iter().map(|event| TimedEvent { time, event }));

        let stride = u64::from(self.settings.frame_stride.max(1));
        if self.ticks % stride == 0 {
            self.trace.frames.push(TraceFrame {
                time,
                normalized: session.current_normalized_value(),
                speed: session.current_speed(),
                state: session.current_player_state(),
                bounds: session.current_zone_bounds(),
            });
        }
        self.ticks += 1;
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.trace)?)
    }
}
