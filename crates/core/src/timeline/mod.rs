use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    arbitration::ArbitrationController,
    record::{RecordingSettings, Trace, TraceRecorder},
    Result, SprintRhythmError,
};

/// Upper bound on replay length, about 46 hours at 60 ticks per second.
const MAX_REPLAY_TICKS: u64 = 10_000_000;

#[derive(Debug, Default, Clone)]
pub struct PlaybackClock {
    pub time_seconds: f32,
}

impl PlaybackClock {
    /// Places the clock on a fixed-step tick. Derived from the tick index in
    /// double precision so long replays do not drift.
    pub fn seek_tick(&mut self, tick: u64, dt: f32) {
        self.time_seconds = (tick as f64 * f64::from(dt)).max(0.0) as f32;
    }
}

fn default_danger_start() -> f32 {
    1.0
}

/// Input forwarded to a session by the host layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum InputAction {
    Tap,
    Interact,
    Recover,
    Enter {
        id: String,
        safe_end: f32,
        warning_end: f32,
        #[serde(default = "default_danger_start")]
        danger_start: f32,
        #[serde(default)]
        priority: u32,
    },
    Exit {
        id: String,
    },
}

impl InputAction {
    /// Collision input resolves before taps, taps before the tick, and
    /// pulses last so they observe this tick's decay and active obstacle.
    fn phase(&self) -> u8 {
        match self {
            Self::Enter { .. } | Self::Exit { .. } => 0,
            Self::Tap => 1,
            Self::Interact | Self::Recover => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedInput {
    pub time_seconds: f32,
    #[serde(flatten)]
    pub action: InputAction,
}

impl ScriptedInput {
    pub fn new(time_seconds: f32, action: InputAction) -> Self {
        Self {
            time_seconds,
            action,
        }
    }
}

/// Time-ordered input script replayed against a session.
#[derive(Debug, Default, Clone)]
pub struct InputScript {
    inputs: Vec<ScriptedInput>,
    next_input: usize,
}

impl InputScript {
    pub fn new(inputs: Vec<ScriptedInput>) -> Self {
        let mut script = Self::default();
        script.set_inputs(inputs);
        script
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let inputs: Vec<ScriptedInput> = serde_json::from_str(raw)?;
        Ok(Self::new(inputs))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    pub fn set_inputs(&mut self, inputs: Vec<ScriptedInput>) {
        self.inputs = inputs;
        self.inputs
            .sort_by(|a, b| a.time_seconds.total_cmp(&b.time_seconds));
        self.next_input = 0;
    }

    pub fn inputs(&self) -> &[ScriptedInput] {
        &self.inputs
    }

    pub fn is_finished(&self) -> bool {
        self.next_input >= self.inputs.len()
    }

    /// Time of the last scripted input, if any.
    pub fn end_time(&self) -> Option<f32> {
        self.inputs.last().map(|input| input.time_seconds)
    }

    /// Returns every input due at the clock time and moves the cursor past it.
    pub fn due(&mut self, clock: &PlaybackClock) -> &[ScriptedInput] {
        let start = self.next_input;
        while let Some(input) = self.inputs.get(self.next_input) {
            if input.time_seconds > clock.time_seconds {
                break;
            }
            self.next_input += 1;
        }
        &self.inputs[start..self.next_input]
    }

    /// Demo course: a lenient hurdle taken calmly, then a strict gate
    /// overlapping a puddle taken at a sprint.
    pub fn demo() -> Self {
        let mut inputs = Vec::new();
        for step in 0..6 {
            inputs.push(ScriptedInput::new(0.5 + step as f32 * 0.9, InputAction::Tap));
        }
        inputs.push(ScriptedInput::new(
            4.0,
            InputAction::Enter {
                id: "hurdle".to_string(),
                safe_end: 0.4,
                warning_end: 0.7,
                danger_start: 1.0,
                priority: 1,
            },
        ));
        inputs.push(ScriptedInput::new(5.0, InputAction::Interact));
        inputs.push(ScriptedInput::new(
            5.5,
            InputAction::Exit {
                id: "hurdle".to_string(),
            },
        ));
        for step in 0..12 {
            inputs.push(ScriptedInput::new(6.0 + step as f32 * 0.22, InputAction::Tap));
        }
        inputs.push(ScriptedInput::new(
            7.5,
            InputAction::Enter {
                id: "puddle".to_string(),
                safe_end: 0.6,
                warning_end: 0.9,
                danger_start: 1.0,
                priority: 0,
            },
        ));
        inputs.push(ScriptedInput::new(
            8.0,
            InputAction::Enter {
                id: "gate".to_string(),
                safe_end: 0.2,
                warning_end: 0.5,
                danger_start: 1.0,
                priority: 5,
            },
        ));
        inputs.push(ScriptedInput::new(8.4, InputAction::Interact));
        inputs.push(ScriptedInput::new(
            9.0,
            InputAction::Exit {
                id: "gate".to_string(),
            },
        ));
        inputs.push(ScriptedInput::new(
            9.5,
            InputAction::Exit {
                id: "puddle".to_string(),
            },
        ));
        Self::new(inputs)
    }
}

/// Fixed-step replay parameters.
#[derive(Debug, Clone)]
pub struct ReplaySettings {
    pub dt: f32,
    /// Total simulated time. Defaults to the script end plus `tail`.
    pub duration: Option<f32>,
    /// Extra time simulated after the last input when no duration is given.
    pub tail: f32,
    pub recording: RecordingSettings,
}

impl Default for ReplaySettings {
    fn default() -> Self {
        Self {
            dt: 1.0 / 60.0,
            duration: None,
            tail: 4.0,
            recording: RecordingSettings::default(),
        }
    }
}

/// Drives `session` through `script` tick by tick and records a trace.
pub fn replay(
    session: &mut ArbitrationController,
    script: &mut InputScript,
    settings: &ReplaySettings,
) -> Result<Trace> {
    if !(settings.dt.is_finite() && settings.dt > 0.0) {
        return Err(SprintRhythmError::InvalidInput(
            "replay step must be a positive number of seconds",
        ));
    }
    let duration = settings
        .duration
        .unwrap_or_else(|| script.end_time().unwrap_or(0.0) + settings.tail.max(0.0));
    if !duration.is_finite() || duration < 0.0 {
        return Err(SprintRhythmError::InvalidInput(
            "replay duration must be a finite, non-negative number of seconds",
        ));
    }

    let mut clock = PlaybackClock::default();
    let mut recorder = TraceRecorder::new(settings.recording.clone());
    recorder.start();

    let ticks = (f64::from(duration) / f64::from(settings.dt)).ceil();
    if ticks > MAX_REPLAY_TICKS as f64 {
        return Err(SprintRhythmError::InvalidInput(
            "replay would exceed the maximum number of ticks",
        ));
    }
    let ticks = ticks as u64;
    tracing::info!(ticks, dt = settings.dt, duration, "replaying input script");

    for tick in 0..=ticks {
        clock.seek_tick(tick, settings.dt);
        if tick == ticks {
            clock.time_seconds = clock.time_seconds.max(duration);
        }
        let now = clock.time_seconds;

        let mut due = script.due(&clock).to_vec();
        due.sort_by_key(|input| input.action.phase());

        for input in due.iter().filter(|input| input.action.phase() < 2) {
            apply(session, &input.action, now);
        }
        session.advance(now, if tick > 0 { settings.dt } else { 0.0 });
        for input in due.iter().filter(|input| input.action.phase() == 2) {
            apply(session, &input.action, now);
        }

        recorder.capture(session, now);
    }

    recorder.stop();
    Ok(recorder.into_trace())
}

fn apply(session: &mut ArbitrationController, action: &InputAction, now: f32) {
    match action {
        InputAction::Tap => session.record_tap(now),
        InputAction::Interact => {
            let outcome = session.interact(now);
            tracing::debug!(now, ?outcome, "interact pulse");
        }
        InputAction::Recover => session.recover(now),
        InputAction::Enter {
            id,
            safe_end,
            warning_end,
            danger_start,
            priority,
        } => session.enter(id.as_str(), *safe_end, *warning_end, *danger_start, *priority),
        InputAction::Exit { id } => session.exit(id.as_str()),
    }
}
