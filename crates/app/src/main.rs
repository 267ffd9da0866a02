use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use sprint_rhythm_core::{
    replay, ArbitrationController, InputScript, RecordingSettings, ReplaySettings, SessionConfig,
};
use tracing_subscriber::EnvFilter;

fn main() -> sprint_rhythm_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            script,
            config,
            dt,
            duration,
            frame_stride,
            output,
        } => run_simulate(
            script.as_deref(),
            config.as_deref(),
            ReplaySettings {
                dt,
                duration,
                recording: RecordingSettings { frame_stride },
                ..ReplaySettings::default()
            },
            output.as_deref(),
        ),
        Commands::CheckConfig { path } => run_check_config(&path),
        Commands::Defaults => print_config(&SessionConfig::default()),
    }
}

fn run_simulate(
    script: Option<&Path>,
    config: Option<&Path>,
    settings: ReplaySettings,
    output: Option<&Path>,
) -> sprint_rhythm_core::Result<()> {
    let config = match config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };
    let mut script = match script {
        Some(path) => InputScript::load(path)?,
        None => {
            tracing::info!("no script given, replaying the demo course");
            InputScript::demo()
        }
    };
    tracing::info!(inputs = script.inputs().len(), dt = settings.dt, "starting simulation");

    let mut session = ArbitrationController::new(config)?;
    let trace = replay(&mut session, &mut script, &settings)?;
    tracing::info!(
        frames = trace.frames.len(),
        events = trace.events.len(),
        "simulation finished"
    );

    let json = serde_json::to_string_pretty(&trace)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            tracing::info!(?path, "trace written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn run_check_config(path: &Path) -> sprint_rhythm_core::Result<()> {
    let config = SessionConfig::load(path)?;
    tracing::info!(?path, "configuration is valid");
    print_config(&config)
}

fn print_config(config: &SessionConfig) -> sprint_rhythm_core::Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Tap-tempo sprint and obstacle simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay an input script against a fresh session and emit a JSON trace.
    Simulate {
        /// Input script (JSON). The built-in demo course is used if omitted.
        #[arg(short, long)]
        script: Option<PathBuf>,
        /// Session configuration (JSON). Defaults are used if omitted.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Fixed tick step in seconds.
        #[arg(long, default_value_t = 1.0 / 60.0)]
        dt: f32,
        /// Simulated time in seconds. Defaults to the script end plus a tail.
        #[arg(long)]
        duration: Option<f32>,
        /// Keep one trace frame every N ticks.
        #[arg(long, default_value_t = 1)]
        frame_stride: u32,
        /// Where to write the trace. Printed to stdout if omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file and print the effective values.
    CheckConfig {
        path: PathBuf,
    },
    /// Print the default configuration.
    Defaults,
}
