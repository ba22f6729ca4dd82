use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use andi::{listen_commands, web, TaskGroup};
use mood::{ensure_mood_file, read_mood_file, MoodState, MoodWatcher, DEFAULT_MOOD};
use pipeline::{PipelineConfig, TriggerPipeline};
use speech::{CommandPlayer, ReplicateSynthesizer};
use vision::OpenAiAnalyzer;

#[derive(Parser)]
#[command(author, version, about = "Interactive installation: proximity-triggered photo reactions")]
struct Cli {
    /// Address for the mood command front-end
    #[arg(long, env = "ANDI_ADDR", default_value = "127.0.0.1:3000")]
    addr: String,

    /// Trigger threshold in centimeters
    #[arg(long, env = "ANDI_TRIGGER_CM", default_value_t = 5.0)]
    trigger_cm: f64,

    /// Sensor poll interval in milliseconds
    #[arg(long, env = "ANDI_POLL_MS", default_value_t = 200)]
    poll_ms: u64,

    /// Debounce window after a run, in milliseconds
    #[arg(long, env = "ANDI_COOLDOWN_MS", default_value_t = 3000)]
    cooldown_ms: u64,

    /// Mood record poll interval in milliseconds
    #[arg(long, env = "ANDI_MOOD_WATCH_MS", default_value_t = 500)]
    mood_watch_ms: u64,

    /// Persisted mood record
    #[arg(long, env = "ANDI_MOOD_FILE", default_value = "mood.txt")]
    mood_file: PathBuf,

    /// Directory holding canonical artifacts and archives
    #[arg(long, env = "ANDI_WORK_DIR", default_value = ".")]
    work_dir: PathBuf,

    #[arg(long, env = "ANDI_SERIAL_PORT", default_value = "/dev/serial0")]
    serial_port: String,

    #[arg(long, env = "ANDI_SERIAL_BAUD", default_value_t = 115200)]
    serial_baud: u32,

    /// Serial inbound poll interval in milliseconds
    #[arg(long, env = "ANDI_SERIAL_POLL_MS", default_value_t = 500)]
    serial_poll_ms: u64,

    /// Force simulated hardware even when GPIO is available
    #[arg(long, env = "ANDI_SIMULATE")]
    simulate: bool,

    /// Pin the simulated sensor to a fixed reading (bench testing)
    #[arg(long, env = "ANDI_MOCK_DISTANCE")]
    mock_distance: Option<f64>,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, default_value = "")]
    openai_api_key: String,

    #[arg(long, env = "REPLICATE_API_TOKEN", hide_env_values = true, default_value = "")]
    replicate_api_token: String,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    andi::init_logging();
    info!("ANDI starting up");

    let mut config = PipelineConfig::rooted_at(&cli.work_dir);
    config.trigger_cm = cli.trigger_cm;
    config.poll_interval = Duration::from_millis(cli.poll_ms);
    config.cooldown = Duration::from_millis(cli.cooldown_ms);
    for dir in [
        &config.photo_dir,
        &config.photo_archive_dir,
        &config.audio_dir,
        &config.audio_archive_dir,
    ] {
        tokio::fs::create_dir_all(dir).await?;
    }

    ensure_mood_file(&cli.mood_file, DEFAULT_MOOD).await?;
    let initial = read_mood_file(&cli.mood_file).await;
    let (state, push_rx) = MoodState::new(initial);
    info!(mood = %initial, "initial mood loaded");

    let hardware = hardware::probe(cli.simulate, cli.mock_distance);
    info!(capability = ?hardware.capability(), "hardware probe complete");
    let bridge = serial::open(&cli.serial_port, cli.serial_baud, cli.simulate);

    if cli.openai_api_key.is_empty() {
        warn!("OPENAI_API_KEY not set, analysis will fall back");
    }
    if cli.replicate_api_token.is_empty() {
        warn!("REPLICATE_API_TOKEN not set, synthesis will fail and playback will be skipped");
    }
    let analyzer = Arc::new(OpenAiAnalyzer::new(cli.openai_api_key));
    let synthesizer = Arc::new(ReplicateSynthesizer::new(cli.replicate_api_token));
    let player = Arc::new(CommandPlayer::new());

    let pipeline = Arc::new(TriggerPipeline::new(
        hardware.clone(),
        analyzer,
        synthesizer,
        player,
        state.clone(),
        config,
    ));
    let pipeline_state = pipeline.state();

    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let mut tasks = TaskGroup::new();
    tasks.spawn("pipeline", {
        let pipeline = pipeline.clone();
        async move { pipeline.run().await }
    });
    tasks.spawn(
        "mood-watcher",
        MoodWatcher::new(
            cli.mood_file.clone(),
            Duration::from_millis(cli.mood_watch_ms),
        )
        .run(state.clone()),
    );
    tasks.spawn("serial-push", serial::push_loop(push_rx, bridge.clone()));
    tasks.spawn(
        "serial-read",
        serial::read_loop(bridge.clone(), Duration::from_millis(cli.serial_poll_ms)),
    );
    tasks.spawn(
        "commands",
        listen_commands(command_rx, state.clone(), cli.mood_file.clone()),
    );

    let app = web::app(web::AppState {
        commands: command_tx,
        mood: state.clone(),
        pipeline_state,
    });
    let addr: SocketAddr = cli.addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "mood front-end listening");
    tasks.spawn("web", async move {
        if let Err(e) = axum::serve(listener, app.into_make_service()).await {
            error!(%e, "front-end server stopped");
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    tasks.shutdown().await;
    hardware.release().await;
    bridge.close().await;
    info!("hardware released, goodbye");
    Ok(())
}
