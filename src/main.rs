use std::fs::{self, File};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use voice_arcade::Config;
use voice_arcade::voice::{
    AudioCaptureService, DeviceSelection, ListenerControl, MicrophoneSource,
    SpeechCommandListener, list_devices,
};

/// voice-arcade - steer with your pitch or run with spoken commands
#[derive(Parser)]
#[command(name = "voice-arcade", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file (defaults to ~/.config/voice-arcade/config.toml)
    #[arg(short, long, env = "VOICE_ARCADE_CONFIG")]
    config: Option<PathBuf>,

    /// Input device index (see `voice-arcade devices`)
    #[arg(short, long)]
    device: Option<usize>,

    /// Language code for command recognition (e.g. "pt", "en")
    #[arg(short, long)]
    language: Option<String>,

    /// Fixed seed for reproducible courses
    #[arg(long)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// List audio input devices
    Devices,
    /// Show microphone volume and pitch
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Print recognized voice commands until Ctrl-C
    Listen,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = load_config(&cli);
    let log_file = match (&cli.command, &config) {
        (None, Ok(config)) => open_log_file(config),
        _ => None,
    };
    init_logging(cli.verbose, log_file);

    let result = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> voice_arcade::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if cli.device.is_some() {
        config.device = cli.device;
    }
    if let Some(language) = &cli.language {
        config.speech.language.clone_from(language);
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    Ok(config)
}

/// The terminal belongs to the game, so its logs go to a file
fn open_log_file(config: &Config) -> Option<File> {
    fs::create_dir_all(&config.data_dir).ok()?;
    File::create(config.log_path()).ok()
}

fn init_logging(verbose: u8, log_file: Option<File>) {
    let filter = match verbose {
        0 => "info,voice_arcade=info",
        1 => "info,voice_arcade=debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match log_file {
        Some(file) => builder
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init(),
        None => builder.with_writer(std::io::stderr).init(),
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    tracing::debug!(?config, "loaded configuration");

    match cli.command {
        Some(Command::Devices) => devices(&config),
        Some(Command::TestMic { duration }) => test_mic(&config, duration).await,
        Some(Command::Listen) => listen(&config).await,
        None => {
            voice_arcade::tui::run(&config).await?;
            Ok(())
        }
    }
}

/// List input devices
fn devices(config: &Config) -> anyhow::Result<()> {
    let devices = list_devices()?;
    if devices.is_empty() {
        println!("No input devices found");
        return Ok(());
    }

    for device in devices {
        let marker = if config.device == Some(device.id) { '*' } else { ' ' };
        println!(
            "{marker} [{}] {} ({} ch, {} Hz)",
            device.id, device.name, device.channels, device.sample_rate
        );
    }
    Ok(())
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(config: &Config, duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak or hum into your microphone!\n");

    let mut capture = AudioCaptureService::with_selection(DeviceSelection::new(config.device));
    capture.start()?;
    let monitor = capture.monitor();

    let ticks = duration * 4;
    for i in 0..ticks {
        tokio::time::sleep(Duration::from_millis(250)).await;
        let signal = monitor.snapshot();

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (signal.volume / 2.0).clamp(0.0, 50.0) as usize;
        let meter = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);

        let pitch = signal
            .smoothed_pitch
            .map_or_else(|| "   -  ".to_string(), |p| format!("{p:>4.0}Hz"));

        #[allow(clippy::cast_precision_loss)]
        let elapsed = (i + 1) as f32 / 4.0;
        println!(
            "[{elapsed:5.2}s] volume {:5.1} | pitch {pitch} | [{meter}]",
            signal.volume
        );
    }

    capture.stop();

    println!("\n---");
    println!("If the meter moved, your mic is working.");
    println!("A pitch only shows between 80 and 400 Hz while you are loud enough.");
    Ok(())
}

/// Print recognized commands until interrupted
async fn listen(config: &Config) -> anyhow::Result<()> {
    let stt = config.speech_to_text()?;
    let (mut listener, mut commands) = SpeechCommandListener::new(
        Arc::new(MicrophoneSource::new(DeviceSelection::new(config.device))),
        Arc::new(stt),
        config.speech.language.clone(),
    );
    listener.start();

    println!(
        "Listening for commands in '{}' (Ctrl-C to stop)...",
        config.speech.language
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            command = commands.recv() => match command {
                Some(command) => println!("{command}"),
                None => break,
            },
        }
    }

    listener.stop();
    Ok(())
}
