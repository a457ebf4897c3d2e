use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use interview_gateway::config::{self, Config};
use interview_gateway::daemon::{PracticeOptions, PracticeSession};
use interview_gateway::voice::{AnswerRecorder, AudioPlayback, TextToSpeech};
use interview_gateway::{api::ApiServer, db};

/// Interview Gateway - mock interview practice against an AI interviewer
#[derive(Parser)]
#[command(name = "interview-gateway", version, about)]
struct Cli {
    /// Port to listen on
    #[arg(long, env = "INTERVIEW_PORT", default_value = "18990")]
    port: u16,

    /// Config file path (defaults to the user config directory)
    #[arg(long, env = "INTERVIEW_CONFIG")]
    config: Option<PathBuf>,

    /// Directory with the built web UI to serve
    #[arg(long, env = "INTERVIEW_STATIC_DIR")]
    static_dir: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a practice interview in the terminal
    Practice {
        /// Job title to interview for
        #[arg(short, long)]
        job_title: String,
        /// Job description the interviewer tailors questions to
        #[arg(short = 'd', long, default_value = "")]
        job_description: String,
        /// Company name
        #[arg(short, long, default_value = "")]
        company: String,
        /// Saved profile id to hand the interviewer as context
        #[arg(short, long)]
        user: Option<String>,
        /// Number of questions to ask
        #[arg(short = 'n', long)]
        questions: Option<usize>,
    },
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! I'm your AI interviewer today.")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,interview_gateway=info",
        1 => "info,interview_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(config::file::default_config_path);

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::Practice {
                job_title,
                job_description,
                company,
                user,
                questions,
            } => {
                practice(
                    &config_path,
                    PracticeOptions {
                        job_title,
                        job_description,
                        company_name: company,
                        user_id: user,
                        questions,
                    },
                )
                .await
            }
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestSpeaker => test_speaker().await,
            Command::TestTts { text } => test_tts(&config_path, &text).await,
        };
    }

    serve(&config_path, cli.port, cli.static_dir).await
}

/// Default mode: serve the HTTP API
async fn serve(
    config_path: &std::path::Path,
    port: u16,
    static_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = config::load_or_env(config_path)?;

    let db_path = config
        .as_ref()
        .map_or_else(config::default_database_path, Config::database_path);
    let pool = db::init(&db_path)?;

    let server = ApiServer::new(pool, config_path.to_path_buf(), port).static_dir(static_dir);

    match config {
        Some(config) => {
            server.state().apply_config(config).await?;
            tracing::info!("gateway ready");
        }
        None => {
            tracing::warn!("no configuration found - POST /api/config to provision credentials");
        }
    }

    server.run().await?;
    Ok(())
}

/// Run a terminal practice interview
async fn practice(config_path: &std::path::Path, opts: PracticeOptions) -> anyhow::Result<()> {
    let config = config::load_or_env(config_path)?
        .ok_or_else(|| anyhow::anyhow!("no configuration found - run the server and POST /api/config, or set GEMINI_API_KEY and ELEVENLABS_API_KEY"))?;

    let pool = db::init(config.database_path())?;
    let session = PracticeSession::new(pool, &config)?;
    session.run(opts).await?;

    Ok(())
}

/// Test microphone input
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Recording from the microphone for {duration} seconds...");
    println!("Speak now!\n");

    let mut recorder = AnswerRecorder::new()?;
    recorder.start()?;

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;
        println!("[{:2}s] captured {:.1}s of audio", i + 1, recorder.captured_secs());
    }

    let wav = recorder.finish()?;

    println!("\n---");
    println!("Captured {} bytes of WAV audio.", wav.len());
    println!("If the captured time tracked the elapsed time, your mic is working.");
    println!("If not, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");

    Ok(())
}

/// Test speaker output with a sine wave
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let mut playback = AudioPlayback::new()?;

    // 2 seconds of 440Hz sine at 24kHz
    let sample_rate = 24000_i32;
    let frequency = 440.0_f32;
    let duration_secs = 2.0_f32;
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let num_samples = (sample_rate as f32 * duration_secs) as usize;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3 // 30% volume
        })
        .collect();

    playback.play(samples).await?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");
    println!("If not, check:");
    println!("  1. Run: pactl info | grep 'Default Sink'");
    println!("  2. Run: pactl list sinks short");

    Ok(())
}

/// Test TTS output via ElevenLabs
async fn test_tts(config_path: &std::path::Path, text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let config = config::load_or_env(config_path)?
        .ok_or_else(|| anyhow::anyhow!("no configuration found - ELEVENLABS_API_KEY required"))?;

    let tts = TextToSpeech::with_voice(
        config.eleven_labs_api_key.clone(),
        config.voice.tts_voice.clone(),
        config.voice.tts_model.clone(),
    )?;

    println!("Synthesizing speech...");
    let mp3_data = tts.synthesize(text).await?;
    println!("Got {} bytes of audio data", mp3_data.len());

    let mut playback = AudioPlayback::new()?;
    playback.play_mp3(&mp3_data).await?;

    println!("\nIf you heard the text spoken, TTS is working!");
    Ok(())
}
