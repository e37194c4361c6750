use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use services::{ApiConfig, AppServices, Clock, PlaybackControl};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt as log_fmt, layer::SubscriberExt, util::SubscriberInitExt};
use trail_core::model::{CheckpointQuestion, StudentId, TrailId, VideoId};
use trail_core::progress::{CHECKPOINT_CORRECT_XP, StudentProgress};

/// Real-time interval between simulated player time updates.
const TICK: Duration = Duration::from_millis(250);

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingRequired { flag: &'static str },
    UnknownArg(String),
    InvalidId { flag: &'static str, source: trail_core::Error },
    InvalidNumber { flag: &'static str, raw: String },
    InvalidAnswers { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingRequired { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidId { flag, source } => write!(f, "invalid {flag} value: {source}"),
            ArgsError::InvalidNumber { flag, raw } => {
                write!(f, "invalid {flag} value: {raw} (expected a positive number)")
            }
            ArgsError::InvalidAnswers { raw } => {
                write!(f, "invalid --answers value: {raw} (expected auto, wrong or skip)")
            }
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_positive(flag: &'static str, raw: String) -> Result<f64, ArgsError> {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => Ok(value),
        _ => Err(ArgsError::InvalidNumber { flag, raw }),
    }
}

/// How the simulated learner reacts to a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AnswerPolicy {
    Auto,
    Wrong,
    Skip,
}

impl AnswerPolicy {
    fn from_arg(raw: &str) -> Option<Self> {
        match raw {
            "auto" => Some(Self::Auto),
            "wrong" => Some(Self::Wrong),
            "skip" => Some(Self::Skip),
            _ => None,
        }
    }

    /// Option index to pick, or `None` to skip. `Wrong` skips checkpoints
    /// that offer no incorrect option.
    fn choose(self, checkpoint: &CheckpointQuestion) -> Option<usize> {
        match self {
            AnswerPolicy::Auto => Some(checkpoint.correct_answer()),
            AnswerPolicy::Wrong => (0..checkpoint.options().len())
                .find(|&index| index != checkpoint.correct_answer()),
            AnswerPolicy::Skip => None,
        }
    }
}

struct Args {
    db_url: String,
    video_id: VideoId,
    trail_id: Option<TrailId>,
    student_id: StudentId,
    transcript_path: Option<String>,
    duration_seconds: f64,
    speed: f64,
    answers: AnswerPolicy,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- --video-id <id> [--trail-id <id>] [--transcript <file>]");
    eprintln!("                      [--duration <secs>] [--speed <factor>]");
    eprintln!("                      [--answers auto|wrong|skip] [--student-id <id>] [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --duration 600  --speed 1  --answers auto  --student-id local");
    eprintln!("  --db sqlite:trail.sqlite3");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  TRAIL_DB_URL, TRAIL_API_BASE_URL, TRAIL_API_TOKEN, TRAIL_API_TIMEOUT_SECS, RUST_LOG");
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("TRAIL_DB_URL")
            .ok()
            .map_or_else(|| normalize_sqlite_url("sqlite:trail.sqlite3".into()), normalize_sqlite_url);
        let mut video_id = None;
        let mut trail_id = None;
        let mut student_id = parse_id("--student-id", "local".into(), StudentId::new)?;
        let mut transcript_path = None;
        let mut duration_seconds = 600.0;
        let mut speed = 1.0;
        let mut answers = AnswerPolicy::Auto;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--video-id" => {
                    let value = require_value(args, "--video-id")?;
                    video_id = Some(parse_id("--video-id", value, VideoId::new)?);
                }
                "--trail-id" => {
                    let value = require_value(args, "--trail-id")?;
                    trail_id = Some(parse_id("--trail-id", value, TrailId::new)?);
                }
                "--student-id" => {
                    let value = require_value(args, "--student-id")?;
                    student_id = parse_id("--student-id", value, StudentId::new)?;
                }
                "--transcript" => transcript_path = Some(require_value(args, "--transcript")?),
                "--duration" => {
                    duration_seconds = parse_positive("--duration", require_value(args, "--duration")?)?;
                }
                "--speed" => speed = parse_positive("--speed", require_value(args, "--speed")?)?,
                "--answers" => {
                    let value = require_value(args, "--answers")?;
                    answers = AnswerPolicy::from_arg(&value)
                        .ok_or(ArgsError::InvalidAnswers { raw: value })?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            video_id: video_id.ok_or(ArgsError::MissingRequired { flag: "--video-id" })?,
            trail_id,
            student_id,
            transcript_path,
            duration_seconds,
            speed,
            answers,
        })
    }
}

fn parse_id<T, E>(
    flag: &'static str,
    raw: String,
    make: impl FnOnce(String) -> Result<T, E>,
) -> Result<T, ArgsError>
where
    trail_core::Error: From<E>,
{
    make(raw).map_err(|err| ArgsError::InvalidId {
        flag,
        source: trail_core::Error::from(err),
    })
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(log_fmt::layer().with_target(true))
        .init();
}

/// Player stand-in whose paused state the controller toggles.
#[derive(Clone)]
struct SimulatedPlayer {
    playing: Arc<AtomicBool>,
}

impl SimulatedPlayer {
    fn new() -> Self {
        Self {
            playing: Arc::new(AtomicBool::new(true)),
        }
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }
}

impl PlaybackControl for SimulatedPlayer {
    fn pause(&mut self) {
        self.playing.store(false, Ordering::SeqCst);
    }

    fn resume(&mut self) {
        self.playing.store(true, Ordering::SeqCst);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let args = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let transcript = match &args.transcript_path {
        Some(path) => tokio::fs::read_to_string(path).await?,
        None => String::new(),
    };

    prepare_sqlite_file(&args.db_url)?;
    let app = AppServices::new_sqlite(
        &args.db_url,
        ApiConfig::from_env()?,
        args.student_id.clone(),
        Clock::default(),
    )
    .await?;

    let player = SimulatedPlayer::new();
    let mut controller = app
        .checkpoint_controller(args.video_id.clone(), args.trail_id.clone())
        .with_player(Box::new(player.clone()));

    controller
        .load_checkpoints(&transcript, args.duration_seconds)
        .await;
    if let Some(error) = controller.error() {
        return Err(format!("could not load checkpoints: {error}").into());
    }
    info!(count = controller.checkpoints().len(), "starting playback");

    let step = TICK.as_secs_f64() * args.speed;
    let mut position = 0.0_f64;
    let mut ticker = tokio::time::interval(TICK);
    while position < args.duration_seconds {
        ticker.tick().await;
        if player.is_playing() {
            position = (position + step).min(args.duration_seconds);
        }

        let choice = controller
            .on_time_update(position, player.is_playing())
            .map(|checkpoint| {
                println!("[{position:>7.2}s] {}", checkpoint.question());
                for (index, option) in checkpoint.options().iter().enumerate() {
                    println!("           {index}. {option}");
                }
                args.answers.choose(checkpoint)
            });

        match choice {
            Some(Some(selected)) => {
                if let Some(correct) = controller.handle_answer(selected) {
                    println!("           -> answered {selected}, correct: {correct}");
                }
            }
            Some(None) => {
                controller.handle_skip();
                println!("           -> skipped");
            }
            None => {}
        }
    }

    controller.settle().await;
    let score = controller.score();
    println!(
        "answered {} (correct {}), skipped {}, score impact {:+.1}%",
        score.answered, score.correct, score.skipped, score.score_impact
    );

    let mut progress = StudentProgress::default();
    let change = progress.award(score.correct.saturating_mul(CHECKPOINT_CORRECT_XP));
    println!(
        "earned {} XP this session (level {})",
        progress.total_xp(),
        change.new_level
    );

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let watched = position.floor() as u64;
    app.gamification().add_watch_time(watched).await;
    if let Some(trail_id) = &args.trail_id {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let total = args.duration_seconds.floor() as u64;
        if let Err(err) = app
            .assessment()
            .update_video_progress(trail_id, &args.video_id, watched, Some(total))
            .await
        {
            warn!(error = %err, "failed to report video progress");
        }
    }

    let unsynced = app.journal().unsynced_outcomes(1_000).await?;
    if !unsynced.is_empty() {
        println!("{} outcome(s) recorded locally but not acknowledged by the backend", unsynced.len());
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trail_core::model::CheckpointId;

    fn checkpoint(options: &[&str], correct: usize) -> CheckpointQuestion {
        CheckpointQuestion::new(
            CheckpointId::new("c1").unwrap(),
            "Q",
            options.iter().map(|o| (*o).to_owned()).collect(),
            correct,
            10.0,
            None,
        )
        .unwrap()
    }

    #[test]
    fn wrong_policy_never_picks_the_correct_option() {
        let cp = checkpoint(&["a", "b", "c"], 0);
        assert_eq!(AnswerPolicy::Wrong.choose(&cp), Some(1));
        let cp = checkpoint(&["a", "b", "c"], 2);
        assert_eq!(AnswerPolicy::Wrong.choose(&cp), Some(0));
        let single = checkpoint(&["only"], 0);
        assert_eq!(AnswerPolicy::Wrong.choose(&single), None);
        assert_eq!(AnswerPolicy::Auto.choose(&single), Some(0));
    }

    #[test]
    fn answers_flag_accepts_each_policy() {
        for (raw, policy) in [
            ("auto", AnswerPolicy::Auto),
            ("wrong", AnswerPolicy::Wrong),
            ("skip", AnswerPolicy::Skip),
        ] {
            let mut argv = ["--video-id", "v1", "--answers", raw]
                .into_iter()
                .map(String::from);
            let args = Args::parse(&mut argv).unwrap();
            assert_eq!(args.answers, policy);
        }
        let mut argv = ["--video-id", "v1", "--answers", "random"]
            .into_iter()
            .map(String::from);
        assert!(matches!(
            Args::parse(&mut argv),
            Err(ArgsError::InvalidAnswers { .. })
        ));
    }
}
