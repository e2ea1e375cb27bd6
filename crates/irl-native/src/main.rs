use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use irl_engine::{CalibrationStore, GameSession, Locator, PracticeOverlay, Roster, SessionConfig};
use irl_native::{
    ImageSequenceSource, NullSink, PngSequenceSink, RenderSink, SessionRunner, VideoSource,
};

#[derive(Parser)]
#[command(name = "pool-irl", version, about = "Vision-tracked billiards turn engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a session against a directory of frames, a camera or a video file
    Play {
        /// Directory of frame images, played in file-name order
        #[arg(long, required_unless_present_any = ["camera", "video"], conflicts_with_all = ["camera", "video"])]
        frames: Option<PathBuf>,

        /// Capture device index (needs the `camera` feature)
        #[arg(long, conflicts_with = "video")]
        camera: Option<i32>,

        /// Video file read through the capture backend (needs the `camera` feature)
        #[arg(long)]
        video: Option<PathBuf>,

        /// Directory for annotated frames (discarded when absent)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Calibration file, created with defaults if missing
        #[arg(long, default_value = "data.txt")]
        calibration: PathBuf,

        /// Session config JSON
        #[arg(long)]
        config: Option<PathBuf>,

        /// Stop after this many ticks (runs until killed when absent)
        #[arg(long)]
        ticks: Option<u64>,

        /// Tick numbers at which to end the player's turn
        #[arg(long = "end-turn-at")]
        end_turn_at: Vec<u64>,
    },

    /// Write threshold and mask previews of one ball for a frame
    Calibrate {
        /// Frame image to preview against
        #[arg(long)]
        frame: PathBuf,

        /// Ball name from the roster
        #[arg(long)]
        ball: String,

        /// Calibration file, created with defaults if missing
        #[arg(long, default_value = "data.txt")]
        calibration: PathBuf,

        /// Session config JSON (for the detection gate and kernel size)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory for thresh.png and mask.png
        #[arg(long)]
        out: PathBuf,
    },

    /// Write a default calibration file
    InitCalibration {
        #[arg(long, default_value = "data.txt")]
        calibration: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Ghost saved frames over a frame sequence
    Practice {
        /// Directory of frame images
        #[arg(long)]
        frames: PathBuf,

        /// Directory for composed frames
        #[arg(long)]
        out: PathBuf,

        /// Tick numbers at which to save a snapshot
        #[arg(long = "snapshot-at")]
        snapshot_at: Vec<u64>,

        /// Snapshot blend weight
        #[arg(long, default_value_t = 0.2)]
        opacity: f32,

        /// Number of ticks (defaults to one pass over the frames)
        #[arg(long)]
        ticks: Option<u64>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            frames,
            camera,
            video,
            out,
            calibration,
            config,
            ticks,
            end_turn_at,
        } => {
            let input = match (frames, camera, video) {
                (Some(dir), _, _) => Input::Frames(dir),
                (None, Some(index), _) => Input::Camera(index),
                (None, None, Some(path)) => Input::Video(path),
                (None, None, None) => bail!("one of --frames, --camera or --video is required"),
            };
            let play = PlayArgs {
                out,
                calibration,
                config,
                ticks,
                end_turn_at,
            };
            cmd_play(input, &play)
        }

        Commands::Calibrate {
            frame,
            ball,
            calibration,
            config,
            out,
        } => cmd_calibrate(&frame, &ball, &calibration, config.as_deref(), &out),

        Commands::InitCalibration { calibration, force } => cmd_init_calibration(&calibration, force),

        Commands::Practice {
            frames,
            out,
            snapshot_at,
            opacity,
            ticks,
        } => cmd_practice(&frames, &out, &snapshot_at, opacity, ticks),
    }
}

fn load_config(path: Option<&Path>) -> Result<SessionConfig> {
    match path {
        Some(path) => SessionConfig::load(path)
            .with_context(|| format!("loading session config {}", path.display())),
        None => Ok(SessionConfig::default()),
    }
}

enum Input {
    Frames(PathBuf),
    Camera(i32),
    Video(PathBuf),
}

struct PlayArgs {
    out: Option<PathBuf>,
    calibration: PathBuf,
    config: Option<PathBuf>,
    ticks: Option<u64>,
    end_turn_at: Vec<u64>,
}

fn cmd_play(input: Input, args: &PlayArgs) -> Result<()> {
    match input {
        Input::Frames(dir) => {
            let source = ImageSequenceSource::open(&dir)
                .with_context(|| format!("opening frames in {}", dir.display()))?;
            play(source, args)
        }
        #[cfg(feature = "camera")]
        Input::Camera(index) => {
            let source = irl_native::CameraSource::open(index)
                .with_context(|| format!("opening camera {}", index))?;
            play(source, args)
        }
        #[cfg(feature = "camera")]
        Input::Video(path) => {
            let source = irl_native::CameraSource::open_file(&path)
                .with_context(|| format!("opening video {}", path.display()))?;
            play(source, args)
        }
        #[cfg(not(feature = "camera"))]
        Input::Camera(_) | Input::Video(_) => {
            bail!("this build has no capture support (rebuild with --features camera)")
        }
    }
}

fn play<S: VideoSource>(source: S, args: &PlayArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let mut roster = Roster::default();
    CalibrationStore::load_or_create(&args.calibration, &roster)
        .with_context(|| format!("loading calibration {}", args.calibration.display()))?
        .apply_to(&mut roster);

    let (width, height) = source.dimensions();
    let session = GameSession::new(config, roster, width, height);

    match &args.out {
        Some(dir) => {
            let sink = PngSequenceSink::create(dir)
                .with_context(|| format!("creating output directory {}", dir.display()))?;
            run_session(session, source, sink, args)
        }
        None => run_session(session, source, NullSink::default(), args),
    }
}

fn run_session<S: VideoSource, K: RenderSink>(
    session: GameSession,
    source: S,
    sink: K,
    args: &PlayArgs,
) -> Result<()> {
    let mut runner = SessionRunner::new(session, source, sink)?;
    for &tick in &args.end_turn_at {
        runner.schedule_end_turn(tick);
    }
    let result = runner.run(args.ticks);
    let session = runner.shutdown();
    let ran = result.context("running session")?;
    log::info!("Finished {} ticks in state {}", ran, session.state());
    Ok(())
}

fn cmd_calibrate(
    frame: &Path,
    ball: &str,
    calibration: &Path,
    config: Option<&Path>,
    out: &Path,
) -> Result<()> {
    let config = load_config(config)?;
    let roster = Roster::default();
    roster.id_of(ball)?;
    let store = CalibrationStore::load_or_create(calibration, &roster)
        .with_context(|| format!("loading calibration {}", calibration.display()))?;
    let Some(range) = store.get(ball) else {
        bail!("calibration has no entry for {}", ball);
    };

    let image = image::open(frame)
        .with_context(|| format!("reading frame {}", frame.display()))?
        .to_rgb8();
    let locator = Locator::new(config.min_radius, config.kernel_size);
    let (thresh, mask) = locator.preview(&image, &range);

    std::fs::create_dir_all(out).with_context(|| format!("creating {}", out.display()))?;
    thresh.save(out.join("thresh.png")).context("writing thresh.png")?;
    mask.save(out.join("mask.png")).context("writing mask.png")?;

    match locator.locate_in_mask(&mask) {
        Some(det) => log::info!(
            "{} at ({:.1}, {:.1}) radius {:.1}",
            ball,
            det.position.x,
            det.position.y,
            det.radius
        ),
        None => log::info!("{} not detected with {:?}", ball, range.bounds()),
    }
    Ok(())
}

fn cmd_init_calibration(calibration: &Path, force: bool) -> Result<()> {
    if calibration.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", calibration.display());
    }
    CalibrationStore::defaults(&Roster::default())
        .save(calibration)
        .with_context(|| format!("writing {}", calibration.display()))?;
    Ok(())
}

fn cmd_practice(
    frames: &Path,
    out: &Path,
    snapshot_at: &[u64],
    opacity: f32,
    ticks: Option<u64>,
) -> Result<()> {
    let mut source = ImageSequenceSource::open(frames)
        .with_context(|| format!("opening frames in {}", frames.display()))?;
    let mut sink = PngSequenceSink::create(out)
        .with_context(|| format!("creating output directory {}", out.display()))?;
    let snapshot_at: BTreeSet<u64> = snapshot_at.iter().copied().collect();
    let ticks = ticks.unwrap_or(source.len() as u64);

    let mut practice = PracticeOverlay::new();
    practice.set_opacity(opacity);
    for tick in 0..ticks {
        let frame = source.read_frame()?;
        if snapshot_at.contains(&tick) {
            practice.save(&frame, tick);
        }
        sink.present(tick, &practice.compose(&frame))?;
    }

    if let Err(e) = source.release() {
        log::error!("Failed to release video source: {}", e);
    }
    sink.close()?;
    Ok(())
}
