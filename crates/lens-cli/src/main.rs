mod export;
mod frames;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use lens_core::time::{file_stamp, now_unix_millis};
use lens_core::{
    Analysis, AnimationDriver, FrameInfo, LensParams, MemoryRecord, Mode, Role, TurnInput,
    parse_transcript, turns_to_transcript,
};
use lens_store::{CONFIG_FILE, Store};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::Serialize;

use crate::export::{TimelinePoint, find_best_window, signature, window_peaks};
use crate::frames::{frame_path, write_ppm};

#[derive(Parser)]
#[command(name = "lens", about = "Resonance lens: transcript curves, regimes and flow-field frames")]
struct Cli {
    /// Data directory (default: $LENS_DATA_DIR or ~/.resonance-lens)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file (default: <data dir>/lens.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a transcript and update the memory record
    Analyze {
        /// Transcript file (`.json` is read as a turn list)
        file: PathBuf,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,

        /// Seed for keyword graph placement
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Render frames with a fixed-step clock (idle without a transcript)
    Render {
        file: Option<PathBuf>,

        #[arg(long, default_value_t = 90)]
        frames: usize,

        #[arg(long, default_value_t = 30.0)]
        fps: f64,

        /// Output directory for PPM frames
        #[arg(long)]
        out: PathBuf,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Run the lens against the wall clock until interrupted
    Play {
        file: Option<PathBuf>,

        #[arg(long, default_value_t = 30.0)]
        fps: f64,

        /// Stop after this many seconds
        #[arg(long)]
        duration: Option<f64>,

        /// Write the last frame here on exit
        #[arg(long)]
        snapshot: Option<PathBuf>,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Find the strongest window of a warm-up run and write its frames
    Export {
        file: PathBuf,

        /// Window length in seconds
        #[arg(long, default_value_t = 3.5)]
        duration: f64,

        /// Seconds of animation scored before choosing the window
        #[arg(long, default_value_t = 8.0)]
        warmup: f64,

        #[arg(long, default_value_t = 30.0)]
        fps: f64,

        #[arg(long)]
        out: PathBuf,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Show or reset the persisted memory record
    Memory {
        #[arg(long)]
        reset: bool,

        #[arg(long)]
        json: bool,
    },
}

/// Rendering overrides shared by the frame-producing commands.
#[derive(Args, Clone)]
struct ViewArgs {
    #[arg(long)]
    width: Option<usize>,

    #[arg(long)]
    height: Option<usize>,

    /// Centre label text
    #[arg(long)]
    label: Option<String>,

    /// Mute the field and soften the graph
    #[arg(long)]
    locked: bool,

    /// Seed for keyword graph placement
    #[arg(long)]
    seed: Option<u64>,
}

impl ViewArgs {
    fn apply(&self, params: &LensParams) -> LensParams {
        let mut p = params.clone();
        if let Some(w) = self.width {
            p.render.width = w;
        }
        if let Some(h) = self.height {
            p.render.height = h;
        }
        if let Some(label) = &self.label {
            p.render.label = label.clone();
        }
        p.sanitized()
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Analyze { file, json, seed } => cmd_analyze(&cli, file, *json, *seed),
        Commands::Render {
            file,
            frames,
            fps,
            out,
            view,
        } => cmd_render(&cli, file.as_deref(), *frames, *fps, out, view),
        Commands::Play {
            file,
            fps,
            duration,
            snapshot,
            view,
        } => cmd_play(&cli, file.as_deref(), *fps, *duration, snapshot.as_deref(), view).await,
        Commands::Export {
            file,
            duration,
            warmup,
            fps,
            out,
            view,
        } => cmd_export(&cli, file, *duration, *warmup, *fps, out, view),
        Commands::Memory { reset, json } => cmd_memory(&cli, *reset, *json),
    }
}

// ---------------------------------------------------------------------------
// Session: config, store and memory record
// ---------------------------------------------------------------------------

struct Session {
    params: LensParams,
    store: Option<Store>,
}

impl Session {
    /// Load config (errors are fatal) and open the store (errors are logged;
    /// the run continues without persistence).
    fn open(cli: &Cli) -> Result<Self> {
        let data_dir = lens_store::resolve_data_dir(cli.data_dir.as_deref());
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join(CONFIG_FILE));
        let params = lens_store::load_params(&config_path)
            .with_context(|| format!("failed to load config {}", config_path.display()))?;

        let store = match lens_store::open_store(&data_dir) {
            Ok(store) => Some(store),
            Err(e) => {
                tracing::warn!("memory store unavailable, continuing in memory: {e}");
                None
            }
        };
        tracing::debug!(data_dir = %data_dir.display(), "session opened");
        Ok(Self { params, store })
    }

    fn load_memory(&self, now: u64) -> MemoryRecord {
        let Some(store) = &self.store else {
            return MemoryRecord::fresh(now);
        };
        match store.load_memory_record(now) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("failed to load memory record: {e}");
                MemoryRecord::fresh(now)
            }
        }
    }

    fn save_memory(&self, record: &MemoryRecord) {
        if let Some(store) = &self.store
            && let Err(e) = store.save_memory_record(record)
        {
            tracing::warn!("failed to persist memory record: {e}");
        }
    }

    fn checkpoint(&self) {
        if let Some(store) = &self.store
            && let Err(e) = store.checkpoint_truncate()
        {
            tracing::warn!("WAL checkpoint failed: {e}");
        }
    }
}

fn make_rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_os_rng(),
    }
}

/// Transcript input: plain role-tagged text, or a JSON turn list.
enum Input {
    Text(String),
    Turns(Vec<TurnInput>),
}

impl Input {
    fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            let turns: Vec<TurnInput> = serde_json::from_str(&content)
                .with_context(|| format!("failed to parse turn list {}", path.display()))?;
            Ok(Input::Turns(turns))
        } else {
            Ok(Input::Text(content))
        }
    }

    fn transcript(&self) -> String {
        match self {
            Input::Text(text) => text.clone(),
            Input::Turns(turns) => turns_to_transcript(turns),
        }
    }

    fn load(&self, driver: &mut AnimationDriver, rng: &mut SmallRng, now: u64) -> MemoryRecord {
        match self {
            Input::Text(text) => driver.load_transcript(text, rng, now),
            Input::Turns(turns) => driver.load_turns(turns, false, rng, now),
        }
    }
}

/// Build a driver and load `input` into it, persisting the updated record.
fn prepare_driver(
    session: &Session,
    params: &LensParams,
    input: Option<&Input>,
    seed: Option<u64>,
    memory: MemoryRecord,
    now: u64,
) -> AnimationDriver {
    let mut driver = AnimationDriver::new(params, memory);
    if let Some(input) = input {
        let mut rng = make_rng(seed);
        let updated = input.load(&mut driver, &mut rng, now);
        session.save_memory(&updated);
        tracing::info!(
            turns = driver.analysis().turn_count(),
            nodes = driver.graph_counts().nodes,
            edges = driver.graph_counts().edges,
            "transcript loaded"
        );
    }
    driver
}

// ---------------------------------------------------------------------------
// analyze
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct TurnReport {
    index: usize,
    role: Role,
    h: f64,
    s: f64,
    regime: String,
    text: String,
}

#[derive(Serialize)]
struct AnalyzeReport {
    turns: Vec<TurnReport>,
    nodes: usize,
    edges: usize,
    keywords: Vec<String>,
    memory_before: MemoryRecord,
    memory: MemoryRecord,
}

fn cmd_analyze(cli: &Cli, file: &Path, json: bool, seed: Option<u64>) -> Result<()> {
    let session = Session::open(cli)?;
    let input = Input::read(file)?;
    let now = now_unix_millis();
    let before = session.load_memory(now);

    let params = &session.params;
    let canvas = (params.render.width as f64, params.render.height as f64);
    let mut rng = make_rng(seed);
    let (analysis, memory) = Analysis::run(
        parse_transcript(&input.transcript()),
        before,
        &params.analysis,
        canvas,
        &mut rng,
        now,
    );
    session.save_memory(&memory);
    session.checkpoint();

    let regimes = analysis.regimes(&params.mode);
    let report = AnalyzeReport {
        turns: analysis
            .turns
            .iter()
            .enumerate()
            .map(|(i, turn)| TurnReport {
                index: i,
                role: turn.role,
                h: analysis.h_series[i],
                s: analysis.s_series[i],
                regime: regimes[i].label().to_string(),
                text: turn.text.clone(),
            })
            .collect(),
        nodes: analysis.graph.node_count(),
        edges: analysis.graph.edge_count(),
        keywords: analysis.graph.nodes.iter().map(|n| n.id.clone()).collect(),
        memory_before: before,
        memory,
    };

    if json {
        let out = serde_json::to_string_pretty(&report).context("failed to serialize report")?;
        println!("{out}");
        return Ok(());
    }

    println!("turns:      {}", report.turns.len());
    for t in &report.turns {
        println!(
            "  [{:>3}] {:<9} H={:.3} S={:.3} {}",
            t.index,
            t.role.tag(),
            t.h,
            t.s,
            t.regime
        );
    }
    println!("graph:      nodes={} edges={}", report.nodes, report.edges);
    if !report.keywords.is_empty() {
        println!("keywords:   {}", report.keywords.join(", "));
    }
    println!(
        "memory:     bias={:.3} vol={:.3} (was bias={:.3} vol={:.3})",
        memory.bias, memory.vol, before.bias, before.vol
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// render
// ---------------------------------------------------------------------------

fn frame_ms(index: usize, fps: f64) -> f64 {
    index as f64 * 1000.0 / fps
}

fn validate_fps(fps: f64) -> Result<f64> {
    if fps.is_finite() && fps > 0.0 && fps <= 240.0 {
        Ok(fps)
    } else {
        anyhow::bail!("fps must be in (0, 240], got {fps}")
    }
}

fn cmd_render(
    cli: &Cli,
    file: Option<&Path>,
    frames: usize,
    fps: f64,
    out: &Path,
    view: &ViewArgs,
) -> Result<()> {
    let fps = validate_fps(fps)?;
    let session = Session::open(cli)?;
    let params = view.apply(&session.params);
    let input = file.map(Input::read).transpose()?;
    let now = now_unix_millis();
    let memory = session.load_memory(now);

    let mut driver = prepare_driver(&session, &params, input.as_ref(), view.seed, memory, now);
    driver.set_locked(view.locked);

    std::fs::create_dir_all(out).with_context(|| format!("failed to create {}", out.display()))?;
    let mut last: Option<FrameInfo> = None;
    for i in 0..frames {
        let info = driver.tick(frame_ms(i, fps));
        write_ppm(&frame_path(out, i), driver.surface())?;
        last = Some(info);
    }
    session.checkpoint();

    println!("wrote {frames} frames to {}", out.display());
    if let Some(info) = last {
        println!("final:      {} H={:.3} S={:.3}", info.mode, info.h, info.s);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// play
// ---------------------------------------------------------------------------

/// Ctrl-C, plus SIGTERM on unix. Handlers are installed on construction.
struct Shutdown {
    #[cfg(unix)]
    term: tokio::signal::unix::Signal,
}

impl Shutdown {
    fn install() -> Result<Self> {
        Ok(Self {
            #[cfg(unix)]
            term: tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .context("failed to install SIGTERM handler")?,
        })
    }

    async fn wait(&mut self) {
        let ctrl_c = async {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        };
        #[cfg(unix)]
        {
            tokio::select! {
                _ = ctrl_c => tracing::info!("received Ctrl-C"),
                _ = self.term.recv() => tracing::info!("received SIGTERM"),
            }
        }
        #[cfg(not(unix))]
        {
            ctrl_c.await;
            tracing::info!("received Ctrl-C");
        }
    }
}

async fn until(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

async fn cmd_play(
    cli: &Cli,
    file: Option<&Path>,
    fps: f64,
    duration: Option<f64>,
    snapshot: Option<&Path>,
    view: &ViewArgs,
) -> Result<()> {
    let fps = validate_fps(fps)?;
    let session = Session::open(cli)?;
    let params = view.apply(&session.params);
    let input = file.map(Input::read).transpose()?;
    let now = now_unix_millis();
    let memory = session.load_memory(now);

    let mut driver = prepare_driver(&session, &params, input.as_ref(), view.seed, memory, now);
    driver.set_locked(view.locked);

    let mut shutdown = Shutdown::install()?;
    let mut interval = tokio::time::interval(Duration::from_secs_f64(1.0 / fps));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let start = tokio::time::Instant::now();
    let deadline = duration
        .filter(|d| d.is_finite() && *d >= 0.0)
        .map(|d| start + Duration::from_secs_f64(d));

    println!(
        "playing {}x{} at {fps} fps (Ctrl-C to stop)",
        params.render.width, params.render.height
    );

    let mut frames: u64 = 0;
    let mut last_mode: Option<Mode> = None;
    {
        let stop = shutdown.wait();
        tokio::pin!(stop);
        let end = until(deadline);
        tokio::pin!(end);
        loop {
            tokio::select! {
                _ = &mut stop => break,
                _ = &mut end => {
                    tracing::info!("duration elapsed");
                    break;
                }
                at = interval.tick() => {
                    let ts = at.duration_since(start).as_secs_f64() * 1000.0;
                    let info = driver.tick(ts);
                    frames += 1;
                    if last_mode != Some(info.mode) {
                        tracing::info!(mode = %info.mode, h = info.h, s = info.s, "mode");
                        last_mode = Some(info.mode);
                    }
                }
            }
        }
    }

    if let Some(path) = snapshot {
        write_ppm(path, driver.surface())?;
        println!("snapshot:   {}", path.display());
    }
    session.checkpoint();
    println!("played {frames} frames, final mode {}", driver.mode());
    Ok(())
}

// ---------------------------------------------------------------------------
// export
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ExportManifest {
    signature: String,
    start_t: f64,
    duration: f64,
    avg: f64,
    peak_h: f64,
    peak_s: f64,
    fps: f64,
    seed: u64,
    frames: usize,
}

fn cmd_export(
    cli: &Cli,
    file: &Path,
    duration: f64,
    warmup: f64,
    fps: f64,
    out: &Path,
    view: &ViewArgs,
) -> Result<()> {
    let fps = validate_fps(fps)?;
    if !(duration.is_finite() && duration > 0.0 && warmup.is_finite() && warmup >= duration) {
        anyhow::bail!("need 0 < duration <= warmup, got duration={duration} warmup={warmup}");
    }
    let session = Session::open(cli)?;
    let params = view.apply(&session.params);
    let input = Input::read(file)?;
    let now = now_unix_millis();
    let memory = session.load_memory(now);
    // one seed for both passes so the replay matches the scored run
    let seed = view.seed.unwrap_or_else(rand::random);

    let frame_count = (warmup * fps).ceil() as usize;

    let mut scout = prepare_driver(&session, &params, Some(&input), Some(seed), memory, now);
    scout.set_locked(view.locked);
    if scout.analysis().is_empty() {
        anyhow::bail!("{} contains no turns", file.display());
    }
    let timeline: Vec<TimelinePoint> = (0..frame_count)
        .map(|i| {
            let info = scout.tick(frame_ms(i, fps));
            TimelinePoint::new(info.elapsed, info.h, info.s)
        })
        .collect();

    let best = find_best_window(&timeline, duration)
        .context("warm-up too short to choose a window")?;
    let (peak_h, peak_s) = window_peaks(&timeline, &best);
    let sig = signature(&best, peak_h, peak_s);
    tracing::info!(start = best.start_t, avg = best.avg, signature = %sig, "best window");

    let dir = out.join(format!("resonance-lens_best_{sig}_{}", file_stamp(now)));
    std::fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let mut replay = AnimationDriver::new(&params, memory);
    input.load(&mut replay, &mut SmallRng::seed_from_u64(seed), now);
    replay.set_locked(view.locked);
    let mut written = 0;
    for i in 0..frame_count {
        let info = replay.tick(frame_ms(i, fps));
        if best.contains(info.elapsed) {
            write_ppm(&frame_path(&dir, written), replay.surface())?;
            written += 1;
        } else if info.elapsed > best.start_t + best.duration {
            break;
        }
    }

    let manifest = ExportManifest {
        signature: sig.clone(),
        start_t: best.start_t,
        duration: best.duration,
        avg: best.avg,
        peak_h,
        peak_s,
        fps,
        seed,
        frames: written,
    };
    let manifest_path = dir.join("manifest.json");
    let body = serde_json::to_string_pretty(&manifest).context("failed to serialize manifest")?;
    std::fs::write(&manifest_path, body)
        .with_context(|| format!("failed to write {}", manifest_path.display()))?;
    session.checkpoint();

    println!("signature:  {sig}");
    println!("window:     {:.2}s..{:.2}s", best.start_t, best.start_t + best.duration);
    println!("wrote {written} frames to {}", dir.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// memory
// ---------------------------------------------------------------------------

fn cmd_memory(cli: &Cli, reset: bool, json: bool) -> Result<()> {
    let session = Session::open(cli)?;
    let store = session
        .store
        .as_ref()
        .context("memory store unavailable")?;

    if reset {
        let existed = store
            .reset_memory_record()
            .context("failed to reset memory record")?;
        session.checkpoint();
        println!("{}", if existed { "memory reset" } else { "memory already empty" });
        return Ok(());
    }

    let stored = store
        .get_metadata(lens_store::MEMORY_KEY)
        .context("failed to read memory record")?
        .is_some();
    let record = session.load_memory(now_unix_millis());
    if json {
        println!("{}", record.to_json());
    } else {
        println!("bias:       {:.3}", record.bias);
        println!("vol:        {:.3}", record.vol);
        println!("last:       {}", record.last);
        println!("stored:     {}", if stored { "yes" } else { "no (defaults)" });
    }
    Ok(())
}
