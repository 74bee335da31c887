// clonewatch/src/main.rs
//
// clonewatch: brand-clone phishing scoring from captured page artefacts.
//
// Two modes:
//   analyze  score one captured page, print the result JSON
//   replay   score a JSONL file of captured cases through one shared engine
//            and cache, dispatch results to output files, print a summary
//
// Usage:
//   clonewatch --mode analyze --url http://paypal-login.example --image shot.png \
//       --vision vision.json --judgment judgment.txt
//   clonewatch --mode replay --path cases.jsonl --output out/ --config clonewatch.json

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use clonewatch::cases::{load_cases, Case};
use clonewatch::engine::dispatcher::Dispatcher;
use clonewatch::engine::normalize::UpstreamJudgment;
use clonewatch::eval::{report, EvalSummary};
use clonewatch::events::VisionSignal;
use clonewatch::workers::{RecordedJudgment, RecordedVision};
use clonewatch::{AnalysisOutcome, AnalysisRequest, AppConfig, Decision, FingerprintCache, Pipeline};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name    = "clonewatch",
    about   = "Brand-clone phishing scoring engine",
    version = env!("CARGO_PKG_VERSION"),
)]
struct Cli {
    #[arg(long, value_enum, default_value = "replay")]
    mode: Mode,

    #[arg(long, help = "JSON config file (defaults apply when omitted)")]
    config: Option<PathBuf>,

    #[arg(long, default_value = "clonewatch=info",
          help = "Log filter used when RUST_LOG is unset")]
    log_level: String,

    // analyze
    #[arg(long, help = "Page URL (analyze mode)")]
    url: Option<String>,

    #[arg(long, help = "Page screenshot")]
    image: Option<PathBuf>,

    #[arg(long, default_value = "")]
    title: String,

    #[arg(long, help = "File holding the extracted page text")]
    page_text: Option<PathBuf>,

    #[arg(long, help = "Captured vision response (JSON)")]
    vision: Option<PathBuf>,

    #[arg(long, help = "Captured judgment reply (raw text or JSON)")]
    judgment: Option<PathBuf>,

    // replay
    #[arg(long, default_value = "/tmp/clonewatch_cases.jsonl",
          help = "JSONL file of captured cases (replay mode)")]
    path: PathBuf,

    #[arg(long, default_value = "/tmp/clonewatch_output",
          help = "Dispatch output directory")]
    output: PathBuf,

    #[arg(long, help = "Print the replay summary as JSON instead of markdown")]
    json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Analyze, // score one captured page
    Replay,  // score a JSONL file of captured cases
}

// ── analyze ───────────────────────────────────────────────────────────────────

async fn analyze(config: Arc<AppConfig>, args: Cli) -> Result<()> {
    let url = args.url.context("--url is required in analyze mode")?;
    let mut req = AnalysisRequest::new(url).with_title(args.title);
    if let Some(path) = &args.image {
        let bytes = tokio::fs::read(path).await
            .with_context(|| format!("cannot read image {}", path.display()))?;
        req = req.with_image(bytes);
    }
    if let Some(path) = &args.page_text {
        req = req.with_page_text(&read_text(path).await?);
    }

    let vision = match &args.vision {
        Some(path) => {
            let signal: VisionSignal = serde_json::from_str(&read_text(path).await?)
                .with_context(|| format!("cannot parse vision response {}", path.display()))?;
            RecordedVision::new(Ok(signal))
        }
        None => RecordedVision::new(Ok(VisionSignal::default())),
    };
    let reply = match &args.judgment {
        Some(path) => read_text(path).await?,
        None       => String::new(),
    };
    let judgment = RecordedJudgment::single(Ok(UpstreamJudgment::Text(reply)));

    let cache    = Arc::new(FingerprintCache::new(config.cache_ttl()));
    let pipeline = Pipeline::new(config, cache);
    let outcome  = pipeline.analyze(&req, &vision, &judgment).await;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

async fn read_text(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path).await
        .with_context(|| format!("cannot read {}", path.display()))
}

// ── replay ────────────────────────────────────────────────────────────────────

async fn replay(config: Arc<AppConfig>, args: Cli) -> Result<()> {
    let cases = load_cases(&args.path).await?;
    let base  = args.path.parent().map(Path::to_path_buf).unwrap_or_default();

    let cache      = Arc::new(FingerprintCache::new(config.cache_ttl()));
    let pipeline   = Arc::new(Pipeline::new(config, cache));
    let dispatcher = Arc::new(Dispatcher::new(&args.output)?);

    println!("  Mode: \x1b[93mREPLAY\x1b[0m  |  {}  cases={}", args.path.display(), cases.len());
    println!("  Output: \x1b[90m{}\x1b[0m", dispatcher.output_dir().display());
    let t = pipeline.config().thresholds;
    println!("  Bands: suspicious >= {}  clone >= {}\n", t.suspicious, t.clone);

    // one task per case; the cache is shared, so duplicates may race
    let mut handles = Vec::with_capacity(cases.len());
    for case in cases {
        let p    = Arc::clone(&pipeline);
        let d    = Arc::clone(&dispatcher);
        let base = base.clone();
        let line = case.line;
        handles.push((line, tokio::spawn(async move { run_case(case, &base, &p, &d).await })));
    }

    let mut summary = EvalSummary::new();
    for (line, handle) in handles {
        match handle.await {
            Ok(Ok((expected, outcome))) => summary.record(
                expected,
                outcome.payload.decision,
                outcome.cached,
                !outcome.payload.errors.is_empty(),
            ),
            Ok(Err(e)) => error!(line, error = %e, "case skipped"),
            Err(e)     => error!(line, error = %e, "case task failed"),
        }
    }

    info!(cases = summary.n_cases, labeled = summary.n_labeled, "replay finished");
    if args.json {
        println!("{}", report::to_json(&summary));
    } else {
        println!("\n{}", report::markdown(&summary));
    }
    Ok(())
}

async fn run_case(
    case:       Case,
    base:       &Path,
    pipeline:   &Pipeline,
    dispatcher: &Dispatcher,
) -> Result<(Option<Decision>, AnalysisOutcome)> {
    let req     = case.request(base).await?;
    let outcome = pipeline.analyze(&req, &case.vision_client(), &case.judgment_client()).await;
    dispatcher.dispatch(case.line, case.expected, &outcome).await?;
    print_result(case.line, &outcome);
    Ok((case.expected, outcome))
}

// ── Terminal output ───────────────────────────────────────────────────────────

fn print_result(line: usize, outcome: &AnalysisOutcome) {
    let p = &outcome.payload;
    let (color, icon) = match p.decision {
        Decision::Clone      => ("\x1b[91;1m", "🔴"),
        Decision::Suspicious => ("\x1b[93;1m", "🟡"),
        Decision::Clean      => ("\x1b[92m",   "🟢"),
    };
    let reset  = "\x1b[0m";
    let cached = if outcome.cached { " \x1b[90m[cached]\x1b[0m" } else { "" };

    println!("\n{}{} {} {:.1}{}{}", color, icon, p.decision, p.score, reset, cached);
    println!("  Case    : line {}", line);
    println!("  URL     : {}{}{}", color, p.url, reset);
    println!("  Brand   : {} (mismatch {:.0})", p.signals.brand_mismatch.brand, p.signals.brand_mismatch.score);
    println!("  Why     : {}", p.explanation);
    for (source, err) in &p.errors {
        println!("  \x1b[90m{source}: {err}\x1b[0m");
    }
}

// ── Main ──────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_)     => EnvFilter::try_new(&cli.log_level)
            .with_context(|| format!("invalid log filter {:?}", cli.log_level))?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let config = Arc::new(AppConfig::load(cli.config.as_deref())?);

    match cli.mode {
        Mode::Analyze => analyze(config, cli).await,
        Mode::Replay  => replay(config, cli).await,
    }
}
