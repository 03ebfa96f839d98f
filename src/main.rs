use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use taskbench::{build_plan, PlanOptions, Summary};
use taskbench_core::{Config, Rate, RunData, Task};

#[derive(Parser)]
#[command(
    name = "taskbench",
    about = "Run a task-sequence benchmark and print per-task statistics"
)]
struct Cli {
    /// TOML config layered over the built-in defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override a setting, e.g. `content.source=generated` or
    /// `docs_per_thread=500` (bare names go to `[props]`). Repeatable.
    #[arg(long = "set", value_name = "KEY=VALUE")]
    set: Vec<String>,

    /// Parallel populate loops.
    #[arg(long, default_value_t = 4)]
    threads: u32,

    /// Pace each populate loop: N, N/sec or N/min.
    #[arg(long)]
    rate: Option<String>,

    /// Drain the content source for this many seconds after populating.
    #[arg(long)]
    duration: Option<f64>,

    /// Print the summary as JSON instead of a table.
    #[arg(long)]
    json: bool,

    /// Log scheduling decisions (debug level) to stderr.
    #[arg(long)]
    debug: bool,
}

fn parse_override(raw: &str) -> anyhow::Result<(String, String)> {
    let (key, value) = raw
        .split_once('=')
        .with_context(|| format!("--set expects KEY=VALUE, got {raw:?}"))?;
    let key = key.trim();
    anyhow::ensure!(!key.is_empty(), "--set expects KEY=VALUE, got {raw:?}");
    let key = if key.contains('.') {
        key.to_string()
    } else {
        format!("props.{key}")
    };
    Ok((key, value.trim().to_string()))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_thread_names(true)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("RUST_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    let overrides = cli
        .set
        .iter()
        .map(|raw| parse_override(raw))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let config = Config::load(cli.config.as_deref(), &overrides)?;

    let mut opts = PlanOptions::default()
        .with_threads(cli.threads)
        .with_docs_per_thread(config.get("docs_per_thread", 1000u32)?);
    if let Some(rate) = &cli.rate {
        opts = opts.with_rate(rate.parse::<Rate>()?);
    }
    if let Some(secs) = cli.duration {
        anyhow::ensure!(secs > 0.0, "--duration must be a positive number of seconds");
        let drain = Duration::try_from_secs_f64(secs)
            .with_context(|| format!("--duration {secs} is out of range"))?;
        opts = opts.with_drain(drain);
    }

    let content = taskbench_feeds::open_content_source(&config.content)?;
    let run_data = Arc::new(RunData::new(config, content));
    let mut plan = build_plan(&run_data, &opts)?;

    if cli.json {
        tracing::debug!(plan = %plan, "benchmark plan");
    } else {
        println!("{plan}\n");
    }

    tracing::info!(threads = opts.threads, rate = ?opts.rate, drain = ?opts.drain, "benchmark started");
    let total = plan.run_and_maybe_stats(true)?;
    plan.close()?;
    run_data.close()?;
    tracing::info!(
        total,
        docs = run_data.index().num_docs(),
        "benchmark finished"
    );

    let summary = Summary::collect(run_data.points())?;
    if cli.json {
        println!("{}", summary.to_json()?);
    } else {
        print!("{summary}");
    }
    Ok(())
}
