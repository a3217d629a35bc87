use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use clap::{CommandFactory, Parser, Subcommand};
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::{Style, Term};
use devkit_core::{
    api::OllamaClient,
    audit::{run_audit, AuditRecord, DiskSpace},
    bench::{run_benchmarks, BenchmarkRecord},
    health::{run_healthcheck, HealthReport},
    inventory::audit_models,
    model::{BenchmarkOutcome, ModelDescriptor},
    optimize::{run_optimization, OptimizationRecord, OptimizationStatus},
    probe::HttpProbe,
    suites::{run_tests, Suite, SuiteStatus, TestRecord},
    ReportStore, Reporter, SystemRunner, ToolkitConfig, TracingReporter,
};
use serde::Serialize;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

// ── Palette ──────────────────────────────────────────────────────────

fn s_header() -> Style { Style::new().color256(220).bold() }  // sun, bold
fn s_dim() -> Style    { Style::new().color256(248) }         // light gray
fn s_tree() -> Style   { Style::new().color256(245) }         // mid gray
fn s_hint() -> Style   { Style::new().color256(243) }         // soft gray
fn s_ok() -> Style     { Style::new().color256(114) }         // green
fn s_warn() -> Style   { Style::new().color256(202) }         // heat
fn s_err() -> Style    { Style::new().color256(160) }         // blood
fn s_bold() -> Style   { Style::new().bold() }
fn s_label() -> Style  { Style::new().color256(146) }         // muted lavender

fn sep(width: usize) -> String {
    s_tree().apply_to("\u{2500}".repeat(width)).to_string()
}

fn status_str(ok: bool, yes: &str, no: &str) -> String {
    if ok {
        s_ok().apply_to(yes).to_string()
    } else {
        s_err().apply_to(no).to_string()
    }
}

// ── CLI Args ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "devkit",
    about = "Audit, benchmark, optimize and test a multi-service local dev environment",
    version,
    after_help = "examples:\n  \
        devkit debug                  (environment audit)\n  \
        devkit test --backend         (backend suite only)\n  \
        devkit test --all             (every service)\n  \
        devkit bench                  (latency and telemetry snapshot)\n  \
        devkit models                 (benchmark installed LLMs)\n  \
        devkit health                 (exit non-zero if a service is down)"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (default: <root>/devkit.toml, then the user config dir)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Project root
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Debug-level logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Print the record as JSON on stdout
    #[arg(long, short, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run system diagnostics and audits.
    Debug,
    /// Apply system optimizations and profiling.
    Optimize,
    /// Execute integrated test suites.
    Test {
        /// Run all service tests
        #[arg(long)]
        all: bool,
        /// Run Rust backend tests
        #[arg(long)]
        backend: bool,
    },
    /// Gather latency and throughput metrics.
    Bench,
    /// Benchmark every model installed on the local inference server.
    Models,
    /// Audit, then fail if an essential service is not running.
    Health,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        // Nothing to do: show usage and succeed.
        let _ = Cli::command().print_help();
        println!();
        std::process::exit(0);
    };

    let config = match ToolkitConfig::load(cli.config.as_deref(), &cli.root) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", s_err().apply_to(format!("error: {e}")));
            std::process::exit(1);
        }
    };
    init_tracing(cli.verbose, &config.logs_path());
    match config.source() {
        Some(path) => tracing::debug!(path = %path.display(), "loaded config"),
        None => tracing::debug!("using default config"),
    }

    let log = TracingReporter::new("CORE");
    log.info("Initializing devkit");

    let ctx = Ctx {
        store: ReportStore::new(config.reports_path()),
        config,
        json: cli.json,
    };

    let result = match command {
        Commands::Debug => cmd_debug(&ctx).await,
        Commands::Optimize => cmd_optimize(&ctx).await,
        Commands::Test { all, backend } => cmd_test(&ctx, all, backend).await,
        Commands::Bench => cmd_bench(&ctx).await,
        Commands::Models => cmd_models(&ctx).await,
        Commands::Health => cmd_health(&ctx).await,
    };

    if let Err(e) = result {
        log.error(&format!("Command execution failed: {e:#}"));
        eprintln!("{}", s_err().apply_to(format!("error: {e:#}")));
        std::process::exit(1);
    }
}

struct Ctx {
    config: ToolkitConfig,
    store: ReportStore,
    json: bool,
}

impl Ctx {
    /// Persist a record, then either dump it as JSON or let the caller print
    /// its own summary.
    fn finish<T: Serialize>(&self, record: &T, name: &str, log: &dyn Reporter) -> anyhow::Result<bool> {
        let path = self.store.save(record, name)?;
        log.success(&format!("Report saved: {}", path.display()));
        if self.json {
            println!("{}", serde_json::to_string_pretty(record)?);
            return Ok(false);
        }
        println!("  {}", s_hint().apply_to(format!("report: {}", path.display())));
        Ok(true)
    }
}

// ── Logging ──────────────────────────────────────────────────────────

fn init_tracing(verbose: bool, logs_dir: &Path) {
    let level = if verbose { "debug" } else { "info" };
    let filter = || {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("devkit={level},devkit_core={level}")))
    };

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_filter(filter());

    // The audit log is best-effort: a read-only tree still gets console output.
    let file = std::fs::create_dir_all(logs_dir)
        .and_then(|_| {
            let name = format!("devkit_{}.log", chrono::Local::now().format("%Y%m%d"));
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(logs_dir.join(name))
        })
        .ok()
        .map(|f| {
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(f))
                .with_filter(filter())
        });

    tracing_subscriber::registry().with(console).with(file).init();
}

// ── Debug ────────────────────────────────────────────────────────────

async fn cmd_debug(ctx: &Ctx) -> anyhow::Result<()> {
    let log = TracingReporter::new("DEBUG");
    let audit = run_audit(&ctx.config, &SystemRunner, &log).await?;
    if ctx.finish(&audit, "audit_report", &log)? {
        print_audit(&audit);
    }
    Ok(())
}

fn print_audit(audit: &AuditRecord) {
    println!();
    println!("{}", s_header().apply_to("system audit"));
    println!("{}", sep(64));

    if audit.containers.is_empty() {
        println!("  {:<18} {}", s_label().apply_to("containers"), s_dim().apply_to("none found"));
    }
    for (name, status) in &audit.containers {
        let up = status.to_lowercase().contains("up");
        println!(
            "  {:<18} {:<30} {}",
            s_label().apply_to("container"),
            s_bold().apply_to(name),
            status_str(up, status, status),
        );
    }

    println!(
        "  {:<18} {}",
        s_label().apply_to("env file"),
        status_str(
            audit.env_validation.exists,
            "present",
            &format!("missing ({})", audit.env_validation.path.display()),
        )
    );

    let disk = match &audit.disk_space {
        DiskSpace::Usage {
            total_gb,
            used_gb,
            free_gb,
        } => format!("{free_gb} GB free of {total_gb} GB ({used_gb} GB used)"),
        DiskSpace::Unavailable { error } => s_warn().apply_to(format!("unavailable: {error}")).to_string(),
    };
    println!("  {:<18} {}", s_label().apply_to("disk"), disk);
    println!("{}", sep(64));
}

// ── Optimize ─────────────────────────────────────────────────────────

async fn cmd_optimize(ctx: &Ctx) -> anyhow::Result<()> {
    let log = TracingReporter::new("OPTIMIZE");
    let record = run_optimization(&ctx.config, &SystemRunner, &log).await;
    if ctx.finish(&record, "optimization_report", &log)? {
        print_optimization(&record);
    }
    Ok(())
}

fn print_optimization(record: &OptimizationRecord) {
    println!();
    println!("{}", s_header().apply_to("optimization pass"));
    println!("{}", sep(64));
    let status = match record.status {
        OptimizationStatus::Skipped => s_dim().apply_to("skipped (no cleanup steps configured)"),
        OptimizationStatus::Completed => s_ok().apply_to("completed"),
        OptimizationStatus::CompletedWithFailures => s_warn().apply_to("completed with failures"),
    };
    println!("  {:<18} {}", s_label().apply_to("status"), status);
    for (step, result) in &record.cleanup_results {
        println!(
            "  {:<18} {}",
            s_bold().apply_to(step),
            status_str(result == "OK", result, result)
        );
    }
    for (name, usage) in &record.memory_snapshot {
        println!("  {:<18} {}", s_label().apply_to(name), s_dim().apply_to(usage));
    }
    println!("{}", sep(64));
}

// ── Test ─────────────────────────────────────────────────────────────

async fn cmd_test(ctx: &Ctx, all: bool, backend: bool) -> anyhow::Result<()> {
    let log = TracingReporter::new("TEST");
    let suites = Suite::select(all, backend);
    let record = run_tests(&ctx.config, &SystemRunner, &suites, &log).await;
    if ctx.finish(&record, "test_report", &log)? {
        print_tests(&record);
    }
    Ok(())
}

fn print_tests(record: &TestRecord) {
    println!();
    println!(
        "{}  {}",
        s_header().apply_to("test suites"),
        s_dim().apply_to(&record.summary)
    );
    println!("{}", sep(64));
    if record.detailed.is_empty() {
        println!("  {}", s_hint().apply_to("nothing ran; pass --all or --backend"));
    }
    for r in &record.detailed {
        let passed = r.status == SuiteStatus::Passed;
        println!(
            "  {:<18} {}",
            s_bold().apply_to(&r.module),
            status_str(passed, "PASSED", "FAILED")
        );
    }
    println!("{}", sep(64));
    println!(
        "  {} passed, {} failed",
        s_ok().apply_to(record.passed),
        if record.failed > 0 {
            s_err().apply_to(record.failed)
        } else {
            s_dim().apply_to(record.failed)
        }
    );
}

// ── Bench ────────────────────────────────────────────────────────────

async fn cmd_bench(ctx: &Ctx) -> anyhow::Result<()> {
    let log = TracingReporter::new("BENCH");
    let probe = HttpProbe::new(Duration::from_secs(5))?;
    let record = run_benchmarks(&ctx.config, &SystemRunner, &probe, &log).await;
    if ctx.finish(&record, "benchmark_report", &log)? {
        print_bench(&record);
    }
    Ok(())
}

fn print_bench(record: &BenchmarkRecord) {
    println!();
    println!("{}", s_header().apply_to("performance baseline"));
    println!("{}", sep(64));
    for (name, value) in &record.latency_metrics {
        let styled = match value.as_str() {
            "Online" => s_ok().apply_to(value).to_string(),
            "Offline" => s_err().apply_to(value).to_string(),
            _ => s_dim().apply_to(value).to_string(),
        };
        println!("  {:<30} {}", s_label().apply_to(name), styled);
    }
    match &record.visual_metrics {
        Some(vm) => println!(
            "  {:<30} {} FPS @ {}",
            s_label().apply_to("visual"),
            s_bold().apply_to(vm.fps),
            vm.resolution
        ),
        None => println!("  {:<30} {}", s_label().apply_to("visual"), s_dim().apply_to("unavailable")),
    }
    match &record.ai_metrics {
        Some(m) => {
            let latency = m.get("avg_latency_ms").and_then(|v| v.as_f64()).unwrap_or(0.0);
            let hits = m.get("cache_hits").and_then(|v| v.as_u64()).unwrap_or(0);
            println!(
                "  {:<30} {latency:.2} ms latency, {hits} cache hits",
                s_label().apply_to("ai pipeline")
            );
        }
        None => println!("  {:<30} {}", s_label().apply_to("ai pipeline"), s_dim().apply_to("unavailable")),
    }
    println!("{}", sep(64));
}

// ── Models ───────────────────────────────────────────────────────────

async fn cmd_models(ctx: &Ctx) -> anyhow::Result<()> {
    let log = TracingReporter::new("MODELS");
    let inference = &ctx.config.inference;
    let client = OllamaClient::new(&inference.url, Duration::from_secs(inference.timeout_secs))?;

    let term = Term::stderr();
    if term.is_term() && !ctx.json {
        term.write_line(&format!("{}", s_dim().apply_to("benchmarking installed models...")))?;
    }
    let models = audit_models(&client, &log).await;

    #[derive(Serialize)]
    struct ModelAuditRecord<'a> {
        inference_url: &'a str,
        models: &'a [ModelDescriptor],
    }
    let record = ModelAuditRecord {
        inference_url: client.base_url(),
        models: &models,
    };
    if ctx.finish(&record, "model_audit", &log)? {
        print_models(&models);
    }
    Ok(())
}

fn print_models(models: &[ModelDescriptor]) {
    println!();
    println!("{}", s_header().apply_to("installed models"));
    if models.is_empty() {
        println!("  {}", s_dim().apply_to("no models found (is the inference server running?)"));
        return;
    }

    let mut table = Table::new();
    table.load_preset(presets::NOTHING);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("  Model").fg(Color::AnsiValue(243)),
        Cell::new("Size").fg(Color::AnsiValue(243)),
        Cell::new("Family").fg(Color::AnsiValue(243)),
        Cell::new("Quant").fg(Color::AnsiValue(243)),
        Cell::new("Tok/s").fg(Color::AnsiValue(243)),
        Cell::new("Load").fg(Color::AnsiValue(243)),
    ]);

    for m in models {
        let (tps, load, tps_color) = match &m.metrics {
            BenchmarkOutcome::Success {
                tokens_per_second,
                load_duration_seconds,
                ..
            } => (
                format!("{tokens_per_second:.1}"),
                format!("{load_duration_seconds:.2}s"),
                match *tokens_per_second {
                    t if t >= 30.0 => Color::AnsiValue(114),
                    t if t >= 10.0 => Color::AnsiValue(214),
                    _ => Color::AnsiValue(208),
                },
            ),
            BenchmarkOutcome::Failure { reason } => {
                (reason.clone(), String::new(), Color::AnsiValue(167))
            }
        };
        table.add_row(vec![
            Cell::new(format!("  {}", m.name)).fg(Color::AnsiValue(252)),
            Cell::new(format!("{:.1} GB", m.size_gb)).fg(Color::AnsiValue(248)),
            Cell::new(m.detail_str("family").unwrap_or("")).fg(Color::AnsiValue(146)),
            Cell::new(m.detail_str("quantization_level").unwrap_or("")).fg(Color::AnsiValue(139)),
            Cell::new(tps).fg(tps_color),
            Cell::new(load).fg(Color::AnsiValue(248)),
        ]);
    }
    println!("{table}");
}

// ── Health ───────────────────────────────────────────────────────────

async fn cmd_health(ctx: &Ctx) -> anyhow::Result<()> {
    let log = TracingReporter::new("HEALTH");
    let result = run_healthcheck(&ctx.config, &SystemRunner, &log).await;
    if ctx.json {
        let report = HealthReport::from_result(&result);
        println!("{}", serde_json::to_string_pretty(&report)?);
        if report.exit_code != 0 {
            std::process::exit(report.exit_code);
        }
        return Ok(());
    }
    match result {
        Ok(_) => {
            println!("{}", s_ok().apply_to("System Health: OPTIMAL"));
            Ok(())
        }
        Err(e) => {
            println!("{}", s_err().apply_to(&e));
            std::process::exit(e.exit_code());
        }
    }
}
