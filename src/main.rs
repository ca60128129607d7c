//! clustercrop - batch cropping for scanned PDFs
//!
//! CLI entry point

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use clustercrop::{
    exit_codes,
    // CLI
    Cli, ClustersArgs, Commands, CropArgs,
    // Config
    Config,
    // Crop
    crop::{format_ratio_grid, parse_ratio_grid},
    CropError, OutputPage,
    // Session
    CancelToken, ClusterSet, CropSession, PageGeometrySource, PdfDocument, PdftoppmRenderer,
    PipelineError,
    // Progress
    ConsoleProgress, OutputMode, ProcessingStage, ProgressObserver,
    // Page ranges
    page_range::format_exclusions, parse_exclusions,
};
use tracing::{info, warn, Level};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Crop(args) => run_crop(&args),
        Commands::Clusters(args) => run_clusters(&args),
        Commands::Info => run_info(),
    };

    std::process::exit(match result {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            exit_code_for(&e)
        }
    });
}

fn init_logging(mode: OutputMode) {
    let level = match mode {
        OutputMode::Quiet => Level::ERROR,
        OutputMode::Normal => Level::WARN,
        OutputMode::Verbose => Level::INFO,
        OutputMode::VeryVerbose => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn exit_code_for(error: &anyhow::Error) -> i32 {
    for cause in error.chain() {
        match cause.downcast_ref::<PipelineError>() {
            Some(PipelineError::Cancelled) => return exit_codes::CANCELLED,
            Some(PipelineError::Crop(CropError::IncompleteCropDefinition { .. })) => {
                return exit_codes::INCOMPLETE_CROP
            }
            _ => {}
        }
        if let Some(CropError::IncompleteCropDefinition { .. }) = cause.downcast_ref::<CropError>()
        {
            return exit_codes::INCOMPLETE_CROP;
        }
    }
    exit_codes::GENERAL_ERROR
}

/// Cancel `token` on the first SIGINT/SIGTERM; a second one exits at once
fn cancel_on_signal(token: CancelToken) {
    let spawned = std::thread::Builder::new()
        .name("signal".into())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    warn!(error = %e, "signal handling unavailable");
                    return;
                }
            };
            runtime.block_on(async {
                if let Err(e) = wait_for_shutdown_signal().await {
                    warn!(error = %e, "signal handling unavailable");
                    return;
                }
                warn!("interrupted, stopping after the current page");
                token.cancel();
                if wait_for_shutdown_signal().await.is_ok() {
                    std::process::exit(exit_codes::CANCELLED);
                }
            });
        });
    if let Err(e) = spawned {
        warn!(error = %e, "failed to start signal thread");
    }
}

/// Returns when SIGINT or SIGTERM is received
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

/// Config from `--config`, else the usual lookup; unreadable files fall back to defaults
fn load_config(path: Option<&Path>) -> Config {
    let loaded = match path {
        Some(p) => Config::load_from_path(p),
        None => Config::load(),
    };
    loaded.unwrap_or_else(|e| {
        eprintln!("Warning: Failed to load config file: {}", e);
        Config::default()
    })
}

fn open_input(input: &Path) -> Result<PdfDocument> {
    if !input.exists() {
        eprintln!("Error: Input file does not exist: {}", input.display());
        std::process::exit(exit_codes::INPUT_NOT_FOUND);
    }
    PdfDocument::open(input).with_context(|| format!("Failed to open {}", input.display()))
}

fn exclusions(ranges: Option<&str>, page_count: usize) -> Result<BTreeSet<usize>> {
    match ranges {
        Some(s) => parse_exclusions(s, page_count).context("Invalid --exclude value"),
        None => Ok(BTreeSet::new()),
    }
}

// ============ Crop Command ============

fn run_crop(args: &CropArgs) -> Result<()> {
    let mode = if args.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::from_verbosity(args.verbose)
    };
    init_logging(mode);

    let config = load_config(args.config.as_deref()).merge_with_cli(&args.overrides());
    config.init_thread_pool();

    let mut pdf = open_input(&args.input)?;
    let excluded = exclusions(args.exclude.as_deref(), pdf.page_count())?;
    let progress = ConsoleProgress::new(mode);

    let mut session = CropSession::load(&pdf, excluded, config.session_options(), &progress)?;

    match &args.crop {
        Some(grid) => {
            let grid = parse_ratio_grid(grid)?;
            session.apply_ratio_grid(&grid)?;
        }
        None => {
            let mut renderer = PdftoppmRenderer::new(&args.input, config.render.dpi).context(
                "Crop detection needs pdftoppm (poppler-utils); install it or pass --crop",
            )?;
            let cancel = CancelToken::new();
            cancel_on_signal(cancel.clone());
            session.render_previews(&mut renderer, &progress, &cancel)?;
            session.propose_crops(&progress);
        }
    }

    if args.equalize {
        if let Some((width, height)) = session.equalize_crop_sizes() {
            info!(width, height, "equalized crop sizes");
        }
    }

    if let Some(dir) = &args.preview_dir {
        let written = session.save_previews(dir)?;
        if mode.should_show(OutputMode::Normal) {
            println!("Saved {} preview(s) to {}", written.len(), dir.display());
        }
    }

    session.split_crops(args.split, args.split_axis.into(), args.split_overlap);
    let pages = session.output_pages(&pdf, &progress)?;

    let output = args.output_path();
    if args.dry_run {
        progress.on_stage(ProcessingStage::Completed);
        print_crop_plan(&session, &pages, &output);
        return Ok(());
    }

    session.write(&mut pdf, &pages, &output, &progress)?;
    if mode.should_show(OutputMode::Normal) {
        println!(
            "Wrote {} pages ({} source pages) to {}",
            pages.len(),
            pdf.page_count(),
            output.display()
        );
    }
    Ok(())
}

fn print_crop_plan(session: &CropSession, pages: &[OutputPage], output: &Path) {
    let clusters = session.clusters();
    println!("=== Dry Run - Crop Plan ===");
    println!();
    if !session.excluded_pages().is_empty() {
        println!("Excluded pages: {}", format_exclusions(session.excluded_pages()));
        println!();
    }
    for (index, cluster) in clusters.iter().enumerate() {
        println!("Cluster {}: {}", index + 1, cluster);
        for ratio in cluster.crop_ratios() {
            println!(
                "  crop left={:.4} bottom={:.4} right={:.4} top={:.4}",
                ratio.left, ratio.bottom, ratio.right, ratio.top
            );
        }
    }
    println!();
    println!("Ratio grid: {}", format_ratio_grid(&clusters.all_ratios()));
    println!("Output pages: {}", pages.len());
    println!("Destination: {}", output.display());
}

// ============ Clusters Command ============

fn run_clusters(args: &ClustersArgs) -> Result<()> {
    init_logging(OutputMode::from_verbosity(args.verbose));

    let config = load_config(args.config.as_deref()).merge_with_cli(&args.overrides());
    let pdf = open_input(&args.input)?;
    let excluded = exclusions(args.exclude.as_deref(), pdf.page_count())?;
    let clusters = ClusterSet::from_source(&pdf, &excluded, config.clustering)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&clusters.summaries())?);
        return Ok(());
    }

    println!(
        "{}: {} pages in {} clusters",
        args.input.display(),
        clusters.page_count(),
        clusters.len()
    );
    for (index, cluster) in clusters.iter().enumerate() {
        println!();
        println!("Cluster {}: {}", index + 1, cluster);
    }
    Ok(())
}

// ============ Info Command ============

fn run_info() -> Result<()> {
    println!("clustercrop v{}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("System Information:");
    println!("  Platform: {}", std::env::consts::OS);
    println!("  Arch: {}", std::env::consts::ARCH);
    println!("  CPUs: {}", num_cpus::get());

    println!();
    println!("Renderer:");
    match which::which("pdftoppm") {
        Ok(path) => println!("  Poppler pdftoppm: {} (found)", path.display()),
        Err(_) => println!("  Poppler pdftoppm: Not found (crop detection unavailable)"),
    }

    println!();
    println!("Config File Locations:");
    for path in Config::search_paths() {
        let state = if path.is_file() { "found" } else { "not present" };
        println!("  {} ({})", path.display(), state);
    }

    Ok(())
}
