use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use startup_funding::analysis::analyze;
use startup_funding::cli::{AnalyzeArgs, Cli, Command, ShowArgs};
use startup_funding::report::render_text;
use startup_funding::{load_file, Session};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    match cli.command {
        Command::Show(args) => run_show(args),
        Command::Analyze(args) => run_analyze(args),
    }
}

/// Load, filter and print the dashboard; optionally export the filtered rows.
fn run_show(args: ShowArgs) -> Result<()> {
    let mut session = Session::new().with_forecast_config(args.forecast_config());
    if let Some(dir) = &args.analysis_dir {
        session = session.with_analysis_dir(dir);
    }

    let mut view = session.open_default(&args.input);
    let events = session
        .dataset
        .as_ref()
        .map(|ds| args.filter_events(ds))
        .unwrap_or_default();
    for event in events {
        view = session.handle(event);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&view).context("serialising dashboard")?);
    } else {
        print!("{}", render_text(&view));
    }

    if let Some(path) = &args.export {
        let bytes = session
            .export_filtered()
            .context("nothing to export: no dataset loaded")?;
        std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
        log::info!("Filtered data written to {}", path.display());
    }

    Ok(())
}

/// Offline pre-computation of summary and investor tables.
fn run_analyze(args: AnalyzeArgs) -> Result<()> {
    let start = Instant::now();
    let dataset = load_file(&args.input)
        .with_context(|| format!("loading {}", args.input.display()))?;
    let outputs = analyze(&dataset, &args.out_dir)
        .with_context(|| format!("writing analysis to {}", args.out_dir.display()))?;

    for file in &outputs.files {
        println!("✓ {}", file.display());
    }
    if !outputs.investors_written {
        println!("Warning: no investor names found; skipped investor analysis.");
    }
    println!(
        "Analysis outputs saved to {} in {:.2}s",
        args.out_dir.display(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}
