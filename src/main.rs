//! loop-convert CLI entry point

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use loop_convert::driver::collect_sources;
use loop_convert::{Cli, ConvertConfig, LoopConverter, OutputFormat};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok((output, had_errors)) => {
            print!("{}", output);
            if had_errors {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

/// Logs go to stderr so reports on stdout stay machine-readable
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "loop_convert=debug"
    } else {
        "loop_convert=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> loop_convert::Result<(String, bool)> {
    let cwd = std::env::current_dir()?;
    let config = ConvertConfig::discover(cli.config.as_deref(), &cwd)?;
    let options = config.conversion_options(&cli.include_dirs, cli.no_includes, cli.count_only);

    let files = collect_sources(&cli.paths, cli.max_depth)?;
    tracing::info!("[RUN] Converting {} file(s)", files.len());

    let summary = LoopConverter::new(options).convert_files(&files);
    for error in &summary.errors {
        eprintln!("Error: {}: {}", error.path.display(), error.message);
    }

    let output = match cli.format {
        OutputFormat::Text => summary.to_text(),
        OutputFormat::Json => format!("{}\n", summary.to_json()?),
    };
    Ok((output, !summary.errors.is_empty()))
}
