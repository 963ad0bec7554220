//! CLI argument definitions using clap

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Convert counting loops over fixed-size arrays into range-based for loops
#[derive(Parser, Debug)]
#[command(name = "loop-convert")]
#[command(about = "Rewrites `for (int i = 0; i < N; ++i)` array loops as range-based for loops")]
#[command(version)]
pub struct Cli {
    /// C++ files or directories to convert
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Count convertible loops without rewriting any file
    #[arg(long)]
    pub count_only: bool,

    /// Report format
    #[arg(short, long, default_value = "text", value_enum)]
    pub format: OutputFormat,

    /// Config file (defaults to ./loop-convert.toml when present)
    #[arg(short, long, env = "LOOP_CONVERT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Additional directory searched for quoted includes
    #[arg(short = 'I', long = "include-dir", value_name = "DIR")]
    pub include_dirs: Vec<PathBuf>,

    /// Do not follow #include directives
    #[arg(long)]
    pub no_includes: bool,

    /// Maximum directory depth when walking directories
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Log every loop decision to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Three counter lines
    #[default]
    Text,
    /// Counters, rejection reasons and per-loop results
    Json,
}
