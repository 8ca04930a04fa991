//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Search and download images in bulk with deduplication and resume.
///
/// Harvester walks the cartesian product of queries and filter
/// combinations against a Custom Search API, deduplicates downloaded
/// content by hash, and checkpoints after every work unit so an
/// interrupted or quota-exhausted run resumes exactly where it stopped.
#[derive(Parser, Debug)]
#[command(name = "harvester")]
#[command(author, version, about)]
pub struct Args {
    /// Path to a text file with one search query per line
    #[arg(long, default_value = "queries.txt")]
    pub queries: PathBuf,

    /// Maximum images to fetch per filter combination (1-100)
    #[arg(short = 'n', long, default_value_t = 100, value_parser = clap::value_parser!(u16).range(1..=100))]
    pub count: u16,

    /// Output directory for downloaded images
    #[arg(short, long, default_value = "./images")]
    pub output: PathBuf,

    /// Prefix for saved image filenames
    #[arg(long, default_value = "image")]
    pub prefix: String,

    /// Skip all filters (one work unit per query)
    #[arg(long, conflicts_with_all = ["date_only", "size_only"])]
    pub no_filters: bool,

    /// Use only date filters
    #[arg(long, conflicts_with_all = ["no_filters", "size_only"])]
    pub date_only: bool,

    /// Use only size filters
    #[arg(long, conflicts_with_all = ["no_filters", "date_only"])]
    pub size_only: bool,

    /// Ignore any existing checkpoint and start fresh
    #[arg(long)]
    pub fresh: bool,

    /// Path of the checkpoint file
    #[arg(long, default_value = "progress.json")]
    pub progress_file: PathBuf,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Resolves the filter-axis toggles into (use_date, use_size).
    ///
    /// Default is size filters only, matching the most useful harvest mode
    /// for image corpora.
    #[must_use]
    pub fn filter_axes(&self) -> (bool, bool) {
        if self.no_filters {
            (false, false)
        } else if self.date_only {
            (true, false)
        } else if self.size_only {
            (false, true)
        } else {
            (false, true)
        }
    }
}
