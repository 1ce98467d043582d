use crate::cache::CacheStore;
use crate::collect::{self, Refined};
use crate::config::{default_processes, CollectorConfig, DEFAULT_MAX_EXT_LENGTH};
use crate::git::GitRepo;
use crate::snapshot::Snapshot;
use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use console::{style, Term};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gitstats")]
#[command(about = "History statistics for a git repository: activity, authors, churn, extensions and tags")]
#[command(version)]
pub struct Cli {
    #[clap(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Clone)]
pub struct CommonArgs {
    #[arg(long, help = "Path to git repository")]
    pub repo: Option<PathBuf>,

    #[arg(long, help = "Directory holding the fact cache (default: <git-dir>/gitstats)")]
    pub cache: Option<PathBuf>,

    #[arg(long, help = "Worker count for per-tree and per-blob queries")]
    pub processes: Option<usize>,

    #[arg(long, help = "Longest extension kept as its own bucket", default_value_t = DEFAULT_MAX_EXT_LENGTH)]
    pub max_ext_length: usize,

    #[arg(long, help = "Walk merges in full for project churn instead of first parents only")]
    pub no_linear_linestats: bool,

    #[arg(long, help = "Exclude history reachable from this revision")]
    pub commit_begin: Option<String>,

    #[arg(long, help = "Analyse history up to this revision (default: HEAD)")]
    pub commit_end: Option<String>,

    #[arg(long, help = "Only commits after this date (any form git's --since accepts)")]
    pub start_date: Option<String>,

    #[arg(long, short, help = "Only log errors and hide progress bars")]
    pub quiet: bool,
}

impl CommonArgs {
    pub fn collector_config(&self) -> CollectorConfig {
        CollectorConfig {
            processes: self.processes.unwrap_or_else(default_processes).max(1),
            max_ext_length: self.max_ext_length,
            linear_linestats: !self.no_linear_linestats,
            commit_begin: self.commit_begin.clone(),
            commit_end: self.commit_end.clone(),
            start_date: self.start_date.clone(),
            progress: !self.quiet && Term::stderr().is_term(),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Collect statistics and print a summary or the JSON snapshot
    Collect {
        #[arg(long, help = "Output the full snapshot as JSON")]
        json: bool,

        #[arg(long, short, help = "Write the JSON snapshot to this file")]
        output: Option<PathBuf>,
    },
    /// Show where the fact cache lives and how many facts it holds
    Cache,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn execute(self) -> Result<()> {
        match self.command {
            Commands::Collect { json, output } => exec_collect(&self.common, json, output),
            Commands::Cache => exec_cache(&self.common),
        }
    }
}

fn exec_collect(common: &CommonArgs, json: bool, output: Option<PathBuf>) -> Result<()> {
    let repo = GitRepo::open(common.repo.as_ref()).context("Failed to open git repository")?;
    let cache_path = CacheStore::location(common.cache.as_ref(), repo.git_dir());
    let config = common.collector_config();

    let refined = collect::run(&repo, &cache_path, &config).context("Failed to collect statistics")?;
    let snapshot = Snapshot::from_refined(&refined, Utc::now());

    if let Some(path) = output {
        let text = snapshot.to_json().context("Failed to serialize snapshot")?;
        std::fs::write(&path, text)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    if json {
        println!("{}", snapshot.to_json().context("Failed to serialize snapshot")?);
    } else {
        output_summary(&refined);
    }
    Ok(())
}

fn exec_cache(common: &CommonArgs) -> Result<()> {
    let repo = GitRepo::open(common.repo.as_ref()).context("Failed to open git repository")?;
    let cache_path = CacheStore::location(common.cache.as_ref(), repo.git_dir());
    let cache = CacheStore::load(&cache_path);

    println!("Cache: {}", style(cache_path.display()).dim());
    println!(
        "Revision file counts: {}",
        style(cache.revision_to_file_count.len()).cyan()
    );
    println!("Blob line counts: {}", style(cache.blob_to_line_count.len()).cyan());
    Ok(())
}

fn output_summary(refined: &Refined) {
    let stats = refined.aggregates();

    println!("{}", style("Repository Summary").bold());
    println!("{}", "─".repeat(50));
    println!("Total commits: {}", style(stats.total_commits).cyan());
    println!("Total authors: {}", style(stats.total_authors).cyan());
    println!("Total files: {}", style(stats.total_files).cyan());
    println!("Total lines: {}", style(stats.total_lines).cyan());
    println!("Lines added: {}", style(stats.total_lines_added).green());
    println!("Lines removed: {}", style(stats.total_lines_removed).red());
    println!("Tags: {}", style(stats.tags.len()).yellow());
    if let (Some(first), Some(last)) = (stats.first_commit_stamp, stats.last_commit_stamp) {
        println!(
            "Date range: {} to {}",
            style(crate::util::day_key(first)).dim(),
            style(crate::util::day_key(last)).dim()
        );
    }

    let top: Vec<_> = refined.authors_by_commits().iter().take(10).collect();
    if !top.is_empty() {
        println!("\n{}", style("Top Authors").bold());
        println!("{:<30} {:>8} {:>8} {:>10} {:>10}", "Author", "Commits", "Share", "Added", "Removed");
        println!("{}", "─".repeat(70));
        for name in top {
            let entry = &stats.authors[name.as_str()];
            let share = entry.refined.as_ref().map_or(0.0, |r| r.commit_share);
            println!(
                "{:<30} {:>8} {:>7.2}% {:>10} {:>10}",
                truncate(name, 30),
                entry.commit_count,
                share,
                style(entry.lines_added).green(),
                style(entry.lines_removed).red()
            );
        }
    }

    if !stats.warnings.is_empty() {
        println!(
            "\n{} {} unexpected lines were skipped or recovered",
            style("warning:").yellow().bold(),
            stats.warnings.len()
        );
    }
    println!("\nUse --json to print the full snapshot.");
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}
