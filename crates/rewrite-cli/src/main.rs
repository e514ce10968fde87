//! Minimal binary wiring a file list and a TOML rule file into
//! [`rewrite_engine::run_batch`]. It does no glob expansion and no rule
//! DSL parsing — both the file list and the rule set are expected to
//! already be resolved by whatever invokes this binary.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde::Deserialize;

use rewrite_core::{EngineConfig, ProtectedRegionSpec, ReplacementMap};

#[derive(Parser)]
#[command(about = "Apply a configured rule set to a list of files in place")]
struct Args {
    /// Path to a TOML file describing `[[rules]]` and `[[protections]]`.
    #[arg(long)]
    rules: PathBuf,

    /// Path to a TOML `EngineConfig` (thread count, page size, ...).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Files to rewrite in place.
    files: Vec<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct RulesFile {
    #[serde(default)]
    rules: Vec<RuleEntry>,
    #[serde(default)]
    protections: Vec<ProtectionEntry>,
}

#[derive(Debug, Deserialize)]
struct RuleEntry {
    pattern: String,
    replacement: String,
}

#[derive(Debug, Deserialize)]
struct ProtectionEntry {
    start: String,
    #[serde(default)]
    end: String,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    if args.files.is_empty() {
        tracing::warn!("no input files given, nothing to do");
        return ExitCode::SUCCESS;
    }

    let rules_text = match std::fs::read_to_string(&args.rules) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(path = %args.rules.display(), error = %e, "failed to read rules file");
            return ExitCode::FAILURE;
        }
    };
    let rules_file: RulesFile = match toml::from_str(&rules_text) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::error!(path = %args.rules.display(), error = %e, "failed to parse rules file");
            return ExitCode::FAILURE;
        }
    };

    let mut rules = ReplacementMap::new();
    for entry in &rules_file.rules {
        if let Err(e) = rules.insert(entry.pattern.chars().collect(), entry.replacement.chars().collect()) {
            tracing::error!(pattern = %entry.pattern, error = %e, "rejected rule");
            return ExitCode::FAILURE;
        }
    }

    let protections: Vec<ProtectedRegionSpec> = rules_file
        .protections
        .iter()
        .map(|p| if p.end.is_empty() { ProtectedRegionSpec::literal(&p.start) } else { ProtectedRegionSpec::new(&p.start, &p.end) })
        .collect();

    let config = match args.config {
        Some(path) => match std::fs::read_to_string(&path).and_then(|text| EngineConfig::from_toml(&text).map_err(std::io::Error::other)) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "failed to load config");
                return ExitCode::FAILURE;
            }
        },
        None => EngineConfig::default(),
    };

    let (results, stats) = rewrite_engine::run_batch(&args.files, &rules, &protections, &config);

    for result in &results {
        if !result.ok {
            tracing::error!(path = %result.file_path.display(), error = ?result.err_msg, "failed to rewrite file");
        }
    }
    tracing::info!(
        files_total = stats.files_total,
        files_changed = stats.files_changed,
        files_failed = stats.files_failed,
        replacements_total = stats.replacements_total,
        elapsed_ms = stats.elapsed.as_millis() as u64,
        "batch finished"
    );

    if stats.files_failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
