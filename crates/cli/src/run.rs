//! `lfmembers run` / `lfmembers validate`: config-driven member reconciliation.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use landscape_recon::config::resolve_path;
use landscape_recon::engine::{run, RunContext};
use landscape_recon::hosting::LogoHost;
use landscape_recon::report::write_missing_report;
use landscape_recon::{load_roster, ConfigError, Directory, RunConfig, RunResult};
use landscape_sources::{logo_downloader, read_lossy, source_set, HttpClient};
use tracing::{debug, info};

use crate::exit_codes::{EXIT_CONFIG, EXIT_MISSING, EXIT_RUNTIME};
use crate::CliError;

pub struct RunOptions {
    pub config_path: PathBuf,
    pub json: bool,
    pub output: Option<PathBuf>,
    pub dry_run: bool,
    pub fail_on_missing: bool,
    pub no_logos: bool,
}

fn config_err(err: ConfigError) -> CliError {
    CliError::new(EXIT_CONFIG, err.to_string())
}

fn runtime_err(msg: impl Into<String>) -> CliError {
    CliError::new(EXIT_RUNTIME, msg)
}

fn read_input(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn load_config(config_path: &Path) -> Result<RunConfig, CliError> {
    let config_str = read_input(config_path).map_err(config_err)?;
    RunConfig::from_toml(&config_str).map_err(config_err)
}

pub fn cmd_run(opts: RunOptions) -> Result<(), CliError> {
    let config = load_config(&opts.config_path)?;

    // Everything fatal happens before the first row is processed.
    let roster_path = resolve_path(&opts.config_path, &config.roster);
    // Roster exports are not always UTF-8.
    let roster_text = read_lossy(&roster_path).map_err(|e| {
        config_err(ConfigError::Unreadable {
            path: roster_path.clone(),
            message: e.to_string(),
        })
    })?;
    let roster = load_roster(&roster_text);
    debug!(path = %roster_path.display(), rows = roster.rows.len(), "roster loaded");

    let directory_path = resolve_path(&opts.config_path, &config.directory);
    let yaml = read_input(&directory_path).map_err(config_err)?;
    let mut directory = Directory::from_yaml_str(&yaml, &config.member_category)
        .map_err(|e| config_err(e.into()))
        .map_err(|e| e.with_hint(format!("set member_category in {}", opts.config_path.display())))?;
    debug!(path = %directory_path.display(), entries = directory.entry_count(), "directory loaded");

    let client = HttpClient::new().map_err(|e| CliError::new(EXIT_CONFIG, e.to_string()))?;
    let sources = source_set(&config, &opts.config_path, &client);
    let downloader = if opts.no_logos || opts.dry_run {
        None
    } else {
        logo_downloader(&config, &opts.config_path, &client)
    };

    let tiers = config.tier_map();
    let ctx = RunContext {
        name: &config.name,
        sources: &sources,
        tiers: &tiers,
        logo_host: downloader.as_ref().map(|d| d as &dyn LogoHost),
        skip_test_records: config.skip_test_records,
    };
    info!(config = %config.name, sources = sources.len(), "reconciling");
    let result = run(&mut directory, &roster, &ctx);

    // Output
    if opts.dry_run {
        debug!("dry run, directory not written");
    } else if !directory.is_modified() {
        eprintln!("{} unchanged", directory_path.display());
    } else {
        let yaml = directory.to_yaml_string().map_err(|e| runtime_err(e.to_string()))?;
        std::fs::write(&directory_path, yaml)
            .map_err(|e| runtime_err(format!("cannot write {}: {e}", directory_path.display())))?;
        eprintln!("wrote {}", directory_path.display());
    }

    let report_path = resolve_path(&opts.config_path, &config.missing_report);
    write_report(&report_path, &result)?;
    eprintln!("wrote {}", report_path.display());

    if opts.json || opts.output.is_some() {
        let json_str = serde_json::to_string_pretty(&result)
            .map_err(|e| runtime_err(format!("JSON serialization error: {e}")))?;
        if let Some(ref path) = opts.output {
            std::fs::write(path, &json_str)
                .map_err(|e| runtime_err(format!("cannot write output: {e}")))?;
            eprintln!("wrote {}", path.display());
        }
        if opts.json {
            println!("{json_str}");
        }
    }

    // Human summary to stderr
    let s = &result.summary;
    eprintln!(
        "{}: {} roster rows: {} added, {} updated, {} unchanged, {} reported, {} skipped, {} malformed{}",
        result.meta.config_name,
        s.roster_rows,
        s.added,
        s.updated,
        s.unchanged,
        s.reported,
        s.skipped,
        s.malformed,
        if opts.dry_run { " (dry run)" } else { "" },
    );
    if s.incomplete_existing > 0 {
        eprintln!("{} existing entries still incomplete", s.incomplete_existing);
    }

    if opts.fail_on_missing && !result.missing.is_empty() {
        return Err(CliError::new(
            EXIT_MISSING,
            format!("{} records missing required fields", result.missing.len()),
        )
        .with_hint(format!("see {}", report_path.display())));
    }

    Ok(())
}

fn write_report(path: &Path, result: &RunResult) -> Result<(), CliError> {
    let file = File::create(path).map_err(|e| runtime_err(format!("cannot write {}: {e}", path.display())))?;
    write_missing_report(BufWriter::new(file), &result.missing).map_err(|e| runtime_err(e.to_string()))
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    eprintln!(
        "valid: '{}' with {} peer source(s){}{}{}",
        config.name,
        config.peers.len(),
        if config.webpage.is_some() { ", webpage" } else { "" },
        if config.company_db.is_some() { ", company db" } else { "" },
        if config.logos.is_some() { ", logo hosting" } else { "" },
    );
    Ok(())
}
