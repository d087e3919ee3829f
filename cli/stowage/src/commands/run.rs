//! `stowage run`: load every module listed in `stowage.toml`.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use stowage_core::{
    CacheOutcome, DirBundle, EmbeddedLoader, LoadReport, LoadRoute, ModuleRuntime,
    ResolutionHost, StowageConfig,
};
use stowage_native::NativeRuntime;

/// Machine-readable row for `--format json`.
#[derive(Debug, Serialize)]
struct ModuleRow {
    identity: String,
    route: &'static str,
    path: Option<String>,
    cache: Option<&'static str>,
}

impl From<&LoadReport> for ModuleRow {
    fn from(report: &LoadReport) -> Self {
        let (route, path, cache) = match &report.route {
            LoadRoute::Memory => ("memory", None, None),
            LoadRoute::Disk(entry) => (
                "disk",
                Some(entry.path.display().to_string()),
                Some(match entry.outcome {
                    CacheOutcome::Hit => "hit",
                    CacheOutcome::Written => "written",
                }),
            ),
        };
        ModuleRow {
            identity: report.identity.to_string(),
            route,
            path,
            cache,
        }
    }
}

/// Load the configured modules with the native runtime.
pub fn run(cwd: &Path, config_path: Option<&Path>, format: Option<&str>) -> Result<()> {
    let output = load_configured(
        Arc::new(NativeRuntime::new()),
        ResolutionHost::global(),
        cwd,
        config_path,
        format,
    )?;
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}

fn find_config(cwd: &Path, config_path: Option<&Path>) -> Result<StowageConfig> {
    match config_path {
        Some(path) => {
            StowageConfig::load(path).with_context(|| format!("reading {}", path.display()))
        }
        None => {
            let (config, path) = StowageConfig::find_and_load(cwd)?.with_context(|| {
                format!("no stowage.toml found in {} or its parents", cwd.display())
            })?;
            tracing::debug!(config = %path.display(), "using configuration");
            Ok(config)
        }
    }
}

/// Output format for `stowage run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Human,
    Json,
}

impl Format {
    fn parse(format: Option<&str>) -> Result<Self> {
        match format.unwrap_or("human") {
            "human" => Ok(Format::Human),
            "json" => Ok(Format::Json),
            other => anyhow::bail!("unknown format '{other}' (expected human or json)"),
        }
    }
}

fn load_configured(
    runtime: Arc<dyn ModuleRuntime>,
    host: &'static ResolutionHost,
    cwd: &Path,
    config_path: Option<&Path>,
    format: Option<&str>,
) -> Result<String> {
    let format = Format::parse(format)?;
    let config = find_config(cwd, config_path)?;
    if config.modules.is_empty() {
        return Ok(String::new());
    }
    let modules = config.resolved_modules();
    let default_bundle = config.bundle_dir();
    if default_bundle.is_none() {
        if let Some(m) = modules.iter().find(|m| m.bundle.is_none()) {
            anyhow::bail!(
                "module '{}' names no bundle and stowage.toml sets no [loader] bundle",
                m.resource
            );
        }
    }

    let mut builder = EmbeddedLoader::builder(runtime).host(host).config(&config);
    if let Some(dir) = default_bundle {
        builder = builder.bundle(Arc::new(DirBundle::new(dir)));
    }
    let reports = builder.build().load_all(&modules, None)?;

    match format {
        Format::Human => Ok(reports
            .iter()
            .map(super::describe)
            .collect::<Vec<_>>()
            .join("\n")),
        Format::Json => {
            let rows: Vec<ModuleRow> = reports.iter().map(ModuleRow::from).collect();
            Ok(serde_json::to_string_pretty(&rows)?)
        }
    }
}
