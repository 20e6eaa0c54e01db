// merge / run / validate

use std::path::{Path, PathBuf};

use mdmerge_engine::{merge, MergeConfig, MergeOptions, OutputFormat, SourceSystem, Table};
use mdmerge_io::fetch::is_url;
use mdmerge_io::{load, write_outputs, LoadOptions};

use crate::exit_codes::EXIT_CONFIG;
use crate::report;
use crate::CliError;

/// Where one source comes from and how to read it.
#[derive(Debug, Clone)]
pub(crate) struct SourceSpec {
    pub location: String,
    pub sheet: Option<String>,
    pub header_row: usize,
}

/// A fully resolved merge invocation, from flags or from a job file.
#[derive(Debug, Clone)]
pub(crate) struct MergeJob {
    pub s4: SourceSpec,
    pub ecc: SourceSpec,
    pub options: MergeOptions,
    pub out_dir: PathBuf,
    pub format: OutputFormat,
}

impl MergeJob {
    fn source(&self, system: SourceSystem) -> &SourceSpec {
        match system {
            SourceSystem::S4 => &self.s4,
            SourceSystem::Ecc => &self.ecc,
        }
    }

    /// Build a job from a parsed config. Relative paths resolve against `base`.
    pub(crate) fn from_config(config: &MergeConfig, base: &Path, out: Option<PathBuf>) -> Self {
        let spec = |system: SourceSystem| {
            let src = config.source(system);
            SourceSpec {
                location: resolve_location(base, &src.source),
                sheet: src.sheet.clone(),
                header_row: src.header_row,
            }
        };
        Self {
            s4: spec(SourceSystem::S4),
            ecc: spec(SourceSystem::Ecc),
            options: config.options(),
            out_dir: out.unwrap_or_else(|| base.join(&config.output.dir)),
            format: config.output.format,
        }
    }
}

fn resolve_location(base: &Path, location: &str) -> String {
    if is_url(location) || Path::new(location).is_absolute() {
        location.to_string()
    } else {
        base.join(location).display().to_string()
    }
}

pub(crate) fn load_source(system: SourceSystem, spec: &SourceSpec) -> Result<Table, CliError> {
    let options = LoadOptions {
        sheet: spec.sheet.clone(),
        header_row: spec.header_row,
        ..LoadOptions::new(system.label())
    };
    load(&spec.location, &options).map_err(|e| CliError::load(system.label(), e))
}

/// Load, merge, export, report.
pub(crate) fn execute(job: &MergeJob, json: bool, quiet: bool) -> Result<(), CliError> {
    let s4 = load_source(SourceSystem::S4, job.source(SourceSystem::S4))?;
    let ecc = load_source(SourceSystem::Ecc, job.source(SourceSystem::Ecc))?;

    let result = merge(&s4, &ecc, &job.options)?;
    let outputs = write_outputs(&result, &job.out_dir, job.format)?;

    report::emit(&result, &outputs, json, quiet)
}

fn read_job(path: &Path) -> Result<MergeConfig, CliError> {
    let text = std::fs::read_to_string(path).map_err(|e| CliError {
        code: EXIT_CONFIG,
        message: format!("cannot read job file {}: {}", path.display(), e),
        hint: None,
    })?;
    Ok(MergeConfig::from_toml(&text)?)
}

fn job_dir(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

// ============================================================================
// run
// ============================================================================

pub(crate) fn cmd_run(job: PathBuf, out: Option<PathBuf>, json: bool, quiet: bool) -> Result<(), CliError> {
    let config = read_job(&job)?;
    tracing::info!(job = %job.display(), name = %config.name, "running job");
    let merge_job = MergeJob::from_config(&config, &job_dir(&job), out);
    execute(&merge_job, json, quiet)
}

// ============================================================================
// validate
// ============================================================================

pub(crate) fn cmd_validate(job: PathBuf) -> Result<(), CliError> {
    let config = read_job(&job)?;
    let resolved = MergeJob::from_config(&config, &job_dir(&job), None);

    println!("ok: {}", config.name);
    println!("  key fields:  {}", config.key_fields.join(" + "));
    println!(
        "  policy:      key_transform={} on_duplicate={} mdg_key={}",
        config.key_transform, config.on_duplicate, config.mdg_key
    );
    for system in SourceSystem::ALL {
        let spec = resolved.source(system);
        let sheet = spec.sheet.as_deref().map(|s| format!(" [{s}]")).unwrap_or_default();
        println!(
            "  {:<12} {}{} (header row {})",
            format!("{}:", system.label()),
            spec.location,
            sheet,
            spec.header_row
        );
    }
    println!(
        "  output:      {} ({})",
        resolved.out_dir.display(),
        resolved.format
    );
    Ok(())
}
