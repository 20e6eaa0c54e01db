// mdmerge CLI - merge S4 and ECC master data into MDtable and MDmapping

mod exit_codes;
mod inspect;
mod merge;
mod report;
mod util;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use mdmerge_engine::{DuplicatePolicy, KeyTransform, MdgKeyStyle, MergeError, MergeOptions, OutputFormat, SchemaError};
use mdmerge_io::IoError;

use exit_codes::{
    EXIT_AMBIGUOUS_KEY, EXIT_CONFIG, EXIT_EMPTY_INPUT, EXIT_ERROR, EXIT_EXPORT, EXIT_LOAD, EXIT_SCHEMA,
    EXIT_SUCCESS, EXIT_USAGE,
};

#[derive(Parser)]
#[command(name = "mdmerge")]
#[command(about = "Merge S4 and ECC master data into MDtable and MDmapping")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug)
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge two sources and write MDtable + MDmapping
    #[command(after_help = "\
Examples:
  mdmerge merge S4_Country.xlsx ECC_Country.xlsx --key 'Country/Region Key'
  mdmerge merge s4.csv ecc.csv -k Plant -k Material --format csv -o out/
  mdmerge merge s4.xlsx 'https://docs.google.com/spreadsheets/d/<id>/edit' -k Country
  mdmerge merge s4.csv ecc.csv -k Country --rename-ecc 'Land=Country' --json")]
    Merge {
        /// S4 source: file path or http(s) URL
        s4: String,

        /// ECC source: file path or http(s) URL
        ecc: String,

        /// Key field (repeatable, order matters for composite keys)
        #[arg(long = "key", short = 'k', required = true, value_name = "COLUMN")]
        keys: Vec<String>,

        /// Key normalization before matching
        #[arg(long, value_enum, default_value = "fold")]
        key_transform: KeyTransformArg,

        /// Duplicate keys within one source: keep first row, or fail
        #[arg(long, value_enum, default_value = "first")]
        on_duplicate: DuplicateArg,

        /// MDGKey form: readable joined components, or a short digest
        #[arg(long, value_enum, default_value = "joined")]
        mdg_key: MdgKeyArg,

        /// Prefix for MDmapping value columns
        #[arg(long, default_value = mdmerge_engine::config::DEFAULT_MAPPING_PREFIX)]
        prefix: String,

        /// Restrict MDmapping to these columns (comma-separated or repeated)
        #[arg(long, value_delimiter = ',', value_name = "COLUMN")]
        mapping_columns: Vec<String>,

        /// Worksheet of the S4 workbook (default: first sheet)
        #[arg(long)]
        sheet_s4: Option<String>,

        /// Worksheet of the ECC workbook (default: first sheet)
        #[arg(long)]
        sheet_ecc: Option<String>,

        /// 1-indexed row holding column names, both sources
        #[arg(long, default_value_t = 1, value_parser = parse_header_row)]
        header_row: usize,

        /// Rename an S4 column before merging (repeatable)
        #[arg(long, value_name = "FROM=TO")]
        rename_s4: Vec<String>,

        /// Rename an ECC column before merging (repeatable)
        #[arg(long, value_name = "FROM=TO")]
        rename_ecc: Vec<String>,

        /// Output directory
        #[arg(long, short = 'o', default_value = ".")]
        out: PathBuf,

        /// Output file format
        #[arg(long, value_enum, default_value = "xlsx")]
        format: FormatArg,

        /// Print the summary as JSON on stdout
        #[arg(long)]
        json: bool,

        /// No human summary on stderr
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Run a TOML job file
    #[command(after_help = "\
Examples:
  mdmerge run country.merge.toml
  mdmerge run jobs/plant.merge.toml -o /tmp/out --json

Relative source paths in the job resolve against the job file's directory.")]
    Run {
        /// Job file
        job: PathBuf,

        /// Output directory (overrides [output] dir)
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,

        /// Print the summary as JSON on stdout
        #[arg(long)]
        json: bool,

        /// No human summary on stderr
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Parse and validate a job file without loading sources
    Validate {
        /// Job file
        job: PathBuf,
    },

    /// List the (harmonized) columns of a source
    Columns {
        /// File path or http(s) URL
        source: String,

        /// Worksheet (default: first sheet)
        #[arg(long)]
        sheet: Option<String>,

        /// 1-indexed row holding column names
        #[arg(long, default_value_t = 1, value_parser = parse_header_row)]
        header_row: usize,

        /// Print as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Show the first rows of a source as an aligned table
    Preview {
        /// File path or http(s) URL
        source: String,

        /// Worksheet (default: first sheet)
        #[arg(long)]
        sheet: Option<String>,

        /// 1-indexed row holding column names
        #[arg(long, default_value_t = 1, value_parser = parse_header_row)]
        header_row: usize,

        /// Number of data rows
        #[arg(long, short = 'n', default_value_t = 10)]
        rows: usize,

        /// Maximum column width
        #[arg(long, default_value_t = 24)]
        width: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KeyTransformArg {
    None,
    Trim,
    Fold,
}

impl From<KeyTransformArg> for KeyTransform {
    fn from(arg: KeyTransformArg) -> Self {
        match arg {
            KeyTransformArg::None => KeyTransform::None,
            KeyTransformArg::Trim => KeyTransform::Trim,
            KeyTransformArg::Fold => KeyTransform::Fold,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum DuplicateArg {
    First,
    Error,
}

impl From<DuplicateArg> for DuplicatePolicy {
    fn from(arg: DuplicateArg) -> Self {
        match arg {
            DuplicateArg::First => DuplicatePolicy::First,
            DuplicateArg::Error => DuplicatePolicy::Error,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum MdgKeyArg {
    Joined,
    Digest,
}

impl From<MdgKeyArg> for MdgKeyStyle {
    fn from(arg: MdgKeyArg) -> Self {
        match arg {
            MdgKeyArg::Joined => MdgKeyStyle::Joined,
            MdgKeyArg::Digest => MdgKeyStyle::Digest,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Xlsx,
    Csv,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Xlsx => OutputFormat::Xlsx,
            FormatArg::Csv => OutputFormat::Csv,
        }
    }
}

fn parse_header_row(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("header rows are 1-indexed".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  mdmerge-engine ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

/// stderr logging. `-v` flags win over MDMERGE_LOG, which wins over RUST_LOG.
fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_env("MDMERGE_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Merge {
            s4,
            ecc,
            keys,
            key_transform,
            on_duplicate,
            mdg_key,
            prefix,
            mapping_columns,
            sheet_s4,
            sheet_ecc,
            header_row,
            rename_s4,
            rename_ecc,
            out,
            format,
            json,
            quiet,
        } => build_merge_job(MergeArgs {
            s4,
            ecc,
            keys,
            key_transform,
            on_duplicate,
            mdg_key,
            prefix,
            mapping_columns,
            sheet_s4,
            sheet_ecc,
            header_row,
            rename_s4,
            rename_ecc,
            out,
            format,
        })
        .and_then(|job| merge::execute(&job, json, quiet)),
        Commands::Run { job, out, json, quiet } => merge::cmd_run(job, out, json, quiet),
        Commands::Validate { job } => merge::cmd_validate(job),
        Commands::Columns { source, sheet, header_row, json } => {
            inspect::cmd_columns(source, sheet, header_row, json)
        }
        Commands::Preview { source, sheet, header_row, rows, width } => {
            inspect::cmd_preview(source, sheet, header_row, rows, width)
        }
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

// ============================================================================
// merge flags -> job
// ============================================================================

struct MergeArgs {
    s4: String,
    ecc: String,
    keys: Vec<String>,
    key_transform: KeyTransformArg,
    on_duplicate: DuplicateArg,
    mdg_key: MdgKeyArg,
    prefix: String,
    mapping_columns: Vec<String>,
    sheet_s4: Option<String>,
    sheet_ecc: Option<String>,
    header_row: usize,
    rename_s4: Vec<String>,
    rename_ecc: Vec<String>,
    out: PathBuf,
    format: FormatArg,
}

fn build_merge_job(args: MergeArgs) -> Result<merge::MergeJob, CliError> {
    if args.prefix.trim().is_empty() {
        return Err(CliError::args("--prefix must not be empty"));
    }

    let mut options = MergeOptions::new(args.keys);
    options.key_transform = args.key_transform.into();
    options.on_duplicate = args.on_duplicate.into();
    options.mdg_key = args.mdg_key.into();
    options.mapping_prefix = args.prefix;
    if !args.mapping_columns.is_empty() {
        options.mapping_columns = Some(args.mapping_columns);
    }
    for arg in &args.rename_s4 {
        let (from, to) = util::parse_rename(arg).map_err(CliError::args)?;
        options.s4_rename.insert(from, to);
    }
    for arg in &args.rename_ecc {
        let (from, to) = util::parse_rename(arg).map_err(CliError::args)?;
        options.ecc_rename.insert(from, to);
    }

    Ok(merge::MergeJob {
        s4: merge::SourceSpec {
            location: args.s4,
            sheet: args.sheet_s4,
            header_row: args.header_row,
        },
        ecc: merge::SourceSpec {
            location: args.ecc,
            sheet: args.sheet_ecc,
            header_row: args.header_row,
        },
        options,
        out_dir: args.out,
        format: args.format.into(),
    })
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Loader failure, tagged with the source it came from.
    pub fn load(source: &str, err: IoError) -> Self {
        let mut cli: Self = err.into();
        cli.message = format!("{source}: {}", cli.message);
        cli
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<IoError> for CliError {
    fn from(err: IoError) -> Self {
        let code = if err.is_export() { EXIT_EXPORT } else { EXIT_LOAD };
        let hint = err.hint();
        let cli = Self { code, message: err.to_string(), hint: None };
        match hint {
            Some(h) => cli.with_hint(h),
            None => cli,
        }
    }
}

impl From<MergeError> for CliError {
    fn from(err: MergeError) -> Self {
        let message = err.to_string();
        match err {
            MergeError::Schema(schema) => {
                let cli = Self { code: EXIT_SCHEMA, message, hint: None };
                match (&schema, schema.available_columns()) {
                    (SchemaError::NoKeyFields, _) => cli.with_hint("pass at least one --key"),
                    (_, Some(cols)) if !cols.is_empty() => {
                        cli.with_hint(format!("available columns: {}", cols.join(", ")))
                    }
                    _ => cli,
                }
            }
            MergeError::EmptyInput(system) => Self { code: EXIT_EMPTY_INPUT, message, hint: None }
                .with_hint(format!(
                    "check the {system} sheet and header row; `mdmerge preview` shows what was read"
                )),
            MergeError::AmbiguousKey(_) => Self { code: EXIT_AMBIGUOUS_KEY, message, hint: None }
                .with_hint("use --on-duplicate first to keep the first row per key"),
            MergeError::ConfigParse(_) | MergeError::ConfigValidation(_) => {
                Self { code: EXIT_CONFIG, message, hint: None }
            }
        }
    }
}
