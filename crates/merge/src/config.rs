use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::MergeError;
use crate::model::SourceSystem;

pub const DEFAULT_MAPPING_PREFIX: &str = "ERP";

// ---------------------------------------------------------------------------
// Policies
// ---------------------------------------------------------------------------

/// How key-field values are normalized before matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyTransform {
    /// Values compared verbatim.
    None,
    /// Leading/trailing whitespace removed.
    Trim,
    /// Trimmed, then uppercased (case-insensitive matching).
    #[default]
    Fold,
}

/// What to do when one source holds the same key more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// First-seen row represents its source; later rows only reach MDmapping.
    #[default]
    First,
    /// Fail the merge.
    Error,
}

/// Shape of the synthesized MDGKey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MdgKeyStyle {
    /// Normalized components joined with `-`.
    #[default]
    Joined,
    /// Truncated BLAKE3 digest of the components.
    Digest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Xlsx,
    Csv,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
        }
    }
}

macro_rules! display_snake {
    ($ty:ty { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($name),)+
                }
            }
        }
    };
}

display_snake!(KeyTransform { None => "none", Trim => "trim", Fold => "fold" });
display_snake!(DuplicatePolicy { First => "first", Error => "error" });
display_snake!(MdgKeyStyle { Joined => "joined", Digest => "digest" });
display_snake!(OutputFormat { Xlsx => "xlsx", Csv => "csv" });

// ---------------------------------------------------------------------------
// Engine options
// ---------------------------------------------------------------------------

/// Everything the engine needs besides the two tables.
#[derive(Debug, Clone)]
pub struct MergeOptions {
    pub key_fields: Vec<String>,
    pub key_transform: KeyTransform,
    pub on_duplicate: DuplicatePolicy,
    pub mdg_key: MdgKeyStyle,
    pub mapping_prefix: String,
    /// Restrict MDmapping to these columns; `None` keeps the whole largest schema.
    pub mapping_columns: Option<Vec<String>>,
    pub s4_rename: BTreeMap<String, String>,
    pub ecc_rename: BTreeMap<String, String>,
}

impl MergeOptions {
    pub fn new<I, S>(key_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key_fields: key_fields.into_iter().map(Into::into).collect(),
            key_transform: KeyTransform::default(),
            on_duplicate: DuplicatePolicy::default(),
            mdg_key: MdgKeyStyle::default(),
            mapping_prefix: DEFAULT_MAPPING_PREFIX.to_string(),
            mapping_columns: None,
            s4_rename: BTreeMap::new(),
            ecc_rename: BTreeMap::new(),
        }
    }

    pub fn renames(&self, system: SourceSystem) -> &BTreeMap<String, String> {
        match system {
            SourceSystem::S4 => &self.s4_rename,
            SourceSystem::Ecc => &self.ecc_rename,
        }
    }
}

// ---------------------------------------------------------------------------
// Job file
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct MergeConfig {
    #[serde(default = "default_name")]
    pub name: String,
    pub key_fields: Vec<String>,
    #[serde(default)]
    pub key_transform: KeyTransform,
    #[serde(default)]
    pub on_duplicate: DuplicatePolicy,
    #[serde(default)]
    pub mdg_key: MdgKeyStyle,
    #[serde(default = "default_prefix")]
    pub mapping_prefix: String,
    #[serde(default)]
    pub mapping_columns: Option<Vec<String>>,
    pub s4: SourceConfig,
    pub ecc: SourceConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Where one source table comes from.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// File path (relative to the job file) or http(s) URL.
    pub source: String,
    #[serde(default)]
    pub sheet: Option<String>,
    /// 1-indexed row holding the column names.
    #[serde(default = "default_header_row")]
    pub header_row: usize,
    #[serde(default)]
    pub rename: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: String,
    #[serde(default)]
    pub format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            format: OutputFormat::default(),
        }
    }
}

fn default_name() -> String {
    "merge".into()
}

fn default_prefix() -> String {
    DEFAULT_MAPPING_PREFIX.into()
}

fn default_header_row() -> usize {
    1
}

fn default_output_dir() -> String {
    ".".into()
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl MergeConfig {
    pub fn from_toml(input: &str) -> Result<Self, MergeError> {
        let config: MergeConfig =
            toml::from_str(input).map_err(|e| MergeError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MergeError> {
        if self.key_fields.is_empty() {
            return Err(MergeError::ConfigValidation(
                "key_fields must list at least one column".into(),
            ));
        }
        if let Some(blank) = self.key_fields.iter().position(|k| k.trim().is_empty()) {
            return Err(MergeError::ConfigValidation(format!(
                "key_fields[{blank}] is blank"
            )));
        }
        if self.mapping_prefix.trim().is_empty() {
            return Err(MergeError::ConfigValidation(
                "mapping_prefix must not be empty".into(),
            ));
        }
        if let Some(cols) = &self.mapping_columns {
            if cols.is_empty() {
                return Err(MergeError::ConfigValidation(
                    "mapping_columns, when given, must list at least one column".into(),
                ));
            }
        }

        for system in SourceSystem::ALL {
            let src = self.source(system);
            let section = system.label().to_lowercase();
            if src.source.trim().is_empty() {
                return Err(MergeError::ConfigValidation(format!(
                    "[{section}] source must not be empty"
                )));
            }
            if src.header_row == 0 {
                return Err(MergeError::ConfigValidation(format!(
                    "[{section}] header_row is 1-indexed, got 0"
                )));
            }
        }

        Ok(())
    }

    pub fn source(&self, system: SourceSystem) -> &SourceConfig {
        match system {
            SourceSystem::S4 => &self.s4,
            SourceSystem::Ecc => &self.ecc,
        }
    }

    /// Engine options described by this job.
    pub fn options(&self) -> MergeOptions {
        MergeOptions {
            key_fields: self.key_fields.clone(),
            key_transform: self.key_transform,
            on_duplicate: self.on_duplicate,
            mdg_key: self.mdg_key,
            mapping_prefix: self.mapping_prefix.clone(),
            mapping_columns: self.mapping_columns.clone(),
            s4_rename: self.s4.rename.clone(),
            ecc_rename: self.ecc.rename.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
