// Merge summaries: human (stderr) and JSON (stdout)

use std::path::PathBuf;

use mdmerge_engine::MergeResult;

use crate::CliError;

/// Warnings listed individually before collapsing into a count.
const MAX_LISTED_WARNINGS: usize = 10;

pub(crate) fn human_summary(result: &MergeResult, outputs: &[PathBuf]) -> String {
    let s = &result.summary;
    let mut out = String::new();

    out.push_str(&format!("merge: S4 {} rows, ECC {} rows\n", s.s4_count, s.ecc_count));
    out.push_str(&format!(
        "  MDtable:    {} rows ({} overlapping, {} S4 only, {} ECC only)\n",
        s.mdtable_count, s.overlapping, s.s4_only, s.ecc_only
    ));
    out.push_str(&format!("  MDmapping:  {} rows\n", s.mdmapping_count));
    out.push_str(&format!(
        "  key:        {} ({}, {})\n",
        s.key_fields.join(" + "),
        result.meta.key_transform,
        result.meta.mdg_key_style
    ));

    if !result.warnings.is_empty() {
        out.push_str(&format!("  warnings:   {}\n", result.warnings.len()));
        for w in result.warnings.iter().take(MAX_LISTED_WARNINGS) {
            out.push_str(&format!("    {w}\n"));
        }
        if result.warnings.len() > MAX_LISTED_WARNINGS {
            out.push_str(&format!(
                "    ... and {} more\n",
                result.warnings.len() - MAX_LISTED_WARNINGS
            ));
        }
    }

    for path in outputs {
        out.push_str(&format!("wrote {}\n", path.display()));
    }
    out
}

pub(crate) fn json_report(result: &MergeResult, outputs: &[PathBuf]) -> Result<serde_json::Value, CliError> {
    let mut value = serde_json::to_value(result).map_err(|e| CliError::internal(e.to_string()))?;
    if let Some(obj) = value.as_object_mut() {
        obj.insert(
            "outputs".into(),
            outputs.iter().map(|p| p.display().to_string()).collect(),
        );
    }
    Ok(value)
}

/// Human summary to stderr unless quiet; one JSON value to stdout when asked.
pub(crate) fn emit(result: &MergeResult, outputs: &[PathBuf], json: bool, quiet: bool) -> Result<(), CliError> {
    if !quiet {
        eprint!("{}", human_summary(result, outputs));
    }
    if json {
        let value = json_report(result, outputs)?;
        let text = serde_json::to_string_pretty(&value).map_err(|e| CliError::internal(e.to_string()))?;
        println!("{text}");
    }
    Ok(())
}
