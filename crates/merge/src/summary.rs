use crate::model::{DuplicateKey, KeyGroup, MergeSummary, MergeWarning, SourceSystem};

/// Keys held by more than one row of the same source. S4 entries first,
/// each source in first-seen order.
pub fn duplicate_keys(groups: &[KeyGroup]) -> Vec<DuplicateKey> {
    let mut out = Vec::new();
    for system in SourceSystem::ALL {
        for group in groups {
            let count = group.rows(system).len();
            if count > 1 {
                out.push(DuplicateKey {
                    system,
                    mdg_key: group.mdg_key.clone(),
                    count,
                });
            }
        }
    }
    out
}

/// Compute summary statistics from the grouped rows.
pub fn compute_summary(
    key_fields: &[String],
    groups: &[KeyGroup],
    warnings: &[MergeWarning],
) -> MergeSummary {
    let mut s4_count = 0;
    let mut ecc_count = 0;
    let mut overlapping_keys = Vec::new();
    let mut s4_only_keys = Vec::new();
    let mut ecc_only_keys = Vec::new();

    for g in groups {
        s4_count += g.s4_rows.len();
        ecc_count += g.ecc_rows.len();
        match (g.s4_rows.is_empty(), g.ecc_rows.is_empty()) {
            (false, false) => overlapping_keys.push(g.mdg_key.clone()),
            (false, true) => s4_only_keys.push(g.mdg_key.clone()),
            (true, false) => ecc_only_keys.push(g.mdg_key.clone()),
            (true, true) => {}
        }
    }

    overlapping_keys.sort();
    s4_only_keys.sort();
    ecc_only_keys.sort();

    let blank_key_rows = warnings
        .iter()
        .filter(|w| matches!(w, MergeWarning::BlankKey { .. }))
        .count();

    MergeSummary {
        key_fields: key_fields.to_vec(),
        s4_count,
        ecc_count,
        mdtable_count: groups.len(),
        mdmapping_count: s4_count + ecc_count,
        overlapping: overlapping_keys.len(),
        s4_only: s4_only_keys.len(),
        ecc_only: ecc_only_keys.len(),
        overlapping_keys,
        s4_only_keys,
        ecc_only_keys,
        duplicates: duplicate_keys(groups),
        blank_key_rows,
    }
}
