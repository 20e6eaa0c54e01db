//! Key normalization and MDGKey synthesis.
//!
//! A key tuple is the normalized value of every key field of one row, in
//! key-field order. Blank components stay in place so `("US", "")` and
//! `("", "US")` are different tuples.

use std::borrow::Cow;

use crate::config::{KeyTransform, MdgKeyStyle};

const SEPARATOR: char = '-';
const ESCAPE: char = '\\';
/// 64 bits of the hash. Rows are grouped by `KeyTuple`, so a digest
/// collision shows up as two MDtable rows with one MDGKey, never as a merge.
const DIGEST_HEX_LEN: usize = 16;

pub fn normalize(raw: &str, transform: KeyTransform) -> String {
    match transform {
        KeyTransform::None => raw.to_string(),
        KeyTransform::Trim => raw.trim().to_string(),
        KeyTransform::Fold => raw.trim().to_uppercase(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyTuple(Vec<String>);

impl KeyTuple {
    /// Normalize raw key-field values into a tuple.
    pub fn from_raw<'a, I>(values: I, transform: KeyTransform) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self(values.into_iter().map(|v| normalize(v, transform)).collect())
    }

    /// Positions whose normalized value is empty (or whitespace only).
    pub fn blank_positions(&self) -> Vec<usize> {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, c)| c.trim().is_empty())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn mdg_key(&self, style: MdgKeyStyle) -> String {
        match style {
            MdgKeyStyle::Joined => self.joined(),
            MdgKeyStyle::Digest => self.digest(),
        }
    }

    fn joined(&self) -> String {
        let parts: Vec<Cow<'_, str>> = self.0.iter().map(|c| escape_component(c)).collect();
        parts.join(&SEPARATOR.to_string())
    }

    fn digest(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for component in &self.0 {
            hasher.update(&(component.len() as u64).to_le_bytes());
            hasher.update(component.as_bytes());
        }
        let hex = hasher.finalize().to_hex();
        hex.as_str()[..DIGEST_HEX_LEN].to_string()
    }
}

fn escape_component(component: &str) -> Cow<'_, str> {
    if !component.contains([SEPARATOR, ESCAPE]) {
        return Cow::Borrowed(component);
    }
    let mut out = String::with_capacity(component.len() + 2);
    for ch in component.chars() {
        if ch == SEPARATOR || ch == ESCAPE {
            out.push(ESCAPE);
        }
        out.push(ch);
    }
    Cow::Owned(out)
}
