//! Build configuration fingerprinting.
//!
//! A fingerprint has the form `<symbols>.<defines>` where each segment is a
//! base-64-alphabet encoding of a bitmap over the release catalog in catalog
//! order. Each character encodes up to six consecutive catalog entries, bit
//! position within the group least-significant first. The fingerprint is a
//! direct bit-for-bit serialization of the effective configuration, not a
//! hash: two requests with the same effective selection always encode to the
//! same fingerprint, and distinct configurations never collide.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use buildsmith_store::ReleaseCatalog;

use crate::error::BuildError;
use crate::request::BuildRequest;

const ALPHABET: &[u8; 64] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_-";
const BITS: usize = 6;

/// Canonical identifier of an effective build configuration. The dedup key.
///
/// Length is a pure function of catalog size:
/// `ceil(symbols/6) + 1 + ceil(defines/6)` characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Fingerprint {
    type Err = BuildError;

    /// Accepts the grammar `^[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+$`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || BuildError::InvalidConfig(format!("malformed fingerprint: {s}"));
        let (symbols, defines) = s.split_once('.').ok_or_else(malformed)?;
        for segment in [symbols, defines] {
            if segment.is_empty()
                || !segment
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
            {
                return Err(malformed());
            }
        }
        Ok(Fingerprint(s.to_string()))
    }
}

/// Encode a build request against a release catalog.
///
/// Fails with `InvalidConfig` naming the first request symbol or define
/// override absent from the catalog. Validation is a separate pass over the
/// names accumulated while encoding; it never affects the encoded value.
pub fn encode(request: &BuildRequest, catalog: &ReleaseCatalog) -> Result<Fingerprint, BuildError> {
    let requested: HashSet<&str> = request.symbols.iter().map(String::as_str).collect();

    let symbol_chars = catalog.symbols.len().div_ceil(BITS);
    let define_chars = catalog.defines.len().div_ceil(BITS);
    let mut id = String::with_capacity(symbol_chars + 1 + define_chars);

    let mut known_symbols: HashSet<&str> = HashSet::with_capacity(catalog.symbols.len());
    for chunk in catalog.symbols.chunks(BITS) {
        let mut value = 0u8;
        for (j, symbol) in chunk.iter().enumerate() {
            known_symbols.insert(symbol.name.as_str());
            if requested.contains(symbol.name.as_str()) {
                value |= 1 << j;
            }
        }
        id.push(ALPHABET[value as usize] as char);
    }

    id.push('.');

    let mut known_defines: HashSet<&str> = HashSet::with_capacity(catalog.defines.len());
    for chunk in catalog.defines.chunks(BITS) {
        let mut value = 0u8;
        for (j, define) in chunk.iter().enumerate() {
            known_defines.insert(define.name.as_str());
            let set = request
                .defines
                .get(&define.name)
                .copied()
                .unwrap_or(define.default);
            if set {
                value |= 1 << j;
            }
        }
        id.push(ALPHABET[value as usize] as char);
    }

    if let Some(unknown) = request
        .symbols
        .iter()
        .find(|name| !known_symbols.contains(name.as_str()))
    {
        return Err(BuildError::InvalidConfig(format!("unknown symbol: {unknown}")));
    }
    if let Some(unknown) = request
        .defines
        .keys()
        .find(|name| !known_defines.contains(name.as_str()))
    {
        return Err(BuildError::InvalidConfig(format!("unknown define: {unknown}")));
    }

    Ok(Fingerprint(id))
}
