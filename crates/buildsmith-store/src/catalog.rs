//! Release catalog types.
//!
//! A catalog is the ordered list of exported symbols and boolean defines a
//! release offers. Order is semantically significant: the fingerprint
//! encoder assigns bit positions by catalog order, so a catalog must be
//! stable across reads of the same release.

use serde::{Deserialize, Serialize};

/// A symbol a release can export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolDescriptor {
    pub name: String,
}

/// A boolean compile-time define with its default value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefineDescriptor {
    pub name: String,
    pub default: bool,
}

/// Ordered symbol and define catalog for one release. Immutable per release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseCatalog {
    pub symbols: Vec<SymbolDescriptor>,
    pub defines: Vec<DefineDescriptor>,
}

impl ReleaseCatalog {
    /// Convenience constructor used heavily in tests.
    pub fn new(symbols: Vec<SymbolDescriptor>, defines: Vec<DefineDescriptor>) -> Self {
        Self { symbols, defines }
    }
}
