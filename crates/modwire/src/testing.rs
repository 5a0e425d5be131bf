// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Test support: a [`TypeOracle`] over an explicit subtype table.
//!
//! [`ExactOracle`](crate::types::ExactOracle) only matches identical type
//! names; wiring scenarios that rely on assignability (a bean providing an
//! interface its concrete type implements) declare the relation here instead.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::types::{TypeOracle, TypeRef};

/// An assignability oracle backed by declared `sub -> super` edges.
///
/// Assignability is the reflexive transitive closure of the declared edges.
#[derive(Debug, Default)]
pub struct SubtypeTable {
    supers: FxHashMap<TypeRef, Vec<TypeRef>>,
}

impl SubtypeTable {
    /// An empty table, equivalent to exact matching.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares that `sub` is assignable to `superty`.
    #[must_use]
    pub fn with(mut self, sub: impl Into<TypeRef>, superty: impl Into<TypeRef>) -> Self {
        self.supers.entry(sub.into()).or_default().push(superty.into());
        self
    }
}

impl TypeOracle for SubtypeTable {
    fn is_assignable(&self, from: &TypeRef, to: &TypeRef) -> bool {
        if from == to {
            return true;
        }
        let mut seen: FxHashSet<&TypeRef> = FxHashSet::default();
        let mut frontier = vec![from];
        while let Some(current) = frontier.pop() {
            if !seen.insert(current) {
                continue;
            }
            if current == to {
                return true;
            }
            if let Some(supers) = self.supers.get(current) {
                frontier.extend(supers.iter());
            }
        }
        false
    }
}
