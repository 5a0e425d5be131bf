// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::fmt;

/// An opaque reference to a type in the target type system.
///
/// The resolver never inspects types itself; it only compares them for
/// identity and asks a [`TypeOracle`] about assignability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeRef {
    name: String,
}

impl TypeRef {
    /// Creates a type reference from its display name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The type's display name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&str> for TypeRef {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for TypeRef {
    fn from(name: String) -> Self {
        Self { name }
    }
}

/// Answers "is a value of type `from` assignable to a slot of type `to`".
///
/// The resolver treats implementations as pure functions: the answer for a
/// given pair must not change during a build.
pub trait TypeOracle {
    /// Whether `from` is assignable to `to`.
    fn is_assignable(&self, from: &TypeRef, to: &TypeRef) -> bool;
}

/// A [`TypeOracle`] that only accepts exact type matches.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExactOracle;

impl TypeOracle for ExactOracle {
    fn is_assignable(&self, from: &TypeRef, to: &TypeRef) -> bool {
        from == to
    }
}
