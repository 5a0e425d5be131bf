// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::fmt;

use thiserror::Error;

use crate::name::QualifiedName;

/// How serious a diagnostic is.
///
/// Only [`Severity::Error`] marks the enclosing module faulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Advisory; the module remains eligible for generation.
    Warning,
    /// A wiring failure; the module is faulty.
    Error,
}

/// The taxonomy of wiring failures.
///
/// Each variant carries its fully rendered message; identities involved are
/// carried by the owning [`Diagnostic`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DiagnosticKind {
    /// Duplicate bean/socket name, or a name colliding with a composed module.
    #[error("{0}")]
    NameConflict(String),

    /// A required socket has no eligible candidate, or a wire directive names
    /// a bean that does not exist or is not eligible.
    #[error("{0}")]
    UnresolvedRequiredSocket(String),

    /// More than one eligible candidate and no directive to disambiguate.
    #[error("{0}")]
    AmbiguousSocket(String),

    /// One or more beans form a closed loop of required edges.
    #[error("{0}")]
    DependencyCycle(String),
}

/// One message attached to a specific module, bean or socket identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    target: QualifiedName,
    severity: Severity,
    kind: DiagnosticKind,
}

impl Diagnostic {
    /// The identity the message is attached to.
    #[must_use]
    pub fn target(&self) -> &QualifiedName {
        &self.target
    }

    /// The diagnostic's severity.
    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// The failure category and rendered message.
    #[must_use]
    pub fn kind(&self) -> &DiagnosticKind {
        &self.kind
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.target, self.kind)
    }
}

/// An ordered, append-only collection of diagnostics.
///
/// Every check appends here instead of failing fast, so one build pass
/// surfaces every independent problem at once. Appending order is
/// deterministic for a given declaration graph and is part of the crate's
/// contract.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Attaches an error to `target`.
    pub fn error(&mut self, target: impl Into<QualifiedName>, kind: DiagnosticKind) {
        self.entries.push(Diagnostic {
            target: target.into(),
            severity: Severity::Error,
            kind,
        });
    }

    /// Attaches a warning to `target`.
    pub fn warning(&mut self, target: impl Into<QualifiedName>, kind: DiagnosticKind) {
        self.entries.push(Diagnostic {
            target: target.into(),
            severity: Severity::Warning,
            kind,
        });
    }

    /// Whether any error-severity diagnostic has been recorded.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.entries
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// The number of recorded diagnostics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All diagnostics, in the order they were recorded.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// The diagnostics attached to one identity, in recording order.
    pub fn for_target<'a>(
        &'a self,
        target: &'a QualifiedName,
    ) -> impl Iterator<Item = &'a Diagnostic> {
        self.entries.iter().filter(move |d| &d.target == target)
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = core::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::ModuleName;

    fn module(name: &str) -> ModuleName {
        ModuleName::parse(name).unwrap()
    }

    #[test]
    fn ordering_is_append_order() {
        let mut diags = Diagnostics::default();
        diags.warning(
            module("a"),
            DiagnosticKind::NameConflict("first".to_string()),
        );
        diags.error(
            module("b"),
            DiagnosticKind::AmbiguousSocket("second".to_string()),
        );

        let rendered: Vec<String> = diags.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["a: first", "b: second"]);
    }

    #[test]
    fn warnings_are_not_errors() {
        let mut diags = Diagnostics::default();
        diags.warning(
            module("a"),
            DiagnosticKind::NameConflict("only a warning".to_string()),
        );
        assert!(!diags.has_errors());
        assert_eq!(diags.len(), 1);

        diags.error(
            module("a"),
            DiagnosticKind::NameConflict("now an error".to_string()),
        );
        assert!(diags.has_errors());
    }

    #[test]
    fn for_target_filters_by_identity() {
        let mut diags = Diagnostics::default();
        diags.error(module("a"), DiagnosticKind::NameConflict("x".to_string()));
        diags.error(module("b"), DiagnosticKind::NameConflict("y".to_string()));

        let target = QualifiedName::Module(module("a"));
        assert_eq!(diags.for_target(&target).count(), 1);
    }
}
