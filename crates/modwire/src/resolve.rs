// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Per-socket resolution: candidate filtering, directive precedence and
//! required-ness propagation.
//!
//! The resolver is pure with respect to the module under build: it reads a
//! candidate pool, consults the type oracle, appends diagnostics and returns
//! an outcome. The builder owns all mutable state and applies the returned
//! required-ness tightenings.

use rustc_hash::FxHashMap;

use crate::decl::SocketKind;
use crate::diag::{DiagnosticKind, Diagnostics};
use crate::info::SocketResolution;
use crate::name::{BeanName, QualifiedName};
use crate::types::{TypeOracle, TypeRef};
use crate::wire::WireGroup;

/// One bean eligible to be wired somewhere: a local module bean, a local
/// socket bean, or a public bean of a directly composed sub-module.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub name: BeanName,
    pub provided: TypeRef,
    pub socket_bean: bool,
}

/// An ordered candidate pool.
///
/// Insertion order is the stable declaration order supplied by the
/// declaration source; undirected multi-socket resolution uses it verbatim.
#[derive(Debug, Default)]
pub(crate) struct CandidatePool {
    entries: Vec<Candidate>,
    index: FxHashMap<BeanName, usize>,
}

impl CandidatePool {
    pub fn push(&mut self, candidate: Candidate) {
        // Qualified names are unique across a module and its composed
        // surface; duplicates among simple names are caught by the name
        // conflict check, not here.
        self.index
            .entry(candidate.name.clone())
            .or_insert(self.entries.len());
        self.entries.push(candidate);
    }

    pub fn get(&self, name: &BeanName) -> Option<&Candidate> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.entries.iter()
    }
}

/// One socket to resolve, detached from whether it is a bean socket or a
/// composed module's socket.
#[derive(Debug)]
pub(crate) struct SocketRequest<'a> {
    /// Identity diagnostics attach to.
    pub id: QualifiedName,
    /// The injection type candidates must be assignable to.
    pub socket_type: &'a TypeRef,
    pub kind: SocketKind,
    /// Whether the socket may remain empty without failing the build.
    pub optional: bool,
    /// The owning bean, excluded from its own candidates.
    pub owner: Option<&'a BeanName>,
}

/// The outcome of resolving one socket.
#[derive(Debug)]
pub(crate) struct Resolution {
    pub resolution: SocketResolution,
    /// Socket beans that must be tightened to required because this required
    /// socket wired to them.
    pub tightened: Vec<BeanName>,
}

pub(crate) struct SocketResolver<'a, O: ?Sized> {
    oracle: &'a O,
}

impl<'a, O: TypeOracle + ?Sized> SocketResolver<'a, O> {
    pub fn new(oracle: &'a O) -> Self {
        Self { oracle }
    }

    /// Resolves one socket against `pool`, honoring an explicit directive
    /// group when present.
    pub fn resolve(
        &self,
        pool: &CandidatePool,
        request: &SocketRequest<'_>,
        wires: Option<&WireGroup>,
        diags: &mut Diagnostics,
    ) -> Resolution {
        let outcome = match wires {
            Some(group) => self.resolve_directed(pool, request, group, diags),
            None => self.resolve_auto(pool, request, diags),
        };
        tracing::debug!(
            socket = %request.id,
            resolved = outcome.resolution.is_resolved(),
            wired = outcome.resolution.beans().len(),
            directed = wires.is_some(),
            "resolved socket"
        );
        outcome
    }

    /// Directives strictly override discovery: exactly the named beans are
    /// used, in directive order, each re-validated against the type filter.
    fn resolve_directed(
        &self,
        pool: &CandidatePool,
        request: &SocketRequest<'_>,
        group: &WireGroup,
        diags: &mut Diagnostics,
    ) -> Resolution {
        let mut selected: Vec<&Candidate> = Vec::with_capacity(group.beans.len());
        for name in &group.beans {
            match pool.get(name) {
                None => diags.error(
                    request.id.clone(),
                    DiagnosticKind::UnresolvedRequiredSocket(format!(
                        "wire directive for socket {} names unknown bean {name}",
                        request.id
                    )),
                ),
                Some(candidate)
                    if !self
                        .oracle
                        .is_assignable(&candidate.provided, request.socket_type) =>
                {
                    diags.error(
                        request.id.clone(),
                        DiagnosticKind::UnresolvedRequiredSocket(format!(
                            "bean {name} of type {} is not assignable to socket {} of type {}",
                            candidate.provided, request.id, request.socket_type
                        )),
                    );
                }
                Some(candidate) => selected.push(candidate),
            }
        }

        match request.kind {
            SocketKind::Single => {
                if group.beans.len() > 1 {
                    diags.error(
                        request.id.clone(),
                        DiagnosticKind::AmbiguousSocket(format!(
                            "multiple beans wired into single socket {}: {}",
                            request.id,
                            join_names(group.beans.iter())
                        )),
                    );
                    return Resolution {
                        resolution: SocketResolution::Unresolved,
                        tightened: Vec::new(),
                    };
                }
                match selected.first() {
                    Some(candidate) => Resolution {
                        resolution: SocketResolution::Bean(candidate.name.clone()),
                        tightened: tightened_of(request, &selected),
                    },
                    // The failed name was already reported above, or the
                    // group was emptied during extraction.
                    None => Resolution {
                        resolution: SocketResolution::Unresolved,
                        tightened: Vec::new(),
                    },
                }
            }
            SocketKind::Multi => {
                if selected.is_empty() {
                    Resolution {
                        resolution: SocketResolution::Unresolved,
                        tightened: Vec::new(),
                    }
                } else {
                    Resolution {
                        resolution: SocketResolution::Beans(
                            selected.iter().map(|c| c.name.clone()).collect(),
                        ),
                        tightened: tightened_of(request, &selected),
                    }
                }
            }
        }
    }

    /// Automatic discovery over the whole pool, in declaration order.
    fn resolve_auto(
        &self,
        pool: &CandidatePool,
        request: &SocketRequest<'_>,
        diags: &mut Diagnostics,
    ) -> Resolution {
        let eligible: Vec<&Candidate> = pool
            .iter()
            .filter(|candidate| request.owner != Some(&candidate.name))
            .filter(|candidate| {
                self.oracle
                    .is_assignable(&candidate.provided, request.socket_type)
            })
            .collect();

        match request.kind {
            SocketKind::Single => match eligible.as_slice() {
                [] => {
                    self.report_unresolved(request, diags);
                    Resolution {
                        resolution: SocketResolution::Unresolved,
                        tightened: Vec::new(),
                    }
                }
                [only] => Resolution {
                    resolution: SocketResolution::Bean(only.name.clone()),
                    tightened: tightened_of(request, &eligible),
                },
                _ => {
                    diags.error(
                        request.id.clone(),
                        DiagnosticKind::AmbiguousSocket(format!(
                            "multiple beans match socket {} of type {}: {}",
                            request.id,
                            request.socket_type,
                            join_names(eligible.iter().map(|c| &c.name))
                        )),
                    );
                    Resolution {
                        resolution: SocketResolution::Unresolved,
                        tightened: Vec::new(),
                    }
                }
            },
            SocketKind::Multi => {
                if eligible.is_empty() {
                    self.report_unresolved(request, diags);
                    Resolution {
                        resolution: SocketResolution::Unresolved,
                        tightened: Vec::new(),
                    }
                } else {
                    Resolution {
                        resolution: SocketResolution::Beans(
                            eligible.iter().map(|c| c.name.clone()).collect(),
                        ),
                        tightened: tightened_of(request, &eligible),
                    }
                }
            }
        }
    }

    fn report_unresolved(&self, request: &SocketRequest<'_>, diags: &mut Diagnostics) {
        if !request.optional {
            diags.error(
                request.id.clone(),
                DiagnosticKind::UnresolvedRequiredSocket(format!(
                    "no bean matches required socket {} of type {}",
                    request.id, request.socket_type
                )),
            );
        }
    }
}

/// Required-ness propagates backward: every socket bean wired into a required
/// socket must itself be tightened to required.
fn tightened_of(request: &SocketRequest<'_>, selected: &[&Candidate]) -> Vec<BeanName> {
    if request.optional {
        return Vec::new();
    }
    selected
        .iter()
        .filter(|candidate| candidate.socket_bean)
        .map(|candidate| candidate.name.clone())
        .collect()
}

fn join_names<'a>(names: impl Iterator<Item = &'a BeanName>) -> String {
    names
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ExactOracle;

    fn bean(name: &str) -> BeanName {
        BeanName::parse(name).unwrap()
    }

    fn pool(entries: &[(&str, &str, bool)]) -> CandidatePool {
        let mut pool = CandidatePool::default();
        for (name, ty, socket_bean) in entries {
            pool.push(Candidate {
                name: bean(name),
                provided: TypeRef::new(*ty),
                socket_bean: *socket_bean,
            });
        }
        pool
    }

    fn request<'a>(ty: &'a TypeRef, kind: SocketKind, optional: bool) -> SocketRequest<'a> {
        SocketRequest {
            id: QualifiedName::Socket(crate::name::SocketName::parse("m:svc:dep").unwrap()),
            socket_type: ty,
            kind,
            optional,
            owner: None,
        }
    }

    #[test]
    fn single_socket_with_one_candidate_resolves() {
        let pool = pool(&[("m:a", "Dep", false), ("m:b", "Other", false)]);
        let ty = TypeRef::new("Dep");
        let mut diags = Diagnostics::default();

        let outcome = SocketResolver::new(&ExactOracle).resolve(
            &pool,
            &request(&ty, SocketKind::Single, false),
            None,
            &mut diags,
        );

        assert!(diags.is_empty());
        assert_eq!(outcome.resolution, SocketResolution::Bean(bean("m:a")));
    }

    #[test]
    fn single_socket_with_zero_candidates_fails_when_required() {
        let pool = pool(&[("m:b", "Other", false)]);
        let ty = TypeRef::new("Dep");
        let mut diags = Diagnostics::default();

        let outcome = SocketResolver::new(&ExactOracle).resolve(
            &pool,
            &request(&ty, SocketKind::Single, false),
            None,
            &mut diags,
        );

        assert_eq!(outcome.resolution, SocketResolution::Unresolved);
        assert!(diags.has_errors());
        assert!(matches!(
            diags.iter().next().unwrap().kind(),
            DiagnosticKind::UnresolvedRequiredSocket(_)
        ));
    }

    #[test]
    fn optional_single_socket_stays_silently_empty() {
        let pool = pool(&[]);
        let ty = TypeRef::new("Dep");
        let mut diags = Diagnostics::default();

        let outcome = SocketResolver::new(&ExactOracle).resolve(
            &pool,
            &request(&ty, SocketKind::Single, true),
            None,
            &mut diags,
        );

        assert_eq!(outcome.resolution, SocketResolution::Unresolved);
        assert!(diags.is_empty());
    }

    #[test]
    fn ambiguous_single_socket_names_every_candidate() {
        let pool = pool(&[("m:a", "Dep", false), ("m:b", "Dep", false)]);
        let ty = TypeRef::new("Dep");
        let mut diags = Diagnostics::default();

        let outcome = SocketResolver::new(&ExactOracle).resolve(
            &pool,
            &request(&ty, SocketKind::Single, false),
            None,
            &mut diags,
        );

        assert_eq!(outcome.resolution, SocketResolution::Unresolved);
        let message = diags.iter().next().unwrap().kind().to_string();
        assert!(message.contains("m:a"));
        assert!(message.contains("m:b"));
    }

    #[test]
    fn multi_socket_uses_declaration_order() {
        let pool = pool(&[
            ("m:b1", "Dep", false),
            ("m:b2", "Dep", false),
            ("m:b3", "Dep", false),
        ]);
        let ty = TypeRef::new("Dep");
        let mut diags = Diagnostics::default();

        let outcome = SocketResolver::new(&ExactOracle).resolve(
            &pool,
            &request(&ty, SocketKind::Multi, false),
            None,
            &mut diags,
        );

        assert_eq!(
            outcome.resolution,
            SocketResolution::Beans(vec![bean("m:b1"), bean("m:b2"), bean("m:b3")])
        );
    }

    #[test]
    fn directive_overrides_discovery_and_excludes_the_rest() {
        let pool = pool(&[
            ("m:b1", "Dep", false),
            ("m:b2", "Dep", false),
            ("m:b3", "Dep", false),
        ]);
        let ty = TypeRef::new("Dep");
        let group = WireGroup {
            beans: vec![bean("m:b3"), bean("m:b1")],
        };
        let mut diags = Diagnostics::default();

        let outcome = SocketResolver::new(&ExactOracle).resolve(
            &pool,
            &request(&ty, SocketKind::Multi, false),
            Some(&group),
            &mut diags,
        );

        assert!(diags.is_empty());
        assert_eq!(
            outcome.resolution,
            SocketResolution::Beans(vec![bean("m:b3"), bean("m:b1")])
        );
    }

    #[test]
    fn directive_naming_unknown_bean_is_an_error_not_a_fallback() {
        let pool = pool(&[("m:b1", "Dep", false)]);
        let ty = TypeRef::new("Dep");
        let group = WireGroup {
            beans: vec![bean("m:ghost")],
        };
        let mut diags = Diagnostics::default();

        let outcome = SocketResolver::new(&ExactOracle).resolve(
            &pool,
            &request(&ty, SocketKind::Single, false),
            Some(&group),
            &mut diags,
        );

        // m:b1 would have matched, but the directive suppresses discovery.
        assert_eq!(outcome.resolution, SocketResolution::Unresolved);
        assert!(diags.has_errors());
    }

    #[test]
    fn directive_bean_must_still_pass_the_type_filter() {
        let pool = pool(&[("m:b1", "Other", false)]);
        let ty = TypeRef::new("Dep");
        let group = WireGroup {
            beans: vec![bean("m:b1")],
        };
        let mut diags = Diagnostics::default();

        let outcome = SocketResolver::new(&ExactOracle).resolve(
            &pool,
            &request(&ty, SocketKind::Single, false),
            Some(&group),
            &mut diags,
        );

        assert_eq!(outcome.resolution, SocketResolution::Unresolved);
        assert!(diags.has_errors());
    }

    #[test]
    fn required_socket_tightens_optional_socket_beans() {
        let pool = pool(&[("m:ext", "Dep", true)]);
        let ty = TypeRef::new("Dep");
        let mut diags = Diagnostics::default();

        let outcome = SocketResolver::new(&ExactOracle).resolve(
            &pool,
            &request(&ty, SocketKind::Single, false),
            None,
            &mut diags,
        );

        assert_eq!(outcome.tightened, vec![bean("m:ext")]);
    }

    #[test]
    fn optional_socket_does_not_tighten() {
        let pool = pool(&[("m:ext", "Dep", true)]);
        let ty = TypeRef::new("Dep");
        let mut diags = Diagnostics::default();

        let outcome = SocketResolver::new(&ExactOracle).resolve(
            &pool,
            &request(&ty, SocketKind::Multi, true),
            None,
            &mut diags,
        );

        assert!(outcome.tightened.is_empty());
    }

    #[test]
    fn owner_is_not_its_own_candidate() {
        let pool = pool(&[("m:svc", "Dep", false)]);
        let ty = TypeRef::new("Dep");
        let owner = bean("m:svc");
        let req = SocketRequest {
            owner: Some(&owner),
            ..request(&ty, SocketKind::Single, true)
        };
        let mut diags = Diagnostics::default();

        let outcome =
            SocketResolver::new(&ExactOracle).resolve(&pool, &req, None, &mut diags);

        assert_eq!(outcome.resolution, SocketResolution::Unresolved);
    }
}
