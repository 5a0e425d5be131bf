// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The module builder: collect declarations, then build once.
//!
//! `build()` runs, in order: name-conflict checks, wire-directive extraction,
//! socket resolution (the module's own bean sockets, then every composed
//! sub-module's sockets), cycle detection, and, only when the graph is
//! acyclic, the final walk recording each socket bean's transitive wired
//! set. Failures accumulate as diagnostics; the result is always a complete
//! [`ModuleInfo`], faulty or not.

use std::collections::BTreeSet;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::cycle::{render_cycle, DependencyGraph};
use crate::decl::{ModuleBeanDecl, SocketBeanDecl, WireDecl};
use crate::diag::{DiagnosticKind, Diagnostics};
use crate::info::{ComposedModule, ModuleBean, ModuleInfo, ResolvedSocket, SocketBean, SocketResolution};
use crate::name::{BeanName, ModuleName, QualifiedName, SocketName};
use crate::resolve::{Candidate, CandidatePool, SocketRequest, SocketResolver};
use crate::types::TypeOracle;
use crate::wire::{extract_wires, SocketMeta};

/// Accumulates one module's declarations, then builds its wiring.
///
/// The collect phase is purely additive; no validation runs until
/// [`ModuleBuilder::build`], which consumes the builder so a module can only
/// be built once.
#[derive(Debug)]
pub struct ModuleBuilder {
    name: ModuleName,
    beans: Vec<ModuleBeanDecl>,
    sockets: Vec<SocketBeanDecl>,
    modules: Vec<Arc<ModuleInfo>>,
    wires: Vec<WireDecl>,
}

impl ModuleBuilder {
    /// Starts collecting declarations for the named module.
    #[must_use]
    pub fn new(name: ModuleName) -> Self {
        Self {
            name,
            beans: Vec::new(),
            sockets: Vec::new(),
            modules: Vec::new(),
            wires: Vec::new(),
        }
    }

    /// Adds an owned module bean. Addition order is the stable declaration
    /// order used by undirected multi-socket resolution.
    #[must_use]
    pub fn bean(mut self, bean: ModuleBeanDecl) -> Self {
        self.beans.push(bean);
        self
    }

    /// Adds a module-level socket bean. Module sockets always start optional;
    /// resolution tightens them to required when a required socket wires to
    /// them.
    #[must_use]
    pub fn socket(mut self, socket: SocketBeanDecl) -> Self {
        self.sockets.push(socket);
        self
    }

    /// Composes an already-built sub-module. Only its finalized public
    /// surface is consulted; it must have been built strictly before this
    /// module.
    #[must_use]
    pub fn compose(mut self, module: Arc<ModuleInfo>) -> Self {
        self.modules.push(module);
        self
    }

    /// Attaches an explicit wire directive.
    #[must_use]
    pub fn wire(mut self, wire: WireDecl) -> Self {
        self.wires.push(wire);
        self
    }

    /// Builds the module: resolves every socket, detects cycles and freezes
    /// the result.
    ///
    /// A module whose build accumulated any error diagnostic is marked
    /// faulty but still yields a complete, introspectable descriptor.
    #[must_use]
    pub fn build(self, oracle: &(impl TypeOracle + ?Sized)) -> ModuleInfo {
        tracing::debug!(
            module = %self.name,
            beans = self.beans.len(),
            sockets = self.sockets.len(),
            composed = self.modules.len(),
            "building module"
        );

        let mut diags = Diagnostics::default();

        self.check_name_conflicts(&mut diags);

        let wire_groups = {
            let mut socket_meta: FxHashMap<SocketName, SocketMeta> = FxHashMap::default();
            for bean in &self.beans {
                for socket in bean.sockets() {
                    socket_meta.insert(
                        socket.name().clone(),
                        SocketMeta {
                            owner: Some(bean.name().clone()),
                        },
                    );
                }
            }
            for module in &self.modules {
                for socket in module.sockets() {
                    socket_meta.insert(socket.socket_name(), SocketMeta { owner: None });
                }
            }
            extract_wires(&self.name, &self.wires, &socket_meta, &mut diags)
        };

        let resolver = SocketResolver::new(oracle);

        let own_socket_index: FxHashMap<BeanName, usize> = self
            .sockets
            .iter()
            .enumerate()
            .map(|(i, socket)| (socket.name().clone(), i))
            .collect();
        let mut socket_required = vec![false; self.sockets.len()];

        // Own bean sockets resolve against local beans, local socket beans
        // and the public beans of directly composed sub-modules.
        let pool = self.candidate_pool(None);
        let mut bean_resolutions: Vec<Vec<SocketResolution>> =
            Vec::with_capacity(self.beans.len());
        for bean in &self.beans {
            let mut resolutions = Vec::with_capacity(bean.sockets().len());
            for socket in bean.sockets() {
                let request = SocketRequest {
                    id: QualifiedName::Socket(socket.name().clone()),
                    socket_type: socket.socket_type(),
                    kind: socket.kind(),
                    optional: socket.is_optional(),
                    owner: Some(bean.name()),
                };
                let outcome = resolver.resolve(
                    &pool,
                    &request,
                    wire_groups.get(socket.name()),
                    &mut diags,
                );
                for name in outcome.tightened {
                    if let Some(&i) = own_socket_index.get(&name) {
                        socket_required[i] = true;
                    }
                }
                resolutions.push(outcome.resolution);
            }
            bean_resolutions.push(resolutions);
        }

        // A composed sub-module's sockets draw candidates from the composing
        // context instead: local beans, local socket beans, and the public
        // beans of the *other* composed sub-modules.
        let mut composed_resolutions: Vec<Vec<SocketResolution>> =
            Vec::with_capacity(self.modules.len());
        for (index, module) in self.modules.iter().enumerate() {
            let sibling_pool = self.candidate_pool(Some(index));
            let mut resolutions = Vec::with_capacity(module.sockets().len());
            for socket in module.sockets() {
                let request = SocketRequest {
                    id: QualifiedName::Bean(socket.name().clone()),
                    socket_type: socket.socket_type(),
                    kind: socket.kind(),
                    optional: !socket.is_required(),
                    owner: None,
                };
                let outcome = resolver.resolve(
                    &sibling_pool,
                    &request,
                    wire_groups.get(&socket.socket_name()),
                    &mut diags,
                );
                for name in outcome.tightened {
                    if let Some(&i) = own_socket_index.get(&name) {
                        socket_required[i] = true;
                    }
                }
                resolutions.push(outcome.resolution);
            }
            composed_resolutions.push(resolutions);
        }

        let cycles = self
            .dependency_graph(&bean_resolutions, &composed_resolutions)
            .find_cycles();
        for cycle in &cycles {
            let rendered = render_cycle(cycle);
            for edge in cycle {
                // Beans owned by composed sub-modules were already validated
                // acyclic by their own build; only annotate local ones.
                if edge.bean.module() == &self.name {
                    diags.error(
                        QualifiedName::Bean(edge.bean.clone()),
                        DiagnosticKind::DependencyCycle(format!(
                            "bean {} forms a cycle in module {}\n{rendered}",
                            edge.bean, self.name
                        )),
                    );
                }
            }
        }

        let mut wired: Vec<BTreeSet<BeanName>> = vec![BTreeSet::new(); self.sockets.len()];
        if cycles.is_empty() {
            self.collect_wired_sets(
                &bean_resolutions,
                &composed_resolutions,
                &mut wired,
            );
        }

        let faulty = diags.has_errors();
        tracing::debug!(
            module = %self.name,
            faulty,
            diagnostics = diags.len(),
            cycles = cycles.len(),
            "module build finished"
        );

        let beans = self
            .beans
            .into_iter()
            .zip(bean_resolutions)
            .map(|(decl, resolutions)| {
                let sockets = decl
                    .sockets()
                    .iter()
                    .cloned()
                    .zip(resolutions)
                    .map(|(socket, resolution)| ResolvedSocket::new(socket, resolution))
                    .collect();
                ModuleBean::new(decl, sockets)
            })
            .collect();

        let sockets = self
            .sockets
            .into_iter()
            .zip(socket_required)
            .zip(wired)
            .map(|((decl, required), wired)| {
                SocketBean::new(decl, required, SocketResolution::Unresolved, wired)
            })
            .collect();

        let modules = self
            .modules
            .into_iter()
            .zip(composed_resolutions)
            .map(|(info, resolutions)| {
                let sockets = info
                    .sockets()
                    .iter()
                    .zip(resolutions)
                    .map(|(socket, resolution)| {
                        SocketBean::new(
                            socket.decl().clone(),
                            socket.is_required(),
                            resolution,
                            socket.wired_beans().clone(),
                        )
                    })
                    .collect();
                ComposedModule::new(info, sockets)
            })
            .collect();

        ModuleInfo::new(self.name, beans, sockets, modules, faulty, diags)
    }

    /// Reports duplicate simple names among beans and socket beans, and
    /// names colliding with a composed sub-module.
    fn check_name_conflicts(&self, diags: &mut Diagnostics) {
        let holders: Vec<&BeanName> = self
            .beans
            .iter()
            .map(ModuleBeanDecl::name)
            .chain(self.sockets.iter().map(SocketBeanDecl::name))
            .collect();

        let mut groups: Vec<(&str, Vec<&BeanName>)> = Vec::new();
        let mut group_index: FxHashMap<&str, usize> = FxHashMap::default();
        for name in &holders {
            let simple = name.simple_name();
            let index = *group_index.entry(simple).or_insert_with(|| {
                groups.push((simple, Vec::new()));
                groups.len() - 1
            });
            groups[index].1.push(name);
        }

        for (simple, members) in &groups {
            if members.len() > 1 {
                for member in members {
                    diags.error(
                        QualifiedName::Bean((*member).clone()),
                        DiagnosticKind::NameConflict(format!(
                            "multiple beans named `{simple}` exist in module {}",
                            self.name
                        )),
                    );
                }
            }
        }

        for module in &self.modules {
            let full = module.name().as_str();
            let last = module.name().simple_name();
            for name in &holders {
                let simple = name.simple_name();
                if simple == full || simple == last {
                    diags.error(
                        QualifiedName::Bean((*name).clone()),
                        DiagnosticKind::NameConflict(format!(
                            "bean {name} conflicts with composed module {}",
                            module.name()
                        )),
                    );
                }
            }
        }
    }

    /// The candidate pool in stable declaration order: own beans, own socket
    /// beans, then composed public beans. `exclude_module` omits one composed
    /// sub-module, for resolving that sub-module's own sockets.
    fn candidate_pool(&self, exclude_module: Option<usize>) -> CandidatePool {
        let mut pool = CandidatePool::default();
        for bean in &self.beans {
            pool.push(Candidate {
                name: bean.name().clone(),
                provided: bean.provided_type().clone(),
                socket_bean: false,
            });
        }
        for socket in &self.sockets {
            pool.push(Candidate {
                name: socket.name().clone(),
                provided: socket.socket_type().clone(),
                socket_bean: true,
            });
        }
        for (index, module) in self.modules.iter().enumerate() {
            if exclude_module == Some(index) {
                continue;
            }
            for bean in module.public_beans() {
                pool.push(Candidate {
                    name: bean.name().clone(),
                    provided: bean.provided_type().clone(),
                    socket_bean: false,
                });
            }
        }
        pool
    }

    /// One node per local bean and socket bean plus the composed surface;
    /// one edge per resolved, required socket. A composed sub-module's
    /// required socket contributes the boundary edges: inward from each of
    /// its public consumers, outward to whatever this module wired into it.
    fn dependency_graph(
        &self,
        bean_resolutions: &[Vec<SocketResolution>],
        composed_resolutions: &[Vec<SocketResolution>],
    ) -> DependencyGraph {
        let mut graph = DependencyGraph::default();

        for bean in &self.beans {
            graph.add_node(bean.name().clone());
        }
        for socket in &self.sockets {
            graph.add_node(socket.name().clone());
        }
        for module in &self.modules {
            for bean in module.public_beans() {
                graph.add_node(bean.name().clone());
            }
            for socket in module.sockets() {
                graph.add_node(socket.name().clone());
            }
        }

        for (bean, resolutions) in self.beans.iter().zip(bean_resolutions) {
            for (socket, resolution) in bean.sockets().iter().zip(resolutions) {
                if socket.is_optional() {
                    continue;
                }
                for target in resolution.beans() {
                    graph.add_edge(bean.name(), target, socket.name().clone(), false);
                }
            }
        }

        for (module, resolutions) in self.modules.iter().zip(composed_resolutions) {
            for (socket, resolution) in module.sockets().iter().zip(resolutions) {
                if !socket.is_required() {
                    continue;
                }
                for consumer in module.public_beans() {
                    if socket.wired_beans().contains(consumer.name()) {
                        graph.add_edge(
                            consumer.name(),
                            socket.name(),
                            socket.socket_name(),
                            true,
                        );
                    }
                }
                for target in resolution.beans() {
                    graph.add_edge(socket.name(), target, socket.socket_name(), true);
                }
            }
        }

        graph
    }

    /// Records, for every own socket bean, the transitive set of beans its
    /// value flows into: direct consumers, beans consuming those consumers,
    /// and so on through every resolved socket edge. When a composed
    /// sub-module's socket is wired somewhere, that socket's own (already
    /// frozen) consumer set is folded in, so the walk also crosses module
    /// boundaries.
    fn collect_wired_sets(
        &self,
        bean_resolutions: &[Vec<SocketResolution>],
        composed_resolutions: &[Vec<SocketResolution>],
        wired: &mut [BTreeSet<BeanName>],
    ) {
        // Reverse resolution edges: wired target -> everything consuming it.
        let mut consumers: FxHashMap<&BeanName, Vec<BeanName>> = FxHashMap::default();
        for (bean, resolutions) in self.beans.iter().zip(bean_resolutions) {
            for resolution in resolutions {
                for target in resolution.beans() {
                    consumers
                        .entry(target)
                        .or_default()
                        .push(bean.name().clone());
                }
            }
        }
        for (module, resolutions) in self.modules.iter().zip(composed_resolutions) {
            for (socket, resolution) in module.sockets().iter().zip(resolutions) {
                for target in resolution.beans() {
                    let entry = consumers.entry(target).or_default();
                    entry.push(socket.name().clone());
                    entry.extend(socket.wired_beans().iter().cloned());
                }
            }
        }

        for (socket, set) in self.sockets.iter().zip(wired) {
            let mut frontier = vec![socket.name().clone()];
            while let Some(current) = frontier.pop() {
                let Some(next) = consumers.get(&current) else {
                    continue;
                };
                for consumer in next {
                    if consumer != socket.name() && set.insert(consumer.clone()) {
                        frontier.push(consumer.clone());
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::BeanSocketDecl;
    use crate::types::ExactOracle;

    fn module(name: &str) -> ModuleName {
        ModuleName::parse(name).unwrap()
    }

    fn bean(name: &str) -> BeanName {
        BeanName::parse(name).unwrap()
    }

    #[test]
    fn empty_module_builds_clean() {
        let info = ModuleBuilder::new(module("app")).build(&ExactOracle);
        assert!(!info.is_faulty());
        assert!(info.diagnostics().is_empty());
        assert!(info.beans().is_empty());
    }

    #[test]
    fn duplicate_names_fault_the_module_even_when_wiring_is_clean() {
        let first = bean("app:cache");
        let second = bean("app:cache");
        let info = ModuleBuilder::new(module("app"))
            .bean(ModuleBeanDecl::new(first.clone(), "CacheA"))
            .bean(ModuleBeanDecl::new(second, "CacheB"))
            .build(&ExactOracle);

        assert!(info.is_faulty());
        let conflicts: Vec<_> = info
            .diagnostics()
            .iter()
            .filter(|d| matches!(d.kind(), DiagnosticKind::NameConflict(_)))
            .collect();
        // One error attached to each holder.
        assert_eq!(conflicts.len(), 2);
    }

    #[test]
    fn bean_name_colliding_with_composed_module_is_a_conflict() {
        let sub = Arc::new(ModuleBuilder::new(module("app.store")).build(&ExactOracle));
        let info = ModuleBuilder::new(module("app"))
            .bean(ModuleBeanDecl::new(bean("app:store"), "Store"))
            .compose(sub)
            .build(&ExactOracle);

        assert!(info.is_faulty());
        assert!(info.diagnostics().iter().any(|d| {
            matches!(d.kind(), DiagnosticKind::NameConflict(message) if message.contains("app.store"))
        }));
    }

    #[test]
    fn resolved_wiring_lands_on_the_frozen_bean() {
        let provider = bean("app:provider");
        let consumer = bean("app:consumer");
        let info = ModuleBuilder::new(module("app"))
            .bean(ModuleBeanDecl::new(provider.clone(), "Dep"))
            .bean(
                ModuleBeanDecl::new(consumer.clone(), "Consumer").with_socket(
                    BeanSocketDecl::single(consumer.socket("dep").unwrap(), "Dep"),
                ),
            )
            .build(&ExactOracle);

        assert!(!info.is_faulty());
        let frozen = info.bean(&consumer).unwrap();
        assert_eq!(
            frozen.sockets()[0].resolution(),
            &SocketResolution::Bean(provider)
        );
    }

    #[test]
    fn build_consumes_the_builder() {
        // Compile-time check by construction: build(self) moves, so a second
        // build of the same accumulator does not typecheck. Nothing to assert
        // at runtime beyond a successful single pass.
        let builder = ModuleBuilder::new(module("app"));
        let _ = builder.build(&ExactOracle);
    }
}
