// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Multi-module build planning.
//!
//! A [`BuildPlan`] takes a set of module definitions, orders them so every
//! module builds strictly after the modules it composes, and executes the
//! builds while caching each result for its composers. Composition cycles and
//! dangling references are plan-level errors; wiring problems inside a module
//! stay diagnostics on that module.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::build::ModuleBuilder;
use crate::decl::{ModuleBeanDecl, SocketBeanDecl, WireDecl};
use crate::info::ModuleInfo;
use crate::name::ModuleName;
use crate::types::TypeOracle;

/// Errors that invalidate a plan before any module builds.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PlanError {
    /// Two definitions carry the same module name.
    #[error("module {0} is defined more than once")]
    DuplicateModule(ModuleName),

    /// A definition composes a module the plan does not define.
    #[error("module {module} composes unknown module {missing}")]
    UnknownModule {
        /// The composing module.
        module: ModuleName,
        /// The composed name with no matching definition.
        missing: ModuleName,
    },

    /// The composition relation is cyclic, so no build order exists.
    #[error("composition cycle through module {0}")]
    CompositionCycle(ModuleName),
}

/// One module's declarations plus the names of the modules it composes,
/// recorded before any build runs.
#[derive(Debug)]
pub struct ModuleDef {
    name: ModuleName,
    beans: Vec<ModuleBeanDecl>,
    sockets: Vec<SocketBeanDecl>,
    composes: Vec<ModuleName>,
    wires: Vec<WireDecl>,
}

impl ModuleDef {
    /// Starts an empty definition for the named module.
    #[must_use]
    pub fn new(name: ModuleName) -> Self {
        Self {
            name,
            beans: Vec::new(),
            sockets: Vec::new(),
            composes: Vec::new(),
            wires: Vec::new(),
        }
    }

    /// Adds an owned module bean.
    #[must_use]
    pub fn bean(mut self, bean: ModuleBeanDecl) -> Self {
        self.beans.push(bean);
        self
    }

    /// Adds a module-level socket bean.
    #[must_use]
    pub fn socket(mut self, socket: SocketBeanDecl) -> Self {
        self.sockets.push(socket);
        self
    }

    /// Declares composition of another module in the plan, by name.
    #[must_use]
    pub fn compose(mut self, module: ModuleName) -> Self {
        self.composes.push(module);
        self
    }

    /// Attaches an explicit wire directive.
    #[must_use]
    pub fn wire(mut self, wire: WireDecl) -> Self {
        self.wires.push(wire);
        self
    }

    /// The module this definition describes.
    #[must_use]
    pub fn name(&self) -> &ModuleName {
        &self.name
    }
}

/// A validated, topologically ordered set of module definitions.
#[derive(Debug)]
pub struct BuildPlan {
    defs: Vec<ModuleDef>,
    /// Indices into `defs`, composed-before-composer.
    order: Vec<usize>,
}

impl BuildPlan {
    /// Validates the definitions and computes a build order.
    ///
    /// The order is deterministic: among modules whose dependencies are
    /// already ordered, definition order breaks ties.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError`] when a name is defined twice, a composed module
    /// is missing from the plan, or composition is cyclic.
    pub fn new(defs: Vec<ModuleDef>) -> Result<Self, PlanError> {
        let mut index: FxHashMap<&ModuleName, usize> = FxHashMap::default();
        for (i, def) in defs.iter().enumerate() {
            if index.insert(&def.name, i).is_some() {
                return Err(PlanError::DuplicateModule(def.name.clone()));
            }
        }

        for def in &defs {
            for composed in &def.composes {
                if !index.contains_key(composed) {
                    return Err(PlanError::UnknownModule {
                        module: def.name.clone(),
                        missing: composed.clone(),
                    });
                }
            }
        }

        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Mark {
            Unvisited,
            InProgress,
            Ordered,
        }

        fn visit(
            i: usize,
            defs: &[ModuleDef],
            index: &FxHashMap<&ModuleName, usize>,
            marks: &mut [Mark],
            order: &mut Vec<usize>,
        ) -> Result<(), PlanError> {
            match marks[i] {
                Mark::Ordered => return Ok(()),
                Mark::InProgress => {
                    return Err(PlanError::CompositionCycle(defs[i].name.clone()));
                }
                Mark::Unvisited => {}
            }
            marks[i] = Mark::InProgress;
            for composed in &defs[i].composes {
                visit(index[composed], defs, index, marks, order)?;
            }
            marks[i] = Mark::Ordered;
            order.push(i);
            Ok(())
        }

        let mut marks = vec![Mark::Unvisited; defs.len()];
        let mut order = Vec::with_capacity(defs.len());
        for i in 0..defs.len() {
            visit(i, &defs, &index, &mut marks, &mut order)?;
        }

        Ok(Self { defs, order })
    }

    /// The build order, composed modules before their composers.
    pub fn order(&self) -> impl Iterator<Item = &ModuleName> {
        self.order.iter().map(|&i| &self.defs[i].name)
    }

    /// Builds every module in plan order, handing each composer the cached
    /// results of its composed modules.
    #[must_use]
    pub fn execute(self, oracle: &(impl TypeOracle + ?Sized)) -> BuiltModules {
        let mut cache: FxHashMap<ModuleName, Arc<ModuleInfo>> = FxHashMap::default();
        let mut built = Vec::with_capacity(self.defs.len());

        let mut defs: Vec<Option<ModuleDef>> = self.defs.into_iter().map(Some).collect();
        for i in self.order {
            // The order is a permutation of the definitions, so each slot is
            // taken exactly once.
            let Some(def) = defs[i].take() else {
                continue;
            };
            tracing::debug!(module = %def.name, "executing planned build");

            let mut builder = ModuleBuilder::new(def.name.clone());
            for bean in def.beans {
                builder = builder.bean(bean);
            }
            for socket in def.sockets {
                builder = builder.socket(socket);
            }
            for composed in &def.composes {
                // Plan validation and ordering guarantee the composed module
                // is already cached.
                if let Some(info) = cache.get(composed) {
                    builder = builder.compose(Arc::clone(info));
                }
            }
            for wire in def.wires {
                builder = builder.wire(wire);
            }

            let info = Arc::new(builder.build(oracle));
            cache.insert(def.name.clone(), Arc::clone(&info));
            built.push(info);
        }

        BuiltModules { modules: built }
    }
}

/// Every module of an executed plan, in build order.
#[derive(Debug, Clone)]
pub struct BuiltModules {
    modules: Vec<Arc<ModuleInfo>>,
}

impl BuiltModules {
    /// The built modules, composed-before-composer.
    #[must_use]
    pub fn modules(&self) -> &[Arc<ModuleInfo>] {
        &self.modules
    }

    /// Looks up one built module by name.
    #[must_use]
    pub fn get(&self, name: &ModuleName) -> Option<&Arc<ModuleInfo>> {
        self.modules.iter().find(|m| m.name() == name)
    }

    /// Whether any module in the plan accumulated an error diagnostic.
    #[must_use]
    pub fn any_faulty(&self) -> bool {
        self.modules.iter().any(|m| m.is_faulty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ExactOracle;

    fn module(name: &str) -> ModuleName {
        ModuleName::parse(name).unwrap()
    }

    #[test]
    fn composed_modules_build_first() {
        let plan = BuildPlan::new(vec![
            ModuleDef::new(module("app")).compose(module("app.store")),
            ModuleDef::new(module("app.store")),
        ])
        .unwrap();

        let order: Vec<_> = plan.order().map(ModuleName::as_str).collect();
        assert_eq!(order, ["app.store", "app"]);
    }

    #[test]
    fn definition_order_breaks_ties() {
        let plan = BuildPlan::new(vec![
            ModuleDef::new(module("a")),
            ModuleDef::new(module("b")),
            ModuleDef::new(module("c")).compose(module("a")).compose(module("b")),
        ])
        .unwrap();

        let order: Vec<_> = plan.order().map(ModuleName::as_str).collect();
        assert_eq!(order, ["a", "b", "c"]);
    }

    #[test]
    fn duplicate_definitions_are_rejected() {
        let err = BuildPlan::new(vec![
            ModuleDef::new(module("app")),
            ModuleDef::new(module("app")),
        ])
        .unwrap_err();
        assert_eq!(err, PlanError::DuplicateModule(module("app")));
    }

    #[test]
    fn dangling_composition_is_rejected() {
        let err = BuildPlan::new(vec![ModuleDef::new(module("app")).compose(module("gone"))])
            .unwrap_err();
        assert_eq!(
            err,
            PlanError::UnknownModule {
                module: module("app"),
                missing: module("gone"),
            }
        );
    }

    #[test]
    fn composition_cycles_are_rejected() {
        let err = BuildPlan::new(vec![
            ModuleDef::new(module("a")).compose(module("b")),
            ModuleDef::new(module("b")).compose(module("a")),
        ])
        .unwrap_err();
        assert!(matches!(err, PlanError::CompositionCycle(_)));
    }

    #[test]
    fn execution_caches_and_reuses_composed_builds() {
        let shared = module("app.shared");
        let built = BuildPlan::new(vec![
            ModuleDef::new(module("app.front")).compose(shared.clone()),
            ModuleDef::new(module("app.back")).compose(shared.clone()),
            ModuleDef::new(shared.clone()),
        ])
        .unwrap()
        .execute(&ExactOracle);

        assert!(!built.any_faulty());
        let shared_info = built.get(&shared).unwrap();
        let front = built.get(&module("app.front")).unwrap();
        // Same cached instance, not a rebuild.
        assert!(Arc::ptr_eq(shared_info, front.modules()[0].info()));
    }
}
