// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Resolution-side model: the frozen artifacts a build produces.
//!
//! Nothing here is constructible outside the crate; [`crate::build::ModuleBuilder`]
//! is the only producer, which turns "never mutate after build" into a
//! compile-time property.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::decl::{BeanSocketDecl, ModuleBeanDecl, SocketBeanDecl, SocketKind, Visibility};
use crate::diag::Diagnostics;
use crate::name::{BeanName, ModuleName, SocketName};
use crate::types::TypeRef;

/// What a socket resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketResolution {
    /// Nothing wired. Acceptable only for optional sockets.
    Unresolved,
    /// A single socket's one wired bean.
    Bean(BeanName),
    /// A multi socket's ordered, non-empty wired sequence.
    Beans(Vec<BeanName>),
}

impl SocketResolution {
    /// The wired beans in resolution order; empty when unresolved.
    #[must_use]
    pub fn beans(&self) -> &[BeanName] {
        match self {
            Self::Unresolved => &[],
            Self::Bean(bean) => core::slice::from_ref(bean),
            Self::Beans(beans) => beans,
        }
    }

    /// Whether anything was wired.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Unresolved)
    }
}

/// A bean socket together with its frozen resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSocket {
    decl: BeanSocketDecl,
    resolution: SocketResolution,
}

impl ResolvedSocket {
    pub(crate) fn new(decl: BeanSocketDecl, resolution: SocketResolution) -> Self {
        Self { decl, resolution }
    }

    /// The socket's qualified name.
    #[must_use]
    pub fn name(&self) -> &SocketName {
        self.decl.name()
    }

    /// The declaration the resolution was computed for.
    #[must_use]
    pub fn decl(&self) -> &BeanSocketDecl {
        &self.decl
    }

    /// What was wired into the socket.
    #[must_use]
    pub fn resolution(&self) -> &SocketResolution {
        &self.resolution
    }

    /// Whether the socket is resolved: a single socket holds exactly one
    /// bean, a multi socket at least one.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.resolution.is_resolved()
    }

    /// Whether the socket is either resolved or allowed to stay empty.
    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        self.decl.is_optional() || self.is_resolved()
    }
}

/// A module bean with every socket resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleBean {
    decl: ModuleBeanDecl,
    sockets: Vec<ResolvedSocket>,
}

impl ModuleBean {
    pub(crate) fn new(decl: ModuleBeanDecl, sockets: Vec<ResolvedSocket>) -> Self {
        Self { decl, sockets }
    }

    /// The bean's qualified name.
    #[must_use]
    pub fn name(&self) -> &BeanName {
        self.decl.name()
    }

    /// The declaration the bean was built from.
    #[must_use]
    pub fn decl(&self) -> &ModuleBeanDecl {
        &self.decl
    }

    /// The externally visible type.
    #[must_use]
    pub fn provided_type(&self) -> &TypeRef {
        self.decl.provided_type()
    }

    /// Whether composing modules can see the bean.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.decl.visibility() == Visibility::Public
    }

    /// The bean's resolved sockets, in declaration order.
    #[must_use]
    pub fn sockets(&self) -> &[ResolvedSocket] {
        &self.sockets
    }
}

/// A module-level socket bean after resolution.
///
/// For a module's own sockets, `resolution` stays [`SocketResolution::Unresolved`]
/// (the composing context supplies the value); composing modules record their
/// wiring in the [`ComposedModule`] entry they keep for the sub-module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketBean {
    decl: SocketBeanDecl,
    required: bool,
    resolution: SocketResolution,
    wired: BTreeSet<BeanName>,
}

impl SocketBean {
    pub(crate) fn new(
        decl: SocketBeanDecl,
        required: bool,
        resolution: SocketResolution,
        wired: BTreeSet<BeanName>,
    ) -> Self {
        Self {
            decl,
            required,
            resolution,
            wired,
        }
    }

    /// The socket bean's qualified name.
    #[must_use]
    pub fn name(&self) -> &BeanName {
        self.decl.name()
    }

    /// The socket name this bean answers to in wire directives.
    #[must_use]
    pub fn socket_name(&self) -> SocketName {
        self.decl.socket_name()
    }

    /// The declaration the socket bean was built from.
    #[must_use]
    pub fn decl(&self) -> &SocketBeanDecl {
        &self.decl
    }

    /// The injection-point type.
    #[must_use]
    pub fn socket_type(&self) -> &TypeRef {
        self.decl.socket_type()
    }

    /// Single or multi.
    #[must_use]
    pub fn kind(&self) -> SocketKind {
        self.decl.kind()
    }

    /// Whether required-ness propagated onto the socket: some required socket
    /// inside the module (or a composed module) wires to it, so the composing
    /// context must supply it.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// What the composing module wired into the socket.
    #[must_use]
    pub fn resolution(&self) -> &SocketResolution {
        &self.resolution
    }

    /// The transitive set of beans the socket's value is wired into, captured
    /// by the final graph walk of an acyclic build.
    #[must_use]
    pub fn wired_beans(&self) -> &BTreeSet<BeanName> {
        &self.wired
    }
}

/// A directly composed sub-module: the sub-module's frozen result plus the
/// composing module's wiring of its sockets.
///
/// The composing module owns only this immutable snapshot; there is no back
/// reference from the sub-module to its composer.
#[derive(Debug, Clone)]
pub struct ComposedModule {
    info: Arc<ModuleInfo>,
    sockets: Vec<SocketBean>,
}

impl ComposedModule {
    pub(crate) fn new(info: Arc<ModuleInfo>, sockets: Vec<SocketBean>) -> Self {
        Self { info, sockets }
    }

    /// The sub-module's own finalized descriptor.
    #[must_use]
    pub fn info(&self) -> &Arc<ModuleInfo> {
        &self.info
    }

    /// The sub-module's name.
    #[must_use]
    pub fn name(&self) -> &ModuleName {
        self.info.name()
    }

    /// The sub-module's sockets as wired by the composing module.
    #[must_use]
    pub fn sockets(&self) -> &[SocketBean] {
        &self.sockets
    }
}

/// The finalized, immutable result of building one module.
///
/// A faulty module is still complete: every diagnostic and every partial
/// resolution is present for downstream introspection. It is simply never
/// eligible for code generation.
#[derive(Debug, Clone)]
pub struct ModuleInfo {
    name: ModuleName,
    beans: Vec<ModuleBean>,
    sockets: Vec<SocketBean>,
    modules: Vec<ComposedModule>,
    faulty: bool,
    diagnostics: Diagnostics,
}

impl ModuleInfo {
    pub(crate) fn new(
        name: ModuleName,
        beans: Vec<ModuleBean>,
        sockets: Vec<SocketBean>,
        modules: Vec<ComposedModule>,
        faulty: bool,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            name,
            beans,
            sockets,
            modules,
            faulty,
            diagnostics,
        }
    }

    /// The module's qualified name.
    #[must_use]
    pub fn name(&self) -> &ModuleName {
        &self.name
    }

    /// The module's beans, in declaration order.
    #[must_use]
    pub fn beans(&self) -> &[ModuleBean] {
        &self.beans
    }

    /// The module's own socket beans, in declaration order.
    #[must_use]
    pub fn sockets(&self) -> &[SocketBean] {
        &self.sockets
    }

    /// The directly composed sub-modules, in composition order.
    #[must_use]
    pub fn modules(&self) -> &[ComposedModule] {
        &self.modules
    }

    /// Whether the build accumulated one or more errors.
    #[must_use]
    pub fn is_faulty(&self) -> bool {
        self.faulty
    }

    /// Every diagnostic the build accumulated, in recording order.
    #[must_use]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// The beans the module exposes upward to composing modules.
    pub fn public_beans(&self) -> impl Iterator<Item = &ModuleBean> {
        self.beans.iter().filter(|bean| bean.is_public())
    }

    /// Looks up an owned bean by name.
    #[must_use]
    pub fn bean(&self, name: &BeanName) -> Option<&ModuleBean> {
        self.beans.iter().find(|bean| bean.name() == name)
    }

    /// Looks up an own socket bean by name.
    #[must_use]
    pub fn socket(&self, name: &BeanName) -> Option<&SocketBean> {
        self.sockets.iter().find(|socket| socket.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    #[test]
    fn thread_safe_descriptor() {
        assert_impl_all!(ModuleInfo: Send, Sync);
        assert_impl_all!(SocketBean: Send, Sync);
    }

    #[test]
    fn resolution_beans_view() {
        let a = BeanName::parse("m:a").unwrap();
        let b = BeanName::parse("m:b").unwrap();

        assert!(SocketResolution::Unresolved.beans().is_empty());
        assert_eq!(
            SocketResolution::Bean(a.clone()).beans(),
            core::slice::from_ref(&a)
        );
        assert_eq!(
            SocketResolution::Beans(vec![b.clone(), a.clone()]).beans(),
            [b, a]
        );
    }
}
