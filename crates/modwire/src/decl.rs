// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Declaration-side model: what the declaration source hands to the builder.
//!
//! Declarations are immutable once constructed; resolution state never lives
//! here. The frozen resolution-side counterparts are in [`crate::info`].

use smallvec::SmallVec;

use crate::name::{BeanName, SocketName};
use crate::types::TypeRef;

/// Whether a bean is visible to modules composing its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Only wirable within the owning module.
    Private,
    /// Exposed upward to composing modules.
    Public,
}

/// The lifecycle the runtime container gives a bean.
///
/// The resolver carries the scope through to the finalized descriptor; it
/// does not influence wiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// One shared instance per module instance.
    Singleton,
    /// A fresh instance per injection.
    Prototype,
}

/// Whether a socket takes exactly one bean or an ordered sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketKind {
    /// Resolves to exactly one bean.
    Single,
    /// Resolves to an ordered sequence of beans.
    Multi,
}

/// An injection point declared on a module bean.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeanSocketDecl {
    name: SocketName,
    socket_type: TypeRef,
    kind: SocketKind,
    lazy: bool,
    optional: bool,
}

impl BeanSocketDecl {
    /// Declares a required single-bean socket.
    pub fn single(name: SocketName, socket_type: impl Into<TypeRef>) -> Self {
        Self {
            name,
            socket_type: socket_type.into(),
            kind: SocketKind::Single,
            lazy: false,
            optional: false,
        }
    }

    /// Declares a required multi-bean socket.
    pub fn multi(name: SocketName, socket_type: impl Into<TypeRef>) -> Self {
        Self {
            name,
            socket_type: socket_type.into(),
            kind: SocketKind::Multi,
            lazy: false,
            optional: false,
        }
    }

    /// Marks the socket optional: the module is not faulty if it stays empty.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Marks the socket lazy: the dependent receives a deferred-evaluation
    /// handle instead of an eagerly materialized instance. Laziness defers
    /// evaluation only; it never exempts the socket from cycle detection.
    #[must_use]
    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    /// The socket's qualified name.
    #[must_use]
    pub fn name(&self) -> &SocketName {
        &self.name
    }

    /// The injection type dependents must satisfy.
    #[must_use]
    pub fn socket_type(&self) -> &TypeRef {
        &self.socket_type
    }

    /// Single or multi.
    #[must_use]
    pub fn kind(&self) -> SocketKind {
        self.kind
    }

    /// Whether the socket is lazy.
    #[must_use]
    pub fn is_lazy(&self) -> bool {
        self.lazy
    }

    /// Whether the socket may remain unresolved.
    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.optional
    }
}

/// A bean owned by a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleBeanDecl {
    name: BeanName,
    bean_type: TypeRef,
    provided_type: Option<TypeRef>,
    visibility: Visibility,
    scope: Scope,
    init_hooks: SmallVec<[String; 2]>,
    destroy_hooks: SmallVec<[String; 2]>,
    sockets: Vec<BeanSocketDecl>,
}

impl ModuleBeanDecl {
    /// Declares a private singleton bean with no sockets.
    pub fn new(name: BeanName, bean_type: impl Into<TypeRef>) -> Self {
        Self {
            name,
            bean_type: bean_type.into(),
            provided_type: None,
            visibility: Visibility::Private,
            scope: Scope::Singleton,
            init_hooks: SmallVec::new(),
            destroy_hooks: SmallVec::new(),
            sockets: Vec::new(),
        }
    }

    /// Exposes the bean to composing modules.
    #[must_use]
    pub fn public(mut self) -> Self {
        self.visibility = Visibility::Public;
        self
    }

    /// Gives the bean prototype scope.
    #[must_use]
    pub fn prototype(mut self) -> Self {
        self.scope = Scope::Prototype;
        self
    }

    /// Narrows the externally visible type to `provided_type`.
    #[must_use]
    pub fn provides(mut self, provided_type: impl Into<TypeRef>) -> Self {
        self.provided_type = Some(provided_type.into());
        self
    }

    /// Appends an init hook, invoked by the runtime container after wiring.
    #[must_use]
    pub fn init(mut self, hook: impl Into<String>) -> Self {
        self.init_hooks.push(hook.into());
        self
    }

    /// Appends a destroy hook, invoked by the runtime container on teardown.
    #[must_use]
    pub fn destroy(mut self, hook: impl Into<String>) -> Self {
        self.destroy_hooks.push(hook.into());
        self
    }

    /// Appends an injection socket. Declaration order is the order used for
    /// undirected multi-socket resolution.
    #[must_use]
    pub fn with_socket(mut self, socket: BeanSocketDecl) -> Self {
        self.sockets.push(socket);
        self
    }

    /// The bean's qualified name.
    #[must_use]
    pub fn name(&self) -> &BeanName {
        &self.name
    }

    /// The bean's declared (implementation) type.
    #[must_use]
    pub fn bean_type(&self) -> &TypeRef {
        &self.bean_type
    }

    /// The externally visible type, defaulting to the declared type.
    #[must_use]
    pub fn provided_type(&self) -> &TypeRef {
        self.provided_type.as_ref().unwrap_or(&self.bean_type)
    }

    /// The bean's visibility.
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// The bean's scope.
    #[must_use]
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Init hook names, in declaration order.
    #[must_use]
    pub fn init_hooks(&self) -> &[String] {
        &self.init_hooks
    }

    /// Destroy hook names, in declaration order.
    #[must_use]
    pub fn destroy_hooks(&self) -> &[String] {
        &self.destroy_hooks
    }

    /// The bean's injection sockets, in declaration order.
    #[must_use]
    pub fn sockets(&self) -> &[BeanSocketDecl] {
        &self.sockets
    }
}

/// A module-level socket: a bean the module exposes as an injection point to
/// whatever composes it.
///
/// Module sockets are always optional at declaration time; resolution
/// tightens them to required when a required socket wires to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketBeanDecl {
    name: BeanName,
    socket_type: TypeRef,
    kind: SocketKind,
    lazy: bool,
}

impl SocketBeanDecl {
    /// Declares a single-bean module socket.
    pub fn single(name: BeanName, socket_type: impl Into<TypeRef>) -> Self {
        Self {
            name,
            socket_type: socket_type.into(),
            kind: SocketKind::Single,
            lazy: false,
        }
    }

    /// Declares a multi-bean module socket.
    pub fn multi(name: BeanName, socket_type: impl Into<TypeRef>) -> Self {
        Self {
            name,
            socket_type: socket_type.into(),
            kind: SocketKind::Multi,
            lazy: false,
        }
    }

    /// Marks the socket lazy. Laziness never exempts it from cycle detection.
    #[must_use]
    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    /// The socket bean's qualified name.
    #[must_use]
    pub fn name(&self) -> &BeanName {
        &self.name
    }

    /// The injection-point type, both what the socket supplies to dependents
    /// inside the module and what the composing context must provide.
    #[must_use]
    pub fn socket_type(&self) -> &TypeRef {
        &self.socket_type
    }

    /// Single or multi.
    #[must_use]
    pub fn kind(&self) -> SocketKind {
        self.kind
    }

    /// Whether the socket is lazy.
    #[must_use]
    pub fn is_lazy(&self) -> bool {
        self.lazy
    }

    /// The socket name this bean answers to in wire directives.
    #[must_use]
    pub fn socket_name(&self) -> SocketName {
        self.name.as_module_socket()
    }
}

/// An explicit, user-authored directive: wire the named beans, in order, into
/// one socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireDecl {
    into: SocketName,
    beans: Vec<BeanName>,
}

impl WireDecl {
    /// Creates a directive targeting `into` with the given beans in order.
    pub fn new(into: SocketName, beans: impl IntoIterator<Item = BeanName>) -> Self {
        Self {
            into,
            beans: beans.into_iter().collect(),
        }
    }

    /// The targeted socket.
    #[must_use]
    pub fn into_socket(&self) -> &SocketName {
        &self.into
    }

    /// The beans to wire, in directive order.
    #[must_use]
    pub fn beans(&self) -> &[BeanName] {
        &self.beans
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provided_type_defaults_to_bean_type() {
        let name = BeanName::parse("app:cache").unwrap();
        let plain = ModuleBeanDecl::new(name.clone(), "CacheImpl");
        assert_eq!(plain.provided_type().as_str(), "CacheImpl");

        let narrowed = ModuleBeanDecl::new(name, "CacheImpl").provides("Cache");
        assert_eq!(narrowed.provided_type().as_str(), "Cache");
        assert_eq!(narrowed.bean_type().as_str(), "CacheImpl");
    }

    #[test]
    fn socket_flags_default_to_required_eager() {
        let socket = BeanSocketDecl::single(
            SocketName::parse("app:cache:backend").unwrap(),
            "Backend",
        );
        assert!(!socket.is_optional());
        assert!(!socket.is_lazy());
        assert_eq!(socket.kind(), SocketKind::Single);

        let socket = socket.optional().lazy();
        assert!(socket.is_optional());
        assert!(socket.is_lazy());
    }

    #[test]
    fn declaration_order_is_preserved() {
        let bean = BeanName::parse("app:svc").unwrap();
        let decl = ModuleBeanDecl::new(bean.clone(), "Svc")
            .with_socket(BeanSocketDecl::single(bean.socket("first").unwrap(), "A"))
            .with_socket(BeanSocketDecl::single(bean.socket("second").unwrap(), "B"));
        let names: Vec<&str> = decl.sockets().iter().map(|s| s.name().simple_name()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }
}
