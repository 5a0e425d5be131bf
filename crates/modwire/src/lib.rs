// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Modwire resolves the dependency wiring of component modules ahead of time.
//!
//! A module declares beans (managed components), the sockets those beans
//! inject their dependencies through, module-level socket beans that expose
//! dependencies to a composing module, and optional wire directives that pin
//! a socket to explicit beans. [`ModuleBuilder`] turns those declarations
//! into a frozen [`ModuleInfo`]: every socket resolved against the candidate
//! pool, explicit directives taking precedence over automatic discovery,
//! instantiation cycles detected and rendered, and every failure accumulated
//! as a [`Diagnostic`] rather than aborting the build.
//!
//! Key properties:
//!
//! * Builds are total. A module with unresolved required sockets, ambiguous
//!   candidates or dependency cycles still produces a complete descriptor;
//!   it is marked faulty and carries the diagnostics explaining why.
//! * Builds are deterministic. Identical declarations produce identical
//!   resolutions and an identical diagnostic sequence, independent of hash
//!   map iteration order.
//! * Built modules are frozen. Composing a module observes its public beans
//!   and sockets but never mutates it; the composer records its side of the
//!   wiring in its own descriptor.
//!
//! Multi-module programs hand their definitions to a [`BuildPlan`], which
//! orders builds so composed modules build first and caches each result for
//! its composers.
//!
//! The library is agnostic to the concrete type system being wired: types
//! are opaque [`TypeRef`] names, and assignability is delegated to a
//! [`TypeOracle`] supplied by the caller.

mod build;
mod cycle;
mod decl;
mod diag;
mod info;
mod name;
mod plan;
mod resolve;
pub mod testing;
mod types;
mod wire;

pub use build::ModuleBuilder;
pub use decl::{
    BeanSocketDecl, ModuleBeanDecl, Scope, SocketBeanDecl, SocketKind, Visibility, WireDecl,
};
pub use diag::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use info::{
    ComposedModule, ModuleBean, ModuleInfo, ResolvedSocket, SocketBean, SocketResolution,
};
pub use name::{BeanName, ModuleName, NameError, QualifiedName, SocketName};
pub use plan::{BuildPlan, BuiltModules, ModuleDef, PlanError};
pub use types::{ExactOracle, TypeOracle, TypeRef};
