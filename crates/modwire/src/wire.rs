// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Wire directive extraction: turning the raw directives attached to a module
//! into validated groups keyed by target socket.
//!
//! A socket with a group never falls back to automatic candidate discovery,
//! even when every name in the group turns out to be unusable; the directive
//! defines a total selection for that socket once present.

use rustc_hash::FxHashMap;

use crate::decl::WireDecl;
use crate::diag::{DiagnosticKind, Diagnostics};
use crate::name::{BeanName, ModuleName, SocketName};

/// What the extractor knows about a wirable socket: for bean sockets, the
/// owning bean (a bean cannot be wired into its own socket).
#[derive(Debug, Clone)]
pub(crate) struct SocketMeta {
    pub owner: Option<BeanName>,
}

/// The merged directives for one socket, in attachment order.
#[derive(Debug, Clone, Default)]
pub(crate) struct WireGroup {
    pub beans: Vec<BeanName>,
}

/// Validates `wires` against the sockets of the module under build and groups
/// them by target socket.
///
/// `sockets` holds every socket a directive may legally target: the bean
/// sockets of the module's own beans and the module-level sockets of directly
/// composed sub-modules. Violations are reported to `diags` and the offending
/// directive (or name) is dropped from its group.
pub(crate) fn extract_wires(
    module: &ModuleName,
    wires: &[WireDecl],
    sockets: &FxHashMap<SocketName, SocketMeta>,
    diags: &mut Diagnostics,
) -> FxHashMap<SocketName, WireGroup> {
    let mut groups: FxHashMap<SocketName, WireGroup> = FxHashMap::default();

    for wire in wires {
        let socket = wire.into_socket();
        let Some(meta) = sockets.get(socket) else {
            diags.error(
                module.clone(),
                DiagnosticKind::UnresolvedRequiredSocket(format!(
                    "wire directive targets unknown socket {socket}"
                )),
            );
            continue;
        };

        if wire.beans().is_empty() {
            diags.error(
                socket.clone(),
                DiagnosticKind::UnresolvedRequiredSocket(format!(
                    "wire directive for socket {socket} names no beans"
                )),
            );
        }

        let group = groups.entry(socket.clone()).or_default();
        for bean in wire.beans() {
            if meta.owner.as_ref() == Some(bean) {
                diags.error(
                    socket.clone(),
                    DiagnosticKind::UnresolvedRequiredSocket(format!(
                        "bean {bean} cannot be wired into its own socket {socket}"
                    )),
                );
                continue;
            }
            if group.beans.contains(bean) {
                diags.warning(
                    socket.clone(),
                    DiagnosticKind::NameConflict(format!(
                        "bean {bean} is wired into socket {socket} more than once"
                    )),
                );
                continue;
            }
            group.beans.push(bean.clone());
        }
    }

    tracing::debug!(
        module = %module,
        directives = wires.len(),
        grouped_sockets = groups.len(),
        "extracted wire directives"
    );

    groups
}
