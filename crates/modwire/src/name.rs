// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::fmt;

use thiserror::Error;

/// An invalid qualified name.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NameError {
    /// The name or one of its segments was empty.
    #[error("empty name segment")]
    Empty,

    /// A segment is not a valid identifier.
    #[error("`{0}` is not a valid identifier")]
    InvalidIdentifier(String),

    /// The name does not have the expected `:`-separated shape.
    #[error("`{0}` does not match the expected `{1}` shape")]
    Malformed(String, &'static str),
}

fn check_identifier(segment: &str) -> Result<(), NameError> {
    if segment.is_empty() {
        return Err(NameError::Empty);
    }

    let mut chars = segment.chars();
    let leading_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');

    if leading_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(NameError::InvalidIdentifier(segment.to_string()))
    }
}

/// The name of a module: a dot-separated path of identifiers, e.g. `app.storage`.
///
/// Equality, ordering and hashing are structural over the canonical rendering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleName {
    path: String,
}

impl ModuleName {
    /// Parses a dot-separated module path.
    ///
    /// # Errors
    ///
    /// Returns [`NameError`] if the path is empty or a segment is not a valid
    /// identifier.
    pub fn parse(path: &str) -> Result<Self, NameError> {
        if path.is_empty() {
            return Err(NameError::Empty);
        }
        for segment in path.split('.') {
            check_identifier(segment)?;
        }
        Ok(Self {
            path: path.to_string(),
        })
    }

    /// The canonical dotted rendering.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.path
    }

    /// The last path segment.
    #[must_use]
    pub fn simple_name(&self) -> &str {
        self.path.rsplit('.').next().unwrap_or(&self.path)
    }

    /// Creates the name of a bean owned by this module.
    ///
    /// # Errors
    ///
    /// Returns [`NameError`] if `simple_name` is not a valid identifier.
    pub fn bean(&self, simple_name: &str) -> Result<BeanName, NameError> {
        check_identifier(simple_name)?;
        Ok(BeanName {
            module: self.clone(),
            name: simple_name.to_string(),
        })
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// The name of a bean: the owning module plus a simple name, rendered as
/// `module.path:bean`.
///
/// Module-level socket beans are beans of their module and are named with
/// this same shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BeanName {
    module: ModuleName,
    name: String,
}

impl BeanName {
    /// Parses a `module.path:bean` rendering.
    ///
    /// # Errors
    ///
    /// Returns [`NameError`] if the shape or any segment is invalid.
    pub fn parse(value: &str) -> Result<Self, NameError> {
        let (module, name) = value
            .split_once(':')
            .ok_or_else(|| NameError::Malformed(value.to_string(), "module:bean"))?;
        if name.contains(':') {
            return Err(NameError::Malformed(value.to_string(), "module:bean"));
        }
        ModuleName::parse(module)?.bean(name)
    }

    /// The module owning the bean.
    #[must_use]
    pub fn module(&self) -> &ModuleName {
        &self.module
    }

    /// The bean's simple name within its module.
    #[must_use]
    pub fn simple_name(&self) -> &str {
        &self.name
    }

    /// Creates the name of a socket declared on this bean.
    ///
    /// # Errors
    ///
    /// Returns [`NameError`] if `simple_name` is not a valid identifier.
    pub fn socket(&self, simple_name: &str) -> Result<SocketName, NameError> {
        check_identifier(simple_name)?;
        Ok(SocketName {
            bean: self.clone(),
            name: simple_name.to_string(),
        })
    }

    /// The socket name corresponding to this bean when the bean is a
    /// module-level socket bean.
    #[must_use]
    pub fn as_module_socket(&self) -> SocketName {
        SocketName {
            bean: self.clone(),
            name: String::new(),
        }
    }
}

impl fmt::Display for BeanName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.name)
    }
}

/// The name of an injection socket.
///
/// Bean sockets render as `module.path:bean:socket`. A module-level socket is
/// identified by its socket bean and renders as that bean's name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SocketName {
    bean: BeanName,
    // Empty for module-level sockets, which are fully named by their bean.
    name: String,
}

impl SocketName {
    /// Parses either a `module:bean:socket` or a `module:socket` rendering,
    /// the latter denoting a module-level socket.
    ///
    /// # Errors
    ///
    /// Returns [`NameError`] if the shape or any segment is invalid.
    pub fn parse(value: &str) -> Result<Self, NameError> {
        let mut parts = value.splitn(3, ':');
        let module = parts.next().ok_or(NameError::Empty)?;
        let bean = parts
            .next()
            .ok_or_else(|| NameError::Malformed(value.to_string(), "module:bean:socket"))?;
        let bean = ModuleName::parse(module)?.bean(bean)?;
        match parts.next() {
            Some(socket) => bean.socket(socket),
            None => Ok(bean.as_module_socket()),
        }
    }

    /// The bean the socket belongs to.
    ///
    /// For a module-level socket this is the socket bean itself.
    #[must_use]
    pub fn bean(&self) -> &BeanName {
        &self.bean
    }

    /// The socket's simple name, or the bean's simple name for a
    /// module-level socket.
    #[must_use]
    pub fn simple_name(&self) -> &str {
        if self.name.is_empty() {
            self.bean.simple_name()
        } else {
            &self.name
        }
    }

    /// Whether this names a module-level socket rather than a bean socket.
    #[must_use]
    pub fn is_module_socket(&self) -> bool {
        self.name.is_empty()
    }
}

impl fmt::Display for SocketName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            self.bean.fmt(f)
        } else {
            write!(f, "{}:{}", self.bean, self.name)
        }
    }
}

/// Any qualified name, used as the identity diagnostics attach to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QualifiedName {
    /// A module name.
    Module(ModuleName),
    /// A bean name.
    Bean(BeanName),
    /// A socket name.
    Socket(SocketName),
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Module(name) => name.fmt(f),
            Self::Bean(name) => name.fmt(f),
            Self::Socket(name) => name.fmt(f),
        }
    }
}

impl From<ModuleName> for QualifiedName {
    fn from(name: ModuleName) -> Self {
        Self::Module(name)
    }
}

impl From<BeanName> for QualifiedName {
    fn from(name: BeanName) -> Self {
        Self::Bean(name)
    }
}

impl From<SocketName> for QualifiedName {
    fn from(name: SocketName) -> Self {
        Self::Socket(name)
    }
}
