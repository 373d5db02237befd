//! Function Identity Module
//!
//! Defines the stable identity under which results are cached: a
//! module-qualified function name plus a backend-specific argument
//! signature.

use std::fmt;

// == Function Identifier ==
/// Module-qualified identity of a wrapped callable.
///
/// Two same-named functions in different modules must not collide, so the
/// identity carries the module path alongside the bare name. A callable
/// without a resolvable module context degrades to an empty module prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionId {
    module: String,
    name: String,
}

impl FunctionId {
    // == Constructor ==
    /// Creates an identity from a module path and a function name.
    ///
    /// Use the [`function_id!`](crate::function_id) macro to capture the
    /// calling module automatically.
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
        }
    }

    /// Creates an identity with an empty module prefix, for callables
    /// without a resolvable module context.
    pub fn anonymous(name: impl Into<String>) -> Self {
        Self::new("", name)
    }

    /// The module component of the identity.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// The bare function name.
    pub fn name(&self) -> &str {
        &self.name
    }

    // == Qualified Name ==
    /// The stored form: module and name joined with a dot.
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.module, self.name)
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.name)
    }
}

// == Cache Key ==
/// Deterministic identity of a single cached call.
///
/// Transient: computed per call and never stored independently of an
/// entry. The argument signature representation differs per backend (text
/// for the flat stores, bytes for stores keyed on exact binary equality).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey<K> {
    /// Module-qualified function name
    pub function: String,
    /// Backend-specific argument signature
    pub args: K,
}

impl<K> CacheKey<K> {
    /// Creates a key from a qualified function name and an argument
    /// signature.
    pub fn new(function: impl Into<String>, args: K) -> Self {
        Self {
            function: function.into(),
            args,
        }
    }
}

// == Function Identity Macro ==
/// Builds a [`FunctionId`] qualified with the calling module's path.
///
/// ```ignore
/// let id = function_id!("fetch_weather");
/// ```
#[macro_export]
macro_rules! function_id {
    ($name:expr) => {
        $crate::key::FunctionId::new(module_path!(), $name)
    };
}
