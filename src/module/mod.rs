//! The extension module surface
//!
//! Design: everything the host sees after import lives on a `Module`.
//! - Constants, exception translation, type objects and functions are
//!   installed by the init sequencer (`init`)
//! - Mutable process-wide state (registration slots, options) lives in a
//!   shared `ModuleState` injected into every function body by reference
//! - `Module::call` binds the host payload before any body runs

pub mod registry;
pub mod options;
pub mod functions;
pub mod subsystems;
pub mod init;

pub use functions::NativeFunction;
pub use init::{InitState, ModuleBuilder, ModuleInitializer, MODULE_NAME};
pub use options::Options;
pub use registry::{Registry, Slot, SLOT_COUNT};
pub use subsystems::Subsystem;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::core::{HostRef, HostValue};
use crate::errors::{Error, ExcType, Result};

// ============================================================================
// Shared state
// ============================================================================

/// Registration slots and option values shared by all native functions
#[derive(Debug)]
pub struct ModuleState {
    registry: Registry,
    options: RwLock<Options>,
    /// Verify every bound bundle before its function body runs
    debug_checks: AtomicBool,
}

impl Default for ModuleState {
    fn default() -> Self {
        Self {
            registry: Registry::default(),
            options: RwLock::default(),
            debug_checks: AtomicBool::new(cfg!(debug_assertions)),
        }
    }
}

impl ModuleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn debug_checks(&self) -> bool {
        self.debug_checks.load(Ordering::Relaxed)
    }

    pub fn set_debug_checks(&self, enabled: bool) {
        self.debug_checks.store(enabled, Ordering::Relaxed);
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Snapshot of the current options
    pub fn options(&self) -> Options {
        *self.options.read()
    }

    pub fn reset_options(&self) {
        self.options.write().reset();
    }

    pub fn get_option(&self, name: &str) -> Result<HostRef> {
        self.options().get(name, &self.registry)
    }

    pub fn set_option(&self, name: &str, value: &HostValue) -> Result<()> {
        self.options.write().set(name, value, &self.registry)
    }
}

// ============================================================================
// Exception translation
// ============================================================================

/// Where an error is raised on the host side
#[derive(Debug, Clone)]
pub enum RaiseTarget {
    /// A class injected through the registration slots
    Registered(HostRef),
    /// A builtin host exception class, by name
    Builtin(&'static str),
}

/// Translation of error categories to host exception classes
#[derive(Debug, Clone)]
pub struct ExceptionTable {
    builtin: BTreeMap<ExcType, &'static str>,
}

impl ExceptionTable {
    pub fn builtin() -> Self {
        Self {
            builtin: ExcType::ALL.iter().map(|e| (*e, e.builtin_name())).collect(),
        }
    }

    /// Registered class when present, else the builtin one
    pub fn resolve(&self, exc: ExcType, registry: &Registry) -> RaiseTarget {
        match registry.exception_class(exc) {
            Some(cls) => RaiseTarget::Registered(cls),
            None => RaiseTarget::Builtin(
                self.builtin
                    .get(&exc)
                    .copied()
                    .unwrap_or_else(|| exc.builtin_name()),
            ),
        }
    }
}

impl Default for ExceptionTable {
    fn default() -> Self {
        Self::builtin()
    }
}

// ============================================================================
// Type objects
// ============================================================================

/// A type exposed on the module
#[derive(Debug, Clone)]
pub struct TypeObject {
    name: String,
    doc: String,
    constructor: Option<NativeFunction>,
}

impl TypeObject {
    pub fn new(name: impl Into<String>, doc: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            doc: doc.into(),
            constructor: None,
        }
    }

    pub fn with_constructor(mut self, constructor: NativeFunction) -> Self {
        self.constructor = Some(constructor);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn doc(&self) -> &str {
        &self.doc
    }

    pub fn constructor(&self) -> Option<&NativeFunction> {
        self.constructor.as_ref()
    }
}

// ============================================================================
// Module
// ============================================================================

/// An initialized extension module
pub struct Module {
    name: String,
    doc: String,
    constants: BTreeMap<String, HostRef>,
    exceptions: ExceptionTable,
    types: Vec<TypeObject>,
    functions: BTreeMap<String, NativeFunction>,
    state: Arc<ModuleState>,
}

impl Module {
    /// Run the init sequencer with default settings
    pub fn init() -> Result<Module> {
        ModuleInitializer::new().run()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn doc(&self) -> &str {
        &self.doc
    }

    pub fn constant(&self, name: &str) -> Option<&HostRef> {
        self.constants.get(name)
    }

    pub fn constants(&self) -> &BTreeMap<String, HostRef> {
        &self.constants
    }

    pub fn types(&self) -> &[TypeObject] {
        &self.types
    }

    pub fn type_object(&self, name: &str) -> Option<&TypeObject> {
        self.types.iter().find(|t| t.name == name)
    }

    pub fn functions(&self) -> impl Iterator<Item = &NativeFunction> {
        self.functions.values()
    }

    pub fn function(&self, name: &str) -> Option<&NativeFunction> {
        self.functions.get(name)
    }

    pub fn state(&self) -> &Arc<ModuleState> {
        &self.state
    }

    pub fn registry(&self) -> &Registry {
        self.state.registry()
    }

    /// Call an exposed function with a host payload
    pub fn call(
        &self,
        name: &str,
        positional: &[HostRef],
        keywords: &[(String, HostRef)],
    ) -> Result<HostRef> {
        let function = self.functions.get(name).ok_or_else(|| {
            let hints = crate::errors::find_similar_names(
                name,
                self.functions.keys().map(String::as_str),
                2,
            )
            .into_iter()
            .map(|s| format!("did you mean `{}`?", s))
            .collect();
            Error::unknown_function(name)
                .with_message(format!("module `{}` has no function `{}`", self.name, name))
                .with_hints(hints)
        })?;
        function.invoke(positional, keywords, &self.state)
    }

    /// Instantiate an exposed type through its constructor
    pub fn construct(
        &self,
        type_name: &str,
        positional: &[HostRef],
        keywords: &[(String, HostRef)],
    ) -> Result<HostRef> {
        let constructor = self
            .type_object(type_name)
            .and_then(TypeObject::constructor)
            .ok_or_else(|| {
                Error::unknown_function(type_name)
                    .with_message(format!("cannot create `{}` instances", type_name))
            })?;
        constructor.invoke(positional, keywords, &self.state)
    }

    /// Host class an error should be raised as
    pub fn raise_target(&self, error: &Error) -> RaiseTarget {
        self.exceptions.resolve(error.exc_type(), self.state.registry())
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("constants", &self.constants.keys().collect::<Vec<_>>())
            .field("types", &self.types.iter().map(TypeObject::name).collect::<Vec<_>>())
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .finish()
    }
}
