//! Module initialization sequencer
//!
//! Design: a strictly sequential state machine run once per import.
//! - Unstarted -> ConstantsInstalled -> ExceptionsInstalled
//!   -> SubsystemsInitializing -> TypesInstalled -> Ready
//! - Any failing step moves to Failed; the partially built module is
//!   dropped and only the error is returned to the loader
//! - Option state is reset before subsystems run, then the configured
//!   overrides are applied through the strict option setters

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::{error, info, info_span};

use super::functions::{builtin_functions, frame_constructor, NativeFunction};
use super::subsystems::{builtin_subsystems, Subsystem};
use super::{ExceptionTable, Module, ModuleState, TypeObject};
use crate::core::{HostRef, HostValue};
use crate::errors::{Error, Result};
use crate::frontend::Config;

/// Default name of the extension module
pub const MODULE_NAME: &str = "_dtcore";

/// Initialization progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitState {
    Unstarted,
    ConstantsInstalled,
    ExceptionsInstalled,
    SubsystemsInitializing,
    TypesInstalled,
    Ready,
    Failed,
}

impl fmt::Display for InitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InitState::Unstarted => "unstarted",
            InitState::ConstantsInstalled => "constants-installed",
            InitState::ExceptionsInstalled => "exceptions-installed",
            InitState::SubsystemsInitializing => "subsystems-initializing",
            InitState::TypesInstalled => "types-installed",
            InitState::Ready => "ready",
            InitState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Powers of ten used by the number writers, `10^0 ..= 10^19`
pub fn writer_pow10() -> Vec<u64> {
    std::iter::successors(Some(1u64), |x| x.checked_mul(10)).collect()
}

// ============================================================================
// Module builder
// ============================================================================

/// A module under construction
pub struct ModuleBuilder {
    name: String,
    doc: String,
    constants: BTreeMap<String, HostRef>,
    exceptions: Option<ExceptionTable>,
    types: Vec<TypeObject>,
    functions: BTreeMap<String, NativeFunction>,
    state: Arc<ModuleState>,
}

impl ModuleBuilder {
    pub fn new(name: impl Into<String>, state: Arc<ModuleState>) -> Self {
        Self {
            name: name.into(),
            doc: String::new(),
            constants: BTreeMap::new(),
            exceptions: None,
            types: Vec::new(),
            functions: BTreeMap::new(),
            state,
        }
    }

    pub fn state(&self) -> &ModuleState {
        &self.state
    }

    pub fn set_doc(&mut self, doc: impl Into<String>) {
        self.doc = doc.into();
    }

    pub fn add_constant(&mut self, name: impl Into<String>, value: HostRef) {
        self.constants.insert(name.into(), value);
    }

    pub fn set_exceptions(&mut self, table: ExceptionTable) {
        self.exceptions = Some(table);
    }

    pub fn add_function(&mut self, function: NativeFunction) {
        self.functions.insert(function.name().to_string(), function);
    }

    pub fn add_type(&mut self, ty: TypeObject) {
        self.types.push(ty);
    }

    pub fn build(self) -> Module {
        Module {
            name: self.name,
            doc: self.doc,
            constants: self.constants,
            exceptions: self.exceptions.unwrap_or_default(),
            types: self.types,
            functions: self.functions,
            state: self.state,
        }
    }
}

// ============================================================================
// Sequencer
// ============================================================================

/// Runs the import-time initialization steps in order
pub struct ModuleInitializer {
    name: String,
    state: InitState,
    module_state: Arc<ModuleState>,
    subsystems: Vec<Box<dyn Subsystem>>,
    option_overrides: Vec<(String, HostValue)>,
    debug_checks: Option<bool>,
}

impl ModuleInitializer {
    pub fn new() -> Self {
        Self {
            name: MODULE_NAME.to_string(),
            state: InitState::Unstarted,
            module_state: Arc::new(ModuleState::new()),
            subsystems: builtin_subsystems(),
            option_overrides: Vec::new(),
            debug_checks: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Share an existing registry/options state with the new module
    pub fn with_state(mut self, state: Arc<ModuleState>) -> Self {
        self.module_state = state;
        self
    }

    /// Append a subsystem after the built-in ones
    pub fn with_subsystem(mut self, subsystem: Box<dyn Subsystem>) -> Self {
        self.subsystems.push(subsystem);
        self
    }

    /// Verify argument bundles before each call, regardless of build profile
    pub fn with_debug_checks(mut self, enabled: bool) -> Self {
        self.debug_checks = Some(enabled);
        self
    }

    /// Module name, bundle checks and option overrides from a configuration file
    pub fn with_config(mut self, config: &Config) -> Self {
        if let Some(name) = &config.module.name {
            self.name = name.clone();
        }
        if let Some(enabled) = config.module.debug_checks {
            self.debug_checks = Some(enabled);
        }
        if let Some(n) = config.options.nthreads {
            self.option_overrides
                .push(("nthreads".to_string(), HostValue::Int(n as i128)));
        }
        if let Some(st) = &config.options.force_stype {
            self.option_overrides
                .push(("force_stype".to_string(), HostValue::Str(st.clone())));
        }
        self
    }

    pub fn state(&self) -> InitState {
        self.state
    }

    /// Build the module; on failure nothing of it survives
    pub fn run(&mut self) -> Result<Module> {
        let span = info_span!("module_init", module = %self.name);
        let _enter = span.enter();

        match self.run_steps() {
            Ok(module) => {
                self.advance(InitState::Ready);
                Ok(module)
            }
            Err(err) => {
                error!(step = %self.state, error = %err, "module initialization failed");
                self.state = InitState::Failed;
                Err(err)
            }
        }
    }

    fn advance(&mut self, next: InitState) {
        info!(from = %self.state, to = %next, "init step complete");
        self.state = next;
    }

    fn run_steps(&mut self) -> Result<Module> {
        if self.state != InitState::Unstarted {
            return Err(Error::invalid_value(format!(
                "Module `{}` initialization already ran (state: {})",
                self.name, self.state
            )));
        }
        let mut builder = ModuleBuilder::new(self.name.clone(), Arc::clone(&self.module_state));
        builder.set_doc("Native core of the columnar frame library");

        let pow10 = writer_pow10().into_iter().map(HostRef::int).collect();
        builder.add_constant("_csvwrite_pow10", HostRef::list(pow10));
        self.advance(InitState::ConstantsInstalled);

        builder.set_exceptions(ExceptionTable::builtin());
        self.advance(InitState::ExceptionsInstalled);

        builder.state().reset_options();
        for (name, value) in &self.option_overrides {
            builder.state().set_option(name, value)?;
        }
        if let Some(enabled) = self.debug_checks {
            builder.state().set_debug_checks(enabled);
        }
        for function in builtin_functions()? {
            builder.add_function(function);
        }
        self.advance(InitState::SubsystemsInitializing);

        for subsystem in &self.subsystems {
            subsystem
                .static_init(&mut builder)
                .map_err(|cause| Error::subsystem_failure(subsystem.name(), &cause))?;
            info!(subsystem = subsystem.name(), "subsystem initialized");
        }

        builder.add_type(
            TypeObject::new("Frame", "Two-dimensional column-oriented table of data.")
                .with_constructor(frame_constructor()?),
        );
        builder.add_type(TypeObject::new("Ftrl", "Follow the Regularized Leader online model."));
        builder.add_type(TypeObject::new("base_expr", "Base class of column expressions."));
        builder.add_type(TypeObject::new(
            "RowIndex",
            "Row selector shared by the columns of a view.",
        ));
        builder.add_type(TypeObject::new("by", "Grouping specification."));
        builder.add_type(TypeObject::new("join", "Join specification."));
        builder.add_type(TypeObject::new("sort", "Sort specification."));
        self.advance(InitState::TypesInstalled);

        Ok(builder.build())
    }
}

impl Default for ModuleInitializer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    struct Broken;

    impl Subsystem for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn static_init(&self, _: &mut ModuleBuilder) -> Result<()> {
            Err(Error::invalid_value("cannot allocate tables"))
        }
    }

    #[test]
    fn test_pow10_table() {
        let table = writer_pow10();
        assert_eq!(table.len(), 20);
        assert_eq!(table[0], 1);
        assert_eq!(table[19], 10_000_000_000_000_000_000);
    }

    #[test]
    fn test_successful_run() {
        let mut init = ModuleInitializer::new();
        let module = init.run().unwrap();
        assert_eq!(init.state(), InitState::Ready);
        assert_eq!(module.name(), MODULE_NAME);
        assert!(module.constant("_jay_magic").is_some());
        let types: Vec<&str> = module.types().iter().map(TypeObject::name).collect();
        assert_eq!(types, ["Frame", "Ftrl", "base_expr", "RowIndex", "by", "join", "sort"]);
    }

    #[test]
    fn test_failing_subsystem() {
        let mut init = ModuleInitializer::new().with_subsystem(Box::new(Broken));
        let err = init.run().unwrap_err();
        assert_eq!(init.state(), InitState::Failed);
        assert_eq!(
            err.kind(),
            &ErrorKind::SubsystemInitializationFailure {
                subsystem: "broken".into(),
                reason: "cannot allocate tables".into()
            }
        );
    }

    #[test]
    fn test_runs_once() {
        let mut init = ModuleInitializer::new();
        init.run().unwrap();
        assert!(init.run().is_err());
        assert_eq!(init.state(), InitState::Failed);
    }
}
