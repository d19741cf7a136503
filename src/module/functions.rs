//! Native functions exposed on the module
//!
//! Each function pairs an immutable `BundleSchema` with a body that reads
//! typed values off the bound `Args`. Binding happens in `invoke`, so a
//! body never runs for a call that does not match its schema.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use super::ModuleState;
use crate::args::{Args, BundleSchema};
use crate::core::{HostObject, HostRef};
use crate::errors::{Error, Result};
use crate::frame::{self, Column, Frame};

/// Body of a native function
pub type FunctionBody = fn(&Args<'_>, &ModuleState) -> Result<HostRef>;

/// A schema plus the code run for calls that bind against it
#[derive(Clone)]
pub struct NativeFunction {
    schema: Arc<BundleSchema>,
    body: FunctionBody,
}

impl NativeFunction {
    pub fn new(schema: BundleSchema, body: FunctionBody) -> Self {
        Self {
            schema: Arc::new(schema),
            body,
        }
    }

    pub fn name(&self) -> &str {
        self.schema.name()
    }

    pub fn doc(&self) -> &str {
        self.schema.doc()
    }

    pub fn schema(&self) -> &BundleSchema {
        &self.schema
    }

    /// Bind the call payload, then run the body
    pub fn invoke(
        &self,
        positional: &[HostRef],
        keywords: &[(String, HostRef)],
        state: &ModuleState,
    ) -> Result<HostRef> {
        let args = Args::bind(&self.schema, positional, keywords, state.registry())?;
        if state.debug_checks() {
            args.verify()?;
        }
        trace!(function = self.name(), "invoking native function");
        (self.body)(&args, state)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<built-in function {}>", self.name())
    }
}

/// The module's method table
pub fn builtin_functions() -> Result<Vec<NativeFunction>> {
    Ok(vec![
        NativeFunction::new(
            BundleSchema::builder("_register_function")
                .posonly(["n", "fn"])
                .required(2)
                .description("Register a host object under the given slot id.")
                .build()?,
            register_function,
        ),
        NativeFunction::new(
            BundleSchema::builder("has_omp_support")
                .description(
                    "Return True if the module was built with parallel execution support, \
                     and False otherwise.",
                )
                .build()?,
            has_omp_support,
        ),
        NativeFunction::new(
            BundleSchema::builder("in_debug_mode")
                .description("Return True if the module was compiled in debug mode")
                .build()?,
            in_debug_mode,
        ),
        NativeFunction::new(
            BundleSchema::builder("frame_column_rowindex")
                .positional(["frame", "i"])
                .required(2)
                .description(
                    "Return the RowIndex of the `i`th column of the `frame`, or None if that \
                     column has no row index.",
                )
                .build()?,
            frame_column_rowindex,
        ),
        NativeFunction::new(
            BundleSchema::builder("frame_column_data_r")
                .positional(["frame", "i"])
                .required(2)
                .description("Return the address of the main data array of the column `frame[i]`.")
                .build()?,
            frame_column_data_r,
        ),
        NativeFunction::new(
            BundleSchema::builder("get_option")
                .positional(["name"])
                .required(1)
                .description("Return the current value of an option.")
                .build()?,
            get_option,
        ),
        NativeFunction::new(
            BundleSchema::builder("set_option")
                .positional(["name", "value"])
                .required(2)
                .description("Set the value of an option.")
                .build()?,
            set_option,
        ),
    ])
}

/// Constructor of the Frame type
pub fn frame_constructor() -> Result<NativeFunction> {
    Ok(NativeFunction::new(frame::init::schema()?, construct_frame))
}

// ============================================================================
// Function bodies
// ============================================================================

fn register_function(args: &Args<'_>, state: &ModuleState) -> Result<HostRef> {
    let n = args[0].to_int_exact()?;
    let obj = args[1].to_host()?;
    state.registry().register(n, obj)?;
    Ok(HostRef::none())
}

fn has_omp_support(_: &Args<'_>, _: &ModuleState) -> Result<HostRef> {
    Ok(HostRef::bool(cfg!(feature = "parallel")))
}

fn in_debug_mode(_: &Args<'_>, _: &ModuleState) -> Result<HostRef> {
    Ok(HostRef::bool(cfg!(debug_assertions)))
}

/// The frame and column index shared by the column introspection functions
fn unpack_frame_column(args: &Args<'_>) -> Result<(Arc<Frame>, usize)> {
    let frame = args[0].to_frame()?;
    let col = args[1].to_size_t()?;
    if col >= frame.ncols() {
        return Err(Error::index_out_of_bounds(col, frame.ncols())
            .with_message("Index out of bounds")
            .in_function(args.function_name())
            .for_param(args[1].param_name()));
    }
    Ok((frame, col))
}

fn with_column<T>(args: &Args<'_>, f: impl FnOnce(&Column) -> T) -> Result<T> {
    let (frame, col) = unpack_frame_column(args)?;
    let column = frame.column_checked(col)?;
    Ok(f(column))
}

fn frame_column_rowindex(args: &Args<'_>, _: &ModuleState) -> Result<HostRef> {
    with_column(args, |column| match column.rowindex() {
        Some(ri) => HostRef::object(HostObject::from_arc("RowIndex", Arc::clone(ri))),
        None => HostRef::none(),
    })
}

fn frame_column_data_r(args: &Args<'_>, _: &ModuleState) -> Result<HostRef> {
    with_column(args, |column| HostRef::int(column.data_ptr() as i128))
}

fn get_option(args: &Args<'_>, state: &ModuleState) -> Result<HostRef> {
    let name = args[0].to_string()?;
    state.options().get(name, state.registry())
}

fn set_option(args: &Args<'_>, state: &ModuleState) -> Result<HostRef> {
    let name = args[0].to_string()?;
    let value = args[1].to_host()?;
    state.set_option(name, &value)?;
    Ok(HostRef::none())
}

fn construct_frame(args: &Args<'_>, state: &ModuleState) -> Result<HostRef> {
    frame::init::construct(args, state).map(HostRef::frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_docs() {
        let functions = builtin_functions().unwrap();
        let names: Vec<&str> = functions.iter().map(NativeFunction::name).collect();
        assert_eq!(
            names,
            [
                "_register_function",
                "has_omp_support",
                "in_debug_mode",
                "frame_column_rowindex",
                "frame_column_data_r",
                "get_option",
                "set_option"
            ]
        );
        let rowindex = &functions[3];
        assert!(rowindex.doc().starts_with("frame_column_rowindex(frame, i)\n--\n\n"));
    }

    #[test]
    fn test_capability_queries() {
        let state = ModuleState::new();
        let functions = builtin_functions().unwrap();
        let debug = functions[2].invoke(&[], &[], &state).unwrap();
        assert_eq!(debug.to_bool_strict(&crate::errors::DefaultErrors), Ok(cfg!(debug_assertions)));

        let err = functions[1].invoke(&[HostRef::int(1)], &[], &state).unwrap_err();
        assert_eq!(
            err.message(),
            "has_omp_support() takes no positional arguments, but 1 were given"
        );
    }
}
