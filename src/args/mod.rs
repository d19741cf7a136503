//! Call-argument binding
//!
//! This module contains the parameter schemas of native functions, the
//! binder that matches a host call against a schema, and the per-parameter
//! descriptors native code reads typed values from.

pub mod schema;
pub mod arg;
pub mod bundle;

pub use arg::Arg;
pub use bundle::Args;
pub use schema::{BundleSchema, SchemaBuilder};
