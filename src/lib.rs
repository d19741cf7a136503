// Core modules
pub mod core;
pub mod errors;
pub mod args;
pub mod frame;
pub mod module;
pub mod frontend;
pub mod infrastructure;

#[cfg(feature = "python")]
pub mod python;

// Re-export commonly used items
pub use core::{HostCallable, HostObject, HostRef, HostValue, LType, RangeValue, SType};
pub use errors::{Error, ErrorKind, ErrorManager, ExcType, Result};
pub use args::{Arg, Args, BundleSchema};
pub use frame::{Column, Frame, RowIndex};
pub use module::{Module, ModuleInitializer, ModuleState, NativeFunction, Registry, Slot};
pub use frontend::Config;
pub use infrastructure::{init_logging, LogConfig};
