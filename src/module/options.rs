//! Process-wide options readable and settable from the host

use crate::core::{HostRef, HostValue, SType};
use crate::errors::{AttrErrors, Error, Result};
use crate::module::Registry;

/// Names accepted by `get_option` / `set_option`
pub const OPTION_NAMES: [&str; 2] = ["force_stype", "nthreads"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Stype forced onto columns created without an explicit stype
    pub force_stype: SType,
    /// Number of worker threads used by parallel collaborators
    pub nthreads: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            force_stype: SType::Void,
            nthreads: default_nthreads(),
        }
    }
}

#[cfg(feature = "parallel")]
fn default_nthreads() -> usize {
    rayon::current_num_threads()
}

#[cfg(not(feature = "parallel"))]
fn default_nthreads() -> usize {
    1
}

impl Options {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Current value of option `name` as a host value
    pub fn get(&self, name: &str, registry: &Registry) -> Result<HostRef> {
        match name {
            "force_stype" => Ok(registry
                .stype_object(self.force_stype)
                .unwrap_or_else(|| HostRef::str(self.force_stype.name()))),
            "nthreads" => Ok(HostRef::int(self.nthreads as i128)),
            other => Err(unknown_option(other)),
        }
    }

    /// Set option `name` from a host value, validated strictly
    pub fn set(&mut self, name: &str, value: &HostValue, registry: &Registry) -> Result<()> {
        let em = AttrErrors::option(name);
        match name {
            "force_stype" => {
                self.force_stype = if value.is_none() {
                    SType::Void
                } else {
                    value.to_stype(registry, &em)?
                };
            }
            "nthreads" => {
                let n = value.to_size_t(&em)?;
                if n == 0 {
                    return Err(Error::invalid_value(
                        "Value for option `nthreads` must be a positive integer, instead got 0",
                    )
                    .for_param(name));
                }
                self.nthreads = n;
            }
            other => return Err(unknown_option(other)),
        }
        Ok(())
    }
}

fn unknown_option(name: &str) -> Error {
    let hints = crate::errors::find_similar_names(name, OPTION_NAMES, 3)
        .into_iter()
        .map(|s| format!("did you mean `{}`?", s))
        .collect();
    Error::unknown_option(name).with_hints(hints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ErrorKind, ExcType};

    #[test]
    fn test_set_and_get() {
        let registry = Registry::new();
        let mut opts = Options::default();
        opts.set("nthreads", &HostValue::Int(3), &registry).unwrap();
        opts.set("force_stype", &HostValue::Str("int64".into()), &registry).unwrap();
        assert_eq!(opts.nthreads, 3);
        assert_eq!(opts.force_stype, SType::Int64);

        let v = opts.get("force_stype", &registry).unwrap();
        assert!(matches!(v.value(), HostValue::Str(s) if s == "int64"));

        opts.reset();
        assert_eq!(opts.force_stype, SType::Void);
    }

    #[test]
    fn test_setter_diagnostics() {
        let registry = Registry::new();
        let mut opts = Options::default();
        let err = opts.set("nthreads", &HostValue::Float(2.0), &registry).unwrap_err();
        assert_eq!(
            err.message(),
            "Invalid value for option `nthreads`: expected an integer, instead got <class 'float'>"
        );
        let err = opts.set("nthreads", &HostValue::Int(-1), &registry).unwrap_err();
        assert_eq!(err.exc_type(), ExcType::ValueError);
    }

    #[test]
    fn test_unknown_option() {
        let registry = Registry::new();
        let err = Options::default().get("nthread", &registry).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::UnknownOption { name: "nthread".into() });
        assert_eq!(err.hints(), ["did you mean `nthreads`?"]);
    }
}
