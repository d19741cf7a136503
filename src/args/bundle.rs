//! Argument bundles - binding a host call against a schema
//!
//! Design: all-or-nothing binding.
//! - Positional values fill positional slots in order; overflow goes to
//!   `*args` or is rejected
//! - Keywords bind by name; positional-only names are not addressable
//! - A parameter bound twice is an error naming that parameter
//! - Either every value finds a home or an error is returned before any
//!   native code observes the bundle

use std::ops::Index;

use bitvec::prelude::*;
use smallvec::SmallVec;
use tracing::debug;

use super::arg::Arg;
use super::schema::BundleSchema;
use crate::core::HostRef;
use crate::errors::{find_similar_names, Error, Result};
use crate::module::Registry;

/// Maximum edit distance for "did you mean" keyword suggestions
const MAX_SUGGESTION_DISTANCE: usize = 2;

/// The bound parameters of one native call
#[derive(Debug)]
pub struct Args<'a> {
    schema: &'a BundleSchema,
    args: SmallVec<[Arg<'a>; 8]>,
    varargs: &'a [HostRef],
    varkwds: SmallVec<[(&'a str, &'a HostRef); 4]>,
}

impl<'a> Args<'a> {
    /// Bind a call payload: positional values plus keyword pairs in call order
    pub fn bind(
        schema: &'a BundleSchema,
        positional: &'a [HostRef],
        keywords: &'a [(String, HostRef)],
        registry: &'a Registry,
    ) -> Result<Self> {
        let fname = schema.name();
        let arity = schema.arity();
        let max_positional = schema.max_positional();

        if positional.len() > max_positional && !schema.has_varargs() {
            return Err(Error::too_many_positional(fname, max_positional, positional.len()));
        }

        let mut values: SmallVec<[Option<&'a HostRef>; 8]> = SmallVec::from_elem(None, arity);
        let mut bound: BitVec = bitvec![0; arity];

        let n_fixed = positional.len().min(max_positional);
        for (i, value) in positional[..n_fixed].iter().enumerate() {
            values[i] = Some(value);
            bound.set(i, true);
        }
        let varargs = &positional[n_fixed..];

        let mut varkwds: SmallVec<[(&'a str, &'a HostRef); 4]> = SmallVec::new();
        for (name, value) in keywords {
            match schema.keyword_index(name) {
                Some(idx) => {
                    if bound[idx] {
                        return Err(Error::duplicate_binding(fname, name));
                    }
                    values[idx] = Some(value);
                    bound.set(idx, true);
                }
                None if schema.has_varkwds() => varkwds.push((name.as_str(), value)),
                None => return Err(unknown_keyword(schema, name)),
            }
        }

        debug!(
            function = fname,
            positional = positional.len(),
            keywords = keywords.len(),
            bound = bound.count_ones(),
            "bound call arguments"
        );

        let args = values
            .into_iter()
            .enumerate()
            .map(|(i, value)| Arg::new(i, schema, registry, value))
            .collect();

        Ok(Self {
            schema,
            args,
            varargs,
            varkwds,
        })
    }

    pub fn schema(&self) -> &'a BundleSchema {
        self.schema
    }

    pub fn function_name(&self) -> &'a str {
        self.schema.name()
    }

    /// Host-visible documentation of the bound function
    pub fn doc(&self) -> &'a str {
        self.schema.doc()
    }

    /// Number of declared parameters
    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Descriptor by parameter index
    pub fn get(&self, index: usize) -> Option<&Arg<'a>> {
        self.args.get(index)
    }

    /// Descriptor by declared parameter name
    pub fn by_name(&self, name: &str) -> Option<&Arg<'a>> {
        self.schema.index_of(name).and_then(|i| self.args.get(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arg<'a>> {
        self.args.iter()
    }

    /// Positional values beyond the declared positional parameters
    pub fn varargs(&self) -> &'a [HostRef] {
        self.varargs
    }

    /// Keyword values not matching any declared parameter, in call order
    pub fn varkwds(&self) -> &[(&'a str, &'a HostRef)] {
        &self.varkwds
    }

    pub fn num_varargs(&self) -> usize {
        self.varargs.len()
    }

    pub fn num_varkwds(&self) -> usize {
        self.varkwds.len()
    }

    /// Number of declared parameters that received a value
    pub fn num_defined(&self) -> usize {
        self.args.iter().filter(|a| a.is_defined()).count()
    }

    /// Check that the bundle is consistent with its schema
    pub fn verify(&self) -> Result<()> {
        let fname = self.function_name();
        if self.args.len() != self.schema.arity() {
            return Err(Error::invalid_schema(
                fname,
                format!(
                    "bundle holds {} descriptors for {} parameters",
                    self.args.len(),
                    self.schema.arity()
                ),
            ));
        }
        if let Some((i, arg)) = self.args.iter().enumerate().find(|(i, a)| a.position() != *i) {
            return Err(Error::invalid_schema(
                fname,
                format!("descriptor {} is bound to parameter {}", i, arg.position()),
            ));
        }
        if !self.varargs.is_empty() && !self.schema.has_varargs() {
            return Err(Error::invalid_schema(fname, "extra positional values without `*args`"));
        }
        if !self.varkwds.is_empty() && !self.schema.has_varkwds() {
            return Err(Error::invalid_schema(fname, "extra keyword values without `**kwds`"));
        }
        if let Some((name, _)) = self
            .varkwds
            .iter()
            .find(|(name, _)| self.schema.keyword_index(name).is_some())
        {
            return Err(Error::invalid_schema(
                fname,
                format!("keyword `{}` was collected into `**kwds`", name),
            ));
        }
        Ok(())
    }
}

impl<'a> Index<usize> for Args<'a> {
    type Output = Arg<'a>;

    fn index(&self, index: usize) -> &Arg<'a> {
        &self.args[index]
    }
}

fn unknown_keyword(schema: &BundleSchema, name: &str) -> Error {
    let err = Error::unknown_keyword(schema.name(), name);
    if let Some(idx) = schema.index_of(name) {
        debug_assert!(schema.is_posonly(idx));
        return err.with_hint(format!("`{}` is a positional-only argument", name));
    }
    let candidates = schema.names()[schema.n_posonly()..].iter().map(String::as_str);
    let hints = find_similar_names(name, candidates, MAX_SUGGESTION_DISTANCE)
        .into_iter()
        .map(|s| format!("did you mean `{}`?", s))
        .collect();
    err.with_hints(hints)
}
