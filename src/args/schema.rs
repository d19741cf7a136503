//! Bundle schemas - the calling contract of a native function
//!
//! A schema is built once, when the function table is created, and is
//! immutable afterwards. Parameter names are laid out in declaration order:
//! positional-only first, then positional-or-keyword, then keyword-only.

use crate::errors::{Error, Result};

/// Fixed description of a callable's accepted parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleSchema {
    name: String,
    names: Vec<String>,
    n_posonly: usize,
    n_pos_kwd: usize,
    n_kwd_only: usize,
    n_required: usize,
    has_varargs: bool,
    has_varkwds: bool,
    description: String,
    doc: String,
}

impl BundleSchema {
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of declared (non-variadic) parameters
    pub fn arity(&self) -> usize {
        self.names.len()
    }

    pub fn n_posonly(&self) -> usize {
        self.n_posonly
    }

    pub fn n_pos_kwd(&self) -> usize {
        self.n_pos_kwd
    }

    pub fn n_kwd_only(&self) -> usize {
        self.n_kwd_only
    }

    pub fn n_required(&self) -> usize {
        self.n_required
    }

    /// Maximum number of positional values accepted without `*args`
    pub fn max_positional(&self) -> usize {
        self.n_posonly + self.n_pos_kwd
    }

    pub fn has_varargs(&self) -> bool {
        self.has_varargs
    }

    pub fn has_varkwds(&self) -> bool {
        self.has_varkwds
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Host-visible documentation: `name(signature)\n--\n\n<description>`
    pub fn doc(&self) -> &str {
        &self.doc
    }

    pub fn is_posonly(&self, index: usize) -> bool {
        index < self.n_posonly
    }

    pub fn is_required(&self, index: usize) -> bool {
        index < self.n_required
    }

    /// Index of a parameter that may be passed by keyword
    pub fn keyword_index(&self, name: &str) -> Option<usize> {
        self.names
            .iter()
            .enumerate()
            .skip(self.n_posonly)
            .find(|(_, n)| n.as_str() == name)
            .map(|(i, _)| i)
    }

    /// Index of any declared parameter, positional-only included
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Textual signature, e.g. `f(a, /, b, c=None, *args, d=None, **kwds)`
    pub fn signature(&self) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(self.names.len() + 3);
        for (i, name) in self.names.iter().enumerate() {
            if i == self.max_positional() {
                let marker = if self.has_varargs { "*args" } else { "*" };
                parts.push(marker.to_string());
            }
            if self.is_required(i) {
                parts.push(name.clone());
            } else {
                parts.push(format!("{}=None", name));
            }
            if self.n_posonly > 0 && i + 1 == self.n_posonly {
                parts.push("/".to_string());
            }
        }
        if self.has_varargs && self.n_kwd_only == 0 {
            parts.push("*args".to_string());
        }
        if self.has_varkwds {
            parts.push("**kwds".to_string());
        }
        format!("{}({})", self.name, parts.join(", "))
    }
}

/// Incremental construction of a `BundleSchema`
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    name: String,
    posonly: Vec<String>,
    pos_kwd: Vec<String>,
    kwd_only: Vec<String>,
    n_required: usize,
    has_varargs: bool,
    has_varkwds: bool,
    description: String,
}

impl SchemaBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            posonly: Vec::new(),
            pos_kwd: Vec::new(),
            kwd_only: Vec::new(),
            n_required: 0,
            has_varargs: false,
            has_varkwds: false,
            description: String::new(),
        }
    }

    /// Positional-only parameters
    pub fn posonly<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.posonly.extend(names.into_iter().map(Into::into));
        self
    }

    /// Positional-or-keyword parameters
    pub fn positional<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pos_kwd.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn keyword_only<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.kwd_only.extend(names.into_iter().map(Into::into));
        self
    }

    /// The first `n` positional parameters are required
    pub fn required(mut self, n: usize) -> Self {
        self.n_required = n;
        self
    }

    pub fn varargs(mut self) -> Self {
        self.has_varargs = true;
        self
    }

    pub fn varkwds(mut self) -> Self {
        self.has_varkwds = true;
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    pub fn build(self) -> Result<BundleSchema> {
        let n_positional = self.posonly.len() + self.pos_kwd.len();
        if self.n_required > n_positional {
            return Err(Error::invalid_schema(
                &self.name,
                format!(
                    "{} required parameters declared, but only {} are positional",
                    self.n_required, n_positional
                ),
            ));
        }

        let names: Vec<String> = self
            .posonly
            .iter()
            .chain(&self.pos_kwd)
            .chain(&self.kwd_only)
            .cloned()
            .collect();

        for (i, name) in names.iter().enumerate() {
            if name.is_empty() {
                return Err(Error::invalid_schema(&self.name, "empty parameter name"));
            }
            if names[..i].contains(name) {
                return Err(Error::invalid_schema(
                    &self.name,
                    format!("duplicate parameter `{}`", name),
                ));
            }
        }

        let mut schema = BundleSchema {
            name: self.name,
            names,
            n_posonly: self.posonly.len(),
            n_pos_kwd: self.pos_kwd.len(),
            n_kwd_only: self.kwd_only.len(),
            n_required: self.n_required,
            has_varargs: self.has_varargs,
            has_varkwds: self.has_varkwds,
            description: self.description,
            doc: String::new(),
        };
        schema.doc = format!("{}\n--\n\n{}", schema.signature(), schema.description);
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn test_signature_rendering() {
        let schema = BundleSchema::builder("f")
            .posonly(["a"])
            .positional(["b", "c"])
            .keyword_only(["d"])
            .required(2)
            .varargs()
            .varkwds()
            .build()
            .unwrap();
        assert_eq!(schema.signature(), "f(a, /, b, c=None, *args, d=None, **kwds)");
    }

    #[test]
    fn test_signature_bare_star() {
        let schema = BundleSchema::builder("g")
            .positional(["x"])
            .keyword_only(["y"])
            .required(1)
            .build()
            .unwrap();
        assert_eq!(schema.signature(), "g(x, *, y=None)");

        let schema = BundleSchema::builder("h").varargs().build().unwrap();
        assert_eq!(schema.signature(), "h(*args)");
    }

    #[test]
    fn test_doc_format() {
        let schema = BundleSchema::builder("in_debug_mode")
            .description("Return True if built in debug mode")
            .build()
            .unwrap();
        assert_eq!(schema.doc(), "in_debug_mode()\n--\n\nReturn True if built in debug mode");
    }

    #[test]
    fn test_keyword_index_skips_posonly() {
        let schema = BundleSchema::builder("f")
            .posonly(["a"])
            .positional(["b"])
            .build()
            .unwrap();
        assert_eq!(schema.keyword_index("a"), None);
        assert_eq!(schema.keyword_index("b"), Some(1));
        assert_eq!(schema.index_of("a"), Some(0));
    }

    #[test]
    fn test_invalid_schemas() {
        let err = BundleSchema::builder("f")
            .positional(["a", "a"])
            .build()
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidSchema { .. }));

        let err = BundleSchema::builder("f")
            .positional(["a"])
            .keyword_only(["b"])
            .required(2)
            .build()
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidSchema { .. }));
    }
}
