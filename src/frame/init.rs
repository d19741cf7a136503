//! The `Frame(...)` constructor
//!
//! Design: the constructor is an ordinary native function over a bundle
//! `Frame(src, /, *, names=None, stypes=None, stype=None, **kwds)`.
//! - The shape of `src` picks the construction path
//! - `names`/`stypes` are validated against the number of columns built
//! - Stype values are converted with a constructor-specific error manager
//! - String sources are delegated to the registered reader function

use tracing::debug;

use super::{Column, Frame};
use crate::args::{Arg, Args, BundleSchema};
use crate::core::{HostRef, HostValue, RangeValue, SType};
use crate::errors::{DefaultErrors, Error, ErrorKind, ErrorManager, Result};
use crate::module::ModuleState;

/// Diagnostics for stype values passed to the constructor
struct FrameInitErrors;

impl ErrorManager for FrameInitErrors {
    fn error_not_stype(&self, got: &HostValue) -> Error {
        Error::type_mismatch("an stype", got.type_name())
            .with_message("Invalid value for `stype` parameter in Frame() constructor")
            .in_function("Frame")
    }
}

pub fn schema() -> Result<BundleSchema> {
    BundleSchema::builder("Frame")
        .posonly(["src"])
        .keyword_only(["names", "stypes", "stype"])
        .varkwds()
        .description("Create a new Frame from a single or multiple sources.")
        .build()
}

/// Bound constructor entry point
pub fn construct(args: &Args<'_>, state: &ModuleState) -> Result<Frame> {
    FrameInit::new(args, state)?.run()
}

struct FrameInit<'b, 'a> {
    args: &'b Args<'a>,
    state: &'b ModuleState,
    src: &'b Arg<'a>,
    names_arg: &'b Arg<'a>,
    stypes_arg: &'b Arg<'a>,
    defined_names: bool,
    defined_stypes: bool,
    defined_stype: bool,
    /// Stype applied to every column, `Void` for auto-detection
    stype0: SType,
}

impl<'b, 'a> FrameInit<'b, 'a> {
    fn new(args: &'b Args<'a>, state: &'b ModuleState) -> Result<Self> {
        let src = &args[0];
        let names_arg = &args[1];
        let stypes_arg = &args[2];
        let stype_arg = &args[3];

        let defined_names = !names_arg.is_none_or_undefined();
        let defined_stypes = !stypes_arg.is_none_or_undefined();
        let defined_stype = !stype_arg.is_none_or_undefined();
        if defined_stype && defined_stypes {
            return Err(Error::invalid_argument(
                "You can pass either parameter `stypes` or `stype` to Frame() constructor, \
                 but not both at the same time",
            ));
        }
        let stype0 = if defined_stype {
            stype_arg.to_stype_with(&FrameInitErrors)?
        } else {
            state.options().force_stype
        };
        if src.is_defined() && args.num_varkwds() > 0 {
            return Err(unknown_kwargs_error(args));
        }

        Ok(Self {
            args,
            state,
            src,
            names_arg,
            stypes_arg,
            defined_names,
            defined_stypes,
            defined_stype,
            stype0,
        })
    }

    fn run(&self) -> Result<Frame> {
        let src = self.src;
        if src.is_list_or_tuple() {
            let items = src.to_list()?;
            return match items.first().map(|item| item.value()) {
                None => self.init_empty(),
                Some(HostValue::List(_)) | Some(HostValue::Range(_)) => {
                    self.init_from_list_of_lists(items)
                }
                Some(HostValue::Dict(_)) if self.defined_names => {
                    self.init_from_list_of_dicts_fixed_keys(items)
                }
                Some(HostValue::Dict(_)) => self.init_from_list_of_dicts_auto_keys(items),
                Some(first) if first.is_tuple() => self.init_from_list_of_tuples(items),
                Some(_) => self.init_from_primitives(src.to_host()?),
            };
        }
        if src.is_dict() {
            return self.init_from_dict(src.to_dict()?);
        }
        if src.is_range() {
            return self.init_from_primitives(src.to_host()?);
        }
        if self.args.num_varkwds() > 0 {
            return self.init_from_varkwds();
        }
        if src.is_frame() {
            return self.init_from_frame();
        }
        if src.is_string() {
            return self.init_from_string();
        }
        if src.is_none_or_undefined() {
            return self.init_empty();
        }
        if src.is_ellipsis() && !self.defined_names && !self.defined_stypes && !self.defined_stype {
            return self.init_placeholder();
        }
        let value = src.to_host()?;
        Err(Error::invalid_argument(format!(
            "Cannot create Frame from <class '{}'>",
            value.type_name()
        )))
    }

    // ========================================================================
    // Construction paths
    // ========================================================================

    fn init_empty(&self) -> Result<Frame> {
        if !self.defined_names {
            self.check_stypes_count(0)?;
            return Ok(Frame::empty());
        }
        let names = self.names_arg.to_stringlist()?;
        self.check_stypes_count(names.len())?;
        let columns = (0..names.len())
            .map(|i| {
                let stype = self.stype_for_column(i, Some(names[i].as_str()))?;
                Column::from_values(i, &[], stype)
            })
            .collect::<Result<Vec<_>>>()?;
        Frame::new(columns, Some(names))
    }

    fn init_from_list_of_lists(&self, items: &[HostRef]) -> Result<Frame> {
        let names = self.check_names_count(items.len())?;
        self.check_stypes_count(items.len())?;
        let columns = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let stype = self.stype_for_column(i, names.as_ref().map(|n| n[i].as_str()))?;
                make_column(i, item, stype)
            })
            .collect::<Result<Vec<_>>>()?;
        Frame::new(columns, names)
    }

    fn init_from_list_of_dicts_fixed_keys(&self, rows: &[HostRef]) -> Result<Frame> {
        let names = self.names_arg.to_stringlist()?;
        self.check_stypes_count(names.len())?;
        for (i, row) in rows.iter().enumerate() {
            if !row.is_dict() {
                return Err(not_a_list_of("dicts", i, row));
            }
        }
        self.init_from_list_of_dicts_with_keys(rows, names)
    }

    /// Column names are the union of the rows' keys in first-seen order
    fn init_from_list_of_dicts_auto_keys(&self, rows: &[HostRef]) -> Result<Frame> {
        if self.defined_stypes && !self.stypes_arg.is_dict() {
            return Err(Error::invalid_argument(
                "If the Frame() source is a list of dicts, then either the `names` list has \
                 to be provided explicitly, or `stypes` parameter has to be a dictionary \
                 (or missing)",
            ));
        }
        let mut names: Vec<String> = Vec::new();
        for (i, row) in rows.iter().enumerate() {
            let HostValue::Dict(entries) = row.value() else {
                return Err(not_a_list_of("dicts", i, row));
            };
            for (key, _) in entries {
                let HostValue::Str(name) = key.value() else {
                    return Err(Error::invalid_argument(format!(
                        "Invalid data in Frame() constructor: row {} dictionary contains a key \
                         of type <class '{}'>, only string keys are allowed",
                        i,
                        key.type_name()
                    )));
                };
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        self.init_from_list_of_dicts_with_keys(rows, names)
    }

    /// One column per name; rows missing a key contribute None
    fn init_from_list_of_dicts_with_keys(
        &self,
        rows: &[HostRef],
        names: Vec<String>,
    ) -> Result<Frame> {
        let columns = names
            .iter()
            .enumerate()
            .map(|(j, name)| {
                let values: Vec<HostRef> = rows
                    .iter()
                    .map(|row| match row.value() {
                        HostValue::Dict(entries) => entries
                            .iter()
                            .find(|(k, _)| matches!(k.value(), HostValue::Str(s) if s == name))
                            .map(|(_, v)| v.clone())
                            .unwrap_or_else(HostRef::none),
                        _ => HostRef::none(),
                    })
                    .collect();
                Column::from_values(j, &values, self.stype_for_column(j, Some(name))?)
            })
            .collect::<Result<Vec<_>>>()?;
        Frame::new(columns, Some(names))
    }

    fn init_from_list_of_tuples(&self, rows: &[HostRef]) -> Result<Frame> {
        let ncols = rows[0].as_tuple().map_or(0, |first| first.len());
        let names = self.check_names_count(ncols)?;
        self.check_stypes_count(ncols)?;

        let mut transposed: Vec<Vec<HostRef>> = vec![Vec::with_capacity(rows.len()); ncols];
        for (i, row) in rows.iter().enumerate() {
            let Some(values) = row.as_tuple() else {
                return Err(not_a_list_of("tuples", i, row));
            };
            if values.len() != ncols {
                return Err(Error::invalid_value(format!(
                    "Misshaped rows in Frame() constructor: row {} contains {} element{}, \
                     while {} had {} element{}",
                    i,
                    values.len(),
                    plural(values.len()),
                    if i == 1 { "the previous row" } else { "previous rows" },
                    ncols,
                    plural(ncols)
                )));
            }
            for (j, value) in values.iter().enumerate() {
                transposed[j].push(value.clone());
            }
        }

        let columns = transposed
            .iter()
            .enumerate()
            .map(|(j, values)| {
                let stype = self.stype_for_column(j, names.as_ref().map(|n| n[j].as_str()))?;
                Column::from_values(j, values, stype)
            })
            .collect::<Result<Vec<_>>>()?;
        let names = names.or_else(|| match rows[0].value() {
            HostValue::NamedTuple(first) => Some(first.fields.clone()),
            _ => None,
        });
        Frame::new(columns, names)
    }

    fn init_from_primitives(&self, src: HostRef) -> Result<Frame> {
        let names = self.check_names_count(1)?;
        self.check_stypes_count(1)?;
        let stype = self.stype_for_column(0, names.as_ref().map(|n| n[0].as_str()))?;
        let column = make_column(0, &src, stype)?;
        Frame::new(vec![column], names)
    }

    fn init_from_dict(&self, items: &[(HostRef, HostRef)]) -> Result<Frame> {
        if self.defined_names {
            return Err(Error::invalid_argument(
                "Parameter `names` cannot be used when constructing a Frame from a dictionary",
            ));
        }
        self.check_stypes_count(items.len())?;
        let mut names = Vec::with_capacity(items.len());
        let mut columns = Vec::with_capacity(items.len());
        for (i, (key, value)) in items.iter().enumerate() {
            let name = key.to_str(&DefaultErrors).map_err(|_| {
                Error::invalid_argument(format!(
                    "Invalid data in Frame() constructor: column name of type <class '{}'>, \
                     only string keys are allowed",
                    key.type_name()
                ))
            })?;
            columns.push(make_column(i, value, self.stype_for_column(i, Some(name))?)?);
            names.push(name.to_string());
        }
        Frame::new(columns, Some(names))
    }

    fn init_from_varkwds(&self) -> Result<Frame> {
        if self.defined_names {
            return Err(Error::invalid_argument(
                "Parameter `names` cannot be used when constructing a Frame from varkwd arguments",
            ));
        }
        let varkwds = self.args.varkwds();
        self.check_stypes_count(varkwds.len())?;
        let mut names = Vec::with_capacity(varkwds.len());
        let mut columns = Vec::with_capacity(varkwds.len());
        for (i, (name, value)) in varkwds.iter().enumerate() {
            columns.push(make_column(i, value, self.stype_for_column(i, Some(*name))?)?);
            names.push(name.to_string());
        }
        Frame::new(columns, Some(names))
    }

    /// `Frame(...)`: a one-cell frame used as a placeholder value
    fn init_placeholder(&self) -> Result<Frame> {
        let column = Column::from_range(0, RangeValue::new(42, 43, 1), SType::Void)?;
        Frame::new(vec![column], Some(vec!["?".to_string()]))
    }

    fn init_from_frame(&self) -> Result<Frame> {
        let source = self.src.to_frame()?;
        if self.defined_stypes || self.defined_stype {
            return Err(Error::invalid_argument(
                "Parameter `stypes` is not allowed when making a copy of a Frame",
            ));
        }
        let names = self.check_names_count(source.ncols())?;
        Frame::new(
            source.columns().to_vec(),
            Some(names.unwrap_or_else(|| source.names().to_vec())),
        )
    }

    fn init_from_string(&self) -> Result<Frame> {
        let reader = self.state.registry().fread_fn().ok_or_else(|| {
            Error::invalid_value(
                "Cannot create Frame from a string: no reader function has been registered",
            )
        })?;
        let callable = reader.as_callable().ok_or_else(|| {
            Error::type_mismatch("a callable", reader.type_name())
                .with_message("The registered reader function is not callable")
        })?;
        debug!(reader = callable.name(), "delegating Frame source to reader");

        let result = callable.call(&[self.src.to_host()?])?;
        if let HostValue::Dict(sources) = result.value() {
            let mut listed: Vec<String> = sources
                .iter()
                .take(2)
                .map(|(k, _)| match k.value() {
                    HostValue::Str(s) => format!("'{}'", s),
                    other => format!("<{}>", other.type_name()),
                })
                .collect();
            if sources.len() > 2 {
                listed.push("...".to_string());
            }
            return Err(Error::invalid_value(format!(
                "Frame cannot be initialized from multiple source files: {}",
                listed.join(", ")
            )));
        }
        let frame = result.to_frame(&DefaultErrors)?;
        Ok(Frame::clone(&frame))
    }

    // ========================================================================
    // Validation helpers
    // ========================================================================

    /// Names for `ncols` columns, if given
    fn check_names_count(&self, ncols: usize) -> Result<Option<Vec<String>>> {
        if !self.defined_names {
            return Ok(None);
        }
        if !self.names_arg.is_list_or_tuple() {
            let got = self.names_arg.to_host()?;
            return Err(Error::type_mismatch("a list of strings", got.type_name()).with_message(
                format!(
                    "{} should be a list of strings, instead received <class '{}'>",
                    self.names_arg.name(),
                    got.type_name()
                ),
            ));
        }
        let names = self.names_arg.to_stringlist()?;
        if names.len() != ncols {
            return Err(count_mismatch("names", names.len(), ncols));
        }
        Ok(Some(names))
    }

    fn check_stypes_count(&self, ncols: usize) -> Result<()> {
        if !self.defined_stypes {
            return Ok(());
        }
        if self.stypes_arg.is_list_or_tuple() {
            let n = self.stypes_arg.to_list()?.len();
            if n != ncols {
                return Err(count_mismatch("stypes", n, ncols));
            }
            return Ok(());
        }
        if self.stypes_arg.is_dict() {
            return Ok(());
        }
        let got = self.stypes_arg.to_host()?;
        Err(Error::type_mismatch("a list of stypes", got.type_name()).with_message(format!(
            "{} should be a list of stypes, instead received <class '{}'>",
            self.stypes_arg.name(),
            got.type_name()
        )))
    }

    /// Requested stype of column `i` (`Void` when unspecified)
    fn stype_for_column(&self, i: usize, name: Option<&str>) -> Result<SType> {
        if !self.defined_stypes {
            return Ok(self.stype0);
        }
        let registry = self.state.registry();
        if self.stypes_arg.is_list_or_tuple() {
            let list = self.stypes_arg.to_list()?;
            return list[i].to_stype(registry, &FrameInitErrors);
        }
        let name = name.ok_or_else(|| {
            Error::invalid_argument(
                "When parameter `stypes` is a dictionary, column `names` must be \
                 explicitly specified",
            )
        })?;
        let stypes = self.stypes_arg.to_dict()?;
        match stypes
            .iter()
            .find(|(k, _)| matches!(k.value(), HostValue::Str(s) if s == name))
        {
            Some((_, st)) => st.to_stype(registry, &FrameInitErrors),
            None => Ok(SType::Void),
        }
    }
}

fn make_column(index: usize, src: &HostRef, stype: SType) -> Result<Column> {
    match src.value() {
        HostValue::List(values) | HostValue::Tuple(values) => {
            Column::from_values(index, values, stype)
        }
        HostValue::Range(range) => Column::from_range(index, *range, stype),
        other => Err(Error::invalid_argument(format!(
            "Cannot create a column from <class '{}'>",
            other.type_name()
        ))),
    }
}

fn not_a_list_of(kind: &str, i: usize, item: &HostRef) -> Error {
    Error::invalid_argument(format!(
        "The source is not a list of {}: element {} is a <class '{}'>",
        kind,
        i,
        item.type_name()
    ))
}

fn count_mismatch(param: &str, n: usize, ncols: usize) -> Error {
    Error::invalid_value(format!(
        "The `{}` argument contains {} element{}, which is {} than the number of columns \
         being created ({})",
        param,
        n,
        plural(n),
        if n < ncols { "less" } else { "more" },
        ncols
    ))
}

fn unknown_kwargs_error(args: &Args<'_>) -> Error {
    let varkwds = args.varkwds();
    let n = varkwds.len();
    let message = if n == 1 {
        format!("Frame() constructor got an unexpected keyword argument '{}'", varkwds[0].0)
    } else {
        let mut out = format!("Frame() constructor got {} unexpected keyword arguments: ", n);
        for (k, (name, _)) in varkwds.iter().enumerate() {
            let i = k + 1;
            if i <= 2 || i == n {
                out.push('\'');
                out.push_str(name);
                out.push('\'');
                out.push_str(if i == n {
                    ""
                } else if i == n - 1 {
                    " and "
                } else if i == 1 {
                    ", "
                } else {
                    ", ..., "
                });
            }
        }
        out
    };
    Error::new(ErrorKind::UnknownKeywordArgument {
        name: varkwds[0].0.to_string(),
    })
    .with_message(message)
    .in_function("Frame")
}

#[inline]
fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
