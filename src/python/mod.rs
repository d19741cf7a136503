//! Python bindings
//!
//! Design: a thin translation layer over `Module`.
//! - Python objects are converted to `HostRef` trees on the way in and back
//!   on the way out; objects with no native counterpart travel as foreign
//!   handles carrying the Python object itself
//! - Every exposed function is a `builtin_function` instance dispatching to
//!   `Module::call`, so binding and error reporting match the native API
//! - Errors are raised as the class registered for their category, or the
//!   builtin class when nothing was registered

use std::sync::Arc;

use once_cell::sync::OnceCell;
use pyo3::exceptions::{PyImportError, PyTypeError, PyUserWarning, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyBool, PyBytes, PyDict, PyFloat, PyList, PyLong, PyString, PyTuple, PyType};
use tracing::warn;

use crate::core::{HostCallable, HostObject, HostRef, HostValue, NamedTuple, RangeValue};
use crate::errors::{Error, Result};
use crate::frame::{Frame, RowIndex};
use crate::frontend::Config;
use crate::infrastructure::logging::{self, LogConfig};
use crate::module::{Module, ModuleInitializer, RaiseTarget};

static MODULE: OnceCell<Arc<Module>> = OnceCell::new();

fn module() -> PyResult<&'static Arc<Module>> {
    MODULE
        .get()
        .ok_or_else(|| PyImportError::new_err("module `_dtcore` is not initialized"))
}

// ============================================================================
// Python -> host
// ============================================================================

/// Python object kept alive inside a `HostObject`
pub struct PyHandle(pub Py<PyAny>);

fn qualified_type_name(obj: &PyAny) -> PyResult<String> {
    let ty = obj.get_type();
    let name = ty.name()?;
    let module: String = ty
        .getattr("__module__")
        .and_then(|m| m.extract())
        .unwrap_or_default();
    Ok(if module.is_empty() || module == "builtins" {
        name.to_string()
    } else {
        format!("{}.{}", module, name)
    })
}

fn to_host(obj: &PyAny) -> PyResult<HostRef> {
    let py = obj.py();
    let value = if obj.is_none() {
        HostValue::None
    } else if let Ok(b) = obj.downcast::<PyBool>() {
        HostValue::Bool(b.is_true())
    } else if obj.is_instance_of::<PyLong>() {
        HostValue::Int(obj.extract::<i128>()?)
    } else if let Ok(f) = obj.downcast::<PyFloat>() {
        HostValue::Float(f.value())
    } else if let Ok(s) = obj.downcast::<PyString>() {
        HostValue::Str(s.to_str()?.to_string())
    } else if let Ok(b) = obj.downcast::<PyBytes>() {
        HostValue::Bytes(b.as_bytes().to_vec())
    } else if let Ok(list) = obj.downcast::<PyList>() {
        HostValue::List(list.iter().map(to_host).collect::<PyResult<_>>()?)
    } else if let Ok(tuple) = obj.downcast::<PyTuple>() {
        let values = tuple.iter().map(to_host).collect::<PyResult<_>>()?;
        if obj.is_exact_instance_of::<PyTuple>() || !obj.hasattr("_fields")? {
            HostValue::Tuple(values)
        } else {
            HostValue::NamedTuple(NamedTuple {
                type_name: qualified_type_name(obj)?,
                fields: obj.getattr("_fields")?.extract()?,
                values,
            })
        }
    } else if let Ok(dict) = obj.downcast::<PyDict>() {
        HostValue::Dict(
            dict.iter()
                .map(|(k, v)| Ok((to_host(k)?, to_host(v)?)))
                .collect::<PyResult<_>>()?,
        )
    } else if obj.is(&py.Ellipsis()) {
        HostValue::Ellipsis
    } else if let Ok(frame) = obj.extract::<PyRef<PyFrame>>() {
        HostValue::Object(HostObject::from_arc("Frame", Arc::clone(&frame.inner)))
    } else if let Ok(ri) = obj.extract::<PyRef<PyRowIndex>>() {
        HostValue::Object(HostObject::from_arc("RowIndex", Arc::clone(&ri.inner)))
    } else if qualified_type_name(obj)? == "range" {
        HostValue::Range(RangeValue::new(
            obj.getattr("start")?.extract()?,
            obj.getattr("stop")?.extract()?,
            obj.getattr("step")?.extract()?,
        ))
    } else if obj.is_callable() && obj.downcast::<PyType>().is_err() {
        HostValue::Object(HostObject::callable(wrap_callable(obj)?))
    } else {
        HostValue::Object(HostObject::foreign(
            qualified_type_name(obj)?,
            obj.as_ptr() as usize,
            PyHandle(obj.into()),
        ))
    };
    Ok(HostRef::new(value))
}

/// Host callable invoking a Python function under the GIL
fn wrap_callable(obj: &PyAny) -> PyResult<HostCallable> {
    let name: String = obj
        .getattr("__name__")
        .and_then(|n| n.extract())
        .unwrap_or_else(|_| "<callable>".to_string());
    let target: Py<PyAny> = obj.into();
    Ok(HostCallable::new(name.clone(), move |args: &[HostRef]| {
        Python::with_gil(|py| {
            let py_args = args.iter().map(|a| to_py(py, a)).collect::<Vec<_>>();
            let result = target
                .call1(py, PyTuple::new(py, py_args))
                .and_then(|r| to_host(r.as_ref(py)));
            result.map_err(|e| Error::invalid_value(format!("{}() failed: {}", name, e)))
        })
    }))
}

type CallArgs = (Vec<HostRef>, Vec<(String, HostRef)>);

fn unpack_call(args: &PyTuple, kwargs: Option<&PyDict>) -> PyResult<CallArgs> {
    let positional = args.iter().map(to_host).collect::<PyResult<Vec<_>>>()?;
    let keywords = match kwargs {
        Some(kw) => kw
            .iter()
            .map(|(k, v)| Ok((k.extract::<String>()?, to_host(v)?)))
            .collect::<PyResult<Vec<_>>>()?,
        None => Vec::new(),
    };
    Ok((positional, keywords))
}

// ============================================================================
// Host -> Python
// ============================================================================

fn to_py(py: Python<'_>, value: &HostRef) -> PyObject {
    match value.value() {
        HostValue::None => py.None(),
        HostValue::Bool(b) => (*b).into_py(py),
        HostValue::Int(i) => (*i).into_py(py),
        HostValue::Float(f) => (*f).into_py(py),
        HostValue::Str(s) => s.as_str().into_py(py),
        HostValue::Bytes(b) => PyBytes::new(py, b).into_py(py),
        HostValue::List(items) => {
            PyList::new(py, items.iter().map(|v| to_py(py, v))).into_py(py)
        }
        HostValue::Tuple(items) | HostValue::NamedTuple(NamedTuple { values: items, .. }) => {
            PyTuple::new(py, items.iter().map(|v| to_py(py, v))).into_py(py)
        }
        HostValue::Dict(items) => {
            let dict = PyDict::new(py);
            for (k, v) in items {
                if let Err(err) = dict.set_item(to_py(py, k), to_py(py, v)) {
                    warn!(error = %err, "dropping unhashable dict key");
                }
            }
            dict.into_py(py)
        }
        HostValue::Range(r) => py
            .eval(&format!("range({}, {}, {})", r.start, r.stop, r.step), None, None)
            .map(|o| o.into_py(py))
            .unwrap_or_else(|_| py.None()),
        HostValue::Ellipsis => py.Ellipsis(),
        HostValue::Object(obj) => object_to_py(py, obj),
    }
}

fn object_to_py(py: Python<'_>, obj: &HostObject) -> PyObject {
    if let Some(handle) = obj.downcast_ref::<PyHandle>() {
        return handle.0.clone_ref(py);
    }
    if let Some(frame) = obj.downcast_arc::<Frame>() {
        if let Ok(py_frame) = Py::new(py, PyFrame { inner: frame }) {
            return py_frame.into_py(py);
        }
    }
    if let Some(rowindex) = obj.downcast_arc::<RowIndex>() {
        if let Ok(py_ri) = Py::new(py, PyRowIndex { inner: rowindex }) {
            return py_ri.into_py(py);
        }
    }
    if let Some(callable) = obj.downcast_ref::<HostCallable>() {
        if let Ok(f) = Py::new(py, PyHostCallable { inner: callable.clone() }) {
            return f.into_py(py);
        }
    }
    format!("{:?}", obj).into_py(py)
}

/// Raise `err` as the class the module maps its category to
fn to_py_err(py: Python<'_>, module: &Module, err: Error) -> PyErr {
    let message = err.to_string();
    match module.raise_target(&err) {
        RaiseTarget::Registered(cls) => {
            let class = cls
                .as_object()
                .and_then(|o| o.downcast_ref::<PyHandle>())
                .and_then(|h| h.0.as_ref(py).downcast::<PyType>().ok());
            match class {
                Some(ty) => PyErr::from_type(ty, message),
                None => builtin_err(err.exc_type().builtin_name(), message),
            }
        }
        RaiseTarget::Builtin(name) => builtin_err(name, message),
    }
}

fn builtin_err(name: &str, message: String) -> PyErr {
    match name {
        "TypeError" => PyTypeError::new_err(message),
        "ImportError" => PyImportError::new_err(message),
        "UserWarning" => PyUserWarning::new_err(message),
        _ => PyValueError::new_err(message),
    }
}

fn raise<T>(py: Python<'_>, module: &Module, result: Result<T>) -> PyResult<T> {
    result.map_err(|err| to_py_err(py, module, err))
}

// ============================================================================
// Python classes
// ============================================================================

// A module function bound through its argument schema. The class carries no
// docstring: a type-level `__doc__` would replace the per-instance getter.
#[pyclass(name = "builtin_function", module = "_dtcore")]
struct PyNativeFunction {
    name: String,
    doc: String,
}

#[pymethods]
impl PyNativeFunction {
    #[pyo3(signature = (*args, **kwargs))]
    fn __call__(
        &self,
        py: Python<'_>,
        args: &PyTuple,
        kwargs: Option<&PyDict>,
    ) -> PyResult<PyObject> {
        let module = module()?;
        let (positional, keywords) = unpack_call(args, kwargs)?;
        let result = raise(py, module, module.call(&self.name, &positional, &keywords))?;
        Ok(to_py(py, &result))
    }

    /// `name(signature)\n--\n\ndescription`, the layout `help()` and `inspect` parse
    #[getter(__doc__)]
    fn doc(&self) -> &str {
        &self.doc
    }

    #[getter(__name__)]
    fn name(&self) -> &str {
        &self.name
    }

    fn __repr__(&self) -> String {
        format!("<built-in function {}>", self.name)
    }
}

#[pyclass(name = "Frame", module = "_dtcore")]
struct PyFrame {
    inner: Arc<Frame>,
}

#[pymethods]
impl PyFrame {
    #[new]
    #[pyo3(signature = (*args, **kwargs))]
    fn new(py: Python<'_>, args: &PyTuple, kwargs: Option<&PyDict>) -> PyResult<Self> {
        let module = module()?;
        let (positional, keywords) = unpack_call(args, kwargs)?;
        let result = raise(py, module, module.construct("Frame", &positional, &keywords))?;
        let frame = result
            .as_object()
            .and_then(|o| o.downcast_arc::<Frame>())
            .ok_or_else(|| PyTypeError::new_err("Frame constructor returned a non-Frame"))?;
        Ok(Self { inner: frame })
    }

    #[getter]
    fn nrows(&self) -> usize {
        self.inner.nrows()
    }

    #[getter]
    fn ncols(&self) -> usize {
        self.inner.ncols()
    }

    #[getter]
    fn shape(&self) -> (usize, usize) {
        (self.inner.nrows(), self.inner.ncols())
    }

    #[getter]
    fn names(&self) -> Vec<String> {
        self.inner.names().to_vec()
    }

    #[getter]
    fn stypes(&self) -> Vec<&'static str> {
        self.inner.columns().iter().map(|c| c.stype().name()).collect()
    }

    fn __repr__(&self) -> String {
        format!(
            "<Frame #{:p} ({}x{})>",
            Arc::as_ptr(&self.inner),
            self.inner.nrows(),
            self.inner.ncols()
        )
    }
}

#[pyclass(name = "RowIndex", module = "_dtcore")]
struct PyRowIndex {
    inner: Arc<RowIndex>,
}

#[pymethods]
impl PyRowIndex {
    #[getter]
    fn kind(&self) -> &'static str {
        self.inner.kind_name()
    }

    fn __len__(&self) -> usize {
        self.inner.len()
    }

    fn __repr__(&self) -> String {
        format!("<RowIndex {} of length {}>", self.inner.kind_name(), self.inner.len())
    }
}

/// A native callable handed back to Python
#[pyclass(name = "host_callable", module = "_dtcore")]
struct PyHostCallable {
    inner: HostCallable,
}

#[pymethods]
impl PyHostCallable {
    #[pyo3(signature = (*args))]
    fn __call__(&self, py: Python<'_>, args: &PyTuple) -> PyResult<PyObject> {
        let module = module()?;
        let positional = args.iter().map(to_host).collect::<PyResult<Vec<_>>>()?;
        let result = raise(py, module, self.inner.call(&positional))?;
        Ok(to_py(py, &result))
    }

    fn __repr__(&self) -> String {
        format!("{:?}", self.inner)
    }
}

// ============================================================================
// Module entry point
// ============================================================================

fn load_config() -> Config {
    match Config::from_env() {
        Some(Ok(config)) => config,
        Some(Err(err)) => {
            warn!(error = %err, "ignoring unreadable configuration file");
            Config::default()
        }
        None => Config::discover(),
    }
}

fn init_logging(config: &Config) {
    let log_config = if std::env::var_os(logging::ENV_LEVEL).is_some() {
        LogConfig::from_env()
    } else {
        config.log_config()
    };
    logging::init_once(log_config);
}

#[pymodule]
fn _dtcore(py: Python, m: &PyModule) -> PyResult<()> {
    let config = load_config();
    init_logging(&config);

    let module = MODULE.get_or_try_init(|| {
        ModuleInitializer::new()
            .with_config(&config)
            .run()
            .map(Arc::new)
            .map_err(|err| PyImportError::new_err(err.to_string()))
    })?;

    m.setattr("__doc__", module.doc())?;
    for (name, value) in module.constants() {
        m.add(name.as_str(), to_py(py, value))?;
    }
    for function in module.functions() {
        let f = PyNativeFunction {
            name: function.name().to_string(),
            doc: function.doc().to_string(),
        };
        m.add(function.name(), Py::new(py, f)?)?;
    }

    m.add_class::<PyFrame>()?;
    m.add_class::<PyRowIndex>()?;
    let new_class = PyModule::import(py, "types")?.getattr("new_class")?;
    for ty in module.types() {
        if m.hasattr(ty.name())? {
            continue;
        }
        let class = new_class.call1((ty.name(),))?;
        class.setattr("__doc__", ty.doc())?;
        class.setattr("__module__", module.name())?;
        m.add(ty.name(), class)?;
    }
    Ok(())
}
