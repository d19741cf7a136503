use dtcore::errors::{ErrorKind, RangeViolation};
use dtcore::module::ModuleState;
use dtcore::{Args, BundleSchema, Frame, HostRef, NativeFunction, Registry};

fn frame_i_schema() -> BundleSchema {
    BundleSchema::builder("frame_column_rowindex")
        .positional(["frame", "i"])
        .required(2)
        .description("Return the RowIndex of the `i`th column of the `frame`.")
        .build()
        .unwrap()
}

fn kw(pairs: &[(&str, HostRef)]) -> Vec<(String, HostRef)> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

#[test]
fn test_missing_required_is_lazy() {
    let schema = BundleSchema::builder("fill")
        .positional(["value", "count"])
        .required(2)
        .build()
        .unwrap();
    let registry = Registry::new();
    let positional = [HostRef::int(1)];
    let args = Args::bind(&schema, &positional, &[], &registry).unwrap();

    assert!(args[1].is_undefined());
    let err = args[1].to_int64_strict().unwrap_err();
    assert_eq!(
        err.kind(),
        &ErrorKind::MissingArgument {
            param: "count".into(),
            function: "fill".into()
        }
    );
    assert_eq!(err.message(), "Required argument `count` in fill() is missing");
    assert_eq!(err.param(), Some("count"));
    assert_eq!(err.function(), Some("fill"));
}

#[test]
fn test_optional_stays_undefined() {
    let schema = BundleSchema::builder("read")
        .positional(["path", "sep"])
        .required(1)
        .build()
        .unwrap();
    let registry = Registry::new();
    let positional = [HostRef::str("a.csv")];
    let args = Args::bind(&schema, &positional, &[], &registry).unwrap();

    assert_eq!(args[1].to_string_or(",").unwrap(), ",");
    let err = args[1].to_string().unwrap_err();
    assert_eq!(err.message(), "Argument `sep` in read() is missing");
}

#[test]
fn test_positional_and_keyword_bind_identically() {
    let schema = frame_i_schema();
    let registry = Registry::new();
    let frame = HostRef::frame(Frame::empty());

    let by_pos = [frame.clone(), HostRef::int(3)];
    let a = Args::bind(&schema, &by_pos, &[], &registry).unwrap();
    let by_kw = kw(&[("i", HostRef::int(3)), ("frame", frame.clone())]);
    let b = Args::bind(&schema, &[], &by_kw, &registry).unwrap();

    for (x, y) in a.iter().zip(b.iter()) {
        assert_eq!(x.param_name(), y.param_name());
        assert!(x.value().unwrap().is(y.value().unwrap()));
    }
    assert_eq!(a[1].to_size_t().unwrap(), 3);
    assert_eq!(b.by_name("i").unwrap().to_size_t().unwrap(), 3);
}

#[test]
fn test_extra_keyword_rejected() {
    let schema = frame_i_schema();
    let registry = Registry::new();
    let positional = [HostRef::frame(Frame::empty()), HostRef::int(3)];
    let keywords = kw(&[("extra", HostRef::int(1))]);

    let err = Args::bind(&schema, &positional, &keywords, &registry).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::UnknownKeywordArgument { name: "extra".into() });
    assert_eq!(
        err.message(),
        "frame_column_rowindex() got an unexpected keyword argument `extra`"
    );
}

#[test]
fn test_duplicate_binding() {
    let schema = frame_i_schema();
    let registry = Registry::new();
    let positional = [HostRef::frame(Frame::empty())];
    let keywords = kw(&[("frame", HostRef::none())]);

    let err = Args::bind(&schema, &positional, &keywords, &registry).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::DuplicateBinding { name: "frame".into() });
}

fn must_not_run(_: &Args<'_>, _: &ModuleState) -> dtcore::Result<HostRef> {
    panic!("function body executed for a call that failed to bind");
}

#[test]
fn test_too_many_positional_skips_body() {
    let function = NativeFunction::new(frame_i_schema(), must_not_run);
    let state = ModuleState::new();
    let positional = [HostRef::frame(Frame::empty()), HostRef::int(0), HostRef::int(1)];

    let err = function.invoke(&positional, &[], &state).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::TooManyPositionalArguments { max: 2, given: 3 });
    assert_eq!(
        err.message(),
        "frame_column_rowindex() takes at most 2 positional arguments, but 3 were given"
    );
}

#[test]
fn test_size_t_rejects_negative() {
    let schema = frame_i_schema();
    let registry = Registry::new();
    let positional = [HostRef::frame(Frame::empty()), HostRef::int(-1)];
    let args = Args::bind(&schema, &positional, &[], &registry).unwrap();

    let err = args[1].to_size_t().unwrap_err();
    assert_eq!(
        err.kind(),
        &ErrorKind::ValueOutOfRange(RangeViolation::Negative { value: -1 })
    );
    assert_eq!(err.param(), Some("i"));
}

#[test]
fn test_no_cross_domain_coercion() {
    let schema = frame_i_schema();
    let registry = Registry::new();
    let positional = [HostRef::list(vec![]), HostRef::float(2.0)];
    let args = Args::bind(&schema, &positional, &[], &registry).unwrap();

    let err = args[1].to_int32_strict().unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::TypeMismatch { found, .. } if found == "float"));

    let err = args[0].to_frame().unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::TypeMismatch { found, .. } if found == "list"));
}

#[test]
fn test_varargs_and_varkwds_overflow() {
    let schema = BundleSchema::builder("concat")
        .positional(["first"])
        .varargs()
        .varkwds()
        .build()
        .unwrap();
    let registry = Registry::new();
    let positional = [HostRef::int(1), HostRef::int(2), HostRef::int(3)];
    let keywords = kw(&[("how", HostRef::str("outer"))]);
    let args = Args::bind(&schema, &positional, &keywords, &registry).unwrap();

    assert_eq!(args.len(), 1);
    assert_eq!(args.num_varargs(), 2);
    assert_eq!(args.num_varkwds(), 1);
    assert_eq!(args.varkwds()[0].0, "how");
}
