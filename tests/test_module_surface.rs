use std::sync::Arc;

use dtcore::errors::{ErrorKind, ExcType, RangeViolation};
use dtcore::module::{InitState, RaiseTarget, MODULE_NAME};
use dtcore::{
    Column, Frame, HostObject, HostRef, HostValue, Module, ModuleInitializer, RowIndex, SType,
};

fn sample_frame() -> Frame {
    let ints = [HostRef::int(1), HostRef::int(2), HostRef::int(3)];
    let strs = [HostRef::str("x"), HostRef::none(), HostRef::str("z")];
    let a = Column::from_values(0, &ints, SType::Void).unwrap();
    let b = Column::from_values(1, &strs, SType::Void).unwrap();
    Frame::new(vec![a, b], Some(vec!["a".into(), "b".into()])).unwrap()
}

fn call(module: &Module, name: &str, positional: Vec<HostRef>) -> dtcore::Result<HostRef> {
    module.call(name, &positional, &[])
}

#[test]
fn test_module_contents() {
    let module = Module::init().unwrap();
    assert_eq!(module.name(), MODULE_NAME);
    let constants = [
        "_csvwrite_pow10",
        "_column_elemsizes",
        "_rowindex_kinds",
        "_utf8_lead_lengths",
        "_jay_magic",
    ];
    for constant in constants {
        assert!(module.constant(constant).is_some(), "missing constant {}", constant);
    }
    let function = module.function("frame_column_data_r").unwrap();
    assert_eq!(
        function.doc(),
        "frame_column_data_r(frame, i)\n--\n\nReturn the address of the main data array of the column `frame[i]`."
    );
}

#[test]
fn test_capability_queries() {
    let module = Module::init().unwrap();
    let omp = call(&module, "has_omp_support", vec![]).unwrap();
    assert!(matches!(omp.value(), HostValue::Bool(b) if *b == cfg!(feature = "parallel")));
    let debug = call(&module, "in_debug_mode", vec![]).unwrap();
    assert!(matches!(debug.value(), HostValue::Bool(b) if *b == cfg!(debug_assertions)));
}

#[test]
fn test_to_frame_reports_observed_type() {
    let module = Module::init().unwrap();
    let args = vec![HostRef::list(vec![]), HostRef::int(0)];
    let err = call(&module, "frame_column_rowindex", args).unwrap_err();
    assert_eq!(
        err.kind(),
        &ErrorKind::TypeMismatch {
            expected: "a Frame".into(),
            found: "list".into()
        }
    );
    assert_eq!(err.exc_type(), ExcType::TypeError);
}

#[test]
fn test_column_index_bounds() {
    let module = Module::init().unwrap();
    let frame = HostRef::frame(sample_frame());
    for name in ["frame_column_rowindex", "frame_column_data_r"] {
        let err = call(&module, name, vec![frame.clone(), HostRef::int(2)]).unwrap_err();
        assert_eq!(
            err.kind(),
            &ErrorKind::ValueOutOfRange(RangeViolation::IndexOutOfBounds { index: 2, len: 2 })
        );
        assert_eq!(err.message(), "Index out of bounds");
        assert_eq!(err.exc_type(), ExcType::ValueError);
    }
}

#[test]
fn test_column_rowindex() {
    let module = Module::init().unwrap();
    let frame = sample_frame();

    let args = vec![HostRef::frame(frame.clone()), HostRef::int(0)];
    let plain = call(&module, "frame_column_rowindex", args).unwrap();
    assert!(plain.is_none());

    let view = frame.view(RowIndex::from_indices(vec![2, 0])).unwrap();
    let keywords = vec![
        ("frame".to_string(), HostRef::frame(view)),
        ("i".to_string(), HostRef::int(1)),
    ];
    let ri = module.call("frame_column_rowindex", &[], &keywords).unwrap();
    let ri = ri.as_object().and_then(HostObject::downcast_ref::<RowIndex>).unwrap();
    assert_eq!(ri.len(), 2);
    assert_eq!(ri.kind_name(), "arr32");
}

#[test]
fn test_column_data_address() {
    let module = Module::init().unwrap();
    let frame = sample_frame();
    let expected = frame.column(1).unwrap().data_ptr();

    let args = vec![HostRef::frame(frame), HostRef::int(1)];
    let addr = call(&module, "frame_column_data_r", args).unwrap();
    assert!(matches!(addr.value(), HostValue::Int(a) if *a == expected as i128));
}

#[test]
fn test_registration_last_write_wins() {
    let module = Module::init().unwrap();
    let x = HostRef::str("FrameX");
    let y = HostRef::str("FrameY");

    call(&module, "_register_function", vec![HostRef::int(7), x.clone()]).unwrap();
    assert!(module.registry().frame_type().unwrap().is(&x));

    call(&module, "_register_function", vec![HostRef::int(7), y.clone()]).unwrap();
    let current = module.registry().frame_type().unwrap();
    assert!(current.is(&y));
    assert!(!current.is(&x));
}

#[test]
fn test_registration_unknown_slot() {
    let module = Module::init().unwrap();
    let args = vec![HostRef::int(42), HostRef::none()];
    let err = call(&module, "_register_function", args).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::UnknownRegistrationSlot { slot: 42 });
    assert_eq!(err.message(), "Unknown index: 42");
    assert_eq!(err.exc_type(), ExcType::ValueError);
}

#[test]
fn test_registration_id_wider_than_64_bits() {
    let module = Module::init().unwrap();
    let id = HostRef::int(1i128 << 70);
    let err = call(&module, "_register_function", vec![id, HostRef::none()]).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::UnknownRegistrationSlot { slot: 1i128 << 70 });
    assert_eq!(err.message(), "Unknown index: 1180591620717411303424");

    let err = call(&module, "_register_function", vec![HostRef::str("7"), HostRef::none()])
        .unwrap_err();
    assert_eq!(err.exc_type(), ExcType::TypeError);
}

#[test]
fn test_registered_exception_class() {
    let module = Module::init().unwrap();
    let args = vec![HostRef::int(1), HostRef::none()];
    let err = call(&module, "_register_function", args).unwrap_err();
    assert!(matches!(module.raise_target(&err), RaiseTarget::Builtin("ValueError")));

    let cls = HostRef::object(HostObject::native("type", "DtValueError"));
    call(&module, "_register_function", vec![HostRef::int(5), cls.clone()]).unwrap();
    match module.raise_target(&err) {
        RaiseTarget::Registered(target) => assert!(target.is(&cls)),
        other => panic!("expected registered class, got {:?}", other),
    }
}

#[test]
fn test_options_roundtrip() {
    let module = Module::init().unwrap();
    call(&module, "set_option", vec![HostRef::str("nthreads"), HostRef::int(3)]).unwrap();
    let n = call(&module, "get_option", vec![HostRef::str("nthreads")]).unwrap();
    assert!(matches!(n.value(), HostValue::Int(3)));

    let err = call(&module, "get_option", vec![HostRef::str("nthread")]).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::UnknownOption { name: "nthread".into() });
    assert_eq!(err.hints(), ["did you mean `nthreads`?"]);
}

#[test]
fn test_unknown_function_hint() {
    let module = Module::init().unwrap();
    let err = call(&module, "get_opton", vec![]).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::UnknownFunction { name: "get_opton".into() });
    assert!(err.hints().iter().any(|h| h == "did you mean `get_option`?"));
}

#[test]
fn test_frame_constructor_through_module() {
    let module = Module::init().unwrap();
    let keywords = vec![
        ("a".to_string(), HostRef::list(vec![HostRef::int(1), HostRef::int(2)])),
        ("b".to_string(), HostRef::range(0, 2, 1)),
    ];
    let frame = module.construct("Frame", &[], &keywords).unwrap();
    let frame = frame.as_object().and_then(|o| o.downcast_arc::<Frame>()).unwrap();
    assert_eq!(frame.names(), ["a", "b"]);
    assert_eq!(frame.nrows(), 2);

    let err = module.construct("Ftrl", &[], &[]).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::UnknownFunction { .. }));
}

fn construct_frame(
    module: &Module,
    src: HostRef,
    keywords: Vec<(&str, HostRef)>,
) -> dtcore::Result<Arc<Frame>> {
    let keywords: Vec<(String, HostRef)> =
        keywords.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
    let frame = module.construct("Frame", &[src], &keywords)?;
    Ok(frame.as_object().and_then(|o| o.downcast_arc::<Frame>()).unwrap())
}

#[test]
fn test_frame_from_extreme_range() {
    let module = Module::init().unwrap();
    let src = HostRef::range(i64::MIN, i64::MAX, 1);
    let err = construct_frame(&module, src, vec![]).unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::ValueOutOfRange(RangeViolation::IntegerOverflow { .. })
    ));
    assert_eq!(err.exc_type(), ExcType::ValueError);

    let src = HostRef::range(i64::MAX, i64::MIN, i64::MIN);
    let frame = construct_frame(&module, src, vec![]).unwrap();
    assert_eq!((frame.nrows(), frame.ncols()), (2, 1));
    assert_eq!(frame.column(0).unwrap().stype(), SType::Int64);
}

#[test]
fn test_frame_from_negative_step_range() {
    let module = Module::init().unwrap();
    let frame = construct_frame(&module, HostRef::range(10, 0, -3), vec![]).unwrap();
    assert_eq!((frame.nrows(), frame.ncols()), (4, 1));
    let col = frame.column(0).unwrap();
    let values: Vec<i128> = (0..frame.nrows())
        .filter_map(|row| match col.get(row)?.value() {
            HostValue::Int(v) => Some(*v),
            _ => None,
        })
        .collect();
    assert_eq!(values, [10, 7, 4, 1]);
}

#[test]
fn test_frame_from_list_of_dicts() {
    let module = Module::init().unwrap();
    let rows = HostRef::list(vec![
        HostRef::dict(vec![
            (HostRef::str("a"), HostRef::int(1)),
            (HostRef::str("b"), HostRef::str("x")),
        ]),
        HostRef::dict(vec![
            (HostRef::str("a"), HostRef::int(2)),
            (HostRef::str("b"), HostRef::str("y")),
        ]),
    ]);
    let frame = construct_frame(&module, rows, vec![]).unwrap();
    assert_eq!(frame.names(), ["a", "b"]);
    let stypes: Vec<SType> = frame.columns().iter().map(|c| c.stype()).collect();
    assert_eq!(stypes, [SType::Int32, SType::Str32]);
}

#[test]
fn test_frame_from_named_tuples() {
    let module = Module::init().unwrap();
    let fields = vec!["x".to_string(), "label".to_string()];
    let rows = HostRef::list(vec![
        HostRef::named_tuple("Point", fields.clone(), vec![HostRef::int(1), HostRef::str("p")]),
        HostRef::named_tuple("Point", fields, vec![HostRef::int(2), HostRef::str("q")]),
    ]);
    let frame = construct_frame(&module, rows.clone(), vec![]).unwrap();
    assert_eq!(frame.names(), ["x", "label"]);
    assert_eq!(frame.nrows(), 2);

    let names = HostRef::list(vec![HostRef::str("u"), HostRef::str("v")]);
    let frame = construct_frame(&module, rows, vec![("names", names)]).unwrap();
    assert_eq!(frame.names(), ["u", "v"]);
}

#[test]
fn test_debug_checks_follow_config() {
    let config = dtcore::Config::parse("[module]\ndebug_checks = false\n").unwrap();
    let module = ModuleInitializer::new().with_config(&config).run().unwrap();
    assert!(!module.state().debug_checks());
    assert!(call(&module, "has_omp_support", vec![]).is_ok());

    let module = ModuleInitializer::new().with_debug_checks(true).run().unwrap();
    assert!(module.state().debug_checks());
    let frame = HostRef::frame(sample_frame());
    assert!(call(&module, "frame_column_data_r", vec![frame, HostRef::int(0)]).is_ok());

    let module = Module::init().unwrap();
    assert_eq!(module.state().debug_checks(), cfg!(debug_assertions));
}

#[test]
fn test_force_stype_applies_to_new_frames() {
    let module = Module::init().unwrap();
    let args = vec![HostRef::str("force_stype"), HostRef::str("float64")];
    call(&module, "set_option", args).unwrap();
    let src = HostRef::list(vec![HostRef::list(vec![HostRef::int(1)])]);
    let frame = module.construct("Frame", &[src], &[]).unwrap();
    let frame = frame.as_object().and_then(|o| o.downcast_arc::<Frame>()).unwrap();
    assert_eq!(frame.column(0).unwrap().stype(), SType::Float64);
}

#[test]
fn test_config_overrides_at_init() {
    let text = "[options]\nnthreads = 2\n\n[module]\nname = \"_dt\"\n";
    let config = dtcore::Config::parse(text).unwrap();
    let mut init = ModuleInitializer::new().with_config(&config);
    let module = init.run().unwrap();
    assert_eq!(init.state(), InitState::Ready);
    assert_eq!(module.name(), "_dt");
    assert_eq!(module.state().options().nthreads, 2);
}

#[test]
fn test_shared_state_between_modules() {
    let first = Module::init().unwrap();
    let mut init = ModuleInitializer::new().with_state(Arc::clone(first.state()));
    let second = init.run().unwrap();
    let x = HostRef::str("fread");
    call(&first, "_register_function", vec![HostRef::int(8), x.clone()]).unwrap();
    assert!(second.registry().fread_fn().unwrap().is(&x));
}
