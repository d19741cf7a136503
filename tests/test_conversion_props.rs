use proptest::prelude::*;

use dtcore::errors::{DefaultErrors, ErrorKind, RangeViolation};
use dtcore::HostValue;

const EM: DefaultErrors = DefaultErrors;

proptest! {
    #[test]
    fn int32_accepts_exactly_its_range(v in any::<i64>()) {
        let result = HostValue::Int(i128::from(v)).to_int32_strict(&EM);
        match i32::try_from(v) {
            Ok(expected) => prop_assert_eq!(result, Ok(expected)),
            Err(_) => prop_assert!(matches!(
                result.unwrap_err().kind(),
                ErrorKind::ValueOutOfRange(RangeViolation::IntegerOverflow { bits: 32, .. })
            ), "expected IntegerOverflow with bits = 32"),
        }
    }

    #[test]
    fn int64_never_wraps(v in any::<i128>()) {
        let result = HostValue::Int(v).to_int64_strict(&EM);
        prop_assert_eq!(result.is_ok(), i64::try_from(v).is_ok());
        if let Ok(x) = result {
            prop_assert_eq!(i128::from(x), v);
        }
    }

    #[test]
    fn size_t_rejects_all_negatives(v in i64::MIN..0i64) {
        let err = HostValue::Int(i128::from(v)).to_size_t(&EM).unwrap_err();
        prop_assert_eq!(
            err.kind(),
            &ErrorKind::ValueOutOfRange(RangeViolation::Negative { value: i128::from(v) })
        );
    }

    #[test]
    fn floats_are_never_integers(x in any::<f64>()) {
        let value = HostValue::Float(x);
        prop_assert!(value.to_int32_strict(&EM).is_err());
        prop_assert!(value.to_int64_strict(&EM).is_err());
        prop_assert!(value.to_size_t(&EM).is_err());
        prop_assert!(value.to_bool_strict(&EM).is_err());
    }

    #[test]
    fn stringlist_reports_first_bad_element(n in 0usize..8, bad in 0usize..8) {
        let mut items: Vec<dtcore::HostRef> =
            (0..n).map(|i| dtcore::HostRef::str(format!("c{}", i))).collect();
        if bad < n {
            items[bad] = dtcore::HostRef::int(bad as i64);
        }
        let result = HostValue::List(items).to_stringlist(&EM);
        if bad < n {
            let err = result.unwrap_err();
            let expected = format!("element {}", bad);
            prop_assert!(err.message().contains(&expected));
        } else {
            prop_assert_eq!(result.unwrap().len(), n);
        }
    }
}
