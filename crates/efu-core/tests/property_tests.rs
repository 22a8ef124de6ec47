//! Property-based tests for content inspection, option rules, templates and package ids

use efu_core::prelude::*;
use efu_test_helpers::prelude::*;
use proptest::prelude::*;
use serde_json::{Value, json};

fn arb_content() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..4096)
}

/// Any subset of the raw mode's tunable options with valid values
fn arb_raw_options() -> impl Strategy<Value = OptionValues> {
    (
        prop::option::of(0i64..1 << 20),
        prop::option::of(0i64..1 << 20),
        prop::option::of(-1i64..1024),
        prop::option::of(1i64..1 << 20),
        prop::option::of(any::<bool>()),
    )
        .prop_map(|(skip, seek, count, chunk_size, truncate)| {
            let mut options = OptionValues::new();
            let pairs = [
                ("skip", skip.map(Value::from)),
                ("seek", seek.map(Value::from)),
                ("count", count.map(Value::from)),
                ("chunk-size", chunk_size.map(Value::from)),
                ("truncate", truncate.map(Value::from)),
            ];
            for (key, value) in pairs {
                if let Some(value) = value {
                    options.insert(key.to_string(), value);
                }
            }
            options
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_inspection_matches_in_memory_hash(data in arb_content()) {
        let fixtures = Fixtures::new();
        let path = fixtures.create_file("artifact", &data);
        let info = ContentInfo::inspect(&path)
            .map_err(|e| TestCaseError::fail(format!("inspect failed: {e}")))?;
        prop_assert_eq!(info.size, data.len() as u64);
        prop_assert_eq!(&info.sha256sum, &compute_data_hash(&data));
        // the first two random bytes can spell the gzip magic without a valid stream
        prop_assert!(!info.is_compressed() || data.starts_with(&[0x1f, 0x8b]));
    }

    #[test]
    fn prop_gzip_reports_uncompressed_size(data in arb_content()) {
        let fixtures = Fixtures::new();
        let path = fixtures.create_file("artifact.gz", &gzip_bytes(&data));
        let info = ContentInfo::inspect(&path)
            .map_err(|e| TestCaseError::fail(format!("inspect failed: {e}")))?;
        prop_assert_eq!(info.uncompressed_size, Some(data.len() as u64));
    }

    #[test]
    fn prop_skip_accepts_only_non_negative(skip in any::<i64>()) {
        let option = must_some(registry().get("raw").ok().and_then(|m| m.option("skip")), "skip");
        let accepted = matches!(option.validate(&json!(skip)), Ok(()));
        prop_assert_eq!(accepted, skip >= 0);
    }

    #[test]
    fn prop_supplied_values_win_over_defaults(options in arb_raw_options()) {
        let fixtures = Fixtures::new();
        let path = fixtures.create_file("rootfs.img", b"rootfs");
        let obj = Object::construct(options.clone(), "raw", &path)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        let mode = registry().get("raw").map_err(|e| TestCaseError::fail(e.to_string()))?;
        for option in mode.options().iter().filter(|o| !o.volatile) {
            let expected = options
                .get(option.key)
                .cloned()
                .unwrap_or_else(|| option.default_value());
            let actual = obj.get(option.key).map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert_eq!(actual, expected, "option {}", option.key);
        }
    }

    #[test]
    fn prop_template_round_trip_is_idempotent(options in arb_raw_options()) {
        let fixtures = Fixtures::new();
        let path = fixtures.create_file("rootfs.img", b"rootfs");
        let obj = Object::construct(options, "raw", &path)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        let template = obj.to_template();
        let reloaded = Object::load(&template)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(reloaded.to_template(), template);
    }

    #[test]
    fn prop_ids_stay_dense(moves in prop::collection::vec((0usize..6, 0usize..6), 0..12), removals in 0usize..6) {
        let fixtures = Fixtures::new();
        let mut package = Package::new(1u64, "1.0")
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        for path in fixtures.create_files(6) {
            let obj = Object::construct(OptionValues::new(), "mender", path)
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            package.add(obj);
        }
        for (from, to) in moves {
            package.move_object(from, to).map_err(|e| TestCaseError::fail(e.to_string()))?;
        }
        for _ in 0..removals {
            package.remove(0).map_err(|e| TestCaseError::fail(e.to_string()))?;
        }

        let ids: Vec<usize> = package.objects().map(|(id, _)| id).collect();
        prop_assert_eq!(ids, (0..6 - removals).collect::<Vec<_>>());
        prop_assert!(matches!(package.get(6 - removals), Err(EfuError::ObjectNotFound(_))));
    }
}
