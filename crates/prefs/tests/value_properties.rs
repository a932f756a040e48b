// Property-based tests for setting values of every kind.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::sync::Arc;

use proptest::prelude::*;
use electric_prefs::{
    AccessContext, BackingStore, MemoryStore, Pref, PrefRegistry, PrefValue, RegistryConfig,
};

const CLIENT: AccessContext = AccessContext::client();

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Any double the decimal store format can carry bit for bit. NaN payloads
/// do not survive `to_string`, so only the cache sees them.
fn arb_storable_double() -> impl Strategy<Value = f64> {
    use proptest::num::f64::{INFINITE, NEGATIVE, NORMAL, POSITIVE, SUBNORMAL, ZERO};
    POSITIVE | NEGATIVE | NORMAL | SUBNORMAL | ZERO | INFINITE
}

/// A factory value and a candidate value of the same kind.
fn arb_pair_with(double: BoxedStrategy<f64>) -> impl Strategy<Value = (PrefValue, PrefValue)> {
    prop_oneof![
        (any::<bool>(), any::<bool>()).prop_map(|(f, v)| (PrefValue::Bool(f), PrefValue::Bool(v))),
        (any::<i32>(), any::<i32>()).prop_map(|(f, v)| (PrefValue::Int(f), PrefValue::Int(v))),
        (any::<i64>(), any::<i64>()).prop_map(|(f, v)| (PrefValue::Long(f), PrefValue::Long(v))),
        (any::<f64>(), double).prop_map(|(f, v)| (PrefValue::Double(f), PrefValue::Double(v))),
        (any::<String>(), any::<String>()).prop_map(|(f, v)| (PrefValue::Str(f), PrefValue::Str(v))),
    ]
}

fn arb_pair() -> impl Strategy<Value = (PrefValue, PrefValue)> {
    arb_pair_with(proptest::num::f64::ANY.boxed())
}

fn arb_storable_pair() -> impl Strategy<Value = (PrefValue, PrefValue)> {
    arb_pair_with(arb_storable_double().boxed())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn make(reg: &PrefRegistry, factory: &PrefValue) -> Arc<Pref> {
    let g = reg.group("g");
    match factory {
        PrefValue::Bool(f) => reg.make_boolean_pref("p", &g, *f),
        PrefValue::Int(f) => reg.make_int_pref("p", &g, *f),
        PrefValue::Long(f) => reg.make_long_pref("p", &g, *f),
        PrefValue::Double(f) => reg.make_double_pref("p", &g, *f),
        PrefValue::Str(f) => reg.make_string_pref("p", &g, f),
    }
    .unwrap()
}

fn registry(store: &Arc<MemoryStore>) -> PrefRegistry {
    PrefRegistry::new(store.clone(), RegistryConfig::default())
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]
    #[test]
    fn cached_round_trip((factory, value) in arb_pair()) {
        let store = Arc::new(MemoryStore::new());
        let pref = make(&registry(&store), &factory);
        pref.set_value(CLIENT, value.clone()).unwrap();
        prop_assert_eq!(pref.get_value(CLIENT).unwrap(), value);
    }
}

proptest! {
    #![proptest_config(config_256())]
    #[test]
    fn stored_round_trip((factory, value) in arb_storable_pair()) {
        let store = Arc::new(MemoryStore::new());
        make(&registry(&store), &factory).set_value(CLIENT, value.clone()).unwrap();

        let reloaded = make(&registry(&store), &factory);
        prop_assert_eq!(reloaded.get_value(CLIENT).unwrap(), value);
    }
}

proptest! {
    #![proptest_config(config_256())]
    #[test]
    fn repeated_write_is_idempotent((factory, value) in arb_pair()) {
        let store = Arc::new(MemoryStore::new());
        let pref = make(&registry(&store), &factory);
        let changed = pref.set_value(CLIENT, value.clone()).unwrap();
        prop_assert!(!pref.set_value(CLIENT, value.clone()).unwrap());

        let expected = if value == factory { 0 } else { 1 };
        prop_assert_eq!(changed, expected == 1);
        prop_assert_eq!(store.write_count("g"), expected);
        prop_assert_eq!(store.flush_count("g"), expected);
    }
}

proptest! {
    #![proptest_config(config_256())]
    #[test]
    fn factory_reset_clears_key((factory, value) in arb_pair()) {
        let store = Arc::new(MemoryStore::new());
        let pref = make(&registry(&store), &factory);
        pref.set_value(CLIENT, value).unwrap();
        pref.factory_reset();

        prop_assert_eq!(pref.get_value(CLIENT).unwrap(), factory);
        prop_assert!(store.raw("g", "p").is_none());
        prop_assert!(store.node("g").keys().is_empty());
    }
}
