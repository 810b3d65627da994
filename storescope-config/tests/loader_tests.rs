use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use storescope_config::{ConfigError, ConfigLoader, LoaderConfig, MemoryBackend, ScopeValues};
use storescope_gate::{GateConfig, KeyState};
use storescope_scope::{DEFAULT_TYPE_ID, Perm, Scope, TypeId};

const BASE_URL: &str = "web/secure/base_url";

fn website(id: i64) -> TypeId {
    Scope::Website.with_id(id)
}

fn store(id: i64) -> TypeId {
    Scope::Store.with_id(id)
}

fn backend() -> Arc<MemoryBackend> {
    let backend = MemoryBackend::new();
    backend.set(DEFAULT_TYPE_ID, BASE_URL, json!("https://shop.test/"));
    backend.set(website(1), BASE_URL, json!("https://eu.shop.test/"));
    backend.set(store(3), BASE_URL, json!("https://de.shop.test/"));
    backend.set(DEFAULT_TYPE_ID, "catalog/page_size", json!(24));
    Arc::new(backend)
}

// ── lookups ──────────────────────────────────────────────────────

#[test]
fn most_specific_scope_wins() {
    let loader = ConfigLoader::new(backend());
    let value = loader.get(BASE_URL, &[store(3), website(1)]).unwrap();
    assert_eq!(value, Some(json!("https://de.shop.test/")));
}

#[test]
fn falls_back_to_parent_scopes() {
    let loader = ConfigLoader::new(backend());
    assert_eq!(
        loader.get(BASE_URL, &[store(4), website(1)]).unwrap(),
        Some(json!("https://eu.shop.test/"))
    );
    assert_eq!(
        loader.get(BASE_URL, &[store(4), website(2)]).unwrap(),
        Some(json!("https://shop.test/"))
    );
}

#[test]
fn empty_ids_read_default_scope() {
    let loader = ConfigLoader::new(backend());
    assert_eq!(
        loader.get(BASE_URL, &[]).unwrap(),
        Some(json!("https://shop.test/"))
    );
}

#[test]
fn lookup_order_visits_each_scope_once() {
    let loader = ConfigLoader::new(backend());
    assert_eq!(loader.lookup_order(&[]), vec![DEFAULT_TYPE_ID]);
    assert_eq!(loader.lookup_order(&[DEFAULT_TYPE_ID]), vec![DEFAULT_TYPE_ID]);
    assert_eq!(
        loader.lookup_order(&[store(4), website(2)]),
        vec![store(4), website(2), DEFAULT_TYPE_ID]
    );
}

#[test]
fn missing_path_is_none() {
    let loader = ConfigLoader::new(backend());
    assert_eq!(loader.get("does/not/exist", &[store(3)]).unwrap(), None);
}

#[test]
fn get_as_deserializes() {
    let loader = ConfigLoader::new(backend());
    let size: Option<u32> = loader.get_as("catalog/page_size", &[store(3)]).unwrap();
    assert_eq!(size, Some(24));

    let wrong = loader.get_as::<u32>(BASE_URL, &[store(3)]);
    assert!(matches!(wrong, Err(ConfigError::Serialization(_))));
}

#[test]
fn perm_hides_disallowed_scopes() {
    let loader = ConfigLoader::new(backend());
    let value = loader
        .get_with_perm(BASE_URL, Perm::WEBSITE, &[store(3), website(1)])
        .unwrap();
    assert_eq!(value, Some(json!("https://eu.shop.test/")));

    let value = loader
        .get_with_perm(BASE_URL, Perm::DEFAULT, &[store(3), website(1)])
        .unwrap();
    assert_eq!(value, Some(json!("https://shop.test/")));
}

#[test]
fn invalid_target_is_rejected() {
    let loader = ConfigLoader::new(backend());
    let err = loader
        .get(BASE_URL, &[TypeId::from_raw(0x0900_0001)])
        .unwrap_err();
    assert!(matches!(err, ConfigError::Scope(_)));
}

#[test]
fn validation_can_be_disabled() {
    let loader = ConfigLoader::with_config(
        backend(),
        LoaderConfig {
            validate_target: false,
            ..LoaderConfig::default()
        },
    );
    assert_eq!(
        loader.get(BASE_URL, &[TypeId::pack(Scope::Absent, 0)]).unwrap(),
        Some(json!("https://shop.test/"))
    );
}

#[test]
fn lowest_scope_delegates() {
    let loader = ConfigLoader::new(backend());
    assert_eq!(loader.lowest_scope(&[store(2), website(1)]).unwrap(), store(2));
    assert!(matches!(
        loader.lowest_scope(&[store(2), store(3)]),
        Err(ConfigError::Scope(_))
    ));
}

// ── caching and coordination ─────────────────────────────────────

#[test]
fn each_scope_is_loaded_once() {
    let backend = backend();
    let loader = ConfigLoader::new(Arc::clone(&backend));
    for _ in 0..5 {
        loader.get(BASE_URL, &[store(4), website(1)]).unwrap();
    }
    // store(4) is empty, website(1) answers; default is never reached
    assert_eq!(backend.load_count(), 2);
    assert_eq!(loader.cached_len(), 2);
    assert_eq!(loader.gate().state(&store(4)), Some(KeyState::Done));
}

#[test]
fn scope_values_exposes_rows() {
    let loader = ConfigLoader::new(backend());
    let rows = loader.scope_values(DEFAULT_TYPE_ID).unwrap();
    assert_eq!(rows.len(), 2);

    let expected: ScopeValues = [(BASE_URL.to_string(), json!("https://de.shop.test/"))]
        .into_iter()
        .collect();
    assert_eq!(*loader.scope_values(store(3)).unwrap(), expected);
}

#[test]
fn invalidate_starts_a_new_epoch() {
    let backend = backend();
    let loader = ConfigLoader::new(Arc::clone(&backend));
    loader.get(BASE_URL, &[website(1)]).unwrap();
    assert_eq!(backend.load_count(), 1);

    backend.set(website(1), BASE_URL, json!("https://new.shop.test/"));
    loader.invalidate();
    assert_eq!(loader.cached_len(), 0);
    assert!(loader.gate().is_empty());

    assert_eq!(
        loader.get(BASE_URL, &[website(1)]).unwrap(),
        Some(json!("https://new.shop.test/"))
    );
    assert_eq!(backend.load_count(), 2);
}

#[test]
fn failed_load_is_reported_and_sticks_for_the_epoch() {
    let backend = backend();
    backend.fail_scope(website(1));
    let loader = ConfigLoader::new(Arc::clone(&backend));

    assert!(matches!(
        loader.get(BASE_URL, &[website(1)]),
        Err(ConfigError::Backend(_))
    ));
    assert!(matches!(
        loader.get(BASE_URL, &[website(1)]),
        Err(ConfigError::LoadFailed { .. })
    ));
    assert_eq!(backend.load_count(), 1);
}

#[test]
fn concurrent_readers_share_one_load() {
    let backend = Arc::new(MemoryBackend::new().with_delay(Duration::from_millis(30)));
    backend.set(store(1), "design/theme", json!("luma"));
    let loader = Arc::new(ConfigLoader::new(Arc::clone(&backend)));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let loader = Arc::clone(&loader);
            thread::spawn(move || loader.get("design/theme", &[store(1)]).unwrap())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), Some(json!("luma")));
    }
    assert_eq!(backend.load_count(), 1);
}

#[test]
fn waiters_time_out_on_slow_loads() {
    let backend = Arc::new(MemoryBackend::new().with_delay(Duration::from_millis(300)));
    let loader = Arc::new(ConfigLoader::with_config(
        Arc::clone(&backend),
        LoaderConfig {
            gate: GateConfig {
                wait_timeout: Some(Duration::from_millis(10)),
                ..GateConfig::default()
            },
            ..LoaderConfig::default()
        },
    ));

    let winner = Arc::clone(&loader);
    let handle = thread::spawn(move || winner.scope_values(website(5)).map(|_| ()));
    while loader.gate().state(&website(5)).is_none() {
        thread::yield_now();
    }

    assert!(matches!(
        loader.scope_values(website(5)),
        Err(ConfigError::Timeout { .. })
    ));
    handle.join().unwrap().unwrap();
}
