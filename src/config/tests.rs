use super::*;

#[test]
fn defaults_resolve_without_any_source() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr, "127.0.0.1:8000".parse().unwrap());
    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
    assert!(settings.database.url.is_none());
    assert_eq!(settings.database.max_connections.get(), 8);
    assert_eq!(settings.cache.backend, CacheBackendKind::Memory);
    assert_eq!(settings.cache.memory_capacity, DEFAULT_MEMORY_CAPACITY);
    assert_eq!(settings.cache.redis_timeout, Duration::from_millis(500));
    assert!(settings.cache.entry_ttl.is_none());
    assert_eq!(settings.auth.access_token_ttl, Duration::from_secs(300));
    assert_eq!(settings.auth.refresh_token_ttl, Duration::from_secs(86_400));
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());
    raw.database.url = Some("postgres://file".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        database: DatabaseOverride {
            database_url: Some("postgres://cli".to_string()),
        },
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.database.url.as_deref(), Some("postgres://cli"));
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn blank_database_url_is_treated_as_absent() {
    let mut raw = RawSettings::default();
    raw.database.url = Some("   ".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.database.url.is_none());
}

#[test]
fn zero_port_is_rejected() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero port");
    assert!(matches!(err, LoadError::Invalid { key: "server.port", .. }));
}

#[test]
fn unparseable_log_level_is_rejected() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("loud".to_string());

    let err = Settings::from_raw(raw).expect_err("bad level");
    assert!(matches!(err, LoadError::Invalid { key: "logging.level", .. }));
}

#[test]
fn redis_backend_requires_url() {
    let mut raw = RawSettings::default();
    raw.cache.backend = Some(CacheBackendKind::Redis);

    let err = Settings::from_raw(raw).expect_err("missing url");
    assert!(matches!(err, LoadError::Invalid { key: "cache.redis_url", .. }));
}

#[test]
fn redis_backend_via_cli() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        cache_backend: Some(CacheBackendArg::Redis),
        cache_redis_url: Some("redis://localhost:6379".to_string()),
        cache_entry_ttl_seconds: Some(60),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.cache.backend, CacheBackendKind::Redis);
    assert_eq!(
        settings.cache.redis_url.as_deref(),
        Some("redis://localhost:6379")
    );
    assert_eq!(settings.cache.entry_ttl, Some(Duration::from_secs(60)));
}

#[test]
fn zero_entry_ttl_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.entry_ttl_seconds = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero ttl");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.entry_ttl_seconds",
            ..
        }
    ));
}

#[test]
fn zero_token_lifetimes_are_rejected() {
    let mut raw = RawSettings::default();
    raw.auth.access_token_ttl_seconds = Some(0);
    assert!(Settings::from_raw(raw).is_err());

    let mut raw = RawSettings::default();
    raw.auth.refresh_token_ttl_seconds = Some(0);
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn migrate_only_applies_database_override() {
    let mut raw = RawSettings::default();
    raw.apply_database_override(&DatabaseOverride {
        database_url: Some("postgres://migrate".to_string()),
    });

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.database.url.as_deref(), Some("postgres://migrate"));
    assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
}

#[test]
fn cache_backend_deserializes_lowercase() {
    let raw: RawSettings = Config::builder()
        .set_override("cache.backend", "redis")
        .and_then(|builder| builder.set_override("cache.redis_url", "redis://r:6379"))
        .and_then(|builder| builder.set_override("cache.memory_capacity", 5))
        .expect("overrides")
        .build()
        .expect("build")
        .try_deserialize()
        .expect("deserialize");

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.cache.backend, CacheBackendKind::Redis);
    assert_eq!(settings.cache.memory_capacity, 5);
}

#[test]
fn unset_cache_settings_match_substrate_defaults() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");
    let resolved = crate::cache::CacheConfig::from(&settings.cache);
    let defaults = crate::cache::CacheConfig::default();

    assert_eq!(resolved.backend, defaults.backend);
    assert_eq!(resolved.memory_capacity, defaults.memory_capacity);
    assert_eq!(resolved.redis_pool_size, defaults.redis_pool_size);
    assert_eq!(resolved.redis_timeout, defaults.redis_timeout);
    assert_eq!(resolved.entry_ttl, defaults.entry_ttl);
}
