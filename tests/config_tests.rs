use kickoff::config::Config;
use pretty_assertions::assert_eq;
use serial_test::serial;
use std::env;

mod common;

const KEYS: [&str; 9] = [
    "DATABASE_URL",
    "DATABASE_MAX_CONNECTIONS",
    "DATABASE_BUSY_TIMEOUT_SECS",
    "JWT_SECRET",
    "JWT_EXPIRATION_DAYS",
    "HOST",
    "PORT",
    "ENVIRONMENT",
    "CLIENT_BASE_URL",
];

/// Run `f` with the given variables set and every other config key cleared.
fn with_env<F: FnOnce()>(vars: &[(&str, &str)], f: F) {
    let original: Vec<_> = KEYS.iter().map(|k| (*k, env::var(k).ok())).collect();

    unsafe {
        for key in KEYS {
            env::remove_var(key);
        }
        for (key, value) in vars {
            env::set_var(key, value);
        }
    }

    f();

    unsafe {
        for (key, value) in original {
            match value {
                Some(val) => env::set_var(key, val),
                None => env::remove_var(key),
            }
        }
    }
}

#[test]
#[serial]
fn test_config_from_env_with_defaults() {
    common::setup_test_env();

    with_env(&[], || {
        let config = Config::from_env_only().unwrap();

        assert_eq!(config.database_url, "sqlite:./kickoff.db");
        assert_eq!(config.database_max_connections, 5);
        assert_eq!(config.database_busy_timeout_secs, 5);
        assert_eq!(config.jwt_expiration_days, 30);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.environment, "development");
        assert_eq!(config.client_base_url, "http://localhost:3000");
        assert!(config.is_development());
    });
}

#[test]
#[serial]
fn test_config_from_env_with_custom_values() {
    common::setup_test_env();

    with_env(
        &[
            ("DATABASE_URL", "sqlite:./league.db"),
            ("DATABASE_MAX_CONNECTIONS", "12"),
            ("JWT_SECRET", "test-secret"),
            ("JWT_EXPIRATION_DAYS", "7"),
            ("HOST", "0.0.0.0"),
            ("PORT", "3000"),
            ("ENVIRONMENT", "production"),
        ],
        || {
            let config = Config::from_env_only().unwrap();

            assert_eq!(config.database_url, "sqlite:./league.db");
            assert_eq!(config.database_max_connections, 12);
            assert_eq!(config.jwt_secret, "test-secret");
            assert_eq!(config.jwt_expiration_days, 7);
            assert_eq!(config.server_address(), "0.0.0.0:3000");
            assert!(config.is_production());
        },
    );
}

#[test]
#[serial]
fn test_unparseable_values_fall_back_to_defaults() {
    with_env(
        &[("PORT", "invalid_port"), ("JWT_EXPIRATION_DAYS", "soon")],
        || {
            let config = Config::from_env_only().unwrap();
            assert_eq!(config.port, 8080);
            assert_eq!(config.jwt_expiration_days, 30);
        },
    );
}

#[test]
#[serial]
fn test_zero_pool_size_is_rejected() {
    with_env(&[("DATABASE_MAX_CONNECTIONS", "0")], || {
        assert!(Config::from_env_only().is_err());
    });
}
