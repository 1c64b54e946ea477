//! Integration tests for environment-based configuration

use forum_hub::{ConfigError, DuplicateLoginPolicy, ServerConfigBuilder};
use serial_test::serial;
use std::{env, path::PathBuf, time::Duration};

const VARS: [&str; 9] = [
    "FORUM_BIND_ADDR",
    "FORUM_DATABASE_PATH",
    "FORUM_ENABLE_CORS",
    "FORUM_HISTORY_MAX_LIMIT",
    "FORUM_OUTBOUND_QUEUE_CAPACITY",
    "FORUM_PERSIST_TIMEOUT",
    "FORUM_SORT_TIMEOUT",
    "FORUM_MAX_MESSAGE_SIZE",
    "FORUM_DUPLICATE_LOGIN",
];

fn set_env(key: &str, value: &str) {
    unsafe {
        env::set_var(key, value);
    }
}

fn clear_all_forum_env_vars() {
    for key in VARS {
        unsafe {
            env::remove_var(key);
        }
    }
}

#[test]
#[serial]
fn test_env_config_defaults_when_no_vars_set() {
    clear_all_forum_env_vars();

    let config = ServerConfigBuilder::from_env()
        .expect("should load defaults")
        .build()
        .expect("should build valid config");

    assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
    assert!(config.database_path.is_none());
    assert_eq!(config.history_max_limit, 100);
    assert_eq!(config.hub.persist_timeout, Duration::from_secs(3));
    assert_eq!(config.hub.duplicate_login, DuplicateLoginPolicy::ReplaceExisting);
}

#[test]
#[serial]
fn test_env_config_reads_every_variable() {
    clear_all_forum_env_vars();
    set_env("FORUM_BIND_ADDR", "0.0.0.0:9000");
    set_env("FORUM_DATABASE_PATH", "/var/lib/forum/chat.db");
    set_env("FORUM_ENABLE_CORS", "off");
    set_env("FORUM_HISTORY_MAX_LIMIT", "50");
    set_env("FORUM_OUTBOUND_QUEUE_CAPACITY", "64");
    set_env("FORUM_PERSIST_TIMEOUT", "500ms");
    set_env("FORUM_SORT_TIMEOUT", "1s 500ms");
    set_env("FORUM_MAX_MESSAGE_SIZE", "4096");
    set_env("FORUM_DUPLICATE_LOGIN", "reject");

    let config = ServerConfigBuilder::from_env()
        .expect("should load config")
        .build()
        .expect("should build valid config");

    assert_eq!(config.bind_addr.to_string(), "0.0.0.0:9000");
    assert_eq!(
        config.database_path,
        Some(PathBuf::from("/var/lib/forum/chat.db"))
    );
    assert!(!config.enable_cors);
    assert_eq!(config.history_max_limit, 50);
    assert_eq!(config.hub.outbound_queue_capacity, 64);
    assert_eq!(config.hub.persist_timeout, Duration::from_millis(500));
    assert_eq!(config.hub.sort_timeout, Duration::from_millis(1500));
    assert_eq!(config.hub.max_message_size, 4096);
    assert_eq!(config.hub.duplicate_login, DuplicateLoginPolicy::RejectNew);

    clear_all_forum_env_vars();
}

#[test]
#[serial]
fn test_env_config_invalid_number() {
    clear_all_forum_env_vars();
    set_env("FORUM_OUTBOUND_QUEUE_CAPACITY", "lots");

    let result = ServerConfigBuilder::from_env();
    assert!(matches!(
        result,
        Err(ConfigError::InvalidEnvVar { ref key, .. }) if key == "FORUM_OUTBOUND_QUEUE_CAPACITY"
    ));

    clear_all_forum_env_vars();
}

#[test]
#[serial]
fn test_env_config_invalid_duration() {
    clear_all_forum_env_vars();
    set_env("FORUM_PERSIST_TIMEOUT", "soon");

    assert!(matches!(
        ServerConfigBuilder::from_env(),
        Err(ConfigError::InvalidEnvVar { .. })
    ));

    clear_all_forum_env_vars();
}

#[test]
#[serial]
fn test_env_config_invalid_policy() {
    clear_all_forum_env_vars();
    set_env("FORUM_DUPLICATE_LOGIN", "kick");

    assert!(matches!(
        ServerConfigBuilder::from_env(),
        Err(ConfigError::InvalidEnvVar { .. })
    ));

    clear_all_forum_env_vars();
}

#[test]
#[serial]
fn test_env_config_out_of_range_fails_validation() {
    clear_all_forum_env_vars();
    set_env("FORUM_SORT_TIMEOUT", "5m");

    let result = ServerConfigBuilder::from_env()
        .expect("value parses")
        .build();
    assert!(matches!(result, Err(ConfigError::ValidationError(_))));

    clear_all_forum_env_vars();
}
