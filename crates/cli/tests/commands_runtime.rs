use std::env;
use std::io::Cursor;
use std::sync::{Mutex, OnceLock};

use ordermate_cli::commands::{chat, config, doctor, menu, migrate};
use ordermate_core::config::{ConfigOverrides, LoadOptions};
use serde_json::Value;

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("ORDERMATE_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_for_unusable_provider() {
    with_env(&[("ORDERMATE_LLM_PROVIDER", "openai")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn doctor_passes_with_defaults() {
    with_env(&[], || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 0, "{}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["overall_status"], "pass");
        let names = payload["checks"]
            .as_array()
            .expect("checks")
            .iter()
            .map(|check| check["name"].as_str().unwrap_or_default().to_string())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["config_validation", "llm_client", "order_store"]);
    });
}

#[test]
fn doctor_skips_dependent_checks_when_config_is_invalid() {
    with_env(&[("ORDERMATE_LLM_MAX_RETRIES", "many")], || {
        let result = doctor::run(false);
        assert_eq!(result.exit_code, 1);
        assert!(result.output.contains("- [fail] config_validation"));
        assert!(result.output.contains("- [skip] order_store"));
    });
}

#[test]
fn config_redacts_the_model_key_and_names_sources() {
    with_env(
        &[("ORDERMATE_LLM_PROVIDER", "openai"), ("ORDERMATE_LLM_API_KEY", "sk-very-secret")],
        || {
            let result = config::run();
            assert_eq!(result.exit_code, 0, "{}", result.output);
            assert!(result.output.contains("- llm.api_key = sk-*** (source: env (ORDERMATE_LLM_API_KEY))"));
            assert!(!result.output.contains("very-secret"));
            assert!(result.output.contains("- server.port = 8000 (source: default)"));
        },
    );
}

#[test]
fn menu_lists_seeded_items() {
    let result = menu::run(true);
    assert_eq!(result.exit_code, 0);

    let items: Value = serde_json::from_str(&result.output).expect("json menu");
    assert_eq!(items.as_array().map(Vec::len), Some(5));
    assert_eq!(items[0]["name"], "Pizza Margherita");
    assert_eq!(items[4]["price"], "6.99");

    let human = menu::run(false);
    assert!(human.output.contains("- [3] Caesar Salad $8.99"));
}

#[test]
fn chat_places_an_order_remembering_the_name() {
    with_env(&[], || {
        let input = Cursor::new("My name is Alex.\nI want 2 burger and 1 tiramisu\nstatus\nexit\n");
        let mut output = Vec::new();

        let result = chat::run_with_io(local_options(), input, &mut output);
        assert_eq!(result.exit_code, 0, "{}", result.output);
        assert_eq!(parse_payload(&result.output)["message"], "3 turn(s) handled");

        let transcript = String::from_utf8(output).expect("utf8");
        assert!(transcript.contains("assistant> Nice to meet you, Alex!"));
        assert!(transcript.contains("assistant> Order placed for Alex!"));
        assert!(transcript.contains("Total: $31.99."));
        assert!(transcript.contains("is pending."), "{transcript}");
    });
}

#[test]
fn chat_stops_at_end_of_input() {
    with_env(&[], || {
        let mut output = Vec::new();
        let result = chat::run_with_io(local_options(), Cursor::new("menu\n"), &mut output);

        assert_eq!(parse_payload(&result.output)["message"], "1 turn(s) handled");
        assert!(String::from_utf8(output).expect("utf8").contains("Here is our menu:"));
    });
}

fn local_options() -> LoadOptions {
    LoadOptions {
        config_path: Some("/nonexistent/ordermate.toml".into()),
        require_file: false,
        overrides: ConfigOverrides::default(),
    }
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "ORDERMATE_STORAGE_BACKEND",
        "ORDERMATE_DATABASE_URL",
        "ORDERMATE_DATABASE_MAX_CONNECTIONS",
        "ORDERMATE_DATABASE_TIMEOUT_SECS",
        "ORDERMATE_LLM_PROVIDER",
        "ORDERMATE_LLM_API_KEY",
        "ORDERMATE_LLM_BASE_URL",
        "ORDERMATE_LLM_API_VERSION",
        "ORDERMATE_LLM_MODEL",
        "ORDERMATE_LLM_TEMPERATURE",
        "ORDERMATE_LLM_MAX_TOKENS",
        "ORDERMATE_LLM_TIMEOUT_SECS",
        "ORDERMATE_LLM_MAX_RETRIES",
        "ORDERMATE_LLM_RETRY_BASE_DELAY_MS",
        "ORDERMATE_SERVER_BIND_ADDRESS",
        "ORDERMATE_SERVER_PORT",
        "ORDERMATE_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "ORDERMATE_LOGGING_LEVEL",
        "ORDERMATE_LOGGING_FORMAT",
        "ORDERMATE_LOG_LEVEL",
        "ORDERMATE_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
