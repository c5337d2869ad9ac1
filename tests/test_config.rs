use spindle::config::{CONFIG_ENV, Config, LISTEN_ENV};
use std::sync::Mutex;
use std::time::Duration;

// Tests in this file share process environment.
static ENV: Mutex<()> = Mutex::new(());

#[test]
fn test_config_default_address() {
    let _guard = ENV.lock().unwrap_or_else(|e| e.into_inner());
    // When LISTEN env var is not set, should use default
    unsafe {
        std::env::remove_var(LISTEN_ENV);
        std::env::remove_var(CONFIG_ENV);
    }
    let cfg = Config::load().unwrap();
    assert_eq!(cfg.server.listen_addr, "127.0.0.1:8080");
    assert!(cfg.server.local_socket.is_none());
}

#[test]
fn test_config_custom_address_from_env() {
    let _guard = ENV.lock().unwrap_or_else(|e| e.into_inner());
    unsafe {
        std::env::remove_var(CONFIG_ENV);
        std::env::set_var(LISTEN_ENV, "0.0.0.0:3000");
    }
    let cfg = Config::load().unwrap();
    assert_eq!(cfg.server.listen_addr, "0.0.0.0:3000");
    unsafe {
        std::env::remove_var(LISTEN_ENV);
    }
}

#[test]
fn test_config_env_overrides_file() {
    let _guard = ENV.lock().unwrap_or_else(|e| e.into_inner());
    let path = std::env::temp_dir().join(format!("spindle-config-{}.yaml", std::process::id()));
    std::fs::write(&path, "server:\n  listen_addr: \"127.0.0.1:9000\"\n").unwrap();

    unsafe {
        std::env::set_var(CONFIG_ENV, &path);
        std::env::remove_var(LISTEN_ENV);
    }
    let from_file = Config::load().unwrap();
    assert_eq!(from_file.server.listen_addr, "127.0.0.1:9000");

    unsafe {
        std::env::set_var(LISTEN_ENV, "127.0.0.1:9001");
    }
    let overridden = Config::load().unwrap();
    assert_eq!(overridden.server.listen_addr, "127.0.0.1:9001");

    unsafe {
        std::env::remove_var(CONFIG_ENV);
        std::env::remove_var(LISTEN_ENV);
    }
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_config_missing_file_is_error() {
    let _guard = ENV.lock().unwrap_or_else(|e| e.into_inner());
    unsafe {
        std::env::set_var(CONFIG_ENV, "/nonexistent/spindle.yaml");
    }
    assert!(Config::load().is_err());
    unsafe {
        std::env::remove_var(CONFIG_ENV);
    }
}

#[test]
fn test_config_clone() {
    let cfg1 = Config::default();
    let cfg2 = cfg1.clone();
    assert_eq!(cfg1.server.listen_addr, cfg2.server.listen_addr);
}

#[test]
fn test_config_yaml_sections() {
    let cfg = Config::from_yaml(
        r#"
server:
  listen_addr: "0.0.0.0:5000"
  local_socket: /tmp/spindle.sock
runtime:
  thread_name: main-loop
client:
  connect_timeout_ms: 250
"#,
    )
    .unwrap();

    assert!(cfg.server.listen_addr.starts_with("0.0.0.0"));
    assert_eq!(
        cfg.server.local_socket.as_deref(),
        Some(std::path::Path::new("/tmp/spindle.sock"))
    );
    assert_eq!(cfg.runtime.thread_name, "main-loop");
    // Unset fields keep their defaults.
    assert_eq!(cfg.runtime.task_name, "spindle-task");
    assert_eq!(cfg.client.connect_timeout(), Duration::from_millis(250));
    assert_eq!(cfg.client.request_timeout(), Duration::from_secs(30));
}

#[test]
fn test_config_empty_yaml_uses_defaults() {
    let cfg = Config::from_yaml("{}").unwrap();
    assert_eq!(cfg.server.listen_addr, "127.0.0.1:8080");
    assert_eq!(cfg.runtime.thread_name, "spindle-main");
}

#[test]
fn test_config_rejects_wrong_types() {
    assert!(Config::from_yaml("client:\n  connect_timeout_ms: soon\n").is_err());
}
