use super::load_config;
use super::settings::Settings;
use serial_test::serial;
use std::env;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.server.host, "0.0.0.0");
    assert_eq!(settings.server.port, 8080);
    assert_eq!(settings.server.ws_path, "/ws");
    assert_eq!(settings.hub.send_queue_capacity, 256);
    assert!(!settings.hub.echo_to_sender);
    assert_eq!(settings.connection.write_wait(), Duration::from_secs(10));
    assert_eq!(settings.connection.pong_wait(), Duration::from_secs(60));
    assert_eq!(settings.connection.ping_period(), Duration::from_secs(54));
    assert!(settings.uploads.dir.ends_with("intranet-chat"));
    assert_eq!(settings.uploads.public_prefix, "/files");
}

#[test]
fn test_ping_period_is_clamped_below_pong_wait() {
    let mut settings = Settings::default();
    settings.connection.pong_wait_secs = 10;
    settings.connection.ping_period_secs = 30;
    assert_eq!(settings.connection.ping_period(), Duration::from_secs(9));

    settings.connection.ping_period_secs = 0;
    assert_eq!(settings.connection.ping_period(), Duration::from_secs(9));
}

#[test]
fn test_apply_addr() {
    let mut settings = Settings::default();

    settings.server.apply_addr(":9090").unwrap();
    assert_eq!(settings.server.host, "0.0.0.0");
    assert_eq!(settings.server.port, 9090);

    settings.server.apply_addr("192.168.1.20:8000").unwrap();
    assert_eq!(settings.server.addr(), "192.168.1.20:8000");

    settings.server.apply_addr("[::1]:7000").unwrap();
    assert_eq!(settings.server.host, "::1");

    assert!(settings.server.apply_addr("localhost").is_err());
    assert!(settings.server.apply_addr("localhost:http").is_err());
}

#[test]
#[serial]
fn load_config_from_file_overrides_defaults() {
    // load_config reads config/default.* relative to the working directory
    let tmp = TempDir::new().expect("create tempdir");
    let orig = env::current_dir().expect("current_dir");
    env::set_current_dir(tmp.path()).expect("set current dir");

    fs::create_dir_all("config").expect("create config dir");
    let toml = r#"
        [server]
        host = "127.0.0.1"
        port = 9000

        [hub]
        send_queue_capacity = 16
        echo_to_sender = true

        [connection]
        pong_wait_secs = 30
    "#;
    fs::write("config/default.toml", toml).expect("write config file");

    let cfg = load_config();
    env::set_current_dir(orig).expect("restore cwd");

    let cfg = cfg.expect("load_config failed");
    assert_eq!(cfg.server.host, "127.0.0.1");
    assert_eq!(cfg.server.port, 9000);
    assert_eq!(cfg.server.ws_path, "/ws");
    assert_eq!(cfg.hub.send_queue_capacity, 16);
    assert!(cfg.hub.echo_to_sender);
    assert_eq!(cfg.connection.pong_wait_secs, 30);
    assert_eq!(cfg.connection.write_wait_secs, 10);
}

#[test]
#[serial]
fn load_config_from_env_overrides_defaults() {
    temp_env::with_vars(
        [
            ("LANCHAT_SERVER__PORT", Some("7070")),
            ("LANCHAT_HUB__ECHO_TO_SENDER", Some("true")),
            ("LANCHAT_LOGGING__LEVEL", Some("debug")),
        ],
        || {
            let cfg = load_config().expect("load_config failed");
            assert_eq!(cfg.server.port, 7070);
            assert!(cfg.hub.echo_to_sender);
            assert_eq!(cfg.logging.level, "debug");
            assert_eq!(cfg.server.host, "0.0.0.0");
        },
    );
}

#[test]
#[serial]
fn zero_queue_capacity_falls_back_to_default() {
    temp_env::with_var("LANCHAT_HUB__SEND_QUEUE_CAPACITY", Some("0"), || {
        let cfg = load_config().expect("load_config failed");
        assert_eq!(cfg.hub.send_queue_capacity, 256);
    });
}
