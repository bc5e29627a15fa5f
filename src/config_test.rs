use super::*;

// =============================================================
// Timeouts
// =============================================================

#[test]
fn timeouts_default_values() {
    let timeouts = Timeouts::default();
    assert_eq!(timeouts.request_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    assert_eq!(timeouts.connect_secs, DEFAULT_CONNECT_TIMEOUT_SECS);
}

#[test]
fn timeouts_reject_zero_request() {
    let err = Timeouts { request_secs: 0, connect_secs: 5 }.validated().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidTimeout { setting: "request timeout" }));
}

#[test]
fn timeouts_reject_zero_connect() {
    let err = Timeouts { request_secs: 5, connect_secs: 0 }.validated().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidTimeout { setting: "connect timeout" }));
}

// =============================================================
// ChatConfig
// =============================================================

#[test]
fn chat_config_accepts_https_endpoint() {
    let cfg = ChatConfig::new(Some("https://bot.example.test/whatsapp"), Timeouts::default()).unwrap();
    assert_eq!(cfg.endpoint.as_str(), "https://bot.example.test/whatsapp");
    assert_eq!(cfg.endpoint.path(), "/whatsapp");
    assert_eq!(cfg.timeouts, Timeouts::default());
}

#[test]
fn chat_config_trims_whitespace() {
    let cfg = ChatConfig::new(Some("  http://127.0.0.1:8080/whatsapp \n"), Timeouts::default()).unwrap();
    assert_eq!(cfg.endpoint.as_str(), "http://127.0.0.1:8080/whatsapp");
}

#[test]
fn chat_config_missing_endpoint_errors() {
    let err = ChatConfig::new(None, Timeouts::default()).unwrap_err();
    assert!(err.to_string().contains("BOTCHAT_ENDPOINT"));

    let err = ChatConfig::new(Some("   "), Timeouts::default()).unwrap_err();
    assert!(matches!(err, ConfigError::MissingSetting { flag: "endpoint", .. }));
}

#[test]
fn chat_config_rejects_relative_url() {
    let err = ChatConfig::new(Some("/whatsapp"), Timeouts::default()).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidUrl { setting: "endpoint", .. }));
}

#[test]
fn chat_config_rejects_socket_scheme() {
    let err = ChatConfig::new(Some("ws://localhost:5000"), Timeouts::default()).unwrap_err();
    assert!(err.to_string().contains("unsupported scheme 'ws'"));
}

#[test]
fn chat_config_propagates_timeout_errors() {
    let err = ChatConfig::new(Some("http://localhost/whatsapp"), Timeouts { request_secs: 0, connect_secs: 1 })
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidTimeout { .. }));
}

// =============================================================
// SocketConfig
// =============================================================

#[test]
fn socket_config_keeps_ws_url() {
    let cfg = SocketConfig::new(Some("ws://localhost:5000")).unwrap();
    assert_eq!(cfg.url.as_str(), "ws://localhost:5000/");
}

#[test]
fn socket_config_maps_http_to_ws() {
    let cfg = SocketConfig::new(Some("http://localhost:5000")).unwrap();
    assert_eq!(cfg.url.scheme(), "ws");
    assert_eq!(cfg.url.port(), Some(5000));
    assert_eq!(cfg.url.host_str(), Some("localhost"));
}

#[test]
fn socket_config_maps_https_to_wss() {
    let cfg = SocketConfig::new(Some("HTTPS://rt.example.test/socket")).unwrap();
    assert_eq!(cfg.url.scheme(), "wss");
    assert_eq!(cfg.url.path(), "/socket");
}

#[test]
fn socket_config_missing_url_errors() {
    let err = SocketConfig::new(None).unwrap_err();
    assert!(err.to_string().contains("--socket-url"));
}

#[test]
fn socket_config_rejects_unknown_scheme() {
    let err = SocketConfig::new(Some("ftp://localhost:5000")).unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedScheme { setting: "socket URL", .. }));
}
