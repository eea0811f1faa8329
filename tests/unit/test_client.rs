use aegis_client::{AegisError, Client, ClientConfig};

/// Surface transport debug logs when running with RUST_LOG set.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

#[test]
fn connect_with_token_needs_no_network() {
    init_tracing();
    let client = tokio_test::block_on(Client::connect(
        ClientConfig::new("https://aegis.example.com").with_token("jwt"),
    ))
    .unwrap();
    assert_eq!(client.access_token().as_deref(), Some("jwt"));
}

#[test]
fn connect_without_credentials_is_a_config_error() {
    init_tracing();
    let err = tokio_test::block_on(Client::connect(ClientConfig::new(
        "https://aegis.example.com",
    )))
    .unwrap_err();
    assert!(matches!(err, AegisError::Config(_)));
}

#[test]
fn config_file_controls_the_client() {
    let config: ClientConfig = toml::from_str(
        r#"
        base_url = "https://aegis.example.com"
        backend_url = "https://backend.internal"
        token = "file-jwt"
        insecure = true
        timeout_secs = 15
        "#,
    )
    .unwrap();
    assert!(config.insecure);
    assert_eq!(config.timeout_secs, 15);

    let client = tokio_test::block_on(Client::connect(config)).unwrap();
    assert_eq!(client.access_token().as_deref(), Some("file-jwt"));
}

#[test]
fn missing_config_file_errors_cleanly() {
    let err = ClientConfig::load("/definitely/not/here.toml").unwrap_err();
    assert!(matches!(err, AegisError::Config(_)));
    assert!(err.to_string().contains("not/here.toml"));
}
