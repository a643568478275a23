use tradegate::config::Config;

#[test]
fn default_config_is_valid() {
    let config = Config::default();
    assert!(config.validate().is_ok());
}

#[test]
fn empty_bind_addr_is_rejected() {
    let mut config = Config::default();
    config.server.bind_addr = "  ".to_string();
    let err = config.validate().expect_err("must fail");
    assert!(err.message.contains("bind_addr"));
}

#[test]
fn zero_timeout_is_rejected() {
    let mut config = Config::default();
    config.http.timeout_secs = 0;
    let err = config.validate().expect_err("must fail");
    assert!(err.message.contains("timeout_secs"));
}

#[test]
fn base_urls_must_not_carry_a_trailing_slash() {
    let mut config = Config::default();
    config.endpoints.xt_base_url = "https://sapi.xt.com/".to_string();
    let err = config.validate().expect_err("must fail");
    assert!(err.message.contains("xt_base_url"));
}

#[test]
fn empty_base_url_is_rejected() {
    let mut config = Config::default();
    config.endpoints.kucoin_base_url = String::new();
    let err = config.validate().expect_err("must fail");
    assert!(err.message.contains("kucoin_base_url"));
}

#[test]
fn blank_ai_key_is_rejected_when_set() {
    let mut config = Config::default();
    config.ai.gemini_api_key = Some("  ".to_string());
    let err = config.validate().expect_err("must fail");
    assert!(err.message.contains("gemini_api_key"));

    config.ai.gemini_api_key = Some("real-key".to_string());
    assert!(config.validate().is_ok());
}

#[test]
fn ai_keys_default_to_unset() {
    let config = Config::default();
    assert!(config.ai.gemini_api_key.is_none());
    assert!(config.ai.chaingpt_api_key.is_none());
}
