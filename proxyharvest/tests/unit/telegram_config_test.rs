//! Telegramクレデンシャルの読み込みに関するUnit Test

use proxyharvest::config::TelegramConfig;
use proxyharvest::HarvestError;
use serial_test::serial;

const VARS: [&str; 4] = [
    "PROXYHARVEST_TELEGRAM_TOKEN",
    "PROXYHARVEST_TELEGRAM_CHAT_ID",
    "TELEGRAM_TOKEN",
    "TELEGRAM_CHAT_ID",
];

fn clear_env() {
    for var in VARS {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_blank_token_means_log_only() {
    clear_env();
    std::env::set_var("PROXYHARVEST_TELEGRAM_TOKEN", "   ");
    std::env::set_var("PROXYHARVEST_TELEGRAM_CHAT_ID", "42");

    assert_eq!(TelegramConfig::from_env().unwrap(), None);
    clear_env();
}

#[test]
#[serial]
fn test_legacy_names_are_accepted() {
    clear_env();
    std::env::set_var("TELEGRAM_TOKEN", "123:abc");
    std::env::set_var("TELEGRAM_CHAT_ID", " 42 ");

    let config = TelegramConfig::from_env().unwrap().unwrap();
    assert_eq!(config.chat_id, 42);
    clear_env();
}

#[test]
#[serial]
fn test_non_numeric_chat_id_is_fatal() {
    clear_env();
    std::env::set_var("TELEGRAM_TOKEN", "123:abc");
    std::env::set_var("TELEGRAM_CHAT_ID", "my-channel");

    let err = TelegramConfig::from_env().unwrap_err();
    assert!(matches!(err, HarvestError::Credential(_)));
    clear_env();
}
