/// Defaults shared by the CLI, config loader and pipeline.

// Input lists selected by `--mode`
pub const PROD_LIST_PATH: &str = "./list.csv";
pub const TEST_LIST_PATH: &str = "./list_test.csv";

// Ledger files, recreated on every run
pub const FAILED_LEDGER_PATH: &str = "./failed.csv";
pub const SUCCESS_LEDGER_PATH: &str = "./success.csv";
pub const FAILED_LEDGER_HEADER: [&str; 2] = ["Numbers", "Status"];
pub const SUCCESS_LEDGER_HEADER: [&str; 1] = ["Numbers"];

pub const LOG_DIR: &str = "logs";
pub const LOG_FILE_PREFIX: &str = "batch_notifier.log";

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const DEFAULT_ADDRESS_COLUMN: &str = "Numbers";
pub const DEFAULT_ADDRESS_PATTERN: &str = r"^\+[0-9]+$";
pub const DEFAULT_DELIMITER: char = ',';

pub const DEFAULT_NOTIFY_BASE_URL: &str = "https://notify.twilio.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_DISPATCH_FLOOR_MS: u64 = 1000;
pub const DEFAULT_MAX_BATCH_SIZE: usize = 1;

/// Binding type attached to every address sent to the notify API
pub const SMS_BINDING_TYPE: &str = "sms";

// Environment overrides, also accepted from a .env file
pub const ENV_ACCOUNT_SID: &str = "TWILIO_ACCOUNT_SID";
pub const ENV_AUTH_TOKEN: &str = "TWILIO_AUTH_TOKEN";
pub const ENV_MAX_BATCH_SIZE: &str = "MAX_BATCH_SIZE";
pub const ENV_MSG_BODY: &str = "MSG_BODY";
pub const ENV_NOTIFY_BASE_URL: &str = "NOTIFY_BASE_URL";
pub const ENV_PUSHGATEWAY_URL: &str = "BATCH_NOTIFIER_PUSHGATEWAY_URL";
