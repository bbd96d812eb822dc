use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub clinic_name: String,
    pub clinic_phone: String,
    pub clinic_utc_offset_minutes: i32,
    pub message_gateway_url: String,
    pub message_gateway_token: String,
    pub notify_max_attempts: u32,
    pub notify_base_delay_ms: u64,
    pub listen_port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            clinic_name: env::var("CLINIC_NAME")
                .unwrap_or_else(|_| "7th Heaven Family Dentistry".to_string()),
            clinic_phone: env::var("CLINIC_PHONE")
                .unwrap_or_else(|_| {
                    warn!("CLINIC_PHONE not set, staff notifications have no destination");
                    String::new()
                }),
            clinic_utc_offset_minutes: parse_env("CLINIC_UTC_OFFSET_MINUTES", 330),
            message_gateway_url: env::var("MESSAGE_GATEWAY_URL")
                .unwrap_or_else(|_| {
                    warn!("MESSAGE_GATEWAY_URL not set, outbound messages will be logged only");
                    String::new()
                }),
            message_gateway_token: env::var("MESSAGE_GATEWAY_TOKEN")
                .unwrap_or_else(|_| String::new()),
            notify_max_attempts: parse_env("NOTIFY_MAX_ATTEMPTS", 5),
            notify_base_delay_ms: parse_env("NOTIFY_BASE_DELAY_MS", 500),
            listen_port: parse_env("PORT", 3000),
        };

        if !config.is_messaging_configured() {
            warn!("Messaging gateway not fully configured - notifications fall back to the log channel");
        }

        config
    }

    pub fn is_messaging_configured(&self) -> bool {
        !self.message_gateway_url.is_empty() && !self.clinic_phone.is_empty()
    }
}

fn parse_env<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} is not a valid value, using default", key);
            default
        }),
        Err(_) => default,
    }
}
