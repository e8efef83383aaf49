use std::{env, fmt::Display, fs::read_to_string, str::FromStr};

use tracing::{info, warn};

pub struct Config {
    pub port: u16,
    pub store_backend: String,
    pub redis_url: String,
    pub mail_endpoint: String,
    pub mail_token: String,
    pub mail_from: String,
    pub image_upload_url: String,
    pub image_upload_preset: String,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("RUST_PORT", "4000"),
            store_backend: try_load("STORE_BACKEND", "redis"),
            redis_url: try_load("REDIS_URL", "redis://127.0.0.1:6379"),
            mail_endpoint: try_load("MAIL_RELAY_URL", "http://127.0.0.1:8025/api/send"),
            mail_token: read_secret("MAIL_RELAY_TOKEN"),
            mail_from: try_load("MAIL_FROM", "no-reply@cityportal.example"),
            image_upload_url: try_load(
                "IMAGE_UPLOAD_URL",
                "https://api.cloudinary.com/v1_1/demo/image/upload",
            ),
            image_upload_preset: try_load("IMAGE_UPLOAD_PRESET", "issue-reports"),
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}

fn read_secret(secret_name: &str) -> String {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            warn!("Failed to read {secret_name} from file: {e}");
        })
        .expect("Secrets misconfigured!")
}
