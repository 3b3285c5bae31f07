use crate::config::Settings;
use reqwest::Client;

const USER_AGENT: &str = concat!("printdrop-api/", env!("CARGO_PKG_VERSION"));

pub fn build_client(settings: &Settings) -> Client {
    Client::builder()
        .timeout(settings.request_timeout)
        .connect_timeout(settings.connect_timeout)
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|_| Client::new())
}
