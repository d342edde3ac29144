use std::time::Duration;

use reqwest::Client;

const DISABLE_SYSTEM_PROXY_ENV: &str = "MNEMO_DISABLE_SYSTEM_PROXY";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Shared HTTP client for model and embedding calls.
///
/// Requests time out at the transport layer; the conversation core imposes
/// no timeout of its own.
pub(crate) fn build_http_client() -> Client {
    let mut builder = Client::builder().timeout(REQUEST_TIMEOUT);
    if should_disable_system_proxy() {
        builder = builder.no_proxy();
    }

    builder.build().unwrap_or_else(|error| {
        tracing::warn!(%error, "Falling back to default HTTP client");
        Client::new()
    })
}

fn should_disable_system_proxy() -> bool {
    if std::env::var_os(DISABLE_SYSTEM_PROXY_ENV).is_some() {
        return true;
    }

    cfg!(test)
}
