use crate::error::{BlobctlError, Result};
use reqwest::Client;
use std::time::Duration;

/// Configuration for HTTP client with proper timeouts
pub struct NetworkConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(120),
            user_agent: format!("blobctl/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Create a properly configured HTTP client with timeouts
pub fn create_http_client(config: &NetworkConfig) -> Result<Client> {
    Client::builder()
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout)
        .user_agent(&config.user_agent)
        .build()
        .map_err(|e| BlobctlError::network(format!("Failed to create HTTP client: {}", e)))
}

/// Turn a transport failure into a user-facing error
pub fn classify_network_error(error: &reqwest::Error, url: &str) -> BlobctlError {
    let host = extract_host(url);

    if error.is_timeout() {
        return BlobctlError::timeout(format!(
            "Request to '{}' timed out. Check your network connection.",
            host
        ));
    }

    if error.is_connect() {
        if is_dns_resolution_error(error) {
            return BlobctlError::network(format!("Unable to resolve host '{}'", host));
        }
        return BlobctlError::network(format!("Failed to connect to '{}': {}", host, error));
    }

    let message = error.to_string().to_lowercase();
    if message.contains("ssl") || message.contains("tls") || message.contains("certificate") {
        return BlobctlError::network(format!(
            "TLS error when connecting to '{}': {}",
            host, error
        ));
    }

    BlobctlError::network(format!("Network error when calling '{}': {}", host, error))
}

fn is_dns_resolution_error(error: &reqwest::Error) -> bool {
    let error_msg = error.to_string().to_lowercase();
    let dns_indicators = [
        "dns",
        "name resolution",
        "name or service not known",
        "nodename nor servname provided",
        "no such host",
        "could not resolve host",
    ];

    dns_indicators
        .iter()
        .any(|&indicator| error_msg.contains(indicator))
}

/// Host portion of a URL, for error messages
fn extract_host(url: &str) -> String {
    let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    without_scheme
        .split(['/', '?'])
        .next()
        .filter(|host| !host.is_empty())
        .unwrap_or("unknown-host")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_host() {
        assert_eq!(
            extract_host("https://management.azure.com/subscriptions/x?api-version=1"),
            "management.azure.com"
        );
        assert_eq!(extract_host("management.azure.com/path"), "management.azure.com");
        assert_eq!(extract_host(""), "unknown-host");
    }

    #[test]
    fn test_create_http_client() {
        assert!(create_http_client(&NetworkConfig::default()).is_ok());
    }
}
