//! General utility helper functions
//!
//! Connection string handling, `KEY=value` file parsing and small path
//! helpers shared by the provisioner and the blob commands.

use std::collections::HashMap;
use uuid::Uuid;

/// Build a connection string from ordered key-value pairs
pub fn build_connection_string(params: &[(&str, &str)]) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join(";")
}

/// Parse a connection string into key-value pairs
pub fn parse_connection_string(connection_string: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();

    for pair in connection_string.split(';') {
        if let Some((key, value)) = pair.split_once('=') {
            params.insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    params
}

/// Parse `KEY=value` lines, skipping blanks and `#` comments
///
/// An optional leading `export ` and surrounding quotes are stripped so the
/// same file can be sourced by a shell.
pub fn parse_env_lines(contents: &str) -> Vec<(String, String)> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line.split_once('=')?;
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            Some((key.trim().to_string(), value.to_string()))
        })
        .collect()
}

/// Generate a new UUID, used as a client request id
pub fn generate_uuid() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_string() {
        let conn_str = "AccountName=acct;AccountKey=abc==;EndpointSuffix=core.windows.net";
        let params = parse_connection_string(conn_str);

        assert_eq!(params.get("AccountName"), Some(&"acct".to_string()));
        assert_eq!(params.get("AccountKey"), Some(&"abc==".to_string()));

        let rebuilt = build_connection_string(&[
            ("AccountName", "acct"),
            ("AccountKey", "abc=="),
            ("EndpointSuffix", "core.windows.net"),
        ]);
        assert_eq!(rebuilt, conn_str);
    }

    #[test]
    fn test_parse_env_lines() {
        let contents = "# generated\n\nAZURE_STORAGE_ACCOUNT=vaultstore1\nexport AZURE_STORAGE_CONTAINER=\"files\"\nnot a pair\n";
        let pairs = parse_env_lines(contents);

        assert_eq!(
            pairs,
            vec![
                ("AZURE_STORAGE_ACCOUNT".to_string(), "vaultstore1".to_string()),
                ("AZURE_STORAGE_CONTAINER".to_string(), "files".to_string()),
            ]
        );
    }

    #[test]
    fn test_generate_uuid() {
        assert_ne!(generate_uuid(), generate_uuid());
    }
}
