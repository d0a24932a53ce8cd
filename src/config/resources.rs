//! Resources file written by `provision`
//!
//! Plain `KEY=value` lines naming the resources an earlier run produced.
//! The credential is never written here.

use std::path::Path;

use crate::error::Result;
use crate::utils::helpers::parse_env_lines;

pub const RESOURCE_GROUP_KEY: &str = "AZURE_RESOURCE_GROUP";
pub const STORAGE_ACCOUNT_KEY: &str = "AZURE_STORAGE_ACCOUNT";
pub const CONTAINER_KEY: &str = "AZURE_STORAGE_CONTAINER";

pub const DEFAULT_RESOURCES_FILE: &str = "blobctl-resources.env";

/// Identifiers recorded after provisioning
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourcesFile {
    pub resource_group: Option<String>,
    pub storage_account: Option<String>,
    pub container: Option<String>,
}

impl ResourcesFile {
    pub fn new(resource_group: &str, storage_account: &str, container: &str) -> Self {
        Self {
            resource_group: Some(resource_group.to_string()),
            storage_account: Some(storage_account.to_string()),
            container: Some(container.to_string()),
        }
    }

    /// Parse file contents; unknown keys are ignored
    pub fn parse(contents: &str) -> Self {
        let mut resources = Self::default();
        for (key, value) in parse_env_lines(contents) {
            if value.is_empty() {
                continue;
            }
            match key.as_str() {
                RESOURCE_GROUP_KEY => resources.resource_group = Some(value),
                STORAGE_ACCOUNT_KEY => resources.storage_account = Some(value),
                CONTAINER_KEY => resources.container = Some(value),
                _ => {}
            }
        }
        resources
    }

    /// Read the file, `None` when it does not exist
    pub async fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = tokio::fs::read_to_string(path).await?;
        Ok(Some(Self::parse(&contents)))
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let entries = [
            (RESOURCE_GROUP_KEY, &self.resource_group),
            (STORAGE_ACCOUNT_KEY, &self.storage_account),
            (CONTAINER_KEY, &self.container),
        ];
        for (key, value) in entries {
            if let Some(value) = value {
                out.push_str(&format!("{key}={value}\n"));
            }
        }
        out
    }

    /// Replace the file with the current identifiers
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path, self.render()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_ignores_unknown_and_empty() {
        let resources = ResourcesFile::parse(
            "# written by blobctl\nAZURE_RESOURCE_GROUP=rg\nAZURE_STORAGE_ACCOUNT=\nOTHER=1\nexport AZURE_STORAGE_CONTAINER=\"files\"\n",
        );
        assert_eq!(resources.resource_group.as_deref(), Some("rg"));
        assert_eq!(resources.storage_account, None);
        assert_eq!(resources.container.as_deref(), Some("files"));
    }

    #[test]
    fn test_render_has_no_credential() {
        let rendered = ResourcesFile::new("rg", "vaultstore1", "files").render();
        assert_eq!(
            rendered,
            "AZURE_RESOURCE_GROUP=rg\nAZURE_STORAGE_ACCOUNT=vaultstore1\nAZURE_STORAGE_CONTAINER=files\n"
        );
        assert!(!rendered.contains("AccountKey"));
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join(DEFAULT_RESOURCES_FILE);

        assert_eq!(ResourcesFile::load(&path).await.unwrap(), None);

        let resources = ResourcesFile::new("rg", "vaultstore1", "files");
        resources.save(&path).await.unwrap();
        assert_eq!(ResourcesFile::load(&path).await.unwrap(), Some(resources));
    }
}
