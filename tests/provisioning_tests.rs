//! Integration tests for provisioning
//!
//! These run the provisioner end to end against the in-memory provider and
//! check that re-runs converge on the same resources.

use blobctl::{
    cli::provision_and_record,
    config::{Config, ResourcesFile},
    error::{BlobctlError, Result},
    logging::MemoryActivityLog,
    memory::InMemoryStorage,
    storage::{
        naming::{generate_storage_account_name, is_valid_storage_account_name},
        AccountNaming, NameSuffix, ProvisionOutcome, ProvisionRequest, Provisioner,
        PublicAccessLevel, DEFAULT_KIND, DEFAULT_MIN_TLS_VERSION, DEFAULT_SKU,
    },
};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::Level;

fn request(account: AccountNaming) -> ProvisionRequest {
    ProvisionRequest {
        resource_group: "blobctl-test-rg".to_string(),
        region: "eastus".to_string(),
        account,
        container: "files".to_string(),
        sku: DEFAULT_SKU.to_string(),
        kind: DEFAULT_KIND.to_string(),
        public_access: PublicAccessLevel::Blob,
        allow_blob_public_access: true,
        minimum_tls_version: DEFAULT_MIN_TLS_VERSION.to_string(),
    }
}

#[tokio::test]
async fn test_provision_twice_is_idempotent() -> Result<()> {
    let storage = InMemoryStorage::new();
    let activity = Arc::new(MemoryActivityLog::new());
    let provisioner = Provisioner::new(Arc::new(storage.clone()), activity.clone());

    let first = provisioner
        .provision(&request(AccountNaming::Fixed("vaultstore1700000000".to_string())))
        .await?;
    assert_eq!(first.resource_group_outcome, ProvisionOutcome::Created);
    assert_eq!(first.storage_account_outcome, ProvisionOutcome::Created);
    assert_eq!(first.container_outcome, ProvisionOutcome::Created);
    let creates_after_first = storage.create_calls();

    let second = provisioner
        .provision(&request(AccountNaming::Fixed("vaultstore1700000000".to_string())))
        .await?;
    assert_eq!(second.resource_group_outcome, ProvisionOutcome::AlreadyExists);
    assert_eq!(second.storage_account_outcome, ProvisionOutcome::AlreadyExists);
    assert_eq!(second.container_outcome, ProvisionOutcome::AlreadyExists);

    assert_eq!(storage.create_calls(), creates_after_first);
    assert_eq!(first.storage_account.name, second.storage_account.name);
    assert_eq!(first.credential.expose(), second.credential.expose());
    assert!(activity.contains(Level::INFO, "already exists"));
    Ok(())
}

#[tokio::test]
async fn test_rerun_through_resources_file_reuses_account() -> Result<()> {
    let dir = TempDir::new().unwrap();
    let storage = InMemoryStorage::new();
    let activity = Arc::new(MemoryActivityLog::new());

    let mut config = Config::default();
    config.resources_file = dir.path().join("blobctl-resources.env");
    assert!(matches!(config.account_naming(), AccountNaming::Generated { .. }));

    let first = provision_and_record(Arc::new(storage.clone()), &config, activity.clone()).await?;

    // What the next invocation would load
    let recorded = ResourcesFile::load(&config.resources_file)
        .await?
        .expect("resources file written");
    config.storage.storage_account = recorded.storage_account.clone().unwrap_or_default();

    let second = provision_and_record(Arc::new(storage.clone()), &config, activity).await?;
    assert_eq!(second.storage_account.name, first.storage_account.name);
    assert_eq!(second.storage_account_outcome, ProvisionOutcome::AlreadyExists);
    Ok(())
}

#[tokio::test]
async fn test_name_collision_aborts_before_create() -> Result<()> {
    let storage = InMemoryStorage::new();
    storage.reserve_account_name("vaultstoretaken");
    let activity = Arc::new(MemoryActivityLog::new());
    let provisioner = Provisioner::new(Arc::new(storage.clone()), activity.clone());

    let result = provisioner
        .provision(&request(AccountNaming::Fixed("vaultstoretaken".to_string())))
        .await;

    match result {
        Err(BlobctlError::NameUnavailable { name, .. }) => assert_eq!(name, "vaultstoretaken"),
        other => panic!("expected NameUnavailable, got {other:?}"),
    }
    // Only the resource group was created; nothing is rolled back
    assert_eq!(storage.create_calls(), 1);
    assert!(activity.contains(Level::ERROR, "Provisioning failed"));
    Ok(())
}

#[tokio::test]
async fn test_private_container_on_locked_account() -> Result<()> {
    let storage = InMemoryStorage::new();
    let provisioner = Provisioner::new(Arc::new(storage), Arc::new(MemoryActivityLog::new()));

    let mut locked = request(AccountNaming::Fixed("vaultstorelocked".to_string()));
    locked.public_access = PublicAccessLevel::None;
    locked.allow_blob_public_access = false;

    let resources = provisioner.provision(&locked).await?;
    assert!(!resources.storage_account.allow_blob_public_access);
    assert_eq!(resources.container.public_access, PublicAccessLevel::None);
    Ok(())
}

#[test]
fn test_base_name_at_two_times_gives_distinct_names() -> Result<()> {
    let first = generate_storage_account_name("vaultstore", NameSuffix::Timestamp)?;
    std::thread::sleep(std::time::Duration::from_millis(1100));
    let second = generate_storage_account_name("vaultstore", NameSuffix::Timestamp)?;

    assert_ne!(first, second);
    assert!(is_valid_storage_account_name(&first));
    assert!(is_valid_storage_account_name(&second));
    assert!(first.starts_with("vaultstore") && second.starts_with("vaultstore"));
    Ok(())
}
