//! Idempotent provisioning of a resource group, storage account and container
//!
//! Each resource is looked up first and only created when absent, so the
//! whole sequence can be re-run after a partial failure. Nothing is rolled
//! back.

use std::sync::Arc;

use super::credential::ConnectionCredential;
use super::models::{
    Container, ProvisionOutcome, PublicAccessLevel, ResourceGroup, StorageAccount,
    StorageAccountCreateRequest,
};
use super::naming::{
    generate_storage_account_name, is_valid_container_name, is_valid_resource_group_name,
    is_valid_storage_account_name, NameSuffix,
};
use super::operations::StorageOperations;
use crate::error::{BlobctlError, Result};
use crate::logging::ActivityLog;

/// How the storage account name is chosen
#[derive(Debug, Clone, PartialEq)]
pub enum AccountNaming {
    /// Use this exact name (known from an earlier run or configuration)
    Fixed(String),
    /// Generate `base + token`
    Generated { base: String, suffix: NameSuffix },
}

/// Everything the provisioner needs to know
#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    pub resource_group: String,
    pub region: String,
    pub account: AccountNaming,
    pub container: String,
    pub sku: String,
    pub kind: String,
    pub public_access: PublicAccessLevel,
    pub allow_blob_public_access: bool,
    pub minimum_tls_version: String,
}

/// Resources that exist after a successful run
#[derive(Debug, Clone)]
pub struct ProvisionedResources {
    pub resource_group: ResourceGroup,
    pub resource_group_outcome: ProvisionOutcome,
    pub storage_account: StorageAccount,
    pub storage_account_outcome: ProvisionOutcome,
    pub container: Container,
    pub container_outcome: ProvisionOutcome,
    pub credential: ConnectionCredential,
}

/// Drives the ensure-exists sequence against a [`StorageOperations`] backend
pub struct Provisioner {
    operations: Arc<dyn StorageOperations>,
    activity: Arc<dyn ActivityLog>,
}

impl Provisioner {
    pub fn new(operations: Arc<dyn StorageOperations>, activity: Arc<dyn ActivityLog>) -> Self {
        Self {
            operations,
            activity,
        }
    }

    /// Ensure all resources exist and return the account credential
    pub async fn provision(&self, request: &ProvisionRequest) -> Result<ProvisionedResources> {
        match self.run(request).await {
            Ok(resources) => {
                self.activity.info(&format!(
                    "Provisioning complete: resource group '{}', storage account '{}', container '{}'",
                    resources.resource_group.name,
                    resources.storage_account.name,
                    resources.container.name
                ));
                Ok(resources)
            }
            Err(e) => {
                self.activity.error(&format!("Provisioning failed: {e}"));
                Err(e)
            }
        }
    }

    async fn run(&self, request: &ProvisionRequest) -> Result<ProvisionedResources> {
        validate_request(request)?;
        let account_name = resolve_account_name(&request.account)?;

        if request.public_access.is_public() {
            self.activity.warn(&format!(
                "Container '{}' will allow anonymous read access ({})",
                request.container, request.public_access
            ));
        }

        let (resource_group, resource_group_outcome) = self
            .ensure_resource_group(&request.resource_group, &request.region)
            .await?;

        let (storage_account, storage_account_outcome) =
            self.ensure_storage_account(request, &account_name).await?;

        let (container, container_outcome) = self
            .ensure_container(
                &request.resource_group,
                &storage_account.name,
                &request.container,
                request.public_access,
            )
            .await?;

        let credential = self
            .operations
            .get_connection_credential(&request.resource_group, &storage_account.name)
            .await?;
        self.activity.info(&format!(
            "Retrieved connection credential for storage account '{}'",
            storage_account.name
        ));

        Ok(ProvisionedResources {
            resource_group,
            resource_group_outcome,
            storage_account,
            storage_account_outcome,
            container,
            container_outcome,
            credential,
        })
    }

    async fn ensure_resource_group(
        &self,
        name: &str,
        region: &str,
    ) -> Result<(ResourceGroup, ProvisionOutcome)> {
        if let Some(existing) = self.operations.get_resource_group(name).await? {
            if !existing.region.eq_ignore_ascii_case(region) {
                self.activity.warn(&format!(
                    "Resource group '{}' already exists in '{}', not '{}'",
                    name, existing.region, region
                ));
            }
            self.activity
                .info(&format!("Resource group '{name}' already exists"));
            return Ok((existing, ProvisionOutcome::AlreadyExists));
        }

        let created = self.operations.create_resource_group(name, region).await?;
        self.activity
            .info(&format!("Created resource group '{name}' in '{region}'"));
        Ok((created, ProvisionOutcome::Created))
    }

    async fn ensure_storage_account(
        &self,
        request: &ProvisionRequest,
        name: &str,
    ) -> Result<(StorageAccount, ProvisionOutcome)> {
        if let Some(existing) = self
            .operations
            .get_storage_account(&request.resource_group, name)
            .await?
        {
            self.activity
                .info(&format!("Storage account '{name}' already exists"));
            return Ok((existing, ProvisionOutcome::AlreadyExists));
        }

        let availability = self.operations.check_name_availability(name).await?;
        if !availability.available {
            let reason = availability
                .message
                .or(availability.reason)
                .unwrap_or_else(|| "name is taken".to_string());
            return Err(BlobctlError::name_unavailable(name.to_string(), reason));
        }

        let create_request = StorageAccountCreateRequest {
            name: name.to_string(),
            resource_group: request.resource_group.clone(),
            region: request.region.clone(),
            sku: request.sku.clone(),
            kind: request.kind.clone(),
            allow_blob_public_access: request.allow_blob_public_access,
            minimum_tls_version: request.minimum_tls_version.clone(),
        };

        self.activity
            .info(&format!("Creating storage account '{name}' ({}, {})", request.sku, request.kind));
        let created = self.operations.create_storage_account(&create_request).await?;
        self.activity
            .info(&format!("Created storage account '{name}'"));
        Ok((created, ProvisionOutcome::Created))
    }

    async fn ensure_container(
        &self,
        resource_group: &str,
        storage_account: &str,
        name: &str,
        public_access: PublicAccessLevel,
    ) -> Result<(Container, ProvisionOutcome)> {
        if let Some(existing) = self
            .operations
            .get_container(resource_group, storage_account, name)
            .await?
        {
            if existing.public_access != public_access {
                self.activity.warn(&format!(
                    "Container '{}' already exists with public access '{}', requested '{}'",
                    name, existing.public_access, public_access
                ));
            }
            self.activity
                .info(&format!("Container '{name}' already exists"));
            return Ok((existing, ProvisionOutcome::AlreadyExists));
        }

        let created = self
            .operations
            .create_container(resource_group, storage_account, name, public_access)
            .await?;
        self.activity.info(&format!(
            "Created container '{name}' with public access '{public_access}'"
        ));
        Ok((created, ProvisionOutcome::Created))
    }
}

fn validate_request(request: &ProvisionRequest) -> Result<()> {
    if !is_valid_resource_group_name(&request.resource_group) {
        return Err(BlobctlError::invalid_argument(format!(
            "Invalid resource group name '{}'",
            request.resource_group
        )));
    }
    if request.region.trim().is_empty() {
        return Err(BlobctlError::invalid_argument("Region cannot be empty"));
    }
    if !is_valid_container_name(&request.container) {
        return Err(BlobctlError::invalid_argument(format!(
            "Invalid container name '{}' (3-63 lowercase letters, digits and single hyphens)",
            request.container
        )));
    }
    if request.public_access.is_public() && !request.allow_blob_public_access {
        return Err(BlobctlError::invalid_argument(format!(
            "Container public access '{}' requires blob public access on the storage account",
            request.public_access
        )));
    }
    Ok(())
}

fn resolve_account_name(naming: &AccountNaming) -> Result<String> {
    match naming {
        AccountNaming::Fixed(name) => {
            if !is_valid_storage_account_name(name) {
                return Err(BlobctlError::invalid_argument(format!(
                    "Invalid storage account name '{name}' (3-24 lowercase letters or digits)"
                )));
            }
            Ok(name.clone())
        }
        AccountNaming::Generated { base, suffix } => generate_storage_account_name(base, *suffix),
    }
}
