//! CLI commands and argument parsing
//!
//! This module defines the command-line interface structure using clap and
//! wires each command to the provisioner or the blob manager.

use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::auth::DefaultAzureCredentialProvider;
use crate::blob::BlobManager;
use crate::config::{Config, ResourcesFile, DEFAULT_LOG_FILE};
use crate::error::{BlobctlError, Result};
use crate::logging::{ActivityLog, FileActivityLog};
use crate::storage::{
    AzureStorageOperations, ConnectionCredential, ProvisionedResources, Provisioner,
    PublicAccessLevel, StorageOperations,
};
use crate::utils::format::{DisplayUtils, OutputFormat, TableFormatter};

#[derive(Parser, Debug)]
#[command(name = "blobctl")]
#[command(about = "Provision Azure Storage and manage the blobs of one container")]
#[command(version, author)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Disable coloured output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file to use instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Activity log file
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ensure the resource group, storage account and container exist
    Provision {
        /// Resource group to create or reuse
        #[arg(long)]
        resource_group: Option<String>,
        /// Azure region for new resources
        #[arg(long)]
        location: Option<String>,
        /// Container to create or reuse
        #[arg(long)]
        container: Option<String>,
        /// Anonymous access for the container (none, blob, container)
        #[arg(long, value_parser = parse_public_access)]
        public_access: Option<PublicAccessLevel>,
        /// Print the connection string after provisioning
        #[arg(long)]
        show_credential: bool,
    },
    /// Upload a local file as a blob
    Upload {
        /// Local file to upload
        local_file: PathBuf,
        /// Name of the blob in the container
        blob_name: String,
        /// Fail instead of replacing an existing blob
        #[arg(long)]
        no_overwrite: bool,
    },
    /// Download a blob to a local file
    Download {
        /// Name of the blob in the container
        blob_name: String,
        /// Local file to write
        local_file: PathBuf,
    },
    /// List blobs in the container (alias: ls)
    #[command(alias = "ls")]
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Delete a blob; succeeds if it does not exist (alias: rm)
    #[command(alias = "rm")]
    Delete {
        /// Name of the blob in the container
        blob_name: String,
    },
}

fn parse_public_access(value: &str) -> std::result::Result<PublicAccessLevel, String> {
    value.parse::<PublicAccessLevel>().map_err(|e| e.to_string())
}

/// Convert a clap parse failure into the crate's usage error
pub fn usage_error(error: &clap::Error) -> BlobctlError {
    let rendered = error.to_string();
    let first_line = rendered.lines().next().unwrap_or_default();
    let message = first_line.strip_prefix("error: ").unwrap_or(first_line);
    BlobctlError::usage(message.trim())
}

/// Activity log path to use before the configuration is available
///
/// Looks at `--log-file` in the raw arguments, then `BLOBCTL_LOG_FILE`,
/// then falls back to the default file name.
pub fn fallback_log_path<S, F>(args: &[S], env: F) -> PathBuf
where
    S: AsRef<OsStr>,
    F: Fn(&str) -> Option<String>,
{
    let mut iter = args.iter().map(|arg| arg.as_ref().to_string_lossy());
    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }
        if arg == "--log-file" {
            if let Some(value) = iter.next() {
                return PathBuf::from(value.into_owned());
            }
        } else if let Some(value) = arg.strip_prefix("--log-file=") {
            return PathBuf::from(value);
        }
    }

    env("BLOBCTL_LOG_FILE")
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE))
}

/// Write a failure that happened before any command ran
pub fn record_startup_failure(log_path: &Path, error: &BlobctlError) {
    match FileActivityLog::open(log_path) {
        Ok(log) => log.error(&format!("blobctl: {error}")),
        Err(e) => tracing::warn!("Cannot open activity log {}: {}", log_path.display(), e),
    }
}

impl Cli {
    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply_overrides(&self, config: &mut Config) {
        if self.debug {
            config.debug = true;
        }
        if self.no_color {
            config.no_color = true;
        }
        if let Some(path) = &self.log_file {
            config.log_file = path.clone();
        }

        match &self.command {
            Commands::Provision {
                resource_group,
                location,
                container,
                public_access,
                ..
            } => {
                if let Some(value) = resource_group {
                    config.resource_group = value.clone();
                }
                if let Some(value) = location {
                    config.location = value.clone();
                }
                if let Some(value) = container {
                    config.storage.container_name = value.clone();
                }
                if let Some(value) = public_access {
                    config.provision.container_public_access = *value;
                }
            }
            Commands::List { json } => {
                if *json {
                    config.output_json = true;
                }
            }
            _ => {}
        }
    }

    /// Short command name for log lines
    pub fn command_name(&self) -> &'static str {
        match self.command {
            Commands::Provision { .. } => "provision",
            Commands::Upload { .. } => "upload",
            Commands::Download { .. } => "download",
            Commands::List { .. } => "list",
            Commands::Delete { .. } => "delete",
        }
    }

    /// Run the command
    ///
    /// The provisioner and the blob manager log their own failures; setup
    /// failures before them are logged here, so each error is logged once.
    pub async fn execute(self, config: Config, activity: Arc<dyn ActivityLog>) -> Result<()> {
        let command_name = self.command_name();
        match self.command {
            Commands::Provision {
                show_credential, ..
            } => execute_provision(&config, activity, show_credential).await,
            command => {
                let manager = create_blob_manager(&config, activity.clone())
                    .await
                    .inspect_err(|e| log_failure(activity.as_ref(), command_name, e))?;
                execute_blob_command(&manager, command, &config).await
            }
        }
    }
}

fn log_failure(activity: &dyn ActivityLog, command: &str, error: &BlobctlError) {
    activity.error(&format!("blobctl {command} failed: {error}"));
}

fn azure_operations(config: &Config) -> Result<Arc<dyn StorageOperations>> {
    let auth_provider = Arc::new(DefaultAzureCredentialProvider::new()?);
    let operations = AzureStorageOperations::new(
        auth_provider,
        config.subscription_id.clone(),
        config.provisioning_poll(),
    )?;
    Ok(Arc::new(operations))
}

async fn execute_provision(
    config: &Config,
    activity: Arc<dyn ActivityLog>,
    show_credential: bool,
) -> Result<()> {
    config
        .validate_for_provision()
        .inspect_err(|e| log_failure(activity.as_ref(), "provision", e))?;
    let display = DisplayUtils::new(config.no_color);

    if config.provision.container_public_access.is_public() {
        display.print_warning(&format!(
            "Container '{}' will allow anonymous read access ({}). Use --public-access none for a private container.",
            config.storage.container_name, config.provision.container_public_access
        ));
    }

    let operations =
        azure_operations(config).inspect_err(|e| log_failure(activity.as_ref(), "provision", e))?;
    display.print_info(&format!(
        "Provisioning in resource group '{}' ({})...",
        config.resource_group, config.location
    ));

    let resources = provision_and_record(operations, config, activity).await?;
    print_provisioned(&display, &resources, &config.resources_file, show_credential);

    Ok(())
}

/// Provision everything the config describes and record the identifiers
///
/// The resources file is written only after every step succeeded.
pub async fn provision_and_record(
    operations: Arc<dyn StorageOperations>,
    config: &Config,
    activity: Arc<dyn ActivityLog>,
) -> Result<ProvisionedResources> {
    let provisioner = Provisioner::new(operations, activity.clone());
    let resources = provisioner.provision(&config.provision_request()).await?;

    ResourcesFile::new(
        &resources.resource_group.name,
        &resources.storage_account.name,
        &resources.container.name,
    )
    .save(&config.resources_file)
    .await
    .inspect_err(|e| log_failure(activity.as_ref(), "provision", e))?;
    activity.info(&format!(
        "Recorded resource identifiers in '{}'",
        config.resources_file.display()
    ));

    Ok(resources)
}

fn print_provisioned(
    display: &DisplayUtils,
    resources: &ProvisionedResources,
    resources_file: &Path,
    show_credential: bool,
) {
    let resource_group = format!(
        "{} ({})",
        resources.resource_group.name, resources.resource_group_outcome
    );
    let storage_account = format!(
        "{} ({})",
        resources.storage_account.name, resources.storage_account_outcome
    );
    let container = format!(
        "{} ({}, public access: {})",
        resources.container.name, resources.container_outcome, resources.container.public_access
    );
    let resources_path = resources_file.display().to_string();

    display.print_success("Provisioning complete");
    println!(
        "{}",
        display.format_key_value_pairs(&[
            ("Resource group", &resource_group),
            ("Storage account", &storage_account),
            ("Container", &container),
            ("Resources file", &resources_path),
        ])
    );

    if show_credential {
        println!();
        println!("AZURE_STORAGE_CONNECTION_STRING={}", resources.credential.expose());
    } else {
        display.print_info(
            "Connection string not shown. Re-run with --show-credential, or let blob commands fetch it through your Azure login.",
        );
    }
}

/// Find a connection credential for the blob commands
///
/// Tries `AZURE_STORAGE_CONNECTION_STRING`, then `AZURE_STORAGE_KEY` with the
/// account name, then the management plane's account keys.
pub async fn resolve_credential<F>(config: &Config, management: F) -> Result<ConnectionCredential>
where
    F: FnOnce() -> Result<Arc<dyn StorageOperations>>,
{
    if let Some(connection_string) = &config.storage.connection_string {
        return ConnectionCredential::new(connection_string.clone());
    }

    config.validate_for_blob_ops()?;
    let account = &config.storage.storage_account;

    if let Some(key) = &config.storage.account_key {
        return ConnectionCredential::from_account_key(account, key);
    }

    if config.subscription_id.trim().is_empty() {
        return Err(BlobctlError::config(
            "No storage credential available. Set AZURE_STORAGE_CONNECTION_STRING, \
             or AZURE_STORAGE_KEY, or AZURE_SUBSCRIPTION_ID so the account keys can be fetched",
        ));
    }

    let operations = management()?;
    operations
        .get_connection_credential(&config.resource_group, account)
        .await
}

async fn create_blob_manager(config: &Config, activity: Arc<dyn ActivityLog>) -> Result<BlobManager> {
    let credential = resolve_credential(config, || azure_operations(config)).await?;

    if let Some(account) = credential.account_name() {
        if !config.storage.storage_account.is_empty() && account != config.storage.storage_account {
            activity.warn(&format!(
                "Connection string targets account '{}' but '{}' is configured; using the connection string",
                account, config.storage.storage_account
            ));
        }
    }
    if config.storage.container_name.trim().is_empty() {
        return Err(BlobctlError::config(
            "No container configured. Set AZURE_STORAGE_CONTAINER",
        ));
    }

    BlobManager::for_azure(&credential, &config.storage.container_name, activity)
}

/// Run one of the blob commands against `manager`
pub async fn execute_blob_command(
    manager: &BlobManager,
    command: Commands,
    config: &Config,
) -> Result<()> {
    let display = DisplayUtils::new(config.no_color);

    match command {
        Commands::Upload {
            local_file,
            blob_name,
            no_overwrite,
        } => {
            let info = manager.upload(&local_file, &blob_name, !no_overwrite).await?;
            display.print_success(&format!(
                "Uploaded '{}' as '{}' ({}, {})",
                local_file.display(),
                info.name,
                crate::blob::format_size(info.size),
                info.content_type
            ));
        }
        Commands::Download {
            blob_name,
            local_file,
        } => {
            let written = manager.download(&blob_name, &local_file).await?;
            display.print_success(&format!(
                "Downloaded '{}' to '{}' ({})",
                blob_name,
                local_file.display(),
                crate::blob::format_size(written)
            ));
        }
        Commands::List { .. } => {
            let blobs = manager.list_all().await?;
            let formatter = TableFormatter::new(
                OutputFormat::from_json_flag(config.output_json),
                config.no_color,
            );
            println!("{}", formatter.format_rows(&blobs, "No files found")?);
            if !config.output_json && !blobs.is_empty() {
                println!("\nTotal files: {}", blobs.len());
            }
        }
        Commands::Delete { blob_name } => {
            if manager.delete(&blob_name).await? {
                display.print_success(&format!("Deleted '{blob_name}'"));
            } else {
                display.print_info(&format!("Blob '{blob_name}' did not exist"));
            }
        }
        Commands::Provision { .. } => {
            return Err(BlobctlError::usage(
                "provision is not a blob command",
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemoryActivityLog;
    use crate::memory::InMemoryStorage;
    use crate::storage::AccountNaming;
    use clap::error::ErrorKind;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> std::result::Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("blobctl").chain(args.iter().copied()))
    }

    fn in_memory(storage: &InMemoryStorage) -> impl FnOnce() -> Result<Arc<dyn StorageOperations>> {
        let storage = storage.clone();
        move || Ok(Arc::new(storage) as Arc<dyn StorageOperations>)
    }

    #[test]
    fn test_upload_requires_two_arguments() {
        let err = parse(&["upload", "only-one.txt"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);

        let err = parse(&["upload", "a", "b", "c"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_parse_commands() {
        let cli = parse(&["--no-color", "upload", "notes.txt", "docs/notes.txt", "--no-overwrite"]).unwrap();
        assert!(cli.no_color);
        match cli.command {
            Commands::Upload {
                local_file,
                blob_name,
                no_overwrite,
            } => {
                assert_eq!(local_file, PathBuf::from("notes.txt"));
                assert_eq!(blob_name, "docs/notes.txt");
                assert!(no_overwrite);
            }
            other => panic!("unexpected command {other:?}"),
        }

        assert!(matches!(parse(&["ls"]).unwrap().command, Commands::List { json: false }));
        assert!(matches!(parse(&["rm", "a.txt"]).unwrap().command, Commands::Delete { .. }));
    }

    #[test]
    fn test_help_and_version_are_not_usage_errors() {
        assert!(!parse(&["--help"]).unwrap_err().use_stderr());
        assert!(!parse(&["--version"]).unwrap_err().use_stderr());
        assert!(parse(&["frobnicate"]).unwrap_err().use_stderr());
    }

    #[test]
    fn test_usage_error_is_written_to_activity_log() {
        let dir = TempDir::new().unwrap();
        let log_path = dir.path().join("activity.log");
        let args = [
            "blobctl",
            "--log-file",
            log_path.to_str().unwrap(),
            "upload",
            "onlyone",
        ];

        let err = Cli::try_parse_from(args).unwrap_err();
        assert!(err.use_stderr());
        let usage = usage_error(&err);
        assert!(matches!(usage, BlobctlError::UsageError(_)));

        let fallback = fallback_log_path(&args, |_| None);
        assert_eq!(fallback, log_path);
        record_startup_failure(&fallback, &usage);

        let contents = std::fs::read_to_string(&log_path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("[ERROR] blobctl: Usage error:"));
        assert!(!lines[0].contains("error: error:"));
    }

    #[test]
    fn test_fallback_log_path_sources() {
        let env = |key: &str| (key == "BLOBCTL_LOG_FILE").then(|| "/var/log/from-env.log".to_string());

        assert_eq!(
            fallback_log_path(&["blobctl", "--log-file=/tmp/a.log", "ls"], env),
            PathBuf::from("/tmp/a.log")
        );
        assert_eq!(
            fallback_log_path(&["blobctl", "ls"], env),
            PathBuf::from("/var/log/from-env.log")
        );
        assert_eq!(
            fallback_log_path(&["blobctl", "upload", "--", "--log-file"], |_| None),
            PathBuf::from(DEFAULT_LOG_FILE)
        );
    }

    fn error_entries(activity: &MemoryActivityLog) -> usize {
        activity
            .entries()
            .iter()
            .filter(|(level, _)| *level == tracing::Level::ERROR)
            .count()
    }

    #[tokio::test]
    async fn test_provision_setup_failure_is_logged_once() {
        let activity = Arc::new(MemoryActivityLog::new());
        let cli = parse(&["provision"]).unwrap();

        // No subscription configured
        let result = cli.execute(Config::default(), activity.clone()).await;

        assert!(matches!(result, Err(BlobctlError::ConfigError(_))));
        assert_eq!(error_entries(&activity), 1);
        assert!(activity.contains(tracing::Level::ERROR, "blobctl provision failed"));
    }

    #[tokio::test]
    async fn test_blob_command_setup_failure_is_logged_once() {
        let activity = Arc::new(MemoryActivityLog::new());
        let cli = parse(&["upload", "a.txt", "a.txt"]).unwrap();

        let result = cli.execute(Config::default(), activity.clone()).await;

        assert!(matches!(result, Err(BlobctlError::ConfigError(_))));
        assert_eq!(error_entries(&activity), 1);
        assert!(activity.contains(tracing::Level::ERROR, "blobctl upload failed"));
    }

    #[tokio::test]
    async fn test_failed_upload_is_logged_once() {
        let dir = TempDir::new().unwrap();
        let storage = InMemoryStorage::new();
        let activity = Arc::new(MemoryActivityLog::new());
        let manager = BlobManager::new(
            Arc::new(storage.blob_store("vaultstore1", "files")),
            "files".to_string(),
            activity.clone(),
        );

        let result = execute_blob_command(
            &manager,
            Commands::Upload {
                local_file: dir.path().join("nope.txt"),
                blob_name: "nope.txt".to_string(),
                no_overwrite: false,
            },
            &Config::default(),
        )
        .await;

        assert!(matches!(result, Err(BlobctlError::NotFound(_))));
        assert_eq!(error_entries(&activity), 1);
    }

    #[test]
    fn test_overrides() {
        let cli = parse(&[
            "--log-file",
            "/tmp/activity.log",
            "provision",
            "--resource-group",
            "rg-cli",
            "--public-access",
            "none",
        ])
        .unwrap();
        let mut config = Config::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.resource_group, "rg-cli");
        assert_eq!(config.provision.container_public_access, PublicAccessLevel::None);
        assert_eq!(config.log_file, PathBuf::from("/tmp/activity.log"));
        assert_eq!(cli.command_name(), "provision");
    }

    #[test]
    fn test_invalid_public_access_is_usage_error() {
        let err = parse(&["provision", "--public-access", "everyone"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[tokio::test]
    async fn test_connection_string_wins() {
        let storage = InMemoryStorage::new();
        let mut config = Config::default();
        config.storage.connection_string =
            Some("DefaultEndpointsProtocol=https;AccountName=fromenv;AccountKey=a2V5;EndpointSuffix=core.windows.net".to_string());
        config.storage.account_key = Some("b3RoZXI=".to_string());

        let credential = resolve_credential(&config, in_memory(&storage)).await.unwrap();
        assert_eq!(credential.account_name().as_deref(), Some("fromenv"));
    }

    #[tokio::test]
    async fn test_account_key_with_account_name() {
        let storage = InMemoryStorage::new();
        let mut config = Config::default();
        config.storage.storage_account = "vaultstore1".to_string();
        config.storage.account_key = Some("a2V5".to_string());

        let credential = resolve_credential(&config, in_memory(&storage)).await.unwrap();
        assert!(credential.expose().contains("AccountName=vaultstore1"));
        assert!(credential.expose().contains("AccountKey=a2V5"));
    }

    #[tokio::test]
    async fn test_no_credential_is_config_error() {
        let storage = InMemoryStorage::new();
        let mut config = Config::default();
        config.storage.storage_account = "vaultstore1".to_string();

        let result = resolve_credential(&config, in_memory(&storage)).await;
        assert!(matches!(result, Err(BlobctlError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_provision_records_resources_and_fetches_keys() {
        let dir = TempDir::new().unwrap();
        let storage = InMemoryStorage::new();
        let activity = Arc::new(MemoryActivityLog::new());

        let mut config = Config::default();
        config.subscription_id = "sub".to_string();
        config.resources_file = dir.path().join("resources.env");

        let resources = provision_and_record(Arc::new(storage.clone()), &config, activity.clone())
            .await
            .unwrap();

        let recorded = ResourcesFile::load(&config.resources_file).await.unwrap().unwrap();
        assert_eq!(recorded.storage_account.as_deref(), Some(resources.storage_account.name.as_str()));
        let contents = std::fs::read_to_string(&config.resources_file).unwrap();
        assert!(!contents.contains("AccountKey"));

        // A later blob command with only the recorded identifiers lists the keys
        config.storage.storage_account = resources.storage_account.name.clone();
        assert_eq!(
            config.account_naming(),
            AccountNaming::Fixed(resources.storage_account.name.clone())
        );
        let credential = resolve_credential(&config, in_memory(&storage)).await.unwrap();
        assert_eq!(credential.expose(), resources.credential.expose());
    }

    #[tokio::test]
    async fn test_failed_provision_writes_no_resources_file() {
        let dir = TempDir::new().unwrap();
        let storage = InMemoryStorage::new();
        let activity = Arc::new(MemoryActivityLog::new());

        let mut config = Config::default();
        config.resources_file = dir.path().join("resources.env");
        config.storage.storage_account = "takenname".to_string();
        storage.reserve_account_name("takenname");

        let result = provision_and_record(Arc::new(storage), &config, activity).await;
        assert!(matches!(result, Err(BlobctlError::NameUnavailable { .. })));
        assert!(!config.resources_file.exists());
    }

    #[tokio::test]
    async fn test_blob_commands_against_memory() {
        let dir = TempDir::new().unwrap();
        let storage = InMemoryStorage::new();
        let activity = Arc::new(MemoryActivityLog::new());

        let mut config = Config::default();
        config.resources_file = dir.path().join("resources.env");
        let resources = provision_and_record(Arc::new(storage.clone()), &config, activity.clone())
            .await
            .unwrap();
        config.no_color = true;

        let manager = BlobManager::new(
            Arc::new(storage.blob_store(&resources.storage_account.name, "files")),
            "files".to_string(),
            activity.clone(),
        );

        let local = dir.path().join("a.txt");
        std::fs::write(&local, b"hello").unwrap();
        execute_blob_command(
            &manager,
            Commands::Upload {
                local_file: local,
                blob_name: "a.txt".to_string(),
                no_overwrite: false,
            },
            &config,
        )
        .await
        .unwrap();

        let target = dir.path().join("out").join("a.txt");
        execute_blob_command(
            &manager,
            Commands::Download {
                blob_name: "a.txt".to_string(),
                local_file: target.clone(),
            },
            &config,
        )
        .await
        .unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"hello");

        execute_blob_command(&manager, Commands::List { json: true }, &config)
            .await
            .unwrap();
        execute_blob_command(
            &manager,
            Commands::Delete {
                blob_name: "a.txt".to_string(),
            },
            &config,
        )
        .await
        .unwrap();
        assert!(manager.list_all().await.unwrap().is_empty());
    }
}
