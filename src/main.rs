//! blobctl - Azure Storage provisioning and blob operations
//!
//! Every invocation runs one command and exits 0 on success, 1 on failure.

use clap::Parser;
use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use blobctl::cli::{fallback_log_path, record_startup_failure, usage_error, Cli};
use blobctl::config::Config;
use blobctl::logging::{init_tracing, ActivityLog, FileActivityLog};
use blobctl::utils::format::DisplayUtils;
use blobctl::Result;

#[tokio::main]
async fn main() {
    let args: Vec<OsString> = std::env::args_os().collect();
    let fallback_log = fallback_log_path(&args, |key| std::env::var(key).ok());

    // Usage errors exit 1; --help and --version exit 0
    let cli = match Cli::try_parse_from(&args) {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            if !e.use_stderr() {
                std::process::exit(0);
            }
            record_startup_failure(&fallback_log, &usage_error(&e));
            std::process::exit(1);
        }
    };

    let no_color = cli.no_color;
    if let Err(e) = run(cli, &fallback_log).await {
        DisplayUtils::new(no_color).print_error(&format!("Error: {e}"));
        std::process::exit(1);
    }
}

async fn run(cli: Cli, fallback_log: &Path) -> Result<()> {
    let mut config = match Config::load(cli.config.as_deref()).await {
        Ok(config) => config,
        Err(e) => {
            record_startup_failure(fallback_log, &e);
            return Err(e);
        }
    };
    cli.apply_overrides(&mut config);

    init_tracing(config.debug, config.no_color);
    debug!("Loaded configuration: {:?}", config);

    let activity: Arc<dyn ActivityLog> = Arc::new(FileActivityLog::open(&config.log_file)?);
    cli.execute(config, activity).await
}
