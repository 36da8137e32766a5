use env_logger::{Builder, Env, WriteStyle};
use log::{error, info, warn};
use std::fs::OpenOptions;
use std::path::Path;

/// Initialize the logging system, appending to the given log file.
///
/// The level comes from `RUST_LOG` when set and defaults to `info`.
pub fn initialize_logging(log_file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    // Create the parent directory so a fresh checkout can log immediately
    if let Some(parent) = log_file.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)?;

    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .format_module_path(true)
        .write_style(WriteStyle::Never)
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init()?;

    info!("Logging system initialized");
    Ok(())
}

/// Mask an identifier so logs never carry a full username or email
pub fn format_sensitive(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}***{}", head, tail)
}

/// Structured logging for registration and confirmation events
pub fn log_registration_event(event_type: &str, user: &str, success: bool, details: Option<&str>) {
    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    if success {
        info!(
            "Registration event: type={}, user={}, success=true, timestamp={}, details={:?}",
            event_type,
            format_sensitive(user),
            timestamp,
            details
        );
    } else {
        warn!(
            "Registration event: type={}, user={}, success=false, timestamp={}, details={:?}",
            event_type,
            format_sensitive(user),
            timestamp,
            details
        );
    }
}

/// Structured logging for store and repository operations
pub fn log_data_operation(
    operation: &str,
    user: &str,
    resource: &str,
    success: bool,
    details: Option<&str>,
) {
    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    if success {
        info!(
            "Data operation: op={}, user={}, resource={}, success=true, timestamp={}, details={:?}",
            operation,
            format_sensitive(user),
            resource,
            timestamp,
            details
        );
    } else {
        error!(
            "Data operation: op={}, user={}, resource={}, success=false, timestamp={}, details={:?}",
            operation,
            format_sensitive(user),
            resource,
            timestamp,
            details
        );
    }
}
