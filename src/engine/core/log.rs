use anyhow::Result;
use chrono::Local;
use std::io::Write;

/// Write debug log to vidscale.log in current directory
/// Appends to file, creating it if needed
///
/// The TUI owns the terminal, so stderr tracing output would corrupt the
/// screen; dashboard sessions log here instead.
pub fn write_debug_log(message: &str) -> Result<()> {
    use std::fs::OpenOptions;

    let log_path = std::env::current_dir()?.join("vidscale.log");
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;

    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    writeln!(file, "[{}] {}", timestamp, message)?;
    Ok(())
}
