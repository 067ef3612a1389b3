use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::errors::{AppError, AppResult};

const OUTPUT_DELIMITER: &str = "ghadelimiter_cypress_slack_notifier";

/// Escape annotation data the same way the Actions toolkit does
pub fn escape_data(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Workflow command that marks the job as failed with `message`
pub fn error_annotation(message: &str) -> String {
    format!("::error::{}", escape_data(message))
}

/// Set a step output when running under a runner that provides `GITHUB_OUTPUT`
pub fn set_output(name: &str, value: &str) -> AppResult<()> {
    match std::env::var_os("GITHUB_OUTPUT") {
        Some(path) if !path.is_empty() => write_output(Path::new(&path), name, value),
        _ => {
            log::debug!("GITHUB_OUTPUT not set, skipping output {}", name);
            Ok(())
        }
    }
}

pub fn write_output(path: &Path, name: &str, value: &str) -> AppResult<()> {
    if value.contains(OUTPUT_DELIMITER) {
        return Err(AppError::validation(
            name,
            "Output value contains the output delimiter",
        ));
    }

    let entry = if value.contains('\n') || value.contains('\r') {
        format!(
            "{}<<{}\n{}\n{}\n",
            name, OUTPUT_DELIMITER, value, OUTPUT_DELIMITER
        )
    } else {
        format!("{}={}\n", name, value)
    };

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(entry.as_bytes())?;
    Ok(())
}
