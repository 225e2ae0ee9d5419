use crate::infrastructure::{RenderContext, RenderHook};
use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

/// Appends a line to a log file every time a theme is applied or cleared
pub struct ActivityLogHook {
    log_path: PathBuf,
}

impl ActivityLogHook {
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
        }
    }

    fn append(&self, line: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .with_context(|| format!("Failed to open {}", self.log_path.display()))?;

        writeln!(file, "{}", line)?;
        Ok(())
    }
}

impl RenderHook for ActivityLogHook {
    fn on_theme_applied(&self, context: &RenderContext) -> Result<()> {
        self.append(&format!(
            "[{}] Theme applied: #{} {:?} ({})",
            context.applied_at.format("%Y-%m-%d %H:%M:%S UTC"),
            context.theme_id,
            context.record.name.as_deref().unwrap_or_default(),
            context.record.kind.as_deref().unwrap_or("unknown"),
        ))
    }

    fn on_theme_cleared(&self) -> Result<()> {
        self.append(&format!(
            "[{}] Theme cleared",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
        ))
    }

    fn name(&self) -> &str {
        "Activity Log"
    }
}
