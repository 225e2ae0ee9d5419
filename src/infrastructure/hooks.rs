use crate::domain::{ThemeId, ThemeRecord};
use anyhow::Result;
use chrono::{DateTime, Utc};

/// Context provided to render hooks
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub theme_id: ThemeId,
    pub record: ThemeRecord,
    pub applied_at: DateTime<Utc>,
}

/// Trait for collaborators that repaint the calendar when the active theme changes
pub trait RenderHook: Send + Sync {
    /// Called after the active theme record has been written to local storage
    fn on_theme_applied(&self, context: &RenderContext) -> Result<()>;

    /// Called after the active theme has been removed
    fn on_theme_cleared(&self) -> Result<()> {
        Ok(())
    }

    /// Human-readable name for this hook
    fn name(&self) -> &str;

    /// Whether this hook should be enabled by default
    fn enabled_by_default(&self) -> bool {
        true
    }
}

/// Registry for managing render hooks
pub struct HookRegistry {
    hooks: Vec<Box<dyn RenderHook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    /// Register a new render hook
    pub fn register<H>(&mut self, hook: H)
    where
        H: RenderHook + 'static,
    {
        self.hooks.push(Box::new(hook));
    }

    /// Register every hook that is on by default
    pub fn register_defaults<I>(&mut self, hooks: I)
    where
        I: IntoIterator<Item = Box<dyn RenderHook>>,
    {
        self.hooks
            .extend(hooks.into_iter().filter(|h| h.enabled_by_default()));
    }

    /// Notify all hooks of a newly applied theme
    pub fn execute_render_hooks(&self, context: &RenderContext) {
        for hook in &self.hooks {
            if let Err(e) = hook.on_theme_applied(context) {
                // a failing renderer must not block the others
                log::warn!("Hook '{}' failed: {:#}", hook.name(), e);
            }
        }
    }

    /// Notify all hooks that no theme is active anymore
    pub fn execute_clear_hooks(&self) {
        for hook in &self.hooks {
            if let Err(e) = hook.on_theme_cleared() {
                log::warn!("Hook '{}' failed: {:#}", hook.name(), e);
            }
        }
    }

    /// List all registered hooks
    pub fn list_hooks(&self) -> Vec<&str> {
        self.hooks.iter().map(|h| h.name()).collect()
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}
