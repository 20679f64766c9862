//! Configuration for every controller.
//!
//! Each section has documented defaults and every field may be omitted, so
//! an empty document yields [`CelestiaConfig::default`].
//!
//! ```rust
//! use celestia::config::CelestiaConfig;
//!
//! let config = CelestiaConfig::from_toml(r#"
//! [theme]
//! storage_key = "my-app-theme"
//!
//! [toast]
//! duration_ms = 2500
//! "#).unwrap();
//!
//! assert_eq!(config.theme.storage_key, "my-app-theme");
//! assert_eq!(config.theme.dark_theme, "celestia-dark");
//! assert_eq!(config.toast.duration_ms, 2500);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::theme::SYSTEM_ID;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CelestiaConfig {
    pub theme: ThemeConfig,
    pub validation: ValidationConfig,
    pub toast: ToastConfig,
    pub modal: ModalConfig,
    pub chat_panel: ChatPanelConfig,
    pub navbar: NavbarConfig,
}

impl CelestiaConfig {
    /// Load configuration from JSON text.
    ///
    /// # Errors
    /// Returns `ConfigError` if parsing or validation fails.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML text.
    ///
    /// # Errors
    /// Returns `ConfigError` if parsing or validation fails.
    pub fn from_toml(toml: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON.
    ///
    /// # Errors
    /// Returns `ConfigError::Json` if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check cross-field constraints serde cannot express.
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` describing the first violation.
    pub fn validate(&self) -> Result<()> {
        let theme = &self.theme;
        if theme.storage_key.is_empty() {
            return Err(ConfigError::invalid("theme.storage_key must not be empty"));
        }
        if theme.attribute.is_empty() {
            return Err(ConfigError::invalid("theme.attribute must not be empty"));
        }
        for id in [&theme.light_theme, &theme.dark_theme] {
            if id.is_empty() || id == SYSTEM_ID {
                return Err(ConfigError::invalid(format!(
                    "theme id {id:?} must be non-empty and not {SYSTEM_ID:?}"
                )));
            }
        }
        if theme.light_theme == theme.dark_theme {
            return Err(ConfigError::invalid(
                "theme.light_theme and theme.dark_theme must differ",
            ));
        }
        if self.chat_panel.breakpoint <= 0.0 {
            return Err(ConfigError::invalid("chat_panel.breakpoint must be positive"));
        }
        Ok(())
    }
}

/// Theme persistence and rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    /// Storage key holding the preference. Default `__CELESTIA_THEME__`.
    pub storage_key: String,
    /// Identifier written for the light theme. Default `celestia-light`.
    pub light_theme: String,
    /// Identifier written for the dark theme. Default `celestia-dark`.
    pub dark_theme: String,
    /// Document-element attribute carrying the effective theme. Default `data-theme`.
    pub attribute: String,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            storage_key: "__CELESTIA_THEME__".into(),
            light_theme: "celestia-light".into(),
            dark_theme: "celestia-dark".into(),
            attribute: "data-theme".into(),
        }
    }
}

/// Field validation patterns and messages.
///
/// `min_length_message` may contain `{min}`, replaced by the declared length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub email_pattern: String,
    pub email_message: String,
    pub min_length_message: String,
    pub match_message: String,
    pub required_message: String,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            email_pattern: r"^[^\s@]+@[^\s@]+\.[^\s@]+$".into(),
            email_message: "Please enter a valid email address".into(),
            min_length_message: "At least {min} characters required".into(),
            match_message: "The two entries do not match".into(),
            required_message: "This field is required".into(),
        }
    }
}

/// Toast placement and timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToastConfig {
    /// Position classes added to the container. Default `toast-end toast-bottom`.
    pub position: String,
    /// Auto-dismiss delay. `0` keeps toasts until dismissed. Default 4000.
    pub duration_ms: u64,
    /// Fallback removal delay after the exit animation starts. Default 300.
    pub exit_ms: u64,
}

impl Default for ToastConfig {
    fn default() -> Self {
        Self {
            position: "toast-end toast-bottom".into(),
            duration_ms: 4000,
            exit_ms: 300,
        }
    }
}

/// Modal dismissal behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModalConfig {
    /// Close when the backdrop itself is clicked. Default `true`.
    pub close_on_backdrop: bool,
    /// Close the first open modal on Escape. Default `true`.
    pub close_on_escape: bool,
    /// Delay before a generated confirm/alert dialog is removed after
    /// closing. Default 300.
    pub removal_delay_ms: u64,
}

impl Default for ModalConfig {
    fn default() -> Self {
        Self {
            close_on_backdrop: true,
            close_on_escape: true,
            removal_delay_ms: 300,
        }
    }
}

/// Chat sidebar panels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatPanelConfig {
    /// Breakpoint used when a panel declares none. Default 1024.
    pub breakpoint: f64,
    /// Quiet period after the last resize before panels reset. Default 150.
    pub resize_debounce_ms: u64,
}

impl Default for ChatPanelConfig {
    fn default() -> Self {
        Self {
            breakpoint: 1024.0,
            resize_debounce_ms: 150,
        }
    }
}

/// Navbar scroll state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavbarConfig {
    /// Scroll offset below which the page counts as at the top. Default 10.
    pub threshold: f64,
}

impl Default for NavbarConfig {
    fn default() -> Self {
        Self { threshold: 10.0 }
    }
}
