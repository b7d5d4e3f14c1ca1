// src/config.rs
use std::time::Duration;

use anyhow::Context;
use reqwest::Url;
use serde::Deserialize;

pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const MAX_TIMEOUT_MS: u64 = 300_000;

/// Everything vendor-specific about the attendance portal.
///
/// Field names and markers belong to one vendor's form and can change without
/// notice, so none of them are baked into the client.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    pub base_url: String,
    pub login_path: String,
    pub punch_path: String,
    pub timeout_ms: u64,
    pub fields: FormFields,
    pub markers: Markers,
    pub headers: AjaxHeaders,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FormFields {
    pub identifier: String,
    pub secret: String,
    pub login_submit: (String, String),
    pub action_submit: (String, String),
    pub latitude: String,
    pub longitude: String,
    /// Fields that turn the punch POST into an in-page partial update.
    pub partial_update: Vec<(String, String)>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Markers {
    pub completion: String,
    pub page_redirect: String,
    /// Element id whose text holds the punch time, e.g. `lb_time">08:01<`.
    pub timestamp_label: String,
    pub return_url_param: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AjaxHeaders {
    pub script_request: (String, String),
    pub partial_update: (String, String),
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            login_path: "/Login.aspx".into(),
            punch_path: "/Punch.aspx".into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            fields: FormFields::default(),
            markers: Markers::default(),
            headers: AjaxHeaders::default(),
        }
    }
}

impl Default for FormFields {
    fn default() -> Self {
        Self {
            identifier: "txtAccount".into(),
            secret: "txtPassword".into(),
            login_submit: ("btnLogin".into(), "Login".into()),
            action_submit: ("btnPunch".into(), "簽到".into()),
            latitude: "hidLatitude".into(),
            longitude: "hidLongitude".into(),
            partial_update: vec![
                ("ScriptManager1".into(), "UpdatePanel1|btnPunch".into()),
                ("__EVENTTARGET".into(), String::new()),
                ("__EVENTARGUMENT".into(), String::new()),
                ("__ASYNCPOST".into(), "true".into()),
            ],
        }
    }
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            completion: "簽到完成".into(),
            page_redirect: "pageRedirect".into(),
            timestamp_label: "lb_time".into(),
            return_url_param: "ReturnUrl".into(),
        }
    }
}

impl Default for AjaxHeaders {
    fn default() -> Self {
        Self {
            script_request: ("X-Requested-With".into(), "XMLHttpRequest".into()),
            partial_update: ("X-MicrosoftAjax".into(), "Delta=true".into()),
        }
    }
}

impl PortalConfig {
    /// Profile file first (if `PORTAL_PROFILE` is set), then individual env overrides.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var("PORTAL_PROFILE") {
            Ok(path) => Self::from_profile(&path)?,
            Err(_) => Self::default(),
        };

        if let Ok(base) = std::env::var("PORTAL_BASE_URL") {
            cfg.base_url = base;
        }
        if let Ok(p) = std::env::var("PORTAL_LOGIN_PATH") {
            cfg.login_path = p;
        }
        if let Ok(p) = std::env::var("PORTAL_PUNCH_PATH") {
            cfg.punch_path = p;
        }
        cfg.timeout_ms = std::env::var("PORTAL_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(cfg.timeout_ms);

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_profile(path: &str) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading portal profile {path}"))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing portal profile {path}"))
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.base_url.is_empty() {
            anyhow::bail!("PORTAL_BASE_URL is required");
        }
        if !(1..=MAX_TIMEOUT_MS).contains(&self.timeout_ms) {
            anyhow::bail!(
                "PORTAL_TIMEOUT_MS must be between 1 and {MAX_TIMEOUT_MS}, got {}",
                self.timeout_ms
            );
        }
        self.base()?;
        self.login_url()?;
        self.punch_url()?;
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn base(&self) -> anyhow::Result<Url> {
        Url::parse(&self.base_url).with_context(|| format!("invalid base url {}", self.base_url))
    }

    pub fn login_url(&self) -> anyhow::Result<Url> {
        Ok(self.base()?.join(&self.login_path)?)
    }

    pub fn punch_url(&self) -> anyhow::Result<Url> {
        Ok(self.base()?.join(&self.punch_path)?)
    }

    /// Value for the `Origin` header: scheme, host and port of the portal.
    pub fn origin(&self) -> anyhow::Result<String> {
        Ok(self.base()?.origin().ascii_serialization())
    }
}
