// src/classify.rs
//! Text heuristics that turn raw portal replies into outcomes.
//!
//! The portal has no structured response format: success, redirect-to-login and
//! error text are all found by substring search over markup. This is fragile and
//! kept in one place so a stricter parser can replace it.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;

use crate::config::PortalConfig;
use crate::types::{AuthFailureReason, PunchOutcome};

pub const SESSION_EXPIRED: &str = "session expired, please log in again";
pub const NO_PUNCH_FORM: &str = "session expired or insufficient permission";

static HAN_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\p{Han}+").unwrap());

#[derive(Debug, Clone)]
pub struct Classifier {
    login_path: String,
    return_url_param: String,
    completion: String,
    page_redirect: String,
    timestamp: Regex,
}

impl Classifier {
    pub fn new(cfg: &PortalConfig) -> anyhow::Result<Self> {
        let label = regex::escape(&cfg.markers.timestamp_label);
        // label must close its quoted attribute; only further attributes may follow
        let timestamp = Regex::new(&format!(
            r#"{label}"(?:\s+[^\s=>]+(?:="[^"]*")?)*\s*>\s*([^<]*?)\s*<"#
        ))?;
        Ok(Self {
            login_path: cfg.login_url()?.path().to_string(),
            return_url_param: cfg.markers.return_url_param.clone(),
            completion: cfg.markers.completion.clone(),
            page_redirect: cfg.markers.page_redirect.clone(),
            timestamp,
        })
    }

    /// Landing back on the login page without a return URL means the
    /// credentials were refused, whatever the status code says.
    pub fn login_outcome(&self, final_url: &Url) -> Option<PunchOutcome> {
        let on_login_page = final_url.path().eq_ignore_ascii_case(&self.login_path);
        let has_return_url = final_url
            .query_pairs()
            .any(|(k, _)| k.eq_ignore_ascii_case(&self.return_url_param));

        (on_login_page && !has_return_url).then_some(PunchOutcome::AuthFailure {
            reason: AuthFailureReason::RejectedCredentials,
        })
    }

    pub fn action_outcome(&self, status: u16, body: &str) -> PunchOutcome {
        if body.contains(&self.completion) {
            return PunchOutcome::Success {
                timestamp: self.timestamp(body),
            };
        }
        if body.contains(&self.page_redirect) {
            return PunchOutcome::ActionRejected {
                server_message: SESSION_EXPIRED.into(),
            };
        }

        let text = han_text(body);
        let server_message = if text.is_empty() {
            format!("unknown state (HTTP {status})")
        } else {
            text
        };
        PunchOutcome::ActionRejected { server_message }
    }

    fn timestamp(&self, body: &str) -> Option<String> {
        self.timestamp
            .captures(body)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .filter(|s| !s.is_empty())
    }
}

/// Every contiguous Han run in `body`, space separated.
pub fn han_text(body: &str) -> String {
    HAN_RUN
        .find_iter(body)
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
