// src/client.rs
use std::sync::Arc;

use reqwest::header::{ORIGIN, REFERER};
use reqwest::Url;
use tracing::{debug, info, warn};

use crate::classify::{Classifier, NO_PUNCH_FORM};
use crate::config::PortalConfig;
use crate::form::HiddenFormState;
use crate::types::{
    AuthFailureReason, Coordinates, Credentials, PunchOutcome, PunchReport, Stage, Trace,
};

/// Replays the portal's login and punch forms.
///
/// Holds only configuration, so one instance can serve any number of callers.
/// Every `punch` gets its own [`Session`].
#[derive(Debug, Clone)]
pub struct FormReplayClient {
    config: Arc<PortalConfig>,
    classifier: Classifier,
    login_url: Url,
    punch_url: Url,
    origin: String,
}

/// Cookie jar for one login+punch cycle. Not reusable across calls.
pub struct Session {
    http: reqwest::Client,
}

struct Page {
    url: Url,
    status: u16,
    body: String,
}

impl FormReplayClient {
    pub fn new(config: Arc<PortalConfig>) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self {
            classifier: Classifier::new(&config)?,
            login_url: config.login_url()?,
            punch_url: config.punch_url()?,
            origin: config.origin()?,
            config,
        })
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    pub async fn punch(
        &self,
        credentials: &Credentials,
        coordinates: Option<&Coordinates>,
        debug: bool,
    ) -> PunchReport {
        let mut trace = Trace::new(debug);
        let outcome = match self.authenticate(credentials, &mut trace).await {
            Ok(session) => self.submit_action(session, coordinates, &mut trace).await,
            Err(outcome) => outcome,
        };
        info!(identifier = %credentials.identifier, ?outcome, "punch finished");
        PunchReport {
            outcome,
            trace: trace.into_steps(),
        }
    }

    pub async fn authenticate(
        &self,
        credentials: &Credentials,
        trace: &mut Trace,
    ) -> Result<Session, PunchOutcome> {
        let session = self.open_session()?;
        let page = self.fetch(&session, &self.login_url, trace).await?;

        let mut form = HiddenFormState::scrape(&page.body);
        if form.is_empty() {
            warn!(url = %page.url, "login page has no inputs");
            return Err(PunchOutcome::AuthFailure {
                reason: AuthFailureReason::LoginFormMissing,
            });
        }

        debug!(fields = form.len(), "login form scraped");
        let fields = &self.config.fields;
        form.set(&fields.identifier, &credentials.identifier);
        form.set(&fields.secret, &credentials.secret);
        form.set(&fields.login_submit.0, &fields.login_submit.1);

        let resp = session
            .http
            .post(self.login_url.clone())
            .form(form.pairs())
            .send()
            .await
            .map_err(|e| fault(Stage::AuthSubmit, &e))?;

        let final_url = resp.url().clone();
        let rejected = self.classifier.login_outcome(&final_url);
        trace.record(
            Stage::AuthSubmit,
            "POST",
            final_url.as_str(),
            Some(resp.status().as_u16()),
            if rejected.is_some() {
                "redirected back to login"
            } else {
                "authenticated"
            },
        );

        match rejected {
            Some(outcome) => Err(outcome),
            None => Ok(session),
        }
    }

    /// Consumes the session: the cycle ends here whatever the outcome.
    pub async fn submit_action(
        &self,
        session: Session,
        coordinates: Option<&Coordinates>,
        trace: &mut Trace,
    ) -> PunchOutcome {
        match self.try_submit_action(&session, coordinates, trace).await {
            Ok(outcome) | Err(outcome) => outcome,
        }
    }

    async fn try_submit_action(
        &self,
        session: &Session,
        coordinates: Option<&Coordinates>,
        trace: &mut Trace,
    ) -> Result<PunchOutcome, PunchOutcome> {
        let page = self.fetch(session, &self.punch_url, trace).await?;

        let mut form = HiddenFormState::scrape(&page.body);
        if form.is_empty() {
            warn!(url = %page.url, status = page.status, "punch page has no inputs");
            return Ok(PunchOutcome::ActionRejected {
                server_message: NO_PUNCH_FORM.into(),
            });
        }

        debug!(fields = form.len(), "punch form scraped");
        let fields = &self.config.fields;
        for (name, value) in &fields.partial_update {
            form.set(name, value);
        }
        form.set(&fields.action_submit.0, &fields.action_submit.1);
        if let Some(c) = coordinates {
            form.set(&fields.longitude, &c.longitude);
            form.set(&fields.latitude, &c.latitude);
        }

        let headers = &self.config.headers;
        let resp = session
            .http
            .post(self.punch_url.clone())
            .header(headers.script_request.0.as_str(), headers.script_request.1.as_str())
            .header(headers.partial_update.0.as_str(), headers.partial_update.1.as_str())
            .header(REFERER, self.punch_url.as_str())
            .header(ORIGIN, self.origin.as_str())
            .form(form.pairs())
            .send()
            .await
            .map_err(|e| fault(Stage::ActionSubmit, &e))?;

        let status = resp.status().as_u16();
        let url = resp.url().to_string();
        let body = resp
            .text()
            .await
            .map_err(|e| fault(Stage::ActionSubmit, &e))?;

        let outcome = self.classifier.action_outcome(status, &body);
        trace.record(
            Stage::ActionSubmit,
            "POST",
            &url,
            Some(status),
            format!("{} bytes", body.len()),
        );
        Ok(outcome)
    }

    fn open_session(&self) -> Result<Session, PunchOutcome> {
        reqwest::Client::builder()
            .cookie_store(true)
            .timeout(self.config.timeout())
            .build()
            .map(|http| Session { http })
            .map_err(|e| fault(Stage::PageFetch, &e))
    }

    async fn fetch(
        &self,
        session: &Session,
        url: &Url,
        trace: &mut Trace,
    ) -> Result<Page, PunchOutcome> {
        let resp = session
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| fault(Stage::PageFetch, &e))?;

        let url = resp.url().clone();
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| fault(Stage::PageFetch, &e))?;
        trace.record(
            Stage::PageFetch,
            "GET",
            url.as_str(),
            Some(status),
            format!("{} bytes", body.len()),
        );
        Ok(Page { url, status, body })
    }
}

fn fault(stage: Stage, err: &reqwest::Error) -> PunchOutcome {
    warn!(?stage, "transport error: {err}");
    PunchOutcome::transport(err)
}
