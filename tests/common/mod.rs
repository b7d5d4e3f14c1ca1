#![allow(dead_code)]

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering::SeqCst},
        Arc, Mutex,
    },
    time::Duration,
};

use axum::{
    extract::State,
    http::{
        header::{COOKIE, LOCATION, SET_COOKIE},
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::get,
    Form, Router,
};
use punch_relay::{FormReplayClient, PortalConfig};
use tokio::net::TcpListener;

pub const VIEWSTATE: &str = "dDwtMTA4NzA7Oz4=";
pub const SESSION_COOKIE: &str = "ASP.NET_SessionId=abc123";

pub const LOGIN_PAGE: &str = r#"<html><body><form method="post" action="./Login.aspx">
<input type="hidden" name="__VIEWSTATE" value="dDwtMTA4NzA7Oz4=" />
<input type="hidden" name="__EVENTVALIDATION" value="/wEWBAKL" />
<input type="text" name="txtAccount" />
<input type="password" name="txtPassword" />
<input type="submit" name="btnLogin" value="登入" />
</form></body></html>"#;

pub const PUNCH_PAGE: &str = r#"<html><body><form method="post" action="./Punch.aspx">
<input type="hidden" name="__VIEWSTATE" value="cHVuY2hwYWdl" />
<input type="hidden" name="__VIEWSTATEGENERATOR" value="A1B2C3D4" />
<input type="hidden" name="hidLatitude" value="" />
<input type="hidden" name="hidLongitude" value="" />
<input type="submit" name="btnPunch" value="簽到" />
</form></body></html>"#;

/// A stand-in for the attendance portal that counts and records what it receives.
pub struct Portal {
    pub valid_secret: String,
    pub login_html: String,
    pub login_status: StatusCode,
    pub login_delay: Option<Duration>,
    pub punch_html: String,
    pub action_status: StatusCode,
    pub action_body: String,

    pub login_get: AtomicUsize,
    pub login_get_with_cookie: AtomicUsize,
    pub login_post: AtomicUsize,
    pub punch_get: AtomicUsize,
    pub punch_post: AtomicUsize,

    pub last_login_form: Mutex<Vec<(String, String)>>,
    pub last_action_form: Mutex<Vec<(String, String)>>,
    pub last_action_headers: Mutex<HeaderMap>,
}

impl Default for Portal {
    fn default() -> Self {
        Self {
            valid_secret: "right".into(),
            login_html: LOGIN_PAGE.into(),
            login_status: StatusCode::OK,
            login_delay: None,
            punch_html: PUNCH_PAGE.into(),
            action_status: StatusCode::OK,
            action_body: r#"1|#||4|96|updatePanel|UpdatePanel1|<div>簽到完成</div><span id="lb_time">08:01</span>|"#.into(),
            login_get: AtomicUsize::new(0),
            login_get_with_cookie: AtomicUsize::new(0),
            login_post: AtomicUsize::new(0),
            punch_get: AtomicUsize::new(0),
            punch_post: AtomicUsize::new(0),
            last_login_form: Mutex::new(Vec::new()),
            last_action_form: Mutex::new(Vec::new()),
            last_action_headers: Mutex::new(HeaderMap::new()),
        }
    }
}

impl Portal {
    /// Exchanges against the login and punch endpoints; redirect follow-ups
    /// to other pages are not counted.
    pub fn exchanges(&self) -> usize {
        self.login_get.load(SeqCst)
            + self.login_post.load(SeqCst)
            + self.punch_get.load(SeqCst)
            + self.punch_post.load(SeqCst)
    }

    pub fn action_field(&self, name: &str) -> Option<String> {
        field(&self.last_action_form.lock().unwrap(), name).map(str::to_string)
    }

    pub fn action_header(&self, name: &str) -> Option<String> {
        self.last_action_headers
            .lock()
            .unwrap()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }
}

pub fn field<'a>(form: &'a [(String, String)], name: &str) -> Option<&'a str> {
    form.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
}

fn has_session(headers: &HeaderMap) -> bool {
    headers
        .get(COOKIE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|c| c.contains(SESSION_COOKIE))
}

async fn login_page(State(p): State<Arc<Portal>>, headers: HeaderMap) -> Response {
    p.login_get.fetch_add(1, SeqCst);
    if headers.contains_key(COOKIE) {
        p.login_get_with_cookie.fetch_add(1, SeqCst);
    }
    if let Some(d) = p.login_delay {
        tokio::time::sleep(d).await;
    }
    (p.login_status, axum::response::Html(p.login_html.clone())).into_response()
}

async fn login_submit(
    State(p): State<Arc<Portal>>,
    Form(form): Form<Vec<(String, String)>>,
) -> Response {
    p.login_post.fetch_add(1, SeqCst);
    let ok = field(&form, "txtPassword") == Some(p.valid_secret.as_str())
        && field(&form, "__VIEWSTATE") == Some(VIEWSTATE);
    *p.last_login_form.lock().unwrap() = form;

    if ok {
        (
            StatusCode::FOUND,
            [
                (LOCATION, "/Default.aspx".to_string()),
                (SET_COOKIE, format!("{SESSION_COOKIE}; Path=/")),
            ],
        )
            .into_response()
    } else {
        (StatusCode::FOUND, [(LOCATION, "/Login.aspx")]).into_response()
    }
}

async fn home() -> &'static str {
    "welcome"
}

async fn punch_page(State(p): State<Arc<Portal>>, headers: HeaderMap) -> Response {
    p.punch_get.fetch_add(1, SeqCst);
    if !has_session(&headers) {
        return axum::response::Html("<html><body>Please log in</body></html>").into_response();
    }
    axum::response::Html(p.punch_html.clone()).into_response()
}

async fn punch_submit(
    State(p): State<Arc<Portal>>,
    headers: HeaderMap,
    Form(form): Form<Vec<(String, String)>>,
) -> Response {
    p.punch_post.fetch_add(1, SeqCst);
    let authed = has_session(&headers);
    *p.last_action_form.lock().unwrap() = form;
    *p.last_action_headers.lock().unwrap() = headers;

    if !authed {
        return (StatusCode::OK, "0|asyncPostBackError||1|pageRedirect||%2fLogin.aspx|").into_response();
    }
    (p.action_status, p.action_body.clone()).into_response()
}

pub async fn spawn_portal(portal: Arc<Portal>) -> String {
    let app = Router::new()
        .route("/Login.aspx", get(login_page).post(login_submit))
        .route("/Default.aspx", get(home))
        .route("/Punch.aspx", get(punch_page).post(punch_submit))
        .with_state(portal);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

pub async fn client_for(portal: Portal) -> (Arc<Portal>, FormReplayClient) {
    let portal = Arc::new(portal);
    let base = spawn_portal(portal.clone()).await;
    let client = FormReplayClient::new(Arc::new(PortalConfig::with_base_url(base))).unwrap();
    (portal, client)
}
