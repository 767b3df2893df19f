//! Cookie-backed sessions and one-shot flash notices.

use spin_sdk::http::{Request, Response};
use tracing::debug;
use uuid::Uuid;

use crate::config::*;
use crate::core::helpers::{now, validate_uuid};
use crate::core::store::{JsonStore, KvStore};
use crate::models::models::{SessionData, User};

/// Extract a cookie value from the request's `Cookie` header
pub fn extract_cookie(req: &Request, name: &str) -> Option<String> {
    req.header("cookie")?
        .as_str()?
        .split(';')
        .find_map(|cookie| {
            let (key, value) = cookie.trim().split_once('=')?;
            if key == name {
                Some(value.to_string())
            } else {
                None
            }
        })
}

pub fn build_set_cookie(name: &str, value: &str, max_age_secs: Option<i64>) -> String {
    let mut cookie = format!("{}={}; HttpOnly; SameSite=Lax; Path=/", name, value);
    if secure_cookies() {
        cookie.push_str("; Secure");
    }
    if let Some(max_age) = max_age_secs {
        cookie.push_str(&format!("; Max-Age={}", max_age));
    }
    cookie
}

pub fn build_delete_cookie(name: &str) -> String {
    format!("{}=; HttpOnly; Path=/; Max-Age=0", name)
}

/// Store a fresh session for `user_id` and return its token.
pub fn create_session(store: &dyn KvStore, user_id: &str, remember: bool) -> anyhow::Result<String> {
    let token = Uuid::new_v4().to_string();
    let data = SessionData {
        user_id: user_id.to_string(),
        created_at: now(),
        remember,
    };
    store.set_json(&session_key(&token), &data)?;
    Ok(token)
}

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Cookie lifetime for remember-me sessions, saturating on absurd settings.
fn remember_max_age_secs(days: i64) -> i64 {
    days.max(0).saturating_mul(SECONDS_PER_DAY)
}

pub fn session_cookie(token: &str, remember: bool) -> String {
    let max_age = remember.then(|| remember_max_age_secs(remember_days()));
    build_set_cookie(SESSION_COOKIE, token, max_age)
}

/// Resolve the request's session cookie to a live user.
///
/// Expired sessions are deleted; sessions pointing at a missing user are
/// treated as anonymous.
pub fn resolve_session(store: &dyn KvStore, req: &Request) -> anyhow::Result<Option<(String, User)>> {
    let token = match extract_cookie(req, SESSION_COOKIE) {
        Some(t) if validate_uuid(&t) => t,
        _ => return Ok(None),
    };

    let key = session_key(&token);
    let data = match store.get_json::<SessionData>(&key)? {
        Some(d) => d,
        None => return Ok(None),
    };

    let max_age_hours = if data.remember {
        remember_days().saturating_mul(24)
    } else {
        token_expiration_hours()
    };
    if (now() - data.created_at).num_hours() >= max_age_hours {
        debug!(user_id = %data.user_id, "session expired");
        store.delete(&key)?;
        return Ok(None);
    }

    let user = store.get_json::<User>(&user_key(&data.user_id))?;
    Ok(user.map(|u| (token, u)))
}

pub fn destroy_session(store: &dyn KvStore, token: &str) -> anyhow::Result<()> {
    store.delete(&session_key(token))
}

pub fn read_flash(req: &Request) -> Option<String> {
    let raw = extract_cookie(req, FLASH_COOKIE)?;
    let decoded = urlencoding::decode(&raw).ok()?.into_owned();
    (!decoded.is_empty()).then_some(decoded)
}

pub fn flash_cookie(message: &str) -> String {
    build_set_cookie(FLASH_COOKIE, &urlencoding::encode(message), None)
}

pub fn redirect_with_flash(location: &str, message: &str) -> Response {
    Response::builder()
        .status(302)
        .header("location", location)
        .header("set-cookie", flash_cookie(message))
        .build()
}
