use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use spin_sdk::http::Response;
use uuid::Uuid;

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

pub fn validate_uuid(id: &str) -> bool {
    Uuid::parse_str(id).is_ok()
}

/// Only same-site paths are accepted as post-login targets: a single
/// leading slash, no scheme, no authority.
///
/// Browsers drop tabs and newlines from URLs, so `/\t/host` would become
/// `//host`. Any control or whitespace character rejects the target.
pub fn is_safe_redirect(target: &str) -> bool {
    if target.chars().any(|c| c.is_control() || c.is_whitespace()) {
        return false;
    }
    if !target.starts_with('/') {
        return false;
    }
    let rest = &target[1..];
    !(rest.starts_with('/') || rest.starts_with('\\') || target.contains("://"))
}

pub fn redirect(location: &str) -> Response {
    Response::builder()
        .status(302)
        .header("location", location)
        .build()
}

pub fn html_response(status: u16, html: String) -> Response {
    Response::builder()
        .status(status)
        .header("content-type", "text/html; charset=utf-8")
        .body(html.into_bytes())
        .build()
}
