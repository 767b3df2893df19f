use spin_sdk::http::Response;
use tracing::{info, warn};

use crate::config::*;
use crate::core::helpers::{is_safe_redirect, redirect, verify_password};
use crate::core::session::{build_delete_cookie, create_session, destroy_session, redirect_with_flash, session_cookie};
use crate::forms::{FormErrors, LoginForm, RegistrationForm};
use crate::router::RequestContext;
use crate::templates::{render_login, render_register};
use crate::users::{create_user, find_user_by_username};

const INVALID_CREDENTIALS: &str = "Invalid username or password";

pub fn login(ctx: &RequestContext<'_>) -> anyhow::Result<Response> {
    if ctx.current_user.is_some() {
        return Ok(redirect("/index"));
    }

    let next = ctx.query.get("next").map(String::as_str).filter(|n| !n.is_empty());

    if !ctx.is_post() {
        let content = render_login(&LoginForm::default(), &FormErrors::default(), next);
        return Ok(ctx.page("Sign In", &content));
    }

    let form = LoginForm::from_params(&ctx.form());
    let errors = form.validate();
    if !errors.is_empty() {
        return Ok(ctx.page("Sign In", &render_login(&form, &errors, next)));
    }

    // Unknown user and wrong password share one message.
    let user = match find_user_by_username(ctx.store, &form.username)? {
        Some(u) if verify_password(&form.password, &u.password) => u,
        _ => {
            warn!(username = %form.username, "rejected login");
            return Ok(redirect_with_flash("/login", INVALID_CREDENTIALS));
        }
    };

    let token = create_session(ctx.store, &user.id, form.remember_me)?;
    info!(user_id = %user.id, remember = form.remember_me, "user logged in");

    let target = next.filter(|n| is_safe_redirect(n)).unwrap_or("/index");

    Ok(Response::builder()
        .status(302)
        .header("location", target)
        .header("set-cookie", session_cookie(&token, form.remember_me))
        .build())
}

pub fn logout(ctx: &RequestContext<'_>) -> anyhow::Result<Response> {
    if let Some(token) = ctx.session_token.as_deref() {
        destroy_session(ctx.store, token)?;
    }
    if let Some(user) = ctx.current_user.as_ref() {
        info!(user_id = %user.id, "user logged out");
    }

    Ok(Response::builder()
        .status(302)
        .header("location", "/index")
        .header("set-cookie", build_delete_cookie(SESSION_COOKIE))
        .build())
}

pub fn register(ctx: &RequestContext<'_>) -> anyhow::Result<Response> {
    if ctx.current_user.is_some() {
        return Ok(redirect("/index"));
    }

    if !ctx.is_post() {
        let content = render_register(&RegistrationForm::default(), &FormErrors::default());
        return Ok(ctx.page("Register", &content));
    }

    let form = RegistrationForm::from_params(&ctx.form());
    let errors = form.validate(ctx.store)?;
    if !errors.is_empty() {
        return Ok(ctx.page("Register", &render_register(&form, &errors)));
    }

    let user = create_user(ctx.store, &form.username, &form.phone, &form.password)?;
    info!(user_id = %user.id, username = %user.username, "user registered");

    Ok(redirect_with_flash(
        "/login",
        "Congratulations, you are now a registered user!",
    ))
}
