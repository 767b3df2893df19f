//! Request dispatch: one handler per (method, path), behind the session gate.

use std::collections::HashMap;

use spin_sdk::http::{Request, Response};
use tracing::{debug, error};

use crate::config::FLASH_COOKIE;
use crate::core::errors::ApiError;
use crate::core::query_params::{parse_form, parse_query_params};
use crate::core::session::{build_delete_cookie, read_flash, redirect_with_flash, resolve_session};
use crate::core::static_server::serve_static;
use crate::core::store::KvStore;
use crate::models::models::User;
use crate::templates::render_layout;
use crate::users::touch_last_seen;
use crate::{auth, follow, posts, users};

/// Everything a handler needs about the current request.
pub struct RequestContext<'a> {
    pub store: &'a dyn KvStore,
    pub req: &'a Request,
    pub method: String,
    pub current_user: Option<User>,
    pub session_token: Option<String>,
    pub flash: Option<String>,
    pub query: HashMap<String, String>,
}

impl<'a> RequestContext<'a> {
    /// Resolve the session and, for a signed-in user, stamp `last_seen`.
    pub fn new(store: &'a dyn KvStore, req: &'a Request) -> anyhow::Result<Self> {
        let (session_token, current_user) = match resolve_session(store, req)? {
            Some((token, mut user)) => {
                touch_last_seen(store, &mut user)?;
                (Some(token), Some(user))
            }
            None => (None, None),
        };

        Ok(RequestContext {
            store,
            req,
            method: req.method().to_string().to_uppercase(),
            current_user,
            session_token,
            flash: read_flash(req),
            query: parse_query_params(req.uri()),
        })
    }

    pub fn is_post(&self) -> bool {
        self.method == "POST"
    }

    pub fn form(&self) -> HashMap<String, String> {
        parse_form(self.req.body())
    }

    /// Render `content` inside the layout. A pending flash notice is shown
    /// once and its cookie expired.
    pub fn page(&self, title: &str, content: &str) -> Response {
        let html = render_layout(title, self.current_user.as_ref(), self.flash.as_deref(), content);

        let mut builder = Response::builder();
        builder
            .status(200)
            .header("content-type", "text/html; charset=utf-8");
        if self.flash.is_some() {
            builder.header("set-cookie", build_delete_cookie(FLASH_COOKIE));
        }
        builder.body(html.into_bytes()).build()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Route {
    Index,
    Explore,
    Login,
    Logout,
    Register,
    EditProfile,
    Profile(String),
    Follow(String),
    Unfollow(String),
}

impl Route {
    fn parse(path: &str) -> Option<Route> {
        let route = match path {
            "/" | "/index" => Route::Index,
            "/explore" => Route::Explore,
            "/login" => Route::Login,
            "/logout" => Route::Logout,
            "/register" => Route::Register,
            "/edit_profile" => Route::EditProfile,
            p => {
                let (prefix, rest) = p.trim_start_matches('/').split_once('/')?;
                if rest.is_empty() || rest.contains('/') {
                    return None;
                }
                let name = urlencoding::decode(rest).ok()?.into_owned();
                match prefix {
                    "user" => Route::Profile(name),
                    "follow" => Route::Follow(name),
                    "unfollow" => Route::Unfollow(name),
                    _ => return None,
                }
            }
        };
        Some(route)
    }

    fn allows(&self, method: &str) -> bool {
        match self {
            Route::Index | Route::Login | Route::Register | Route::EditProfile => {
                matches!(method, "GET" | "POST")
            }
            _ => method == "GET",
        }
    }

    fn requires_login(&self) -> bool {
        !matches!(self, Route::Login | Route::Logout | Route::Register)
    }
}

/// Path plus query string, with any scheme and authority removed.
fn path_and_query(req: &Request) -> String {
    let uri = req.uri();
    let local = match uri.find("://") {
        Some(i) => {
            let after = &uri[i + 3..];
            after.find('/').map(|j| &after[j..]).unwrap_or("/")
        }
        None => uri,
    };
    if local.is_empty() {
        "/".to_string()
    } else {
        local.to_string()
    }
}

fn login_required(req: &Request) -> Response {
    let next = path_and_query(req);
    redirect_with_flash(
        &format!("/login?next={}", urlencoding::encode(&next)),
        "Please log in to access this page.",
    )
}

fn route(store: &dyn KvStore, req: &Request, method: &str, path: &str) -> anyhow::Result<Response> {
    // The session gate runs for every request, including assets and misses.
    let ctx = RequestContext::new(store, req)?;

    if path.starts_with("/static/") {
        return match method {
            "GET" => serve_static(path),
            _ => Ok(ApiError::MethodNotAllowed.into()),
        };
    }

    let route = match Route::parse(path) {
        Some(r) => r,
        None => return Ok(ApiError::NotFound("Page not found.".to_string()).into()),
    };
    if !route.allows(method) {
        return Ok(ApiError::MethodNotAllowed.into());
    }

    let me = match (&ctx.current_user, route.requires_login()) {
        (Some(user), _) => user,
        (None, true) => return Ok(login_required(req)),
        (None, false) => {
            return match route {
                Route::Login => auth::login(&ctx),
                Route::Logout => auth::logout(&ctx),
                Route::Register => auth::register(&ctx),
                _ => Ok(login_required(req)),
            };
        }
    };

    match &route {
        Route::Index => posts::index(&ctx, me),
        Route::Explore => posts::explore(&ctx, me),
        Route::Login => auth::login(&ctx),
        Route::Logout => auth::logout(&ctx),
        Route::Register => auth::register(&ctx),
        Route::EditProfile => users::edit_profile(&ctx, me),
        Route::Profile(name) => users::profile(&ctx, me, name),
        Route::Follow(name) => follow::follow(&ctx, me, name),
        Route::Unfollow(name) => follow::unfollow(&ctx, me, name),
    }
}

/// Handle one request to completion. Handler errors are logged and
/// rendered as a generic 500 page.
pub fn dispatch(store: &dyn KvStore, req: &Request) -> Response {
    let method = req.method().to_string().to_uppercase();
    let path = req.path().to_string();
    debug!(%method, %path, "dispatch");

    match route(store, req, &method, &path) {
        Ok(resp) => resp,
        Err(err) => {
            error!(error = ?err, %method, %path, "request failed");
            ApiError::from(err).into()
        }
    }
}
