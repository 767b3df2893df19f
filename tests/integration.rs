use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use microblog::config::user_key;
use microblog::core::store::{JsonStore, MemoryStore};
use microblog::router::dispatch;
use microblog::users::find_user_by_username;
use spin_sdk::http::{Method, Request, Response};

/// Cookie-keeping browser stand-in that drives the dispatcher in-process.
struct Browser<'a> {
    store: &'a MemoryStore,
    cookies: HashMap<String, String>,
}

impl<'a> Browser<'a> {
    fn new(store: &'a MemoryStore) -> Self {
        Browser {
            store,
            cookies: HashMap::new(),
        }
    }

    fn send(&mut self, method: Method, uri: &str, form: Option<&[(&str, &str)]>) -> Response {
        let mut builder = Request::builder();
        builder.method(method).uri(uri);

        if !self.cookies.is_empty() {
            let header = self
                .cookies
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("; ");
            builder.header("cookie", header);
        }

        if let Some(fields) = form {
            let body = fields
                .iter()
                .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
                .collect::<Vec<_>>()
                .join("&");
            builder.header("content-type", "application/x-www-form-urlencoded");
            builder.body(body.into_bytes());
        }

        let resp = dispatch(self.store, &builder.build());
        self.absorb_cookie(&resp);
        resp
    }

    fn absorb_cookie(&mut self, resp: &Response) {
        let raw = match resp.header("set-cookie").and_then(|h| h.as_str()) {
            Some(raw) => raw.to_string(),
            None => return,
        };
        let pair = raw.split(';').next().unwrap_or_default();
        let (name, value) = pair.split_once('=').unwrap();
        if raw.contains("Max-Age=0") || value.is_empty() {
            self.cookies.remove(name);
        } else {
            self.cookies.insert(name.to_string(), value.to_string());
        }
    }

    fn get(&mut self, uri: &str) -> Response {
        self.send(Method::Get, uri, None)
    }

    fn post(&mut self, uri: &str, form: &[(&str, &str)]) -> Response {
        self.send(Method::Post, uri, Some(form))
    }

    fn register(&mut self, username: &str, password: &str) {
        let resp = self.post(
            "/register",
            &[
                ("username", username),
                ("phone", "5550100"),
                ("password", password),
                ("password2", password),
            ],
        );
        assert_eq!(*resp.status(), 302, "registration of {} failed", username);
        assert_eq!(location(&resp), "/login");
    }

    fn login(&mut self, username: &str, password: &str) -> Response {
        self.post("/login", &[("username", username), ("password", password)])
    }

    fn signed_up(store: &'a MemoryStore, username: &str) -> Self {
        let mut browser = Browser::new(store);
        browser.register(username, "pw123");
        let resp = browser.login(username, "pw123");
        assert_eq!(location(&resp), "/index");
        browser
    }

    fn flash(&self) -> Option<String> {
        self.cookies
            .get("flash")
            .map(|v| urlencoding::decode(v).unwrap().into_owned())
    }
}

fn location(resp: &Response) -> String {
    resp.header("location")
        .and_then(|h| h.as_str())
        .unwrap_or_default()
        .to_string()
}

fn body(resp: &Response) -> String {
    String::from_utf8(resp.body().to_vec()).unwrap()
}

fn last_seen(store: &MemoryStore, username: &str) -> DateTime<Utc> {
    find_user_by_username(store, username).unwrap().unwrap().last_seen
}

/// Push the stored `last_seen` a month into the past and return it.
fn backdate_last_seen(store: &MemoryStore, username: &str) -> DateTime<Utc> {
    let mut user = find_user_by_username(store, username).unwrap().unwrap();
    user.last_seen = Utc::now() - Duration::days(30);
    store.set_json(&user_key(&user.id), &user).unwrap();
    user.last_seen
}

#[test]
fn test_register_login_and_post_shows_first_in_feed() {
    let store = MemoryStore::new();
    let mut alice = Browser::signed_up(&store, "alice");

    let resp = alice.post("/index", &[("post", "older")]);
    assert_eq!(location(&resp), "/index");
    let resp = alice.post("/index", &[("post", "hello")]);
    assert_eq!(*resp.status(), 302);
    assert_eq!(alice.flash().as_deref(), Some("Your post is now live!"));

    let page = body(&alice.get("/index"));
    assert!(page.contains("Your post is now live!"));
    let hello = page.find("hello").unwrap();
    let older = page.find("older").unwrap();
    assert!(hello < older, "newest post must come first");

    // flash is shown once
    assert!(alice.flash().is_none());
    assert!(!body(&alice.get("/index")).contains("Your post is now live!"));
}

#[test]
fn test_bad_credentials_share_one_message() {
    let store = MemoryStore::new();
    let mut browser = Browser::new(&store);
    browser.register("alice", "right");

    let wrong_password = browser.login("alice", "wrong");
    assert_eq!(location(&wrong_password), "/login");
    let first = browser.flash();

    let unknown_user = browser.login("nobody", "right");
    assert_eq!(location(&unknown_user), "/login");
    let second = browser.flash();

    assert_eq!(first.as_deref(), Some("Invalid username or password"));
    assert_eq!(first, second);
    assert!(!browser.cookies.contains_key("session"));
}

#[test]
fn test_guarded_views_redirect_to_login_with_next() {
    let store = MemoryStore::new();
    let mut browser = Browser::new(&store);

    let resp = browser.get("/explore?page=2");
    assert_eq!(*resp.status(), 302);
    assert_eq!(location(&resp), "/login?next=%2Fexplore%3Fpage%3D2");
    assert_eq!(browser.flash().as_deref(), Some("Please log in to access this page."));

    browser.register("alice", "pw123");
    let resp = browser.post(
        "/login?next=%2Fexplore%3Fpage%3D2",
        &[("username", "alice"), ("password", "pw123")],
    );
    assert_eq!(location(&resp), "/explore?page=2");
}

#[test]
fn test_external_next_is_ignored() {
    let store = MemoryStore::new();
    let mut browser = Browser::new(&store);
    browser.register("alice", "pw123");

    let resp = browser.post(
        "/login?next=http%3A%2F%2Fevil.example%2Fx",
        &[("username", "alice"), ("password", "pw123")],
    );
    assert_eq!(*resp.status(), 302);
    assert_eq!(location(&resp), "/index");
}

#[test]
fn test_next_with_control_characters_is_ignored() {
    let store = MemoryStore::new();
    let mut browser = Browser::new(&store);
    browser.register("alice", "pw123");

    let resp = browser.post(
        "/login?next=%2F%09%2Fevil.example",
        &[("username", "alice"), ("password", "pw123")],
    );
    assert_eq!(*resp.status(), 302);
    assert_eq!(location(&resp), "/index");
}

#[test]
fn test_signed_in_requests_stamp_last_seen() {
    let store = MemoryStore::new();
    let mut alice = Browser::signed_up(&store, "alice");

    let stale = backdate_last_seen(&store, "alice");
    assert_eq!(*alice.get("/index").status(), 200);
    assert!(last_seen(&store, "alice") > stale);
}

#[test]
fn test_last_seen_stamped_on_misses_and_assets() {
    let store = MemoryStore::new();
    let mut alice = Browser::signed_up(&store, "alice");

    for uri in ["/nowhere", "/static/style.css"] {
        let stale = backdate_last_seen(&store, "alice");
        alice.get(uri);
        assert!(last_seen(&store, "alice") > stale, "{} did not stamp last_seen", uri);
    }

    let stale = backdate_last_seen(&store, "alice");
    assert_eq!(*alice.post("/explore", &[]).status(), 405);
    assert!(last_seen(&store, "alice") > stale);
}

#[test]
fn test_anonymous_requests_leave_users_alone() {
    let store = MemoryStore::new();
    let mut browser = Browser::new(&store);
    browser.register("alice", "pw123");

    let stale = backdate_last_seen(&store, "alice");
    browser.get("/explore");
    browser.get("/static/style.css");
    assert_eq!(last_seen(&store, "alice"), stale);
}

#[test]
fn test_logged_in_users_skip_login_and_register() {
    let store = MemoryStore::new();
    let mut alice = Browser::signed_up(&store, "alice");
    assert_eq!(location(&alice.get("/login")), "/index");
    assert_eq!(location(&alice.get("/register")), "/index");

    let resp = alice.get("/logout");
    assert_eq!(location(&resp), "/index");
    assert!(!alice.cookies.contains_key("session"));
    assert_eq!(*alice.get("/login").status(), 200);
}

#[test]
fn test_self_follow_and_unfollow_are_rejected() {
    let store = MemoryStore::new();
    let mut alice = Browser::signed_up(&store, "alice");

    let resp = alice.get("/follow/alice");
    assert_eq!(location(&resp), "/user/alice");
    assert_eq!(alice.flash().as_deref(), Some("You cannot follow yourself!"));

    let resp = alice.get("/unfollow/alice");
    assert_eq!(location(&resp), "/user/alice");
    assert_eq!(alice.flash().as_deref(), Some("You cannot unfollow yourself!"));

    let profile = body(&alice.get("/user/alice"));
    assert!(profile.contains("0 followers, 0 following."));
}

#[test]
fn test_follow_unknown_user_redirects_home() {
    let store = MemoryStore::new();
    let mut alice = Browser::signed_up(&store, "alice");

    let resp = alice.get("/follow/ghost");
    assert_eq!(location(&resp), "/index");
    assert_eq!(alice.flash().as_deref(), Some("User ghost not found."));

    assert_eq!(*alice.get("/user/ghost").status(), 404);
}

#[test]
fn test_follow_is_idempotent_and_unfollow_is_quiet() {
    let store = MemoryStore::new();
    let _bob = Browser::signed_up(&store, "bob");
    let mut alice = Browser::signed_up(&store, "alice");

    assert_eq!(location(&alice.get("/follow/bob")), "/user/bob");
    assert_eq!(location(&alice.get("/follow/bob")), "/user/bob");
    assert_eq!(alice.flash().as_deref(), Some("You are following bob!"));
    assert!(body(&alice.get("/user/bob")).contains("1 followers, 0 following."));

    assert_eq!(location(&alice.get("/unfollow/bob")), "/user/bob");
    assert_eq!(location(&alice.get("/unfollow/bob")), "/user/bob");
    assert_eq!(alice.flash().as_deref(), Some("You are not following bob."));
    assert!(body(&alice.get("/user/bob")).contains("0 followers, 0 following."));
}

#[test]
fn test_feed_explore_scenario() {
    let store = MemoryStore::new();
    let mut bob = Browser::signed_up(&store, "bob");
    let mut alice = Browser::signed_up(&store, "alice");
    let mut carol = Browser::signed_up(&store, "carol");

    alice.get("/follow/bob");
    bob.post("/index", &[("post", "hi")]);

    let marker = r#"<div class="body">hi</div>"#;
    assert!(body(&alice.get("/index")).contains(marker));
    assert!(!body(&carol.get("/index")).contains(marker));
    assert!(body(&carol.get("/explore")).contains(marker));
    assert!(body(&carol.get("/user/bob")).contains(marker));
}

#[test]
fn test_pagination_links() {
    let store = MemoryStore::new();
    let mut alice = Browser::signed_up(&store, "alice");
    for i in 0..7 {
        alice.post("/index", &[("post", &format!("note-{}", i))]);
    }

    // default page size is three
    let first = body(&alice.get("/index"));
    assert!(first.contains("note-6") && first.contains("note-4"));
    assert!(!first.contains("note-3"));
    assert!(first.contains(r#"href="/index?page=2""#));
    assert!(!first.contains(r#"class="prev""#));

    let last = body(&alice.get("/index?page=3"));
    assert!(last.contains("note-0"));
    assert!(last.contains(r#"href="/index?page=2""#));
    assert!(!last.contains(r#"class="next""#));

    let beyond = body(&alice.get("/explore?page=9"));
    assert!(!beyond.contains("note-"));
    assert!(beyond.contains(r#"href="/explore?page=8""#));

    let bogus = body(&alice.get("/index?page=abc"));
    assert!(bogus.contains("note-6"));
}

#[test]
fn test_invalid_post_rerenders_form() {
    let store = MemoryStore::new();
    let mut alice = Browser::signed_up(&store, "alice");

    let resp = alice.post("/index", &[("post", "")]);
    assert_eq!(*resp.status(), 200);
    assert!(body(&resp).contains("This field is required."));
}

#[test]
fn test_register_validation_errors() {
    let store = MemoryStore::new();
    let mut browser = Browser::new(&store);
    browser.register("alice", "pw123");

    let resp = browser.post(
        "/register",
        &[
            ("username", "alice"),
            ("phone", "5550100"),
            ("password", "pw123"),
            ("password2", "pw124"),
        ],
    );
    assert_eq!(*resp.status(), 200);
    let page = body(&resp);
    assert!(page.contains("Please use a different username."));
    assert!(page.contains("Field must be equal to password."));
}

#[test]
fn test_edit_profile_prefills_and_saves() {
    let store = MemoryStore::new();
    let _bob = Browser::signed_up(&store, "bob");
    let mut alice = Browser::signed_up(&store, "alice");

    let form = body(&alice.get("/edit_profile"));
    assert!(form.contains(r#"value="alice""#));

    let taken = alice.post("/edit_profile", &[("username", "bob"), ("about_me", "")]);
    assert_eq!(*taken.status(), 200);
    assert!(body(&taken).contains("Please use a different username."));

    let resp = alice.post(
        "/edit_profile",
        &[("username", "alicia"), ("about_me", "I <3 rust")],
    );
    assert_eq!(location(&resp), "/user/alicia");
    assert_eq!(alice.flash().as_deref(), Some("Your changes have been saved."));

    let profile = body(&alice.get("/user/alicia"));
    assert!(profile.contains("I &lt;3 rust"));
    assert_eq!(*alice.get("/user/alice").status(), 404);

    alice.get("/logout");
    assert_eq!(location(&alice.login("alicia", "pw123")), "/index");
}

#[test]
fn test_unknown_routes_and_methods() {
    let store = MemoryStore::new();
    let mut browser = Browser::new(&store);
    assert_eq!(*browser.get("/nowhere").status(), 404);
    assert_eq!(*browser.post("/explore", &[]).status(), 405);
    assert_eq!(*browser.get("/static/style.css").status(), 200);
}
