use html_escape::{encode_double_quoted_attribute, encode_text};
use rust_embed::RustEmbed;

use crate::core::pagination::Page;
use crate::forms::{EditProfileForm, FormErrors, LoginForm, PostForm, RegistrationForm};
use crate::models::models::{PostView, User};

#[derive(RustEmbed)]
#[folder = "templates"]
struct Templates;

fn load(name: &str) -> String {
    Templates::get(name)
        .map(|file| String::from_utf8_lossy(&file.data).into_owned())
        .unwrap_or_else(|| {
            tracing::error!(template = name, "template missing from bundle");
            String::new()
        })
}

/// Substitute `{{ key }}` markers in one pass. Inserted values are never
/// rescanned, so user text containing braces stays literal.
fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = after[..end].trim();
                match vars.iter().find(|(k, _)| *k == key) {
                    Some((_, value)) => out.push_str(value),
                    None => out.push_str(&rest[start..start + 2 + end + 2]),
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn field_errors(errors: &FormErrors, field: &str) -> String {
    errors
        .get(field)
        .iter()
        .map(|e| format!(r#"<span class="field-error">[{}]</span>"#, encode_text(e)))
        .collect()
}

fn nav_links(prev_url: Option<&str>, next_url: Option<&str>, prev_label: &str, next_label: &str) -> String {
    let mut nav = String::new();
    if let Some(url) = prev_url {
        nav.push_str(&format!(
            r#"<a class="prev" href="{}">&larr; {}</a>"#,
            encode_double_quoted_attribute(url),
            prev_label
        ));
    }
    if let Some(url) = next_url {
        nav.push_str(&format!(
            r#"<a class="next" href="{}">{} &rarr;</a>"#,
            encode_double_quoted_attribute(url),
            next_label
        ));
    }
    nav
}

fn render_posts(posts: &[PostView]) -> String {
    let template = load("_post.html");
    posts
        .iter()
        .map(|view| {
            let author = encode_text(&view.author).to_string();
            let author_url = format!("/user/{}", urlencoding::encode(&view.author));
            let timestamp = view.post.created_at.format("%Y-%m-%d %H:%M UTC").to_string();
            fill(
                &template,
                &[
                    ("author", author.as_str()),
                    ("author_url", &*encode_double_quoted_attribute(&author_url)),
                    ("timestamp", timestamp.as_str()),
                    ("body", view.post.body.as_str()),
                ],
            )
        })
        .collect()
}

/// Wrap page content in the shared layout.
pub fn render_layout(title: &str, current_user: Option<&User>, flash: Option<&str>, content: &str) -> String {
    let nav = match current_user {
        Some(user) => format!(
            r#"<a href="/index">Home</a> <a href="/explore">Explore</a> <a href="{}">Profile</a> <a href="/logout">Logout</a>"#,
            encode_double_quoted_attribute(&format!("/user/{}", urlencoding::encode(&user.username)))
        ),
        None => r#"<a href="/index">Home</a> <a href="/login">Login</a> <a href="/register">Register</a>"#
            .to_string(),
    };
    let flash_html = flash
        .map(|msg| format!(r#"<ul class="flashes"><li>{}</li></ul>"#, encode_text(msg)))
        .unwrap_or_default();
    let title = format!("{} - Microblog", encode_text(title));

    fill(
        &load("base.html"),
        &[
            ("title", title.as_str()),
            ("nav", nav.as_str()),
            ("flash", flash_html.as_str()),
            ("content", content),
        ],
    )
}

/// Feed body shared by the home and explore pages. The post form is shown
/// only when `form` is given.
pub fn render_index(
    viewer: &User,
    form: Option<(&PostForm, &FormErrors)>,
    page: &Page<PostView>,
    prev_url: Option<&str>,
    next_url: Option<&str>,
) -> String {
    let form_html = form
        .map(|(form, errors)| {
            fill(
                &load("_post_form.html"),
                &[
                    ("post", &*encode_text(&form.post)),
                    ("post_errors", field_errors(errors, "post").as_str()),
                ],
            )
        })
        .unwrap_or_default();

    fill(
        &load("index.html"),
        &[
            ("username", &*encode_text(&viewer.username)),
            ("post_form", form_html.as_str()),
            ("posts", render_posts(&page.items).as_str()),
            ("nav", nav_links(prev_url, next_url, "Newer posts", "Older posts").as_str()),
        ],
    )
}

pub struct ProfileView<'a> {
    pub user: &'a User,
    pub viewer: &'a User,
    pub is_following: bool,
    pub followers: usize,
    pub following: usize,
}

pub fn render_user(
    profile: &ProfileView<'_>,
    page: &Page<PostView>,
    prev_url: Option<&str>,
    next_url: Option<&str>,
) -> String {
    let user = profile.user;
    let encoded_name = urlencoding::encode(&user.username).into_owned();
    let action = if user.id == profile.viewer.id {
        r#"<a href="/edit_profile">Edit your profile</a>"#.to_string()
    } else if profile.is_following {
        format!(r#"<a href="/unfollow/{}">Unfollow</a>"#, encode_double_quoted_attribute(&encoded_name))
    } else {
        format!(r#"<a href="/follow/{}">Follow</a>"#, encode_double_quoted_attribute(&encoded_name))
    };
    let about_me = user
        .about_me
        .as_deref()
        .filter(|bio| !bio.is_empty())
        .map(|bio| format!(r#"<p class="about-me">{}</p>"#, encode_text(bio)))
        .unwrap_or_default();

    fill(
        &load("user.html"),
        &[
            ("username", &*encode_text(&user.username)),
            ("about_me", about_me.as_str()),
            ("last_seen", user.last_seen.format("%Y-%m-%d %H:%M UTC").to_string().as_str()),
            ("followers", profile.followers.to_string().as_str()),
            ("following", profile.following.to_string().as_str()),
            ("action", action.as_str()),
            ("posts", render_posts(&page.items).as_str()),
            ("nav", nav_links(prev_url, next_url, "Newer posts", "Older posts").as_str()),
        ],
    )
}

pub fn render_login(form: &LoginForm, errors: &FormErrors, next: Option<&str>) -> String {
    let action = match next {
        Some(next) => format!("/login?next={}", urlencoding::encode(next)),
        None => "/login".to_string(),
    };
    fill(
        &load("login.html"),
        &[
            ("action", &*encode_double_quoted_attribute(&action)),
            ("username", &*encode_double_quoted_attribute(&form.username)),
            ("username_errors", field_errors(errors, "username").as_str()),
            ("password_errors", field_errors(errors, "password").as_str()),
            ("remember_checked", if form.remember_me { "checked" } else { "" }),
        ],
    )
}

pub fn render_register(form: &RegistrationForm, errors: &FormErrors) -> String {
    fill(
        &load("register.html"),
        &[
            ("username", &*encode_double_quoted_attribute(&form.username)),
            ("username_errors", field_errors(errors, "username").as_str()),
            ("phone", &*encode_double_quoted_attribute(&form.phone)),
            ("phone_errors", field_errors(errors, "phone").as_str()),
            ("password_errors", field_errors(errors, "password").as_str()),
            ("password2_errors", field_errors(errors, "password2").as_str()),
        ],
    )
}

pub fn render_edit_profile(form: &EditProfileForm, errors: &FormErrors) -> String {
    fill(
        &load("edit_profile.html"),
        &[
            ("username", &*encode_double_quoted_attribute(&form.username)),
            ("username_errors", field_errors(errors, "username").as_str()),
            ("about_me", &*encode_text(&form.about_me)),
            ("about_me_errors", field_errors(errors, "about_me").as_str()),
        ],
    )
}

pub fn render_error_page(status: http::StatusCode, message: &str) -> String {
    let content = fill(
        &load("error.html"),
        &[
            ("code", status.as_u16().to_string().as_str()),
            ("reason", status.canonical_reason().unwrap_or("Error")),
            ("message", &*encode_text(message)),
        ],
    );
    render_layout(status.canonical_reason().unwrap_or("Error"), None, None, &content)
}
