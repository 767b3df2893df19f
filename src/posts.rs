use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use ammonia::Builder;
use html_escape::{decode_html_entities, encode_double_quoted_attribute};
use regex::Regex;
use spin_sdk::http::Response;
use tracing::info;

use crate::config::*;
use crate::core::helpers::{new_id, now};
use crate::core::pagination::Page;
use crate::core::query_params::get_page;
use crate::core::session::redirect_with_flash;
use crate::core::store::{JsonStore, KvStore};
use crate::follow::get_followings;
use crate::forms::{FormErrors, PostForm};
use crate::models::models::{Post, PostView, User};
use crate::router::RequestContext;
use crate::templates::render_index;
use crate::users::get_user;

fn url_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r#"https?://[^\s<>"]+"#).expect("Regex should compile"))
}

/// Strip all markup from a post, then turn bare http(s) URLs into links.
pub fn filter_post_content(content: &str) -> String {
    let clean = Builder::default()
        .tags(HashSet::new())
        .clean(content.trim())
        .to_string();

    url_regex()
        .replace_all(&clean, |caps: &regex::Captures| {
            let shown = &caps[0];
            let href = encode_double_quoted_attribute(&decode_html_entities(shown)).into_owned();
            format!(r#"<a href="{}" target="_blank" rel="noopener noreferrer">{}</a>"#, href, shown)
        })
        .to_string()
}

pub fn create_post(store: &dyn KvStore, author_id: &str, body: &str) -> anyhow::Result<Post> {
    let post = Post {
        id: new_id(),
        user_id: author_id.to_string(),
        body: filter_post_content(body),
        created_at: now(),
    };

    store.set_json(&post_key(&post.id), &post)?;

    let mut feed: Vec<String> = store.get_json(FEED_KEY)?.unwrap_or_default();
    feed.insert(0, post.id.clone()); // newest first
    store.set_json(FEED_KEY, &feed)?;

    Ok(post)
}

/// Walk the global feed and keep posts whose author passes `include`,
/// newest first. Ties keep feed order.
fn collect_posts<F>(store: &dyn KvStore, include: F) -> anyhow::Result<Vec<PostView>>
where
    F: Fn(&str) -> bool,
{
    let feed: Vec<String> = store.get_json(FEED_KEY)?.unwrap_or_default();
    let mut authors: HashMap<String, Option<String>> = HashMap::new();
    let mut posts = Vec::new();

    for id in &feed {
        let post = match store.get_json::<Post>(&post_key(id))? {
            Some(p) if include(p.user_id.as_str()) => p,
            _ => continue,
        };

        if !authors.contains_key(&post.user_id) {
            let name = get_user(store, &post.user_id)?.map(|u| u.username);
            authors.insert(post.user_id.clone(), name);
        }
        if let Some(Some(author)) = authors.get(&post.user_id) {
            posts.push(PostView {
                author: author.clone(),
                post,
            });
        }
    }

    posts.sort_by(|a, b| b.post.created_at.cmp(&a.post.created_at));
    Ok(posts)
}

pub fn posts_by_author(store: &dyn KvStore, author: &User) -> anyhow::Result<Vec<PostView>> {
    collect_posts(store, |user_id| user_id == author.id)
}

/// Posts by everyone `viewer` follows, plus the viewer's own.
pub fn followed_posts(store: &dyn KvStore, viewer: &User) -> anyhow::Result<Vec<PostView>> {
    let mut sources: HashSet<String> = get_followings(store, &viewer.id)?.into_iter().collect();
    sources.insert(viewer.id.clone());
    collect_posts(store, |user_id| sources.contains(user_id))
}

pub fn all_posts(store: &dyn KvStore) -> anyhow::Result<Vec<PostView>> {
    collect_posts(store, |_| true)
}

fn render_feed(
    ctx: &RequestContext<'_>,
    me: &User,
    title: &str,
    base: &str,
    posts: Vec<PostView>,
    form: Option<(&PostForm, &FormErrors)>,
) -> Response {
    let page = Page::paginate(posts, get_page(&ctx.query), posts_per_page());
    let (prev_url, next_url) = page.nav_urls(base);
    let content = render_index(me, form, &page, prev_url.as_deref(), next_url.as_deref());
    ctx.page(title, &content)
}

pub fn index(ctx: &RequestContext<'_>, me: &User) -> anyhow::Result<Response> {
    let (form, errors) = if ctx.is_post() {
        let form = PostForm::from_params(&ctx.form());
        let errors = form.validate();
        if errors.is_empty() {
            let post = create_post(ctx.store, &me.id, &form.post)?;
            info!(post_id = %post.id, user_id = %me.id, "post created");
            return Ok(redirect_with_flash("/index", "Your post is now live!"));
        }
        (form, errors)
    } else {
        (PostForm::default(), FormErrors::default())
    };

    let posts = followed_posts(ctx.store, me)?;
    Ok(render_feed(ctx, me, "Home", "/index", posts, Some((&form, &errors))))
}

pub fn explore(ctx: &RequestContext<'_>, me: &User) -> anyhow::Result<Response> {
    let posts = all_posts(ctx.store)?;
    Ok(render_feed(ctx, me, "Explore", "/explore", posts, None))
}
