use spin_sdk::http::Response;
use tracing::info;

use crate::config::*;
use crate::core::errors::ApiError;
use crate::core::helpers::{hash_password, new_id, now};
use crate::core::pagination::Page;
use crate::core::query_params::get_page;
use crate::core::session::redirect_with_flash;
use crate::core::store::{JsonStore, KvStore};
use crate::follow::{get_followers, get_followings, is_following};
use crate::forms::{EditProfileForm, FormErrors};
use crate::models::models::User;
use crate::posts::posts_by_author;
use crate::router::RequestContext;
use crate::templates::{render_edit_profile, render_user, ProfileView};

pub fn get_user(store: &dyn KvStore, user_id: &str) -> anyhow::Result<Option<User>> {
    store.get_json::<User>(&user_key(user_id))
}

/// Case-insensitive lookup through the username index.
pub fn find_user_by_username(store: &dyn KvStore, username: &str) -> anyhow::Result<Option<User>> {
    match store.get_json::<String>(&username_key(username))? {
        Some(id) => get_user(store, &id),
        None => Ok(None),
    }
}

pub fn all_user_ids(store: &dyn KvStore) -> anyhow::Result<Vec<String>> {
    Ok(store.get_json(USERS_LIST_KEY)?.unwrap_or_default())
}

pub fn save_user(store: &dyn KvStore, user: &User) -> anyhow::Result<()> {
    store.set_json(&user_key(&user.id), user)
}

/// Persist a new user with an argon2 password hash.
///
/// Callers validate uniqueness first; the index write here is last-wins.
pub fn create_user(store: &dyn KvStore, username: &str, phone: &str, password: &str) -> anyhow::Result<User> {
    let timestamp = now();
    let user = User {
        id: new_id(),
        username: username.to_string(),
        phone: phone.to_string(),
        password: hash_password(password)?,
        about_me: None,
        last_seen: timestamp,
        created_at: timestamp,
    };

    save_user(store, &user)?;
    store.set_json(&username_key(&user.username), &user.id)?;

    let mut users = all_user_ids(store)?;
    users.push(user.id.clone());
    store.set_json(USERS_LIST_KEY, &users)?;

    Ok(user)
}

/// Overwrite display name and bio, moving the username index if needed.
pub fn update_profile(store: &dyn KvStore, user: &mut User, username: &str, about_me: &str) -> anyhow::Result<()> {
    if username_key(username) != username_key(&user.username) {
        store.delete(&username_key(&user.username))?;
        store.set_json(&username_key(username), &user.id)?;
    }

    user.username = username.to_string();
    let about_me = about_me.trim();
    user.about_me = if about_me.is_empty() {
        None
    } else {
        Some(about_me.to_string())
    };

    save_user(store, user)
}

/// Stamp `last_seen` with the current time. Never moves it backwards.
pub fn touch_last_seen(store: &dyn KvStore, user: &mut User) -> anyhow::Result<()> {
    let timestamp = now();
    if timestamp > user.last_seen {
        user.last_seen = timestamp;
        save_user(store, user)?;
    }
    Ok(())
}

pub fn profile(ctx: &RequestContext<'_>, me: &User, username: &str) -> anyhow::Result<Response> {
    let user = match find_user_by_username(ctx.store, username)? {
        Some(u) => u,
        None => return Ok(ApiError::NotFound(format!("User {} not found.", username)).into()),
    };

    let posts = posts_by_author(ctx.store, &user)?;
    let page = Page::paginate(posts, get_page(&ctx.query), posts_per_page());
    let base = format!("/user/{}", urlencoding::encode(&user.username));
    let (prev_url, next_url) = page.nav_urls(&base);

    let view = ProfileView {
        user: &user,
        viewer: me,
        is_following: is_following(ctx.store, &me.id, &user.id)?,
        followers: get_followers(ctx.store, &user.id)?.len(),
        following: get_followings(ctx.store, &user.id)?.len(),
    };
    let content = render_user(&view, &page, prev_url.as_deref(), next_url.as_deref());

    Ok(ctx.page(&format!("User {}", user.username), &content))
}

pub fn edit_profile(ctx: &RequestContext<'_>, me: &User) -> anyhow::Result<Response> {
    if !ctx.is_post() {
        let form = EditProfileForm {
            username: me.username.clone(),
            about_me: me.about_me.clone().unwrap_or_default(),
        };
        let content = render_edit_profile(&form, &FormErrors::default());
        return Ok(ctx.page("Edit Profile", &content));
    }

    let form = EditProfileForm::from_params(&ctx.form());
    let errors = form.validate(ctx.store, &me.id)?;
    if !errors.is_empty() {
        return Ok(ctx.page("Edit Profile", &render_edit_profile(&form, &errors)));
    }

    let mut user = me.clone();
    update_profile(ctx.store, &mut user, &form.username, &form.about_me)?;
    info!(user_id = %user.id, username = %user.username, "profile updated");

    let location = format!("/user/{}", urlencoding::encode(&user.username));
    Ok(redirect_with_flash(&location, "Your changes have been saved."))
}
