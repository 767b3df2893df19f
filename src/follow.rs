use spin_sdk::http::Response;
use tracing::info;

use crate::config::*;
use crate::core::session::redirect_with_flash;
use crate::core::store::{JsonStore, KvStore};
use crate::models::models::{Followings, User};
use crate::router::RequestContext;
use crate::users::{all_user_ids, find_user_by_username};

/// Add `following_id` to the follower's list. Following twice is a no-op.
pub fn follow_user(store: &dyn KvStore, follower_id: &str, following_id: &str) -> anyhow::Result<()> {
    let key = followings_key(follower_id);
    let mut followings: Followings = store.get_json(&key)?.unwrap_or_default();

    if !followings.iter().any(|id| id == following_id) {
        followings.push(following_id.to_string());
        store.set_json(&key, &followings)?;
    }

    Ok(())
}

/// Remove `following_id` from the follower's list, if present.
pub fn unfollow_user(store: &dyn KvStore, follower_id: &str, following_id: &str) -> anyhow::Result<()> {
    let key = followings_key(follower_id);
    let mut followings: Followings = store.get_json(&key)?.unwrap_or_default();

    let before = followings.len();
    followings.retain(|id| id != following_id);
    if followings.len() != before {
        store.set_json(&key, &followings)?;
    }

    Ok(())
}

pub fn get_followings(store: &dyn KvStore, user_id: &str) -> anyhow::Result<Followings> {
    Ok(store.get_json(&followings_key(user_id))?.unwrap_or_default())
}

pub fn is_following(store: &dyn KvStore, follower_id: &str, following_id: &str) -> anyhow::Result<bool> {
    Ok(get_followings(store, follower_id)?.iter().any(|id| id == following_id))
}

pub fn get_followers(store: &dyn KvStore, user_id: &str) -> anyhow::Result<Vec<String>> {
    let mut followers = Vec::new();

    for id in all_user_ids(store)? {
        if get_followings(store, &id)?.iter().any(|f| f == user_id) {
            followers.push(id);
        }
    }

    Ok(followers)
}

enum FollowAction {
    Follow,
    Unfollow,
}

fn handle(ctx: &RequestContext<'_>, me: &User, username: &str, action: FollowAction) -> anyhow::Result<Response> {
    let target = match find_user_by_username(ctx.store, username)? {
        Some(u) => u,
        None => {
            return Ok(redirect_with_flash("/index", &format!("User {} not found.", username)));
        }
    };

    let profile_url = format!("/user/{}", urlencoding::encode(&target.username));

    if target.id == me.id {
        let notice = match action {
            FollowAction::Follow => "You cannot follow yourself!",
            FollowAction::Unfollow => "You cannot unfollow yourself!",
        };
        return Ok(redirect_with_flash(&profile_url, notice));
    }

    let notice = match action {
        FollowAction::Follow => {
            follow_user(ctx.store, &me.id, &target.id)?;
            info!(follower = %me.id, following = %target.id, "followed");
            format!("You are following {}!", target.username)
        }
        FollowAction::Unfollow => {
            unfollow_user(ctx.store, &me.id, &target.id)?;
            info!(follower = %me.id, following = %target.id, "unfollowed");
            format!("You are not following {}.", target.username)
        }
    };

    Ok(redirect_with_flash(&profile_url, &notice))
}

pub fn follow(ctx: &RequestContext<'_>, me: &User, username: &str) -> anyhow::Result<Response> {
    handle(ctx, me, username, FollowAction::Follow)
}

pub fn unfollow(ctx: &RequestContext<'_>, me: &User, username: &str) -> anyhow::Result<Response> {
    handle(ctx, me, username, FollowAction::Unfollow)
}
