use tracing::info;

use crate::config::*;
use crate::core::store::{JsonStore, KvStore};
use crate::follow::follow_user;
use crate::models::models::User;
use crate::posts::create_post;
use crate::users::{create_user, find_user_by_username};

const DEMO_USERS: [(&str, &str, &str); 3] = [
    ("alice", "15550100", "Hello, I'm Alice!"),
    ("bob", "15550101", "Bob's corner of the internet"),
    ("carol", "15550102", "Just looking around."),
];

const DEMO_POSTS: [(&str, &str); 4] = [
    ("alice", "Welcome to my microblog! Excited to share thoughts here."),
    ("bob", "Hey everyone! Just joined, looking forward to connecting with you all."),
    ("alice", "Just finished an amazing project. Feeling productive today!"),
    ("carol", "Anyone else reading https://www.rust-lang.org/learn today?"),
];

/// Seed demo accounts (password = username) with a few posts, and have
/// alice follow bob. Does nothing once alice exists.
pub fn init_test_data(store: &dyn KvStore) -> anyhow::Result<()> {
    if find_user_by_username(store, "alice")?.is_some() {
        return Ok(());
    }

    let mut users: Vec<User> = Vec::new();
    for (name, phone, bio) in DEMO_USERS {
        let mut user = create_user(store, name, phone, name)?;
        user.about_me = Some(bio.to_string());
        store.set_json(&user_key(&user.id), &user)?;
        users.push(user);
    }

    for (author, body) in DEMO_POSTS {
        if let Some(user) = users.iter().find(|u| u.username == author) {
            create_post(store, &user.id, body)?;
        }
    }

    follow_user(store, &users[0].id, &users[1].id)?;

    info!(users = users.len(), posts = DEMO_POSTS.len(), "seeded demo data");
    Ok(())
}
