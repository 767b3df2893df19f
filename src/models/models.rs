use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct User {
    pub id: String,
    pub username: String,
    pub phone: String,
    pub password: String,
    pub about_me: Option<String>,
    pub last_seen: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Post {
    pub id: String,
    pub user_id: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// A post joined with its author's username, ready for rendering.
#[derive(Clone, Debug)]
pub struct PostView {
    pub post: Post,
    pub author: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SessionData {
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub remember: bool,
}

pub type Followings = Vec<String>;
