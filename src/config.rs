pub const USERS_LIST_KEY: &str = "users_list";
pub const FEED_KEY: &str = "feed";

pub const SESSION_COOKIE: &str = "session";
pub const FLASH_COOKIE: &str = "flash";

pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 64;
pub const MIN_PASSWORD_LENGTH: usize = 3;
pub const MIN_PHONE_LENGTH: usize = 5;
pub const MAX_PHONE_LENGTH: usize = 20;
pub const MAX_POST_LENGTH: usize = 140;
pub const MAX_ABOUT_ME_LENGTH: usize = 140;

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

pub fn posts_per_page() -> usize {
    env_or("MICROBLOG_POSTS_PER_PAGE", 3usize).max(1)
}

pub fn token_expiration_hours() -> i64 {
    env_or("MICROBLOG_TOKEN_EXPIRATION_HOURS", 24)
}

pub fn remember_days() -> i64 {
    env_or("MICROBLOG_REMEMBER_DAYS", 365)
}

pub fn seed_demo_data() -> bool {
    env_or("MICROBLOG_SEED_DEMO", false)
}

pub fn user_key(id: &str) -> String {
    format!("user:{}", id)
}

pub fn username_key(username: &str) -> String {
    format!("username:{}", username.to_lowercase())
}

pub fn post_key(id: &str) -> String {
    format!("post:{}", id)
}

pub fn followings_key(id: &str) -> String {
    format!("followings:{}", id)
}

pub fn session_key(token: &str) -> String {
    format!("session:{}", token)
}

pub fn secure_cookies() -> bool {
    env_or("MICROBLOG_SECURE_COOKIES", false)
}
