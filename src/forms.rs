//! Submitted forms and their field-level validation.
//!
//! A failed validation never becomes an error response: handlers re-render
//! the same page with the collected [`FormErrors`].

use std::collections::{BTreeMap, HashMap};

use crate::config::*;
use crate::core::query_params::{get_bool_flag, get_string};
use crate::core::store::KvStore;
use crate::users::find_user_by_username;

#[derive(Debug, Default, Clone)]
pub struct FormErrors {
    fields: BTreeMap<&'static str, Vec<String>>,
}

impl FormErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.entry(field).or_default().push(message.into());
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn required(errors: &mut FormErrors, field: &'static str, value: &str) -> bool {
    if value.trim().is_empty() {
        errors.add(field, "This field is required.");
        false
    } else {
        true
    }
}

fn length(errors: &mut FormErrors, field: &'static str, value: &str, min: usize, max: usize) {
    let len = value.chars().count();
    if len < min || len > max {
        errors.add(
            field,
            format!("Field must be between {} and {} characters long.", min, max),
        );
    }
}

#[derive(Debug, Default, Clone)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub remember_me: bool,
}

impl LoginForm {
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        LoginForm {
            username: get_string(params, "username").trim().to_string(),
            password: get_string(params, "password"),
            remember_me: get_bool_flag(params, "remember_me"),
        }
    }

    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::default();
        required(&mut errors, "username", &self.username);
        required(&mut errors, "password", &self.password);
        errors
    }
}

#[derive(Debug, Default, Clone)]
pub struct RegistrationForm {
    pub username: String,
    pub phone: String,
    pub password: String,
    pub password2: String,
}

impl RegistrationForm {
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        RegistrationForm {
            username: get_string(params, "username").trim().to_string(),
            phone: get_string(params, "phone").trim().to_string(),
            password: get_string(params, "password"),
            password2: get_string(params, "password2"),
        }
    }

    pub fn validate(&self, store: &dyn KvStore) -> anyhow::Result<FormErrors> {
        let mut errors = FormErrors::default();

        if required(&mut errors, "username", &self.username) {
            length(&mut errors, "username", &self.username, MIN_USERNAME_LENGTH, MAX_USERNAME_LENGTH);
            if find_user_by_username(store, &self.username)?.is_some() {
                errors.add("username", "Please use a different username.");
            }
        }

        if required(&mut errors, "phone", &self.phone) && !valid_phone(&self.phone) {
            errors.add("phone", "Please enter a valid phone number.");
        }

        if required(&mut errors, "password", &self.password)
            && self.password.chars().count() < MIN_PASSWORD_LENGTH
        {
            errors.add(
                "password",
                format!("Password must be at least {} characters.", MIN_PASSWORD_LENGTH),
            );
        }

        if required(&mut errors, "password2", &self.password2) && self.password2 != self.password {
            errors.add("password2", "Field must be equal to password.");
        }

        Ok(errors)
    }
}

fn valid_phone(phone: &str) -> bool {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    (MIN_PHONE_LENGTH..=MAX_PHONE_LENGTH).contains(&phone.len())
        && !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit())
}

#[derive(Debug, Default, Clone)]
pub struct EditProfileForm {
    pub username: String,
    pub about_me: String,
}

impl EditProfileForm {
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        EditProfileForm {
            username: get_string(params, "username").trim().to_string(),
            about_me: get_string(params, "about_me"),
        }
    }

    /// A name is taken only when it belongs to someone other than `editor_id`.
    pub fn validate(&self, store: &dyn KvStore, editor_id: &str) -> anyhow::Result<FormErrors> {
        let mut errors = FormErrors::default();

        if required(&mut errors, "username", &self.username) {
            length(&mut errors, "username", &self.username, MIN_USERNAME_LENGTH, MAX_USERNAME_LENGTH);
            let holder = find_user_by_username(store, &self.username)?;
            if holder.is_some_and(|user| user.id != editor_id) {
                errors.add("username", "Please use a different username.");
            }
        }

        length(&mut errors, "about_me", &self.about_me, 0, MAX_ABOUT_ME_LENGTH);

        Ok(errors)
    }
}

#[derive(Debug, Default, Clone)]
pub struct PostForm {
    pub post: String,
}

impl PostForm {
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        PostForm {
            post: get_string(params, "post"),
        }
    }

    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::default();
        if required(&mut errors, "post", &self.post) {
            length(&mut errors, "post", self.post.trim(), 1, MAX_POST_LENGTH);
        }
        errors
    }
}
