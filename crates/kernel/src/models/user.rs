//! User model and account operations.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::MySqlConnection;

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LEN: usize = 6;

#[allow(clippy::expect_used)]
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid regex literal")
});

/// User record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub user_id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub username: Option<String>,
    pub is_admin: bool,
    pub created_at: Option<DateTime<Utc>>,
}

/// Input for creating a new user.
#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub password: String,
    pub username: Option<String>,
    pub is_admin: bool,
}

const USER_COLUMNS: &str = "user_id, email, password_hash, username, is_admin, created_at";

impl User {
    /// Name shown in the page header.
    pub fn display_name(&self) -> String {
        match self.username.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => default_username(&self.email),
        }
    }

    /// Find a user by ID.
    pub async fn find_by_id(conn: &mut MySqlConnection, id: i64) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM Users WHERE user_id = ?"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await
        .context("failed to fetch user by id")?;

        Ok(user)
    }

    /// Find a user by email.
    pub async fn find_by_email(conn: &mut MySqlConnection, email: &str) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM Users WHERE email = ?"
        ))
        .bind(email)
        .fetch_optional(conn)
        .await
        .context("failed to fetch user by email")?;

        Ok(user)
    }

    /// Create a new user and return its id.
    pub async fn create(conn: &mut MySqlConnection, input: CreateUser) -> Result<i64> {
        let password_hash = hash_password(&input.password)?;
        let username = input
            .username
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| default_username(&input.email));

        let result = sqlx::query(
            "INSERT INTO Users (email, password_hash, username, is_admin) VALUES (?, ?, ?, ?)",
        )
        .bind(&input.email)
        .bind(&password_hash)
        .bind(&username)
        .bind(input.is_admin)
        .execute(conn)
        .await
        .context("failed to create user")?;

        Ok(result.last_insert_id() as i64)
    }

    /// Grant or revoke the admin flag.
    pub async fn set_admin(conn: &mut MySqlConnection, id: i64, is_admin: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE Users SET is_admin = ? WHERE user_id = ?")
            .bind(is_admin)
            .bind(id)
            .execute(conn)
            .await
            .context("failed to update admin flag")?;

        Ok(result.rows_affected() > 0)
    }

    /// Verify a password against this user's hash.
    pub fn verify_password(&self, password: &str) -> bool {
        if self.password_hash.is_empty() {
            return false;
        }

        let Ok(parsed_hash) = PasswordHash::new(&self.password_hash) else {
            return false;
        };

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

/// Username used when none is given: the local part of the email.
pub fn default_username(email: &str) -> String {
    email.split('@').next().unwrap_or_default().to_string()
}

/// Check the email format.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Validate registration input, returning the message to flash on failure.
pub fn validate_registration(email: &str, password: &str) -> Result<(), &'static str> {
    if email.is_empty() || password.is_empty() {
        return Err("邮箱和密码不能为空");
    }
    if !is_valid_email(email) {
        return Err("邮箱格式不正确");
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err("密码长度至少为6位");
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn user_with_hash(hash: String) -> User {
        User {
            user_id: 1,
            email: "curator@example.org".into(),
            password_hash: hash,
            username: None,
            is_admin: false,
            created_at: None,
        }
    }

    #[test]
    fn test_password_hashing() {
        let hash = hash_password("bronze-ding").unwrap();
        assert!(hash.starts_with("$argon2"));

        let user = user_with_hash(hash);
        assert!(user.verify_password("bronze-ding"));
        assert!(!user.verify_password("wrong"));
    }

    #[test]
    fn foreign_hash_formats_never_verify() {
        let user = user_with_hash("pbkdf2:sha256:600000$salt$abc".into());
        assert!(!user.verify_password("anything"));
        assert!(!user_with_hash(String::new()).verify_password(""));
    }

    #[test]
    fn username_defaults_to_email_local_part() {
        assert_eq!(default_username("li.wei@example.cn"), "li.wei");
        let user = user_with_hash(String::new());
        assert_eq!(user.display_name(), "curator");
    }

    #[test]
    fn registration_validation() {
        assert_eq!(validate_registration("", "secret1"), Err("邮箱和密码不能为空"));
        assert_eq!(validate_registration("not-an-email", "secret1"), Err("邮箱格式不正确"));
        assert_eq!(validate_registration("a@b.co", "12345"), Err("密码长度至少为6位"));
        assert_eq!(validate_registration("a@b.co", "123456"), Ok(()));
    }

    #[test]
    fn email_format() {
        assert!(is_valid_email("user+tag@museum.example.com"));
        assert!(!is_valid_email("user@localhost"));
        assert!(!is_valid_email("@example.com"));
    }
}
