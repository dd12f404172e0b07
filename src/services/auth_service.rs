//! Authentication service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{
    config::JwtConfig,
    constants::roles,
    db::UserStore,
    error::{AppError, AppResult},
    models::{NewUser, User},
};

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub username: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

/// Issued session token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_in: i64,
}

/// Authentication service
pub struct AuthService;

impl AuthService {
    /// Register a new member account
    pub async fn register<S: UserStore + ?Sized>(
        store: &S,
        username: &str,
        email: &str,
        password: &str,
        display_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<User> {
        if store.find_user_by_identifier(username).await?.is_some() {
            return Err(AppError::AlreadyExists("Username already taken".to_string()));
        }

        if store.find_user_by_identifier(email).await?.is_some() {
            return Err(AppError::AlreadyExists("Email already registered".to_string()));
        }

        let password_hash = Self::hash_password(password)?;

        store
            .create_user(NewUser {
                username: username.to_string(),
                email: email.to_string(),
                password_hash,
                display_name: display_name.map(str::to_string),
                role: roles::MEMBER.to_string(),
                created_at: now,
            })
            .await
    }

    /// Login with username/email and password
    ///
    /// Banned users still receive a session; the route guard sends them to
    /// the ban notice.
    pub async fn login<S: UserStore + ?Sized>(
        store: &S,
        jwt: &JwtConfig,
        identifier: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> AppResult<(User, IssuedToken)> {
        let user = store
            .find_user_by_identifier(identifier)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !Self::verify_password(password, &user.password_hash)? {
            return Err(AppError::InvalidCredentials);
        }

        let token = Self::issue_token(&user, jwt, now)?;
        Ok((user, token))
    }

    /// Verify JWT token and extract claims
    pub fn verify_token(token: &str, secret: &str) -> AppResult<Claims> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;

        Ok(token_data.claims)
    }

    /// Sign an access token for the user
    pub fn issue_token(user: &User, jwt: &JwtConfig, now: DateTime<Utc>) -> AppResult<IssuedToken> {
        let expires_at = now + Duration::hours(jwt.expiry_hours);

        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            role: user.role.clone(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
        };

        let access_token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(jwt.secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Token generation failed: {}", e)))?;

        Ok(IssuedToken {
            access_token,
            expires_in: jwt.expiry_hours * 3600,
        })
    }

    /// Hash password using Argon2
    pub fn hash_password(password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing failed: {}", e)))?
            .to_string();

        Ok(hash)
    }

    /// Verify password against hash
    fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid password hash: {}", e)))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }
}
