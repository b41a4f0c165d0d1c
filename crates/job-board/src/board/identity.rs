//! Sessions and profiles.
//!
//! Authentication itself belongs to an external provider behind [`AuthProvider`]. This
//! module only turns its sessions into an explicit [`SessionContext`] value and keeps the
//! matching profile row in step with it.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{info, warn};

use super::domain::{ProfileId, UserId, UserProfile, UserType};
use super::validation::Validate;
use super::ServiceError;
use crate::store::{Query, Store};

/// Authenticated session issued by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub email: String,
    pub access_token: String,
    pub issued_at: DateTime<Utc>,
}

/// Account created by `sign_up`, before any session exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthUser {
    pub user_id: UserId,
    pub email: String,
}

/// Session-change notification pushed by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(Session),
    SignedOut { user_id: UserId, access_token: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("an account already exists for {0}")]
    EmailTaken(String),
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("auth provider unavailable: {0}")]
    Unavailable(String),
}

/// The external authentication service.
pub trait AuthProvider: Send + Sync {
    fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, AuthError>;
    fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;
    fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;
    /// Looks up a live session; `None` for unknown or revoked tokens.
    fn session(&self, access_token: &str) -> Result<Option<Session>, AuthError>;
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

struct Account {
    user_id: UserId,
    password_hash: String,
}

/// Process-local provider. Passwords are stored as Argon2id PHC strings with a per-account
/// salt and the project key as the hashing secret; access tokens are opaque UUIDs.
pub struct MemoryAuthProvider {
    project_key: String,
    accounts: RwLock<HashMap<String, Account>>,
    sessions: RwLock<HashMap<String, Session>>,
    events: broadcast::Sender<AuthEvent>,
}

impl MemoryAuthProvider {
    pub fn new(project_key: &str) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            project_key: project_key.to_string(),
            accounts: RwLock::new(HashMap::new()),
            sessions: RwLock::new(HashMap::new()),
            events,
        }
    }

    fn hasher(&self) -> Result<Argon2<'_>, AuthError> {
        Argon2::new_with_secret(
            self.project_key.as_bytes(),
            Algorithm::Argon2id,
            Version::V0x13,
            Params::default(),
        )
        .map_err(|err| AuthError::Unavailable(format!("password hasher: {err}")))
    }

    fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .hasher()?
            .hash_password(password.as_bytes(), &salt)
            .map_err(|err| AuthError::Unavailable(format!("password hashing failed: {err}")))?;
        Ok(hash.to_string())
    }

    fn verify_password(&self, password: &str, stored: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(stored)
            .map_err(|err| AuthError::Unavailable(format!("stored password hash: {err}")))?;
        Ok(self
            .hasher()?
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    fn publish(&self, event: AuthEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

fn lock_error() -> AuthError {
    AuthError::Unavailable("credential store lock poisoned".to_string())
}

impl AuthProvider for MemoryAuthProvider {
    fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        let email = normalize_email(email);
        let mut accounts = self.accounts.write().map_err(|_| lock_error())?;
        if accounts.contains_key(&email) {
            return Err(AuthError::EmailTaken(email));
        }

        let user_id = UserId::generate();
        accounts.insert(
            email.clone(),
            Account {
                user_id: user_id.clone(),
                password_hash: self.hash_password(password)?,
            },
        );
        Ok(AuthUser { user_id, email })
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = normalize_email(email);
        let user_id = {
            let accounts = self.accounts.read().map_err(|_| lock_error())?;
            let account = accounts.get(&email).ok_or(AuthError::InvalidCredentials)?;
            if !self.verify_password(password, &account.password_hash)? {
                return Err(AuthError::InvalidCredentials);
            }
            account.user_id.clone()
        };

        let session = Session {
            user_id,
            email,
            access_token: uuid::Uuid::new_v4().to_string(),
            issued_at: Utc::now(),
        };
        self.sessions
            .write()
            .map_err(|_| lock_error())?
            .insert(session.access_token.clone(), session.clone());
        self.publish(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let removed = self
            .sessions
            .write()
            .map_err(|_| lock_error())?
            .remove(access_token);
        if let Some(session) = removed {
            self.publish(AuthEvent::SignedOut {
                user_id: session.user_id,
                access_token: session.access_token,
            });
        }
        Ok(())
    }

    fn session(&self, access_token: &str) -> Result<Option<Session>, AuthError> {
        let sessions = self.sessions.read().map_err(|_| lock_error())?;
        Ok(sessions.get(access_token).cloned())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

/// Identity threaded explicitly through service calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionContext {
    session: Option<Session>,
    profile: Option<UserProfile>,
}

impl SessionContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn signed_in(session: Session, profile: Option<UserProfile>) -> Self {
        Self {
            session: Some(session),
            profile,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.session.as_ref().map(|session| &session.user_id)
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn require_user(&self) -> Result<&UserId, ServiceError> {
        self.user_id().ok_or(ServiceError::Unauthenticated)
    }

    /// Follows provider notifications: a sign-out of this token clears the context, a
    /// sign-in is adopted when the context is anonymous or belongs to the same user.
    pub fn apply_event(&mut self, event: &AuthEvent) {
        match event {
            AuthEvent::SignedOut { access_token, .. } => {
                let ours = self
                    .session
                    .as_ref()
                    .is_some_and(|session| &session.access_token == access_token);
                if ours {
                    self.session = None;
                    self.profile = None;
                }
            }
            AuthEvent::SignedIn(session) => {
                let adopt = self
                    .user_id()
                    .map_or(true, |user_id| *user_id == session.user_id);
                if adopt {
                    self.session = Some(session.clone());
                }
            }
        }
    }
}

/// Account registration as submitted by the sign-up screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub user_type: UserType,
    pub first_name: String,
    pub last_name: String,
}

impl Registration {
    pub fn attributes(&self) -> ProfileAttributes {
        ProfileAttributes {
            user_type: self.user_type,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        }
    }
}

/// Profile fields captured at sign-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileAttributes {
    pub user_type: UserType,
    pub first_name: String,
    pub last_name: String,
}

/// Partial profile update. Blank optional strings clear the field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilePatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub profile_picture_url: Option<String>,
    pub resume_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub github_url: Option<String>,
    pub portfolio_url: Option<String>,
    pub skills: Option<String>,
    pub experience_years: Option<u32>,
}

fn set_optional(target: &mut Option<String>, value: &Option<String>) {
    if let Some(value) = value {
        let trimmed = value.trim();
        *target = (!trimmed.is_empty()).then(|| trimmed.to_string());
    }
}

impl ProfilePatch {
    pub fn apply(&self, profile: &mut UserProfile) {
        if let Some(first_name) = &self.first_name {
            profile.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = &self.last_name {
            profile.last_name = last_name.trim().to_string();
        }
        set_optional(&mut profile.phone, &self.phone);
        set_optional(&mut profile.bio, &self.bio);
        set_optional(&mut profile.location, &self.location);
        set_optional(&mut profile.profile_picture_url, &self.profile_picture_url);
        set_optional(&mut profile.resume_url, &self.resume_url);
        set_optional(&mut profile.linkedin_url, &self.linkedin_url);
        set_optional(&mut profile.github_url, &self.github_url);
        set_optional(&mut profile.portfolio_url, &self.portfolio_url);
        set_optional(&mut profile.skills, &self.skills);
        if let Some(years) = self.experience_years {
            profile.experience_years = years;
        }
    }
}

/// Sign-up, sign-in and profile maintenance.
#[derive(Clone)]
pub struct IdentityService {
    store: Store,
    auth: Arc<dyn AuthProvider>,
}

impl IdentityService {
    pub fn new(store: Store, auth: Arc<dyn AuthProvider>) -> Self {
        Self { store, auth }
    }

    pub fn auth(&self) -> &Arc<dyn AuthProvider> {
        &self.auth
    }

    /// Validates locally, then signs up and signs in. Nothing reaches the provider when
    /// validation fails.
    pub fn register(&self, registration: Registration) -> Result<SessionContext, ServiceError> {
        if let Err(err) = registration.validate() {
            warn!(email = %registration.email, "registration rejected: {err}");
            return Err(err.into());
        }
        self.sign_up(
            &registration.email,
            &registration.password,
            registration.attributes(),
        )
    }

    /// Creates the account and its profile row, then opens a session.
    pub fn sign_up(
        &self,
        email: &str,
        password: &str,
        attributes: ProfileAttributes,
    ) -> Result<SessionContext, ServiceError> {
        let user = self.auth.sign_up(email, password)?;
        let now = self.store.now();
        let profile = UserProfile {
            id: ProfileId::generate(),
            user_id: user.user_id.clone(),
            user_type: attributes.user_type,
            first_name: attributes.first_name.trim().to_string(),
            last_name: attributes.last_name.trim().to_string(),
            phone: None,
            bio: None,
            location: None,
            profile_picture_url: None,
            resume_url: None,
            linkedin_url: None,
            github_url: None,
            portfolio_url: None,
            skills: None,
            experience_years: 0,
            created_at: now,
            updated_at: now,
        };
        self.store.profiles.insert(profile)?;
        info!(user_id = %user.user_id, user_type = %attributes.user_type, "account registered");

        self.sign_in(email, password)
    }

    pub fn sign_in(&self, email: &str, password: &str) -> Result<SessionContext, ServiceError> {
        let session = self.auth.sign_in(email, password)?;
        let profile = self.load_profile(&session.user_id)?;
        Ok(SessionContext::signed_in(session, profile))
    }

    pub fn sign_out(&self, ctx: &mut SessionContext) -> Result<(), ServiceError> {
        if let Some(session) = ctx.session() {
            self.auth.sign_out(&session.access_token)?;
        }
        *ctx = SessionContext::anonymous();
        Ok(())
    }

    /// Rebuilds a context from a stored access token. Unknown tokens give an anonymous
    /// context rather than an error.
    pub fn hydrate(&self, access_token: &str) -> Result<SessionContext, ServiceError> {
        match self.auth.session(access_token)? {
            Some(session) => {
                let profile = self.load_profile(&session.user_id)?;
                Ok(SessionContext::signed_in(session, profile))
            }
            None => Ok(SessionContext::anonymous()),
        }
    }

    pub fn load_profile(&self, user_id: &UserId) -> Result<Option<UserProfile>, ServiceError> {
        let rows = self
            .store
            .profiles
            .select(&Query::new().eq("user_id", user_id))?;
        Ok(rows.into_iter().next())
    }

    /// Writes the patch to the caller's profile and refreshes the context copy.
    /// Role-specific fields are not revalidated.
    pub fn update_profile(
        &self,
        ctx: &mut SessionContext,
        patch: ProfilePatch,
    ) -> Result<UserProfile, ServiceError> {
        let user_id = ctx.require_user()?.clone();
        let current = self
            .load_profile(&user_id)?
            .ok_or_else(|| ServiceError::NotFound {
                entity: "profile",
                id: user_id.to_string(),
            })?;

        let mut candidate = current.clone();
        patch.apply(&mut candidate);
        candidate.validate()?;

        let now = self.store.now();
        let updated = self
            .store
            .profiles
            .update(current.id.as_str(), &mut |row: &mut UserProfile| {
                patch.apply(row);
                row.updated_at = now;
            })
            .map_err(ServiceError::missing("profile", current.id.as_str()))?;

        ctx.profile = Some(updated.clone());
        info!(user_id = %user_id, "profile updated");
        Ok(updated)
    }
}
