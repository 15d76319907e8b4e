/// Account lifecycle
///
/// Registration, login (password and OAuth), profile updates, email
/// verification and password reset.
///
/// ```text
///             register                      verify_email
///   (none) ───────────► Unverified ──────────────────────► Verified
///                           ▲                                  │
///                           └──────── email change ────────────┘
///
///   oauth_login (new email) ─────────────────────────────► Verified (oauth)
/// ```
///
/// Secondary side effects (issuing a token and mailing it after
/// registration, an email change or an unverified login) are best-effort:
/// failures are logged and the primary operation still succeeds.
///
/// # Example
///
/// ```no_run
/// use taskmate_shared::account::{Accounts, NewAccount};
/// use taskmate_shared::config::AccountSettings;
/// use taskmate_shared::mail::memory::RecordingMailer;
/// use taskmate_shared::store::memory::MemoryStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// let mailer = RecordingMailer::new();
/// let settings = AccountSettings::new("http://localhost:8080", "a-secret-key-that-is-at-least-32-bytes");
/// let accounts = Accounts::new(&store, &mailer, &settings);
///
/// let user = accounts
///     .register(NewAccount {
///         email: "a@x.io".to_string(),
///         password: "pw1".to_string(),
///         first_name: None,
///         last_name: None,
///     })
///     .await?;
/// assert!(!user.is_verified);
/// # Ok(())
/// # }
/// ```

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::authorization::{email_available, is_verified, require_self};
use crate::auth::jwt::create_access_token;
use crate::auth::middleware::AuthContext;
use crate::auth::password::{
    generate_temporary_password, generate_unusable_secret, hash_password, verify_password,
};
use crate::config::AccountSettings;
use crate::error::{ServiceError, ServiceResult};
use crate::mail::{dispatch, templates, Mailer};
use crate::models::user::{CreateUser, UpdateUser, User};
use crate::store::Store;
use crate::verification;

/// Registration input
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,

    pub password: String,

    pub first_name: Option<String>,

    pub last_name: Option<String>,
}

/// Profile update; only supplied fields change
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub email: Option<String>,

    pub password: Option<String>,

    pub first_name: Option<String>,

    pub last_name: Option<String>,
}

/// Identity asserted by an OAuth provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthIdentity {
    pub email: String,

    pub first_name: Option<String>,

    pub last_name: Option<String>,
}

/// Bearer token handed out on successful login
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessToken {
    pub access_token: String,

    pub token_type: String,
}

impl AccessToken {
    fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum OAuthOutcome {
    /// Existing OAuth account
    LoggedIn(AccessToken),

    /// Account created on this call; the client logs in again for a token
    Registered(User),
}

pub struct Accounts<'a> {
    store: &'a dyn Store,
    mailer: &'a dyn Mailer,
    settings: &'a AccountSettings,
}

impl<'a> Accounts<'a> {
    pub fn new(store: &'a dyn Store, mailer: &'a dyn Mailer, settings: &'a AccountSettings) -> Self {
        Self {
            store,
            mailer,
            settings,
        }
    }

    /// Creates an unverified account and mails a verification link
    ///
    /// # Errors
    ///
    /// `DuplicateEmail` if the email (case-insensitive) is taken
    pub async fn register(&self, input: NewAccount) -> ServiceResult<User> {
        if !email_available(self.store, &input.email).await? {
            return Err(ServiceError::DuplicateEmail(input.email));
        }

        let password_hash = hash_password(&input.password)?;

        let user = self
            .store
            .create_user(CreateUser {
                email: input.email.clone(),
                password_hash,
                first_name: input.first_name,
                last_name: input.last_name,
                is_verified: false,
                is_oauth: false,
            })
            .await
            .map_err(|e| ServiceError::from_user_write(e, &input.email))?;

        info!(user_id = %user.id, "User registered");

        self.send_verification(&user).await;

        Ok(user)
    }

    /// Exchanges credentials for an access token
    ///
    /// # Errors
    ///
    /// - `InvalidCredentials` for an unknown email or wrong password
    /// - `UnverifiedAccount` when the password is right but the email is
    ///   unverified (a fresh verification mail is sent first)
    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<AccessToken> {
        let user = self
            .store
            .find_user_by_email(email)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(ServiceError::InvalidCredentials);
        }

        if !is_verified(&user) {
            self.send_verification(&user).await;
            return Err(ServiceError::UnverifiedAccount("login"));
        }

        info!(user_id = %user.id, "User logged in");

        self.access_token_for(&user)
    }

    /// Logs in or registers an account asserted by the OAuth provider
    ///
    /// # Errors
    ///
    /// `DuplicateEmail` when a password account already owns the email
    pub async fn oauth_login(&self, identity: OAuthIdentity) -> ServiceResult<OAuthOutcome> {
        match self.store.find_user_by_email(&identity.email).await? {
            Some(user) if user.is_oauth => {
                info!(user_id = %user.id, "OAuth user logged in");
                Ok(OAuthOutcome::LoggedIn(self.access_token_for(&user)?))
            }
            Some(_) => Err(ServiceError::DuplicateEmail(identity.email)),
            None => {
                let password_hash = hash_password(&generate_unusable_secret())?;

                let user = self
                    .store
                    .create_user(CreateUser {
                        email: identity.email.clone(),
                        password_hash,
                        first_name: identity.first_name,
                        last_name: identity.last_name,
                        is_verified: true,
                        is_oauth: true,
                    })
                    .await
                    .map_err(|e| ServiceError::from_user_write(e, &identity.email))?;

                info!(user_id = %user.id, "OAuth user registered");
                Ok(OAuthOutcome::Registered(user))
            }
        }
    }

    /// Updates the caller's own profile
    ///
    /// Changing the email marks the account unverified and mails a
    /// verification link to the new address.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` unless `actor` is `user_id`
    /// - `EmailUnchanged` when the new email equals the current one
    /// - `DuplicateEmail` when another account owns the new email
    pub async fn update_profile(
        &self,
        actor: &AuthContext,
        user_id: Uuid,
        changes: ProfileChanges,
    ) -> ServiceResult<User> {
        require_self(actor, user_id)?;

        let user = self.find_user(user_id).await?;
        let mut update = UpdateUser::default();

        if let Some(email) = changes.email {
            if email.eq_ignore_ascii_case(&user.email) {
                return Err(ServiceError::EmailUnchanged);
            }
            if !email_available(self.store, &email).await? {
                return Err(ServiceError::DuplicateEmail(email));
            }
            update.email = Some(email);
            update.is_verified = Some(false);
        }

        if let Some(password) = changes.password {
            update.password_hash = Some(hash_password(&password)?);
        }
        update.first_name = changes.first_name;
        update.last_name = changes.last_name;

        if update.is_empty() {
            return Ok(user);
        }

        let email_changed = update.email.is_some();
        let attempted_email = update.email.clone().unwrap_or_default();

        let updated = self
            .store
            .update_user(user_id, update)
            .await
            .map_err(|e| ServiceError::from_user_write(e, &attempted_email))?
            .ok_or_else(|| user_not_found(user_id))?;

        info!(user_id = %user_id, email_changed, "User profile updated");

        if email_changed {
            self.send_verification(&updated).await;
        }

        Ok(updated)
    }

    /// Consumes a verification token and marks its account verified
    pub async fn verify_email(&self, token: i32) -> ServiceResult<User> {
        let user_id = verification::consume(self.store, token, Utc::now()).await?;

        let user = self
            .store
            .update_user(
                user_id,
                UpdateUser {
                    is_verified: Some(true),
                    ..Default::default()
                },
            )
            .await?
            .ok_or(ServiceError::InvalidOrExpiredToken)?;

        info!(user_id = %user.id, "Email verified");
        Ok(user)
    }

    /// Mails a password-reset link to the caller
    ///
    /// # Errors
    ///
    /// - `Unauthorized` unless `actor` is `user_id`
    /// - `UnverifiedAccount` for unverified accounts (verification re-sent)
    /// - `OAuthAccountForbidden` for accounts without a local password
    pub async fn request_password_reset(&self, actor: &AuthContext, user_id: Uuid) -> ServiceResult<()> {
        require_self(actor, user_id)?;

        let user = self.find_user(user_id).await?;

        if !is_verified(&user) {
            self.send_verification(&user).await;
            return Err(ServiceError::UnverifiedAccount("reset password"));
        }

        if user.is_oauth {
            return Err(ServiceError::OAuthAccountForbidden);
        }

        let record = verification::issue(self.store, user.id, Utc::now()).await?;
        let email = templates::password_reset_email(
            &user.email,
            &self.settings.base_url,
            user.id,
            record.token,
        );
        dispatch(self.mailer, email, self.settings.mail_timeout).await;

        info!(user_id = %user.id, "Password reset requested");
        Ok(())
    }

    /// Consumes a reset token and sets a fresh temporary password
    ///
    /// Returns the plaintext temporary password. A token bound to another
    /// user is rejected without being consumed.
    pub async fn reset_password(&self, user_id: Uuid, token: i32) -> ServiceResult<String> {
        let now = Utc::now();

        if verification::validate(self.store, token, now).await? != user_id {
            return Err(ServiceError::InvalidOrExpiredToken);
        }
        verification::consume(self.store, token, now).await?;

        let temporary = generate_temporary_password();

        self.store
            .update_user(
                user_id,
                UpdateUser {
                    password_hash: Some(hash_password(&temporary)?),
                    ..Default::default()
                },
            )
            .await?
            .ok_or_else(|| user_not_found(user_id))?;

        info!(user_id = %user_id, "Password reset");
        Ok(temporary)
    }

    async fn find_user(&self, user_id: Uuid) -> ServiceResult<User> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or_else(|| user_not_found(user_id))
    }

    fn access_token_for(&self, user: &User) -> ServiceResult<AccessToken> {
        let token = create_access_token(
            user.id,
            &user.email,
            self.settings.access_token_ttl,
            &self.settings.jwt_secret,
        )?;

        Ok(AccessToken::bearer(token))
    }

    /// Issues a token and mails the verification link; never fails
    async fn send_verification(&self, user: &User) {
        match verification::issue(self.store, user.id, Utc::now()).await {
            Ok(record) => {
                let email =
                    templates::verification_email(&user.email, &self.settings.base_url, record.token);
                dispatch(self.mailer, email, self.settings.mail_timeout).await;
            }
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "Could not issue verification token");
            }
        }
    }
}

fn user_not_found(user_id: Uuid) -> ServiceError {
    ServiceError::not_found(format!("user with id: {} does not exist", user_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::validate_token;
    use crate::mail::memory::RecordingMailer;
    use crate::store::memory::MemoryStore;
    use crate::store::{UserRepository, VerificationRepository};

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    struct Harness {
        store: MemoryStore,
        mailer: RecordingMailer,
        settings: AccountSettings,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_mailer(RecordingMailer::new())
        }

        fn with_mailer(mailer: RecordingMailer) -> Self {
            Self {
                store: MemoryStore::new(),
                mailer,
                settings: AccountSettings::new("http://localhost:8080", SECRET),
            }
        }

        fn accounts(&self) -> Accounts<'_> {
            Accounts::new(&self.store, &self.mailer, &self.settings)
        }

        async fn register(&self, email: &str, password: &str) -> User {
            self.accounts()
                .register(NewAccount {
                    email: email.to_string(),
                    password: password.to_string(),
                    first_name: Some("Ada".to_string()),
                    last_name: None,
                })
                .await
                .unwrap()
        }

        async fn token_of(&self, user_id: Uuid) -> i32 {
            self.store
                .find_token_for_user(user_id)
                .await
                .unwrap()
                .expect("token issued")
                .token
        }

        async fn verified(&self, email: &str, password: &str) -> User {
            let user = self.register(email, password).await;
            let token = self.token_of(user.id).await;
            self.accounts().verify_email(token).await.unwrap()
        }
    }

    fn actor(user: &User) -> AuthContext {
        AuthContext {
            user_id: user.id,
            email: user.email.clone(),
        }
    }

    #[tokio::test]
    async fn test_register_creates_unverified_user_and_mails_link() {
        let h = Harness::new();
        let user = h.register("a@x.io", "pw1").await;

        assert!(!user.is_verified);
        assert!(!user.is_oauth);
        assert_ne!(user.password_hash, "pw1");

        let token = h.token_of(user.id).await;
        let mail = h.mailer.last_to("a@x.io").unwrap();
        assert!(mail
            .body
            .contains(&format!("http://localhost:8080/users/verify-email?token={}", token)));
    }

    #[tokio::test]
    async fn test_register_duplicate_email_is_case_insensitive() {
        let h = Harness::new();
        h.register("a@x.io", "pw1").await;

        let result = h
            .accounts()
            .register(NewAccount {
                email: "A@X.io".to_string(),
                password: "pw2".to_string(),
                first_name: None,
                last_name: None,
            })
            .await;

        assert!(matches!(result, Err(ServiceError::DuplicateEmail(_))));
    }

    #[tokio::test]
    async fn test_register_succeeds_when_mail_fails() {
        let h = Harness::with_mailer(RecordingMailer::failing());
        let user = h.register("a@x.io", "pw1").await;

        assert!(h.store.find_token_for_user(user.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_login_unverified_resends_token() {
        let h = Harness::new();
        let user = h.register("a@x.io", "pw1").await;
        let first = h.token_of(user.id).await;

        let result = h.accounts().login("a@x.io", "pw1").await;
        assert!(matches!(result, Err(ServiceError::UnverifiedAccount("login"))));

        assert_eq!(h.mailer.sent_to("a@x.io").len(), 2);
        let second = h.token_of(user.id).await;
        if first != second {
            assert!(h.store.find_token(first).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn test_login_wrong_password_or_unknown_email() {
        let h = Harness::new();
        h.verified("a@x.io", "pw1").await;

        assert!(matches!(
            h.accounts().login("a@x.io", "nope").await,
            Err(ServiceError::InvalidCredentials)
        ));
        assert!(matches!(
            h.accounts().login("ghost@x.io", "pw1").await,
            Err(ServiceError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_verified_login_returns_bearer_token() {
        let h = Harness::new();
        let user = h.verified("a@x.io", "pw1").await;
        assert!(user.is_verified);

        let token = h.accounts().login("a@x.io", "pw1").await.unwrap();
        assert_eq!(token.token_type, "bearer");

        let claims = validate_token(&token.access_token, SECRET).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.user_email, "a@x.io");
    }

    #[tokio::test]
    async fn test_verify_email_token_is_single_use() {
        let h = Harness::new();
        let user = h.register("a@x.io", "pw1").await;
        let token = h.token_of(user.id).await;

        h.accounts().verify_email(token).await.unwrap();
        assert!(matches!(
            h.accounts().verify_email(token).await,
            Err(ServiceError::InvalidOrExpiredToken)
        ));
    }

    #[tokio::test]
    async fn test_update_profile_requires_self() {
        let h = Harness::new();
        let a = h.verified("a@x.io", "pw1").await;
        let b = h.verified("b@x.io", "pw1").await;

        let result = h
            .accounts()
            .update_profile(&actor(&a), b.id, ProfileChanges::default())
            .await;
        assert!(matches!(result, Err(ServiceError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_update_profile_email_rules() {
        let h = Harness::new();
        let a = h.verified("a@x.io", "pw1").await;
        h.verified("b@x.io", "pw1").await;

        let same = h
            .accounts()
            .update_profile(
                &actor(&a),
                a.id,
                ProfileChanges {
                    email: Some("a@x.io".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(same, Err(ServiceError::EmailUnchanged)));

        let taken = h
            .accounts()
            .update_profile(
                &actor(&a),
                a.id,
                ProfileChanges {
                    email: Some("b@x.io".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(taken, Err(ServiceError::DuplicateEmail(_))));
    }

    #[tokio::test]
    async fn test_email_change_unverifies_and_mails_new_address() {
        let h = Harness::new();
        let a = h.verified("a@x.io", "pw1").await;

        let updated = h
            .accounts()
            .update_profile(
                &actor(&a),
                a.id,
                ProfileChanges {
                    email: Some("new@x.io".to_string()),
                    first_name: Some("Grace".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.email, "new@x.io");
        assert_eq!(updated.first_name.as_deref(), Some("Grace"));
        assert!(!updated.is_verified);
        assert!(h.mailer.last_to("new@x.io").is_some());
    }

    #[tokio::test]
    async fn test_password_change_is_hashed() {
        let h = Harness::new();
        let a = h.verified("a@x.io", "pw1").await;

        h.accounts()
            .update_profile(
                &actor(&a),
                a.id,
                ProfileChanges {
                    password: Some("pw2".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(h.accounts().login("a@x.io", "pw2").await.is_ok());
        assert!(h.accounts().login("a@x.io", "pw1").await.is_err());
    }

    #[tokio::test]
    async fn test_password_reset_flow() {
        let h = Harness::new();
        let a = h.verified("a@x.io", "pw1").await;

        h.accounts().request_password_reset(&actor(&a), a.id).await.unwrap();
        let token = h.token_of(a.id).await;
        let mail = h.mailer.last_to("a@x.io").unwrap();
        assert!(mail
            .body
            .contains(&format!("/users/{}/reset-password?token={}", a.id, token)));

        let temporary = h.accounts().reset_password(a.id, token).await.unwrap();
        assert_eq!(temporary.len(), 8);

        assert!(h.accounts().login("a@x.io", &temporary).await.is_ok());
        assert!(matches!(
            h.accounts().login("a@x.io", "pw1").await,
            Err(ServiceError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_reset_with_foreign_token_does_not_consume_it() {
        let h = Harness::new();
        let a = h.verified("a@x.io", "pw1").await;
        let b = h.verified("b@x.io", "pw1").await;

        h.accounts().request_password_reset(&actor(&b), b.id).await.unwrap();
        let b_token = h.token_of(b.id).await;

        assert!(matches!(
            h.accounts().reset_password(a.id, b_token).await,
            Err(ServiceError::InvalidOrExpiredToken)
        ));
        assert!(h.accounts().reset_password(b.id, b_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_reset_request_rejects_unverified_and_oauth() {
        let h = Harness::new();
        let unverified = h.register("a@x.io", "pw1").await;

        let result = h
            .accounts()
            .request_password_reset(&actor(&unverified), unverified.id)
            .await;
        assert!(matches!(result, Err(ServiceError::UnverifiedAccount("reset password"))));

        let OAuthOutcome::Registered(oauth) = h
            .accounts()
            .oauth_login(OAuthIdentity {
                email: "g@x.io".to_string(),
                first_name: None,
                last_name: None,
            })
            .await
            .unwrap()
        else {
            panic!("expected registration");
        };

        let result = h.accounts().request_password_reset(&actor(&oauth), oauth.id).await;
        assert!(matches!(result, Err(ServiceError::OAuthAccountForbidden)));
    }

    #[tokio::test]
    async fn test_oauth_login_lifecycle() {
        let h = Harness::new();
        let identity = OAuthIdentity {
            email: "g@x.io".to_string(),
            first_name: Some("G".to_string()),
            last_name: None,
        };

        let first = h.accounts().oauth_login(identity.clone()).await.unwrap();
        let OAuthOutcome::Registered(user) = first else {
            panic!("expected registration");
        };
        assert!(user.is_verified);
        assert!(user.is_oauth);
        assert!(!user.password_hash.is_empty());

        let second = h.accounts().oauth_login(identity).await.unwrap();
        let OAuthOutcome::LoggedIn(token) = second else {
            panic!("expected login");
        };
        assert_eq!(validate_token(&token.access_token, SECRET).unwrap().sub, user.id);
    }

    #[tokio::test]
    async fn test_oauth_login_conflicts_with_password_account() {
        let h = Harness::new();
        h.register("a@x.io", "pw1").await;

        let result = h
            .accounts()
            .oauth_login(OAuthIdentity {
                email: "a@x.io".to_string(),
                first_name: None,
                last_name: None,
            })
            .await;
        assert!(matches!(result, Err(ServiceError::DuplicateEmail(_))));
    }

    #[tokio::test]
    async fn test_update_profile_missing_user() {
        let h = Harness::new();
        let ghost = Uuid::new_v4();
        let auth = AuthContext {
            user_id: ghost,
            email: "ghost@x.io".to_string(),
        };

        let result = h
            .accounts()
            .update_profile(&auth, ghost, ProfileChanges::default())
            .await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
        assert!(h.store.find_user(ghost).await.unwrap().is_none());
    }
}
