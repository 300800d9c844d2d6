use std::sync::OnceLock;

use log::*;
use regex::Regex;

use crate::{
    data_objects::{AuthResponse, LoginRequest, RegisterRequest, User},
    storage::{ClientStorage, AUTH_TOKEN, AUTH_USER},
    StorefrontApi,
    StorefrontApiError,
};

pub const MIN_PASSWORD_LENGTH: usize = 6;

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"))
}

pub fn validate_email(email: &str) -> Result<(), StorefrontApiError> {
    if email.trim().is_empty() {
        return Err(StorefrontApiError::Validation("Email is required".into()));
    }
    if !email_regex().is_match(email) {
        return Err(StorefrontApiError::Validation(format!("'{email}' is not a valid email address")));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), StorefrontApiError> {
    if password.is_empty() {
        return Err(StorefrontApiError::Validation("Password is required".into()));
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(StorefrontApiError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Checks the credentials locally, signs in and stores the session.
pub async fn login<S: ClientStorage + ?Sized>(
    api: &StorefrontApi,
    storage: &S,
    email: &str,
    password: &str,
) -> Result<User, StorefrontApiError> {
    validate_email(email)?;
    validate_password(password)?;
    let credentials = LoginRequest { email: email.trim().to_string(), password: password.to_string() };
    let response = api.login(&credentials).await?;
    store_session(storage, &response)
}

pub async fn register<S: ClientStorage + ?Sized>(
    api: &StorefrontApi,
    storage: &S,
    details: RegisterRequest,
) -> Result<User, StorefrontApiError> {
    if details.name.trim().is_empty() {
        return Err(StorefrontApiError::Validation("Name is required".into()));
    }
    validate_email(&details.email)?;
    validate_password(&details.password)?;
    let response = api.register(&details).await?;
    store_session(storage, &response)
}

/// Ends the session. The server call is best effort; local credentials are always removed.
pub async fn logout<S: ClientStorage + ?Sized>(api: &StorefrontApi, storage: &S) -> Result<(), StorefrontApiError> {
    if api.is_authenticated() {
        if let Err(e) = api.logout().await {
            debug!("🔑️ Server-side logout failed, clearing local session anyway. {e}");
        }
    }
    storage.remove(AUTH_TOKEN)?;
    storage.remove(AUTH_USER)?;
    info!("🔑️ Logged out");
    Ok(())
}

/// The signed-in user as last stored, if any.
pub fn current_user<S: ClientStorage + ?Sized>(storage: &S) -> Option<User> {
    storage.get(AUTH_USER).and_then(|raw| serde_json::from_str(&raw).ok())
}

fn store_session<S: ClientStorage + ?Sized>(storage: &S, response: &AuthResponse) -> Result<User, StorefrontApiError> {
    storage.set(AUTH_TOKEN, &response.token)?;
    let user = serde_json::to_string(&response.user).map_err(|e| StorefrontApiError::JsonError(e.to_string()))?;
    storage.set(AUTH_USER, &user)?;
    Ok(response.user.clone())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn emails() {
        assert!(validate_email("ana@example.com").is_ok());
        assert!(validate_email("a@b.co").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("ana@example").is_err());
        assert!(validate_email("ana example@x.com").is_err());
    }

    #[test]
    fn passwords() {
        assert!(validate_password("secreto").is_ok());
        assert!(validate_password("ñandú1").is_ok());
        assert!(validate_password("12345").is_err());
        assert!(validate_password("").is_err());
    }

    #[test]
    fn session_storage() {
        let store = MemoryStorage::new();
        let response = AuthResponse {
            token: "tok-1".into(),
            user: User { name: "Ana".into(), email: "ana@example.com".into(), ..Default::default() },
        };
        let user = store_session(&store, &response).unwrap();
        assert_eq!(user.email, "ana@example.com");
        assert_eq!(store.get(AUTH_TOKEN).as_deref(), Some("tok-1"));
        assert_eq!(current_user(&store).map(|u| u.name), Some("Ana".to_string()));
    }

    #[tokio::test]
    async fn logout_clears_local_session_without_token() {
        let store = MemoryStorage::new();
        store.set(AUTH_USER, "{}").unwrap();
        let api = StorefrontApi::new("http://localhost:1").unwrap();
        logout(&api, &store).await.unwrap();
        assert_eq!(store.get(AUTH_USER), None);
    }
}
