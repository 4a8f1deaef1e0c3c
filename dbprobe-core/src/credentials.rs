//! Login credentials with automatic memory zeroing.
//!
//! Both the user and the password are optional: an absent user selects the
//! driver's external or OS authentication where it has one.

use std::fmt;
use zeroize::{Zeroize, Zeroizing};

/// Credential container that zeros its memory on drop.
///
/// # Example
///
/// ```rust
/// use dbprobe_core::credentials::Credentials;
///
/// let creds = Credentials::new(Some("scott".to_string()), Some("tiger".to_string()));
/// assert_eq!(creds.user(), Some("scott"));
/// assert!(creds.has_password());
/// assert!(!format!("{creds:?}").contains("tiger"));
/// ```
#[derive(Clone, Default, Zeroize)]
#[zeroize(drop)]
pub struct Credentials {
    user: Zeroizing<Option<String>>,
    password: Zeroizing<Option<String>>,
}

impl Credentials {
    /// Creates credentials from optional user and password values.
    pub fn new(user: Option<String>, password: Option<String>) -> Self {
        Self {
            user: Zeroizing::new(user),
            password: Zeroizing::new(password),
        }
    }

    /// The user name, if one was configured.
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// The password, if one was configured.
    ///
    /// Only drivers should call this; never log the result.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Checks if a password is present without exposing it.
    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    /// Fills in missing fields from another set of credentials.
    ///
    /// Values already present take precedence.
    pub fn or(&self, fallback: &Self) -> Self {
        Self::new(
            self.user().or_else(|| fallback.user()).map(str::to_string),
            self.password()
                .or_else(|| fallback.password())
                .map(str::to_string),
        )
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user())
            .field("password", &self.password.as_ref().map(|_| "****"))
            .finish()
    }
}
