//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports [`secrecy`] so that every crate depending on `auth-core` wraps
//! signing secrets and bearer tokens in the same types. `SecretString` and
//! `SecretBox<T>` implement `Debug` with redaction, so deriving `Debug` on a
//! struct that holds them is safe. Values are zeroized on drop.
//!
//! ```rust
//! use auth_core::secret::{ExposeSecret, SecretString};
//!
//! let secret = SecretString::from("signing-secret");
//! assert!(!format!("{secret:?}").contains("signing-secret"));
//! assert_eq!(secret.expose_secret(), "signing-secret");
//! ```

pub use secrecy::{ExposeSecret, SecretBox, SecretString};
