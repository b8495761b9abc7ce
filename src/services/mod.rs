pub mod notifier;
pub mod password;
pub mod password_reset;
pub mod token;

pub use notifier::{EmailNotifier, Notifier};
pub use password::{Argon2Hasher, PasswordHasher};
pub use password_reset::{PasswordResetService, ResetSettings};
pub use token::{TokenIssuer, TokenValidator};
