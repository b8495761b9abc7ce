pub mod health;
pub mod password_reset;

pub use health::health_check;
pub use password_reset::{forgot_password, reset_password};
