pub mod account;
#[cfg(test)]
pub mod memory;

pub use account::{AccountRepository, PgAccountRepository};
#[cfg(test)]
pub use memory::InMemoryAccountRepository;
