/// Cryptography module for credentials and session tokens
///
/// Handles PBKDF2 password hashing and signing/verification of bearer tokens

pub mod password;
pub mod token;

pub use password::PasswordHasher;
pub use token::{TokenError, TokenIssuer, VerifiedToken};
