mod password;
pub use password::{hash_password, is_strong_password, verify_password};
mod jwt;
pub use jwt::{UserClaims, generate_token, process_token};
mod error;
pub use error::{CryptError, CryptResult};
