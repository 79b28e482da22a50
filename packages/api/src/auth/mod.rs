//! Authentication: password hashing, session tokens and the request gate.

mod gate;
mod password;
mod session;

pub use gate::{authorize, identify};
pub use password::{hash_password, verify_password};
pub use session::{SessionCodec, SESSION_COOKIE, TOKEN_TTL_DAYS};
