//! Session lifecycle and user identity tokens (C6, §4.6).

mod identity;
mod session;

pub use identity::{UserIdentityToken, UserTokenSignature};
pub use session::{CreateSessionResult, Session, SessionState, SessionTable};
