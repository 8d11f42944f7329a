//! Cookie session keys.

/// Raw (unescaped) nickname of the logged-in user.
pub const NICKNAME: &str = "nickname";
