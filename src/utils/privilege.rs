use nix::unistd::Uid;

use crate::error::CloneError;

pub fn is_root() -> bool {
    Uid::effective().is_root()
}

/// Fail unless running with an effective UID of 0.
pub fn require_root() -> Result<(), CloneError> {
    if is_root() {
        Ok(())
    } else {
        Err(CloneError::NotRoot)
    }
}
