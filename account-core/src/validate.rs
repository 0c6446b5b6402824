//! Username validation.
//!
//! The account service warns about malformed usernames but does not reject
//! them; enforcement would be a behavior change for existing accounts, so
//! the checks stay advisory. Callers log the warnings and proceed.

use thiserror::Error;

/// Characters flagged by [`validate_username`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UsernameWarning {
    /// The username contains a backslash.
    #[error(r#"usernames may not contain "\""#)]
    Backslash,
    /// The username contains an apostrophe.
    #[error(r#"usernames may not contain "'""#)]
    Apostrophe,
}

/// Check a username for characters the account service warns about.
///
/// Returns every applicable warning; an empty list means the name is clean.
/// Warnings are advisory only - no caller rejects on them.
pub fn validate_username(username: &str) -> Vec<UsernameWarning> {
    let mut warnings = Vec::new();

    if username.contains('\\') {
        warnings.push(UsernameWarning::Backslash);
    }
    if username.contains('\'') {
        warnings.push(UsernameWarning::Apostrophe);
    }

    warnings
}
