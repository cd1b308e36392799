//! Authorization gate for the Matrix adapter.
//!
//! Unlike a static config allowlist, Matrix identities are authorized through
//! a code handshake: an unrecognized user receives a short-lived code to
//! redeem through the web UI or an `/auth <code>` command, backed by
//! `aegis-users`'s per-platform `AuthStore`.

use aegis_users::auth::{AuthCheck, AuthStore};

pub const PLATFORM: &str = "matrix";

/// Check whether `matrix_user_id` (e.g. `@alice:example.org`) may use the
/// bot. `Ok(())` means authorized; `Err(reply)` carries the message to send
/// back — either a fresh/still-live authorization code, or a failure note.
pub fn check(store: &AuthStore, matrix_user_id: &str) -> Result<(), String> {
    match store.check(PLATFORM, matrix_user_id) {
        Ok(AuthCheck::Authorized) => Ok(()),
        Ok(AuthCheck::PendingCode(code)) => Err(format!(
            "You're not authorized yet. Link this account with code **{code}** \
             via the web UI, or reply `/auth {code}` from an already-authorized \
             session. The code expires in 30 minutes.",
        )),
        Err(e) => Err(format!("authorization check failed: {e}")),
    }
}

/// Redeem a code typed as `/auth <code>` in an already-authorized session,
/// on behalf of a *different* unauthorized identity that requested it.
pub fn redeem(store: &AuthStore, code: &str) -> Result<(String, String), String> {
    store.redeem(code).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, AuthStore) {
        let tmp = tempfile::tempdir().unwrap();
        let s = AuthStore::load(tmp.path()).unwrap();
        (tmp, s)
    }

    #[test]
    fn unknown_identity_is_denied_with_a_code() {
        let (_tmp, s) = store();
        let err = check(&s, "@alice:example.org").unwrap_err();
        assert!(err.contains("not authorized"));
    }

    #[test]
    fn repeated_check_gives_same_code() {
        let (_tmp, s) = store();
        let first = check(&s, "@alice:example.org").unwrap_err();
        let second = check(&s, "@alice:example.org").unwrap_err();
        assert_eq!(first, second);
    }

    #[test]
    fn authorized_identity_passes() {
        let (_tmp, s) = store();
        let err = check(&s, "@alice:example.org").unwrap_err();
        let code = err.split("**").nth(1).unwrap();
        redeem(&s, code).unwrap();
        assert!(check(&s, "@alice:example.org").is_ok());
    }

    #[test]
    fn distinct_identities_do_not_share_authorization() {
        let (_tmp, s) = store();
        let err = check(&s, "@alice:example.org").unwrap_err();
        let code = err.split("**").nth(1).unwrap();
        redeem(&s, code).unwrap();
        assert!(check(&s, "@alice:example.org").is_ok());
        assert!(check(&s, "@bob:example.org").is_err());
    }

    #[test]
    fn redeeming_unknown_code_fails() {
        let (_tmp, s) = store();
        assert!(redeem(&s, "NOPECODE").is_err());
    }
}
