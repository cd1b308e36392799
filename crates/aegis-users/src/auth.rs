use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, UserError};

/// Codes are drawn from an alphabet that excludes visually ambiguous glyphs
/// (0/O, 1/I/L) so a user reading the code aloud or off a small screen
/// doesn't transcribe it wrong.
const CODE_ALPHABET: &[u8] = b"23456789ABCDEFGHJKMNPQRSTUVWXYZ";
const CODE_LEN: usize = 8;
const CODE_TTL: chrono::Duration = chrono::Duration::minutes(30);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingCode {
    pub platform: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct AuthorizedIdentity {
    pub platform: String,
    pub user_id: String,
}

/// Outcome of presenting an inbound identity to the handshake.
#[derive(Debug, Clone)]
pub enum AuthCheck {
    Authorized,
    /// Not yet authorized; here is the code to relay back to the user
    /// (freshly generated, or the still-live one from an earlier request).
    PendingCode(String),
}

/// Per-platform authorization state, persisted as two JSON files.
///
/// `authorized.json` holds every identity that has completed the handshake;
/// `pending_codes.json` holds outstanding codes awaiting redemption. Both
/// are rewritten atomically (write to a `.tmp` sibling, then rename) on
/// every mutation so a crash mid-write never leaves a truncated file.
pub struct AuthStore {
    dir: PathBuf,
    authorized: Mutex<Vec<AuthorizedIdentity>>,
    pending: Mutex<HashMap<String, PendingCode>>,
}

impl AuthStore {
    /// Load (or initialize) the store rooted at `auth_dir`. Migrates legacy
    /// `matrix/matrix_{pending,authorized}.json` files into the unified
    /// shape on first access, then leaves the legacy files untouched.
    pub fn load(auth_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(auth_dir).map_err(UserError::Io)?;

        let mut authorized = read_json_or_default::<Vec<AuthorizedIdentity>>(
            &auth_dir.join("authorized.json"),
        )?;
        let mut pending = read_json_or_default::<HashMap<String, PendingCode>>(
            &auth_dir.join("pending_codes.json"),
        )?;

        migrate_legacy_matrix_files(auth_dir, &mut authorized, &mut pending)?;

        let store = Self {
            dir: auth_dir.to_path_buf(),
            authorized: Mutex::new(authorized),
            pending: Mutex::new(pending),
        };
        store.persist_authorized()?;
        store.persist_pending()?;
        Ok(store)
    }

    /// Check whether (platform, user_id) has completed the handshake. If
    /// not, issue (or re-issue) a code and return it for the caller to
    /// relay back over the originating chat surface.
    pub fn check(&self, platform: &str, user_id: &str) -> Result<AuthCheck> {
        if self.is_authorized(platform, user_id) {
            return Ok(AuthCheck::Authorized);
        }

        let now = Utc::now();
        let mut pending = self.pending.lock().unwrap();

        // Re-requests before expiry return the same code rather than
        // minting a new one every retry.
        if let Some((code, _)) = pending
            .iter()
            .find(|(_, p)| p.platform == platform && p.user_id == user_id && p.expires_at > now)
        {
            return Ok(AuthCheck::PendingCode(code.clone()));
        }

        let code = generate_unused_code(&pending);
        pending.insert(
            code.clone(),
            PendingCode {
                platform: platform.to_string(),
                user_id: user_id.to_string(),
                expires_at: now + CODE_TTL,
            },
        );
        drop(pending);
        self.persist_pending()?;
        info!(platform, user_id, "issued authorization code");
        Ok(AuthCheck::PendingCode(code))
    }

    pub fn is_authorized(&self, platform: &str, user_id: &str) -> bool {
        self.authorized
            .lock()
            .unwrap()
            .iter()
            .any(|a| a.platform == platform && a.user_id == user_id)
    }

    /// Redeem a code: consumes it (single-use) and adds the identity to the
    /// authorized set. Returns the (platform, user_id) it unlocked.
    pub fn redeem(&self, code: &str) -> Result<(String, String)> {
        let entry = {
            let mut pending = self.pending.lock().unwrap();
            pending.remove(code)
        };
        self.persist_pending()?;

        let entry = entry.ok_or_else(|| UserError::InvalidCode(code.to_string()))?;
        if entry.expires_at < Utc::now() {
            return Err(UserError::CodeExpired(code.to_string()));
        }

        let identity = AuthorizedIdentity {
            platform: entry.platform.clone(),
            user_id: entry.user_id.clone(),
        };
        {
            let mut authorized = self.authorized.lock().unwrap();
            if !authorized.contains(&identity) {
                authorized.push(identity);
            }
        }
        self.persist_authorized()?;
        info!(platform = %entry.platform, user_id = %entry.user_id, "authorization code redeemed");
        Ok((entry.platform, entry.user_id))
    }

    /// All identities authorized on `platform`, for notification fan-out.
    pub fn authorized_on(&self, platform: &str) -> Vec<String> {
        self.authorized
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.platform == platform)
            .map(|a| a.user_id.clone())
            .collect()
    }

    /// All authorized identities across every platform, keyed by platform.
    pub fn all_authorized(&self) -> Vec<AuthorizedIdentity> {
        self.authorized.lock().unwrap().clone()
    }

    fn persist_authorized(&self) -> Result<()> {
        let snapshot = self.authorized.lock().unwrap().clone();
        write_json_atomic(&self.dir.join("authorized.json"), &snapshot)
    }

    fn persist_pending(&self) -> Result<()> {
        // Drop expired codes on every write so the file doesn't grow unbounded.
        let now = Utc::now();
        let mut pending = self.pending.lock().unwrap();
        pending.retain(|_, p| p.expires_at > now);
        let snapshot = pending.clone();
        drop(pending);
        write_json_atomic(&self.dir.join("pending_codes.json"), &snapshot)
    }
}

fn generate_unused_code(existing: &HashMap<String, PendingCode>) -> String {
    loop {
        let code = generate_code();
        if !existing.contains_key(&code) {
            return code;
        }
    }
}

/// Deterministic pseudo-random code draw seeded off the current timestamp,
/// avoiding a rand dependency for a one-shot, low-volume operation.
fn generate_code() -> String {
    let mut seed = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);

    let mut out = String::with_capacity(CODE_LEN);
    for _ in 0..CODE_LEN {
        // xorshift-ish mixing so consecutive draws within the same nanosecond
        // tick (unlikely but possible under load) don't all collide.
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        let idx = (seed as usize) % CODE_ALPHABET.len();
        out.push(CODE_ALPHABET[idx] as char);
    }
    out
}

fn read_json_or_default<T: Default + for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            serde_json::from_str(&contents).map_err(|e| UserError::Corrupt(path.display().to_string(), e.to_string()))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(UserError::Io(e)),
    }
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    let contents = serde_json::to_string_pretty(value)
        .map_err(|e| UserError::Corrupt(path.display().to_string(), e.to_string()))?;
    std::fs::write(&tmp, contents).map_err(UserError::Io)?;
    std::fs::rename(&tmp, path).map_err(UserError::Io)?;
    Ok(())
}

/// One-time upgrade of the Matrix-only predecessor format into the unified
/// per-platform shape. Leaves the legacy files in place; only reads them
/// when the unified files are both still empty, so re-runs are harmless.
fn migrate_legacy_matrix_files(
    auth_dir: &Path,
    authorized: &mut Vec<AuthorizedIdentity>,
    pending: &mut HashMap<String, PendingCode>,
) -> Result<()> {
    if !authorized.is_empty() || !pending.is_empty() {
        return Ok(());
    }

    let legacy_dir = auth_dir
        .parent()
        .map(|p| p.join("matrix"))
        .unwrap_or_else(|| PathBuf::from("matrix"));

    let legacy_authorized = legacy_dir.join("matrix_authorized.json");
    if let Ok(contents) = std::fs::read_to_string(&legacy_authorized) {
        if let Ok(ids) = serde_json::from_str::<Vec<String>>(&contents) {
            warn!(count = ids.len(), "migrating legacy matrix_authorized.json");
            for user_id in ids {
                authorized.push(AuthorizedIdentity {
                    platform: "matrix".to_string(),
                    user_id,
                });
            }
        }
    }

    let legacy_pending = legacy_dir.join("matrix_pending.json");
    if let Ok(contents) = std::fs::read_to_string(&legacy_pending) {
        if let Ok(codes) = serde_json::from_str::<HashMap<String, String>>(&contents) {
            warn!(count = codes.len(), "migrating legacy matrix_pending.json");
            for (code, user_id) in codes {
                pending.insert(
                    code,
                    PendingCode {
                        platform: "matrix".to_string(),
                        user_id,
                        expires_at: Utc::now() + CODE_TTL,
                    },
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &Path) -> AuthStore {
        AuthStore::load(dir).unwrap()
    }

    #[test]
    fn unknown_identity_gets_a_code() {
        let tmp = tempfile::tempdir().unwrap();
        let s = store(tmp.path());
        match s.check("matrix", "@alice:example.org").unwrap() {
            AuthCheck::PendingCode(code) => assert_eq!(code.len(), CODE_LEN),
            AuthCheck::Authorized => panic!("should not be authorized yet"),
        }
    }

    #[test]
    fn repeated_check_returns_same_code() {
        let tmp = tempfile::tempdir().unwrap();
        let s = store(tmp.path());
        let first = match s.check("discord", "123").unwrap() {
            AuthCheck::PendingCode(c) => c,
            _ => panic!(),
        };
        let second = match s.check("discord", "123").unwrap() {
            AuthCheck::PendingCode(c) => c,
            _ => panic!(),
        };
        assert_eq!(first, second);
    }

    #[test]
    fn redeem_authorizes_identity() {
        let tmp = tempfile::tempdir().unwrap();
        let s = store(tmp.path());
        let code = match s.check("matrix", "@bob:example.org").unwrap() {
            AuthCheck::PendingCode(c) => c,
            _ => panic!(),
        };
        let (platform, user_id) = s.redeem(&code).unwrap();
        assert_eq!(platform, "matrix");
        assert_eq!(user_id, "@bob:example.org");
        assert!(matches!(
            s.check("matrix", "@bob:example.org").unwrap(),
            AuthCheck::Authorized
        ));
    }

    #[test]
    fn redeeming_twice_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let s = store(tmp.path());
        let code = match s.check("matrix", "@carol:example.org").unwrap() {
            AuthCheck::PendingCode(c) => c,
            _ => panic!(),
        };
        s.redeem(&code).unwrap();
        assert!(s.redeem(&code).is_err());
    }

    #[test]
    fn unknown_code_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let s = store(tmp.path());
        assert!(s.redeem("NOPE0000").is_err());
    }

    #[test]
    fn authorization_survives_reload() {
        let tmp = tempfile::tempdir().unwrap();
        {
            let s = store(tmp.path());
            let code = match s.check("discord", "42").unwrap() {
                AuthCheck::PendingCode(c) => c,
                _ => panic!(),
            };
            s.redeem(&code).unwrap();
        }
        let reloaded = store(tmp.path());
        assert!(matches!(
            reloaded.check("discord", "42").unwrap(),
            AuthCheck::Authorized
        ));
    }

    #[test]
    fn authorized_on_filters_by_platform() {
        let tmp = tempfile::tempdir().unwrap();
        let s = store(tmp.path());
        for (platform, uid) in [("matrix", "a"), ("matrix", "b"), ("discord", "c")] {
            let code = match s.check(platform, uid).unwrap() {
                AuthCheck::PendingCode(c) => c,
                _ => panic!(),
            };
            s.redeem(&code).unwrap();
        }
        let mut matrix_ids = s.authorized_on("matrix");
        matrix_ids.sort();
        assert_eq!(matrix_ids, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(s.authorized_on("discord"), vec!["c".to_string()]);
    }
}
