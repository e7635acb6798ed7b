//! Token-based authenticator: a `tokens` key-value bucket (key == value,
//! same shape as a BoltDB bucket), with JSON export/import for backup and
//! migration. When no auth database is configured, [`TokenStore::Disabled`]
//! accepts every token so a deployment can opt out entirely.

use std::path::Path;

use thiserror::Error;

const TOKENS_TREE: &str = "tokens";
const MAX_IMPORT_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("auth storage error: {0}")]
    Storage(#[from] sled::Error),
    #[error("token export/import serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// A pluggable token store. `Sled` is the default, `sled::Tree`-backed
/// implementation; `Disabled` is used when no auth DB path is configured.
pub enum TokenStore {
    Sled { db: sled::Db },
    Disabled,
}

impl TokenStore {
    pub fn open(path: &Path) -> AuthResult<Self> {
        let db = sled::open(path)?;
        Ok(TokenStore::Sled { db })
    }

    pub fn disabled() -> Self {
        TokenStore::Disabled
    }

    #[cfg(test)]
    pub fn open_temporary() -> (Self, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = sled::open(dir.path()).expect("open sled db");
        (TokenStore::Sled { db }, dir)
    }

    pub fn add(&self, token: &str) -> AuthResult<()> {
        match self {
            TokenStore::Disabled => Ok(()),
            TokenStore::Sled { db } => {
                let tree = db.open_tree(TOKENS_TREE)?;
                tree.insert(token.as_bytes(), token.as_bytes())?;
                tree.flush()?;
                Ok(())
            }
        }
    }

    pub fn remove(&self, token: &str) -> AuthResult<()> {
        match self {
            TokenStore::Disabled => Ok(()),
            TokenStore::Sled { db } => {
                let tree = db.open_tree(TOKENS_TREE)?;
                tree.remove(token.as_bytes())?;
                tree.flush()?;
                Ok(())
            }
        }
    }

    /// An empty token is never valid. A disabled store treats every
    /// non-empty token as valid, matching the Go original's "no
    /// authenticator configured" passthrough.
    pub fn valid(&self, token: &str) -> bool {
        if token.is_empty() {
            return false;
        }
        match self {
            TokenStore::Disabled => true,
            TokenStore::Sled { db } => {
                let Ok(tree) = db.open_tree(TOKENS_TREE) else {
                    return false;
                };
                matches!(tree.get(token.as_bytes()), Ok(Some(v)) if v.as_ref() == token.as_bytes())
            }
        }
    }

    /// JSON string array of every stored token.
    pub fn export(&self) -> AuthResult<Vec<u8>> {
        let tokens: Vec<String> = match self {
            TokenStore::Disabled => Vec::new(),
            TokenStore::Sled { db } => {
                let tree = db.open_tree(TOKENS_TREE)?;
                tree.iter()
                    .keys()
                    .filter_map(Result::ok)
                    .map(|k| String::from_utf8_lossy(&k).into_owned())
                    .collect()
            }
        };
        Ok(serde_json::to_vec(&tokens)?)
    }

    /// Reads a JSON string array, trimming any trailing NUL padding a
    /// fixed-size export buffer may carry, and inserts every token.
    pub fn import(&self, data: &[u8]) -> AuthResult<usize> {
        let data = &data[..data.len().min(MAX_IMPORT_BYTES)];
        let trimmed = trim_trailing_nuls(data);
        let tokens: Vec<String> = serde_json::from_slice(trimmed)?;
        for token in &tokens {
            self.add(token)?;
        }
        Ok(tokens.len())
    }
}

fn trim_trailing_nuls(data: &[u8]) -> &[u8] {
    let end = data.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    &data[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn added_token_is_valid_and_removed_token_is_not() {
        let (store, _dir) = TokenStore::open_temporary();
        assert!(!store.valid("abc"));
        store.add("abc").unwrap();
        assert!(store.valid("abc"));
        store.remove("abc").unwrap();
        assert!(!store.valid("abc"));
    }

    #[test]
    fn empty_token_is_never_valid_even_when_disabled() {
        let disabled = TokenStore::disabled();
        assert!(!disabled.valid(""));
        assert!(disabled.valid("anything"));
    }

    #[test]
    fn export_then_import_yields_the_original_set() {
        let (store, _dir) = TokenStore::open_temporary();
        store.add("one").unwrap();
        store.add("two").unwrap();
        let exported = store.export().unwrap();

        let (fresh, _dir2) = TokenStore::open_temporary();
        let count = fresh.import(&exported).unwrap();
        assert_eq!(count, 2);
        assert!(fresh.valid("one"));
        assert!(fresh.valid("two"));
    }

    #[test]
    fn import_trims_trailing_nul_padding() {
        let (store, _dir) = TokenStore::open_temporary();
        let mut padded = br#"["padded-token"]"#.to_vec();
        padded.extend(std::iter::repeat(0u8).take(32));
        let count = store.import(&padded).unwrap();
        assert_eq!(count, 1);
        assert!(store.valid("padded-token"));
    }
}
