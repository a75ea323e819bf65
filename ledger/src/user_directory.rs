//! Lookup of `{email -> (node URL, public key)}` over the shared `users`
//! table. Registration, login, and password handling are an external
//! collaborator's concern (see `SPEC_FULL.md` §1); this module only
//! resolves identities the Ledger already trusts.

use std::sync::Arc;

use crate::store::{ColumnDef, SqlType, Store, Value};

const USERS_TABLE: &str = "users";

pub fn users_schema() -> Vec<ColumnDef> {
    vec![
        ColumnDef::new("email", SqlType::Text).unique(),
        ColumnDef::new("name", SqlType::Text),
        ColumnDef::new("node", SqlType::Text).unique(),
        ColumnDef::new("password", SqlType::Text),
        ColumnDef::new("public_key", SqlType::Text),
        ColumnDef::new("has_wallet", SqlType::Bool),
        ColumnDef::new("db_created", SqlType::Bool),
    ]
}

/// Thin wrapper over the `users` table: resolves identity, never manages
/// it (no registration, login, or password hashing here).
pub trait UserDirectory: Send + Sync {
    fn public_key_of(&self, email: &str) -> Option<String>;
    fn node_url_of(&self, email: &str) -> Option<String>;
    /// All registered node URLs except `email`'s own.
    fn peer_urls_excluding(&self, email: &str) -> Vec<String>;
    fn mark_has_wallet(&self, email: &str, public_key: &str) -> bool;
    fn exists(&self, email: &str) -> bool;
}

/// [`UserDirectory`] backed by any [`Store`] implementation.
pub struct SqlUserDirectory<S: Store> {
    store: Arc<S>,
}

impl<S: Store> SqlUserDirectory<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn ensure_schema(&self) -> Result<(), crate::store::StoreError> {
        self.store.ensure_table(USERS_TABLE, &users_schema())
    }
}

impl<S: Store> UserDirectory for SqlUserDirectory<S> {
    fn public_key_of(&self, email: &str) -> Option<String> {
        let row = self.store.get_one(USERS_TABLE, "email", &Value::Text(email.to_string())).ok()??;
        row.get("public_key")?.as_str().map(str::to_string)
    }

    fn node_url_of(&self, email: &str) -> Option<String> {
        let row = self.store.get_one(USERS_TABLE, "email", &Value::Text(email.to_string())).ok()??;
        row.get("node")?.as_str().map(str::to_string)
    }

    fn peer_urls_excluding(&self, email: &str) -> Vec<String> {
        let Ok(rows) = self.store.get_all(USERS_TABLE) else {
            return Vec::new();
        };
        rows.into_iter()
            .filter(|row| row.get("email").and_then(|v| v.as_str()) != Some(email))
            .filter_map(|row| row.get("node").and_then(|v| v.as_str()).map(str::to_string))
            .collect()
    }

    fn mark_has_wallet(&self, email: &str, public_key: &str) -> bool {
        self.store
            .update_where(
                USERS_TABLE,
                ("email", Value::Text(email.to_string())),
                &[
                    ("public_key", Value::Text(public_key.to_string())),
                    ("has_wallet", Value::Bool(true)),
                ],
            )
            .is_ok()
    }

    fn exists(&self, email: &str) -> bool {
        matches!(self.store.get_one(USERS_TABLE, "email", &Value::Text(email.to_string())), Ok(Some(_)))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::store::MemoryStore;

    /// Test-only [`UserDirectory`] with direct insertion helpers, used
    /// across this crate's unit tests wherever a directory is needed but
    /// exercising `SqlUserDirectory` itself is not the point of the test.
    pub struct MemoryUserDirectory {
        inner: SqlUserDirectory<MemoryStore>,
    }

    impl MemoryUserDirectory {
        pub fn new() -> Self {
            let store = Arc::new(MemoryStore::new());
            let inner = SqlUserDirectory::new(store);
            inner.ensure_schema().unwrap();
            Self { inner }
        }

        pub fn register(&self, email: &str, node: &str, public_key: &str) {
            self.inner
                .store
                .insert(
                    USERS_TABLE,
                    &[
                        ("email", Value::Text(email.to_string())),
                        ("name", Value::Text(email.to_string())),
                        ("node", Value::Text(node.to_string())),
                        ("password", Value::Text(String::new())),
                        ("public_key", Value::Text(public_key.to_string())),
                        ("has_wallet", Value::Bool(!public_key.is_empty())),
                        ("db_created", Value::Bool(true)),
                    ],
                )
                .unwrap();
        }
    }

    impl UserDirectory for MemoryUserDirectory {
        fn public_key_of(&self, email: &str) -> Option<String> {
            self.inner.public_key_of(email)
        }
        fn node_url_of(&self, email: &str) -> Option<String> {
            self.inner.node_url_of(email)
        }
        fn peer_urls_excluding(&self, email: &str) -> Vec<String> {
            self.inner.peer_urls_excluding(email)
        }
        fn mark_has_wallet(&self, email: &str, public_key: &str) -> bool {
            self.inner.mark_has_wallet(email, public_key)
        }
        fn exists(&self, email: &str) -> bool {
            self.inner.exists(email)
        }
    }

    #[test]
    fn peer_urls_excluding_omits_the_caller() {
        let dir = MemoryUserDirectory::new();
        dir.register("alice@x", "http://127.0.0.1:5001", "pub-a");
        dir.register("bob@x", "http://127.0.0.1:5002", "pub-b");

        let peers = dir.peer_urls_excluding("alice@x");
        assert_eq!(peers, vec!["http://127.0.0.1:5002".to_string()]);
    }

    #[test]
    fn mark_has_wallet_updates_public_key() {
        let dir = MemoryUserDirectory::new();
        dir.register("alice@x", "http://127.0.0.1:5001", "");
        assert!(dir.mark_has_wallet("alice@x", "new-pub-key"));
        assert_eq!(dir.public_key_of("alice@x"), Some("new-pub-key".to_string()));
    }

    #[test]
    fn exists_reflects_registration_state() {
        let dir = MemoryUserDirectory::new();
        assert!(!dir.exists("ghost@x"));
        dir.register("ghost@x", "http://127.0.0.1:5003", "pub");
        assert!(dir.exists("ghost@x"));
    }
}
