//! # Credentials
//!
//! Salted SHA-256 password hashing and verification against the users table.
//!
//! A salted hash is `SHA-256(salt || password)`. Salt and hash are stored
//! next to each other as lower-case hex so a login attempt can re-derive the
//! hash from the stored salt and compare.

use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use crate::predicate::Predicate;
use crate::schema::Schema;
use crate::storage::RecordStore;
use crate::{Error, Result};

/// Random salt length in bytes (32 hex characters)
pub const SALT_LEN: usize = 16;

/// Hex length of a SHA-256 digest
pub const HASH_HEX_LEN: usize = 64;

/// Field holding the hex digest in a users schema
pub const HASH_FIELD: &str = "hash";

/// Field holding the hex salt in a users schema
pub const SALT_FIELD: &str = "salt";

/// Hex-encoded digest and the salt it was derived with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaltedHash {
    pub hash: String,
    pub salt: String,
}

/// Hash a password under a freshly generated random salt
pub fn create_salted_hash(password: &str) -> SaltedHash {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    SaltedHash {
        hash: digest(&salt, password),
        salt: hex::encode(salt),
    }
}

/// Re-derive the hash of `password` under an existing hex salt
pub fn hash_with_salt(password: &str, salt: &str) -> Result<String> {
    let salt = hex::decode(salt).map_err(|e| Error::InvalidSalt(e.to_string()))?;
    Ok(digest(&salt, password))
}

fn digest(salt: &[u8], password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Positions of the credential fields within a users schema
struct CredentialLayout {
    key: usize,
    hash: usize,
    salt: usize,
}

impl CredentialLayout {
    fn resolve(schema: &Schema) -> Result<Self> {
        let missing = |field: &str| Error::MissingField {
            schema: schema.name().to_string(),
            field: field.to_string(),
        };
        Ok(Self {
            key: schema.key_index().ok_or_else(|| missing("<key>"))?,
            hash: schema.position(HASH_FIELD).ok_or_else(|| missing(HASH_FIELD))?,
            salt: schema.position(SALT_FIELD).ok_or_else(|| missing(SALT_FIELD))?,
        })
    }
}

/// Check a username/password pair against the stored salted hash.
///
/// Returns `Ok(false)` for an unknown username or a wrong password. Store
/// failures are returned as errors so they are not mistaken for a bad login.
pub fn verify_credentials(
    store: &RecordStore,
    users: &Schema,
    username: &str,
    password: &str,
) -> Result<bool> {
    let layout = CredentialLayout::resolve(users)?;
    let predicate = Predicate::wildcard(users.field_count()).with(layout.key, username);

    let records = store.search(users, &predicate)?;
    let Some(record) = records.first() else {
        tracing::warn!("Login failed: unknown user {}", username);
        return Ok(false);
    };

    let expected = match hash_with_salt(password, &record[layout.salt]) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::warn!("Stored salt for {} is unusable: {}", username, e);
            return Ok(false);
        }
    };

    let verified = expected == record[layout.hash];
    if !verified {
        tracing::warn!("Login failed: wrong password for {}", username);
    }
    Ok(verified)
}

/// Create a user record with a fresh salt and hash.
///
/// `profile` supplies every other field of the schema by name; any field
/// left out fails with [`Error::MissingField`].
pub fn register_user(
    store: &RecordStore,
    users: &Schema,
    username: &str,
    password: &str,
    profile: &[(&str, &str)],
) -> Result<SaltedHash> {
    let layout = CredentialLayout::resolve(users)?;
    let salted = create_salted_hash(password);

    let record = users
        .fields()
        .iter()
        .enumerate()
        .map(|(i, field)| {
            if i == layout.key {
                Ok(username.to_string())
            } else if i == layout.hash {
                Ok(salted.hash.clone())
            } else if i == layout.salt {
                Ok(salted.salt.clone())
            } else {
                profile
                    .iter()
                    .find(|(name, _)| *name == field.name)
                    .map(|(_, value)| value.to_string())
                    .ok_or_else(|| Error::MissingField {
                        schema: users.name().to_string(),
                        field: field.name.clone(),
                    })
            }
        })
        .collect::<Result<Vec<_>>>()?;

    store.insert(users, &record)?;
    tracing::info!("Registered user {}", username);
    Ok(salted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::catalog;

    fn profile() -> [(&'static str, &'static str); 3] {
        [("fname", "Alice"), ("lname", "Liddell"), ("createdAt", "2020-01-01")]
    }

    #[test]
    fn test_salted_hash_shape() {
        let salted = create_salted_hash("secret");
        assert_eq!(salted.hash.len(), HASH_HEX_LEN);
        assert_eq!(salted.salt.len(), SALT_LEN * 2);
        assert!(salted.hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_fresh_salt_each_time() {
        let first = create_salted_hash("same_password");
        let second = create_salted_hash("same_password");
        assert_ne!(first.salt, second.salt);
        assert_ne!(first.hash, second.hash);
    }

    #[test]
    fn test_hash_with_salt_is_deterministic() {
        let salted = create_salted_hash("pw");
        assert_eq!(hash_with_salt("pw", &salted.salt).unwrap(), salted.hash);
        assert_eq!(
            hash_with_salt("pw", &salted.salt).unwrap(),
            hash_with_salt("pw", &salted.salt).unwrap()
        );
        assert_ne!(hash_with_salt("pw2", &salted.salt).unwrap(), salted.hash);
    }

    #[test]
    fn test_known_digest() {
        // SHA-256("abc") with an empty salt
        assert_eq!(
            hash_with_salt("abc", "").unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_invalid_salt() {
        assert!(matches!(hash_with_salt("pw", "zz"), Err(Error::InvalidSalt(_))));
    }

    #[test]
    fn test_verify_credentials() {
        let store = RecordStore::open_in_memory(catalog::default_registry().unwrap());
        let users = store.schema(catalog::USERS).unwrap();
        register_user(&store, users, "alice", "correct horse", &profile()).unwrap();

        assert!(verify_credentials(&store, users, "alice", "correct horse").unwrap());
        assert!(!verify_credentials(&store, users, "alice", "Correct horse").unwrap());
        assert!(!verify_credentials(&store, users, "bob", "correct horse").unwrap());
    }

    #[test]
    fn test_verify_with_manually_inserted_record() {
        let store = RecordStore::open_in_memory(catalog::default_registry().unwrap());
        let users = store.schema(catalog::USERS).unwrap();
        let salted = create_salted_hash("pw");
        store
            .insert(users, &["carol", "C", "D", "2020-01-01", salted.hash.as_str(), salted.salt.as_str()])
            .unwrap();

        assert!(verify_credentials(&store, users, "carol", "pw").unwrap());
    }

    #[test]
    fn test_corrupt_salt_fails_closed() {
        let store = RecordStore::open_in_memory(catalog::default_registry().unwrap());
        let users = store.schema(catalog::USERS).unwrap();
        store
            .insert(users, &["dave", "D", "E", "2020-01-01", "abcd", "not-hex"])
            .unwrap();
        assert!(!verify_credentials(&store, users, "dave", "pw").unwrap());
    }

    #[test]
    fn test_register_duplicate_and_missing_fields() {
        let store = RecordStore::open_in_memory(catalog::default_registry().unwrap());
        let users = store.schema(catalog::USERS).unwrap();
        register_user(&store, users, "alice", "pw", &profile()).unwrap();

        assert!(matches!(
            register_user(&store, users, "alice", "other", &profile()),
            Err(Error::DuplicateKey { .. })
        ));
        assert!(verify_credentials(&store, users, "alice", "pw").unwrap());

        assert!(matches!(
            register_user(&store, users, "erin", "pw", &[("fname", "E")]),
            Err(Error::MissingField { ref field, .. }) if field == "lname"
        ));
        assert_eq!(store.count(catalog::USERS).unwrap(), 1);
    }

    #[test]
    fn test_schema_without_credentials() {
        let store = RecordStore::open_in_memory(catalog::default_registry().unwrap());
        let trips = store.schema(catalog::TRIPS).unwrap();
        assert!(matches!(
            verify_credentials(&store, trips, "alice", "pw"),
            Err(Error::MissingField { .. })
        ));
    }
}
