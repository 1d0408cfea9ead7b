use sha2::Sha256;
use subtle::ConstantTimeEq;

/// Rounds used when deriving a password hash.
pub const HASH_ROUNDS: u32 = 10_000;

/// hash_password derives the stored credential from a password
/// and a hex encoded salt: the hexdigest of the 32 byte key
/// produced by pbkdf2_hmac with sha256.
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut key = [0u8; 32];
    pbkdf2::pbkdf2_hmac::<Sha256>(
        password.as_bytes(),
        salt.as_bytes(),
        HASH_ROUNDS,
        &mut key,
    );
    hex::encode(key)
}

/// Generate a fresh random salt, hex encoded.
pub fn new_salt() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}

/// A salted password hash as it is kept in the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credential {
    pub salt: String,
    pub hash: String,
}

impl Credential {
    /// Derive a credential for a password with a new salt
    pub fn new(password: &str) -> Self {
        let salt = new_salt();
        let hash = hash_password(password, &salt);
        Self { salt, hash }
    }

    /// Check a password against the credential. The comparison
    /// does not stop at the first differing byte.
    pub fn verify(&self, password: &str) -> bool {
        let candidate = hash_password(password, &self.salt);
        candidate.as_bytes().ct_eq(self.hash.as_bytes()).into()
    }
}
