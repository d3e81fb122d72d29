use argon2::{Algorithm, Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::{rngs::OsRng, RngCore};

use crate::{
    config::{env_in_range, env_string},
    AuthError,
};

const TAG: &str = "ARGON2ID";
const HASH_LENGTH: usize = 32;

/// Work factors of the password hash
#[derive(Debug, Clone)]
pub struct HashingConfig {
    pub iterations: u32,
    pub memory_kib: u32,
    pub parallelism: u32,
    pub salt_bytes: usize,
    pub pepper: String,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            iterations: 3,
            memory_kib: 65536,
            parallelism: default_parallelism(),
            salt_bytes: 16,
            pepper: String::new(),
        }
    }
}

impl HashingConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            iterations: env_in_range("VENUEPLUS_ARGON2_ITER", defaults.iterations, 1..=10),
            memory_kib: env_in_range(
                "VENUEPLUS_ARGON2_MEMORY_KIB",
                defaults.memory_kib,
                8192..=1048576,
            ),
            parallelism: env_in_range(
                "VENUEPLUS_ARGON2_PARALLELISM",
                defaults.parallelism,
                1..=8,
            ),
            salt_bytes: env_in_range("VENUEPLUS_ARGON2_SALT_BYTES", defaults.salt_bytes, 16..=64),
            pepper: env_string("VENUEPLUS_PASSWORD_PEPPER").unwrap_or_default(),
        }
    }
}

fn default_parallelism() -> u32 {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);

    if cpus >= 2 {
        2
    } else {
        1
    }
}

/// Hashes and verifies secrets in the `ARGON2ID$iter$mem$par$salt$hash` format.
pub struct PasswordHasher {
    config: HashingConfig,
}

impl PasswordHasher {
    pub fn new(config: HashingConfig) -> Self {
        Self { config }
    }

    pub fn hash(&self, secret: &str) -> Result<String, AuthError> {
        let HashingConfig {
            iterations,
            memory_kib,
            parallelism,
            salt_bytes,
            ref pepper,
        } = self.config;

        let mut salt = vec![0u8; salt_bytes];
        OsRng.fill_bytes(&mut salt);

        let input = format!("{}{}", secret, pepper);
        let hash = derive(
            input.as_bytes(),
            &salt,
            iterations,
            memory_kib,
            parallelism,
            HASH_LENGTH,
        )?;

        Ok(format!(
            "{}${}${}${}${}${}",
            TAG,
            iterations,
            memory_kib,
            parallelism,
            BASE64.encode(salt),
            BASE64.encode(hash)
        ))
    }

    /// Checks a secret against a stored digest. Malformed digests never verify.
    pub fn verify(&self, secret: &str, digest: &str) -> bool {
        let Some(parsed) = ParsedDigest::parse(digest) else {
            return false;
        };

        let peppered = format!("{}{}", secret, self.config.pepper);

        if parsed.matches(peppered.as_bytes()) {
            return true;
        }

        !self.config.pepper.is_empty() && parsed.matches(secret.as_bytes())
    }
}

struct ParsedDigest {
    iterations: u32,
    memory_kib: u32,
    parallelism: u32,
    salt: Vec<u8>,
    expected: Vec<u8>,
}

impl ParsedDigest {
    fn parse(digest: &str) -> Option<Self> {
        let parts: Vec<_> = digest.split('$').collect();

        if parts.len() != 6 || parts[0] != TAG {
            return None;
        }

        Some(Self {
            iterations: parts[1].parse().ok()?,
            memory_kib: parts[2].parse().ok()?,
            parallelism: parts[3].parse().ok()?,
            salt: BASE64.decode(parts[4]).ok()?,
            expected: BASE64.decode(parts[5]).ok()?,
        })
    }

    fn matches(&self, input: &[u8]) -> bool {
        derive(
            input,
            &self.salt,
            self.iterations,
            self.memory_kib,
            self.parallelism,
            self.expected.len(),
        )
        .map(|actual| constant_time_eq(&actual, &self.expected))
        .unwrap_or(false)
    }
}

fn derive(
    input: &[u8],
    salt: &[u8],
    iterations: u32,
    memory_kib: u32,
    parallelism: u32,
    length: usize,
) -> Result<Vec<u8>, AuthError> {
    let params = Params::new(memory_kib, iterations, parallelism, Some(length))
        .map_err(|e| AuthError::HashError(e.to_string()))?;

    let mut output = vec![0u8; length];

    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password_into(input, salt, &mut output)
        .map_err(|e| AuthError::HashError(e.to_string()))?;

    Ok(output)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
pub(crate) fn light_config() -> HashingConfig {
    HashingConfig {
        iterations: 1,
        memory_kib: 8192,
        parallelism: 1,
        salt_bytes: 16,
        pepper: String::new(),
    }
}
