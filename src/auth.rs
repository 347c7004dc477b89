use chrono::Utc;
use hex::ToHex;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::Error;

pub static JWT_TOKEN: &str = "JWT_TOKEN";
pub static JWT_SECRET: &str = "JWT_SECRET";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub uid: i32,
    pub exp: i64,
}

impl Claims {
    /// A session claim valid for 30 days.
    pub fn for_user(uid: i32) -> Self {
        Self {
            uid,
            exp: (Utc::now() + chrono::Duration::days(30)).timestamp(),
        }
    }
}

pub fn gen_token(secret: &[u8], claims: &Claims) -> Result<String, Error> {
    let token = encode(&Header::new(Algorithm::HS256), claims, &EncodingKey::from_secret(secret))?;
    Ok(token)
}

pub fn verify_token(secret: &[u8], token: &str) -> Result<Claims, Error> {
    let payload = decode::<Claims>(token, &DecodingKey::from_secret(secret), &Validation::new(Algorithm::HS256))?;
    Ok(payload.claims)
}

pub fn hash_password(pass: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(pass);
    hasher.update(salt);
    hasher.finalize().encode_hex()
}

const SALT_CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

pub fn random_salt() -> String {
    let mut rng = rand::thread_rng();
    (0..32).map(|_| SALT_CHARS[rng.gen_range(0..SALT_CHARS.len())] as char).collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_gen_and_verify_token() {
        let secret = b"0123456789";
        let claims = Claims::for_user(42);
        let token = gen_token(secret, &claims).unwrap();
        let verified = verify_token(secret, &token).unwrap();
        assert_eq!(verified.uid, 42);
    }

    #[test]
    fn test_different_tokens() {
        let secret = b"0123456789";
        let token_a = gen_token(secret, &Claims::for_user(1)).unwrap();
        let token_b = gen_token(secret, &Claims::for_user(2)).unwrap();
        assert_eq!(verify_token(secret, &token_a).unwrap().uid, 1);
        assert_eq!(verify_token(secret, &token_b).unwrap().uid, 2);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = gen_token(b"right", &Claims::for_user(1)).unwrap();
        assert!(verify_token(b"wrong", &token).is_err());
    }

    #[test]
    fn test_hash_password_deterministic() {
        assert_eq!(hash_password("secret", "salt"), hash_password("secret", "salt"));
        assert_ne!(hash_password("secret", "salt"), hash_password("secret", "pepper"));
        assert_ne!(hash_password("secret", "salt"), hash_password("hunter2", "salt"));
    }

    #[test]
    fn test_random_salt_shape() {
        let salt = random_salt();
        assert_eq!(salt.len(), 32);
        assert!(salt.bytes().all(|b| SALT_CHARS.contains(&b)));
        assert_ne!(random_salt(), random_salt());
    }
}
