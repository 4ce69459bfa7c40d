// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! PKCE (RFC 7636) verifier/challenge pairs and anti-CSRF state strings.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Shortest verifier RFC 7636 allows.
pub const VERIFIER_MIN_LEN: usize = 43;
/// Longest verifier RFC 7636 allows.
pub const VERIFIER_MAX_LEN: usize = 128;
/// Random bytes drawn for a verifier by default.
pub const DEFAULT_VERIFIER_BYTES: usize = 64;
/// Challenge method sent to the authorization server.
pub const CHALLENGE_METHOD: &str = "S256";

/// 32 bytes encode to exactly 43 base64url characters.
const MIN_VERIFIER_BYTES: usize = 32;
/// 96 bytes encode to exactly 128 base64url characters.
const MAX_VERIFIER_BYTES: usize = 96;
const STATE_BYTES: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum PkceError {
    #[error("system random source unavailable")]
    RandomUnavailable,
}

/// Verifier kept by the client plus the challenge sent with the login.
#[derive(Clone, PartialEq, Eq)]
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
}

impl std::fmt::Debug for PkcePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkcePair")
            .field("verifier", &"<redacted>")
            .field("challenge", &self.challenge)
            .finish()
    }
}

impl PkcePair {
    pub fn method(&self) -> &'static str {
        CHALLENGE_METHOD
    }
}

fn random_bytes(len: usize) -> Result<Vec<u8>, PkceError> {
    let mut buf = vec![0u8; len];
    SystemRandom::new()
        .fill(&mut buf)
        .map_err(|_| PkceError::RandomUnavailable)?;
    Ok(buf)
}

/// Generate a verifier from [`DEFAULT_VERIFIER_BYTES`] random bytes.
pub fn generate_pkce() -> Result<PkcePair, PkceError> {
    generate_pkce_with_entropy(DEFAULT_VERIFIER_BYTES)
}

/// Generate a verifier from `bytes` random bytes.
///
/// The byte count is clamped so the encoded verifier always lands in
/// `[VERIFIER_MIN_LEN, VERIFIER_MAX_LEN]`.
pub fn generate_pkce_with_entropy(bytes: usize) -> Result<PkcePair, PkceError> {
    let raw = random_bytes(bytes.clamp(MIN_VERIFIER_BYTES, MAX_VERIFIER_BYTES))?;
    let mut verifier = URL_SAFE_NO_PAD.encode(raw);
    verifier.truncate(VERIFIER_MAX_LEN);

    let challenge = challenge_for(&verifier);
    Ok(PkcePair {
        verifier,
        challenge,
    })
}

/// `base64url(SHA-256(verifier))` without padding.
pub fn challenge_for(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Random hex string for the OAuth `state` parameter.
pub fn generate_state() -> Result<String, PkceError> {
    Ok(hex::encode(random_bytes(STATE_BYTES)?))
}

/// Compare two state strings in constant time.
pub fn states_match(expected: &str, received: &str) -> bool {
    expected.as_bytes().ct_eq(received.as_bytes()).into()
}
