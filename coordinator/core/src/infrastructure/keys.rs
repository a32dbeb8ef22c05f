// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Symmetric key minting.
//!
//! Agents receive a fresh HMAC key (16 chars) and encryption key (32 chars)
//! on every handshake.

use rand::distr::Alphanumeric;
use rand::Rng;

use crate::domain::agent::AgentCredentials;

pub const HMAC_KEY_LEN: usize = 16;
pub const ENC_KEY_LEN: usize = 32;

/// Random alphanumeric key of `len` characters from the thread-local CSPRNG
pub fn generate_key(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

pub fn mint_credentials() -> AgentCredentials {
    AgentCredentials {
        hmac_key: generate_key(HMAC_KEY_LEN),
        enc_key: generate_key(ENC_KEY_LEN),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_lengths_and_charset() {
        let creds = mint_credentials();
        assert_eq!(creds.hmac_key.len(), HMAC_KEY_LEN);
        assert_eq!(creds.enc_key.len(), ENC_KEY_LEN);
        assert!(creds.enc_key.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_keys_rotate() {
        assert_ne!(mint_credentials(), mint_credentials());
    }
}
