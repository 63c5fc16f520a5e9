use super::params::{CHAIN_LINK_BYTE_LEN, INDEX_LABEL_BYTE_LEN, KEYWORD_TOKEN_BYTE_LEN, LINK_KEY_BYTE_LEN, MASTER_KEY_BYTE_LEN, STATE_TOKEN_BYTE_LEN};
use aes::{
    Aes128,
    cipher::{BlockDecrypt, BlockEncrypt, KeyInit, generic_array::GenericArray},
};
use sha2::{Digest, Sha256};
use turboshake::TurboShake128;

const KEYWORD_TOKEN_DOMAIN_TAG: &[u8] = b"range-dsse/keyword-token";

/// Computes the lookup key of a chain link, as `SHA-256(keyword ‖ state_token)`.
#[inline]
pub fn index_label(keyword: &[u8], state_token: &[u8; STATE_TOKEN_BYTE_LEN]) -> [u8; INDEX_LABEL_BYTE_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(keyword);
    hasher.update(state_token);

    hasher.finalize().into()
}

/// Derives the per-step mask, XOR-ed with a chain link's payload, by squeezing TurboSHAKE128 over `keyword ‖ state_token`.
#[inline]
pub fn chain_mask(keyword: &[u8], state_token: &[u8; STATE_TOKEN_BYTE_LEN]) -> [u8; CHAIN_LINK_BYTE_LEN] {
    let mut hasher = TurboShake128::default();
    hasher.absorb(keyword);
    hasher.absorb(state_token);
    hasher.finalize::<{ TurboShake128::DEFAULT_DOMAIN_SEPARATOR }>();

    let mut mask = [0u8; CHAIN_LINK_BYTE_LEN];
    hasher.squeeze(&mut mask);

    mask
}

/// Keyed derivation of the search keyword token, used only by the reference client.
#[inline]
pub fn keyword_token(master_key: &[u8; MASTER_KEY_BYTE_LEN], keyword: &[u8]) -> [u8; KEYWORD_TOKEN_BYTE_LEN] {
    let mut hasher = TurboShake128::default();
    hasher.absorb(KEYWORD_TOKEN_DOMAIN_TAG);
    hasher.absorb(master_key);
    hasher.absorb(keyword);
    hasher.finalize::<{ TurboShake128::DEFAULT_DOMAIN_SEPARATOR }>();

    let mut token = [0u8; KEYWORD_TOKEN_BYTE_LEN];
    hasher.squeeze(&mut token);

    token
}

/// Single-block AES-128 decryption of a state token, recovering the previous state token of the chain.
#[inline]
pub fn decrypt_state_token(key: &[u8; LINK_KEY_BYTE_LEN], state_token: &[u8; STATE_TOKEN_BYTE_LEN]) -> [u8; STATE_TOKEN_BYTE_LEN] {
    let cipher = Aes128::new(GenericArray::from_slice(key));

    let mut block = GenericArray::clone_from_slice(state_token);
    cipher.decrypt_block(&mut block);

    block.into()
}

/// Single-block AES-128 encryption of a state token, advancing the chain by one link.
#[inline]
pub fn encrypt_state_token(key: &[u8; LINK_KEY_BYTE_LEN], state_token: &[u8; STATE_TOKEN_BYTE_LEN]) -> [u8; STATE_TOKEN_BYTE_LEN] {
    let cipher = Aes128::new(GenericArray::from_slice(key));

    let mut block = GenericArray::clone_from_slice(state_token);
    cipher.encrypt_block(&mut block);

    block.into()
}

#[inline(always)]
pub fn xor_in_place<const N: usize>(lhs: &mut [u8; N], rhs: &[u8; N]) {
    lhs.iter_mut().zip(rhs.iter()).for_each(|(l, r)| *l ^= *r);
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::prelude::*;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn state_token_encryption_is_invertible() {
        let mut rng = ChaCha8Rng::from_os_rng();

        for _ in 0..64 {
            let mut key = [0u8; LINK_KEY_BYTE_LEN];
            let mut state_token = [0u8; STATE_TOKEN_BYTE_LEN];

            rng.fill_bytes(&mut key);
            rng.fill_bytes(&mut state_token);

            let next = encrypt_state_token(&key, &state_token);
            assert_ne!(next, state_token);
            assert_eq!(decrypt_state_token(&key, &next), state_token);
        }
    }

    #[test]
    fn index_label_is_sha256_of_concatenation() {
        let keyword = b"22";
        let state_token = [7u8; STATE_TOKEN_BYTE_LEN];

        let mut concatenated = keyword.to_vec();
        concatenated.extend_from_slice(&state_token);
        let expected: [u8; INDEX_LABEL_BYTE_LEN] = Sha256::digest(&concatenated).into();

        assert_eq!(index_label(keyword, &state_token), expected);
    }

    #[test]
    fn chain_mask_depends_on_both_inputs() {
        let state_token = [1u8; STATE_TOKEN_BYTE_LEN];
        let other_state_token = [2u8; STATE_TOKEN_BYTE_LEN];

        assert_eq!(chain_mask(b"18", &state_token), chain_mask(b"18", &state_token));
        assert_ne!(chain_mask(b"18", &state_token), chain_mask(b"19", &state_token));
        assert_ne!(chain_mask(b"18", &state_token), chain_mask(b"18", &other_state_token));
    }

    #[test]
    fn keyword_token_is_keyed() {
        let key_a = [0u8; MASTER_KEY_BYTE_LEN];
        let key_b = [1u8; MASTER_KEY_BYTE_LEN];

        assert_ne!(keyword_token(&key_a, b"20"), keyword_token(&key_b, b"20"));
        assert_ne!(keyword_token(&key_a, b"20"), keyword_token(&key_a, b"21"));
    }
}
