//! Strkey rendering, via the `stellar-strkey` crate rather than the hand
//! rolled CRC16/base32 pair the archived event-ID scheme used - there's no
//! reason to reimplement what the ecosystem already publishes correctly.

use stellar_xdr::curr::{AccountId, Hash, PublicKey, Uint256};

pub fn contract_id_to_strkey(hash: &Hash) -> String {
    stellar_strkey::Contract(hash.0).to_string()
}

pub fn account_id_to_strkey(account_id: &AccountId) -> String {
    let PublicKey::PublicKeyTypeEd25519(ref key) = account_id.0;
    stellar_strkey::ed25519::PublicKey(key.0).to_string()
}

/// Inverse of [`account_id_to_strkey`]. `None` for anything that isn't a
/// well-formed `G...` ed25519 public key strkey.
pub fn strkey_to_account_id(strkey: &str) -> Option<AccountId> {
    let key = stellar_strkey::ed25519::PublicKey::from_string(strkey).ok()?;
    Some(AccountId(PublicKey::PublicKeyTypeEd25519(Uint256(key.0))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stellar_xdr::curr::Uint256;

    #[test]
    fn contract_strkey_has_c_prefix() {
        let hash = Hash([7u8; 32]);
        let strkey = contract_id_to_strkey(&hash);
        assert!(strkey.starts_with('C'));
    }

    #[test]
    fn account_strkey_has_g_prefix() {
        let account_id = AccountId(PublicKey::PublicKeyTypeEd25519(Uint256([3u8; 32])));
        let strkey = account_id_to_strkey(&account_id);
        assert!(strkey.starts_with('G'));
    }

    #[test]
    fn strkey_to_account_id_roundtrips() {
        let account_id = AccountId(PublicKey::PublicKeyTypeEd25519(Uint256([5u8; 32])));
        let strkey = account_id_to_strkey(&account_id);
        assert_eq!(strkey_to_account_id(&strkey), Some(account_id));
    }

    #[test]
    fn strkey_to_account_id_rejects_garbage() {
        assert_eq!(strkey_to_account_id("not-a-strkey"), None);
    }
}
