//! Stellar Asset Contract (SAC) detection (spec §4.2 "contract_data.is_sac").
//!
//! Every classic asset has a deterministic contract ID, derived by hashing a
//! `HashIdPreimage::ContractId` structure over the network ID and the asset.
//! A `contract_data` row's `contract_id` matching that derived value for some
//! `(asset_code, asset_issuer)` pair is how we recognize a SAC without
//! maintaining an external registry.

use sha2::{Digest, Sha256};
use stellar_xdr::curr::{
    AlphaNum12, AlphaNum4, AssetCode12, AssetCode4, ContractIdPreimage, Hash, HashIdPreimage,
    HashIdPreimageContractId, Limits, WriteXdr,
};
use stellar_xdr::curr::Asset as XdrAsset;

use crate::error::Result;
use crate::extract::strkey_util;

/// The minimal description of a classic asset needed to derive its SAC
/// contract ID: `None` issuer means native XLM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassicAsset {
    pub code: String,
    pub issuer: Option<stellar_xdr::curr::AccountId>,
}

/// Derive the contract ID a SAC for `asset` would have on `network_passphrase`
/// (spec §4.2, §9 "must be scoped to the configured network passphrase").
pub fn derive_contract_id(asset: &ClassicAsset, network_passphrase: &str) -> Result<Hash> {
    let xdr_asset = to_xdr_asset(asset)?;
    let network_id = Hash(Sha256::digest(network_passphrase.as_bytes()).into());
    let preimage = HashIdPreimage::ContractId(HashIdPreimageContractId {
        network_id,
        contract_id_preimage: ContractIdPreimage::Asset(xdr_asset),
    });
    let bytes = preimage.to_xdr(Limits::none())?;
    Ok(Hash(Sha256::digest(bytes).into()))
}

/// Whether `contract_id` is the SAC for `asset` on this network. Used by the
/// contract-data extractor to set `is_sac` without guessing from contract
/// code shape.
pub fn is_sac_for(contract_id: &Hash, asset: &ClassicAsset, network_passphrase: &str) -> bool {
    match derive_contract_id(asset, network_passphrase) {
        Ok(derived) => &derived == contract_id,
        Err(_) => false,
    }
}

pub fn contract_id_strkey(asset: &ClassicAsset, network_passphrase: &str) -> Result<String> {
    Ok(strkey_util::contract_id_to_strkey(&derive_contract_id(
        asset,
        network_passphrase,
    )?))
}

fn to_xdr_asset(asset: &ClassicAsset) -> Result<XdrAsset> {
    let Some(issuer) = &asset.issuer else {
        return Ok(XdrAsset::Native);
    };
    let code_bytes = asset.code.as_bytes();
    if code_bytes.len() <= 4 {
        let mut buf = [0u8; 4];
        buf[..code_bytes.len()].copy_from_slice(code_bytes);
        Ok(XdrAsset::CreditAlphanum4(AlphaNum4 {
            asset_code: AssetCode4(buf),
            issuer: issuer.clone(),
        }))
    } else {
        let mut buf = [0u8; 12];
        buf[..code_bytes.len()].copy_from_slice(code_bytes);
        Ok(XdrAsset::CreditAlphanum12(AlphaNum12 {
            asset_code: AssetCode12(buf),
            issuer: issuer.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stellar_xdr::curr::{AccountId, PublicKey, Uint256};

    fn issuer() -> stellar_xdr::curr::AccountId {
        AccountId(PublicKey::PublicKeyTypeEd25519(Uint256([9u8; 32])))
    }

    #[test]
    fn native_asset_has_stable_contract_id_per_network() {
        let asset = ClassicAsset {
            code: "native".into(),
            issuer: None,
        };
        let a = derive_contract_id(&asset, "Public Global Stellar Network ; September 2015").unwrap();
        let b = derive_contract_id(&asset, "Public Global Stellar Network ; September 2015").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_networks_derive_different_contract_ids() {
        let asset = ClassicAsset {
            code: "USDC".into(),
            issuer: Some(issuer()),
        };
        let pubnet = derive_contract_id(&asset, "Public Global Stellar Network ; September 2015").unwrap();
        let testnet = derive_contract_id(&asset, "Test SDF Network ; September 2015").unwrap();
        assert_ne!(pubnet, testnet);
    }

    #[test]
    fn is_sac_for_matches_only_the_derived_id() {
        let asset = ClassicAsset {
            code: "USDC".into(),
            issuer: Some(issuer()),
        };
        let passphrase = "Public Global Stellar Network ; September 2015";
        let derived = derive_contract_id(&asset, passphrase).unwrap();
        assert!(is_sac_for(&derived, &asset, passphrase));
        let other = Hash([0u8; 32]);
        assert!(!is_sac_for(&other, &asset, passphrase));
    }

    #[test]
    fn long_asset_code_uses_alphanum12() {
        let asset = ClassicAsset {
            code: "LONGASSETCODE".chars().take(12).collect(),
            issuer: Some(issuer()),
        };
        assert!(derive_contract_id(&asset, "x").is_ok());
    }
}
