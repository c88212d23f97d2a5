use blst::{
    BLST_ERROR,
    min_pk::{PublicKey as BlstPublicKey, Signature as BlstSignature},
};

use crate::{
    DST, errors::BLSError, pubkey::PubKey, signature::BLSSignature, traits::SignatureVerifier,
};

/// [SignatureVerifier] backed by the supranational `blst` library.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlstVerifier;

impl BLSSignature {
    pub fn to_blst_signature(&self) -> Result<BlstSignature, BLSError> {
        BlstSignature::from_bytes(self.to_bytes())
            .map_err(|err| BLSError::BlstError(format!("{err:?}")))
    }
}

impl PubKey {
    pub fn to_blst_pubkey(&self) -> Result<BlstPublicKey, BLSError> {
        BlstPublicKey::from_bytes(self.to_bytes())
            .map_err(|err| BLSError::BlstError(format!("{err:?}")))
    }
}

impl SignatureVerifier for BlstVerifier {
    fn verify(
        &self,
        pubkey: &PubKey,
        message: &[u8],
        signature: &BLSSignature,
    ) -> Result<bool, BLSError> {
        let signature = signature.to_blst_signature()?;
        let public_key = pubkey.to_blst_pubkey()?;

        Ok(
            signature.verify(true, message, DST, &[], &public_key, true)
                == BLST_ERROR::BLST_SUCCESS,
        )
    }

    fn fast_aggregate_verify(
        &self,
        pubkeys: &[&PubKey],
        message: &[u8],
        signature: &BLSSignature,
    ) -> Result<bool, BLSError> {
        if pubkeys.is_empty() {
            return Err(BLSError::EmptyPublicKeys);
        }
        let signature = signature.to_blst_signature()?;
        let public_keys = pubkeys
            .iter()
            .map(|key| key.to_blst_pubkey())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(signature.fast_aggregate_verify(
            true,
            message,
            DST,
            &public_keys.iter().collect::<Vec<_>>(),
        ) == BLST_ERROR::BLST_SUCCESS)
    }
}
