use solana_program::{clock::UnixTimestamp, msg, pubkey::Pubkey};

use crate::{
    error::{EscrowError, Result},
    state::{Attestation, ContentHash, Role, Signature, Signatures},
    LOG_TAG_NAME,
};

/// Signature checking supplied by the wallet collaborator.
pub trait SignatureVerifier {
    fn verify(&self, content_hash: &ContentHash, signature: &Signature, address: &Pubkey) -> bool;
}

impl<T: SignatureVerifier + ?Sized> SignatureVerifier for std::sync::Arc<T> {
    fn verify(&self, content_hash: &ContentHash, signature: &Signature, address: &Pubkey) -> bool {
        (**self).verify(content_hash, signature, address)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttestOutcome {
    Recorded,
    AlreadyRecorded,
}

/// Records role attestations on an agreement's [`Signatures`].
pub struct SignatureLedger<'a, V: SignatureVerifier> {
    verifier: &'a V,
}

impl<'a, V: SignatureVerifier> SignatureLedger<'a, V> {
    pub fn new(verifier: &'a V) -> Self {
        SignatureLedger { verifier }
    }

    pub fn attest(
        &self,
        signatures: &mut Signatures,
        role: Role,
        signer: &Pubkey,
        content_hash: ContentHash,
        signature: Signature,
        now: UnixTimestamp,
    ) -> Result<AttestOutcome> {
        if !self.verifier.verify(&content_hash, &signature, signer) {
            msg!("{} Signature from {} does not verify", LOG_TAG_NAME, signer);
            return Err(EscrowError::SignatureMismatch { signer: *signer });
        }

        let slot = signatures.slot_mut(role);
        if let Some(existing) = slot.as_ref() {
            if existing.content_hash != content_hash {
                msg!(
                    "{} {:?} already attested different content",
                    LOG_TAG_NAME,
                    role
                );
                return Err(EscrowError::DuplicateSignature { signer: *signer });
            }
            return Ok(AttestOutcome::AlreadyRecorded);
        }

        *slot = Some(Attestation {
            content_hash,
            signature,
            signed_at: now,
        });
        Ok(AttestOutcome::Recorded)
    }

    /// True only when both roles attested the same content.
    pub fn is_fully_signed(&self, signatures: &Signatures) -> bool {
        match (&signatures.landlord, &signatures.tenant) {
            (Some(landlord), Some(tenant)) => landlord.content_hash == tenant.content_hash,
            _ => false,
        }
    }

    /// Drops every attestation. Used when the signed content changes.
    pub fn invalidate(&self, signatures: &mut Signatures) {
        *signatures = Signatures::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::KeccakSigner;

    fn attest(
        ledger: &SignatureLedger<'_, KeccakSigner>,
        signatures: &mut Signatures,
        role: Role,
        signer: &Pubkey,
        hash: ContentHash,
        now: UnixTimestamp,
    ) -> Result<AttestOutcome> {
        ledger.attest(signatures, role, signer, hash, KeccakSigner::sign(&hash, signer), now)
    }

    #[test]
    fn attests_once_per_hash() {
        let signer = KeccakSigner;
        let ledger = SignatureLedger::new(&signer);
        let landlord = Pubkey::new_unique();
        let hash = [7u8; 32];
        let mut signatures = Signatures::default();

        let outcome = attest(&ledger, &mut signatures, Role::Landlord, &landlord, hash, 10)
            .unwrap();
        assert_eq!(outcome, AttestOutcome::Recorded);

        let outcome = attest(&ledger, &mut signatures, Role::Landlord, &landlord, hash, 20)
            .unwrap();
        assert_eq!(outcome, AttestOutcome::AlreadyRecorded);
        assert_eq!(signatures.landlord.as_ref().unwrap().signed_at, 10);
    }

    #[test]
    fn rejects_different_content_for_same_role() {
        let signer = KeccakSigner;
        let ledger = SignatureLedger::new(&signer);
        let tenant = Pubkey::new_unique();
        let mut signatures = Signatures::default();
        let first = [1u8; 32];
        let second = [2u8; 32];

        attest(&ledger, &mut signatures, Role::Tenant, &tenant, first, 0)
            .unwrap();
        let err = attest(&ledger, &mut signatures, Role::Tenant, &tenant, second, 0)
            .unwrap_err();
        assert_eq!(err, EscrowError::DuplicateSignature { signer: tenant });
        assert_eq!(signatures.tenant.as_ref().unwrap().content_hash, first);
    }

    #[test]
    fn rejects_signature_from_someone_else() {
        let signer = KeccakSigner;
        let ledger = SignatureLedger::new(&signer);
        let tenant = Pubkey::new_unique();
        let impostor = Pubkey::new_unique();
        let hash = [3u8; 32];
        let mut signatures = Signatures::default();

        let err = ledger
            .attest(
                &mut signatures,
                Role::Tenant,
                &tenant,
                hash,
                KeccakSigner::sign(&hash, &impostor),
                0,
            )
            .unwrap_err();
        assert_eq!(err, EscrowError::SignatureMismatch { signer: tenant });
        assert!(signatures.tenant.is_none());
    }

    #[test]
    fn fully_signed_requires_matching_hashes() {
        let signer = KeccakSigner;
        let ledger = SignatureLedger::new(&signer);
        let landlord = Pubkey::new_unique();
        let tenant = Pubkey::new_unique();
        let mut signatures = Signatures::default();
        let agreed = [4u8; 32];
        let other = [5u8; 32];

        attest(&ledger, &mut signatures, Role::Landlord, &landlord, agreed, 0)
            .unwrap();
        assert!(!ledger.is_fully_signed(&signatures));

        attest(&ledger, &mut signatures, Role::Tenant, &tenant, other, 0)
            .unwrap();
        assert!(!ledger.is_fully_signed(&signatures));

        ledger.invalidate(&mut signatures);
        attest(&ledger, &mut signatures, Role::Landlord, &landlord, agreed, 0)
            .unwrap();
        attest(&ledger, &mut signatures, Role::Tenant, &tenant, agreed, 0)
            .unwrap();
        assert!(ledger.is_fully_signed(&signatures));
    }
}
