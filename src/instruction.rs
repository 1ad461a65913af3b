use solana_program::{clock::UnixTimestamp, pubkey::Pubkey};

use crate::{
    error::EscrowError,
    money::MonetaryAmount,
    state::{AgreementId, AgreementTerms, Signature},
};

/// Mutating operations as they arrive from a client. The caller's address is
/// supplied alongside the data by the transport, not encoded here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscrowInstruction {
    /// Landlord drafts an agreement and attests its content hash.
    ///
    /// Data: tenant (32), token (32), rent (u64), deposit (u64), start (i64),
    /// end (i64), payment day (u8), property (len-prefixed utf8), signature
    /// (len-prefixed).
    CreateAgreement {
        terms: AgreementTerms,
        signature: Signature,
    },

    /// Landlord replaces the terms before the tenant signs.
    ///
    /// Data: agreement id (u64), then the `CreateAgreement` layout.
    AmendTerms {
        id: AgreementId,
        terms: AgreementTerms,
        signature: Signature,
    },

    /// Tenant attests and escrows the security deposit.
    ///
    /// Data: agreement id (u64), signature (len-prefixed).
    SignAndDeposit { id: AgreementId, signature: Signature },

    /// Landlord activates a fully signed agreement.
    Confirm { id: AgreementId },

    /// Tenant pays the current cycle's rent.
    PayRent { id: AgreementId },

    /// Anyone may bring accrued yield up to date.
    AccrueYield { id: AgreementId },

    /// Landlord withdraws all accrued yield.
    WithdrawYield { id: AgreementId },

    /// Either party closes the agreement after its end date.
    Complete { id: AgreementId },

    /// Landlord cancels an agreement that is not yet active.
    Cancel { id: AgreementId },

    /// Either party releases a record left claimed by a failed store write.
    RecoverClaim { id: AgreementId },
}

impl EscrowInstruction {
    pub fn unpack(input: &[u8]) -> Result<Self, EscrowError> {
        let (tag, rest) = input
            .split_first()
            .ok_or(EscrowError::InvalidInstruction)?;
        let mut reader = Reader { input: rest };

        let instruction = match tag {
            0 => {
                let terms = reader.terms()?;
                let signature = Signature(reader.bytes()?);
                Self::CreateAgreement { terms, signature }
            }
            1 => {
                let id = reader.u64()?;
                let terms = reader.terms()?;
                let signature = Signature(reader.bytes()?);
                Self::AmendTerms {
                    id,
                    terms,
                    signature,
                }
            }
            2 => {
                let id = reader.u64()?;
                let signature = Signature(reader.bytes()?);
                Self::SignAndDeposit { id, signature }
            }
            3 => Self::Confirm { id: reader.u64()? },
            4 => Self::PayRent { id: reader.u64()? },
            5 => Self::AccrueYield { id: reader.u64()? },
            6 => Self::WithdrawYield { id: reader.u64()? },
            7 => Self::Complete { id: reader.u64()? },
            8 => Self::Cancel { id: reader.u64()? },
            9 => Self::RecoverClaim { id: reader.u64()? },
            _ => return Err(EscrowError::InvalidInstruction),
        };

        if !reader.input.is_empty() {
            return Err(EscrowError::InvalidInstruction);
        }
        Ok(instruction)
    }

    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        match self {
            Self::CreateAgreement { terms, signature } => {
                buf.push(0);
                pack_terms(&mut buf, terms);
                pack_bytes(&mut buf, &signature.0);
            }
            Self::AmendTerms {
                id,
                terms,
                signature,
            } => {
                buf.push(1);
                buf.extend_from_slice(&id.to_le_bytes());
                pack_terms(&mut buf, terms);
                pack_bytes(&mut buf, &signature.0);
            }
            Self::SignAndDeposit { id, signature } => {
                buf.push(2);
                buf.extend_from_slice(&id.to_le_bytes());
                pack_bytes(&mut buf, &signature.0);
            }
            Self::Confirm { id } => pack_id(&mut buf, 3, *id),
            Self::PayRent { id } => pack_id(&mut buf, 4, *id),
            Self::AccrueYield { id } => pack_id(&mut buf, 5, *id),
            Self::WithdrawYield { id } => pack_id(&mut buf, 6, *id),
            Self::Complete { id } => pack_id(&mut buf, 7, *id),
            Self::Cancel { id } => pack_id(&mut buf, 8, *id),
            Self::RecoverClaim { id } => pack_id(&mut buf, 9, *id),
        }
        buf
    }
}

fn pack_id(buf: &mut Vec<u8>, tag: u8, id: AgreementId) {
    buf.push(tag);
    buf.extend_from_slice(&id.to_le_bytes());
}

fn pack_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    buf.extend_from_slice(bytes);
}

fn pack_terms(buf: &mut Vec<u8>, terms: &AgreementTerms) {
    buf.extend_from_slice(terms.tenant.as_ref());
    buf.extend_from_slice(terms.token.as_ref());
    buf.extend_from_slice(&terms.rent_amount.minor_units().to_le_bytes());
    buf.extend_from_slice(&terms.security_deposit.minor_units().to_le_bytes());
    buf.extend_from_slice(&terms.start_date.to_le_bytes());
    buf.extend_from_slice(&terms.end_date.to_le_bytes());
    buf.push(terms.payment_day);
    pack_bytes(buf, terms.property.as_bytes());
}

struct Reader<'a> {
    input: &'a [u8],
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], EscrowError> {
        if self.input.len() < len {
            return Err(EscrowError::InvalidInstruction);
        }
        let (head, tail) = self.input.split_at(len);
        self.input = tail;
        Ok(head)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], EscrowError> {
        self.take(N)?
            .try_into()
            .map_err(|_| EscrowError::InvalidInstruction)
    }

    fn u8(&mut self) -> Result<u8, EscrowError> {
        Ok(self.array::<1>()?[0])
    }

    fn u64(&mut self) -> Result<u64, EscrowError> {
        self.array().map(u64::from_le_bytes)
    }

    fn i64(&mut self) -> Result<UnixTimestamp, EscrowError> {
        self.array().map(i64::from_le_bytes)
    }

    fn pubkey(&mut self) -> Result<Pubkey, EscrowError> {
        self.array().map(Pubkey::new_from_array)
    }

    fn bytes(&mut self) -> Result<Vec<u8>, EscrowError> {
        let len = u32::from_le_bytes(self.array()?) as usize;
        Ok(self.take(len)?.to_vec())
    }

    fn terms(&mut self) -> Result<AgreementTerms, EscrowError> {
        let tenant = self.pubkey()?;
        let token = self.pubkey()?;
        let rent_amount = MonetaryAmount::from_minor(self.u64()?);
        let security_deposit = MonetaryAmount::from_minor(self.u64()?);
        let start_date = self.i64()?;
        let end_date = self.i64()?;
        let payment_day = self.u8()?;
        let property =
            String::from_utf8(self.bytes()?).map_err(|_| EscrowError::InvalidInstruction)?;
        Ok(AgreementTerms {
            tenant,
            token,
            property,
            rent_amount,
            security_deposit,
            start_date,
            end_date,
            payment_day,
        })
    }
}
