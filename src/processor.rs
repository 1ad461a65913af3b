use solana_program::{msg, program_error::ProgramError, pubkey::Pubkey};

use crate::{
    clock::Clock,
    custody::Custody,
    engine::EscrowEngine,
    instruction::EscrowInstruction,
    signature::SignatureVerifier,
    state::AgreementId,
    store::AgreementStore,
    LOG_TAG_NAME,
};

pub struct Processor;
impl Processor {
    /// Decodes `instruction_data` and runs it against `engine` on behalf of
    /// `caller`. Returns the id of the agreement the instruction acted on.
    pub fn process<S, C, V, K>(
        engine: &EscrowEngine<S, C, V, K>,
        caller: &Pubkey,
        instruction_data: &[u8],
    ) -> Result<AgreementId, ProgramError>
    where
        S: AgreementStore,
        C: Custody,
        V: SignatureVerifier,
        K: Clock,
    {
        let instruction = EscrowInstruction::unpack(instruction_data).map_err(|e| {
            msg!("{} Rejected instruction data: {}", LOG_TAG_NAME, e);
            ProgramError::from(e)
        })?;

        let result = match instruction {
            EscrowInstruction::CreateAgreement { terms, signature } => engine
                .create_agreement(caller, terms, signature)
                .map(|agreement| agreement.id),

            EscrowInstruction::AmendTerms {
                id,
                terms,
                signature,
            } => engine.amend_terms(caller, id, terms, signature).map(|_| id),

            EscrowInstruction::SignAndDeposit { id, signature } => {
                engine.sign_and_deposit(caller, id, signature).map(|_| id)
            }

            EscrowInstruction::Confirm { id } => engine.confirm(caller, id).map(|_| id),

            EscrowInstruction::PayRent { id } => engine.pay_rent(caller, id).map(|_| id),

            EscrowInstruction::AccrueYield { id } => engine.accrue_yield(id).map(|_| id),

            EscrowInstruction::WithdrawYield { id } => {
                engine.withdraw_yield(caller, id).map(|_| id)
            }

            EscrowInstruction::Complete { id } => engine.complete(caller, id).map(|_| id),

            EscrowInstruction::Cancel { id } => engine.cancel(caller, id).map(|_| id),

            EscrowInstruction::RecoverClaim { id } => {
                engine.recover_claim(caller, id).map(|_| id)
            }
        };

        result.map_err(|e| {
            msg!("{} Instruction failed with code {}: {}", LOG_TAG_NAME, e.code(), e);
            ProgramError::from(e)
        })
    }
}
