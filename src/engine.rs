use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use solana_program::{clock::UnixTimestamp, msg, pubkey::Pubkey};

use crate::{
    clock::Clock,
    config::EngineConfig,
    custody::{Custody, TransferLeg},
    error::{EscrowError, Result},
    fees::FeeCollector,
    money::MonetaryAmount,
    schedule::RentSchedule,
    settlement::{DepositSettlement, FullRelease},
    signature::{SignatureLedger, SignatureVerifier},
    state::{
        Agreement, AgreementId, AgreementStatus, AgreementTerms, ContentHash, OperationKind,
        PendingOperation, Role, SettlementEvent, SettlementKind, Signature, TransferReceipt,
    },
    store::{AgreementStore, StoredAgreement, ABSENT},
    yield_model::{Accrual, YieldAccrualModel},
    LOG_TAG_NAME,
};

/// Who may invoke an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Party {
    Landlord,
    Tenant,
    Either,
}

/// Record left claimed after a failed store write, and the state that
/// releases it.
#[derive(Debug, Clone)]
struct StrandedClaim {
    version: u64,
    resolved: Agreement,
}

/// Drives agreements through their lifecycle.
///
/// Every operation reloads the persisted record, re-validates it and commits
/// against the version it read. Operations that move funds first claim the
/// record (see [`PendingOperation`]) so that at most one transfer per
/// agreement is in flight, and restore the record if custody declines.
pub struct EscrowEngine<S, C, V, K> {
    store: S,
    custody: C,
    verifier: V,
    clock: K,
    config: EngineConfig,
    fees: FeeCollector,
    yield_model: YieldAccrualModel,
    settlement: Box<dyn DepositSettlement + Send + Sync>,
    stranded: Mutex<HashMap<AgreementId, StrandedClaim>>,
}

impl<S, C, V, K> EscrowEngine<S, C, V, K>
where
    S: AgreementStore,
    C: Custody,
    V: SignatureVerifier,
    K: Clock,
{
    pub fn new(config: EngineConfig, store: S, custody: C, verifier: V, clock: K) -> Result<Self> {
        config.validate()?;
        let fees = FeeCollector::new(config.fee_collector, config.fee_bps, config.reward_bps)?;
        let yield_model = YieldAccrualModel::new(config.annual_yield_bps);
        Ok(EscrowEngine {
            store,
            custody,
            verifier,
            clock,
            config,
            fees,
            yield_model,
            settlement: Box::new(FullRelease),
            stranded: Mutex::new(HashMap::new()),
        })
    }

    pub fn with_settlement<D>(mut self, settlement: D) -> Self
    where
        D: DepositSettlement + Send + Sync + 'static,
    {
        self.settlement = Box::new(settlement);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn ledger(&self) -> SignatureLedger<'_, V> {
        SignatureLedger::new(&self.verifier)
    }

    pub fn create_agreement(
        &self,
        landlord: &Pubkey,
        terms: AgreementTerms,
        signature: Signature,
    ) -> Result<Agreement> {
        self.validate_terms(landlord, &terms)?;
        let now = self.clock.unix_timestamp();
        let id = self.store.allocate_id()?;

        let mut agreement = Agreement::new(id, *landlord, terms, now);
        let hash = agreement.content_hash()?;
        self.ledger().attest(
            &mut agreement.signatures,
            Role::Landlord,
            landlord,
            hash,
            signature,
            now,
        )?;
        self.store.put_if_matches_version(&agreement, ABSENT)?;

        msg!(
            "{} Created agreement {}: landlord {}, tenant {}, rent {}, deposit {}",
            LOG_TAG_NAME,
            id,
            agreement.landlord,
            agreement.tenant,
            agreement.rent_amount,
            agreement.security_deposit
        );
        Ok(agreement)
    }

    /// Replaces the terms before the tenant has signed. Prior attestations are
    /// dropped and the landlord attests the new content.
    pub fn amend_terms(
        &self,
        caller: &Pubkey,
        id: AgreementId,
        terms: AgreementTerms,
        signature: Signature,
    ) -> Result<Agreement> {
        let stored = self.load(id, "amend")?;
        let current = &stored.agreement;
        self.authorize(current, caller, Party::Landlord, "amend")?;
        Self::require_status(current, &[AgreementStatus::PendingTenantSignature], "amend")?;
        self.validate_terms(&current.landlord, &terms)?;
        if terms.tenant != current.tenant || terms.token != current.token {
            msg!("{} Tenant and token cannot be amended", LOG_TAG_NAME);
            return Err(EscrowError::ValidationError("tenant and token are fixed"));
        }

        let now = self.clock.unix_timestamp();
        let mut next = current.clone();
        next.apply_terms(terms);
        let ledger = self.ledger();
        ledger.invalidate(&mut next.signatures);
        let hash = next.content_hash()?;
        ledger.attest(&mut next.signatures, Role::Landlord, caller, hash, signature, now)?;

        let agreement = self.commit(next, stored.version)?;
        msg!("{} Amended terms of agreement {}", LOG_TAG_NAME, id);
        Ok(agreement)
    }

    pub fn sign_and_deposit(
        &self,
        caller: &Pubkey,
        id: AgreementId,
        signature: Signature,
    ) -> Result<Agreement> {
        let stored = self.load(id, "sign")?;
        let current = &stored.agreement;
        self.authorize(current, caller, Party::Tenant, "sign")?;
        Self::require_status(current, &[AgreementStatus::PendingTenantSignature], "sign")?;

        let now = self.clock.unix_timestamp();
        let mut next = current.clone();
        let hash = next.content_hash()?;
        self.ledger()
            .attest(&mut next.signatures, Role::Tenant, caller, hash, signature, now)?;
        next.status = AgreementStatus::PendingLandlordSignature;
        next.tenant_signed_at = Some(now);
        next.deposit_held = next.security_deposit;

        let legs = Self::non_zero(vec![TransferLeg::new(
            current.tenant,
            self.config.escrow_account,
            current.security_deposit,
        )]);
        let (version, receipt) =
            self.settle(&stored, OperationKind::SignAndDeposit, caller, now, &legs)?;

        let agreement = self.commit_settled(next, version, receipt)?;
        msg!(
            "{} Tenant signed agreement {} and escrowed {}",
            LOG_TAG_NAME,
            id,
            agreement.deposit_held
        );
        Ok(agreement)
    }

    pub fn confirm(&self, caller: &Pubkey, id: AgreementId) -> Result<Agreement> {
        let stored = self.load(id, "confirm")?;
        let current = &stored.agreement;
        self.authorize(current, caller, Party::Landlord, "confirm")?;
        Self::require_status(current, &[AgreementStatus::PendingLandlordSignature], "confirm")?;

        let hash = current.content_hash()?;
        let signed_current_terms = current
            .signatures
            .landlord
            .as_ref()
            .map_or(false, |attestation| attestation.content_hash == hash);
        if !self.ledger().is_fully_signed(&current.signatures) || !signed_current_terms {
            msg!("{} Agreement {} is not fully signed", LOG_TAG_NAME, id);
            return Err(EscrowError::InvalidTransition {
                id,
                status: current.status,
                operation: "confirm",
                reason: "both parties must sign the current terms",
            });
        }

        let now = self.clock.unix_timestamp();
        let mut next = current.clone();
        next.status = AgreementStatus::Active;
        next.activated_at = Some(now);
        next.last_accrual = Some(now);

        let agreement = self.commit(next, stored.version)?;
        msg!("{} Agreement {} is active", LOG_TAG_NAME, id);
        Ok(agreement)
    }

    pub fn pay_rent(&self, caller: &Pubkey, id: AgreementId) -> Result<Agreement> {
        let stored = self.load(id, "pay rent")?;
        let current = &stored.agreement;
        self.authorize(current, caller, Party::Tenant, "pay rent")?;
        Self::require_status(current, &[AgreementStatus::Active], "pay rent")?;

        let now = self.clock.unix_timestamp();
        let schedule = RentSchedule {
            id,
            start_date: current.start_date,
            end_date: current.end_date,
            payment_day: current.payment_day,
            last_paid_cycle: current.last_paid_cycle,
        };
        let cycle = schedule.cycle_for_payment(now, &self.config.rent_window)?;
        if current.last_paid_cycle.map_or(false, |paid| cycle <= paid) {
            msg!("{} Rent cycle {} already settled for agreement {}", LOG_TAG_NAME, cycle, id);
            return Err(EscrowError::InvalidTransition {
                id,
                status: current.status,
                operation: "pay rent",
                reason: "rent for this cycle is already settled",
            });
        }

        let split = self.fees.split(current.rent_amount)?;
        let legs = self.fees.legs(
            &split,
            &current.tenant,
            &current.landlord,
            &self.config.escrow_account,
        );

        let mut next = current.clone();
        next.last_rent_payment = Some(now);
        next.last_paid_cycle = Some(cycle);
        next.rewards_earned = next.rewards_earned.checked_add(split.reward)?;
        next.fees_paid = next.fees_paid.checked_add(split.fee)?;

        let (version, receipt) = self.settle(&stored, OperationKind::PayRent, caller, now, &legs)?;
        let event = SettlementEvent {
            sequence: next.next_sequence(),
            kind: SettlementKind::RentPayment {
                cycle,
                landlord_share: split.landlord_share,
                fee: split.fee,
                reward: split.reward,
            },
            amount: split.rent,
            from: current.tenant,
            to: current.landlord,
            timestamp: now,
            receipt: receipt.unwrap_or_default(),
        };
        next.transactions.push(event);

        let agreement = self.commit_settled(next, version, receipt)?;
        msg!(
            "{} Rent paid on agreement {}: amount {}, fee {}, reward {}",
            LOG_TAG_NAME,
            id,
            split.rent,
            split.fee,
            split.reward
        );
        Ok(agreement)
    }

    /// Brings `accrued_yield` up to the current clock. Returns the increment;
    /// a repeated tick at the same time accrues nothing.
    pub fn accrue_yield(&self, id: AgreementId) -> Result<MonetaryAmount> {
        let stored = self.load(id, "accrue yield")?;
        let current = &stored.agreement;
        Self::require_status(current, &[AgreementStatus::Active], "accrue yield")?;

        let now = self.clock.unix_timestamp();
        let accrual = self.accrual(current, now)?;
        if accrual.total_days == current.yield_days_accrued {
            return Ok(MonetaryAmount::ZERO);
        }

        let mut next = current.clone();
        Self::apply_accrual(&mut next, accrual, now)?;
        self.commit(next, stored.version)?;
        msg!(
            "{} Accrued {} yield on agreement {} ({} days)",
            LOG_TAG_NAME,
            accrual.increment,
            id,
            accrual.total_days
        );
        Ok(accrual.increment)
    }

    /// Pays out everything accrued so far to the landlord.
    pub fn withdraw_yield(&self, caller: &Pubkey, id: AgreementId) -> Result<MonetaryAmount> {
        let stored = self.load(id, "withdraw yield")?;
        let current = &stored.agreement;
        self.authorize(current, caller, Party::Landlord, "withdraw yield")?;
        Self::require_status(current, &[AgreementStatus::Active], "withdraw yield")?;

        let now = self.clock.unix_timestamp();
        let mut next = current.clone();
        let accrual = self.accrual(current, now)?;
        Self::apply_accrual(&mut next, accrual, now)?;

        let amount = next.accrued_yield;
        if amount.is_zero() {
            msg!("{} No yield available on agreement {}", LOG_TAG_NAME, id);
            return Err(EscrowError::InvalidTransition {
                id,
                status: current.status,
                operation: "withdraw yield",
                reason: "no yield available to withdraw",
            });
        }
        next.accrued_yield = MonetaryAmount::ZERO;
        next.total_yield_paid = next.total_yield_paid.checked_add(amount)?;
        next.last_yield_withdrawal = Some(now);

        let legs = [TransferLeg::new(self.config.escrow_account, current.landlord, amount)];
        let (version, receipt) =
            self.settle(&stored, OperationKind::WithdrawYield, caller, now, &legs)?;
        next.transactions.push(SettlementEvent {
            sequence: next.next_sequence(),
            kind: SettlementKind::YieldWithdrawal,
            amount,
            from: self.config.escrow_account,
            to: current.landlord,
            timestamp: now,
            receipt: receipt.unwrap_or_default(),
        });

        self.commit_settled(next, version, receipt)?;
        msg!("{} Landlord withdrew {} yield from agreement {}", LOG_TAG_NAME, amount, id);
        Ok(amount)
    }

    /// Closes an agreement after its end date. The deposit, net of any agreed
    /// deduction, goes back to the tenant; the deduction and any yield still
    /// accrued go to the landlord.
    pub fn complete(&self, caller: &Pubkey, id: AgreementId) -> Result<Agreement> {
        let stored = self.load(id, "complete")?;
        let current = &stored.agreement;
        self.authorize(current, caller, Party::Either, "complete")?;
        Self::require_status(current, &[AgreementStatus::Active], "complete")?;

        let now = self.clock.unix_timestamp();
        if now < current.end_date {
            msg!("{} Agreement {} has not reached its end date", LOG_TAG_NAME, id);
            return Err(EscrowError::InvalidTransition {
                id,
                status: current.status,
                operation: "complete",
                reason: "agreement term has not ended",
            });
        }
        if self.settlement.has_open_claim(current) {
            msg!("{} Agreement {} has an open deposit claim", LOG_TAG_NAME, id);
            return Err(EscrowError::InvalidTransition {
                id,
                status: current.status,
                operation: "complete",
                reason: "deposit claim is unresolved",
            });
        }
        let deduction = self.settlement.deduction(current);
        let refund = current
            .deposit_held
            .checked_sub(deduction)
            .map_err(|_| EscrowError::ValidationError("deduction exceeds the deposit"))?;

        let mut next = current.clone();
        let accrual = self.accrual(current, now)?;
        Self::apply_accrual(&mut next, accrual, now)?;
        let outstanding_yield = next.accrued_yield;

        let escrow = self.config.escrow_account;
        let legs = Self::non_zero(vec![
            TransferLeg::new(escrow, current.tenant, refund),
            TransferLeg::new(escrow, current.landlord, deduction),
            TransferLeg::new(escrow, current.landlord, outstanding_yield),
        ]);

        next.status = AgreementStatus::Completed;
        next.closed_at = Some(now);
        next.deposit_held = MonetaryAmount::ZERO;
        if !outstanding_yield.is_zero() {
            next.accrued_yield = MonetaryAmount::ZERO;
            next.total_yield_paid = next.total_yield_paid.checked_add(outstanding_yield)?;
            next.last_yield_withdrawal = Some(now);
        }

        let (version, receipt) = self.settle(&stored, OperationKind::Complete, caller, now, &legs)?;
        if !outstanding_yield.is_zero() {
            next.transactions.push(SettlementEvent {
                sequence: next.next_sequence(),
                kind: SettlementKind::YieldWithdrawal,
                amount: outstanding_yield,
                from: escrow,
                to: current.landlord,
                timestamp: now,
                receipt: receipt.unwrap_or_default(),
            });
        }

        let agreement = self.commit_settled(next, version, receipt)?;
        msg!(
            "{} Completed agreement {}: released {} to tenant, {} deducted",
            LOG_TAG_NAME,
            id,
            refund,
            deduction
        );
        Ok(agreement)
    }

    /// Cancels an agreement that never became active, refunding any deposit.
    pub fn cancel(&self, caller: &Pubkey, id: AgreementId) -> Result<Agreement> {
        let stored = self.load(id, "cancel")?;
        let current = &stored.agreement;
        self.authorize(current, caller, Party::Landlord, "cancel")?;
        Self::require_status(
            current,
            &[
                AgreementStatus::PendingTenantSignature,
                AgreementStatus::PendingLandlordSignature,
            ],
            "cancel",
        )?;

        let now = self.clock.unix_timestamp();
        let refund = current.deposit_held;
        let legs = Self::non_zero(vec![TransferLeg::new(
            self.config.escrow_account,
            current.tenant,
            refund,
        )]);

        let mut next = current.clone();
        next.status = AgreementStatus::Cancelled;
        next.closed_at = Some(now);
        next.deposit_held = MonetaryAmount::ZERO;

        let (version, receipt) = self.settle(&stored, OperationKind::Cancel, caller, now, &legs)?;
        let agreement = self.commit_settled(next, version, receipt)?;
        msg!("{} Cancelled agreement {}, refunded {}", LOG_TAG_NAME, id, refund);
        Ok(agreement)
    }

    /// Releases a record left claimed by [`EscrowError::RestoreFailed`] or
    /// [`EscrowError::CommitFailed`]. Writes the pre-operation state in the
    /// first case and the settled state in the second, so no transfer is
    /// repeated.
    pub fn recover_claim(&self, caller: &Pubkey, id: AgreementId) -> Result<Agreement> {
        let stored = self
            .store
            .get(id)?
            .ok_or(EscrowError::AgreementNotFound(id))?;
        self.authorize(&stored.agreement, caller, Party::Either, "recover claim")?;

        let claimed = stored.agreement.pending.is_some();
        let claim = self.stranded_claims().get(&id).cloned();
        let claim = match claim {
            Some(claim) if claimed && claim.version == stored.version => claim,
            _ => {
                msg!("{} Agreement {} has no stranded claim", LOG_TAG_NAME, id);
                return Err(EscrowError::InvalidTransition {
                    id,
                    status: stored.agreement.status,
                    operation: "recover claim",
                    reason: "no stranded claim to recover",
                });
            }
        };

        self.store.put_if_matches_version(&claim.resolved, claim.version)?;
        self.stranded_claims().remove(&id);
        msg!(
            "{} Released claim on agreement {} at version {}",
            LOG_TAG_NAME,
            id,
            claim.version
        );
        Ok(claim.resolved)
    }

    pub fn get_agreement(&self, id: AgreementId) -> Result<Agreement> {
        self.store
            .get(id)?
            .map(|stored| stored.agreement)
            .ok_or(EscrowError::AgreementNotFound(id))
    }

    pub fn list_agreements(&self, participant: &Pubkey) -> Result<Vec<Agreement>> {
        Ok(self
            .store
            .list_by_participant(participant)?
            .into_iter()
            .map(|stored| stored.agreement)
            .collect())
    }

    /// Hash the parties sign for the agreement's current terms.
    pub fn content_hash(&self, id: AgreementId) -> Result<ContentHash> {
        self.get_agreement(id)?.content_hash()
    }

    fn validate_terms(&self, landlord: &Pubkey, terms: &AgreementTerms) -> Result<()> {
        if let Err(e) = terms.validate(landlord) {
            msg!("{} Rejected terms: {}", LOG_TAG_NAME, e);
            return Err(e);
        }
        let escrow = &self.config.escrow_account;
        if landlord == escrow || &terms.tenant == escrow {
            return Err(EscrowError::ValidationError("escrow account cannot be a party"));
        }
        Ok(())
    }

    fn load(&self, id: AgreementId, operation: &'static str) -> Result<StoredAgreement> {
        let stored = self
            .store
            .get(id)?
            .ok_or(EscrowError::AgreementNotFound(id))?;
        if let Some(pending) = stored.agreement.pending {
            msg!(
                "{} Agreement {} busy with {:?}",
                LOG_TAG_NAME,
                id,
                pending.kind
            );
            return Err(EscrowError::InvalidTransition {
                id,
                status: stored.agreement.status,
                operation,
                reason: "another operation is in flight",
            });
        }
        Ok(stored)
    }

    /// The one place caller addresses are matched against agreement roles.
    fn authorize(
        &self,
        agreement: &Agreement,
        caller: &Pubkey,
        required: Party,
        operation: &'static str,
    ) -> Result<Role> {
        let role = agreement.role_of(caller);
        let allowed = match (required, role) {
            (Party::Either, Some(_)) => true,
            (Party::Landlord, Some(Role::Landlord)) => true,
            (Party::Tenant, Some(Role::Tenant)) => true,
            _ => false,
        };
        match role {
            Some(role) if allowed => Ok(role),
            _ => {
                msg!(
                    "{} {} may not {} agreement {}",
                    LOG_TAG_NAME,
                    caller,
                    operation,
                    agreement.id
                );
                Err(EscrowError::RoleMismatch {
                    id: agreement.id,
                    caller: *caller,
                    operation,
                })
            }
        }
    }

    fn require_status(
        agreement: &Agreement,
        allowed: &[AgreementStatus],
        operation: &'static str,
    ) -> Result<()> {
        if allowed.contains(&agreement.status) {
            return Ok(());
        }
        msg!(
            "{} Cannot {} agreement {} while {:?}",
            LOG_TAG_NAME,
            operation,
            agreement.id,
            agreement.status
        );
        Err(EscrowError::InvalidTransition {
            id: agreement.id,
            status: agreement.status,
            operation,
            reason: "operation not allowed in this state",
        })
    }

    fn accrual(&self, agreement: &Agreement, now: UnixTimestamp) -> Result<Accrual> {
        let anchor = agreement.activated_at.ok_or(EscrowError::InvalidTransition {
            id: agreement.id,
            status: agreement.status,
            operation: "accrue yield",
            reason: "agreement was never activated",
        })?;
        self.yield_model.advance(
            agreement.deposit_held,
            anchor,
            agreement.yield_days_accrued,
            agreement.last_accrual,
            now,
            agreement.end_date,
        )
    }

    fn apply_accrual(
        agreement: &mut Agreement,
        accrual: Accrual,
        now: UnixTimestamp,
    ) -> Result<()> {
        if accrual.total_days == agreement.yield_days_accrued {
            return Ok(());
        }
        agreement.accrued_yield = agreement.accrued_yield.checked_add(accrual.increment)?;
        agreement.yield_days_accrued = accrual.total_days;
        agreement.last_accrual = Some(now);
        Ok(())
    }

    fn non_zero(legs: Vec<TransferLeg>) -> Vec<TransferLeg> {
        legs.into_iter().filter(|leg| !leg.amount.is_zero()).collect()
    }

    /// Claims the record and moves funds. Returns the claimed version to
    /// commit against and the custody receipt. Without legs nothing is
    /// claimed and custody is not called.
    fn settle(
        &self,
        stored: &StoredAgreement,
        kind: OperationKind,
        caller: &Pubkey,
        now: UnixTimestamp,
        legs: &[TransferLeg],
    ) -> Result<(u64, Option<TransferReceipt>)> {
        if legs.is_empty() {
            return Ok((stored.version, None));
        }

        let id = stored.agreement.id;
        let mut claimed = stored.agreement.clone();
        claimed.pending = Some(PendingOperation {
            kind,
            caller: *caller,
            claimed_at: now,
        });
        let claimed_version = self.store.put_if_matches_version(&claimed, stored.version)?;

        let token = &stored.agreement.token;
        let outcome = match legs {
            [leg] => self.custody.transfer(token, &leg.from, &leg.to, leg.amount),
            _ => self.custody.transfer_batch(token, legs),
        };

        match outcome {
            Ok(receipt) => Ok((claimed_version, Some(receipt))),
            Err(source) => {
                msg!(
                    "{} Transfer for {:?} on agreement {} failed: {}",
                    LOG_TAG_NAME,
                    kind,
                    id,
                    source
                );
                if let Err(e) = self
                    .store
                    .put_if_matches_version(&stored.agreement, claimed_version)
                {
                    msg!("{} Could not release claim on agreement {}: {}", LOG_TAG_NAME, id, e);
                    self.strand(id, claimed_version, stored.agreement.clone());
                    return Err(EscrowError::RestoreFailed {
                        id,
                        version: claimed_version,
                        transfer: source,
                        store: Box::new(e),
                    });
                }
                Err(EscrowError::TransferFailed { id, source })
            }
        }
    }

    fn commit(&self, mut next: Agreement, expected: u64) -> Result<Agreement> {
        next.pending = None;
        self.store.put_if_matches_version(&next, expected)?;
        Ok(next)
    }

    /// Commits after [`Self::settle`]. With a receipt the funds have already
    /// moved, so a failed write keeps the settled state for
    /// [`Self::recover_claim`].
    fn commit_settled(
        &self,
        mut next: Agreement,
        expected: u64,
        receipt: Option<TransferReceipt>,
    ) -> Result<Agreement> {
        let receipt = match receipt {
            Some(receipt) => receipt,
            None => return self.commit(next, expected),
        };
        next.pending = None;
        if let Err(e) = self.store.put_if_matches_version(&next, expected) {
            let id = next.id;
            msg!(
                "{} Agreement {} settled but not stored at version {}: {}",
                LOG_TAG_NAME,
                id,
                expected,
                e
            );
            self.strand(id, expected, next);
            return Err(EscrowError::CommitFailed {
                id,
                version: expected,
                receipt,
                store: Box::new(e),
            });
        }
        Ok(next)
    }

    fn strand(&self, id: AgreementId, version: u64, mut resolved: Agreement) {
        resolved.pending = None;
        self.stranded_claims().insert(id, StrandedClaim { version, resolved });
    }

    fn stranded_claims(&self) -> MutexGuard<'_, HashMap<AgreementId, StrandedClaim>> {
        match self.stranded.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
