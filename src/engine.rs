//! Round state machine.
//!
//! `Open --perform_upkeep--> Calculating --fulfill_random_words--> Open`.
//! Every transition checks its own preconditions and leaves the raffle
//! untouched when it fails. Nothing here reads accounts or sysvars; the
//! processor passes `now` and the two seams below.

use solana_program::{clock::UnixTimestamp, msg, program_error::ProgramError, pubkey::Pubkey};

use crate::events::RaffleEvent;
use crate::raffle_error::RaffleError;
use crate::raffle_state::{Raffle, RaffleConfig, RaffleState, NUM_WORDS, REQUEST_CONFIRMATIONS};
use crate::vrf::{RandomWord, RandomnessRequest};

/// Issues randomness requests and returns the provider's request id
pub trait RandomnessProvider {
    fn request_random_words(&mut self, request: &RandomnessRequest) -> Result<u64, ProgramError>;
}

/// Moves the prize out of the pool
pub trait PrizeVault {
    fn pay(&mut self, winner: &Pubkey, amount: u64) -> Result<(), ProgramError>;
}

/// The four draw conditions, evaluated together
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UpkeepStatus {
    pub is_open: bool,
    pub time_passed: bool,
    pub has_players: bool,
    pub has_balance: bool,
}

impl UpkeepStatus {
    pub fn upkeep_needed(&self) -> bool {
        self.is_open && self.time_passed && self.has_players && self.has_balance
    }
}

impl Raffle {
    pub fn new(raffle_id: u64, bump: u8, config: RaffleConfig, now: UnixTimestamp) -> Self {
        Raffle {
            is_initialized: true,
            raffle_id,
            bump,
            config,
            state: RaffleState::Open,
            last_timestamp: now,
            pool_balance: 0,
            pending_request_id: None,
            recent_winner: None,
            round: 0,
            entrants: Vec::new(),
        }
    }

    /// Records one ticket for `player`.
    pub fn enter(&mut self, player: Pubkey, amount: u64) -> Result<RaffleEvent, RaffleError> {
        if amount < self.config.entrance_fee {
            return Err(RaffleError::InsufficientPayment);
        }
        if self.state != RaffleState::Open {
            return Err(RaffleError::RaffleNotOpen);
        }
        let pool_balance = self
            .pool_balance
            .checked_add(amount)
            .ok_or(RaffleError::MathOverflow)?;

        self.pool_balance = pool_balance;
        self.entrants.push(player);

        Ok(RaffleEvent::RaffleEntered {
            player,
            round: self.round,
        })
    }

    /// Read-only eligibility check, safe to call any number of times.
    pub fn check_upkeep(&self, now: UnixTimestamp) -> UpkeepStatus {
        let elapsed = now.saturating_sub(self.last_timestamp);
        UpkeepStatus {
            is_open: self.state == RaffleState::Open,
            time_passed: elapsed >= self.config.interval,
            has_players: !self.entrants.is_empty(),
            has_balance: self.pool_balance > 0,
        }
    }

    pub fn randomness_request(&self) -> RandomnessRequest {
        RandomnessRequest {
            key_hash: self.config.key_hash,
            subscription_id: self.config.subscription_id,
            request_confirmations: REQUEST_CONFIRMATIONS,
            callback_gas_limit: self.config.callback_gas_limit,
            num_words: NUM_WORDS,
        }
    }

    /// Freezes the round and asks `provider` for one random word.
    pub fn perform_upkeep<P: RandomnessProvider>(
        &mut self,
        now: UnixTimestamp,
        provider: &mut P,
    ) -> Result<RaffleEvent, RaffleError> {
        if !self.check_upkeep(now).upkeep_needed() {
            return Err(RaffleError::UpkeepNotNeeded {
                balance: self.pool_balance,
                players: self.entrant_count(),
                state: self.state,
            });
        }

        let request_id = provider.request_random_words(&self.randomness_request())?;
        if request_id == 0 {
            return Err(RaffleError::InvalidRequestId);
        }

        self.state = RaffleState::Calculating;
        self.pending_request_id = Some(request_id);

        Ok(RaffleEvent::RequestedRaffleWinner { request_id })
    }

    /// Entrant chosen by `random_words[0] mod entrant_count`.
    pub fn select_winner(&self, random_words: &[RandomWord]) -> Result<Pubkey, RaffleError> {
        let word = random_words.first().ok_or(RaffleError::MissingRandomWords)?;
        // A calculating round always has players; an empty list means the
        // request cannot belong to this round.
        let index = word
            .index_into(self.entrant_count())
            .ok_or(RaffleError::UnknownOrStaleRequest)?;
        self.entrants
            .get(index as usize)
            .copied()
            .ok_or(RaffleError::UnknownOrStaleRequest)
    }

    /// Settles the round for the pending request.
    ///
    /// The prize is paid before any field changes, so a failed payout leaves
    /// the round calculating with its entrants and pool intact.
    pub fn fulfill_random_words<V: PrizeVault>(
        &mut self,
        request_id: u64,
        random_words: &[RandomWord],
        now: UnixTimestamp,
        vault: &mut V,
    ) -> Result<RaffleEvent, RaffleError> {
        if self.state != RaffleState::Calculating || self.pending_request_id != Some(request_id) {
            return Err(RaffleError::UnknownOrStaleRequest);
        }

        let winner = self.select_winner(random_words)?;
        vault.pay(&winner, self.pool_balance).map_err(|e| {
            msg!("Payout of {} lamports to {} failed: {}", self.pool_balance, winner, e);
            RaffleError::PayoutFailed
        })?;

        let settled_round = self.round;
        self.recent_winner = Some(winner);
        self.entrants = Vec::new();
        self.pool_balance = 0;
        self.last_timestamp = now;
        self.state = RaffleState::Open;
        self.pending_request_id = None;
        self.round = self.round.saturating_add(1);

        Ok(RaffleEvent::WinnerPicked {
            winner,
            round: settled_round,
        })
    }
}
