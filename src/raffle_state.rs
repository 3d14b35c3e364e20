use arrayref::{array_mut_ref, array_ref, array_refs, mut_array_refs};
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    clock::UnixTimestamp,
    program_error::ProgramError,
    program_pack::{IsInitialized, Pack, Sealed},
    pubkey::{Pubkey, PUBKEY_BYTES},
};
use std::convert::TryFrom;

/// Random words requested per draw
pub const NUM_WORDS: u32 = 1;
/// Confirmations the coordinator waits before answering
pub const REQUEST_CONFIRMATIONS: u16 = 3;

/// State of the current round
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RaffleState {
    /// Accepting entries
    Open,
    /// Randomness requested, waiting for delivery
    Calculating,
}

impl TryFrom<u8> for RaffleState {
    type Error = ProgramError;

    fn try_from(val: u8) -> Result<Self, Self::Error> {
        match val {
            0 => Ok(RaffleState::Open),
            1 => Ok(RaffleState::Calculating),
            _ => Err(ProgramError::InvalidAccountData),
        }
    }
}

impl From<RaffleState> for u8 {
    fn from(state: RaffleState) -> Self {
        match state {
            RaffleState::Open => 0,
            RaffleState::Calculating => 1,
        }
    }
}

/// Immutable raffle parameters, set once at initialization
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RaffleConfig {
    /// Minimum payment per entry in lamports
    pub entrance_fee: u64,
    /// Minimum seconds between settlements
    pub interval: i64,
    /// Program that serves randomness requests
    pub coordinator_program: Pubkey,
    /// Only signer allowed to deliver random words
    pub fulfillment_authority: Pubkey,
    /// Coordinator gas lane
    pub key_hash: [u8; 32],
    /// Coordinator subscription paying for requests
    pub subscription_id: u64,
    /// Limit passed through to the coordinator for the delivery callback
    pub callback_gas_limit: u32,
}

impl RaffleConfig {
    pub fn validate(&self) -> bool {
        self.entrance_fee > 0 && self.interval >= 0
    }
}

impl Sealed for RaffleConfig {}

impl Pack for RaffleConfig {
    const LEN: usize = 8 + 8 + 32 + 32 + 32 + 8 + 4;

    fn unpack_from_slice(src: &[u8]) -> Result<Self, ProgramError> {
        let src = array_ref![src, 0, RaffleConfig::LEN];
        let (
            entrance_fee,
            interval,
            coordinator_program,
            fulfillment_authority,
            key_hash,
            subscription_id,
            callback_gas_limit,
        ) = array_refs![src, 8, 8, 32, 32, 32, 8, 4];

        Ok(RaffleConfig {
            entrance_fee: u64::from_le_bytes(*entrance_fee),
            interval: i64::from_le_bytes(*interval),
            coordinator_program: Pubkey::new_from_array(*coordinator_program),
            fulfillment_authority: Pubkey::new_from_array(*fulfillment_authority),
            key_hash: *key_hash,
            subscription_id: u64::from_le_bytes(*subscription_id),
            callback_gas_limit: u32::from_le_bytes(*callback_gas_limit),
        })
    }

    fn pack_into_slice(&self, dst: &mut [u8]) {
        let dst = array_mut_ref![dst, 0, RaffleConfig::LEN];
        let (
            entrance_fee_dst,
            interval_dst,
            coordinator_program_dst,
            fulfillment_authority_dst,
            key_hash_dst,
            subscription_id_dst,
            callback_gas_limit_dst,
        ) = mut_array_refs![dst, 8, 8, 32, 32, 32, 8, 4];

        *entrance_fee_dst = self.entrance_fee.to_le_bytes();
        *interval_dst = self.interval.to_le_bytes();
        coordinator_program_dst.copy_from_slice(self.coordinator_program.as_ref());
        fulfillment_authority_dst.copy_from_slice(self.fulfillment_authority.as_ref());
        *key_hash_dst = self.key_hash;
        *subscription_id_dst = self.subscription_id.to_le_bytes();
        *callback_gas_limit_dst = self.callback_gas_limit.to_le_bytes();
    }
}

/// Raffle account data.
///
/// Stored as a fixed header followed by `entrants.len()` pubkeys. The account
/// grows by one key per entry and is shrunk back to the header when a round
/// settles.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raffle {
    /// Is the account initialized
    pub is_initialized: bool,
    /// Identifier used in the PDA seeds
    pub raffle_id: u64,
    /// PDA bump seed
    pub bump: u8,
    /// Immutable parameters
    pub config: RaffleConfig,
    /// Current state of the round
    pub state: RaffleState,
    /// Time the previous round settled, or the raffle was created
    pub last_timestamp: UnixTimestamp,
    /// Lamports paid into the current round
    pub pool_balance: u64,
    /// Outstanding randomness request, only while calculating
    pub pending_request_id: Option<u64>,
    /// Winner of the last settled round
    pub recent_winner: Option<Pubkey>,
    /// Number of settled rounds
    pub round: u64,
    /// One key per ticket, in entry order
    pub entrants: Vec<Pubkey>,
}

impl Raffle {
    pub const HEADER_LEN: usize =
        1 + 8 + 1 + RaffleConfig::LEN + 1 + 8 + 8 + 8 + PUBKEY_BYTES + 8 + 8;

    /// Account size needed to hold this raffle
    pub fn packed_len(&self) -> usize {
        Self::HEADER_LEN + self.entrants.len() * PUBKEY_BYTES
    }

    pub fn unpack(src: &[u8]) -> Result<Self, ProgramError> {
        if src.len() < Self::HEADER_LEN {
            return Err(ProgramError::InvalidAccountData);
        }
        let (header, body) = src.split_at(Self::HEADER_LEN);
        let header = array_ref![header, 0, Raffle::HEADER_LEN];
        let (
            is_initialized,
            raffle_id,
            bump,
            config,
            state,
            last_timestamp,
            pool_balance,
            pending_request_id,
            recent_winner,
            round,
            entrant_count,
        ) = array_refs![header, 1, 8, 1, RaffleConfig::LEN, 1, 8, 8, 8, PUBKEY_BYTES, 8, 8];

        let entrant_count = usize::try_from(u64::from_le_bytes(*entrant_count))
            .map_err(|_| ProgramError::InvalidAccountData)?;
        let entrant_bytes = entrant_count
            .checked_mul(PUBKEY_BYTES)
            .filter(|len| *len <= body.len())
            .ok_or(ProgramError::InvalidAccountData)?;
        let entrants = body[..entrant_bytes]
            .chunks_exact(PUBKEY_BYTES)
            .map(|key| Pubkey::new_from_array(*array_ref![key, 0, PUBKEY_BYTES]))
            .collect();

        let pending_request_id = match u64::from_le_bytes(*pending_request_id) {
            0 => None,
            id => Some(id),
        };
        let recent_winner = Pubkey::new_from_array(*recent_winner);

        Ok(Raffle {
            is_initialized: is_initialized[0] != 0,
            raffle_id: u64::from_le_bytes(*raffle_id),
            bump: bump[0],
            config: RaffleConfig::unpack_from_slice(config)?,
            state: RaffleState::try_from(state[0])?,
            last_timestamp: UnixTimestamp::from_le_bytes(*last_timestamp),
            pool_balance: u64::from_le_bytes(*pool_balance),
            pending_request_id,
            recent_winner: (recent_winner != Pubkey::default()).then(|| recent_winner),
            round: u64::from_le_bytes(*round),
            entrants,
        })
    }

    pub fn pack_into(&self, dst: &mut [u8]) -> Result<(), ProgramError> {
        if dst.len() < self.packed_len() {
            return Err(ProgramError::AccountDataTooSmall);
        }
        let (header, body) = dst.split_at_mut(Self::HEADER_LEN);
        let header = array_mut_ref![header, 0, Raffle::HEADER_LEN];
        let (
            is_initialized_dst,
            raffle_id_dst,
            bump_dst,
            config_dst,
            state_dst,
            last_timestamp_dst,
            pool_balance_dst,
            pending_request_id_dst,
            recent_winner_dst,
            round_dst,
            entrant_count_dst,
        ) = mut_array_refs![header, 1, 8, 1, RaffleConfig::LEN, 1, 8, 8, 8, PUBKEY_BYTES, 8, 8];

        is_initialized_dst[0] = self.is_initialized as u8;
        *raffle_id_dst = self.raffle_id.to_le_bytes();
        bump_dst[0] = self.bump;
        self.config.pack_into_slice(config_dst);
        state_dst[0] = self.state.into();
        *last_timestamp_dst = self.last_timestamp.to_le_bytes();
        *pool_balance_dst = self.pool_balance.to_le_bytes();
        *pending_request_id_dst = self.pending_request_id.unwrap_or(0).to_le_bytes();
        recent_winner_dst.copy_from_slice(self.recent_winner.unwrap_or_default().as_ref());
        *round_dst = self.round.to_le_bytes();
        *entrant_count_dst = (self.entrants.len() as u64).to_le_bytes();

        for (slot, key) in body.chunks_exact_mut(PUBKEY_BYTES).zip(&self.entrants) {
            slot.copy_from_slice(key.as_ref());
        }
        Ok(())
    }

    pub fn entrance_fee(&self) -> u64 {
        self.config.entrance_fee
    }

    pub fn state(&self) -> RaffleState {
        self.state
    }

    pub fn interval(&self) -> i64 {
        self.config.interval
    }

    pub fn entrant_count(&self) -> u64 {
        self.entrants.len() as u64
    }

    pub fn entrant(&self, index: usize) -> Option<&Pubkey> {
        self.entrants.get(index)
    }

    pub fn recent_winner(&self) -> Option<Pubkey> {
        self.recent_winner
    }

    pub fn last_timestamp(&self) -> UnixTimestamp {
        self.last_timestamp
    }

    pub fn num_words(&self) -> u32 {
        NUM_WORDS
    }

    pub fn request_confirmations(&self) -> u16 {
        REQUEST_CONFIRMATIONS
    }

    pub fn pending_request_id(&self) -> Option<u64> {
        self.pending_request_id
    }

    pub fn pool_balance(&self) -> u64 {
        self.pool_balance
    }

    pub fn round(&self) -> u64 {
        self.round
    }
}

impl IsInitialized for Raffle {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RaffleConfig {
        RaffleConfig {
            entrance_fee: 10_000_000,
            interval: 30,
            coordinator_program: Pubkey::new_unique(),
            fulfillment_authority: Pubkey::new_unique(),
            key_hash: [7u8; 32],
            subscription_id: 42,
            callback_gas_limit: 500_000,
        }
    }

    #[test]
    fn header_only_account_has_no_entrants() {
        let raffle = Raffle::new(3, 254, config(), 1_700_000_000);
        let mut data = vec![0u8; Raffle::HEADER_LEN];
        raffle.pack_into(&mut data).unwrap();

        let unpacked = Raffle::unpack(&data).unwrap();
        assert_eq!(unpacked, raffle);
        assert_eq!(unpacked.entrant_count(), 0);
        assert_eq!(unpacked.recent_winner(), None);
        assert_eq!(unpacked.pending_request_id(), None);
    }

    #[test]
    fn entrants_follow_the_header_in_order() {
        let mut raffle = Raffle::new(1, 255, config(), 0);
        let a = Pubkey::new_unique();
        let b = Pubkey::new_unique();
        raffle.entrants = vec![a, b, a];
        raffle.state = RaffleState::Calculating;
        raffle.pending_request_id = Some(9);

        let mut data = vec![0u8; raffle.packed_len()];
        raffle.pack_into(&mut data).unwrap();
        assert_eq!(&data[Raffle::HEADER_LEN..Raffle::HEADER_LEN + 32], a.as_ref());

        let unpacked = Raffle::unpack(&data).unwrap();
        assert_eq!(unpacked.entrants, vec![a, b, a]);
        assert_eq!(unpacked.entrant(1), Some(&b));
        assert_eq!(unpacked.state(), RaffleState::Calculating);
        assert_eq!(unpacked.pending_request_id(), Some(9));
    }

    #[test]
    fn truncated_entrant_list_is_rejected() {
        let mut raffle = Raffle::new(1, 255, config(), 0);
        raffle.entrants = vec![Pubkey::new_unique(), Pubkey::new_unique()];
        let mut data = vec![0u8; raffle.packed_len()];
        raffle.pack_into(&mut data).unwrap();

        assert_eq!(
            Raffle::unpack(&data[..data.len() - 1]),
            Err(ProgramError::InvalidAccountData)
        );
        assert_eq!(
            raffle.pack_into(&mut vec![0u8; Raffle::HEADER_LEN]),
            Err(ProgramError::AccountDataTooSmall)
        );
    }

    #[test]
    fn unknown_state_byte_is_rejected() {
        assert_eq!(RaffleState::try_from(2), Err(ProgramError::InvalidAccountData));
    }

    #[test]
    fn config_requires_fee_and_non_negative_interval() {
        assert!(config().validate());
        assert!(!RaffleConfig { entrance_fee: 0, ..config() }.validate());
        assert!(!RaffleConfig { interval: -1, ..config() }.validate());
    }
}
