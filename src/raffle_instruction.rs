use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};

use crate::raffle_error::RaffleError;
use crate::raffle_state::RaffleConfig;
use crate::utils::find_raffle_address;
use crate::vrf::RandomWord;

/// Largest `check_data` that still fits the upkeep answer in return data
pub const MAX_CHECK_DATA_LEN: usize = 1019;

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub enum RaffleInstruction {
    /// Create a raffle
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The payer funding the raffle account
    /// 1. `[writable]` The raffle account (PDA of `raffle_id`)
    /// 2. `[]` The system program
    InitializeRaffle {
        /// Identifier used in the raffle PDA seeds
        raffle_id: u64,
        /// Immutable raffle parameters
        config: RaffleConfig,
    },

    /// Buy one ticket in the current round
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The participant paying the entrance fee
    /// 1. `[writable]` The raffle account
    /// 2. `[]` The system program
    EnterRaffle {
        /// Lamports paid, at least the entrance fee
        amount: u64,
    },

    /// Report whether a draw should start. Never writes; the answer is
    /// published as a borsh `UpkeepCheck` in return data.
    ///
    /// Accounts expected:
    /// 0. `[]` The raffle account
    CheckUpkeep {
        /// Opaque keeper data, echoed back as `perform_data`
        check_data: Vec<u8>,
    },

    /// Close the round and request randomness (anyone can call this)
    ///
    /// Accounts expected:
    /// 0. `[writable]` The raffle account
    /// 1. `[]` The coordinator program
    PerformUpkeep {
        /// Opaque keeper data
        perform_data: Vec<u8>,
    },

    /// Deliver randomness and settle the round
    ///
    /// Accounts expected:
    /// 0. `[signer]` The fulfillment authority
    /// 1. `[writable]` The raffle account
    /// 2. `[writable]` The winner, `entrants[random_words[0] mod entrant_count]`
    FulfillRandomWords {
        /// Id returned by the coordinator for the pending request
        request_id: u64,
        /// Random values, only the first is used
        random_words: Vec<RandomWord>,
    },
}

/// Answer of `CheckUpkeep`
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct UpkeepCheck {
    pub upkeep_needed: bool,
    pub perform_data: Vec<u8>,
}

impl RaffleInstruction {
    /// Unpacks a byte buffer into a RaffleInstruction
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        Self::try_from_slice(input).map_err(|_| RaffleError::InvalidInstruction.into())
    }

    /// Packs a RaffleInstruction into a byte buffer
    pub fn pack(&self) -> Result<Vec<u8>, ProgramError> {
        self.try_to_vec()
            .map_err(|e| ProgramError::BorshIoError(e.to_string()))
    }
}

/// Create initialize_raffle instruction
pub fn initialize_raffle(
    program_id: &Pubkey,
    payer: &Pubkey,
    raffle_id: u64,
    config: RaffleConfig,
) -> Result<Instruction, ProgramError> {
    let (raffle_account, _) = find_raffle_address(program_id, raffle_id);
    let accounts = vec![
        AccountMeta::new(*payer, true),
        AccountMeta::new(raffle_account, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: RaffleInstruction::InitializeRaffle { raffle_id, config }.pack()?,
    })
}

/// Create enter_raffle instruction
pub fn enter_raffle(
    program_id: &Pubkey,
    participant: &Pubkey,
    raffle_account: &Pubkey,
    amount: u64,
) -> Result<Instruction, ProgramError> {
    let accounts = vec![
        AccountMeta::new(*participant, true),
        AccountMeta::new(*raffle_account, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: RaffleInstruction::EnterRaffle { amount }.pack()?,
    })
}

/// Create check_upkeep instruction
pub fn check_upkeep(
    program_id: &Pubkey,
    raffle_account: &Pubkey,
    check_data: Vec<u8>,
) -> Result<Instruction, ProgramError> {
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![AccountMeta::new_readonly(*raffle_account, false)],
        data: RaffleInstruction::CheckUpkeep { check_data }.pack()?,
    })
}

/// Create perform_upkeep instruction
pub fn perform_upkeep(
    program_id: &Pubkey,
    raffle_account: &Pubkey,
    coordinator_program: &Pubkey,
    perform_data: Vec<u8>,
) -> Result<Instruction, ProgramError> {
    let accounts = vec![
        AccountMeta::new(*raffle_account, false),
        AccountMeta::new_readonly(*coordinator_program, false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: RaffleInstruction::PerformUpkeep { perform_data }.pack()?,
    })
}

/// Create fulfill_random_words instruction
pub fn fulfill_random_words(
    program_id: &Pubkey,
    fulfillment_authority: &Pubkey,
    raffle_account: &Pubkey,
    winner: &Pubkey,
    request_id: u64,
    random_words: Vec<RandomWord>,
) -> Result<Instruction, ProgramError> {
    let accounts = vec![
        AccountMeta::new_readonly(*fulfillment_authority, true),
        AccountMeta::new(*raffle_account, false),
        AccountMeta::new(*winner, false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: RaffleInstruction::FulfillRandomWords {
            request_id,
            random_words,
        }
        .pack()?,
    })
}
