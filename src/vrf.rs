// Randomness coordinator integration
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::AccountInfo,
    instruction::{AccountMeta, Instruction},
    msg,
    program::{get_return_data, invoke_signed},
    program_error::ProgramError,
    pubkey::Pubkey,
};

use crate::engine::RandomnessProvider;
use crate::raffle_error::RaffleError;

/// A 256-bit random value, big-endian
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RandomWord(pub [u8; 32]);

impl RandomWord {
    pub fn from_u64(value: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&value.to_be_bytes());
        RandomWord(bytes)
    }

    /// `self mod len`, or `None` when `len` is zero
    pub fn index_into(&self, len: u64) -> Option<u64> {
        if len == 0 {
            return None;
        }
        let len = len as u128;
        let rem = self
            .0
            .iter()
            .fold(0u128, |acc, byte| ((acc << 8) | *byte as u128) % len);
        Some(rem as u64)
    }
}

/// Parameters of one randomness request
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct RandomnessRequest {
    pub key_hash: [u8; 32],
    pub subscription_id: u64,
    pub request_confirmations: u16,
    pub callback_gas_limit: u32,
    pub num_words: u32,
}

/// Instructions understood by a randomness coordinator
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub enum CoordinatorInstruction {
    /// Queue a request on behalf of a consumer. The coordinator answers with
    /// the request id (`u64`, little endian) as return data.
    ///
    /// Accounts expected:
    /// 0. `[signer]` The consumer account
    RequestRandomWords(RandomnessRequest),
}

/// Create a request_random_words instruction for `coordinator_program`
pub fn request_random_words(
    coordinator_program: &Pubkey,
    consumer: &Pubkey,
    request: RandomnessRequest,
) -> Instruction {
    Instruction::new_with_borsh(
        *coordinator_program,
        &CoordinatorInstruction::RequestRandomWords(request),
        vec![AccountMeta::new_readonly(*consumer, true)],
    )
}

/// Decode the request id a coordinator published as return data
pub fn parse_request_id(
    coordinator_program: &Pubkey,
    return_data: Option<(Pubkey, Vec<u8>)>,
) -> Result<u64, RaffleError> {
    let (program_id, data) = return_data.ok_or(RaffleError::InvalidRequestId)?;
    if program_id != *coordinator_program {
        msg!("Return data came from {} instead of the coordinator", program_id);
        return Err(RaffleError::InvalidRequestId);
    }
    let bytes: [u8; 8] = data
        .get(..8)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(RaffleError::InvalidRequestId)?;
    Ok(u64::from_le_bytes(bytes))
}

/// Requests randomness through a CPI signed by the raffle PDA
pub struct CoordinatorClient<'a, 'b> {
    pub coordinator_program: &'b AccountInfo<'a>,
    pub consumer: &'b AccountInfo<'a>,
    pub consumer_seeds: &'b [&'b [u8]],
}

impl<'a, 'b> RandomnessProvider for CoordinatorClient<'a, 'b> {
    fn request_random_words(&mut self, request: &RandomnessRequest) -> Result<u64, ProgramError> {
        invoke_signed(
            &request_random_words(self.coordinator_program.key, self.consumer.key, request.clone()),
            &[self.consumer.clone(), self.coordinator_program.clone()],
            &[self.consumer_seeds],
        )?;

        let request_id = parse_request_id(self.coordinator_program.key, get_return_data())?;
        msg!("Coordinator accepted randomness request {}", request_id);
        Ok(request_id)
    }
}
