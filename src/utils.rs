// Raffle Program - Utility Functions
use solana_program::{program_error::ProgramError, pubkey::Pubkey};

pub const RAFFLE_SEED: &[u8] = b"raffle";

/// Find the program derived address for a raffle
pub fn find_raffle_address(program_id: &Pubkey, raffle_id: u64) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[RAFFLE_SEED, &raffle_id.to_le_bytes()], program_id)
}

/// Re-derive a raffle address from its stored bump
pub fn create_raffle_address(
    program_id: &Pubkey,
    raffle_id: u64,
    bump: u8,
) -> Result<Pubkey, ProgramError> {
    Pubkey::create_program_address(&[RAFFLE_SEED, &raffle_id.to_le_bytes(), &[bump]], program_id)
        .map_err(|_| ProgramError::InvalidSeeds)
}
