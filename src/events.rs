use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    entrypoint::ProgramResult, log::sol_log_data, msg, program_error::ProgramError,
    pubkey::Pubkey,
};

/// Observable state changes, logged as text and as borsh program data
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub enum RaffleEvent {
    RaffleEntered { player: Pubkey, round: u64 },
    RequestedRaffleWinner { request_id: u64 },
    WinnerPicked { winner: Pubkey, round: u64 },
}

impl RaffleEvent {
    pub fn emit(&self) -> ProgramResult {
        match self {
            RaffleEvent::RaffleEntered { player, round } => {
                msg!("RaffleEntered: player={} round={}", player, round)
            }
            RaffleEvent::RequestedRaffleWinner { request_id } => {
                msg!("RequestedRaffleWinner: request_id={}", request_id)
            }
            RaffleEvent::WinnerPicked { winner, round } => {
                msg!("WinnerPicked: winner={} round={}", winner, round)
            }
        }
        let data = self
            .try_to_vec()
            .map_err(|e| ProgramError::BorshIoError(e.to_string()))?;
        sol_log_data(&[&data]);
        Ok(())
    }
}
