use solana_program::{
    decode_error::DecodeError, msg, program_error::PrintProgramError,
    program_error::ProgramError,
};
use thiserror::Error;

use crate::raffle_state::RaffleState;

/// Errors that may be returned by the Raffle program
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RaffleError {
    /// Invalid instruction data passed
    #[error("Invalid instruction data")]
    InvalidInstruction,

    /// Entry paid less than the entrance fee
    #[error("Payment is below the entrance fee")]
    InsufficientPayment,

    /// Entry attempted while a winner is being calculated
    #[error("Raffle is not open")]
    RaffleNotOpen,

    /// Upkeep requested while the raffle is not eligible for a draw
    #[error("Upkeep not needed: balance={balance}, players={players}, state={state:?}")]
    UpkeepNotNeeded {
        balance: u64,
        players: u64,
        state: RaffleState,
    },

    /// Randomness delivered for a request that is not pending
    #[error("Unknown or stale randomness request")]
    UnknownOrStaleRequest,

    /// Prize transfer to the winner could not complete
    #[error("Payout to winner failed")]
    PayoutFailed,

    /// Raffle configuration rejected at initialization
    #[error("Invalid raffle configuration")]
    InvalidConfig,

    /// Raffle account already holds a raffle
    #[error("Raffle already initialized")]
    AlreadyInitialized,

    /// Raffle account has not been initialized
    #[error("Raffle not initialized")]
    NotInitialized,

    /// Account is not the raffle PDA or not owned by this program
    #[error("Invalid raffle account")]
    InvalidRaffleAccount,

    /// Coordinator account does not match the configured coordinator
    #[error("Invalid randomness coordinator")]
    InvalidCoordinator,

    /// Coordinator returned no usable request id
    #[error("Invalid randomness request id")]
    InvalidRequestId,

    /// Randomness delivered by someone other than the fulfillment authority
    #[error("Unauthorized randomness fulfillment")]
    UnauthorizedFulfillment,

    /// Randomness delivery carried no words
    #[error("No random words delivered")]
    MissingRandomWords,

    /// Arithmetic overflow
    #[error("Math overflow")]
    MathOverflow,

    /// Error raised by the runtime or a cross-program invocation
    #[error(transparent)]
    Program(#[from] ProgramError),
}

impl RaffleError {
    /// Stable code reported through `ProgramError::Custom`.
    pub fn code(&self) -> u32 {
        match self {
            RaffleError::InvalidInstruction => 0,
            RaffleError::InsufficientPayment => 1,
            RaffleError::RaffleNotOpen => 2,
            RaffleError::UpkeepNotNeeded { .. } => 3,
            RaffleError::UnknownOrStaleRequest => 4,
            RaffleError::PayoutFailed => 5,
            RaffleError::InvalidConfig => 6,
            RaffleError::AlreadyInitialized => 7,
            RaffleError::NotInitialized => 8,
            RaffleError::InvalidRaffleAccount => 9,
            RaffleError::InvalidCoordinator => 10,
            RaffleError::InvalidRequestId => 11,
            RaffleError::UnauthorizedFulfillment => 12,
            RaffleError::MissingRandomWords => 13,
            RaffleError::MathOverflow => 14,
            RaffleError::Program(_) => u32::MAX,
        }
    }
}

impl From<RaffleError> for ProgramError {
    fn from(e: RaffleError) -> Self {
        match e {
            RaffleError::Program(inner) => inner,
            other => ProgramError::Custom(other.code()),
        }
    }
}

impl<T> DecodeError<T> for RaffleError {
    fn type_of() -> &'static str {
        "Raffle Error"
    }
}

impl PrintProgramError for RaffleError {
    fn print<E>(&self) {
        msg!(&self.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_codes_ignore_diagnostic_payload() {
        let a: ProgramError = RaffleError::UpkeepNotNeeded {
            balance: 0,
            players: 0,
            state: RaffleState::Open,
        }
        .into();
        let b: ProgramError = RaffleError::UpkeepNotNeeded {
            balance: 5,
            players: 5,
            state: RaffleState::Calculating,
        }
        .into();
        assert_eq!(a, ProgramError::Custom(3));
        assert_eq!(a, b);
    }

    #[test]
    fn runtime_errors_pass_through() {
        let e: ProgramError = RaffleError::Program(ProgramError::MissingRequiredSignature).into();
        assert_eq!(e, ProgramError::MissingRequiredSignature);
    }
}
