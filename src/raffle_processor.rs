use borsh::BorshSerialize;
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    program::{invoke, invoke_signed, set_return_data},
    program_error::ProgramError,
    program_pack::IsInitialized,
    pubkey::Pubkey,
    system_instruction,
    sysvar::{clock::Clock, rent::Rent, Sysvar},
};

use crate::engine::PrizeVault;
use crate::raffle_error::RaffleError;
use crate::raffle_instruction::{RaffleInstruction, UpkeepCheck, MAX_CHECK_DATA_LEN};
use crate::raffle_state::{Raffle, RaffleConfig};
use crate::utils::{create_raffle_address, find_raffle_address, RAFFLE_SEED};
use crate::vrf::{CoordinatorClient, RandomWord};

pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = RaffleInstruction::unpack(instruction_data)?;

        match instruction {
            RaffleInstruction::InitializeRaffle { raffle_id, config } => {
                msg!("Instruction: Initialize Raffle");
                Self::process_initialize_raffle(accounts, raffle_id, config, program_id)
            }
            RaffleInstruction::EnterRaffle { amount } => {
                msg!("Instruction: Enter Raffle");
                Self::process_enter_raffle(accounts, amount, program_id)
            }
            RaffleInstruction::CheckUpkeep { check_data } => {
                msg!("Instruction: Check Upkeep");
                Self::process_check_upkeep(accounts, check_data, program_id)
            }
            RaffleInstruction::PerformUpkeep { perform_data } => {
                msg!("Instruction: Perform Upkeep");
                Self::process_perform_upkeep(accounts, perform_data, program_id)
            }
            RaffleInstruction::FulfillRandomWords {
                request_id,
                random_words,
            } => {
                msg!("Instruction: Fulfill Random Words");
                Self::process_fulfill_random_words(accounts, request_id, random_words, program_id)
            }
        }
    }

    fn process_initialize_raffle(
        accounts: &[AccountInfo],
        raffle_id: u64,
        config: RaffleConfig,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let payer_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !payer_info.is_signer {
            msg!("Payer must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        if !config.validate() {
            msg!("Entrance fee must be positive and interval must not be negative");
            return Err(RaffleError::InvalidConfig.into());
        }

        let (expected_raffle_pubkey, bump_seed) = find_raffle_address(program_id, raffle_id);
        if *raffle_info.key != expected_raffle_pubkey {
            msg!("Invalid raffle account address");
            return Err(RaffleError::InvalidRaffleAccount.into());
        }

        if raffle_info.owner == program_id {
            msg!("Raffle {} already exists", raffle_id);
            return Err(RaffleError::AlreadyInitialized.into());
        }

        let rent = Rent::get()?;
        let raffle_id_bytes = raffle_id.to_le_bytes();
        let bump = [bump_seed];
        let raffle_seeds: &[&[u8]] = &[RAFFLE_SEED, &raffle_id_bytes, &bump];
        create_raffle_account(
            payer_info,
            raffle_info,
            system_program_info,
            rent.minimum_balance(Raffle::HEADER_LEN),
            raffle_seeds,
            program_id,
        )?;

        let now = Clock::get()?.unix_timestamp;
        let raffle = Raffle::new(raffle_id, bump_seed, config, now);
        raffle.pack_into(&mut raffle_info.data.borrow_mut())?;

        msg!(
            "Raffle {} initialized: EntranceFee={}, Interval={}s, Coordinator={}",
            raffle_id,
            config.entrance_fee,
            config.interval,
            config.coordinator_program
        );
        Ok(())
    }

    fn process_enter_raffle(
        accounts: &[AccountInfo],
        amount: u64,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let participant_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !participant_info.is_signer {
            msg!("Participant must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut raffle = load_raffle(program_id, raffle_info)?;
        let pool_before = raffle.pool_balance;
        let event = raffle
            .enter(*participant_info.key, amount)
            .map_err(reject)?;

        // The account grows by one key; the participant covers any rent the
        // growth adds on top of the payment itself.
        let rent = Rent::get()?;
        let required = rent
            .minimum_balance(raffle.packed_len())
            .checked_add(pool_before)
            .ok_or_else(|| reject(RaffleError::MathOverflow))?;
        let rent_top_up = required.saturating_sub(raffle_info.lamports());
        let transfer_amount = amount
            .checked_add(rent_top_up)
            .ok_or_else(|| reject(RaffleError::MathOverflow))?;

        msg!(
            "Transferring {} lamports to the raffle pool ({} for rent)",
            transfer_amount,
            rent_top_up
        );
        invoke(
            &system_instruction::transfer(participant_info.key, raffle_info.key, transfer_amount),
            &[
                participant_info.clone(),
                raffle_info.clone(),
                system_program_info.clone(),
            ],
        )?;

        store_raffle(&raffle, raffle_info)?;
        event.emit()
    }

    fn process_check_upkeep(
        accounts: &[AccountInfo],
        check_data: Vec<u8>,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let raffle_info = next_account_info(account_info_iter)?;

        if check_data.len() > MAX_CHECK_DATA_LEN {
            msg!("Check data exceeds {} bytes", MAX_CHECK_DATA_LEN);
            return Err(RaffleError::InvalidInstruction.into());
        }

        let raffle = load_raffle(program_id, raffle_info)?;
        let status = raffle.check_upkeep(Clock::get()?.unix_timestamp);
        msg!(
            "Upkeep needed: {} (open={}, time_passed={}, players={}, balance={})",
            status.upkeep_needed(),
            status.is_open,
            status.time_passed,
            status.has_players,
            status.has_balance
        );

        let answer = UpkeepCheck {
            upkeep_needed: status.upkeep_needed(),
            perform_data: check_data,
        };
        let data = answer
            .try_to_vec()
            .map_err(|e| ProgramError::BorshIoError(e.to_string()))?;
        set_return_data(&data);
        Ok(())
    }

    fn process_perform_upkeep(
        accounts: &[AccountInfo],
        perform_data: Vec<u8>,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let raffle_info = next_account_info(account_info_iter)?;
        let coordinator_info = next_account_info(account_info_iter)?;

        let mut raffle = load_raffle(program_id, raffle_info)?;

        if *coordinator_info.key != raffle.config.coordinator_program {
            msg!(
                "Coordinator {} does not match configured {}",
                coordinator_info.key,
                raffle.config.coordinator_program
            );
            return Err(RaffleError::InvalidCoordinator.into());
        }

        msg!("Perform data: {} bytes", perform_data.len());

        let now = Clock::get()?.unix_timestamp;
        let raffle_id_bytes = raffle.raffle_id.to_le_bytes();
        let bump = [raffle.bump];
        let consumer_seeds: &[&[u8]] = &[RAFFLE_SEED, &raffle_id_bytes, &bump];
        let mut coordinator = CoordinatorClient {
            coordinator_program: coordinator_info,
            consumer: raffle_info,
            consumer_seeds,
        };

        let event = raffle.perform_upkeep(now, &mut coordinator).map_err(reject)?;

        store_raffle(&raffle, raffle_info)?;
        event.emit()
    }

    fn process_fulfill_random_words(
        accounts: &[AccountInfo],
        request_id: u64,
        random_words: Vec<RandomWord>,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let authority_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let winner_info = next_account_info(account_info_iter)?;

        let mut raffle = load_raffle(program_id, raffle_info)?;

        if !authority_info.is_signer || *authority_info.key != raffle.config.fulfillment_authority
        {
            msg!("Only the fulfillment authority can deliver randomness");
            return Err(RaffleError::UnauthorizedFulfillment.into());
        }

        let now = Clock::get()?.unix_timestamp;
        let mut vault = LamportVault {
            raffle_info,
            winner_info,
        };
        let event = raffle
            .fulfill_random_words(request_id, &random_words, now, &mut vault)
            .map_err(reject)?;

        store_raffle(&raffle, raffle_info)?;
        event.emit()
    }
}

/// Pays the prize from the raffle account's lamports
struct LamportVault<'a, 'b> {
    raffle_info: &'b AccountInfo<'a>,
    winner_info: &'b AccountInfo<'a>,
}

impl PrizeVault for LamportVault<'_, '_> {
    fn pay(&mut self, winner: &Pubkey, amount: u64) -> Result<(), ProgramError> {
        if self.winner_info.key != winner {
            msg!(
                "Winner account {} is not the selected entrant {}",
                self.winner_info.key,
                winner
            );
            return Err(ProgramError::InvalidAccountData);
        }
        if !self.winner_info.is_writable {
            msg!("Winner account must be writable");
            return Err(ProgramError::InvalidAccountData);
        }

        let vault_lamports = self
            .raffle_info
            .lamports()
            .checked_sub(amount)
            .ok_or(ProgramError::InsufficientFunds)?;
        let winner_lamports = self
            .winner_info
            .lamports()
            .checked_add(amount)
            .ok_or(RaffleError::MathOverflow)?;

        **self.raffle_info.try_borrow_mut_lamports()? = vault_lamports;
        **self.winner_info.try_borrow_mut_lamports()? = winner_lamports;

        msg!("Paid {} lamports to {}", amount, winner);
        Ok(())
    }
}

/// Create the raffle PDA. An address that already holds lamports cannot go
/// through `create_account`, so it is topped up, allocated and assigned instead.
fn create_raffle_account<'a>(
    payer_info: &AccountInfo<'a>,
    raffle_info: &AccountInfo<'a>,
    system_program_info: &AccountInfo<'a>,
    lamports: u64,
    raffle_seeds: &[&[u8]],
    program_id: &Pubkey,
) -> ProgramResult {
    let space = Raffle::HEADER_LEN as u64;
    let current_lamports = raffle_info.lamports();

    if current_lamports == 0 {
        return invoke_signed(
            &system_instruction::create_account(
                payer_info.key,
                raffle_info.key,
                lamports,
                space,
                program_id,
            ),
            &[
                payer_info.clone(),
                raffle_info.clone(),
                system_program_info.clone(),
            ],
            &[raffle_seeds],
        );
    }

    msg!("Raffle address already holds {} lamports", current_lamports);
    let top_up = lamports.saturating_sub(current_lamports);
    if top_up > 0 {
        invoke(
            &system_instruction::transfer(payer_info.key, raffle_info.key, top_up),
            &[
                payer_info.clone(),
                raffle_info.clone(),
                system_program_info.clone(),
            ],
        )?;
    }
    invoke_signed(
        &system_instruction::allocate(raffle_info.key, space),
        &[raffle_info.clone(), system_program_info.clone()],
        &[raffle_seeds],
    )?;
    invoke_signed(
        &system_instruction::assign(raffle_info.key, program_id),
        &[raffle_info.clone(), system_program_info.clone()],
        &[raffle_seeds],
    )
}

fn reject(error: RaffleError) -> ProgramError {
    msg!("Rejected: {}", error);
    error.into()
}

fn load_raffle(program_id: &Pubkey, raffle_info: &AccountInfo) -> Result<Raffle, ProgramError> {
    if raffle_info.owner != program_id {
        msg!("Raffle account must be owned by this program");
        return Err(RaffleError::InvalidRaffleAccount.into());
    }

    let raffle = Raffle::unpack(&raffle_info.data.borrow())?;
    if !raffle.is_initialized() {
        msg!("Raffle account is not initialized");
        return Err(RaffleError::NotInitialized.into());
    }

    if create_raffle_address(program_id, raffle.raffle_id, raffle.bump)? != *raffle_info.key {
        msg!("Raffle account is not the raffle PDA");
        return Err(RaffleError::InvalidRaffleAccount.into());
    }
    Ok(raffle)
}

/// Resize the raffle account to fit `raffle` and write it
fn store_raffle(raffle: &Raffle, raffle_info: &AccountInfo) -> ProgramResult {
    let len = raffle.packed_len();
    if raffle_info.data_len() != len {
        raffle_info.realloc(len, false)?;
    }
    raffle.pack_into(&mut raffle_info.data.borrow_mut())
}
