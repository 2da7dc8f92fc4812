//! Instruction builders for the launch transaction.

use solana_sdk::{instruction::Instruction, pubkey::Pubkey, system_instruction, system_program};
use spl_associated_token_account::{
    get_associated_token_address_with_program_id, instruction::create_associated_token_account,
};
use spl_token_2022::{
    extension::metadata_pointer,
    instruction::{self as token_instruction, AuthorityType, TokenInstruction},
};
use spl_token_metadata_interface::{
    instruction::{self as metadata_instruction, TokenMetadataInstruction},
    state::Field,
};

use crate::{
    error::{AssemblyError, ValidationError},
    request::TokenLaunchRequest,
    sizing::MintSizing,
    state::{planned_authorities, AuthorityKind, AuthorityState, MetadataRecord},
};

/// Thin client for building Token-2022 launch instructions.
///
/// The `token_program_id` must be the Token-2022 program (or a fork with the same
/// instruction set); it owns the mint and serves as the metadata program.
#[derive(Clone, Copy, Debug)]
pub struct TokenLaunchClient {
    pub token_program_id: Pubkey,
}

impl Default for TokenLaunchClient {
    fn default() -> Self {
        Self::new(spl_token_2022::id())
    }
}

impl TokenLaunchClient {
    pub fn new(token_program_id: Pubkey) -> Self {
        Self { token_program_id }
    }

    /// Derive the owner's associated token account for `mint`.
    pub fn associated_token_address(&self, owner: &Pubkey, mint: &Pubkey) -> Pubkey {
        get_associated_token_address_with_program_id(owner, mint, &self.token_program_id)
    }

    /// Build a SystemProgram create_account for the mint, sized for the pointer extension
    /// and funded for the final size.
    pub fn create_mint_account_ix(
        &self,
        payer: &Pubkey,
        mint: &Pubkey,
        sizing: &MintSizing,
    ) -> Instruction {
        system_instruction::create_account(
            payer,
            mint,
            sizing.rent_lamports,
            sizing.mint_account_len as u64,
            &self.token_program_id,
        )
    }

    /// Build the metadata-pointer initialize instruction. The mint holds its own metadata.
    pub fn initialize_metadata_pointer_ix(
        &self,
        mint: &Pubkey,
        authority: &Pubkey,
    ) -> Result<Instruction, AssemblyError> {
        metadata_pointer::instruction::initialize(
            &self.token_program_id,
            mint,
            Some(*authority),
            Some(*mint),
        )
        .map_err(|source| AssemblyError::Instruction {
            step: "initialize metadata pointer",
            source,
        })
    }

    pub fn initialize_mint_ix(
        &self,
        mint: &Pubkey,
        decimals: u8,
        mint_authority: &Pubkey,
        freeze_authority: Option<&Pubkey>,
    ) -> Result<Instruction, AssemblyError> {
        token_instruction::initialize_mint(
            &self.token_program_id,
            mint,
            mint_authority,
            freeze_authority,
            decimals,
        )
        .map_err(|source| AssemblyError::Instruction {
            step: "initialize mint",
            source,
        })
    }

    /// Build the embedded-metadata initialize instruction.
    ///
    /// Accounts (strict order):
    /// - metadata (writable; the mint itself)
    /// - update_authority (readonly)
    /// - mint (readonly)
    /// - mint_authority (readonly, signer)
    pub fn initialize_metadata_ix(
        &self,
        record: &MetadataRecord,
        mint_authority: &Pubkey,
    ) -> Instruction {
        metadata_instruction::initialize(
            &self.token_program_id,
            &record.mint,
            &record.update_authority,
            &record.mint,
            mint_authority,
            record.name.clone(),
            record.symbol.clone(),
            record.uri.clone(),
        )
    }

    /// Build an update-field instruction for an additional metadata key.
    pub fn update_field_ix(
        &self,
        mint: &Pubkey,
        update_authority: &Pubkey,
        key: &str,
        value: &str,
    ) -> Instruction {
        metadata_instruction::update_field(
            &self.token_program_id,
            mint,
            update_authority,
            Field::Key(key.to_string()),
            value.to_string(),
        )
    }

    pub fn create_associated_token_account_ix(
        &self,
        payer: &Pubkey,
        owner: &Pubkey,
        mint: &Pubkey,
    ) -> Instruction {
        create_associated_token_account(payer, owner, mint, &self.token_program_id)
    }

    pub fn mint_to_ix(
        &self,
        mint: &Pubkey,
        destination: &Pubkey,
        authority: &Pubkey,
        amount: u64,
    ) -> Result<Instruction, AssemblyError> {
        token_instruction::mint_to(
            &self.token_program_id,
            mint,
            destination,
            authority,
            &[],
            amount,
        )
        .map_err(|source| AssemblyError::Instruction {
            step: "mint to",
            source,
        })
    }

    /// Build a set_authority on the mint. `new_authority = None` is irreversible.
    pub fn set_authority_ix(
        &self,
        mint: &Pubkey,
        kind: AuthorityKind,
        new_authority: Option<&Pubkey>,
        current_authority: &Pubkey,
    ) -> Result<Instruction, AssemblyError> {
        let authority_type = match kind {
            AuthorityKind::Mint => AuthorityType::MintTokens,
            AuthorityKind::Freeze => AuthorityType::FreezeAccount,
        };
        token_instruction::set_authority(
            &self.token_program_id,
            mint,
            new_authority,
            authority_type,
            current_authority,
            &[],
        )
        .map_err(|source| AssemblyError::Instruction {
            step: "set authority",
            source,
        })
    }

    // Transaction patterns (compose instructions; signing and submission left to caller)
    /// Create, extend, initialize and fund a mint with embedded metadata, mint the supply
    /// to the payer, then apply any authority changes.
    ///
    /// Returns, in this order:
    /// [create_account, initialize_metadata_pointer, initialize_mint, initialize_metadata,
    ///  update_field("description")?, create_associated_token_account, mint_to,
    ///  set_authority(MintTokens)?, set_authority(FreezeAccount)?]
    pub fn launch_token_tx(
        &self,
        params: &TxLaunchTokenParams,
    ) -> Result<Vec<Instruction>, AssemblyError> {
        let payer = &params.payer;
        let mint = &params.mint;
        let ata = self.associated_token_address(payer, mint);

        let mut ixs = vec![
            self.create_mint_account_ix(payer, mint, &params.sizing),
            self.initialize_metadata_pointer_ix(mint, payer)?,
            self.initialize_mint_ix(mint, params.decimals, payer, Some(payer))?,
            self.initialize_metadata_ix(&params.metadata, payer),
        ];

        if let Some(description) = params.metadata.description() {
            ixs.push(self.update_field_ix(
                mint,
                &params.metadata.update_authority,
                crate::state::DESCRIPTION_KEY,
                description,
            ));
        }

        ixs.push(self.create_associated_token_account_ix(payer, payer, mint));
        ixs.push(self.mint_to_ix(mint, &ata, payer, params.raw_amount)?);

        // authority changes last; nothing after them may need mint or freeze authority
        for (kind, state) in [
            (AuthorityKind::Mint, params.mint_authority),
            (AuthorityKind::Freeze, params.freeze_authority),
        ] {
            if let Some(new_authority) = state.change() {
                ixs.push(self.set_authority_ix(mint, kind, new_authority.as_ref(), payer)?);
            }
        }

        Ok(ixs)
    }

    /// Same as `launch_token_tx` but also returns the derived associated token address.
    pub fn launch_token_tx_with_addresses(
        &self,
        params: &TxLaunchTokenParams,
    ) -> Result<(Vec<Instruction>, DerivedAddresses), AssemblyError> {
        let associated_token_address = self.associated_token_address(&params.payer, &params.mint);
        let ixs = self.launch_token_tx(params)?;
        Ok((
            ixs,
            DerivedAddresses {
                mint: params.mint,
                associated_token_address,
            },
        ))
    }

    /// Identify which launch step an instruction performs.
    pub fn describe_instruction(&self, ix: &Instruction) -> Option<LaunchStep> {
        if ix.program_id == system_program::id() {
            return Some(LaunchStep::CreateMintAccount);
        }
        if ix.program_id == spl_associated_token_account::id() {
            return Some(LaunchStep::CreateAssociatedTokenAccount);
        }
        if ix.program_id != self.token_program_id {
            return None;
        }

        // metadata interface instructions carry 8-byte discriminators; try them first
        if let Ok(md) = TokenMetadataInstruction::unpack(&ix.data) {
            return match md {
                TokenMetadataInstruction::Initialize(_) => Some(LaunchStep::InitializeMetadata),
                TokenMetadataInstruction::UpdateField(update) => {
                    Some(LaunchStep::UpdateMetadataField {
                        key: field_name(&update.field),
                    })
                }
                _ => None,
            };
        }

        match TokenInstruction::unpack(&ix.data).ok()? {
            TokenInstruction::MetadataPointerExtension => {
                Some(LaunchStep::InitializeMetadataPointer)
            }
            TokenInstruction::InitializeMint { decimals, .. }
            | TokenInstruction::InitializeMint2 { decimals, .. } => {
                Some(LaunchStep::InitializeMint { decimals })
            }
            TokenInstruction::MintTo { amount } => Some(LaunchStep::MintTo { amount }),
            TokenInstruction::SetAuthority {
                authority_type,
                new_authority,
            } => {
                let kind = match authority_type {
                    AuthorityType::MintTokens => AuthorityKind::Mint,
                    AuthorityType::FreezeAccount => AuthorityKind::Freeze,
                    _ => return None,
                };
                Some(LaunchStep::SetAuthority {
                    kind,
                    new_authority: new_authority.into(),
                })
            }
            _ => None,
        }
    }
}

fn field_name(field: &Field) -> String {
    match field {
        Field::Name => "name".to_string(),
        Field::Symbol => "symbol".to_string(),
        Field::Uri => "uri".to_string(),
        Field::Key(key) => key.clone(),
    }
}

// === Params ===
/// Parameters for the launch transaction pattern.
#[derive(Clone, Debug)]
pub struct TxLaunchTokenParams {
    /// Wallet paying for everything; initial mint, freeze, pointer and update authority
    pub payer: Pubkey,
    /// Fresh mint address
    pub mint: Pubkey,
    /// Number of decimals for the mint
    pub decimals: u8,
    /// Base units minted to the payer's associated account
    pub raw_amount: u64,
    /// Metadata embedded in the mint
    pub metadata: MetadataRecord,
    /// Account size and funding
    pub sizing: MintSizing,
    /// Final mint authority
    pub mint_authority: AuthorityState,
    /// Final freeze authority
    pub freeze_authority: AuthorityState,
}

impl TxLaunchTokenParams {
    /// Params for a validated request. Authority changes follow the revoke flags.
    pub fn from_request(
        request: &TokenLaunchRequest,
        mint: Pubkey,
        metadata: MetadataRecord,
        sizing: MintSizing,
        payer: Pubkey,
    ) -> Result<Self, ValidationError> {
        let [(_, mint_authority), (_, freeze_authority)] = planned_authorities(request);
        Ok(Self {
            payer,
            mint,
            decimals: request.decimals,
            raw_amount: request.raw_amount()?,
            metadata,
            sizing,
            mint_authority,
            freeze_authority,
        })
    }
}

/// Convenience return type when a builder returns derived addresses too.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DerivedAddresses {
    pub mint: Pubkey,
    /// Payer's associated token account for the mint
    pub associated_token_address: Pubkey,
}

/// One step of the launch transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LaunchStep {
    CreateMintAccount,
    InitializeMetadataPointer,
    InitializeMint { decimals: u8 },
    InitializeMetadata,
    UpdateMetadataField { key: String },
    CreateAssociatedTokenAccount,
    MintTo { amount: u64 },
    SetAuthority {
        kind: AuthorityKind,
        new_authority: Option<Pubkey>,
    },
}

impl LaunchStep {
    pub fn label(&self) -> &'static str {
        match self {
            LaunchStep::CreateMintAccount => "create_mint_account",
            LaunchStep::InitializeMetadataPointer => "initialize_metadata_pointer",
            LaunchStep::InitializeMint { .. } => "initialize_mint",
            LaunchStep::InitializeMetadata => "initialize_metadata",
            LaunchStep::UpdateMetadataField { .. } => "update_metadata_field",
            LaunchStep::CreateAssociatedTokenAccount => "create_associated_token_account",
            LaunchStep::MintTo { .. } => "mint_to",
            LaunchStep::SetAuthority {
                kind: AuthorityKind::Mint,
                ..
            } => "set_mint_authority",
            LaunchStep::SetAuthority {
                kind: AuthorityKind::Freeze,
                ..
            } => "set_freeze_authority",
        }
    }
}
