//! Read-back of a launched mint: base mint state, metadata pointer and embedded metadata.

use serde::{Serialize, Serializer};
use solana_sdk::{commitment_config::CommitmentConfig, program_error::ProgramError, pubkey::Pubkey};
use spl_token_2022::{
    extension::{metadata_pointer::MetadataPointer, BaseStateWithExtensions, StateWithExtensions},
    state::Mint,
};
use spl_token_metadata_interface::state::TokenMetadata;

use crate::{error::ReadBackError, rpc::LedgerRpc};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintState {
    pub supply: u64,
    pub decimals: u8,
    #[serde(serialize_with = "base58_opt")]
    pub mint_authority: Option<Pubkey>,
    #[serde(serialize_with = "base58_opt")]
    pub freeze_authority: Option<Pubkey>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataPointerState {
    #[serde(serialize_with = "base58_opt")]
    pub authority: Option<Pubkey>,
    #[serde(serialize_with = "base58_opt")]
    pub metadata_address: Option<Pubkey>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataState {
    #[serde(serialize_with = "base58_opt")]
    pub update_authority: Option<Pubkey>,
    #[serde(serialize_with = "base58")]
    pub mint: Pubkey,
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub additional_metadata: Vec<(String, String)>,
}

/// Everything read back from a mint account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataReadBack {
    pub mint: MintState,
    pub metadata_pointer: MetadataPointerState,
    pub metadata: MetadataState,
}

/// Reads launched mints through a ledger connection.
pub struct TokenLaunchReader<'a> {
    token_program_id: Pubkey,
    rpc: &'a dyn LedgerRpc,
}

impl<'a> TokenLaunchReader<'a> {
    pub fn new(token_program_id: Pubkey, rpc: &'a dyn LedgerRpc) -> Self {
        Self {
            token_program_id,
            rpc,
        }
    }

    /// Fetch the mint at "confirmed" and decode it.
    pub async fn read(&self, mint: &Pubkey) -> Result<MetadataReadBack, ReadBackError> {
        let account = self
            .rpc
            .get_account(mint, CommitmentConfig::confirmed())
            .await?
            .ok_or(ReadBackError::AccountNotFound(*mint))?;

        if account.owner != self.token_program_id {
            return Err(ReadBackError::WrongOwner {
                mint: *mint,
                owner: account.owner,
            });
        }

        Ok(decode_mint_account(&account.data)?)
    }
}

/// Decode raw Token-2022 mint data carrying a metadata pointer and embedded metadata.
pub fn decode_mint_account(data: &[u8]) -> Result<MetadataReadBack, ProgramError> {
    let state = StateWithExtensions::<Mint>::unpack(data)?;
    let pointer = state.get_extension::<MetadataPointer>()?;
    let metadata = state.get_variable_len_extension::<TokenMetadata>()?;

    Ok(MetadataReadBack {
        mint: MintState {
            supply: state.base.supply,
            decimals: state.base.decimals,
            mint_authority: state.base.mint_authority.into(),
            freeze_authority: state.base.freeze_authority.into(),
        },
        metadata_pointer: MetadataPointerState {
            authority: pointer.authority.into(),
            metadata_address: pointer.metadata_address.into(),
        },
        metadata: MetadataState {
            update_authority: metadata.update_authority.into(),
            mint: metadata.mint,
            name: metadata.name,
            symbol: metadata.symbol,
            uri: metadata.uri,
            additional_metadata: metadata.additional_metadata,
        },
    })
}

fn base58<S: Serializer>(key: &Pubkey, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(key)
}

fn base58_opt<S: Serializer>(key: &Option<Pubkey>, s: S) -> Result<S::Ok, S::Error> {
    match key {
        Some(key) => s.collect_str(key),
        None => s.serialize_none(),
    }
}
