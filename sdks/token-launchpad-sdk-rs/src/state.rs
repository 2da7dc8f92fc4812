//! Launch-time state: the embedded metadata record and mint authority dispositions.

use solana_sdk::{program_error::ProgramError, pubkey::Pubkey};
use spl_pod::optional_keys::OptionalNonZeroPubkey;
use spl_token_metadata_interface::state::TokenMetadata;

use crate::request::TokenLaunchRequest;

/// Additional-metadata key carrying the user's description.
pub const DESCRIPTION_KEY: &str = "description";

/// Metadata embedded in the mint account's extension region.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetadataRecord {
    /// Authority that can update the metadata (and the metadata pointer)
    pub update_authority: Pubkey,
    /// Mint the metadata belongs to
    pub mint: Pubkey,
    pub name: String,
    pub symbol: String,
    /// Off-chain JSON uploaded earlier in the launch
    pub uri: String,
    /// At most one `("description", text)` pair
    pub additional_metadata: Vec<(String, String)>,
}

impl MetadataRecord {
    pub fn new(request: &TokenLaunchRequest, mint: Pubkey, payer: Pubkey, uri: String) -> Self {
        let additional_metadata = request
            .description()
            .map(|d| vec![(DESCRIPTION_KEY.to_string(), d.to_string())])
            .unwrap_or_default();
        Self {
            update_authority: payer,
            mint,
            name: request.name.clone(),
            symbol: request.symbol.clone(),
            uri,
            additional_metadata,
        }
    }

    /// Description value, if present.
    pub fn description(&self) -> Option<&str> {
        self.additional_metadata
            .iter()
            .find(|(k, _)| k == DESCRIPTION_KEY)
            .map(|(_, v)| v.as_str())
    }

    /// Upstream interface representation, used for packing and sizing.
    pub fn to_token_metadata(&self) -> Result<TokenMetadata, ProgramError> {
        let update_authority = OptionalNonZeroPubkey::try_from(Some(self.update_authority))?;
        Ok(TokenMetadata {
            update_authority,
            mint: self.mint,
            name: self.name.clone(),
            symbol: self.symbol.clone(),
            uri: self.uri.clone(),
            additional_metadata: self.additional_metadata.clone(),
        })
    }
}

/// Which mint authority a set-authority instruction targets.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AuthorityKind {
    Mint,
    Freeze,
}

/// Where an authority ends up once the launch transaction lands.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AuthorityState {
    /// Still held by the payer wallet
    Payer,
    /// Set to none; irreversible
    Revoked,
    /// Handed to another key
    TransferredTo(Pubkey),
}

impl AuthorityState {
    /// Disposition requested by a revoke flag.
    pub fn from_revoke_flag(revoke: bool) -> Self {
        if revoke {
            AuthorityState::Revoked
        } else {
            AuthorityState::Payer
        }
    }

    /// Classify an on-chain authority relative to the payer.
    pub fn from_onchain(current: Option<Pubkey>, payer: &Pubkey) -> Self {
        match current {
            None => AuthorityState::Revoked,
            Some(key) if key == *payer => AuthorityState::Payer,
            Some(key) => AuthorityState::TransferredTo(key),
        }
    }

    /// New authority for a set-authority instruction, or `None` when no change is needed.
    pub fn change(&self) -> Option<Option<Pubkey>> {
        match self {
            AuthorityState::Payer => None,
            AuthorityState::Revoked => Some(None),
            AuthorityState::TransferredTo(key) => Some(Some(*key)),
        }
    }
}

/// Final mint and freeze authority dispositions for a request.
pub fn planned_authorities(request: &TokenLaunchRequest) -> [(AuthorityKind, AuthorityState); 2] {
    [
        (
            AuthorityKind::Mint,
            AuthorityState::from_revoke_flag(request.revoke_mint),
        ),
        (
            AuthorityKind::Freeze,
            AuthorityState::from_revoke_flag(request.revoke_freeze),
        ),
    ]
}
