//! Mint account layout and rent.
//!
//! The account is created with room for the base mint plus the metadata-pointer
//! extension only; initializing the embedded metadata grows it afterwards. The funding,
//! however, must already cover the final size, so rent is queried for
//! `mint_account_len + METADATA_TLV_OVERHEAD + metadata_len`.

use solana_sdk::program_error::ProgramError;
use spl_token_2022::{extension::ExtensionType, state::Mint};
use spl_type_length_value::variable_len_pack::VariableLenPack;
use tracing::debug;

use crate::{error::SizingError, rpc::LedgerRpc, state::MetadataRecord};

/// Extension type tag.
pub const TLV_TYPE_SIZE: usize = 2;
/// Extension length header.
pub const TLV_LENGTH_SIZE: usize = 2;
/// Header applied once in front of the packed metadata.
pub const METADATA_TLV_OVERHEAD: usize = TLV_TYPE_SIZE + TLV_LENGTH_SIZE;

/// Computed layout plus the rent-exempt balance for the final size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MintSizing {
    /// Bytes allocated by the create-account instruction
    pub mint_account_len: usize,
    /// Packed metadata bytes, excluding the TLV header
    pub metadata_len: usize,
    /// Lamports funding the account
    pub rent_lamports: u64,
}

impl MintSizing {
    /// Size the account reaches after metadata initialization.
    pub fn final_len(&self) -> usize {
        final_len(self.mint_account_len, self.metadata_len)
    }
}

fn final_len(mint_account_len: usize, metadata_len: usize) -> usize {
    mint_account_len + METADATA_TLV_OVERHEAD + metadata_len
}

/// Base mint length including the metadata-pointer extension.
pub fn mint_account_len() -> Result<usize, ProgramError> {
    ExtensionType::try_calculate_account_len::<Mint>(&[ExtensionType::MetadataPointer])
}

/// Length-prefixed packed size of the metadata record, without any TLV header.
pub fn packed_metadata_len(record: &MetadataRecord) -> Result<usize, SizingError> {
    Ok(record.to_token_metadata()?.get_packed_len()?)
}

/// Compute the layout and query the rent-exempt balance. The query runs every time;
/// rent parameters may change between epochs.
pub async fn size_mint_account(
    rpc: &dyn LedgerRpc,
    record: &MetadataRecord,
) -> Result<MintSizing, SizingError> {
    let mint_account_len = mint_account_len()?;
    let metadata_len = packed_metadata_len(record)?;
    let len = final_len(mint_account_len, metadata_len);

    let rent_lamports = rpc
        .minimum_balance_for_rent_exemption(len)
        .await
        .map_err(|source| SizingError::Rent { len, source })?;

    debug!(
        mint_account_len,
        metadata_len, rent_lamports, "sized mint account"
    );
    Ok(MintSizing {
        mint_account_len,
        metadata_len,
        rent_lamports,
    })
}

#[cfg(test)]
mod tests {
    use solana_sdk::pubkey::Pubkey;
    use spl_token_2022::extension::{
        metadata_pointer::MetadataPointer, BaseStateWithExtensionsMut, StateWithExtensionsMut,
    };
    use spl_token_metadata_interface::state::TokenMetadata;

    use super::*;

    fn record(description: Option<&str>) -> MetadataRecord {
        MetadataRecord {
            update_authority: Pubkey::new_unique(),
            mint: Pubkey::new_unique(),
            name: "My Awesome Token".into(),
            symbol: "MAT".into(),
            uri: "https://res.cloudinary.com/demo/raw/upload/v1/token-metadata-1.json".into(),
            additional_metadata: description
                .map(|d| vec![("description".to_string(), d.to_string())])
                .unwrap_or_default(),
        }
    }

    // update authority + mint + four u32 length prefixes (name, symbol, uri, vec)
    const FIXED_PACKED_LEN: usize = 32 + 32 + 4 * 4;

    #[test]
    fn packed_len_is_length_prefixed() {
        let r = record(None);
        let expected = FIXED_PACKED_LEN + r.name.len() + r.symbol.len() + r.uri.len();
        assert_eq!(packed_metadata_len(&r).unwrap(), expected);
    }

    #[test]
    fn description_adds_key_and_value_with_prefixes() {
        let without = packed_metadata_len(&record(None)).unwrap();
        let with = packed_metadata_len(&record(Some("a token for testing"))).unwrap();
        assert_eq!(with - without, 4 + "description".len() + 4 + "a token for testing".len());
    }

    fn init_metadata_in(len: usize, metadata: &TokenMetadata) -> Result<(), ProgramError> {
        let mut data = vec![0u8; len];
        let mut state = StateWithExtensionsMut::<Mint>::unpack_uninitialized(&mut data)?;
        state.init_extension::<MetadataPointer>(true)?;
        state.base.is_initialized = true;
        state.pack_base();
        state.init_account_type()?;
        state.init_variable_len_extension(metadata, false)
    }

    #[test]
    fn final_len_fits_embedded_metadata_exactly() {
        let r = record(Some("a token for testing"));
        let metadata = r.to_token_metadata().unwrap();
        let len = final_len(mint_account_len().unwrap(), packed_metadata_len(&r).unwrap());

        init_metadata_in(len, &metadata).unwrap();
        assert!(init_metadata_in(len - 1, &metadata).is_err());
    }

    #[test]
    fn base_len_covers_pointer_extension() {
        let base = ExtensionType::try_calculate_account_len::<Mint>(&[]).unwrap();
        assert!(mint_account_len().unwrap() > base);
    }

    #[test]
    fn final_len_adds_overhead_once() {
        let sizing = MintSizing {
            mint_account_len: 234,
            metadata_len: 100,
            rent_lamports: 0,
        };
        assert_eq!(sizing.final_len(), 338);
    }
}
