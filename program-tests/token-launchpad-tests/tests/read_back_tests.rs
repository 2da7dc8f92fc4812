use solana_sdk::{account::Account, pubkey::Pubkey, system_program};
use token_launchpad_sdk::{decode_mint_account, ReadBackError, TokenLaunchReader};
use token_launchpad_tests::{FakeLedger, MintFixture};

#[test]
fn decodes_pointer_and_embedded_metadata() -> anyhow::Result<()> {
    let mint = Pubkey::new_unique();
    let authority = Pubkey::new_unique();
    let mut fixture = MintFixture::new(mint, authority);
    fixture.supply = 42_000;
    fixture.decimals = 3;
    fixture.freeze_authority = None;
    fixture.metadata.additional_metadata = vec![("description".into(), "Hello token".into())];

    let read_back = decode_mint_account(&fixture.build()?)?;

    assert_eq!(read_back.mint.supply, 42_000);
    assert_eq!(read_back.mint.decimals, 3);
    assert_eq!(read_back.mint.mint_authority, Some(authority));
    assert_eq!(read_back.mint.freeze_authority, None);
    assert_eq!(read_back.metadata_pointer.authority, Some(authority));
    assert_eq!(read_back.metadata_pointer.metadata_address, Some(mint));
    assert_eq!(read_back.metadata.mint, mint);
    assert_eq!(read_back.metadata.update_authority, Some(authority));
    assert_eq!(read_back.metadata.name, "Test Token");
    assert_eq!(
        read_back.metadata.additional_metadata,
        vec![("description".to_string(), "Hello token".to_string())]
    );
    Ok(())
}

#[test]
fn read_back_serializes_addresses_as_base58() -> anyhow::Result<()> {
    let mint = Pubkey::new_unique();
    let authority = Pubkey::new_unique();
    let mut fixture = MintFixture::new(mint, authority);
    fixture.mint_authority = None;

    let json = serde_json::to_value(decode_mint_account(&fixture.build()?)?)?;

    assert_eq!(json["mint"]["mintAuthority"], serde_json::Value::Null);
    assert_eq!(json["mint"]["freezeAuthority"], authority.to_string());
    assert_eq!(json["metadataPointer"]["metadataAddress"], mint.to_string());
    assert_eq!(json["metadata"]["mint"], mint.to_string());
    assert_eq!(json["metadata"]["symbol"], "TEST");
    Ok(())
}

#[test]
fn plain_bytes_fail_to_decode() {
    assert!(decode_mint_account(&[0u8; 10]).is_err());
}

#[tokio::test]
async fn reader_requires_an_existing_account() {
    let ledger = FakeLedger::new();
    let mint = Pubkey::new_unique();

    let err = TokenLaunchReader::new(spl_token_2022::id(), &ledger)
        .read(&mint)
        .await
        .unwrap_err();

    assert!(matches!(err, ReadBackError::AccountNotFound(m) if m == mint));
}

#[tokio::test]
async fn reader_rejects_accounts_owned_by_another_program() -> anyhow::Result<()> {
    let ledger = FakeLedger::new();
    let mint = Pubkey::new_unique();
    let fixture = MintFixture::new(mint, Pubkey::new_unique());
    ledger.insert_account(
        mint,
        Account {
            owner: system_program::id(),
            ..fixture.account(1_000_000)?
        },
    );

    let err = TokenLaunchReader::new(spl_token_2022::id(), &ledger)
        .read(&mint)
        .await
        .unwrap_err();

    assert!(matches!(err, ReadBackError::WrongOwner { .. }));
    Ok(())
}

#[tokio::test]
async fn reader_decodes_a_stored_mint() -> anyhow::Result<()> {
    let ledger = FakeLedger::new();
    let mint = Pubkey::new_unique();
    let fixture = MintFixture::new(mint, Pubkey::new_unique());
    ledger.insert_account(mint, fixture.account(1_000_000)?);

    let read_back = TokenLaunchReader::new(spl_token_2022::id(), &ledger)
        .read(&mint)
        .await?;

    assert_eq!(read_back.metadata.uri, "https://example.com/meta.json");
    Ok(())
}
