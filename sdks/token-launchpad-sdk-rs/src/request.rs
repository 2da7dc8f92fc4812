//! Launch request and its validation rules.

use crate::{error::ValidationError, upload::MetadataJson};

pub const NAME_MIN_LEN: usize = 2;
pub const NAME_MAX_LEN: usize = 20;
pub const SYMBOL_MIN_LEN: usize = 2;
pub const SYMBOL_MAX_LEN: usize = 8;
pub const DESCRIPTION_MIN_LEN: usize = 8;
pub const DESCRIPTION_MAX_LEN: usize = 50;
pub const MAX_DECIMALS: u8 = 18;

/// Everything the user asked for in one launch. Consumed by a single pipeline run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenLaunchRequest {
    /// Token name (2..=20 chars)
    pub name: String,
    /// Token symbol (2..=8 chars)
    pub symbol: String,
    /// Mint decimals (0..=18)
    pub decimals: u8,
    /// Whole-token supply minted to the payer
    pub initial_supply: u64,
    /// Optional image URL written into the off-chain JSON
    pub image_url: Option<String>,
    /// Optional description (8..=50 chars, or empty)
    pub description: Option<String>,
    /// Set the mint authority to none after minting
    pub revoke_mint: bool,
    /// Set the freeze authority to none after minting
    pub revoke_freeze: bool,
}

impl TokenLaunchRequest {
    /// Check every field bound. Runs before any network call.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let name_len = self.name.chars().count();
        if !(NAME_MIN_LEN..=NAME_MAX_LEN).contains(&name_len) {
            return Err(ValidationError::NameLength(name_len));
        }

        let symbol_len = self.symbol.chars().count();
        if !(SYMBOL_MIN_LEN..=SYMBOL_MAX_LEN).contains(&symbol_len) {
            return Err(ValidationError::SymbolLength(symbol_len));
        }

        if self.decimals > MAX_DECIMALS {
            return Err(ValidationError::Decimals(self.decimals));
        }

        if let Some(image_url) = self.image_url.as_deref().filter(|s| !s.is_empty()) {
            url::Url::parse(image_url)
                .map_err(|e| ValidationError::ImageUrl(format!("{}: {}", image_url, e)))?;
        }

        if let Some(description) = self.description() {
            let len = description.chars().count();
            if !(DESCRIPTION_MIN_LEN..=DESCRIPTION_MAX_LEN).contains(&len) {
                return Err(ValidationError::DescriptionLength(len));
            }
        }

        self.raw_amount()?;
        Ok(())
    }

    /// `initial_supply * 10^decimals` in base units.
    pub fn raw_amount(&self) -> Result<u64, ValidationError> {
        if self.initial_supply == 0 {
            return Err(ValidationError::ZeroSupply);
        }
        10u64
            .checked_pow(u32::from(self.decimals))
            .and_then(|scale| self.initial_supply.checked_mul(scale))
            .ok_or(ValidationError::SupplyOverflow {
                supply: self.initial_supply,
                decimals: self.decimals,
            })
    }

    /// Description, if one was given and is non-empty.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref().filter(|d| !d.is_empty())
    }

    /// Off-chain JSON document for this token.
    pub fn metadata_json(&self) -> MetadataJson {
        MetadataJson::new(
            &self.name,
            &self.symbol,
            self.description().unwrap_or_default(),
            self.image_url.as_deref().unwrap_or_default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> TokenLaunchRequest {
        TokenLaunchRequest {
            name: "My Awesome Token".into(),
            symbol: "MAT".into(),
            decimals: 9,
            initial_supply: 1000,
            ..Default::default()
        }
    }

    #[test]
    fn raw_amount_scales_by_decimals() {
        assert_eq!(request().raw_amount().unwrap(), 1_000_000_000_000);

        let zero_decimals = TokenLaunchRequest {
            decimals: 0,
            initial_supply: 42,
            ..request()
        };
        assert_eq!(zero_decimals.raw_amount().unwrap(), 42);
    }

    #[test]
    fn raw_amount_overflow_is_rejected() {
        let req = TokenLaunchRequest {
            decimals: 18,
            initial_supply: 19,
            ..request()
        };
        assert_eq!(
            req.validate(),
            Err(ValidationError::SupplyOverflow {
                supply: 19,
                decimals: 18
            })
        );

        let max = TokenLaunchRequest {
            decimals: 18,
            initial_supply: 18,
            ..request()
        };
        assert_eq!(max.raw_amount().unwrap(), 18_000_000_000_000_000_000);
    }

    #[test]
    fn one_char_symbol_is_rejected() {
        let req = TokenLaunchRequest {
            symbol: "M".into(),
            ..request()
        };
        assert_eq!(req.validate(), Err(ValidationError::SymbolLength(1)));
    }

    #[test]
    fn name_bounds() {
        let short = TokenLaunchRequest {
            name: "A".into(),
            ..request()
        };
        assert_eq!(short.validate(), Err(ValidationError::NameLength(1)));

        let long = TokenLaunchRequest {
            name: "A".repeat(21),
            ..request()
        };
        assert_eq!(long.validate(), Err(ValidationError::NameLength(21)));
    }

    #[test]
    fn decimals_above_eighteen_rejected() {
        let req = TokenLaunchRequest {
            decimals: 19,
            ..request()
        };
        assert_eq!(req.validate(), Err(ValidationError::Decimals(19)));
    }

    #[test]
    fn zero_supply_rejected() {
        let req = TokenLaunchRequest {
            initial_supply: 0,
            ..request()
        };
        assert_eq!(req.validate(), Err(ValidationError::ZeroSupply));
    }

    #[test]
    fn description_empty_or_within_bounds() {
        let empty = TokenLaunchRequest {
            description: Some(String::new()),
            ..request()
        };
        assert!(empty.validate().is_ok());
        assert_eq!(empty.description(), None);

        let short = TokenLaunchRequest {
            description: Some("tiny".into()),
            ..request()
        };
        assert_eq!(short.validate(), Err(ValidationError::DescriptionLength(4)));

        let ok = TokenLaunchRequest {
            description: Some("a token for testing".into()),
            ..request()
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn description_edges_are_inclusive() {
        let with = |d: String| TokenLaunchRequest {
            description: Some(d),
            ..request()
        };
        assert!(with("a".repeat(8)).validate().is_ok());
        assert!(with("a".repeat(50)).validate().is_ok());
        assert_eq!(
            with("a".repeat(7)).validate(),
            Err(ValidationError::DescriptionLength(7))
        );
        assert_eq!(
            with("a".repeat(51)).validate(),
            Err(ValidationError::DescriptionLength(51))
        );
        // 8 chars, 20 bytes
        assert!(with("\u{00e9}\u{20ac}".repeat(4)).validate().is_ok());
    }

    #[test]
    fn lengths_count_chars_not_bytes() {
        // 20 chars, 40 bytes
        let name = TokenLaunchRequest {
            name: "\u{00e9}".repeat(20),
            ..request()
        };
        assert!(name.validate().is_ok());

        let too_long = TokenLaunchRequest {
            name: "\u{00e9}".repeat(21),
            ..request()
        };
        assert_eq!(too_long.validate(), Err(ValidationError::NameLength(21)));

        let symbol = TokenLaunchRequest {
            symbol: "\u{20ac}\u{20ac}".into(),
            ..request()
        };
        assert!(symbol.validate().is_ok());
    }

    #[test]
    fn image_url_must_parse() {
        let req = TokenLaunchRequest {
            image_url: Some("not a url".into()),
            ..request()
        };
        assert!(matches!(req.validate(), Err(ValidationError::ImageUrl(_))));

        let ok = TokenLaunchRequest {
            image_url: Some("https://example.com/i.png".into()),
            ..request()
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn metadata_json_defaults_optional_fields() {
        let json = serde_json::to_value(request().metadata_json()).unwrap();
        assert_eq!(json["name"], "My Awesome Token");
        assert_eq!(json["symbol"], "MAT");
        assert_eq!(json["description"], "");
        assert_eq!(json["image"], "");
        assert_eq!(json["attributes"][0]["trait_type"], "Item");
    }
}
