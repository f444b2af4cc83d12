use std::fmt;
use std::str::FromStr;

use snafu::ResultExt;

use super::error::{GatewayError, GatewayResult, InvalidAddressSnafu, InvalidTxHashSnafu};

/// Loosely-typed tuple returned by `getMessage(index)`.
///
/// Expected shape is `[address, text, timestamp]`, but nodes and decoders are
/// not trusted to honor it, so consumers must tolerate anything.
pub type RawMessage = serde_json::Value;

// Both chain handles are fixed-width byte strings with identical hex rules.
macro_rules! define_fixed_bytes {
    ($name:ident, $len:literal, $snafu:ident, $stage:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            pub const LEN: usize = $len;

            pub const fn new(raw: [u8; $len]) -> Self {
                Self(raw)
            }

            /// Parses `0x`-prefixed or bare hex, case-insensitively.
            pub fn parse(raw: &str) -> GatewayResult<Self> {
                let trimmed = raw.trim();
                let digits = trimmed
                    .strip_prefix("0x")
                    .or_else(|| trimmed.strip_prefix("0X"))
                    .unwrap_or(trimmed);
                let mut bytes = [0u8; $len];
                hex::decode_to_slice(digits, &mut bytes).context($snafu {
                    stage: $stage,
                    raw: raw.to_string(),
                })?;
                Ok(Self(bytes))
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(formatter, "0x{}", hex::encode(self.0))
            }
        }

        impl FromStr for $name {
            type Err = GatewayError;

            fn from_str(raw: &str) -> GatewayResult<Self> {
                Self::parse(raw)
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(value: [u8; $len]) -> Self {
                Self::new(value)
            }
        }
    };
}

define_fixed_bytes!(Address, 20, InvalidAddressSnafu, "parse-address");
define_fixed_bytes!(TxHash, 32, InvalidTxHashSnafu, "parse-tx-hash");

impl Address {
    /// Compact label such as `0x1234…abcd`.
    pub fn short(&self) -> String {
        let full = self.to_string();
        format!("{}…{}", &full[..6], &full[full.len() - 4..])
    }
}

/// Outcome of waiting for a transaction to be included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReceiptStatus {
    Success,
    Reverted,
}

impl ReceiptStatus {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "0x52908400098527886E0F7030069857D2E4169EE7";

    #[test]
    fn address_parses_mixed_case_and_prints_lowercase() {
        let address = Address::parse(SAMPLE).unwrap();
        assert_eq!(
            address.to_string(),
            "0x52908400098527886e0f7030069857d2e4169ee7"
        );
        assert_eq!(address, Address::parse(&SAMPLE[2..]).unwrap());
    }

    #[test]
    fn address_short_form_keeps_prefix_and_tail() {
        let address = Address::parse(SAMPLE).unwrap();
        assert_eq!(address.short(), "0x5290…9ee7");
    }

    #[test]
    fn wrong_length_is_rejected_with_stage() {
        let error = Address::parse("0x1234").unwrap_err();
        assert_eq!(error.stage(), "parse-address");
        assert!(matches!(error, GatewayError::InvalidAddress { .. }));

        let error = TxHash::parse(SAMPLE).unwrap_err();
        assert!(matches!(error, GatewayError::InvalidTxHash { .. }));
    }
}
