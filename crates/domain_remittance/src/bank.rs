//! Banks that originate collection titles
//!
//! A bank is identified in CNAB files by its three-digit clearing code
//! (COMPE). The enum lists the banks a configuration may point at; whether a
//! remittance file can actually be produced for one is decided by the codec
//! registry.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RemittanceError;

/// Clearing-house bank family of a configuration and its billets
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bank {
    BancoDoBrasil,
    Bradesco,
    Caixa,
    Itau,
    Sicoob,
}

impl Bank {
    /// Every known bank, in clearing-code order
    pub const ALL: [Bank; 5] = [
        Bank::BancoDoBrasil,
        Bank::Caixa,
        Bank::Bradesco,
        Bank::Itau,
        Bank::Sicoob,
    ];

    /// Three-digit clearing code
    pub fn code(&self) -> &'static str {
        match self {
            Bank::BancoDoBrasil => "001",
            Bank::Caixa => "104",
            Bank::Bradesco => "237",
            Bank::Itau => "341",
            Bank::Sicoob => "756",
        }
    }

    /// Bank name as written in a remittance header
    pub fn header_name(&self) -> &'static str {
        match self {
            Bank::BancoDoBrasil => "BANCODOBRASIL",
            Bank::Caixa => "C ECON FEDERAL",
            Bank::Bradesco => "BRADESCO",
            Bank::Itau => "BANCO ITAU SA",
            Bank::Sicoob => "BANCOOBCED",
        }
    }

    /// Resolves a clearing code
    pub fn from_code(code: &str) -> Option<Bank> {
        Bank::ALL.into_iter().find(|bank| bank.code() == code.trim())
    }
}

impl Default for Bank {
    fn default() -> Self {
        Bank::Bradesco
    }
}

impl fmt::Display for Bank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Bank::BancoDoBrasil => "Banco do Brasil",
            Bank::Caixa => "Caixa",
            Bank::Bradesco => "Bradesco",
            Bank::Itau => "Itau",
            Bank::Sicoob => "Sicoob",
        };
        write!(f, "{} ({})", name, self.code())
    }
}

impl FromStr for Bank {
    type Err = RemittanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Bank::from_code(s)
            .ok_or_else(|| RemittanceError::validation("bank_code", format!("unknown bank code '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bank_is_bradesco() {
        assert_eq!(Bank::default().code(), "237");
    }

    #[test]
    fn test_from_code() {
        assert_eq!(Bank::from_code("756"), Some(Bank::Sicoob));
        assert_eq!(Bank::from_code(" 237 "), Some(Bank::Bradesco));
        assert_eq!(Bank::from_code("999"), None);
        assert!("12".parse::<Bank>().is_err());
    }

    #[test]
    fn test_header_names_fit_fifteen_columns() {
        for bank in Bank::ALL {
            assert!(bank.header_name().len() <= 15, "{bank}");
        }
    }
}
