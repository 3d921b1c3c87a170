//! Billet configuration
//!
//! A configuration is the profile of one bank account/contract used to
//! originate collection titles: bank and wallet, agency and account, the
//! fine/discount/interest terms printed on every title, two free-text
//! messages and the seeds of the two sequence counters.
//!
//! Every field is checked against the width the CNAB layout of its bank
//! gives it when the configuration is created or updated, so oversized
//! values are rejected here instead of being cut inside a bank file.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError};

use core_kernel::{AuditStamp, ConfigurationId, Money};

use crate::bank::Bank;
use crate::cnab::ConfigurationWidths;
use crate::error::RemittanceError;

/// Largest file sequence the 7-digit header field can carry
pub const MAX_FILE_SEQUENCE: u32 = 9_999_999;

/// Largest "our number" the 11-digit title identification can carry
pub const MAX_OUR_NUMBER: u64 = 99_999_999_999;

/// Request for creating a configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewBilletConfiguration {
    #[validate(length(min = 1, max = 20), custom(function = "digits_only"))]
    pub company_code: String,
    #[validate(length(min = 1, max = 30))]
    pub company_name: String,
    #[validate(length(min = 1, max = 14), custom(function = "digits_only"))]
    pub company_tax_id: String,
    #[validate(length(min = 1, max = 3), custom(function = "digits_only"))]
    pub wallet_number: String,
    #[validate(length(min = 1, max = 5), custom(function = "digits_only"))]
    pub agency_number: String,
    #[validate(length(min = 1, max = 7), custom(function = "digits_only"))]
    pub account_number: String,
    #[validate(length(equal = 1), custom(function = "digits_only"))]
    pub account_digit: String,
    #[serde(default = "default_bank_code")]
    #[validate(length(equal = 3), custom(function = "known_bank_code"))]
    pub bank_code: String,
    #[serde(default)]
    pub has_fine: bool,
    #[serde(default)]
    pub fine_percentage: Option<Decimal>,
    #[serde(default)]
    pub daily_discount: Decimal,
    #[serde(default)]
    pub daily_interest: Decimal,
    #[serde(default)]
    pub discount_limit_date: Option<NaiveDate>,
    #[serde(default)]
    pub discount_amount: Decimal,
    #[serde(default)]
    pub rebate_amount: Decimal,
    #[serde(default)]
    #[validate(length(max = 12))]
    pub first_message: String,
    #[serde(default)]
    #[validate(length(max = 60))]
    pub second_message: String,
    #[serde(default = "default_counter_seed")]
    pub starting_sequential_number: u32,
    #[serde(default = "default_counter_seed")]
    pub starting_our_number: u64,
}

fn default_bank_code() -> String {
    Bank::default().code().to_string()
}

fn default_counter_seed<T: From<u8>>() -> T {
    T::from(1)
}

fn digits_only(value: &str) -> Result<(), ValidationError> {
    if value.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("digits_only").with_message("must contain only digits".into()))
    }
}

fn known_bank_code(value: &str) -> Result<(), ValidationError> {
    match Bank::from_code(value) {
        Some(_) => Ok(()),
        None => Err(ValidationError::new("unknown_bank").with_message("unknown bank code".into())),
    }
}

/// Checks that a non-negative amount fits `digits` columns once the decimal
/// separator is dropped
fn check_amount(field: &str, amount: Decimal, digits: u32) -> Result<(), RemittanceError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(RemittanceError::validation(field, "must not be negative"));
    }
    let limit = Decimal::from(10_i64.pow(digits - 2));
    if amount.round_dp(2) >= limit {
        return Err(RemittanceError::validation(
            field,
            format!("does not fit {digits} digits"),
        ));
    }
    Ok(())
}

impl NewBilletConfiguration {
    /// Runs field and cross-field validation
    pub fn check(&self) -> Result<(), RemittanceError> {
        self.validate()?;

        match (self.has_fine, self.fine_percentage) {
            (true, None) => {
                return Err(RemittanceError::validation(
                    "fine_percentage",
                    "required when has_fine is set",
                ))
            }
            (false, Some(_)) => {
                return Err(RemittanceError::validation(
                    "fine_percentage",
                    "only allowed when has_fine is set",
                ))
            }
            (true, Some(pct)) => {
                if pct.is_sign_negative() || pct >= dec!(100) || pct.scale() > 2 && pct.round_dp(2) != pct {
                    return Err(RemittanceError::validation(
                        "fine_percentage",
                        "must be in [0, 100) with at most two decimals",
                    ));
                }
            }
            (false, None) => {}
        }

        check_amount("daily_discount", self.daily_discount, 10)?;
        check_amount("daily_interest", self.daily_interest, 13)?;
        check_amount("discount_amount", self.discount_amount, 13)?;
        check_amount("rebate_amount", self.rebate_amount, 13)?;

        let bank = self.bank_code.parse::<Bank>()?;
        if let Some(widths) = ConfigurationWidths::for_bank(bank) {
            widths.check(bank, self)?;
        }

        if self.starting_sequential_number == 0 || self.starting_sequential_number > MAX_FILE_SEQUENCE {
            return Err(RemittanceError::validation(
                "starting_sequential_number",
                format!("must be within 1..={MAX_FILE_SEQUENCE}"),
            ));
        }
        if self.starting_our_number == 0 || self.starting_our_number > MAX_OUR_NUMBER {
            return Err(RemittanceError::validation(
                "starting_our_number",
                format!("must be within 1..={MAX_OUR_NUMBER}"),
            ));
        }
        Ok(())
    }
}

/// Partial update of a configuration; `None` keeps the current value
///
/// The nullable terms distinguish an absent field (keep) from an explicit
/// `null` (clear).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigurationChanges {
    pub company_code: Option<String>,
    pub company_name: Option<String>,
    pub company_tax_id: Option<String>,
    pub wallet_number: Option<String>,
    pub agency_number: Option<String>,
    pub account_number: Option<String>,
    pub account_digit: Option<String>,
    pub has_fine: Option<bool>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub fine_percentage: Option<Option<Decimal>>,
    pub daily_discount: Option<Decimal>,
    pub daily_interest: Option<Decimal>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub discount_limit_date: Option<Option<NaiveDate>>,
    pub discount_amount: Option<Decimal>,
    pub rebate_amount: Option<Decimal>,
    pub first_message: Option<String>,
    pub second_message: Option<String>,
    pub starting_sequential_number: Option<u32>,
    pub starting_our_number: Option<u64>,
}

fn present_or_null<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// The bank account/contract profile billets are issued under
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BilletConfiguration {
    pub id: ConfigurationId,
    pub company_code: String,
    pub company_name: String,
    pub company_tax_id: String,
    pub wallet_number: String,
    pub agency_number: String,
    pub account_number: String,
    pub account_digit: String,
    pub bank: Bank,
    pub has_fine: bool,
    pub fine_percentage: Option<Decimal>,
    pub daily_discount: Money,
    pub daily_interest: Money,
    pub discount_limit_date: Option<NaiveDate>,
    pub discount_amount: Money,
    pub rebate_amount: Money,
    pub first_message: String,
    pub second_message: String,
    pub starting_sequential_number: u32,
    pub starting_our_number: u64,
    /// Next file sequence to hand out; never below the starting seed
    pub next_file_sequence: u32,
    /// Next "our number" to hand out; never below the starting seed
    pub next_our_number: u64,
    pub audit: AuditStamp,
}

impl BilletConfiguration {
    /// Validates the request and builds a configuration
    ///
    /// # Errors
    ///
    /// Returns `RemittanceError::Validation` naming the first offending field
    pub fn create(
        request: NewBilletConfiguration,
        actor: &str,
    ) -> Result<Self, RemittanceError> {
        request.check()?;
        let bank = request.bank_code.parse::<Bank>()?;

        Ok(Self {
            id: ConfigurationId::new_v7(),
            company_code: request.company_code,
            company_name: request.company_name,
            company_tax_id: request.company_tax_id,
            wallet_number: request.wallet_number,
            agency_number: request.agency_number,
            account_number: request.account_number,
            account_digit: request.account_digit,
            bank,
            has_fine: request.has_fine,
            fine_percentage: request.fine_percentage,
            daily_discount: Money::brl(request.daily_discount),
            daily_interest: Money::brl(request.daily_interest),
            discount_limit_date: request.discount_limit_date,
            discount_amount: Money::brl(request.discount_amount),
            rebate_amount: Money::brl(request.rebate_amount),
            first_message: request.first_message,
            second_message: request.second_message,
            starting_sequential_number: request.starting_sequential_number,
            starting_our_number: request.starting_our_number,
            next_file_sequence: request.starting_sequential_number,
            next_our_number: request.starting_our_number,
            audit: AuditStamp::created_by(actor),
        })
    }

    /// Bank clearing code
    pub fn bank_code(&self) -> &'static str {
        self.bank.code()
    }

    /// Fine percentage when the configuration charges one
    pub fn fine(&self) -> Option<Decimal> {
        if self.has_fine {
            self.fine_percentage
        } else {
            None
        }
    }

    /// Snapshot of the current values as a creation request
    pub fn to_request(&self) -> NewBilletConfiguration {
        NewBilletConfiguration {
            company_code: self.company_code.clone(),
            company_name: self.company_name.clone(),
            company_tax_id: self.company_tax_id.clone(),
            wallet_number: self.wallet_number.clone(),
            agency_number: self.agency_number.clone(),
            account_number: self.account_number.clone(),
            account_digit: self.account_digit.clone(),
            bank_code: self.bank.code().to_string(),
            has_fine: self.has_fine,
            fine_percentage: self.fine_percentage,
            daily_discount: self.daily_discount.amount(),
            daily_interest: self.daily_interest.amount(),
            discount_limit_date: self.discount_limit_date,
            discount_amount: self.discount_amount.amount(),
            rebate_amount: self.rebate_amount.amount(),
            first_message: self.first_message.clone(),
            second_message: self.second_message.clone(),
            starting_sequential_number: self.starting_sequential_number,
            starting_our_number: self.starting_our_number,
        }
    }

    /// Applies a partial update, re-validating the merged result
    ///
    /// The bank cannot change: billets already issued under this
    /// configuration are bound to it. Counters only move forward.
    pub fn update(
        &mut self,
        changes: ConfigurationChanges,
        actor: &str,
    ) -> Result<(), RemittanceError> {
        let mut merged = self.to_request();
        if let Some(v) = changes.company_code { merged.company_code = v; }
        if let Some(v) = changes.company_name { merged.company_name = v; }
        if let Some(v) = changes.company_tax_id { merged.company_tax_id = v; }
        if let Some(v) = changes.wallet_number { merged.wallet_number = v; }
        if let Some(v) = changes.agency_number { merged.agency_number = v; }
        if let Some(v) = changes.account_number { merged.account_number = v; }
        if let Some(v) = changes.account_digit { merged.account_digit = v; }
        if let Some(v) = changes.has_fine { merged.has_fine = v; }
        if let Some(v) = changes.fine_percentage { merged.fine_percentage = v; }
        if let Some(v) = changes.daily_discount { merged.daily_discount = v; }
        if let Some(v) = changes.daily_interest { merged.daily_interest = v; }
        if let Some(v) = changes.discount_limit_date { merged.discount_limit_date = v; }
        if let Some(v) = changes.discount_amount { merged.discount_amount = v; }
        if let Some(v) = changes.rebate_amount { merged.rebate_amount = v; }
        if let Some(v) = changes.first_message { merged.first_message = v; }
        if let Some(v) = changes.second_message { merged.second_message = v; }
        if let Some(v) = changes.starting_sequential_number { merged.starting_sequential_number = v; }
        if let Some(v) = changes.starting_our_number { merged.starting_our_number = v; }
        merged.check()?;

        self.company_code = merged.company_code;
        self.company_name = merged.company_name;
        self.company_tax_id = merged.company_tax_id;
        self.wallet_number = merged.wallet_number;
        self.agency_number = merged.agency_number;
        self.account_number = merged.account_number;
        self.account_digit = merged.account_digit;
        self.has_fine = merged.has_fine;
        self.fine_percentage = merged.fine_percentage;
        self.daily_discount = Money::brl(merged.daily_discount);
        self.daily_interest = Money::brl(merged.daily_interest);
        self.discount_limit_date = merged.discount_limit_date;
        self.discount_amount = Money::brl(merged.discount_amount);
        self.rebate_amount = Money::brl(merged.rebate_amount);
        self.first_message = merged.first_message;
        self.second_message = merged.second_message;
        self.starting_sequential_number = merged.starting_sequential_number;
        self.starting_our_number = merged.starting_our_number;
        self.next_file_sequence = self.next_file_sequence.max(merged.starting_sequential_number);
        self.next_our_number = self.next_our_number.max(merged.starting_our_number);
        self.audit.touch(actor);
        Ok(())
    }
}
