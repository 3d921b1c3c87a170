//! Billet configuration DTOs

use chrono::{DateTime, NaiveDate, Utc};
use core_kernel::ConfigurationId;
use domain_remittance::BilletConfiguration;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ConfigurationResponse {
    pub id: ConfigurationId,
    pub bank_code: String,
    pub bank_name: String,
    pub company_code: String,
    pub company_name: String,
    pub company_tax_id: String,
    pub wallet_number: String,
    pub agency_number: String,
    pub account_number: String,
    pub account_digit: String,
    pub has_fine: bool,
    pub fine_percentage: Option<Decimal>,
    pub daily_discount: Decimal,
    pub daily_interest: Decimal,
    pub discount_limit_date: Option<NaiveDate>,
    pub discount_amount: Decimal,
    pub rebate_amount: Decimal,
    pub first_message: String,
    pub second_message: String,
    pub starting_sequential_number: u32,
    pub starting_our_number: u64,
    pub next_file_sequence: u32,
    pub next_our_number: u64,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

impl From<BilletConfiguration> for ConfigurationResponse {
    fn from(config: BilletConfiguration) -> Self {
        Self {
            id: config.id,
            bank_code: config.bank_code().to_string(),
            bank_name: config.bank.header_name().trim_end().to_string(),
            company_code: config.company_code,
            company_name: config.company_name,
            company_tax_id: config.company_tax_id,
            wallet_number: config.wallet_number,
            agency_number: config.agency_number,
            account_number: config.account_number,
            account_digit: config.account_digit,
            has_fine: config.has_fine,
            fine_percentage: config.fine_percentage,
            daily_discount: config.daily_discount.amount(),
            daily_interest: config.daily_interest.amount(),
            discount_limit_date: config.discount_limit_date,
            discount_amount: config.discount_amount.amount(),
            rebate_amount: config.rebate_amount.amount(),
            first_message: config.first_message,
            second_message: config.second_message,
            starting_sequential_number: config.starting_sequential_number,
            starting_our_number: config.starting_our_number,
            next_file_sequence: config.next_file_sequence,
            next_our_number: config.next_our_number,
            created_at: config.audit.created_at,
            created_by: config.audit.created_by,
            updated_at: config.audit.updated_at,
            updated_by: config.audit.updated_by,
        }
    }
}
