//! Sicoob (756) CNAB400 layout
//!
//! Unlike Bradesco, the Sicoob detail carries the allocated "our number"
//! and identifies the beneficiary by tax id and cooperative agency/account.
//! The agency is the four-digit cooperative prefix followed by its check
//! digit, as stored in the five agency columns of the configuration.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::bank::Bank;
use crate::collaborators::EncodableTitle;
use crate::configuration::BilletConfiguration;
use crate::error::RemittanceError;

use super::format::{format_field, Align, Record, RecordBuilder};
use super::{ConfigurationWidths, RemittanceCodec};

/// Columns the header and detail records give the configuration fields
///
/// Company code and first message are not printed; their limits are the
/// generic ones.
pub const CONFIGURATION_WIDTHS: ConfigurationWidths = ConfigurationWidths {
    company_code: 20,
    company_name: 30,
    wallet_number: 2,
    agency_number: 5,
    account_number: 8,
    first_message: 12,
    second_message: 40,
};

/// Sicoob collection remittance
#[derive(Debug, Clone, Copy, Default)]
pub struct SicoobCodec;

/// Cooperative prefix and check digit
fn agency_parts(configuration: &BilletConfiguration) -> (String, String) {
    let agency = format_field(&configuration.agency_number, 5, '0', Align::Right);
    let (prefix, digit) = agency.split_at(4);
    (prefix.to_string(), digit.to_string())
}

/// Percentage with four implied decimals: 2% becomes `20000`
fn percentage_4dp(percentage: Decimal) -> String {
    (percentage * Decimal::from(10_000))
        .round_dp(0)
        .normalize()
        .to_string()
}

impl RemittanceCodec for SicoobCodec {
    fn bank(&self) -> Bank {
        Bank::Sicoob
    }

    /// `CBRddmmNN.REM`
    fn file_name(&self, generated_on: NaiveDate, file_sequence: u32) -> String {
        format!("CBR{}{:02}.REM", generated_on.format("%d%m"), file_sequence % 100)
    }

    fn header(
        &self,
        configuration: &BilletConfiguration,
        file_sequence: u32,
        generated_on: NaiveDate,
    ) -> Result<Record, RemittanceError> {
        let (agency_prefix, agency_digit) = agency_parts(configuration);
        RecordBuilder::new("header")
            .literal("record_type", "0")
            .literal("operation", "1")
            .literal("operation_name", "REMESSA")
            .literal("service_code", "01")
            .text("service_name", 8, "COBRANCA")
            .blank("filler_1", 7)
            .number("agency_prefix", 4, agency_prefix)
            .number("agency_digit", 1, agency_digit)
            .number("account", 8, &configuration.account_number)
            .number("account_digit", 1, &configuration.account_digit)
            .blank("agreement", 6)
            .text("company_name", 30, &configuration.company_name)
            .number("bank_code", 3, self.bank().code())
            .text("bank_name", 15, self.bank().header_name())
            .date("generated_on", Some(generated_on))
            .number("file_sequence", 7, file_sequence)
            .blank("filler_2", 287)
            .number("sequence", 6, 1)
            .finish()
    }

    fn detail(
        &self,
        configuration: &BilletConfiguration,
        title: &EncodableTitle,
        sequence: u32,
    ) -> Result<Record, RemittanceError> {
        let (agency_prefix, agency_digit) = agency_parts(configuration);
        let fine = configuration.fine().map(percentage_4dp).unwrap_or_default();

        RecordBuilder::new("detail")
            .literal("record_type", "1")
            .literal("beneficiary_id_type", "02")
            .number("beneficiary_tax_id", 14, &configuration.company_tax_id)
            .number("agency_prefix", 4, &agency_prefix)
            .number("agency_digit", 1, &agency_digit)
            .number("account", 8, &configuration.account_number)
            .number("account_digit", 1, &configuration.account_digit)
            .zeros("agreement", 6)
            .blank("participant_control", 25)
            .number("our_number", 11, title.our_number)
            // Check digit placeholder; no checksum is computed
            .zeros("our_number_dv", 1)
            .literal("installment", "01")
            .literal("group", "00")
            .blank("filler_1", 3)
            .blank("sacador_indicator", 1)
            .blank("filler_2", 3)
            .zeros("variation", 3)
            .zeros("account_ref", 1)
            .zeros("contract", 5)
            .zeros("contract_dv", 1)
            .zeros("bordero", 6)
            .blank("filler_3", 4)
            .literal("delivery_type", "2")
            .number("wallet", 2, &configuration.wallet_number)
            .literal("occurrence", "01")
            .number("document_number", 10, title.our_number)
            .date("due_date", Some(title.due_date))
            .currency("amount", 13, &title.amount)
            .number("bank_code", 3, self.bank().code())
            .number("collecting_agency", 4, &agency_prefix)
            .number("collecting_agency_dv", 1, &agency_digit)
            .literal("species", "01")
            .literal("acceptance", "0")
            .date("issue_date", Some(title.issue_date))
            .literal("instruction_1", "00")
            .literal("instruction_2", "00")
            .zeros("interest_rate", 6)
            .number("fine_rate", 6, fine)
            .literal("distribution", "2")
            .date("discount_limit_date", configuration.discount_limit_date)
            .currency("discount_amount", 13, &configuration.discount_amount)
            .literal("currency_code", "9")
            .zeros("iof_amount", 12)
            .currency("rebate_amount", 13, &configuration.rebate_amount)
            .literal("payer_id_type", "02")
            .number("payer_tax_id", 14, title.payer.tax_id_digits())
            .text("payer_name", 40, &title.payer.legal_name)
            .text(
                "payer_street",
                37,
                &format!("{}, {}", title.payer.address.street, title.payer.address.number),
            )
            .blank("payer_neighborhood", 15)
            .number("payer_zip", 8, title.payer.address.zip_digits())
            .text("payer_city", 15, &title.payer.address.city)
            .text("payer_state", 2, &title.payer.address.state)
            .text("message", 40, &configuration.second_message)
            .literal("protest_days", "00")
            .blank("filler_4", 1)
            .number("sequence", 6, sequence)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_percentage_4dp() {
        assert_eq!(percentage_4dp(dec!(2)), "20000");
        assert_eq!(percentage_4dp(dec!(1.25)), "12500");
    }

    #[test]
    fn test_file_name() {
        let date = NaiveDate::from_ymd_opt(2025, 12, 1).unwrap();
        assert_eq!(SicoobCodec.file_name(date, 5), "CBR011205.REM");
    }
}
