//! Bradesco (237) CNAB400 layout

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::bank::Bank;
use crate::collaborators::EncodableTitle;
use crate::configuration::BilletConfiguration;
use crate::error::RemittanceError;

use super::format::{format_field, Align, Record, RecordBuilder};
use super::{ConfigurationWidths, RemittanceCodec};

/// Columns the header and detail records give the configuration fields
pub const CONFIGURATION_WIDTHS: ConfigurationWidths = ConfigurationWidths {
    company_code: 20,
    company_name: 30,
    wallet_number: 3,
    agency_number: 5,
    account_number: 7,
    first_message: 12,
    second_message: 60,
};

/// Bradesco collection remittance
#[derive(Debug, Clone, Copy, Default)]
pub struct BradescoCodec;

/// Fine percentage in hundredths: 2.5% becomes `250`
fn fine_hundredths(percentage: Decimal) -> String {
    (percentage * Decimal::ONE_HUNDRED)
        .round_dp(0)
        .normalize()
        .to_string()
}

/// `0` + wallet + agency + account + digit
fn beneficiary_identification(configuration: &BilletConfiguration) -> String {
    [
        "0".to_string(),
        format_field(&configuration.wallet_number, 3, '0', Align::Right),
        format_field(&configuration.agency_number, 5, '0', Align::Right),
        format_field(&configuration.account_number, 7, '0', Align::Right),
        format_field(&configuration.account_digit, 1, '0', Align::Right),
    ]
    .concat()
}

impl RemittanceCodec for BradescoCodec {
    fn bank(&self) -> Bank {
        Bank::Bradesco
    }

    /// `CBddmmNN.REM`
    fn file_name(&self, generated_on: NaiveDate, file_sequence: u32) -> String {
        format!("CB{}{:02}.REM", generated_on.format("%d%m"), file_sequence % 100)
    }

    fn header(
        &self,
        configuration: &BilletConfiguration,
        file_sequence: u32,
        generated_on: NaiveDate,
    ) -> Result<Record, RemittanceError> {
        RecordBuilder::new("header")
            .literal("record_type", "0")
            .literal("operation", "1")
            .literal("operation_name", "REMESSA")
            .literal("service_code", "01")
            .text("service_name", 15, "COBRANCA")
            .number("company_code", 20, &configuration.company_code)
            .text("company_name", 30, &configuration.company_name)
            .number("bank_code", 3, self.bank().code())
            .text("bank_name", 15, self.bank().header_name())
            .date("generated_on", Some(generated_on))
            .blank("filler_1", 8)
            .literal("system_id", "MX")
            .number("file_sequence", 7, file_sequence)
            .blank("filler_2", 277)
            .number("sequence", 6, 1)
            .finish()
    }

    fn detail(
        &self,
        configuration: &BilletConfiguration,
        title: &EncodableTitle,
        sequence: u32,
    ) -> Result<Record, RemittanceError> {
        let builder = RecordBuilder::new("detail")
            .literal("record_type", "1")
            .zeros("debit_account", 19)
            .number("beneficiary", 17, beneficiary_identification(configuration))
            .blank("participant_control", 25)
            .number("bank_code", 3, self.bank().code());

        let builder = match configuration.fine() {
            Some(percentage) => builder
                .literal("fine_flag", "2")
                .number("fine_percentage", 4, fine_hundredths(percentage)),
            None => builder.literal("fine_flag", "0").zeros("fine_percentage", 4),
        };

        builder
            // Bank title identification and its check digit stay zero filled
            .zeros("bank_title_id", 11)
            .zeros("bank_title_dv", 1)
            .currency("daily_discount", 10, &configuration.daily_discount)
            .literal("issue_condition", "2")
            .literal("debit_notice", "N")
            .blank("bank_operation", 10)
            .blank("apportionment", 1)
            .literal("debit_notice_address", "2")
            .blank("filler_1", 2)
            .literal("occurrence", "01")
            .blank("document_number", 10)
            .date("due_date", Some(title.due_date))
            .currency("amount", 13, &title.amount)
            .zeros("collecting_bank", 3)
            .zeros("collecting_agency", 5)
            .literal("species", "01")
            .literal("acceptance", "N")
            .date("issue_date", Some(title.issue_date))
            .zeros("instructions", 4)
            .currency("daily_interest", 13, &configuration.daily_interest)
            .date("discount_limit_date", configuration.discount_limit_date)
            .currency("discount_amount", 13, &configuration.discount_amount)
            .zeros("iof_amount", 13)
            .currency("rebate_amount", 13, &configuration.rebate_amount)
            .literal("payer_id_type", "02")
            .number("payer_tax_id", 14, title.payer.tax_id_digits())
            .text("payer_name", 40, &title.payer.legal_name)
            .text("payer_address", 40, &title.payer.address.composed())
            .text("first_message", 12, &configuration.first_message)
            .number("payer_zip", 8, title.payer.address.zip_digits())
            .text("second_message", 60, &configuration.second_message)
            .number("sequence", 6, sequence)
            .finish()
    }
}
