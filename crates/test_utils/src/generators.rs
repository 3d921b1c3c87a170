//! Property-Based Test Generators
//!
//! proptest strategies for titles and payers that stay within what the
//! CNAB400 layouts accept, plus `fake` helpers for one-off realistic payers.

use chrono::{Duration, NaiveDate};
use core_kernel::{BilletId, ClientId, Currency, Money};
use domain_remittance::{EncodableTitle, PayerAddress, PayerData};
use fake::faker::address::en::{BuildingNumber, CityName, StateAbbr, StreetName, ZipCode};
use fake::faker::company::en::CompanyName;
use fake::Fake;
use proptest::prelude::*;

use crate::fixtures::DateFixtures;

/// Largest amount a 13-column currency field holds, in centavos
pub const MAX_AMOUNT_CENTS: i64 = 9_999_999_999_999;

/// Strategy for the supported bank codes
pub fn bank_code_strategy() -> impl Strategy<Value = String> {
    prop_oneof![Just("237".to_string()), Just("756".to_string())]
}

/// Strategy for positive BRL amounts that fit a currency field
pub fn amount_strategy() -> impl Strategy<Value = Money> {
    (1i64..=MAX_AMOUNT_CENTS).prop_map(|cents| Money::from_minor(cents, Currency::BRL))
}

/// Strategy for free text mixing ASCII with Portuguese diacritics
pub fn accented_text_strategy(max_len: usize) -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            8 => proptest::char::range('a', 'z'),
            2 => proptest::char::range('A', 'Z'),
            1 => Just(' '),
            1 => proptest::sample::select(vec!['ç', 'ã', 'õ', 'á', 'é', 'í', 'ó', 'ú', 'â', 'ê', 'Ç', 'É']),
        ],
        0..=max_len,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

/// Strategy for CNPJ-shaped tax ids, with or without punctuation
pub fn tax_id_strategy() -> impl Strategy<Value = String> {
    (proptest::collection::vec(0u8..10, 14), any::<bool>()).prop_map(|(digits, punctuate)| {
        let digits: String = digits.iter().map(|d| char::from(b'0' + d)).collect();
        if punctuate {
            format!(
                "{}.{}.{}/{}-{}",
                &digits[0..2],
                &digits[2..5],
                &digits[5..8],
                &digits[8..12],
                &digits[12..14]
            )
        } else {
            digits
        }
    })
}

/// Strategy for payers, including names and addresses longer than their
/// fields
pub fn payer_strategy() -> impl Strategy<Value = PayerData> {
    (
        tax_id_strategy(),
        accented_text_strategy(60),
        accented_text_strategy(50),
        1u32..10_000,
        accented_text_strategy(20),
        "[A-Z]{2}",
        "[0-9]{5}-[0-9]{3}",
    )
        .prop_map(|(tax_id, legal_name, street, number, city, state, zip)| PayerData {
            client_id: ClientId::new(),
            tax_id,
            legal_name,
            address: PayerAddress {
                street,
                number: number.to_string(),
                city,
                state,
                zip,
            },
        })
}

/// Strategy for complete titles due within a year of the business date
pub fn title_strategy() -> impl Strategy<Value = EncodableTitle> {
    (amount_strategy(), 0u64..1_000_000, 0i64..365, 0i64..30, payer_strategy()).prop_map(
        |(amount, our_number, due_in, issued_ago, payer)| {
            let base = DateFixtures::business_date();
            EncodableTitle {
                billet_id: BilletId::new(),
                our_number,
                amount,
                due_date: base + Duration::days(due_in),
                issue_date: base - Duration::days(issued_ago),
                payer,
            }
        },
    )
}

/// Strategy for calendar dates within the two-digit-year window
pub fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    (2000i32..2099, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default())
}

/// A realistic company payer
pub fn fake_payer() -> PayerData {
    let tax_id: u64 = (10_000_000_000_000u64..99_999_999_999_999u64).fake();
    PayerData {
        client_id: ClientId::new(),
        tax_id: tax_id.to_string(),
        legal_name: CompanyName().fake(),
        address: PayerAddress {
            street: StreetName().fake(),
            number: BuildingNumber().fake(),
            city: CityName().fake(),
            state: StateAbbr().fake(),
            zip: ZipCode().fake(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    proptest! {
        #[test]
        fn amounts_fit_thirteen_columns(money in amount_strategy()) {
            prop_assert!(money.amount() > Decimal::ZERO);
            let cents = money.minor_units().unwrap();
            prop_assert!(cents.to_string().len() <= 13);
        }

        #[test]
        fn tax_ids_carry_fourteen_digits(payer in payer_strategy()) {
            prop_assert_eq!(payer.tax_id_digits().len(), 14);
        }

        #[test]
        fn titles_are_issued_before_due(title in title_strategy()) {
            prop_assert!(title.issue_date <= title.due_date);
        }
    }

    #[test]
    fn test_fake_payer_is_complete() {
        let payer = fake_payer();
        assert_eq!(payer.tax_id_digits().len(), 14);
        assert!(!payer.legal_name.is_empty());
        assert!(!payer.address.city.is_empty());
    }
}
