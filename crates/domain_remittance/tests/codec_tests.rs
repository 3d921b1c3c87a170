//! CNAB400 Codec Tests
//!
//! Record widths, field offsets, line counts and the reference Bradesco file
//! for a single R$ 1000.00 title.

use std::sync::atomic::AtomicBool;

use chrono::NaiveDate;
use core_kernel::{BilletId, ClientId, Money};
use domain_remittance::cnab::{
    BradescoCodec, Record, RemittanceCodec, SicoobCodec, LINE_TERMINATOR, RECORD_WIDTH,
};
use domain_remittance::{
    BilletConfiguration, EncodableTitle, EncodeRequest, NewBilletConfiguration, PayerAddress,
    PayerData, RemittanceError,
};
use rust_decimal_macros::dec;

// ============================================================================
// TEST FIXTURES
// ============================================================================

fn request(bank_code: &str) -> NewBilletConfiguration {
    NewBilletConfiguration {
        company_code: "4567".to_string(),
        company_name: "Acme Cobranças Ltda".to_string(),
        company_tax_id: "12345678000199".to_string(),
        wallet_number: if bank_code == "756" { "01" } else { "109" }.to_string(),
        agency_number: "00001".to_string(),
        account_number: "0000001".to_string(),
        account_digit: "0".to_string(),
        bank_code: bank_code.to_string(),
        has_fine: false,
        fine_percentage: None,
        daily_discount: dec!(12.50),
        daily_interest: dec!(0),
        discount_limit_date: None,
        discount_amount: dec!(0),
        rebate_amount: dec!(0),
        first_message: "Nao receber".to_string(),
        second_message: "Apos o vencimento cobrar juros".to_string(),
        starting_sequential_number: 1,
        starting_our_number: 1,
    }
}

fn configuration(bank_code: &str) -> BilletConfiguration {
    BilletConfiguration::create(request(bank_code), "tester").expect("valid configuration")
}

fn title(amount: Money, our_number: u64) -> EncodableTitle {
    EncodableTitle {
        billet_id: BilletId::new(),
        our_number,
        amount,
        due_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
        issue_date: NaiveDate::from_ymd_opt(2025, 2, 20).unwrap(),
        payer: PayerData {
            client_id: ClientId::new(),
            tax_id: "98.765.432/0001-10".to_string(),
            legal_name: "José da Conceição Comércio".to_string(),
            address: PayerAddress {
                street: "Avenida Paulista".to_string(),
                number: "1000".to_string(),
                city: "São Paulo".to_string(),
                state: "SP".to_string(),
                zip: "01310-100".to_string(),
            },
        },
    }
}

fn generated_on() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
}

/// 1-indexed inclusive column slice
fn cols(line: &str, from: usize, to: usize) -> &str {
    &line[from - 1..to]
}

fn assert_fields_tile_record(record: &Record) {
    assert_eq!(record.declared_width(), RECORD_WIDTH, "{} widths", record.kind);
    for field in &record.fields {
        assert_eq!(field.value.len(), field.width, "field {}", field.name);
    }
    let concatenated: String = record.fields.iter().map(|f| f.value.clone()).collect();
    assert_eq!(concatenated, record.line());
    assert_eq!(record.line().len(), RECORD_WIDTH);
}

mod bradesco_tests {
    use super::*;

    #[test]
    fn test_reference_file_for_single_title() {
        let config = configuration("237");
        let titles = vec![title(Money::brl(dec!(1000.00)), 0)];

        let file = BradescoCodec
            .encode(&EncodeRequest {
                configuration: &config,
                titles: &titles,
                file_sequence: 1,
                generated_on: generated_on(),
            })
            .unwrap();

        let lines: Vec<&str> = file.lines().collect();
        assert_eq!(file.line_count, 3);
        assert_eq!(lines.len(), 3);
        assert_eq!(cols(lines[1], 127, 139), "0000000100000");
        assert_eq!(lines[2], format!("9{}000003", " ".repeat(393)));
        assert!(file.as_text().ends_with(LINE_TERMINATOR));
        assert_eq!(file.bytes.len(), 3 * (RECORD_WIDTH + 2));
    }

    #[test]
    fn test_header_fields() {
        let config = configuration("237");
        let header = BradescoCodec.header(&config, 42, generated_on()).unwrap();
        let line = header.line();

        assert_eq!(cols(&line, 1, 1), "0");
        assert_eq!(cols(&line, 2, 9), "1REMESSA");
        assert_eq!(cols(&line, 10, 11), "01");
        assert_eq!(cols(&line, 12, 26), "COBRANCA       ");
        assert_eq!(cols(&line, 27, 46), "00000000000000004567");
        assert_eq!(cols(&line, 47, 76), "Acme Cobrancas Ltda           ");
        assert_eq!(cols(&line, 77, 79), "237");
        assert_eq!(cols(&line, 80, 94), "BRADESCO       ");
        assert_eq!(cols(&line, 95, 100), "010325");
        assert_eq!(cols(&line, 109, 110), "MX");
        assert_eq!(cols(&line, 111, 117), "0000042");
        assert_eq!(cols(&line, 395, 400), "000001");
    }

    #[test]
    fn test_detail_fields() {
        let config = configuration("237");
        let detail = BradescoCodec
            .detail(&config, &title(Money::brl(dec!(1000.00)), 0), 2)
            .unwrap();
        let line = detail.line();

        assert_eq!(cols(&line, 1, 1), "1");
        assert_eq!(cols(&line, 2, 20), "0".repeat(19));
        assert_eq!(cols(&line, 21, 37), "01090000100000010");
        assert_eq!(cols(&line, 63, 65), "237");
        assert_eq!(cols(&line, 66, 70), "00000");
        assert_eq!(cols(&line, 71, 82), "0".repeat(12));
        assert_eq!(cols(&line, 83, 92), "0000001250");
        assert_eq!(cols(&line, 109, 110), "01");
        assert_eq!(cols(&line, 121, 126), "100325");
        assert_eq!(cols(&line, 148, 149), "01");
        assert_eq!(cols(&line, 151, 156), "200225");
        assert_eq!(cols(&line, 174, 179), "000000");
        assert_eq!(cols(&line, 219, 220), "02");
        assert_eq!(cols(&line, 221, 234), "98765432000110");
        assert_eq!(
            cols(&line, 235, 274),
            format!("{:<40}", "Jose da Conceicao Comercio")
        );
        assert_eq!(
            cols(&line, 275, 314),
            format!("{:<40}", "Avenida Paulista, 1000 - Sao Paulo, SP")
        );
        assert_eq!(cols(&line, 315, 326), "Nao receber ");
        assert_eq!(cols(&line, 327, 334), "01310100");
        assert_eq!(cols(&line, 395, 400), "000002");
    }

    #[test]
    fn test_fine_is_encoded_when_configured() {
        let mut req = request("237");
        req.has_fine = true;
        req.fine_percentage = Some(dec!(2.5));
        let config = BilletConfiguration::create(req, "tester").unwrap();

        let line = BradescoCodec
            .detail(&config, &title(Money::brl(dec!(10)), 0), 2)
            .unwrap()
            .line();

        assert_eq!(cols(&line, 66, 66), "2");
        assert_eq!(cols(&line, 67, 70), "0250");
    }

    #[test]
    fn test_records_tile_exactly() {
        let config = configuration("237");
        let records = BradescoCodec
            .records_with_cancellation(
                &EncodeRequest {
                    configuration: &config,
                    titles: &[title(Money::brl(dec!(1)), 0), title(Money::brl(dec!(2)), 0)],
                    file_sequence: 1,
                    generated_on: generated_on(),
                },
                &AtomicBool::new(false),
            )
            .unwrap();

        assert_eq!(records.len(), 4);
        for record in &records {
            assert_fields_tile_record(record);
        }
    }

    #[test]
    fn test_long_payer_address_is_truncated_with_report() {
        let config = configuration("237");
        let mut t = title(Money::brl(dec!(1)), 0);
        t.payer.address.street = "Rua Doutor Antonio Bento de Faria Lima Junior".to_string();

        let detail = BradescoCodec.detail(&config, &t, 2).unwrap();

        assert_eq!(detail.line().len(), RECORD_WIDTH);
        let truncation = detail
            .truncations
            .iter()
            .find(|t| t.field == "payer_address")
            .expect("address truncation reported");
        assert_eq!(truncation.width, 40);
        assert!(truncation.original_len > 40);
        assert_eq!(
            detail.field("payer_address").unwrap().value,
            "Rua Doutor Antonio Bento de Faria Lima J"
        );
    }
}

mod sicoob_tests {
    use super::*;

    #[test]
    fn test_detail_embeds_our_number() {
        let config = configuration("756");
        let detail = SicoobCodec
            .detail(&config, &title(Money::brl(dec!(250.75)), 123), 2)
            .unwrap();
        let line = detail.line();

        assert_fields_tile_record(&detail);
        assert_eq!(cols(&line, 1, 3), "102");
        assert_eq!(cols(&line, 4, 17), "12345678000199");
        assert_eq!(cols(&line, 18, 21), "0000");
        assert_eq!(cols(&line, 22, 22), "1");
        assert_eq!(cols(&line, 63, 74), "000000001230");
        assert_eq!(cols(&line, 121, 126), "100325");
        assert_eq!(cols(&line, 127, 139), "0000000025075");
        assert_eq!(cols(&line, 140, 142), "756");
        assert_eq!(cols(&line, 395, 400), "000002");
    }

    #[test]
    fn test_header_names_bank() {
        let config = configuration("756");
        let header = SicoobCodec.header(&config, 3, generated_on()).unwrap();
        let line = header.line();

        assert_fields_tile_record(&header);
        assert_eq!(cols(&line, 77, 79), "756");
        assert_eq!(cols(&line, 80, 94), "BANCOOBCED     ");
        assert_eq!(cols(&line, 101, 107), "0000003");
    }

    #[test]
    fn test_configuration_at_layout_widths_prints_whole() {
        let mut req = request("756");
        req.wallet_number = "12".to_string();
        req.second_message = "M".repeat(40);
        let config = BilletConfiguration::create(req, "tester").unwrap();

        let detail = SicoobCodec
            .detail(&config, &title(Money::brl(dec!(1)), 1), 2)
            .unwrap();
        let line = detail.line();

        assert_eq!(cols(&line, 107, 108), "12");
        assert_eq!(detail.field("message").unwrap().value, "M".repeat(40));
        assert!(detail
            .truncations
            .iter()
            .all(|t| t.field != "wallet" && t.field != "message"));
    }

    #[test]
    fn test_configuration_wider_than_layout_is_rejected() {
        let mut req = request("756");
        req.wallet_number = "109".to_string();
        let err = BilletConfiguration::create(req, "tester").unwrap_err();
        assert!(matches!(err, RemittanceError::Validation { ref field, .. } if field == "wallet_number"));

        let mut req = request("756");
        req.second_message = "M".repeat(60);
        let err = BilletConfiguration::create(req, "tester").unwrap_err();
        assert!(matches!(err, RemittanceError::Validation { ref field, .. } if field == "second_message"));
    }

    #[test]
    fn test_file_has_n_plus_two_lines() {
        let config = configuration("756");
        let titles: Vec<_> = (1..=5).map(|n| title(Money::brl(dec!(10)), n)).collect();

        let file = SicoobCodec
            .encode(&EncodeRequest {
                configuration: &config,
                titles: &titles,
                file_sequence: 9,
                generated_on: generated_on(),
            })
            .unwrap();

        let lines: Vec<&str> = file.lines().collect();
        assert_eq!(file.file_name, "CBR010309.REM");
        assert_eq!(lines.len(), 7);
        assert!(lines[0].starts_with('0'));
        assert!(lines[6].starts_with('9'));
        assert!(lines[6].ends_with("000007"));
        assert!(lines.iter().all(|l| l.len() == RECORD_WIDTH && l.is_ascii()));
    }
}

mod shared_tests {
    use super::*;

    #[test]
    fn test_empty_title_list_is_rejected() {
        let config = configuration("237");
        let result = BradescoCodec.encode(&EncodeRequest {
            configuration: &config,
            titles: &[],
            file_sequence: 1,
            generated_on: generated_on(),
        });
        assert!(matches!(result, Err(RemittanceError::Validation { .. })));
    }

    #[test]
    fn test_cancelled_encoding_emits_nothing() {
        let config = configuration("237");
        let titles = vec![title(Money::brl(dec!(1)), 0)];
        let cancel = AtomicBool::new(true);

        let result = BradescoCodec.encode_with_cancellation(
            &EncodeRequest {
                configuration: &config,
                titles: &titles,
                file_sequence: 1,
                generated_on: generated_on(),
            },
            &cancel,
        );

        assert!(matches!(result, Err(RemittanceError::Cancelled)));
    }

    #[test]
    fn test_finished_file_matches_single_pass_encoding() {
        let config = configuration("756");
        let titles: Vec<_> = (1..=2).map(|n| title(Money::brl(dec!(7)), n)).collect();

        let details = SicoobCodec
            .detail_records(&config, &titles, &AtomicBool::new(false))
            .unwrap();
        let finished = SicoobCodec
            .finish_file(&config, details, 4, generated_on())
            .unwrap();
        let encoded = SicoobCodec
            .encode(&EncodeRequest {
                configuration: &config,
                titles: &titles,
                file_sequence: 4,
                generated_on: generated_on(),
            })
            .unwrap();

        assert_eq!(finished, encoded);
        assert_eq!(finished.line_count, 4);
    }

    #[test]
    fn test_sequences_increment_per_detail() {
        let config = configuration("237");
        let titles: Vec<_> = (0..3).map(|_| title(Money::brl(dec!(5)), 0)).collect();

        let file = BradescoCodec
            .encode(&EncodeRequest {
                configuration: &config,
                titles: &titles,
                file_sequence: 1,
                generated_on: generated_on(),
            })
            .unwrap();

        let sequences: Vec<&str> = file.lines().map(|l| cols(l, 395, 400)).collect();
        assert_eq!(sequences, vec!["000001", "000002", "000003", "000004", "000005"]);
    }
}
