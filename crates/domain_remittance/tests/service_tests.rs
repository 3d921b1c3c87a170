//! Remittance Service Tests
//!
//! The command surface against the in-memory store: batch management,
//! deletion guards, number allocation and file generation.

use std::sync::atomic::AtomicBool;

use chrono::NaiveDate;
use core_kernel::{ClientId, InstallmentId, Money, OperationMetadata, PortError};
use domain_remittance::ports::mock::InMemoryStore;
use domain_remittance::{
    BilletQuery, ConfigurationChanges, ConfigurationPort, InstallmentData, NewBillet,
    NewBilletConfiguration, PayerAddress, PayerData, RemittanceError, RemittancePort,
    RemittancePorts, RemittanceService, ServiceSettings,
};
use domain_remittance::{Billet, BilletConfiguration};
use rust_decimal_macros::dec;

// ============================================================================
// TEST FIXTURES
// ============================================================================

fn metadata() -> OperationMetadata {
    OperationMetadata::with_correlation_id("test").initiated_by("operator")
}

fn settings() -> ServiceSettings {
    ServiceSettings {
        business_date: NaiveDate::from_ymd_opt(2025, 3, 1),
        ..Default::default()
    }
}

fn configuration_request(bank_code: &str) -> NewBilletConfiguration {
    NewBilletConfiguration {
        company_code: "4567".to_string(),
        company_name: "Acme Cobrancas".to_string(),
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
        first_message: String::new(),
        second_message: String::new(),
        starting_sequential_number: 7,
        starting_our_number: 100,
    }
}

struct Harness {
    store: InMemoryStore,
    service: RemittanceService,
}

impl Harness {
    fn new() -> Self {
        let store = InMemoryStore::new();
        let service = RemittanceService::new(RemittancePorts::in_memory(store.clone()), settings());
        Self { store, service }
    }

    async fn configuration(&self, bank_code: &str) -> BilletConfiguration {
        self.service
            .create_configuration(configuration_request(bank_code), &metadata())
            .await
            .unwrap()
    }

    /// A billet whose installment and payer are known to the store
    async fn billet(&self, configuration: &BilletConfiguration, amount: Money) -> Billet {
        let installment_id = InstallmentId::new();
        let client_id = ClientId::new();
        self.store
            .insert_installments([InstallmentData {
                installment_id,
                amount: Some(amount),
                due_date: NaiveDate::from_ymd_opt(2025, 3, 10),
                issue_date: NaiveDate::from_ymd_opt(2025, 2, 20),
            }])
            .await;
        self.store
            .insert_payers([PayerData {
                client_id,
                tax_id: "98765432000110".to_string(),
                legal_name: "Cliente Exemplo".to_string(),
                address: PayerAddress {
                    street: "Rua A".to_string(),
                    number: "1".to_string(),
                    city: "Recife".to_string(),
                    state: "PE".to_string(),
                    zip: "50000000".to_string(),
                },
            }])
            .await;

        self.service
            .create_billet(
                NewBillet {
                    installment_id,
                    configuration_id: configuration.id,
                    client_id,
                    bank: None,
                },
                &metadata(),
            )
            .await
            .unwrap()
    }
}

mod configuration_tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_configuration_is_rejected() {
        let h = Harness::new();
        let mut request = configuration_request("237");
        request.wallet_number = "12345".to_string();

        let err = h
            .service
            .create_configuration(request, &metadata())
            .await
            .unwrap_err();

        assert_eq!(err.code(), "validation_error");
    }

    #[tokio::test]
    async fn test_update_configuration_persists() {
        let h = Harness::new();
        let config = h.configuration("237").await;

        h.service
            .update_configuration(
                config.id,
                ConfigurationChanges {
                    company_name: Some("Nova Razao".to_string()),
                    ..Default::default()
                },
                &metadata(),
            )
            .await
            .unwrap();

        let stored = h.service.get_configuration(config.id, &metadata()).await.unwrap();
        assert_eq!(stored.company_name, "Nova Razao");
        assert_eq!(stored.audit.updated_by, "operator");
    }

    #[tokio::test]
    async fn test_configuration_with_billets_cannot_be_deleted() {
        let h = Harness::new();
        let config = h.configuration("237").await;
        h.billet(&config, Money::brl(dec!(10))).await;

        let err = h
            .service
            .delete_configuration(config.id, &metadata())
            .await
            .unwrap_err();

        assert!(matches!(err, RemittanceError::Validation { .. }));
    }
}

mod batch_tests {
    use super::*;

    #[tokio::test]
    async fn test_add_and_remove_billets_persist_links() {
        let h = Harness::new();
        let config = h.configuration("237").await;
        let b1 = h.billet(&config, Money::brl(dec!(10))).await;
        let b2 = h.billet(&config, Money::brl(dec!(20))).await;
        let remittance = h.service.create_remittance(&metadata()).await.unwrap();

        h.service
            .add_billets(remittance.id(), &[b1.id, b2.id], &metadata())
            .await
            .unwrap();
        h.service
            .remove_billet(remittance.id(), b1.id, &metadata())
            .await
            .unwrap();

        let stored = h.service.get_remittance(remittance.id(), &metadata()).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored.contains(b2.id));
        let unbatched = h
            .service
            .list_billets(BilletQuery { unbatched: true, ..Default::default() }, &metadata())
            .await
            .unwrap();
        assert_eq!(unbatched.iter().map(|b| b.id).collect::<Vec<_>>(), vec![b1.id]);
    }

    #[tokio::test]
    async fn test_member_order_survives_reload() {
        let h = Harness::new();
        let config = h.configuration("237").await;
        let first = h.billet(&config, Money::brl(dec!(1))).await;
        let second = h.billet(&config, Money::brl(dec!(2))).await;
        let third = h.billet(&config, Money::brl(dec!(3))).await;
        let remittance = h.service.create_remittance(&metadata()).await.unwrap();
        h.service
            .add_billets(remittance.id(), &[third.id, second.id], &metadata())
            .await
            .unwrap();
        h.service.add_billet(remittance.id(), first.id, &metadata()).await.unwrap();

        let stored = h.service.get_remittance(remittance.id(), &metadata()).await.unwrap();
        let order: Vec<_> = stored.billets().iter().map(|b| b.id).collect();
        assert_eq!(order, vec![third.id, second.id, first.id]);

        let file = h.service.generate_file(remittance.id(), &metadata()).await.unwrap();
        let amounts: Vec<&str> = file.lines().skip(1).take(3).map(|l| &l[126..139]).collect();
        assert_eq!(amounts, vec!["0000000000300", "0000000000200", "0000000000100"]);
        assert_eq!(h.service.get_billet(third.id, &metadata()).await.unwrap().our_number, 100);
        assert_eq!(h.service.get_billet(first.id, &metadata()).await.unwrap().our_number, 102);
    }

    #[tokio::test]
    async fn test_conflicting_add_leaves_store_unchanged() {
        let h = Harness::new();
        let bradesco = h.configuration("237").await;
        let sicoob = h.configuration("756").await;
        let a = h.billet(&bradesco, Money::brl(dec!(10))).await;
        let b = h.billet(&sicoob, Money::brl(dec!(10))).await;
        let remittance = h.service.create_remittance(&metadata()).await.unwrap();

        let err = h
            .service
            .add_billets(remittance.id(), &[a.id, b.id], &metadata())
            .await
            .unwrap_err();

        assert_eq!(err.code(), "batch_conflict");
        let stored = h.service.get_remittance(remittance.id(), &metadata()).await.unwrap();
        assert!(stored.is_empty());
        assert_eq!(stored.bank(), None);
        assert!(h.service.get_billet(a.id, &metadata()).await.unwrap().remittance_id.is_none());
    }

    #[tokio::test]
    async fn test_batched_billet_cannot_be_deleted() {
        let h = Harness::new();
        let config = h.configuration("237").await;
        let b = h.billet(&config, Money::brl(dec!(10))).await;
        let remittance = h.service.create_remittance(&metadata()).await.unwrap();
        h.service.add_billet(remittance.id(), b.id, &metadata()).await.unwrap();

        assert!(h.service.delete_billet(b.id, &metadata()).await.is_err());

        h.service.delete_remittance(remittance.id(), &metadata()).await.unwrap();
        h.service.delete_billet(b.id, &metadata()).await.unwrap();
    }

    #[tokio::test]
    async fn test_submitted_remittance_cannot_be_deleted() {
        let h = Harness::new();
        let config = h.configuration("237").await;
        let b = h.billet(&config, Money::brl(dec!(10))).await;
        let remittance = h.service.create_remittance(&metadata()).await.unwrap();
        h.service.add_billet(remittance.id(), b.id, &metadata()).await.unwrap();
        h.service.submit_remittance(remittance.id(), &metadata()).await.unwrap();

        let err = h
            .service
            .delete_remittance(remittance.id(), &metadata())
            .await
            .unwrap_err();

        assert_eq!(err.code(), "already_submitted");
    }
}

mod stale_write_tests {
    use super::*;

    #[tokio::test]
    async fn test_stale_remittance_cannot_clear_allocated_numbers() {
        let h = Harness::new();
        let config = h.configuration("237").await;
        let a = h.billet(&config, Money::brl(dec!(10))).await;
        let b = h.billet(&config, Money::brl(dec!(20))).await;
        let remittance = h.service.create_remittance(&metadata()).await.unwrap();
        h.service
            .add_billets(remittance.id(), &[a.id, b.id], &metadata())
            .await
            .unwrap();

        let mut stale = h.service.get_remittance(remittance.id(), &metadata()).await.unwrap();
        h.service.generate_file(remittance.id(), &metadata()).await.unwrap();

        stale.remove_billet(b.id, "operator").unwrap();
        let err = h.store.save_remittance(&stale, None).await.unwrap_err();
        assert!(matches!(err, PortError::Conflict { .. }));

        h.service.generate_file(remittance.id(), &metadata()).await.unwrap();
        let stored = h.service.get_remittance(remittance.id(), &metadata()).await.unwrap();
        let numbers: Vec<u64> = stored.billets().iter().map(|b| b.our_number).collect();
        assert_eq!(numbers, vec![100, 101]);
        let config = h.service.get_configuration(config.id, &metadata()).await.unwrap();
        assert_eq!(config.next_our_number, 102);
        assert_eq!(config.next_file_sequence, 9);
    }

    #[tokio::test]
    async fn test_billet_cannot_be_linked_to_two_remittances() {
        let h = Harness::new();
        let config = h.configuration("237").await;
        let b = h.billet(&config, Money::brl(dec!(10))).await;
        let first = h.service.create_remittance(&metadata()).await.unwrap();
        let second = h.service.create_remittance(&metadata()).await.unwrap();

        let snapshot = h.service.get_billet(b.id, &metadata()).await.unwrap();
        let mut late = h.service.get_remittance(second.id(), &metadata()).await.unwrap();
        h.service.add_billet(first.id(), b.id, &metadata()).await.unwrap();

        late.add_billet(snapshot, "operator").unwrap();
        let err = h.store.save_remittance(&late, None).await.unwrap_err();

        assert!(matches!(err, PortError::Conflict { .. }));
        let linked = h.service.get_billet(b.id, &metadata()).await.unwrap();
        assert_eq!(linked.remittance_id, Some(first.id()));
        assert!(h
            .service
            .get_remittance(second.id(), &metadata())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_stale_configuration_save_keeps_counters() {
        let h = Harness::new();
        let config = h.configuration("237").await;
        let b = h.billet(&config, Money::brl(dec!(10))).await;
        let remittance = h.service.create_remittance(&metadata()).await.unwrap();
        h.service.add_billet(remittance.id(), b.id, &metadata()).await.unwrap();

        let stale = h.service.get_configuration(config.id, &metadata()).await.unwrap();
        h.service.generate_file(remittance.id(), &metadata()).await.unwrap();
        h.store.save_configuration(&stale, None).await.unwrap();

        let stored = h.service.get_configuration(config.id, &metadata()).await.unwrap();
        assert_eq!(stored.next_file_sequence, 8);
        assert_eq!(stored.next_our_number, 101);
    }
}

mod generation_tests {
    use super::*;

    #[tokio::test]
    async fn test_generate_allocates_numbers_and_stores_file() {
        let h = Harness::new();
        let config = h.configuration("237").await;
        let b1 = h.billet(&config, Money::brl(dec!(1000.00))).await;
        let b2 = h.billet(&config, Money::brl(dec!(5.00))).await;
        let remittance = h.service.create_remittance(&metadata()).await.unwrap();
        h.service
            .add_billets(remittance.id(), &[b1.id, b2.id], &metadata())
            .await
            .unwrap();

        let file = h.service.generate_file(remittance.id(), &metadata()).await.unwrap();

        assert_eq!(file.line_count, 4);
        assert_eq!(file.file_name, "CB010307.REM");
        let header = file.lines().next().unwrap();
        assert_eq!(&header[110..117], "0000007");

        let stored = h.service.get_remittance(remittance.id(), &metadata()).await.unwrap();
        let mut numbers: Vec<u64> = stored.billets().iter().map(|b| b.our_number).collect();
        numbers.sort_unstable();
        assert_eq!(numbers, vec![100, 101]);
        assert_eq!(stored.file_name(), Some("CB010307.REM"));

        let downloaded = h.service.download_file(remittance.id(), &metadata()).await.unwrap();
        assert_eq!(downloaded.bytes, file.bytes);

        let config = h.service.get_configuration(config.id, &metadata()).await.unwrap();
        assert_eq!(config.next_our_number, 102);
        assert_eq!(config.next_file_sequence, 8);
    }

    #[tokio::test]
    async fn test_regeneration_keeps_our_numbers() {
        let h = Harness::new();
        let config = h.configuration("756").await;
        let b = h.billet(&config, Money::brl(dec!(10))).await;
        let remittance = h.service.create_remittance(&metadata()).await.unwrap();
        h.service.add_billet(remittance.id(), b.id, &metadata()).await.unwrap();

        h.service.generate_file(remittance.id(), &metadata()).await.unwrap();
        let second = h.service.generate_file(remittance.id(), &metadata()).await.unwrap();

        assert_eq!(h.service.get_billet(b.id, &metadata()).await.unwrap().our_number, 100);
        assert_eq!(second.file_name, "CBR010308.REM");
        let detail = second.lines().nth(1).unwrap();
        assert_eq!(&detail[62..74], "000000001000");
    }

    #[tokio::test]
    async fn test_missing_installment_aborts_before_allocation() {
        let h = Harness::new();
        let config = h.configuration("237").await;
        let orphan = h
            .service
            .create_billet(
                NewBillet {
                    installment_id: InstallmentId::new(),
                    configuration_id: config.id,
                    client_id: ClientId::new(),
                    bank: None,
                },
                &metadata(),
            )
            .await
            .unwrap();
        let remittance = h.service.create_remittance(&metadata()).await.unwrap();
        h.service.add_billet(remittance.id(), orphan.id, &metadata()).await.unwrap();

        let err = h
            .service
            .generate_file(remittance.id(), &metadata())
            .await
            .unwrap_err();

        assert!(matches!(err, RemittanceError::MissingData { billet_id, .. } if billet_id == orphan.id));
        assert_eq!(h.service.get_billet(orphan.id, &metadata()).await.unwrap().our_number, 0);
        let config = h.service.get_configuration(config.id, &metadata()).await.unwrap();
        assert_eq!(config.next_our_number, 100);
        assert!(h.service.download_file(remittance.id(), &metadata()).await.is_err());
    }

    #[tokio::test]
    async fn test_empty_remittance_cannot_be_generated() {
        let h = Harness::new();
        let remittance = h.service.create_remittance(&metadata()).await.unwrap();

        let err = h
            .service
            .generate_file(remittance.id(), &metadata())
            .await
            .unwrap_err();

        assert_eq!(err.code(), "empty_remittance");
    }

    #[tokio::test]
    async fn test_bank_without_layout_is_unsupported() {
        let h = Harness::new();
        let config = h.configuration("341").await;
        let b = h.billet(&config, Money::brl(dec!(10))).await;
        let remittance = h.service.create_remittance(&metadata()).await.unwrap();
        h.service.add_billet(remittance.id(), b.id, &metadata()).await.unwrap();

        let err = h
            .service
            .generate_file(remittance.id(), &metadata())
            .await
            .unwrap_err();

        assert_eq!(err.code(), "unsupported_bank");
    }

    #[tokio::test]
    async fn test_cancelled_generation_stores_no_file() {
        let h = Harness::new();
        let config = h.configuration("237").await;
        let b = h.billet(&config, Money::brl(dec!(10))).await;
        let remittance = h.service.create_remittance(&metadata()).await.unwrap();
        h.service.add_billet(remittance.id(), b.id, &metadata()).await.unwrap();

        let err = h
            .service
            .generate_file_with_cancellation(remittance.id(), &AtomicBool::new(true), &metadata())
            .await
            .unwrap_err();

        assert!(matches!(err, RemittanceError::Cancelled));
        assert!(h.service.download_file(remittance.id(), &metadata()).await.is_err());
    }

    #[tokio::test]
    async fn test_cancelled_generation_keeps_file_sequence() {
        let h = Harness::new();
        let config = h.configuration("237").await;
        let b = h.billet(&config, Money::brl(dec!(10))).await;
        let remittance = h.service.create_remittance(&metadata()).await.unwrap();
        h.service.add_billet(remittance.id(), b.id, &metadata()).await.unwrap();

        h.service
            .generate_file_with_cancellation(remittance.id(), &AtomicBool::new(true), &metadata())
            .await
            .unwrap_err();
        let stored = h.service.get_configuration(config.id, &metadata()).await.unwrap();
        assert_eq!(stored.next_file_sequence, 7);
        assert_eq!(stored.next_our_number, 101);

        let file = h.service.generate_file(remittance.id(), &metadata()).await.unwrap();
        assert_eq!(file.file_name, "CB010307.REM");
        assert_eq!(h.service.get_billet(b.id, &metadata()).await.unwrap().our_number, 100);
    }

    #[tokio::test]
    async fn test_health_reports_every_port() {
        let h = Harness::new();
        let results = h.service.health().await;
        assert_eq!(results.len(), 6);
        assert!(results
            .iter()
            .all(|r| r.status == core_kernel::AdapterHealth::Healthy));
    }
}
