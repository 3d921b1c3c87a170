//! Unit tests for the Identifiers module

use core_kernel::{BilletId, ClientId, ConfigurationId, InstallmentId, RemittanceId};
use uuid::Uuid;

#[test]
fn test_new_generates_unique_ids() {
    assert_ne!(BilletId::new(), BilletId::new());
}

#[test]
fn test_new_v7_generates_time_ordered_ids() {
    let id1 = RemittanceId::new_v7();
    std::thread::sleep(std::time::Duration::from_millis(2));
    let id2 = RemittanceId::new_v7();
    assert!(id1 < id2);
}

#[test]
fn test_prefixes() {
    assert_eq!(ConfigurationId::prefix(), "CFG");
    assert_eq!(BilletId::prefix(), "BLT");
    assert_eq!(RemittanceId::prefix(), "REM");
    assert_eq!(InstallmentId::prefix(), "INS");
    assert_eq!(ClientId::prefix(), "CLI");
}

#[test]
fn test_from_uuid_round_trip() {
    let uuid = Uuid::new_v4();
    let id = ClientId::from_uuid(uuid);
    assert_eq!(*id.as_uuid(), uuid);
    assert_eq!(Uuid::from(id), uuid);
}

#[test]
fn test_parse_rejects_garbage() {
    assert!("BLT-not-a-uuid".parse::<BilletId>().is_err());
}

#[test]
fn test_serde_is_transparent() {
    let id = InstallmentId::new();
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{}\"", id.as_uuid()));
}
