use chrono::NaiveDate;
use fridge_core::inventory::{days_left, ConsumeOutcome, Inventory, InventoryError};
use fridge_core::models::ExpirySource;
use fridge_core::resolver::{ExpiryResolver, ResolveError};
use providers::TextRecognizer;
use std::path::Path;
use std::sync::Arc;
use storage::models::ItemStatus;

struct Receipt(&'static str);

#[async_trait::async_trait]
impl TextRecognizer for Receipt {
    async fn recognize(&self, _image: &Path) -> Option<String> {
        Some(self.0.to_string())
    }
}

async fn inventory(db: &str, text: &'static str) -> Inventory {
    let pool = storage::connect(db).await.unwrap();
    storage::migrate(&pool).await.unwrap();
    let resolver = ExpiryResolver::new(Arc::new(Receipt(text))).with_current_year(2025);
    Inventory::new(pool, Arc::new(resolver))
}

#[tokio::test]
async fn register_list_and_consume() {
    let inv = inventory(
        "sqlite://file:inventory_flow?mode=memory&cache=shared",
        "prod 01.03.24 exp 15.09.24",
    )
    .await;
    let dir = tempfile::tempdir().unwrap();
    let photo = dir.path().join("yogurt.jpg");
    std::fs::write(&photo, b"jpeg").unwrap();

    let manual = inv
        .register("milk", "anna", Some("2025-07-05"), Some(&photo))
        .await
        .unwrap();
    assert_eq!(manual.expiry.source, ExpirySource::Manual);
    assert_eq!(manual.item.expiry_date, NaiveDate::from_ymd_opt(2025, 7, 5));

    let scanned = inv.register("yogurt", "anna", None, Some(&photo)).await.unwrap();
    assert_eq!(scanned.expiry.source, ExpirySource::Recognized);
    assert_eq!(scanned.item.expiry_date, NaiveDate::from_ymd_opt(2024, 9, 15));
    assert_eq!(scanned.item.status, ItemStatus::Active);

    let active = inv.list_active(Some("anna")).await.unwrap();
    assert_eq!(active.len(), 2);
    assert_eq!(active[0].name, "yogurt");

    let today = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
    assert_eq!(days_left(&active[1], today), Some(4));
    assert!(days_left(&active[0], today).unwrap() < 0);

    assert_eq!(inv.consume(scanned.item.id).await.unwrap(), ConsumeOutcome::Consumed);
    assert_eq!(inv.consume(424242).await.unwrap(), ConsumeOutcome::NotFound);
    assert_eq!(inv.list_active(None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn undated_photo_still_registers() {
    let inv = inventory(
        "sqlite://file:inventory_undated?mode=memory&cache=shared",
        "lot A1234 no date info",
    )
    .await;
    let dir = tempfile::tempdir().unwrap();
    let photo = dir.path().join("jam.jpg");
    std::fs::write(&photo, b"jpeg").unwrap();

    let reg = inv.register("jam", "bohdan", None, Some(&photo)).await.unwrap();
    assert_eq!(reg.expiry.source, ExpirySource::Unresolved);
    assert_eq!(reg.item.expiry_date, None);
    assert_eq!(inv.list_active(None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn rejected_input_writes_nothing() {
    let inv = inventory(
        "sqlite://file:inventory_rejected?mode=memory&cache=shared",
        "exp 15.09.24",
    )
    .await;

    let err = inv.register("milk", "anna", Some("05/07/2025"), None).await.unwrap_err();
    assert!(matches!(
        err,
        InventoryError::Resolve(ResolveError::InvalidManualDate(_))
    ));
    let err = inv.register("milk", "anna", None, None).await.unwrap_err();
    assert!(matches!(err, InventoryError::Resolve(ResolveError::MissingInput)));

    assert!(inv.list_active(None).await.unwrap().is_empty());
}
