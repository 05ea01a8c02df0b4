mod common;

use currency_monitor::models::rate::{BEST_RATE_SOURCE, Currency, RateObservation, ToleranceBand};
use currency_monitor::services::comparison::compare;
use currency_monitor::services::rate_store::StoreError;
use currency_monitor::services::report::ReportFormatter;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::common::{connect_test_store, run_ts, setup_test_store};

fn observation(
    source: &str,
    currency: Currency,
    hour: u32,
    buy: Decimal,
    sell: Decimal,
) -> RateObservation {
    RateObservation {
        timestamp: run_ts(hour),
        currency,
        source_name: source.to_string(),
        buy_rate: buy,
        sell_rate: sell,
    }
}

#[tokio::test]
async fn test_initialize_is_idempotent() {
    let (_dir, store) = setup_test_store().await;

    store.initialize().await.expect("second initialize should succeed");
    assert_eq!(store.schema_version().await.unwrap().as_deref(), Some("1.0"));
}

#[tokio::test]
async fn test_append_and_load_round_trip() {
    let (_dir, store) = setup_test_store().await;

    let batch = vec![
        observation(BEST_RATE_SOURCE, Currency::Usd, 9, dec!(3.21), dec!(3.25)),
        observation("БелВЭБ", Currency::Usd, 9, dec!(3.2), dec!(3.27)),
        observation("БелВЭБ", Currency::Rub100, 9, dec!(3.5412), dec!(3.6123)),
    ];

    assert_eq!(store.append(&batch).await.unwrap(), 3);

    let loaded = store.load_all().await.unwrap();
    assert_eq!(loaded.len(), 3);

    let rub = loaded
        .iter()
        .find(|o| o.currency == Currency::Rub100)
        .unwrap();
    assert_eq!(rub.source_name, "БелВЭБ");
    assert_eq!(rub.timestamp, run_ts(9));
    assert_eq!(rub.buy_rate, dec!(3.5412));
    assert_eq!(rub.sell_rate, dec!(3.6123));
}

#[tokio::test]
async fn test_invalid_rows_are_skipped() {
    let (_dir, store) = setup_test_store().await;

    let batch = vec![
        observation("Bank A", Currency::Eur, 9, dec!(3.5), dec!(3.6)),
        observation("Bank A", Currency::Usd, 9, dec!(0), dec!(3.2)),
        observation("", Currency::Usd, 9, dec!(3.1), dec!(3.2)),
    ];

    assert_eq!(store.append(&batch).await.unwrap(), 1);
    assert_eq!(store.load_all().await.unwrap().len(), 1);
    assert_eq!(store.append(&batch[1..]).await.unwrap(), 0);
}

#[tokio::test]
async fn test_history_is_append_only_and_newest_first() {
    let (_dir, store) = setup_test_store().await;

    store
        .append(&[observation("Bank A", Currency::Usd, 9, dec!(3.1), dec!(3.2))])
        .await
        .unwrap();
    store
        .append(&[
            observation("Bank A", Currency::Usd, 10, dec!(3.11), dec!(3.21)),
            observation("Bank A", Currency::Eur, 10, dec!(3.51), dec!(3.61)),
        ])
        .await
        .unwrap();
    // Same observation again is a new row, not an update
    store
        .append(&[observation("Bank A", Currency::Usd, 9, dec!(3.1), dec!(3.2))])
        .await
        .unwrap();

    let loaded = store.load_all().await.unwrap();
    let keys: Vec<(u32, Currency)> = loaded
        .iter()
        .map(|o| (chrono::Timelike::hour(&o.timestamp), o.currency))
        .collect();

    assert_eq!(
        keys,
        vec![
            (10, Currency::Eur),
            (10, Currency::Usd),
            (9, Currency::Usd),
            (9, Currency::Usd),
        ]
    );
}

#[tokio::test]
async fn test_sub_tolerance_digits_survive_storage() {
    let (_dir, store) = setup_test_store().await;

    store
        .append(&[
            observation(BEST_RATE_SOURCE, Currency::Usd, 9, dec!(3.10), dec!(3.15)),
            observation("Bank A", Currency::Usd, 9, dec!(3.11), dec!(3.1650001)),
        ])
        .await
        .unwrap();

    let loaded = store.load_all().await.unwrap();
    let bank = loaded.iter().find(|o| !o.is_best()).unwrap();
    assert_eq!(bank.sell_rate, dec!(3.1650001));

    let rows = compare(&loaded);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].sell_deviation, dec!(0.0150001));
    assert_eq!(
        ReportFormatter::default().band(rows[0].sell_deviation),
        ToleranceBand::ExceedsTolerance
    );
}

#[tokio::test]
async fn test_append_without_schema_fails() {
    let (_dir, store) = connect_test_store().await;

    let result = store
        .append(&[observation("Bank A", Currency::Usd, 9, dec!(3.1), dec!(3.2))])
        .await;

    assert!(matches!(
        result,
        Err(StoreError::Unavailable { operation: "append", attempts: 3, .. })
    ));
}
