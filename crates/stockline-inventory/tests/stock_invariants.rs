//! Property tests for the never-oversell guarantee of the decrement path.

use std::sync::Arc;

use chrono::Utc;
use proptest::prelude::*;
use stockline_cache::TtlProductCache;
use stockline_core::error::InventoryError;
use stockline_core::product::Product;
use stockline_inventory::application::command_handlers::handle_decrement_stock;
use stockline_inventory::application::{InventoryContext, InventorySettings};
use stockline_inventory::domain::commands::DecrementStock;
use stockline_test_support::{InMemoryEventChannel, InMemoryProductStore};
use uuid::Uuid;

/// Property: however concurrent decrements interleave, the units handed out
/// never exceed the starting stock and the store ends at exactly the
/// remainder.
#[test]
fn prop_concurrent_decrements_never_oversell() {
    proptest!(ProptestConfig::with_cases(64), |(
        initial in 0i64..40,
        amounts in prop::collection::vec(1i64..8, 1..24)
    )| {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let store = Arc::new(InMemoryProductStore::new());
            let product = Product {
                id: Uuid::new_v4(),
                name: "Keyboard".into(),
                price: 100_000.0,
                qty: initial,
                created_at: Utc::now(),
            };
            store.seed(product.clone());
            let ctx = InventoryContext::new(
                store.clone(),
                Arc::new(TtlProductCache::new()),
                Arc::new(InMemoryEventChannel::new()),
                InventorySettings::default(),
            );

            let mut handles = Vec::new();
            for amount in amounts {
                let ctx = ctx.clone();
                let command = DecrementStock {
                    correlation_id: Uuid::new_v4(),
                    product_id: product.id,
                    quantity: amount,
                };
                handles.push(tokio::spawn(async move {
                    handle_decrement_stock(&command, &ctx).await.map(|_| amount)
                }));
            }

            let mut handed_out = 0;
            for handle in handles {
                match handle.await.unwrap() {
                    Ok(amount) => handed_out += amount,
                    Err(InventoryError::InsufficientStock { .. }) => {}
                    Err(other) => panic!("unexpected error: {other:?}"),
                }
            }

            prop_assert!(handed_out <= initial);
            prop_assert_eq!(store.qty_of(product.id), Some(initial - handed_out));
            Ok(())
        })?;
    });
}

/// Property: a sequential run applies exactly the decrements a running
/// balance allows.
#[test]
fn prop_sequential_decrements_follow_running_balance() {
    proptest!(|(
        initial in 0i64..30,
        amounts in prop::collection::vec(1i64..10, 1..16)
    )| {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let store = Arc::new(InMemoryProductStore::new());
            let product = Product {
                id: Uuid::new_v4(),
                name: "Keyboard".into(),
                price: 100_000.0,
                qty: initial,
                created_at: Utc::now(),
            };
            store.seed(product.clone());
            let ctx = InventoryContext::new(
                store.clone(),
                Arc::new(TtlProductCache::new()),
                Arc::new(InMemoryEventChannel::new()),
                InventorySettings::default(),
            );

            let mut balance = initial;
            for amount in amounts {
                let command = DecrementStock {
                    correlation_id: Uuid::new_v4(),
                    product_id: product.id,
                    quantity: amount,
                };
                let result = handle_decrement_stock(&command, &ctx).await;
                if amount <= balance {
                    balance -= amount;
                    prop_assert_eq!(result.map(|p| p.qty), Ok(balance));
                } else {
                    let rejected = matches!(
                        result,
                        Err(InventoryError::InsufficientStock { available, .. }) if available == balance
                    );
                    prop_assert!(rejected);
                }
            }

            prop_assert_eq!(store.qty_of(product.id), Some(balance));
            Ok(())
        })?;
    });
}
