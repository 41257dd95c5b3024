//! Benchmark tests for critical operations
//!
//! Run with: cargo test bench --release -- --ignored --nocapture

use std::time::Instant;

use chrono::Utc;
use tempfile::NamedTempFile;
use uuid::Uuid;

use storefront::database::{
    index_key, put_json, Store, TABLE_ORDERS, TABLE_PRODUCT_REVIEWS, TABLE_REVIEWS,
    TABLE_USER_ORDERS,
};
use storefront::model::{
    CreateProductRequest, Order, OrderItem, OrderStatus, PaymentStatus, Review,
};
use storefront::{catalog, orders, reviews};

/// Benchmark helper to measure execution time
fn benchmark<F>(name: &str, iterations: usize, mut f: F)
where
    F: FnMut(),
{
    let start = Instant::now();

    for _ in 0..iterations {
        f();
    }

    let duration = start.elapsed();
    let avg_ms = duration.as_millis() as f64 / iterations as f64;
    let ops_per_sec = (iterations as f64 / duration.as_secs_f64()) as u64;

    println!("  {} ({} iterations)", name, iterations);
    println!("    Total time: {:?}", duration);
    println!("    Avg time: {:.3}ms", avg_ms);
    println!("    Throughput: {} ops/sec\n", ops_per_sec);
}

fn bench_store() -> (Store, NamedTempFile) {
    let temp_db = NamedTempFile::new().unwrap();
    let store = Store::open(temp_db.path().to_str().unwrap()).unwrap();
    (store, temp_db)
}

fn seed_orders(store: &Store, user_id: &str, count: usize) {
    let write_txn = store.write().unwrap();
    {
        let mut orders = write_txn.open_table(TABLE_ORDERS).unwrap();
        let mut index = write_txn.open_table(TABLE_USER_ORDERS).unwrap();
        for i in 0..count {
            let now = Utc::now();
            let order = Order {
                id: Uuid::new_v4().to_string(),
                user: user_id.to_string(),
                items: vec![OrderItem { product: format!("p-{}", i), quantity: 1, price: 100.0 }],
                total_amount: 100.0,
                payment_status: PaymentStatus::Paid,
                order_status: OrderStatus::PendingDelivery,
                transaction_ref: format!("TX-{}", i),
                delivery_notes: None,
                created_at: now,
                updated_at: now,
            };
            let key = index_key(user_id, now.timestamp_micros(), &order.id);
            index.insert(key.as_str(), order.id.as_str()).unwrap();
            put_json(&mut orders, &order.id, &order).unwrap();
        }
    }
    write_txn.commit().unwrap();
}

#[test]
#[ignore] // Run explicitly with: cargo test bench --release -- --ignored --nocapture
fn bench_list_user_orders() {
    println!("\n=== Benchmark: List User Orders ===\n");

    let (store, _temp_db) = bench_store();
    seed_orders(&store, "bench_user", 500);

    benchmark("List 500 orders", 200, || {
        let list = orders::list_for_user(&store, "bench_user").unwrap();
        assert_eq!(list.len(), 500);
    });

    benchmark("Delivered lookup over 500 orders", 200, || {
        let _ = orders::has_delivered(&store, "bench_user", "p-499").unwrap();
    });
}

#[test]
#[ignore]
fn bench_rating_recompute() {
    println!("\n=== Benchmark: Rating Recompute ===\n");

    let (store, _temp_db) = bench_store();
    let product = catalog::create(
        &store,
        CreateProductRequest {
            name: "Bench Mist".to_string(),
            description: "Benchmark product".to_string(),
            price: 1000.0,
            category: "Fragrance".to_string(),
            stock: 10,
            images: Vec::new(),
        },
    )
    .unwrap();

    let write_txn = store.write().unwrap();
    {
        let mut table = write_txn.open_table(TABLE_REVIEWS).unwrap();
        let mut index = write_txn.open_table(TABLE_PRODUCT_REVIEWS).unwrap();
        for i in 0..1000u32 {
            let review = Review {
                id: Uuid::new_v4().to_string(),
                user: format!("user-{}", i),
                product: product.id.clone(),
                rating: (i % 5 + 1) as u8,
                comment: "Benchmark review".to_string(),
                created_at: Utc::now(),
            };
            let key = index_key(&product.id, review.created_at.timestamp_micros(), &review.id);
            index.insert(key.as_str(), review.id.as_str()).unwrap();
            put_json(&mut table, &review.id, &review).unwrap();
        }
    }
    write_txn.commit().unwrap();

    benchmark("Recompute over 1000 reviews", 100, || {
        reviews::recompute_rating(&store, &product.id).unwrap();
    });

    let stored = catalog::get(&store, &product.id).unwrap();
    assert_eq!(stored.rating_count, 1000);
    assert_eq!(stored.rating_average, 3.0);
}
