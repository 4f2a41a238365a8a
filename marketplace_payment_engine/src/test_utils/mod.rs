//! Helpers for standing up a throwaway database in tests.

mod prepare_env;

pub use prepare_env::{create_database, prepare_test_env, random_db_path, run_migrations};

use mps_common::Money;

use crate::{
    db_types::{Product, ProductVariant, Shop, StockUnitId},
    sqlite::db,
    SqliteDatabase,
};

pub async fn seed_shop(db: &SqliteDatabase, name: &str, owner_id: i64) -> Shop {
    let mut conn = db.pool().acquire().await.expect("Error acquiring connection");
    db::shops::insert_shop(name, owner_id, &mut conn).await.expect("Error seeding shop")
}

pub async fn seed_product(
    db: &SqliteDatabase,
    shop_id: i64,
    name: &str,
    price: Money,
    quantity: i64,
    discount_percent: i64,
) -> Product {
    let mut conn = db.pool().acquire().await.expect("Error acquiring connection");
    db::products::insert_product(shop_id, name, price, quantity, discount_percent, &mut conn)
        .await
        .expect("Error seeding product")
}

pub async fn seed_variant(db: &SqliteDatabase, product_id: i64, price: Money, quantity: i64) -> ProductVariant {
    let mut conn = db.pool().acquire().await.expect("Error acquiring connection");
    db::products::insert_variant(product_id, price, quantity, r#"{"size":"M"}"#, &mut conn)
        .await
        .expect("Error seeding variant")
}

pub async fn stock_on_hand(db: &SqliteDatabase, unit: StockUnitId) -> i64 {
    let mut conn = db.pool().acquire().await.expect("Error acquiring connection");
    db::products::available_quantity(unit, &mut conn).await.expect("Error reading stock level")
}
