//! Product catalog

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::database::{get_json, put_json, Store, TABLE_PRODUCTS};
use crate::error::{AppError, AppResult};
use crate::model::{CreateProductRequest, Product, UpdateProductRequest};
use crate::upload::ImageStore;

fn require_text(value: &str, field: &str) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("Please provide a product {}", field)));
    }
    Ok(value.to_string())
}

fn require_price(price: f64) -> AppResult<f64> {
    if !price.is_finite() || price < 0.0 {
        return Err(AppError::Validation("Price must be a non-negative number".into()));
    }
    Ok(price)
}

pub fn product_not_found() -> AppError {
    AppError::NotFound("Product not found".into())
}

pub fn create(store: &Store, request: CreateProductRequest) -> AppResult<Product> {
    let now = Utc::now();
    let product = Product {
        id: Uuid::new_v4().to_string(),
        name: require_text(&request.name, "name")?,
        description: require_text(&request.description, "description")?,
        price: require_price(request.price)?,
        category: require_text(&request.category, "category")?,
        stock: request.stock,
        images: request.images,
        rating_average: 0.0,
        rating_count: 0,
        created_at: now,
        updated_at: now,
    };

    let write_txn = store.write()?;
    {
        let mut table = write_txn.open_table(TABLE_PRODUCTS)?;
        put_json(&mut table, &product.id, &product)?;
    }
    write_txn.commit()?;

    info!(product_id = %product.id, name = %product.name, "product created");
    Ok(product)
}

pub fn get(store: &Store, product_id: &str) -> AppResult<Product> {
    store
        .fetch(TABLE_PRODUCTS, product_id)?
        .ok_or_else(product_not_found)
}

/// All products, newest first
pub fn list(store: &Store) -> AppResult<Vec<Product>> {
    let mut products: Vec<Product> = store.fetch_all(TABLE_PRODUCTS)?;
    products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(products)
}

/// Applies the fields present in `request`; the rating aggregate is never
/// touched here
pub fn update(store: &Store, product_id: &str, request: UpdateProductRequest) -> AppResult<Product> {
    let write_txn = store.write()?;
    let product = {
        let mut table = write_txn.open_table(TABLE_PRODUCTS)?;
        let mut product: Product = get_json(&table, product_id)?.ok_or_else(product_not_found)?;

        if let Some(name) = request.name {
            product.name = require_text(&name, "name")?;
        }
        if let Some(description) = request.description {
            product.description = require_text(&description, "description")?;
        }
        if let Some(price) = request.price {
            product.price = require_price(price)?;
        }
        if let Some(category) = request.category {
            product.category = require_text(&category, "category")?;
        }
        if let Some(stock) = request.stock {
            product.stock = stock;
        }
        if let Some(images) = request.images {
            product.images = images;
        }
        product.updated_at = Utc::now();

        put_json(&mut table, &product.id, &product)?;
        product
    };
    write_txn.commit()?;

    Ok(product)
}

/// Removes the product, then deletes its stored images. Image deletion is
/// best effort: failures are logged and the product stays deleted.
pub async fn delete(store: &Store, images: &dyn ImageStore, product_id: &str) -> AppResult<Product> {
    let product = remove(store, product_id)?;

    for image in product.images.iter().filter(|image| !image.public_id.is_empty()) {
        if let Err(e) = images.delete(&image.public_id).await {
            warn!(product_id, public_id = %image.public_id, error = %e, "failed to delete product image");
        }
    }

    info!(product_id, "product deleted");
    Ok(product)
}

fn remove(store: &Store, product_id: &str) -> AppResult<Product> {
    let write_txn = store.write()?;
    let product = {
        let mut table = write_txn.open_table(TABLE_PRODUCTS)?;
        let product: Product = get_json(&table, product_id)?.ok_or_else(product_not_found)?;
        table.remove(product_id)?;
        product
    };
    write_txn.commit()?;
    Ok(product)
}
