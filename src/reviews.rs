//! Product reviews and the rating aggregate they feed
//!
//! A product's `ratingAverage` / `ratingCount` are recomputed from scratch by
//! [`recompute_rating`], which the create and delete paths call right after
//! their write commits.

use std::collections::HashMap;

use chrono::Utc;
use redb::ReadableTable;
use tracing::{debug, info};
use uuid::Uuid;

use crate::catalog::product_not_found;
use crate::database::{
    get_json, index_key, index_values, put_json, Store, TABLE_PRODUCTS, TABLE_PRODUCT_REVIEWS,
    TABLE_REVIEWS, TABLE_USERS, TABLE_USER_REVIEWS,
};
use crate::error::{AppError, AppResult};
use crate::model::{CreateReviewRequest, Product, Review, ReviewView, UserRecord};
use crate::orders;

/// Mean rounded to one decimal place, 0 for no ratings
pub fn average_rating(ratings: &[u8]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let sum: u32 = ratings.iter().map(|&rating| u32::from(rating)).sum();
    let mean = f64::from(sum) / ratings.len() as f64;
    (mean * 10.0).round() / 10.0
}

fn user_review_key(user_id: &str, product_id: &str) -> String {
    format!("{}:{}", user_id, product_id)
}

/// Ratings of every review currently stored for the product
fn product_ratings(store: &Store, product_id: &str) -> AppResult<Vec<u8>> {
    let read_txn = store.read()?;
    let index = read_txn.open_table(TABLE_PRODUCT_REVIEWS)?;
    let reviews = read_txn.open_table(TABLE_REVIEWS)?;

    let mut ratings = Vec::new();
    for review_id in index_values(&index, product_id)? {
        if let Some(review) = get_json::<Review, _>(&reviews, &review_id)? {
            ratings.push(review.rating);
        }
    }
    Ok(ratings)
}

/// Rewrites the product's rating aggregate from its current reviews
///
/// Not synchronized with concurrent review writes; the last recompute wins.
/// A product that no longer exists is skipped.
pub fn recompute_rating(store: &Store, product_id: &str) -> AppResult<()> {
    let ratings = product_ratings(store, product_id)?;

    let write_txn = store.write()?;
    {
        let mut products = write_txn.open_table(TABLE_PRODUCTS)?;
        let Some(mut product) = get_json::<Product, _>(&products, product_id)? else {
            debug!(product_id, "rating recompute for missing product skipped");
            return Ok(());
        };
        product.rating_count = ratings.len() as u32;
        product.rating_average = average_rating(&ratings);
        put_json(&mut products, product_id, &product)?;
    }
    write_txn.commit()?;

    debug!(product_id, count = ratings.len(), "rating aggregate recomputed");
    Ok(())
}

/// Records a review by `user`, then refreshes the product's rating
///
/// Requires a delivered order containing the product and no earlier review by
/// the same user.
pub fn create(store: &Store, user: &UserRecord, request: CreateReviewRequest) -> AppResult<Review> {
    if !(1..=5).contains(&request.rating) {
        return Err(AppError::Validation("Rating must be between 1 and 5".into()));
    }
    let comment = request.comment.trim();
    if comment.is_empty() {
        return Err(AppError::Validation("Please provide a comment".into()));
    }

    let product_id = request.product_id.trim();
    if store.fetch::<Product>(TABLE_PRODUCTS, product_id)?.is_none() {
        return Err(product_not_found());
    }

    if !orders::has_delivered(store, &user.id, product_id)? {
        return Err(AppError::Forbidden(
            "You can only review products that have been delivered to you.".into(),
        ));
    }

    let review = Review {
        id: Uuid::new_v4().to_string(),
        user: user.id.clone(),
        product: product_id.to_string(),
        rating: request.rating,
        comment: comment.to_string(),
        created_at: Utc::now(),
    };

    let write_txn = store.write()?;
    {
        let mut by_user = write_txn.open_table(TABLE_USER_REVIEWS)?;
        let owner_key = user_review_key(&user.id, product_id);
        if by_user.get(owner_key.as_str())?.is_some() {
            return Err(AppError::Validation("Product already reviewed".into()));
        }
        by_user.insert(owner_key.as_str(), review.id.as_str())?;

        let mut by_product = write_txn.open_table(TABLE_PRODUCT_REVIEWS)?;
        let key = index_key(product_id, review.created_at.timestamp_micros(), &review.id);
        by_product.insert(key.as_str(), review.id.as_str())?;

        let mut reviews = write_txn.open_table(TABLE_REVIEWS)?;
        put_json(&mut reviews, &review.id, &review)?;
    }
    write_txn.commit()?;
    info!(review_id = %review.id, product_id, "review added");

    recompute_rating(store, product_id)?;
    Ok(review)
}

/// Removes a review and its index entries, then refreshes the product's rating
pub fn delete(store: &Store, review_id: &str) -> AppResult<Review> {
    let write_txn = store.write()?;
    let review = {
        let mut reviews = write_txn.open_table(TABLE_REVIEWS)?;
        let review: Review = get_json(&reviews, review_id)?
            .ok_or_else(|| AppError::NotFound("Review not found".into()))?;
        reviews.remove(review_id)?;

        let mut by_product = write_txn.open_table(TABLE_PRODUCT_REVIEWS)?;
        let key = index_key(&review.product, review.created_at.timestamp_micros(), &review.id);
        by_product.remove(key.as_str())?;

        let mut by_user = write_txn.open_table(TABLE_USER_REVIEWS)?;
        by_user.remove(user_review_key(&review.user, &review.product).as_str())?;
        review
    };
    write_txn.commit()?;
    info!(review_id, product_id = %review.product, "review removed");

    recompute_rating(store, &review.product)?;
    Ok(review)
}

fn user_names(store: &Store) -> AppResult<HashMap<String, String>> {
    Ok(store
        .fetch_all::<UserRecord>(TABLE_USERS)?
        .into_iter()
        .map(|user| (user.id, user.name))
        .collect())
}

/// Reviews of one product with their authors' names, newest first
pub fn list_for_product(store: &Store, product_id: &str) -> AppResult<Vec<ReviewView>> {
    let read_txn = store.read()?;
    let index = read_txn.open_table(TABLE_PRODUCT_REVIEWS)?;
    let reviews = read_txn.open_table(TABLE_REVIEWS)?;
    let users = read_txn.open_table(TABLE_USERS)?;

    let mut result = Vec::new();
    for review_id in index_values(&index, product_id)?.iter().rev() {
        let Some(review) = get_json::<Review, _>(&reviews, review_id)? else {
            continue;
        };
        let user_name = get_json::<UserRecord, _>(&users, &review.user)?.map(|user| user.name);
        result.push(ReviewView {
            review,
            user_name,
            product_name: None,
        });
    }
    Ok(result)
}

/// Every review with author and product names, newest first
pub fn list_all(store: &Store) -> AppResult<Vec<ReviewView>> {
    let mut reviews: Vec<Review> = store.fetch_all(TABLE_REVIEWS)?;
    reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let users = user_names(store)?;
    let products: HashMap<String, String> = store
        .fetch_all::<Product>(TABLE_PRODUCTS)?
        .into_iter()
        .map(|product| (product.id, product.name))
        .collect();

    Ok(reviews
        .into_iter()
        .map(|review| ReviewView {
            user_name: users.get(&review.user).cloned(),
            product_name: products.get(&review.product).cloned(),
            review,
        })
        .collect())
}
