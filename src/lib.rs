//! Storefront backend: catalog, checkout with a mobile-money provider, order
//! tracking, reviews and an admin back-office, served as a JSON REST API.

pub mod accounts;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod database;
pub mod error;
pub mod handler;
pub mod model;
pub mod orders;
pub mod payment;
pub mod reviews;
pub mod route;
pub mod state;
pub mod upload;
