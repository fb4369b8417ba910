pub mod admin;
pub mod auth;
pub mod business;
pub mod category;
pub mod community;
pub mod cron;
pub mod image;
pub mod payment;
pub mod plan;
pub mod product;
