pub mod auth;
pub mod business;
pub mod category;
pub mod community;
pub mod cron;
pub mod dashboard;
pub mod image;
pub mod moderation;
pub mod payment;
pub mod plan;
pub mod product;
pub mod shared;

pub use shared::*;
