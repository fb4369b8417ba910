pub mod answer;
pub mod audit_log;
pub mod banned_business;
pub mod banned_user;
pub mod business;
pub mod category;
pub mod current_plan;
pub mod image;
pub mod payment;
pub mod plan;
pub mod post;
pub mod product;
pub mod review;
pub mod role;
pub mod role_permission;
pub mod trial;
pub mod user;
