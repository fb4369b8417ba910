pub mod audit;
pub mod billing;
pub mod expiry;
pub mod moderation;
pub mod plans;
