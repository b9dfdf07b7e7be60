//! Swift2Me — signup/onboarding service for the delivery client.

pub mod auth;
pub mod config;
pub mod error;
pub mod onboarding;
pub mod store;
