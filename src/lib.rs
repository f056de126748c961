//! Bolingo onboarding — embedded wizard controller core.

pub mod config;
pub mod error;
pub mod onboarding;
