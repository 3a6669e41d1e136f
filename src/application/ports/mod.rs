pub mod billing_provider;
pub mod content_ai;
