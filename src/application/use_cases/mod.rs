pub mod content;
pub mod entitlement;
pub mod lifecycle;
pub mod plan_catalog;
pub mod user;
