//! CORE Redis Data Layer
//!
//! Async Redis-backed document store. Every document is a JSON payload kept
//! in the `data` field of a hash; sorted sets and sets act as indexes.

pub mod client;
pub mod queries;

pub use client::{RedisError, RedisPool, RedisResult, init_pool};
pub use queries::answers;
pub use queries::calendar;
pub use queries::conversions;
pub use queries::documents;
pub use queries::followups;
pub use queries::forms;
pub use queries::leads;
pub use queries::registrations;
pub use queries::schedules;
pub use queries::services;
pub use queries::students;
pub use queries::teammeets;
pub use queries::users;
