//! Multi-tier read-through/write-through cache for banners and rendered page
//! fragments, in front of a Postgres system of record.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
