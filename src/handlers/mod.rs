//! HTTP handlers for admin views and reports.

pub mod admin;
pub mod reports;
