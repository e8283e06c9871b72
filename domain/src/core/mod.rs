//! Core domain concepts shared across all subdomains.
//!
//! - [`error::DomainError`] - domain-level errors
//! - [`sections`] - tolerant `LABEL: value` response parsing
//! - [`string`] - name normalization, similarity and truncation helpers

pub mod error;
pub mod sections;
pub mod string;
