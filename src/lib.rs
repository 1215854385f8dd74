//! PromSQL - PromQL to ClickHouse SQL translation
//!
//! This crate lowers an already parsed PromQL expression tree into a single
//! SQL statement over a time series table, evaluated at one instant or over
//! a range of evenly spaced steps.

pub mod batch;
pub mod config;
pub mod converter;
pub mod metrics;
pub mod promql;
pub mod sql;
