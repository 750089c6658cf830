//! Core data structures for detrend
//!
//! This crate provides the tabular layer the model fitting builds on:
//! typed columns with explicit missing values, grouping and per-group
//! summaries, and R-style model formulas that turn a table into a
//! response vector and design matrix.

pub mod data;
pub mod formula;
