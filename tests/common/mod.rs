//! Common test utilities for gcmtools.
//!
//! Synthetic datasets, raw MITgcm fixtures and assertion helpers shared by
//! the integration tests.

#![allow(dead_code)]

pub mod assertions;
pub mod image_utils;
pub mod test_data;
