#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Tolerant field extraction from scraped booking pages.
//!
//! Every helper here is total: malformed input yields an empty value or
//! `None`, never a panic or an error. County-specific regex tables live in
//! the normalizer and call into these shared primitives.

pub mod address;
pub mod date;
pub mod money;
pub mod name;
pub mod text;

pub use address::parse_address;
pub use date::{age_on, normalize_date, parse_date, split_date_time};
pub use money::parse_money;
pub use name::{NameParts, decompose_name};
pub use text::{
    all_captures, collapse_whitespace, first_match, first_match_any, hidden_field, labeled_cell,
    strip_tags, title_case,
};
