//! fasih-core
//!
//! Data model, corpus loading, Arabic normalization, configuration and the
//! traits the text, vector and hybrid crates plug into.

#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod config;
pub mod corpus;
pub mod error;
pub mod normalize;
pub mod traits;
pub mod types;

pub use corpus::Corpus;
pub use error::Error;
