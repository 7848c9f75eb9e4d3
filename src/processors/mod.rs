//! Document processors

pub mod markdown;
