//! Utility functions for formatting and validating display values.

pub mod format;

// Re-export commonly used functions at module level
pub use format::{
    capitalize_words, format_date, format_money, format_phone, is_valid_name, is_valid_phone,
    truncate_string,
};
