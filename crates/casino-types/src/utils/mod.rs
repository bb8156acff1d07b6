//! Formatting and parsing helpers shared by the client crates.

pub mod formatting;
pub mod helpers;

pub use formatting::{
	format_native_amount, parse_native_amount, short_address, truncate_id, with_0x_prefix,
	without_0x_prefix,
};
pub use helpers::current_timestamp;
