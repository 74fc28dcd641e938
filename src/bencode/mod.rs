//! Bencode values and their decoder/encoder.
//!
//! | Type | Format | Example |
//! |------|--------|---------|
//! | Integer | `i<number>e` | `i42e` → 42 |
//! | Byte String | `<length>:<data>` | `4:spam` → "spam" |
//! | List | `l<items>e` | `l4:spami42ee` → ["spam", 42] |
//! | Dictionary | `d<key><value>...e` | `d3:foo3:bare` → {"foo": "bar"} |

pub mod bvalue;
pub mod decode;
pub mod encode;
pub mod error;

pub use bvalue::{BValue, Dict};   // re-export
pub use decode::{
	decode_bencode, decode_bencode_bytes, decode_bencode_prefix, decode_bencode_prefix_with,
	decode_bencode_with,
	DecodeOptions, DEFAULT_MAX_DEPTH,
};   // re-export
pub use encode::{encode_bvalue, encode_bvalue_into};   // re-export
pub use error::BencodeError;
