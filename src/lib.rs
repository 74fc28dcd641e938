// lib.rs - Library interface for the metainfo codec

pub mod bencode;
pub mod config;
pub mod torrent;

// Re-export commonly used types for easier testing
pub use bencode::{decode_bencode, encode_bvalue, BValue, BencodeError, DecodeOptions, Dict};
pub use config::Config;
pub use torrent::{to_metainfo, File, FileMode, Info, MetaInfo, MetainfoError, SchemaError};
