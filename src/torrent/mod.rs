pub mod error;
pub mod infohash;
pub mod metadata;

pub use error::{MetainfoError, SchemaError};
pub use infohash::calculate_info_hash;
pub use metadata::{get_integer, get_text, lookup_bytestring, to_metainfo, File, FileMode, Info, MetaInfo};
