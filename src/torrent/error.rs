use thiserror::Error;

use crate::bencode::BencodeError;

/// Failures while projecting a decoded value onto the metainfo schema.
///
/// Each variant carries the dotted path of the offending field, e.g.
/// `info.files[2].path[0]`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
	#[error("Root of .torrent must be a dictionary")]
	NotADictionary,

	#[error("Missing or invalid field '{0}'")]
	MissingOrInvalidField(String),

	#[error("'{0}' must hold exactly one of 'length' or 'files'")]
	AmbiguousOrMissingMode(String),

	#[error("Unsafe path component at '{0}'")]
	InvalidPathComponent(String),

	#[error("'{0}' value not valid UTF-8")]
	TextDecodingFailed(String),
}

impl SchemaError {
	/// Field path the error refers to; the root for `NotADictionary`.
	pub fn path(&self) -> &str {
		match self {
			SchemaError::NotADictionary => "",
			SchemaError::MissingOrInvalidField(path)
			| SchemaError::AmbiguousOrMissingMode(path)
			| SchemaError::InvalidPathComponent(path)
			| SchemaError::TextDecodingFailed(path) => path,
		}
	}
}

/// Everything that can go wrong turning raw torrent bytes into a `MetaInfo`.
#[derive(Debug, Error)]
pub enum MetainfoError {
	#[error("I/O error while reading torrent: {0}")]
	Io(#[from] std::io::Error),

	#[error("Torrent is {size} bytes, larger than the {limit} byte limit")]
	InputTooLarge { size: u64, limit: usize },

	#[error("Bencode error: {0}")]
	Decode(#[from] BencodeError),

	#[error("Schema error: {0}")]
	Schema(#[from] SchemaError),
}
