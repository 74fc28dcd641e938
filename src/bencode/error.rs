use thiserror::Error;

/// Grammar-level failures. Every variant names the byte offset where the
/// problem was detected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BencodeError {
	#[error("Unexpected end of input at byte {offset}")]
	UnexpectedEnd { offset: usize },

	#[error("Invalid leading byte 0x{byte:02x} at byte {offset}")]
	InvalidLeadingByte { byte: u8, offset: usize },

	#[error("Malformed integer at byte {offset}: {reason}")]
	MalformedInteger { offset: usize, reason: &'static str },

	#[error("Malformed string length at byte {offset}: {reason}")]
	MalformedLength { offset: usize, reason: &'static str },

	#[error("String at byte {offset} declares {declared} bytes but only {remaining} remain")]
	LengthExceedsBuffer {
		offset: usize,
		declared: usize,
		remaining: usize,
	},

	#[error("Duplicate dictionary key {key:?} at byte {offset}")]
	DuplicateKey { offset: usize, key: String },

	#[error("Dictionary key at byte {offset} is not a byte string")]
	NonStringKey { offset: usize },

	#[error("Trailing bytes after value, starting at byte {offset}")]
	TrailingBytes { offset: usize },

	#[error("Nesting deeper than {limit} levels at byte {offset}")]
	DepthLimitExceeded { offset: usize, limit: usize },
}

impl BencodeError {
	/// Byte offset in the input where decoding stopped.
	pub fn offset(&self) -> usize {
		match self {
			BencodeError::UnexpectedEnd { offset }
			| BencodeError::InvalidLeadingByte { offset, .. }
			| BencodeError::MalformedInteger { offset, .. }
			| BencodeError::MalformedLength { offset, .. }
			| BencodeError::LengthExceedsBuffer { offset, .. }
			| BencodeError::DuplicateKey { offset, .. }
			| BencodeError::NonStringKey { offset }
			| BencodeError::TrailingBytes { offset }
			| BencodeError::DepthLimitExceeded { offset, .. } => *offset,
		}
	}
}
