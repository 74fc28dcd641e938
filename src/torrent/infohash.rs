// infohash.rs
use crate::bencode::{encode_bvalue, BValue};

use sha1::{Digest, Sha1};

/// SHA-1 of the canonical bencoding of the `info` dictionary.
pub fn calculate_info_hash(info: &BValue) -> [u8; 20] {
	let encoded = encode_bvalue(info);

	let mut hasher = Sha1::new();
	hasher.update(&encoded);
	let result = hasher.finalize();

	let mut hash_bytes = [0u8; 20];
	hash_bytes.copy_from_slice(&result);
	hash_bytes
}
