use bytes::Bytes;
use indexmap::IndexMap;

/// A decoded bencode node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BValue {
	ByteString(Bytes), // raw bytes, not guaranteed to be UTF-8
	Integer(i64),
	List(Vec<BValue>),
	Dict(Dict),
}

/// Dictionary with unique byte string keys.
///
/// Entries keep the order they were inserted (or read) in. Equality ignores
/// that order: two dictionaries are equal when they hold the same keys mapped
/// to equal values. The encoder sorts keys on the way out.
#[derive(Debug, Clone, Default)]
pub struct Dict {
	entries: IndexMap<Bytes, BValue>,
}

impl Dict {
	pub fn new() -> Self {
		Self {
			entries: IndexMap::new(),
		}
	}

	/// Inserts `value` under `key`, returning the previous value if the key
	/// was already present. The original position of the key is kept.
	pub fn insert(&mut self, key: impl Into<Bytes>, value: BValue) -> Option<BValue> {
		self.entries.insert(key.into(), value)
	}

	pub fn get(&self, key: &[u8]) -> Option<&BValue> {
		self.entries.get(key)
	}

	pub fn contains_key(&self, key: &[u8]) -> bool {
		self.entries.contains_key(key)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Entries in insertion order.
	pub fn iter(&self) -> impl Iterator<Item = (&Bytes, &BValue)> {
		self.entries.iter()
	}

	pub fn keys(&self) -> impl Iterator<Item = &Bytes> {
		self.entries.keys()
	}

	/// Entries ordered by raw key bytes, as canonical bencode requires.
	pub fn sorted_entries(&self) -> Vec<(&Bytes, &BValue)> {
		let mut sorted: Vec<(&Bytes, &BValue)> = self.iter().collect();
		sorted.sort_by(|a, b| a.0.cmp(b.0));
		sorted
	}
}

impl PartialEq for Dict {
	fn eq(&self, other: &Self) -> bool {
		self.len() == other.len()
			&& self
				.iter()
				.all(|(k, v)| other.get(k).map_or(false, |ov| ov == v))
	}
}

impl Eq for Dict {}

impl<K: Into<Bytes>> FromIterator<(K, BValue)> for Dict {
	fn from_iter<I: IntoIterator<Item = (K, BValue)>>(iter: I) -> Self {
		let mut dict = Dict::new();
		for (k, v) in iter {
			dict.insert(k, v);
		}
		dict
	}
}


impl BValue {
	/// Builds a byte string from UTF-8 text.
	pub fn string(s: &str) -> Self {
		BValue::ByteString(Bytes::copy_from_slice(s.as_bytes()))
	}

	pub fn as_integer(&self) -> Option<i64> {
		match self {
			BValue::Integer(i) => Some(*i),
			_ => None,
		}
	}

	pub fn as_bytes(&self) -> Option<&[u8]> {
		match self {
			BValue::ByteString(b) => Some(&b[..]),
			_ => None,
		}
	}

	/// The byte string as text, if it is one and it is valid UTF-8.
	pub fn as_str(&self) -> Option<&str> {
		self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
	}

	pub fn as_list(&self) -> Option<&[BValue]> {
		match self {
			BValue::List(items) => Some(items.as_slice()),
			_ => None,
		}
	}

	pub fn as_dict(&self) -> Option<&Dict> {
		match self {
			BValue::Dict(d) => Some(d),
			_ => None,
		}
	}

	/// Looks up `key` when this value is a dictionary.
	pub fn get(&self, key: &[u8]) -> Option<&BValue> {
		self.as_dict().and_then(|d| d.get(key))
	}

	/// Tag name, used in diagnostics.
	pub fn kind(&self) -> &'static str {
		match self {
			BValue::ByteString(_) => "byte string",
			BValue::Integer(_) => "integer",
			BValue::List(_) => "list",
			BValue::Dict(_) => "dictionary",
		}
	}
}

impl From<i64> for BValue {
	fn from(i: i64) -> Self {
		BValue::Integer(i)
	}
}

impl From<&str> for BValue {
	fn from(s: &str) -> Self {
		BValue::string(s)
	}
}

impl From<String> for BValue {
	fn from(s: String) -> Self {
		BValue::ByteString(Bytes::from(s))
	}
}

impl From<&[u8]> for BValue {
	fn from(b: &[u8]) -> Self {
		BValue::ByteString(Bytes::copy_from_slice(b))
	}
}

impl From<Vec<u8>> for BValue {
	fn from(b: Vec<u8>) -> Self {
		BValue::ByteString(Bytes::from(b))
	}
}

impl From<Bytes> for BValue {
	fn from(b: Bytes) -> Self {
		BValue::ByteString(b)
	}
}

impl From<Vec<BValue>> for BValue {
	fn from(items: Vec<BValue>) -> Self {
		BValue::List(items)
	}
}

impl From<Dict> for BValue {
	fn from(d: Dict) -> Self {
		BValue::Dict(d)
	}
}
