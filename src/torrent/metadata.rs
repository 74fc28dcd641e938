use std::{
	fs::File as FsFile,
	io::Read,
	path::{Path, PathBuf},
};

use bytes::Bytes;
use log::{debug, warn};

use crate::bencode::{decode_bencode_with, BValue, Dict};
use crate::config::Config;
use crate::torrent::calculate_info_hash;
use crate::torrent::error::{MetainfoError, SchemaError};

/// Represents a .torrent file: tracker information plus the `info` dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaInfo {
	pub info: Info,
	pub announce: Option<String>, // absent for DHT-only torrents
	pub announce_list: Option<Vec<Vec<String>>>,
	pub creation_date: Option<i64>, // Unix timestamp
	pub comment: Option<String>,
	pub created_by: Option<String>,
	pub encoding: Option<String>,
	pub info_hash: [u8; 20],
}

/// Contains detailed metadata about the torrent's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Info {
	pub name: String,          // Name of the file or folder
	pub piece_length: u64,     // Size of each piece
	pub pieces: Vec<[u8; 20]>, // SHA-1 hashes are 20 bytes each
	pub private: Option<bool>,
	pub mode: FileMode,
}

/// The two shapes an `info` dictionary can take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileMode {
	SingleFile { length: u64, md5sum: Option<String> },
	MultiFile { files: Vec<File> },
}

/// One entry of a multi-file torrent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
	pub length: u64,
	pub md5sum: Option<String>,
	pub path: Vec<String>, // components, never containing a separator
}

/// Maps a decoded value onto the metainfo schema.
pub fn to_metainfo(value: &BValue) -> Result<MetaInfo, SchemaError> {
	MetaInfo::from_bvalue(value)
}

impl MetaInfo {
	/// Reads a .torrent file from disk and parses its contents.
	///
	/// Files larger than `config.max_input_size` are rejected before being read.
	pub fn from_file<P: AsRef<Path>>(path: P, config: &Config) -> Result<Self, MetainfoError> {
		let path = path.as_ref();
		let mut file = FsFile::open(path)?;

		let size = file.metadata()?.len();
		if size > config.max_input_size as u64 {
			warn!("Refusing {}: {} bytes exceeds the limit", path.display(), size);
			return Err(MetainfoError::InputTooLarge {
				size,
				limit: config.max_input_size,
			});
		}

		let mut buf = Vec::with_capacity(size as usize);
		file.read_to_end(&mut buf)?;
		debug!("Read {} bytes from {}", buf.len(), path.display());

		Self::from_buffer(Bytes::from(buf), config)
	}

	/// Decodes and maps raw bencoded bytes using the default limits.
	pub fn from_bytes(data: &[u8]) -> Result<Self, MetainfoError> {
		Self::from_bytes_with(data, &Config::default())
	}

	pub fn from_bytes_with(data: &[u8], config: &Config) -> Result<Self, MetainfoError> {
		Self::from_buffer(Bytes::copy_from_slice(data), config)
	}

	fn from_buffer(buf: Bytes, config: &Config) -> Result<Self, MetainfoError> {
		if buf.len() > config.max_input_size {
			warn!("Refusing {} byte torrent: exceeds the limit", buf.len());
			return Err(MetainfoError::InputTooLarge {
				size: buf.len() as u64,
				limit: config.max_input_size,
			});
		}

		let (_consumed, bvalue) = decode_bencode_with(&buf, &config.decode_options())?;
		Ok(Self::from_bvalue(&bvalue)?)
	}

	/// Creates a `MetaInfo` from a `BValue` (the result of a bencode parse).
	pub fn from_bvalue(value: &BValue) -> Result<Self, SchemaError> {
		let root_dict = value.as_dict().ok_or(SchemaError::NotADictionary)?;

		let info_value = root_dict
			.get(b"info")
			.ok_or_else(|| missing("", "info"))?;
		let info_dict = info_value.as_dict().ok_or_else(|| missing("", "info"))?;

		let info = Info::from_bvalue(info_dict)?;
		let info_hash = calculate_info_hash(info_value);

		let metainfo = MetaInfo {
			info,
			announce: get_text(root_dict, "", "announce")?,
			announce_list: get_announce_list(root_dict)?,
			creation_date: get_integer(root_dict, "", "creation date")?,
			comment: get_text(root_dict, "", "comment")?,
			created_by: get_text(root_dict, "", "created by")?,
			encoding: get_text(root_dict, "", "encoding")?,
			info_hash,
		};

		debug!(
			"Mapped torrent '{}' ({} mode, {} pieces)",
			metainfo.info.name,
			if metainfo.info.is_multi_file() { "multi-file" } else { "single-file" },
			metainfo.info.piece_count()
		);
		Ok(metainfo)
	}

	/// The primary tracker, or an empty string when there is none.
	pub fn announce_url(&self) -> &str {
		self.announce.as_deref().unwrap_or("")
	}

	/// Every tracker URL, `announce` first and then the tiers in order,
	/// without repeats.
	pub fn trackers(&self) -> Vec<&str> {
		let mut urls: Vec<&str> = Vec::new();
		let tiers = self.announce_list.iter().flatten().flatten();
		for url in self.announce.iter().chain(tiers) {
			if !urls.contains(&url.as_str()) {
				urls.push(url);
			}
		}
		urls
	}

	/// The tracker a client would contact first: `announce`, or the first
	/// `announce-list` entry when `announce` is absent.
	pub fn primary_tracker(&self) -> Option<&str> {
		self.trackers().first().copied()
	}

	pub fn info_hash_hex(&self) -> String {
		hex::encode(self.info_hash)
	}
}

impl Info {
	pub fn from_bvalue(info_dict: &Dict) -> Result<Self, SchemaError> {
		let name = get_text(info_dict, "info", "name")?.ok_or_else(|| missing("info", "name"))?;

		let piece_length = get_integer(info_dict, "info", "piece length")?
			.filter(|&len| len > 0)
			.ok_or_else(|| missing("info", "piece length"))? as u64;

		let pieces_bytes = lookup_bytestring(info_dict, "info", "pieces")?
			.filter(|bytes| bytes.len() % 20 == 0)
			.ok_or_else(|| missing("info", "pieces"))?;

		// Chunk the pieces bytes into 20-byte pieces.
		let pieces = pieces_bytes
			.chunks_exact(20)
			.map(|chunk| {
				let mut hash = [0u8; 20];
				hash.copy_from_slice(chunk);
				hash
			})
			.collect();

		let private = match get_integer(info_dict, "info", "private")? {
			None => None,
			Some(0) => Some(false),
			Some(1) => Some(true),
			Some(_) => return Err(missing("info", "private")),
		};

		let mode = match (info_dict.get(b"length"), info_dict.get(b"files")) {
			(Some(length), None) => FileMode::SingleFile {
				length: non_negative(length, "info.length")?,
				md5sum: get_text(info_dict, "info", "md5sum")?,
			},
			(None, Some(files)) => FileMode::MultiFile {
				files: parse_files(files)?,
			},
			_ => return Err(SchemaError::AmbiguousOrMissingMode("info".to_string())),
		};

		Ok(Info {
			name,
			piece_length,
			pieces,
			private,
			mode,
		})
	}

	pub fn is_multi_file(&self) -> bool {
		matches!(self.mode, FileMode::MultiFile { .. })
	}

	pub fn piece_count(&self) -> usize {
		self.pieces.len()
	}

	pub fn piece_hash(&self, index: usize) -> Option<&[u8; 20]> {
		self.pieces.get(index)
	}

	/// Total size of the file(s).
	pub fn total_length(&self) -> u64 {
		match &self.mode {
			FileMode::SingleFile { length, .. } => *length,
			FileMode::MultiFile { files } => files.iter().map(|f| f.length).sum(),
		}
	}

	/// The content as a file list. A single-file torrent yields one entry
	/// whose path is the torrent name.
	pub fn files(&self) -> Vec<File> {
		match &self.mode {
			FileMode::SingleFile { length, md5sum } => vec![File {
				length: *length,
				md5sum: md5sum.clone(),
				path: vec![self.name.clone()],
			}],
			FileMode::MultiFile { files } => files.clone(),
		}
	}
}

impl File {
	fn from_bvalue(value: &BValue, prefix: &str) -> Result<Self, SchemaError> {
		let dict = value
			.as_dict()
			.ok_or_else(|| SchemaError::MissingOrInvalidField(prefix.to_string()))?;

		let length = dict
			.get(b"length")
			.ok_or_else(|| missing(prefix, "length"))
			.and_then(|v| non_negative(v, &field_path(prefix, "length")))?;

		let components = dict
			.get(b"path")
			.and_then(BValue::as_list)
			.filter(|list| !list.is_empty())
			.ok_or_else(|| missing(prefix, "path"))?;

		let path = components
			.iter()
			.enumerate()
			.map(|(i, component)| {
				let component_path = format!("{}[{}]", field_path(prefix, "path"), i);
				let segment = text_of(component, &component_path)?;
				check_path_component(&segment, &component_path)?;
				Ok(segment)
			})
			.collect::<Result<Vec<String>, SchemaError>>()?;

		Ok(File {
			length,
			md5sum: get_text(dict, prefix, "md5sum")?,
			path,
		})
	}

	/// Path of the file relative to the torrent's root directory.
	pub fn relative_path(&self) -> PathBuf {
		self.path.iter().collect()
	}
}

fn parse_files(value: &BValue) -> Result<Vec<File>, SchemaError> {
	let entries = value
		.as_list()
		.filter(|list| !list.is_empty())
		.ok_or_else(|| missing("info", "files"))?;

	let files = entries
		.iter()
		.enumerate()
		.map(|(i, entry)| File::from_bvalue(entry, &format!("info.files[{}]", i)))
		.collect::<Result<Vec<File>, SchemaError>>()?;

	// The combined size has to fit, or total_length() would wrap.
	files
		.iter()
		.try_fold(0u64, |total, file| total.checked_add(file.length))
		.ok_or_else(|| missing("info", "files"))?;

	Ok(files)
}

fn get_announce_list(root_dict: &Dict) -> Result<Option<Vec<Vec<String>>>, SchemaError> {
	let tiers = match root_dict.get(b"announce-list") {
		None => return Ok(None),
		Some(value) => value.as_list().ok_or_else(|| missing("", "announce-list"))?,
	};

	tiers
		.iter()
		.enumerate()
		.map(|(i, tier)| {
			let tier_path = format!("announce-list[{}]", i);
			let urls = tier
				.as_list()
				.ok_or_else(|| SchemaError::MissingOrInvalidField(tier_path.clone()))?;
			urls.iter()
				.enumerate()
				.map(|(j, url)| text_of(url, &format!("{}[{}]", tier_path, j)))
				.collect()
		})
		.collect::<Result<Vec<Vec<String>>, SchemaError>>()
		.map(Some)
}

/// Rejects components that could escape the torrent's directory.
fn check_path_component(segment: &str, path: &str) -> Result<(), SchemaError> {
	let unsafe_component = segment.is_empty()
		|| segment == "."
		|| segment == ".."
		|| segment.contains(|c| c == '/' || c == '\\');
	if unsafe_component {
		return Err(SchemaError::InvalidPathComponent(path.to_string()));
	}
	Ok(())
}

fn field_path(prefix: &str, key: &str) -> String {
	if prefix.is_empty() {
		key.to_string()
	} else {
		format!("{}.{}", prefix, key)
	}
}

fn missing(prefix: &str, key: &str) -> SchemaError {
	SchemaError::MissingOrInvalidField(field_path(prefix, key))
}

fn text_of(value: &BValue, path: &str) -> Result<String, SchemaError> {
	let bytes = value
		.as_bytes()
		.ok_or_else(|| SchemaError::MissingOrInvalidField(path.to_string()))?;
	String::from_utf8(bytes.to_vec()).map_err(|_| SchemaError::TextDecodingFailed(path.to_string()))
}

fn non_negative(value: &BValue, path: &str) -> Result<u64, SchemaError> {
	value
		.as_integer()
		.and_then(|i| u64::try_from(i).ok())
		.ok_or_else(|| SchemaError::MissingOrInvalidField(path.to_string()))
}

/// Looks up a key in the dictionary and returns a byte slice if the value is a ByteString.
/// Absent keys give `None`; a value of any other type is an error.
pub fn lookup_bytestring<'a>(
	dict: &'a Dict,
	prefix: &str,
	key: &str,
) -> Result<Option<&'a [u8]>, SchemaError> {
	match dict.get(key.as_bytes()) {
		None => Ok(None),
		Some(BValue::ByteString(b)) => Ok(Some(&b[..])),
		Some(_) => Err(missing(prefix, key)),
	}
}

/// Gets an optional ByteString from the dictionary as UTF-8 text.
pub fn get_text(dict: &Dict, prefix: &str, key: &str) -> Result<Option<String>, SchemaError> {
	match dict.get(key.as_bytes()) {
		None => Ok(None),
		Some(value) => text_of(value, &field_path(prefix, key)).map(Some),
	}
}

/// Retrieves an optional integer value from the dictionary.
pub fn get_integer(dict: &Dict, prefix: &str, key: &str) -> Result<Option<i64>, SchemaError> {
	match dict.get(key.as_bytes()) {
		None => Ok(None),
		Some(BValue::Integer(i)) => Ok(Some(*i)),
		Some(_) => Err(missing(prefix, key)),
	}
}
