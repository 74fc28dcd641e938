use bytes::Bytes;
use log::{debug, trace};

use super::error::BencodeError;
use crate::bencode::bvalue::{BValue, Dict};

/// Deepest container nesting accepted unless configured otherwise.
pub const DEFAULT_MAX_DEPTH: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
	pub max_depth: usize,
}

impl Default for DecodeOptions {
	fn default() -> Self {
		Self {
			max_depth: DEFAULT_MAX_DEPTH,
		}
	}
}

/// Decodes a complete bencoded document.
///
/// The whole buffer must be consumed by a single value, so the returned
/// count is always `input.len()`.
pub fn decode_bencode(input: &[u8]) -> Result<(usize, BValue), BencodeError> {
	decode_bencode_with(&Bytes::copy_from_slice(input), &DecodeOptions::default())
}

/// Like [`decode_bencode`], but byte strings in the result are slices of
/// `input` rather than copies.
pub fn decode_bencode_bytes(input: Bytes) -> Result<(usize, BValue), BencodeError> {
	decode_bencode_with(&input, &DecodeOptions::default())
}

pub fn decode_bencode_with(
	input: &Bytes,
	options: &DecodeOptions,
) -> Result<(usize, BValue), BencodeError> {
	let decoder = Decoder {
		input,
		max_depth: options.max_depth,
	};
	let (end, value) = decoder.decode_value(0, 0)?;

	if end != input.len() {
		return Err(BencodeError::TrailingBytes { offset: end });
	}

	debug!("Decoded {} bytes into a bencode {}", end, value.kind());
	Ok((end, value))
}

/// Decodes the first value in `input` and reports how many bytes it used.
/// Anything after it is left alone.
pub fn decode_bencode_prefix(input: &[u8]) -> Result<(usize, BValue), BencodeError> {
	decode_bencode_prefix_with(&Bytes::copy_from_slice(input), &DecodeOptions::default())
}

pub fn decode_bencode_prefix_with(
	input: &Bytes,
	options: &DecodeOptions,
) -> Result<(usize, BValue), BencodeError> {
	let decoder = Decoder {
		input,
		max_depth: options.max_depth,
	};
	decoder.decode_value(0, 0)
}

struct Decoder<'a> {
	input: &'a Bytes,
	max_depth: usize,
}

// Each step takes the offset it starts at and returns the offset just past
// what it consumed.
impl<'a> Decoder<'a> {
	fn decode_value(&self, start: usize, depth: usize) -> Result<(usize, BValue), BencodeError> {
		let byte = *self
			.input
			.get(start)
			.ok_or(BencodeError::UnexpectedEnd { offset: start })?;

		match byte {
			b'i' => self.decode_integer(start),
			b'l' => self.decode_list(start, depth),
			b'd' => self.decode_dict(start, depth),
			c if c.is_ascii_digit() => self.decode_string(start),
			c => Err(BencodeError::InvalidLeadingByte {
				byte: c,
				offset: start,
			}),
		}
	}

	/// Decodes an integer of the form `i<digits>e`.
	fn decode_integer(&self, start: usize) -> Result<(usize, BValue), BencodeError> {
		let digits_start = start + 1;
		let mut end_pos = digits_start;
		while end_pos < self.input.len()
			&& (self.input[end_pos].is_ascii_digit() || self.input[end_pos] == b'-')
		{
			end_pos += 1;
		}

		match self.input.get(end_pos) {
			None => return Err(BencodeError::UnexpectedEnd { offset: end_pos }),
			Some(b'e') => {}
			Some(_) => {
				return Err(BencodeError::MalformedInteger {
					offset: end_pos,
					reason: "expected 'e'",
				})
			}
		}

		let digits = &self.input[digits_start..end_pos];
		let malformed = |reason: &'static str| BencodeError::MalformedInteger {
			offset: start,
			reason,
		};

		let (negative, magnitude) = match digits.split_first() {
			Some((b'-', rest)) => (true, rest),
			_ => (false, digits),
		};
		if magnitude.is_empty() {
			return Err(malformed("no digits"));
		}
		if !magnitude.iter().all(u8::is_ascii_digit) {
			return Err(malformed("misplaced '-'"));
		}
		// Leading zeros no allowed, and neither is "-0"
		if magnitude[0] == b'0' && magnitude.len() > 1 {
			return Err(malformed("leading zero"));
		}
		if negative && magnitude == b"0" {
			return Err(malformed("negative zero"));
		}

		let parsed = std::str::from_utf8(digits)
			.ok()
			.and_then(|s| s.parse::<i64>().ok())
			.ok_or_else(|| malformed("out of range for a 64-bit integer"))?;

		// add 1 to account for 'e'
		Ok((end_pos + 1, BValue::Integer(parsed)))
	}

	/// Decodes a string of the form `<length>:<bytes>`.
	fn decode_string(&self, start: usize) -> Result<(usize, BValue), BencodeError> {
		let mut colon_index = start;
		while colon_index < self.input.len() && self.input[colon_index].is_ascii_digit() {
			colon_index += 1;
		}

		match self.input.get(colon_index) {
			None => return Err(BencodeError::UnexpectedEnd { offset: colon_index }),
			Some(b':') => {}
			Some(_) => {
				return Err(BencodeError::MalformedLength {
					offset: colon_index,
					reason: "expected ':' after length",
				})
			}
		}

		let digits = &self.input[start..colon_index];
		let malformed = |reason: &'static str| BencodeError::MalformedLength {
			offset: start,
			reason,
		};
		if digits.is_empty() {
			return Err(malformed("no digits"));
		}
		if digits[0] == b'0' && digits.len() > 1 {
			return Err(malformed("leading zero"));
		}
		let length = std::str::from_utf8(digits)
			.ok()
			.and_then(|s| s.parse::<usize>().ok())
			.ok_or_else(|| malformed("length out of range"))?;

		let start_data = colon_index + 1;
		let remaining = self.input.len() - start_data;
		if length > remaining {
			return Err(BencodeError::LengthExceedsBuffer {
				offset: start,
				declared: length,
				remaining,
			});
		}

		let end_data = start_data + length;
		Ok((end_data, BValue::ByteString(self.input.slice(start_data..end_data))))
	}

	/// Decodes a list of the form `l<items>e`.
	fn decode_list(&self, start: usize, depth: usize) -> Result<(usize, BValue), BencodeError> {
		let depth = self.enter(start, depth)?;
		let mut idx = start + 1; // skip 'l'
		let mut items = Vec::new();

		loop {
			match self.input.get(idx) {
				None => return Err(BencodeError::UnexpectedEnd { offset: idx }),
				Some(b'e') => break,
				Some(_) => {
					let (next, val) = self.decode_value(idx, depth)?;
					items.push(val);
					idx = next;
				}
			}
		}

		// add 1 to account for 'e'
		Ok((idx + 1, BValue::List(items)))
	}

	/// Decodes a dictionary of the form `d<key><value>...e`, keeping keys in
	/// the order they appear.
	fn decode_dict(&self, start: usize, depth: usize) -> Result<(usize, BValue), BencodeError> {
		let depth = self.enter(start, depth)?;
		let mut idx = start + 1; // skip 'd'
		let mut dict = Dict::new();

		loop {
			let key_offset = idx;
			let key = match self.input.get(idx) {
				None => return Err(BencodeError::UnexpectedEnd { offset: idx }),
				Some(b'e') => break,
				Some(b) if b.is_ascii_digit() => {
					let (next, key) = self.decode_string(idx)?;
					idx = next;
					match key {
						BValue::ByteString(bytes) => bytes,
						_ => return Err(BencodeError::NonStringKey { offset: key_offset }),
					}
				}
				Some(_) => return Err(BencodeError::NonStringKey { offset: key_offset }),
			};

			if dict.contains_key(&key) {
				return Err(BencodeError::DuplicateKey {
					offset: key_offset,
					key: String::from_utf8_lossy(&key).into_owned(),
				});
			}

			let (next, value) = self.decode_value(idx, depth)?;
			idx = next;
			dict.insert(key, value);
		}

		// add 1 to account for 'e'
		Ok((idx + 1, BValue::Dict(dict)))
	}

	fn enter(&self, start: usize, depth: usize) -> Result<usize, BencodeError> {
		let depth = depth + 1;
		if depth > self.max_depth {
			return Err(BencodeError::DepthLimitExceeded {
				offset: start,
				limit: self.max_depth,
			});
		}
		trace!("Container at byte {} (depth {})", start, depth);
		Ok(depth)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn bstr(s: &str) -> BValue {
		BValue::string(s)
	}

	#[test]
	fn test_decode_integer() {
		let input = b"i42e";
		let (consumed, value) = decode_bencode(input).unwrap();
		assert_eq!(consumed, input.len());
		assert_eq!(value, BValue::Integer(42));
	}

	#[test]
	fn test_decode_negative_integer() {
		let (consumed, value) = decode_bencode(b"i-3e").unwrap();
		assert_eq!(consumed, 4);
		assert_eq!(value, BValue::Integer(-3));
	}

	#[test]
	fn test_decode_integer_zero() {
		let (_, value) = decode_bencode(b"i0e").unwrap();
		assert_eq!(value, BValue::Integer(0));
	}

	#[test]
	fn test_decode_integer_extremes() {
		let (_, max) = decode_bencode(b"i9223372036854775807e").unwrap();
		assert_eq!(max, BValue::Integer(i64::MAX));
		let (_, min) = decode_bencode(b"i-9223372036854775808e").unwrap();
		assert_eq!(min, BValue::Integer(i64::MIN));
	}

	#[test]
	fn test_decode_integer_overflow() {
		let err = decode_bencode(b"i9223372036854775808e").unwrap_err();
		assert!(matches!(err, BencodeError::MalformedInteger { offset: 0, .. }));
	}

	#[test]
	fn test_decode_negative_zero() {
		let err = decode_bencode(b"i-0e").unwrap_err();
		assert!(matches!(err, BencodeError::MalformedInteger { .. }));
	}

	#[test]
	fn test_decode_leading_zeros() {
		assert!(matches!(
			decode_bencode(b"i03e").unwrap_err(),
			BencodeError::MalformedInteger { .. }
		));
		assert!(matches!(
			decode_bencode(b"i-03e").unwrap_err(),
			BencodeError::MalformedInteger { .. }
		));
	}

	#[test]
	fn test_decode_integer_without_digits() {
		for input in [&b"ie"[..], &b"i-e"[..], &b"i1-2e"[..], &b"i--1e"[..]] {
			let err = decode_bencode(input).unwrap_err();
			assert!(
				matches!(err, BencodeError::MalformedInteger { .. }),
				"{:?} gave {:?}",
				input,
				err
			);
		}
	}

	#[test]
	fn test_decode_integer_missing_e() {
		assert_eq!(
			decode_bencode(b"i42").unwrap_err(),
			BencodeError::UnexpectedEnd { offset: 3 }
		);
		assert!(matches!(
			decode_bencode(b"i4x2e").unwrap_err(),
			BencodeError::MalformedInteger { offset: 2, .. }
		));
	}

	#[test]
	fn test_decode_string() {
		let input = b"4:spam";
		let (consumed, value) = decode_bencode(input).unwrap();
		assert_eq!(consumed, input.len());
		assert_eq!(value, bstr("spam"));
	}

	#[test]
	fn test_decode_empty_string() {
		let (consumed, value) = decode_bencode(b"0:").unwrap();
		assert_eq!(consumed, 2);
		assert_eq!(value, bstr(""));
	}

	#[test]
	fn test_decode_binary_string() {
		let (_, value) = decode_bencode(b"3:\x00\xff\x13").unwrap();
		assert_eq!(value.as_bytes(), Some(&[0x00u8, 0xff, 0x13][..]));
	}

	#[test]
	fn test_decode_string_too_long() {
		assert_eq!(
			decode_bencode(b"5:spam").unwrap_err(),
			BencodeError::LengthExceedsBuffer {
				offset: 0,
				declared: 5,
				remaining: 4
			}
		);
	}

	#[test]
	fn test_decode_string_missing_colon() {
		assert!(matches!(
			decode_bencode(b"5hello").unwrap_err(),
			BencodeError::MalformedLength { offset: 1, .. }
		));
		assert_eq!(
			decode_bencode(b"12").unwrap_err(),
			BencodeError::UnexpectedEnd { offset: 2 }
		);
	}

	#[test]
	fn test_decode_string_length_leading_zero() {
		assert!(matches!(
			decode_bencode(b"04:spam").unwrap_err(),
			BencodeError::MalformedLength { .. }
		));
	}

	#[test]
	fn test_decode_list() {
		let input = b"l4:spam4:eggse";
		let (consumed, value) = decode_bencode(input).unwrap();
		assert_eq!(consumed, input.len());
		assert_eq!(value, BValue::List(vec![bstr("spam"), bstr("eggs")]));
	}

	#[test]
	fn test_decode_nested_list() {
		// l4:spaml3:eggi3eee => ["spam", ["egg", 3]]
		let (_, value) = decode_bencode(b"l4:spaml3:eggi3eee").unwrap();
		assert_eq!(
			value,
			BValue::List(vec![
				bstr("spam"),
				BValue::List(vec![bstr("egg"), BValue::Integer(3)]),
			])
		);
	}

	#[test]
	fn test_decode_dict() {
		let input = b"d3:cow3:moo4:spam4:eggse";
		let (consumed, value) = decode_bencode(input).unwrap();
		assert_eq!(consumed, input.len());

		let expected: Dict = vec![("cow", bstr("moo")), ("spam", bstr("eggs"))]
			.into_iter()
			.collect();
		assert_eq!(value, BValue::Dict(expected));
	}

	#[test]
	fn test_decode_dict_with_list_value() {
		let (_, value) = decode_bencode(b"d4:spaml1:a1:bee").unwrap();
		assert_eq!(
			value.get(b"spam"),
			Some(&BValue::List(vec![bstr("a"), bstr("b")]))
		);
	}

	#[test]
	fn test_decode_dict_keeps_input_order() {
		let (_, value) = decode_bencode(b"d4:spami1e3:cowi2ee").unwrap();
		let keys: Vec<&[u8]> = value.as_dict().unwrap().keys().map(|k| &k[..]).collect();
		assert_eq!(keys, vec![b"spam".as_slice(), b"cow".as_slice()]);
	}

	#[test]
	fn test_decode_empty_containers() {
		assert_eq!(decode_bencode(b"de").unwrap().1, BValue::Dict(Dict::new()));
		assert_eq!(decode_bencode(b"le").unwrap().1, BValue::List(vec![]));
	}

	#[test]
	fn test_decode_list_unclosed() {
		assert_eq!(
			decode_bencode(b"l4:spam").unwrap_err(),
			BencodeError::UnexpectedEnd { offset: 7 }
		);
	}

	#[test]
	fn test_decode_dict_unclosed() {
		assert_eq!(
			decode_bencode(b"d3:foo4:spam").unwrap_err(),
			BencodeError::UnexpectedEnd { offset: 12 }
		);
		// key without a value
		assert_eq!(
			decode_bencode(b"d3:foo").unwrap_err(),
			BencodeError::UnexpectedEnd { offset: 6 }
		);
	}

	#[test]
	fn test_decode_dict_key_not_string() {
		assert_eq!(
			decode_bencode(b"di42e4:spame").unwrap_err(),
			BencodeError::NonStringKey { offset: 1 }
		);
		assert_eq!(
			decode_bencode(b"dl1:ae1:be").unwrap_err(),
			BencodeError::NonStringKey { offset: 1 }
		);
	}

	#[test]
	fn test_decode_duplicate_key() {
		let err = decode_bencode(b"d3:cowi1e3:cowi2ee").unwrap_err();
		assert_eq!(
			err,
			BencodeError::DuplicateKey {
				offset: 9,
				key: "cow".to_string()
			}
		);
	}

	#[test]
	fn test_decode_invalid_leading_byte() {
		assert_eq!(
			decode_bencode(b"x").unwrap_err(),
			BencodeError::InvalidLeadingByte { byte: b'x', offset: 0 }
		);
		assert_eq!(
			decode_bencode(b"lxe").unwrap_err(),
			BencodeError::InvalidLeadingByte { byte: b'x', offset: 1 }
		);
	}

	#[test]
	fn test_decode_empty_input() {
		assert_eq!(
			decode_bencode(b"").unwrap_err(),
			BencodeError::UnexpectedEnd { offset: 0 }
		);
	}

	#[test]
	fn test_decode_trailing_bytes() {
		assert_eq!(
			decode_bencode(b"i1eXYZ").unwrap_err(),
			BencodeError::TrailingBytes { offset: 3 }
		);
	}

	#[test]
	fn test_decode_prefix_reports_consumed() {
		let (consumed, value) = decode_bencode_prefix(b"4:spamrest").unwrap();
		assert_eq!(consumed, 6);
		assert_eq!(value, bstr("spam"));
	}

	#[test]
	fn test_decode_prefix_honours_depth_option() {
		let input = Bytes::from_static(b"llleee1:x");
		let err = decode_bencode_prefix_with(&input, &DecodeOptions { max_depth: 2 }).unwrap_err();
		assert_eq!(err, BencodeError::DepthLimitExceeded { offset: 2, limit: 2 });

		let (consumed, _) = decode_bencode_prefix_with(&input, &DecodeOptions { max_depth: 3 }).unwrap();
		assert_eq!(consumed, 6);
	}

	#[test]
	fn test_decode_wide_dict_is_linear() {
		let keys = 100_000;
		let mut input = Vec::with_capacity(keys * 12 + 2);
		input.push(b'd');
		for i in 0..keys {
			input.extend_from_slice(format!("8:{:08}0:", i).as_bytes());
		}
		input.push(b'e');

		let started = std::time::Instant::now();
		let (consumed, value) = decode_bencode(&input).unwrap();
		let elapsed = started.elapsed();

		assert_eq!(consumed, input.len());
		assert_eq!(value.as_dict().unwrap().len(), keys);
		assert!(elapsed.as_secs() < 10, "took {:?}", elapsed);
	}

	#[test]
	fn test_depth_limit() {
		let ok = format!("{}{}", "l".repeat(DEFAULT_MAX_DEPTH), "e".repeat(DEFAULT_MAX_DEPTH));
		assert!(decode_bencode(ok.as_bytes()).is_ok());

		let depth = DEFAULT_MAX_DEPTH + 1;
		let too_deep = format!("{}{}", "l".repeat(depth), "e".repeat(depth));
		assert_eq!(
			decode_bencode(too_deep.as_bytes()).unwrap_err(),
			BencodeError::DepthLimitExceeded {
				offset: DEFAULT_MAX_DEPTH,
				limit: DEFAULT_MAX_DEPTH
			}
		);
	}

	#[test]
	fn test_depth_limit_counts_dicts() {
		let options = DecodeOptions { max_depth: 2 };
		let input = Bytes::from_static(b"d1:ad1:bd1:ci1eeee");
		let err = decode_bencode_with(&input, &options).unwrap_err();
		assert!(matches!(err, BencodeError::DepthLimitExceeded { limit: 2, .. }));

		let shallow = Bytes::from_static(b"d1:ad1:bi1eee");
		assert!(decode_bencode_with(&shallow, &options).is_ok());
	}

	#[test]
	fn test_depth_limit_on_huge_input_does_not_overflow_stack() {
		let depth = 100_000;
		let input = format!("{}{}", "l".repeat(depth), "e".repeat(depth));
		assert!(matches!(
			decode_bencode(input.as_bytes()).unwrap_err(),
			BencodeError::DepthLimitExceeded { .. }
		));
	}

	#[test]
	fn test_decode_bytes_shares_buffer() {
		let buf = Bytes::from_static(b"l4:spame");
		let (_, value) = decode_bencode_bytes(buf.clone()).unwrap();
		let spam = value.as_list().unwrap()[0].as_bytes().unwrap();
		assert_eq!(spam.as_ptr(), buf[3..].as_ptr());
	}
}
