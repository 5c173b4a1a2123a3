//! A borrowed-slice BER-TLV codec.
//!
//! Parses and builds BER-TLV with 1- or 2-byte tags and short/long
//! form lengths, never copying the decoded value out of the input
//! buffer. Used to synthesize the 7F49 public-key template and to
//! locate the nested public-point tag (0x86) inside a PSO:DECIPHER
//! ECDH cipher data object.

use crate::types::Tag;
use crate::{Error, Result};

/// One decoded TLV element, borrowing its value from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlvElement<'a> {
    /// The element's tag.
    pub tag: Tag,
    /// The element's value, still BER-TLV-encoded if the tag is
    /// constructed.
    pub value: &'a [u8],
}

/// Decodes one TLV element from the front of `data`, returning it and
/// the unconsumed remainder.
pub fn parse_one(data: &[u8]) -> Result<(TlvElement<'_>, &[u8])> {
    let (tag, rest) = decode_tag(data)?;
    let (len, rest) = decode_len(rest)?;
    if rest.len() < len {
        return Err(Error::TlvDecodeValue);
    }
    let (value, rest) = rest.split_at(len);
    Ok((TlvElement { tag, value }, rest))
}

/// Decodes every TLV element at the top level of `data`.
pub fn parse_all(data: &[u8]) -> Result<Vec<TlvElement<'_>>> {
    let mut elements = Vec::new();
    let mut rest = data;
    while !rest.is_empty() {
        let (element, tail) = parse_one(rest)?;
        elements.push(element);
        rest = tail;
    }
    Ok(elements)
}

/// Depth-first, first-match search for `target` anywhere in `data`.
///
/// Every element's value is also a candidate subtree: this crate
/// never needs to know up front whether a tag is constructed, so a
/// value that fails to parse as further TLV is simply a leaf.
pub fn find_tag(data: &[u8], target: Tag) -> Option<&[u8]> {
    let mut rest = data;
    while !rest.is_empty() {
        let (element, tail) = parse_one(rest).ok()?;
        if element.tag == target {
            return Some(element.value);
        }
        if let Some(found) = find_tag(element.value, target) {
            return Some(found);
        }
        rest = tail;
    }
    None
}

/// Encodes a single TLV element with the given tag and value.
pub fn encode(tag: Tag, value: &[u8]) -> Vec<u8> {
    let mut out = encode_tag(tag);
    out.extend_from_slice(&encode_len(value.len()));
    out.extend_from_slice(value);
    out
}

/// Encodes a constructed element by concatenating the encodings of
/// its children as the value.
pub fn encode_constructed(tag: Tag, children: &[Vec<u8>]) -> Vec<u8> {
    let mut value = Vec::new();
    for child in children {
        value.extend_from_slice(child);
    }
    encode(tag, &value)
}

fn encode_tag(tag: Tag) -> Vec<u8> {
    if tag.0 > 0xFF {
        vec![(tag.0 >> 8) as u8, tag.0 as u8]
    } else {
        vec![tag.0 as u8]
    }
}

fn encode_len(len: usize) -> Vec<u8> {
    if len <= 0x7F {
        vec![len as u8]
    } else {
        let bytes = len.to_be_bytes();
        let first_nonzero = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len() - 1);
        let trimmed = &bytes[first_nonzero..];
        let mut out = vec![0x80 | trimmed.len() as u8];
        out.extend_from_slice(trimmed);
        out
    }
}

/// Decodes a BER tag from the front of `data`, not consuming any
/// length or value bytes. `pub(crate)` for [`crate::handlers::put_key`],
/// which walks a private key template's (tag, length) list without any
/// value bytes following each entry, a shape [`parse_one`]'s
/// tag+length+value contract doesn't fit.
pub(crate) fn decode_tag(data: &[u8]) -> Result<(Tag, &[u8])> {
    let (&first, rest) = data.split_first().ok_or(Error::TlvDecodeTag)?;
    if first & 0x1F == 0x1F {
        let (&second, rest) = rest.split_first().ok_or(Error::TlvDecodeTag)?;
        if second & 0x80 != 0 {
            // Tags spanning more than two bytes don't occur in this
            // applet's object set.
            return Err(Error::TlvDecodeTag);
        }
        Ok((Tag(((first as u16) << 8) | second as u16), rest))
    } else {
        Ok((Tag(first as u16), rest))
    }
}

/// Decodes a BER length from the front of `data`, not splitting off
/// any value bytes. See [`decode_tag`].
pub(crate) fn decode_len(data: &[u8]) -> Result<(usize, &[u8])> {
    let (&first, rest) = data.split_first().ok_or(Error::TlvDecodeLength)?;
    if first & 0x80 == 0 {
        return Ok((first as usize, rest));
    }
    let count = (first & 0x7F) as usize;
    if count == 0 || count > std::mem::size_of::<usize>() {
        // 0x80 alone is BER indefinite length, which this applet's
        // fixed-size buffers never produce or accept.
        return Err(Error::TlvDecodeLength);
    }
    if rest.len() < count {
        return Err(Error::TlvDecodeLength);
    }
    let (len_bytes, rest) = rest.split_at(count);
    let mut buf = [0u8; std::mem::size_of::<usize>()];
    buf[std::mem::size_of::<usize>() - count..].copy_from_slice(len_bytes);
    Ok((usize::from_be_bytes(buf), rest))
}
