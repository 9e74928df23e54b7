use std::io::Write;
use std::{fmt, io, str};
use thiserror::Error;

#[derive(Eq, PartialEq, Debug)]
pub enum Element {
    Integer(i64),
    ByteString(Vec<u8>),
    List(Vec<Element>),
    Dictionary(Dictionary),
}

impl Element {
    /// Decodes a single element and reports how many source bytes it consumed.
    /// Trailing bytes after the element are left untouched. Recursion depth
    /// equals the nesting depth of the input.
    pub fn decode(src: &[u8]) -> Result<(Element, usize), ParseError> {
        let (element, rest) = read_element(src)?;
        Ok((element, src.len() - rest.len()))
    }

    pub fn from_bytes(src: &[u8]) -> Result<Element, ParseError> {
        let (element, _consumed) = Self::decode(src)?;
        Ok(element)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut dest = Vec::<u8>::with_capacity(self.encoded_len());
        write_element(self, &mut dest).unwrap();
        dest
    }

    /// Size of the encoded representation, without encoding.
    pub fn encoded_len(&self) -> usize {
        match self {
            Element::Integer(number) => {
                let sign = if *number < 0 { 1 } else { 0 };
                2 + sign + count_digits(number.unsigned_abs())
            }
            Element::ByteString(data) => encoded_string_len(data.len()),
            Element::List(list) => 2 + list.iter().map(Element::encoded_len).sum::<usize>(),
            Element::Dictionary(dict) => {
                2 + dict
                    .iter()
                    .map(|(key, value)| encoded_string_len(key.len()) + value.encoded_len())
                    .sum::<usize>()
            }
        }
    }
}

impl From<&str> for Element {
    fn from(text: &str) -> Self {
        Element::ByteString(Vec::<u8>::from(text))
    }
}

impl From<i64> for Element {
    fn from(number: i64) -> Self {
        Element::Integer(number)
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Integer(number) => write!(f, "{number}"),
            Element::ByteString(data) => write!(f, "\"{}\"", String::from_utf8_lossy(data)),
            Element::List(list) => {
                f.write_str("[")?;
                for (i, element) in list.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{element}")?;
                }
                f.write_str("]")
            }
            Element::Dictionary(dict) => {
                f.write_str("{")?;
                for (i, (key, value)) in dict.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "\"{}\":{value}", String::from_utf8_lossy(key))?;
                }
                f.write_str("}")
            }
        }
    }
}

/// Dictionary that keeps entries in insertion order and tolerates duplicate
/// keys. Lookup is a linear scan returning the first match. Entries are never
/// sorted, so encoding reproduces the original key order byte for byte.
#[derive(Eq, PartialEq, Debug, Default)]
pub struct Dictionary {
    entries: Vec<(Vec<u8>, Element)>,
}

impl Dictionary {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn insert(&mut self, key: impl Into<Vec<u8>>, value: Element) {
        self.entries.push((key.into(), value));
    }

    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<&Element> {
        let key = key.as_ref();
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn remove(&mut self, key: impl AsRef<[u8]>) -> Option<Element> {
        let key = key.as_ref();
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &Element)> {
        self.entries.iter().map(|(key, value)| (key.as_slice(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<Vec<u8>>> FromIterator<(K, Element)> for Dictionary {
    fn from_iter<T: IntoIterator<Item = (K, Element)>>(iter: T) -> Self {
        Dictionary {
            entries: iter.into_iter().map(|(key, value)| (key.into(), value)).collect(),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The source ended before the element was complete. Decoding may succeed
    /// once more bytes arrive.
    #[error("incomplete bencoded data")]
    Partial,
    /// The source violates the bencoding grammar. More bytes won't help.
    #[error("malformed bencoded data: {0}")]
    Syntax(&'static str),
}

impl ParseError {
    pub fn is_partial(&self) -> bool {
        matches!(self, ParseError::Partial)
    }
}

impl From<ParseError> for io::Error {
    fn from(e: ParseError) -> Self {
        match e {
            ParseError::Partial => io::Error::new(io::ErrorKind::UnexpectedEof, e),
            ParseError::Syntax(_) => io::Error::new(io::ErrorKind::InvalidData, e),
        }
    }
}

const DELIMITER_STRING: u8 = b':';
const PREFIX_INTEGER: u8 = b'i';
const PREFIX_LIST: u8 = b'l';
const PREFIX_DICTIONARY: u8 = b'd';
const SUFFIX_COMMON: u8 = b'e';

fn count_digits(mut number: u64) -> usize {
    let mut digits = 1;
    while number >= 10 {
        number /= 10;
        digits += 1;
    }
    digits
}

fn encoded_string_len(data_len: usize) -> usize {
    count_digits(data_len as u64) + 1 + data_len
}

fn write_element(e: &Element, dest: &mut Vec<u8>) -> io::Result<()> {
    match e {
        Element::Integer(number) => {
            write!(dest, "{}{}{}", PREFIX_INTEGER as char, number, SUFFIX_COMMON as char)?;
        }
        Element::ByteString(data) => {
            write!(dest, "{}{}", data.len(), DELIMITER_STRING as char)?;
            dest.write_all(data)?;
        }
        Element::List(list) => {
            dest.push(PREFIX_LIST);
            for e in list {
                write_element(e, dest)?;
            }
            dest.push(SUFFIX_COMMON);
        }
        Element::Dictionary(dict) => {
            dest.push(PREFIX_DICTIONARY);
            for (key, value) in dict.iter() {
                write!(dest, "{}{}", key.len(), DELIMITER_STRING as char)?;
                dest.write_all(key)?;
                write_element(value, dest)?;
            }
            dest.push(SUFFIX_COMMON);
        }
    };
    Ok(())
}

fn read_element(src: &[u8]) -> Result<(Element, &[u8]), ParseError> {
    let first_byte = src.first().ok_or(ParseError::Partial)?;
    match *first_byte {
        b'0'..=b'9' => {
            let (data, rest) = read_string(src)?;
            Ok((Element::ByteString(data), rest))
        }
        PREFIX_INTEGER => read_integer(src),
        PREFIX_LIST => read_list(src),
        PREFIX_DICTIONARY => read_dictionary(src),
        _ => Err(ParseError::Syntax("invalid element prefix")),
    }
}

fn read_integer(src: &[u8]) -> Result<(Element, &[u8]), ParseError> {
    // caller has already matched the 'i' prefix
    let rest = &src[1..];

    // a missing 'e' means the digits haven't fully arrived yet
    let end = rest.iter().position(|b| *b == SUFFIX_COMMON).ok_or(ParseError::Partial)?;
    let number_text =
        str::from_utf8(&rest[..end]).map_err(|_| ParseError::Syntax("integer is not ascii"))?;
    let number =
        number_text.parse::<i64>().map_err(|_| ParseError::Syntax("malformed integer"))?;

    Ok((Element::Integer(number), &rest[end + 1..]))
}

fn read_string(src: &[u8]) -> Result<(Vec<u8>, &[u8]), ParseError> {
    let mut index = 0;
    loop {
        match src.get(index) {
            None => return Err(ParseError::Partial),
            Some(&DELIMITER_STRING) => break,
            Some(b) if b.is_ascii_digit() => index += 1,
            Some(_) => return Err(ParseError::Syntax("non-digit in string length")),
        }
    }
    let size_text = str::from_utf8(&src[..index])
        .map_err(|_| ParseError::Syntax("string length is not ascii"))?;
    let size =
        size_text.parse::<usize>().map_err(|_| ParseError::Syntax("malformed string length"))?;

    let rest = &src[index + 1..];
    // a declared length past the end of the source is not an error, the data
    // simply hasn't arrived yet
    let data = rest.get(..size).ok_or(ParseError::Partial)?;

    Ok((Vec::from(data), &rest[size..]))
}

fn read_list(src: &[u8]) -> Result<(Element, &[u8]), ParseError> {
    let mut rest = &src[1..];

    let mut list = Vec::new();
    loop {
        match rest.first() {
            None => return Err(ParseError::Partial),
            Some(&SUFFIX_COMMON) => return Ok((Element::List(list), &rest[1..])),
            Some(_) => {
                let (element, new_rest) = read_element(rest)?;
                list.push(element);
                rest = new_rest;
            }
        }
    }
}

fn read_dictionary(src: &[u8]) -> Result<(Element, &[u8]), ParseError> {
    let mut rest = &src[1..];

    let mut dict = Dictionary::new();
    loop {
        match rest.first() {
            None => return Err(ParseError::Partial),
            Some(&SUFFIX_COMMON) => return Ok((Element::Dictionary(dict), &rest[1..])),
            Some(b) if b.is_ascii_digit() => {
                let (key, new_rest) = read_string(rest)?;
                let (value, new_rest) = read_element(new_rest)?;
                dict.insert(key, value);
                rest = new_rest;
            }
            Some(_) => return Err(ParseError::Syntax("dictionary key is not a byte string")),
        }
    }
}
