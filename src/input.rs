use std::fmt;
use std::io::{self, Cursor, Read};
use std::net::IpAddr;

use bstr::ByteSlice;

/// Where the addresses to look up come from.
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub enum InputSource {
    /// Newline-delimited addresses read from stdin.
    #[default]
    Stdin,
    /// A single address given on the command line.
    Address(String),
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSource::Address(addr) => write!(f, "{}", addr),
            InputSource::Stdin => write!(f, "<stdin>"),
        }
    }
}

impl InputSource {
    /// Create a new InputSource from the `--ip` argument.
    ///
    /// If the value is "-", stdin is used.
    pub fn from_arg(value: &str) -> Self {
        if value == "-" {
            InputSource::Stdin
        } else {
            InputSource::Address(value.to_string())
        }
    }

    /// Open the input source as a reader.
    pub fn reader(&self) -> InputReader {
        match self {
            InputSource::Stdin => InputReader::Stdin(io::stdin()),
            InputSource::Address(addr) => {
                InputReader::Literal(Cursor::new(format!("{}\n", addr).into_bytes()))
            }
        }
    }
}

/// A reader for input from either stdin or a literal address.
pub enum InputReader {
    /// A reader for stdin.
    Stdin(io::Stdin),
    /// An in-memory line.
    Literal(Cursor<Vec<u8>>),
}

impl Read for InputReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            InputReader::Stdin(ref mut rdr) => rdr.read(buf),
            InputReader::Literal(ref mut rdr) => rdr.read(buf),
        }
    }
}

/// Classification of one input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedLine {
    /// Empty or whitespace only.
    Blank,
    /// Not a syntactically valid IPv4 or IPv6 address.
    Invalid,
    Address(IpAddr),
}

/// Trim a raw line (terminator included) and parse it as an IP address.
///
/// IPv4-mapped IPv6 addresses are reduced to their IPv4 form, so
/// `::ffff:8.8.8.8` is displayed and looked up as `8.8.8.8`.
#[inline]
pub fn parse_line(line: &[u8]) -> ParsedLine {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ParsedLine::Blank;
    }
    match trimmed.to_str().ok().and_then(|s| s.parse::<IpAddr>().ok()) {
        Some(ip) => ParsedLine::Address(ip.to_canonical()),
        None => ParsedLine::Invalid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dash_means_stdin() {
        assert_eq!(InputSource::from_arg("-"), InputSource::Stdin);
        assert_eq!(
            InputSource::from_arg("8.8.8.8"),
            InputSource::Address("8.8.8.8".to_string())
        );
    }

    #[test]
    fn literal_reader_yields_one_line() {
        let mut buf = String::new();
        InputSource::from_arg("2001:db8::1")
            .reader()
            .read_to_string(&mut buf)
            .unwrap();
        assert_eq!(buf, "2001:db8::1\n");
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        assert_eq!(
            parse_line(b"  8.8.8.8 \r\n"),
            ParsedLine::Address("8.8.8.8".parse().unwrap())
        );
        assert_eq!(
            parse_line(b"\t2001:DB8::0001\n"),
            ParsedLine::Address("2001:db8::1".parse().unwrap())
        );
    }

    #[test]
    fn ipv4_mapped_addresses_become_ipv4() {
        assert_eq!(
            parse_line(b"::ffff:8.8.8.8\n"),
            ParsedLine::Address("8.8.8.8".parse().unwrap())
        );
        assert_eq!(
            parse_line(b"::FFFF:c000:0201"),
            ParsedLine::Address("192.0.2.1".parse().unwrap())
        );
        // IPv4-compatible (deprecated) addresses stay IPv6
        assert_eq!(
            parse_line(b"::8.8.8.8"),
            ParsedLine::Address("::808:808".parse().unwrap())
        );
    }

    #[test]
    fn blank_lines() {
        for line in [&b""[..], b"\n", b"   \r\n", b"\t \t"] {
            assert_eq!(parse_line(line), ParsedLine::Blank);
        }
    }

    #[test]
    fn invalid_lines() {
        for line in [
            &b"not-an-ip\n"[..],
            b"999.999.999.999",
            b"1.2.3",
            b"8.8.8.8 extra",
            b"12345::abcd::1",
            b"\xff\xfe8.8.8.8",
        ] {
            assert_eq!(parse_line(line), ParsedLine::Invalid, "{:?}", line.as_bstr());
        }
    }
}
