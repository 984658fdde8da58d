use std::io::Write;
use std::str::FromStr;

use bzip2::write::BzEncoder;
use flate2::write::GzEncoder;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

const GZIP_DEFAULT_LEVEL: u8 = 6;
const LZ4_DEFAULT_LEVEL: u8 = 0;
const ZSTD_DEFAULT_LEVEL: u8 = 0;

lazy_static! {
    static ref COMPRESSION_RE: Regex =
        Regex::new(r"^(?P<algo>[[:alnum:]]+)(?P<lvl>_\d+)?$").unwrap();
}

/// Compression format
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize)]
#[serde(try_from = "String")]
pub enum Compression {
    /// The bzip2 format
    Bzip2,
    /// The gzip format with compression level as associated value
    Gzip(u8),
    /// The lz4 format with compression level as associated value
    Lz4(u8),
    /// The zstd format with compression level as associated value
    Zstd(u8),
}

impl Compression {
    /// Conventional file name extension, including the leading dot
    pub fn extension(&self) -> &'static str {
        match self {
            Compression::Bzip2 => ".bz2",
            Compression::Gzip(_) => ".gz",
            Compression::Lz4(_) => ".lz4",
            Compression::Zstd(_) => ".zst",
        }
    }
}

impl FromStr for Compression {
    type Err = ParseCompressionErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use Compression::*;
        use ParseCompressionErr::*;

        let lower_case = s.to_ascii_lowercase();
        let Some(captures) = COMPRESSION_RE.captures(&lower_case) else {
            return Err(UnknownAlgorithm(s.to_owned()));
        };
        let algo = &captures["algo"];
        let lvl = captures.name("lvl").map(|l| l.as_str());
        let parse_lvl = |max: u8, default: u8| match lvl {
            None => Ok(default),
            Some(l) => match l[1..].parse::<u8>() {
                Ok(lvl) if lvl <= max => Ok(lvl),
                _ => Err(UnsupportedLevel(l[1..].to_owned(), algo.to_owned())),
            },
        };
        match algo {
            "bzip2" | "bz2" => match lvl {
                Some(l) => Err(UnsupportedLevel(l[1..].to_owned(), algo.to_owned())),
                None => Ok(Bzip2),
            },
            "gzip" | "gz" => parse_lvl(9, GZIP_DEFAULT_LEVEL).map(Gzip),
            "lz4" => parse_lvl(16, LZ4_DEFAULT_LEVEL).map(Lz4),
            "zstd" | "zstandard" => parse_lvl(19, ZSTD_DEFAULT_LEVEL).map(Zstd),
            _ => Err(UnknownAlgorithm(s.to_owned())),
        }
    }
}

impl TryFrom<String> for Compression {
    type Error = ParseCompressionErr;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum ParseCompressionErr {
    #[error("Unknown compression algorithm: {0}")]
    UnknownAlgorithm(String),
    #[error("Level {0} not supported for {1} compression")]
    UnsupportedLevel(String, String),
}

/// Convert into a writer that compresses to the given format
pub fn compress_writer<W: Write>(
    writer: W,
    compression: Option<Compression>,
) -> Result<CompressedWriter<W>, std::io::Error> {
    let encoder = match compression {
        Some(Compression::Bzip2) => {
            Encoder::Bzip2(BzEncoder::new(writer, bzip2::Compression::best()))
        }
        Some(Compression::Gzip(lvl)) => {
            Encoder::Gzip(GzEncoder::new(writer, flate2::Compression::new(lvl.into())))
        }
        Some(Compression::Lz4(lvl)) => {
            let encoder = lz4::EncoderBuilder::new()
                .auto_flush(true)
                .level(lvl.into())
                .build(writer)?;
            Encoder::Lz4(encoder)
        }
        Some(Compression::Zstd(lvl)) => Encoder::Zstd(zstd::Encoder::new(writer, lvl.into())?),
        None => Encoder::Plain(writer),
    };
    Ok(CompressedWriter(Some(encoder)))
}

enum Encoder<W: Write> {
    Plain(W),
    Bzip2(BzEncoder<W>),
    Gzip(GzEncoder<W>),
    Lz4(lz4::Encoder<W>),
    Zstd(zstd::Encoder<'static, W>),
}

impl<W: Write> Encoder<W> {
    fn finish(self) -> std::io::Result<W> {
        match self {
            Encoder::Plain(mut w) => {
                w.flush()?;
                Ok(w)
            }
            Encoder::Bzip2(e) => e.finish(),
            Encoder::Gzip(e) => e.finish(),
            Encoder::Lz4(e) => {
                let (w, res) = e.finish();
                res.map(|()| w)
            }
            Encoder::Zstd(e) => e.finish(),
        }
    }

    fn get_mut(&mut self) -> &mut dyn Write {
        match self {
            Encoder::Plain(w) => w,
            Encoder::Bzip2(e) => e,
            Encoder::Gzip(e) => e,
            Encoder::Lz4(e) => e,
            Encoder::Zstd(e) => e,
        }
    }
}

/// Writer compressing to one of the supported formats
///
/// Compressed streams are only complete after [CompressedWriter::finish].
/// A writer that is dropped instead finishes the stream on a best-effort
/// basis and only logs errors.
pub struct CompressedWriter<W: Write>(Option<Encoder<W>>);

impl<W: Write> CompressedWriter<W> {
    /// Write any remaining data and the end of the stream
    pub fn finish(mut self) -> std::io::Result<W> {
        let encoder = self.0.take().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "compressed stream already finished")
        })?;
        encoder.finish()
    }
}

impl<W: Write> Write for CompressedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self.0.as_mut() {
            Some(encoder) => encoder.get_mut().write(buf),
            None => Ok(0),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self.0.as_mut() {
            Some(encoder) => encoder.get_mut().flush(),
            None => Ok(()),
        }
    }
}

impl<W: Write> Drop for CompressedWriter<W> {
    fn drop(&mut self) {
        if let Some(encoder) = self.0.take() {
            if let Err(err) = encoder.finish() {
                log::error!("Failed to finish compressed output: {err}");
            }
        }
    }
}
