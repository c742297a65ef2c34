use std::fs::File;
use std::io::Read;
use std::ops::Deref;
use std::path::Path;

use byteorder::{BigEndian, ByteOrder};
use flate2::read::GzDecoder;
use memmap2::Mmap;
use ndarray::Array2;
use num_traits::ToPrimitive;
use tracing::{debug, warn};

use crate::consts::{FITS_BLOCK_SIZE, FITS_CARD_SIZE};
use crate::error::{Result, SpectraError};
use crate::io::image_extension;

/// One 80-character header record.
///
/// Commentary cards (`COMMENT`, `HISTORY`, blank keyword) carry their text in
/// `comment` and have no value.
#[derive(Clone, Debug, PartialEq)]
pub struct HeaderCard {
    pub keyword: String,
    pub value: Option<String>,
    pub comment: Option<String>,
}

/// Ordered FITS header. Also serves as the mutable image metadata.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FitsHeader {
    cards: Vec<HeaderCard>,
}

impl FitsHeader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cards(&self) -> &[HeaderCard] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Value of the first card with `keyword`.
    pub fn get(&self, keyword: &str) -> Option<&str> {
        self.cards
            .iter()
            .find(|c| c.keyword == keyword)
            .and_then(|c| c.value.as_deref())
    }

    pub fn get_i64(&self, keyword: &str) -> Option<i64> {
        let value = self.get(keyword)?;
        value
            .parse::<i64>()
            .ok()
            .or_else(|| parse_fits_float(value).filter(|v| v.fract() == 0.0).map(|v| v as i64))
    }

    pub fn get_f64(&self, keyword: &str) -> Option<f64> {
        self.get(keyword).and_then(parse_fits_float)
    }

    /// Set `keyword`, replacing the first existing card or appending a new one.
    pub fn set(&mut self, keyword: &str, value: impl Into<String>) {
        let value = Some(value.into());
        match self.cards.iter_mut().find(|c| c.keyword == keyword) {
            Some(card) => card.value = value,
            None => self.cards.push(HeaderCard {
                keyword: keyword.to_string(),
                value,
                comment: None,
            }),
        }
    }

    /// Append a `HISTORY` card. History is additive, never replaced.
    pub fn push_history(&mut self, text: impl Into<String>) {
        self.cards.push(HeaderCard {
            keyword: "HISTORY".to_string(),
            value: None,
            comment: Some(text.into()),
        });
    }

    pub fn history(&self) -> impl Iterator<Item = &str> + '_ {
        self.cards
            .iter()
            .filter(|c| c.keyword == "HISTORY")
            .filter_map(|c| c.comment.as_deref())
    }

    fn push(&mut self, card: HeaderCard) {
        self.cards.push(card);
    }
}

/// Primary HDU of a FITS file: header plus the first 2-D image plane.
#[derive(Clone, Debug)]
pub struct FitsImage {
    pub header: FitsHeader,
    /// Physical pixel values (BSCALE/BZERO applied), shape = (NAXIS2, NAXIS1).
    pub data: Array2<f64>,
}

/// Raw file bytes, either mapped from disk or inflated from gzip.
enum FitsBytes {
    Mapped(Mmap),
    Inflated(Vec<u8>),
}

impl Deref for FitsBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Self::Mapped(mmap) => &mmap[..],
            Self::Inflated(buf) => buf.as_slice(),
        }
    }
}

/// Read the primary image of a `.fit`, `.fits` or `.fits.gz` file.
pub fn read_fits(path: &Path) -> Result<FitsImage> {
    let file = File::open(path).map_err(|e| SpectraError::file(path, e))?;

    let bytes = if image_extension(path) == Some("fits.gz") {
        let mut buf = Vec::new();
        GzDecoder::new(file)
            .read_to_end(&mut buf)
            .map_err(|e| SpectraError::InvalidFits(format!("cannot decompress: {e}")))?;
        FitsBytes::Inflated(buf)
    } else {
        let mmap = unsafe { Mmap::map(&file).map_err(|e| SpectraError::file(path, e))? };
        FitsBytes::Mapped(mmap)
    };

    debug!(path = %path.display(), bytes = bytes.len(), "Read FITS file");
    parse_fits(&bytes)
}

/// Parse an in-memory FITS file.
pub fn parse_fits(buf: &[u8]) -> Result<FitsImage> {
    let (header, data_offset) = parse_header(buf)?;

    if header.get("SIMPLE") != Some("T") {
        return Err(SpectraError::InvalidFits(
            "Primary header does not start with SIMPLE = T".into(),
        ));
    }

    let bitpix = required_int(&header, "BITPIX")?;
    let naxis = required_int(&header, "NAXIS")?;
    if naxis < 2 {
        return Err(SpectraError::InvalidFits(format!(
            "Expected a 2-D image, found NAXIS = {naxis}"
        )));
    }

    let cols = axis_len(&header, 1)?;
    let rows = axis_len(&header, 2)?;
    if rows == 0 || cols == 0 {
        return Err(SpectraError::InvalidDimensions { rows, cols });
    }
    if naxis > 2 {
        let planes = (3..=naxis as usize)
            .map(|n| axis_len(&header, n))
            .collect::<Result<Vec<_>>>()?
            .iter()
            .product::<usize>();
        if planes > 1 {
            warn!(naxis, planes, "FITS image has extra axes; using the first plane");
        }
    }

    let bytes_per_sample = match bitpix {
        8 => 1,
        16 => 2,
        32 | -32 => 4,
        64 | -64 => 8,
        other => {
            return Err(SpectraError::InvalidFits(format!(
                "Unsupported BITPIX {other}"
            )))
        }
    };

    let data_len = rows
        .checked_mul(cols)
        .and_then(|count| count.checked_mul(bytes_per_sample))
        .ok_or_else(|| SpectraError::InvalidFits("Image dimensions too large".into()))?;
    let data_end = data_offset
        .checked_add(data_len)
        .ok_or_else(|| SpectraError::InvalidFits("Image dimensions too large".into()))?;
    if buf.len() < data_end {
        return Err(SpectraError::InvalidFits(format!(
            "File truncated: expected at least {data_end} bytes, got {}",
            buf.len()
        )));
    }
    let raw = &buf[data_offset..data_end];

    let scaling = Scaling {
        bscale: header.get_f64("BSCALE").unwrap_or(1.0),
        bzero: header.get_f64("BZERO").unwrap_or(0.0),
    };

    let samples: Vec<f64> = match bitpix {
        8 => raw.iter().map(|&v| scaling.apply(v)).collect(),
        16 => decode(raw, 2, BigEndian::read_i16, &scaling),
        32 => decode(raw, 4, BigEndian::read_i32, &scaling),
        64 => decode(raw, 8, BigEndian::read_i64, &scaling),
        -32 => decode(raw, 4, BigEndian::read_f32, &scaling),
        _ => decode(raw, 8, BigEndian::read_f64, &scaling),
    };

    let data = Array2::from_shape_vec((rows, cols), samples)
        .map_err(|e| SpectraError::InvalidFits(e.to_string()))?;

    Ok(FitsImage { header, data })
}

struct Scaling {
    bscale: f64,
    bzero: f64,
}

impl Scaling {
    fn apply<T: ToPrimitive>(&self, raw: T) -> f64 {
        let value = raw.to_f64().unwrap_or(f64::NAN);
        self.bzero + self.bscale * value
    }
}

fn decode<T: ToPrimitive>(
    raw: &[u8],
    width: usize,
    read: fn(&[u8]) -> T,
    scaling: &Scaling,
) -> Vec<f64> {
    raw.chunks_exact(width)
        .map(|chunk| scaling.apply(read(chunk)))
        .collect()
}

/// Parse header cards up to `END`. Returns the header and the byte offset of
/// the data unit (the header rounded up to whole blocks).
fn parse_header(buf: &[u8]) -> Result<(FitsHeader, usize)> {
    if buf.len() < FITS_BLOCK_SIZE {
        return Err(SpectraError::InvalidFits(
            "File too small for a FITS header".into(),
        ));
    }

    let mut header = FitsHeader::new();
    for (index, raw) in buf.chunks_exact(FITS_CARD_SIZE).enumerate() {
        let card = parse_card(raw);
        if card.keyword == "END" {
            let header_len = (index + 1) * FITS_CARD_SIZE;
            let blocks = header_len.div_ceil(FITS_BLOCK_SIZE);
            return Ok((header, blocks * FITS_BLOCK_SIZE));
        }
        header.push(card);
    }

    Err(SpectraError::InvalidFits("Missing END card".into()))
}

fn parse_card(raw: &[u8]) -> HeaderCard {
    let text = String::from_utf8_lossy(raw);
    let keyword = text.get(..8).unwrap_or(&text).trim().to_string();

    if text.get(8..10) != Some("= ") {
        let comment = text.get(8..).map(|s| s.trim().to_string());
        return HeaderCard {
            keyword,
            value: None,
            comment: comment.filter(|c| !c.is_empty()),
        };
    }

    let rest = text.get(10..).unwrap_or("");
    let (value, comment) = split_value(rest);
    HeaderCard {
        keyword,
        value: Some(value),
        comment,
    }
}

/// Split the value field of a card into value and trailing comment.
/// Quoted strings may contain `/` and use `''` for a literal quote.
fn split_value(field: &str) -> (String, Option<String>) {
    let trimmed = field.trim_start();

    let (value, remainder) = if let Some(body) = trimmed.strip_prefix('\'') {
        let mut value = String::new();
        let mut chars = body.char_indices().peekable();
        let mut end = body.len();
        while let Some((i, ch)) = chars.next() {
            if ch == '\'' {
                if matches!(chars.peek(), Some((_, '\''))) {
                    value.push('\'');
                    chars.next();
                } else {
                    end = i + 1;
                    break;
                }
            } else {
                value.push(ch);
            }
        }
        (value.trim_end().to_string(), &body[end..])
    } else {
        match trimmed.find('/') {
            Some(pos) => (trimmed[..pos].trim().to_string(), &trimmed[pos..]),
            None => (trimmed.trim().to_string(), ""),
        }
    };

    let comment = remainder
        .trim()
        .strip_prefix('/')
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    (value, comment)
}

/// FITS allows `D` as the exponent marker.
fn parse_fits_float(value: &str) -> Option<f64> {
    value.replace(['D', 'd'], "E").parse::<f64>().ok()
}

fn required_int(header: &FitsHeader, keyword: &str) -> Result<i64> {
    header
        .get_i64(keyword)
        .ok_or_else(|| SpectraError::InvalidFits(format!("Missing or invalid {keyword}")))
}

fn axis_len(header: &FitsHeader, axis: usize) -> Result<usize> {
    let keyword = format!("NAXIS{axis}");
    let len = required_int(header, &keyword)?;
    usize::try_from(len)
        .map_err(|_| SpectraError::InvalidFits(format!("Negative {keyword} = {len}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(text: &str) -> Vec<u8> {
        format!("{text:<80}").into_bytes()
    }

    #[test]
    fn test_parse_value_card_with_comment() {
        let c = parse_card(&card("BITPIX  =                  -32 / bits per pixel"));
        assert_eq!(c.keyword, "BITPIX");
        assert_eq!(c.value.as_deref(), Some("-32"));
        assert_eq!(c.comment.as_deref(), Some("bits per pixel"));
    }

    #[test]
    fn test_parse_quoted_string_with_slash_and_quote() {
        let c = parse_card(&card("OBJECT  = 'M42 / Orion''s'  / target"));
        assert_eq!(c.value.as_deref(), Some("M42 / Orion's"));
        assert_eq!(c.comment.as_deref(), Some("target"));
    }

    #[test]
    fn test_parse_history_card() {
        let c = parse_card(&card("HISTORY dark subtracted"));
        assert_eq!(c.keyword, "HISTORY");
        assert_eq!(c.value, None);
        assert_eq!(c.comment.as_deref(), Some("dark subtracted"));
    }

    #[test]
    fn test_get_f64_accepts_d_exponent() {
        let mut header = FitsHeader::new();
        header.set("BSCALE", "1.5D0");
        assert_eq!(header.get_f64("BSCALE"), Some(1.5));
    }

    #[test]
    fn test_push_history_is_additive() {
        let mut header = FitsHeader::new();
        header.push_history("first");
        header.push_history("second");
        assert_eq!(header.history().collect::<Vec<_>>(), vec!["first", "second"]);
    }
}
