/// Mapping between a RatingRecord and EXIF tags
///
/// Rating and RatingPercent are the Windows rating tags in IFD0 (0x4746, 0x4749).
/// little_exif has no named variant for them, so they go through the
/// `Unknown*` variants with an explicit tag id and group.
/// The verdict lives in the Exif IFD UserComment as a JSON document.

use little_exif::exif_tag::ExifTag;
use little_exif::ifd::ExifTagGroup;
use little_exif::metadata::Metadata;

use super::record::{RatingRecord, Verdict};
use super::user_comment;

pub const RATING_TAG: u16 = 0x4746;
pub const RATING_PERCENT_TAG: u16 = 0x4749;

const EXIF_HEADER: &[u8] = b"Exif\0\0";
const APP1: u8 = 0xE1;

/// Pull the rating record out of a parsed tag block
///
/// Missing or malformed fields come back as `None`, never as an error.
pub fn record_from_metadata(metadata: &Metadata) -> RatingRecord {
    let stars = read_integer(metadata, RATING_TAG).filter(|s| (1..=5).contains(s));
    let percent = read_integer(metadata, RATING_PERCENT_TAG).filter(|p| *p <= 100);
    let verdict = read_verdict(metadata);

    RatingRecord {
        stars: stars.map(|s| s as u8),
        percent: percent.map(|p| p as u8),
        verdict,
    }
}

/// Overwrite the rating fields present in `record`, leaving every other tag alone
pub fn apply_record(metadata: &mut Metadata, record: &RatingRecord) -> Result<(), serde_json::Error> {
    // Serialize first so a failure leaves the tag block untouched
    let comment = match &record.verdict {
        Some(verdict) => Some(user_comment::encode(&verdict.to_json()?)),
        None => None,
    };

    if let Some(stars) = record.stars {
        metadata.set_tag(ExifTag::UnknownINT16U(
            vec![stars as u16],
            RATING_TAG,
            ExifTagGroup::GENERIC,
        ));
    }
    if let Some(percent) = record.percent {
        metadata.set_tag(ExifTag::UnknownINT16U(
            vec![percent as u16],
            RATING_PERCENT_TAG,
            ExifTagGroup::GENERIC,
        ));
    }
    if let Some(comment) = comment {
        metadata.set_tag(ExifTag::UserComment(comment));
    }

    Ok(())
}

/// Integer tag as written by any common tool (SHORT, LONG or BYTE)
fn read_integer(metadata: &Metadata, tag: u16) -> Option<u32> {
    let candidates = [
        ExifTag::UnknownINT16U(Vec::new(), tag, ExifTagGroup::GENERIC),
        ExifTag::UnknownINT32U(Vec::new(), tag, ExifTagGroup::GENERIC),
        ExifTag::UnknownINT8U(Vec::new(), tag, ExifTagGroup::GENERIC),
    ];

    candidates.iter().find_map(|candidate| {
        metadata.get_tag(candidate).find_map(|found| match found {
            ExifTag::UnknownINT16U(values, _, _) => values.first().map(|v| *v as u32),
            ExifTag::UnknownINT32U(values, _, _) => values.first().copied(),
            ExifTag::UnknownINT8U(values, _, _) => values.first().map(|v| *v as u32),
            _ => None,
        })
    })
}

fn read_verdict(metadata: &Metadata) -> Option<Verdict> {
    let bytes = metadata
        .get_tag(&ExifTag::UserComment(Vec::new()))
        .find_map(|found| match found {
            ExifTag::UserComment(bytes) => Some(bytes.clone()),
            _ => None,
        })?;

    let text = user_comment::decode(&bytes)?;
    Verdict::from_json(&text).ok()
}

/// TIFF payload of the first APP1 Exif segment of a JPEG, if there is one
pub fn jpeg_exif_payload(bytes: &[u8]) -> Option<&[u8]> {
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        return None;
    }

    let mut pos = 2;
    while pos + 4 <= bytes.len() {
        if bytes[pos] != 0xFF {
            return None;
        }
        match bytes[pos + 1] {
            // Fill byte
            0xFF => {
                pos += 1;
                continue;
            }
            // Markers without a length field
            0x01 | 0xD0..=0xD7 => {
                pos += 2;
                continue;
            }
            // Start of scan or end of image: no more metadata segments
            0xD9 | 0xDA => return None,
            _ => {}
        }

        let length = u16::from_be_bytes([bytes[pos + 2], bytes[pos + 3]]) as usize;
        if length < 2 {
            return None;
        }
        let end = (pos + 2 + length).min(bytes.len());
        let segment = &bytes[pos + 4..end];
        if bytes[pos + 1] == APP1 && segment.starts_with(EXIF_HEADER) {
            return Some(&segment[EXIF_HEADER.len()..]);
        }
        pos += 2 + length;
    }
    None
}

/// Entry count of IFD0 in a TIFF structure
///
/// `None` when the byte order mark, the magic number or the IFD0 offset is broken.
pub fn ifd0_entry_count(tiff: &[u8]) -> Option<u16> {
    let little = if tiff.starts_with(b"II") {
        true
    } else if tiff.starts_with(b"MM") {
        false
    } else {
        return None;
    };

    let u16_at = |at: usize| -> Option<u16> {
        let b = tiff.get(at..at.checked_add(2)?)?;
        Some(if little {
            u16::from_le_bytes([b[0], b[1]])
        } else {
            u16::from_be_bytes([b[0], b[1]])
        })
    };

    if u16_at(2)? != 42 {
        return None;
    }
    let b = tiff.get(4..8)?;
    let offset = if little {
        u32::from_le_bytes([b[0], b[1], b[2], b[3]])
    } else {
        u32::from_be_bytes([b[0], b[1], b[2], b[3]])
    };
    u16_at(offset as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::record::Attribute;

    #[test]
    fn test_empty_block_is_unrated() {
        let metadata = Metadata::new();
        assert_eq!(record_from_metadata(&metadata), RatingRecord::default());
    }

    #[test]
    fn test_apply_then_extract() {
        let mut metadata = Metadata::new();
        let verdict = Verdict::new([0.25; Attribute::COUNT], 0.9);
        let record = RatingRecord::from_verdict(verdict);

        apply_record(&mut metadata, &record).unwrap();
        assert_eq!(record_from_metadata(&metadata), record);
    }

    #[test]
    fn test_out_of_range_integers_are_ignored() {
        let mut metadata = Metadata::new();
        metadata.set_tag(ExifTag::UnknownINT16U(vec![9], RATING_TAG, ExifTagGroup::GENERIC));
        metadata.set_tag(ExifTag::UnknownINT16U(vec![250], RATING_PERCENT_TAG, ExifTagGroup::GENERIC));

        let record = record_from_metadata(&metadata);
        assert_eq!(record.stars, None);
        assert_eq!(record.percent, None);
    }

    #[test]
    fn test_foreign_comment_is_not_a_verdict() {
        let mut metadata = Metadata::new();
        metadata.set_tag(ExifTag::UnknownINT16U(vec![4], RATING_TAG, ExifTagGroup::GENERIC));
        metadata.set_tag(ExifTag::UserComment(user_comment::encode("Shot on holiday")));

        let record = record_from_metadata(&metadata);
        assert_eq!(record.stars, Some(4));
        assert_eq!(record.verdict, None);
    }

    /// SOI, a JFIF APP0, an APP1 Exif segment holding `tiff`, then SOS
    fn jpeg_with_exif(tiff: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x04, 0x4A, 0x46];
        let length = (2 + EXIF_HEADER.len() + tiff.len()) as u16;
        bytes.extend_from_slice(&[0xFF, APP1]);
        bytes.extend_from_slice(&length.to_be_bytes());
        bytes.extend_from_slice(EXIF_HEADER);
        bytes.extend_from_slice(tiff);
        bytes.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x02]);
        bytes
    }

    #[test]
    fn test_exif_payload_found_after_other_segments() {
        let tiff = [b'I', b'I', 42, 0, 8, 0, 0, 0, 0, 0];
        let bytes = jpeg_with_exif(&tiff);
        assert_eq!(jpeg_exif_payload(&bytes), Some(&tiff[..]));

        assert_eq!(jpeg_exif_payload(&[0xFF, 0xD8, 0xFF, 0xDA, 0x00, 0x02]), None);
        assert_eq!(jpeg_exif_payload(b"not a jpeg"), None);
    }

    #[test]
    fn test_ifd0_entry_count() {
        // Little endian, IFD0 at 8 with 3 entries
        assert_eq!(ifd0_entry_count(&[b'I', b'I', 42, 0, 8, 0, 0, 0, 3, 0]), Some(3));
        // Big endian, empty IFD0
        assert_eq!(ifd0_entry_count(&[b'M', b'M', 0, 42, 0, 0, 0, 8, 0, 0]), Some(0));
        // IFD0 offset past the end of the block
        assert_eq!(ifd0_entry_count(&[b'I', b'I', 42, 0, 0xF0, 0xFF, 0, 0, 0, 0]), None);
        assert_eq!(ifd0_entry_count(b"XX*\0"), None);
    }
}
