/// Metadata codec module
///
/// This module turns the EXIF block of each photo into a tiny record store:
/// - Rating record types and star bucketing (record.rs)
/// - Comment text derived from a verdict (comments.rs)
/// - UserComment payload encoding (user_comment.rs)
/// - Tag mapping on top of little_exif (exif.rs)
/// - The `RecordStore` trait and its EXIF implementation (store.rs)

pub mod comments;
pub mod exif;
pub mod record;
pub mod store;
pub mod user_comment;

pub use comments::Comments;
pub use record::{
    percent_from_stars, stars_from_percent, stars_glyph, Attribute, RatingRecord, Verdict,
};
pub use store::{CodecError, ExifStore, RecordStore};
