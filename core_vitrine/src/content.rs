use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use vitrine_schema::{PhotoId, PhotoRef, ReviewId, ReviewRecord};

/// Embedded catalog: the Starling studio reviews and showcase photos.
pub const BUILTIN_CONTENT_LIBRARY: &str = include_str!("data/content_library.json");

#[derive(Debug, Deserialize)]
struct ContentCatalog {
    reviews: Vec<ReviewRecord>,
    photos: Vec<PhotoId>,
}

/// Immutable, pre-partitioned source data for one grid.
///
/// Reviews are split into `with_text` / `stars_only` index lists at
/// construction; the pools never change after that.
#[derive(Debug, Clone)]
pub struct ContentLibrary {
    reviews: Vec<ReviewRecord>,
    with_text: Vec<usize>,
    stars_only: Vec<usize>,
    photos: Vec<PhotoRef>,
}

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("content catalog parse failed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("content catalog has no reviews")]
    EmptyReviews,
    #[error("content catalog has no photos")]
    EmptyPhotos,
    #[error("duplicate identity '{0}' in content catalog")]
    DuplicateIdentity(String),
    #[error("review '{id}' has rating {rating}, expected 1..=5")]
    RatingOutOfRange { id: ReviewId, rating: u8 },
}

impl ContentLibrary {
    /// The embedded catalog shipped with the engine.
    pub fn builtin() -> Arc<Self> {
        Arc::new(
            Self::from_json_str(BUILTIN_CONTENT_LIBRARY)
                .expect("builtin content catalog is valid"),
        )
    }

    pub fn from_json_str(json: &str) -> Result<Self, ContentError> {
        let catalog: ContentCatalog = serde_json::from_str(json)?;
        let photos = catalog
            .photos
            .into_iter()
            .map(|public_id| PhotoRef { public_id })
            .collect();
        Self::from_parts(catalog.reviews, photos)
    }

    pub fn from_parts(
        reviews: Vec<ReviewRecord>,
        photos: Vec<PhotoRef>,
    ) -> Result<Self, ContentError> {
        if reviews.is_empty() {
            return Err(ContentError::EmptyReviews);
        }
        if photos.is_empty() {
            return Err(ContentError::EmptyPhotos);
        }

        let mut seen_reviews = HashSet::new();
        for record in &reviews {
            if !seen_reviews.insert(record.id.clone()) {
                return Err(ContentError::DuplicateIdentity(record.id.0.clone()));
            }
            if record.rating == 0 || record.rating > 5 {
                return Err(ContentError::RatingOutOfRange {
                    id: record.id.clone(),
                    rating: record.rating,
                });
            }
        }
        let mut seen_photos = HashSet::new();
        for photo in &photos {
            if !seen_photos.insert(photo.public_id.clone()) {
                return Err(ContentError::DuplicateIdentity(photo.public_id.0.clone()));
            }
        }

        let mut with_text = Vec::new();
        let mut stars_only = Vec::new();
        for (index, record) in reviews.iter().enumerate() {
            if record.has_text() {
                with_text.push(index);
            } else {
                stars_only.push(index);
            }
        }

        Ok(Self {
            reviews,
            with_text,
            stars_only,
            photos,
        })
    }

    pub fn review(&self, index: usize) -> &ReviewRecord {
        &self.reviews[index]
    }

    pub fn reviews(&self) -> &[ReviewRecord] {
        &self.reviews
    }

    pub fn review_count(&self) -> usize {
        self.reviews.len()
    }

    /// Indices into `reviews` for records carrying body text.
    pub fn with_text(&self) -> &[usize] {
        &self.with_text
    }

    /// Indices into `reviews` for star-only records.
    pub fn stars_only(&self) -> &[usize] {
        &self.stars_only
    }

    pub fn photos(&self) -> &[PhotoRef] {
        &self.photos
    }

    pub fn photo_count(&self) -> usize {
        self.photos.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_schema::ReviewSource;

    fn record(id: &str, body: Option<&str>) -> ReviewRecord {
        ReviewRecord {
            id: ReviewId(id.to_string()),
            display_name: "Client".to_string(),
            rating: 5,
            avatar: None,
            source: ReviewSource::Google,
            body: body.map(str::to_string),
        }
    }

    fn photo(public_id: &str) -> PhotoRef {
        PhotoRef {
            public_id: PhotoId(public_id.to_string()),
        }
    }

    #[test]
    fn builtin_catalog_partitions_to_expected_counts() {
        let library = ContentLibrary::builtin();
        assert_eq!(library.review_count(), 42);
        assert_eq!(library.with_text().len(), 26);
        assert_eq!(library.stars_only().len(), 16);
        assert_eq!(library.photo_count(), 7);
    }

    #[test]
    fn whitespace_only_body_counts_as_star_only() {
        let library = ContentLibrary::from_parts(
            vec![record("a", Some("  ")), record("b", Some("lovely"))],
            vec![photo("p0")],
        )
        .expect("valid");
        assert_eq!(library.stars_only(), &[0]);
        assert_eq!(library.with_text(), &[1]);
    }

    #[test]
    fn rejects_duplicate_review_ids() {
        let err = ContentLibrary::from_parts(
            vec![record("a", None), record("a", Some("again"))],
            vec![photo("p0")],
        )
        .unwrap_err();
        assert!(matches!(err, ContentError::DuplicateIdentity(id) if id == "a"));
    }

    #[test]
    fn rejects_duplicate_photo_ids() {
        let err =
            ContentLibrary::from_parts(vec![record("a", None)], vec![photo("p0"), photo("p0")])
                .unwrap_err();
        assert!(matches!(err, ContentError::DuplicateIdentity(id) if id == "p0"));
    }

    #[test]
    fn rejects_empty_pools_and_bad_ratings() {
        assert!(matches!(
            ContentLibrary::from_parts(Vec::new(), vec![photo("p0")]),
            Err(ContentError::EmptyReviews)
        ));
        assert!(matches!(
            ContentLibrary::from_parts(vec![record("a", None)], Vec::new()),
            Err(ContentError::EmptyPhotos)
        ));

        let mut bad = record("a", None);
        bad.rating = 6;
        assert!(matches!(
            ContentLibrary::from_parts(vec![bad], vec![photo("p0")]),
            Err(ContentError::RatingOutOfRange { rating: 6, .. })
        ));
    }
}
