//! Rolled-up rating math for contacts and organizations.

use serde::Serialize;

/// Lowest and highest rating a single review may carry.
pub const MIN_RATING: i16 = 1;
pub const MAX_RATING: i16 = 5;

/// A derived `(average_rating, review_count)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RatingSummary {
    pub average_rating: Option<f64>,
    pub review_count: i32,
}

/// Unweighted mean of a contact's own review ratings.
pub fn contact_rating(ratings: &[i16]) -> RatingSummary {
    if ratings.is_empty() {
        return RatingSummary::default();
    }
    let sum: f64 = ratings.iter().map(|&r| f64::from(r)).sum();
    RatingSummary {
        average_rating: Some(sum / ratings.len() as f64),
        review_count: ratings.len() as i32,
    }
}

/// Review-count-weighted mean of the organization's contacts' averages.
///
/// Contacts without an average contribute neither weight nor count.
pub fn organization_rating(contacts: &[RatingSummary]) -> RatingSummary {
    let mut weighted_sum = 0.0;
    let mut total = 0i32;

    for c in contacts {
        if let Some(avg) = c.average_rating {
            if c.review_count > 0 {
                weighted_sum += avg * f64::from(c.review_count);
                total += c.review_count;
            }
        }
    }

    if total == 0 {
        return RatingSummary::default();
    }
    RatingSummary {
        average_rating: Some(weighted_sum / f64::from(total)),
        review_count: total,
    }
}

/// Validate a single review rating.
pub fn validate_rating(rating: i16) -> Result<(), crate::error::CoreError> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(())
    } else {
        Err(crate::error::CoreError::Validation(format!(
            "Rating must be between {MIN_RATING} and {MAX_RATING}, got {rating}"
        )))
    }
}
