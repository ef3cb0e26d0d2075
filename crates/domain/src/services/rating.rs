//! Running rating aggregate.
//!
//! The prompt row stores the sum and count of current ratings; the average is
//! derived from them so updates stay O(1).

use serde::Serialize;

use crate::error::{DomainError, DomainResult};

pub const MIN_STARS: i16 = 1;
pub const MAX_STARS: i16 = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RatingAggregate {
    pub sum: i64,
    pub count: i32,
}

impl RatingAggregate {
    pub fn new(sum: i64, count: i32) -> Self {
        Self { sum, count }
    }

    pub fn average(&self) -> f64 {
        if self.count <= 0 {
            return 0.0;
        }
        self.sum as f64 / f64::from(self.count)
    }

    /// Applies one user's rating. A first rating adds to the count; a re-rating
    /// replaces the previous stars in the sum and leaves the count alone.
    pub fn apply(self, previous: Option<i16>, stars: i16) -> DomainResult<Self> {
        check_stars(stars)?;
        Ok(match previous {
            None => Self {
                sum: self.sum + i64::from(stars),
                count: self.count + 1,
            },
            Some(old) => Self {
                sum: self.sum - i64::from(old) + i64::from(stars),
                count: self.count,
            },
        })
    }

    /// Removes one user's rating.
    pub fn retract(self, previous: i16) -> Self {
        if self.count <= 1 {
            return Self::default();
        }
        Self {
            sum: (self.sum - i64::from(previous)).max(0),
            count: self.count - 1,
        }
    }
}

pub fn check_stars(stars: i16) -> DomainResult<()> {
    if (MIN_STARS..=MAX_STARS).contains(&stars) {
        Ok(())
    } else {
        Err(DomainError::validation(format!(
            "Rating must be between {} and {}",
            MIN_STARS, MAX_STARS
        )))
    }
}
