//! Core vocabulary for cohort construction.
//!
//! - **identity**: slice and period identities and their canonical flat keys
//! - **period**: calendar frequencies and period labels (`2016-Q1`, `2016-02`)
//! - **offset**: calendar offsets for eligibility thresholds

pub mod error;
pub mod identity;
pub mod offset;
pub mod period;

pub use error::{ModelError, Result};
pub use identity::{FlatKey, Identity, KEY_SEPARATOR, PeriodId, SliceId};
pub use offset::DateOffset;
pub use period::{Frequency, PeriodLabel};
