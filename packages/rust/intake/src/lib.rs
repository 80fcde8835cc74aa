//! Input handling for the registration conversation.
//!
//! Everything here is pure and synchronous:
//! - [`validators`]: syntactic checks per field
//! - [`phrases`] / [`extract`]: stripping "my team name is …" phrasing
//! - [`classifier`]: answers vs. questions
//! - [`duplicates`]: within-team duplicate detection

pub mod classifier;
pub mod duplicates;
pub mod extract;
pub mod phrases;
pub mod validators;

pub use classifier::looks_like_registration_data;
pub use duplicates::{Comparison, collides_with_members, is_duplicate};
pub use extract::{extract, extract_field};
pub use validators::{
    ACCEPTED_BATCHES, CONFIRMATION_WORDS, index_matches_batch, is_confirmation_word,
    is_valid_batch, is_valid_email, is_valid_index_number, is_valid_name, is_valid_team_name,
};
