//! Candidate selection, similarity ranking and reciprocity.

pub mod admirers;
pub mod eligibility;
pub mod reciprocity;
pub mod similarity;

pub use admirers::PendingAdmirerQueue;
pub use eligibility::{CandidateSelector, EligibilityFilter};
pub use reciprocity::{ReciprocityResolver, ResolutionOutcome, SkipReason};
pub use similarity::{cosine_similarity, SimilarityRanker};
