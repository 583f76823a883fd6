//! Normalization, matching and evaluation

pub mod normalizer;
pub mod matcher;
pub mod criteria;
pub mod verdict;
pub mod evaluator;
pub mod batch;

pub use batch::{BatchRunner, CancelHandle};
pub use criteria::{Criterion, CriterionKind, CriterionSet};
pub use evaluator::Evaluator;
pub use matcher::{FuzzyMatcher, MatchMethod, MatchResult};
pub use normalizer::{normalize, NormalizedText};
pub use verdict::{DocumentVerdict, VerdictReason};
