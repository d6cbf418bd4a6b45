pub mod config;
pub mod corpus;
pub mod error;
pub mod index;
pub mod matcher;
pub mod model;
pub mod persist;
pub mod pipeline;
pub mod tokenizer;

pub use config::MatchConfig;
pub use corpus::{Corpus, LoadIssue};
pub use error::{MatchError, StateError, ValidationError};
pub use index::{Bm25Params, RelevanceIndex};
pub use matcher::{JobMatch, MatchReport, MatchResult, Matcher, RejectedStudent, StudentBatch};
pub use model::{JobPosting, StudentKey, StudentProfile, WorkType};
pub use pipeline::Pipeline;
pub use tokenizer::{Normalizer, NormalizerSettings};

pub type TermId = u32;
pub type DocId = u32;
