use crate::corpus::Corpus;
use crate::error::{StateError, ValidationError};
use crate::index::RelevanceIndex;
use crate::model::{JobPosting, StudentKey, StudentProfile};
use crate::tokenizer::Normalizer;
use crate::DocId;
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;
use std::collections::btree_map::{self, BTreeMap};
use std::collections::HashSet;

/// One ranked posting for a student.
#[derive(Debug, Clone, Serialize)]
pub struct JobMatch<'a> {
    pub doc_id: DocId,
    pub score: f64,
    pub job: &'a JobPosting,
}

/// Student key to ranked postings, best first, at most `top_n` each.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct MatchResult<'a> {
    matches: BTreeMap<StudentKey, Vec<JobMatch<'a>>>,
}

#[derive(Serialize)]
struct HandoffJob<'a> {
    #[serde(flatten)]
    job: &'a JobPosting,
    #[serde(skip_serializing_if = "Option::is_none")]
    score: Option<f64>,
}

impl<'a> MatchResult<'a> {
    pub fn get(&self, key: &str) -> Option<&[JobMatch<'a>]> {
        self.matches.get(&StudentKey(key.to_string())).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, StudentKey, Vec<JobMatch<'a>>> {
        self.matches.iter()
    }

    /// JSON object of student key to job records, as consumed by the explanation stage.
    pub fn handoff(&self, include_scores: bool) -> serde_json::Result<Value> {
        let out: BTreeMap<&str, Vec<HandoffJob<'_>>> = self
            .matches
            .iter()
            .map(|(key, jobs)| {
                let jobs = jobs
                    .iter()
                    .map(|m| HandoffJob { job: m.job, score: include_scores.then_some(m.score) })
                    .collect();
                (key.as_str(), jobs)
            })
            .collect();
        serde_json::to_value(out)
    }
}

/// A student that failed validation and was left out of the result.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedStudent {
    pub position: usize,
    pub error: ValidationError,
}

#[derive(Debug, Clone, Default)]
pub struct MatchReport<'a> {
    pub result: MatchResult<'a>,
    pub rejected: Vec<RejectedStudent>,
}

/// Ranks postings of one corpus for any number of students.
pub struct Matcher<'a> {
    corpus: &'a Corpus,
    index: &'a RelevanceIndex,
    normalizer: &'a Normalizer,
    top_n: usize,
}

impl<'a> Matcher<'a> {
    /// Fails when `index` was not built from `corpus` with this `normalizer`'s settings.
    pub fn new(corpus: &'a Corpus, index: &'a RelevanceIndex, normalizer: &'a Normalizer, top_n: usize) -> Result<Self, StateError> {
        index.check_corpus(corpus)?;
        index.check_normalizer(normalizer)?;
        Ok(Self::from_parts(corpus, index, normalizer, top_n))
    }

    pub(crate) fn from_parts(corpus: &'a Corpus, index: &'a RelevanceIndex, normalizer: &'a Normalizer, top_n: usize) -> Self {
        Self { corpus, index, normalizer, top_n }
    }

    /// Best `top_n` postings with a positive score.
    pub fn rank_student(&self, student: &StudentProfile) -> Vec<JobMatch<'a>> {
        let query = self.normalizer.normalize(student);
        if query.is_empty() {
            return Vec::new();
        }
        let corpus = self.corpus;
        self.index
            .rank(&query)
            .into_iter()
            .take_while(|&(_, score)| score > 0.0)
            .take(self.top_n)
            .filter_map(|(doc_id, score)| corpus.get(doc_id).map(|job| JobMatch { doc_id, score, job }))
            .collect()
    }

    pub fn match_students(&self, students: &[StudentProfile]) -> MatchReport<'a> {
        self.match_positioned(students.iter().enumerate(), Vec::new())
    }

    /// Match the profiles of `batch`; records that failed to parse stay rejected.
    pub fn match_batch(&self, batch: &StudentBatch) -> MatchReport<'a> {
        let students = batch.students.iter().map(|(position, student)| (*position, student));
        self.match_positioned(students, batch.rejected.clone())
    }

    /// Validate identities, then rank each accepted student. A student whose key
    /// repeats an earlier one is rejected; the first keeps the key.
    fn match_positioned<'s, I>(&self, students: I, mut rejected: Vec<RejectedStudent>) -> MatchReport<'a>
    where
        I: IntoIterator<Item = (usize, &'s StudentProfile)>,
    {
        let mut seen: HashSet<StudentKey> = HashSet::new();
        let mut accepted: Vec<(StudentKey, &StudentProfile)> = Vec::new();

        for (position, student) in students {
            let error = match student.key() {
                None => ValidationError::MissingIdentity { position },
                Some(key) if seen.contains(&key) => ValidationError::DuplicateIdentity { key: key.0 },
                Some(key) => {
                    seen.insert(key.clone());
                    accepted.push((key, student));
                    continue;
                }
            };
            tracing::warn!(position, %error, "skipping student");
            rejected.push(RejectedStudent { position, error });
        }
        rejected.sort_by_key(|r| r.position);

        let matches: BTreeMap<StudentKey, Vec<JobMatch<'a>>> = accepted
            .into_par_iter()
            .map(|(key, student)| {
                let ranked = self.rank_student(student);
                tracing::debug!(student = %key, matched = ranked.len(), "ranked student");
                (key, ranked)
            })
            .collect();

        MatchReport { result: MatchResult { matches }, rejected }
    }
}

/// Student records parsed one by one, so a malformed record only loses itself.
#[derive(Debug, Clone, Default)]
pub struct StudentBatch {
    students: Vec<(usize, StudentProfile)>,
    rejected: Vec<RejectedStudent>,
}

impl StudentBatch {
    /// An array of records, or a single record.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Array(records) => Self::from_values(records),
            other => Self::from_values(vec![other]),
        }
    }

    pub fn from_values(records: Vec<Value>) -> Self {
        let mut batch = StudentBatch::default();
        for (position, record) in records.into_iter().enumerate() {
            let parsed = if record.is_object() {
                serde_json::from_value::<StudentProfile>(record).map_err(|e| e.to_string())
            } else {
                Err("record is not a JSON object".to_string())
            };
            match parsed {
                Ok(student) => batch.students.push((position, student)),
                Err(reason) => {
                    let error = ValidationError::MalformedStudent { position, reason };
                    tracing::warn!(position, %error, "skipping student");
                    batch.rejected.push(RejectedStudent { position, error });
                }
            }
        }
        batch
    }

    /// Replace `job_preferences.interests` of every parsed profile.
    pub fn set_interests(&mut self, interests: &[String]) {
        for (_, student) in self.students.iter_mut() {
            student.set_interests(interests.to_vec());
        }
    }

    /// Number of records, parsed or not.
    pub fn len(&self) -> usize {
        self.students.len() + self.rejected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn rejected(&self) -> &[RejectedStudent] {
        &self.rejected
    }
}
