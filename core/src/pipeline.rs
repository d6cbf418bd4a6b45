use crate::config::MatchConfig;
use crate::corpus::Corpus;
use crate::error::{MatchError, ValidationError};
use crate::index::RelevanceIndex;
use crate::matcher::{MatchReport, Matcher, StudentBatch};
use crate::model::StudentProfile;
use crate::tokenizer::Normalizer;

/// A corpus with the index built from it, ready to match students.
pub struct Pipeline {
    config: MatchConfig,
    normalizer: Normalizer,
    corpus: Corpus,
    index: RelevanceIndex,
}

impl Pipeline {
    pub fn build(config: MatchConfig, corpus: Corpus) -> Result<Self, ValidationError> {
        config.validate()?;
        let normalizer = config.normalizer();
        let index = RelevanceIndex::build(&corpus, &normalizer, config.bm25());
        tracing::info!(num_docs = index.num_docs(), num_terms = index.num_terms(), "index ready");
        Ok(Self { config, normalizer, corpus, index })
    }

    /// Reuse a stored index. Its BM25 parameters take precedence over `config`;
    /// stopwords and stemming in `config` must match the ones it was built with.
    pub fn from_index(mut config: MatchConfig, corpus: Corpus, index: RelevanceIndex) -> Result<Self, MatchError> {
        index.check_corpus(&corpus)?;
        let normalizer = config.normalizer();
        index.check_normalizer(&normalizer)?;
        let params = index.params();
        config.k1 = params.k1;
        config.b = params.b;
        Ok(Self { config, normalizer, corpus, index })
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn index(&self) -> &RelevanceIndex {
        &self.index
    }

    pub fn matcher(&self, top_n: Option<usize>) -> Matcher<'_> {
        Matcher::from_parts(&self.corpus, &self.index, &self.normalizer, top_n.unwrap_or(self.config.top_n))
    }

    pub fn match_students(&self, students: &[StudentProfile], top_n: Option<usize>) -> MatchReport<'_> {
        self.matcher(top_n).match_students(students)
    }

    pub fn match_batch(&self, batch: &StudentBatch, top_n: Option<usize>) -> MatchReport<'_> {
        self.matcher(top_n).match_batch(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{JobPosting, StudentProfile};
    use crate::StateError;
    use serde_json::json;

    #[test]
    fn from_index_rejects_other_corpus() {
        let a = Corpus::from_jobs(vec![JobPosting::from_value(json!({"title": "Frontend Intern"})).unwrap()]);
        let b = Corpus::from_jobs(vec![JobPosting::from_value(json!({"title": "Data Analyst"})).unwrap()]);
        let built = Pipeline::build(MatchConfig::default(), a).unwrap();
        let index = built.index().clone();
        let err = Pipeline::from_index(MatchConfig::default(), b, index).err().unwrap();
        assert!(matches!(err, MatchError::State(StateError::CorpusMismatch { .. })));
    }

    #[test]
    fn from_index_rejects_other_tokenization() {
        let corpus = Corpus::from_jobs(vec![JobPosting::from_value(json!({"title": "Running Coach"})).unwrap()]);
        let built = Pipeline::build(MatchConfig::default(), corpus.clone()).unwrap();
        let index = built.index().clone();

        let stemmed = MatchConfig { stem: true, ..MatchConfig::default() };
        let err = Pipeline::from_index(stemmed, corpus.clone(), index.clone()).err().unwrap();
        assert!(matches!(err, MatchError::State(StateError::NormalizerMismatch)));

        let fewer_stopwords = MatchConfig { stopwords: vec!["the".into()], ..MatchConfig::default() };
        assert!(Pipeline::from_index(fewer_stopwords, corpus.clone(), index.clone()).is_err());

        let same = Pipeline::from_index(MatchConfig { top_n: 3, ..MatchConfig::default() }, corpus, index).unwrap();
        let student: StudentProfile = serde_json::from_value(json!({"name": "Sam", "interests": ["running"]})).unwrap();
        assert_eq!(same.match_students(&[student], None).result.get("Sam").map(<[_]>::len), Some(1));
    }

    #[test]
    fn invalid_config_rejected() {
        let config = MatchConfig { k1: -0.5, ..MatchConfig::default() };
        assert!(Pipeline::build(config, Corpus::new()).is_err());
    }
}
