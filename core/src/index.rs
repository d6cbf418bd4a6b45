//! BM25 relevance index over a tokenized job corpus.
//!
//! The index is built once from the full ordered corpus and never mutated; any
//! corpus change means building a new one.

use crate::corpus::Corpus;
use crate::error::{StateError, ValidationError};
use crate::tokenizer::{Normalizer, NormalizerSettings};
use crate::{DocId, TermId};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25Params {
    /// Term frequency saturation.
    pub k1: f64,
    /// Length normalization.
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

impl Bm25Params {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.k1.is_finite() || self.k1 < 0.0 {
            return Err(ValidationError::InvalidConfig(format!("k1 must be a finite value >= 0, got {}", self.k1)));
        }
        if !(0.0..=1.0).contains(&self.b) {
            return Err(ValidationError::InvalidConfig(format!("b must be within [0, 1], got {}", self.b)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub tf: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelevanceIndex {
    params: Bm25Params,
    dictionary: HashMap<String, TermId>,
    df: Vec<u32>,
    postings: Vec<Vec<Posting>>, // indexed by term id, sorted by doc_id
    doc_lengths: Vec<u32>,
    num_docs: u32,
    avgdl: f64,
    corpus_fingerprint: String,
    /// `None` when built from pre-tokenized documents.
    normalizer: Option<NormalizerSettings>,
}

impl RelevanceIndex {
    /// Tokenize every posting of `corpus` and build the index.
    pub fn build(corpus: &Corpus, normalizer: &Normalizer, params: Bm25Params) -> Self {
        let docs: Vec<Vec<String>> = corpus.jobs().par_iter().map(|job| normalizer.normalize(job)).collect();
        let mut index = Self::from_tokens(&docs, params);
        index.corpus_fingerprint = corpus.fingerprint();
        index.normalizer = Some(normalizer.settings());
        index
    }

    /// Build from already tokenized documents; position is the document id.
    pub fn from_tokens<D: AsRef<[String]>>(docs: &[D], params: Bm25Params) -> Self {
        let mut dictionary: HashMap<String, TermId> = HashMap::new();
        let mut df: Vec<u32> = Vec::new();
        let mut postings: Vec<Vec<Posting>> = Vec::new();
        let mut doc_lengths: Vec<u32> = Vec::with_capacity(docs.len());
        let mut total_len: u64 = 0;

        for (doc_id, tokens) in docs.iter().enumerate() {
            let tokens = tokens.as_ref();
            let doc_id = doc_id as DocId;
            doc_lengths.push(tokens.len() as u32);
            total_len += tokens.len() as u64;

            // tf per term, in first-seen order
            let mut tf_counts: Vec<(TermId, u32)> = Vec::new();
            let mut slot: HashMap<TermId, usize> = HashMap::new();
            for term in tokens {
                let tid = match dictionary.get(term) {
                    Some(&tid) => tid,
                    None => {
                        let tid = df.len() as TermId;
                        dictionary.insert(term.clone(), tid);
                        df.push(0);
                        postings.push(Vec::new());
                        tid
                    }
                };
                match slot.get(&tid) {
                    Some(&i) => tf_counts[i].1 += 1,
                    None => {
                        slot.insert(tid, tf_counts.len());
                        tf_counts.push((tid, 1));
                    }
                }
            }
            for (tid, tf) in tf_counts {
                df[tid as usize] += 1;
                postings[tid as usize].push(Posting { doc_id, tf });
            }
        }

        let num_docs = docs.len() as u32;
        let avgdl = if num_docs == 0 { 0.0 } else { total_len as f64 / num_docs as f64 };
        tracing::debug!(num_docs, num_terms = dictionary.len(), avgdl, "built relevance index");
        Self { params, dictionary, df, postings, doc_lengths, num_docs, avgdl, corpus_fingerprint: String::new(), normalizer: None }
    }

    pub fn params(&self) -> Bm25Params {
        self.params
    }

    pub fn num_docs(&self) -> u32 {
        self.num_docs
    }

    pub fn num_terms(&self) -> usize {
        self.dictionary.len()
    }

    pub fn avgdl(&self) -> f64 {
        self.avgdl
    }

    pub fn corpus_fingerprint(&self) -> &str {
        &self.corpus_fingerprint
    }

    /// Number of documents containing `term`; 0 when the term is out of vocabulary.
    pub fn doc_freq(&self, term: &str) -> u32 {
        self.dictionary.get(term).map(|&tid| self.df[tid as usize]).unwrap_or(0)
    }

    /// Fails with [`StateError::CorpusMismatch`] unless the index was built from `corpus`.
    pub fn check_corpus(&self, corpus: &Corpus) -> Result<(), StateError> {
        let found = corpus.fingerprint();
        if found != self.corpus_fingerprint {
            return Err(StateError::CorpusMismatch { expected: self.corpus_fingerprint.clone(), found });
        }
        Ok(())
    }

    /// Fails with [`StateError::NormalizerMismatch`] unless `normalizer` tokenizes
    /// the way the documents were tokenized at build time.
    pub fn check_normalizer(&self, normalizer: &Normalizer) -> Result<(), StateError> {
        match &self.normalizer {
            Some(settings) if *settings != normalizer.settings() => Err(StateError::NormalizerMismatch),
            _ => Ok(()),
        }
    }

    /// `ln((N - n(t) + 0.5) / (n(t) + 0.5) + 1)`
    fn idf(&self, df: u32) -> f64 {
        let n = self.num_docs as f64;
        let df = df as f64;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    fn term_weight(&self, idf: f64, tf: u32, doc_id: DocId) -> f64 {
        let Bm25Params { k1, b } = self.params;
        let tf = tf as f64;
        let dl = self.doc_lengths[doc_id as usize] as f64;
        let len_norm = if self.avgdl > 0.0 { dl / self.avgdl } else { 0.0 };
        idf * (tf * (k1 + 1.0)) / (tf + k1 * (1.0 - b + b * len_norm))
    }

    /// BM25 score of one document. Every query token contributes, duplicates included.
    pub fn score<S: AsRef<str>>(&self, query: &[S], doc_id: DocId) -> Result<f64, StateError> {
        if doc_id >= self.num_docs {
            return Err(StateError::UnknownDocument { doc_id, num_docs: self.num_docs });
        }
        let mut score = 0.0;
        for term in query {
            let Some(&tid) = self.dictionary.get(term.as_ref()) else { continue };
            let plist = &self.postings[tid as usize];
            if let Ok(i) = plist.binary_search_by_key(&doc_id, |p| p.doc_id) {
                score += self.term_weight(self.idf(self.df[tid as usize]), plist[i].tf, doc_id);
            }
        }
        Ok(score)
    }

    /// Every document with its score, highest first. Ties keep corpus order.
    pub fn rank<S: AsRef<str>>(&self, query: &[S]) -> Vec<(DocId, f64)> {
        let mut scores = vec![0.0f64; self.num_docs as usize];
        for term in query {
            let Some(&tid) = self.dictionary.get(term.as_ref()) else { continue };
            let idf = self.idf(self.df[tid as usize]);
            for p in &self.postings[tid as usize] {
                scores[p.doc_id as usize] += self.term_weight(idf, p.tf, p.doc_id);
            }
        }
        let mut ranked: Vec<(DocId, f64)> = scores.into_iter().enumerate().map(|(i, s)| (i as DocId, s)).collect();
        // stable: equal scores stay in corpus order
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}
