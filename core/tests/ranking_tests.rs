use matchcore::index::{Bm25Params, RelevanceIndex};
use matchcore::{Corpus, JobPosting, MatchConfig, Pipeline, StudentProfile};
use proptest::prelude::*;
use serde_json::json;

fn toks(s: &str) -> Vec<String> {
    s.split_whitespace().map(str::to_string).collect()
}

fn jobs(titles: &[&str]) -> Corpus {
    Corpus::from_jobs(titles.iter().map(|t| JobPosting::from_value(json!({ "title": t })).unwrap()).collect())
}

#[test]
fn frontend_query_skips_backend_posting() {
    let corpus = jobs(&["Frontend Intern", "Backend Engineer", "Frontend Lead"]);
    let pipeline = Pipeline::build(MatchConfig::default(), corpus).unwrap();
    let index = pipeline.index();
    let s0 = index.score(&["frontend"], 0).unwrap();
    let s1 = index.score(&["frontend"], 1).unwrap();
    let s2 = index.score(&["frontend"], 2).unwrap();
    assert_eq!(s1, 0.0);
    assert!(s0 > s1 && s2 > s1);

    let ranked = index.rank(&["frontend"]);
    let order: Vec<u32> = ranked.iter().map(|&(id, _)| id).collect();
    // equal length and tf: tie keeps corpus order
    assert_eq!(order, vec![0, 2, 1]);
}

#[test]
fn empty_corpus_ranks_nothing() {
    let pipeline = Pipeline::build(MatchConfig::default(), Corpus::new()).unwrap();
    assert!(pipeline.index().rank(&["anything"]).is_empty());

    let student: StudentProfile = serde_json::from_value(json!({"name": "Sam", "interests": ["rust"]})).unwrap();
    let report = pipeline.match_students(&[student], None);
    assert_eq!(report.result.get("Sam").map(<[_]>::len), Some(0));
}

#[test]
fn top_two_of_five() {
    let corpus = jobs(&["Data Intern", "Data Data Analyst", "Web Intern", "Data Engineer", "Data Scientist Data"]);
    let pipeline = Pipeline::build(MatchConfig::default(), corpus).unwrap();
    let student: StudentProfile = serde_json::from_value(json!({"name": "Sam", "interests": ["data"]})).unwrap();
    let report = pipeline.match_students(&[student], Some(2));
    let ranked = report.result.get("Sam").unwrap();
    let full = pipeline.index().rank(&["data"]);
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].doc_id, full[0].0);
    assert_eq!(ranked[1].doc_id, full[1].0);
    assert!(ranked[0].score >= ranked[1].score);
}

#[test]
fn out_of_vocabulary_terms_score_zero() {
    let idx = RelevanceIndex::from_tokens(&[toks("rust web")], Bm25Params::default());
    assert_eq!(idx.score(&["cobol"], 0).unwrap(), 0.0);
    assert_eq!(idx.rank(&["cobol"]), vec![(0, 0.0)]);
}

fn corpus_strategy() -> impl Strategy<Value = Vec<Vec<String>>> {
    let term = prop::sample::select(vec!["rust", "web", "data", "intern", "lead", "cloud"]);
    prop::collection::vec(prop::collection::vec(term.prop_map(String::from), 0..8), 0..12)
}

fn query_strategy() -> impl Strategy<Value = Vec<String>> {
    let term = prop::sample::select(vec!["rust", "web", "data", "sales", "cloud"]);
    prop::collection::vec(term.prop_map(String::from), 0..4)
}

proptest! {
    #[test]
    fn rank_covers_every_document_once(docs in corpus_strategy(), query in query_strategy()) {
        let idx = RelevanceIndex::from_tokens(&docs, Bm25Params::default());
        let ranked = idx.rank(&query);
        prop_assert_eq!(ranked.len(), docs.len());
        let mut ids: Vec<u32> = ranked.iter().map(|&(id, _)| id).collect();
        ids.sort_unstable();
        prop_assert_eq!(ids, (0..docs.len() as u32).collect::<Vec<_>>());
    }

    #[test]
    fn rank_sorted_and_stable(docs in corpus_strategy(), query in query_strategy()) {
        let idx = RelevanceIndex::from_tokens(&docs, Bm25Params::default());
        let ranked = idx.rank(&query);
        for pair in ranked.windows(2) {
            prop_assert!(pair[0].1 >= pair[1].1);
            if pair[0].1 == pair[1].1 {
                prop_assert!(pair[0].0 < pair[1].0);
            }
        }
    }

    #[test]
    fn rebuild_is_bit_identical(docs in corpus_strategy(), query in query_strategy()) {
        let a = RelevanceIndex::from_tokens(&docs, Bm25Params::default()).rank(&query);
        let b = RelevanceIndex::from_tokens(&docs, Bm25Params::default()).rank(&query);
        let bits = |r: &[(u32, f64)]| r.iter().map(|&(id, s)| (id, s.to_bits())).collect::<Vec<_>>();
        prop_assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn no_shared_terms_scores_zero(docs in corpus_strategy(), query in query_strategy()) {
        let idx = RelevanceIndex::from_tokens(&docs, Bm25Params::default());
        for (doc_id, doc) in docs.iter().enumerate() {
            if !query.iter().any(|q| doc.contains(q)) {
                prop_assert_eq!(idx.score(&query, doc_id as u32).unwrap(), 0.0);
            }
        }
    }

    #[test]
    fn higher_tf_never_lowers_score(filler in 1usize..6, extra in 1usize..4, others in corpus_strategy()) {
        // two documents of equal length; the second has `extra` more "rust" in place of filler
        let filler = filler + extra;
        let low: Vec<String> = std::iter::once("rust".to_string())
            .chain(std::iter::repeat("pad".to_string()).take(filler))
            .collect();
        let high: Vec<String> = std::iter::repeat("rust".to_string()).take(1 + extra)
            .chain(std::iter::repeat("pad".to_string()).take(filler - extra))
            .collect();
        let mut docs = vec![low, high];
        docs.extend(others);
        let idx = RelevanceIndex::from_tokens(&docs, Bm25Params::default());
        prop_assert!(idx.score(&["rust"], 1).unwrap() >= idx.score(&["rust"], 0).unwrap());
    }
}
