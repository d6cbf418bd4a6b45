use matchcore::model::{JobPosting, StudentProfile};
use matchcore::Normalizer;
use serde_json::json;

#[test]
fn it_normalizes_unicode_and_punctuation() {
    let toks = Normalizer::default().tokenize("Café-Ops: Node.js & C++, ＦＵＬＬ-time!");
    assert_eq!(toks, vec!["caféops", "nodejs", "c", "fulltime"]);
}

#[test]
fn it_filters_stopwords() {
    let words = Normalizer::default().tokenize("The quick brown fox and the lazy dog");
    assert!(!words.contains(&"the".to_string()));
    assert!(!words.contains(&"and".to_string()));
    assert_eq!(words.len(), 5);
}

#[test]
fn custom_stopwords_replace_defaults() {
    let n = Normalizer::new(["intern"], false);
    assert_eq!(n.tokenize("the intern"), vec!["the"]);
}

#[test]
fn job_fields_in_order() {
    let job = JobPosting::from_value(json!({
        "title": "Frontend Intern",
        "company": "Acme",
        "domain": "Software",
        "required_skills": ["React"],
        "preferred_skills": ["TypeScript"],
        "description": "Build the UI.",
        "location": "Remote"
    }))
    .unwrap();
    let toks = Normalizer::default().normalize(&job);
    assert_eq!(toks, vec!["frontend", "intern", "software", "react", "typescript", "build", "ui"]);
}

#[test]
fn student_uses_interests_skills_and_preferences() {
    let student: StudentProfile = serde_json::from_value(json!({
        "first_name": "Ada",
        "last_name": "Lovelace",
        "interests": ["Machine Learning"],
        "skills": ["Python"],
        "job_preferences": {"interests": ["frontend"], "work_type": "Internship", "remote": true},
        "gpa": 3.9
    }))
    .unwrap();
    let toks = Normalizer::default().normalize(&student);
    assert_eq!(toks, vec!["machine", "learning", "python", "frontend", "internship"]);
}

#[test]
fn empty_record_yields_no_tokens() {
    let student = StudentProfile::default();
    assert!(Normalizer::default().normalize(&student).is_empty());
}

#[test]
fn deterministic() {
    let n = Normalizer::default();
    let text = "Senior Rust engineer, async, tokio, distributed systems";
    assert_eq!(n.tokenize(text), n.tokenize(text));
}
