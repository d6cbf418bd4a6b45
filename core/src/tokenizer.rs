use crate::model::{JobPosting, StudentProfile};
use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref PUNCT: Regex = Regex::new(r"[^\p{L}\p{N}\s]+").expect("valid regex");
    pub static ref DEFAULT_STOPWORDS: Vec<&'static str> = vec![
        "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
        "be","because","been","before","being","below","between","both","but","by",
        "can","can't","cannot","could","couldn't",
        "did","didn't","do","does","doesn't","doing","don't","down","during",
        "each","few","for","from","further",
        "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
        "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
        "let's","me","more","most","mustn't","my","myself",
        "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
        "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
        "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
        "under","until","up","very",
        "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
        "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
    ];
}

/// Records that carry free text worth indexing.
pub trait Document {
    /// Text fields in a fixed order.
    fn text_fields(&self) -> Vec<&str>;
}

impl Document for JobPosting {
    fn text_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.title.as_str()];
        fields.extend(self.domain.as_deref());
        fields.extend(self.required_skills.iter().map(String::as_str));
        fields.extend(self.preferred_skills.iter().map(String::as_str));
        fields.extend(self.description.as_deref());
        fields
    }
}

impl Document for StudentProfile {
    fn text_fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = self.interests.iter().map(String::as_str).collect();
        fields.extend(self.skills.iter().map(String::as_str));
        for value in self.job_preferences.values() {
            collect_strings(value, &mut fields);
        }
        fields
    }
}

fn collect_strings<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::String(s) => out.push(s),
        Value::Array(items) => items.iter().for_each(|v| collect_strings(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_strings(v, out)),
        _ => {}
    }
}

/// What decides how a [`Normalizer`] tokenizes. Stored with an index so a
/// query is never tokenized differently from the documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizerSettings {
    /// Normalized stopwords, sorted.
    pub stopwords: Vec<String>,
    pub stem: bool,
}

/// Turns records into token sequences. Deterministic for a given configuration.
pub struct Normalizer {
    stopwords: HashSet<String>,
    stemmer: Option<Stemmer>,
    stem: bool,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(DEFAULT_STOPWORDS.iter().copied(), false)
    }
}

impl Normalizer {
    /// Stopwords go through the same punctuation strip as text, so `don't` filters `dont`.
    pub fn new<I, S>(stopwords: I, stem: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let stopwords = stopwords
            .into_iter()
            .flat_map(|w| clean(w.as_ref()).split_whitespace().map(str::to_string).collect::<Vec<_>>())
            .collect();
        let stemmer = stem.then(|| Stemmer::create(Algorithm::English));
        Self { stopwords, stemmer, stem }
    }

    pub fn settings(&self) -> NormalizerSettings {
        let mut stopwords: Vec<String> = self.stopwords.iter().cloned().collect();
        stopwords.sort_unstable();
        NormalizerSettings { stopwords, stem: self.stem }
    }

    fn is_stopword(&self, token: &str) -> bool {
        self.stopwords.contains(token)
    }

    /// NFKC, lowercase, strip punctuation, split on whitespace, drop stopwords, optionally stem.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let cleaned = clean(text);
        let mut tokens = Vec::new();
        for token in cleaned.split_whitespace() {
            if self.is_stopword(token) {
                continue;
            }
            match &self.stemmer {
                Some(stemmer) => tokens.push(stemmer.stem(token).into_owned()),
                None => tokens.push(token.to_string()),
            }
        }
        tokens
    }

    /// Tokens of every text field of `record`, concatenated in field order.
    pub fn normalize<D: Document + ?Sized>(&self, record: &D) -> Vec<String> {
        let blob = record.text_fields().join(" ");
        self.tokenize(&blob)
    }
}

fn clean(text: &str) -> String {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    PUNCT.replace_all(&normalized, "").into_owned()
}
