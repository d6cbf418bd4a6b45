use crate::error::{MatchError, Result};
use crate::model::JobPosting;
use crate::DocId;
use serde::Serialize;
use serde_json::Value;
use sha1::{Digest, Sha1};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A record that was skipped during loading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadIssue {
    pub source: String,
    /// 1-based line for JSONL, 0-based element for JSON arrays, `None` for whole-file failures.
    pub record: Option<usize>,
    pub reason: String,
}

/// The ordered job postings of one run. Position in `jobs` is the document id.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    jobs: Vec<JobPosting>,
    issues: Vec<LoadIssue>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_jobs(jobs: Vec<JobPosting>) -> Self {
        Self { jobs, issues: Vec::new() }
    }

    /// Load every source in order. Directories are walked in sorted path order.
    pub fn load<P: AsRef<Path>>(sources: &[P]) -> Result<Self> {
        let mut corpus = Corpus::new();
        for source in sources {
            for file in corpus.source_files(source.as_ref()) {
                corpus.load_file(&file)?;
            }
        }
        tracing::info!(num_docs = corpus.len(), skipped = corpus.issues.len(), "loaded job corpus");
        Ok(corpus)
    }

    /// Append records from one JSON or JSONL file.
    pub fn load_file(&mut self, file: &Path) -> Result<()> {
        let source = file.display().to_string();
        let f = File::open(file).map_err(|e| MatchError::io(file, e))?;
        let reader = BufReader::new(f);
        if has_extension(file, "jsonl") {
            // raw bytes: a line that is not valid UTF-8 is one bad record, not a failed load
            for (i, line) in reader.split(b'\n').enumerate() {
                let line = line.map_err(|e| MatchError::io(file, e))?;
                if line.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }
                match serde_json::from_slice::<Value>(&line) {
                    Ok(value) => self.push_value(&source, Some(i + 1), value),
                    Err(e) => self.report(&source, Some(i + 1), e.to_string()),
                }
            }
        } else {
            match serde_json::from_reader::<_, Value>(reader) {
                Ok(value) => self.extend_values(&source, value),
                Err(e) => self.report(&source, None, e.to_string()),
            }
        }
        Ok(())
    }

    /// Append records from an in-memory JSON value: an array of records or a single record.
    pub fn extend_values(&mut self, source: &str, value: Value) {
        match value {
            Value::Array(items) => {
                for (i, item) in items.into_iter().enumerate() {
                    self.push_value(source, Some(i), item);
                }
            }
            other => self.push_value(source, None, other),
        }
    }

    fn push_value(&mut self, source: &str, record: Option<usize>, value: Value) {
        match JobPosting::from_value(value) {
            Ok(job) => self.jobs.push(job),
            Err(reason) => self.report(source, record, reason),
        }
    }

    /// Files under `path`, sorted. Entries the walk cannot read are reported.
    fn source_files(&mut self, path: &Path) -> Vec<PathBuf> {
        if !path.is_dir() {
            return vec![path.to_path_buf()];
        }
        let mut files = Vec::new();
        for entry in WalkDir::new(path) {
            match entry {
                Ok(entry) => {
                    let p = entry.into_path();
                    if p.is_file() && (has_extension(&p, "json") || has_extension(&p, "jsonl")) {
                        files.push(p);
                    }
                }
                Err(e) => {
                    let source = e.path().unwrap_or(path).display().to_string();
                    self.report(&source, None, e.to_string());
                }
            }
        }
        files.sort();
        files
    }

    fn report(&mut self, source: &str, record: Option<usize>, reason: String) {
        tracing::warn!(source, ?record, %reason, "skipping malformed job record");
        self.issues.push(LoadIssue { source: source.to_string(), record, reason });
    }

    pub fn jobs(&self) -> &[JobPosting] {
        &self.jobs
    }

    pub fn get(&self, doc_id: DocId) -> Option<&JobPosting> {
        self.jobs.get(doc_id as usize)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn issues(&self) -> &[LoadIssue] {
        &self.issues
    }

    /// SHA-1 over the canonical JSON of every posting, in corpus order.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha1::new();
        for job in &self.jobs {
            // Serializing a JobPosting cannot fail: all keys are strings.
            let bytes = serde_json::to_vec(job).unwrap_or_default();
            hasher.update((bytes.len() as u64).to_le_bytes());
            hasher.update(&bytes);
        }
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().and_then(OsStr::to_str).is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn malformed_records_are_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("part_1.jsonl");
        fs::write(
            &path,
            "{\"title\": \"Frontend Intern\"}\nnot json\n\n{\"company\": \"NoTitle\"}\n{\"title\": \"Backend Engineer\"}\n",
        )
        .unwrap();
        let corpus = Corpus::load(&[&path]).unwrap();
        let titles: Vec<&str> = corpus.jobs().iter().map(|j| j.title.as_str()).collect();
        assert_eq!(titles, vec!["Frontend Intern", "Backend Engineer"]);
        assert_eq!(corpus.issues().len(), 2);
        assert_eq!(corpus.issues()[0].record, Some(2));
        assert_eq!(corpus.issues()[1].record, Some(4));
    }

    #[test]
    fn invalid_utf8_line_is_one_issue() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("part_1.jsonl");
        let mut bytes = b"{\"title\":\"Frontend Intern\"}\n{\"title\":\"Bad ".to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe]);
        bytes.extend_from_slice(b"\"}\r\n{\"title\":\"Backend Engineer\"}");
        fs::write(&path, bytes).unwrap();
        let corpus = Corpus::load(&[&path]).unwrap();
        let titles: Vec<&str> = corpus.jobs().iter().map(|j| j.title.as_str()).collect();
        assert_eq!(titles, vec!["Frontend Intern", "Backend Engineer"]);
        assert_eq!(corpus.issues().len(), 1);
        assert_eq!(corpus.issues()[0].record, Some(2));
    }

    #[test]
    fn jsonl_extension_is_case_insensitive() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("PART_1.JSONL");
        fs::write(&path, "{\"title\": \"One\"}\n{\"title\": \"Two\"}\n").unwrap();
        let corpus = Corpus::load(&[dir.path()]).unwrap();
        assert_eq!(corpus.len(), 2);
        assert!(corpus.issues().is_empty());
    }

    #[test]
    fn json_file_forms() {
        let dir = tempdir().unwrap();
        let single = dir.path().join("single.json");
        let broken = dir.path().join("broken.json");
        fs::write(&single, json!({"title": "Solo Role"}).to_string()).unwrap();
        fs::write(&broken, "[{\"title\": \"Cut off\"").unwrap();

        let corpus = Corpus::load(&[&single, &broken]).unwrap();
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.jobs()[0].title, "Solo Role");
        assert_eq!(corpus.issues().len(), 1);
        assert_eq!(corpus.issues()[0].record, None);
        assert_eq!(corpus.issues()[0].source, broken.display().to_string());
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_directory_is_reported() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.jsonl"), "{\"title\": \"One\"}\n").unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("b.jsonl"), "{\"title\": \"Two\"}\n").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        // privileged users can still read the directory
        let readable = fs::read_dir(&locked).is_ok();

        let corpus = Corpus::load(&[dir.path()]).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        if readable {
            assert_eq!(corpus.len(), 2);
        } else {
            assert_eq!(corpus.len(), 1);
            assert_eq!(corpus.issues().len(), 1);
            assert_eq!(corpus.issues()[0].record, None);
        }
    }

    #[test]
    fn sources_concatenate_in_order() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("b.json");
        let b = dir.path().join("a.jsonl");
        fs::write(&a, json!([{"title": "One"}, {"title": "Two"}]).to_string()).unwrap();
        fs::write(&b, "{\"title\": \"Three\"}\n").unwrap();
        let corpus = Corpus::load(&[&a, &b]).unwrap();
        let titles: Vec<&str> = corpus.jobs().iter().map(|j| j.title.as_str()).collect();
        assert_eq!(titles, vec!["One", "Two", "Three"]);

        // directory walk is sorted by path: a.jsonl before b.json
        let corpus = Corpus::load(&[dir.path()]).unwrap();
        let titles: Vec<&str> = corpus.jobs().iter().map(|j| j.title.as_str()).collect();
        assert_eq!(titles, vec!["Three", "One", "Two"]);
    }

    #[test]
    fn missing_file_is_fatal() {
        let dir = tempdir().unwrap();
        let err = Corpus::load(&[dir.path().join("absent.jsonl")]).unwrap_err();
        assert!(matches!(err, MatchError::Io { .. }));
    }

    #[test]
    fn fingerprint_tracks_content_and_order() {
        let one = Corpus::from_jobs(vec![JobPosting::from_value(json!({"title": "A"})).unwrap()]);
        let same = Corpus::from_jobs(vec![JobPosting::from_value(json!({"title": "A"})).unwrap()]);
        let other = Corpus::from_jobs(vec![JobPosting::from_value(json!({"title": "B"})).unwrap()]);
        assert_eq!(one.fingerprint(), same.fingerprint());
        assert_ne!(one.fingerprint(), other.fingerprint());
        assert_eq!(one.fingerprint().len(), 40);
    }
}
