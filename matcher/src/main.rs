use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use matchcore::model::parse_interests;
use matchcore::persist::{load_index, load_meta, save_index, save_matches, save_meta, IndexPaths, MetaFile, SNAPSHOT_VERSION};
use matchcore::{Corpus, MatchConfig, Pipeline, StudentBatch};
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "matcher")]
#[command(about = "Rank job postings for student profiles with BM25", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Tuning {
    /// JSON config file (k1, b, top_n, stopwords, stem)
    #[arg(long)]
    config: Option<PathBuf>,
    /// BM25 term frequency saturation
    #[arg(long)]
    k1: Option<f64>,
    /// BM25 length normalization
    #[arg(long)]
    b: Option<f64>,
    /// Postings kept per student
    #[arg(long)]
    top_n: Option<usize>,
}

impl Tuning {
    fn resolve(&self) -> Result<MatchConfig> {
        let mut config = match &self.config {
            Some(path) => MatchConfig::from_file(path)?,
            None => MatchConfig::default(),
        };
        if let Some(k1) = self.k1 { config.k1 = k1; }
        if let Some(b) = self.b { config.b = b; }
        if let Some(top_n) = self.top_n { config.top_n = top_n; }
        config.validate()?;
        Ok(config)
    }

    /// A snapshot fixes BM25 and tokenization; only `top_n` may be overridden.
    fn for_snapshot(&self, mut stored: MatchConfig) -> Result<MatchConfig> {
        if self.config.is_some() || self.k1.is_some() || self.b.is_some() {
            bail!("--config, --k1 and --b cannot be combined with --index; the snapshot was built with k1={} b={}", stored.k1, stored.b);
        }
        if let Some(top_n) = self.top_n { stored.top_n = top_n; }
        Ok(stored)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Match students against the job corpus and emit hand-off JSON
    Match {
        /// Job sources: JSON/JSONL files or directories, in order
        #[arg(long, required = true, num_args = 1..)]
        jobs: Vec<PathBuf>,
        /// Student profile JSON (one object or an array)
        #[arg(long)]
        students: PathBuf,
        /// Interests separated by '+', replacing each student's job_preferences.interests
        #[arg(long)]
        interests: Option<String>,
        /// Reuse an index snapshot instead of building one
        #[arg(long)]
        index: Option<PathBuf>,
        /// Attach scores to the emitted job records
        #[arg(long, default_value_t = false)]
        scores: bool,
        /// Output file; stdout when omitted
        #[arg(long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        tuning: Tuning,
    },
    /// Build an index snapshot for a job corpus
    Index {
        #[arg(long, required = true, num_args = 1..)]
        jobs: Vec<PathBuf>,
        /// Output index directory
        #[arg(long)]
        output: PathBuf,
        #[command(flatten)]
        tuning: Tuning,
    },
    /// Print the metadata of an index snapshot
    Inspect {
        #[arg(long)]
        index: PathBuf,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Match { jobs, students, interests, index, scores, output, tuning } => {
            run_match(&jobs, &students, interests.as_deref(), index.as_deref(), scores, output.as_deref(), &tuning)
        }
        Commands::Index { jobs, output, tuning } => build_index(&jobs, &output, &tuning),
        Commands::Inspect { index } => {
            let meta = load_meta(&IndexPaths::new(&index))?;
            println!("{}", serde_json::to_string_pretty(&meta)?);
            Ok(())
        }
    }
}

fn load_students(path: &Path, interests: Option<&str>) -> Result<StudentBatch> {
    let f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let value: Value = serde_json::from_reader(BufReader::new(f))?;
    let mut batch = StudentBatch::from_value(value);
    if let Some(raw) = interests {
        batch.set_interests(&parse_interests(raw));
    }
    Ok(batch)
}

fn run_match(
    jobs: &[PathBuf],
    students: &Path,
    interests: Option<&str>,
    index: Option<&Path>,
    scores: bool,
    output: Option<&Path>,
    tuning: &Tuning,
) -> Result<()> {
    let pipeline = match index {
        Some(dir) => {
            let paths = IndexPaths::new(dir);
            let config = tuning.for_snapshot(load_meta(&paths)?.config)?;
            Pipeline::from_index(config, Corpus::load(jobs)?, load_index(&paths)?)?
        }
        None => Pipeline::build(tuning.resolve()?, Corpus::load(jobs)?)?,
    };

    let batch = load_students(students, interests)?;
    let report = pipeline.match_batch(&batch, None);
    for rejected in &report.rejected {
        tracing::warn!(position = rejected.position, error = %rejected.error, "student not matched");
    }
    tracing::info!(students = report.result.len(), rejected = report.rejected.len(), "matching complete");

    match output {
        Some(path) => {
            save_matches(path, &report.result, scores)?;
            tracing::info!(output = %path.display(), "wrote matches");
        }
        None => println!("{}", serde_json::to_string_pretty(&report.result.handoff(scores)?)?),
    }
    Ok(())
}

fn build_index(jobs: &[PathBuf], output: &Path, tuning: &Tuning) -> Result<()> {
    let config = tuning.resolve()?;
    let corpus = Corpus::load(jobs)?;
    let pipeline = Pipeline::build(config, corpus)?;
    let paths = IndexPaths::new(output);
    save_index(&paths, pipeline.index())?;
    let meta = MetaFile {
        num_docs: pipeline.index().num_docs(),
        num_terms: pipeline.index().num_terms(),
        created_at: time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339).unwrap_or_else(|_| "".into()),
        version: SNAPSHOT_VERSION,
        corpus_fingerprint: pipeline.corpus().fingerprint(),
        config: pipeline.config().clone(),
    };
    save_meta(&paths, &meta)?;
    tracing::info!(output = %output.display(), num_docs = meta.num_docs, "index snapshot written");
    Ok(())
}
