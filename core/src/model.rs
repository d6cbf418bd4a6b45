use crate::error::ValidationError;
use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Kind of engagement a posting offers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkType {
    Internship,
    FullTime,
    Other(String),
}

impl WorkType {
    pub fn parse(raw: &str) -> Self {
        let key: String = raw.chars().filter(|c| c.is_alphanumeric()).collect::<String>().to_lowercase();
        match key.as_str() {
            "internship" | "intern" => WorkType::Internship,
            "fulltime" => WorkType::FullTime,
            _ => WorkType::Other(raw.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            WorkType::Internship => "internship",
            WorkType::FullTime => "full-time",
            WorkType::Other(s) => s,
        }
    }
}

impl Serialize for WorkType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for WorkType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(WorkType::parse(&raw))
    }
}

/// A job posting as ingested from the corpus. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub required_skills: Vec<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub preferred_skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_type: Option<WorkType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Fields the matcher does not interpret, kept for the hand-off.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl JobPosting {
    /// Build a posting from a raw record, rejecting records without a title.
    pub fn from_value(value: Value) -> Result<Self, String> {
        if !value.is_object() {
            return Err("record is not a JSON object".into());
        }
        let job: JobPosting = serde_json::from_value(value).map_err(|e| e.to_string())?;
        job.validate().map_err(|e| e.to_string())?;
        Ok(job)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::MissingField { field: "title" });
        }
        Ok(())
    }
}

/// Stable identity of a student within one run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentKey(pub String);

impl StudentKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StudentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub skills: Vec<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub interests: Vec<String>,
    #[serde(default)]
    pub job_preferences: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StudentProfile {
    /// `"{first_name} {last_name}"`, falling back to `name`. `None` when all are blank.
    pub fn key(&self) -> Option<StudentKey> {
        let first = self.first_name.as_deref().unwrap_or("").trim();
        let last = self.last_name.as_deref().unwrap_or("").trim();
        let composite = format!("{first} {last}");
        let composite = composite.trim();
        if !composite.is_empty() {
            return Some(StudentKey(composite.to_string()));
        }
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(|n| StudentKey(n.to_string()))
    }

    /// Replace `job_preferences.interests`.
    pub fn set_interests(&mut self, interests: Vec<String>) {
        let list = interests.into_iter().map(Value::String).collect();
        self.job_preferences.insert("interests".into(), Value::Array(list));
    }
}

/// Split a `+`-separated interests string such as `frontend+developer+intern`.
pub fn parse_interests(input: &str) -> Vec<String> {
    input
        .split('+')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Accept either a JSON list of strings or a single comma-separated string.
fn string_or_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    struct StringOrList;

    impl<'de> Visitor<'de> for StringOrList {
        type Value = Vec<String>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string or a list of strings")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(v.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect())
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut out = Vec::new();
            while let Some(item) = seq.next_element::<String>()? {
                out.push(item);
            }
            Ok(out)
        }
    }

    deserializer.deserialize_any(StringOrList)
}
