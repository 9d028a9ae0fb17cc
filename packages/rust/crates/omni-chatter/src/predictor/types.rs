use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Generation input: a single utterance or an ordered conversation slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Sentence {
    Single(String),
    Sequence(Vec<String>),
}

impl Sentence {
    pub fn single(text: impl Into<String>) -> Self {
        Self::Single(text.into())
    }

    pub fn sequence<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Sequence(texts.into_iter().map(Into::into).collect())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Single(text) => text.trim().is_empty(),
            Self::Sequence(texts) => texts.iter().all(|text| text.trim().is_empty()),
        }
    }
}

/// Output of one prediction call.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Text posted to the chat.
    pub text: String,
    /// Full backend output retained for `/blame`.
    pub raw: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    Legacy,
    Seq2Seq,
}

impl ModelKind {
    pub const ALL: [Self; 2] = [Self::Legacy, Self::Seq2Seq];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Seq2Seq => "seq2seq",
        }
    }

    /// Label used in group announcements.
    pub fn display_label(self) -> &'static str {
        match self {
            Self::Legacy => "Legacy",
            Self::Seq2Seq => "S2S",
        }
    }
}

/// Result of one model-version check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelUpdate {
    pub updated: bool,
    pub old_version: String,
    pub current_version: String,
}

impl ModelUpdate {
    pub fn unchanged(version: impl Into<String>) -> Self {
        let version = version.into();
        Self {
            updated: false,
            old_version: version.clone(),
            current_version: version,
        }
    }

    pub fn changed(old_version: impl Into<String>, current_version: impl Into<String>) -> Self {
        Self {
            updated: true,
            old_version: old_version.into(),
            current_version: current_version.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelUpdateReport {
    pub legacy: ModelUpdate,
    pub seq2seq: ModelUpdate,
}

impl ModelUpdateReport {
    pub fn get(&self, kind: ModelKind) -> &ModelUpdate {
        match kind {
            ModelKind::Legacy => &self.legacy,
            ModelKind::Seq2Seq => &self.seq2seq,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::Sentence;

    #[test]
    fn sentence_serializes_as_string_or_list() {
        assert_eq!(
            serde_json::to_value(Sentence::single("hi")).expect("serialize"),
            json!("hi")
        );
        assert_eq!(
            serde_json::to_value(Sentence::sequence(["a", "b"])).expect("serialize"),
            json!(["a", "b"])
        );
    }

    #[test]
    fn blank_sentences_are_empty() {
        assert!(Sentence::single("  ").is_empty());
        assert!(Sentence::sequence(["", " "]).is_empty());
        assert!(!Sentence::sequence(["", "x"]).is_empty());
    }
}
