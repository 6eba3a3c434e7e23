//! Question bank loaded from a JSON file.
//!
//! Expected format:
//!
//! ```json
//! { "questions": [ { "questionText": "...", "realAnswer": "..." } ] }
//! ```

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum BankError {
    #[error("failed to read question bank {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed question bank {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("question bank {} contains no questions", .0.display())]
    Empty(PathBuf),
}

/// A question and its real answer. Questions are identified by their text.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Question {
    #[serde(rename = "questionText")]
    pub text: String,
    #[serde(rename = "realAnswer")]
    pub answer: String,
}

impl Question {
    pub fn new(text: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            answer: answer.into().to_lowercase(),
        }
    }
}

#[derive(Deserialize)]
struct BankFile {
    questions: Vec<Question>,
}

#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    pub fn new(questions: Vec<Question>) -> Self {
        let questions = questions
            .into_iter()
            .map(|question| Question::new(question.text, question.answer))
            .collect();
        Self { questions }
    }

    pub fn load(path: &Path) -> Result<Self, BankError> {
        let contents = std::fs::read_to_string(path).map_err(|source| BankError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: BankFile =
            serde_json::from_str(&contents).map_err(|source| BankError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;
        if file.questions.is_empty() {
            return Err(BankError::Empty(path.to_path_buf()));
        }
        Ok(Self::new(file.questions))
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Number of questions with distinct text, i.e. the most rounds one game can ask.
    pub fn distinct_len(&self) -> usize {
        self.questions
            .iter()
            .map(|question| question.text.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Picks a random question whose text is not in `asked`.
    pub fn pick<R: Rng + ?Sized>(&self, asked: &[String], rng: &mut R) -> Option<Question> {
        let mut candidates: Vec<&Question> = self.questions.iter().collect();
        candidates.shuffle(rng);
        candidates
            .into_iter()
            .find(|question| !asked.contains(&question.text))
            .cloned()
    }
}
