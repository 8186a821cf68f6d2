//! Corpus loader: turns a reading-comprehension dataset into one corpus.
//!
//! A SQuAD v1.1 file holds articles made of paragraphs, each with a context
//! and a list of questions. One article becomes one [`Corpus`]: contexts are
//! joined with spaces, ASCII punctuation is stripped, and every question is
//! kept with its reference answers in file order.

use kgqa_core::error::{KgError, Result};
use kgqa_core::types::{Corpus, QuestionRecord};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

#[derive(Debug, Deserialize)]
struct SquadFile {
    data: Vec<SquadArticle>,
}

#[derive(Debug, Deserialize)]
struct SquadArticle {
    title: String,
    paragraphs: Vec<SquadParagraph>,
}

#[derive(Debug, Deserialize)]
struct SquadParagraph {
    context: String,
    #[serde(default)]
    qas: Vec<SquadQuestion>,
}

#[derive(Debug, Deserialize)]
struct SquadQuestion {
    question: String,
    #[serde(default)]
    answers: Vec<SquadAnswer>,
}

#[derive(Debug, Deserialize)]
struct SquadAnswer {
    text: String,
}

/// Load article `article` (default: the first) from a SQuAD-format JSON file.
pub fn load_squad(path: &Path, article: Option<usize>) -> Result<Corpus> {
    let raw = std::fs::read_to_string(path)?;
    let corpus = parse_squad(&raw, article)?;
    info!(
        path = %path.display(),
        article = %corpus.name,
        questions = corpus.questions.len(),
        "Corpus loaded"
    );
    Ok(corpus)
}

/// Parse SQuAD-format JSON text.
pub fn parse_squad(raw: &str, article: Option<usize>) -> Result<Corpus> {
    let file: SquadFile = serde_json::from_str(raw)?;
    let index = article.unwrap_or(0);
    let count = file.data.len();
    let chosen = file.data.into_iter().nth(index).ok_or_else(|| {
        KgError::invalid_config(
            "corpus.article",
            index.to_string(),
            format!("dataset has {} articles", count),
        )
    })?;

    let mut contexts = Vec::with_capacity(chosen.paragraphs.len());
    let mut questions = Vec::new();
    for paragraph in chosen.paragraphs {
        contexts.push(paragraph.context);
        for qa in paragraph.qas {
            questions.push(QuestionRecord::new(
                qa.question,
                qa.answers.into_iter().map(|a| a.text).collect(),
            ));
        }
    }

    Ok(Corpus {
        name: chosen.title,
        text: normalize_text(&contexts.join(" ")),
        questions,
    })
}

/// Load a plain-text file as a corpus with no questions.
pub fn load_text(path: &Path) -> Result<Corpus> {
    let raw = std::fs::read_to_string(path)?;
    let name = path
        .file_stem()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "corpus".to_string());

    Ok(Corpus {
        name,
        text: normalize_text(&raw),
        questions: Vec::new(),
    })
}

/// Load a corpus, choosing the format by file extension.
pub fn load_corpus(path: &Path, article: Option<usize>) -> Result<Corpus> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => load_squad(path, article),
        _ => load_text(path),
    }
}

/// Strip ASCII punctuation and flatten whitespace runs into single spaces.
pub fn normalize_text(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SQUAD: &str = r#"{
        "version": "1.1",
        "data": [
            {
                "title": "Super_Bowl_50",
                "paragraphs": [
                    {
                        "context": "Super Bowl 50 was an American football game. The Denver Broncos defeated the Carolina Panthers 24–10.",
                        "qas": [
                            {
                                "id": "1",
                                "question": "Which team won Super Bowl 50?",
                                "answers": [
                                    {"answer_start": 0, "text": "Denver Broncos"},
                                    {"answer_start": 0, "text": "the Denver Broncos"}
                                ]
                            }
                        ]
                    },
                    {
                        "context": "The game was played at Levi's Stadium,\nin Santa Clara.",
                        "qas": [
                            {"id": "2", "question": "Where was it played?", "answers": [{"text": "Levi's Stadium"}]}
                        ]
                    }
                ]
            },
            {"title": "Warsaw", "paragraphs": [{"context": "Warsaw is the capital of Poland.", "qas": []}]}
        ]
    }"#;

    #[test]
    fn test_first_article_by_default() {
        let corpus = parse_squad(SQUAD, None).unwrap();
        assert_eq!(corpus.name, "Super_Bowl_50");
        assert_eq!(
            corpus.text,
            "Super Bowl 50 was an American football game The Denver Broncos defeated the Carolina Panthers 24–10 The game was played at Levis Stadium in Santa Clara"
        );
        assert_eq!(corpus.questions.len(), 2);
        assert_eq!(
            corpus.questions[0].expected_answers,
            vec!["Denver Broncos", "the Denver Broncos"]
        );
        // Answers keep their punctuation.
        assert_eq!(corpus.questions[1].expected_answers, vec!["Levi's Stadium"]);
    }

    #[test]
    fn test_article_selection() {
        let corpus = parse_squad(SQUAD, Some(1)).unwrap();
        assert_eq!(corpus.name, "Warsaw");
        assert!(corpus.questions.is_empty());

        let err = parse_squad(SQUAD, Some(7)).unwrap_err();
        assert!(matches!(err, KgError::Config(_)));
    }

    #[test]
    fn test_load_from_files() {
        let dir = tempfile::tempdir().unwrap();

        let squad_path = dir.path().join("dev-v1.1.json");
        std::fs::write(&squad_path, SQUAD).unwrap();
        let corpus = load_corpus(&squad_path, None).unwrap();
        assert_eq!(corpus.questions.len(), 2);

        let text_path = dir.path().join("notes.txt");
        let mut f = std::fs::File::create(&text_path).unwrap();
        writeln!(f, "Warsaw, the capital!").unwrap();
        let corpus = load_corpus(&text_path, None).unwrap();
        assert_eq!(corpus.name, "notes");
        assert_eq!(corpus.text, "Warsaw the capital");
    }

    #[test]
    fn test_missing_file() {
        let err = load_squad(Path::new("/nonexistent/dev.json"), None).unwrap_err();
        assert!(matches!(err, KgError::Io(_)));
    }
}
