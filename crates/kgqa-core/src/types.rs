//! Shared types used across all kgqa crates.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A scalar value stored on a node or edge property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl PropertyValue {
    /// Borrow the string payload, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Null => write!(f, "null"),
            PropertyValue::Boolean(b) => write!(f, "{}", b),
            PropertyValue::Integer(i) => write!(f, "{}", i),
            PropertyValue::Float(x) => write!(f, "{}", x),
            PropertyValue::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Integer(i)
    }
}

impl From<f64> for PropertyValue {
    fn from(x: f64) -> Self {
        PropertyValue::Float(x)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Boolean(b)
    }
}

/// Property name → value. Ordered so records compare and print deterministically.
pub type Properties = BTreeMap<String, PropertyValue>;

/// A node as reported by a graph store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Store-assigned identifier, unique within the store.
    pub id: String,
    pub labels: Vec<String>,
    /// Property names, always the sorted key list of `properties`.
    pub keys: Vec<String>,
    pub properties: Properties,
}

impl NodeRecord {
    pub fn new(id: impl Into<String>, labels: Vec<String>, properties: Properties) -> Self {
        let keys = properties.keys().cloned().collect();
        Self {
            id: id.into(),
            labels,
            keys,
            properties,
        }
    }

    /// Look up a property by name.
    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Human-readable name: the `name` property, else the first string property, else the id.
    pub fn display_name(&self) -> String {
        if let Some(name) = self.property("name").and_then(PropertyValue::as_str) {
            return name.to_string();
        }
        self.properties
            .values()
            .find_map(PropertyValue::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| self.id.clone())
    }
}

/// A directed, typed relationship between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: String,
    pub target: String,
    pub rel_type: String,
    #[serde(default)]
    pub properties: Properties,
}

/// The nodes found at one radius around an anchor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Neighborhood {
    pub anchor_id: String,
    pub radius: usize,
    pub nodes: Vec<NodeRecord>,
}

impl Neighborhood {
    pub fn new(anchor_id: impl Into<String>, radius: usize, nodes: Vec<NodeRecord>) -> Self {
        Self {
            anchor_id: anchor_id.into(),
            radius,
            nodes,
        }
    }

    /// Node identifiers as a set, for set-equality checks between radii.
    pub fn id_set(&self) -> BTreeSet<&str> {
        self.nodes.iter().map(|n| n.id.as_str()).collect()
    }

    /// Whether both neighborhoods contain exactly the same node identifiers.
    pub fn same_nodes_as(&self, other: &Neighborhood) -> bool {
        self.id_set() == other.id_set()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// A question with its reference answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub question: String,
    #[serde(alias = "answers")]
    pub expected_answers: Vec<String>,
}

impl QuestionRecord {
    pub fn new(question: impl Into<String>, expected_answers: Vec<String>) -> Self {
        Self {
            question: question.into(),
            expected_answers,
        }
    }
}

/// A normalized corpus plus its question set. Immutable for the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Corpus {
    pub name: String,
    /// Normalized text: punctuation stripped, paragraphs joined.
    pub text: String,
    pub questions: Vec<QuestionRecord>,
}

/// How an expansion run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpansionOutcome {
    /// The synthesizer produced an answer.
    Converged,
    /// Two consecutive radii reached the same node set.
    Stalled,
    /// The configured radius ceiling was reached without an answer.
    RadiusExhausted,
}

impl ExpansionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExpansionOutcome::Converged)
    }
}

impl fmt::Display for ExpansionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpansionOutcome::Converged => write!(f, "converged"),
            ExpansionOutcome::Stalled => write!(f, "stalled"),
            ExpansionOutcome::RadiusExhausted => write!(f, "radius exhausted"),
        }
    }
}

/// The result of one retrieval attempt for one question. Not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerAttempt {
    pub question: String,
    pub anchor_id: String,
    /// Radius of the last neighborhood examined.
    pub radius: usize,
    /// Number of neighborhood fetches performed.
    pub iterations: usize,
    pub neighborhood: Vec<NodeRecord>,
    pub answer: Option<String>,
    pub success: bool,
    pub outcome: ExpansionOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, name: &str) -> NodeRecord {
        let mut props = Properties::new();
        props.insert("name".into(), name.into());
        NodeRecord::new(id, vec!["Team".into()], props)
    }

    #[test]
    fn keys_follow_properties() {
        let mut props = Properties::new();
        props.insert("year".into(), 2016i64.into());
        props.insert("name".into(), "Super Bowl 50".into());
        let n = NodeRecord::new("n0", vec!["Event".into()], props);
        assert_eq!(n.keys, vec!["name".to_string(), "year".to_string()]);
        assert_eq!(n.display_name(), "Super Bowl 50");
    }

    #[test]
    fn display_name_falls_back_to_id() {
        let n = NodeRecord::new("n7", vec![], Properties::new());
        assert_eq!(n.display_name(), "n7");
    }

    #[test]
    fn neighborhoods_compare_by_id_set() {
        let a = Neighborhood::new("n0", 1, vec![node("n1", "Broncos"), node("n2", "Panthers")]);
        let b = Neighborhood::new("n0", 2, vec![node("n2", "Panthers"), node("n1", "Broncos")]);
        let c = Neighborhood::new("n0", 3, vec![node("n1", "Broncos")]);
        assert!(a.same_nodes_as(&b));
        assert!(!a.same_nodes_as(&c));
    }

    #[test]
    fn empty_neighborhoods_are_equal() {
        let a = Neighborhood::new("n0", 1, vec![]);
        let b = Neighborhood::new("n0", 2, vec![]);
        assert!(a.same_nodes_as(&b));
    }

    #[test]
    fn question_record_accepts_answers_alias() {
        let q: QuestionRecord =
            serde_json::from_str(r#"{"question": "Who won?", "answers": ["Denver Broncos"]}"#)
                .unwrap();
        assert_eq!(q.expected_answers, vec!["Denver Broncos".to_string()]);
    }
}
