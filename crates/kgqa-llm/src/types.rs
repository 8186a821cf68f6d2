//! Output schemas for the schema-constrained backend operations.
//!
//! Each schema is a serde type plus a [`OutputSchema`] description that is
//! rendered into the prompt as format instructions.

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// One field of an output schema.
#[derive(Debug, Clone, Copy)]
pub struct SchemaField {
    pub name: &'static str,
    /// JSON type name (`string`, `boolean`, `array`).
    pub kind: &'static str,
    pub description: &'static str,
    pub required: bool,
}

/// Formal description of a structured output.
#[derive(Debug, Clone, Copy)]
pub struct OutputSchema {
    pub title: &'static str,
    pub fields: &'static [SchemaField],
}

impl OutputSchema {
    /// JSON-schema rendering of this output.
    pub fn to_json_schema(&self) -> serde_json::Value {
        let mut properties = serde_json::Map::new();
        for field in self.fields {
            let mut prop = json!({ "type": field.kind, "description": field.description });
            if field.kind == "array" {
                prop["items"] = json!({ "type": "string" });
            }
            properties.insert(field.name.to_string(), prop);
        }
        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name)
            .collect();

        json!({
            "title": self.title,
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Instructions telling the model how to shape its reply.
    pub fn format_instructions(&self) -> String {
        format!(
            "The output must be a single JSON object that conforms to the JSON schema below. \
             Do not add fields that are not in the schema and do not add any prose.\n\n\
             Here is the output schema:\n```json\n{}\n```",
            self.to_json_schema()
        )
    }
}

/// A type that can be produced by structured generation.
pub trait StructuredOutput: DeserializeOwned + Send {
    fn schema() -> OutputSchema;
}

/// `{translated_content}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslateOutput {
    #[serde(alias = "translatedContent")]
    pub translated_content: String,
}

impl StructuredOutput for TranslateOutput {
    fn schema() -> OutputSchema {
        OutputSchema {
            title: "TranslateOutput",
            fields: &[SchemaField {
                name: "translated_content",
                kind: "string",
                description: "translation of the content into English",
                required: true,
            }],
        }
    }
}

/// `{queries}`: graph mutation statements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementList {
    #[serde(default)]
    pub queries: Vec<String>,
}

impl StructuredOutput for StatementList {
    fn schema() -> OutputSchema {
        OutputSchema {
            title: "StatementList",
            fields: &[SchemaField {
                name: "queries",
                kind: "array",
                description: "self-contained Cypher statements, each creating or merging one node, \
                              one relationship or a small connected subgraph",
                required: true,
            }],
        }
    }
}

/// `{node_id}`: the anchor picked for a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDetection {
    #[serde(alias = "nodeId", deserialize_with = "string_or_number")]
    pub node_id: String,
}

impl StructuredOutput for NodeDetection {
    fn schema() -> OutputSchema {
        OutputSchema {
            title: "NodeDetection",
            fields: &[SchemaField {
                name: "node_id",
                kind: "string",
                description: "the id of exactly one node taken from the provided node list",
                required: true,
            }],
        }
    }
}

/// `{success, answer?}`: a context-bound answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaOutput {
    pub success: bool,
    #[serde(default)]
    pub answer: Option<String>,
}

impl QaOutput {
    /// A "not enough context" result.
    pub fn insufficient() -> Self {
        Self {
            success: false,
            answer: None,
        }
    }
}

impl StructuredOutput for QaOutput {
    fn schema() -> OutputSchema {
        OutputSchema {
            title: "QaOutput",
            fields: &[
                SchemaField {
                    name: "success",
                    kind: "boolean",
                    description: "true only if the context is sufficient to answer the question",
                    required: true,
                },
                SchemaField {
                    name: "answer",
                    kind: "string",
                    description: "a short answer span taken from the context, or null",
                    required: false,
                },
            ],
        }
    }
}

/// `{result}`: semantic-equivalence verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutput {
    pub result: bool,
}

impl StructuredOutput for ValidationOutput {
    fn schema() -> OutputSchema {
        OutputSchema {
            title: "ValidationOutput",
            fields: &[SchemaField {
                name: "result",
                kind: "boolean",
                description: "true if the model answer means the same as any expected answer",
                required: true,
            }],
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "expected string or number, found {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_detection_accepts_numbers_and_camel_case() {
        let a: NodeDetection = serde_json::from_str(r#"{"node_id": "n3"}"#).unwrap();
        let b: NodeDetection = serde_json::from_str(r#"{"nodeId": 42}"#).unwrap();
        assert_eq!(a.node_id, "n3");
        assert_eq!(b.node_id, "42");
    }

    #[test]
    fn qa_output_answer_is_optional() {
        let out: QaOutput = serde_json::from_str(r#"{"success": false}"#).unwrap();
        assert_eq!(out, QaOutput::insufficient());
    }

    #[test]
    fn schema_lists_required_fields() {
        let schema = QaOutput::schema().to_json_schema();
        assert_eq!(schema["required"], json!(["success"]));
        assert_eq!(schema["properties"]["answer"]["type"], "string");
    }

    #[test]
    fn array_fields_declare_items() {
        let schema = StatementList::schema().to_json_schema();
        assert_eq!(schema["properties"]["queries"]["items"]["type"], "string");
        assert!(StatementList::schema()
            .format_instructions()
            .contains("\"queries\""));
    }
}
