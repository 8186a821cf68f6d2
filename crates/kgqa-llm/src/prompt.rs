//! Prompt templates for the schema-constrained backend operations.
//!
//! Every template carries a task tag so logs and test doubles can tell the
//! operations apart without parsing the prose.

use kgqa_core::types::NodeRecord;

/// A prompt template for LLM requests.
pub trait PromptTemplate {
    /// Short task tag embedded in the prompt.
    fn task(&self) -> &'static str;

    /// Generate the prompt text.
    fn generate(&self) -> String;

    /// Get the system prompt (if any).
    fn system_prompt(&self) -> Option<String> {
        None
    }
}

/// Translate content to English before extraction.
#[derive(Debug, Clone)]
pub struct TranslatePrompt {
    pub content: String,
}

impl TranslatePrompt {
    pub const TASK: &'static str = "translation";

    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

impl PromptTemplate for TranslatePrompt {
    fn task(&self) -> &'static str {
        Self::TASK
    }

    fn generate(&self) -> String {
        format!(
            r#"<Task>{}</Task>
<PrimaryTask>
Translate the text in the Content tag to English. Keep names and numbers unchanged.
</PrimaryTask>
<Content>
{}
</Content>"#,
            Self::TASK,
            self.content
        )
    }
}

/// Extract entities, attributes and relationships as Cypher statements.
#[derive(Debug, Clone)]
pub struct GraphExtractionPrompt {
    pub content: String,
}

impl GraphExtractionPrompt {
    pub const TASK: &'static str = "graph-extraction";

    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

impl PromptTemplate for GraphExtractionPrompt {
    fn task(&self) -> &'static str {
        Self::TASK
    }

    fn system_prompt(&self) -> Option<String> {
        Some(
            "You are an ontology specialist. You identify objects, their attributes and the \
             relationships between them, and you write Cypher that stores them in a graph database."
                .to_string(),
        )
    }

    fn generate(&self) -> String {
        format!(
            r#"<Task>{}</Task>
<PrimaryTask>
Analyze the text in the Content tag. Identify every object, its attributes and the relationships
between objects. Produce Cypher statements that create them in a graph database.
</PrimaryTask>
<Rules>
- Every statement must be self-contained: MERGE the nodes it needs instead of relying on
  variables or ids from another statement.
- Use MERGE for nodes so repeated mentions map to one node. Give every node a `name` property.
- Relationship types are UPPER_SNAKE_CASE verbs, e.g. DEFEATED, LOCATED_IN, PLAYED_FOR.
- Match nodes by inline properties, e.g.
  MATCH (a:Team {{name: 'Denver Broncos'}}), (b:Team {{name: 'Carolina Panthers'}}) MERGE (a)-[:DEFEATED]->(b).
  WHERE may only AND together equalities such as a.name = '...'. No OR, ranges or functions.
- MERGE may be followed by ON CREATE SET / ON MATCH SET with literal values only.
- Only scalar property values (strings, numbers, booleans). No lists, no maps.
- Quote string literals with single quotes and never put an apostrophe inside them.
</Rules>
<Content>
{}
</Content>"#,
            Self::TASK,
            self.content
        )
    }
}

/// Pick the one node a question is about.
#[derive(Debug, Clone)]
pub struct AnchorDetectionPrompt {
    pub question: String,
    pub nodes: Vec<NodeRecord>,
}

impl AnchorDetectionPrompt {
    pub const TASK: &'static str = "anchor-detection";

    pub fn new(question: impl Into<String>, nodes: &[NodeRecord]) -> Self {
        Self {
            question: question.into(),
            nodes: nodes.to_vec(),
        }
    }
}

impl PromptTemplate for AnchorDetectionPrompt {
    fn task(&self) -> &'static str {
        Self::TASK
    }

    fn generate(&self) -> String {
        format!(
            r#"<Task>{}</Task>
<PrimaryTask>
Choose the single node from the Nodes list that the question is about. The answer will be
searched for in the neighborhood of that node. Return its id exactly as written in the list.
</PrimaryTask>
<Question>
{}
</Question>
<Nodes>
{}
</Nodes>"#,
            Self::TASK,
            self.question,
            render_nodes(&self.nodes)
        )
    }
}

/// Answer a question from a neighborhood, or admit the context is insufficient.
#[derive(Debug, Clone)]
pub struct QuestionAnswerPrompt {
    pub question: String,
    pub context: Vec<NodeRecord>,
}

impl QuestionAnswerPrompt {
    pub const TASK: &'static str = "question-answering";

    pub fn new(question: impl Into<String>, context: &[NodeRecord]) -> Self {
        Self {
            question: question.into(),
            context: context.to_vec(),
        }
    }
}

impl PromptTemplate for QuestionAnswerPrompt {
    fn task(&self) -> &'static str {
        Self::TASK
    }

    fn system_prompt(&self) -> Option<String> {
        Some(
            "You answer questions using only the graph context you are given. \
             You never guess."
                .to_string(),
        )
    }

    fn generate(&self) -> String {
        format!(
            r#"<Task>{}</Task>
<PrimaryTask>
Answer the question using ONLY the nodes in the Context tag. If the context does not contain
the answer, set success to false and leave answer null. Keep the answer as short as possible.
</PrimaryTask>
<Question>
{}
</Question>
<Context>
{}
</Context>"#,
            Self::TASK,
            self.question,
            render_nodes(&self.context)
        )
    }
}

/// Judge whether a model answer matches any reference answer.
#[derive(Debug, Clone)]
pub struct AnswerValidationPrompt {
    pub model_answer: String,
    pub expected: Vec<String>,
}

impl AnswerValidationPrompt {
    pub const TASK: &'static str = "answer-validation";

    pub fn new(model_answer: impl Into<String>, expected: &[String]) -> Self {
        Self {
            model_answer: model_answer.into(),
            expected: expected.to_vec(),
        }
    }
}

impl PromptTemplate for AnswerValidationPrompt {
    fn task(&self) -> &'static str {
        Self::TASK
    }

    fn generate(&self) -> String {
        let expected = self
            .expected
            .iter()
            .map(|a| format!("- {}", a))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"<Task>{}</Task>
<PrimaryTask>
Decide whether the model answer means the same thing as at least one of the expected answers.
Paraphrases, extra words and different casing are acceptable; a different fact is not.
</PrimaryTask>
<ModelAnswer>
{}
</ModelAnswer>
<ExpectedAnswers>
{}
</ExpectedAnswers>"#,
            Self::TASK,
            self.model_answer,
            expected
        )
    }
}

/// Render node records as one JSON object per line.
fn render_nodes(nodes: &[NodeRecord]) -> String {
    if nodes.is_empty() {
        return "(no nodes)".to_string();
    }
    nodes
        .iter()
        .map(|n| serde_json::to_string(n).unwrap_or_else(|_| format!("{{\"id\": \"{}\"}}", n.id)))
        .collect::<Vec<_>>()
        .join("\n")
}
