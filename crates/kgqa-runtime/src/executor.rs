//! Statement execution for the in-process stores.
//!
//! A parsed [`Statement`] is evaluated clause by clause over a list of rows,
//! each row binding statement variables to node ids. `MATCH` filters and
//! multiplies rows, `MERGE` and `CREATE` write once per row, `SET` updates the
//! bound nodes. A `MERGE` row runs its `ON CREATE` actions when the merge wrote
//! anything and its `ON MATCH` actions otherwise. A `MATCH` that binds nothing leaves zero rows, so the rest of
//! the statement does nothing.
//!
//! The store decides atomicity: it hands [`apply`] a writer over a scratch
//! copy or a transaction and only commits when `apply` returns `Ok`.

use kgqa_core::error::{StoreError, StoreResult};
use kgqa_core::statement::{
    Assignment, Clause, Direction, MergeClause, NodePattern, Pattern, RelPattern, Statement,
};
use kgqa_core::types::{Properties, PropertyValue};
use std::collections::BTreeMap;

/// Primitive graph operations a store exposes to the executor.
pub(crate) trait GraphWriter {
    /// Ids of nodes carrying all `labels` and all `properties`, in creation order.
    fn find_nodes(&self, labels: &[String], properties: &Properties) -> StoreResult<Vec<String>>;

    /// Whether node `id` carries all `labels` and all `properties`.
    fn node_matches(&self, id: &str, labels: &[String], properties: &Properties)
        -> StoreResult<bool>;

    fn create_node(&mut self, labels: &[String], properties: &Properties) -> StoreResult<String>;

    /// Whether a `source → target` edge exists with the given type (any if `None`)
    /// and at least the given properties.
    fn has_edge(
        &self,
        source: &str,
        target: &str,
        rel_type: Option<&str>,
        properties: &Properties,
    ) -> StoreResult<bool>;

    fn create_edge(
        &mut self,
        source: &str,
        target: &str,
        rel_type: &str,
        properties: &Properties,
    ) -> StoreResult<()>;

    fn set_property(&mut self, id: &str, key: &str, value: &PropertyValue) -> StoreResult<()>;
}

type Row = BTreeMap<String, String>;

/// Evaluate `statement` against `graph`.
pub(crate) fn apply<W: GraphWriter>(graph: &mut W, statement: &Statement) -> StoreResult<()> {
    let mut rows: Vec<Row> = vec![Row::new()];

    for clause in &statement.clauses {
        if rows.is_empty() {
            break;
        }
        rows = match clause {
            Clause::Match(patterns) => {
                let mut current = rows;
                for pattern in patterns {
                    let mut next = Vec::new();
                    for row in &current {
                        next.extend(match_pattern(graph, pattern, row)?);
                    }
                    current = next;
                }
                current
            }
            Clause::Merge(merge) => rows
                .into_iter()
                .map(|row| merge_row(graph, merge, row))
                .collect::<StoreResult<_>>()?,
            Clause::Create(patterns) => rows
                .into_iter()
                .map(|row| create_row(graph, patterns, row))
                .collect::<StoreResult<_>>()?,
            Clause::Set(assignments) => {
                for row in &rows {
                    set_all(graph, assignments, row)?;
                }
                rows
            }
        };
    }

    Ok(())
}

/// Every extension of `row` that satisfies `pattern`.
fn match_pattern<W: GraphWriter>(graph: &W, pattern: &Pattern, row: &Row) -> StoreResult<Vec<Row>> {
    let mut partial = bind_node(graph, &pattern.start, row)?;

    for step in &pattern.steps {
        let mut next = Vec::new();
        for (row, prev) in &partial {
            for (row, id) in bind_node(graph, &step.node, row)? {
                if edge_exists(graph, prev, &id, &step.rel)? {
                    next.push((row, id));
                }
            }
        }
        partial = next;
    }

    Ok(partial.into_iter().map(|(row, _)| row).collect())
}

/// Candidate bindings for one node pattern.
fn bind_node<W: GraphWriter>(
    graph: &W,
    pattern: &NodePattern,
    row: &Row,
) -> StoreResult<Vec<(Row, String)>> {
    if let Some(id) = pattern.variable.as_ref().and_then(|v| row.get(v)) {
        return Ok(
            if graph.node_matches(id, &pattern.labels, &pattern.properties)? {
                vec![(row.clone(), id.clone())]
            } else {
                Vec::new()
            },
        );
    }

    Ok(graph
        .find_nodes(&pattern.labels, &pattern.properties)?
        .into_iter()
        .map(|id| {
            let mut row = row.clone();
            if let Some(var) = &pattern.variable {
                row.insert(var.clone(), id.clone());
            }
            (row, id)
        })
        .collect())
}

fn edge_exists<W: GraphWriter>(graph: &W, left: &str, right: &str, rel: &RelPattern) -> StoreResult<bool> {
    let rel_type = rel.rel_type.as_deref();
    match rel.direction {
        Direction::Outgoing => graph.has_edge(left, right, rel_type, &rel.properties),
        Direction::Incoming => graph.has_edge(right, left, rel_type, &rel.properties),
        Direction::Undirected => Ok(graph.has_edge(left, right, rel_type, &rel.properties)?
            || graph.has_edge(right, left, rel_type, &rel.properties)?),
    }
}

fn set_all<W: GraphWriter>(graph: &mut W, assignments: &[Assignment], row: &Row) -> StoreResult<()> {
    for a in assignments {
        let id = row.get(&a.variable).ok_or_else(|| {
            StoreError::Execution(format!("Variable `{}` not defined", a.variable))
        })?;
        graph.set_property(id, &a.key, &a.value)?;
    }
    Ok(())
}

fn merge_row<W: GraphWriter>(graph: &mut W, merge: &MergeClause, mut row: Row) -> StoreResult<Row> {
    let mut created = false;
    for pattern in &merge.patterns {
        let mut prev = merge_node(graph, &pattern.start, &mut row, &mut created)?;
        for step in &pattern.steps {
            let next = merge_node(graph, &step.node, &mut row, &mut created)?;
            if !edge_exists(graph, &prev, &next, &step.rel)? {
                let rel_type = required_type(&step.rel)?;
                let (source, target) = oriented(step.rel.direction, &prev, &next);
                graph.create_edge(source, target, rel_type, &step.rel.properties)?;
                created = true;
            }
            prev = next;
        }
    }

    let actions = if created {
        &merge.on_create
    } else {
        &merge.on_match
    };
    set_all(graph, actions, &row)?;
    Ok(row)
}

/// Reuse the bound or first matching node, else create one.
fn merge_node<W: GraphWriter>(
    graph: &mut W,
    pattern: &NodePattern,
    row: &mut Row,
    created: &mut bool,
) -> StoreResult<String> {
    if let Some(id) = pattern.variable.as_ref().and_then(|v| row.get(v)) {
        return Ok(id.clone());
    }

    let id = match graph
        .find_nodes(&pattern.labels, &pattern.properties)?
        .into_iter()
        .next()
    {
        Some(id) => id,
        None => {
            *created = true;
            graph.create_node(&pattern.labels, &pattern.properties)?
        }
    };

    if let Some(var) = &pattern.variable {
        row.insert(var.clone(), id.clone());
    }
    Ok(id)
}

fn create_row<W: GraphWriter>(graph: &mut W, patterns: &[Pattern], mut row: Row) -> StoreResult<Row> {
    for pattern in patterns {
        let mut prev = create_node(graph, &pattern.start, &mut row)?;
        for step in &pattern.steps {
            let next = create_node(graph, &step.node, &mut row)?;
            let rel_type = required_type(&step.rel)?;
            let (source, target) = oriented(step.rel.direction, &prev, &next);
            graph.create_edge(source, target, rel_type, &step.rel.properties)?;
            prev = next;
        }
    }
    Ok(row)
}

fn create_node<W: GraphWriter>(graph: &mut W, pattern: &NodePattern, row: &mut Row) -> StoreResult<String> {
    if let Some(var) = &pattern.variable {
        if let Some(id) = row.get(var) {
            if !pattern.labels.is_empty() || !pattern.properties.is_empty() {
                return Err(StoreError::Execution(format!(
                    "Variable `{}` already declared",
                    var
                )));
            }
            return Ok(id.clone());
        }
    }

    let id = graph.create_node(&pattern.labels, &pattern.properties)?;
    if let Some(var) = &pattern.variable {
        row.insert(var.clone(), id.clone());
    }
    Ok(id)
}

fn required_type(rel: &RelPattern) -> StoreResult<&str> {
    rel.rel_type
        .as_deref()
        .ok_or_else(|| StoreError::syntax("Relationship type required when writing an edge"))
}

/// Undirected writes are stored left to right.
fn oriented<'a>(direction: Direction, left: &'a str, right: &'a str) -> (&'a str, &'a str) {
    match direction {
        Direction::Incoming => (right, left),
        Direction::Outgoing | Direction::Undirected => (left, right),
    }
}

/// Whether `have` contains every entry of `want`.
pub(crate) fn properties_contain(have: &Properties, want: &Properties) -> bool {
    want.iter().all(|(k, v)| have.get(k) == Some(v))
}

/// Whether `have` contains every label of `want`.
pub(crate) fn labels_contain(have: &[String], want: &[String]) -> bool {
    want.iter().all(|l| have.contains(l))
}
