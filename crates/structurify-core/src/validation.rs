use crate::DiagramKind;
use crate::identifier::is_identifier;
use crate::plan::*;
use serde_json::{Map, Value};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("The AI response is not a JSON object")]
    NotAnObject,

    #[error("The AI response must contain a \"{0}\" array")]
    MissingArray(&'static str),

    #[error("{path} is not an object")]
    ElementNotObject { path: String },

    #[error("{path}: \"{field}\" must be a string")]
    NotAString { path: String, field: &'static str },

    #[error("{path}: \"{field}\" must be an array")]
    NotAnArray { path: String, field: &'static str },

    #[error("{path}: \"{field}\" must be an array of strings")]
    NotAStringArray { path: String, field: &'static str },

    #[error("{path}: \"{field}\", if provided, must be a string")]
    InvalidOptional { path: String, field: &'static str },

    #[error("{path}: \"{value}\" is not a valid \"{field}\" (expected one of {expected})")]
    InvalidEnum {
        path: String,
        field: &'static str,
        value: String,
        expected: String,
    },

    #[error("{path}: \"{value}\" is not a valid identifier (only letters, digits and _)")]
    InvalidIdentifier { path: String, value: String },

    #[error("{path}: \"{field}\" refers to unknown {target} \"{value}\"")]
    UnknownReference {
        path: String,
        field: &'static str,
        target: &'static str,
        value: String,
    },

    #[error("{path}: \"{value}\" is not a valid cardinality (expected a Mermaid token like \"||--o{{\")")]
    InvalidCardinality { path: String, value: String },
}

type Result<T> = std::result::Result<T, ValidationError>;

/// Validate a sanitized candidate against the schema for `kind`.
pub fn validate(kind: DiagramKind, value: &Value) -> Result<ValidatedPlan> {
    Ok(match kind {
        DiagramKind::Flowchart => ValidatedPlan::Flowchart(validate_flowchart(value)?),
        DiagramKind::Sequence => ValidatedPlan::Sequence(validate_sequence(value)?),
        DiagramKind::Class => ValidatedPlan::Class(validate_class(value)?),
        DiagramKind::EntityRelation => ValidatedPlan::EntityRelation(validate_er(value)?),
    })
}

pub fn validate_flowchart(value: &Value) -> Result<FlowchartPlan> {
    let (raw_nodes, raw_edges) = collections(value, "nodes", "edges")?;

    let mut nodes = Vec::with_capacity(raw_nodes.len());
    for el in elements("nodes", raw_nodes) {
        let el = el?;
        nodes.push(FlowNode {
            id: el.identifier("id")?.to_string(),
            label: el.string("label")?.to_string(),
            kind: el.closed::<NodeKind>("type")?,
        });
    }

    let known: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    let mut edges = Vec::with_capacity(raw_edges.len());
    for el in elements("edges", raw_edges) {
        let el = el?;
        edges.push(FlowEdge {
            from: el.reference("from", &known, "node")?.to_string(),
            to: el.reference("to", &known, "node")?.to_string(),
            label: el.optional_string("label")?.map(str::to_string),
        });
    }

    Ok(FlowchartPlan { nodes, edges })
}

pub fn validate_sequence(value: &Value) -> Result<SequencePlan> {
    let (raw_participants, raw_steps) = collections(value, "participants", "steps")?;

    let mut participants = Vec::with_capacity(raw_participants.len());
    for el in elements("participants", raw_participants) {
        let el = el?;
        participants.push(Participant {
            alias: el.identifier("alias")?.to_string(),
            description: el.string("description")?.to_string(),
        });
    }

    let known: HashSet<&str> = participants.iter().map(|p| p.alias.as_str()).collect();
    let mut steps = Vec::with_capacity(raw_steps.len());
    for el in elements("steps", raw_steps) {
        let el = el?;
        steps.push(SequenceStep {
            from: el.reference("from", &known, "participant")?.to_string(),
            to: el.reference("to", &known, "participant")?.to_string(),
            label: el.string("label")?.to_string(),
            kind: el.closed::<StepKind>("type")?,
        });
    }

    Ok(SequencePlan {
        participants,
        steps,
    })
}

pub fn validate_class(value: &Value) -> Result<ClassPlan> {
    let (raw_classes, raw_relationships) = collections(value, "classes", "relationships")?;

    let mut classes = Vec::with_capacity(raw_classes.len());
    for el in elements("classes", raw_classes) {
        let el = el?;
        classes.push(ClassDef {
            id: el.identifier("id")?.to_string(),
            properties: el.string_array("properties")?,
            methods: el.string_array("methods")?,
        });
    }

    let known: HashSet<&str> = classes.iter().map(|c| c.id.as_str()).collect();
    let mut relationships = Vec::with_capacity(raw_relationships.len());
    for el in elements("relationships", raw_relationships) {
        let el = el?;
        relationships.push(ClassRelationship {
            from: el.reference("from", &known, "class")?.to_string(),
            to: el.reference("to", &known, "class")?.to_string(),
            kind: el.closed::<RelationKind>("type")?,
            label: el.optional_string("label")?.map(str::to_string),
        });
    }

    Ok(ClassPlan {
        classes,
        relationships,
    })
}

pub fn validate_er(value: &Value) -> Result<ErPlan> {
    let (raw_entities, raw_relationships) = collections(value, "entities", "relationships")?;

    let mut entities = Vec::with_capacity(raw_entities.len());
    for el in elements("entities", raw_entities) {
        let el = el?;
        let name = el.identifier("name")?.to_string();
        let raw_columns = el.array("columns")?;
        let mut columns = Vec::with_capacity(raw_columns.len());
        for col in elements(&format!("{}.columns", el.path), raw_columns) {
            let col = col?;
            columns.push(Column {
                name: col.string("name")?.to_string(),
                data_type: col.string("type")?.to_string(),
                keys: col.key_set("keys")?,
            });
        }
        entities.push(Entity { name, columns });
    }

    let known: HashSet<&str> = entities.iter().map(|e| e.name.as_str()).collect();
    let mut relationships = Vec::with_capacity(raw_relationships.len());
    for el in elements("relationships", raw_relationships) {
        let el = el?;
        relationships.push(ErRelationship {
            from: el.reference("from", &known, "entity")?.to_string(),
            to: el.reference("to", &known, "entity")?.to_string(),
            cardinality: el.cardinality("cardinality")?,
            label: el.string("label")?.to_string(),
        });
    }

    Ok(ErPlan {
        entities,
        relationships,
    })
}

// ── Checks ──────────────────────────────────────────────────────

/// Top-level object check, then both required arrays in declared order.
fn collections<'a>(
    value: &'a Value,
    first: &'static str,
    second: &'static str,
) -> Result<(&'a [Value], &'a [Value])> {
    let obj = value.as_object().ok_or(ValidationError::NotAnObject)?;
    let array = |name: &'static str| {
        obj.get(name)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .ok_or(ValidationError::MissingArray(name))
    };
    Ok((array(first)?, array(second)?))
}

fn elements<'a>(
    collection: &str,
    items: &'a [Value],
) -> impl Iterator<Item = Result<Element<'a>>> + use<'a> {
    let collection = collection.to_string();
    items.iter().enumerate().map(move |(i, item)| {
        let path = format!("{collection}[{i}]");
        match item.as_object() {
            Some(obj) => Ok(Element { path, obj }),
            None => Err(ValidationError::ElementNotObject { path }),
        }
    })
}

/// One object inside a plan collection, addressed by its path for error messages.
struct Element<'a> {
    path: String,
    obj: &'a Map<String, Value>,
}

impl<'a> Element<'a> {
    fn string(&self, field: &'static str) -> Result<&'a str> {
        self.obj
            .get(field)
            .and_then(Value::as_str)
            .ok_or_else(|| ValidationError::NotAString {
                path: self.path.clone(),
                field,
            })
    }

    fn optional_string(&self, field: &'static str) -> Result<Option<&'a str>> {
        match self.obj.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(ValidationError::InvalidOptional {
                path: self.path.clone(),
                field,
            }),
        }
    }

    fn array(&self, field: &'static str) -> Result<&'a [Value]> {
        self.obj
            .get(field)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .ok_or_else(|| ValidationError::NotAnArray {
                path: self.path.clone(),
                field,
            })
    }

    fn string_array(&self, field: &'static str) -> Result<Vec<String>> {
        self.array(field)?
            .iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| ValidationError::NotAStringArray {
                        path: self.path.clone(),
                        field,
                    })
            })
            .collect()
    }

    fn identifier(&self, field: &'static str) -> Result<&'a str> {
        let value = self.string(field)?;
        if !is_identifier(value) {
            return Err(ValidationError::InvalidIdentifier {
                path: self.path.clone(),
                value: value.to_string(),
            });
        }
        Ok(value)
    }

    fn reference(
        &self,
        field: &'static str,
        known: &HashSet<&str>,
        target: &'static str,
    ) -> Result<&'a str> {
        let value = self.identifier(field)?;
        if !known.contains(value) {
            return Err(ValidationError::UnknownReference {
                path: self.path.clone(),
                field,
                target,
                value: value.to_string(),
            });
        }
        Ok(value)
    }

    fn closed<T: ClosedSet>(&self, field: &'static str) -> Result<T> {
        let value = self.string(field)?;
        T::parse_exact(value).ok_or_else(|| ValidationError::InvalidEnum {
            path: self.path.clone(),
            field,
            value: value.to_string(),
            expected: T::expected(),
        })
    }

    fn key_set(&self, field: &'static str) -> Result<Vec<KeyKind>> {
        let mut keys = Vec::new();
        for raw in self.array(field)? {
            let value = raw.as_str().ok_or_else(|| ValidationError::NotAStringArray {
                path: self.path.clone(),
                field,
            })?;
            let key = KeyKind::parse_exact(value).ok_or_else(|| ValidationError::InvalidEnum {
                path: self.path.clone(),
                field,
                value: value.to_string(),
                expected: KeyKind::expected(),
            })?;
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    fn cardinality(&self, field: &'static str) -> Result<Cardinality> {
        let value = self.string(field)?;
        Cardinality::parse(value).ok_or_else(|| ValidationError::InvalidCardinality {
            path: self.path.clone(),
            value: value.to_string(),
        })
    }
}
