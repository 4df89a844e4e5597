//! Best-effort repair of model output before validation.
//!
//! Nothing here fails. Identifiers are made Mermaid-safe, enum spellings are
//! normalized, missing labels are filled in, and references that do not resolve
//! are dropped. Shapes that cannot be repaired (a non-object plan, a missing
//! collection, a node without a string id) are passed through unchanged so the
//! validator can report them.

use crate::DiagramKind;
use crate::identifier::IdentifierMap;
use crate::plan::{ClosedSet, KeyKind, NodeKind, RelationKind, StepKind};
use serde_json::{Map, Value};
use tracing::debug;

const FLOWCHART_RESERVED: &[&str] = &[
    "end",
    "graph",
    "flowchart",
    "subgraph",
    "direction",
    "style",
    "linkstyle",
    "class",
    "classdef",
    "click",
    "call",
    "href",
    "default",
];

const SEQUENCE_RESERVED: &[&str] = &[
    "end",
    "participant",
    "actor",
    "as",
    "loop",
    "alt",
    "else",
    "opt",
    "par",
    "and",
    "rect",
    "critical",
    "break",
    "box",
    "note",
    "over",
    "activate",
    "deactivate",
    "autonumber",
    "create",
    "destroy",
    "title",
    "link",
    "links",
];

const CLASS_RESERVED: &[&str] = &[
    "class",
    "classdiagram",
    "namespace",
    "note",
    "direction",
    "style",
    "classdef",
    "cssclass",
    "click",
    "link",
    "callback",
];

const ER_RESERVED: &[&str] = &[
    "erdiagram",
    "direction",
    "style",
    "classdef",
    "class",
    // Cardinality words of the relationship grammar.
    "one",
    "many",
    "to",
    "only",
    "zero",
    "more",
    "optionally",
];

/// Sanitize a candidate plan of the given kind.
pub fn sanitize(kind: DiagramKind, plan: Value) -> Value {
    match kind {
        DiagramKind::Flowchart => sanitize_flowchart(plan),
        DiagramKind::Sequence => sanitize_sequence(plan),
        DiagramKind::Class => sanitize_class(plan),
        DiagramKind::EntityRelation => sanitize_er(plan),
    }
}

pub fn sanitize_flowchart(mut plan: Value) -> Value {
    if let Value::Object(map) = &mut plan {
        let mut ids = IdentifierMap::new("node", FLOWCHART_RESERVED);
        retain_elements(map, "nodes", |node| {
            node.get("id").is_some_and(Value::is_string)
                && node
                    .get("type")
                    .and_then(Value::as_str)
                    .and_then(NodeKind::normalize)
                    .is_some()
        });
        for node in elements_mut(map, "nodes") {
            declare(node, "id", Some("label"), &mut ids);
            normalize_enum::<NodeKind>(node, "type");
        }
        prune_references(map, "edges", &ids);
    }
    plan
}

pub fn sanitize_sequence(mut plan: Value) -> Value {
    if let Value::Object(map) = &mut plan {
        let mut ids = IdentifierMap::new("participant", SEQUENCE_RESERVED);
        for participant in elements_mut(map, "participants") {
            declare(participant, "alias", Some("description"), &mut ids);
        }
        prune_references(map, "steps", &ids);
        for step in elements_mut(map, "steps") {
            normalize_enum::<StepKind>(step, "type");
        }
    }
    plan
}

pub fn sanitize_class(mut plan: Value) -> Value {
    if let Value::Object(map) = &mut plan {
        let mut ids = IdentifierMap::new("class", CLASS_RESERVED);
        for class in elements_mut(map, "classes") {
            declare(class, "id", None, &mut ids);
            default_to_empty_array(class, "properties");
            default_to_empty_array(class, "methods");
        }
        prune_references(map, "relationships", &ids);
        for rel in elements_mut(map, "relationships") {
            normalize_enum::<RelationKind>(rel, "type");
        }
    }
    plan
}

pub fn sanitize_er(mut plan: Value) -> Value {
    if let Value::Object(map) = &mut plan {
        let mut ids = IdentifierMap::new("entity", ER_RESERVED).with_leading_letter();
        for entity in elements_mut(map, "entities") {
            declare(entity, "name", None, &mut ids);
            default_to_empty_array(entity, "columns");
            if let Some(Value::Array(columns)) = entity.get_mut("columns") {
                for column in columns.iter_mut().filter_map(Value::as_object_mut) {
                    normalize_keys(column);
                }
            }
        }
        prune_references(map, "relationships", &ids);
        for rel in elements_mut(map, "relationships") {
            normalize_cardinality(rel);
        }
    }
    plan
}

// ── Helpers ─────────────────────────────────────────────────────

/// Object elements of `map[collection]`, skipping anything that is not an object.
fn elements_mut<'a>(
    map: &'a mut Map<String, Value>,
    collection: &str,
) -> impl Iterator<Item = &'a mut Map<String, Value>> {
    map.get_mut(collection)
        .and_then(Value::as_array_mut)
        .into_iter()
        .flat_map(|items| items.iter_mut().filter_map(Value::as_object_mut))
}

/// Keep the object elements of `map[collection]` that satisfy `keep`; anything
/// else, including non-objects, is dropped.
fn retain_elements(
    map: &mut Map<String, Value>,
    collection: &str,
    keep: impl Fn(&Map<String, Value>) -> bool,
) {
    let Some(Value::Array(items)) = map.get_mut(collection) else {
        return;
    };
    let before = items.len();
    items.retain(|item| item.as_object().is_some_and(&keep));
    let dropped = before - items.len();
    if dropped > 0 {
        debug!(collection, dropped, "Dropped unrepairable elements");
    }
}

/// Sanitize the identifier in `id_field` and, if `label_field` is given, fill a
/// missing or blank label with the original identifier text.
fn declare(
    element: &mut Map<String, Value>,
    id_field: &str,
    label_field: Option<&str>,
    ids: &mut IdentifierMap,
) {
    let Some(raw) = element.get(id_field).and_then(Value::as_str) else {
        return;
    };
    let original = raw.trim().to_string();
    let id = ids.declare(&original);

    if let Some(label_field) = label_field {
        let has_label = element
            .get(label_field)
            .and_then(Value::as_str)
            .is_some_and(|l| !l.trim().is_empty());
        if !has_label {
            let fallback = if original.is_empty() {
                id.clone()
            } else {
                original
            };
            element.insert(label_field.to_string(), Value::String(fallback));
        }
    }
    element.insert(id_field.to_string(), Value::String(id));
}

/// Drop entries of `map[collection]` whose `from`/`to` do not resolve, and
/// rewrite the survivors to the sanitized ids.
fn prune_references(map: &mut Map<String, Value>, collection: &str, ids: &IdentifierMap) {
    let Some(Value::Array(items)) = map.get_mut(collection) else {
        return;
    };
    let before = items.len();
    items.retain_mut(|item| {
        let Some(obj) = item.as_object_mut() else {
            return false;
        };
        let from = obj.get("from").and_then(Value::as_str).and_then(|s| ids.resolve(s));
        let to = obj.get("to").and_then(Value::as_str).and_then(|s| ids.resolve(s));
        match (from, to) {
            (Some(from), Some(to)) => {
                obj.insert("from".to_string(), Value::String(from));
                obj.insert("to".to_string(), Value::String(to));
                true
            }
            _ => false,
        }
    });
    let dropped = before - items.len();
    if dropped > 0 {
        debug!(collection, dropped, "Dropped entries with unresolved references");
    }
}

fn normalize_enum<T: ClosedSet>(element: &mut Map<String, Value>, field: &str) {
    let canonical = element
        .get(field)
        .and_then(Value::as_str)
        .and_then(T::normalize)
        .map(T::as_str);
    if let Some(canonical) = canonical {
        element.insert(field.to_string(), Value::String(canonical.to_string()));
    }
}

fn default_to_empty_array(element: &mut Map<String, Value>, field: &str) {
    if matches!(element.get(field), None | Some(Value::Null)) {
        element.insert(field.to_string(), Value::Array(Vec::new()));
    }
}

/// `keys` may arrive missing, as `"PK, FK"`, or as an array of loose spellings.
fn normalize_keys(column: &mut Map<String, Value>) {
    let keys: Vec<Value> = match column.get("keys") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) => s
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(|part| Value::String(part.to_string()))
            .collect(),
        Some(Value::Array(items)) => items.clone(),
        Some(_) => return,
    };
    let keys = keys
        .into_iter()
        .map(|key| match key.as_str().and_then(KeyKind::normalize) {
            Some(kind) => Value::String(kind.as_str().to_string()),
            None => key,
        })
        .collect();
    column.insert("keys".to_string(), Value::Array(keys));
}

fn normalize_cardinality(rel: &mut Map<String, Value>) {
    let Some(raw) = rel.get("cardinality").and_then(Value::as_str) else {
        return;
    };
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let phrase: String = compact
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .flat_map(|c| c.to_lowercase())
        .collect();
    let token = match phrase.as_str() {
        "onetoone" | "11" | "1to1" => "||--||",
        "onetomany" | "1n" | "1m" | "1tomany" | "1ton" => "||--o{",
        "manytoone" | "n1" | "m1" | "manyto1" | "nto1" => "}o--||",
        "manytomany" | "nm" | "mn" | "nn" => "}o--o{",
        _ => compact.as_str(),
    };
    let token = token.to_string();
    rel.insert("cardinality".to_string(), Value::String(token));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ids(plan: &Value, collection: &str, field: &str) -> Vec<String> {
        plan[collection]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e[field].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn flowchart_ids_are_stripped_and_edges_rewired() {
        let plan = json!({
            "nodes": [
                {"id": "check user!", "label": "Check user", "type": "decision"},
                {"id": "done", "label": "Done", "type": "end"}
            ],
            "edges": [{"from": "check user!", "to": "done", "label": "ok"}]
        });
        let out = sanitize_flowchart(plan);
        assert_eq!(ids(&out, "nodes", "id"), ["checkuser", "done"]);
        assert_eq!(out["edges"][0]["from"], "checkuser");
        assert_eq!(out["edges"][0]["to"], "done");
        assert_eq!(out["nodes"][1]["type"], "startEnd");
    }

    #[test]
    fn flowchart_empty_ids_get_fallbacks_and_labels() {
        let plan = json!({
            "nodes": [
                {"id": "???", "type": "process"},
                {"id": "  ", "label": "   ", "type": "process"},
                {"id": "B", "label": 42, "type": "process"}
            ],
            "edges": [{"from": "???", "to": "B"}]
        });
        let out = sanitize_flowchart(plan);
        assert_eq!(ids(&out, "nodes", "id"), ["node_0", "node_1", "B"]);
        assert_eq!(out["nodes"][0]["label"], "???");
        assert_eq!(out["nodes"][1]["label"], "node_1");
        assert_eq!(out["nodes"][2]["label"], "B");
        assert_eq!(out["edges"][0]["from"], "node_0");
    }

    #[test]
    fn dangling_and_malformed_edges_are_dropped() {
        let plan = json!({
            "nodes": [{"id": "A", "label": "A", "type": "process"}],
            "edges": [
                {"from": "A", "to": "Z"},
                {"from": "A"},
                {"from": 1, "to": "A"},
                "A --> A",
                {"from": "A", "to": "A"}
            ]
        });
        let out = sanitize_flowchart(plan);
        assert_eq!(out["edges"], json!([{"from": "A", "to": "A"}]));
    }

    #[test]
    fn reserved_flowchart_ids_are_suffixed() {
        let plan = json!({
            "nodes": [{"id": "end", "label": "End", "type": "startEnd"}],
            "edges": [{"from": "end", "to": "end"}]
        });
        let out = sanitize_flowchart(plan);
        assert_eq!(out["nodes"][0]["id"], "end_");
        assert_eq!(out["edges"][0]["from"], "end_");
    }

    #[test]
    fn unrepairable_shapes_pass_through() {
        assert_eq!(sanitize_flowchart(json!("nope")), json!("nope"));
        assert_eq!(sanitize_flowchart(json!({"nodes": []})), json!({"nodes": []}));
        let bad_participant = json!({"participants": [{"alias": 7}], "steps": []});
        assert_eq!(sanitize_sequence(bad_participant.clone()), bad_participant);
    }

    #[test]
    fn flowchart_nodes_without_id_or_known_type_are_dropped() {
        let plan = json!({
            "nodes": [
                {"id": "A", "label": "Start", "type": "startEnd"},
                {"id": "B", "label": "Odd", "type": "hexagon"},
                {"id": 7, "label": "Numeric", "type": "process"},
                {"id": "C", "label": "Untyped"},
                "not a node"
            ],
            "edges": [{"from": "A", "to": "B"}, {"from": "A", "to": "A"}]
        });
        let out = sanitize_flowchart(plan);
        assert_eq!(ids(&out, "nodes", "id"), ["A"]);
        assert_eq!(out["edges"], json!([{"from": "A", "to": "A"}]));
    }

    #[test]
    fn unknown_enum_values_are_left_for_validation() {
        let plan = json!({
            "classes": [{"id": "A"}],
            "relationships": [{"from": "A", "to": "A", "type": "friendship"}]
        });
        let out = sanitize_class(plan);
        assert_eq!(out["relationships"][0]["type"], "friendship");
    }

    #[test]
    fn sequence_aliases_descriptions_and_step_kinds() {
        let plan = json!({
            "participants": [
                {"alias": "User Service", "description": "Handles users"},
                {"alias": "db"}
            ],
            "steps": [
                {"from": "User Service", "to": "db", "label": "query", "type": " Synchronous "},
                {"from": "db", "to": "User Service", "label": "rows", "type": "RETURN"},
                {"from": "db", "to": "cache", "label": "warm", "type": "async"}
            ]
        });
        let out = sanitize_sequence(plan);
        assert_eq!(ids(&out, "participants", "alias"), ["UserService", "db"]);
        assert_eq!(out["participants"][1]["description"], "db");
        assert_eq!(out["steps"].as_array().unwrap().len(), 2);
        assert_eq!(out["steps"][0]["type"], "sync");
        assert_eq!(out["steps"][1]["type"], "reply");
        assert_eq!(out["steps"][1]["to"], "UserService");
    }

    #[test]
    fn class_members_default_and_relationship_kinds_fold() {
        let plan = json!({
            "classes": [{"id": "Animal"}, {"id": "Dog<T>", "methods": ["bark"]}],
            "relationships": [
                {"from": "Dog<T>", "to": "Animal", "type": "Extends"},
                {"from": "Cat", "to": "Animal", "type": "inheritance"}
            ]
        });
        let out = sanitize_class(plan);
        assert_eq!(ids(&out, "classes", "id"), ["Animal", "DogT"]);
        assert_eq!(out["classes"][0]["properties"], json!([]));
        assert_eq!(out["classes"][0]["methods"], json!([]));
        assert_eq!(
            out["relationships"],
            json!([{"from": "DogT", "to": "Animal", "type": "inheritance"}])
        );
    }

    #[test]
    fn er_keys_and_cardinality_are_normalized() {
        let plan = json!({
            "entities": [
                {"name": "Order Items", "columns": [
                    {"name": "id", "type": "int", "keys": "pk"},
                    {"name": "order_id", "type": "int", "keys": ["Foreign Key", "pk"]},
                    {"name": "note", "type": "text"}
                ]},
                {"name": "Orders", "columns": []}
            ],
            "relationships": [
                {"from": "Orders", "to": "Order Items", "cardinality": "one-to-many", "label": "contains"},
                {"from": "Orders", "to": "Order Items", "cardinality": " || -- o{ ", "label": "has"}
            ]
        });
        let out = sanitize_er(plan);
        assert_eq!(ids(&out, "entities", "name"), ["OrderItems", "Orders"]);
        let columns = &out["entities"][0]["columns"];
        assert_eq!(columns[0]["keys"], json!(["PK"]));
        assert_eq!(columns[1]["keys"], json!(["FK", "PK"]));
        assert_eq!(columns[2]["keys"], json!([]));
        assert_eq!(out["relationships"][0]["cardinality"], "||--o{");
        assert_eq!(out["relationships"][1]["cardinality"], "||--o{");
        assert_eq!(out["relationships"][0]["to"], "OrderItems");
    }

    #[test]
    fn sanitize_is_idempotent() {
        let plans = [
            (
                DiagramKind::Flowchart,
                json!({
                    "nodes": [
                        {"id": "node_0", "label": "x", "type": "START"},
                        {"id": "!!", "type": "process"},
                        {"id": "end", "label": "\"q\"", "type": "End"}
                    ],
                    "edges": [{"from": "!!", "to": "end"}, {"from": "x", "to": "y"}]
                }),
            ),
            (
                DiagramKind::Sequence,
                json!({
                    "participants": [{"alias": "a b"}, {"alias": "loop", "description": "L"}],
                    "steps": [{"from": "a b", "to": "loop", "label": "go", "type": "Call"}]
                }),
            ),
            (
                DiagramKind::Class,
                json!({
                    "classes": [{"id": "A"}, {"id": "B!", "properties": ["x: int"]}],
                    "relationships": [{"from": "B!", "to": "A", "type": "Composes"}]
                }),
            ),
            (
                DiagramKind::EntityRelation,
                json!({
                    "entities": [{"name": "U s", "columns": [{"name": "id", "type": "int", "keys": "PK,FK"}]}],
                    "relationships": [{"from": "U s", "to": "U s", "cardinality": "1:N", "label": "self"}]
                }),
            ),
        ];
        for (kind, plan) in plans {
            let once = sanitize(kind, plan);
            let twice = sanitize(kind, once.clone());
            assert_eq!(once, twice, "{kind} sanitize should be idempotent");
        }
    }

    #[test]
    fn surviving_references_always_resolve() {
        let plan = json!({
            "nodes": [
                {"id": "A.1", "label": "a", "type": "process"},
                {"id": "", "label": "b", "type": "process"},
                {"id": "C C", "label": "c", "type": "process"}
            ],
            "edges": [
                {"from": "A.1", "to": ""},
                {"from": "A1", "to": "CC"},
                {"from": "C C", "to": "D"},
                {"from": "", "to": "missing"}
            ]
        });
        let out = sanitize_flowchart(plan);
        let node_ids = ids(&out, "nodes", "id");
        for edge in out["edges"].as_array().unwrap() {
            assert!(node_ids.contains(&edge["from"].as_str().unwrap().to_string()));
            assert!(node_ids.contains(&edge["to"].as_str().unwrap().to_string()));
        }
        assert_eq!(out["edges"].as_array().unwrap().len(), 2);
    }
}
