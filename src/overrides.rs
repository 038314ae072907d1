//! Turn parsed assignments into override documents.
//!
//! `("tool.build.args", +=, ["-j"])` becomes `{tool = {build = {args = +=["-j"]}}}`,
//! with the value tagged by its action, ready to be verified against the
//! override target.

use crate::node::Node;
use crate::path::ConfPath;
use crate::syntax::Assignment;

/// Nest a single assignment into a document.
pub fn assignment_to_document(assignment: Assignment) -> Node {
    let mut document = Node::table();
    set_nested(&mut document, assignment);
    document
}

/// Group assignments into as few documents as possible, preserving their
/// order. A new document starts whenever an assignment's key equals, contains
/// or lies inside a key already in the current document, so that every
/// assignment is applied on top of the ones before it.
pub fn assignments_to_documents(assignments: impl IntoIterator<Item = Assignment>) -> Vec<Node> {
    let mut documents = Vec::new();
    let mut current = Node::table();
    let mut keys: Vec<ConfPath> = Vec::new();
    for assignment in assignments {
        let collides = keys
            .iter()
            .any(|key| key.starts_with(&assignment.key) || assignment.key.starts_with(key));
        if collides {
            documents.push(std::mem::replace(&mut current, Node::table()));
            keys.clear();
        }
        keys.push(assignment.key.clone());
        set_nested(&mut current, assignment);
    }
    if !keys.is_empty() {
        documents.push(current);
    }
    documents
}

fn set_nested(document: &mut Node, assignment: Assignment) {
    let Assignment { action, key, value } = assignment;
    if let Some(parent) = key.parent() {
        document.materialize(&parent);
    }
    document.set(&key, Node::tagged(action, value));
}
