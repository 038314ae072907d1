//! Multi-indexed options: numbered entries plus a shared template.
//!
//! Keys that parse as integers address entries. Every other key belongs to the
//! template stored under [`TEMPLATE`]; its values apply to all entries unless an
//! entry sets them itself. When nothing but the template is set, it becomes
//! entry `"0"`.

use crate::error::ConfigError;
use crate::merge::override_entry;
use crate::node::{Node, Table, ValueRef};
use crate::path::ConfPath;
use crate::schema::{ConfigRef, Schema};

pub const TEMPLATE: &str = "*";

pub fn is_index(key: &str) -> bool {
    key.parse::<i64>().is_ok()
}

/// Split a raw multi-indexed table into the template (built from `"*"` and
/// every non-numeric key) and the numbered entries.
pub fn partition(table: &Table) -> (Option<Table>, Vec<(&String, &Node)>) {
    let mut template: Option<Table> = None;
    let mut entries = Vec::new();
    for (key, node) in table {
        if is_index(key) {
            entries.push((key, node));
        } else if key == TEMPLATE
            && let Some(explicit) = node.as_table()
        {
            template
                .get_or_insert_with(Table::new)
                .extend(explicit.iter().map(|(k, v)| (k.clone(), v.clone())));
        } else {
            template
                .get_or_insert_with(Table::new)
                .insert(key.clone(), node.clone());
        }
    }
    (template, entries)
}

/// Fold the template into every entry, then drop it (or rename it to `"0"`
/// when it is all there is). Cleared entries are removed. Applying this to a
/// table without a template does nothing.
pub fn spread_template(
    schema: &Schema<'_>,
    option: &ConfigRef<'_>,
    table: &mut Table,
    path: &ConfPath,
) -> Result<(), ConfigError> {
    let Some(template) = table.shift_remove(TEMPLATE) else {
        return Ok(());
    };
    table.retain(|_, entry| !matches!(entry, Node::Cleared));
    if table.is_empty() {
        table.insert("0".to_string(), template);
        return Ok(());
    }
    let template_ref = ValueRef::new(path.child(TEMPLATE), &template);
    for (index, entry) in table.iter_mut() {
        let merged = override_entry(
            schema,
            option,
            Some(&template_ref),
            &ValueRef::new(path.child(index), entry),
        )?;
        *entry = merged;
    }
    Ok(())
}
