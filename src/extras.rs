//! # setup.cfg extras handling
//!
//! Projects declare optional dependency groups in the `[extras]` section
//! of `setup.cfg`. The section is parsed just far enough to lift each
//! group's requirement block out and to write a regenerated block back
//! without disturbing the rest of the file.

use std::collections::BTreeMap;

use crate::requirement::{self, Requirements};

/// One item inside the `[extras]` section, in file order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExtrasItem {
    /// A comment line, kept verbatim.
    Comment(String),
    /// One named group and its requirement block, newline separated.
    Extra { name: String, content: String },
}

/// Split setup.cfg content around its `[extras]` section.
///
/// Returns the text before the section, the parsed items (`None` when
/// the file has no `[extras]` section), and the text from the next
/// section header onwards.
pub fn split_extras(content: &str) -> (String, Option<Vec<ExtrasItem>>, String) {
    let mut prefix = String::new();
    let mut suffix = String::new();
    let mut items: Option<Vec<ExtrasItem>> = None;
    let mut current: Option<(String, String)> = None;
    let mut in_section = false;
    let mut done = false;

    for line in content.split_inclusive('\n') {
        if done {
            suffix.push_str(line);
            continue;
        }
        if !in_section {
            if line.trim_end() == "[extras]" {
                in_section = true;
                items = Some(Vec::new());
            } else {
                prefix.push_str(line);
            }
            continue;
        }

        let trimmed = line.trim_end();
        let list = items.as_mut().unwrap();
        if trimmed.is_empty() {
            continue;
        }
        if line.starts_with(char::is_whitespace) {
            // Continuation of the current group's block. Indented
            // comments belong to the block, not the section.
            if let Some((_, body)) = current.as_mut() {
                if !body.is_empty() {
                    body.push('\n');
                }
                body.push_str(trimmed.trim_start());
            } else {
                // Indented text outside a group ends the section
                done = true;
                suffix.push_str(line);
            }
        } else if trimmed.starts_with('#') {
            if let Some((name, body)) = current.take() {
                list.push(ExtrasItem::Extra { name, content: body });
            }
            list.push(ExtrasItem::Comment(trimmed.to_string()));
        } else if let Some(name) = extra_name(trimmed) {
            if let Some((prev, body)) = current.take() {
                list.push(ExtrasItem::Extra { name: prev, content: body });
            }
            current = Some((name, String::new()));
        } else {
            // Next section header
            if let Some((name, body)) = current.take() {
                list.push(ExtrasItem::Extra { name, content: body });
            }
            done = true;
            suffix.push_str(line);
        }
    }
    if let Some((name, body)) = current.take() {
        items.as_mut().unwrap().push(ExtrasItem::Extra { name, content: body });
    }
    (prefix, items, suffix)
}

fn extra_name(line: &str) -> Option<String> {
    let (name, _rest) = line.split_once('=')?;
    let name = name.trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return None;
    }
    Some(name.to_string())
}

/// Rewrite the `[extras]` section of `old_content`, replacing each
/// group's requirement block with the regenerated one from
/// `new_extras`. Groups absent from `new_extras` and everything outside
/// the section are preserved byte for byte.
pub fn merge_setup_cfg(
    old_content: &str,
    new_extras: &BTreeMap<String, Requirements>,
) -> String {
    let (prefix, items, suffix) = split_extras(old_content);
    let Some(items) = items else {
        return old_content.to_string();
    };
    let mut out = prefix;
    out.push_str("[extras]\n");
    for item in items {
        match item {
            ExtrasItem::Comment(text) => {
                out.push_str(&text);
                out.push('\n');
            }
            ExtrasItem::Extra { name, content } => {
                out.push_str(&name);
                out.push_str(" =");
                let body = match new_extras.get(&name) {
                    Some(reqs) => requirement::to_content(reqs, ":", "  ", false),
                    None => indent_block(&content),
                };
                if !body.starts_with('\n') {
                    out.push('\n');
                }
                out.push_str(&body);
            }
        }
    }
    if !suffix.is_empty() {
        out.push('\n');
        out.push_str(&suffix);
    }
    out
}

fn indent_block(content: &str) -> String {
    let mut out = String::new();
    for line in content.lines() {
        out.push_str("  ");
        out.push_str(line);
        out.push('\n');
    }
    out
}
