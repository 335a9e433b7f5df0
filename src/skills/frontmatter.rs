//! Restricted front-matter parsing for SKILL.md manifests.
//!
//! Skill manifests carry a small YAML-like block between `---` lines:
//! flat `key: value` pairs plus literal (`|`) and folded (`>`) block
//! scalars. This is deliberately not full YAML — folded scalars join
//! non-empty lines with single spaces and drop blank lines, which real
//! YAML folding does not do — so the dialect is parsed by hand.
//!
//! Absence of a leading `---`, or a missing closing fence, yields an empty
//! result rather than an error: a manifest without front-matter is a valid
//! skill that just has no metadata.

use std::collections::BTreeMap;

/// Front-matter fields consumed by skill discovery.
///
/// Unknown keys are retained in `extra` for observability; discovery only
/// consumes `name`, `description`, and `delegator_exclude`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkillFrontmatter {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Skills marked `delegator_exclude: true` never enter the catalog.
    pub exclude: bool,
    pub extra: BTreeMap<String, String>,
}

/// Parse the front-matter block of a skill manifest.
pub fn parse_frontmatter(markdown: &str) -> SkillFrontmatter {
    let mut lines = markdown.lines();
    if lines.next().map(str::trim) != Some("---") {
        return SkillFrontmatter::default();
    }

    let body: Vec<&str> = lines.collect();
    let Some(end) = body.iter().position(|line| line.trim() == "---") else {
        return SkillFrontmatter::default();
    };

    let fields = parse_block(&body[..end]);

    let mut front = SkillFrontmatter::default();
    for (key, value) in fields {
        match key.as_str() {
            "name" => {
                let trimmed = value.trim();
                if !trimmed.is_empty() {
                    front.name = Some(trimmed.to_string());
                }
            }
            "description" => {
                let trimmed = value.trim();
                if !trimmed.is_empty() {
                    front.description = Some(trimmed.to_string());
                }
            }
            "delegator_exclude" => {
                front.exclude = value.trim() == "true";
                front.extra.insert(key, value);
            }
            _ => {
                front.extra.insert(key, value);
            }
        }
    }
    front
}

/// Parse flat `key: value` pairs with `|`/`>` block scalar support.
fn parse_block(lines: &[&str]) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].trim();
        i += 1;
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, rest)) = split_key(line) else {
            continue;
        };
        let value = rest.trim();

        if value == "|" || value == ">" {
            let folded = value == ">";
            let mut block = Vec::new();
            while i < lines.len() {
                let raw = lines[i];
                if raw.trim().is_empty() {
                    block.push("");
                    i += 1;
                    continue;
                }
                // An unindented line ends the block scalar.
                if !raw.starts_with(char::is_whitespace) {
                    break;
                }
                block.push(raw.trim());
                i += 1;
            }

            let joined = if folded {
                block
                    .iter()
                    .filter(|l| !l.is_empty())
                    .copied()
                    .collect::<Vec<_>>()
                    .join(" ")
            } else {
                block.join("\n").trim_end().to_string()
            };
            fields.insert(key.to_string(), joined);
        } else {
            fields.insert(key.to_string(), unquote(value).to_string());
        }
    }

    fields
}

/// Split `key: value`, accepting `[A-Za-z0-9_-]+` keys only.
fn split_key(line: &str) -> Option<(&str, &str)> {
    let (key, rest) = line.split_once(':')?;
    let key = key.trim();
    if key.is_empty()
        || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return None;
    }
    Some((key, rest))
}

fn unquote(value: &str) -> &str {
    let trimmed = value.trim();
    if trimmed.len() >= 2
        && ((trimmed.starts_with('"') && trimmed.ends_with('"'))
            || (trimmed.starts_with('\'') && trimmed.ends_with('\'')))
    {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    }
}
