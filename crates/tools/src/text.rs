//! Text tool: counting, case transforms, analysis, regex matching, diffs,
//! cleanup and JSON/XML pretty-printing.

use async_trait::async_trait;
use devassist_core::error::ToolError;
use devassist_core::tool::Tool;
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::Event;
use regex::Regex;
use serde_json::{Value, json};
use similar::{ChangeTag, DiffTag, TextDiff};
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::naming;

const OPERATIONS: &[&str] = &[
    "count",
    "wordcount",
    "reverse",
    "uppercase",
    "lowercase",
    "capitalize",
    "analyze",
    "regex",
    "transform",
    "diff",
    "normalize",
    "excerpt",
    "format_json",
    "format_xml",
    "camel_case",
    "snake_case",
    "kebab_case",
    "pascal_case",
];

const TARGET_CASES: &[&str] = &["upper", "lower", "title", "camel", "pascal", "snake", "kebab"];

const MAX_MATCHES: usize = 20;
const DEFAULT_EXCERPT_LENGTH: u64 = 100;

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w+\b").expect("valid regex"));
static SENTENCE_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]+").expect("valid regex"));
static PARAGRAPH_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n").expect("valid regex"));
static BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n\s*\n+").expect("valid regex"));
static SENTENCE_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]\s+").expect("valid regex"));

pub struct TextTool;

#[async_trait]
impl Tool for TextTool {
    fn name(&self) -> &str {
        "text"
    }

    fn description(&self) -> &str {
        "Process and manipulate text for development tasks"
    }

    fn category(&self) -> &str {
        "Utility"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": { "type": "string", "description": "The text to process" },
                "operation": {
                    "type": "string",
                    "description": "The operation to perform",
                    "enum": OPERATIONS
                },
                "pattern": {
                    "type": "string",
                    "description": "Regular expression for the regex operation"
                },
                "replacement": {
                    "type": "string",
                    "description": "Replacement for regex matches; `$1` refers to a group"
                },
                "target_case": {
                    "type": "string",
                    "description": "Target case for the transform operation",
                    "enum": TARGET_CASES
                },
                "text2": { "type": "string", "description": "Second text for the diff operation" },
                "length": {
                    "type": "integer",
                    "description": "Maximum excerpt length in characters (10 to 1000)",
                    "default": DEFAULT_EXCERPT_LENGTH
                }
            },
            "required": ["text", "operation"]
        })
    }

    fn validate_input(&self, arguments: &Value) -> Result<(), ToolError> {
        if arguments["text"].as_str().is_none() {
            return Err(ToolError::InvalidArguments("'text' must be a string".into()));
        }
        let operation = arguments["operation"].as_str().unwrap_or_default();
        if !OPERATIONS.contains(&operation) {
            return Err(ToolError::InvalidArguments(format!("Unsupported operation: '{operation}'")));
        }
        match operation {
            "regex" if arguments["pattern"].as_str().is_none() => {
                Err(ToolError::InvalidArguments("Regex pattern not specified".into()))
            }
            "transform" => {
                let target = arguments["target_case"].as_str().unwrap_or_default();
                if target.is_empty() {
                    return Err(ToolError::InvalidArguments("Target case not specified".into()));
                }
                if !TARGET_CASES.contains(&target) {
                    return Err(ToolError::InvalidArguments(format!("Unsupported target case: {target}")));
                }
                Ok(())
            }
            "diff" if arguments["text2"].as_str().is_none() => {
                Err(ToolError::InvalidArguments("Second text not provided for diff".into()))
            }
            "excerpt" if !arguments["length"].is_null() && arguments["length"].as_u64().is_none() => {
                Err(ToolError::InvalidArguments("'length' must be a non-negative integer".into()))
            }
            _ => Ok(()),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let text = arguments["text"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'text' argument".into()))?;
        let operation = arguments["operation"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'operation' argument".into()))?;

        let result = match operation {
            "count" => json!(text.chars().count()),
            "wordcount" => json!(text.split_whitespace().count()),
            "reverse" => json!(text.chars().rev().collect::<String>()),
            "uppercase" => json!(text.to_uppercase()),
            "lowercase" => json!(text.to_lowercase()),
            "capitalize" => json!(capitalize(text)),
            "analyze" => analyze(text),
            "regex" => {
                let pattern = arguments["pattern"].as_str().unwrap_or_default();
                find_matches(text, pattern, arguments["replacement"].as_str())?
            }
            "transform" => transform(text, arguments["target_case"].as_str().unwrap_or_default())?,
            "diff" => diff(text, arguments["text2"].as_str().unwrap_or_default()),
            "normalize" => normalize(text),
            "excerpt" => excerpt(text, arguments["length"].as_u64().unwrap_or(DEFAULT_EXCERPT_LENGTH)),
            "format_json" => format_json(text)?,
            "format_xml" => format_xml(text)?,
            "camel_case" => json!(naming::camel_case(text)),
            "snake_case" => json!(naming::snake_case(text)),
            "kebab_case" => json!(naming::kebab_case(text)),
            "pascal_case" => json!(naming::pascal_case(text)),
            other => return Err(ToolError::InvalidArguments(format!("Unsupported operation: '{other}'"))),
        };

        Ok(json!({
            "operation": operation,
            "text": text,
            "result": result,
        }))
    }
}

/// First character upper-cased, the rest lower-cased.
fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn analyze(text: &str) -> Value {
    let words: Vec<&str> = WORD.find_iter(text).map(|m| m.as_str()).collect();
    let word_count = words.len();
    let char_count = text.chars().count();
    let line_count = text.lines().count();
    let paragraph_count = PARAGRAPH_BREAK.split(text).count();
    let sentence_count = SENTENCE_END.split(text).filter(|s| !s.trim().is_empty()).count();

    let letters: usize = words.iter().map(|w| w.chars().count()).sum();
    let avg_word_length = if word_count > 0 {
        letters as f64 / word_count as f64
    } else {
        0.0
    };

    let mut freq: HashMap<String, usize> = HashMap::new();
    for word in &words {
        *freq.entry(word.to_lowercase()).or_default() += 1;
    }
    let mut top: Vec<(String, usize)> = freq.into_iter().collect();
    top.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    top.truncate(10);

    // Flesch reading-ease approximation using characters per word.
    let readability = if word_count > 0 && sentence_count > 0 {
        206.835 - 1.015 * (word_count as f64 / sentence_count as f64) - 84.6 * avg_word_length
    } else {
        0.0
    };

    json!({
        "char_count": char_count,
        "word_count": word_count,
        "line_count": line_count,
        "paragraph_count": paragraph_count,
        "sentence_count": sentence_count,
        "avg_word_length": round2(avg_word_length),
        "top_words": top.into_iter().map(|(w, n)| json!({"word": w, "count": n})).collect::<Vec<_>>(),
        "readability_score": round2(readability),
        "summary": format!(
            "Text contains {char_count} characters, {word_count} words, {line_count} lines, {paragraph_count} paragraphs"
        ),
    })
}

fn find_matches(text: &str, pattern: &str, replacement: Option<&str>) -> Result<Value, ToolError> {
    let regex = Regex::new(pattern)
        .map_err(|e| ToolError::InvalidArguments(format!("Invalid regex pattern: {e}")))?;

    let mut matches = Vec::new();
    let mut groups = Vec::new();
    let mut match_count = 0;
    for caps in regex.captures_iter(text) {
        match_count += 1;
        if matches.len() < MAX_MATCHES {
            matches.push(caps.get(0).map(|m| m.as_str()).unwrap_or_default().to_string());
            if caps.len() > 1 {
                let set: Vec<Option<&str>> = caps.iter().skip(1).map(|g| g.map(|m| m.as_str())).collect();
                groups.push(set);
            }
        }
    }

    let replaced = replacement.map(|r| regex.replace_all(text, r).into_owned());

    Ok(json!({
        "pattern": pattern,
        "matches": matches,
        "match_count": match_count,
        "groups": groups,
        "replaced_text": replaced,
        "summary": format!("Found {match_count} matches with pattern '{pattern}'"),
    }))
}

/// Upper-case the first letter of every alphabetic run, lower-case the rest.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for c in text.chars() {
        if in_word {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        in_word = c.is_alphabetic();
    }
    out
}

fn transform(text: &str, target_case: &str) -> Result<Value, ToolError> {
    let (transformed, description) = match target_case {
        "upper" => (text.to_uppercase(), "UPPERCASE"),
        "lower" => (text.to_lowercase(), "lowercase"),
        "title" => (title_case(text), "Title Case"),
        "camel" => (naming::camel_case(text), "camelCase"),
        "pascal" => (naming::pascal_case(text), "PascalCase"),
        "snake" => (naming::snake_case(text), "snake_case"),
        "kebab" => (naming::kebab_case(text), "kebab-case"),
        other => return Err(ToolError::InvalidArguments(format!("Unsupported target case: {other}"))),
    };
    let char_diff = transformed.chars().count() as i64 - text.chars().count() as i64;
    Ok(json!({
        "original_text": text,
        "transformed_text": transformed,
        "transformation": format!("Converted to {description}"),
        "char_diff": char_diff,
    }))
}

/// Line diff in `"  "`, `"- "`, `"+ "` prefixed form plus a character-level
/// similarity percentage.
fn diff(original: &str, changed: &str) -> Value {
    let lines = TextDiff::from_lines(original, changed);
    let mut listing = Vec::new();
    let (mut added, mut removed) = (0, 0);
    for change in lines.iter_all_changes() {
        let prefix = match change.tag() {
            ChangeTag::Equal => "  ",
            ChangeTag::Delete => {
                removed += 1;
                "- "
            }
            ChangeTag::Insert => {
                added += 1;
                "+ "
            }
        };
        listing.push(format!("{prefix}{}", change.value().trim_end_matches(['\n', '\r'])));
    }
    let changed_lines: usize = lines
        .ops()
        .iter()
        .filter(|op| op.tag() == DiffTag::Replace)
        .map(|op| op.old_range().len().min(op.new_range().len()))
        .sum();
    let similarity = round2(f64::from(TextDiff::from_chars(original, changed).ratio()) * 100.0);

    json!({
        "diff": listing,
        "added_lines": added,
        "removed_lines": removed,
        "changed_lines": changed_lines,
        "similarity": similarity,
        "summary": format!(
            "Diff shows {added} added, {removed} removed, and {changed_lines} changed lines. Similarity: {similarity}%"
        ),
    })
}

/// Unify line endings, strip trailing spaces, collapse blank-line runs to
/// one blank line and drop trailing blank lines. A final newline survives.
fn normalize(text: &str) -> Value {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    let stripped = unified.lines().map(str::trim_end).collect::<Vec<_>>().join("\n");
    let collapsed = BLANK_RUN.replace_all(&stripped, "\n\n");
    let mut normalized = collapsed.trim_end().to_string();
    if text.ends_with('\n') {
        normalized.push('\n');
    }

    let original_length = text.chars().count();
    let normalized_length = normalized.chars().count();
    let removed = original_length.saturating_sub(normalized_length);
    json!({
        "original_text": text,
        "normalized_text": normalized,
        "original_length": original_length,
        "normalized_length": normalized_length,
        "original_lines": text.lines().count(),
        "normalized_lines": normalized.lines().count(),
        "bytes_removed": removed,
        "summary": format!("Normalized text. Removed {removed} characters."),
    })
}

/// Sentences with their terminating punctuation, split on whitespace after `.!?`.
fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    for m in SENTENCE_BREAK.find_iter(text) {
        out.push(&text[start..m.start() + 1]);
        start = m.end();
    }
    if start < text.len() {
        out.push(&text[start..]);
    }
    out
}

/// Shorten to at most `length` characters (clamped to 10..=1000), breaking
/// at a sentence end when that keeps at least half, else at a word.
fn excerpt(text: &str, length: u64) -> Value {
    let length = length.clamp(10, 1000) as usize;
    let original_length = text.chars().count();
    if original_length <= length {
        return json!({
            "original_text": text,
            "excerpt": text,
            "length": original_length,
            "truncated": false,
        });
    }

    let mut by_sentence = String::new();
    for sentence in sentences(text) {
        if by_sentence.chars().count() + sentence.chars().count() > length {
            break;
        }
        by_sentence.push_str(sentence);
        by_sentence.push(' ');
    }

    let cut = if by_sentence.is_empty() || by_sentence.chars().count() < length / 2 {
        let mut by_word = String::new();
        for word in text.split_whitespace() {
            if by_word.chars().count() + word.chars().count() > length - 3 {
                break;
            }
            by_word.push_str(word);
            by_word.push(' ');
        }
        format!("{}...", by_word.trim_end())
    } else {
        format!("{}...", by_sentence.trim_end())
    };

    json!({
        "original_text": text,
        "excerpt": cut,
        "length": cut.chars().count(),
        "truncated": true,
        "original_length": original_length,
    })
}

fn format_json(text: &str) -> Result<Value, ToolError> {
    let parsed: Value =
        serde_json::from_str(text).map_err(|e| ToolError::failed("text", format!("Invalid JSON: {e}")))?;
    let formatted =
        serde_json::to_string_pretty(&parsed).map_err(|e| ToolError::failed("text", e.to_string()))?;
    let (json_type, item_count) = match &parsed {
        Value::Object(map) => ("object", map.len()),
        Value::Array(items) => ("array", items.len()),
        Value::String(_) => ("string", 1),
        Value::Number(_) => ("number", 1),
        Value::Bool(_) => ("boolean", 1),
        Value::Null => ("null", 1),
    };
    Ok(json!({
        "original_text": text,
        "formatted_text": formatted,
        "json_type": json_type,
        "item_count": item_count,
        "valid_json": true,
    }))
}

fn format_xml(text: &str) -> Result<Value, ToolError> {
    let fail = |e: String| ToolError::failed("text", format!("XML formatting error: {e}"));

    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    let mut elements = 0;
    loop {
        match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(event) => {
                if matches!(event, Event::Start(_) | Event::Empty(_)) {
                    elements += 1;
                }
                writer.write_event(event).map_err(|e| fail(e.to_string()))?;
            }
            Err(e) => return Err(fail(e.to_string())),
        }
    }
    if elements == 0 {
        return Err(fail("no root element".into()));
    }
    let formatted = String::from_utf8(writer.into_inner()).map_err(|e| fail(e.to_string()))?;

    Ok(json!({
        "original_text": text,
        "formatted_text": formatted,
        "element_count": elements,
        "valid_xml": true,
    }))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
