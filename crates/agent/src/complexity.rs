//! Task complexity scoring for the dispatcher's auto mode.
//!
//! The score adds weighted hits of operation patterns, 0.1 per word,
//! 0.05 per symbol character and 1.5 per distinct tool family mentioned,
//! then caps the total at [`MAX_SCORE`]. Patterns match anywhere in the
//! lowercased text, including inside longer words.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

pub const MAX_SCORE: f64 = 10.0;
const WORD_WEIGHT: f64 = 0.1;
const SYMBOL_WEIGHT: f64 = 0.05;
const TOOL_WEIGHT: f64 = 1.5;

static OPERATIONS: LazyLock<Vec<(Regex, f64)>> = LazyLock::new(|| {
    [
        (r"(calculate|compute|evaluate)", 1.0),
        (r"(search|find|look up)", 1.0),
        (r"(count|process|analyze|transform)\s+text", 1.0),
        (r"run\s+code|execute", 1.5),
        (r"compare|contrast|evaluate", 2.0),
        (r"optimize|improve|enhance", 2.5),
        (r"and|then|after|before", 1.0),
        (r"if|when|unless|otherwise", 1.5),
        (r"all|every|each", 1.0),
        (r"most|best|optimal", 1.5),
        (r"create\s+(api|endpoint|component|class|model)", 2.0),
        (r"generate\s+(api|endpoint|component|class|model)", 2.0),
        (r"design|architect", 3.0),
        (r"debug|troubleshoot|fix", 2.5),
        (r"full\s+stack|end-to-end|complete", 3.0),
        (r"database|storage|persistence", 2.0),
        (r"authentication|security|encryption", 2.5),
        (r"deploy|release|publish", 2.0),
        (r"test|validate|verify", 1.5),
        (r"front-?end|back-?end|ui|ux", 1.5),
    ]
    .into_iter()
    .map(|(pattern, weight)| (Regex::new(pattern).expect("complexity pattern should compile"), weight))
    .collect()
});

const TOOL_KEYWORDS: &[(&str, &[&str])] = &[
    ("calculator", &["calculate", "compute", "evaluate", "math"]),
    ("search", &["search", "find", "look up", "query"]),
    ("text", &["text", "string", "characters", "words"]),
    ("code", &["code", "execute", "run", "python"]),
    ("react_component", &["react", "component", "ui", "frontend"]),
    ("api_endpoint", &["api", "endpoint", "backend", "rest"]),
    ("database_model", &["database", "model", "schema", "orm"]),
];

/// Breakdown of a complexity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexityReport {
    pub score: f64,
    pub pattern_score: f64,
    pub words: usize,
    pub symbols: usize,
    /// Tool families the task appears to need.
    pub tools: Vec<String>,
}

/// Score `task` and keep the parts that made up the score.
pub fn assess(task: &str) -> ComplexityReport {
    let lowered = task.to_lowercase();

    let pattern_score: f64 = OPERATIONS
        .iter()
        .map(|(re, weight)| weight * re.find_iter(&lowered).count() as f64)
        .sum();

    let words = task.split_whitespace().count();
    let symbols = task
        .chars()
        .filter(|c| !c.is_alphanumeric() && !c.is_whitespace())
        .count();

    let tools: Vec<String> = TOOL_KEYWORDS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|kw| lowered.contains(kw)))
        .map(|(name, _)| name.to_string())
        .collect();

    let raw = pattern_score
        + words as f64 * WORD_WEIGHT
        + symbols as f64 * SYMBOL_WEIGHT
        + tools.len() as f64 * TOOL_WEIGHT;

    ComplexityReport {
        score: raw.min(MAX_SCORE),
        pattern_score,
        words,
        symbols,
        tools,
    }
}

/// Deterministic complexity score in `0.0..=10.0`.
pub fn analyze_complexity(task: &str) -> f64 {
    assess(task).score
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_word_task_scores_low() {
        let report = assess("calculate");
        // 1.0 pattern + 0.1 word + 1.5 calculator family
        assert!((report.score - 2.6).abs() < 1e-9);
        assert_eq!(report.tools, vec!["calculator".to_string()]);
    }

    #[test]
    fn empty_task_scores_zero() {
        assert_eq!(analyze_complexity(""), 0.0);
    }

    #[test]
    fn multi_clause_design_task_scores_high() {
        let task = "Design a database schema, then deploy the backend API and test every endpoint";
        assert!(analyze_complexity(task) >= 7.0);
    }

    #[test]
    fn score_is_capped() {
        let task = "design architect debug fix deploy release database security ".repeat(5);
        assert_eq!(analyze_complexity(&task), MAX_SCORE);
    }

    #[test]
    fn symbols_and_words_contribute() {
        let report = assess("x + y");
        assert_eq!(report.words, 3);
        assert_eq!(report.symbols, 1);
        assert!((report.score - 0.35).abs() < 1e-9);
    }

    #[test]
    fn scoring_is_deterministic() {
        let task = "Search for the best way to optimize text processing";
        assert_eq!(analyze_complexity(task), analyze_complexity(task));
    }
}
