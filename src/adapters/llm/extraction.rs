//! Reply text extraction from chat completion responses.
//!
//! Providers disagree on where the generated text lives. Extraction walks an
//! ordered list of strategies: the configured path first, then the shapes
//! seen in the wild. The first strategy yielding a non-empty string wins.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;

use crate::domain::errors::{RagError, RagResult};

/// One step of a response path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// A parsed dotted path such as `choices[0].message.content`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponsePath {
    segments: Vec<PathSegment>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathParseError {
    #[error("response path is empty")]
    Empty,

    #[error("empty key at position {0}")]
    EmptyKey(usize),

    #[error("invalid array index '{0}'")]
    InvalidIndex(String),

    #[error("unclosed '[' in '{0}'")]
    Unclosed(String),
}

impl ResponsePath {
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Resolve the path against `value`, returning the string it points at.
    pub fn resolve<'a>(&self, value: &'a Value) -> Option<&'a str> {
        self.segments
            .iter()
            .try_fold(value, |node, segment| match segment {
                PathSegment::Key(key) => node.get(key.as_str()),
                PathSegment::Index(index) => node.get(*index),
            })
            .and_then(Value::as_str)
    }
}

impl FromStr for ResponsePath {
    type Err = PathParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(PathParseError::Empty);
        }

        let mut segments = Vec::new();
        for (position, part) in raw.split('.').enumerate() {
            let (key, mut rest) = part.find('[').map_or((part, ""), |i| part.split_at(i));
            if key.is_empty() && rest.is_empty() {
                return Err(PathParseError::EmptyKey(position));
            }
            if !key.is_empty() {
                segments.push(PathSegment::Key(key.to_string()));
            }
            while let Some(open) = rest.strip_prefix('[') {
                let close = open
                    .find(']')
                    .ok_or_else(|| PathParseError::Unclosed(part.to_string()))?;
                let index = open[..close]
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| PathParseError::InvalidIndex(open[..close].to_string()))?;
                segments.push(PathSegment::Index(index));
                rest = &open[close + 1..];
            }
            if !rest.is_empty() {
                return Err(PathParseError::InvalidIndex(rest.to_string()));
            }
        }
        Ok(Self { segments })
    }
}

impl fmt::Display for ResponsePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if i == 0 => write!(f, "{key}")?,
                PathSegment::Key(key) => write!(f, ".{key}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// Where to look for the reply text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionStrategy {
    ConfiguredPath(ResponsePath),
    /// OpenAI: `choices[0].message.content`
    ChoicesMessageContent,
    /// `data.text`
    DataText,
    /// `result.content`
    ResultContent,
    TopLevelContent,
    TopLevelText,
}

impl ExtractionStrategy {
    pub fn extract<'a>(&self, value: &'a Value) -> Option<&'a str> {
        match self {
            Self::ConfiguredPath(path) => path.resolve(value),
            Self::ChoicesMessageContent => value
                .get("choices")
                .and_then(|c| c.get(0))
                .and_then(|c| c.get("message"))
                .and_then(|m| m.get("content"))
                .and_then(Value::as_str),
            Self::DataText => value.get("data").and_then(|d| d.get("text")).and_then(Value::as_str),
            Self::ResultContent => value
                .get("result")
                .and_then(|r| r.get("content"))
                .and_then(Value::as_str),
            Self::TopLevelContent => value.get("content").and_then(Value::as_str),
            Self::TopLevelText => value.get("text").and_then(Value::as_str),
        }
    }
}

const BUILT_IN: [ExtractionStrategy; 5] = [
    ExtractionStrategy::ChoicesMessageContent,
    ExtractionStrategy::DataText,
    ExtractionStrategy::ResultContent,
    ExtractionStrategy::TopLevelContent,
    ExtractionStrategy::TopLevelText,
];

/// Strategies to try for a configured path, in order.
///
/// An unparseable path is logged and skipped; the built-in shapes still apply.
pub fn strategies_for(configured_path: &str) -> Vec<ExtractionStrategy> {
    let mut strategies = Vec::with_capacity(BUILT_IN.len() + 1);
    if !configured_path.trim().is_empty() {
        match configured_path.parse::<ResponsePath>() {
            Ok(path) => strategies.push(ExtractionStrategy::ConfiguredPath(path)),
            Err(e) => {
                tracing::warn!(path = configured_path, error = %e, "Ignoring invalid response path");
            }
        }
    }
    strategies.extend(BUILT_IN);
    strategies
}

/// Extract the reply text, failing with `NoContentExtracted` when nothing matches.
pub fn extract_content(value: &Value, strategies: &[ExtractionStrategy]) -> RagResult<String> {
    strategies
        .iter()
        .filter_map(|strategy| strategy.extract(value))
        .find(|text| !text.trim().is_empty())
        .map(str::to_string)
        .ok_or(RagError::NoContentExtracted)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_default_path() {
        let path: ResponsePath = "choices[0].message.content".parse().unwrap();
        assert_eq!(
            path.segments(),
            &[
                PathSegment::Key("choices".into()),
                PathSegment::Index(0),
                PathSegment::Key("message".into()),
                PathSegment::Key("content".into()),
            ]
        );
    }

    #[test]
    fn test_parse_rejects_malformed_paths() {
        assert_eq!("".parse::<ResponsePath>(), Err(PathParseError::Empty));
        assert_eq!("a..b".parse::<ResponsePath>(), Err(PathParseError::EmptyKey(1)));
        assert!(matches!("a[x]".parse::<ResponsePath>(), Err(PathParseError::InvalidIndex(_))));
        assert!(matches!("a[0".parse::<ResponsePath>(), Err(PathParseError::Unclosed(_))));
        assert!(matches!("a[0]b".parse::<ResponsePath>(), Err(PathParseError::InvalidIndex(_))));
    }

    #[test]
    fn test_configured_path_wins() {
        let body = json!({
            "output": {"choices": [{"text": "custom"}]},
            "choices": [{"message": {"content": "openai"}}]
        });
        let strategies = strategies_for("output.choices[0].text");
        assert_eq!(extract_content(&body, &strategies).unwrap(), "custom");
    }

    #[test]
    fn test_fallback_shapes_in_order() {
        let strategies = strategies_for("");
        assert_eq!(
            extract_content(&json!({"data": {"text": "d"}, "content": "c"}), &strategies).unwrap(),
            "d"
        );
        assert_eq!(
            extract_content(&json!({"result": {"content": "r"}}), &strategies).unwrap(),
            "r"
        );
        assert_eq!(extract_content(&json!({"text": "t"}), &strategies).unwrap(), "t");
    }

    #[test]
    fn test_missing_or_empty_content_fails() {
        let strategies = strategies_for("choices[0].message.content");
        let err = extract_content(&json!({"choices": []}), &strategies).unwrap_err();
        assert!(matches!(err, RagError::NoContentExtracted));
        let err = extract_content(&json!({"content": "  "}), &strategies).unwrap_err();
        assert!(matches!(err, RagError::NoContentExtracted));
    }

    #[test]
    fn test_invalid_configured_path_still_uses_builtins() {
        let strategies = strategies_for("choices[");
        assert_eq!(strategies.len(), BUILT_IN.len());
        assert_eq!(extract_content(&json!({"content": "ok"}), &strategies).unwrap(), "ok");
    }

    proptest! {
        #[test]
        fn prop_path_display_round_trips(
            keys in prop::collection::vec("[a-z_]{1,8}", 1..5),
            indexes in prop::collection::vec(prop::option::of(0usize..20), 1..5),
        ) {
            let raw = keys
                .iter()
                .zip(indexes.iter().chain(std::iter::repeat(&None)))
                .map(|(k, i)| i.map_or_else(|| k.clone(), |i| format!("{k}[{i}]")))
                .collect::<Vec<_>>()
                .join(".");
            let path: ResponsePath = raw.parse().unwrap();
            prop_assert_eq!(path.to_string(), raw);
        }
    }
}
