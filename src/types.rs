use std::fmt;

use serde::{Deserialize, Serialize};

use crate::path::ConfPath;

/// The merge intent attached to a value read from an override source.
/// Plain documents use `Default` everywhere.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OverrideAction {
    /// `?=`: behave like a value in a plain document.
    #[default]
    #[serde(rename = "?=")]
    Default,
    #[serde(rename = "=")]
    Assign,
    #[serde(rename = "+=")]
    Append,
    /// `+=(path)`: append using the OS path-list separator.
    #[serde(rename = "+=(path)")]
    AppendPath,
    #[serde(rename = "=+")]
    Prepend,
    /// `=+(path)`: prepend using the OS path-list separator.
    #[serde(rename = "=+(path)")]
    PrependPath,
    #[serde(rename = "-=")]
    Remove,
    #[serde(rename = "=!")]
    Clear,
}

impl OverrideAction {
    /// Every action, longest token first so that a lexer can match greedily.
    pub const BY_TOKEN_LENGTH: [OverrideAction; 8] = [
        OverrideAction::AppendPath,
        OverrideAction::PrependPath,
        OverrideAction::Default,
        OverrideAction::Append,
        OverrideAction::Prepend,
        OverrideAction::Remove,
        OverrideAction::Clear,
        OverrideAction::Assign,
    ];

    pub fn token(self) -> &'static str {
        match self {
            OverrideAction::Default => "?=",
            OverrideAction::Assign => "=",
            OverrideAction::Append => "+=",
            OverrideAction::AppendPath => "+=(path)",
            OverrideAction::Prepend => "=+",
            OverrideAction::PrependPath => "=+(path)",
            OverrideAction::Remove => "-=",
            OverrideAction::Clear => "=!",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::BY_TOKEN_LENGTH
            .into_iter()
            .find(|action| action.token() == token)
    }

    /// `Default` and `Assign` both mean "this is the value".
    pub fn is_assignment(self) -> bool {
        matches!(self, OverrideAction::Default | OverrideAction::Assign)
    }
}

impl fmt::Display for OverrideAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Makes the sections under `target` inherit from the platform named by the
/// value at `selector`, instead of their declared inheritance source.
///
/// With `selector = tool/x/cross/os`, `platforms = tool/x`, `target = tool/x/cross`
/// and `sections = ["cmake"]`, a document setting `cross.os = "linux"` makes
/// `tool/x/cross/cmake` inherit from `tool/x/linux/cmake`.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossInheritance {
    pub selector: ConfPath,
    pub platforms: ConfPath,
    pub target: ConfPath,
    pub sections: Vec<String>,
}

impl CrossInheritance {
    /// Inheritance edges `(option, source)` for the given platform.
    pub fn edges(&self, platform: &str) -> Vec<(ConfPath, ConfPath)> {
        self.sections
            .iter()
            .map(|section| {
                (
                    self.target.child(section),
                    self.platforms.child(platform).child(section),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_round_trip() {
        for action in OverrideAction::BY_TOKEN_LENGTH {
            assert_eq!(OverrideAction::from_token(action.token()), Some(action));
        }
        assert_eq!(OverrideAction::from_token("=="), None);
    }

    #[test]
    fn tokens_are_ordered_longest_first() {
        let lengths: Vec<usize> = OverrideAction::BY_TOKEN_LENGTH
            .iter()
            .map(|a| a.token().len())
            .collect();
        let mut sorted = lengths.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(lengths, sorted);
    }

    #[test]
    fn serde_uses_tokens() {
        let json = serde_json::to_string(&OverrideAction::AppendPath).unwrap();
        assert_eq!(json, r#""+=(path)""#);
    }

    #[test]
    fn cross_edges_point_at_platform_sections() {
        let cross = CrossInheritance {
            selector: ConfPath::parse("t/cross/os"),
            platforms: ConfPath::parse("t"),
            target: ConfPath::parse("t/cross"),
            sections: vec!["cmake".into(), "sdist".into()],
        };
        assert_eq!(
            cross.edges("linux"),
            vec![
                (ConfPath::parse("t/cross/cmake"), ConfPath::parse("t/linux/cmake")),
                (ConfPath::parse("t/cross/sdist"), ConfPath::parse("t/linux/sdist")),
            ]
        );
    }
}
