//! Rule and flavor documents, and the permutations built from them.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Source id of the synthetic rule used when no rule variants exist.
pub const BASE_RULE_ID: &str = "base";

/// One text unit read from disk: a rule variant or a flavor variant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuleDocument {
    /// Originating path or identifier. Used for provenance and filenames.
    pub source_id: String,
    /// Document body with comment lines already removed.
    pub content: String,
    /// Flavor level this document belongs to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
}

impl RuleDocument {
    pub fn new(source_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            content: content.into(),
            level: None,
        }
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = Some(level);
        self
    }

    /// Empty stand-in rule so flavor combinations are still produced.
    pub fn base() -> Self {
        Self::new(BASE_RULE_ID, "")
    }

    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// File name of the source without directories or extension.
    pub fn stem(&self) -> String {
        Path::new(&self.source_id)
            .file_stem()
            .map_or_else(|| self.source_id.clone(), |s| s.to_string_lossy().into_owned())
    }
}

/// One dimension of the permutation space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlavorLevel {
    pub level: u32,
    pub flavors: Vec<RuleDocument>,
}

impl FlavorLevel {
    pub fn new(level: u32, flavors: Vec<RuleDocument>) -> Self {
        let flavors = flavors.into_iter().map(|f| f.with_level(level)).collect();
        Self { level, flavors }
    }

    pub fn is_empty(&self) -> bool {
        self.flavors.is_empty()
    }
}

/// A concrete rule plus one flavor per non-empty level, in ascending level order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permutation {
    pub rule: Option<RuleDocument>,
    pub flavor_pick: Vec<RuleDocument>,
}

impl Permutation {
    /// Deterministic identity of this permutation, without extension.
    ///
    /// `<rule-stem>` followed by `L<level>_<flavor-stem>` for each pick,
    /// joined by underscores.
    pub fn name(&self) -> String {
        let mut parts = vec![self
            .rule
            .as_ref()
            .map_or_else(|| BASE_RULE_ID.to_string(), RuleDocument::stem)];
        for flavor in &self.flavor_pick {
            parts.push(format!("L{}_{}", flavor.level.unwrap_or_default(), flavor.stem()));
        }
        parts.join("_")
    }

    pub fn file_name(&self) -> String {
        format!("{}.md", self.name())
    }

    /// Rule and flavor bodies in order, blank ones skipped.
    pub fn bodies(&self) -> impl Iterator<Item = &str> {
        self.rule
            .iter()
            .chain(self.flavor_pick.iter())
            .filter(|doc| !doc.is_blank())
            .map(|doc| doc.content.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stem_strips_directories_and_extension() {
        let doc = RuleDocument::new("rules/variants/strict.md", "x");
        assert_eq!(doc.stem(), "strict");
        assert_eq!(RuleDocument::base().stem(), "base");
    }

    #[test]
    fn test_flavor_level_tags_documents() {
        let level = FlavorLevel::new(2, vec![RuleDocument::new("a.md", "A")]);
        assert_eq!(level.flavors[0].level, Some(2));
    }

    #[test]
    fn test_permutation_name() {
        let perm = Permutation {
            rule: Some(RuleDocument::new("rules/strict.md", "be strict")),
            flavor_pick: vec![
                RuleDocument::new("f1/formal.md", "formal").with_level(1),
                RuleDocument::new("f2/pirate.txt", "arr").with_level(2),
            ],
        };
        assert_eq!(perm.name(), "strict_L1_formal_L2_pirate");
        assert_eq!(perm.file_name(), "strict_L1_formal_L2_pirate.md");
    }

    #[test]
    fn test_bodies_skip_blank_base_rule() {
        let perm = Permutation {
            rule: Some(RuleDocument::base()),
            flavor_pick: vec![RuleDocument::new("f/x.md", "  flavor  ").with_level(1)],
        };
        assert_eq!(perm.bodies().collect::<Vec<_>>(), vec!["flavor"]);
        assert_eq!(perm.name(), "base_L1_x");
    }
}
