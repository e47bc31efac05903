//! Permutation engine: expands common rules, rule variants and flavor levels
//! into the full cartesian product of test documents.
//!
//! The engine is pure. Loading sources and persisting output live in
//! [`super::permutation_service`].

use chrono::{DateTime, Utc};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{FlavorLevel, Permutation, RuleDocument, COMMENT_MARKER};

/// Result of one expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    /// Every input document concatenated; ground truth for evaluation.
    pub aggregate: String,
    pub permutations: Vec<Permutation>,
    /// Flavor counts of the levels that contributed a dimension.
    pub level_sizes: Vec<(u32, usize)>,
}

/// Expands rule/flavor inputs into permutations.
#[derive(Debug, Clone)]
pub struct PermutationEngine {
    generated_at: DateTime<Utc>,
}

impl PermutationEngine {
    pub fn new() -> Self {
        Self {
            generated_at: Utc::now(),
        }
    }

    /// Fix the timestamp written into provenance comments.
    pub const fn at(generated_at: DateTime<Utc>) -> Self {
        Self { generated_at }
    }

    /// Expand the inputs.
    ///
    /// `common` must be present and non-empty. `levels` may arrive in any
    /// order; they are sorted ascending and empty ones are dropped instead of
    /// multiplying the count by zero.
    pub fn expand(
        &self,
        common: Option<&RuleDocument>,
        rules: &[RuleDocument],
        levels: &[FlavorLevel],
    ) -> DomainResult<Expansion> {
        let common = common
            .filter(|c| !c.is_blank())
            .ok_or_else(|| {
                DomainError::SourceMissing(
                    common.map(|c| c.source_id.clone()).unwrap_or_default().into(),
                )
            })?;

        let mut ordered: Vec<&FlavorLevel> = levels.iter().collect();
        ordered.sort_by_key(|l| l.level);
        let active: Vec<&FlavorLevel> = ordered.iter().copied().filter(|l| !l.is_empty()).collect();

        let combinations = cartesian(&active);
        let base = [RuleDocument::base()];
        let rule_set: &[RuleDocument] = if rules.is_empty() { &base } else { rules };

        let permutations = rule_set
            .iter()
            .flat_map(|rule| {
                combinations.iter().map(move |pick| Permutation {
                    rule: Some(rule.clone()),
                    flavor_pick: pick.iter().map(|f| (*f).clone()).collect(),
                })
            })
            .collect();

        Ok(Expansion {
            aggregate: self.render_aggregate(common, rules, &ordered),
            permutations,
            level_sizes: active.iter().map(|l| (l.level, l.flavors.len())).collect(),
        })
    }

    fn render_aggregate(
        &self,
        common: &RuleDocument,
        rules: &[RuleDocument],
        levels: &[&FlavorLevel],
    ) -> String {
        let mut sections = vec![format!(
            "{COMMENT_MARKER} All rules aggregate\n{COMMENT_MARKER} Generated: {}",
            self.generated_at.to_rfc3339()
        )];
        sections.push(section("Common rules", common));
        for rule in rules {
            sections.push(section("Rule variant", rule));
        }
        for level in levels {
            for flavor in &level.flavors {
                sections.push(section(&format!("Flavor level {}", level.level), flavor));
            }
        }
        let mut out = sections.join("\n\n");
        out.push('\n');
        out
    }

    /// Provenance block, blank line, then rule and flavor bodies. Common
    /// rules are not included.
    pub fn render_permutation(&self, permutation: &Permutation) -> String {
        let mut header = vec![format!("{COMMENT_MARKER} Permutation: {}", permutation.name())];
        if let Some(rule) = &permutation.rule {
            header.push(format!("{COMMENT_MARKER} Rule: {}", rule.source_id));
        }
        for flavor in &permutation.flavor_pick {
            header.push(format!(
                "{COMMENT_MARKER} Flavor level {}: {}",
                flavor.level.unwrap_or_default(),
                flavor.source_id
            ));
        }
        header.push(format!(
            "{COMMENT_MARKER} Generated: {}",
            self.generated_at.to_rfc3339()
        ));

        let body = permutation.bodies().collect::<Vec<_>>().join("\n\n");
        format!("{}\n\n{}\n", header.join("\n"), body)
    }
}

impl Default for PermutationEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn section(kind: &str, doc: &RuleDocument) -> String {
    format!(
        "{COMMENT_MARKER} {kind}: {}\n{}",
        doc.source_id,
        doc.content.trim()
    )
}

/// Iterative cartesian product, seeded with one empty combination.
fn cartesian<'a>(levels: &[&'a FlavorLevel]) -> Vec<Vec<&'a RuleDocument>> {
    levels.iter().fold(vec![Vec::new()], |acc, level| {
        acc.iter()
            .flat_map(|combo| {
                level.flavors.iter().map(move |flavor| {
                    let mut next = combo.clone();
                    next.push(flavor);
                    next
                })
            })
            .collect()
    })
}

/// Expected permutation count: `max(1, rules) * product(non-empty level sizes)`.
pub fn expected_count(rule_count: usize, level_sizes: impl IntoIterator<Item = usize>) -> usize {
    level_sizes
        .into_iter()
        .filter(|&n| n > 0)
        .fold(rule_count.max(1), |acc, n| acc * n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn doc(id: &str, body: &str) -> RuleDocument {
        RuleDocument::new(id, body)
    }

    fn engine() -> PermutationEngine {
        PermutationEngine::at(DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z").unwrap().into())
    }

    fn sample_levels() -> Vec<FlavorLevel> {
        vec![
            FlavorLevel::new(2, vec![doc("f2/loud.md", "LOUD"), doc("f2/quiet.md", "quiet")]),
            FlavorLevel::new(
                1,
                vec![doc("f1/a.md", "A"), doc("f1/b.md", "B"), doc("f1/c.md", "C")],
            ),
        ]
    }

    #[test]
    fn test_missing_common_is_fatal() {
        let err = engine().expand(None, &[], &[]).unwrap_err();
        assert!(matches!(err, DomainError::SourceMissing(_)));

        let blank = doc("common.md", "   \n");
        assert!(engine().expand(Some(&blank), &[], &[]).is_err());
    }

    #[test]
    fn test_count_is_rules_times_level_sizes() {
        let common = doc("common.md", "Be kind.");
        let rules = vec![doc("r/strict.md", "strict"), doc("r/lax.md", "lax")];
        let expansion = engine().expand(Some(&common), &rules, &sample_levels()).unwrap();

        assert_eq!(expansion.permutations.len(), 2 * 3 * 2);
        assert_eq!(expansion.level_sizes, vec![(1, 3), (2, 2)]);
    }

    #[test]
    fn test_no_rules_uses_base_rule() {
        let common = doc("common.md", "Be kind.");
        let expansion = engine().expand(Some(&common), &[], &sample_levels()).unwrap();

        assert_eq!(expansion.permutations.len(), 6);
        assert_eq!(expansion.permutations[0].name(), "base_L1_a_L2_loud");
    }

    #[test]
    fn test_no_rules_no_levels_yields_single_base() {
        let common = doc("common.md", "Be kind.");
        let expansion = engine().expand(Some(&common), &[], &[]).unwrap();
        assert_eq!(expansion.permutations.len(), 1);
        assert_eq!(expansion.permutations[0].name(), "base");
    }

    #[test]
    fn test_empty_level_is_skipped_not_multiplied() {
        let common = doc("common.md", "Be kind.");
        let mut levels = sample_levels();
        levels.push(FlavorLevel::new(3, vec![]));
        let expansion = engine()
            .expand(Some(&common), &[doc("r/x.md", "x")], &levels)
            .unwrap();

        assert_eq!(expansion.permutations.len(), 6);
        assert!(expansion.permutations.iter().all(|p| !p.name().contains("L3")));
    }

    #[test]
    fn test_levels_applied_in_ascending_order() {
        let common = doc("common.md", "Be kind.");
        let expansion = engine()
            .expand(Some(&common), &[doc("r/x.md", "x")], &sample_levels())
            .unwrap();
        let names: Vec<String> = expansion.permutations.iter().map(Permutation::name).collect();

        assert_eq!(names[0], "x_L1_a_L2_loud");
        assert_eq!(names[1], "x_L1_a_L2_quiet");
        assert_eq!(names[5], "x_L1_c_L2_quiet");
        assert_eq!(names.iter().collect::<HashSet<_>>().len(), names.len());
    }

    #[test]
    fn test_expansion_is_deterministic() {
        let common = doc("common.md", "Be kind.");
        let rules = vec![doc("r/x.md", "x")];
        let first = engine().expand(Some(&common), &rules, &sample_levels()).unwrap();
        let second = engine().expand(Some(&common), &rules, &sample_levels()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_permutation_document_excludes_common() {
        let common = doc("common.md", "COMMON TEXT");
        let expansion = engine()
            .expand(Some(&common), &[doc("r/x.md", "Rule X")], &sample_levels())
            .unwrap();
        let rendered = engine().render_permutation(&expansion.permutations[0]);

        assert!(!rendered.contains("COMMON TEXT"));
        assert!(rendered.starts_with("// Permutation: x_L1_a_L2_loud\n// Rule: r/x.md\n"));
        assert!(rendered.contains("// Flavor level 2: f2/loud.md"));
        assert!(rendered.ends_with("\n\nRule X\n\nA\n\nLOUD\n"));
    }

    #[test]
    fn test_aggregate_order() {
        let common = doc("common.md", "COMMON");
        let expansion = engine()
            .expand(Some(&common), &[doc("r/x.md", "RULE")], &sample_levels())
            .unwrap();
        let agg = &expansion.aggregate;

        let pos = |needle: &str| agg.find(needle).unwrap();
        assert!(pos("COMMON") < pos("RULE"));
        assert!(pos("RULE") < pos("\nA\n"));
        assert!(pos("\nC\n") < pos("LOUD"));
        assert!(agg.contains("// Flavor level 1: f1/a.md"));
    }

    #[test]
    fn test_expected_count() {
        assert_eq!(expected_count(0, [3, 0, 2]), 6);
        assert_eq!(expected_count(4, []), 4);
        assert_eq!(expected_count(2, [0]), 2);
    }
}
