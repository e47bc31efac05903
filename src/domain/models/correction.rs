//! Evaluation verdicts and the corrections extracted from them.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static EVALUATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)EVALUATION:\s*(PASS|FAIL)").expect("valid evaluation pattern")
});

static CORRECTIONS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)CORRECTIONS:\s*(.*)\z").expect("valid corrections pattern")
});

/// Sentinel correction text that carries no actionable change.
const NONE_NEEDED: &str = "none needed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Fail,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}

/// Parsed evaluation artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionRecord {
    pub verdict: Verdict,
    /// Actionable correction. `None` for passes, missing sections and the
    /// "none needed" sentinel.
    pub correction_text: Option<String>,
}

impl CorrectionRecord {
    /// Decode an evaluation text.
    ///
    /// Returns `None` when no `EVALUATION:` verdict is present; such
    /// artifacts count as neither pass nor fail.
    pub fn parse(text: &str) -> Option<Self> {
        let captures = EVALUATION_RE.captures(text)?;
        let verdict = if captures[1].eq_ignore_ascii_case("PASS") {
            Verdict::Pass
        } else {
            Verdict::Fail
        };

        let correction_text = match verdict {
            Verdict::Pass => None,
            Verdict::Fail => CORRECTIONS_RE
                .captures(text)
                .map(|c| c[1].trim().to_string())
                .filter(|c| !c.is_empty() && !is_none_needed(c)),
        };

        Some(Self {
            verdict,
            correction_text,
        })
    }

    pub fn is_failure(&self) -> bool {
        self.verdict == Verdict::Fail
    }
}

fn is_none_needed(text: &str) -> bool {
    text.trim_end_matches('.').trim().eq_ignore_ascii_case(NONE_NEEDED)
}

/// Join the actionable corrections of failed records, in the given order,
/// separated by a blank line. `None` when nothing is actionable.
pub fn aggregate_corrections<'a>(
    records: impl IntoIterator<Item = &'a CorrectionRecord>,
) -> Option<String> {
    let texts: Vec<&str> = records
        .into_iter()
        .filter(|r| r.is_failure())
        .filter_map(|r| r.correction_text.as_deref())
        .collect();

    if texts.is_empty() {
        None
    } else {
        Some(texts.join("\n\n"))
    }
}

/// Pass/fail counts over a set of parsed records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationTally {
    pub total: usize,
    pub failures: usize,
    /// Artifacts with no recognizable verdict.
    pub unparsed: usize,
}

impl EvaluationTally {
    pub fn from_parsed<'a>(parsed: impl IntoIterator<Item = Option<&'a CorrectionRecord>>) -> Self {
        parsed
            .into_iter()
            .fold(Self::default(), |mut tally, record| {
                match record {
                    Some(r) => {
                        tally.total += 1;
                        if r.is_failure() {
                            tally.failures += 1;
                        }
                    }
                    None => tally.unparsed += 1,
                }
                tally
            })
    }

    pub const fn passes(&self) -> usize {
        self.total - self.failures
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.passes() as f64 / self.total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fail_with_correction() {
        let text = "EVALUATION: FAIL\nThe answer ignored rule 3.\nCORRECTIONS: Add more detail.";
        let record = CorrectionRecord::parse(text).unwrap();
        assert_eq!(record.verdict, Verdict::Fail);
        assert_eq!(record.correction_text.as_deref(), Some("Add more detail."));
    }

    #[test]
    fn test_verdict_word_suffix_still_parses() {
        let record =
            CorrectionRecord::parse("EVALUATION: FAILED\nCORRECTIONS: Add more detail.").unwrap();
        assert_eq!(record.verdict, Verdict::Fail);
        assert_eq!(record.correction_text.as_deref(), Some("Add more detail."));

        let record = CorrectionRecord::parse("EVALUATION: PASSED").unwrap();
        assert_eq!(record.verdict, Verdict::Pass);
    }

    #[test]
    fn test_parse_none_needed_is_not_actionable() {
        let record = CorrectionRecord::parse("EVALUATION: FAIL\nCORRECTIONS: None needed").unwrap();
        assert!(record.is_failure());
        assert!(record.correction_text.is_none());
        assert!(aggregate_corrections([&record]).is_none());
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        let record = CorrectionRecord::parse("evaluation:   pass").unwrap();
        assert_eq!(record.verdict, Verdict::Pass);
        assert!(record.correction_text.is_none());

        let record = CorrectionRecord::parse("Evaluation: Fail\ncorrections:\n  Be brief.\n").unwrap();
        assert_eq!(record.correction_text.as_deref(), Some("Be brief."));
    }

    #[test]
    fn test_corrections_run_to_end_of_text() {
        let text = "EVALUATION: FAIL\nCORRECTIONS: First line.\n\nSecond paragraph.";
        let record = CorrectionRecord::parse(text).unwrap();
        assert_eq!(
            record.correction_text.as_deref(),
            Some("First line.\n\nSecond paragraph.")
        );
    }

    #[test]
    fn test_missing_marker_is_anomaly() {
        assert!(CorrectionRecord::parse("Looks fine to me.").is_none());
        assert!(CorrectionRecord::parse("EVALUATION: MAYBE").is_none());
    }

    #[test]
    fn test_aggregate_skips_passes_and_sentinels() {
        let records = [
            CorrectionRecord::parse("EVALUATION: FAIL\nCORRECTIONS: One.").unwrap(),
            CorrectionRecord::parse("EVALUATION: PASS\nCORRECTIONS: ignored").unwrap(),
            CorrectionRecord::parse("EVALUATION: FAIL\nCORRECTIONS: none needed.").unwrap(),
            CorrectionRecord::parse("EVALUATION: FAIL\nCORRECTIONS: Two.").unwrap(),
        ];
        assert_eq!(aggregate_corrections(&records).as_deref(), Some("One.\n\nTwo."));
    }

    #[test]
    fn test_tally_excludes_anomalies() {
        let fail = CorrectionRecord::parse("EVALUATION: FAIL").unwrap();
        let pass = CorrectionRecord::parse("EVALUATION: PASS").unwrap();
        let tally = EvaluationTally::from_parsed([Some(&fail), Some(&pass), None, Some(&pass)]);
        assert_eq!(tally.total, 3);
        assert_eq!(tally.failures, 1);
        assert_eq!(tally.unparsed, 1);
        assert!((tally.success_rate() - 2.0 / 3.0).abs() < 1e-9);
    }
}
