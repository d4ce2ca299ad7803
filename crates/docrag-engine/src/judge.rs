//! LLM-as-judge scoring for evaluation runs.
//!
//! A judge failure is reported as [`Verdict::NotScored`] instead of a zero.

use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use docrag_core::traits::LanguageModel;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", content = "reason", rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
    NotScored(String),
}

impl Verdict {
    /// `Some(1.0 | 0.0)` for scored verdicts.
    pub fn score(&self) -> Option<f64> {
        match self {
            Verdict::Pass => Some(1.0),
            Verdict::Fail => Some(0.0),
            Verdict::NotScored(_) => None,
        }
    }
}

/// Mean over scored verdicts and the number left unscored.
pub fn summarize<'a>(verdicts: impl IntoIterator<Item = &'a Verdict>) -> (Option<f64>, usize) {
    let (mut sum, mut scored, mut unscored) = (0.0, 0usize, 0usize);
    for v in verdicts {
        match v.score() {
            Some(s) => {
                sum += s;
                scored += 1;
            }
            None => unscored += 1,
        }
    }
    let mean = (scored > 0).then(|| sum / scored as f64);
    (mean, unscored)
}

/// Map a free-form label to a verdict. Failing phrases are checked first
/// because they often contain the passing word ("irrelevant").
fn parse_label(raw: &str, failing: &[&str], passing: &[&str]) -> Verdict {
    let label = raw.trim().to_lowercase();
    if failing.iter().any(|w| label.contains(w)) {
        Verdict::Fail
    } else if passing.iter().any(|w| label.contains(w)) {
        Verdict::Pass
    } else {
        Verdict::NotScored(format!("unrecognized label: {}", raw.trim()))
    }
}

pub fn parse_relevance(raw: &str) -> Verdict {
    parse_label(raw, &["irrelevant", "unrelated", "not relevant"], &["relevant", "yes"])
}

pub fn parse_faithfulness(raw: &str) -> Verdict {
    if raw.to_lowercase().contains("no hallucination") {
        return Verdict::Pass;
    }
    parse_label(raw, &["hallucinated", "hallucination", "unfaithful"], &["factual", "faithful", "passing", "correct"])
}

pub struct Judge {
    llm: Arc<dyn LanguageModel>,
}

impl Judge {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    pub async fn relevance(&self, question: &str, answer: &str) -> Verdict {
        let prompt = format!(
            "You are judging whether an answer addresses a question.\n\
             QUESTION: {question}\nANSWER: {answer}\n\n\
             Respond with exactly one word: relevant or irrelevant."
        );
        self.ask("relevance", &prompt, parse_relevance).await
    }

    pub async fn faithfulness(&self, question: &str, reference: &str, answer: &str) -> Verdict {
        let prompt = format!(
            "You are judging whether an answer is supported by the reference text.\n\
             REFERENCE: {reference}\nQUESTION: {question}\nANSWER: {answer}\n\n\
             Respond with exactly one word: factual or hallucinated."
        );
        self.ask("faithfulness", &prompt, parse_faithfulness).await
    }

    async fn ask(&self, metric: &str, prompt: &str, parse: fn(&str) -> Verdict) -> Verdict {
        match self.llm.complete(prompt).await {
            Ok(label) => parse(&label),
            Err(e) => {
                warn!(metric, error = %e, "judge call failed");
                Verdict::NotScored(format!("judge call failed: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_labels_win_over_substrings() {
        assert_eq!(parse_relevance("Irrelevant"), Verdict::Fail);
        assert_eq!(parse_relevance(" relevant\n"), Verdict::Pass);
        assert_eq!(parse_faithfulness("factual"), Verdict::Pass);
        assert_eq!(parse_faithfulness("hallucinated"), Verdict::Fail);
        assert_eq!(parse_faithfulness("No hallucination detected"), Verdict::Pass);
        assert!(matches!(parse_relevance("maybe?"), Verdict::NotScored(_)));
    }

    #[test]
    fn summary_skips_unscored_rows() {
        let v = [Verdict::Pass, Verdict::Fail, Verdict::NotScored("x".into()), Verdict::Pass];
        let (mean, unscored) = summarize(&v);
        assert!((mean.expect("scored") - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(unscored, 1);
        assert_eq!(summarize(&[Verdict::NotScored("x".into())]), (None, 1));
    }
}
