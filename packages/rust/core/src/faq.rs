//! Canned answers for messages that are not registration data.

use regex::Regex;
use teamreg_shared::{FaqEntry, Result, TeamRegError};

struct CompiledEntry {
    keywords: Vec<Regex>,
    answer: String,
}

/// Keyword matcher over the configured `[[faq]]` entries.
#[derive(Default)]
pub struct FaqResponder {
    entries: Vec<CompiledEntry>,
}

impl FaqResponder {
    pub fn new(entries: &[FaqEntry]) -> Result<Self> {
        let mut compiled = Vec::with_capacity(entries.len());
        for entry in entries {
            let keywords = entry
                .keywords
                .iter()
                .filter(|k| !k.trim().is_empty())
                .map(|k| {
                    Regex::new(&format!(r"(?i)\b{}\b", regex::escape(k.trim()))).map_err(|e| {
                        TeamRegError::config(format!("invalid faq keyword '{k}': {e}"))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            if keywords.is_empty() {
                tracing::warn!(answer = %entry.answer, "faq entry without keywords ignored");
                continue;
            }
            compiled.push(CompiledEntry {
                keywords,
                answer: entry.answer.clone(),
            });
        }
        Ok(Self { entries: compiled })
    }

    /// The answer whose keywords match `message` most often (whole words,
    /// case-insensitive). Ties go to the entry listed first.
    pub fn answer(&self, message: &str) -> Option<&str> {
        let mut best: Option<(usize, &CompiledEntry)> = None;
        for entry in &self.entries {
            let hits = entry.keywords.iter().filter(|k| k.is_match(message)).count();
            if hits > 0 && best.is_none_or(|(top, _)| hits > top) {
                best = Some((hits, entry));
            }
        }
        best.map(|(_, entry)| entry.answer.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(keywords: &[&str], answer: &str) -> FaqEntry {
        FaqEntry {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            answer: answer.into(),
        }
    }

    fn responder() -> FaqResponder {
        FaqResponder::new(&[
            entry(&["venue", "location", "where"], "Main hall, building B."),
            entry(&["deadline", "registration fee"], "Registration closes on Friday."),
            entry(&["when", "start", "schedule"], "We start at 9am."),
        ])
        .unwrap()
    }

    #[test]
    fn matches_whole_words_case_insensitively() {
        let faq = responder();
        assert_eq!(faq.answer("What is the VENUE?"), Some("Main hall, building B."));
        assert_eq!(
            faq.answer("is there a registration fee"),
            Some("Registration closes on Friday.")
        );
        assert_eq!(faq.answer("venues"), None);
        assert_eq!(faq.answer("hello"), None);
    }

    #[test]
    fn best_match_wins() {
        let faq = responder();
        // "where" hits entry 1 once, "when" + "start" hit entry 3 twice
        assert_eq!(
            faq.answer("where and when do we start"),
            Some("We start at 9am.")
        );
    }

    #[test]
    fn blank_keywords_are_ignored() {
        let faq = FaqResponder::new(&[entry(&["  "], "never")]).unwrap();
        assert!(faq.is_empty());
        assert_eq!(faq.answer("anything"), None);
    }
}
