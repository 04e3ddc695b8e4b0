//! Conflict aggregation and resolution
//!
//! Parameters and auxiliary files share one resolution contract: each
//! subject (a parameter key or an archive path) has an ordered list of
//! candidates. A single candidate is applied automatically; two or more are
//! handed to a [`Decider`].

use crate::error::{Error, Result};
use crate::params::{ModParams, ParamSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// One source's proposed content for a subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate<T> {
    /// Mod that proposed the value
    pub source: String,
    /// Proposed value (declaration text or staged file)
    pub value: T,
}

impl<T> Candidate<T> {
    pub fn new(source: impl Into<String>, value: T) -> Self {
        Self {
            source: source.into(),
            value,
        }
    }
}

/// Subject -> candidates, ascending by subject
pub type ConflictMap<T> = BTreeMap<String, Vec<Candidate<T>>>;

/// What is being resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictKind {
    /// A parameter key in the parameter file
    Param,
    /// An auxiliary file path in the output archive
    File,
}

/// Values that can be shown to whoever decides a conflict
pub trait CandidateValue {
    /// Text to show next to the source, if the value has a textual form
    fn preview(&self) -> Option<&str>;
}

impl CandidateValue for String {
    fn preview(&self) -> Option<&str> {
        Some(self)
    }
}

/// One numbered option of a conflict
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictOption<'a> {
    pub source: &'a str,
    pub preview: Option<&'a str>,
}

/// A conflict waiting for a decision
#[derive(Debug, Clone)]
pub struct ConflictRequest<'a> {
    pub kind: ConflictKind,
    /// Parameter key or archive path
    pub subject: &'a str,
    /// Options in candidate order
    pub options: Vec<ConflictOption<'a>>,
}

/// Strategy that picks one option of a conflict
///
/// Returns a zero-based index into `request.options`.
pub trait Decider {
    fn decide(&mut self, request: &ConflictRequest<'_>) -> Result<usize>;
}

impl<F> Decider for F
where
    F: FnMut(&ConflictRequest<'_>) -> Result<usize>,
{
    fn decide(&mut self, request: &ConflictRequest<'_>) -> Result<usize> {
        self(request)
    }
}

/// Always take the first candidate (the earliest mod in supply order)
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstChoice;

impl Decider for FirstChoice {
    fn decide(&mut self, _request: &ConflictRequest<'_>) -> Result<usize> {
        Ok(0)
    }
}

/// Always take the last candidate (the latest mod in supply order)
#[derive(Debug, Clone, Copy, Default)]
pub struct LastChoice;

impl Decider for LastChoice {
    fn decide(&mut self, request: &ConflictRequest<'_>) -> Result<usize> {
        Ok(request.options.len().saturating_sub(1))
    }
}

/// Replay a fixed list of choices, one per conflict, in resolution order
#[derive(Debug, Clone, Default)]
pub struct ScriptedChoices {
    choices: std::collections::VecDeque<usize>,
}

impl ScriptedChoices {
    pub fn new(choices: impl IntoIterator<Item = usize>) -> Self {
        Self {
            choices: choices.into_iter().collect(),
        }
    }
}

impl Decider for ScriptedChoices {
    fn decide(&mut self, _request: &ConflictRequest<'_>) -> Result<usize> {
        self.choices.pop_front().ok_or(Error::PromptClosed)
    }
}

/// The winning candidate for one subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolved<T> {
    pub source: String,
    pub value: T,
    /// How many candidates competed (1 means auto-applied)
    pub candidates: usize,
}

/// Collect, per key, every distinct mod declaration that differs from base
///
/// Mods are visited in the order given. Candidates are deduplicated by
/// declaration text; the first mod to propose a text is the one credited.
pub fn aggregate(base: &ParamSet, mods: &[ModParams]) -> ConflictMap<String> {
    let mut changes: ConflictMap<String> = BTreeMap::new();

    for m in mods {
        for (key, value) in m.params.iter() {
            if base.get(key) == Some(value) {
                continue;
            }

            let candidates = changes.entry(key.to_string()).or_default();
            if !candidates.iter().any(|c| c.value == value) {
                candidates.push(Candidate::new(m.source.clone(), value.to_string()));
            }
        }
    }

    changes
}

/// Reduce every subject to one winner, in ascending subject order
pub fn resolve<T, D>(
    kind: ConflictKind,
    entries: &ConflictMap<T>,
    decider: &mut D,
) -> Result<BTreeMap<String, Resolved<T>>>
where
    T: Clone + CandidateValue,
    D: Decider + ?Sized,
{
    let mut resolved = BTreeMap::new();

    for (subject, candidates) in entries {
        let chosen = match candidates.len() {
            0 => continue,
            1 => {
                info!(
                    subject = subject.as_str(),
                    source = candidates[0].source.as_str(),
                    "auto-applied single candidate"
                );
                &candidates[0]
            }
            count => {
                let request = ConflictRequest {
                    kind,
                    subject,
                    options: candidates
                        .iter()
                        .map(|c| ConflictOption {
                            source: &c.source,
                            preview: c.value.preview(),
                        })
                        .collect(),
                };
                let index = decider.decide(&request)?;
                let chosen = candidates.get(index).ok_or_else(|| Error::InvalidChoice {
                    subject: subject.clone(),
                    index,
                    count,
                })?;
                info!(
                    subject = subject.as_str(),
                    source = chosen.source.as_str(),
                    count,
                    "conflict resolved"
                );
                chosen
            }
        };

        resolved.insert(
            subject.clone(),
            Resolved {
                source: chosen.source.clone(),
                value: chosen.value.clone(),
                candidates: candidates.len(),
            },
        );
    }

    Ok(resolved)
}

/// Resolve parameter conflicts
pub fn resolve_params<D: Decider + ?Sized>(
    entries: &ConflictMap<String>,
    decider: &mut D,
) -> Result<BTreeMap<String, Resolved<String>>> {
    resolve(ConflictKind::Param, entries, decider)
}

/// Strip provenance, keeping subject -> chosen value
pub fn chosen_values<T: Clone>(resolved: &BTreeMap<String, Resolved<T>>) -> BTreeMap<String, T> {
    resolved
        .iter()
        .map(|(k, r)| (k.clone(), r.value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(lines: &[&str]) -> ParamSet {
        ParamSet::build(lines)
    }

    #[test]
    fn test_aggregate_ignores_unchanged() {
        let base = set(&[r#"Param("HP", 100)"#, r#"Param("MP", 10)"#]);
        let mods = vec![ModParams::new(
            "a.zip",
            set(&[r#"Param("HP", 100)"#, r#"Param("MP", 20)"#]),
        )];

        let changes = aggregate(&base, &mods);

        assert_eq!(changes.len(), 1);
        assert_eq!(changes["MP"][0].value, r#"Param("MP", 20)"#);
        assert_eq!(changes["MP"][0].source, "a.zip");
    }

    #[test]
    fn test_aggregate_new_key_counts_as_change() {
        let base = set(&[r#"Param("HP", 100)"#]);
        let mods = vec![ModParams::new("a.zip", set(&[r#"Param("MANA", 50)"#]))];

        let changes = aggregate(&base, &mods);
        assert_eq!(changes["MANA"].len(), 1);
    }

    #[test]
    fn test_aggregate_dedups_by_value_first_source_wins() {
        let base = set(&[r#"Param("HP", 100)"#]);
        let mods = vec![
            ModParams::new("a.zip", set(&[r#"Param("HP", 150)"#])),
            ModParams::new("b.zip", set(&[r#"Param("HP", 150)"#])),
            ModParams::new("c.zip", set(&[r#"Param("HP", 200)"#])),
        ];

        let changes = aggregate(&base, &mods);
        let hp = &changes["HP"];

        assert_eq!(hp.len(), 2);
        assert_eq!(hp[0].source, "a.zip");
        assert_eq!(hp[1].source, "c.zip");
    }

    #[test]
    fn test_aggregate_never_proposes_base_value() {
        let base = set(&[r#"Param("A", 1)"#, r#"Param("B", 2)"#]);
        let mods = vec![
            ModParams::new("x", set(&[r#"Param("A", 1)"#, r#"Param("B", 3)"#])),
            ModParams::new("y", set(&[r#"Param("A", 9)"#, r#"Param("B", 2)"#])),
        ];

        let changes = aggregate(&base, &mods);
        for (key, candidates) in &changes {
            for c in candidates {
                assert_ne!(Some(c.value.as_str()), base.get(key));
            }
        }
        assert_eq!(changes.len(), 2);
    }

    #[test]
    fn test_resolve_single_candidate_skips_decider() {
        let mut entries = ConflictMap::new();
        entries.insert(
            "HP".to_string(),
            vec![Candidate::new("a.zip", "Param(\"HP\",150)".to_string())],
        );

        let mut calls = 0;
        let mut decider = |_: &ConflictRequest<'_>| -> Result<usize> {
            calls += 1;
            Ok(0)
        };
        let resolved = resolve_params(&entries, &mut decider).unwrap();

        assert_eq!(calls, 0);
        assert_eq!(resolved["HP"].value, "Param(\"HP\",150)");
        assert_eq!(resolved["HP"].candidates, 1);
    }

    #[test]
    fn test_resolve_conflict_calls_decider_once() {
        let mut entries = ConflictMap::new();
        entries.insert(
            "HP".to_string(),
            vec![
                Candidate::new("a.zip", "Param(\"HP\",150)".to_string()),
                Candidate::new("b.zip", "Param(\"HP\",200)".to_string()),
            ],
        );

        let mut seen = Vec::new();
        let mut decider = |req: &ConflictRequest<'_>| -> Result<usize> {
            seen.push((
                req.subject.to_string(),
                req.options.iter().map(|o| o.source.to_string()).collect::<Vec<_>>(),
            ));
            Ok(1)
        };
        let resolved = resolve_params(&entries, &mut decider).unwrap();

        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "HP");
        assert_eq!(seen[0].1, vec!["a.zip", "b.zip"]);
        assert_eq!(resolved["HP"].value, "Param(\"HP\",200)");
        assert_eq!(resolved["HP"].source, "b.zip");
    }

    #[test]
    fn test_resolve_order_is_ascending() {
        let mut entries = ConflictMap::new();
        for key in ["Zeta", "Alpha", "Mid"] {
            entries.insert(
                key.to_string(),
                vec![
                    Candidate::new("a", format!("Param(\"{key}\",1)")),
                    Candidate::new("b", format!("Param(\"{key}\",2)")),
                ],
            );
        }

        let mut order = Vec::new();
        let mut decider = |req: &ConflictRequest<'_>| -> Result<usize> {
            order.push(req.subject.to_string());
            Ok(0)
        };
        resolve_params(&entries, &mut decider).unwrap();

        assert_eq!(order, vec!["Alpha", "Mid", "Zeta"]);
    }

    #[test]
    fn test_resolve_rejects_out_of_range() {
        let mut entries = ConflictMap::new();
        entries.insert(
            "HP".to_string(),
            vec![
                Candidate::new("a", "1".to_string()),
                Candidate::new("b", "2".to_string()),
            ],
        );

        let mut decider = |_: &ConflictRequest<'_>| -> Result<usize> { Ok(5) };
        let err = resolve_params(&entries, &mut decider).unwrap_err();
        assert!(matches!(err, Error::InvalidChoice { index: 5, count: 2, .. }));
    }

    #[test]
    fn test_policies() {
        let mut entries = ConflictMap::new();
        entries.insert(
            "K".to_string(),
            vec![
                Candidate::new("a", "1".to_string()),
                Candidate::new("b", "2".to_string()),
                Candidate::new("c", "3".to_string()),
            ],
        );

        let first = resolve_params(&entries, &mut FirstChoice).unwrap();
        let last = resolve_params(&entries, &mut LastChoice).unwrap();
        let scripted = resolve_params(&entries, &mut ScriptedChoices::new([1])).unwrap();

        assert_eq!(first["K"].source, "a");
        assert_eq!(last["K"].source, "c");
        assert_eq!(scripted["K"].source, "b");
        assert_eq!(chosen_values(&scripted)["K"], "2");
    }

    #[test]
    fn test_scripted_choices_exhausted() {
        let mut entries = ConflictMap::new();
        entries.insert(
            "K".to_string(),
            vec![
                Candidate::new("a", "1".to_string()),
                Candidate::new("b", "2".to_string()),
            ],
        );

        let err = resolve_params(&entries, &mut ScriptedChoices::default()).unwrap_err();
        assert!(matches!(err, Error::PromptClosed));
    }
}
