//! Merge policy: decides whether healed results replace, join, or lose to
//! the base results. Pure function of its inputs.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::config::MergeSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeBranch {
    /// Healed score beats the base by the replace ratio.
    Replace,
    /// Base is weak and healed is any better.
    ReplaceWeakBase,
    /// Base is weak and healed is not better.
    KeepWeakBase,
    /// Healed is nearly as good: interleave both.
    Merge,
    /// Healed is better by any margin.
    ReplaceSlight,
    /// Base wins.
    KeepBase,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeDecision {
    pub branch: MergeBranch,
    pub documents: Vec<String>,
    pub score: f32,
    pub successful: bool,
}

fn replace(branch: MergeBranch, heal_docs: &[String], score_after: f32) -> MergeDecision {
    MergeDecision { branch, documents: heal_docs.to_vec(), score: score_after, successful: true }
}

fn keep(branch: MergeBranch, before_docs: &[String], score_before: f32) -> MergeDecision {
    MergeDecision { branch, documents: before_docs.to_vec(), score: score_before, successful: false }
}

/// Interleave `before[:2] + heal[:2] + before[2:] + heal[2:]`, cap at `2k`
/// candidates, dedup on the lower-cased prefix and keep `k`.
pub fn interleave(before_docs: &[String], heal_docs: &[String], k: usize, prefix: usize) -> Vec<String> {
    let head = |docs: &[String]| docs.iter().take(2).cloned().collect::<Vec<_>>();
    let tail = |docs: &[String]| docs.iter().skip(2).cloned().collect::<Vec<_>>();
    let mut seen = HashSet::new();
    head(before_docs)
        .into_iter()
        .chain(head(heal_docs))
        .chain(tail(before_docs))
        .chain(tail(heal_docs))
        .take(k.saturating_mul(2))
        .filter(|doc| seen.insert(doc.to_lowercase().chars().take(prefix).collect::<String>()))
        .take(k)
        .collect()
}

/// Choose the final documents and score. Branches are checked in order and
/// the first match wins.
pub fn decide(
    settings: &MergeSettings,
    score_before: f32,
    score_after: f32,
    before_docs: &[String],
    heal_docs: &[String],
    k: usize,
) -> MergeDecision {
    if score_after > score_before * settings.replace_ratio {
        return replace(MergeBranch::Replace, heal_docs, score_after);
    }
    if score_before < settings.weak_base {
        return if score_after > score_before {
            replace(MergeBranch::ReplaceWeakBase, heal_docs, score_after)
        } else {
            keep(MergeBranch::KeepWeakBase, before_docs, score_before)
        };
    }
    if score_after > score_before * settings.merge_ratio {
        return MergeDecision {
            branch: MergeBranch::Merge,
            documents: interleave(before_docs, heal_docs, k, settings.dedup_prefix),
            score: settings.base_weight * score_before + settings.heal_weight * score_after,
            successful: true,
        };
    }
    if score_after > score_before {
        return replace(MergeBranch::ReplaceSlight, heal_docs, score_after);
    }
    keep(MergeBranch::KeepBase, before_docs, score_before)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{prefix} document {i}")).collect()
    }

    #[test]
    fn large_improvement_replaces() {
        let d = decide(&MergeSettings::default(), 0.5, 0.7, &docs("base", 2), &docs("heal", 2), 5);
        assert_eq!(d.branch, MergeBranch::Replace);
        assert_eq!(d.documents, docs("heal", 2));
        assert!(d.successful);
        assert_eq!(d.score, 0.7);
    }

    #[test]
    fn weak_base_keeps_when_not_improved() {
        let d = decide(&MergeSettings::default(), 0.2, 0.2, &docs("base", 1), &docs("heal", 1), 5);
        assert_eq!(d.branch, MergeBranch::KeepWeakBase);
        assert!(!d.successful);
        assert_eq!(d.documents, docs("base", 1));
    }

    #[test]
    fn weak_base_replaced_by_small_improvement() {
        let d = decide(&MergeSettings::default(), 0.25, 0.26, &docs("base", 1), &docs("heal", 1), 5);
        assert_eq!(d.branch, MergeBranch::ReplaceWeakBase);
        assert!(d.successful);
    }

    #[test]
    fn near_score_merges_and_weights() {
        let d = decide(&MergeSettings::default(), 0.5, 0.46, &docs("base", 3), &docs("heal", 3), 5);
        assert_eq!(d.branch, MergeBranch::Merge);
        assert!((d.score - 0.472).abs() < 1e-6);
        assert_eq!(
            d.documents,
            vec![
                "base document 0", "base document 1", "heal document 0", "heal document 1", "base document 2",
            ]
        );
    }

    #[test]
    fn slight_improvement_branch_is_reachable_with_custom_ratios() {
        let settings = MergeSettings { merge_ratio: 1.05, ..MergeSettings::default() };
        let d = decide(&settings, 0.5, 0.52, &docs("base", 1), &docs("heal", 1), 5);
        assert_eq!(d.branch, MergeBranch::ReplaceSlight);
        assert!(d.successful);
    }

    #[test]
    fn clearly_worse_heal_keeps_base() {
        let d = decide(&MergeSettings::default(), 0.6, 0.3, &docs("base", 2), &docs("heal", 2), 5);
        assert_eq!(d.branch, MergeBranch::KeepBase);
        assert_eq!(d.score, 0.6);
        assert!(!d.successful);
    }

    #[test]
    fn interleave_dedups_on_case_insensitive_prefix() {
        let before = vec!["Same Text here".to_string(), "unique base".to_string()];
        let heal = vec!["same text HERE".to_string(), "unique heal".to_string()];
        let out = interleave(&before, &heal, 5, 100);
        assert_eq!(out, vec!["Same Text here", "unique base", "unique heal"]);
    }

    #[test]
    fn interleave_caps_candidates_at_twice_k() {
        let out = interleave(&docs("base", 4), &docs("heal", 4), 1, 100);
        assert_eq!(out, vec!["base document 0"]);
        let out = interleave(&docs("base", 4), &docs("heal", 4), 3, 100);
        assert_eq!(out.len(), 3);
    }
}
