//! Next-question selection by expected information gain.

use super::network::LOG_EPSILON;
use crate::domain::NUM_SYMPTOMS;
use crate::knowledge::{ids, KnowledgeBase};

/// Candidates for a session's first question: urinary, cough, nasal, bowel.
pub const TRIAGE_SHORTLIST: [usize; 6] = [
    ids::DYSURIA,
    ids::URINARY_FREQUENCY,
    ids::COUGH,
    ids::RHINORRHEA,
    ids::CONGESTION,
    ids::DIARRHEA,
];

/// Probability below which an answer branch is treated as impossible.
const MIN_BRANCH_PROBABILITY: f64 = 1e-9;

/// Shannon entropy in nats, with probabilities floored at `1e-12`.
#[must_use]
pub fn entropy(p: &[f64]) -> f64 {
    -p.iter().map(|x| x * x.max(LOG_EPSILON).ln()).sum::<f64>()
}

/// EIG of asking about a symptom whose per-disease "yes" likelihood is
/// `likelihood_yes`.
#[must_use]
pub fn expected_information_gain(posterior: &[f64], likelihood_yes: &[f64]) -> f64 {
    let p_yes: f64 = posterior
        .iter()
        .zip(likelihood_yes)
        .map(|(p, l)| p * l)
        .sum();
    let p_no = 1.0 - p_yes;
    if p_yes <= MIN_BRANCH_PROBABILITY || p_no <= MIN_BRANCH_PROBABILITY {
        return 0.0;
    }

    let post_yes: Vec<f64> = posterior
        .iter()
        .zip(likelihood_yes)
        .map(|(p, l)| p * l / p_yes)
        .collect();
    let post_no: Vec<f64> = posterior
        .iter()
        .zip(likelihood_yes)
        .map(|(p, l)| p * (1.0 - l) / p_no)
        .collect();

    entropy(posterior) - (p_yes * entropy(&post_yes) + p_no * entropy(&post_no))
}

/// Best candidate by EIG; the first maximum wins.
pub fn select_from<I, F>(posterior: &[f64], candidates: I, mut likelihood: F) -> Option<usize>
where
    I: IntoIterator<Item = usize>,
    F: FnMut(usize) -> Vec<f64>,
{
    let mut best: Option<(usize, f64)> = None;
    for sid in candidates {
        let gain = expected_information_gain(posterior, &likelihood(sid));
        match best {
            Some((_, g)) if gain <= g => {}
            _ => best = Some((sid, gain)),
        }
    }
    best.map(|(sid, _)| sid)
}

/// Whether questioning should end.
#[must_use]
pub fn should_stop(posterior: &[f64], questions_asked: usize, threshold: f64, max_questions: usize) -> bool {
    let confidence = posterior.iter().copied().fold(0.0, f64::max);
    confidence >= threshold || questions_asked >= max_questions
}

#[must_use]
pub fn uniform_posterior(n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    vec![1.0 / n as f64; n]
}

/// Picks the next symptom to ask about.
pub struct AdaptiveSelector<'kb> {
    kb: &'kb KnowledgeBase,
}

impl<'kb> AdaptiveSelector<'kb> {
    #[must_use]
    pub fn new(kb: &'kb KnowledgeBase) -> Self {
        Self { kb }
    }

    /// Per-disease frequency of `symptom_id`; undeclared patterns are 0.
    #[must_use]
    pub fn likelihoods(&self, symptom_id: usize) -> Vec<f64> {
        self.kb
            .diseases()
            .iter()
            .map(|d| d.frequency(symptom_id))
            .collect()
    }

    fn candidates(&self, asked: &[usize], first_question: bool) -> Vec<usize> {
        if first_question {
            let triage: Vec<usize> = TRIAGE_SHORTLIST
                .iter()
                .copied()
                .filter(|sid| !asked.contains(sid))
                .collect();
            if !triage.is_empty() {
                return triage;
            }
        }
        (0..NUM_SYMPTOMS).filter(|sid| !asked.contains(sid)).collect()
    }

    /// Next symptom id, or `None` once every symptom has been answered.
    #[must_use]
    pub fn select_next(&self, posterior: &[f64], asked: &[usize], first_question: bool) -> Option<usize> {
        let candidates = self.candidates(asked, first_question);
        select_from(posterior, candidates, |sid| self.likelihoods(sid))
    }

    /// Top `k` unasked symptoms with their EIG, best first.
    #[must_use]
    pub fn rank_candidates(&self, posterior: &[f64], asked: &[usize], k: usize) -> Vec<(usize, f64)> {
        let mut ranked: Vec<(usize, f64)> = (0..NUM_SYMPTOMS)
            .filter(|sid| !asked.contains(sid))
            .map(|sid| (sid, expected_information_gain(posterior, &self.likelihoods(sid))))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(k);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eig_prefers_informative_symptom() {
        let posterior = [0.5, 0.5];
        let informative = expected_information_gain(&posterior, &[1.0, 0.0]);
        let useless = expected_information_gain(&posterior, &[0.5, 0.5]);
        assert!((informative - 2f64.ln()).abs() < 1e-9);
        assert!(useless.abs() < 1e-12);
        assert!(informative > useless);
    }

    #[test]
    fn test_eig_zero_for_certain_answers() {
        assert_eq!(expected_information_gain(&[0.5, 0.5], &[0.0, 0.0]), 0.0);
        assert_eq!(expected_information_gain(&[0.5, 0.5], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_select_from_first_max_wins() {
        let posterior = [0.5, 0.5];
        let table = |sid: usize| match sid {
            0 => vec![0.5, 0.5],
            1 | 2 => vec![1.0, 0.0],
            _ => vec![0.9, 0.1],
        };
        assert_eq!(select_from(&posterior, [0, 1, 2, 3], table), Some(1));
        assert_eq!(select_from(&posterior, [2, 1], table), Some(2));
        assert_eq!(select_from(&posterior, Vec::new(), table), None);
    }

    #[test]
    fn test_first_question_comes_from_triage() {
        let kb = KnowledgeBase::global();
        let selector = AdaptiveSelector::new(kb);
        let posterior = uniform_posterior(kb.num_diseases());

        let next = selector.select_next(&posterior, &[ids::FEVER], true).expect("Should select");
        assert!(TRIAGE_SHORTLIST.contains(&next));

        let next = selector
            .select_next(&posterior, &TRIAGE_SHORTLIST, true)
            .expect("Should fall back to all symptoms");
        assert!(!TRIAGE_SHORTLIST.contains(&next));
    }

    #[test]
    fn test_never_repeats_asked_symptom() {
        let kb = KnowledgeBase::global();
        let selector = AdaptiveSelector::new(kb);
        let posterior = uniform_posterior(kb.num_diseases());
        let mut asked = Vec::new();
        while let Some(sid) = selector.select_next(&posterior, &asked, asked.is_empty()) {
            assert!(!asked.contains(&sid));
            asked.push(sid);
        }
        assert_eq!(asked.len(), NUM_SYMPTOMS);
    }

    #[test]
    fn test_rank_candidates_sorted() {
        let kb = KnowledgeBase::global();
        let selector = AdaptiveSelector::new(kb);
        let ranked = selector.rank_candidates(&uniform_posterior(kb.num_diseases()), &[0], 5);
        assert_eq!(ranked.len(), 5);
        assert!(ranked.windows(2).all(|w| w[0].1 >= w[1].1));
        assert!(ranked.iter().all(|(sid, _)| *sid != 0));
    }

    #[test]
    fn test_stop_rule() {
        assert!(should_stop(&[0.85, 0.15], 1, 0.8, 10));
        assert!(should_stop(&[0.5, 0.5], 10, 0.8, 10));
        assert!(!should_stop(&[0.5, 0.5], 3, 0.8, 10));
        assert_eq!(uniform_posterior(4), vec![0.25; 4]);
    }
}
