// crates/truthcoin-consensus/src/resolve.rs
//
// Truth-consensus resolution of a vote session.
//
// Missing votes are filled with a preliminary outcome, the weighted first
// principal component of the filled matrix ranks voters, and the side of
// the component that best reproduces the prior consensus becomes this
// round's reputation. Smoothed reputation then decides every outcome and
// the participation bonuses.
//
// All arithmetic runs in a fixed order: the outputs are ledger state and
// must be bit-identical on every node.

use tracing::debug;
use truthcoin_linalg::Matrix;

use crate::error::ConsensusError;
use crate::pca::weighted_principal_component;
use crate::session::{DecisionKind, DecisionOutcomes, SessionOutcome, VoteSession, VoterOutcomes};
use crate::weights::{normalize, weighted_mean, weighted_median};

/// Votes within this distance of the final outcome count as agreeing.
const CERTAINTY_EPSILON: f64 = 1e-5;

/// Resolve `session`, attach the outputs to it and return them.
///
/// On failure the session's outputs are left exactly as they were.
pub fn resolve(session: &mut VoteSession) -> Result<&SessionOutcome, ConsensusError> {
    session.validate()?;
    let outcome = compute(session)?;
    Ok(session.store_outcome(outcome))
}

impl VoteSession {
    /// See [`resolve`].
    pub fn resolve(&mut self) -> Result<&SessionOutcome, ConsensusError> {
        resolve(self)
    }
}

/// Weighted mean for binary decisions, weighted median for scaled ones.
fn column_outcome(kind: DecisionKind, weights: &[f64], m: &Matrix, col: usize, na: f64) -> f64 {
    match kind {
        DecisionKind::Binary => weighted_mean(weights, m, col, na),
        DecisionKind::Scaled => weighted_median(weights, m, col, na),
    }
}

/// Squared distance between `normalize(candidate^T * filled)` and the
/// prior consensus `old_rep^T * filled`.
fn residual(candidate: &[f64], filled: &Matrix, prior: &Matrix) -> Result<f64, ConsensusError> {
    let mut projected = Matrix::row_vector(candidate).mul(filled)?.row(0).to_vec();
    normalize(&mut projected);
    let diff = Matrix::row_vector(&projected).sub(prior)?;
    Ok(diff.norm_squared())
}

fn compute(session: &VoteSession) -> Result<SessionOutcome, ConsensusError> {
    let params = session.params();
    let na = params.na;
    let m = session.votes();
    let kinds = session.kinds();
    let old_rep = session.old_rep();
    let (n_voters, n_decisions) = m.shape();

    // Step 1: Mean prior reputation
    let mut rep_avg = 0.0;
    for &r in old_rep {
        rep_avg += r;
    }
    rep_avg /= n_voters as f64;
    if rep_avg == 0.0 {
        return Err(ConsensusError::ZeroWeight);
    }

    // Step 2: Fill missing cells with the prior-weighted preliminary outcome
    let mut filled = m.clone();
    for (j, &kind) in kinds.iter().enumerate() {
        let prelim = column_outcome(kind, old_rep, m, j, na);
        for i in 0..n_voters {
            if filled[(i, j)] == na {
                filled[(i, j)] = prelim;
            }
        }
    }

    // Step 3: First principal component
    let pc = weighted_principal_component(old_rep, &filled, params.svd_options())?;
    let scores = &pc.scores;

    // Step 4: Pick the orientation of the scores closest to the prior consensus
    let prior = Matrix::row_vector(old_rep).mul(&filled)?;

    let mut min_score = scores[0];
    for &s in &scores[1..] {
        if min_score > s {
            min_score = s;
        }
    }
    if min_score < 0.0 {
        min_score = -min_score;
    }
    let scores_up: Vec<f64> = scores.iter().map(|&s| s + min_score).collect();
    let residual_up = residual(&scores_up, &filled, &prior)?;

    let mut max_score = scores[0];
    for &s in &scores[1..] {
        if max_score < s {
            max_score = s;
        }
    }
    let scores_down: Vec<f64> = scores.iter().map(|&s| s - max_score).collect();
    let residual_down = residual(&scores_down, &filled, &prior)?;

    let mut this_rep = if residual_up <= residual_down {
        scores_up
    } else {
        scores_down
    };
    debug!(residual_up, residual_down, "Chose score orientation");

    // Step 5: This round's reputation, scaled by relative prior weight
    for (t, &r) in this_rep.iter_mut().zip(old_rep) {
        *t *= r / rep_avg;
    }
    normalize(&mut this_rep);

    // Step 6: Smooth against the prior
    let alpha = params.alpha;
    let smoothed_rep: Vec<f64> = old_rep
        .iter()
        .zip(&this_rep)
        .map(|(&old, &this)| (1.0 - alpha) * old + alpha * this)
        .collect();

    // Step 7: Raw outcomes under smoothed reputation
    let raw_outcome: Vec<f64> = kinds
        .iter()
        .enumerate()
        .map(|(j, &kind)| column_outcome(kind, &smoothed_rep, &filled, j, na))
        .collect();

    // Step 8: Snap binary outcomes, pass scaled ones through
    let tol = params.tol;
    let final_outcome: Vec<f64> = kinds
        .iter()
        .zip(&raw_outcome)
        .map(|(&kind, &raw)| match kind {
            DecisionKind::Binary => {
                if raw > 0.50 + 0.50 * tol {
                    1.0
                } else if raw < 0.50 - 0.50 * tol {
                    0.0
                } else {
                    0.50
                }
            }
            DecisionKind::Scaled => raw,
        })
        .collect();

    // Step 9: Voter participation
    let mut voter_na = vec![0.0; n_voters];
    let mut voter_participation = vec![0.0; n_voters];
    for i in 0..n_voters {
        for j in 0..n_decisions {
            if m[(i, j)] == na {
                voter_na[i] += 1.0;
            }
        }
        voter_participation[i] = 1.0 - voter_na[i] / n_decisions as f64;
    }

    // Step 10: Decision participation
    let mut decision_na = vec![0.0; n_decisions];
    let mut decision_participation = vec![0.0; n_decisions];
    for j in 0..n_decisions {
        let mut missing_rep = 0.0;
        for i in 0..n_voters {
            if m[(i, j)] == na {
                decision_na[j] += 1.0;
                missing_rep += smoothed_rep[i];
            }
        }
        decision_participation[j] = 1.0 - missing_rep;
    }

    let mut total_participation = 0.0;
    for &p in &decision_participation {
        total_participation += p;
    }
    let frac_na = 1.0 - total_participation / n_decisions as f64;

    // Step 11: Row bonus
    let mut relative_participation = voter_participation.clone();
    normalize(&mut relative_participation);
    let row_bonus: Vec<f64> = relative_participation
        .iter()
        .zip(&smoothed_rep)
        .map(|(&rel, &rep)| frac_na * rel + (1.0 - frac_na) * rep)
        .collect();

    // Step 12: Certainty
    let mut certainty = vec![0.0; n_decisions];
    for (j, c) in certainty.iter_mut().enumerate() {
        let mut sum = 0.0;
        for (i, &rep) in smoothed_rep.iter().enumerate() {
            if (filled[(i, j)] - final_outcome[j]).abs() < CERTAINTY_EPSILON {
                sum += rep;
            }
        }
        *c = sum;
    }

    // Step 13: Author bonus
    let mut relative_decision_participation = decision_participation.clone();
    normalize(&mut relative_decision_participation);
    let mut consensus_reward = certainty.clone();
    normalize(&mut consensus_reward);
    let author_bonus: Vec<f64> = relative_decision_participation
        .iter()
        .zip(&consensus_reward)
        .map(|(&rel, &reward)| frac_na * rel + (1.0 - frac_na) * reward)
        .collect();

    debug!(
        voters = n_voters,
        decisions = n_decisions,
        frac_na,
        svd_converged = pc.converged,
        "Resolved vote session"
    );

    Ok(SessionOutcome {
        voters: VoterOutcomes {
            this_rep,
            smoothed_rep,
            na_count: voter_na,
            participation: voter_participation,
            relative_participation,
            row_bonus,
        },
        decisions: DecisionOutcomes {
            first_loading: pc.loading,
            raw_outcome,
            consensus_reward,
            certainty,
            na_count: decision_na,
            participation: decision_participation,
            author_bonus,
            final_outcome,
        },
        svd_converged: pc.converged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ResolutionParams;

    fn two_camp_session() -> VoteSession {
        let votes = Matrix::from_rows(&[
            vec![1.0, 0.0, 1.0],
            vec![1.0, 0.0, 1.0],
            vec![1.0, 0.0, 1.0],
            vec![0.0, 1.0, 0.0],
        ])
        .unwrap();
        VoteSession::from_parts(
            votes,
            vec![DecisionKind::Binary; 3],
            vec![0.25; 4],
            ResolutionParams::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_majority_wins_and_dissenter_loses_reputation() {
        let mut session = two_camp_session();
        let outcome = session.resolve().unwrap().clone();

        assert_eq!(outcome.decisions.final_outcome, vec![1.0, 0.0, 1.0]);
        assert!(outcome.svd_converged);

        let smoothed = &outcome.voters.smoothed_rep;
        let total: f64 = smoothed.iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert!(smoothed[3] < 0.25);
        assert!(smoothed[0] > 0.25);
        assert_eq!(outcome.voters.this_rep[3], 0.0);
    }

    #[test]
    fn test_full_participation_counts() {
        let mut session = two_camp_session();
        let outcome = session.resolve().unwrap();
        assert!(outcome.voters.na_count.iter().all(|&c| c == 0.0));
        assert!(outcome.voters.participation.iter().all(|&p| p == 1.0));
        assert!(outcome.decisions.na_count.iter().all(|&c| c == 0.0));
        for &p in &outcome.voters.relative_participation {
            assert_eq!(p, 0.25);
        }
        // No missing votes: the row bonus is the smoothed reputation.
        for (b, r) in outcome.voters.row_bonus.iter().zip(&outcome.voters.smoothed_rep) {
            assert!((b - r).abs() < 1e-15);
        }
    }

    #[test]
    fn test_zero_prior_weight_is_rejected() {
        let mut session = VoteSession::new(3, 2, ResolutionParams::default());
        assert_eq!(session.resolve().unwrap_err(), ConsensusError::ZeroWeight);
        assert!(session.outcome().is_none());
    }

    #[test]
    fn test_single_voter_is_rejected() {
        let mut session = VoteSession::new(1, 2, ResolutionParams::default());
        session.set_old_rep(0, 1.0).unwrap();
        session.set_vote(0, 0, 1.0).unwrap();
        let err = session.resolve().unwrap_err();
        assert!(matches!(err, ConsensusError::InvalidShape(_)));
    }

    #[test]
    fn test_failure_keeps_previous_outcome() {
        let mut session = two_camp_session();
        let first = session.resolve().unwrap().clone();

        let mut broken = session.clone();
        for i in 0..4 {
            broken.set_old_rep(i, 0.0).unwrap();
        }
        broken.store_outcome(first.clone());
        assert!(resolve(&mut broken).is_err());
        assert_eq!(broken.outcome(), Some(&first));
    }

    #[test]
    fn test_scaled_decision_uses_median() {
        let votes = Matrix::from_rows(&[
            vec![1.0, 0.30],
            vec![1.0, 0.31],
            vec![0.0, 0.90],
        ])
        .unwrap();
        let mut session = VoteSession::from_parts(
            votes,
            vec![DecisionKind::Binary, DecisionKind::Scaled],
            vec![0.4, 0.4, 0.2],
            ResolutionParams::default(),
        )
        .unwrap();
        let outcome = session.resolve().unwrap();
        let raw = outcome.decisions.raw_outcome[1];
        assert!(raw == 0.30 || raw == 0.31, "raw = {}", raw);
        assert_eq!(outcome.decisions.final_outcome[1], raw);
    }
}
