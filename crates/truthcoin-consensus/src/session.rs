// crates/truthcoin-consensus/src/session.rs
//
// A single vote resolution event: inputs, parameters, and computed outputs.
//
// A session is built with its inputs, resolved once, read, and dropped.
// Any mutation of the inputs clears previously computed outputs so a
// stale result can never be read back.

use std::fmt;

use serde::{Deserialize, Serialize};
use truthcoin_linalg::Matrix;

use crate::error::ConsensusError;
use crate::params::ResolutionParams;

/// How a decision's votes are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionKind {
    /// Votes in {0, 0.5, 1}; resolved by weighted mean and snapped.
    Binary,
    /// Votes scaled into [0, 1]; resolved by weighted median.
    Scaled,
}

impl DecisionKind {
    pub fn is_binary(self) -> bool {
        matches!(self, DecisionKind::Binary)
    }
}

/// Per-voter outputs, one entry per voter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoterOutcomes {
    pub this_rep: Vec<f64>,
    pub smoothed_rep: Vec<f64>,
    pub na_count: Vec<f64>,
    pub participation: Vec<f64>,
    pub relative_participation: Vec<f64>,
    pub row_bonus: Vec<f64>,
}

/// Per-decision outputs, one entry per decision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionOutcomes {
    pub first_loading: Vec<f64>,
    pub raw_outcome: Vec<f64>,
    pub consensus_reward: Vec<f64>,
    pub certainty: Vec<f64>,
    pub na_count: Vec<f64>,
    pub participation: Vec<f64>,
    pub author_bonus: Vec<f64>,
    pub final_outcome: Vec<f64>,
}

/// Everything a resolution computes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionOutcome {
    pub voters: VoterOutcomes,
    pub decisions: DecisionOutcomes,
    /// False if the SVD ran out of iterations (lenient mode only).
    pub svd_converged: bool,
}

/// Inputs and outputs of one resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteSession {
    votes: Matrix,
    kinds: Vec<DecisionKind>,
    old_rep: Vec<f64>,
    params: ResolutionParams,
    #[serde(default)]
    outcome: Option<SessionOutcome>,
}

impl VoteSession {
    /// Create a session with every vote missing, every decision binary, and
    /// every prior reputation zero.
    pub fn new(n_voters: usize, n_decisions: usize, params: ResolutionParams) -> Self {
        let mut votes = Matrix::new(n_voters, n_decisions);
        for i in 0..n_voters {
            for v in votes.row_mut(i) {
                *v = params.na;
            }
        }
        Self {
            votes,
            kinds: vec![DecisionKind::Binary; n_decisions],
            old_rep: vec![0.0; n_voters],
            params,
            outcome: None,
        }
    }

    /// Create a session from prepared inputs, checking that they line up.
    pub fn from_parts(
        votes: Matrix,
        kinds: Vec<DecisionKind>,
        old_rep: Vec<f64>,
        params: ResolutionParams,
    ) -> Result<Self, ConsensusError> {
        let session = Self {
            votes,
            kinds,
            old_rep,
            params,
            outcome: None,
        };
        session.validate()?;
        Ok(session)
    }

    pub fn n_voters(&self) -> usize {
        self.votes.rows()
    }

    pub fn n_decisions(&self) -> usize {
        self.votes.cols()
    }

    pub fn votes(&self) -> &Matrix {
        &self.votes
    }

    pub fn kinds(&self) -> &[DecisionKind] {
        &self.kinds
    }

    pub fn old_rep(&self) -> &[f64] {
        &self.old_rep
    }

    pub fn params(&self) -> &ResolutionParams {
        &self.params
    }

    /// Outputs of the last successful resolution, if any.
    pub fn outcome(&self) -> Option<&SessionOutcome> {
        self.outcome.as_ref()
    }

    /// Vote of voter `i` on decision `j` (the sentinel if missing).
    pub fn vote(&self, i: usize, j: usize) -> Option<f64> {
        self.votes.get(i, j)
    }

    /// Whether voter `i` left decision `j` missing.
    pub fn is_missing(&self, i: usize, j: usize) -> bool {
        self.votes.get(i, j) == Some(self.params.na)
    }

    pub fn set_vote(&mut self, i: usize, j: usize, value: f64) -> Result<(), ConsensusError> {
        self.check_cell(i, j)?;
        self.votes[(i, j)] = value;
        self.outcome = None;
        Ok(())
    }

    /// Mark voter `i`'s vote on decision `j` as missing.
    pub fn set_missing(&mut self, i: usize, j: usize) -> Result<(), ConsensusError> {
        let na = self.params.na;
        self.set_vote(i, j, na)
    }

    pub fn set_kind(&mut self, j: usize, kind: DecisionKind) -> Result<(), ConsensusError> {
        if j >= self.kinds.len() {
            return Err(ConsensusError::InvalidShape(format!(
                "decision {} out of range ({} decisions)",
                j,
                self.kinds.len()
            )));
        }
        self.kinds[j] = kind;
        self.outcome = None;
        Ok(())
    }

    pub fn set_old_rep(&mut self, i: usize, rep: f64) -> Result<(), ConsensusError> {
        if i >= self.old_rep.len() {
            return Err(ConsensusError::InvalidShape(format!(
                "voter {} out of range ({} voters)",
                i,
                self.old_rep.len()
            )));
        }
        self.old_rep[i] = rep;
        self.outcome = None;
        Ok(())
    }

    /// Replace the parameters. Missing cells keep the old sentinel, so
    /// callers changing `na` should do so before filling votes.
    pub fn set_params(&mut self, params: ResolutionParams) {
        self.params = params;
        self.outcome = None;
    }

    /// Change the number of voters and decisions, keeping the overlapping
    /// block. New voters start with zero reputation, new decisions are
    /// binary, and new cells are missing.
    pub fn resize(&mut self, n_voters: usize, n_decisions: usize) {
        let na = self.params.na;
        let mut votes = Matrix::new(n_voters, n_decisions);
        for i in 0..n_voters {
            for j in 0..n_decisions {
                votes[(i, j)] = self.votes.get(i, j).unwrap_or(na);
            }
        }
        self.votes = votes;
        self.kinds.resize(n_decisions, DecisionKind::Binary);
        self.old_rep.resize(n_voters, 0.0);
        self.outcome = None;
    }

    /// Check that the vote matrix, decision kinds and prior reputations
    /// agree on the number of voters and decisions.
    pub fn validate(&self) -> Result<(), ConsensusError> {
        if self.kinds.len() != self.votes.cols() {
            return Err(ConsensusError::InvalidShape(format!(
                "{} decision kinds for {} decision columns",
                self.kinds.len(),
                self.votes.cols()
            )));
        }
        if self.old_rep.len() != self.votes.rows() {
            return Err(ConsensusError::InvalidShape(format!(
                "{} prior reputations for {} voter rows",
                self.old_rep.len(),
                self.votes.rows()
            )));
        }
        Ok(())
    }

    pub(crate) fn store_outcome(&mut self, outcome: SessionOutcome) -> &SessionOutcome {
        self.outcome.insert(outcome)
    }

    fn check_cell(&self, i: usize, j: usize) -> Result<(), ConsensusError> {
        if i >= self.n_voters() || j >= self.n_decisions() {
            return Err(ConsensusError::InvalidShape(format!(
                "cell ({}, {}) out of range for {}x{} votes",
                i,
                j,
                self.n_voters(),
                self.n_decisions()
            )));
        }
        Ok(())
    }

    fn write_cell(&self, f: &mut fmt::Formatter<'_>, value: Option<f64>) -> fmt::Result {
        match value {
            Some(v) if v != self.params.na => write!(f, " {:12.8}", v),
            _ => write!(f, " {:>12}", "NA"),
        }
    }
}

const VOTER_HEADERS: [&str; 7] = [
    "OldRep",
    "ThisRep",
    "SmoothRep",
    "NARow",
    "Partic Row",
    "RelativePart",
    "RowBonus",
];

const DECISION_HEADERS: [&str; 9] = [
    "Is Binary",
    "1st Loading",
    "Decision Raw",
    "Consensus",
    "Certainty",
    "NACol",
    "Partic Col",
    "AuthorBonus",
    "Decision Fin",
];

impl fmt::Display for VoteSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.n_voters() {
            for j in 0..self.n_decisions() {
                self.write_cell(f, self.vote(i, j))?;
            }
            writeln!(f)?;
        }
        writeln!(f)?;

        let outcome = self.outcome.as_ref();
        let voter_columns: [Option<&Vec<f64>>; 7] = [
            Some(&self.old_rep),
            outcome.map(|o| &o.voters.this_rep),
            outcome.map(|o| &o.voters.smoothed_rep),
            outcome.map(|o| &o.voters.na_count),
            outcome.map(|o| &o.voters.participation),
            outcome.map(|o| &o.voters.relative_participation),
            outcome.map(|o| &o.voters.row_bonus),
        ];
        for header in VOTER_HEADERS {
            write!(f, " {:>12}", header)?;
        }
        writeln!(f)?;
        for i in 0..self.n_voters() {
            for column in voter_columns {
                self.write_cell(f, column.and_then(|c| c.get(i).copied()))?;
            }
            writeln!(f)?;
        }
        writeln!(f)?;

        let is_binary: Vec<f64> = self
            .kinds
            .iter()
            .map(|k| if k.is_binary() { 1.0 } else { 0.0 })
            .collect();
        let decision_rows: [Option<&Vec<f64>>; 9] = [
            Some(&is_binary),
            outcome.map(|o| &o.decisions.first_loading),
            outcome.map(|o| &o.decisions.raw_outcome),
            outcome.map(|o| &o.decisions.consensus_reward),
            outcome.map(|o| &o.decisions.certainty),
            outcome.map(|o| &o.decisions.na_count),
            outcome.map(|o| &o.decisions.participation),
            outcome.map(|o| &o.decisions.author_bonus),
            outcome.map(|o| &o.decisions.final_outcome),
        ];
        for (header, row) in DECISION_HEADERS.iter().zip(decision_rows) {
            write!(f, " {:>12}", header)?;
            for j in 0..self.n_decisions() {
                self.write_cell(f, row.and_then(|r| r.get(j).copied()))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ResolutionParams {
        ResolutionParams::default()
    }

    #[test]
    fn test_sessions_can_move_across_threads() {
        fn assert_send<T: Send>() {}
        assert_send::<VoteSession>();
        assert_send::<SessionOutcome>();
    }

    #[test]
    fn test_new_session_is_empty() {
        let s = VoteSession::new(3, 2, params());
        assert_eq!(s.n_voters(), 3);
        assert_eq!(s.n_decisions(), 2);
        assert!(s.is_missing(2, 1));
        assert_eq!(s.kinds(), &[DecisionKind::Binary, DecisionKind::Binary]);
        assert_eq!(s.old_rep(), &[0.0, 0.0, 0.0]);
        assert!(s.outcome().is_none());
    }

    #[test]
    fn test_from_parts_validates_shapes() {
        let votes = Matrix::new(2, 3);
        let err = VoteSession::from_parts(
            votes.clone(),
            vec![DecisionKind::Binary; 2],
            vec![0.5, 0.5],
            params(),
        )
        .unwrap_err();
        assert!(matches!(err, ConsensusError::InvalidShape(_)));

        let err = VoteSession::from_parts(
            votes.clone(),
            vec![DecisionKind::Binary; 3],
            vec![1.0],
            params(),
        )
        .unwrap_err();
        assert!(matches!(err, ConsensusError::InvalidShape(_)));

        assert!(VoteSession::from_parts(votes, vec![DecisionKind::Scaled; 3], vec![0.5, 0.5], params()).is_ok());
    }

    #[test]
    fn test_setters_check_bounds() {
        let mut s = VoteSession::new(2, 2, params());
        assert!(s.set_vote(1, 1, 1.0).is_ok());
        assert_eq!(s.vote(1, 1), Some(1.0));
        assert!(!s.is_missing(1, 1));
        assert!(s.set_vote(2, 0, 1.0).is_err());
        assert!(s.set_kind(2, DecisionKind::Scaled).is_err());
        assert!(s.set_old_rep(5, 0.1).is_err());
        assert_eq!(s.vote(9, 9), None);

        s.set_missing(1, 1).unwrap();
        assert!(s.is_missing(1, 1));
    }

    #[test]
    fn test_resize_keeps_overlap() {
        let mut s = VoteSession::new(2, 2, params());
        s.set_vote(0, 0, 1.0).unwrap();
        s.set_vote(1, 1, 0.0).unwrap();
        s.set_kind(1, DecisionKind::Scaled).unwrap();
        s.set_old_rep(0, 0.4).unwrap();
        s.set_old_rep(1, 0.6).unwrap();

        s.resize(3, 3);
        assert_eq!(s.vote(0, 0), Some(1.0));
        assert_eq!(s.vote(1, 1), Some(0.0));
        assert!(s.is_missing(2, 2));
        assert!(s.is_missing(0, 2));
        assert_eq!(s.kinds()[1], DecisionKind::Scaled);
        assert_eq!(s.kinds()[2], DecisionKind::Binary);
        assert_eq!(s.old_rep(), &[0.4, 0.6, 0.0]);

        s.resize(1, 1);
        assert_eq!(s.vote(0, 0), Some(1.0));
        assert_eq!(s.old_rep(), &[0.4]);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_mutation_clears_outcome() {
        let mut s = VoteSession::new(2, 1, params());
        s.store_outcome(SessionOutcome::default());
        assert!(s.outcome().is_some());
        s.set_vote(0, 0, 1.0).unwrap();
        assert!(s.outcome().is_none());

        s.store_outcome(SessionOutcome::default());
        s.resize(2, 1);
        assert!(s.outcome().is_none());
    }

    #[test]
    fn test_display_marks_missing_cells() {
        let mut s = VoteSession::new(2, 2, params());
        s.set_vote(0, 0, 1.0).unwrap();
        s.set_old_rep(0, 0.5).unwrap();
        s.set_old_rep(1, 0.5).unwrap();
        let text = s.to_string();
        let first = text.lines().next().unwrap();
        assert_eq!(first, "   1.00000000           NA");
        assert!(text.contains("   OldRep"));
        assert!(text.contains("Decision Fin"));
        assert!(text.contains("    Is Binary   1.00000000   1.00000000"));
    }

    #[test]
    fn test_session_serializes() {
        let mut s = VoteSession::new(1, 2, params());
        s.set_kind(1, DecisionKind::Scaled).unwrap();
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("\"scaled\""));
        let back: VoteSession = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kinds(), s.kinds());
        assert_eq!(back.n_decisions(), 2);
    }
}
