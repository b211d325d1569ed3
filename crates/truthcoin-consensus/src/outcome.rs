// crates/truthcoin-consensus/src/outcome.rs
//
// Outcome record as persisted by the ledger.
//
// Every real number is stored as a fixed-point integer (see `fixed`). A
// record carries the inputs of one resolution; `calc` resolves it and
// fills in the output vectors.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;
use truthcoin_linalg::Matrix;

use crate::error::{ConsensusError, FixedPointError};
use crate::fixed::{from_fixed, to_fixed, to_fixed_vec};
use crate::params::ResolutionParams;
use crate::session::{DecisionKind, SessionOutcome, VoteSession};

/// Fixed-point missing-vote sentinel. Negative, so it never collides with
/// a real vote in [0, 1].
pub const DEFAULT_FIXED_NA: i64 = -1;

/// One resolved (or to-be-resolved) ballot of a branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    /// Block height the outcome belongs to.
    pub height: u32,
    /// Hex id of the branch the decisions belong to.
    pub branch_id: String,
    /// Missing-vote sentinel, fixed point.
    pub na: i64,
    /// Reputation smoothing factor, fixed point.
    pub alpha: i64,
    /// Binary undecided band, fixed point.
    pub tol: i64,

    pub voter_ids: Vec<String>,
    pub decision_ids: Vec<String>,
    /// `[voter][decision]`, row major, fixed point.
    pub vote_matrix: Vec<i64>,
    /// One flag per decision.
    pub is_scaled: Vec<bool>,
    /// Prior reputation per voter, fixed point.
    pub old_rep: Vec<i64>,

    // Per-voter outputs.
    #[serde(default)]
    pub this_rep: Vec<i64>,
    #[serde(default)]
    pub smoothed_rep: Vec<i64>,
    #[serde(default)]
    pub na_row: Vec<i64>,
    #[serde(default)]
    pub partic_row: Vec<i64>,
    #[serde(default)]
    pub partic_rel: Vec<i64>,
    #[serde(default)]
    pub row_bonus: Vec<i64>,

    // Per-decision outputs.
    #[serde(default)]
    pub first_loading: Vec<i64>,
    #[serde(default)]
    pub decisions_raw: Vec<i64>,
    #[serde(default)]
    pub consensus_reward: Vec<i64>,
    #[serde(default)]
    pub certainty: Vec<i64>,
    #[serde(default)]
    pub na_col: Vec<i64>,
    #[serde(default)]
    pub partic_col: Vec<i64>,
    #[serde(default)]
    pub author_bonus: Vec<i64>,
    #[serde(default)]
    pub decisions_final: Vec<i64>,
}

/// Converted output vectors, assigned to a record only once all of them
/// converted successfully.
struct FixedOutputs {
    voters: [Vec<i64>; 6],
    decisions: [Vec<i64>; 8],
}

impl FixedOutputs {
    fn convert(outcome: &SessionOutcome) -> Result<Self, FixedPointError> {
        let v = &outcome.voters;
        let d = &outcome.decisions;
        Ok(Self {
            voters: [
                to_fixed_vec(&v.this_rep)?,
                to_fixed_vec(&v.smoothed_rep)?,
                to_fixed_vec(&v.na_count)?,
                to_fixed_vec(&v.participation)?,
                to_fixed_vec(&v.relative_participation)?,
                to_fixed_vec(&v.row_bonus)?,
            ],
            decisions: [
                to_fixed_vec(&d.first_loading)?,
                to_fixed_vec(&d.raw_outcome)?,
                to_fixed_vec(&d.consensus_reward)?,
                to_fixed_vec(&d.certainty)?,
                to_fixed_vec(&d.na_count)?,
                to_fixed_vec(&d.participation)?,
                to_fixed_vec(&d.author_bonus)?,
                to_fixed_vec(&d.final_outcome)?,
            ],
        })
    }
}

impl OutcomeRecord {
    /// Create a record with every vote missing, every decision binary and
    /// every prior reputation zero.
    pub fn new(
        height: u32,
        branch_id: impl Into<String>,
        voter_ids: Vec<String>,
        decision_ids: Vec<String>,
        params: &ResolutionParams,
    ) -> Result<Self, FixedPointError> {
        let n_voters = voter_ids.len();
        let n_decisions = decision_ids.len();
        Ok(Self {
            height,
            branch_id: branch_id.into(),
            na: DEFAULT_FIXED_NA,
            alpha: to_fixed(params.alpha)?,
            tol: to_fixed(params.tol)?,
            voter_ids,
            decision_ids,
            vote_matrix: vec![DEFAULT_FIXED_NA; n_voters * n_decisions],
            is_scaled: vec![false; n_decisions],
            old_rep: vec![0; n_voters],
            this_rep: Vec::new(),
            smoothed_rep: Vec::new(),
            na_row: Vec::new(),
            partic_row: Vec::new(),
            partic_rel: Vec::new(),
            row_bonus: Vec::new(),
            first_loading: Vec::new(),
            decisions_raw: Vec::new(),
            consensus_reward: Vec::new(),
            certainty: Vec::new(),
            na_col: Vec::new(),
            partic_col: Vec::new(),
            author_bonus: Vec::new(),
            decisions_final: Vec::new(),
        })
    }

    pub fn n_voters(&self) -> usize {
        self.voter_ids.len()
    }

    pub fn n_decisions(&self) -> usize {
        self.decision_ids.len()
    }

    /// Whether `calc` has filled in the outputs.
    pub fn is_calculated(&self) -> bool {
        self.decisions_final.len() == self.n_decisions() && self.smoothed_rep.len() == self.n_voters()
    }

    /// Decode the record's inputs into a vote session.
    pub fn to_session(&self) -> Result<VoteSession, ConsensusError> {
        let n_voters = self.n_voters();
        let n_decisions = self.n_decisions();
        if self.vote_matrix.len() != n_voters * n_decisions {
            return Err(ConsensusError::InvalidShape(format!(
                "vote matrix has {} cells, expected {}x{}",
                self.vote_matrix.len(),
                n_voters,
                n_decisions
            )));
        }
        if self.is_scaled.len() != n_decisions {
            return Err(ConsensusError::InvalidShape(format!(
                "{} scaled flags for {} decisions",
                self.is_scaled.len(),
                n_decisions
            )));
        }
        if self.old_rep.len() != n_voters {
            return Err(ConsensusError::InvalidShape(format!(
                "{} prior reputations for {} voters",
                self.old_rep.len(),
                n_voters
            )));
        }
        if let Some(&neg) = self.old_rep.iter().find(|&&r| r < 0) {
            return Err(FixedPointError::Negative(neg).into());
        }

        let params = ResolutionParams {
            na: from_fixed(self.na),
            alpha: from_fixed(self.alpha),
            tol: from_fixed(self.tol),
            strict_convergence: false,
        };

        let mut votes = Matrix::new(n_voters, n_decisions);
        for i in 0..n_voters {
            for j in 0..n_decisions {
                votes[(i, j)] = from_fixed(self.vote_matrix[i * n_decisions + j]);
            }
        }
        let kinds = self
            .is_scaled
            .iter()
            .map(|&scaled| {
                if scaled {
                    DecisionKind::Scaled
                } else {
                    DecisionKind::Binary
                }
            })
            .collect();
        let old_rep = self.old_rep.iter().map(|&r| from_fixed(r)).collect();

        VoteSession::from_parts(votes, kinds, old_rep, params)
    }

    /// Resolve the record and store its outputs in fixed point.
    ///
    /// On failure the output vectors are left untouched.
    pub fn calc(&mut self) -> Result<(), ConsensusError> {
        self.calc_with(false)
    }

    /// Like [`calc`](Self::calc), optionally failing when the SVD does not
    /// converge. Records carry no convergence flag of their own.
    pub fn calc_with(&mut self, strict_convergence: bool) -> Result<(), ConsensusError> {
        let mut session = self.to_session()?;
        if strict_convergence {
            let params = ResolutionParams {
                strict_convergence,
                ..*session.params()
            };
            session.set_params(params);
        }
        let outcome = session.resolve()?;
        let FixedOutputs { voters, decisions } = FixedOutputs::convert(outcome)?;

        let [this_rep, smoothed_rep, na_row, partic_row, partic_rel, row_bonus] = voters;
        self.this_rep = this_rep;
        self.smoothed_rep = smoothed_rep;
        self.na_row = na_row;
        self.partic_row = partic_row;
        self.partic_rel = partic_rel;
        self.row_bonus = row_bonus;

        let [first_loading, decisions_raw, consensus_reward, certainty, na_col, partic_col, author_bonus, decisions_final] =
            decisions;
        self.first_loading = first_loading;
        self.decisions_raw = decisions_raw;
        self.consensus_reward = consensus_reward;
        self.certainty = certainty;
        self.na_col = na_col;
        self.partic_col = partic_col;
        self.author_bonus = author_bonus;
        self.decisions_final = decisions_final;

        info!(
            height = self.height,
            branch = %self.branch_id,
            voters = self.n_voters(),
            decisions = self.n_decisions(),
            "Calculated outcome record"
        );
        Ok(())
    }
}

const MISSING: &str = "-----";

fn write_fixed(f: &mut fmt::Formatter<'_>, value: Option<&i64>) -> fmt::Result {
    match value {
        Some(&v) => write!(f, " {:16.8}", from_fixed(v)),
        None => write!(f, " {:>16}", MISSING),
    }
}

impl fmt::Display for OutcomeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "height={}", self.height)?;
        writeln!(f, "branchid={}", self.branch_id)?;
        writeln!(f, "NA={}", from_fixed(self.na))?;
        writeln!(f, "alpha={}", from_fixed(self.alpha))?;
        writeln!(f, "tol={}", from_fixed(self.tol))?;

        writeln!(f, "voteMatrix=")?;
        let n_decisions = self.n_decisions().max(1);
        for (k, &cell) in self.vote_matrix.iter().enumerate() {
            if cell == self.na {
                write!(f, " {:>16}", "NA")?;
            } else {
                write!(f, " {:16.8}", from_fixed(cell))?;
            }
            if (k + 1) % n_decisions == 0 {
                writeln!(f)?;
            }
        }

        writeln!(f, "nVoters={}", self.n_voters())?;
        let voter_columns = [
            &self.old_rep,
            &self.this_rep,
            &self.smoothed_rep,
            &self.na_row,
            &self.partic_row,
            &self.partic_rel,
            &self.row_bonus,
        ];
        for (i, id) in self.voter_ids.iter().enumerate() {
            write!(f, " {:>40}", id)?;
            for column in voter_columns {
                write_fixed(f, column.get(i))?;
            }
            writeln!(f)?;
        }
        writeln!(f)?;

        writeln!(f, "nDecisions={}", self.n_decisions())?;
        let is_scaled: Vec<i64> = self
            .is_scaled
            .iter()
            .map(|&s| if s { 100_000_000 } else { 0 })
            .collect();
        let decision_columns = [
            &is_scaled,
            &self.first_loading,
            &self.decisions_raw,
            &self.consensus_reward,
            &self.certainty,
            &self.na_col,
            &self.partic_col,
            &self.author_bonus,
            &self.decisions_final,
        ];
        for (j, id) in self.decision_ids.iter().enumerate() {
            write!(f, " {:>40}", id)?;
            for column in decision_columns {
                write_fixed(f, column.get(j))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
