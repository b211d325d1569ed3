// crates/truthcoin-consensus/src/lib.rs
//
// truthcoin-consensus: weighted-PCA vote resolution for Truthcoin.
//
// A vote session holds a voters x decisions matrix of votes and each
// voter's prior reputation. Resolution fills missing votes, finds the
// weighted first principal component, rewards the voters on the side of
// the consensus, and decides every outcome under the smoothed reputation.
// Outcome records carry the same data in the ledger's fixed-point form.

pub mod error;
pub mod fixed;
pub mod outcome;
pub mod params;
pub mod pca;
pub mod resolve;
pub mod session;
pub mod weights;

pub use error::{ConsensusError, FixedPointError};
pub use outcome::OutcomeRecord;
pub use params::ResolutionParams;
pub use resolve::resolve;
pub use session::{DecisionKind, DecisionOutcomes, SessionOutcome, VoteSession, VoterOutcomes};
