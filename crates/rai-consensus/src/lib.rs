// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// RAI-CONSENSUS
//
// Fork resolution by representative-weighted voting (spec §4.E, §4.F):
// the active-elections table that tracks candidates competing for a root
// and the vote processor that tallies signed ballots against it.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub mod elections;
pub mod voting;

pub use elections::{
    ActiveElections, Election, ElectionState, Resolution, ELECTION_TIMEOUT,
    SUPERMAJORITY_DENOMINATOR, SUPERMAJORITY_NUMERATOR,
};
pub use voting::{LocalVoter, Vote, VoteOutcome, VoteProcessor, VotingError};
