use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Mate scores rank beyond every representable centipawn value.
const MATE_RANK: i64 = 1 << 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    White,
    Black,
}

impl Side {
    /// Reads the active-colour field of a FEN. Only the first two fields are
    /// looked at; the rest of the string is passed to the engine untouched.
    pub fn from_fen(fen: &str) -> Result<Self, EngineError> {
        let mut fields = fen.split_whitespace();
        if fields.next().is_none() {
            return Err(EngineError::InvalidRequest("empty FEN".to_string()));
        }
        match fields.next() {
            Some("w") => Ok(Side::White),
            Some("b") => Ok(Side::Black),
            Some(other) => Err(EngineError::InvalidRequest(format!(
                "bad active colour '{}' in FEN",
                other
            ))),
            None => Err(EngineError::InvalidRequest(
                "FEN is missing the active colour field".to_string(),
            )),
        }
    }
}

/// Engine evaluation.
///
/// Everything outside the codec holds White-relative scores: positive
/// centipawns favour White, `Mate(n)` with `n > 0` means White mates in `n`.
/// A position that is already checkmate carries no distance and no sign, so
/// it names the mated side instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Score {
    Centipawns(i32),
    Mate(i32),
    Mated(Side),
}

impl Default for Score {
    fn default() -> Self {
        Score::Centipawns(0)
    }
}

impl Score {
    /// Converts a score reported from the side to move's point of view into
    /// White's. Must be applied exactly once per decoded score.
    pub fn white_relative(self, side_to_move: Side) -> Self {
        match (self, side_to_move) {
            // `mate 0`: the side to move has been mated.
            (Score::Mate(0), side) => Score::Mated(side),
            (score, Side::White) => score,
            (score, Side::Black) => score.negate(),
        }
    }

    /// Flips the point of view. `Mated` names a side, so it is unchanged.
    pub fn negate(self) -> Self {
        match self {
            Score::Centipawns(cp) => Score::Centipawns(cp.saturating_neg()),
            Score::Mate(n) => Score::Mate(n.saturating_neg()),
            Score::Mated(side) => Score::Mated(side),
        }
    }

    /// Total-order key from `side`'s point of view; larger is better.
    ///
    /// Mates for `side` sit above every centipawn value and shorter is
    /// better; mates against sit below and shorter is worse. A finished
    /// mate is the extreme at either end.
    pub fn rank_for(self, side: Side) -> i64 {
        let own = match side {
            Side::White => self,
            Side::Black => self.negate(),
        };
        match own {
            Score::Centipawns(cp) => i64::from(cp),
            Score::Mate(n) if n > 0 => MATE_RANK - i64::from(n),
            Score::Mate(n) => -MATE_RANK - i64::from(n),
            Score::Mated(mated) if mated == side => -MATE_RANK,
            Score::Mated(_) => MATE_RANK,
        }
    }

    /// Orders `self` against `other` so that the stronger score for `side`
    /// comes first.
    pub fn cmp_strength(self, other: Self, side: Side) -> Ordering {
        other.rank_for(side).cmp(&self.rank_for(side))
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Centipawns(cp) => write!(f, "{:+.2}", *cp as f64 / 100.0),
            Score::Mate(n) if *n >= 0 => write!(f, "#{}", n),
            Score::Mate(n) => write!(f, "#-{}", n.unsigned_abs()),
            Score::Mated(Side::Black) => f.write_str("#0"),
            Score::Mated(Side::White) => f.write_str("#-0"),
        }
    }
}
