use serde::{Deserialize, Serialize};

use crate::score::{Score, Side};

// Fitted so that +100cp is roughly a 60% winning chance for a strong engine.
const WIN_CURVE_SCALE: f64 = 290.680623072;
const WIN_CURVE_NORM: f64 = 1.548090806;

/// Draw percentage by absolute centipawn advantage. Upper bounds are
/// exclusive.
const DRAW_STEPS: [(i32, u32); 7] = [
    (25, 50),
    (50, 44),
    (100, 36),
    (200, 26),
    (350, 16),
    (600, 8),
    (1000, 4),
];
const DRAW_FLOOR: u32 = 2;

/// Win/draw/loss in per-mille. The three values always sum to 1000.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wdl {
    pub win: u32,
    pub draw: u32,
    pub loss: u32,
}

impl Wdl {
    /// Builds a triple from engine-reported per-mille values. Engines round
    /// independently, so the draw share absorbs any drift from 1000.
    /// Values above 1000 or an all-zero triple are not WDL and give `None`.
    pub fn from_engine(win: u32, draw: u32, loss: u32) -> Option<Self> {
        if win > 1000 || draw > 1000 || loss > 1000 {
            return None;
        }
        let total = u64::from(win) + u64::from(draw) + u64::from(loss);
        if total == 0 {
            return None;
        }
        let win = (u64::from(win) * 1000 / total) as u32;
        let loss = (u64::from(loss) * 1000 / total) as u32;
        Some(Self {
            win,
            draw: 1000 - win - loss,
            loss,
        })
    }

    /// Swaps the win and loss shares.
    pub fn flipped(self) -> Self {
        Self {
            win: self.loss,
            draw: self.draw,
            loss: self.win,
        }
    }

    /// Native engine WDL is side-to-move relative; this returns it from
    /// White's point of view.
    pub fn white_relative(self, side_to_move: Side) -> Self {
        match side_to_move {
            Side::White => self,
            Side::Black => self.flipped(),
        }
    }

    /// Estimates WDL for a White-relative score.
    pub fn estimate(score: Score) -> Self {
        match score {
            Score::Mate(n) if n > 0 => Self { win: 1000, draw: 0, loss: 0 },
            Score::Mate(_) | Score::Mated(Side::White) => Self { win: 0, draw: 0, loss: 1000 },
            Score::Mated(Side::Black) => Self { win: 1000, draw: 0, loss: 0 },
            Score::Centipawns(cp) => estimate_from_cp(cp),
        }
    }
}

/// Winning chance in percent, ignoring draws.
pub fn win_probability(cp: i32) -> f64 {
    let raw = ((f64::from(cp) / WIN_CURVE_SCALE).atan() / WIN_CURVE_NORM + 1.0) / 2.0 * 100.0;
    raw.clamp(0.0, 100.0)
}

/// Draw chance in percent; a non-increasing step function of `|cp|`.
pub fn draw_probability(cp: i32) -> u32 {
    let advantage = cp.unsigned_abs();
    DRAW_STEPS
        .iter()
        .find(|(bound, _)| advantage < *bound as u32)
        .map(|(_, draw)| *draw)
        .unwrap_or(DRAW_FLOOR)
}

fn estimate_from_cp(cp: i32) -> Wdl {
    let draw = draw_probability(cp);
    let decisive = f64::from(100 - draw) / 100.0;
    let win_pct = win_probability(cp) * decisive;

    let draw = draw * 10;
    let win = ((win_pct * 10.0).round() as u32).min(1000 - draw);
    Wdl {
        win,
        draw,
        loss: 1000 - draw - win,
    }
}
