use serde::{Deserialize, Serialize};

use crate::parser::{UciMessage, is_null_move};
use crate::score::{Score, Side};
use crate::wdl::Wdl;

/// One principal variation. Scores and WDL are White-relative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineResult {
    /// 1-based. After `finish` this is the rank, not the engine's index.
    pub index: u32,
    pub moves: Vec<String>,
    pub score: Score,
    pub wdl: Option<Wdl>,
    pub depth: Option<u32>,
    /// False for a slot padded in because a higher index arrived first.
    pub filled: bool,
}

impl LineResult {
    fn placeholder(index: u32) -> Self {
        Self {
            index,
            moves: Vec::new(),
            score: Score::default(),
            wdl: None,
            depth: None,
            filled: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// `None` when the position has no legal moves.
    pub best_move: Option<String>,
    pub score: Option<Score>,
    /// `score` formatted for display, e.g. `+0.35` or `#-2`.
    pub evaluation: String,
    pub lines: Vec<LineResult>,
    pub wdl: Option<Wdl>,
    pub depth: Option<u32>,
    pub side_to_move: Side,
    /// Assembled from a search that had to be stopped.
    pub partial: bool,
}

/// Collects `info` lines for one search.
#[derive(Debug)]
pub struct ResultAggregator {
    side_to_move: Side,
    requested: usize,
    lines: Vec<LineResult>,
}

impl ResultAggregator {
    pub fn new(side_to_move: Side, requested: u32) -> Self {
        Self {
            side_to_move,
            requested: requested.max(1) as usize,
            lines: Vec::new(),
        }
    }

    /// Feeds one decoded message. Returns true if it updated a line.
    pub fn ingest(&mut self, message: &UciMessage) -> bool {
        match message {
            UciMessage::Info {
                multipv,
                depth,
                score: Some(score),
                wdl,
                pv,
            } => {
                self.record(*multipv, *depth, *score, *wdl, pv.clone());
                true
            }
            _ => false,
        }
    }

    /// Stores a line, replacing any earlier update for the same index.
    /// `score` and `wdl` are as the engine reported them.
    pub fn record(
        &mut self,
        multipv: u32,
        depth: Option<u32>,
        score: Score,
        wdl: Option<Wdl>,
        moves: Vec<String>,
    ) {
        let index = multipv.max(1);
        let slot = index as usize - 1;
        while self.lines.len() <= slot {
            let next = self.lines.len() as u32 + 1;
            self.lines.push(LineResult::placeholder(next));
        }

        let wdl = if index == 1 {
            wdl.map(|w| w.white_relative(self.side_to_move))
        } else {
            None
        };
        self.lines[slot] = LineResult {
            index,
            moves,
            score: score.white_relative(self.side_to_move),
            wdl,
            depth,
            filled: true,
        };
    }

    pub fn lines(&self) -> &[LineResult] {
        &self.lines
    }

    pub fn has_lines(&self) -> bool {
        self.lines.iter().any(|line| line.filled)
    }

    /// Trims, sorts strongest first and derives the headline fields from the
    /// top line. `bestmove_hint` is only used when the top line has no moves.
    pub fn finish(mut self, bestmove_hint: Option<&str>, partial: bool) -> AnalysisResult {
        let side = self.side_to_move;
        self.lines.truncate(self.requested);
        self.lines.sort_by(|a, b| {
            b.filled
                .cmp(&a.filled)
                .then_with(|| a.score.cmp_strength(b.score, side))
        });
        for (rank, line) in self.lines.iter_mut().enumerate() {
            line.index = rank as u32 + 1;
        }

        let best = self.lines.first().filter(|line| line.filled);
        let best_move = best
            .and_then(|line| line.moves.first().cloned())
            .or_else(|| {
                bestmove_hint
                    .filter(|token| !is_null_move(token))
                    .map(str::to_string)
            });
        let score = best.map(|line| line.score);
        let wdl = best.map(|line| line.wdl.unwrap_or_else(|| Wdl::estimate(line.score)));
        let depth = self.lines.iter().filter_map(|line| line.depth).max();

        AnalysisResult {
            best_move,
            score,
            evaluation: score.map(|s| s.to_string()).unwrap_or_default(),
            lines: self.lines,
            wdl,
            depth,
            side_to_move: side,
            partial,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_uci_line;

    fn feed(aggregator: &mut ResultAggregator, lines: &[&str]) {
        for line in lines {
            let message = parse_uci_line(line).unwrap();
            aggregator.ingest(&message);
        }
    }

    #[test]
    fn test_out_of_order_index_is_padded() {
        let mut aggregator = ResultAggregator::new(Side::White, 3);
        feed(&mut aggregator, &["info depth 5 multipv 3 score cp 10 pv a2a3"]);
        assert_eq!(aggregator.lines().len(), 3);
        assert!(!aggregator.lines()[0].filled);
        assert!(!aggregator.lines()[1].filled);
        assert_eq!(aggregator.lines()[1].index, 2);
        assert!(aggregator.lines()[2].filled);
    }

    #[test]
    fn test_later_update_overwrites() {
        let mut aggregator = ResultAggregator::new(Side::White, 1);
        feed(
            &mut aggregator,
            &[
                "info depth 4 multipv 1 score cp 12 pv d2d4",
                "info depth 9 multipv 1 score cp 31 pv e2e4 e7e5",
            ],
        );
        let result = aggregator.finish(Some("e2e4"), false);
        assert_eq!(result.lines.len(), 1);
        assert_eq!(result.lines[0].moves, vec!["e2e4", "e7e5"]);
        assert_eq!(result.score, Some(Score::Centipawns(31)));
        assert_eq!(result.depth, Some(9));
    }

    #[test]
    fn test_info_without_score_is_ignored() {
        let mut aggregator = ResultAggregator::new(Side::White, 1);
        let message = parse_uci_line("info depth 3 currmove e2e4 currmovenumber 1").unwrap();
        assert!(!aggregator.ingest(&message));
        assert!(!aggregator.has_lines());
    }

    #[test]
    fn test_sort_white_to_move() {
        let mut aggregator = ResultAggregator::new(Side::White, 4);
        feed(
            &mut aggregator,
            &[
                "info multipv 1 score cp 40 pv e2e4",
                "info multipv 2 score mate -2 pv f2f3",
                "info multipv 3 score mate 5 pv d1h5",
                "info multipv 4 score cp 900 pv g1f3",
            ],
        );
        let result = aggregator.finish(Some("e2e4"), false);
        let order: Vec<&str> = result.lines.iter().map(|l| l.moves[0].as_str()).collect();
        assert_eq!(order, vec!["d1h5", "g1f3", "e2e4", "f2f3"]);
        let indices: Vec<u32> = result.lines.iter().map(|l| l.index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4]);
        assert_eq!(result.best_move.as_deref(), Some("d1h5"));
        assert_eq!(result.evaluation, "#5");
    }

    #[test]
    fn test_sort_black_to_move() {
        // Raw scores are from Black's side; stronger for Black comes first.
        let mut aggregator = ResultAggregator::new(Side::Black, 3);
        feed(
            &mut aggregator,
            &[
                "info multipv 1 score cp -30 pv e7e5",
                "info multipv 2 score cp 25 pv c7c5",
                "info multipv 3 score mate 1 pv d8h4",
            ],
        );
        let result = aggregator.finish(None, false);
        let order: Vec<&str> = result.lines.iter().map(|l| l.moves[0].as_str()).collect();
        assert_eq!(order, vec!["d8h4", "c7c5", "e7e5"]);
        assert_eq!(result.score, Some(Score::Mate(-1)));
        assert_eq!(result.lines[1].score, Score::Centipawns(-25));
    }

    #[test]
    fn test_trims_to_requested_and_keeps_placeholders_last() {
        let mut aggregator = ResultAggregator::new(Side::White, 2);
        feed(
            &mut aggregator,
            &[
                "info multipv 2 score cp -80 pv h2h4",
                "info multipv 3 score cp 500 pv g2g4",
            ],
        );
        let result = aggregator.finish(Some("h2h4"), false);
        assert_eq!(result.lines.len(), 2);
        assert!(result.lines[0].filled);
        assert_eq!(result.lines[0].moves, vec!["h2h4"]);
        assert!(!result.lines[1].filled);
        assert_eq!(result.lines[1].index, 2);
    }

    #[test]
    fn test_native_wdl_only_from_first_line() {
        let mut aggregator = ResultAggregator::new(Side::Black, 2);
        feed(
            &mut aggregator,
            &[
                "info multipv 1 score cp 20 wdl 200 700 100 pv e7e5",
                "info multipv 2 score cp 10 wdl 150 700 150 pv c7c5",
            ],
        );
        assert_eq!(aggregator.lines()[0].wdl, Some(Wdl { win: 100, draw: 700, loss: 200 }));
        assert_eq!(aggregator.lines()[1].wdl, None);
        let result = aggregator.finish(Some("e7e5"), false);
        assert_eq!(result.wdl, Some(Wdl { win: 100, draw: 700, loss: 200 }));
    }

    #[test]
    fn test_wdl_estimated_when_resort_changes_top_line() {
        let mut aggregator = ResultAggregator::new(Side::White, 2);
        feed(
            &mut aggregator,
            &[
                "info multipv 1 score cp 10 wdl 100 800 100 pv e2e4",
                "info multipv 2 score cp 60 pv d2d4",
            ],
        );
        let result = aggregator.finish(Some("e2e4"), false);
        assert_eq!(result.best_move.as_deref(), Some("d2d4"));
        assert_eq!(result.wdl, Some(Wdl::estimate(Score::Centipawns(60))));
    }

    #[test]
    fn test_checkmated_black_is_a_white_win() {
        let mut aggregator = ResultAggregator::new(Side::Black, 1);
        feed(&mut aggregator, &["info depth 0 score mate 0"]);
        let result = aggregator.finish(Some("(none)"), false);
        assert_eq!(result.best_move, None);
        assert_eq!(result.score, Some(Score::Mated(Side::Black)));
        assert_eq!(result.evaluation, "#0");
        assert_eq!(result.wdl.map(|w| w.win), Some(1000));
    }

    #[test]
    fn test_checkmated_white_is_a_white_loss() {
        let mut aggregator = ResultAggregator::new(Side::White, 1);
        feed(&mut aggregator, &["info depth 0 score mate 0"]);
        let result = aggregator.finish(Some("(none)"), false);
        assert_eq!(result.score, Some(Score::Mated(Side::White)));
        assert_eq!(result.evaluation, "#-0");
        assert_eq!(result.wdl.map(|w| w.loss), Some(1000));
    }

    #[test]
    fn test_no_lines_uses_hint() {
        let aggregator = ResultAggregator::new(Side::White, 1);
        let result = aggregator.finish(Some("e2e4"), true);
        assert_eq!(result.best_move.as_deref(), Some("e2e4"));
        assert_eq!(result.score, None);
        assert!(result.partial);
        assert!(result.evaluation.is_empty());

        let aggregator = ResultAggregator::new(Side::White, 1);
        let result = aggregator.finish(Some("(none)"), false);
        assert_eq!(result.best_move, None);
    }
}
