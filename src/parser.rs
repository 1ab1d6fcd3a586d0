use crate::score::Score;
use crate::wdl::Wdl;

#[derive(Debug, Clone, PartialEq)]
pub enum UciMessage {
    IdName(String),
    IdAuthor(String),
    UciOk,
    ReadyOk,
    BestMove { best_move: String, ponder: Option<String> },
    /// Scores and WDL are exactly as the engine sent them, i.e. relative to
    /// the side to move.
    Info {
        multipv: u32,
        depth: Option<u32>,
        score: Option<Score>,
        wdl: Option<Wdl>,
        pv: Vec<String>,
    },
    Unknown(String),
}

impl UciMessage {
    /// `bestmove (none)` and `bestmove 0000` carry no move.
    pub fn best_move(&self) -> Option<&str> {
        match self {
            UciMessage::BestMove { best_move, .. } if is_null_move(best_move) => None,
            UciMessage::BestMove { best_move, .. } => Some(best_move.as_str()),
            _ => None,
        }
    }
}

pub fn is_null_move(token: &str) -> bool {
    matches!(token, "(none)" | "0000" | "")
}

pub fn parse_uci_line(line: &str) -> Option<UciMessage> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.is_empty() {
        return None;
    }

    match parts[0] {
        "id" => {
            if parts.len() >= 3 {
                match parts[1] {
                    "name" => Some(UciMessage::IdName(parts[2..].join(" "))),
                    "author" => Some(UciMessage::IdAuthor(parts[2..].join(" "))),
                    _ => Some(UciMessage::Unknown(line.to_string())),
                }
            } else {
                Some(UciMessage::Unknown(line.to_string()))
            }
        }
        "uciok" => Some(UciMessage::UciOk),
        "readyok" => Some(UciMessage::ReadyOk),
        "bestmove" => {
            if parts.len() >= 2 {
                let best_move = parts[1].to_string();
                let ponder = if parts.len() >= 4 && parts[2] == "ponder" {
                    Some(parts[3].to_string())
                } else {
                    None
                };
                Some(UciMessage::BestMove { best_move, ponder })
            } else {
                Some(UciMessage::Unknown(line.to_string()))
            }
        }
        "info" => Some(parse_info(&parts)),
        _ => Some(UciMessage::Unknown(line.to_string())),
    }
}

fn parse_info(parts: &[&str]) -> UciMessage {
    let mut multipv = 1;
    let mut depth = None;
    let mut score = None;
    let mut wdl = None;
    let mut pv = Vec::new();

    let mut i = 1;
    while i < parts.len() {
        match parts[i] {
            "depth" => {
                depth = parts.get(i + 1).and_then(|v| v.parse::<u32>().ok());
                i += 2;
            }
            "multipv" => {
                if let Some(index) = parts.get(i + 1).and_then(|v| v.parse::<u32>().ok()) {
                    multipv = index.max(1);
                }
                i += 2;
            }
            "score" => {
                let value = parts.get(i + 2).and_then(|v| v.parse::<i32>().ok());
                score = match (parts.get(i + 1).copied(), value) {
                    (Some("cp"), Some(cp)) => Some(Score::Centipawns(cp)),
                    (Some("mate"), Some(n)) => Some(Score::Mate(n)),
                    _ => score,
                };
                // lowerbound / upperbound fall through as unknown tokens
                i += 3;
            }
            "wdl" => {
                let values: Vec<u32> = parts
                    .iter()
                    .skip(i + 1)
                    .take(3)
                    .filter_map(|v| v.parse::<u32>().ok())
                    .collect();
                if let [w, d, l] = values[..] {
                    wdl = Wdl::from_engine(w, d, l);
                }
                i += 4;
            }
            "pv" => {
                pv.extend(parts[i + 1..].iter().map(|m| m.to_string()));
                break;
            }
            "string" => break,
            _ => {
                i += 1;
            }
        }
    }

    UciMessage::Info {
        multipv,
        depth,
        score,
        wdl,
        pv,
    }
}
