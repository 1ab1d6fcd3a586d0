use std::fmt;

/// Commands sent to the engine. `Display` renders the exact wire line,
/// without the trailing newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UciCommand {
    Uci,
    IsReady,
    UciNewGame,
    SetOption { name: String, value: String },
    PositionFen(String),
    GoDepth(u32),
    GoMoveTime(u64),
    /// A caller-built `go ...` line, passed through as is.
    GoRaw(String),
    Stop,
    Quit,
}

impl UciCommand {
    pub fn set_option(name: impl Into<String>, value: impl ToString) -> Self {
        UciCommand::SetOption {
            name: name.into(),
            value: value.to_string(),
        }
    }
}

impl fmt::Display for UciCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UciCommand::Uci => f.write_str("uci"),
            UciCommand::IsReady => f.write_str("isready"),
            UciCommand::UciNewGame => f.write_str("ucinewgame"),
            UciCommand::SetOption { name, value } => {
                write!(f, "setoption name {} value {}", name, value)
            }
            UciCommand::PositionFen(fen) => write!(f, "position fen {}", fen.trim()),
            UciCommand::GoDepth(depth) => write!(f, "go depth {}", depth),
            UciCommand::GoMoveTime(ms) => write!(f, "go movetime {}", ms),
            UciCommand::GoRaw(line) => f.write_str(line.trim()),
            UciCommand::Stop => f.write_str("stop"),
            UciCommand::Quit => f.write_str("quit"),
        }
    }
}
