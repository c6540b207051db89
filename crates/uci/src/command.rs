//! UCI command formatting.

/// Commands sent from GUI to engine.
#[derive(Debug, Clone, PartialEq)]
pub enum GuiCommand {
    /// Initialize UCI mode.
    Uci,
    /// Set an engine option.
    SetOption { name: String, value: String },
    /// Check if engine is ready.
    IsReady,
    /// The next position is unrelated to the previous one.
    UciNewGame,
    /// Set up the position described by a FEN string.
    Position { fen: String },
    /// Search to a fixed depth.
    Go { depth: u32 },
    /// Quit the engine.
    Quit,
}

impl GuiCommand {
    /// Convenience constructor for `setoption name <name> value <value>`.
    pub fn set_option(name: &str, value: impl ToString) -> Self {
        GuiCommand::SetOption {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    /// Format the command as a single protocol line (without newline).
    pub fn to_uci(&self) -> String {
        match self {
            GuiCommand::Uci => "uci".to_string(),
            GuiCommand::SetOption { name, value } => {
                format!("setoption name {} value {}", name, value)
            }
            GuiCommand::IsReady => "isready".to_string(),
            GuiCommand::UciNewGame => "ucinewgame".to_string(),
            // Collapsing whitespace keeps embedded newlines from turning
            // into extra commands.
            GuiCommand::Position { fen } => format!(
                "position fen {}",
                fen.split_whitespace().collect::<Vec<_>>().join(" ")
            ),
            GuiCommand::Go { depth } => format!("go depth {}", depth),
            GuiCommand::Quit => "quit".to_string(),
        }
    }
}
