use tracing::warn;

/// A status line printed by the sealing engine on its standard output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineMessage {
    /// `progress <percentage>`
    Progress(f64),
}

impl EngineMessage {
    ///
    /// Parses one line of engine output.
    ///
    /// The line is split on whitespace into a command word and its arguments.
    /// Returns `None` for unrecognized commands.
    ///
    pub fn parse(line: &str) -> Option<Self> {
        let mut tokens = line.split_whitespace();
        let command = tokens.next()?;

        match command {
            "progress" => {
                let argument = tokens.next();
                match argument.and_then(|value| value.parse::<f64>().ok()) {
                    Some(percentage) if percentage.is_finite() => Some(EngineMessage::Progress(percentage)),
                    _ => {
                        warn!("Ignoring malformed progress message {:?}", line);
                        None
                    }
                }
            }
            _ => None,
        }
    }
}
