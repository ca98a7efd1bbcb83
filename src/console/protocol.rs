//! Line protocol for the pairing console
//!
//! One command per line, whitespace separated:
//!
//! ```text
//! generate <device-id>    (alias: gen)
//! redeem <key>
//! purge
//! stats
//! quit                    (alias: exit)
//! ```

use std::fmt;

/// Parsed console command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Generate { device_id: String },
    Redeem { key: String },
    Purge,
    Stats,
    Quit,
}

impl Command {
    /// Parse one input line; blank lines yield `None`
    pub fn parse(line: &str) -> anyhow::Result<Option<Self>> {
        let mut parts = line.split_whitespace();
        let Some(verb) = parts.next() else {
            return Ok(None);
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "generate" | "gen" => Command::Generate {
                device_id: parts
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("missing device id"))?
                    .to_string(),
            },
            "redeem" => Command::Redeem {
                key: parts
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("missing key"))?
                    .to_string(),
            },
            "purge" => Command::Purge,
            "stats" => Command::Stats,
            "quit" | "exit" => Command::Quit,
            other => anyhow::bail!("unknown command: {}", other),
        };

        if let Some(extra) = parts.next() {
            anyhow::bail!("unexpected argument: {}", extra);
        }
        Ok(Some(command))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Generate { device_id } => write!(f, "generate {}", device_id),
            // keys are credentials; keep them out of logs
            Command::Redeem { .. } => write!(f, "redeem <key>"),
            Command::Purge => write!(f, "purge"),
            Command::Stats => write!(f, "stats"),
            Command::Quit => write!(f, "quit"),
        }
    }
}
