//! Operator command parsing.

use rust_decimal::Decimal;
use std::str::FromStr;

/// Supported operator commands.
#[derive(Debug, Clone, PartialEq)]
pub enum OperatorCommand {
    Start,
    Help,
    Status,
    SetHolding { instrument_id: String, amount: Decimal },
    UpdateHolding { instrument_id: String, delta: Decimal },
    Probe { instrument_id: String, threshold: Option<Decimal> },
}

/// Parse error for operator command messages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandParseError {
    #[error("message is not a command")]
    NotACommand,
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("`{0}` is not a number")]
    InvalidDecimal(String),
}

const SETHOLDING_USAGE: &str = "/setholding <ticker> <amount>  (e.g. /setholding SGLN.L 400)";
const UPDATEHOLDING_USAGE: &str = "/updateholding <ticker> <delta>  (e.g. /updateholding SGLN.L +50)";
const PROBE_USAGE: &str = "/probe <ticker> [threshold]  (e.g. /probe SGLN.L 0.001)";

/// Parse a chat message into an operator command.
pub fn parse_command(text: &str) -> Result<OperatorCommand, CommandParseError> {
    let mut parts = text.split_whitespace();
    let Some(raw_command) = parts.next() else {
        return Err(CommandParseError::NotACommand);
    };
    if !raw_command.starts_with('/') {
        return Err(CommandParseError::NotACommand);
    }

    // Strip a trailing @botname suffix.
    let command = raw_command
        .split_once('@')
        .map_or(raw_command, |(head, _)| head);
    let args: Vec<&str> = parts.collect();

    match command {
        "/start" => Ok(OperatorCommand::Start),
        "/help" => Ok(OperatorCommand::Help),
        "/status" => Ok(OperatorCommand::Status),
        "/setholding" => {
            let [ticker, amount] = args.as_slice() else {
                return Err(CommandParseError::Usage(SETHOLDING_USAGE));
            };
            Ok(OperatorCommand::SetHolding {
                instrument_id: ticker.to_uppercase(),
                amount: parse_decimal(amount)?,
            })
        }
        "/updateholding" => {
            let [ticker, delta] = args.as_slice() else {
                return Err(CommandParseError::Usage(UPDATEHOLDING_USAGE));
            };
            Ok(OperatorCommand::UpdateHolding {
                instrument_id: ticker.to_uppercase(),
                delta: parse_decimal(delta)?,
            })
        }
        "/probe" => match args.as_slice() {
            [ticker] => Ok(OperatorCommand::Probe {
                instrument_id: ticker.to_uppercase(),
                threshold: None,
            }),
            [ticker, threshold] => Ok(OperatorCommand::Probe {
                instrument_id: ticker.to_uppercase(),
                threshold: Some(parse_decimal(threshold)?),
            }),
            _ => Err(CommandParseError::Usage(PROBE_USAGE)),
        },
        other => Err(CommandParseError::UnknownCommand(other.to_string())),
    }
}

fn parse_decimal(raw: &str) -> Result<Decimal, CommandParseError> {
    let trimmed = raw.strip_prefix('+').unwrap_or(raw);
    Decimal::from_str(trimmed).map_err(|_| CommandParseError::InvalidDecimal(raw.to_string()))
}

/// Command names and descriptions for the bot menu.
pub fn bot_commands() -> Vec<(&'static str, &'static str)> {
    vec![
        ("start", "Show tracked instruments and commands"),
        ("help", "Show command help"),
        ("status", "Show current state of every instrument"),
        ("setholding", "Set declared holding: <ticker> <amount>"),
        ("updateholding", "Adjust declared holding: <ticker> <delta>"),
        ("probe", "Start a low-threshold probe cycle: <ticker> [threshold]"),
    ]
}

/// Help text listing every command.
pub fn command_help() -> String {
    let mut lines = vec!["Commands:".to_string()];
    lines.extend(
        bot_commands()
            .into_iter()
            .map(|(cmd, desc)| format!("/{cmd} - {desc}")),
    );
    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
