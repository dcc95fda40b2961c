//! Operator notification channel.
//!
//! Defines the `Notifier` trait used to push signal alerts to the operator,
//! and the confirmation token carried by the operator's yes/no choice.

pub mod command;
pub mod format;
pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use tracing::info;

use crate::types::{Action, SentinelError};

const TOKEN_PREFIX: &str = "CONFIRM";

/// A labelled choice presented to the operator alongside a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub label: String,
    /// Opaque token delivered back when the operator picks this choice.
    pub token: String,
}

/// Abstraction over outbound operator messaging.
///
/// A notifier is bound to a single operator chat at construction.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send `text`, optionally offering `choices` to pick from.
    async fn notify(&self, text: &str, choices: Option<&[Choice]>) -> Result<()>;
}

/// Notifier that only writes to the log.
///
/// Used when no Telegram credentials are configured. Choices cannot be
/// answered through it, so pending orders stay open until an operator
/// channel is available.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, text: &str, choices: Option<&[Choice]>) -> Result<()> {
        let labels: Vec<&str> = choices
            .unwrap_or_default()
            .iter()
            .map(|c| c.label.as_str())
            .collect();
        info!(choices = ?labels, "[notify] {text}");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Confirmation token
// ---------------------------------------------------------------------------

/// The operator's answer to a pending order, as carried in a choice token.
///
/// Wire format: `CONFIRM|<BUY|SELL>|<instrument>|<YES|NO>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationToken {
    pub action: Action,
    pub instrument_id: String,
    pub accepted: bool,
}

impl ConfirmationToken {
    pub fn new(action: Action, instrument_id: &str, accepted: bool) -> Self {
        Self {
            action,
            instrument_id: instrument_id.to_string(),
            accepted,
        }
    }
}

impl fmt::Display for ConfirmationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{TOKEN_PREFIX}|{}|{}|{}",
            self.action,
            self.instrument_id,
            if self.accepted { "YES" } else { "NO" }
        )
    }
}

impl std::str::FromStr for ConfirmationToken {
    type Err = SentinelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('|').collect();
        let [prefix, action, instrument_id, answer] = parts.as_slice() else {
            return Err(SentinelError::InvalidToken(s.to_string()));
        };

        if *prefix != TOKEN_PREFIX {
            return Err(SentinelError::InvalidToken(format!("unknown prefix: {prefix}")));
        }
        if instrument_id.is_empty() {
            return Err(SentinelError::InvalidToken("empty instrument".to_string()));
        }

        let accepted = match *answer {
            "YES" => true,
            "NO" => false,
            other => return Err(SentinelError::InvalidToken(format!("unknown answer: {other}"))),
        };

        Ok(Self {
            action: action.parse()?,
            instrument_id: instrument_id.to_string(),
            accepted,
        })
    }
}

/// Yes/No choices for confirming a freshly opened pending order.
pub fn confirmation_choices(action: Action, instrument_id: &str) -> Vec<Choice> {
    vec![
        Choice {
            label: "Yes".to_string(),
            token: ConfirmationToken::new(action, instrument_id, true).to_string(),
        },
        Choice {
            label: "No".to_string(),
            token: ConfirmationToken::new(action, instrument_id, false).to_string(),
        },
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
