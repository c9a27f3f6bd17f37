//! In-chat command grammar.

use std::fmt;

/// Who may run a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    /// `bot.operators` only
    Operator,
    /// `bot.operators` or `bot.trusted`
    Trusted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `reboot [--sync|-s]`
    Reboot { sync: bool },
    /// `chat-summary [-n N] [-c CHANNEL]`
    ChatSummary {
        limit: Option<usize>,
        channel: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}\nusage: {usage}")]
pub struct UsageError {
    pub message: String,
    pub usage: &'static str,
}

const REBOOT_USAGE: &str = "reboot [--sync|-s]";
const SUMMARY_USAGE: &str = "chat-summary [-n N] [-c CHANNEL]";

impl Command {
    /// `None` when `text` is not a command at all; `Some(Err)` when it names a
    /// command but the arguments are wrong.
    pub fn parse(text: &str) -> Option<Result<Self, UsageError>> {
        let mut words = text.split_whitespace();
        let head = words.next()?;
        let head = head.strip_prefix('/').unwrap_or(head);
        let args: Vec<&str> = words.collect();

        match head {
            "reboot" => Some(parse_reboot(&args)),
            "chat-summary" => Some(parse_summary(&args)),
            _ => None,
        }
    }

    pub fn authority(&self) -> Authority {
        match self {
            Self::Reboot { .. } => Authority::Operator,
            Self::ChatSummary { .. } => Authority::Trusted,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reboot { sync: true } => write!(f, "reboot --sync"),
            Self::Reboot { sync: false } => write!(f, "reboot"),
            Self::ChatSummary { limit, channel } => {
                write!(f, "chat-summary")?;
                if let Some(n) = limit {
                    write!(f, " -n {n}")?;
                }
                if let Some(c) = channel {
                    write!(f, " -c {c}")?;
                }
                Ok(())
            }
        }
    }
}

fn usage(message: impl Into<String>, usage: &'static str) -> UsageError {
    UsageError {
        message: message.into(),
        usage,
    }
}

fn parse_reboot(args: &[&str]) -> Result<Command, UsageError> {
    let mut sync = false;
    for arg in args {
        match *arg {
            "--sync" | "-s" => sync = true,
            other => return Err(usage(format!("unknown option '{other}'"), REBOOT_USAGE)),
        }
    }
    Ok(Command::Reboot { sync })
}

fn parse_summary(args: &[&str]) -> Result<Command, UsageError> {
    let mut limit = None;
    let mut channel = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match *arg {
            "-n" | "--number" => {
                let raw = iter
                    .next()
                    .ok_or_else(|| usage("-n needs a value", SUMMARY_USAGE))?;
                let n = raw
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| usage(format!("invalid count '{raw}'"), SUMMARY_USAGE))?;
                limit = Some(n);
            }
            "-c" | "--channel" => {
                let raw = iter
                    .next()
                    .ok_or_else(|| usage("-c needs a value", SUMMARY_USAGE))?;
                channel = Some((*raw).to_string());
            }
            other => return Err(usage(format!("unknown option '{other}'"), SUMMARY_USAGE)),
        }
    }
    Ok(Command::ChatSummary { limit, channel })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(text: &str) -> Command {
        Command::parse(text).unwrap().unwrap()
    }

    #[test]
    fn plain_chat_is_not_a_command() {
        assert!(Command::parse("hello there").is_none());
        assert!(Command::parse("").is_none());
        assert!(Command::parse("rebooting soon?").is_none());
    }

    #[test]
    fn reboot_variants() {
        assert_eq!(ok("reboot"), Command::Reboot { sync: false });
        assert_eq!(ok("reboot --sync"), Command::Reboot { sync: true });
        assert_eq!(ok("/reboot -s"), Command::Reboot { sync: true });
        assert!(Command::parse("reboot --now").unwrap().is_err());
    }

    #[test]
    fn summary_options() {
        assert_eq!(
            ok("chat-summary"),
            Command::ChatSummary {
                limit: None,
                channel: None
            }
        );
        assert_eq!(
            ok("chat-summary -n 20 -c group-2"),
            Command::ChatSummary {
                limit: Some(20),
                channel: Some("group-2".into())
            }
        );
    }

    #[test]
    fn summary_rejects_bad_counts() {
        let err = Command::parse("chat-summary -n zero").unwrap().unwrap_err();
        assert!(err.to_string().contains("invalid count"));
        assert!(err.to_string().contains("usage: chat-summary"));
        assert!(Command::parse("chat-summary -n 0").unwrap().is_err());
        assert!(Command::parse("chat-summary -n").unwrap().is_err());
    }

    #[test]
    fn authority_and_display() {
        assert_eq!(ok("reboot").authority(), Authority::Operator);
        assert_eq!(ok("chat-summary").authority(), Authority::Trusted);
        assert_eq!(ok("reboot -s").to_string(), "reboot --sync");
        assert_eq!(ok("chat-summary -c g -n 5").to_string(), "chat-summary -n 5 -c g");
    }
}
