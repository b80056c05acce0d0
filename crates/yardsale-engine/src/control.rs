//! Operator input: line commands on stdin and Ctrl-C.
//!
//! Each line holds one command:
//!
//! | Line | Effect |
//! |---|---|
//! | `play` / `pause` / `toggle` | Auto-play on, off, or flipped |
//! | `step` | One tick while paused |
//! | `group <10\|25\|75\|90>` | Highlight a wealth band |
//! | `ungroup` | Remove the highlight |
//! | `speed <ms>` | Set the tick interval |
//! | `stop` | End the run |
//!
//! Blank lines and lines starting with `#` are ignored. A bad line is
//! logged and skipped; it never stops the run.

use std::str::FromStr;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use yardsale_core::operator::{OperatorCommand, OperatorState};
use yardsale_types::{Cutoff, UnknownCutoff};

/// One parsed operator command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Turn auto-play on.
    Play,
    /// Turn auto-play off.
    Pause,
    /// Flip auto-play.
    Toggle,
    /// Run one tick.
    Step,
    /// Highlight a wealth band.
    Group(Cutoff),
    /// Remove the highlight.
    Ungroup,
    /// Set the tick interval in milliseconds.
    Speed(u64),
    /// End the run.
    Stop,
}

/// Why a command line was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControlParseError {
    /// The command word is not recognized.
    #[error("unknown command {0:?}")]
    UnknownCommand(String),

    /// The command needs an argument that was not given.
    #[error("{command} needs an argument")]
    MissingArgument {
        /// The command word.
        command: &'static str,
    },

    /// The argument is not a number.
    #[error("{command}: {value:?} is not a number")]
    InvalidNumber {
        /// The command word.
        command: &'static str,
        /// The argument as given.
        value: String,
    },

    /// The percentile is not one of the four bands.
    #[error(transparent)]
    UnknownCutoff(#[from] UnknownCutoff),

    /// The command was given more arguments than it takes.
    #[error("{command} takes no more than one argument")]
    TrailingInput {
        /// The command word.
        command: &'static str,
    },
}

impl FromStr for Control {
    type Err = ControlParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or_default().to_ascii_lowercase();
        let argument = words.next();
        let control = match command.as_str() {
            "play" | "resume" => Self::Play,
            "pause" => Self::Pause,
            "toggle" => Self::Toggle,
            "step" => Self::Step,
            "ungroup" | "clear" => Self::Ungroup,
            "stop" | "quit" => Self::Stop,
            "group" => {
                let percentile = number("group", argument)?;
                Self::Group(Cutoff::try_from(percentile)?)
            }
            "speed" => Self::Speed(number("speed", argument)?),
            _ => return Err(ControlParseError::UnknownCommand(command)),
        };

        let expects_argument = matches!(control, Self::Group(_) | Self::Speed(_));
        let extra = if expects_argument { words.next() } else { argument };
        if extra.is_some() {
            return Err(ControlParseError::TrailingInput {
                command: control.name(),
            });
        }
        Ok(control)
    }
}

impl Control {
    /// The command word, for logs and errors.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Toggle => "toggle",
            Self::Step => "step",
            Self::Group(_) => "group",
            Self::Ungroup => "ungroup",
            Self::Speed(_) => "speed",
            Self::Stop => "stop",
        }
    }
}

fn number(command: &'static str, argument: Option<&str>) -> Result<u64, ControlParseError> {
    let value = argument.ok_or(ControlParseError::MissingArgument { command })?;
    value
        .parse()
        .map_err(|_err| ControlParseError::InvalidNumber {
            command,
            value: value.to_owned(),
        })
}

/// Apply a command to the shared operator state.
pub async fn apply(control: Control, operator: &OperatorState) {
    match control {
        Control::Play => operator.resume(),
        Control::Pause => operator.pause(),
        Control::Toggle => {
            let playing = operator.toggle_play();
            info!(playing, "Auto-play toggled");
            return;
        }
        Control::Step => operator.request_step(),
        Control::Group(cutoff) => {
            operator
                .queue_command(OperatorCommand::SelectGroup(cutoff))
                .await;
        }
        Control::Ungroup => operator.queue_command(OperatorCommand::ClearGroup).await,
        Control::Speed(ms) => {
            if let Some(previous) = operator.set_tick_interval_ms(ms) {
                info!(previous_ms = previous, tick_interval_ms = ms, "Tick interval changed");
            } else {
                warn!(tick_interval_ms = ms, "Tick interval rejected");
            }
            return;
        }
        Control::Stop => operator.request_stop(),
    }
    info!(command = control.name(), "Operator command");
}

/// Read commands from `reader` until it closes.
///
/// # Errors
///
/// Returns the I/O error that ended the stream, if any.
pub async fn read_commands<R>(reader: R, operator: &OperatorState) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line.parse::<Control>() {
            Ok(control) => apply(control, operator).await,
            Err(err) => warn!(line, %err, "Ignoring operator input"),
        }
    }
    Ok(())
}

/// Spawn a task that feeds stdin lines to the operator.
///
/// When stdin closes the run carries on; only `stop`, Ctrl-C, or a limit
/// ends it.
pub fn spawn_stdin(operator: Arc<OperatorState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let stdin = BufReader::new(tokio::io::stdin());
        match read_commands(stdin, &operator).await {
            Ok(()) => info!("Operator input closed"),
            Err(err) => warn!(%err, "Operator input failed"),
        }
    })
}

/// Spawn a task that turns Ctrl-C into a clean stop.
pub fn spawn_ctrl_c(operator: Arc<OperatorState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, stopping");
                operator.request_stop();
            }
            Err(err) => warn!(%err, "Unable to listen for Ctrl-C"),
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use yardsale_core::config::SimulationBoundsConfig;

    use super::*;

    fn operator(start_paused: bool) -> OperatorState {
        OperatorState::new(10, start_paused, &SimulationBoundsConfig::default())
    }

    #[test]
    fn parses_every_command() {
        assert_eq!("play".parse(), Ok(Control::Play));
        assert_eq!("PAUSE".parse(), Ok(Control::Pause));
        assert_eq!("toggle".parse(), Ok(Control::Toggle));
        assert_eq!(" step ".parse(), Ok(Control::Step));
        assert_eq!("group 90".parse(), Ok(Control::Group(Cutoff::Top10)));
        assert_eq!("group 75".parse(), Ok(Control::Group(Cutoff::Top25)));
        assert_eq!("group 25".parse(), Ok(Control::Group(Cutoff::Bottom25)));
        assert_eq!("group 10".parse(), Ok(Control::Group(Cutoff::Bottom10)));
        assert_eq!("ungroup".parse(), Ok(Control::Ungroup));
        assert_eq!("speed 250".parse(), Ok(Control::Speed(250)));
        assert_eq!("stop".parse(), Ok(Control::Stop));
    }

    #[test]
    fn rejects_bad_lines() {
        assert_eq!(
            "dance".parse::<Control>(),
            Err(ControlParseError::UnknownCommand("dance".to_owned()))
        );
        assert_eq!(
            "group".parse::<Control>(),
            Err(ControlParseError::MissingArgument { command: "group" })
        );
        assert_eq!(
            "group 50".parse::<Control>(),
            Err(ControlParseError::UnknownCutoff(UnknownCutoff(50)))
        );
        assert!(matches!(
            "speed fast".parse::<Control>(),
            Err(ControlParseError::InvalidNumber { command: "speed", .. })
        ));
        let err = "group 900".parse::<Control>().unwrap_err();
        assert_eq!(err, ControlParseError::UnknownCutoff(UnknownCutoff(900)));
        assert!(err.to_string().starts_with("unknown cutoff percentile 900:"));
        assert_eq!(
            "step 3".parse::<Control>(),
            Err(ControlParseError::TrailingInput { command: "step" })
        );
        assert_eq!(
            "speed 5 10".parse::<Control>(),
            Err(ControlParseError::TrailingInput { command: "speed" })
        );
    }

    #[tokio::test]
    async fn commands_drive_the_operator() {
        let operator = operator(false);
        let input: &[u8] = b"pause\n# comment\n\nstep\ngroup 25\nbogus\nspeed 40\nungroup\n";
        read_commands(input, &operator).await.unwrap();

        assert!(operator.is_paused());
        assert!(operator.take_step_request());
        assert_eq!(operator.tick_interval(), Duration::from_millis(40));
        assert_eq!(
            operator.drain_commands().await,
            vec![
                OperatorCommand::SelectGroup(Cutoff::Bottom25),
                OperatorCommand::ClearGroup
            ]
        );
        assert!(!operator.is_stop_requested());
    }

    #[tokio::test]
    async fn stop_and_toggle() {
        let operator = operator(true);
        read_commands(&b"toggle\nspeed 0\nstop\n"[..], &operator)
            .await
            .unwrap();
        assert!(!operator.is_paused());
        assert_eq!(operator.tick_interval_ms(), 10);
        assert!(operator.is_stop_requested());
    }
}
