use std::str::FromStr;

use thiserror::Error;

use crate::player::{PlayerService, RepeatMode, ShuffleMode};

/// One line typed on stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Connect(PlayerService),
    Disconnect,
    Play,
    Pause,
    Stop,
    Next,
    Prev,
    Seek(u64),
    Repeat(RepeatMode),
    Shuffle(ShuffleMode),
    Isrc(String),
    Artwork,
    Authorized(String),
    Status,
    Services,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command `{0}`, try `help`")]
    Unknown(String),
    #[error("`{command}` expects {expected}")]
    BadArgument {
        command: &'static str,
        expected: &'static str,
    },
}

pub const HELP: &str = "\
commands:
  spotify | apple          connect to a service
  disconnect               drop the current connection
  play | pause | stop      transport
  next | prev              skip
  seek <ms>                jump to a position
  repeat off|one|all       repeat mode
  shuffle on|off           shuffle mode
  isrc <code>              play a recording by ISRC
  artwork                  resolve artwork of the current track
  authorized <token>       finish an Apple Music authorization
  status | services        show state / installed services
  quit";

fn argument<'a>(
    arg: Option<&'a str>,
    command: &'static str,
    expected: &'static str,
) -> Result<&'a str, CommandError> {
    arg.ok_or(CommandError::BadArgument { command, expected })
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Err(CommandError::Empty);
        };
        let arg = words.next();

        let command = match name.to_ascii_lowercase().as_str() {
            "spotify" => Command::Connect(PlayerService::Spotify),
            "apple" | "apple-music" => Command::Connect(PlayerService::AppleMusic),
            "disconnect" => Command::Disconnect,
            "play" => Command::Play,
            "pause" => Command::Pause,
            "stop" => Command::Stop,
            "next" => Command::Next,
            "prev" | "previous" => Command::Prev,
            "seek" => {
                let ms = argument(arg, "seek", "a position in milliseconds")?;
                Command::Seek(ms.parse().map_err(|_| CommandError::BadArgument {
                    command: "seek",
                    expected: "a position in milliseconds",
                })?)
            }
            "repeat" => Command::Repeat(match argument(arg, "repeat", "off, one or all")? {
                "off" => RepeatMode::Off,
                "one" => RepeatMode::One,
                "all" => RepeatMode::All,
                _ => {
                    return Err(CommandError::BadArgument {
                        command: "repeat",
                        expected: "off, one or all",
                    })
                }
            }),
            "shuffle" => Command::Shuffle(match argument(arg, "shuffle", "on or off")? {
                "on" => ShuffleMode::On,
                "off" => ShuffleMode::Off,
                _ => {
                    return Err(CommandError::BadArgument {
                        command: "shuffle",
                        expected: "on or off",
                    })
                }
            }),
            "isrc" => Command::Isrc(argument(arg, "isrc", "an ISRC code")?.to_ascii_uppercase()),
            "artwork" => Command::Artwork,
            "authorized" => {
                Command::Authorized(argument(arg, "authorized", "a music user token")?.to_string())
            }
            "status" => Command::Status,
            "services" => Command::Services,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}
