use crate::app::commands::{Command, CommandError};
use crate::player::applemusic::ConnectIntent;
use crate::player::remote::RemoteState;
use crate::player::ConnectionState;

pub enum AppEvent {
    Input(Result<Command, CommandError>),
    InputClosed,
    Remote(RemoteState),
    Connection(ConnectionState),
    Intent(ConnectIntent),
}
