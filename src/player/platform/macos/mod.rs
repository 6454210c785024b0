//! Desktop bridges for macOS: both services are scripted through `osascript`.

pub mod common;
pub mod music;
pub mod spotify;

pub use music::AppleScriptMusicKit;
pub use spotify::AppleScriptSpotify;
