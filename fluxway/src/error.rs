use std::io;

pub(crate) type Result<T> = std::result::Result<T, Error>;
#[derive(thiserror::Error, Debug)]
pub(crate) enum Error {
    #[error(transparent)]
    Core(#[from] fluxway_core::error::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    NixPoll(#[from] nix::Error),
    #[error("Restart triggered")]
    FullRestart,
    #[error("Exit triggered")]
    GracefulShutdown,
}
