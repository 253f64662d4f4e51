pub type Result<T> = std::result::Result<T, Error>;
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Failed to push to heapless datastructure, limit was {0}")]
    HeaplessPush(usize),
    #[cfg(feature = "config-file")]
    #[error("Failed to find appropriate user config directory after searching environment variables $XDG_CONFIG_HOME falling back to $HOME/.config")]
    ConfigDirFind,
    #[error("Failed to read or write state on disk")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "config-file")]
    #[error("Failed to parse config")]
    ConfigParse(#[from] toml::de::Error),
    #[error("Unsound configuration: Reason {0}")]
    ConfigLogic(&'static str),
}
