use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no image given; usage: lc3 <image>...")]
    Usage,

    #[error("failed to load image: {path}")]
    ImageLoad {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}
