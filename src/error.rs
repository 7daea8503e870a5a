pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("workload error: {0}")]
    Workload(String),

    #[error("ready structure full (capacity {capacity})")]
    Capacity { capacity: usize },

    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("memory error: {0}")]
    Memory(String),

    #[error("channel error: {0}")]
    Channel(String),

    #[error("executor error: {0}")]
    Executor(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    pub fn workload<S: Into<String>>(msg: S) -> Self {
        Error::Workload(msg.into())
    }

    pub fn protocol<S: Into<String>>(msg: S) -> Self {
        Error::Protocol(msg.into())
    }

    pub fn memory<S: Into<String>>(msg: S) -> Self {
        Error::Memory(msg.into())
    }

    pub fn channel<S: Into<String>>(msg: S) -> Self {
        Error::Channel(msg.into())
    }

    pub fn executor<S: Into<String>>(msg: S) -> Self {
        Error::Executor(msg.into())
    }

    /// Whether the error is a broken scheduler invariant rather than bad input.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Error::Protocol(_))
    }
}

impl<T> From<crossbeam_channel::SendError<T>> for Error {
    fn from(_: crossbeam_channel::SendError<T>) -> Self {
        Error::channel("receiver disconnected")
    }
}

impl From<crossbeam_channel::RecvError> for Error {
    fn from(_: crossbeam_channel::RecvError) -> Self {
        Error::channel("sender disconnected")
    }
}
