use std::fmt;

/// Error taxonomy for the auto-discovery core.
///
/// Only [`DiscoveryError::Config`] and [`DiscoveryError::ResolveExhausted`]
/// are meant to reach a caller of `AutoServerPool::start` — everything else
/// is recovered internally (logged, next poller tick retries).
#[derive(Debug)]
pub enum DiscoveryError {
    /// Bad settings at construction time. Fatal.
    Config(String),
    /// Transport-level failure talking to the configuration endpoint.
    Io(std::io::Error),
    /// The `CONFIG cluster` response did not match the expected grammar.
    Parse(String),
    /// All initial discovery retries were exhausted before `start()` could
    /// obtain a first roster.
    ResolveExhausted { attempts: u32, last: Box<DiscoveryError> },
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryError::Config(msg) => write!(f, "configuration error: {msg}"),
            DiscoveryError::Io(e) => write!(f, "discovery transport error: {e}"),
            DiscoveryError::Parse(msg) => write!(f, "discovery parse error: {msg}"),
            DiscoveryError::ResolveExhausted { attempts, last } => write!(
                f,
                "initial discovery failed after {attempts} attempt(s): {last}"
            ),
        }
    }
}

impl std::error::Error for DiscoveryError {}

impl From<std::io::Error> for DiscoveryError {
    fn from(e: std::io::Error) -> Self {
        DiscoveryError::Io(e)
    }
}
