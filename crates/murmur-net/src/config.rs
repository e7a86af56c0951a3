//! Endpoint configuration.

use std::time::Duration;

/// How often the accept loop wakes up to re-check the running flag.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Upper bound on a single socket read.
pub const DEFAULT_READ_CHUNK: usize = 4096;

/// Depth of the endpoint -> consumer event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Time allowed for an outbound TCP handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Endpoint configuration.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Bounded wait for each accept attempt
    pub poll_interval: Duration,
    /// Maximum bytes read (and decoded) at once
    pub read_chunk: usize,
    /// Event channel capacity; the worker waits when it is full
    pub event_capacity: usize,
    /// Connect timeout for the initiator
    pub connect_timeout: Duration,
    /// Disable Nagle so one `send` tends to arrive as one read
    pub nodelay: bool,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            read_chunk: DEFAULT_READ_CHUNK,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            nodelay: true,
        }
    }
}

impl EndpointConfig {
    /// Short timeouts for loopback tests.
    pub fn loopback() -> Self {
        Self {
            poll_interval: Duration::from_millis(50),
            connect_timeout: Duration::from_secs(2),
            ..Self::default()
        }
    }
}
