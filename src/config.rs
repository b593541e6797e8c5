use std::env;

const MAX_PAGE_SIZE: u32 = 100;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncConfig {
    /// Records requested per pull page
    pub page_size: u32,
    /// Capacity of the push event channel
    pub push_buffer: usize,
    /// Capacity of the sync event broadcast bus
    pub event_capacity: usize,
    /// Default tracing filter when RUST_LOG is unset
    pub log_filter: String,
}

impl SyncConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let page_size: u32 = env::var("NOTISYNC_PAGE_SIZE")
            .unwrap_or_else(|_| "20".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPageSize)?;
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::InvalidPageSize);
        }

        let push_buffer = env::var("NOTISYNC_PUSH_BUFFER")
            .unwrap_or_else(|_| "64".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidCapacity("NOTISYNC_PUSH_BUFFER"))?;

        let event_capacity = env::var("NOTISYNC_EVENT_CAPACITY")
            .unwrap_or_else(|_| "256".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidCapacity("NOTISYNC_EVENT_CAPACITY"))?;

        if push_buffer == 0 {
            return Err(ConfigError::InvalidCapacity("NOTISYNC_PUSH_BUFFER"));
        }
        if event_capacity == 0 {
            return Err(ConfigError::InvalidCapacity("NOTISYNC_EVENT_CAPACITY"));
        }

        let log_filter =
            env::var("NOTISYNC_LOG_FILTER").unwrap_or_else(|_| "notisync=info".to_string());

        Ok(SyncConfig {
            page_size,
            push_buffer,
            event_capacity,
            log_filter,
        })
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            push_buffer: 64,
            event_capacity: 256,
            log_filter: "notisync=info".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("NOTISYNC_PAGE_SIZE must be a number between 1 and 100")]
    InvalidPageSize,

    #[error("{0} must be a positive number")]
    InvalidCapacity(&'static str),
}
