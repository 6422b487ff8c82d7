// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display and platform directories)
pub const APP_NAME: &str = "Chatd";

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "chatd";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".chatd";

// =============================================================================
// Environment Variables - Debug / Logging
// =============================================================================

pub const ENV_LOG: &str = "CHATD_LOG";

// =============================================================================
// Environment Variables - Server
// =============================================================================

pub const ENV_IP: &str = "CHATD_IP";
pub const ENV_PORT: &str = "CHATD_PORT";
pub const ENV_IP_CONNECT: &str = "CHATD_IP_CONNECT";
pub const ENV_PORT_CONNECT: &str = "CHATD_PORT_CONNECT";

// =============================================================================
// Server Defaults
// =============================================================================

pub const DEFAULT_IP: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5001;

// =============================================================================
// Environment Variables - Storage
// =============================================================================

/// Environment variable to override data directory
pub const ENV_DATA_DIR: &str = "CHATD_DATA_DIR";

// =============================================================================
// SQLite Database
// =============================================================================

/// SQLite connection pool max connections
pub const SQLITE_MAX_CONNECTIONS: u32 = 5;

/// SQLite busy timeout in seconds
pub const SQLITE_BUSY_TIMEOUT_SECS: u64 = 30;

/// SQLite cache size (negative = KB, so -8000 = 8MB)
pub const SQLITE_CACHE_SIZE: i64 = -8000;

/// SQLite WAL autocheckpoint page count
pub const SQLITE_WAL_AUTOCHECKPOINT: i64 = 1000;

/// Background WAL checkpoint interval in seconds
pub const SQLITE_CHECKPOINT_INTERVAL_SECS: u64 = 60;

// =============================================================================
// Replication / Membership Timing
// =============================================================================

/// Heartbeat interval (T_hb): how often a non-leader pings every peer.
pub const HEARTBEAT_INTERVAL_SECS: u64 = 1;

/// Failure threshold (T_fail): a peer with no heartbeat for this long is dropped.
/// Recommended as 3 * HEARTBEAT_INTERVAL_SECS.
pub const FAILURE_TIMEOUT_SECS: u64 = 3;

/// Timeout applied to heartbeat probes and leader fan-out RPCs.
pub const RPC_PROBE_TIMEOUT_SECS: u64 = 2;

/// Default inbox limit for a newly registered user.
pub const DEFAULT_INBOX_LIMIT: i64 = 50;

// =============================================================================
// Client Connector Timing
// =============================================================================

/// Timeout for a client's discovery probe against a candidate server.
pub const CLIENT_PROBE_TIMEOUT_SECS: u64 = 2;

/// Sleep between discovery sweeps when no server responds.
pub const CLIENT_DISCOVERY_BACKOFF_SECS: u64 = 1;

/// Delay before the monitor stream auto-restarts after an error or handle change,
/// giving a newly elected leader time to finish its own join.
pub const CLIENT_MONITOR_RESTART_DELAY_SECS: u64 = 3;

// =============================================================================
// Shutdown
// =============================================================================

pub const SHUTDOWN_TIMEOUT_SECS: u64 = 10;
