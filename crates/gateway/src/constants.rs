//! Constants used throughout the gateway

/// Realm announced in the Basic-auth challenge
pub const REALM: &str = "alldebrid";

/// Milliseconds to pause before answering a failed authentication attempt
pub const AUTH_FAILURE_DELAY_MS: u64 = 1000;

/// Extensions shown with the video icon in listings; cosmetic only
pub const VIDEO_EXTENSIONS: [&str; 4] = ["mp4", "mkv", "avi", "mov"];

/// Default bind host; loopback unless ALD_PUBLIC opts in to a wider bind
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default bind port, overridden by ALD_PORT or the first CLI argument
pub const DEFAULT_PORT: u16 = 8080;

/// Default rclone remote to serve
pub const DEFAULT_REMOTE: &str = "alldebrid:";
