//! HTTP/2 fingerprint configuration (SETTINGS frame and connection window).

/// Default initial window size for both streams and the connection (RFC 9113).
const DEFAULT_WINDOW: u32 = 65_535;

/// HTTP/2 SETTINGS a browser sends after ALPN selects `h2`.
///
/// `None` means the browser leaves that setting out of its SETTINGS frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Http2Settings {
    pub header_table_size: Option<u32>,
    pub enable_push: Option<bool>,
    pub max_concurrent_streams: Option<u32>,
    pub initial_window_size: Option<u32>,
    pub max_frame_size: Option<u32>,
    pub max_header_list_size: Option<u32>,
    /// WINDOW_UPDATE increment sent on stream 0 right after the preface.
    pub connection_window_increment: u32,
}

impl Http2Settings {
    /// Chrome 58 through 72.
    pub const CHROME: Self = Self {
        header_table_size: Some(65_536),
        enable_push: None,
        max_concurrent_streams: Some(1000),
        initial_window_size: Some(6_291_456),
        max_frame_size: None,
        max_header_list_size: Some(262_144),
        connection_window_increment: 15_663_105,
    };

    /// Firefox 55 through 65.
    pub const FIREFOX: Self = Self {
        header_table_size: Some(65_536),
        enable_push: None,
        max_concurrent_streams: None,
        initial_window_size: Some(131_072),
        max_frame_size: Some(16_384),
        max_header_list_size: None,
        connection_window_increment: 12_517_377,
    };

    /// Mobile Safari on iOS 11/12.
    pub const SAFARI: Self = Self {
        header_table_size: None,
        enable_push: Some(false),
        max_concurrent_streams: Some(100),
        initial_window_size: Some(2_097_152),
        max_frame_size: None,
        max_header_list_size: None,
        connection_window_increment: 10_420_225,
    };

    /// Effective connection-level receive window.
    pub fn connection_window(&self) -> u32 {
        DEFAULT_WINDOW.saturating_add(self.connection_window_increment)
    }

    /// Akamai-style SETTINGS text, e.g. `1:65536;3:1000;4:6291456;6:262144`.
    pub fn akamai_settings(&self) -> String {
        let pairs = [
            (1, self.header_table_size),
            (2, self.enable_push.map(u32::from)),
            (3, self.max_concurrent_streams),
            (4, self.initial_window_size),
            (5, self.max_frame_size),
            (6, self.max_header_list_size),
        ];
        pairs
            .iter()
            .filter_map(|(id, value)| value.map(|v| format!("{}:{}", id, v)))
            .collect::<Vec<_>>()
            .join(";")
    }
}

impl Default for Http2Settings {
    fn default() -> Self {
        Self::CHROME
    }
}
