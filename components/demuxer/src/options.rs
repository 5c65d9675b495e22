//! Protocol-aware open options
//!
//! The option set handed to the library varies by URL scheme: network
//! sources get buffers, timeouts, and reconnect flags; local files get
//! nothing.

use zenplay_shared_types::NetworkConfig;

/// Builds the option list for opening `url`
///
/// Returned as plain key/value pairs; the demuxer converts them into the
/// library's dictionary form. Options the active protocol does not
/// recognize are ignored by the library.
///
/// # Examples
///
/// ```
/// use zenplay_demuxer::protocol_options;
/// use zenplay_shared_types::NetworkConfig;
///
/// let options = protocol_options("file:///tmp/movie.mp4", &NetworkConfig::default());
/// assert!(options.is_empty());
///
/// let options = protocol_options("https://example.com/a.mp4", &NetworkConfig::default());
/// assert!(options.iter().any(|(k, _)| k == "reconnect"));
/// ```
pub fn protocol_options(url: &str, network: &NetworkConfig) -> Vec<(String, String)> {
    let mut options = Vec::new();
    let timeout_us = network.timeout_ms.saturating_mul(1000);

    match scheme_of(url) {
        "http" | "https" => {
            options.push(("buffer_size", network.buffer_size_kb * 1024));
            options.push(("rw_timeout", timeout_us));
            options.push(("reconnect", 1));
            options.push(("reconnect_streamed", 1));
            options.push(("reconnect_delay_max", 2));
            options.push(("multiple_requests", 1));
            return with_user_agent(options, network);
        }
        "rtsp" => {
            let mut options = to_strings(vec![
                ("buffer_size", 5 * 1024 * 1024),
                ("stimeout", timeout_us),
                ("reconnect", 1),
            ]);
            options.push(("rtsp_transport".to_string(), "tcp".to_string()));
            return options;
        }
        "rtmp" => {
            let mut options = to_strings(vec![("buffer_size", 5 * 1024 * 1024)]);
            options.push(("rtmp_live".to_string(), "live".to_string()));
            return options;
        }
        "udp" | "rtp" => {
            return to_strings(vec![
                ("buffer_size", 1024 * 1024),
                ("timeout", 1_000_000),
            ]);
        }
        _ => {}
    }

    to_strings(options)
}

fn with_user_agent(options: Vec<(&'static str, u64)>, network: &NetworkConfig) -> Vec<(String, String)> {
    let mut options = to_strings(options);
    options.push(("user_agent".to_string(), network.user_agent.clone()));
    options
}

fn to_strings(options: Vec<(&'static str, u64)>) -> Vec<(String, String)> {
    options
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

/// Extracts the URL scheme, defaulting to `file` for bare paths
pub(crate) fn scheme_of(url: &str) -> &str {
    match url.split_once("://") {
        Some((scheme, _)) => scheme,
        None => "file",
    }
}
