use std::{io, path::PathBuf, time::Duration};

use jiff::civil::Date;
use log::info;
use reqwest::{
    blocking::Client,
    header::{ACCEPT, REFERER, USER_AGENT},
};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConnectionsError {
    #[error("time zone {name} is not available: {source}")]
    TimeZone {
        name: String,
        #[source]
        source: jiff::Error,
    },
    #[error("NYT URL error for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("NYT HTTP error: {0}")]
    Status(u16),
    #[error("NYT returned invalid JSON from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Expected at least {expected} words, got {found}")]
    InsufficientWords { expected: usize, found: usize },
    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Fixed settings for talking to the NYT games service.
#[derive(Debug, Clone, PartialEq)]
pub struct NytConfig {
    /// Contains a `{date}` placeholder, replaced with `YYYY-MM-DD`
    pub url_template: String,
    pub accept: String,
    pub referer: String,
    pub user_agent: String,
    /// Bound on the whole request, connect included
    pub timeout: Duration,
    /// IANA name of the zone where the puzzle day starts
    pub time_zone: String,
}

impl Default for NytConfig {
    fn default() -> Self {
        NytConfig {
            url_template: "https://www.nytimes.com/svc/connections/v2/{date}.json".to_string(),
            accept: "application/json".to_string(),
            referer: "https://www.nytimes.com/games/connections".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36".to_string(),
            timeout: Duration::from_secs(20),
            time_zone: "America/New_York".to_string(),
        }
    }
}

impl NytConfig {
    pub fn url(&self, date: &Date) -> String {
        self.url_template.replace("{date}", &date.to_string())
    }
}

/// Something that can produce the raw puzzle payload for a given day.
pub trait PuzzleSource {
    fn fetch(&self, date: &Date) -> Result<Value, ConnectionsError>;
}

pub struct NytClient {
    config: NytConfig,
}

impl NytClient {
    pub fn new(config: NytConfig) -> NytClient {
        NytClient { config }
    }
}

impl PuzzleSource for NytClient {
    /// One GET, no retries.  Anything outside 2xx is an error.
    fn fetch(&self, date: &Date) -> Result<Value, ConnectionsError> {
        let url = self.config.url(date);
        info!("Fetching {}", url);
        let client = Client::builder()
            .timeout(self.config.timeout)
            .build()
            .map_err(|source| ConnectionsError::Transport {
                url: url.clone(),
                source,
            })?;
        let response = client
            .get(&url)
            .header(ACCEPT, &self.config.accept)
            .header(REFERER, &self.config.referer)
            .header(USER_AGENT, &self.config.user_agent)
            .send()
            .map_err(|source| ConnectionsError::Transport {
                url: url.clone(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(ConnectionsError::Status(status.as_u16()));
        }
        response
            .json::<Value>()
            .map_err(|source| ConnectionsError::Decode { url, source })
    }
}

#[cfg(test)]
mod tests {
    use std::{
        error::Error,
        io::{Read, Write},
        net::TcpListener,
        thread::{self, JoinHandle},
        time::Instant,
    };

    use jiff::civil::date;

    use super::*;

    /// Serve exactly one HTTP response on a random local port.  The join
    /// handle returns the raw request that was received.
    fn serve_once(status_line: &str, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            stream.write_all(response.as_bytes()).unwrap();
            String::from_utf8_lossy(&request).to_string()
        });
        (format!("http://127.0.0.1:{}/svc/connections/v2/{{date}}.json", port), handle)
    }

    fn local_config(url_template: String) -> NytConfig {
        NytConfig {
            url_template,
            timeout: Duration::from_secs(5),
            ..NytConfig::default()
        }
    }

    #[test]
    fn url_for_day() {
        let config = NytConfig::default();
        assert_eq!(
            config.url(&date(2025, 1, 12)),
            "https://www.nytimes.com/svc/connections/v2/2025-01-12.json"
        );
    }

    #[test]
    fn fetch_ok_sends_headers() -> Result<(), Box<dyn Error>> {
        let (url_template, handle) = serve_once("200 OK", r#"{"words": ["a", "b"]}"#);
        let client = NytClient::new(local_config(url_template));
        let payload = client.fetch(&date(2025, 1, 12))?;
        assert_eq!(payload["words"][1], "b");

        let request = handle.join().unwrap().to_lowercase();
        assert!(request.starts_with("get /svc/connections/v2/2025-01-12.json "));
        assert!(request.contains("accept: application/json"));
        assert!(request.contains("referer: https://www.nytimes.com/games/connections"));
        assert!(request.contains("user-agent: mozilla/5.0"));
        Ok(())
    }

    #[test]
    fn fetch_forbidden() {
        let (url_template, handle) = serve_once("403 Forbidden", "");
        let client = NytClient::new(local_config(url_template));
        let res = client.fetch(&date(2025, 1, 12));
        assert!(matches!(res, Err(ConnectionsError::Status(403))));
        handle.join().unwrap();
    }

    #[test]
    fn fetch_invalid_json() {
        let (url_template, handle) = serve_once("200 OK", "<html>not json</html>");
        let client = NytClient::new(local_config(url_template));
        let res = client.fetch(&date(2025, 1, 12));
        assert!(matches!(res, Err(ConnectionsError::Decode { .. })));
        handle.join().unwrap();
    }

    #[test]
    fn fetch_times_out() {
        // accept the connection, then never answer
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let (_stream, _) = listener.accept().unwrap();
            thread::sleep(Duration::from_secs(3));
        });
        let client = NytClient::new(NytConfig {
            url_template: format!("http://127.0.0.1:{}/svc/connections/v2/{{date}}.json", port),
            timeout: Duration::from_millis(300),
            ..NytConfig::default()
        });

        let start = Instant::now();
        let res = client.fetch(&date(2025, 1, 12));
        let elapsed = start.elapsed();
        match res {
            Err(ConnectionsError::Transport { source, .. }) => assert!(source.is_timeout()),
            other => panic!("expected a timeout, got {:?}", other),
        }
        assert!(elapsed < Duration::from_secs(2), "took {:?}", elapsed);
        handle.join().unwrap();
    }

    #[test]
    fn fetch_connection_refused() {
        // grab a free port, then close it so nobody is listening
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = NytClient::new(local_config(format!(
            "http://127.0.0.1:{}/svc/connections/v2/{{date}}.json",
            port
        )));
        let res = client.fetch(&date(2025, 1, 12));
        match res {
            Err(ConnectionsError::Transport { url, .. }) => {
                assert!(url.ends_with("/2025-01-12.json"))
            }
            other => panic!("expected a transport error, got {:?}", other),
        }
    }

    #[ignore]
    #[test]
    fn fetch_nyt() -> Result<(), Box<dyn Error>> {
        let client = NytClient::new(NytConfig::default());
        let payload = client.fetch(&date(2025, 1, 12))?;
        assert!(payload.is_object());
        Ok(())
    }
}
