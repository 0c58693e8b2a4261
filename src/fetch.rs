use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use reqwest::blocking::Client;
use tracing::{debug, info};

use crate::domain::{PVConfig, PVError};
use crate::planet::{CatalogPage, Planet};

/// Where the planets come from.
pub trait PlanetSource {
    fn fetch(&self) -> Result<Vec<Planet>, PVError>;
    fn describe(&self) -> String;
}

pub struct HttpSource {
    endpoint: String,
    client: Client,
}

impl HttpSource {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, PVError> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(endpoint, client))
    }

    pub fn with_client(endpoint: impl Into<String>, client: Client) -> Self {
        Self {
            endpoint: endpoint.into(),
            client,
        }
    }
}

impl PlanetSource for HttpSource {
    fn fetch(&self) -> Result<Vec<Planet>, PVError> {
        let start_time = Instant::now();
        let response = self.client.get(&self.endpoint).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(PVError::HttpStatus(status.as_u16()));
        }
        let body = response.text()?;
        let planets = parse_catalog(&body)?;
        info!(
            "Fetched {} planets from {} in {}ms",
            planets.len(),
            self.endpoint,
            start_time.elapsed().as_millis()
        );
        Ok(planets)
    }

    fn describe(&self) -> String {
        self.endpoint.clone()
    }
}

/// Catalog payload stored on disk.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: &Path) -> Result<Self, PVError> {
        Ok(Self {
            path: expand_path(path)?,
        })
    }
}

impl PlanetSource for FileSource {
    fn fetch(&self) -> Result<Vec<Planet>, PVError> {
        let text = fs::read_to_string(&self.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => PVError::FileNotFound(self.path.clone()),
            _ => PVError::IoError(e),
        })?;
        let planets = parse_catalog(&text)?;
        info!("Loaded {} planets from {}", planets.len(), self.path.display());
        Ok(planets)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

pub fn parse_catalog(body: &str) -> Result<Vec<Planet>, PVError> {
    let page: CatalogPage = serde_json::from_str(body)?;
    if let Some(next) = &page.next {
        debug!(
            "Catalog reports {:?} planets, only the first page is used (next: {next})",
            page.count
        );
    }
    Ok(page.results)
}

/// Expands `~` and environment variables.
pub fn expand_path(path: &Path) -> Result<PathBuf, PVError> {
    let raw = path.to_string_lossy();
    let expanded =
        shellexpand::full(&raw).map_err(|_| PVError::PathExpansion(raw.to_string()))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

pub fn source_from_config(config: &PVConfig) -> Result<Box<dyn PlanetSource>, PVError> {
    match &config.dataset_file {
        Some(path) => Ok(Box::new(FileSource::new(path)?)),
        None => Ok(Box::new(HttpSource::new(config.endpoint.clone())?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planet::tests::FIXTURE;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Serves a single canned response on a loopback port.
    fn serve_once(status: &'static str, body: String) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
            request_line
        });
        (format!("http://{addr}/api/planets/"), handle)
    }

    fn loopback_source(url: &str) -> HttpSource {
        let client = Client::builder().no_proxy().build().unwrap();
        HttpSource::with_client(url, client)
    }

    #[test]
    fn http_source_issues_one_get() {
        let (url, server) = serve_once("200 OK", FIXTURE.to_string());
        let source = loopback_source(&url);
        let planets = source.fetch().unwrap();
        assert_eq!(planets.len(), 10);
        assert_eq!(source.describe(), url);
        let request_line = server.join().unwrap();
        assert!(request_line.starts_with("GET /api/planets/ HTTP/1.1"));
    }

    #[test]
    fn http_status_errors_are_reported() {
        let (url, server) = serve_once("404 Not Found", "{}".to_string());
        let source = loopback_source(&url);
        assert!(matches!(source.fetch(), Err(PVError::HttpStatus(404))));
        server.join().unwrap();
    }

    #[test]
    fn malformed_payload_is_a_json_error() {
        let (url, server) = serve_once("200 OK", r#"{"planets": []}"#.to_string());
        let source = loopback_source(&url);
        assert!(matches!(source.fetch(), Err(PVError::Json(_))));
        server.join().unwrap();
    }

    #[test]
    fn file_source_reads_catalog_payload() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FIXTURE.as_bytes()).unwrap();
        let config = PVConfig::default().with_dataset_file(Some(file.path().to_path_buf()));
        let source = source_from_config(&config).unwrap();
        let planets = source.fetch().unwrap();
        assert_eq!(planets.len(), 10);
        assert_eq!(planets[7].name, "Naboo");
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("planets.json");
        let source = FileSource::new(&path).unwrap();
        assert!(matches!(source.fetch(), Err(PVError::FileNotFound(p)) if p == path));
    }

    #[test]
    fn unknown_variables_fail_expansion() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().to_string_lossy().to_string();
        let expanded = expand_path(Path::new("$PLANETVIEW_TEST_NO_SUCH_VAR/x.json"));
        assert!(matches!(expanded, Err(PVError::PathExpansion(_))));
        let plain = expand_path(&dir.path().join("x.json")).unwrap();
        assert_eq!(plain, PathBuf::from(format!("{base}/x.json")));
    }
}
