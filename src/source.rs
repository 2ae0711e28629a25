//! Where the schedule CSV comes from.

use std::path::PathBuf;

use async_trait::async_trait;
use wreq::Client;

use crate::error::ScheduleError;

/// A fetchable schedule document in CSV form.
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    /// Fetch the raw CSV text.
    async fn fetch(&self) -> Result<String, ScheduleError>;

    /// Human-readable origin for logs.
    fn describe(&self) -> String;
}

/// Schedule published at an HTTP(S) URL, e.g. a spreadsheet CSV export.
pub struct HttpScheduleSource {
    http_client: Client,
    url: String,
}

impl HttpScheduleSource {
    pub fn new(url: impl Into<String>) -> Result<Self, ScheduleError> {
        Ok(Self::with_client(crate::http::build_client()?, url))
    }

    pub fn with_client(http_client: Client, url: impl Into<String>) -> Self {
        Self {
            http_client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl ScheduleSource for HttpScheduleSource {
    async fn fetch(&self) -> Result<String, ScheduleError> {
        let response = self.http_client.get(self.url.as_str()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScheduleError::UnexpectedStatus {
                status: status.as_u16(),
                url: self.url.clone(),
            });
        }
        Ok(response.text().await?)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Schedule stored in a local file.
pub struct FileScheduleSource {
    path: PathBuf,
}

impl FileScheduleSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ScheduleSource for FileScheduleSource {
    async fn fetch(&self) -> Result<String, ScheduleError> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| ScheduleError::Io {
                path: self.path.clone(),
                source,
            })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Pick a source for `location`: URLs are fetched over HTTP, anything else is
/// read as a file path.
pub fn source_for(location: &str) -> Result<Box<dyn ScheduleSource>, ScheduleError> {
    let location = location.trim();
    if location.starts_with("http://") || location.starts_with("https://") {
        Ok(Box::new(HttpScheduleSource::new(location)?))
    } else {
        Ok(Box::new(FileScheduleSource::new(location)))
    }
}
