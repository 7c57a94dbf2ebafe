use std::fs;
use std::path::Path;

use reqwest::blocking::Client;
use tracing::debug;

use crate::core::error::{McpmError, McpmResult};
use crate::core::files::{persist, temp_sibling};

/// Retrieves one artifact body into a local file.
pub trait ArtifactFetcher {
    /// Write the body at `url` to `dest`. `dest` only appears once the body
    /// is complete.
    fn fetch(&self, url: &str, dest: &Path) -> McpmResult<()>;
}

/// Plain HTTP(S) GET with the browser-like client from `core::http`.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl ArtifactFetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> McpmResult<()> {
        let mut response = self.client.get(url).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(McpmError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let tmp = temp_sibling(dest);
        // Stream straight to disk; the handle is closed before the rename.
        let written = {
            let mut file = fs::File::create(&tmp).map_err(|e| McpmError::io(&tmp, e))?;
            response
                .copy_to(&mut file)
                .map_err(McpmError::from)
                .and_then(|bytes| {
                    file.sync_all().map_err(|e| McpmError::io(&tmp, e))?;
                    Ok(bytes)
                })
        };

        match written {
            Ok(bytes) => {
                debug!("Fetched {} bytes from {}", bytes, url);
                persist(&tmp, dest)
            }
            Err(e) => {
                let _ = fs::remove_file(&tmp);
                Err(e)
            }
        }
    }
}
