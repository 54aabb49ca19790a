use anyhow::anyhow;
use hex::FromHex;
use hyper::{Body, Client, HeaderMap, Request, StatusCode, Uri};
use hyper::client::HttpConnector;
use hyper::header::{LAST_MODIFIED, USER_AGENT};
use hyper_tls::HttpsConnector;
use tracing::{debug, trace};
use crate::util::blob::Blob;

use crate::util::validating_http_body::{HttpBodyValidator, Md5HttpBodyValidator, Sha1HttpBodyValidator, ValidatingHttpBody};

/// Downloads files relative to a fixed base URI, checking the body's integrity against a hashcode
///  if one is returned in a header.
///
/// Instances do HTTP connection caching internally, so keeping them alive has performance benefits.
pub struct ValidatingHttpDownloader {
    client: Client<HttpsConnector<HttpConnector>>,
    base_uri: String, // with trailing '/'
}
impl ValidatingHttpDownloader {
    pub fn new(base_uri: String) -> anyhow::Result<ValidatingHttpDownloader> {
        let mut base_uri = base_uri;
        if !base_uri.ends_with('/') {
            base_uri.push('/');
        }

        // check that the base URI is valid
        Uri::try_from(base_uri.clone())?;

        Ok(ValidatingHttpDownloader {
            client: Client::builder()
                .build::<_, Body>(HttpsConnector::new()),
            base_uri,
        })
    }

    /// Returns `None` if the upstream repository does not have a file at the given path.
    pub async fn get(&self, path: &str) -> anyhow::Result<Option<Blob>> {
        let artifact_path = format!("{}{}", self.base_uri, path);
        let request = Request::builder()
            .method("GET")
            .uri(Uri::try_from(artifact_path.clone())?)
            .header(USER_AGENT, "curl/7.68.0" ) // Maven Central returns a 403 without a user agent
            .body(Body::empty())?;

        trace!("getting {:?}", request);

        let artifact_response = self.client.request(request)
            .await?;

        if artifact_response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !artifact_response.status().is_success() {
            return Err(anyhow!("upstream request for {} failed: {}", artifact_path, artifact_response.status()));
        }

        let headers = artifact_response.headers();
        let expected_sha1 = expected_sha1(headers);
        let expected_md5 = expected_md5(headers);
        let last_modified = last_modified(headers);

        let mut validators: Vec<Box<dyn HttpBodyValidator>> = vec![];
        if let Some(expected_hash) = expected_sha1 {
            validators.push(Box::new(Sha1HttpBodyValidator::new(expected_hash)));
        }
        if let Some(expected_hash) = expected_md5 {
            validators.push(Box::new(Md5HttpBodyValidator::new(expected_hash)));
        }

        Ok(Some(Blob {
            data: Box::pin(ValidatingHttpBody::new(artifact_response.into_body(), validators)),
            md5: expected_md5,
            sha1: expected_sha1,
            last_modified,
        }))
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name)
        .and_then(|h| h.to_str().ok())
}

fn expected_sha1(headers: &HeaderMap) -> Option<[u8;20]> {
    let sha1_string = header_str(headers, "x-checksum-sha1")
        .or_else(|| header_str(headers, "x-goog-meta-checksum-sha1"))
        .or_else(|| header_str(headers, "etag")
            .filter(|s| s.len() == 42)
            .map(|s| &s[1..41]))?;

    match <[u8;20]>::from_hex(sha1_string) {
        Ok(hash) => Some(hash),
        Err(e) => {
            debug!("ignoring malformed SHA1 header {:?}: {}", sha1_string, e);
            None
        }
    }
}

fn expected_md5(headers: &HeaderMap) -> Option<[u8;16]> {
    let md5_string = header_str(headers, "x-checksum-md5")
        .or_else(|| header_str(headers, "x-goog-meta-checksum-md5"))?;

    match <[u8;16]>::from_hex(md5_string) {
        Ok(hash) => Some(hash),
        Err(e) => {
            debug!("ignoring malformed MD5 header {:?}: {}", md5_string, e);
            None
        }
    }
}

/// 'last-modified' as epoch millis
fn last_modified(headers: &HeaderMap) -> Option<i64> {
    headers.get(LAST_MODIFIED)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| chrono::DateTime::parse_from_rfc2822(s).ok())
        .map(|t| t.timestamp_millis())
}
