//! R2 Client implementation using AWS S3 SDK

use crate::config::Config;
use crate::error::{Error, Result};
use crate::store::{ObjectStore, ProgressFn, UploadProgress};
use async_trait::async_trait;
use aws_sdk_s3::{
    config::{BehaviorVersion, Credentials, Region, RequestChecksumCalculation},
    primitives::ByteStream,
    types::{CompletedMultipartUpload, CompletedPart},
    Client,
};
use aws_smithy_types::body::SdkBody;
use bytes::Bytes;
use http_body::{Body, Frame, SizeHint};
use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// Bytes handed to the transport per body frame
const FRAME_SIZE: usize = 64 * 1024;

/// Multipart upload configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultipartUploadConfig {
    /// Size of every part but the last, in bytes
    pub part_size: usize,
}

impl MultipartUploadConfig {
    pub fn new(part_size: usize) -> Self {
        Self { part_size }
    }
}

impl Default for MultipartUploadConfig {
    fn default() -> Self {
        Self::new(100 * 1024 * 1024)
    }
}

/// Whether a body of `size` bytes goes out as a multipart upload
pub fn requires_multipart_upload(size: usize, config: &MultipartUploadConfig) -> bool {
    size > config.part_size
}

/// R2 client for uploading to Cloudflare R2 storage
pub struct R2Client {
    client: Client,
    bucket: String,
    multipart: MultipartUploadConfig,
}

impl R2Client {
    /// Create a new R2 client
    pub fn new(
        endpoint: String,
        access_key_id: String,
        secret_access_key: String,
        bucket: String,
    ) -> Self {
        // Create credentials
        let credentials =
            Credentials::new(&access_key_id, &secret_access_key, None, None, "cfdrive");

        // Build S3 config for R2 (SigV4 is the SDK default)
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(endpoint)
            .region(Region::new("auto"))
            .credentials_provider(credentials)
            .force_path_style(true)
            // Plain Content-Length bodies, no aws-chunked checksum trailer
            .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
            .build();

        Self {
            client: Client::from_conf(config),
            bucket,
            multipart: MultipartUploadConfig::default(),
        }
    }

    /// Create a client from resolved configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.endpoint.clone(),
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            config.bucket.clone(),
        )
        .with_multipart(MultipartUploadConfig::new(config.part_size_bytes()))
    }

    /// Override the multipart settings
    pub fn with_multipart(mut self, multipart: MultipartUploadConfig) -> Self {
        self.multipart = multipart;
        self
    }

    /// Upload bytes to R2 in a single request, reporting as frames are sent
    async fn upload_single(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
        progress: ProgressFn<'_>,
    ) -> Result<()> {
        let total = body.len() as u64;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let data = Bytes::from(body);
        // Rebuilt on retry, so offsets may start over; only forward growth.
        let stream = ByteStream::new(SdkBody::retryable(move || {
            SdkBody::from_body_1_x(CountingBody::new(data.clone(), tx.clone()))
        }));

        let send = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(stream)
            .content_type(content_type)
            .send();
        tokio::pin!(send);

        let mut reported = 0u64;
        let mut report = |sent: u64| {
            if sent > reported {
                reported = sent;
                progress(UploadProgress::new(sent, total));
            }
        };

        let outcome = loop {
            tokio::select! {
                outcome = &mut send => break outcome,
                Some(sent) = rx.recv() => report(sent),
            }
        };
        while let Ok(sent) = rx.try_recv() {
            report(sent);
        }
        outcome?;

        report(total);
        Ok(())
    }

    /// Upload bytes to R2 part by part, reporting after every part
    async fn upload_multipart(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
        progress: ProgressFn<'_>,
    ) -> Result<()> {
        let total = body.len() as u64;

        let created = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await?;
        let upload_id = created
            .upload_id()
            .ok_or_else(|| Error::Transfer("missing upload id".to_string()))?
            .to_string();

        tracing::debug!(key, upload_id = %upload_id, "multipart upload started");

        let mut parts = Vec::new();
        let mut transferred = 0u64;

        for (index, chunk) in body.chunks(self.multipart.part_size.max(1)).enumerate() {
            let part_number = (index + 1) as i32;

            let response = self
                .client
                .upload_part()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(&upload_id)
                .part_number(part_number)
                .body(ByteStream::from(chunk.to_vec()))
                .send()
                .await?;

            parts.push(
                CompletedPart::builder()
                    .set_e_tag(response.e_tag().map(str::to_string))
                    .part_number(part_number)
                    .build(),
            );

            transferred += chunk.len() as u64;
            progress(UploadProgress::new(transferred, total));
        }

        let completed = CompletedMultipartUpload::builder()
            .set_parts(Some(parts))
            .build();

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(&upload_id)
            .multipart_upload(completed)
            .send()
            .await?;

        Ok(())
    }
}

#[async_trait]
impl ObjectStore for R2Client {
    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
        progress: ProgressFn<'_>,
    ) -> Result<()> {
        let total = body.len() as u64;
        progress(UploadProgress::new(0, total));

        if requires_multipart_upload(body.len(), &self.multipart) {
            self.upload_multipart(key, body, content_type, progress).await
        } else {
            self.upload_single(key, body, content_type, progress).await
        }
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }
}

/// In-memory request body that reports the offset of every frame it yields
struct CountingBody {
    data: Bytes,
    offset: usize,
    sent: mpsc::UnboundedSender<u64>,
}

impl CountingBody {
    fn new(data: Bytes, sent: mpsc::UnboundedSender<u64>) -> Self {
        Self {
            data,
            offset: 0,
            sent,
        }
    }
}

impl Body for CountingBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<std::result::Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        if this.offset >= this.data.len() {
            return Poll::Ready(None);
        }

        let end = (this.offset + FRAME_SIZE).min(this.data.len());
        let frame = this.data.slice(this.offset..end);
        this.offset = end;
        // The receiver is gone once the request has finished.
        let _ = this.sent.send(end as u64);

        Poll::Ready(Some(Ok(Frame::data(frame))))
    }

    fn is_end_stream(&self) -> bool {
        self.offset >= self.data.len()
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact((self.data.len() - self.offset) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
    use tokio::net::{TcpListener, TcpStream};

    /// Request as seen by the local S3 endpoint
    #[derive(Debug, Clone)]
    struct Recorded {
        method: String,
        target: String,
        body: Vec<u8>,
    }

    type Requests = Arc<Mutex<Vec<Recorded>>>;

    /// Local endpoint answering just enough S3 over HTTP/1.1 for one client.
    /// Any `status` other than 200 answers every request with AccessDenied.
    async fn serve_s3(status: u16) -> (String, Requests) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        let requests = Requests::default();

        let recorded = requests.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve_connection(stream, status, recorded.clone()));
            }
        });

        (endpoint, requests)
    }

    async fn serve_connection(stream: TcpStream, status: u16, requests: Requests) {
        let mut reader = BufReader::new(stream);
        loop {
            let mut request_line = String::new();
            if reader.read_line(&mut request_line).await.unwrap_or(0) == 0 {
                return;
            }
            let mut words = request_line.split_whitespace();
            let method = words.next().unwrap_or_default().to_string();
            let target = words.next().unwrap_or_default().to_string();

            let mut content_length = 0;
            let mut chunked = false;
            let mut expect_continue = false;
            loop {
                let mut header = String::new();
                reader.read_line(&mut header).await.unwrap();
                let Some((name, value)) = header.trim_end().split_once(':') else {
                    break;
                };
                let value = value.trim();
                match name.to_ascii_lowercase().as_str() {
                    "content-length" => content_length = value.parse().unwrap(),
                    "transfer-encoding" => chunked = value.eq_ignore_ascii_case("chunked"),
                    "expect" => expect_continue = value.eq_ignore_ascii_case("100-continue"),
                    _ => {}
                }
            }

            if expect_continue {
                reader
                    .get_mut()
                    .write_all(b"HTTP/1.1 100 Continue\r\n\r\n")
                    .await
                    .unwrap();
            }

            let body = if chunked {
                read_chunked(&mut reader).await
            } else {
                let mut body = vec![0; content_length];
                reader.read_exact(&mut body).await.unwrap();
                body
            };

            let (headers, payload) = s3_response(status, &method, &target);
            requests.lock().unwrap().push(Recorded {
                method,
                target,
                body,
            });

            let reason = if status == 200 { "OK" } else { "Forbidden" };
            let response = format!(
                "HTTP/1.1 {status} {reason}\r\nContent-Length: {}\r\n{headers}\r\n{payload}",
                payload.len()
            );
            reader.get_mut().write_all(response.as_bytes()).await.unwrap();
        }
    }

    async fn read_chunked(reader: &mut BufReader<TcpStream>) -> Vec<u8> {
        let mut body = Vec::new();
        loop {
            let mut size_line = String::new();
            reader.read_line(&mut size_line).await.unwrap();
            let size_hex = size_line.trim().split(';').next().unwrap_or_default();
            let size = usize::from_str_radix(size_hex, 16).unwrap();

            if size == 0 {
                loop {
                    let mut trailer = String::new();
                    reader.read_line(&mut trailer).await.unwrap();
                    if trailer.trim().is_empty() {
                        return body;
                    }
                }
            }

            let start = body.len();
            body.resize(start + size, 0);
            reader.read_exact(&mut body[start..]).await.unwrap();
            let mut crlf = [0; 2];
            reader.read_exact(&mut crlf).await.unwrap();
        }
    }

    fn s3_response(status: u16, method: &str, target: &str) -> (String, String) {
        const XML: &str = "Content-Type: application/xml\r\n";

        if status != 200 {
            return (
                XML.to_string(),
                "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
                 <Error><Code>AccessDenied</Code><Message>Access Denied</Message></Error>"
                    .to_string(),
            );
        }

        match method {
            "POST" if target.contains("uploadId=") => (
                XML.to_string(),
                "<CompleteMultipartUploadResult><Bucket>files</Bucket>\
                 <ETag>\"final\"</ETag></CompleteMultipartUploadResult>"
                    .to_string(),
            ),
            "POST" => (
                XML.to_string(),
                "<InitiateMultipartUploadResult><Bucket>files</Bucket>\
                 <UploadId>upload-1</UploadId></InitiateMultipartUploadResult>"
                    .to_string(),
            ),
            _ => {
                let etag = match part_number(target) {
                    Some(n) => format!("etag-{n}"),
                    None => "single".to_string(),
                };
                (format!("ETag: \"{etag}\"\r\n"), String::new())
            }
        }
    }

    fn part_number(target: &str) -> Option<u32> {
        let (_, rest) = target.split_once("partNumber=")?;
        rest.split('&').next()?.parse().ok()
    }

    fn local_client(endpoint: String) -> R2Client {
        R2Client::new(
            endpoint,
            "key".to_string(),
            "secret".to_string(),
            "files".to_string(),
        )
    }

    #[test]
    fn test_requires_multipart_upload() {
        let config = MultipartUploadConfig::new(5 * 1024 * 1024);
        assert!(!requires_multipart_upload(10, &config));
        assert!(!requires_multipart_upload(5 * 1024 * 1024, &config));
        assert!(requires_multipart_upload(5 * 1024 * 1024 + 1, &config));
    }

    #[test]
    fn test_default_part_size() {
        assert_eq!(MultipartUploadConfig::default().part_size, 100 * 1024 * 1024);
    }

    #[test]
    fn test_client_creation() {
        let client = R2Client::new(
            "https://account.r2.cloudflarestorage.com".to_string(),
            "key".to_string(),
            "secret".to_string(),
            "files".to_string(),
        )
        .with_multipart(MultipartUploadConfig::new(8 * 1024 * 1024));

        assert_eq!(client.bucket(), "files");
        assert_eq!(client.multipart.part_size, 8 * 1024 * 1024);
    }

    #[tokio::test]
    async fn test_single_upload_reports_incremental_progress() {
        let (endpoint, requests) = serve_s3(200).await;
        let client = local_client(endpoint);
        let size = 8 * 1024 * 1024;
        let events = Mutex::new(Vec::new());
        let record = |p: UploadProgress| events.lock().unwrap().push(p);

        client
            .put_object("docs/big.bin", vec![7; size], "application/octet-stream", &record)
            .await
            .unwrap();

        let events = events.into_inner().unwrap();
        assert!(events.len() > 2, "only {} progress events", events.len());
        assert_eq!(events[0], UploadProgress::new(0, size as u64));
        assert_eq!(
            events.last(),
            Some(&UploadProgress::new(size as u64, size as u64))
        );
        assert!(events.windows(2).all(|w| w[0].transferred < w[1].transferred));
        assert!(events.iter().all(|p| p.total == size as u64));

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "PUT");
        assert!(requests[0].target.starts_with("/files/docs/big.bin"));
        assert_eq!(requests[0].body.len(), size);
    }

    #[tokio::test]
    async fn test_multipart_upload_numbers_parts() {
        let (endpoint, requests) = serve_s3(200).await;
        let client = local_client(endpoint).with_multipart(MultipartUploadConfig::new(1024));
        let events = Mutex::new(Vec::new());
        let record = |p: UploadProgress| events.lock().unwrap().push(p.transferred);

        client
            .put_object("big.bin", vec![1; 2500], "application/octet-stream", &record)
            .await
            .unwrap();

        assert_eq!(events.into_inner().unwrap(), vec![0, 1024, 2048, 2500]);

        let requests = requests.lock().unwrap();
        let methods: Vec<_> = requests.iter().map(|r| r.method.as_str()).collect();
        assert_eq!(methods, ["POST", "PUT", "PUT", "PUT", "POST"]);

        let parts = &requests[1..4];
        let sizes: Vec<_> = parts.iter().map(|r| r.body.len()).collect();
        assert_eq!(sizes, [1024, 1024, 452]);
        for (index, part) in parts.iter().enumerate() {
            assert_eq!(part_number(&part.target), Some(index as u32 + 1));
            assert!(part.target.contains("uploadId=upload-1"));
        }

        let complete = String::from_utf8(requests[4].body.clone()).unwrap();
        assert!(requests[4].target.contains("uploadId=upload-1"));
        assert!(complete.contains("<PartNumber>3</PartNumber>"));
        assert!(complete.contains("etag-1"));
        assert!(complete.contains("etag-3"));
    }

    #[tokio::test]
    async fn test_access_denied_maps_to_transfer() {
        let (endpoint, requests) = serve_s3(403).await;
        let client = local_client(endpoint);

        let err = client
            .put_object("k.txt", b"x".to_vec(), "text/plain", &|_: UploadProgress| {})
            .await
            .unwrap_err();

        match err {
            Error::Transfer(message) => {
                assert_eq!(message, "AccessDenied: Access Denied");
                assert!(!message.contains("headers"));
            }
            other => panic!("expected transfer error, got {other:?}"),
        }
        assert_eq!(requests.lock().unwrap().len(), 1);
    }
}
