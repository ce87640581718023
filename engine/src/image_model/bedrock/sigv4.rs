//! AWS Signature Version 4 for the Bedrock runtime.
//!
//! Only what a single JSON POST needs: canonical request, string to sign,
//! derived signing key and the resulting headers.

use std::collections::BTreeMap;

use color_eyre::{
    Result,
    eyre::{WrapErr as _, ensure, eyre},
};
use hmac::{Hmac, Mac};
use reqwest::Url;
use sha2::{Digest, Sha256};
use time::{OffsetDateTime, format_description::FormatItem, macros::format_description};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";

#[derive(Debug, Clone)]
pub struct Timestamp {
    /// `20150830T123600Z`
    pub amz_date: String,
    /// `20150830`
    pub date: String,
}

impl Timestamp {
    pub fn now() -> Result<Self> {
        Self::from_datetime(OffsetDateTime::now_utc())
    }

    pub fn from_datetime(datetime: OffsetDateTime) -> Result<Self> {
        const AMZ_FORMAT: &[FormatItem<'_>] =
            format_description!("[year][month][day]T[hour][minute][second]Z");
        const DATE_FORMAT: &[FormatItem<'_>] = format_description!("[year][month][day]");

        Ok(Self {
            amz_date: datetime.format(AMZ_FORMAT)?,
            date: datetime.format(DATE_FORMAT)?,
        })
    }

    pub fn from_amz_date(amz_date: &str) -> Result<Self> {
        let amz_date = amz_date.trim();
        ensure!(
            amz_date.len() == 16 && amz_date.is_char_boundary(8),
            "Invalid amz date: {amz_date}"
        );
        Ok(Self {
            amz_date: amz_date.to_string(),
            date: amz_date[..8].to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct Signer {
    access_key: String,
    secret_key: String,
    session_token: Option<String>,
    region: String,
    service: String,
}

impl Signer {
    pub fn new(
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        session_token: Option<String>,
        region: impl Into<String>,
        service: impl Into<String>,
    ) -> Result<Self> {
        let signer = Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            session_token: session_token.filter(|t| !t.trim().is_empty()),
            region: region.into(),
            service: service.into(),
        };
        for (label, value) in [
            ("access key", &signer.access_key),
            ("secret key", &signer.secret_key),
            ("region", &signer.region),
            ("service", &signer.service),
        ] {
            ensure!(!value.trim().is_empty(), "SigV4 {label} is empty");
        }
        Ok(signer)
    }

    pub fn sign(
        &self,
        method: &str,
        url: &str,
        headers: &BTreeMap<String, String>,
        payload: &[u8],
        timestamp: Timestamp,
    ) -> Result<Signature> {
        let url = Url::parse(url).wrap_err_with(|| format!("Invalid url {url}"))?;
        let host = url.host_str().ok_or(eyre!("Url without host: {url}"))?;
        let host = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        let payload_hash = sha256_hex(payload);
        let headers = self.headers_to_sign(headers, &host, &timestamp.amz_date, &payload_hash);
        let (canonical_headers, signed_headers) = canonical_headers(&headers);
        let canonical_request = format!(
            "{method}\n{}\n{}\n{canonical_headers}\n{signed_headers}\n{payload_hash}",
            canonical_uri(&url),
            canonical_query(&url),
        );

        let scope = format!(
            "{}/{}/{}/aws4_request",
            timestamp.date, self.region, self.service
        );
        let string_to_sign = format!(
            "{ALGORITHM}\n{}\n{scope}\n{}",
            timestamp.amz_date,
            sha256_hex(canonical_request.as_bytes())
        );
        let signature = hex_encode(&hmac_sha256(
            &self.signing_key(&timestamp.date)?,
            &string_to_sign,
        )?);
        let authorization = format!(
            "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
            self.access_key
        );

        Ok(Signature {
            headers: SignedHeaders {
                authorization,
                amz_date: timestamp.amz_date,
                content_sha256: payload_hash,
                host,
                security_token: self.session_token.clone(),
            },
            canonical_request,
            string_to_sign,
        })
    }

    fn signing_key(&self, date: &str) -> Result<Vec<u8>> {
        let k_date = hmac_sha256(format!("AWS4{}", self.secret_key).as_bytes(), date)?;
        let k_region = hmac_sha256(&k_date, &self.region)?;
        let k_service = hmac_sha256(&k_region, &self.service)?;
        hmac_sha256(&k_service, "aws4_request")
    }

    fn headers_to_sign(
        &self,
        headers: &BTreeMap<String, String>,
        host: &str,
        amz_date: &str,
        payload_hash: &str,
    ) -> BTreeMap<String, String> {
        let mut out = BTreeMap::<String, String>::new();
        for (name, value) in headers {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let value = normalize_header_value(value);
            out.entry(name.to_ascii_lowercase())
                .and_modify(|existing| {
                    existing.push(',');
                    existing.push_str(&value);
                })
                .or_insert_with(|| value.clone());
        }

        out.entry("host".into()).or_insert_with(|| host.to_string());
        out.insert("x-amz-date".into(), amz_date.to_string());
        out.entry("x-amz-content-sha256".into())
            .or_insert_with(|| payload_hash.to_string());
        if let Some(token) = &self.session_token {
            out.insert("x-amz-security-token".into(), normalize_header_value(token));
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct SignedHeaders {
    pub authorization: String,
    pub amz_date: String,
    pub content_sha256: String,
    pub host: String,
    pub security_token: Option<String>,
}

impl SignedHeaders {
    pub fn apply(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let req = req
            .header("authorization", &self.authorization)
            .header("x-amz-date", &self.amz_date)
            .header("x-amz-content-sha256", &self.content_sha256)
            .header("host", &self.host);
        match &self.security_token {
            Some(token) => req.header("x-amz-security-token", token),
            None => req,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Signature {
    pub headers: SignedHeaders,
    pub canonical_request: String,
    pub string_to_sign: String,
}

fn canonical_headers(headers: &BTreeMap<String, String>) -> (String, String) {
    let canonical = headers
        .iter()
        .map(|(name, value)| format!("{name}:{value}\n"))
        .collect::<String>();
    let signed = headers.keys().cloned().collect::<Vec<_>>().join(";");
    (canonical, signed)
}

fn canonical_uri(url: &Url) -> String {
    match url.path() {
        "" => "/".to_string(),
        // the already encoded path gets encoded a second time, as every service except S3 expects
        path => percent_encode(path, false),
    }
}

fn canonical_query(url: &Url) -> String {
    let mut pairs = url
        .query_pairs()
        .map(|(name, value)| (percent_encode(&name, true), percent_encode(&value, true)))
        .collect::<Vec<_>>();
    pairs.sort();
    pairs
        .into_iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// RFC 3986 encoding of everything but the unreserved characters.
pub fn percent_encode(value: &str, encode_slash: bool) -> String {
    let mut out = String::with_capacity(value.len());
    for &byte in value.as_bytes() {
        let unreserved =
            matches!(byte, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~');
        if unreserved || (!encode_slash && byte == b'/') {
            out.push(byte as char);
        } else {
            out.push('%');
            out.push(HEX_CHARS[(byte >> 4) as usize].to_ascii_uppercase() as char);
            out.push(HEX_CHARS[(byte & 0x0f) as usize].to_ascii_uppercase() as char);
        }
    }
    out
}

fn normalize_header_value(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn hmac_sha256(key: &[u8], data: &str) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| eyre!("Invalid hmac key: {e}"))?;
    mac.update(data.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex_encode(&Sha256::digest(bytes))
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for &byte in bytes {
        out.push(HEX_CHARS[(byte >> 4) as usize] as char);
        out.push(HEX_CHARS[(byte & 0x0f) as usize] as char);
    }
    out
}
