use crate::canned::CannedAcl;
use crate::error::{Error, Result};
use crate::grant::Grant;
use crate::grantee::{CanonicalUser, Grantee, Group};
use crate::permission::Permission;
use axum::http::HeaderMap;

pub const CANNED_ACL_HEADER: &str = "x-amz-acl";

const GRANT_HEADERS: [(&str, Permission); 5] = [
    ("x-amz-grant-read", Permission::Read),
    ("x-amz-grant-write", Permission::Write),
    ("x-amz-grant-read-acp", Permission::ReadAcp),
    ("x-amz-grant-write-acp", Permission::WriteAcp),
    ("x-amz-grant-full-control", Permission::FullControl),
];

/// An ACL described by request headers instead of a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderAcl {
    Canned(CannedAcl),
    /// Grants from `x-amz-grant-*`, in header order. Email grantees are not
    /// resolved yet.
    Grants(Vec<Grant>),
}

fn has_grant_headers(headers: &HeaderMap) -> bool {
    GRANT_HEADERS
        .iter()
        .any(|(name, _)| headers.contains_key(*name))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>> {
    match headers.get(name) {
        Some(value) => value
            .to_str()
            .map(Some)
            .map_err(|_| Error::InvalidArgument(format!("{} is not valid ASCII", name))),
        None => Ok(None),
    }
}

/// Read `x-amz-acl` or the `x-amz-grant-*` family. Supplying both is an error.
pub fn acl_from_headers(headers: &HeaderMap) -> Result<Option<HeaderAcl>> {
    let canned = header_str(headers, CANNED_ACL_HEADER)?;

    if canned.is_some() && has_grant_headers(headers) {
        return Err(Error::InvalidArgument(
            "Specifying both x-amz-acl and x-amz-grant headers is not allowed".to_string(),
        ));
    }

    if let Some(canned) = canned {
        return Ok(Some(HeaderAcl::Canned(canned.trim().parse()?)));
    }

    if !has_grant_headers(headers) {
        return Ok(None);
    }

    let mut grants = Vec::new();
    for (name, permission) in GRANT_HEADERS {
        if let Some(value) = header_str(headers, name)? {
            for entry in value.split(',').map(str::trim).filter(|e| !e.is_empty()) {
                grants.push(Grant::new(parse_grantee(entry)?, permission));
            }
        }
    }

    Ok(Some(HeaderAcl::Grants(grants)))
}

/// Parse one `id="..."`, `uri="..."` or `emailAddress="..."` entry.
fn parse_grantee(entry: &str) -> Result<Grantee> {
    let (key, value) = entry
        .split_once('=')
        .ok_or_else(|| Error::InvalidArgument(format!("invalid grantee: {}", entry)))?;
    let value = value.trim().trim_matches('"').trim_matches('\'');

    match key.trim().to_ascii_lowercase().as_str() {
        "id" => Ok(Grantee::CanonicalUser(CanonicalUser::new(value, "")?)),
        "uri" => Ok(Grantee::Group(value.parse::<Group>()?)),
        "emailaddress" => Grantee::email(value),
        other => Err(Error::InvalidArgument(format!(
            "unsupported grantee type: {}",
            other
        ))),
    }
}
