pub mod bucket;
pub mod object;
pub mod root;

pub use bucket::*;
pub use object::*;
pub use root::*;

use crate::{
    acl::AccessControlList,
    error::{Error, Result},
    evaluator::{Decision, Justification},
    grantee::CanonicalUser,
    permission::Permission,
    s3::headers::{acl_from_headers, HeaderAcl},
    server::AppState,
};
use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use std::collections::HashMap;
use tracing::debug;

pub(crate) fn is_acl_request(params: &HashMap<String, String>) -> bool {
    params.contains_key("acl")
}

/// The caller as established by the signature layer; `None` is anonymous.
pub(crate) async fn requester(state: &AppState, headers: &HeaderMap) -> Result<Option<CanonicalUser>> {
    let id = match headers.get(state.config.acl.requester_header.as_str()) {
        Some(value) => value
            .to_str()
            .map_err(|_| Error::InvalidArgument("requester id is not valid ASCII".to_string()))?
            .trim(),
        None => return Ok(None),
    };

    match state.directory.user(id).await {
        Some(user) => Ok(Some(user)),
        None => Ok(Some(CanonicalUser::new(id, "")?)),
    }
}

pub(crate) async fn authorize(
    state: &AppState,
    requester: Option<&CanonicalUser>,
    acl: &AccessControlList,
    permission: Permission,
) -> Result<Justification> {
    use crate::resolver::IdentityResolver;

    let memberships = state.directory.group_memberships_of(requester).await?;
    match state.evaluator.evaluate(requester, &memberships, acl, permission) {
        Decision::Allow(justification) => Ok(justification),
        Decision::Deny => Err(Error::AccessDenied),
    }
}

/// Build the ACL a request asks for, from its XML body, `x-amz-acl`, or
/// `x-amz-grant-*` headers. Without any of those the owner-only default is
/// used when `allow_default` is set.
pub(crate) async fn requested_acl(
    state: &AppState,
    owner: &CanonicalUser,
    bucket_owner: Option<&CanonicalUser>,
    headers: &HeaderMap,
    body: &Bytes,
    allow_default: bool,
) -> Result<AccessControlList> {
    let from_headers = acl_from_headers(headers)?;
    let has_body = !body.iter().all(u8::is_ascii_whitespace);

    let acl = match (from_headers, has_body) {
        (Some(_), true) => {
            return Err(Error::InvalidArgument(
                "ACL headers and an ACL body cannot be combined".to_string(),
            ))
        }
        (Some(HeaderAcl::Canned(canned)), false) => {
            debug!("Applying canned ACL {}", canned);
            canned.to_acl(owner, bucket_owner)
        }
        (Some(HeaderAcl::Grants(grants)), false) => {
            let acl = AccessControlList::new(owner.clone());
            grants
                .into_iter()
                .fold(acl, |acl, grant| acl.with_grant(grant))
        }
        (None, true) => state.codec.decode(body)?,
        (None, false) if allow_default => AccessControlList::new(owner.clone()),
        (None, false) => {
            return Err(Error::MalformedAclXml(
                "request carries no ACL".to_string(),
            ))
        }
    };

    let acl = acl.resolve(state.directory.as_ref()).await?;
    acl.ensure_grant_limit(state.config.acl.max_grants)?;
    Ok(acl)
}

pub(crate) fn acl_response(state: &AppState, acl: &AccessControlList) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/xml")],
        state.codec.encode(acl),
    )
        .into_response()
}
