use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, info};

use super::{acl_response, authorize, is_acl_request, requested_acl, requester};
use crate::{
    error::{Error, Result},
    permission::Permission,
    server::AppState,
    store::ResourceKey,
};

// GET /{bucket}: the ACL subresource, or a READ check standing in for listing
pub async fn handle_bucket_get(
    State(state): State<Arc<AppState>>,
    Path(bucket): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Response> {
    debug!("GET bucket: {} with params: {:?}", bucket, params);

    let resource = ResourceKey::bucket(bucket);
    let caller = requester(&state, &headers).await?;
    let acl = state.store.get(&resource).await?;

    if is_acl_request(&params) {
        authorize(&state, caller.as_ref(), &acl, Permission::ReadAcp).await?;
        return Ok(acl_response(&state, &acl));
    }

    authorize(&state, caller.as_ref(), &acl, Permission::Read).await?;
    Ok(StatusCode::OK.into_response())
}

// PUT /{bucket}: create the bucket, or replace its ACL with ?acl
pub async fn handle_bucket_put(
    State(state): State<Arc<AppState>>,
    Path(bucket): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    debug!("PUT bucket: {} with params: {:?}", bucket, params);

    let resource = ResourceKey::bucket(bucket);
    let caller = requester(&state, &headers).await?;

    if is_acl_request(&params) {
        let current = state.store.get(&resource).await?;
        authorize(&state, caller.as_ref(), &current, Permission::WriteAcp).await?;

        let acl = requested_acl(&state, current.owner(), None, &headers, &body, false).await?;
        if acl.owner() != current.owner() {
            return Err(Error::AccessDenied);
        }

        state.store.replace(&resource, acl).await?;
        info!("Replaced ACL for bucket {}", resource);
        return Ok(StatusCode::OK.into_response());
    }

    let owner = caller.ok_or(Error::AccessDenied)?;
    if state.store.exists(&resource).await {
        return Err(Error::BucketAlreadyExists);
    }

    let acl = requested_acl(&state, &owner, None, &headers, &Bytes::new(), true).await?;
    state.store.create(resource.clone(), acl).await?;
    info!("Created bucket {} owned by {}", resource, owner);

    Ok(StatusCode::OK.into_response())
}

// DELETE /{bucket}: only the owner may delete, which drops every ACL under it
pub async fn handle_bucket_delete(
    State(state): State<Arc<AppState>>,
    Path(bucket): Path<String>,
    headers: HeaderMap,
) -> Result<Response> {
    let resource = ResourceKey::bucket(bucket);
    let caller = requester(&state, &headers).await?;
    let acl = state.store.get(&resource).await?;

    if !acl.is_owner(caller.as_ref()) {
        return Err(Error::AccessDenied);
    }

    state.store.remove(&resource).await?;
    info!("Deleted bucket {}", resource);

    Ok(StatusCode::NO_CONTENT.into_response())
}
