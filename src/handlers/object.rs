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

// GET /{bucket}/{key}: the ACL subresource, or a READ check on the object
pub async fn handle_object_get(
    State(state): State<Arc<AppState>>,
    Path((bucket, key)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Response> {
    debug!("GET object: {}/{} with params: {:?}", bucket, key, params);

    let caller = requester(&state, &headers).await?;
    state.store.get(&ResourceKey::bucket(bucket.as_str())).await?;
    let acl = state.store.get(&ResourceKey::object(bucket, key)).await?;

    if is_acl_request(&params) {
        authorize(&state, caller.as_ref(), &acl, Permission::ReadAcp).await?;
        return Ok(acl_response(&state, &acl));
    }

    authorize(&state, caller.as_ref(), &acl, Permission::Read).await?;
    Ok(StatusCode::OK.into_response())
}

// PUT /{bucket}/{key}: create the object (WRITE on the bucket), or replace its
// ACL with ?acl (WRITE_ACP on the object)
pub async fn handle_object_put(
    State(state): State<Arc<AppState>>,
    Path((bucket, key)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    debug!("PUT object: {}/{} with params: {:?}", bucket, key, params);

    let caller = requester(&state, &headers).await?;
    let bucket_acl = state.store.get(&ResourceKey::bucket(bucket.as_str())).await?;
    let resource = ResourceKey::object(bucket, key);

    if is_acl_request(&params) {
        let current = state.store.get(&resource).await?;
        authorize(&state, caller.as_ref(), &current, Permission::WriteAcp).await?;

        let acl = requested_acl(
            &state,
            current.owner(),
            Some(bucket_acl.owner()),
            &headers,
            &body,
            false,
        )
        .await?;
        if acl.owner() != current.owner() {
            return Err(Error::AccessDenied);
        }

        state.store.replace(&resource, acl).await?;
        info!("Replaced ACL for object {}", resource);
        return Ok(StatusCode::OK.into_response());
    }

    authorize(&state, caller.as_ref(), &bucket_acl, Permission::Write).await?;

    // Anonymous writers have no account to own the object, so the bucket
    // owner takes it.
    let owner = caller.unwrap_or_else(|| bucket_acl.owner().clone());
    let acl = requested_acl(
        &state,
        &owner,
        Some(bucket_acl.owner()),
        &headers,
        &Bytes::new(),
        true,
    )
    .await?;
    state.store.create(resource.clone(), acl).await?;
    info!("Created object {} owned by {}", resource, owner);

    Ok(StatusCode::OK.into_response())
}
