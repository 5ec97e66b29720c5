//! Artifact publishing
//!
//! One upload attempt per artifact. Failures are logged and reported as an
//! empty [`PublishResult`], never returned.

use crate::store::ObjectStore;
use pagetrack_core::PublishResult;
use std::path::Path;
use tracing::{info, warn};

/// Content type for an artifact, derived from its file name
pub fn content_type_for(name: &str) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Upload `path` into `container_id` as `remote_name`
pub async fn publish_artifact(
    store: &dyn ObjectStore,
    path: Option<&Path>,
    remote_name: &str,
    container_id: &str,
) -> PublishResult {
    let Some(path) = path.filter(|p| p.exists()) else {
        warn!(
            "Upload skipped for {} to folder {}: local file not found",
            remote_name, container_id
        );
        return PublishResult::none();
    };

    let content_type = content_type_for(remote_name);
    info!("Uploading {} to folder {}", remote_name, container_id);

    match store.upload(path, remote_name, container_id, &content_type).await {
        Ok(object) => {
            info!("Uploaded {} (id {})", remote_name, object.id);
            match object.link {
                Some(link) => PublishResult::linked(object.id, link),
                None => {
                    warn!("Upload of {} returned no shareable link", remote_name);
                    PublishResult {
                        object_id: Some(object.id),
                        shareable_link: None,
                    }
                }
            }
        }
        Err(e) => {
            warn!(
                "Upload failed for {} to folder {}: {}",
                path.display(),
                container_id,
                e
            );
            PublishResult::none()
        }
    }
}
