use crate::error::{ErrorKind, Result};
use crate::viewer::{Locale, Viewer};
use crate::{Stage, from_storage, latin};
use exn::{OptionExt, ResultExt};
use time::OffsetDateTime;
use tracing::instrument;
use tribe_catalog::NewLevel;
use tribe_catalog::error::ErrorKind as CatalogErrorKind;
use tribe_ident::error::ErrorKind as IdentErrorKind;
use tribe_ident::{Assigned, LevelId, assign, normalize, primary_identity};
use tribe_storage::UploadMeta;

/// A level as submitted by a client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadRequest {
    pub name: String,
    pub style: u8,
    pub environment: u8,
    /// Comma-separated tag names, e.g. `"Tradicional, Puzles"`.
    pub tags: String,
    /// Transport-encoded level file.
    pub payload: String,
    pub description: Option<String>,
}

impl Stage {
    /// Publish a level and return its identity.
    ///
    /// Nothing is sent to storage until the payload has been decoded and
    /// size-checked and an identity has been found for it. The catalog row
    /// is written last, so a storage failure leaves no metadata behind.
    #[instrument(skip_all, fields(user_id = viewer.user_id))]
    pub async fn upload(&self, viewer: &Viewer, request: &UploadRequest) -> Result<LevelId> {
        self.count_request();
        let name = request.name.trim();
        if name.is_empty() {
            exn::bail!(ErrorKind::InvalidField { field: "name", reason: "must not be empty" });
        }
        let user = self
            .repo
            .get_user(viewer.user_id)
            .await
            .or_raise(|| ErrorKind::Catalog)?
            .ok_or_raise(|| ErrorKind::UserNotFound(viewer.user_id))?;
        // Checked again when the row is inserted; this only saves a storage
        // round trip for authors already at their limit.
        let upload_limit = viewer.role.upload_limit(&self.limits);
        if let Some(limit) = upload_limit
            && user.uploads >= limit
        {
            exn::bail!(ErrorKind::UploadLimit(limit));
        }
        let tags = self.tags.parse(&request.tags)?;

        let payload = request.payload.trim_end();
        let canonical = match normalize(payload, self.limits.max_payload_bytes) {
            Ok(canonical) => canonical,
            Err(e) => {
                let kind = match &*e {
                    IdentErrorKind::PayloadTooLarge { size, limit } => {
                        ErrorKind::PayloadTooLarge { size: *size, limit: *limit }
                    },
                    _ => ErrorKind::MalformedPayload,
                };
                return Err(e).or_raise(|| kind);
            },
        };

        // Identical uploads share a primary identity, so holding its lock
        // until the row is inserted serialises them.
        let primary = primary_identity(&canonical).or_raise(|| ErrorKind::MalformedPayload)?;
        let _guard = self.locks.acquire(&primary).await;
        let Assigned { id, algorithm } = match assign(&canonical, &self.repo).await {
            Ok(assigned) => assigned,
            Err(e) => {
                let kind = match &*e {
                    IdentErrorKind::Duplicate(id) => {
                        tracing::info!(%id, "Duplicate upload");
                        ErrorKind::Duplicate(id.clone())
                    },
                    _ => ErrorKind::Catalog,
                };
                return Err(e).or_raise(|| kind);
            },
        };

        let meta = UploadMeta {
            name: name.to_string(),
            author: user.username.clone(),
            tags: tags.iter().map(|code| self.tags.name(code, Locale::Es).unwrap_or(code).to_string()).collect(),
        };
        if let Err(e) = self.backend.upload(&id, payload, &meta).await {
            tracing::warn!(%id, backend = self.backend.name(), error = %*e, "Storage upload failed");
            return from_storage(Err(e));
        }

        let level = NewLevel {
            id: id.clone(),
            fingerprint: canonical.fingerprint(),
            name: name.to_string(),
            style: request.style,
            environment: request.environment,
            tags,
            created_at: OffsetDateTime::now_utc(),
            author_id: user.id,
            non_latin: latin::is_non_latin(name),
            testing_client: viewer.testing_client,
            description: request.description.as_deref().map(str::trim).filter(|d| !d.is_empty()).map(str::to_string),
            upload_limit,
        };
        match self.repo.insert_level(&level).await {
            Ok(_) => {},
            Err(e) if matches!(&*e, CatalogErrorKind::Duplicate(_)) => {
                tracing::info!(%id, "Duplicate upload");
                return Err(e).or_raise(|| ErrorKind::Duplicate(id));
            },
            Err(e) => {
                tracing::warn!(%id, backend = self.backend.name(), error = %*e, "Orphaned level content");
                let kind = match &*e {
                    CatalogErrorKind::UploadLimit(limit) => ErrorKind::UploadLimit(*limit),
                    _ => ErrorKind::Catalog,
                };
                return Err(e).or_raise(|| kind);
            },
        }
        tracing::info!(%id, %algorithm, author = %user.username, "Level uploaded");
        Ok(id)
    }
}
