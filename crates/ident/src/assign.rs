use crate::digest::DigestAlgorithm;
use crate::error::{ErrorKind, Result};
use crate::id::LevelId;
use crate::normalize::Canonical;
use async_trait::async_trait;

/// Answers "who holds this identity?" during assignment.
///
/// The catalog implements this against the levels table. Lookups are
/// expected to be cheap point queries.
#[async_trait]
pub trait IdentityIndex: Send + Sync {
    /// The [fingerprint](Canonical::fingerprint) of the content stored under
    /// `id`, or `None` if the identity is free.
    async fn fingerprint(&self, id: &LevelId) -> Result<Option<String>>;
}

/// An identity that was free at the time of probing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assigned {
    pub id: LevelId,
    pub algorithm: DigestAlgorithm,
}

/// The first identity [`assign`] will probe. Concurrent uploads of the same
/// content share this key, which makes it suitable for serialising them.
pub fn primary_identity(canonical: &Canonical) -> Result<LevelId> {
    DigestAlgorithm::CHAIN[0].identity(canonical)
}

/// Walk the digest chain and return the first identity absent from `index`.
///
/// An identity held by the same content is a duplicate and ends the walk.
/// One held by different content is a collision, and the next digest is
/// tried. At most [`DigestAlgorithm::CHAIN`]`.len()` lookups are made; when
/// every probe collides the content is reported as a duplicate of the first.
pub async fn assign(canonical: &Canonical, index: &dyn IdentityIndex) -> Result<Assigned> {
    let primary = primary_identity(canonical)?;
    let fingerprint = canonical.fingerprint();
    for algorithm in DigestAlgorithm::CHAIN {
        let id = if algorithm == DigestAlgorithm::CHAIN[0] { primary.clone() } else { algorithm.identity(canonical)? };
        match index.fingerprint(&id).await? {
            None => return Ok(Assigned { id, algorithm }),
            Some(existing) if existing == fingerprint => exn::bail!(ErrorKind::Duplicate(id)),
            Some(_) => tracing::debug!(%id, %algorithm, "Identity collision, trying next digest"),
        }
    }
    exn::bail!(ErrorKind::Duplicate(primary))
}
