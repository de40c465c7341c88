use crate::error::{ErrorKind, Result};
use crate::{Stage, from_storage};
use exn::{OptionExt, ResultExt};
use tracing::instrument;
use tribe_ident::LevelId;

/// How to hand a level file to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileResponse {
    /// Send the client to the backend's download URL.
    Redirect(String),
    /// Serve the payload directly as an attachment named `filename`.
    Content { filename: String, body: String },
}

/// `{name}.swe`, with characters that would break a path or a
/// `Content-Disposition` header replaced.
fn attachment_name(name: &str) -> String {
    let safe: String = name.chars().map(|c| if matches!(c, '/' | '\\' | '"') { '_' } else { c }).collect();
    format!("{safe}.swe")
}

impl Stage {
    #[instrument(skip(self))]
    pub async fn file(&self, id: &LevelId) -> Result<FileResponse> {
        self.count_request();
        let level = self
            .repo
            .get_level(id)
            .await
            .or_raise(|| ErrorKind::Catalog)?
            .ok_or_raise(|| ErrorKind::LevelNotFound(id.clone()))?;
        if !self.backend.serves_in_place() {
            let url = from_storage(self.backend.generate_download_url(id).await)?;
            return Ok(FileResponse::Redirect(url));
        }
        let body = from_storage(self.backend.dump(id).await)?;
        Ok(FileResponse::Content { filename: attachment_name(&level.name), body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{Harness, harness};
    use crate::upload::UploadRequest;
    use crate::upload::tests::{encode, request};
    use crate::viewer::Viewer;
    use rstest::rstest;

    #[rstest]
    #[case("Castle", "Castle.swe")]
    #[case("a/b\\c", "a_b_c.swe")]
    #[case(r#"The "Best""#, "The _Best_.swe")]
    fn test_attachment_name(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(attachment_name(name), expected);
    }

    #[tokio::test]
    async fn test_serves_in_place() {
        let Harness { stage, author, .. } = harness().await;
        let upload = UploadRequest { name: "Bowser/Castle".into(), ..request("{}") };
        let id = stage.upload(&Viewer::new(author.id), &upload).await.unwrap();
        let response = stage.file(&id).await.unwrap();
        assert_eq!(response, FileResponse::Content { filename: "Bowser_Castle.swe".into(), body: encode("{}") });
    }

    #[tokio::test]
    async fn test_unknown_level() {
        let Harness { stage, .. } = harness().await;
        let id = LevelId::from_hex("ABCD000000000000").unwrap();
        let err = stage.file(&id).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::LevelNotFound(_)));
    }
}
