//! Feed manifest decoding.

use serde::Deserialize;

use crate::errors::PipelineError;
use catalog_shared::FeedDescriptor;

#[derive(Deserialize)]
#[serde(untagged)]
enum Manifest {
    List(Vec<FeedDescriptor>),
    Wrapped { feeds: Vec<FeedDescriptor> },
}

/// Decode a manifest body.
///
/// The aggregator returns a bare JSON array of descriptors; an object with a
/// `feeds` array is accepted as well.
pub fn parse_manifest(body: &[u8]) -> Result<Vec<FeedDescriptor>, PipelineError> {
    match serde_json::from_slice::<Manifest>(body) {
        Ok(Manifest::List(feeds)) | Ok(Manifest::Wrapped { feeds }) => Ok(feeds),
        Err(e) => Err(PipelineError::manifest(format!(
            "Failed to decode feed manifest: {}",
            e
        ))),
    }
}
