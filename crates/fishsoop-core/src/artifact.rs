// crates/fishsoop-core/src/artifact.rs

use fishsoop_bucket::ObjectLocation;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Plot,
    CsvExtract,
}

/// A derived file stored in the artifact bucket and referred to by its bare name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportArtifact {
    pub kind: ArtifactKind,
    pub name: String,
    pub location: ObjectLocation,
}

/// Artifacts live at `{serial}/{name}`, the serial being the second `_` token of the name.
pub fn artifact_location(bucket: &str, name: &str) -> Option<ObjectLocation> {
    let folder = name.split('_').nth(1).filter(|token| !token.is_empty())?;
    Some(ObjectLocation::new(bucket, format!("{folder}/{name}")))
}

pub fn content_type_for(name: &str) -> &'static str {
    let extension = name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("csv") => "text/csv",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("json") => "application/json",
        Some("html") => "text/html; charset=utf-8",
        _ => "application/octet-stream",
    }
}
