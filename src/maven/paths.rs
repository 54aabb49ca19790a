use anyhow::anyhow;
use crate::maven::coordinates::*;

/// relative path of an artifact's descriptor inside a maven repository, e.g.
///  "org/foo/bar/1.0/bar-1.0.pom"
pub fn pom_path(identifier: &ArtifactIdentifier) -> String {
    format!(
        "{}/{}/{}/{}",
        identifier.group_id.replace('.', "/"),
        identifier.artifact_id,
        identifier.version,
        pom_file_name(identifier),
    )
}

fn pom_file_name(identifier: &ArtifactIdentifier) -> String {
    format!("{}-{}.pom", identifier.artifact_id, identifier.version)
}

/// path is the relative path of a descriptor inside a maven repository, i.e. it starts with
///  something like "org/..." or "com/..." and ends with "<artifactId>-<version>.pom"
pub fn parse_maven_path(path: &str) -> anyhow::Result<ArtifactIdentifier> {
    let path = path.trim().trim_start_matches('/');

    if let Some(last_slash) = path.rfind('/') {
        let (without_filename, file_name) = path.split_at(last_slash);
        let file_name = &file_name[1..];

        if let Some(last_slash) = without_filename.rfind('/') {
            let (without_version, version) = without_filename.split_at(last_slash);
            let version = &version[1..];

            if let Some(last_slash) = without_version.rfind('/') {
                let (group_id, artifact_id) = without_version.split_at(last_slash);
                let artifact_id = &artifact_id[1..];

                if group_id.is_empty() || artifact_id.is_empty() || version.is_empty() {
                    return Err(anyhow!("not a valid Maven descriptor path: {:?}", path));
                }

                let identifier = ArtifactIdentifier::new(group_id.replace('/', "."), artifact_id, version);
                if file_name != pom_file_name(&identifier) {
                    return Err(anyhow!("{} is not a valid descriptor file name: expected {}", file_name, pom_file_name(&identifier)));
                }
                return Ok(identifier);
            }
        }
    }

    Err(anyhow!("not a valid Maven descriptor path: {:?}", path))
}
