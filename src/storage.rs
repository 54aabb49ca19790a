pub mod artifact_storage;
pub mod fs_artifact_storage;
#[cfg(test)]
pub mod transient_artifact_storage;
