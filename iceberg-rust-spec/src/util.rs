/*!
Small helpers shared across the spec types.
*/

/// Strip a scheme and bucket-style prefix (`s3://bucket/`, `file://`, ...)
/// from a fully qualified location, returning the path an [`object_store::ObjectStore`]
/// expects (relative to the store's own root).
pub fn strip_prefix(path: &str) -> String {
    match path.find("://") {
        Some(pos) => {
            let rest = &path[pos + 3..];
            match rest.find('/') {
                Some(slash) => rest[slash + 1..].to_owned(),
                None => String::new(),
            }
        }
        None => path.trim_start_matches('/').to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scheme_and_bucket() {
        assert_eq!(strip_prefix("s3://bucket/a/b.avro"), "a/b.avro");
        assert_eq!(strip_prefix("file:///a/b.avro"), "a/b.avro");
    }

    #[test]
    fn leaves_bare_paths_alone() {
        assert_eq!(strip_prefix("/a/b.avro"), "a/b.avro");
        assert_eq!(strip_prefix("a/b.avro"), "a/b.avro");
    }
}
