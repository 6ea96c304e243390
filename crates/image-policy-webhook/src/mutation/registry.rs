//! Container image registry rewriting.
//!
//! Image references are not parsed according to the OCI reference grammar.
//! The first path segment is considered to be a registry host when it
//! contains a `.`, which means `org/image` and `registry.io/image` can only
//! be told apart by that character. Deployed policies rely on this exact
//! behaviour.

/// Returns true if the image starts with the given registry followed by a
/// `/`, so that `docker.io/library` does not match `docker.io/library-2/...`.
pub fn contains_registry(image: &str, registry: &str) -> bool {
    image
        .strip_prefix(registry)
        .is_some_and(|rest| rest.starts_with('/'))
}

pub fn contains_any_registry<'a, I>(image: &str, registries: I) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    registries
        .into_iter()
        .any(|registry| contains_registry(image, registry))
}

/// Point the image to the given registry.
///
/// Assumes the image has the `a.b[:port]/c/d:e` format: when the first
/// segment looks like a registry host it is replaced, otherwise the registry
/// is prepended.
pub fn replace_registry(image: &str, registry: &str) -> String {
    let mut segments: Vec<&str> = image.split('/').collect();

    if segments.len() > 1 && segments[0].contains('.') {
        segments[0] = registry;
    } else {
        segments.insert(0, registry);
    }

    segments.join("/")
}

/// Compute the rewritten image, or `None` when the image already points to
/// the target registry or to one of the ignored ones.
pub fn rewrite_image(image: &str, registry: &str, ignored_registries: &[String]) -> Option<String> {
    let already_handled = contains_any_registry(
        image,
        ignored_registries
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(registry)),
    );

    if already_handled {
        None
    } else {
        Some(replace_registry(image, registry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::tag_with_dots("a.b:c", "x.y", "x.y/a.b:c")]
    #[case::registry_with_port("x.y:80/a.b:c", "x.y", "x.y/a.b:c")]
    #[case::target_with_port("x.y/a/b:c", "x.y:80", "x.y:80/a/b:c")]
    #[case::dotted_image_name("a.b/c.d:e", "x.y", "x.y/c.d:e")]
    #[case::registry_and_path("a.b/c/d:e", "x.y", "x.y/c/d:e")]
    #[case::organization_only("c/d:e", "a.b", "a.b/c/d:e")]
    #[case::organization_without_tag("c/d", "a.b", "a.b/c/d")]
    #[case::other_registry_with_port("c.d:80/e/f:g", "a.b", "a.b/e/f:g")]
    #[case::other_registry_with_named_port("c.d:e/f:g", "a.b", "a.b/f:g")]
    #[case::real_registry(
        "dev-registry.metis.zoo/traefik:v1.7",
        "dev-registry.metis.test.sqooba.io",
        "dev-registry.metis.test.sqooba.io/traefik:v1.7"
    )]
    #[case::single_segment("elastic:7.4.2", "x.y.z", "x.y.z/elastic:7.4.2")]
    #[case::digest(
        "sqooba/sqooba-website:32cbc804-dirty@sha256:a4a729d8691ed70eb56cf03053333cf42e8a6c33f6ee67ea862da4459d7f70fd",
        "docker.sqooba.io",
        "docker.sqooba.io/sqooba/sqooba-website:32cbc804-dirty@sha256:a4a729d8691ed70eb56cf03053333cf42e8a6c33f6ee67ea862da4459d7f70fd"
    )]
    #[case::registry_with_path(
        "docker.sqooba.io/local-repo/xyz/image:snapshot",
        "docker.sqooba.io/public-docker-virtual",
        "docker.sqooba.io/public-docker-virtual/local-repo/xyz/image:snapshot"
    )]
    #[case::external_registry(
        "quay.io/argoproj/argocd:v2.0.1",
        "docker.sqooba.io/public-docker-virtual",
        "docker.sqooba.io/public-docker-virtual/argoproj/argocd:v2.0.1"
    )]
    #[case::external_short_image(
        "victoriametrics/victoria-metrics:v1.40.0",
        "docker.sqooba.io/public-docker-virtual",
        "docker.sqooba.io/public-docker-virtual/victoriametrics/victoria-metrics:v1.40.0"
    )]
    fn rewrite(#[case] image: &str, #[case] registry: &str, #[case] expected: &str) {
        assert_eq!(
            rewrite_image(image, registry, &[]),
            Some(expected.to_owned())
        );
    }

    #[rstest]
    #[case::same_registry("a.b/c/d:e", "a.b", &[])]
    #[case::ignored_registry(
        "docker.sqooba.io/local-repo/xyz/image:snapshot",
        "docker.sqooba.io/public-docker-virtual",
        &["docker.sqooba.io/local-repo", "ignoreme.io/local"]
    )]
    #[case::second_ignored_registry(
        "ignoreme.io/local/image:1.0",
        "docker.sqooba.io/public-docker-virtual",
        &["docker.sqooba.io/local-repo", "ignoreme.io/local"]
    )]
    fn no_rewrite(#[case] image: &str, #[case] registry: &str, #[case] ignored: &[&str]) {
        let ignored: Vec<String> = ignored.iter().map(|s| s.to_string()).collect();

        assert_eq!(rewrite_image(image, registry, &ignored), None);
    }

    #[rstest]
    #[case::partial_segment(
        "docker.sqooba.io/local-repo-2/xyz/image:snapshot",
        "docker.sqooba.io/public-docker-virtual/local-repo-2/xyz/image:snapshot"
    )]
    #[case::unrelated_registry(
        "any.registry.io/whatever/xyz/image:snapshot",
        "docker.sqooba.io/public-docker-virtual/whatever/xyz/image:snapshot"
    )]
    fn ignored_registries_match_whole_segments(#[case] image: &str, #[case] expected: &str) {
        let ignored = vec![
            "docker.sqooba.io/local-repo".to_owned(),
            "ignoreme.io/local".to_owned(),
        ];

        assert_eq!(
            rewrite_image(image, "docker.sqooba.io/public-docker-virtual", &ignored),
            Some(expected.to_owned())
        );
    }

    #[test]
    fn contains_registry_requires_separator() {
        assert!(contains_registry("a.b/c", "a.b"));
        assert!(!contains_registry("a.bc/d", "a.b"));
        assert!(!contains_registry("a.b", "a.b"));
        assert!(!contains_registry("x.y/a.b/c", "a.b"));
    }

    #[test]
    fn contains_any_registry_with_no_registries() {
        assert!(!contains_any_registry("a.b/c", std::iter::empty()));
    }
}
