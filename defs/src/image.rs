use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

const MAX_NAME_LENGTH: usize = 255;

const DOMAIN_COMPONENT: &str = r"(?:[a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9])";
const PATH_COMPONENT: &str = r"[a-z0-9]+(?:(?:[._]|__|-+)[a-z0-9]+)*";
const TAG: &str = r"[\w][\w.-]{0,127}";
const DIGEST: &str = r"[A-Za-z][A-Za-z0-9]*(?:[-_+.][A-Za-z][A-Za-z0-9]*)*:[0-9a-fA-F]{32,}";

static REFERENCE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(
        r"^(?:(?P<domain>{d}(?:\.{d})*(?::[0-9]+)?)/)?(?P<path>{p}(?:/{p})*)(?::(?P<tag>{t}))?(?:@(?P<digest>{g}))?$",
        d = DOMAIN_COMPONENT,
        p = PATH_COMPONENT,
        t = TAG,
        g = DIGEST,
    );
    Regex::new(&pattern).unwrap()
});

static PATH_COMPONENT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("^{}$", PATH_COMPONENT)).unwrap());

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageReferenceError {
    #[error("image reference is empty")]
    Empty,

    #[error("image name is {0} characters long, the limit is 255")]
    TooLong(usize),

    #[error("'{0}' is not a valid container image reference")]
    Malformed(String),
}

/// A container image reference: `[registry/]repository[:tag][@digest]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    registry: Option<String>,
    repository: String,
    tag: Option<String>,
    digest: Option<String>,
}

impl ImageReference {
    pub fn parse(input: &str) -> Result<Self, ImageReferenceError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ImageReferenceError::Empty);
        }

        let captures = REFERENCE_REGEX
            .captures(input)
            .ok_or_else(|| ImageReferenceError::Malformed(input.to_string()))?;

        let mut registry = captures.name("domain").map(|m| m.as_str().to_string());
        let mut repository = captures["path"].to_string();

        // A leading component only names a registry when it looks like a host.
        if let Some(domain) = registry.take() {
            if is_registry_host(&domain) {
                registry = Some(domain);
            } else if PATH_COMPONENT_REGEX.is_match(&domain) {
                repository = format!("{}/{}", domain, repository);
            } else {
                return Err(ImageReferenceError::Malformed(input.to_string()));
            }
        }

        let name_length = registry.as_ref().map_or(0, |r| r.len() + 1) + repository.len();
        if name_length > MAX_NAME_LENGTH {
            return Err(ImageReferenceError::TooLong(name_length));
        }

        Ok(ImageReference {
            registry,
            repository,
            tag: captures.name("tag").map(|m| m.as_str().to_string()),
            digest: captures.name("digest").map(|m| m.as_str().to_string()),
        })
    }

    pub fn registry(&self) -> Option<&str> {
        self.registry.as_deref()
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }
}

fn is_registry_host(domain: &str) -> bool {
    domain.contains('.') || domain.contains(':') || domain == "localhost"
}

impl FromStr for ImageReference {
    type Err = ImageReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ImageReference::parse(s)
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(registry) = &self.registry {
            write!(f, "{}/", registry)?;
        }
        write!(f, "{}", self.repository)?;
        if let Some(tag) = &self.tag {
            write!(f, ":{}", tag)?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{}", digest)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_short_name_with_tag() {
        let image = ImageReference::parse("nginx:1.25").unwrap();
        assert_eq!(image.registry(), None);
        assert_eq!(image.repository(), "nginx");
        assert_eq!(image.tag(), Some("1.25"));
        assert_eq!(image.to_string(), "nginx:1.25");
    }

    #[test]
    fn test_parse_registry_with_port_and_nested_path() {
        let image = ImageReference::parse("localhost:5000/team/api-server:v2").unwrap();
        assert_eq!(image.registry(), Some("localhost:5000"));
        assert_eq!(image.repository(), "team/api-server");
        assert_eq!(image.tag(), Some("v2"));
    }

    #[test]
    fn test_leading_component_without_dot_is_part_of_repository() {
        let image = ImageReference::parse("library/nginx").unwrap();
        assert_eq!(image.registry(), None);
        assert_eq!(image.repository(), "library/nginx");
        assert_eq!(image.tag(), None);
    }

    #[test]
    fn test_parse_digest_reference() {
        let digest = "sha256:2c26b46b68ffc68ff99b453c1d30413413422d706483bfa0f98a5e886266e7ae";
        let input = format!("ghcr.io/acme/web@{}", digest);
        let image = ImageReference::parse(&input).unwrap();
        assert_eq!(image.registry(), Some("ghcr.io"));
        assert_eq!(image.digest(), Some(digest));
        assert_eq!(image.to_string(), input);
    }

    #[test]
    fn test_rejects_malformed_references() {
        for input in [
            "not a valid image",
            "Nginx:latest",
            "nginx:",
            "nginx::1",
            "https://registry.example.com/app",
            "registry.example.com/",
            "nginx@sha256:short",
        ] {
            assert!(
                matches!(
                    ImageReference::parse(input),
                    Err(ImageReferenceError::Malformed(_))
                ),
                "expected '{}' to be rejected",
                input
            );
        }
    }

    #[test]
    fn test_rejects_empty_and_overlong_names() {
        assert_eq!(ImageReference::parse("   "), Err(ImageReferenceError::Empty));

        let long_name = format!("registry.example.com/{}", "a".repeat(250));
        assert_eq!(
            ImageReference::parse(&long_name),
            Err(ImageReferenceError::TooLong(271))
        );
    }
}
