use serde::{Deserialize, Serialize};

/// Link relation used for every member of a resource collection.
pub const REL_ITEM: &str = "item";

/// A hyperlink to a resource, relative to the collection that lists it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Identifier escaped as a single URL path segment.
    pub href: String,
    pub rel: String,
    /// Unescaped identifier.
    pub title: String,
}

impl Link {
    /// Item link for a domain identifier.
    pub fn item(id: &str) -> Self {
        Self {
            href: urlencoding::encode(id).into_owned(),
            rel: REL_ITEM.to_string(),
            title: id.to_string(),
        }
    }
}

/// A collection of resource links.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    pub links: Vec<Link>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreserved_characters_are_left_verbatim() {
        let link = Link::item("Domain-1_a.b~c");
        assert_eq!(link.href, "Domain-1_a.b~c");
        assert_eq!(link.title, "Domain-1_a.b~c");
        assert_eq!(link.rel, "item");
    }

    #[test]
    fn path_delimiters_and_spaces_are_percent_encoded() {
        let link = Link::item("a/b?c#d e");
        assert_eq!(link.href, "a%2Fb%3Fc%23d%20e");
        assert_eq!(link.title, "a/b?c#d e");
    }

    #[test]
    fn non_ascii_is_encoded_as_utf8_bytes() {
        assert_eq!(Link::item("é").href, "%C3%A9");
    }

    #[test]
    fn percent_sign_is_encoded_so_escaping_stays_injective() {
        assert_ne!(Link::item("a%2Fb").href, Link::item("a/b").href);
        assert_eq!(Link::item("a%2Fb").href, "a%252Fb");
    }
}
