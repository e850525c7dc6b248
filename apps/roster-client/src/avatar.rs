use url::{Url, form_urlencoded};

use crate::model::Employee;

const PLACEHOLDER_BASE: &str = "https://ui-avatars.com/api/";

/// First letter of up to the first two words, uppercased.
pub fn initials(name: &str) -> String {
    name.split(' ')
        .filter_map(|word| word.chars().next())
        .collect::<String>()
        .to_uppercase()
        .chars()
        .take(2)
        .collect()
}

pub fn placeholder_url(name: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(initials(name).as_bytes()).collect();
    format!("{PLACEHOLDER_BASE}?name={encoded}&background=random&size=128")
}

/// Image source for an employee plus the placeholder to show if it fails to load.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AvatarImage {
    pub src: String,
    pub fallback: String,
}

impl AvatarImage {
    pub fn for_employee(api_base: &Url, employee: &Employee, cache_bust: i64) -> Self {
        let fallback = placeholder_url(&employee.name);
        let src = match employee.avatar_url.as_deref().filter(|url| !url.is_empty()) {
            Some(url) => {
                let clean = url.split('?').next().unwrap_or(url);
                if clean.starts_with('/') {
                    let base = api_base.as_str().trim_end_matches('/');
                    format!("{base}{clean}?t={cache_bust}")
                } else {
                    format!("{clean}?t={cache_bust}")
                }
            }
            None => fallback.clone(),
        };
        Self { src, fallback }
    }

    /// Source to use given whether the primary image loaded.
    pub fn resolve(&self, loaded: bool) -> &str {
        if loaded { &self.src } else { &self.fallback }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EmployeeStatus;

    fn employee(name: &str, avatar_url: Option<&str>) -> Employee {
        Employee {
            id: 1,
            name: name.into(),
            title: None,
            status: EmployeeStatus::Working,
            avatar_url: avatar_url.map(String::from),
        }
    }

    #[test]
    fn initials_take_first_two_words() {
        assert_eq!(initials("ada lovelace"), "AL");
        assert_eq!(initials("Grace Brewster Hopper"), "GB");
        assert_eq!(initials("Linus"), "L");
        assert_eq!(initials(""), "");
    }

    #[test]
    fn placeholder_uses_initials() {
        assert_eq!(
            placeholder_url("Ada Lovelace"),
            "https://ui-avatars.com/api/?name=AL&background=random&size=128"
        );
    }

    #[test]
    fn relative_avatar_joins_api_base_with_cache_buster() {
        let base = Url::parse("http://localhost:3000/").unwrap();
        let image = AvatarImage::for_employee(
            &base,
            &employee("Ada Lovelace", Some("/uploads/avatar-1.png?t=5")),
            1700000000000,
        );
        assert_eq!(
            image.src,
            "http://localhost:3000/uploads/avatar-1.png?t=1700000000000"
        );
        assert_eq!(image.resolve(false), image.fallback);
    }

    #[test]
    fn absolute_avatar_keeps_host() {
        let base = Url::parse("http://localhost:3000/").unwrap();
        let image = AvatarImage::for_employee(
            &base,
            &employee("Ada", Some("https://cdn.test/a.png")),
            42,
        );
        assert_eq!(image.src, "https://cdn.test/a.png?t=42");
    }

    #[test]
    fn missing_avatar_falls_back_to_placeholder() {
        let base = Url::parse("http://localhost:3000/").unwrap();
        let image = AvatarImage::for_employee(&base, &employee("Ada Lovelace", None), 42);
        assert_eq!(image.src, image.fallback);
        assert!(image.src.contains("name=AL"));
    }
}
