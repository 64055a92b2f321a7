use crate::locale::{Locale, split_locale};

/// RoutePattern
///
/// A matchable path shape, always evaluated against the locale-free form of a path
/// together with the locale segment that was stripped from it (if any).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutePattern {
    /// Exact path with no locale segment, e.g. the bare root `/`.
    Exact(&'static str),
    /// The root of any supported locale: `/en`, `/ar`.
    LocaleRoot,
    /// A path segment and everything under it, with or without a locale segment:
    /// `Prefix("/sign-in")` matches `/sign-in`, `/en/sign-in/factor-one`, but not `/sign-inx`.
    Prefix(&'static str),
}

impl RoutePattern {
    pub fn matches(&self, locale: Option<Locale>, path: &str) -> bool {
        match self {
            RoutePattern::Exact(exact) => locale.is_none() && path == *exact,
            RoutePattern::LocaleRoot => locale.is_some() && path == "/",
            RoutePattern::Prefix(prefix) => match path.strip_prefix(prefix) {
                Some(rest) => rest.is_empty() || rest.starts_with('/'),
                None => false,
            },
        }
    }
}

/// Paths reachable without a session.
pub const PUBLIC_ROUTES: [RoutePattern; 6] = [
    RoutePattern::Exact("/"),
    RoutePattern::LocaleRoot,
    RoutePattern::Prefix("/sign-in"),
    RoutePattern::Prefix("/sign-up"),
    RoutePattern::Prefix("/doctor-invite"),
    RoutePattern::Prefix("/clinic-invite"),
];

/// RouteClassifier
///
/// Total, deterministic split of the path space into public and protected. The pattern
/// set is fixed when the classifier is built at startup. Every pattern in the set marks
/// a path public, so overlapping patterns can never disagree.
#[derive(Debug, Clone)]
pub struct RouteClassifier {
    public: Vec<RoutePattern>,
}

impl Default for RouteClassifier {
    fn default() -> Self {
        Self::public_defaults()
    }
}

impl RouteClassifier {
    pub fn new(public: impl IntoIterator<Item = RoutePattern>) -> Self {
        Self {
            public: public.into_iter().collect(),
        }
    }

    pub fn public_defaults() -> Self {
        Self::new(PUBLIC_ROUTES)
    }

    /// Query strings and fragments are ignored; only the path is classified.
    pub fn is_public(&self, path: &str) -> bool {
        let path = path.split(['?', '#']).next().unwrap_or(path);
        let (locale, rest) = split_locale(path);
        self.public
            .iter()
            .any(|pattern| pattern.matches(locale, rest))
    }

    pub fn patterns(&self) -> &[RoutePattern] {
        &self.public
    }
}
