use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::config::AppConfig;

/// Locale
///
/// The closed set of languages the front end ships. A locale also fixes the text
/// direction the rendering layer must use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Locale {
    En,
    Ar,
}

impl Locale {
    pub const ALL: [Locale; 2] = [Locale::En, Locale::Ar];

    pub fn as_str(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Ar => "ar",
        }
    }

    /// Matches a single path segment (or language tag) exactly against the supported set.
    pub fn from_segment(segment: &str) -> Option<Locale> {
        Locale::ALL
            .into_iter()
            .find(|locale| locale.as_str() == segment)
    }

    pub fn direction(self) -> Direction {
        match self {
            Locale::Ar => Direction::Rtl,
            Locale::En => Direction::Ltr,
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ltr,
    Rtl,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Ltr => "ltr",
            Direction::Rtl => "rtl",
        }
    }

    pub fn is_rtl(self) -> bool {
        self == Direction::Rtl
    }
}

/// LocalePrefix
///
/// Routing convention for locale segments.
/// - `Always`: every page path carries a locale segment; unprefixed requests are redirected.
/// - `AsNeeded`: the default locale may be served without a prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalePrefix {
    Always,
    AsNeeded,
}

impl FromStr for LocalePrefix {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "always" => Ok(LocalePrefix::Always),
            "as-needed" => Ok(LocalePrefix::AsNeeded),
            other => Err(other.to_string()),
        }
    }
}

/// LocaleContext
///
/// The locale attached to a request once it has passed the pipeline. Handlers read it
/// from the request extensions to render `lang`/`dir` and build localized links.
#[derive(Debug, Clone, PartialEq)]
pub struct LocaleContext {
    pub locale: Locale,
    pub direction: Direction,
    /// Path with the locale segment removed (`/ar/sign-in` -> `/sign-in`).
    pub path: String,
    /// Internal, always-prefixed form used for routing (`/sign-in` -> `/en/sign-in`).
    pub rewritten_path: String,
}

impl LocaleContext {
    pub fn is_rtl(&self) -> bool {
        self.direction.is_rtl()
    }
}

/// Outcome of resolving a path. `redirect` is set when the prefix policy (or a detected
/// non-default locale) requires the client to move to the prefixed form first.
#[derive(Debug, Clone, PartialEq)]
pub struct LocaleResolution {
    pub context: LocaleContext,
    pub redirect: Option<String>,
}

/// LocaleResolver
///
/// Pure function of a path (plus optional `Accept-Language`) and the static locale
/// configuration. Unrecognized locale segments are never errors: the path is treated
/// as carrying no locale and the default applies.
#[derive(Debug, Clone)]
pub struct LocaleResolver {
    default: Locale,
    prefix: LocalePrefix,
    detection: bool,
}

impl LocaleResolver {
    pub fn new(default: Locale, prefix: LocalePrefix) -> Self {
        Self {
            default,
            prefix,
            detection: false,
        }
    }

    pub fn with_detection(mut self, detection: bool) -> Self {
        self.detection = detection;
        self
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.default_locale, config.locale_prefix).with_detection(config.locale_detection)
    }

    pub fn default_locale(&self) -> Locale {
        self.default
    }

    pub fn prefix(&self) -> LocalePrefix {
        self.prefix
    }

    /// Resolves from the path alone.
    pub fn resolve(&self, path: &str) -> LocaleResolution {
        self.negotiate(path, None)
    }

    /// Resolves from the path, falling back to `Accept-Language` (when detection is on)
    /// and then to the default locale. Trailing slashes are dropped from the resolved path.
    pub fn negotiate(&self, path: &str, accept_language: Option<&str>) -> LocaleResolution {
        let (segment, rest) = split_locale(path);
        let rest = without_trailing_slash(rest);

        if let Some(locale) = segment {
            return self.resolution(locale, rest, None);
        }

        let detected = if self.detection {
            accept_language.and_then(preferred_locale)
        } else {
            None
        };
        let locale = detected.unwrap_or(self.default);

        let redirect = match self.prefix {
            LocalePrefix::Always => Some(with_prefix(locale, rest)),
            LocalePrefix::AsNeeded if locale != self.default => Some(with_prefix(locale, rest)),
            LocalePrefix::AsNeeded => None,
        };

        self.resolution(locale, rest, redirect)
    }

    /// Builds the public URL of a locale-free `path` for `locale`, honoring the prefix policy.
    pub fn localize(&self, locale: Locale, path: &str) -> String {
        match self.prefix {
            LocalePrefix::AsNeeded if locale == self.default => {
                if path.starts_with('/') {
                    path.to_string()
                } else {
                    format!("/{path}")
                }
            }
            _ => with_prefix(locale, path),
        }
    }

    fn resolution(&self, locale: Locale, rest: &str, redirect: Option<String>) -> LocaleResolution {
        LocaleResolution {
            context: LocaleContext {
                locale,
                direction: locale.direction(),
                path: rest.to_string(),
                rewritten_path: with_prefix(locale, rest),
            },
            redirect,
        }
    }
}

/// Splits a leading supported-locale segment off `path`.
///
/// `/ar/sign-in` -> `(Some(Ar), "/sign-in")`, `/ar` -> `(Some(Ar), "/")`,
/// `/fr/sign-in` -> `(None, "/fr/sign-in")`.
pub fn split_locale(path: &str) -> (Option<Locale>, &str) {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let (first, rest) = match trimmed.find('/') {
        Some(idx) => (&trimmed[..idx], &trimmed[idx..]),
        None => (trimmed, ""),
    };

    match Locale::from_segment(first) {
        Some(locale) if rest.is_empty() || rest == "/" => (Some(locale), "/"),
        Some(locale) => (Some(locale), rest),
        None if path.is_empty() => (None, "/"),
        None => (None, path),
    }
}

/// `/sign-in/` -> `/sign-in`. The root keeps its slash.
pub fn without_trailing_slash(path: &str) -> &str {
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

/// Prepends the locale segment to a locale-free path (`/` becomes `/ar`).
pub fn with_prefix(locale: Locale, path: &str) -> String {
    match path {
        "" | "/" => format!("/{locale}"),
        p if p.starts_with('/') => format!("/{locale}{p}"),
        p => format!("/{locale}/{p}"),
    }
}

/// Picks the highest-quality supported language from an `Accept-Language` header.
/// Only the primary subtag is compared (`ar-EG` counts as `ar`).
pub fn preferred_locale(header: &str) -> Option<Locale> {
    let mut ranked: Vec<(f32, Locale)> = header
        .split(',')
        .filter_map(|entry| {
            let mut fields = entry.trim().split(';');
            let tag = fields.next()?.trim();
            let quality = fields
                .find_map(|param| param.trim().strip_prefix("q="))
                .map(|q| q.trim().parse::<f32>().unwrap_or(0.0))
                .unwrap_or(1.0);
            let primary = tag.split('-').next()?.to_ascii_lowercase();
            let locale = Locale::from_segment(&primary)?;
            (quality > 0.0).then_some((quality, locale))
        })
        .collect();

    // Stable sort keeps header order between equal weights.
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
    ranked.first().map(|(_, locale)| *locale)
}
