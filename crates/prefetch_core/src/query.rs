use std::fmt;

use url::{form_urlencoded, Url};

/// Identifier owned by the record manager; groups the queries of one entry.
pub type CorrelationId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    /// Dictionary lookup. The only kind whose result is parsed.
    Lookup,
    ImageSearch,
    Translate,
    WebSearch,
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKind::Lookup => write!(f, "lookup"),
            QueryKind::ImageSearch => write!(f, "image search"),
            QueryKind::Translate => write!(f, "translate"),
            QueryKind::WebSearch => write!(f, "web search"),
        }
    }
}

/// One lookup request. Compared by value everywhere; never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Query {
    subject: String,
    kind: QueryKind,
    correlation_id: CorrelationId,
}

impl Query {
    pub fn new(subject: impl Into<String>, kind: QueryKind, correlation_id: CorrelationId) -> Self {
        Self {
            subject: subject.into(),
            kind,
            correlation_id,
        }
    }

    pub fn lookup(subject: impl Into<String>, correlation_id: CorrelationId) -> Self {
        Self::new(subject, QueryKind::Lookup, correlation_id)
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    pub fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}' (#{})", self.kind, self.subject, self.correlation_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageMode {
    English,
    German,
}

/// Where each query kind is sent and which dictionary/translation pair is used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySettings {
    pub dictionary_base: String,
    pub search_base: String,
    pub translate_base: String,
    pub dictionary_directory: String,
    pub translate_from: String,
    pub translate_to: String,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            dictionary_base: "https://www.collinsdictionary.com".to_string(),
            search_base: "https://www.google.com".to_string(),
            translate_base: "https://translate.google.com".to_string(),
            dictionary_directory: String::new(),
            translate_from: String::new(),
            translate_to: String::new(),
        }
        .with_language(LanguageMode::English)
    }
}

impl QuerySettings {
    /// Switch dictionary directory and translation pair, keeping the hosts.
    pub fn with_language(mut self, mode: LanguageMode) -> Self {
        let (directory, from, to) = match mode {
            LanguageMode::English => ("english", "en", "zh-CN"),
            LanguageMode::German => ("german-english", "de", "en"),
        };
        self.dictionary_directory = directory.to_string();
        self.translate_from = from.to_string();
        self.translate_to = to.to_string();
        self
    }

    pub fn url_for(&self, query: &Query) -> Result<Url, url::ParseError> {
        let subject = query.subject();
        match query.kind() {
            QueryKind::Lookup => {
                let mut url = Url::parse(&self.dictionary_base)?;
                extend_path(
                    &mut url,
                    &["dictionary", self.dictionary_directory.as_str(), subject],
                )?;
                Ok(url)
            }
            QueryKind::ImageSearch => {
                let mut url = Url::parse(&self.search_base)?;
                extend_path(&mut url, &["search"])?;
                url.query_pairs_mut()
                    .append_pair("tbm", "isch")
                    .append_pair("q", subject);
                Ok(url)
            }
            QueryKind::Translate => {
                let mut url = Url::parse(&self.translate_base)?;
                extend_path(&mut url, &[""])?;
                url.query_pairs_mut()
                    .append_pair("sl", &self.translate_from)
                    .append_pair("tl", &self.translate_to)
                    .append_pair("text", subject);
                Ok(url)
            }
            QueryKind::WebSearch => {
                let mut url = Url::parse(&self.search_base)?;
                extend_path(&mut url, &["search"])?;
                url.query_pairs_mut().append_pair("q", subject);
                Ok(url)
            }
        }
    }

    /// Word the dictionary redirected to, if it differs from `subject`.
    ///
    /// The dictionary writes interior spaces as `-` in its slugs, so
    /// `"give up"` landing on `.../give-up` is not a suggestion.
    pub fn suggestion_from_final_url(&self, subject: &str, final_url: &str) -> Option<String> {
        let slug = self.lookup_slug(final_url)?;
        if slug.is_empty() || slug == subject.replace(' ', "-") {
            None
        } else {
            Some(slug)
        }
    }

    fn lookup_slug(&self, final_url: &str) -> Option<String> {
        let base = Url::parse(&self.dictionary_base).ok()?;
        let landed = Url::parse(final_url).ok()?;
        if landed.scheme() != base.scheme()
            || landed.host_str() != base.host_str()
            || landed.port_or_known_default() != base.port_or_known_default()
        {
            return None;
        }

        let base_segments: Vec<&str> = base
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();
        let mut segments = landed.path_segments()?;
        for expected in base_segments
            .iter()
            .copied()
            .chain(["dictionary", self.dictionary_directory.as_str()])
        {
            if segments.next()? != expected {
                return None;
            }
        }
        let slug = segments.next()?;
        if segments.next().is_some() {
            return None;
        }
        Some(decode_path_segment(slug))
    }
}

fn extend_path(url: &mut Url, segments: &[&str]) -> Result<(), url::ParseError> {
    url.path_segments_mut()
        .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .extend(segments);
    Ok(())
}

fn decode_path_segment(segment: &str) -> String {
    // `+` and `&` are literal in a path; protect them from form decoding.
    let escaped = segment.replace('+', "%2B").replace('&', "%26");
    form_urlencoded::parse(escaped.as_bytes())
        .next()
        .map(|(key, _)| key.into_owned())
        .unwrap_or_default()
}
