//! The per-request context handed to resolvers.

use std::sync::Arc;

use async_graphql::ErrorExtensions;
use http::HeaderMap;
use http::HeaderName;
use http::HeaderValue;
use indexmap::IndexMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::configuration::ConfigurationError;
use crate::error::RedirectError;
use crate::request::IncomingRequest;

const RESERVED_KEYS: [&str; 2] = ["request", "redirect"];

/// Custom fields made available to every resolver through [`RequestContext::get`].
///
/// `request` and `redirect` are reserved for the fields every
/// [`RequestContext`] carries and cannot be seeded.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContextSeed {
    entries: IndexMap<String, Value>,
}

impl ContextSeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, serializing `value` to JSON.
    pub fn insert<K, V>(mut self, key: K, value: V) -> Result<Self, ConfigurationError>
    where
        K: Into<String>,
        V: Serialize,
    {
        let key = key.into();
        check_key(&key)?;
        let value = serde_json::to_value(value).map_err(ConfigurationError::InvalidContextValue)?;
        self.entries.insert(key, value);
        Ok(self)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TryFrom<IndexMap<String, Value>> for ContextSeed {
    type Error = ConfigurationError;

    fn try_from(entries: IndexMap<String, Value>) -> Result<Self, Self::Error> {
        entries.keys().try_for_each(|key| check_key(key))?;
        Ok(Self { entries })
    }
}

fn check_key(key: &str) -> Result<(), ConfigurationError> {
    if RESERVED_KEYS.contains(&key) {
        Err(ConfigurationError::ReservedContextKey(key.to_string()))
    } else {
        Ok(())
    }
}

#[derive(Debug, Default)]
struct RedirectState {
    target: Option<String>,
    headers: HeaderMap,
}

/// The redirect side channel of one request.
///
/// The first registered URL wins. Registering the same URL again only adds
/// headers; registering a different URL is an error.
#[derive(Clone, Debug, Default)]
pub struct Redirect {
    state: Arc<parking_lot::Mutex<RedirectState>>,
}

impl Redirect {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register `url` as the redirect target and append `headers` to the
    /// headers sent along with it.
    pub fn register(&self, url: &str, headers: HeaderMap) -> Result<(), RedirectError> {
        HeaderValue::from_str(url).map_err(|_| RedirectError::InvalidLocation(url.to_string()))?;

        let mut state = self.state.lock();
        match &state.target {
            Some(existing) if existing != url => {
                return Err(RedirectError::Conflicting {
                    existing: existing.clone(),
                    requested: url.to_string(),
                });
            }
            Some(_) => {}
            None => state.target = Some(url.to_string()),
        }
        let mut name: Option<HeaderName> = None;
        for (key, value) in headers {
            // `None` keys continue the previous header name
            if let Some(key) = key {
                name = Some(key);
            }
            if let Some(name) = &name {
                state.headers.append(name.clone(), value);
            }
        }
        tracing::debug!(location = url, "redirect registered");
        Ok(())
    }

    /// The registered target and the headers accumulated for it.
    pub(crate) fn take(&self) -> Option<(String, HeaderMap)> {
        let mut state = self.state.lock();
        let target = state.target.take()?;
        Some((target, std::mem::take(&mut state.headers)))
    }
}

/// The context of one GraphQL execution, available to resolvers as
/// `ctx.data::<RequestContext>()`.
#[derive(Clone, Debug)]
pub struct RequestContext {
    request: Arc<IncomingRequest>,
    redirect: Redirect,
    seed: Arc<ContextSeed>,
}

impl RequestContext {
    pub(crate) fn new(request: Arc<IncomingRequest>, seed: Arc<ContextSeed>) -> Self {
        Self {
            request,
            redirect: Redirect::new(),
            seed,
        }
    }

    /// The inbound request this execution serves.
    pub fn request(&self) -> &IncomingRequest {
        &self.request
    }

    /// Turn the response into a redirect to `url`, sending `headers` along.
    ///
    /// A conflicting target fails the calling field only.
    pub fn redirect(&self, url: &str, headers: HeaderMap) -> async_graphql::Result<()> {
        self.redirect
            .register(url, headers)
            .map_err(|err| err.extend())
    }

    /// Same as [`RequestContext::redirect`] with a single header.
    pub fn redirect_with(
        &self,
        url: &str,
        name: HeaderName,
        value: &str,
    ) -> async_graphql::Result<()> {
        let value = HeaderValue::from_str(value)
            .map_err(|err| RedirectError::InvalidHeader(err.to_string()).extend())?;
        let mut headers = HeaderMap::new();
        headers.insert(name, value);
        self.redirect(url, headers)
    }

    /// Same as [`RequestContext::redirect`] without extra headers.
    pub fn redirect_to(&self, url: &str) -> async_graphql::Result<()> {
        self.redirect(url, HeaderMap::new())
    }

    /// Deserialize the seeded field `key`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, serde_json::Error> {
        self.seed
            .get(key)
            .map(|value| serde_json::from_value(value.clone()))
            .transpose()
    }

    pub(crate) fn redirect_signal(&self) -> &Redirect {
        &self.redirect
    }
}
