use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;
use url::Url;

use super::endpoint::{EndpointDescriptor, RequestOptions};
use super::transport::{ReqwestTransport, Transport};
use super::types::{self, Channel, Guild, GuildMember, Message, User};
use crate::cache::{CacheKey, TtlCache};
use crate::clock::{Clock, TokioClock};
use crate::config::Settings;
use crate::error::RequestError;
use crate::pipeline::{Dispatcher, RateLimiter, RequestQueue, RetryPolicy};

/// Largest page the messages endpoint accepts.
pub const MAX_MESSAGE_LIMIT: u32 = 100;

/// Page size used when listing guild members.
const MEMBER_PAGE_LIMIT: u32 = 50;

/// Discord API client.
///
/// Every call goes through one pipeline per client: cache lookup, then a
/// single-flight queue that spaces dispatches, honors 429 cool-downs and
/// retries failures with linear backoff. Clones share that pipeline.
#[derive(Clone)]
pub struct ApiClient {
  base_url: Arc<str>,
  default_message_limit: u32,
  cache: Arc<TtlCache<CacheKey, Value>>,
  queue: RequestQueue,
}

impl ApiClient {
  /// Create a client that talks HTTP through `reqwest`.
  ///
  /// `token` is sent verbatim as the `Authorization` header.
  pub fn new(settings: &Settings, token: impl Into<String>) -> Result<Self, RequestError> {
    let transport = ReqwestTransport::new()?;
    Ok(Self::with_transport(
      settings,
      token,
      Arc::new(transport),
      Arc::new(TokioClock),
    ))
  }

  /// Create a client over an arbitrary transport and clock.
  pub fn with_transport(
    settings: &Settings,
    token: impl Into<String>,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
  ) -> Self {
    let cache = Arc::new(TtlCache::new(Arc::clone(&clock), settings.cache_ttl));
    let dispatcher = Dispatcher {
      transport,
      clock,
      cache: Arc::clone(&cache),
      retry: RetryPolicy::new(settings.max_retries, settings.retry_base_delay),
      token: token.into(),
    };
    let queue = RequestQueue::new(dispatcher, RateLimiter::new(settings.min_spacing));

    Self {
      base_url: Arc::from(settings.base_url.trim_end_matches('/')),
      default_message_limit: settings.default_message_limit,
      cache,
      queue,
    }
  }

  /// Perform a request against `path` (relative to the API base URL).
  ///
  /// A fresh cached response is returned without touching the network unless
  /// `options.force` is set. Otherwise the request waits its turn in the queue
  /// and resolves once it succeeds or fails for good.
  pub async fn request(&self, path: &str, options: RequestOptions) -> Result<Value, RequestError> {
    let endpoint = EndpointDescriptor::from_options(path, &options);
    let key = CacheKey::for_endpoint(&endpoint);

    if !options.force {
      if let Some(cached) = self.cache.get(&key) {
        debug!(path, "cache hit");
        return Ok(cached);
      }
    }

    let url = self.endpoint_url(path)?;
    self.queue.submit(endpoint, url, key).await
  }

  /// [`request`](Self::request), decoded into `T`.
  pub async fn fetch<T: DeserializeOwned>(
    &self,
    path: &str,
    options: RequestOptions,
  ) -> Result<T, RequestError> {
    let value = self.request(path, options).await?;
    Ok(types::from_value(value)?)
  }

  pub async fn get_current_user(&self) -> Result<User, RequestError> {
    self.fetch("/users/@me", RequestOptions::new()).await
  }

  pub async fn get_guilds(&self) -> Result<Vec<Guild>, RequestError> {
    self.fetch("/users/@me/guilds", RequestOptions::new()).await
  }

  pub async fn get_guild_channels(&self, guild_id: &str) -> Result<Vec<Channel>, RequestError> {
    let path = format!("/guilds/{}/channels", guild_id);
    self.fetch(&path, RequestOptions::new()).await
  }

  pub async fn get_channel(&self, channel_id: &str) -> Result<Channel, RequestError> {
    let path = format!("/channels/{}", channel_id);
    self.fetch(&path, RequestOptions::new()).await
  }

  /// Latest messages of a channel, newest first.
  ///
  /// `limit` defaults to the configured page size and is clamped to 1..=100.
  pub async fn get_channel_messages(
    &self,
    channel_id: &str,
    limit: Option<u32>,
  ) -> Result<Vec<Message>, RequestError> {
    let limit = limit
      .unwrap_or(self.default_message_limit)
      .clamp(1, MAX_MESSAGE_LIMIT);
    let path = format!("/channels/{}/messages?limit={}", channel_id, limit);
    self.fetch(&path, RequestOptions::new()).await
  }

  /// Members of the guild a channel belongs to.
  ///
  /// Channels outside a guild (direct messages) have no member list, which
  /// yields an empty vector.
  pub async fn get_channel_members(
    &self,
    channel_id: &str,
  ) -> Result<Vec<GuildMember>, RequestError> {
    let channel = self.get_channel(channel_id).await?;
    let Some(guild_id) = channel.guild_id else {
      return Ok(Vec::new());
    };

    let path = format!("/guilds/{}/members?limit={}", guild_id, MEMBER_PAGE_LIMIT);
    self.fetch(&path, RequestOptions::new()).await
  }

  /// Post a message to a channel.
  ///
  /// Always reaches the network: sending the same text twice sends it twice.
  pub async fn send_message(
    &self,
    channel_id: &str,
    content: &str,
  ) -> Result<Message, RequestError> {
    let path = format!("/channels/{}/messages", channel_id);
    let options = RequestOptions::new()
      .method(Method::POST)
      .json(json!({ "content": content }))
      .force(true);
    self.fetch(&path, options).await
  }

  /// Forget every cached response.
  pub fn clear_cache(&self) {
    self.cache.clear();
  }

  /// Requests waiting in the queue (the one in flight is not counted).
  pub fn pending_requests(&self) -> usize {
    self.queue.pending()
  }

  fn endpoint_url(&self, path: &str) -> Result<Url, RequestError> {
    let url = if path.starts_with('/') {
      format!("{}{}", self.base_url, path)
    } else {
      format!("{}/{}", self.base_url, path)
    };
    Ok(Url::parse(&url)?)
  }
}
