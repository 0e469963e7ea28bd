//! Single-use, size-capped slot carrying one action result across a
//! redirect.
//!
//! A slot is written at most once per response and cleared on every read,
//! whatever the read finds. [`CookieSlot`] backs it with the
//! `ACTION_PAYLOAD` cookie; [`MemorySlot`] holds the same encoding in
//! memory.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::action::ActionResult;

/// Cookie holding the relayed payload.
pub const ACTION_PAYLOAD_COOKIE: &str = "ACTION_PAYLOAD";

/// A bit under the common 4 KiB per-cookie limit.
pub const MAX_PAYLOAD_BYTES: usize = 3800;

pub const MAX_ACTION_NAME_CHARS: usize = 100;

/// Lifetime of an unread payload.
pub const PAYLOAD_MAX_AGE_SECS: i64 = 15;

/// What the slot carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookiePayload {
    pub action_name: String,
    pub action_result: ActionResult,
}

impl CookiePayload {
    pub fn new(action_name: impl Into<String>, action_result: ActionResult) -> Self {
        Self {
            action_name: action_name.into(),
            action_result,
        }
    }

    /// Serialize, refusing payloads over [`MAX_PAYLOAD_BYTES`].
    pub fn encode(&self) -> Result<String, SlotError> {
        let json = serde_json::to_string(self)?;
        if json.len() > MAX_PAYLOAD_BYTES {
            return Err(SlotError::Oversized { len: json.len() });
        }
        Ok(json)
    }

    /// Parse an untrusted stored value.
    pub fn decode(raw: &str) -> Result<Self, DiscardReason> {
        if raw.len() > MAX_PAYLOAD_BYTES {
            return Err(DiscardReason::Oversized);
        }

        let value: serde_json::Value =
            serde_json::from_str(raw).map_err(|_| DiscardReason::Malformed)?;

        let action_name = value
            .get("actionName")
            .and_then(serde_json::Value::as_str)
            .filter(|name| name.chars().count() <= MAX_ACTION_NAME_CHARS)
            .ok_or(DiscardReason::InvalidShape)?
            .to_string();

        let action_result = value
            .get("actionResult")
            .cloned()
            .and_then(|r| serde_json::from_value::<ActionResult>(r).ok())
            .ok_or(DiscardReason::InvalidShape)?;

        Ok(Self {
            action_name,
            action_result,
        })
    }
}

/// Why a stored value was thrown away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    Oversized,
    Malformed,
    InvalidShape,
}

/// Outcome of reading a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotRead {
    Empty,
    Discarded(DiscardReason),
    Delivered(CookiePayload),
}

#[derive(Debug, Error)]
pub enum SlotError {
    #[error("payload is {len} bytes, over the {MAX_PAYLOAD_BYTES} byte cap")]
    Oversized { len: usize },

    #[error("slot already written")]
    AlreadyWritten,

    #[error("payload could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Write-once, read-once-then-clear storage for one [`CookiePayload`].
pub trait ResultSlot {
    /// Read and clear the slot.
    fn take(&mut self) -> SlotRead;

    /// Store a payload. Oversized payloads are refused and leave the slot
    /// untouched.
    fn put(&mut self, payload: &CookiePayload) -> Result<(), SlotError>;
}

/// Slot backed by the `ACTION_PAYLOAD` cookie.
///
/// Reads come from the request's cookies; writes and removals accumulate
/// in the jar, which the caller attaches to the response.
#[derive(Debug)]
pub struct CookieSlot {
    jar: CookieJar,
    secure: bool,
    written: bool,
}

impl CookieSlot {
    /// `secure` sets the cookie's `Secure` attribute on write.
    pub fn new(jar: CookieJar, secure: bool) -> Self {
        Self {
            jar,
            secure,
            written: false,
        }
    }

    /// Whether the request carried a payload cookie.
    pub fn is_occupied(&self) -> bool {
        self.jar.get(ACTION_PAYLOAD_COOKIE).is_some()
    }

    /// The jar with any pending removal or write.
    pub fn into_jar(self) -> CookieJar {
        self.jar
    }
}

impl ResultSlot for CookieSlot {
    fn take(&mut self) -> SlotRead {
        let Some(raw) = self
            .jar
            .get(ACTION_PAYLOAD_COOKIE)
            .map(|c| c.value().to_string())
        else {
            return SlotRead::Empty;
        };

        let removal = Cookie::build((ACTION_PAYLOAD_COOKIE, "")).path("/");
        self.jar = std::mem::take(&mut self.jar).remove(removal);

        match CookiePayload::decode(&raw) {
            Ok(payload) => SlotRead::Delivered(payload),
            Err(reason) => SlotRead::Discarded(reason),
        }
    }

    fn put(&mut self, payload: &CookiePayload) -> Result<(), SlotError> {
        if self.written {
            return Err(SlotError::AlreadyWritten);
        }
        let value = payload.encode()?;

        let cookie = Cookie::build((ACTION_PAYLOAD_COOKIE, value))
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Strict)
            .path("/")
            .max_age(time::Duration::seconds(PAYLOAD_MAX_AGE_SECS));

        self.jar = std::mem::take(&mut self.jar).add(cookie);
        self.written = true;
        Ok(())
    }
}

/// Slot held in memory.
#[derive(Debug, Default)]
pub struct MemorySlot {
    value: Option<String>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// A slot pre-filled with an arbitrary stored value.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            value: Some(raw.into()),
        }
    }

    pub fn raw(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

impl ResultSlot for MemorySlot {
    fn take(&mut self) -> SlotRead {
        match self.value.take() {
            None => SlotRead::Empty,
            Some(raw) => match CookiePayload::decode(&raw) {
                Ok(payload) => SlotRead::Delivered(payload),
                Err(reason) => SlotRead::Discarded(reason),
            },
        }
    }

    fn put(&mut self, payload: &CookiePayload) -> Result<(), SlotError> {
        if self.value.is_some() {
            return Err(SlotError::AlreadyWritten);
        }
        self.value = Some(payload.encode()?);
        Ok(())
    }
}
