//! One-time SMS verification codes.
//!
//! Codes are six digits, single use, and expire after the configured TTL.
//! Expiry is checked when a code is read; there is no sweeper task. The store
//! lives in process memory, so every instance of the service has its own
//! codes. Running several instances needs a shared store instead.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use rand::Rng;
use tokio::sync::Mutex;

use crate::services::validate::mask_phone;

/// Delivers a code to a phone. Provider integrations implement this.
pub trait SmsSender: Send + Sync {
    fn send_code(&self, phone: &str, code: &str) -> anyhow::Result<()>;
}

/// Development sender: writes the code to the log instead of texting it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSmsSender;

impl SmsSender for LogSmsSender {
    fn send_code(&self, phone: &str, code: &str) -> anyhow::Result<()> {
        tracing::info!(phone = %mask_phone(phone), code = %code, "SMS verification code issued");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeCheck {
    Valid,
    Mismatch,
    Expired,
    Missing,
}

impl CodeCheck {
    pub fn is_valid(&self) -> bool {
        matches!(self, CodeCheck::Valid)
    }

    pub fn message(&self) -> &'static str {
        match self {
            CodeCheck::Valid => "Verification succeeded",
            CodeCheck::Mismatch => "Incorrect verification code",
            CodeCheck::Expired => "Verification code expired, please request a new one",
            CodeCheck::Missing => "Please request a verification code first",
        }
    }
}

struct CodeEntry {
    code: String,
    expires_at: Instant,
}

/// Keyed by phone number. Issuing a new code replaces the previous one.
#[derive(Clone)]
pub struct VerificationCodes {
    entries: Arc<Mutex<HashMap<String, CodeEntry>>>,
    ttl: Duration,
}

impl VerificationCodes {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    pub async fn issue(&self, phone: &str) -> String {
        let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000));
        let now = Instant::now();

        let mut entries = self.entries.lock().await;
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            phone.to_string(),
            CodeEntry {
                code: code.clone(),
                expires_at: now + self.ttl,
            },
        );
        code
    }

    /// Consumes the code on success. An expired entry is dropped; a wrong
    /// guess leaves the entry in place.
    pub async fn verify(&self, phone: &str, code: &str) -> CodeCheck {
        let mut entries = self.entries.lock().await;
        let Some(entry) = entries.get(phone) else {
            return CodeCheck::Missing;
        };

        if Instant::now() >= entry.expires_at {
            entries.remove(phone);
            return CodeCheck::Expired;
        }
        if !codes_match(&entry.code, code.trim()) {
            return CodeCheck::Mismatch;
        }

        entries.remove(phone);
        CodeCheck::Valid
    }
}

/// Compares every byte regardless of where the first difference is.
fn codes_match(expected: &str, given: &str) -> bool {
    let (expected, given) = (expected.as_bytes(), given.as_bytes());
    expected.len() == given.len()
        && expected
            .iter()
            .zip(given)
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
}
