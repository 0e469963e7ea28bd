//! Folio test utilities.
//!
//! Scripted stand-ins for the upstream services, form body builders and
//! an [`AppState`] assembled from them.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use folio_kernel::action::{HONEYPOT_FIELD, TOKEN_FIELD};
use folio_kernel::secrets::{MissingSecret, SecretKey};
use folio_kernel::services::{
    DeliveryReceipt, EmailError, EmailSender, HumanVerifier, MailingList, MailingListError,
    OutgoingEmail,
};
use folio_kernel::{AppState, Config, Services};
use url::Url;

/// Site URL used by [`test_config`].
pub const TEST_SITE_URL: &str = "https://example.com";

/// Configuration pointing at [`TEST_SITE_URL`].
pub fn test_config() -> Config {
    match Url::parse(TEST_SITE_URL) {
        Ok(url) => Config::for_site(url),
        Err(e) => panic!("TEST_SITE_URL must parse: {e}"),
    }
}

/// Human verifier with a fixed verdict.
#[derive(Debug)]
pub struct FakeVerifier {
    verdict: bool,
    calls: AtomicUsize,
}

impl FakeVerifier {
    pub fn passing() -> Arc<Self> {
        Arc::new(Self {
            verdict: true,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            verdict: false,
            calls: AtomicUsize::new(0),
        })
    }

    /// Number of verifications requested so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HumanVerifier for FakeVerifier {
    async fn verify(&self, _token: &str) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.verdict
    }
}

/// How [`RecordingMailer`] answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailOutcome {
    Accept,
    NotConfigured,
    Reject,
}

/// Email sender that records every message it is asked to send.
#[derive(Debug)]
pub struct RecordingMailer {
    outcome: MailOutcome,
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl RecordingMailer {
    pub fn new(outcome: MailOutcome) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn accepting() -> Arc<Self> {
        Self::new(MailOutcome::Accept)
    }

    /// Messages handed to the sender, in order.
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl EmailSender for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<DeliveryReceipt, EmailError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(email.clone());

        match self.outcome {
            MailOutcome::Accept => Ok(DeliveryReceipt {
                id: "email-1".to_string(),
            }),
            MailOutcome::NotConfigured => {
                Err(MissingSecret(SecretKey::ResendApiKey).into())
            }
            MailOutcome::Reject => Err(EmailError::Rejected {
                status: 422,
                body: "invalid from address".to_string(),
            }),
        }
    }
}

/// How one [`ScriptedMailingList`] step answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListOutcome {
    Ok,
    NotConfigured,
    /// Provider error with the given error strings.
    Status(u16, Vec<String>),
}

impl ListOutcome {
    fn into_result(self) -> Result<(), MailingListError> {
        match self {
            ListOutcome::Ok => Ok(()),
            ListOutcome::NotConfigured => Err(MissingSecret(SecretKey::KitApiKey).into()),
            ListOutcome::Status(status, errors) => {
                Err(MailingListError::Status { status, errors })
            }
        }
    }
}

/// A call made against [`ScriptedMailingList`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListCall {
    Create(String),
    AddToForm(String),
}

/// Mailing list whose create and attach steps answer as scripted.
#[derive(Debug)]
pub struct ScriptedMailingList {
    create: ListOutcome,
    attach: ListOutcome,
    calls: Mutex<Vec<ListCall>>,
}

impl ScriptedMailingList {
    pub fn new(create: ListOutcome, attach: ListOutcome) -> Arc<Self> {
        Arc::new(Self {
            create,
            attach,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn accepting() -> Arc<Self> {
        Self::new(ListOutcome::Ok, ListOutcome::Ok)
    }

    pub fn calls(&self) -> Vec<ListCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, call: ListCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

#[async_trait]
impl MailingList for ScriptedMailingList {
    async fn create_subscriber(&self, email: &str) -> Result<(), MailingListError> {
        self.record(ListCall::Create(email.to_string()));
        self.create.clone().into_result()
    }

    async fn add_to_form(&self, email: &str) -> Result<(), MailingListError> {
        self.record(ListCall::AddToForm(email.to_string()));
        self.attach.clone().into_result()
    }
}

/// The fakes behind a test [`AppState`], kept for assertions.
pub struct TestServices {
    pub verifier: Arc<FakeVerifier>,
    pub mailer: Arc<RecordingMailer>,
    pub mailing_list: Arc<ScriptedMailingList>,
}

impl TestServices {
    /// Every upstream accepts.
    pub fn accepting() -> Self {
        Self {
            verifier: FakeVerifier::passing(),
            mailer: RecordingMailer::accepting(),
            mailing_list: ScriptedMailingList::accepting(),
        }
    }

    pub fn services(&self) -> Services {
        Services {
            verifier: self.verifier.clone(),
            mailer: self.mailer.clone(),
            mailing_list: self.mailing_list.clone(),
        }
    }

    /// Application state wired to these fakes.
    pub fn app_state(&self, config: &Config) -> AppState {
        AppState::new(config, self.services())
    }
}

/// Percent-encode a form body from key/value pairs.
pub fn form_body(pairs: &[(&str, &str)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

/// A contact submission that passes validation.
pub fn contact_form_body(name: &str, email: &str, message: &str) -> String {
    form_body(&[
        ("name", name),
        ("email", email),
        ("message", message),
        (TOKEN_FIELD, "token-ok"),
        (HONEYPOT_FIELD, ""),
    ])
}

/// A newsletter submission that passes validation.
pub fn newsletter_form_body(email: &str) -> String {
    form_body(&[(TOKEN_FIELD, "token-ok"), ("email", email)])
}
