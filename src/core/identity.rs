use sha2::{Digest, Sha256};

/// Who this channel belongs to: one participant in one session, bound by the
/// session's shared secret.
///
/// The secret never travels over the channel itself; it only enters the form
/// token digest attached to ordinary form submissions.
#[derive(Clone, Debug)]
pub struct Identity {
    session: String,
    participant: String,
    secret: String,
}

impl Identity {
    pub fn new(
        session: impl Into<String>,
        participant: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            session: session.into(),
            participant: participant.into(),
            secret: secret.into(),
        }
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    pub fn participant(&self) -> &str {
        &self.participant
    }

    /// Integrity token attached to the primary form on every page load.
    ///
    /// Deterministic in the (session, participant, secret) triple, so page
    /// state can neither be replayed nor forged across sessions.
    pub fn form_token(&self) -> String {
        let base = format!("{}+{}+{}", self.session, self.participant, self.secret);
        let digest = Sha256::digest(base.as_bytes());
        let mut out = String::with_capacity(digest.len() * 2);
        for byte in digest {
            out.push_str(&format!("{byte:02x}"));
        }
        out
    }

    /// Websocket URL for this participant's channel.
    ///
    /// The scheme follows the page's own: a secure page gets a secure socket.
    /// `root` is the deployment's path prefix ("" when served at the root).
    pub fn channel_url(&self, secure: bool, host: &str, root: &str) -> String {
        let scheme = if secure { "wss" } else { "ws" };
        format!(
            "{scheme}://{host}{root}/ws/{}/{}/",
            self.session, self.participant
        )
    }
}
