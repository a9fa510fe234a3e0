/// Category of a dispatched message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Per-user password expiration notice.
    ExpirationNotice,
    /// Single administrator digest of locked accounts.
    LockedUsersDigest,
}

/// What happened to one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    /// Handed to the mail transport.
    Delivered,
    /// Transport rejected the message or timed out.
    Failed(String),
    /// Dry run: rendered and logged, never sent.
    Skipped,
}

/// Record of one rendered message and its delivery status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchedMessage {
    /// Message category.
    pub kind: MessageKind,
    /// Recipient mail address.
    pub recipient: String,
    /// Rendered subject.
    pub subject: String,
    /// Rendered plain-text body.
    pub body: String,
    /// Delivery outcome.
    pub status: DeliveryStatus,
}

/// Per-message outcome of a dispatch, in dispatch order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    messages: Vec<DispatchedMessage>,
}

impl DispatchReport {
    pub(super) fn push(&mut self, message: DispatchedMessage) {
        self.messages.push(message);
    }

    /// Returns every message in dispatch order.
    #[must_use]
    pub fn messages(&self) -> &[DispatchedMessage] {
        self.messages.as_slice()
    }

    /// Returns the messages of one kind.
    pub fn messages_of(&self, kind: MessageKind) -> impl Iterator<Item = &DispatchedMessage> {
        self.messages
            .iter()
            .filter(move |message| message.kind == kind)
    }

    /// Counts delivered messages of one kind.
    #[must_use]
    pub fn delivered(&self, kind: MessageKind) -> usize {
        self.messages_of(kind)
            .filter(|message| message.status == DeliveryStatus::Delivered)
            .count()
    }

    /// Counts failed messages of one kind.
    #[must_use]
    pub fn failed(&self, kind: MessageKind) -> usize {
        self.messages_of(kind)
            .filter(|message| matches!(message.status, DeliveryStatus::Failed(_)))
            .count()
    }

    /// Counts dry-run messages of one kind.
    #[must_use]
    pub fn skipped(&self, kind: MessageKind) -> usize {
        self.messages_of(kind)
            .filter(|message| message.status == DeliveryStatus::Skipped)
            .count()
    }

    /// Returns the administrator digest, if one was dispatched.
    #[must_use]
    pub fn admin_digest(&self) -> Option<&DispatchedMessage> {
        self.messages_of(MessageKind::LockedUsersDigest).next()
    }
}
