use crate::html::{html_to_text, HtmlToTextLimits};
use crate::model::{IndexableMail, MailAddress};

const JOIN_LIST_BY: &str = " ";

/// Indexable mail fields. The declaration order is the default field order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MailField {
    Subject,
    Body,
    Sender,
    ToRecipients,
    CcRecipients,
    BccRecipients,
    Attachments,
}

impl MailField {
    pub const ALL: [MailField; 7] = [
        MailField::Subject,
        MailField::Body,
        MailField::Sender,
        MailField::ToRecipients,
        MailField::CcRecipients,
        MailField::BccRecipients,
        MailField::Attachments,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MailField::Subject => "subject",
            MailField::Body => "body",
            MailField::Sender => "sender",
            MailField::ToRecipients => "toRecipients",
            MailField::CcRecipients => "ccRecipients",
            MailField::BccRecipients => "bccRecipients",
            MailField::Attachments => "attachments",
        }
    }

    pub fn default_boost(self) -> f64 {
        match self {
            MailField::Subject => 7.0,
            MailField::Body => 5.0,
            _ => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldDescriptor {
    pub field: MailField,
    pub boost: f64,
}

impl FieldDescriptor {
    pub fn new(field: MailField, boost: f64) -> Self {
        Self { field, boost: boost.max(0.0) }
    }

    /// subject 7, body 5, everything else 1.
    pub fn defaults() -> Vec<FieldDescriptor> {
        MailField::ALL
            .iter()
            .map(|&field| FieldDescriptor::new(field, field.default_boost()))
            .collect()
    }
}

/// Turns a mail into the text of each indexable field.
#[derive(Debug, Clone, Default)]
pub struct FieldExtractor {
    html_limits: HtmlToTextLimits,
}

impl FieldExtractor {
    pub fn new(html_limits: HtmlToTextLimits) -> Self {
        Self { html_limits }
    }

    /// Never fails: missing data is an empty string and a body that cannot be
    /// converted from HTML is returned as is.
    pub fn extract(&self, mail: &IndexableMail, field: MailField) -> String {
        match field {
            MailField::Subject => mail.subject.clone(),
            MailField::Body => self.body(mail),
            MailField::Sender => address_text(&mail.sender),
            MailField::ToRecipients => addresses_text(&mail.to_recipients),
            MailField::CcRecipients => addresses_text(&mail.cc_recipients),
            MailField::BccRecipients => addresses_text(&mail.bcc_recipients),
            MailField::Attachments => mail
                .attachments
                .iter()
                .map(|attachment| attachment.name.as_str())
                .collect::<Vec<_>>()
                .join(JOIN_LIST_BY),
        }
    }

    fn body(&self, mail: &IndexableMail) -> String {
        if !mail.is_html() {
            return mail.body.clone();
        }
        match html_to_text(&mail.body, &self.html_limits) {
            Ok(text) => text,
            Err(error) => {
                tracing::error!(pk = %mail.pk, %error, "html to text conversion failed, indexing raw body");
                tracing::debug!(subject = %mail.subject, "problematic mail");
                mail.body.clone()
            }
        }
    }
}

fn address_text(address: &MailAddress) -> String {
    match address.name.as_deref() {
        Some(name) if !name.is_empty() => format!("{name}{JOIN_LIST_BY}{}", address.address),
        _ => address.address.clone(),
    }
}

fn addresses_text(addresses: &[MailAddress]) -> String {
    addresses
        .iter()
        .map(address_text)
        .collect::<Vec<_>>()
        .join(JOIN_LIST_BY)
}
