pub mod fields;
pub mod html;
pub mod index;
pub mod mails_index;
pub mod model;
pub mod query;
pub mod tokenizer;

pub use fields::{FieldDescriptor, FieldExtractor, MailField};
pub use html::HtmlToTextLimits;
pub use index::{DocId, InvertedIndex, Posting};
pub use mails_index::{MailsIndex, MailsIndexConfig};
pub use model::{IndexableMail, MailAddress, MailAttachment, MailPk, SearchHit, SearchResult};
pub use query::Bm25;
