use mailsearch_core::{IndexableMail, MailAddress, MailAttachment, MailsIndex, MailsIndexConfig, SearchResult};

fn keys(result: &SearchResult) -> Vec<&str> {
    result.items.iter().map(|hit| hit.key.as_str()).collect()
}

#[test]
fn quarterly_ranks_subject_over_body() {
    let mut index = MailsIndex::default();
    index
        .add_all(&[
            IndexableMail::new("1").with_subject("Quarterly Report").with_body("See attached."),
            IndexableMail::new("2").with_subject("Lunch").with_body("Quarterly numbers look good."),
        ])
        .unwrap();

    let result = index.search("quarterly");
    assert_eq!(keys(&result), vec!["1", "2"]);
    assert!(result.items[0].score > result.items[1].score);
    assert_eq!(result.expanded_terms, vec!["quarterly"]);
}

#[test]
fn subject_boost_beats_body_boost() {
    let mut index = MailsIndex::default();
    index
        .add_all(&[
            IndexableMail::new("Y").with_subject("hello there").with_body("urgent"),
            IndexableMail::new("X").with_subject("urgent").with_body("hello there"),
        ])
        .unwrap();

    assert_eq!(keys(&index.search("urgent")), vec!["X", "Y"]);
}

#[test]
fn removed_then_vacuumed_mail_disappears() {
    let mut index = MailsIndex::default();
    let mut mail = IndexableMail::new("d").with_subject("zanzibar invoice");
    mail.attachments = vec![MailAttachment { name: "zanzibar.pdf".into() }];
    index.add(&mail).unwrap();
    index.add(&IndexableMail::new("other").with_subject("invoice")).unwrap();

    index.remove("d");
    // tombstoned mails never show up, even before a vacuum
    assert!(!keys(&index.search("zanzibar invoice")).contains(&"d"));
    index.vacuum();

    for term in ["zanzibar", "invoice", "zanzibar.pdf"] {
        assert!(!keys(&index.search(term)).contains(&"d"), "{term} still matches");
    }
    assert!(index.expand_term("zanzibar").is_empty());
    assert_eq!(keys(&index.search("invoice")), vec!["other"]);
}

#[test]
fn prefix_queries_expand() {
    let mut index = MailsIndex::default();
    index
        .add_all(&[
            IndexableMail::new("1").with_subject("Reporting pipeline"),
            IndexableMail::new("2").with_subject("Report"),
            IndexableMail::new("3").with_subject("Unrelated"),
        ])
        .unwrap();

    let result = index.search("repo");
    assert_eq!(keys(&result), vec!["2", "1"]);
    assert_eq!(result.expanded_terms, vec!["report", "reporting"]);
}

#[test]
fn addresses_are_searchable() {
    let mut index = MailsIndex::default();
    let mut mail = IndexableMail::new("1").with_subject("hi");
    mail.sender = MailAddress { name: Some("Grace Hopper".into()), address: "grace@navy.mil".into() };
    mail.bcc_recipients = vec![MailAddress { name: None, address: "audit@navy.mil".into() }];
    index.add(&mail).unwrap();

    assert_eq!(keys(&index.search("hopper")), vec!["1"]);
    assert_eq!(keys(&index.search("audit@navy.mil")), vec!["1"]);
}

#[test]
fn html_bodies_are_indexed_as_text() {
    let mut index = MailsIndex::new(MailsIndexConfig::default());
    let mut mail = IndexableMail::new("1").with_body("<p>Meet at <b>noon</b></p><style>.x{color:red}</style>");
    mail.mime_type = Some("text/html".into());
    index.add(&mail).unwrap();

    assert_eq!(keys(&index.search("noon")), vec!["1"]);
    assert!(keys(&index.search("color")).is_empty());
    assert!(index.expand_term("<p").is_empty());
}

#[test]
fn malformed_queries_do_not_panic() {
    let mut index = MailsIndex::default();
    index.add(&IndexableMail::new("1").with_subject("text")).unwrap();
    for query in ["\u{fffd}\u{fffd}", "---", "\u{0}", "\"", "🙂 text 🙂"] {
        let _ = index.search(query);
    }
    assert_eq!(keys(&index.search("🙂 text 🙂")), vec!["1"]);
}
