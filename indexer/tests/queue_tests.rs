use mailsearch_core::{IndexableMail, SearchResult};
use mailsearch_indexer::{
    index_account, AccountKey, AccountQueue, IndexerConfig, IndexerRegistry, IndexerService, PkRef, ProgressStatus,
    Request, Response,
};
use std::time::Duration;
use tokio::sync::mpsc;

fn mail(pk: &str, subject: &str) -> IndexableMail {
    IndexableMail::new(pk).with_subject(subject)
}

fn keys(result: &SearchResult) -> Vec<&str> {
    result.items.iter().map(|hit| hit.key.as_str()).collect()
}

fn queue() -> (AccountQueue, mpsc::UnboundedReceiver<Response>) {
    let (events, rx) = mpsc::unbounded_channel();
    let queue = AccountQueue::spawn(AccountKey::new("alice"), &IndexerConfig::default(), events).unwrap();
    (queue, rx)
}

async fn next_event(rx: &mut mpsc::UnboundedReceiver<Response>) -> Response {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("event channel closed")
}

#[tokio::test]
async fn search_observes_earlier_index_job() {
    let (queue, _events) = queue();
    let indexing = queue.index(Vec::new(), vec![mail("1", "Quarterly report")]).unwrap();
    // enqueued before the indexing reply is awaited
    let search = queue.search("quarterly");

    indexing.wait().await.unwrap();
    let result = search.wait().await;
    assert_eq!(keys(&result), vec!["1"]);
}

#[tokio::test]
async fn removals_apply_before_additions() {
    let (queue, _events) = queue();
    queue.index(Vec::new(), vec![mail("1", "old subject")]).unwrap().wait().await.unwrap();
    queue
        .index(vec!["1".to_string()], vec![mail("1", "fresh subject")])
        .unwrap()
        .wait()
        .await
        .unwrap();

    let stale = queue.search("old").wait().await;
    assert!(stale.items.is_empty());
    assert!(stale.is_empty());
    assert_eq!(keys(&queue.search("fresh").wait().await), vec!["1"]);
}

#[tokio::test]
async fn index_job_reports_progress() {
    let (queue, mut events) = queue();
    queue.index(Vec::new(), vec![mail("1", "hello")]).unwrap().wait().await.unwrap();

    let login = AccountKey::new("alice");
    assert_eq!(
        next_event(&mut events).await,
        Response::ProgressState { key: login.clone(), status: ProgressStatus { indexing: true } }
    );
    assert_eq!(
        next_event(&mut events).await,
        Response::ProgressState { key: login, status: ProgressStatus { indexing: false } }
    );
}

#[tokio::test]
async fn logout_closes_the_queue() {
    let (events, _rx) = mpsc::unbounded_channel();
    let registry = IndexerRegistry::new(IndexerConfig::default(), events);
    let key = AccountKey::new("bob");
    let queue = registry.queue(&key).unwrap();
    assert_eq!(registry.accounts(), vec![key.clone()]);

    assert!(registry.logout(&key));
    assert!(!registry.logout(&key));
    assert!(queue.is_closed());
    assert!(queue.index(Vec::new(), vec![mail("1", "late")]).is_err());
    assert!(queue.search("late").wait().await.is_empty());
    assert!(registry.get(&key).is_none());
}

#[tokio::test]
async fn registry_creates_a_fresh_index_after_logout() {
    let (events, _rx) = mpsc::unbounded_channel();
    let registry = IndexerRegistry::new(IndexerConfig::default(), events);
    let key = AccountKey::new("carol");
    let queue = registry.queue(&key).unwrap();
    queue.index(Vec::new(), vec![mail("1", "kept")]).unwrap().wait().await.unwrap();
    registry.logout(&key);

    let queue = registry.queue(&key).unwrap();
    assert!(!queue.is_closed());
    assert!(queue.search("kept").wait().await.is_empty());
}

#[tokio::test]
async fn bootstrap_submits_chunks() {
    let (queue, _events) = queue();
    let mails = (0..5).map(|i| mail(&i.to_string(), &format!("bootstrap mail{i}")));

    let report = index_account(&queue, mails, 2).await;
    assert_eq!(report.chunks, 3);
    assert_eq!(report.indexed, 5);
    assert!(report.failures.is_empty());
    assert_eq!(queue.search("bootstrap").wait().await.items.len(), 5);
}

#[tokio::test]
async fn timed_out_chunks_are_reported_and_later_chunks_still_run() {
    let (events, _rx) = mpsc::unbounded_channel();
    let config = IndexerConfig { indexing_timeout: Duration::ZERO, ..IndexerConfig::default() };
    let queue = AccountQueue::spawn(AccountKey::new("erin"), &config, events).unwrap();
    // large bodies keep every chunk busy well past a zero deadline
    let body: String = (0..20_000).map(|w| format!("word{w} ")).collect();
    let mails = (0..6).map(|i| mail(&i.to_string(), &format!("bootstrap mail{i}")).with_body(body.clone()));

    let report = index_account(&queue, mails, 2).await;
    assert_eq!(report.chunks, 3);
    assert!(!report.failures.is_empty());
    for failure in &report.failures {
        assert!(failure.starts_with("failed to index mails in 0ms"), "{failure}");
        assert!(failure.contains("(mails portion size: 2)"), "{failure}");
    }
    assert_eq!(report.indexed + 2 * report.failures.len(), 6);

    // the worker kept going after each missed deadline
    assert_eq!(queue.search("bootstrap").wait().await.items.len(), 6);
}

#[tokio::test]
async fn worker_fault_is_reported_and_next_job_runs() {
    let (queue, mut events) = queue();
    let failed = queue.index(Vec::new(), vec![mail("", "no identity")]).unwrap().wait().await;
    assert!(failed.is_err());

    let message = loop {
        match next_event(&mut events).await {
            Response::ErrorMessage { message } => break message,
            Response::ProgressState { .. } => {}
            other => panic!("unexpected event {other:?}"),
        }
    };
    assert!(message.contains("without a pk"), "{message}");

    queue.index(Vec::new(), vec![mail("1", "recovered")]).unwrap().wait().await.unwrap();
    assert_eq!(keys(&queue.search("recovered").wait().await), vec!["1"]);
}

#[tokio::test]
async fn search_for_unknown_account_opens_no_session() {
    let (events, mut rx) = mpsc::unbounded_channel();
    let service = IndexerService::new(IndexerConfig::default(), events);
    for i in 0..20 {
        service.dispatch(Request::Search {
            uid: format!("s{i}"),
            key: AccountKey::new(format!("nobody{i}")),
            query: "anything".into(),
        });
    }
    for _ in 0..20 {
        match next_event(&mut rx).await {
            Response::SearchResult { data, .. } => assert_eq!(data, SearchResult::default()),
            other => panic!("unexpected event {other:?}"),
        }
    }
    assert!(service.registry().accounts().is_empty());
}

#[tokio::test]
async fn bootstrap_stops_on_closed_session() {
    let (queue, _events) = queue();
    queue.close();
    let report = index_account(&queue, vec![mail("1", "a"), mail("2", "b")], 1).await;
    assert_eq!(report.chunks, 0);
    assert_eq!(report.indexed, 0);
}

#[tokio::test]
async fn service_answers_requests() {
    let (events, mut rx) = mpsc::unbounded_channel();
    let service = IndexerService::new(IndexerConfig::default(), events);
    let key = AccountKey::new("dave");

    service.dispatch(Request::Bootstrap);
    assert_eq!(next_event(&mut rx).await, Response::Bootstrapped);

    service.dispatch(Request::Index {
        uid: "i1".into(),
        key: key.clone(),
        remove: vec![PkRef { pk: "missing".into() }],
        add: vec![mail("10", "Quarterly report"), mail("11", "Lunch plans")],
    });
    service.dispatch(Request::Search { uid: "s1".into(), key: key.clone(), query: "report".into() });

    let mut indexed = false;
    let mut found = None;
    while !indexed || found.is_none() {
        match next_event(&mut rx).await {
            Response::IndexingResult { uid } => {
                assert_eq!(uid, "i1");
                indexed = true;
            }
            Response::SearchResult { uid, data } => {
                assert_eq!(uid, "s1");
                found = Some(data);
            }
            Response::ProgressState { .. } => {}
            other => panic!("unexpected event {other:?}"),
        }
    }
    let found = found.unwrap();
    assert_eq!(keys(&found), vec!["10"]);
    assert_eq!(found.expanded_terms, vec!["report".to_string()]);

    service.dispatch(Request::Logout { key: key.clone() });
    assert!(service.registry().get(&key).is_none());
    service.shutdown();
}
