// tests/orchestrator.rs
mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{article, FakeAdapter};
use news_curator::ingest::types::{FetchOptions, SourceAdapter};
use news_curator::ingest::Orchestrator;
use news_curator::model::Source;

fn orchestrator(adapters: Vec<Arc<FakeAdapter>>, timeout: Duration) -> Orchestrator {
    Orchestrator::new(
        adapters
            .into_iter()
            .map(|a| a as Arc<dyn SourceAdapter>)
            .collect(),
        timeout,
    )
}

#[tokio::test]
async fn one_failing_source_does_not_sink_the_batch() {
    let qiita = FakeAdapter::ok(
        Source::Qiita,
        vec![article(Source::Qiita, "q1", 3, &[]), article(Source::Qiita, "q2", 1, &[])],
    );
    let hn = FakeAdapter::failing(Source::HackerNews);
    let gh = FakeAdapter::ok(Source::GitHub, vec![article(Source::GitHub, "gh-1", 2, &[])]);
    let o = orchestrator(vec![qiita, hn, gh], Duration::from_secs(5));

    let out = o.fetch_all(&[], &FetchOptions::default()).await;

    let ids: Vec<_> = out.articles.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["q1", "gh-1", "q2"], "newest first across sources");
    assert_eq!(out.failed_sources(), vec![Source::HackerNews]);
    assert_eq!(out.source_counts.get(&Source::Qiita), Some(&2));
    assert!(!out.all_failed());
}

#[tokio::test]
async fn every_source_failing_is_reported() {
    let o = orchestrator(
        vec![FakeAdapter::failing(Source::Qiita), FakeAdapter::failing(Source::GitHub)],
        Duration::from_secs(5),
    );
    let out = o.fetch_all(&[Source::Qiita, Source::GitHub], &FetchOptions::default()).await;
    assert!(out.all_failed());
    assert!(out.articles.is_empty());
    let msg = out.into_error().to_string();
    assert!(msg.contains("qiita") && msg.contains("github"), "{msg}");
}

#[tokio::test]
async fn empty_success_is_not_failure() {
    let o = orchestrator(vec![FakeAdapter::ok(Source::Qiita, vec![])], Duration::from_secs(5));
    let out = o.fetch_all(&[Source::Qiita], &FetchOptions::default()).await;
    assert!(!out.all_failed());
    assert!(out.articles.is_empty());
}

#[tokio::test(start_paused = true)]
async fn slow_source_times_out() {
    let slow = FakeAdapter::slow(Source::HackerNews, Duration::from_secs(60));
    let fast = FakeAdapter::ok(Source::Qiita, vec![article(Source::Qiita, "q1", 1, &[])]);
    let o = orchestrator(vec![slow, fast], Duration::from_secs(2));

    let out = o.fetch_all(&[], &FetchOptions::default()).await;
    assert_eq!(out.articles.len(), 1);
    assert_eq!(out.failed_sources(), vec![Source::HackerNews]);
    assert!(out.failures[0].message.contains("timed out"));
}

#[tokio::test]
async fn duplicates_are_dropped_and_equal_times_keep_source_order() {
    let qiita = FakeAdapter::ok(
        Source::Qiita,
        vec![article(Source::Qiita, "same", 5, &[]), article(Source::Qiita, "same", 5, &["dup"])],
    );
    let gh = FakeAdapter::ok(Source::GitHub, vec![article(Source::GitHub, "same", 5, &[])]);
    let hn = FakeAdapter::ok(Source::HackerNews, vec![article(Source::HackerNews, "hn-1", 5, &[])]);
    let o = orchestrator(vec![gh, hn, qiita], Duration::from_secs(5));

    let out = o.fetch_all(&[], &FetchOptions::default()).await;
    let pairs: Vec<_> = out.articles.iter().map(|a| (a.source, a.id.as_str())).collect();
    assert_eq!(
        pairs,
        vec![(Source::Qiita, "same"), (Source::HackerNews, "hn-1"), (Source::GitHub, "same")]
    );
    assert!(out.articles[0].tags.is_empty(), "first occurrence wins");
}

#[tokio::test]
async fn unregistered_source_counts_as_failed() {
    let o = orchestrator(vec![FakeAdapter::ok(Source::Qiita, vec![])], Duration::from_secs(5));
    let out = o.fetch_all(&[Source::GitHub], &FetchOptions::default()).await;
    assert!(out.all_failed());
}
