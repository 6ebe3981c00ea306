//! Integration tests for the crawl engine
//!
//! These drive `Crawler` over a simulated browser, so traversal order, tab
//! handling and report contents can be checked without a real Chromium.

use crate::support::{collect_lines, FakeLiveness, SimElement, SimPort, SimSite, BODY};
use linkscout::crawler::{CrawlError, CrawlOptions, Crawler};
use linkscout::port::{MarkStyle, PortError, TabHandle};
use linkscout::state::OrphanedTab;
use linkscout::{LinkKind, LinkStatus};
use std::time::Duration;

const ROOT: &str = "https://example.com/";

fn fast_options() -> CrawlOptions {
    CrawlOptions {
        menu_settle: Duration::ZERO,
        scroll_settle: Duration::ZERO,
        mark_settle: Duration::ZERO,
        ..CrawlOptions::default()
    }
}

fn targets(records: &[linkscout::LinkRecord]) -> Vec<&str> {
    records.iter().map(|r| r.to_target.as_str()).collect()
}

#[tokio::test]
async fn test_internal_external_and_pdf_targets() {
    let site = SimSite::new()
        .page(
            ROOT,
            &[
                "https://example.com/about",
                "https://other.com",
                "https://example.com/files/doc.pdf",
            ],
        )
        .page("https://example.com/about", &[]);
    let (port, stats) = SimPort::new(site);
    let liveness = FakeLiveness::alive(&["https://other.com"]);
    let mut crawler = Crawler::new(port, liveness.clone(), fast_options());

    let report = crawler.crawl(ROOT, |_: &str| {}).await.unwrap();

    assert_eq!(
        targets(&report.valid),
        vec!["https://example.com/about", "https://other.com"]
    );
    assert_eq!(targets(&report.broken), vec!["https://example.com/files/doc.pdf"]);
    assert_eq!(report.skipped_count(), 0);

    let kinds: Vec<LinkKind> = report.records.iter().map(|r| r.kind).collect();
    assert_eq!(kinds, vec![LinkKind::Internal, LinkKind::External, LinkKind::Pdf]);
    assert!(report
        .records
        .iter()
        .all(|r| r.from_page == "https://example.com" && r.depth == 0));

    // Only PDF and external targets get an HTTP check
    assert_eq!(
        liveness.checked(),
        vec!["https://other.com", "https://example.com/files/doc.pdf"]
    );

    let stats = stats.lock().unwrap();
    assert_eq!(stats.tabs_opened, 1);
    assert_eq!(stats.tabs_closed, 1);
    assert_eq!(
        stats.marks,
        vec![
            MarkStyle::Navigating,
            MarkStyle::Informational,
            MarkStyle::Informational
        ]
    );
}

#[tokio::test]
async fn test_progress_lines_follow_traversal() {
    let site = SimSite::new()
        .page(ROOT, &["https://example.com/about", "https://other.com"])
        .page("https://example.com/about", &["https://example.com/files/a.pdf"]);
    let (port, _stats) = SimPort::new(site);
    let mut crawler = Crawler::new(port, FakeLiveness::alive(&["https://other.com"]), fast_options());
    let (sink, lines) = collect_lines();

    crawler.crawl(ROOT, sink).await.unwrap();

    assert_eq!(
        *lines.lock().unwrap(),
        vec![
            "[PAGE][0] https://example.com",
            " → [INTERNAL] https://example.com/about [OK]",
            "[PAGE][1] https://example.com/about",
            " → [PDF] https://example.com/files/a.pdf [BROKEN]",
            " → [EXTERNAL] https://other.com [OK]",
        ]
    );
}

#[tokio::test]
async fn test_revisits_are_recorded_without_descent() {
    let site = SimSite::new()
        .page(ROOT, &["https://example.com/about"])
        .page(
            "https://example.com/about",
            &["https://example.com/", "https://example.com"],
        );
    let (port, stats) = SimPort::new(site);
    let mut crawler = Crawler::new(port, FakeLiveness::default(), fast_options());

    let output = crawler
        .run(ROOT, Box::new(|_: &str| {}))
        .await
        .unwrap();

    let skipped: Vec<_> = output
        .report
        .records
        .iter()
        .filter(|r| r.status == LinkStatus::SkippedVisited)
        .collect();
    assert_eq!(skipped.len(), 2);
    assert!(skipped
        .iter()
        .all(|r| r.from_page == "https://example.com/about" && r.depth == 1));

    // Revisits never reach a report bucket
    assert_eq!(targets(&output.report.valid), vec!["https://example.com/about"]);
    assert!(output.report.broken.is_empty());

    assert_eq!(output.diagnostics.pages_entered, 2);
    assert_eq!(stats.lock().unwrap().tabs_opened, 1);
}

#[tokio::test]
async fn test_targets_are_deduplicated_per_bucket() {
    let site = SimSite::new()
        .page(ROOT, &["https://example.com/a", "https://example.com/b"])
        .page("https://example.com/a", &["https://other.com"])
        .page(
            "https://example.com/b",
            &["https://other.com", "https://example.com/a/"],
        );
    let (port, _stats) = SimPort::new(site);
    let mut crawler = Crawler::new(port, FakeLiveness::alive(&["https://other.com"]), fast_options());

    let report = crawler.crawl(ROOT, |_: &str| {}).await.unwrap();

    assert_eq!(
        targets(&report.valid),
        vec![
            "https://example.com/a",
            "https://other.com",
            "https://example.com/b"
        ]
    );
    // First write wins: the record from /a is kept
    assert_eq!(report.valid[1].from_page, "https://example.com/a");

    let other_records = report
        .records
        .iter()
        .filter(|r| r.to_target == "https://other.com")
        .count();
    assert_eq!(other_records, 2);
    assert_eq!(report.skipped_count(), 1);
}

#[tokio::test]
async fn test_tabs_are_balanced_on_deep_sites() {
    let site = SimSite::new()
        .page(ROOT, &["https://example.com/1", "https://example.com/x"])
        .page("https://example.com/1", &["https://example.com/2"])
        .page("https://example.com/2", &["https://example.com/3"])
        .page("https://example.com/3", &["https://example.com/1"])
        .page("https://example.com/x", &[]);
    let (port, stats) = SimPort::new(site);
    let mut crawler = Crawler::new(port, FakeLiveness::default(), fast_options());

    let output = crawler
        .run(ROOT, Box::new(|_: &str| {}))
        .await
        .unwrap();

    let depths: Vec<u32> = output.report.records.iter().map(|r| r.depth).collect();
    assert_eq!(depths, vec![0, 1, 2, 3, 0]);
    assert_eq!(output.diagnostics.pages_entered, 5);

    let stats = stats.lock().unwrap();
    assert_eq!(stats.tabs_opened, 4);
    assert_eq!(stats.tabs_closed, 4);
    assert_eq!(stats.max_open_tabs, 4);
}

#[tokio::test]
async fn test_not_found_page_is_broken_but_descended() {
    let site = SimSite::new()
        .page(ROOT, &["https://example.com/gone", "https://example.com/thin"])
        .page_with(
            "https://example.com/thin",
            "Thin",
            "Too short to count.",
            vec![SimElement::link("https://example.com/deeper")],
        )
        .page("https://example.com/deeper", &[]);
    let (port, _stats) = SimPort::new(site);
    let mut crawler = Crawler::new(port, FakeLiveness::default(), fast_options());

    let output = crawler
        .run(ROOT, Box::new(|_: &str| {}))
        .await
        .unwrap();

    assert_eq!(
        targets(&output.report.broken),
        vec!["https://example.com/gone", "https://example.com/thin"]
    );
    assert_eq!(targets(&output.report.valid), vec!["https://example.com/deeper"]);
    assert_eq!(output.diagnostics.pages_entered, 4);
}

#[tokio::test]
async fn test_page_that_never_loads_is_broken_and_not_entered() {
    let site = SimSite::new()
        .page(ROOT, &["https://example.com/slow", "https://example.com/ok"])
        .page("https://example.com/slow", &["https://example.com/hidden"])
        .page("https://example.com/hidden", &[])
        .page("https://example.com/ok", &[])
        .slow("https://example.com/slow");
    let (port, stats) = SimPort::new(site);
    let mut crawler = Crawler::new(port, FakeLiveness::default(), fast_options());

    let output = crawler
        .run(ROOT, Box::new(|_: &str| {}))
        .await
        .unwrap();

    assert_eq!(targets(&output.report.broken), vec!["https://example.com/slow"]);
    assert_eq!(targets(&output.report.valid), vec!["https://example.com/ok"]);
    assert!(!output
        .report
        .records
        .iter()
        .any(|r| r.to_target.contains("hidden")));
    assert_eq!(output.diagnostics.pages_entered, 2);

    let stats = stats.lock().unwrap();
    assert_eq!(stats.tabs_opened, 2);
    assert_eq!(stats.tabs_closed, 2);
}

#[tokio::test]
async fn test_lost_session_keeps_partial_report() {
    let site = SimSite::new()
        .page(
            ROOT,
            &[
                "https://example.com/a",
                "https://example.com/crash",
                "https://example.com/c",
            ],
        )
        .page("https://example.com/a", &[])
        .page("https://example.com/crash", &[])
        .page("https://example.com/c", &[])
        .kills_session("https://example.com/crash");
    let (port, _stats) = SimPort::new(site);
    let mut crawler = Crawler::new(port, FakeLiveness::default(), fast_options());
    let (sink, lines) = collect_lines();

    let failure = crawler.crawl(ROOT, sink).await.unwrap_err();

    assert!(matches!(
        failure.error,
        CrawlError::Port(PortError::SessionLost(_))
    ));
    assert_eq!(targets(&failure.report.valid), vec!["https://example.com/a"]);
    assert_eq!(failure.report.records.len(), 1);
    assert_eq!(failure.diagnostics.pages_entered, 2);

    // The failure itself is left to the caller to report
    assert_eq!(
        *lines.lock().unwrap(),
        vec![
            "[PAGE][0] https://example.com",
            " → [INTERNAL] https://example.com/a [OK]",
            "[PAGE][1] https://example.com/a",
        ]
    );
}

#[tokio::test]
async fn test_max_depth_checks_liveness_instead_of_visiting() {
    let site = SimSite::new()
        .page(ROOT, &["https://example.com/a"])
        .page("https://example.com/a", &["https://example.com/b"])
        .page("https://example.com/b", &["https://example.com/c"]);
    let (port, stats) = SimPort::new(site);
    let liveness = FakeLiveness::alive(&["https://example.com/b"]);
    let options = CrawlOptions {
        max_depth: Some(1),
        ..fast_options()
    };
    let mut crawler = Crawler::new(port, liveness.clone(), options);

    let output = crawler
        .run(ROOT, Box::new(|_: &str| {}))
        .await
        .unwrap();

    assert_eq!(
        targets(&output.report.valid),
        vec!["https://example.com/a", "https://example.com/b"]
    );
    assert_eq!(output.report.valid[1].kind, LinkKind::Internal);
    assert_eq!(liveness.checked(), vec!["https://example.com/b"]);
    assert_eq!(output.diagnostics.pages_entered, 2);
    assert_eq!(stats.lock().unwrap().tabs_opened, 1);
}

#[tokio::test]
async fn test_tab_that_never_opens_falls_back_to_http_check() {
    let site = SimSite::new()
        .page(ROOT, &["https://example.com/popup", "https://example.com/next"])
        .page("https://example.com/popup", &[])
        .page("https://example.com/next", &[])
        .unopenable("https://example.com/popup");
    let (port, stats) = SimPort::new(site);
    let liveness = FakeLiveness::default();
    let mut crawler = Crawler::new(port, liveness.clone(), fast_options());

    let report = crawler.crawl(ROOT, |_: &str| {}).await.unwrap();

    assert_eq!(targets(&report.broken), vec!["https://example.com/popup"]);
    assert_eq!(targets(&report.valid), vec!["https://example.com/next"]);
    assert_eq!(liveness.checked(), vec!["https://example.com/popup"]);

    let stats = stats.lock().unwrap();
    assert_eq!(stats.tabs_opened, 1);
    assert_eq!(stats.tabs_closed, 1);
}

#[tokio::test]
async fn test_redirect_to_visited_page_is_not_entered_twice() {
    let site = SimSite::new()
        .page(ROOT, &["https://example.com/old-home"])
        .redirect("https://example.com/old-home", ROOT);
    let (port, stats) = SimPort::new(site);
    let mut crawler = Crawler::new(port, FakeLiveness::default(), fast_options());

    let output = crawler
        .run(ROOT, Box::new(|_: &str| {}))
        .await
        .unwrap();

    assert_eq!(targets(&output.report.valid), vec!["https://example.com/old-home"]);
    assert_eq!(output.diagnostics.pages_entered, 1);

    let stats = stats.lock().unwrap();
    assert_eq!(stats.tabs_opened, 1);
    assert_eq!(stats.tabs_closed, 1);
}

#[tokio::test]
async fn test_uncheckable_targets_are_skipped() {
    let elements = vec![
        SimElement::link("mailto:team@example.com"),
        SimElement::link("tel:+15551234"),
        SimElement::link("javascript:void(0)"),
        SimElement::button("openMenu(3)"),
        SimElement::link("#top"),
        SimElement::link("https://example.com/#main"),
        SimElement::link("   "),
        SimElement::default(),
    ];
    let site = SimSite::new().page_with(ROOT, "Home", BODY, elements);
    let (port, stats) = SimPort::new(site);
    let liveness = FakeLiveness::default();
    let mut crawler = Crawler::new(port, liveness.clone(), fast_options());

    let output = crawler
        .run(ROOT, Box::new(|_: &str| {}))
        .await
        .unwrap();

    assert!(output.report.records.is_empty());
    assert_eq!(output.diagnostics.skipped.values().sum::<u64>(), 8);
    assert!(liveness.checked().is_empty());
    assert!(stats.lock().unwrap().marks.is_empty());
}

#[tokio::test]
async fn test_onclick_target_is_followed() {
    let site = SimSite::new().page_with(
        ROOT,
        "Home",
        BODY,
        vec![SimElement::button("https://other.com/promo")],
    );
    let (port, _stats) = SimPort::new(site);
    let mut crawler = Crawler::new(
        port,
        FakeLiveness::alive(&["https://other.com/promo"]),
        fast_options(),
    );

    let report = crawler.crawl(ROOT, |_: &str| {}).await.unwrap();

    assert_eq!(targets(&report.valid), vec!["https://other.com/promo"]);
    assert_eq!(report.valid[0].kind, LinkKind::External);
}

#[tokio::test]
async fn test_invalid_start_url_fails_before_browsing() {
    let (port, stats) = SimPort::new(SimSite::new());
    let mut crawler = Crawler::new(port, FakeLiveness::default(), fast_options());

    let failure = crawler.crawl("not a url", |_: &str| {}).await.unwrap_err();

    assert!(matches!(failure.error, CrawlError::StartUrl(_)));
    assert!(failure.report.records.is_empty());
    assert!(stats.lock().unwrap().loads.is_empty());
}

#[tokio::test]
async fn test_subdomains_are_internal() {
    let site = SimSite::new()
        .page(
            ROOT,
            &["https://docs.example.com/guide", "https://example.com.evil.com/"],
        )
        .page("https://docs.example.com/guide", &[]);
    let (port, _stats) = SimPort::new(site);
    let mut crawler = Crawler::new(port, FakeLiveness::default(), fast_options());

    let report = crawler.crawl(ROOT, |_: &str| {}).await.unwrap();

    assert_eq!(report.records[0].kind, LinkKind::Internal);
    assert_eq!(report.records[0].status, LinkStatus::Ok);
    assert_eq!(report.records[1].kind, LinkKind::External);
    assert_eq!(report.records[1].status, LinkStatus::Broken);
}

#[tokio::test]
async fn test_tab_that_cannot_be_activated_is_closed() {
    let site = SimSite::new()
        .page(ROOT, &["https://example.com/a", "https://example.com/b"])
        .page("https://example.com/a", &[])
        .page("https://example.com/b", &[])
        .unswitchable("https://example.com/a");
    let (port, stats) = SimPort::new(site);
    let liveness = FakeLiveness::default();
    let mut crawler = Crawler::new(port, liveness.clone(), fast_options());

    let output = crawler
        .run(ROOT, Box::new(|_: &str| {}))
        .await
        .unwrap();

    // The abandoned target falls back to an HTTP check, which fails here
    assert_eq!(targets(&output.report.broken), vec!["https://example.com/a"]);
    assert_eq!(targets(&output.report.valid), vec!["https://example.com/b"]);
    assert_eq!(liveness.checked(), vec!["https://example.com/a"]);
    assert!(output.diagnostics.orphaned_tabs.is_empty());

    let stats = stats.lock().unwrap();
    assert_eq!(stats.tabs_opened, 2);
    assert_eq!(stats.tabs_closed, 2);
    assert!(stats.loads.iter().all(|url| url != "https://example.com/a"));
}

#[tokio::test]
async fn test_tab_that_cannot_be_closed_is_recorded() {
    let site = SimSite::new()
        .page(ROOT, &["https://example.com/a", "https://example.com/b"])
        .page("https://example.com/a", &[])
        .page("https://example.com/b", &[])
        .unswitchable("https://example.com/a")
        .unclosable("https://example.com/a");
    let (port, stats) = SimPort::new(site);
    let mut crawler = Crawler::new(port, FakeLiveness::default(), fast_options());

    let output = crawler
        .run(ROOT, Box::new(|_: &str| {}))
        .await
        .unwrap();

    assert_eq!(
        output.diagnostics.orphaned_tabs,
        vec![OrphanedTab {
            target: "https://example.com/a".to_string(),
            handle: Some(TabHandle::new("tab-1")),
        }]
    );
    assert_eq!(targets(&output.report.valid), vec!["https://example.com/b"]);

    let stats = stats.lock().unwrap();
    assert_eq!(stats.tabs_opened, 2);
    assert_eq!(stats.tabs_closed, 1);
}

#[tokio::test]
async fn test_unidentified_new_tab_is_recorded() {
    let site = SimSite::new()
        .page(ROOT, &["https://example.com/a", "https://example.com/b"])
        .page("https://example.com/a", &[])
        .page("https://example.com/b", &[])
        .hides_tabs("https://example.com/a");
    let (port, stats) = SimPort::new(site);
    let liveness = FakeLiveness::alive(&["https://example.com/a"]);
    let mut crawler = Crawler::new(port, liveness.clone(), fast_options());

    let output = crawler
        .run(ROOT, Box::new(|_: &str| {}))
        .await
        .unwrap();

    assert_eq!(
        targets(&output.report.valid),
        vec!["https://example.com/a", "https://example.com/b"]
    );
    assert_eq!(liveness.checked(), vec!["https://example.com/a"]);
    assert_eq!(
        output.diagnostics.orphaned_tabs,
        vec![OrphanedTab {
            target: "https://example.com/a".to_string(),
            handle: None,
        }]
    );

    // The /b tab is told apart from the leftover /a tab and closed
    let stats = stats.lock().unwrap();
    assert_eq!(stats.tabs_opened, 2);
    assert_eq!(stats.tabs_closed, 1);
    assert!(stats.loads.iter().all(|url| url != "https://example.com/a"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_crawl_runs_on_spawned_task() {
    let site = SimSite::new()
        .page(ROOT, &["https://example.com/about"])
        .page("https://example.com/about", &["https://other.com"]);
    let (port, stats) = SimPort::new(site);
    let mut crawler = Crawler::new(
        port,
        FakeLiveness::alive(&["https://other.com"]),
        fast_options(),
    );
    let (sink, lines) = collect_lines();

    let handle = tokio::spawn(async move { crawler.run(ROOT, Box::new(sink)).await });
    let output = handle.await.unwrap().unwrap();

    assert_eq!(
        targets(&output.report.valid),
        vec!["https://example.com/about", "https://other.com"]
    );
    assert_eq!(lines.lock().unwrap().len(), 4);
    let stats = stats.lock().unwrap();
    assert_eq!(stats.tabs_opened, stats.tabs_closed);
}
