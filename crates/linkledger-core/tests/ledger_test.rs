use chrono::NaiveDate;
use linkledger_core::*;
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use tempfile::tempdir;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
}

fn memory_ledger(config: LedgerConfig) -> Ledger<MemoryLinkStore> {
    Ledger::with_store(
        Arc::new(MemoryLinkStore::new()),
        config,
        Arc::new(FixedClock::on(today())),
        MemoryReporter::new(),
    )
    .unwrap()
}

fn redb_ledger(dir: &std::path::Path) -> Ledger<RedbLinkStore> {
    let store = Arc::new(RedbLinkStore::open(dir.join("links.redb")).unwrap());
    Ledger::with_store(
        store,
        LedgerConfig::default().with_backup_dir(dir.join("backups")),
        Arc::new(FixedClock::on(today())),
        MemoryReporter::new(),
    )
    .unwrap()
}

/// Record `url` on `today`, then blacklist it `days_ago` days back.
fn seed_blacklisted<S: LinkStore>(ledger: &Ledger<S>, url: &str, days_ago: u32, reason: &str) {
    ledger.record([url], None).unwrap();
    let mark = BlacklistMark::new(days_before(today(), days_ago), reason);
    ledger
        .store()
        .set_blacklist(&hash_url(url), Some(mark))
        .unwrap()
        .expect("link was just recorded");
}

/// Two links per age in {1, 2, 7, 14}; the 14-day pair is `not_interested`.
fn seed_scenario<S: LinkStore>(ledger: &Ledger<S>) {
    for days_ago in [1u32, 2, 7, 14] {
        let reason = if days_ago == 14 { "not_interested" } else { "read" };
        for n in 0..2 {
            let url = format!("https://site{}.example/{}d/{}", n, days_ago, n);
            seed_blacklisted(ledger, &url, days_ago, reason);
        }
    }
}

fn blacklisted_hashes<S: LinkStore>(ledger: &Ledger<S>) -> BTreeMap<String, (NaiveDate, String)> {
    ledger
        .store()
        .list_links(LinkFilter::new().blacklisted())
        .unwrap()
        .into_iter()
        .filter_map(|l| {
            let mark = l.blacklist?;
            Some((l.url_hash, (mark.date, mark.reason)))
        })
        .collect()
}

// ── Identity ─────────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn prop_case_and_fragment_do_not_change_identity(
        host in "[a-z]{1,10}",
        path in "[a-zA-Z0-9]{1,12}",
        query in "[a-z]{1,5}=[0-9]{1,3}",
        fragment in "[a-zA-Z0-9]{0,8}",
    ) {
        let plain = format!("https://{}.example/{}?{}", host, path, query);
        let shouted = format!("HTTPS://{}.EXAMPLE/{}?{}#{}", host.to_uppercase(), path.to_uppercase(), query, fragment);
        prop_assert_eq!(hash_url(&plain), hash_url(&shouted));
        prop_assert_eq!(extract_domain(&plain), extract_domain(&shouted));
    }

    #[test]
    fn prop_query_is_part_of_identity(
        path in "[a-z0-9]{1,12}",
        a in 0u32..1000,
        b in 0u32..1000,
    ) {
        prop_assume!(a != b);
        let first = format!("https://example.com/{}?id={}", path, a);
        let second = format!("https://example.com/{}?id={}", path, b);
        prop_assert_ne!(hash_url(&first), hash_url(&second));
    }
}

// ── Admission ────────────────────────────────────────────────────────────────

#[test]
fn test_analyze_does_not_mutate_store() {
    let ledger = memory_ledger(LedgerConfig::default().with_domain_blacklist(["spam.example"]));
    seed_scenario(&ledger);
    ledger.record(["https://fresh.example/today"], None).unwrap();

    let before = ledger.export().unwrap();
    let runs_before = ledger.stats().unwrap().total_runs;

    let analysis = ledger
        .analyze([
            "https://fresh.example/today",
            "https://brand-new.example/",
            "https://spam.example/x",
            "https://site0.example/1d/0",
            "not a url",
        ])
        .unwrap();
    assert_eq!(analysis.stats.total, 5);
    assert_eq!(analysis.stats.failed, 1);

    assert_eq!(ledger.export().unwrap(), before);
    assert_eq!(ledger.stats().unwrap().total_runs, runs_before);
}

#[test]
fn test_throttle_window_of_one_day() {
    let ledger = memory_ledger(LedgerConfig::default().with_recent_link_days(1));
    for (url, days_ago) in [
        ("https://a.example/today", 0u32),
        ("https://a.example/yesterday", 1),
        ("https://a.example/older", 2),
    ] {
        let entry = RunEntry {
            url: url.to_string(),
            identity: normalize(url),
            position: 1,
        };
        ledger
            .store()
            .record_run(&NewRun::new(days_before(today(), days_ago), 1), &[entry])
            .unwrap();
    }

    let analysis = ledger
        .analyze([
            "https://a.example/today",
            "https://a.example/yesterday",
            "https://a.example/older",
        ])
        .unwrap();

    assert_eq!(analysis.stats.throttled, 2);
    assert_eq!(analysis.admitted_urls(), vec!["https://a.example/older".to_string()]);
    assert!(analysis
        .blocked
        .iter()
        .all(|b| b.kind == BlockKind::Throttled && b.reason == reasons::RECENTLY_OPENED));
}

#[test]
fn test_analyze_then_blacklist_race_is_caught_by_next_analyze() {
    let ledger = memory_ledger(LedgerConfig::default());
    let entry = RunEntry {
        url: "https://a.example/post".to_string(),
        identity: normalize("https://a.example/post"),
        position: 1,
    };
    ledger
        .store()
        .record_run(&NewRun::new(days_before(today(), 10), 1), &[entry])
        .unwrap();

    let first = ledger.analyze(["https://a.example/post"]).unwrap();
    assert_eq!(first.stats.admitted, 1);

    ledger.blacklist("https://a.example/post", "read").unwrap();
    let second = ledger.analyze(["https://a.example/post"]).unwrap();
    assert_eq!(second.stats.admitted, 0);
    assert_eq!(second.blocked[0].kind, BlockKind::Blacklisted);
}

// ── Recording ────────────────────────────────────────────────────────────────

#[test]
fn test_malformed_entry_does_not_block_batch() {
    let dir = tempdir().unwrap();
    let ledger = redb_ledger(dir.path());

    let report = ledger
        .record(
            ["https://a.example/1", "::not a url::", "https://a.example/3"],
            Some("digest"),
        )
        .unwrap();

    assert_eq!(report.recorded_count, 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].position, 2);
    assert_eq!(ledger.store().count_links(LinkFilter::new()).unwrap(), 2);

    let run = report.run.unwrap();
    assert_eq!(run.opened_links, 2);
    assert_eq!(ledger.store().appearances_for_run(run.id).unwrap().len(), 2);
}

#[test]
fn test_appearance_insert_is_idempotent() {
    let dir = tempdir().unwrap();
    let ledger = redb_ledger(dir.path());
    let report = ledger.record(["https://a.example/1"], None).unwrap();
    let run = report.run.unwrap();
    let link = ledger.store().find_by_hash(&hash_url("https://a.example/1")).unwrap().unwrap();

    let appearance = Appearance {
        link_id: link.id,
        run_id: run.id,
        position: Some(1),
    };
    assert!(!ledger.store().insert_appearance(&appearance).unwrap());
    assert!(!ledger.store().insert_appearance(&appearance).unwrap());
    assert_eq!(ledger.store().appearances_for_link(link.id).unwrap().len(), 1);
}

#[test]
fn test_content_change_detection_is_per_day() {
    let ledger = memory_ledger(LedgerConfig::default());
    assert!(ledger.content_changed("abc").unwrap());

    ledger.record(["https://a.example/1"], Some("abc")).unwrap();
    assert!(!ledger.content_changed("abc").unwrap());
    assert!(ledger.content_changed("def").unwrap());
}

// ── Rewind ───────────────────────────────────────────────────────────────────

#[test]
fn test_preview_windows_match_scenario() {
    let dir = tempdir().unwrap();
    let ledger = redb_ledger(dir.path());
    seed_scenario(&ledger);

    assert_eq!(ledger.preview(3).unwrap().restore_count, 4);
    assert_eq!(ledger.preview(7).unwrap().restore_count, 6);

    let wide = ledger.preview(20).unwrap();
    assert_eq!(wide.restore_count, 8);
    assert_eq!(wide.reason_breakdown.get("read"), Some(&6));
    assert_eq!(wide.reason_breakdown.get("not_interested"), Some(&2));
    assert_eq!(wide.candidates.first().unwrap().days_ago, 1);
    assert_eq!(wide.candidates.last().unwrap().days_ago, 14);
}

#[test]
fn test_rewind_clears_exactly_the_window() {
    let dir = tempdir().unwrap();
    let ledger = redb_ledger(dir.path());
    seed_scenario(&ledger);

    let outcome = ledger.rewind(7, false).unwrap();
    assert_eq!(outcome.restored_count, 6);

    let remaining = ledger.store().list_links(LinkFilter::new().blacklisted()).unwrap();
    assert_eq!(remaining.len(), 2);
    assert!(remaining
        .iter()
        .all(|l| l.blacklisted_date() == Some(days_before(today(), 14))));

    // Restored links are active again and carry no mark
    let restored = ledger
        .store()
        .find_by_hash(&hash_url("https://site0.example/1d/0"))
        .unwrap()
        .unwrap();
    assert!(restored.blacklist.is_none());
}

#[test]
fn test_rewind_includes_blacklists_made_after_preview() {
    let ledger = memory_ledger(LedgerConfig::default());
    seed_scenario(&ledger);

    let preview = ledger.preview(7).unwrap();
    seed_blacklisted(&ledger, "https://late.example/post", 0, "read");
    let outcome = ledger.rewind(7, false).unwrap();

    assert_eq!(outcome.restored_count, preview.restore_count + 1);
}

// ── Backup / Restore ─────────────────────────────────────────────────────────

#[test]
fn test_backup_mutate_restore_returns_original_set() {
    let dir = tempdir().unwrap();
    let ledger = redb_ledger(dir.path());
    seed_scenario(&ledger);
    let original = blacklisted_hashes(&ledger);

    let backup = ledger.backup().unwrap();
    assert!(backup.starts_with(dir.path().join("backups")));

    ledger.rewind(30, false).unwrap();
    assert!(blacklisted_hashes(&ledger).is_empty());

    let restored = ledger.restore(&backup).unwrap();
    assert_eq!(restored.restored_count, 8);
    assert_eq!(restored.total_in_backup, 8);
    assert!(restored.skipped.is_empty());
    assert_eq!(blacklisted_hashes(&ledger), original);
}

#[test]
fn test_restore_into_other_store_reports_unknown_hashes() {
    let dir = tempdir().unwrap();
    let source = redb_ledger(dir.path());
    seed_scenario(&source);
    let backup = source.backup().unwrap();

    let target = memory_ledger(LedgerConfig::default());
    target.record(["https://site0.example/1d/0"], None).unwrap();

    let outcome = target.restore(&backup).unwrap();
    assert_eq!(outcome.restored_count, 1);
    assert_eq!(outcome.skipped.len(), 7);
    assert!(!outcome.skipped.contains(&hash_url("https://site0.example/1d/0")));
}

#[test]
fn test_invalid_snapshot_applies_nothing() {
    let dir = tempdir().unwrap();
    let ledger = redb_ledger(dir.path());
    seed_scenario(&ledger);
    ledger.rewind(30, false).unwrap();

    let bad = dir.path().join("bad.json");
    std::fs::write(&bad, r#"{"backup_date": "x", "total_blacklisted": 1}"#).unwrap();

    let err = ledger.restore(&bad).unwrap_err();
    assert!(matches!(err, LedgerError::SnapshotInvalid { .. }));
    assert!(blacklisted_hashes(&ledger).is_empty());
}

// ── Auto-ager and retention ──────────────────────────────────────────────────

#[test]
fn test_record_runs_age_sweep_first() {
    let ledger = memory_ledger(LedgerConfig::default().with_auto_blacklist(true, 30));
    let entry = RunEntry {
        url: "https://old.example/".to_string(),
        identity: normalize("https://old.example/"),
        position: 1,
    };
    ledger
        .store()
        .record_run(&NewRun::new(days_before(today(), 45), 1), &[entry])
        .unwrap();

    let report = ledger.record(["https://new.example/"], None).unwrap();
    assert_eq!(report.auto_blacklisted_aged, 1);

    let old = ledger.store().find_by_hash(&hash_url("https://old.example/")).unwrap().unwrap();
    assert_eq!(old.blacklist_reason(), Some(reasons::AUTO_AGED));
    assert_eq!(old.blacklisted_date(), Some(today()));
}

#[test]
fn test_cleanup_uses_configured_retention() {
    let dir = tempdir().unwrap();
    let store = Arc::new(RedbLinkStore::open(dir.path().join("links.redb")).unwrap());
    let ledger = Ledger::with_store(
        store,
        LedgerConfig::default().with_retention_days(10),
        Arc::new(FixedClock::on(today())),
        MemoryReporter::new(),
    )
    .unwrap();

    for days_ago in [30u32, 11, 5] {
        let url = format!("https://a.example/{}", days_ago);
        let entry = RunEntry {
            identity: normalize(&url),
            url,
            position: 1,
        };
        ledger
            .store()
            .record_run(&NewRun::new(days_before(today(), days_ago), 1), &[entry])
            .unwrap();
    }

    let outcome = ledger.cleanup(None).unwrap();
    assert_eq!(outcome.runs_deleted, 2);
    assert_eq!(ledger.stats().unwrap().total_runs, 1);
    assert_eq!(ledger.stats().unwrap().total_links, 3);
}

// ── Storage ──────────────────────────────────────────────────────────────────

#[test]
fn test_second_open_is_retryable_and_data_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("links.redb");

    {
        let ledger = Ledger::open(&path, LedgerConfig::default()).unwrap();
        ledger.record(["https://a.example/1"], None).unwrap();

        let err = RedbLinkStore::open(&path).unwrap_err();
        assert!(err.is_retryable());
    }

    let ledger = Ledger::open(&path, LedgerConfig::default()).unwrap();
    assert_eq!(ledger.stats().unwrap().total_links, 1);
}
