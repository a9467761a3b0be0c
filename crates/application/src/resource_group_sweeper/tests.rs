use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, TimeDelta, TimeZone, Utc};
use tokio::sync::Mutex;

use rg_cleanup_core::{AppError, AppResult};
use rg_cleanup_domain::{
    CREATION_TIMESTAMP_TAG, DO_NOT_DELETE_TAG, ResourceGroup, ResourceTags, RetentionPolicy,
};

use crate::cleanup_ports::{Page, ResourceGroupRepository};

use super::{ResourceGroupSweeper, SweepOptions, SweepReport};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0)
        .single()
        .unwrap_or_else(|| unreachable!())
}

fn group(name: &str, age: Option<TimeDelta>, do_not_delete: bool) -> ResourceGroup {
    let mut tags = ResourceTags::new();
    if let Some(age) = age {
        tags.insert(
            CREATION_TIMESTAMP_TAG.to_owned(),
            Some((now() - age).to_rfc3339_opts(SecondsFormat::Secs, true)),
        );
    }
    if do_not_delete {
        tags.insert(DO_NOT_DELETE_TAG.to_owned(), Some("true".to_owned()));
    }

    ResourceGroup::new(name, Some(tags)).unwrap_or_else(|_| unreachable!())
}

#[derive(Default)]
struct FakeResourceGroupRepository {
    pages: HashMap<Option<String>, Page<ResourceGroup>>,
    failing_cursor: Option<String>,
    failing_deletes: HashSet<String>,
    requested_cursors: Mutex<Vec<Option<String>>>,
    delete_requests: Mutex<Vec<String>>,
}

impl FakeResourceGroupRepository {
    fn with_pages(pages: Vec<Page<ResourceGroup>>) -> Self {
        let mut keyed = HashMap::new();
        let mut cursor = None;
        for page in pages {
            let next = page.next_cursor.clone();
            keyed.insert(cursor, page);
            cursor = next;
        }

        Self {
            pages: keyed,
            ..Self::default()
        }
    }
}

#[async_trait]
impl ResourceGroupRepository for FakeResourceGroupRepository {
    async fn list_page(&self, cursor: Option<&str>) -> AppResult<Page<ResourceGroup>> {
        let cursor = cursor.map(str::to_owned);
        self.requested_cursors.lock().await.push(cursor.clone());

        if cursor.is_some() && cursor == self.failing_cursor {
            return Err(AppError::Upstream("page fetch failed".to_owned()));
        }

        self.pages
            .get(&cursor)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("no page for cursor {cursor:?}")))
    }

    async fn begin_delete(&self, name: &str) -> AppResult<()> {
        self.delete_requests.lock().await.push(name.to_owned());
        if self.failing_deletes.contains(name) {
            return Err(AppError::Forbidden(format!("cannot delete {name}")));
        }
        Ok(())
    }
}

fn build_sweeper(
    repository: Arc<FakeResourceGroupRepository>,
    pattern: &str,
    options: SweepOptions,
) -> ResourceGroupSweeper {
    let policy =
        RetentionPolicy::new(TimeDelta::days(3), pattern).unwrap_or_else(|_| unreachable!());
    ResourceGroupSweeper::new(repository, policy, options)
}

#[tokio::test]
async fn sweep_deletes_only_eligible_groups_across_pages() {
    let repository = Arc::new(FakeResourceGroupRepository::with_pages(vec![
        Page::with_next(
            vec![
                group("kubetest-old", Some(TimeDelta::days(4)), false),
                group("kubetest-new", Some(TimeDelta::days(1)), false),
            ],
            "page-2",
        ),
        Page::last(vec![
            group("kubetest-keep", Some(TimeDelta::days(10)), true),
            group("kubetest-untagged", None, false),
        ]),
    ]));
    let sweeper = build_sweeper(repository.clone(), "", SweepOptions::default());

    let report = sweeper.sweep_at(now()).await;

    assert!(report.is_ok());
    assert_eq!(
        report.unwrap_or_else(|_| unreachable!()),
        SweepReport {
            scanned: 4,
            eligible: 2,
            submitted: 2,
            dry_run_skipped: 0,
            failed: 0,
        }
    );
    assert_eq!(
        *repository.delete_requests.lock().await,
        vec!["kubetest-old".to_owned(), "kubetest-untagged".to_owned()]
    );
    assert_eq!(
        *repository.requested_cursors.lock().await,
        vec![None, Some("page-2".to_owned())]
    );
}

#[tokio::test]
async fn dry_run_never_deletes() {
    let repository = Arc::new(FakeResourceGroupRepository::with_pages(vec![Page::last(
        vec![
            group("kubetest-old", Some(TimeDelta::days(4)), false),
            group("kubetest-untagged", None, false),
        ],
    )]));
    let sweeper = build_sweeper(
        repository.clone(),
        "",
        SweepOptions {
            dry_run: true,
            continue_on_error: true,
        },
    );

    let report = sweeper.sweep_at(now()).await;

    assert!(report.is_ok());
    let report = report.unwrap_or_else(|_| unreachable!());
    assert_eq!(report.eligible, 2);
    assert_eq!(report.dry_run_skipped, 2);
    assert_eq!(report.submitted, 0);
    assert!(repository.delete_requests.lock().await.is_empty());
}

#[tokio::test]
async fn delete_failure_does_not_stop_the_sweep() {
    let mut repository = FakeResourceGroupRepository::with_pages(vec![Page::last(vec![
        group("kubetest-a", None, false),
        group("kubetest-b", None, false),
        group("kubetest-c", None, false),
    ])]);
    repository.failing_deletes = HashSet::from(["kubetest-a".to_owned()]);
    let repository = Arc::new(repository);
    let sweeper = build_sweeper(repository.clone(), "", SweepOptions::default());

    let report = sweeper.sweep_at(now()).await;

    assert!(report.is_ok());
    let report = report.unwrap_or_else(|_| unreachable!());
    assert_eq!(report.failed, 1);
    assert_eq!(report.submitted, 2);
    assert_eq!(repository.delete_requests.lock().await.len(), 3);
}

#[tokio::test]
async fn delete_failure_stops_the_sweep_when_configured() {
    let mut repository = FakeResourceGroupRepository::with_pages(vec![Page::last(vec![
        group("kubetest-a", None, false),
        group("kubetest-b", None, false),
    ])]);
    repository.failing_deletes = HashSet::from(["kubetest-a".to_owned()]);
    let repository = Arc::new(repository);
    let sweeper = build_sweeper(
        repository.clone(),
        "",
        SweepOptions {
            dry_run: false,
            continue_on_error: false,
        },
    );

    let report = sweeper.sweep_at(now()).await;

    assert!(matches!(report, Err(AppError::Forbidden(_))));
    assert_eq!(
        *repository.delete_requests.lock().await,
        vec!["kubetest-a".to_owned()]
    );
}

#[tokio::test]
async fn page_failure_aborts_before_later_pages() {
    let mut repository = FakeResourceGroupRepository::with_pages(vec![
        Page::with_next(vec![group("kubetest-a", None, false)], "page-2"),
        Page::with_next(vec![group("kubetest-b", None, false)], "page-3"),
        Page::last(vec![group("kubetest-c", None, false)]),
    ]);
    repository.failing_cursor = Some("page-2".to_owned());
    let repository = Arc::new(repository);
    let sweeper = build_sweeper(repository.clone(), "", SweepOptions::default());

    let report = sweeper.sweep_at(now()).await;

    assert!(matches!(report, Err(AppError::Upstream(_))));
    assert_eq!(
        *repository.delete_requests.lock().await,
        vec!["kubetest-a".to_owned()]
    );
    assert_eq!(repository.requested_cursors.lock().await.len(), 2);
}

#[tokio::test]
async fn name_pattern_limits_deletions() {
    let repository = Arc::new(FakeResourceGroupRepository::with_pages(vec![Page::last(
        vec![
            group("kubetest-old", Some(TimeDelta::days(4)), false),
            group("capz-old", Some(TimeDelta::days(4)), false),
        ],
    )]));
    let sweeper = build_sweeper(repository.clone(), "kubetest-.+", SweepOptions::default());

    let report = sweeper.sweep_at(now()).await;

    assert!(report.is_ok());
    assert_eq!(
        *repository.delete_requests.lock().await,
        vec!["kubetest-old".to_owned()]
    );
}

#[tokio::test]
async fn invalid_pattern_deletes_nothing() {
    let repository = Arc::new(FakeResourceGroupRepository::with_pages(vec![Page::last(
        vec![group("kubetest-old", None, false)],
    )]));
    let sweeper = build_sweeper(repository.clone(), "kubetest-(", SweepOptions::default());

    let report = sweeper.sweep_at(now()).await;

    assert!(report.is_ok());
    assert_eq!(report.unwrap_or_default().eligible, 0);
    assert!(repository.delete_requests.lock().await.is_empty());
}
