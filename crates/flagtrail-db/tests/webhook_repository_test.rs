//! Integration tests for the webhook configuration store.

use flagtrail_core::error::FlagtrailError;
use flagtrail_core::models::webhook::CreateWebhook;
use flagtrail_core::repository::{Pagination, WebhookRepository};
use flagtrail_db::repository::SurrealWebhookRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

async fn setup() -> SurrealWebhookRepository<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    flagtrail_db::run_migrations(&db).await.unwrap();
    SurrealWebhookRepository::new(db)
}

fn webhook(org: &str, name: &str) -> CreateWebhook {
    CreateWebhook {
        organization_id: org.into(),
        name: name.into(),
        url: format!("https://hooks.example.com/{name}"),
        events: vec!["feature.updated".into()],
        environments: Vec::new(),
    }
}

#[tokio::test]
async fn create_and_get_webhook() {
    let repo = setup().await;

    let created = repo.create(webhook("org", "deploys")).await.unwrap();
    assert_eq!(created.organization_id, "org");
    assert_eq!(created.name, "deploys");
    assert_eq!(created.url, "https://hooks.example.com/deploys");
    assert_eq!(created.events, vec!["feature.updated".to_string()]);
    assert!(created.environments.is_empty());
    assert!(created.enabled);

    let fetched = repo.get_by_id("org", &created.id).await.unwrap();
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn get_webhook_from_other_organization_is_not_found() {
    let repo = setup().await;
    let created = repo.create(webhook("org-a", "deploys")).await.unwrap();

    let err = repo.get_by_id("org-b", &created.id).await.unwrap_err();
    assert!(matches!(err, FlagtrailError::NotFound { .. }));

    let err = repo.get_by_id("org-a", "webhook-missing").await.unwrap_err();
    assert!(matches!(err, FlagtrailError::NotFound { .. }));
}

#[tokio::test]
async fn list_webhooks_paginates_per_organization() {
    let repo = setup().await;
    for name in ["one", "two", "three"] {
        repo.create(webhook("org", name)).await.unwrap();
    }
    repo.create(webhook("other", "four")).await.unwrap();

    let first = repo
        .list("org", Pagination { offset: 0, limit: 2 })
        .await
        .unwrap();
    assert_eq!(first.total, 3);
    assert_eq!(first.items.len(), 2);

    let second = repo
        .list("org", Pagination { offset: 2, limit: 2 })
        .await
        .unwrap();
    assert_eq!(second.total, 3);
    assert_eq!(second.items.len(), 1);
    assert!(
        first
            .items
            .iter()
            .chain(second.items.iter())
            .all(|w| w.organization_id == "org")
    );
}
