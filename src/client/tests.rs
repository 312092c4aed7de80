use super::*;
use crate::test_support::{HashEmbedder, RecordingExtractor};
use crate::vector_db::MemoryVectorStore;
use std::path::Path;
use std::time::Duration;

fn test_client(scratch: &Path) -> ReviewIndexClient {
    let mut config = Config::default();
    config.vector_db.backend = "memory".to_string();
    config.indexing.repo_clone_dir = scratch.join("repos");
    config.indexing.lock_dir = scratch.join("locks");
    config.retrieval.limit = 2;

    ReviewIndexClient::with_components(
        config,
        Arc::new(HashEmbedder::default()),
        Arc::new(MemoryVectorStore::new()),
        Arc::new(RecordingExtractor::default()),
    )
}

async fn seed_table(client: &ReviewIndexClient, repo_url: &str, rows: &[(&str, &str, &str)]) {
    let table = client
        .store()
        .create_table(&table_name_for_repo(repo_url), client.embedder.dimension())
        .await
        .unwrap();

    let chunks = rows
        .iter()
        .map(|(file, name, code)| {
            let embedding = client.embedder.embed(code).unwrap();
            CodeChunk::new(repo_url, *file, *name, *code, 1, 2, embedding).unwrap()
        })
        .collect();
    table.add(chunks).await.unwrap();
}

const DIFF: &str = "diff --git a/app.py b/app.py
index 1111111..2222222 100644
--- a/app.py
+++ b/app.py
@@ -1,2 +1,3 @@
 import util
+total = util.add(1, 2)
 print(total)
";

#[test]
fn test_local_repo_path() {
    let scratch = tempfile::tempdir().unwrap();
    let client = test_client(scratch.path());
    let root = scratch.path().join("repos");

    assert_eq!(
        client.local_repo_path("https://github.com/acme/widgets.git"),
        root.join("acme").join("widgets")
    );
    assert_eq!(
        client.local_repo_path("git@github.com:acme/widgets.git"),
        root.join("acme").join("widgets")
    );
    assert_eq!(
        client.local_repo_path("https://github.com/acme/widgets/"),
        root.join("acme").join("widgets")
    );
    assert_eq!(
        client.local_repo_path("https://host/../.."),
        root.join("_").join("_")
    );
}

#[tokio::test]
async fn test_review_context_excludes_the_diffed_file() {
    let scratch = tempfile::tempdir().unwrap();
    let client = test_client(scratch.path());
    let repo_url = "https://github.com/acme/widgets.git";

    seed_table(
        &client,
        repo_url,
        &[
            ("app.py", "main", "def main():\n    print(total)"),
            ("util.py", "add", "def add(a, b):\n    return a + b"),
            ("io.py", "read", "def read(path):\n    return open(path).read()"),
        ],
    )
    .await;

    let contexts = client.review_context(repo_url, DIFF).await.unwrap();
    assert_eq!(contexts.len(), 1);

    let ctx = &contexts[0];
    assert_eq!(ctx.file_diff.path, "app.py");
    assert_eq!(ctx.file_diff.position_for(2), Some(7));
    assert_eq!(ctx.chunks.len(), 2);
    assert!(ctx.chunks.iter().all(|c| c.file_path != "app.py"));
    assert!(ctx.context.contains("Snippet 1: From file"));
    assert!(ctx.context.contains("Snippet 2: From file"));
}

#[tokio::test]
async fn test_review_context_without_index() {
    let scratch = tempfile::tempdir().unwrap();
    let client = test_client(scratch.path());

    let contexts = client
        .review_context("https://github.com/acme/unknown.git", DIFF)
        .await
        .unwrap();
    assert_eq!(contexts.len(), 1);
    assert!(contexts[0].chunks.is_empty());
    assert_eq!(
        contexts[0].context,
        "No relevant code snippets found in the existing codebase."
    );
}

#[tokio::test]
async fn test_review_context_empty_diff() {
    let scratch = tempfile::tempdir().unwrap();
    let client = test_client(scratch.path());
    let contexts = client
        .review_context("https://github.com/acme/widgets.git", "")
        .await
        .unwrap();
    assert!(contexts.is_empty());
}

#[tokio::test]
async fn test_open_or_create_table_reuses_existing() {
    let scratch = tempfile::tempdir().unwrap();
    let client = test_client(scratch.path());
    let repo_url = "https://github.com/acme/widgets.git";

    let created = client.open_or_create_table(repo_url).await.unwrap();
    assert_eq!(created.name(), "acme_widgets");
    created
        .add(vec![
            CodeChunk::new(repo_url, "a.py", "f", "def f(): pass", 1, 1, vec![0.5; 8]).unwrap(),
        ])
        .await
        .unwrap();

    let reopened = client.open_or_create_table(repo_url).await.unwrap();
    assert_eq!(reopened.count_rows(None).await.unwrap(), 1);
}

#[tokio::test]
async fn test_same_repository_operations_are_serialised() {
    let scratch = tempfile::tempdir().unwrap();
    let client = test_client(scratch.path());
    let repo_url = "https://github.com/acme/widgets.git";
    let cancel = CancellationToken::new();

    let held = client.lock_repository(repo_url, &cancel).await.unwrap();

    // a different repository is not blocked
    let other = client
        .lock_repository("https://github.com/acme/other.git", &cancel)
        .await;
    assert!(other.is_ok());

    let waiter_cancel = CancellationToken::new();
    let waiter = {
        let client = client.clone();
        let waiter_cancel = waiter_cancel.clone();
        tokio::spawn(async move {
            client
                .lock_repository(repo_url, &waiter_cancel)
                .await
                .map(|_| ())
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!waiter.is_finished());

    waiter_cancel.cancel();
    let result = waiter.await.unwrap();
    assert!(matches!(
        result,
        Err(RagError::Indexing(IndexingError::Cancelled))
    ));

    drop(held);
    assert!(client.lock_repository(repo_url, &cancel).await.is_ok());
}

#[tokio::test]
async fn test_url_spellings_of_one_repository_share_a_lock() {
    let scratch = tempfile::tempdir().unwrap();
    let client = test_client(scratch.path());
    let held = client
        .lock_repository("https://github.com/acme/widgets.git", &CancellationToken::new())
        .await
        .unwrap();

    let waiter = {
        let client = client.clone();
        tokio::spawn(async move {
            client
                .lock_repository("https://github.com/acme/widgets", &CancellationToken::new())
                .await
                .map(|_| ())
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!waiter.is_finished(), "URL variant should wait for the held lock");

    drop(held);
    assert!(waiter.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_lock_entries_are_released() {
    let scratch = tempfile::tempdir().unwrap();
    let client = test_client(scratch.path());
    let repo_url = "https://github.com/acme/widgets.git";
    let entries = |client: &ReviewIndexClient| client.repo_locks.lock().unwrap().len();

    let held = client
        .lock_repository(repo_url, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(entries(&client), 1);

    let waiter_cancel = CancellationToken::new();
    let waiter = {
        let client = client.clone();
        let waiter_cancel = waiter_cancel.clone();
        tokio::spawn(async move {
            client
                .lock_repository(repo_url, &waiter_cancel)
                .await
                .map(|_| ())
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    waiter_cancel.cancel();
    assert!(waiter.await.unwrap().is_err());
    assert_eq!(entries(&client), 1, "holder still owns the entry");

    drop(held);
    assert_eq!(entries(&client), 0);
}

#[tokio::test]
async fn test_index_repository_clone_failure() {
    let scratch = tempfile::tempdir().unwrap();
    let client = test_client(scratch.path());
    let missing = scratch.path().join("no-such-source").join("repo");

    let result = client
        .index_repository(&missing.to_string_lossy(), &CancellationToken::new())
        .await;
    assert!(matches!(
        result,
        Err(RagError::Git(GitError::CloneFailed { .. }))
    ));
}
