// ABOUTME: Integration tests for comment storage
// ABOUTME: CRUD, edit conflicts, and filtered pagination against in-memory SQLite

use parley_storage::{connect_in_memory, CommentStorage, Filters, NewComment, StorageError};
use pretty_assertions::assert_eq;

fn filters(page: i64, page_size: i64, sort: &str) -> Filters {
    Filters {
        page,
        page_size,
        sort: sort.to_string(),
        sort_safe_list: vec!["id".into(), "author".into(), "-id".into(), "-author".into()],
    }
}

async fn storage_with(comments: &[(&str, &str)]) -> CommentStorage {
    let pool = connect_in_memory().await.unwrap();
    let storage = CommentStorage::new(pool);
    for (content, author) in comments {
        storage
            .insert(&NewComment {
                content: content.to_string(),
                author: author.to_string(),
            })
            .await
            .unwrap();
    }
    storage
}

#[tokio::test]
async fn test_insert_get_delete() {
    let storage = storage_with(&[]).await;

    let created = storage
        .insert(&NewComment {
            content: "First!".into(),
            author: "ana".into(),
        })
        .await
        .unwrap();
    assert_eq!(created.version, 1);

    let fetched = storage.get(created.id).await.unwrap();
    assert_eq!(fetched.content, "First!");

    storage.delete(created.id).await.unwrap();
    assert!(matches!(
        storage.get(created.id).await,
        Err(StorageError::NotFound)
    ));
    assert!(matches!(
        storage.delete(created.id).await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn test_stale_update_is_an_edit_conflict() {
    let storage = storage_with(&[("hello", "ana")]).await;

    let mut first = storage.get(1).await.unwrap();
    let stale = first.clone();

    first.content = "hello again".into();
    let updated = storage.update(&first).await.unwrap();
    assert_eq!(updated.version, 2);

    assert!(matches!(
        storage.update(&stale).await,
        Err(StorageError::EditConflict)
    ));
}

#[tokio::test]
async fn test_list_filters_sorts_and_paginates() {
    let storage = storage_with(&[
        ("rust is great", "zoe"),
        ("go is fine", "ana"),
        ("rust borrow checker", "mia"),
        ("unrelated", "ana"),
    ])
    .await;

    let (rust, meta) = storage.list("rust", "", &filters(1, 10, "-author")).await.unwrap();
    let authors: Vec<_> = rust.iter().map(|c| c.author.as_str()).collect();
    assert_eq!(authors, vec!["zoe", "mia"]);
    assert_eq!(meta.total_records, 2);

    let (page_two, meta) = storage.list("", "", &filters(2, 3, "id")).await.unwrap();
    assert_eq!(page_two.len(), 1);
    assert_eq!(page_two[0].content, "unrelated");
    assert_eq!(meta.current_page, 2);
    assert_eq!(meta.last_page, 2);
    assert_eq!(meta.total_records, 4);

    let (by_author, _) = storage.list("", "ANA", &filters(1, 10, "id")).await.unwrap();
    assert_eq!(by_author.len(), 2);
}

#[tokio::test]
async fn test_list_with_no_matches_has_empty_metadata() {
    let storage = storage_with(&[("hello", "ana")]).await;

    let (comments, meta) = storage
        .list("nothing matches", "", &filters(1, 10, "id"))
        .await
        .unwrap();

    assert!(comments.is_empty());
    assert_eq!(meta, Default::default());
}
