mod common;

use catalog_core::db::migrations::latest_version;
use catalog_core::{
    open_pool_in_memory, CategoryResolver, ImageError, ImageStore, ItemRepository, NewItem,
    RepoError, SqliteItemRepository, ValidationError,
};
use common::Fixture;
use std::sync::Barrier;
use std::thread;

#[test]
fn insert_then_get_by_id_resolves_category_name() {
    let fx = Fixture::new();

    let id = fx
        .repo
        .insert(&NewItem::new("Alice", "people"), Some(b"dummy image data".as_slice()))
        .unwrap();

    let item = fx.repo.get_item_by_id(id).unwrap();
    let expected_image = ImageStore::content_name(b"dummy image data");
    assert_eq!(item.id, id);
    assert_eq!(item.name, "Alice");
    assert_eq!(item.category, "people");
    assert_eq!(item.image_name, expected_image);
    assert_eq!(
        fx.repo.images().read(&expected_image).unwrap(),
        b"dummy image data"
    );

    let conn = fx.pool.get().unwrap();
    let category_id = CategoryResolver::new(&conn).find("people").unwrap().unwrap();
    let (stored_name, stored_category, stored_image): (String, i64, String) = conn
        .query_row(
            "SELECT name, category_id, image_name FROM items WHERE id = ?1;",
            [id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .unwrap();
    assert_eq!(stored_name, "Alice");
    assert_eq!(stored_category, category_id);
    assert_eq!(stored_image, expected_image);
}

#[test]
fn same_category_is_created_once() {
    let fx = Fixture::new();

    let first = fx
        .repo
        .insert(&NewItem::new("jacket", "fashion"), None)
        .unwrap();
    let second = fx
        .repo
        .insert(&NewItem::new("scarf", "fashion"), None)
        .unwrap();

    assert_ne!(first, second);
    assert_eq!(fx.count("categories"), 1);
    assert_eq!(fx.count("items"), 2);
}

#[test]
fn get_items_on_empty_store_returns_empty_vec() {
    let fx = Fixture::new();
    assert!(fx.repo.get_items().unwrap().is_empty());
}

#[test]
fn get_items_returns_joined_rows_in_insert_order() {
    let fx = Fixture::new();
    fx.repo
        .insert(&NewItem::new("used iPhone 16e", "phone"), None)
        .unwrap();
    fx.repo
        .insert(&NewItem::new("Alice", "people"), Some(b"img".as_slice()))
        .unwrap();

    let items = fx.repo.get_items().unwrap();
    let pairs: Vec<_> = items
        .iter()
        .map(|item| (item.name.as_str(), item.category.as_str()))
        .collect();
    assert_eq!(pairs, vec![("used iPhone 16e", "phone"), ("Alice", "people")]);
    assert_eq!(items[0].image_name, "");
}

#[test]
fn keyword_search_matches_exact_name_and_joins_category() {
    let fx = Fixture::new();
    let x = fx.repo.insert(&NewItem::new("X", "letters"), None).unwrap();
    fx.repo.insert(&NewItem::new("Y", "letters"), None).unwrap();
    fx.repo.insert(&NewItem::new("XX", "letters"), None).unwrap();

    let found = fx.repo.get_item_by_keyword("X").unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, x);
    assert_eq!(found[0].category, "letters");

    assert!(fx.repo.get_item_by_keyword("x").unwrap().is_empty());
    assert!(fx.repo.get_item_by_keyword("letters").unwrap().is_empty());
}

#[test]
fn get_item_by_id_missing_returns_not_found() {
    let fx = Fixture::new();
    let err = fx.repo.get_item_by_id(42).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(42)));
    assert!(err.is_not_found());
}

#[test]
fn validation_failure_blocks_insert() {
    let fx = Fixture::new();

    let err = fx
        .repo
        .insert(&NewItem::new("", "people"), Some(b"bytes".as_slice()))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::EmptyName)
    ));
    assert!(err.is_client_error());

    let err = fx.repo.insert(&NewItem::new("Alice", ""), None).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::EmptyCategory)
    ));

    assert_eq!(fx.count("items"), 0);
    assert_eq!(fx.count("categories"), 0);
    assert!(!fx.repo.images().root().exists());
}

#[test]
fn explicit_image_name_is_used_for_storage() {
    let fx = Fixture::new();
    let item = NewItem::new("lamp", "home").with_image_name("lamp.png");

    let id = fx.repo.insert(&item, Some(b"png bytes".as_slice())).unwrap();

    assert_eq!(fx.repo.get_item_by_id(id).unwrap().image_name, "lamp.png");
    assert!(fx.repo.images().exists("lamp.png").unwrap());
}

#[test]
fn empty_image_bytes_store_nothing() {
    let fx = Fixture::new();
    let id = fx
        .repo
        .insert(&NewItem::new("lamp", "home"), Some(b"".as_slice()))
        .unwrap();

    assert_eq!(fx.repo.get_item_by_id(id).unwrap().image_name, "");
    assert!(!fx.repo.images().root().exists());
}

#[test]
fn image_write_failure_fails_insert_without_rows() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("images");
    std::fs::write(&blocker, b"not a directory").unwrap();
    let pool = open_pool_in_memory().unwrap();
    let repo =
        SqliteItemRepository::try_new(pool.clone(), ImageStore::new(&blocker), "items.json")
            .unwrap();

    let err = repo
        .insert(&NewItem::new("Alice", "people"), Some(b"dummy image data".as_slice()))
        .unwrap_err();
    assert!(matches!(err, RepoError::Image(ImageError::Io { .. })));

    let conn = pool.get().unwrap();
    let categories: i64 = conn
        .query_row("SELECT COUNT(*) FROM categories;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(categories, 0);
}

#[test]
fn failed_row_insert_rolls_back_category_and_removes_new_image() {
    let fx = Fixture::new();
    fx.pool
        .get()
        .unwrap()
        .execute_batch(
            "CREATE TRIGGER reject_items BEFORE INSERT ON items
             BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
        )
        .unwrap();

    let err = fx
        .repo
        .insert(&NewItem::new("Alice", "people"), Some(b"dummy image data".as_slice()))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Storage {
            op: "insert_item",
            ..
        }
    ));

    assert_eq!(fx.count("categories"), 0);
    let image_name = ImageStore::content_name(b"dummy image data");
    assert!(!fx.repo.images().exists(&image_name).unwrap());
}

#[test]
fn failed_row_insert_keeps_previously_stored_image() {
    let fx = Fixture::new();
    let first = fx
        .repo
        .insert(&NewItem::new("Alice", "people"), Some(b"shared bytes".as_slice()))
        .unwrap();
    fx.pool
        .get()
        .unwrap()
        .execute_batch(
            "CREATE TRIGGER reject_items BEFORE INSERT ON items
             BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
        )
        .unwrap();

    fx.repo
        .insert(&NewItem::new("Bob", "people"), Some(b"shared bytes".as_slice()))
        .unwrap_err();

    let image_name = fx.repo.get_item_by_id(first).unwrap().image_name;
    assert!(fx.repo.images().exists(&image_name).unwrap());
}

#[test]
fn racing_failed_insert_never_removes_image_of_committed_item() {
    let fx = Fixture::on_disk();
    fx.pool
        .get()
        .unwrap()
        .execute_batch(
            "CREATE TRIGGER reject_a BEFORE INSERT ON items WHEN NEW.name = 'A'
             BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
        )
        .unwrap();

    for round in 0..25 {
        let bytes = format!("same bytes {round}").into_bytes();
        let barrier = Barrier::new(2);
        let (rejected, committed) = thread::scope(|scope| {
            let a = scope.spawn(|| {
                barrier.wait();
                fx.repo
                    .insert(&NewItem::new("A", "people"), Some(bytes.as_slice()))
            });
            let b = scope.spawn(|| {
                barrier.wait();
                fx.repo
                    .insert(&NewItem::new("B", "people"), Some(bytes.as_slice()))
            });
            (a.join().unwrap(), b.join().unwrap())
        });

        assert!(rejected.is_err(), "round {round}");
        let item = fx.repo.get_item_by_id(committed.unwrap()).unwrap();
        assert_eq!(item.image_name, ImageStore::content_name(&bytes));
        assert!(
            fx.repo.images().exists(&item.image_name).unwrap(),
            "round {round}: committed item references missing {}",
            item.image_name
        );
    }
}

#[test]
fn concurrent_inserts_converge_on_one_new_category() {
    let fx = Fixture::on_disk();
    let barrier = Barrier::new(8);

    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|n| {
                let barrier = &barrier;
                let repo = &fx.repo;
                scope.spawn(move || {
                    barrier.wait();
                    repo.insert(&NewItem::new(format!("item {n}"), "shared"), None)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    for result in &results {
        assert!(result.is_ok(), "{result:?}");
    }
    assert_eq!(fx.count("categories"), 1);
    assert_eq!(fx.count("items"), 8);
    assert!(fx
        .repo
        .get_items()
        .unwrap()
        .iter()
        .all(|item| item.category == "shared"));
}

#[test]
fn stored_row_with_empty_name_is_still_listed() {
    let fx = Fixture::new();
    fx.repo
        .insert(&NewItem::new("Alice", "people"), None)
        .unwrap();
    fx.pool
        .get()
        .unwrap()
        .execute(
            "INSERT INTO items (name, category_id, image_name)
             SELECT '', id, '' FROM categories WHERE name = 'people';",
            [],
        )
        .unwrap();

    let items = fx.repo.get_items().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[1].name, "");
    assert_eq!(items[1].category, "people");
}

#[test]
fn get_file_name_returns_configured_name() {
    let fx = Fixture::new();
    assert_eq!(fx.repo.get_file_name(), "items.json");
}

#[test]
fn repository_rejects_uninitialized_pool() {
    let dir = tempfile::tempdir().unwrap();
    let manager = r2d2_sqlite::SqliteConnectionManager::memory();
    let pool = r2d2::Pool::builder().max_size(1).build(manager).unwrap();

    let result = SqliteItemRepository::try_new(pool, ImageStore::new(dir.path()), "items.json");
    match result {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert_eq!(expected_version, latest_version()),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn repository_rejects_pool_missing_required_column() {
    let dir = tempfile::tempdir().unwrap();
    let manager = r2d2_sqlite::SqliteConnectionManager::memory();
    let pool = r2d2::Pool::builder().max_size(1).build(manager).unwrap();
    pool.get()
        .unwrap()
        .execute_batch(&format!(
            "CREATE TABLE categories (id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE);
             CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT NOT NULL, category_id INTEGER);
             PRAGMA user_version = {};",
            latest_version()
        ))
        .unwrap();

    let result = SqliteItemRepository::try_new(pool, ImageStore::new(dir.path()), "items.json");
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredColumn {
            table: "items",
            column: "image_name"
        })
    ));
}
