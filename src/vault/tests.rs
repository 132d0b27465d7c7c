use super::*;
use crate::fs_interaction::virtual_fs::{InMemoryFS, WrapperFS, FS};
use std::io::Read;
use std::path::Path;
use std::thread;

fn open_vault() -> (Vault<InMemoryFS>, InMemoryFS) {
    let fs = InMemoryFS::default();
    let config = VaultConfig {
        database_path: ":memory:".to_string(),
        ..VaultConfig::default()
    };

    (Vault::open_with_fs(config, fs.clone()).unwrap(), fs)
}

// /vault/movies
// /vault/movies/a.mp4
// /vault/movies/b.mkv
// /vault/movies/clips
// /vault/movies/clips/c.mp4
fn create_movies(fs: &InMemoryFS) {
    fs.create_dir("/vault").unwrap();
    fs.create_dir("/vault/movies").unwrap();
    fs.create_file("/vault/movies/a.mp4", b"aaaa").unwrap();
    fs.create_file("/vault/movies/b.mkv", b"bbb").unwrap();
    fs.create_dir("/vault/movies/clips").unwrap();
    fs.create_file("/vault/movies/clips/c.mp4", b"c").unwrap();
}

fn names(items: &[Item]) -> Vec<&str> {
    items.iter().map(|item| item.name.as_str()).collect()
}

fn root_named<FS: virtual_fs::FS>(vault: &Vault<FS>, user: &User, name: &str) -> Item {
    vault
        .get_root_items(user)
        .unwrap()
        .into_iter()
        .find(|item| item.name == name)
        .unwrap()
}

fn child_named<FS: virtual_fs::FS>(vault: &Vault<FS>, parent: &Item, name: &str) -> Item {
    vault
        .get_children(parent.id)
        .unwrap()
        .into_iter()
        .find(|item| item.name == name)
        .unwrap()
}

// Root first, then every descendant in pre-order.
fn all_items<FS: virtual_fs::FS>(vault: &Vault<FS>, root: &Item) -> Vec<Item> {
    let mut result = vec![root.clone()];
    for child in vault.get_children(root.id).unwrap() {
        result.extend(all_items(vault, &child));
    }
    result
}

struct Users {
    alice: User,
    bob: User,
    carol: User,
}

fn register_users<FS: virtual_fs::FS>(vault: &Vault<FS>) -> Users {
    Users {
        alice: vault.register_user("alice", true).unwrap(),
        bob: vault.register_user("bob", false).unwrap(),
        carol: vault.register_user("carol", false).unwrap(),
    }
}

#[test]
fn add_with_owner_permission() {
    let (vault, fs) = open_vault();
    create_movies(&fs);
    let users = register_users(&vault);

    let count = vault
        .add_item_recursive("/vault/movies", &users.alice, PermissionMode::Owner)
        .unwrap();
    assert_eq!(count, 4);

    let movies = root_named(&vault, &users.alice, "movies");
    assert_eq!(movies.path, "/vault/movies");
    assert_eq!(vault.media_type(movies.id).unwrap(), "directory");
    assert_eq!(
        names(&vault.get_children(movies.id).unwrap()),
        vec!["a.mp4", "b.mkv", "clips"]
    );

    let clips = child_named(&vault, &movies, "clips");
    assert!(vault.accessible(clips.id, &users.alice).unwrap());
    assert!(!vault.accessible(clips.id, &users.bob).unwrap());

    let c = child_named(&vault, &clips, "c.mp4");
    assert_eq!(c.parent_id, Some(clips.id));
    assert_eq!(vault.media_type(c.id).unwrap(), "video");
    assert!(vault.get_root_items(&users.bob).unwrap().is_empty());
}

#[test]
fn add_for_everybody_seeds_one_record_per_user() {
    let (vault, fs) = open_vault();
    create_movies(&fs);
    let users = register_users(&vault);

    let count = vault
        .add_item_recursive("/vault/movies", &users.alice, PermissionMode::parse("ALL"))
        .unwrap();

    let movies = root_named(&vault, &users.bob, "movies");
    let items = all_items(&vault, &movies);
    assert_eq!(items.len(), count);
    for item in &items {
        let (allowed, denied) = vault.item_users(&users.alice, item.id).unwrap();
        assert_eq!(
            allowed,
            vec![users.alice.clone(), users.bob.clone(), users.carol.clone()]
        );
        assert!(denied.is_empty());
    }
}

#[test]
fn add_for_administrators() {
    let (vault, fs) = open_vault();
    create_movies(&fs);
    let users = register_users(&vault);
    let dave = vault.register_user("dave", true).unwrap();

    vault
        .add_item_recursive("/vault/movies", &users.alice, PermissionMode::Administrators)
        .unwrap();
    let movies = root_named(&vault, &users.alice, "movies");

    let (allowed, _) = vault.item_users(&users.alice, movies.id).unwrap();
    assert_eq!(allowed, vec![users.alice.clone(), dave]);
    assert!(!vault.accessible(movies.id, &users.bob).unwrap());
}

#[test]
fn add_single_file() {
    let (vault, fs) = open_vault();
    create_movies(&fs);
    let users = register_users(&vault);

    let count = vault
        .add_item_recursive("/vault/movies/a.mp4", &users.alice, PermissionMode::All)
        .unwrap();
    assert_eq!(count, 1);

    let movie = root_named(&vault, &users.bob, "a.mp4");
    assert!(movie.is_root());
    assert_eq!(movie.mime_type, "video/mp4");
    assert!(vault.get_children(movie.id).unwrap().is_empty());
}

#[test]
fn add_normalizes_paths_and_refuses_duplicates() {
    let (vault, fs) = open_vault();
    create_movies(&fs);
    let users = register_users(&vault);

    vault
        .add_item_recursive("/vault/movies//", &users.alice, PermissionMode::All)
        .unwrap();
    assert_eq!(root_named(&vault, &users.alice, "movies").path, "/vault/movies");

    match vault.add_item_recursive("/vault/movies", &users.alice, PermissionMode::All) {
        Err(VaultError::AlreadyShared { path }) => assert_eq!(path, "/vault/movies"),
        _ => panic!("Must not share the same location twice!"),
    }
    assert_eq!(vault.get_root_items(&users.alice).unwrap().len(), 1);
}

#[test]
fn add_missing_location_changes_nothing() {
    let (vault, fs) = open_vault();
    create_movies(&fs);
    let users = register_users(&vault);

    match vault.add_item_recursive("/vault/series", &users.alice, PermissionMode::All) {
        Err(VaultError::ScanError { path, source }) => {
            assert_eq!(path, "/vault/series");
            assert!(source.is_io_not_found());
        }
        _ => panic!("Missing locations must be reported as scan errors!"),
    }
    assert!(vault.get_root_items(&users.alice).unwrap().is_empty());
}

fn open_disk_vault(test_dir: &Path) -> Vault<WrapperFS> {
    let config = VaultConfig {
        database_path: test_dir.join("vault.sqlite").to_str().unwrap().to_string(),
        ..VaultConfig::default()
    };

    Vault::<WrapperFS>::open(config).unwrap()
}

// <root>/movies/{a.mp4, b.mkv, clips/c.mp4}
fn create_movies_on_disk(root: &Path) -> std::path::PathBuf {
    let movies = root.join("movies");
    std::fs::create_dir_all(movies.join("clips")).unwrap();
    std::fs::write(movies.join("a.mp4"), b"aaaa").unwrap();
    std::fs::write(movies.join("b.mkv"), b"bbb").unwrap();
    std::fs::write(movies.join("clips").join("c.mp4"), b"c").unwrap();

    movies
}

fn assert_nothing_shared(vault: &Vault<WrapperFS>, users: &Users) {
    assert!(vault.get_root_items(&users.alice).unwrap().is_empty());
    assert_eq!(vault.db_access.count_rows(), (0, 0));
}

#[cfg(unix)]
#[test]
fn add_linked_directory_shares_its_content() {
    let test_dir = tempfile::tempdir().unwrap();
    let movies = create_movies_on_disk(test_dir.path());
    let linked = test_dir.path().join("linked");
    std::os::unix::fs::symlink(&movies, &linked).unwrap();
    let linked = linked.to_str().unwrap().to_string();

    let vault = open_disk_vault(test_dir.path());
    let users = register_users(&vault);

    let count = vault
        .add_item_recursive(&linked, &users.alice, PermissionMode::All)
        .unwrap();
    assert_eq!(count, 5);

    let root = root_named(&vault, &users.alice, "linked");
    assert_eq!(root.path, linked);
    assert_eq!(vault.media_type(root.id).unwrap(), "directory");
    assert!(vault.exists(root.id).unwrap());
    assert_eq!(
        names(&vault.explore(root.id, &users.bob).unwrap()),
        vec!["a.mp4", "b.mkv", "clips"]
    );

    let a = child_named(&vault, &root, "a.mp4");
    let mut stream = vault.open_media(a.id, &users.bob).unwrap();
    let mut content = Vec::new();
    stream.reader.read_to_end(&mut content).unwrap();
    assert_eq!(content, b"aaaa");
}

#[cfg(unix)]
#[test]
fn add_with_unreadable_subdirectory_changes_nothing() {
    use std::os::unix::fs::PermissionsExt;

    let test_dir = tempfile::tempdir().unwrap();
    let movies = create_movies_on_disk(test_dir.path());
    let clips = movies.join("clips");
    std::fs::set_permissions(&clips, std::fs::Permissions::from_mode(0o000)).unwrap();
    // Privileged users can list the directory anyway, nothing to check for them.
    let listable = std::fs::read_dir(&clips).is_ok();

    let vault = open_disk_vault(test_dir.path());
    let users = register_users(&vault);
    let movies_path = movies.to_str().unwrap();
    let result = vault.add_item_recursive(movies_path, &users.alice, PermissionMode::All);
    std::fs::set_permissions(&clips, std::fs::Permissions::from_mode(0o755)).unwrap();
    if listable {
        return;
    }

    match result {
        Err(VaultError::ScanError { path, .. }) => assert_eq!(path, movies_path),
        _ => panic!("A partially readable tree must not be shared!"),
    }
    assert_nothing_shared(&vault, &users);
}

#[cfg(unix)]
#[test]
fn add_with_unusable_nested_name_changes_nothing() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let test_dir = tempfile::tempdir().unwrap();
    let movies = create_movies_on_disk(test_dir.path());
    let unusable = movies
        .join("clips")
        .join(OsStr::from_bytes(b"broken-\xff.mp4"));
    std::fs::write(&unusable, b"x").unwrap();

    let vault = open_disk_vault(test_dir.path());
    let users = register_users(&vault);

    let movies_path = movies.to_str().unwrap();
    match vault.add_item_recursive(movies_path, &users.alice, PermissionMode::All) {
        Err(VaultError::ScanError { path, .. }) => assert_eq!(path, movies_path),
        _ => panic!("A tree with unusable names must not be shared!"),
    }
    assert_nothing_shared(&vault, &users);
}

#[test]
fn add_requires_administrator() {
    let (vault, fs) = open_vault();
    create_movies(&fs);
    let users = register_users(&vault);

    match vault.add_item_recursive("/vault/movies", &users.bob, PermissionMode::All) {
        Err(VaultError::NotAdministrator) => (),
        _ => panic!("Only administrators may share locations!"),
    }
    assert!(vault.get_root_items(&users.alice).unwrap().is_empty());
}

#[test]
fn administrators_always_have_access() {
    let (vault, fs) = open_vault();
    create_movies(&fs);
    let users = register_users(&vault);
    let dave = vault.register_user("dave", true).unwrap();

    vault
        .add_item_recursive("/vault/movies", &users.alice, PermissionMode::Owner)
        .unwrap();
    let movies = root_named(&vault, &users.alice, "movies");

    // Dave holds no record at all, alice gets denied explicitly.
    vault
        .remove_permission_recursive(&users.alice, movies.id, &[users.alice.clone()])
        .unwrap();
    for item in all_items(&vault, &movies) {
        assert!(vault.accessible(item.id, &dave).unwrap());
        assert!(vault.accessible(item.id, &users.alice).unwrap());
    }
    assert_eq!(vault.get_root_items(&dave).unwrap().len(), 1);
}

#[test]
fn grant_then_revoke_recursively() {
    let (vault, fs) = open_vault();
    create_movies(&fs);
    let users = register_users(&vault);

    vault
        .add_item_recursive("/vault/movies", &users.alice, PermissionMode::Owner)
        .unwrap();
    let movies = root_named(&vault, &users.alice, "movies");
    let items = all_items(&vault, &movies);

    let written = vault
        .grant_permission_recursive(
            &users.alice,
            movies.id,
            &[users.bob.clone(), users.carol.clone()],
            false,
        )
        .unwrap();
    assert_eq!(written, 8);
    for item in &items {
        assert!(vault.accessible(item.id, &users.bob).unwrap());
        assert!(vault.accessible(item.id, &users.carol).unwrap());
    }

    let written = vault
        .remove_permission_recursive(&users.alice, movies.id, &[users.bob.clone()])
        .unwrap();
    assert_eq!(written, 4);
    for item in &items {
        assert!(!vault.accessible(item.id, &users.bob).unwrap());
        assert!(vault.accessible(item.id, &users.carol).unwrap());
    }
    let (_, denied) = vault.item_users(&users.alice, movies.id).unwrap();
    assert_eq!(denied, vec![users.bob.clone()]);

    // Without overwrite only the denied records are rewritten.
    let written = vault
        .grant_permission_recursive(
            &users.alice,
            movies.id,
            &[users.bob.clone(), users.carol.clone()],
            false,
        )
        .unwrap();
    assert_eq!(written, 4);
    let written = vault
        .grant_permission_recursive(&users.alice, movies.id, &[users.bob.clone()], true)
        .unwrap();
    assert_eq!(written, 4);
}

#[test]
fn grant_on_a_subdirectory_leaves_the_rest_alone() {
    let (vault, fs) = open_vault();
    create_movies(&fs);
    let users = register_users(&vault);

    vault
        .add_item_recursive("/vault/movies", &users.alice, PermissionMode::Owner)
        .unwrap();
    let movies = root_named(&vault, &users.alice, "movies");
    let clips = child_named(&vault, &movies, "clips");
    let c = child_named(&vault, &clips, "c.mp4");

    vault
        .grant_permission_recursive(&users.alice, clips.id, &[users.bob.clone()], false)
        .unwrap();
    assert!(vault.accessible(clips.id, &users.bob).unwrap());
    assert!(vault.accessible(c.id, &users.bob).unwrap());
    assert!(!vault.accessible(movies.id, &users.bob).unwrap());
    assert!(vault.get_root_items(&users.bob).unwrap().is_empty());
}

#[test]
fn permission_changes_require_administrator() {
    let (vault, fs) = open_vault();
    create_movies(&fs);
    let users = register_users(&vault);

    vault
        .add_item_recursive("/vault/movies", &users.alice, PermissionMode::Owner)
        .unwrap();
    let movies = root_named(&vault, &users.alice, "movies");

    match vault.grant_permission_recursive(&users.bob, movies.id, &[users.bob.clone()], true) {
        Err(VaultError::NotAdministrator) => (),
        _ => panic!("Only administrators may grant access!"),
    }
    match vault.remove_permission_recursive(&users.bob, movies.id, &[users.alice.clone()]) {
        Err(VaultError::NotAdministrator) => (),
        _ => panic!("Only administrators may revoke access!"),
    }
    match vault.item_users(&users.bob, movies.id) {
        Err(VaultError::NotAdministrator) => (),
        _ => panic!("Only administrators may list item users!"),
    }
    assert!(!vault.accessible(movies.id, &users.bob).unwrap());
}

#[test]
fn grant_to_unknown_users_fails() {
    let (vault, fs) = open_vault();
    create_movies(&fs);
    let users = register_users(&vault);

    vault
        .add_item_recursive("/vault/movies", &users.alice, PermissionMode::Owner)
        .unwrap();
    let movies = root_named(&vault, &users.alice, "movies");
    let ghost = User {
        id: 4242,
        username: "ghost".to_string(),
        is_administrator: false,
    };

    let result = vault.grant_permission_recursive(&users.alice, movies.id, &[ghost], false);
    assert!(result.unwrap_err().is_not_found());
    let result = vault.grant_permission_recursive(&users.alice, 4242, &[users.bob.clone()], false);
    assert!(result.unwrap_err().is_not_found());
}

#[test]
fn accessible_is_idempotent() {
    let (vault, fs) = open_vault();
    create_movies(&fs);
    let users = register_users(&vault);

    vault
        .add_item_recursive("/vault/movies", &users.alice, PermissionMode::All)
        .unwrap();
    let movies = root_named(&vault, &users.alice, "movies");

    let first = vault.accessible(movies.id, &users.bob).unwrap();
    let second = vault.accessible(movies.id, &users.bob).unwrap();
    assert!(first);
    assert_eq!(first, second);
}

#[test]
fn remove_recursive_then_not_found() {
    let (vault, fs) = open_vault();
    create_movies(&fs);
    let users = register_users(&vault);

    vault
        .add_item_recursive("/vault/movies", &users.alice, PermissionMode::All)
        .unwrap();
    let movies = root_named(&vault, &users.alice, "movies");
    let clips = child_named(&vault, &movies, "clips");
    let c = child_named(&vault, &clips, "c.mp4");
    vault.rate_item(c.id, &users.bob, 5).unwrap();
    vault.suggest_item(&users.bob, users.carol.id, c.id).unwrap();

    match vault.remove_item_recursive(&users.bob, clips.id) {
        Err(VaultError::NotAdministrator) => (),
        _ => panic!("Only administrators may remove items!"),
    }
    assert_eq!(vault.remove_item_recursive(&users.alice, clips.id).unwrap(), 2);

    for id in &[clips.id, c.id] {
        assert!(vault.get_item(*id).unwrap_err().is_not_found());
        assert!(vault.get_children(*id).unwrap_err().is_not_found());
        assert!(vault.accessible(*id, &users.bob).unwrap_err().is_not_found());
        assert!(vault.rating_summary(*id, &users.bob).unwrap_err().is_not_found());
    }
    assert!(vault.suggestions_for(&users.carol, None).unwrap().is_empty());
    assert_eq!(
        names(&vault.get_children(movies.id).unwrap()),
        vec!["a.mp4", "b.mkv"]
    );

    // Removing the root empties the vault.
    assert_eq!(vault.remove_item_recursive(&users.alice, movies.id).unwrap(), 3);
    assert!(vault.get_root_items(&users.alice).unwrap().is_empty());
    assert!(vault
        .remove_item_recursive(&users.alice, movies.id)
        .unwrap_err()
        .is_not_found());
}

#[test]
fn stale_items_are_removed_on_access() {
    let (vault, fs) = open_vault();
    create_movies(&fs);
    let users = register_users(&vault);

    vault
        .add_item_recursive("/vault/movies", &users.alice, PermissionMode::All)
        .unwrap();
    let movies = root_named(&vault, &users.alice, "movies");
    let clips = child_named(&vault, &movies, "clips");
    let c = child_named(&vault, &clips, "c.mp4");

    fs.remove_file("/vault/movies/clips/c.mp4").unwrap();
    assert!(!vault.exists(c.id).unwrap());
    assert!(vault.exists(clips.id).unwrap());

    match vault.open_item(c.id, &users.bob) {
        Err(VaultError::StaleItem { path }) => assert_eq!(path, "/vault/movies/clips/c.mp4"),
        _ => panic!("Vanished files must be reported as stale!"),
    }
    assert!(vault.get_children(c.id).unwrap_err().is_not_found());
    assert!(vault.accessible(c.id, &users.bob).unwrap_err().is_not_found());
    assert!(vault.open_item(c.id, &users.bob).unwrap_err().is_not_found());
    assert!(vault.get_children(clips.id).unwrap().is_empty());
}

#[test]
fn stale_directories_take_their_children_along() {
    let (vault, fs) = open_vault();
    create_movies(&fs);
    let users = register_users(&vault);

    vault
        .add_item_recursive("/vault/movies", &users.alice, PermissionMode::All)
        .unwrap();
    let movies = root_named(&vault, &users.alice, "movies");
    let clips = child_named(&vault, &movies, "clips");
    let c = child_named(&vault, &clips, "c.mp4");

    fs.remove_file("/vault/movies/clips/c.mp4").unwrap();
    fs.remove_dir("/vault/movies/clips").unwrap();

    assert!(vault.explore(clips.id, &users.alice).unwrap_err().is_not_found());
    assert!(vault.get_item(c.id).unwrap_err().is_not_found());
    assert_eq!(
        names(&vault.explore(movies.id, &users.alice).unwrap()),
        vec!["a.mp4", "b.mkv"]
    );
}

#[test]
fn open_media_streams_file_content() {
    let (vault, fs) = open_vault();
    create_movies(&fs);
    let users = register_users(&vault);

    vault
        .add_item_recursive("/vault/movies", &users.alice, PermissionMode::Owner)
        .unwrap();
    let movies = root_named(&vault, &users.alice, "movies");
    let a = child_named(&vault, &movies, "a.mp4");

    let mut stream = vault.open_media(a.id, &users.alice).unwrap();
    assert_eq!(stream.mime, "video/mp4");
    assert_eq!(stream.length, 4);
    let mut content = String::new();
    stream.reader.read_to_string(&mut content).unwrap();
    assert_eq!(content, "aaaa");
    assert_eq!(vault.get_item(a.id).unwrap().views, 1);

    match vault.open_media(movies.id, &users.alice) {
        Err(VaultError::NotAFile) => (),
        _ => panic!("Directories can not be streamed!"),
    }
    match vault.open_media(a.id, &users.bob) {
        Err(VaultError::AccessDenied) => (),
        _ => panic!("Must not stream inaccessible files!"),
    }
    match vault.open_media(4242, &users.alice) {
        Err(VaultError::NotFound) => (),
        _ => panic!("Unknown items must be reported as not found!"),
    }
}

#[test]
fn explore_lists_visible_children() {
    let (vault, fs) = open_vault();
    create_movies(&fs);
    let users = register_users(&vault);

    vault
        .add_item_recursive("/vault/movies", &users.alice, PermissionMode::All)
        .unwrap();
    let movies = root_named(&vault, &users.bob, "movies");
    let clips = child_named(&vault, &movies, "clips");
    let a = child_named(&vault, &movies, "a.mp4");
    vault
        .remove_permission_recursive(&users.alice, clips.id, &[users.bob.clone()])
        .unwrap();

    assert_eq!(
        names(&vault.explore(movies.id, &users.bob).unwrap()),
        vec!["a.mp4", "b.mkv"]
    );
    assert_eq!(
        names(&vault.explore(movies.id, &users.alice).unwrap()),
        vec!["a.mp4", "b.mkv", "clips"]
    );
    match vault.explore(clips.id, &users.bob) {
        Err(VaultError::AccessDenied) => (),
        _ => panic!("Must not explore inaccessible directories!"),
    }
    match vault.explore(a.id, &users.bob) {
        Err(VaultError::NotADirectory) => (),
        _ => panic!("Files can not be explored!"),
    }
}

#[test]
fn view_item_counts_views() {
    let (vault, fs) = open_vault();
    create_movies(&fs);
    let users = register_users(&vault);

    vault
        .add_item_recursive("/vault/movies", &users.alice, PermissionMode::All)
        .unwrap();
    let movies = root_named(&vault, &users.alice, "movies");
    let b = child_named(&vault, &movies, "b.mkv");

    vault.view_item(b.id, &users.bob).unwrap();
    let b = vault.view_item(b.id, &users.carol).unwrap();
    assert_eq!(b.views, 2);
}

#[test]
fn ratings_are_clamped_and_summarized() {
    let (vault, fs) = open_vault();
    create_movies(&fs);
    let users = register_users(&vault);

    vault
        .add_item_recursive("/vault/movies", &users.alice, PermissionMode::All)
        .unwrap();
    let movies = root_named(&vault, &users.alice, "movies");
    let a = child_named(&vault, &movies, "a.mp4");
    let b = child_named(&vault, &movies, "b.mkv");

    assert_eq!(vault.rate_item(a.id, &users.bob, 15).unwrap(), 10);
    assert_eq!(vault.rate_item(a.id, &users.carol, -3).unwrap(), 0);
    assert_eq!(
        vault.rating_summary(a.id, &users.bob).unwrap(),
        Some(RatingSummary {
            average: 5.0,
            count: 2
        })
    );

    // A second rating replaces the first one.
    vault.rate_item(a.id, &users.carol, 4).unwrap();
    assert_eq!(
        vault.rating_summary(a.id, &users.bob).unwrap(),
        Some(RatingSummary {
            average: 7.0,
            count: 2
        })
    );
    assert_eq!(vault.rating_summary(b.id, &users.bob).unwrap(), None);

    // Ratings of an item are as private as the item itself.
    vault
        .remove_permission_recursive(&users.alice, a.id, &[users.carol.clone()])
        .unwrap();
    match vault.rating_summary(a.id, &users.carol) {
        Err(VaultError::AccessDenied) => (),
        _ => panic!("Must not summarize ratings of inaccessible items!"),
    }
    assert!(vault.rating_summary(a.id, &users.alice).unwrap().is_some());
}

#[test]
fn suggestions_need_access_of_the_sender() {
    let (vault, fs) = open_vault();
    create_movies(&fs);
    let users = register_users(&vault);

    vault
        .add_item_recursive("/vault/movies", &users.alice, PermissionMode::Owner)
        .unwrap();
    let movies = root_named(&vault, &users.alice, "movies");
    let a = child_named(&vault, &movies, "a.mp4");

    match vault.suggest_item(&users.bob, users.carol.id, a.id) {
        Err(VaultError::AccessDenied) => (),
        _ => panic!("Must not suggest inaccessible items!"),
    }
    assert!(vault
        .suggest_item(&users.alice, 4242, a.id)
        .unwrap_err()
        .is_not_found());

    let suggestion = vault.suggest_item(&users.alice, users.bob.id, a.id).unwrap();
    assert_eq!(suggestion.from_user_id, users.alice.id);
    assert_eq!(
        vault.suggestions_for(&users.bob, None).unwrap(),
        vec![suggestion]
    );
    // Bob can not see the item yet.
    assert!(vault.suggested_items(&users.bob).unwrap().is_empty());

    vault
        .grant_permission_recursive(&users.alice, a.id, &[users.bob.clone()], false)
        .unwrap();
    assert_eq!(names(&vault.suggested_items(&users.bob).unwrap()), vec!["a.mp4"]);
}

#[test]
fn suggestions_default_to_fifteen() {
    let (vault, fs) = open_vault();
    create_movies(&fs);
    let users = register_users(&vault);

    vault
        .add_item_recursive("/vault/movies", &users.alice, PermissionMode::All)
        .unwrap();
    let movies = root_named(&vault, &users.alice, "movies");
    for _ in 0..20 {
        vault.suggest_item(&users.alice, users.bob.id, movies.id).unwrap();
    }

    assert_eq!(vault.suggestions_for(&users.bob, None).unwrap().len(), 15);
    assert_eq!(vault.suggestions_for(&users.bob, Some(3)).unwrap().len(), 3);
    assert_eq!(vault.suggested_items(&users.bob).unwrap().len(), 1);
}

#[test]
fn latest_items_respect_access() {
    let (vault, fs) = open_vault();
    create_movies(&fs);
    let users = register_users(&vault);

    vault
        .add_item_recursive("/vault/movies", &users.alice, PermissionMode::All)
        .unwrap();
    let movies = root_named(&vault, &users.alice, "movies");
    let clips = child_named(&vault, &movies, "clips");

    assert_eq!(
        names(&vault.latest_items(&users.bob, 10).unwrap()),
        vec!["c.mp4", "b.mkv", "a.mp4"]
    );
    vault
        .remove_permission_recursive(&users.alice, clips.id, &[users.bob.clone()])
        .unwrap();
    assert_eq!(
        names(&vault.latest_items(&users.bob, 10).unwrap()),
        vec!["b.mkv", "a.mp4"]
    );
    assert_eq!(vault.latest_items(&users.alice, 2).unwrap().len(), 2);
}

#[test]
fn manage_users() {
    let (vault, fs) = open_vault();
    create_movies(&fs);
    let users = register_users(&vault);

    assert!(vault.register_user("bob", true).is_err());
    assert_eq!(vault.get_user_by_name("carol").unwrap(), users.carol);
    assert!(vault.get_user_by_name("dave").unwrap_err().is_not_found());
    assert_eq!(vault.list_users().unwrap().len(), 3);

    match vault.set_administrator(&users.bob, users.bob.id, true) {
        Err(VaultError::NotAdministrator) => (),
        _ => panic!("Only administrators may promote users!"),
    }
    let bob = vault
        .set_administrator(&users.alice, users.bob.id, true)
        .unwrap();
    assert!(bob.is_administrator);
    assert_eq!(vault.get_user(bob.id).unwrap(), bob);

    vault
        .add_item_recursive("/vault/movies", &users.alice, PermissionMode::All)
        .unwrap();
    let movies = root_named(&vault, &users.alice, "movies");

    match vault.delete_user(&users.carol, bob.id) {
        Err(VaultError::NotAdministrator) => (),
        _ => panic!("Only administrators may delete users!"),
    }
    vault.delete_user(&users.alice, users.carol.id).unwrap();
    let (allowed, denied) = vault.item_users(&users.alice, movies.id).unwrap();
    assert_eq!(allowed, vec![users.alice.clone(), bob]);
    assert!(denied.is_empty());
    assert!(vault.get_user(users.carol.id).unwrap_err().is_not_found());
}

#[test]
fn normalize_paths() {
    assert_eq!(normalize_path("/vault/movies/"), "/vault/movies");
    assert_eq!(normalize_path("/vault/movies"), "/vault/movies");
    assert_eq!(normalize_path("///"), "/");
    assert_eq!(normalize_path("movies/"), "movies");
}

fn create_tree_on_disk(root: &Path, name: &str, files: usize) -> String {
    let dir = root.join(name);
    std::fs::create_dir(&dir).unwrap();
    std::fs::create_dir(dir.join("extras")).unwrap();
    for i in 0..files {
        std::fs::write(dir.join(format!("{:02}.mp3", i)), b"x").unwrap();
        std::fs::write(dir.join("extras").join(format!("{:02}.jpg", i)), b"y").unwrap();
    }

    dir.to_str().unwrap().to_string()
}

#[test]
fn concurrent_handles_keep_trees_consistent() {
    let test_dir = tempfile::tempdir().unwrap();
    let media_dir = test_dir.path().join("media");
    std::fs::create_dir(&media_dir).unwrap();
    let config = VaultConfig {
        database_path: test_dir
            .path()
            .join("vault.sqlite")
            .to_str()
            .unwrap()
            .to_string(),
        busy_timeout_ms: 30_000,
        ..VaultConfig::default()
    };

    let vault = Vault::<WrapperFS>::open(config).unwrap();
    let alice = vault.register_user("alice", true).unwrap();
    let bob = vault.register_user("bob", false).unwrap();
    let paths: Vec<_> = (0..4)
        .map(|i| create_tree_on_disk(&media_dir, &format!("tree{}", i), 10))
        .collect();

    // Every worker shares its own tree and toggles bob's access a few times.
    let workers: Vec<_> = paths
        .iter()
        .cloned()
        .map(|path| {
            let handle = vault.open_handle().unwrap();
            let alice = alice.clone();
            let bob = bob.clone();
            thread::spawn(move || {
                let count = handle
                    .add_item_recursive(&path, &alice, PermissionMode::Owner)
                    .unwrap();
                let root = handle
                    .get_root_items(&alice)
                    .unwrap()
                    .into_iter()
                    .find(|item| item.path == path)
                    .unwrap();
                for _ in 0..3 {
                    handle
                        .grant_permission_recursive(&alice, root.id, &[bob.clone()], false)
                        .unwrap();
                    handle
                        .remove_permission_recursive(&alice, root.id, &[bob.clone()])
                        .unwrap();
                }
                handle
                    .grant_permission_recursive(&alice, root.id, &[bob.clone()], false)
                    .unwrap();
                count
            })
        })
        .collect();

    // Two handles race for the same location, exactly one of them wins.
    let contested = create_tree_on_disk(&media_dir, "contested", 5);
    let racers: Vec<_> = (0..2)
        .map(|_| {
            let handle = vault.open_handle().unwrap();
            let alice = alice.clone();
            let contested = contested.clone();
            thread::spawn(move || {
                handle.add_item_recursive(&contested, &alice, PermissionMode::All)
            })
        })
        .collect();

    for worker in workers {
        assert_eq!(worker.join().unwrap(), 22);
    }
    let results: Vec<_> = racers
        .into_iter()
        .map(|racer| racer.join().unwrap())
        .collect();
    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
    assert!(results.iter().any(|result| match result {
        Err(VaultError::AlreadyShared { .. }) => true,
        _ => false,
    }));

    let roots = vault.get_root_items(&bob).unwrap();
    assert_eq!(roots.len(), 5);
    for root in &roots {
        for item in all_items(&vault, root) {
            assert!(vault.accessible(item.id, &bob).unwrap());
        }
    }
    let tree = roots.iter().find(|root| root.name == "tree0").unwrap();
    assert_eq!(all_items(&vault, tree).len(), 22);
}
