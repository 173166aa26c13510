//! Tests for editing categories and the notifications that follow.

use std::io::Write;
use std::sync::Arc;

use arcadia::{
    Category, CategoryChange, CategoryConfig, CategoryError, CategoryStore, ConfigError,
    InMemoryCategoryStore, Library, SaveOutcome,
};
use arcadia_core::MainLoop;
use parking_lot::Mutex;

fn setup(config: CategoryConfig) -> (MainLoop, Library, Arc<Mutex<Vec<CategoryChange>>>) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("arcadia=debug,arcadia_core=debug")
        .with_test_writer()
        .try_init();

    let main_loop = MainLoop::new();
    let library = Library::new(
        Arc::new(InMemoryCategoryStore::new()),
        main_loop.scheduler(),
        config,
    );
    let changes = Arc::new(Mutex::new(Vec::new()));
    let changes_clone = changes.clone();
    library
        .events()
        .categories_changed
        .register(move |change: &CategoryChange| changes_clone.lock().push(change.clone()));
    (main_loop, library, changes)
}

#[test]
fn test_create_rename_delete() {
    let (main_loop, library, changes) = setup(CategoryConfig::default());

    let mut editor = library.new_category_editor();
    let SaveOutcome::Created(id) = editor.save("  Point   and Click ", "genre:adventure").unwrap()
    else {
        panic!("expected a new category");
    };

    // Nothing is delivered until the loop is idle.
    assert!(changes.lock().is_empty());
    main_loop.run_until_idle().unwrap();
    assert_eq!(
        *changes.lock(),
        vec![CategoryChange::Added {
            id,
            name: "Point and Click".into()
        }]
    );

    let stored = library.categories().remove(0);
    let mut editor = library.edit_category(stored);
    assert_eq!(editor.title(), "Configure Point and Click");
    assert_eq!(editor.save("Adventure", "genre:adventure"), Ok(SaveOutcome::Redefined));
    assert!(editor.delete(true).unwrap());
    main_loop.run_until_idle().unwrap();

    assert_eq!(
        changes.lock()[1..],
        [
            CategoryChange::Redefined {
                id,
                old_name: "Point and Click".into(),
                name: "Adventure".into()
            },
            CategoryChange::Removed {
                id,
                name: "Adventure".into()
            },
        ]
    );
    assert!(library.store().categories().is_empty());
    // Each change also asked for a game list refresh.
    assert_eq!(library.events().library_changed.generation_number(), 3);
}

#[test]
fn test_rename_onto_existing_category() {
    let (_main_loop, library, _changes) = setup(CategoryConfig::default());
    library.store().add_category("RPG", "genre:rpg").unwrap();
    let strategy = library.store().add_category("Strategy", "").unwrap();

    let mut editor = library.edit_category(Category::saved(strategy, "Strategy", ""));
    assert_eq!(
        editor.save("RPG", ""),
        Err(CategoryError::Duplicate("RPG".into()))
    );

    // A new category may not take an existing name either.
    let mut editor = library.new_category_editor();
    assert_eq!(
        editor.save("Strategy", ""),
        Err(CategoryError::Duplicate("Strategy".into()))
    );
}

#[test]
fn test_blank_category_uses_default_name() {
    let (_main_loop, library, _changes) = setup(CategoryConfig::default());
    let editor = library.edit_category(Category {
        id: None,
        name: String::new(),
        search: String::new(),
    });
    assert_eq!(editor.category().name, "New Category");
}

#[test]
fn test_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
default_name = "Untitled"
reserved_names = ["all", "favorite", "uncategorized"]
"#
    )
    .unwrap();

    let config = CategoryConfig::load(file.path()).unwrap();
    let (_main_loop, library, _changes) = setup(config);

    let mut editor = library.new_category_editor();
    assert_eq!(editor.title(), "Configure Untitled");
    assert_eq!(
        editor.save("Uncategorized", ""),
        Err(CategoryError::Reserved("Uncategorized".into()))
    );
}

#[test]
fn test_config_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = CategoryConfig::load(dir.path().join("missing.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}
