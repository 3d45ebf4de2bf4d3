use std::path::Path;

use waybill::database::{ConnectionProvider, SqliteFile};
use waybill::migration::{
    DirScriptLoader, EmbeddedScriptLoader, MigrationError, MigrationState, Migrator, VersionPolicy,
};
use waybill::{
    SchemaStatus, VersionStore, WaybillConfig, WaybillDatabase, BASELINE_SCHEMA_VERSION,
    TARGET_SCHEMA_VERSION,
};

fn config_in(dir: &Path) -> WaybillConfig {
    WaybillConfig {
        data_dir: dir.to_string_lossy().to_string(),
        ..Default::default()
    }
}

#[test]
fn startup_bootstraps_and_migrates_to_target() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());

    let (db, report) = WaybillDatabase::prepare(&config).unwrap();

    assert_eq!(report.state, MigrationState::Persisted);
    assert_eq!(report.from_version, Some(BASELINE_SCHEMA_VERSION));
    assert_eq!(report.target_version, TARGET_SCHEMA_VERSION);
    assert_eq!(report.drops_applied, 1);
    assert!(report.drop_failures.is_empty());
    assert_eq!(db.current_version().unwrap(), TARGET_SCHEMA_VERSION);
    assert_eq!(db.status().unwrap(), SchemaStatus::Current);

    let conn = db.provider().acquire().unwrap();
    assert!(conn.column_exists("Veiculo", "ano_fabricacao").unwrap());
    assert!(conn.column_exists("Embalagem", "limite_empilhamento").unwrap());
    assert!(!conn.table_exists("Produto_Importacao").unwrap());
    // seed rows survive the migration
    assert!(conn.table_count("Tipo_Veiculo").unwrap() > 0);
}

#[test]
fn second_startup_is_up_to_date() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());

    WaybillDatabase::prepare(&config).unwrap();
    let (_db, report) = WaybillDatabase::prepare(&config).unwrap();

    assert_eq!(report.state, MigrationState::UpToDate);
    assert_eq!(report.statement_count, 0);
    assert!(report.succeeded());
}

#[test]
fn reapply_policy_leaves_version_record() {
    let dir = tempfile::tempdir().unwrap();
    let config = WaybillConfig {
        persist_version: false,
        ..config_in(dir.path())
    };

    let (db, report) = WaybillDatabase::prepare(&config).unwrap();
    assert_eq!(report.state, MigrationState::DropsApplied);
    assert_eq!(db.current_version().unwrap(), BASELINE_SCHEMA_VERSION);

    // the column already exists now, so the transactional batch fails and rolls back
    let report = db.migrate_with(EmbeddedScriptLoader::bundled(), VersionPolicy::ReapplyEveryBoot);
    assert_eq!(report.state, MigrationState::Halted);
    assert!(matches!(
        report.error,
        Some(MigrationError::TransactionalApply { .. })
    ));
    assert_eq!(db.current_version().unwrap(), BASELINE_SCHEMA_VERSION);
}

#[test]
fn unreadable_script_halts_before_any_change() {
    let dir = tempfile::tempdir().unwrap();
    let scripts = dir.path().join("scripts");
    std::fs::create_dir_all(scripts.join("2.sql")).unwrap();
    std::fs::write(
        scripts.join("1.sql"),
        "ALTER TABLE Veiculo ADD COLUMN renavam TEXT;",
    )
    .unwrap();

    let db = WaybillDatabase::from_config(&config_in(dir.path()));
    db.bootstrap().unwrap();

    let report = db.migrate_with(DirScriptLoader::new(&scripts), VersionPolicy::Persist);
    assert_eq!(report.state, MigrationState::Halted);
    assert!(matches!(
        report.error,
        Some(MigrationError::ScriptReadError { version: 2, .. })
    ));

    let conn = db.provider().acquire().unwrap();
    assert!(!conn.column_exists("Veiculo", "renavam").unwrap());
    assert_eq!(db.current_version().unwrap(), BASELINE_SCHEMA_VERSION);
}

#[test]
fn failing_drop_is_recorded_and_run_completes() {
    let dir = tempfile::tempdir().unwrap();
    let provider = SqliteFile::new(dir.path().join("fleet.db"));
    provider
        .create()
        .unwrap()
        .execute_script("CREATE TABLE Rota (id INTEGER PRIMARY KEY); CREATE TABLE Legado (x INT);")
        .unwrap();
    VersionStore::new(&provider).initialize(4).unwrap();

    const SCRIPTS: &[(u32, &str)] = &[
        (4, "DROP TABLE NaoExiste;\nINSERT INTO Rota (id) VALUES (1);"),
        (5, "-- remove legacy table\nDROP TABLE Legado;"),
    ];
    let report = Migrator::new(&provider, EmbeddedScriptLoader::new(SCRIPTS))
        .with_target(6)
        .run();

    assert_eq!(report.state, MigrationState::Persisted);
    assert_eq!(report.transactional_applied, 1);
    assert_eq!(report.drops_applied, 1);
    assert_eq!(report.drop_failures.len(), 1);
    assert!(!report.drop_failures[0].halts_run());

    let conn = provider.acquire().unwrap();
    assert_eq!(conn.table_count("Rota").unwrap(), 1);
    assert!(!conn.table_exists("Legado").unwrap());
    assert_eq!(
        VersionStore::new(&provider).read_current_version().unwrap(),
        6
    );
}

#[test]
fn drops_run_after_the_whole_transactional_batch() {
    let dir = tempfile::tempdir().unwrap();
    let provider = SqliteFile::new(dir.path().join("fleet.db"));
    provider
        .create()
        .unwrap()
        .execute_script(
            "CREATE TABLE Staging (id INTEGER, nome TEXT);
             CREATE TABLE Archive (id INTEGER, nome TEXT);
             INSERT INTO Staging VALUES (1, 'Caixa');
             INSERT INTO Staging VALUES (2, 'Palete');",
        )
        .unwrap();
    VersionStore::new(&provider).initialize(1).unwrap();

    // the drop is written first but must only run once the copy has committed
    const SCRIPTS: &[(u32, &str)] = &[(
        1,
        "DROP TABLE Staging;\nINSERT INTO Archive SELECT * FROM Staging;",
    )];
    let report = Migrator::new(&provider, EmbeddedScriptLoader::new(SCRIPTS))
        .with_target(2)
        .run();

    assert_eq!(report.state, MigrationState::Persisted);
    assert_eq!(report.transactional_applied, 1);
    assert_eq!(report.drops_applied, 1);
    assert!(report.drop_failures.is_empty());

    let conn = provider.acquire().unwrap();
    assert_eq!(conn.table_count("Archive").unwrap(), 2);
    assert!(!conn.table_exists("Staging").unwrap());
}
