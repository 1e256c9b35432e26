use std::fs;

use anyhow::Result;
use refedit::archive::Exporter;
use refedit::errors::ArchiveError;
use refedit::{ArchiveConfig, EntryField, FilePayload, Session};
use refedit_test_utils::{ArchiveBuilder, TempDir};
use serde_json::json;

#[tokio::test]
async fn export_and_reimport_through_a_session() -> Result<()> {
    let session = Session::new(ArchiveConfig::default());
    {
        let mut store = session.write().await;
        let id = store.entries()[0].id.clone();
        store.update_entry_field(&id, EntryField::Text, "recolor the car")?;
        let targets = store.add_targets(&id, vec![FilePayload::new("car.png", vec![1, 2, 3])])?;
        store.set_target_model(&id, &targets[0], "Gemini 2.5 Flash Image")?;
    }

    let archive = session.export().await?;
    assert!(archive.filename.starts_with("RefEdit_Dataset_"));
    assert!(archive.filename.ends_with(".zip"));
    assert!(!session.is_exporting());

    let other = Session::new(ArchiveConfig::default());
    let outcome = other.import(archive.bytes).await?;
    assert_eq!(outcome.imported_entries, 1);
    assert!(!other.is_importing());

    let store = other.read().await;
    assert_eq!(store.entries()[0].text, "recolor the car");
    assert_eq!(store.entries()[0].targets[0].model, "Gemini 2.5 Flash Image");
    Ok(())
}

#[tokio::test]
async fn failed_import_keeps_session_contents() -> Result<()> {
    let session = Session::new(ArchiveConfig::default());
    let id = {
        let mut store = session.write().await;
        let id = store.entries()[0].id.clone();
        store.update_entry_field(&id, EntryField::Text, "still here")?;
        id
    };

    let bytes = ArchiveBuilder::new().file("root/other.txt", b"x").build()?;
    let err = session.import(bytes).await.unwrap_err();
    assert!(matches!(err, ArchiveError::NoMetadata));
    assert!(!session.is_importing());

    let store = session.read().await;
    assert_eq!(store.entry(&id).map(|e| e.text.as_str()), Some("still here"));
    Ok(())
}

#[tokio::test]
async fn unlabeled_export_is_refused() -> Result<()> {
    let session = Session::new(ArchiveConfig::default());
    {
        let mut store = session.write().await;
        let id = store.entries()[0].id.clone();
        store.add_targets(&id, vec![FilePayload::new("t.png", vec![9])])?;
    }

    let err = session.export().await.unwrap_err();
    assert!(matches!(err, ArchiveError::MissingModelLabels(ref m) if m.len() == 1));
    assert!(!session.is_exporting());
    Ok(())
}

#[tokio::test]
async fn preview_matches_export_layout() -> Result<()> {
    let session = Session::new(ArchiveConfig::default());
    {
        let mut store = session.write().await;
        store.add_entry();
        let id = store.entries()[1].id.clone();
        store.update_entry_field(&id, EntryField::Text, "second entry only")?;
        store.add_references(&id, vec![FilePayload::new("r.jpeg", vec![1])])?;
    }

    let preview = session.preview().await;
    assert_eq!(preview.total_cases, 1);
    assert_eq!(preview.cases[0].folder, "case_01");
    assert_eq!(preview.cases[0].references, vec!["ref_1.jpeg"]);
    Ok(())
}

#[tokio::test]
async fn dataset_folders_round_trip_on_disk() -> Result<()> {
    let session = Session::new(ArchiveConfig::default());
    {
        let mut store = session.write().await;
        let id = store.entries()[0].id.clone();
        store.update_entry_field(&id, EntryField::Purpose, "folder round trip")?;
        store.add_references(&id, vec![FilePayload::new("in.png", vec![4, 5, 6])])?;
    }

    let dir = TempDir::new()?;
    let archive = {
        let store = session.read().await;
        Exporter::default().export_to_directory(store.entries(), dir.path())?
    };
    let case_dir = dir.path().join(&archive.root_folder).join("case_01");
    assert_eq!(fs::read(case_dir.join("ref_1.png"))?, vec![4, 5, 6]);
    assert!(case_dir.join("metadata.json").is_file());
    assert!(dir.path().join(&archive.root_folder).join("dataset_summary.json").is_file());

    dir.write(".DS_Store", b"finder junk")?;

    let other = Session::new(ArchiveConfig::default());
    let outcome = other.import_directory(dir.path()).await?;
    assert_eq!(outcome.imported_entries, 1);
    assert!(outcome.warnings.is_empty());
    let store = other.read().await;
    assert_eq!(store.entries()[0].purpose, "folder round trip");
    assert_eq!(&*store.entries()[0].references[0].file.bytes, &[4, 5, 6]);
    Ok(())
}

#[tokio::test]
async fn hand_written_folder_imports() -> Result<()> {
    let dir = TempDir::new()?;
    dir.write(
        "set/case_01/metadata.json",
        json!({ "id": "h1", "prompt": "hand made", "targets": ["target_1.png"] })
            .to_string()
            .as_bytes(),
    )?;
    dir.write("set/case_01/target_1.png", &[7, 7])?;

    let session = Session::new(ArchiveConfig::default());
    let outcome = session.import_directory(dir.path()).await?;
    assert_eq!(outcome.imported_entries, 1);
    assert!(outcome.needs_model_labels());
    Ok(())
}
