use anyhow::Result;
use refedit::archive::{import_archive, Exporter};
use refedit::{CollectionStore, EntryField, FilePayload, HandleRegistry};

fn payload(name: &str) -> FilePayload {
    FilePayload::new(name, name.as_bytes().to_vec())
}

#[test]
fn removals_revoke_exactly_their_handles() -> Result<()> {
    let registry = HandleRegistry::new();
    let mut store = CollectionStore::new(registry.clone());

    let id = store.add_entry();
    let refs = store.add_references(&id, vec![payload("a.png"), payload("b.png")])?;
    let targets = store.add_targets(&id, vec![payload("c.png")])?;
    assert_eq!(registry.live_count(), 3);

    store.remove_reference(&id, &refs[0])?;
    assert_eq!(registry.live_count(), 2);

    store.remove_target(&id, &targets[0])?;
    assert_eq!(registry.live_count(), 1);

    store.remove_entry(&id)?;
    assert_eq!(registry.live_count(), 0);
    Ok(())
}

#[test]
fn clones_keep_the_original_displayable() -> Result<()> {
    let registry = HandleRegistry::new();
    let mut store = CollectionStore::new(registry.clone());

    let id = store.add_entry();
    store.update_entry_field(&id, EntryField::Text, "original")?;
    store.add_references(&id, vec![payload("a.png")])?;
    let copy = store.clone_entry(&id)?;
    assert_eq!(registry.live_count(), 1);

    store.remove_entry(&copy)?;
    let original = store.entry(&id).map(|e| &e.references[0].handle);
    assert!(original.map(|h| registry.is_live(h)).unwrap_or(false));

    store.remove_entry(&id)?;
    assert_eq!(registry.live_count(), 0);
    Ok(())
}

#[test]
fn import_releases_the_replaced_collection() -> Result<()> {
    let source_registry = HandleRegistry::new();
    let mut source = CollectionStore::new(source_registry);
    let id = source.add_entry();
    source.update_entry_field(&id, EntryField::Text, "export me")?;
    source.add_references(&id, vec![payload("r.png")])?;
    let archive = Exporter::default().export(source.entries())?;

    let registry = HandleRegistry::new();
    let mut store = CollectionStore::new(registry.clone());
    let old = store.add_entry();
    store.add_references(&old, vec![payload("x.png"), payload("y.png")])?;
    store.add_targets(&old, vec![payload("z.png")])?;
    assert_eq!(registry.live_count(), 3);

    import_archive(&mut store, &archive.bytes)?;
    assert_eq!(registry.live_count(), 1);
    assert!(store.entry(&old).is_none());

    drop(store);
    assert_eq!(registry.live_count(), 0);
    Ok(())
}
