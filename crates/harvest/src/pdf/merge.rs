//! Concatenate PDF files into one document

use anyhow::{Context, Result, anyhow};
use lopdf::{Document, Object, ObjectId};
use std::collections::BTreeMap;
use std::path::Path;

/// Write the pages of `documents`, in order, to a single file at `output`.
///
/// Returns the number of pages written. Outlines are dropped; every page is
/// re-parented under one page tree.
pub fn merge_documents(documents: Vec<Document>, output: &Path) -> Result<usize> {
    let mut max_id = 1;
    let mut pages: Vec<(ObjectId, Object)> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for mut doc in documents {
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        for object_id in doc.get_pages().into_values() {
            pages.push((object_id, doc.get_object(object_id)?.to_owned()));
        }
        objects.extend(doc.objects);
    }

    let mut merged = Document::with_version("1.5");
    let mut catalog: Option<(ObjectId, Object)> = None;
    let mut pages_root: Option<(ObjectId, Object)> = None;

    for (object_id, object) in objects {
        match object.type_name().unwrap_or(b"") {
            b"Catalog" => {
                let id = catalog.as_ref().map_or(object_id, |(id, _)| *id);
                catalog = Some((id, object));
            }
            b"Pages" => {
                let mut dictionary = object.as_dict()?.clone();
                if let Some((_, previous)) = &pages_root {
                    dictionary.extend(previous.as_dict()?);
                }
                let id = pages_root.as_ref().map_or(object_id, |(id, _)| *id);
                pages_root = Some((id, Object::Dictionary(dictionary)));
            }
            b"Page" | b"Outlines" | b"Outline" => {}
            _ => {
                merged.objects.insert(object_id, object);
            }
        }
    }

    let (pages_id, pages_object) = pages_root.ok_or_else(|| anyhow!("no page tree found"))?;
    let (catalog_id, catalog_object) = catalog.ok_or_else(|| anyhow!("no catalog found"))?;

    for (object_id, object) in &pages {
        let mut dictionary = object.as_dict()?.clone();
        dictionary.set("Parent", pages_id);
        merged
            .objects
            .insert(*object_id, Object::Dictionary(dictionary));
    }

    let mut pages_dictionary = pages_object.as_dict()?.clone();
    pages_dictionary.set("Count", pages.len() as i64);
    pages_dictionary.set(
        "Kids",
        pages
            .iter()
            .map(|(id, _)| Object::Reference(*id))
            .collect::<Vec<_>>(),
    );
    merged
        .objects
        .insert(pages_id, Object::Dictionary(pages_dictionary));

    let mut catalog_dictionary = catalog_object.as_dict()?.clone();
    catalog_dictionary.set("Pages", pages_id);
    catalog_dictionary.remove(b"Outlines");
    merged
        .objects
        .insert(catalog_id, Object::Dictionary(catalog_dictionary));

    merged.trailer.set("Root", catalog_id);
    merged.max_id = merged.objects.len() as u32;
    merged.renumber_objects();
    merged.compress();
    merged
        .save(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    Ok(pages.len())
}
