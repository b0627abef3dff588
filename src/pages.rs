//! Page operations on [`PdfFile`]: select, split, delete, rotate, merge.
//!
//! Every restructuring operation rebuilds the page tree as a single flat
//! `/Pages` node. Attributes a page inherits from intermediate nodes
//! (`Resources`, `MediaBox`, `CropBox`, `Rotate`) are first copied onto the
//! page itself, so flattening never changes how a page looks. Objects left
//! unreachable are pruned when the file is saved.
//!
//! Indices are 0-based, as produced by [`crate::range::RangeSpec`].

use crate::document::PdfFile;
use crate::error::TocError;
use crate::output::write_atomic;
use lopdf::{Object, ObjectId};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use tracing::{debug, info};

const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

impl PdfFile {
    /// Keep only `indices`, in that order. Repeated indices duplicate the page.
    ///
    /// The outline is dropped: its destinations may point at removed pages.
    pub fn select(&mut self, indices: &[usize]) -> Result<(), TocError> {
        let current = self.page_list();
        self.check_indices(indices, current.len())?;
        if indices.is_empty() {
            return Err(TocError::InvalidConfig(
                "a PDF needs at least one page".to_string(),
            ));
        }
        self.materialize_inherited(&current)?;

        let mut seen = HashSet::new();
        let mut order = Vec::with_capacity(indices.len());
        for &i in indices {
            let id = current[i];
            if seen.insert(id) {
                order.push(id);
            } else {
                let copy = self.inner.get_object(id).map_err(|e| self.corrupt(e))?.clone();
                order.push(self.inner.add_object(copy));
            }
        }

        self.set_page_order(&order)?;
        self.remove_outline()?;
        info!("Selected {} of {} pages", order.len(), current.len());
        Ok(())
    }

    /// One new document per group (the multi-output form of slicing).
    pub fn split(&self, groups: &[Vec<usize>]) -> Result<Vec<PdfFile>, TocError> {
        groups
            .iter()
            .map(|group| {
                let mut part = self.clone();
                part.select(group)?;
                Ok(part)
            })
            .collect()
    }

    /// Save each of `parts` to the matching entry of `paths`, all or nothing.
    ///
    /// Every part is serialised before anything is written. If a write
    /// fails, the files this call already wrote are removed again.
    pub fn save_all(parts: &mut [PdfFile], paths: &[PathBuf]) -> Result<(), TocError> {
        if parts.len() != paths.len() {
            return Err(TocError::InvalidConfig(format!(
                "{} parts but {} output paths",
                parts.len(),
                paths.len()
            )));
        }
        let encoded = parts
            .iter_mut()
            .map(PdfFile::to_bytes)
            .collect::<Result<Vec<_>, _>>()?;

        let mut written: Vec<&PathBuf> = Vec::with_capacity(paths.len());
        for (path, bytes) in paths.iter().zip(&encoded) {
            if let Err(e) = write_atomic(path, bytes) {
                for done in written {
                    let _ = std::fs::remove_file(done);
                }
                return Err(e);
            }
            written.push(path);
        }
        info!("Wrote {} parts", paths.len());
        Ok(())
    }

    /// Remove `indices`. Removing every page is an error.
    pub fn delete(&mut self, indices: &[usize]) -> Result<(), TocError> {
        let total = self.page_count();
        self.check_indices(indices, total)?;
        let doomed: HashSet<usize> = indices.iter().copied().collect();
        let keep: Vec<usize> = (0..total).filter(|i| !doomed.contains(i)).collect();
        if keep.is_empty() {
            return Err(TocError::InvalidConfig(
                "refusing to delete every page of the document".to_string(),
            ));
        }
        debug!("Deleting {} pages", doomed.len());
        self.select(&keep)
    }

    /// Set an absolute `/Rotate` of `angle` degrees (any multiple of 90,
    /// normalised to 0..360) on `indices`.
    pub fn rotate(&mut self, indices: &[usize], angle: i32) -> Result<(), TocError> {
        if angle % 90 != 0 {
            return Err(TocError::InvalidConfig(format!(
                "rotation must be a multiple of 90 degrees, got {}",
                angle
            )));
        }
        let current = self.page_list();
        self.check_indices(indices, current.len())?;
        let angle = angle.rem_euclid(360);
        let path = self.path().to_path_buf();

        for &i in indices {
            let page = self
                .inner
                .get_dictionary_mut(current[i])
                .map_err(|e| TocError::CorruptPdf {
                    path: path.clone(),
                    detail: format!("page {} unreadable: {}", i + 1, e),
                })?;
            page.set("Rotate", i64::from(angle));
        }
        info!("Rotated {} pages to {}°", indices.len(), angle);
        Ok(())
    }

    /// Append all pages of `other` after the last page.
    pub fn append(&mut self, other: &PdfFile) -> Result<(), TocError> {
        let imported = self.import_pages(other)?;
        let mut order = self.page_list();
        order.extend(imported);
        self.set_page_order(&order)
    }

    /// Insert all pages of `other` after page `after` (1-based; 0 = front).
    pub fn insert(&mut self, other: &PdfFile, after: usize) -> Result<(), TocError> {
        let total = self.page_count();
        if after > total {
            return Err(TocError::PageOutOfRange { page: after, total });
        }
        let imported = self.import_pages(other)?;
        let mut order = self.page_list();
        order.splice(after..after, imported);
        self.set_page_order(&order)
    }

    // ── Helpers ──────────────────────────────────────────────────────────

    fn page_list(&self) -> Vec<ObjectId> {
        self.page_ids().into_values().collect()
    }

    fn check_indices(&self, indices: &[usize], total: usize) -> Result<(), TocError> {
        match indices.iter().copied().find(|&i| i >= total) {
            Some(i) => Err(TocError::PageOutOfRange { page: i + 1, total }),
            None => Ok(()),
        }
    }

    fn corrupt(&self, e: lopdf::Error) -> TocError {
        TocError::CorruptPdf {
            path: self.path().to_path_buf(),
            detail: e.to_string(),
        }
    }

    fn pages_root(&self) -> Result<ObjectId, TocError> {
        self.inner
            .catalog()
            .and_then(|c| c.get(b"Pages"))
            .and_then(Object::as_reference)
            .map_err(|e| self.corrupt(e))
    }

    /// Copy inherited attributes from ancestors onto each page in `pages`.
    fn materialize_inherited(&mut self, pages: &[ObjectId]) -> Result<(), TocError> {
        let mut updates: Vec<(ObjectId, &'static [u8], Object)> = Vec::new();
        for &page_id in pages {
            let page = self.inner.get_dictionary(page_id).map_err(|e| self.corrupt(e))?;
            for key in INHERITABLE {
                if page.has(key) {
                    continue;
                }
                if let Some(value) = self.inherited_value(page_id, key) {
                    updates.push((page_id, key, value));
                }
            }
        }
        let path = self.path().to_path_buf();
        for (page_id, key, value) in updates {
            let page = self
                .inner
                .get_dictionary_mut(page_id)
                .map_err(|e| TocError::CorruptPdf {
                    path: path.clone(),
                    detail: e.to_string(),
                })?;
            page.set(key, value);
        }
        Ok(())
    }

    fn inherited_value(&self, page_id: ObjectId, key: &[u8]) -> Option<Object> {
        let mut visited = HashSet::new();
        let mut node = self.inner.get_dictionary(page_id).ok()?;
        loop {
            let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
            if !visited.insert(parent) {
                return None;
            }
            node = self.inner.get_dictionary(parent).ok()?;
            if let Ok(value) = node.get(key) {
                return Some(value.clone());
            }
        }
    }

    /// Make the root `/Pages` node list exactly `order`.
    fn set_page_order(&mut self, order: &[ObjectId]) -> Result<(), TocError> {
        let root = self.pages_root()?;
        for &id in order {
            if let Ok(page) = self.inner.get_dictionary_mut(id) {
                page.set("Parent", root);
            }
        }
        let kids: Vec<Object> = order.iter().map(|&id| Object::Reference(id)).collect();
        let path = self.path().to_path_buf();
        let pages = self
            .inner
            .get_dictionary_mut(root)
            .map_err(|e| TocError::CorruptPdf {
                path,
                detail: e.to_string(),
            })?;
        pages.set("Kids", kids);
        pages.set("Count", order.len() as i64);
        Ok(())
    }

    /// Copy every object of `other` into this document under fresh ids and
    /// return the ids of its pages, in order.
    fn import_pages(&mut self, other: &PdfFile) -> Result<Vec<ObjectId>, TocError> {
        let mut other = other.clone();
        let other_pages = other.page_list();
        other.materialize_inherited(&other_pages)?;

        let offset = self.inner.max_id;
        let remap: HashMap<ObjectId, ObjectId> = other
            .inner
            .objects
            .keys()
            .map(|&(num, gen)| ((num, gen), (num + offset, gen)))
            .collect();

        for (id, object) in std::mem::take(&mut other.inner.objects) {
            let new_id = remap[&id];
            self.inner.objects.insert(new_id, renumber(object, &remap));
        }
        self.inner.max_id = self
            .inner
            .objects
            .keys()
            .map(|&(num, _)| num)
            .max()
            .unwrap_or(self.inner.max_id);

        debug!(
            "Imported {} pages from {}",
            other_pages.len(),
            other.path().display()
        );
        Ok(other_pages.iter().map(|id| remap[id]).collect())
    }
}

/// Rewrite every reference in `object` through `remap`.
fn renumber(object: Object, remap: &HashMap<ObjectId, ObjectId>) -> Object {
    match object {
        Object::Reference(id) => Object::Reference(remap.get(&id).copied().unwrap_or(id)),
        Object::Array(items) => {
            Object::Array(items.into_iter().map(|o| renumber(o, remap)).collect())
        }
        Object::Dictionary(mut dict) => {
            for (_, value) in dict.iter_mut() {
                *value = renumber(std::mem::replace(value, Object::Null), remap);
            }
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            for (_, value) in stream.dict.iter_mut() {
                *value = renumber(std::mem::replace(value, Object::Null), remap);
            }
            Object::Stream(stream)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::TocEntry;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Stream};

    /// Pages labelled by their content so reordering can be checked.
    fn labelled(labels: &[&str]) -> PdfFile {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids = Vec::new();
        for label in labels {
            let content = Content {
                operations: vec![Operation::new("Tj", vec![Object::string_literal(*label)])],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => labels.len() as i64,
                "MediaBox" => vec![0.into(), 0.into(), 100.into(), 200.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);
        PdfFile::from_document(doc, "labelled.pdf")
    }

    fn labels(pdf: &PdfFile) -> Vec<String> {
        pdf.page_list()
            .into_iter()
            .map(|id| {
                let page = pdf.inner.get_dictionary(id).unwrap();
                let content_id = page.get(b"Contents").unwrap().as_reference().unwrap();
                let stream = pdf.inner.get_object(content_id).unwrap().as_stream().unwrap();
                let content = Content::decode(&stream.content).unwrap();
                match &content.operations[0].operands[0] {
                    Object::String(bytes, _) => String::from_utf8(bytes.clone()).unwrap(),
                    other => panic!("unexpected operand {:?}", other),
                }
            })
            .collect()
    }

    /// Serialise and reload, to prove the result is a valid PDF.
    fn reload(pdf: &mut PdfFile) -> PdfFile {
        let bytes = pdf.to_bytes().unwrap();
        PdfFile::from_bytes(&bytes, "reloaded.pdf").unwrap()
    }

    #[test]
    fn select_reorders_and_duplicates() {
        let mut pdf = labelled(&["a", "b", "c"]);
        pdf.select(&[2, 0, 2]).unwrap();
        assert_eq!(labels(&pdf), vec!["c", "a", "c"]);
        assert_eq!(labels(&reload(&mut pdf)), vec!["c", "a", "c"]);
    }

    #[test]
    fn select_materializes_inherited_media_box() {
        let mut pdf = labelled(&["a", "b"]);
        pdf.select(&[1]).unwrap();
        let id = pdf.page_list()[0];
        let page = pdf.inner.get_dictionary(id).unwrap();
        assert!(page.has(b"MediaBox"));
    }

    #[test]
    fn select_drops_outline() {
        let mut pdf = labelled(&["a", "b"]);
        pdf.set_outline(&[TocEntry::new(1, "A", 1)]).unwrap();
        pdf.select(&[0]).unwrap();
        assert!(pdf.outline().unwrap().is_empty());
    }

    #[test]
    fn select_rejects_out_of_range() {
        let mut pdf = labelled(&["a"]);
        assert!(matches!(
            pdf.select(&[0, 3]),
            Err(TocError::PageOutOfRange { page: 4, total: 1 })
        ));
    }

    #[test]
    fn split_into_groups() {
        let pdf = labelled(&["a", "b", "c", "d"]);
        let parts = pdf.split(&[vec![0, 1], vec![3]]).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(labels(&parts[0]), vec!["a", "b"]);
        assert_eq!(labels(&parts[1]), vec!["d"]);
        assert_eq!(labels(&pdf), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn save_all_writes_every_part() {
        let dir = tempfile::tempdir().unwrap();
        let mut parts = labelled(&["a", "b", "c"]).split(&[vec![0], vec![1, 2]]).unwrap();
        let paths = vec![dir.path().join("out-1.pdf"), dir.path().join("out-2.pdf")];
        PdfFile::save_all(&mut parts, &paths).unwrap();
        assert_eq!(labels(&PdfFile::open(&paths[0]).unwrap()), vec!["a"]);
        assert_eq!(labels(&PdfFile::open(&paths[1]).unwrap()), vec!["b", "c"]);
    }

    #[test]
    fn save_all_removes_earlier_parts_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();
        let mut parts = labelled(&["a", "b"]).split(&[vec![0], vec![1]]).unwrap();
        let paths = vec![dir.path().join("out-1.pdf"), blocker.join("out-2.pdf")];

        let err = PdfFile::save_all(&mut parts, &paths).unwrap_err();
        assert!(matches!(err, TocError::OutputWriteFailed { .. }), "{err:?}");
        assert!(!paths[0].exists());
        assert!(!dir.path().join("out-1.pdf.tmp").exists());
    }

    #[test]
    fn save_all_needs_one_path_per_part() {
        let mut parts = labelled(&["a"]).split(&[vec![0]]).unwrap();
        assert!(matches!(
            PdfFile::save_all(&mut parts, &[]),
            Err(TocError::InvalidConfig(_))
        ));
    }

    #[test]
    fn delete_pages() {
        let mut pdf = labelled(&["a", "b", "c"]);
        pdf.delete(&[1]).unwrap();
        assert_eq!(labels(&reload(&mut pdf)), vec!["a", "c"]);
        assert!(pdf.delete(&[0, 1]).is_err());
    }

    #[test]
    fn rotate_is_absolute() {
        let mut pdf = labelled(&["a", "b"]);
        pdf.rotate(&[0], 90).unwrap();
        pdf.rotate(&[0], -90).unwrap();
        let id = pdf.page_list()[0];
        let rot = pdf.inner.get_dictionary(id).unwrap().get(b"Rotate").unwrap().as_i64().unwrap();
        assert_eq!(rot, 270);
        assert!(pdf.rotate(&[0], 45).is_err());
    }

    #[test]
    fn append_and_insert() {
        let mut base = labelled(&["a", "b"]);
        let other = labelled(&["x", "y"]);
        base.append(&other).unwrap();
        assert_eq!(labels(&base), vec!["a", "b", "x", "y"]);

        let mut base = labelled(&["a", "b"]);
        base.insert(&other, 1).unwrap();
        assert_eq!(labels(&reload(&mut base)), vec!["a", "x", "y", "b"]);

        let mut base = labelled(&["a"]);
        assert!(matches!(
            base.insert(&other, 2),
            Err(TocError::PageOutOfRange { page: 2, total: 1 })
        ));
    }

    #[test]
    fn append_keeps_outline_of_base() {
        let mut base = labelled(&["a", "b"]);
        base.set_outline(&[TocEntry::new(1, "B", 2)]).unwrap();
        base.append(&labelled(&["x"])).unwrap();
        let mut reloaded = reload(&mut base);
        assert_eq!(reloaded.page_count(), 3);
        assert_eq!(reloaded.outline().unwrap(), vec![TocEntry::new(1, "B", 2)]);
        assert!(reloaded.to_bytes().is_ok());
    }
}
