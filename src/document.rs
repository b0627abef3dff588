//! lopdf-backed PDF handle: page count, outline read/write, save.
//!
//! ## Outline layout
//!
//! [`PdfFile::set_outline`] turns the flat `(level, title, page)` list into
//! the linked tree PDF viewers expect: a root `/Outlines` dictionary, and per
//! item `/Parent`, `/Prev`, `/Next`, `/First`, `/Last` and `/Count`. Items
//! are written closed (negative `/Count`), so viewers show the top level
//! only until expanded. Every destination is `[page /XYZ null null null]`:
//! jump to the page, keep the current zoom.
//!
//! ## Text strings
//!
//! Titles are PDF text strings: plain literals when ASCII, UTF-16BE with a
//! byte-order mark otherwise. Reading also accepts PDFDocEncoding, decoded
//! as Latin-1.

use crate::entry::TocEntry;
use crate::error::TocError;
use crate::output::write_atomic;
use crate::pipeline::input;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, StringFormat};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Deepest outline nesting walked when reading; guards against cycles.
const MAX_OUTLINE_DEPTH: usize = 64;

/// An open PDF document.
#[derive(Debug, Clone)]
pub struct PdfFile {
    pub(crate) inner: Document,
    path: PathBuf,
}

impl PdfFile {
    /// Validate and load a PDF from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TocError> {
        let path = input::resolve_pdf(path.as_ref())?;
        let inner = Document::load(&path).map_err(|e| TocError::CorruptPdf {
            path: path.clone(),
            detail: e.to_string(),
        })?;
        debug!("PDF loaded: {} ({} pages)", path.display(), inner.get_pages().len());
        Ok(Self { inner, path })
    }

    /// Wrap an in-memory document. `path` is only used in messages.
    pub fn from_document(inner: Document, path: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            path: path.into(),
        }
    }

    /// Load from bytes already in memory.
    pub fn from_bytes(bytes: &[u8], path: impl Into<PathBuf>) -> Result<Self, TocError> {
        let path = path.into();
        let inner = Document::load_mem(bytes).map_err(|e| TocError::CorruptPdf {
            path: path.clone(),
            detail: e.to_string(),
        })?;
        Ok(Self { inner, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &Document {
        &self.inner
    }

    pub fn page_count(&self) -> usize {
        self.inner.get_pages().len()
    }

    // ── Outline: read ────────────────────────────────────────────────────

    /// The document outline flattened depth-first. Level 1 is the top.
    ///
    /// Items whose destination cannot be resolved point at page 1.
    pub fn outline(&self) -> Result<Vec<TocEntry>, TocError> {
        let Some(root) = self.outline_root() else {
            return Ok(Vec::new());
        };
        let Ok(Object::Reference(first)) = root.get(b"First") else {
            return Ok(Vec::new());
        };

        let page_numbers: HashMap<ObjectId, u32> = self
            .inner
            .get_pages()
            .into_iter()
            .map(|(number, id)| (id, number))
            .collect();

        let mut entries = Vec::new();
        let mut visited = HashSet::new();
        self.walk_outline(*first, 0, &page_numbers, &mut visited, &mut entries);
        debug!("Read {} outline items", entries.len());
        Ok(entries)
    }

    fn outline_root(&self) -> Option<&Dictionary> {
        let catalog = self.inner.catalog().ok()?;
        let outlines = catalog.get(b"Outlines").ok()?;
        self.resolve(outlines).as_dict().ok()
    }

    fn walk_outline(
        &self,
        first: ObjectId,
        depth: usize,
        page_numbers: &HashMap<ObjectId, u32>,
        visited: &mut HashSet<ObjectId>,
        entries: &mut Vec<TocEntry>,
    ) {
        if depth >= MAX_OUTLINE_DEPTH {
            warn!("Outline nested deeper than {}; ignoring the rest", MAX_OUTLINE_DEPTH);
            return;
        }

        let mut current = Some(first);
        while let Some(id) = current {
            if !visited.insert(id) {
                warn!("Outline item {:?} is linked twice; stopping this branch", id);
                break;
            }
            let Ok(item) = self.inner.get_dictionary(id) else {
                break;
            };

            let title = item
                .get(b"Title")
                .ok()
                .and_then(|t| match self.resolve(t) {
                    Object::String(bytes, _) => Some(decode_text_string(bytes)),
                    _ => None,
                })
                .unwrap_or_default();

            let page = self.item_page(item, page_numbers).unwrap_or_else(|| {
                warn!("Outline item '{}' has no resolvable destination; using page 1", title);
                1
            });
            entries.push(TocEntry::new(depth as u32 + 1, title, page));

            if let Ok(Object::Reference(child)) = item.get(b"First") {
                self.walk_outline(*child, depth + 1, page_numbers, visited, entries);
            }
            current = match item.get(b"Next") {
                Ok(Object::Reference(next)) => Some(*next),
                _ => None,
            };
        }
    }

    /// `/Dest` first, then a `/GoTo` action's `/D`.
    fn item_page(&self, item: &Dictionary, page_numbers: &HashMap<ObjectId, u32>) -> Option<u32> {
        if let Ok(dest) = item.get(b"Dest") {
            if let Some(page) = self.dest_page(dest, page_numbers, 0) {
                return Some(page);
            }
        }
        let action = self.resolve(item.get(b"A").ok()?).as_dict().ok()?;
        match action.get(b"S") {
            Ok(Object::Name(kind)) if kind.as_slice() == b"GoTo" => {
                self.dest_page(action.get(b"D").ok()?, page_numbers, 0)
            }
            _ => None,
        }
    }

    fn dest_page(
        &self,
        dest: &Object,
        page_numbers: &HashMap<ObjectId, u32>,
        hops: usize,
    ) -> Option<u32> {
        // Named destinations can point at other names; don't chase forever.
        if hops > 8 {
            return None;
        }
        match self.resolve(dest) {
            Object::Array(arr) => match arr.first()? {
                Object::Reference(page_id) => page_numbers.get(page_id).copied(),
                // Remote-style integer page index (0-based).
                Object::Integer(i) => u32::try_from(*i).ok().map(|i| i + 1),
                _ => None,
            },
            Object::Dictionary(d) => self.dest_page(d.get(b"D").ok()?, page_numbers, hops + 1),
            Object::String(bytes, _) => {
                let target = self.named_dest(bytes)?;
                self.dest_page(&target, page_numbers, hops + 1)
            }
            Object::Name(name) => {
                let target = self.named_dest(name)?;
                self.dest_page(&target, page_numbers, hops + 1)
            }
            _ => None,
        }
    }

    /// Look `name` up in the `/Names` `/Dests` tree, then in `/Dests`.
    fn named_dest(&self, name: &[u8]) -> Option<Object> {
        let catalog = self.inner.catalog().ok()?;

        let from_tree = catalog
            .get(b"Names")
            .ok()
            .and_then(|n| self.resolve(n).as_dict().ok())
            .and_then(|names| names.get(b"Dests").ok())
            .and_then(|d| self.resolve(d).as_dict().ok())
            .and_then(|tree| self.lookup_name_tree(tree, name, 0));
        if from_tree.is_some() {
            return from_tree;
        }

        let dests = self.resolve(catalog.get(b"Dests").ok()?).as_dict().ok()?;
        dests.get(name).ok().map(|d| self.resolve(d).clone())
    }

    fn lookup_name_tree(&self, node: &Dictionary, name: &[u8], depth: usize) -> Option<Object> {
        if depth >= MAX_OUTLINE_DEPTH {
            return None;
        }
        if let Some(names) = node
            .get(b"Names")
            .ok()
            .and_then(|n| self.resolve(n).as_array().ok())
        {
            for pair in names.chunks(2) {
                if let [key, value] = pair {
                    if matches!(self.resolve(key), Object::String(k, _) if k.as_slice() == name) {
                        return Some(self.resolve(value).clone());
                    }
                }
            }
        }
        let kids = self.resolve(node.get(b"Kids").ok()?).as_array().ok()?;
        kids.iter()
            .filter_map(|kid| self.resolve(kid).as_dict().ok())
            .find_map(|kid| self.lookup_name_tree(kid, name, depth + 1))
    }

    /// Follow one level of indirection, if any.
    fn resolve<'a>(&'a self, obj: &'a Object) -> &'a Object {
        match obj {
            Object::Reference(id) => self.inner.get_object(*id).unwrap_or(obj),
            other => other,
        }
    }

    // ── Outline: write ───────────────────────────────────────────────────

    /// Replace the outline with `entries` (document order, levels well-formed
    /// or not). An empty list removes the outline.
    ///
    /// Pages must be within `1..=page_count`.
    pub fn set_outline(&mut self, entries: &[TocEntry]) -> Result<(), TocError> {
        let pages = self.inner.get_pages();
        for e in entries {
            if e.page == 0 || !pages.contains_key(&e.page) {
                return Err(TocError::EntryOutOfRange {
                    title: e.title.clone(),
                    page: i64::from(e.page),
                    total: pages.len(),
                });
            }
        }

        self.remove_outline()?;
        if entries.is_empty() {
            return Ok(());
        }

        let tree = OutlineTree::from_levels(entries.iter().map(|e| e.level));
        let root_id = self.inner.new_object_id();
        let ids: Vec<ObjectId> = entries.iter().map(|_| self.inner.new_object_id()).collect();

        for (i, entry) in entries.iter().enumerate() {
            let siblings = tree.siblings_of(i);
            let pos = siblings.iter().position(|&s| s == i).unwrap_or(0);
            let parent = tree.parent[i].map_or(root_id, |p| ids[p]);

            let mut dict = dictionary! {
                "Title" => encode_text_string(&entry.title),
                "Parent" => parent,
                "Dest" => vec![
                    Object::Reference(pages[&entry.page]),
                    "XYZ".into(),
                    Object::Null,
                    Object::Null,
                    Object::Null,
                ],
            };
            if pos > 0 {
                dict.set("Prev", ids[siblings[pos - 1]]);
            }
            if pos + 1 < siblings.len() {
                dict.set("Next", ids[siblings[pos + 1]]);
            }
            let children = &tree.children[i];
            if let (Some(&first), Some(&last)) = (children.first(), children.last()) {
                dict.set("First", ids[first]);
                dict.set("Last", ids[last]);
                dict.set("Count", -(children.len() as i64));
            }
            self.inner.objects.insert(ids[i], Object::Dictionary(dict));
        }

        let (first, last) = (tree.roots[0], tree.roots[tree.roots.len() - 1]);
        self.inner.objects.insert(
            root_id,
            Object::Dictionary(dictionary! {
                "Type" => "Outlines",
                "First" => ids[first],
                "Last" => ids[last],
                "Count" => tree.roots.len() as i64,
            }),
        );

        let catalog = self.catalog_mut()?;
        catalog.set("Outlines", root_id);
        catalog.set("PageMode", "UseOutlines");
        info!("Outline set: {} items, {} top-level", entries.len(), tree.roots.len());
        Ok(())
    }

    /// Detach the outline. Its objects are pruned on save.
    pub fn remove_outline(&mut self) -> Result<(), TocError> {
        let catalog = self.catalog_mut()?;
        catalog.remove(b"Outlines");
        if matches!(catalog.get(b"PageMode"), Ok(Object::Name(m)) if m.as_slice() == b"UseOutlines") {
            catalog.remove(b"PageMode");
        }
        Ok(())
    }

    pub(crate) fn catalog_mut(&mut self) -> Result<&mut Dictionary, TocError> {
        let path = self.path.clone();
        let root = self
            .inner
            .trailer
            .get(b"Root")
            .and_then(Object::as_reference)
            .map_err(|e| TocError::CorruptPdf {
                path: path.clone(),
                detail: format!("no document catalog: {}", e),
            })?;
        self.inner
            .get_dictionary_mut(root)
            .map_err(|e| TocError::CorruptPdf {
                path,
                detail: format!("document catalog unreadable: {}", e),
            })
    }

    // ── Save ─────────────────────────────────────────────────────────────

    /// Serialise and write atomically to `path`.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<(), TocError> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        write_atomic(path, &bytes)?;
        info!("Wrote {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }

    /// Serialise to memory, dropping unreachable objects first.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>, TocError> {
        let pruned = self.inner.prune_objects();
        if !pruned.is_empty() {
            debug!("Pruned {} unreachable objects", pruned.len());
        }
        let mut buf = Vec::new();
        self.inner
            .save_to(&mut buf)
            .map_err(|e| TocError::PdfWriteFailed {
                path: self.path.clone(),
                detail: e.to_string(),
            })?;
        Ok(buf)
    }

    /// 1-based page number → page object id.
    pub(crate) fn page_ids(&self) -> BTreeMap<u32, ObjectId> {
        self.inner.get_pages()
    }
}

// ── Tree shape ───────────────────────────────────────────────────────────

/// Parent/children links derived from a flat level sequence.
///
/// An item's parent is the nearest earlier item with a smaller level, so a
/// jump from level 1 to level 3 simply nests one deeper.
struct OutlineTree {
    parent: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
}

impl OutlineTree {
    fn from_levels(levels: impl Iterator<Item = u32>) -> Self {
        let mut parent = Vec::new();
        let mut children: Vec<Vec<usize>> = Vec::new();
        let mut roots = Vec::new();
        let mut stack: Vec<(u32, usize)> = Vec::new();

        for (i, level) in levels.enumerate() {
            while stack.last().is_some_and(|&(l, _)| l >= level) {
                stack.pop();
            }
            let p = stack.last().map(|&(_, idx)| idx);
            match p {
                Some(p) => children[p].push(i),
                None => roots.push(i),
            }
            parent.push(p);
            children.push(Vec::new());
            stack.push((level, i));
        }
        Self {
            parent,
            children,
            roots,
        }
    }

    fn siblings_of(&self, i: usize) -> &[usize] {
        match self.parent[i] {
            Some(p) => &self.children[p],
            None => &self.roots,
        }
    }
}

// ── Text strings ─────────────────────────────────────────────────────────

/// Encode a PDF text string: literal for ASCII, UTF-16BE with BOM otherwise.
pub fn encode_text_string(s: &str) -> Object {
    if s.is_ascii() {
        return Object::string_literal(s);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in s.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Decode a PDF text string (UTF-16BE with BOM, UTF-8 with BOM, or
/// PDFDocEncoding approximated as Latin-1).
pub fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    bytes.iter().map(|&b| b as char).collect()
}
