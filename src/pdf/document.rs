//! lopdf-backed page geometry and document rewriting

use std::collections::HashSet;
use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, info};

use crate::crop::OutputPage;
use crate::geometry::PageBox;
use crate::source::{DocumentRewriter, PageGeometrySource, Result, SourceError};

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// A loaded PDF document
pub struct PdfDocument {
    doc: Document,
    page_ids: Vec<ObjectId>,
}

impl PdfDocument {
    /// Load a PDF from disk
    pub fn open(path: &Path) -> Result<Self> {
        let doc = Document::load(path)?;
        let pdf = Self::from_document(doc);
        info!(path = %path.display(), pages = pdf.page_count(), "loaded PDF");
        Ok(pdf)
    }

    /// Wrap an already parsed document
    pub fn from_document(doc: Document) -> Self {
        let page_ids = doc.get_pages().into_values().collect();
        Self { doc, page_ids }
    }

    /// Underlying lopdf document
    pub fn inner(&self) -> &Document {
        &self.doc
    }

    fn page_id(&self, page_number: usize) -> Result<ObjectId> {
        page_number
            .checked_sub(1)
            .and_then(|i| self.page_ids.get(i).copied())
            .ok_or(SourceError::PageOutOfRange {
                page: page_number,
                page_count: self.page_ids.len(),
            })
    }

    /// MediaBox of a page, following the page tree
    pub fn media_box(&self, page_number: usize) -> Result<Option<PageBox>> {
        self.inherited_box(page_number, b"MediaBox")
    }

    /// CropBox of a page, following the page tree
    pub fn crop_box(&self, page_number: usize) -> Result<Option<PageBox>> {
        self.inherited_box(page_number, b"CropBox")
    }

    /// Effective `/Rotate` of a page, normalized to 0, 90, 180 or 270
    pub fn rotation(&self, page_number: usize) -> Result<u16> {
        let page_id = self.page_id(page_number)?;
        let degrees = match resolve_inherited(&self.doc, page_id, b"Rotate")? {
            Some(obj) => match resolve(&self.doc, obj)? {
                Object::Integer(v) => *v,
                Object::Real(v) => *v as i64,
                _ => 0,
            },
            None => 0,
        };
        Ok(normalize_rotation(degrees))
    }

    fn inherited_box(&self, page_number: usize, key: &[u8]) -> Result<Option<PageBox>> {
        let page_id = self.page_id(page_number)?;
        match resolve_inherited(&self.doc, page_id, key)? {
            Some(obj) => {
                let array = resolve(&self.doc, obj)?.as_array()?;
                Ok(box_from_array(array))
            }
            None => Ok(None),
        }
    }

    /// Reference to the catalog's page tree root
    fn pages_root_id(doc: &Document) -> Result<ObjectId> {
        let catalog_id = doc.trailer.get(b"Root")?.as_reference()?;
        Ok(doc
            .get_object(catalog_id)?
            .as_dict()?
            .get(b"Pages")?
            .as_reference()?)
    }

    /// Page dictionary with inherited attributes copied in
    fn flattened_page(&self, page_id: ObjectId) -> Result<Dictionary> {
        let mut dict = self.doc.get_object(page_id)?.as_dict()?.clone();
        for key in INHERITABLE_KEYS {
            if dict.get(key).is_ok() {
                continue;
            }
            if let Some(value) = resolve_inherited(&self.doc, page_id, key)? {
                dict.set(key.to_vec(), value.clone());
            }
        }
        Ok(dict)
    }

    /// Build the cropped document without touching `self`
    pub fn cropped_document(&self, pages: &[OutputPage]) -> Result<Document> {
        let mut doc = self.doc.clone();
        let pages_id = Self::pages_root_id(&doc)?;

        let mut kids = Vec::with_capacity(pages.len());
        for page in pages {
            let source_id = self.page_id(page.source_page)?;
            let mut dict = self.flattened_page(source_id)?;
            let crop_box = box_to_object(&page.crop_box);
            dict.set("MediaBox", crop_box.clone());
            dict.set("CropBox", crop_box);
            dict.set("Parent", Object::Reference(pages_id));
            kids.push(Object::Reference(doc.add_object(dict)));
        }

        let count = kids.len() as i64;
        let root = doc.get_object_mut(pages_id)?.as_dict_mut()?;
        root.set("Kids", Object::Array(kids));
        root.set("Count", Object::Integer(count));
        for key in INHERITABLE_KEYS {
            root.remove(key);
        }

        let pruned = doc.prune_objects();
        debug!(
            output_pages = count,
            pruned = pruned.len(),
            "rebuilt page tree"
        );
        Ok(doc)
    }
}

impl PageGeometrySource for PdfDocument {
    fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn page_box(&self, page_number: usize) -> Result<PageBox> {
        match self.crop_box(page_number)? {
            Some(b) => Ok(b),
            None => self
                .media_box(page_number)?
                .ok_or(SourceError::MissingPageBox(page_number)),
        }
    }

    fn page_rotation(&self, page_number: usize) -> Result<u16> {
        self.rotation(page_number)
    }
}

impl DocumentRewriter for PdfDocument {
    fn write_cropped(&mut self, pages: &[OutputPage], destination: &Path) -> Result<()> {
        let mut doc = self.cropped_document(pages)?;
        doc.save(destination)?;
        info!(
            path = %destination.display(),
            pages = pages.len(),
            "wrote cropped PDF"
        );
        Ok(())
    }
}

/// Look up a key on the page, then on each `/Parent` in turn
///
/// A `/Parent` chain that revisits a node is an error.
fn resolve_inherited<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Result<Option<&'a Object>> {
    let mut visited = HashSet::new();
    let mut current = page_id;
    loop {
        if !visited.insert(current) {
            return Err(SourceError::PageTreeCycle(current.0, current.1));
        }
        let dict = doc.get_object(current)?.as_dict()?;
        if let Ok(value) = dict.get(key) {
            return Ok(Some(value));
        }
        match dict.get(b"Parent") {
            Ok(parent) => current = parent.as_reference()?,
            Err(_) => return Ok(None),
        }
    }
}

/// Multiples of 90 in `0..360`; other angles round down
fn normalize_rotation(degrees: i64) -> u16 {
    (degrees.rem_euclid(360) / 90 * 90) as u16
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Result<&'a Object> {
    match obj {
        Object::Reference(id) => Ok(doc.get_object(*id)?),
        other => Ok(other),
    }
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(f) => Some(*f as f32),
        _ => None,
    }
}

/// `[llx lly urx ury]`; malformed or empty boxes read as absent
fn box_from_array(array: &[Object]) -> Option<PageBox> {
    let [a, b, c, d] = array else {
        return None;
    };
    let page_box = PageBox::from_corners(number(a)?, number(b)?, number(c)?, number(d)?);
    (page_box.width > 0.0 && page_box.height > 0.0).then_some(page_box)
}

fn box_to_object(page_box: &PageBox) -> Object {
    Object::Array(page_box.to_array().iter().map(|&v| Object::Real(v)).collect())
}
