//! Page tree construction.
//!
//! Pages are collected in groups of `leaf_size` under one `/Pages` parent
//! each. When the tree is written, the parents are grouped the same way
//! until a single root is left. Parents are allocated as soon as their first
//! page arrives, so page dictionaries can point to them right away.

use lopdf::{Dictionary as LoDictionary, Object};

use crate::errors::{PdfError, Result};
use crate::indirect::ObjectTable;
use crate::ObjectId;

/// Default number of kids per `/Pages` node
pub const DEFAULT_LEAF_SIZE: usize = 10;

/// Leaf size in linear mode, every page ends up under one parent
const LINEAR_LEAF_SIZE: usize = 10_000_000;

#[derive(Debug, Clone)]
pub struct PageTree {
    leaf_size: usize,
    pages: Vec<ObjectId>,
    /// One parent per group of `leaf_size` pages, the last one is open
    parents: Vec<ObjectId>,
    root: Option<ObjectId>,
}

impl Default for PageTree {
    fn default() -> Self {
        Self::new(DEFAULT_LEAF_SIZE)
    }
}

impl PageTree {
    /// `leaf_size` below 2 could never reduce the tree to one root and is
    /// raised to 2
    pub fn new(leaf_size: usize) -> Self {
        Self {
            leaf_size: leaf_size.max(2),
            pages: Vec::new(),
            parents: Vec::new(),
            root: None,
        }
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Page objects in their current order
    pub fn pages(&self) -> &[ObjectId] {
        &self.pages
    }

    pub fn leaf_size(&self) -> usize {
        self.leaf_size
    }

    /// The root `/Pages` node, once the tree is written
    pub fn root(&self) -> Option<ObjectId> {
        self.root
    }

    /// Registers a page and returns the parent it belongs to, allocating a
    /// new parent when the open one is full
    pub fn add_page_ref(&mut self, table: &mut ObjectTable, page: ObjectId) -> Result<ObjectId> {
        if self.root.is_some() {
            return Err(PdfError::PageTreeWritten);
        }
        if self.pages.len() >= self.parents.len() * self.leaf_size {
            self.parents.push(table.allocate());
        }
        self.pages.push(page);
        let parent = self.parents[self.parents.len() - 1];
        Ok(parent)
    }

    /// Sets `/Parent` on the page dictionary and writes it as `page_id`.
    ///
    /// Everything `/Contents` refers to has to be written already, a page
    /// pointing to a missing stream is rejected with `ContentsNotWritten`.
    pub fn add_page(&mut self, table: &mut ObjectTable, page_id: ObjectId, mut page: LoDictionary) -> Result<()> {
        if let Ok(contents) = page.get(b"Contents") {
            let refs = match contents {
                Object::Reference(id) => vec![*id],
                Object::Array(items) => items.iter().filter_map(|i| i.as_reference().ok()).collect(),
                _ => Vec::new(),
            };
            if let Some(missing) = refs.into_iter().find(|id| !table.is_written(*id)) {
                return Err(PdfError::ContentsNotWritten(missing));
            }
        }
        let parent = self.add_page_ref(table, page_id)?;
        page.set("Parent", Object::Reference(parent));
        table.write(page_id, &Object::Dictionary(page))
    }

    /// Puts every following page under a single parent. Only possible while
    /// there is at most one parent. `existing_parent` is adopted as that
    /// parent, e.g. to match a root the catalog already points to.
    pub fn set_linear_mode(&mut self, existing_parent: Option<ObjectId>) -> Result<()> {
        if self.parents.len() > 1 {
            return Err(PdfError::LinearModeMultipleParents);
        }
        if let Some(parent) = existing_parent {
            if !self.pages.is_empty() {
                return Err(PdfError::LinearModeAfterPages);
            }
            self.parents = vec![parent];
        }
        self.leaf_size = LINEAR_LEAF_SIZE;
        Ok(())
    }

    /// Reorders the pages: the new page `k` is the old page `order[k]`
    /// (1-based). `order` must be a permutation of `1..=len()`. On error the
    /// order is unchanged.
    pub fn reorder_pages(&mut self, order: &[usize]) -> Result<usize> {
        if self.parents.len() > 1 {
            return Err(PdfError::ReorderMultipleParents {
                leaf_size: self.leaf_size,
            });
        }
        let max = self.pages.len();
        if order.len() != max {
            return Err(PdfError::ReorderWrongLength {
                expected: max,
                found: order.len(),
            });
        }
        let mut seen = vec![false; max];
        for &p in order {
            if p < 1 || p > max {
                return Err(PdfError::ReorderOutOfRange { max, found: p });
            }
            if seen[p - 1] {
                return Err(PdfError::ReorderRepeatedPage(p));
            }
            seen[p - 1] = true;
        }
        let old = self.pages.clone();
        for (slot, &p) in self.pages.iter_mut().zip(order) {
            *slot = old[p - 1];
        }
        Ok(max)
    }

    /// Writes all `/Pages` nodes and returns the root.
    ///
    /// Every node's `/Count` is the number of pages below it. Only the root
    /// gets the `/ITXT` producer marker.
    pub fn write_page_tree(&mut self, table: &mut ObjectTable) -> Result<ObjectId> {
        if let Some(root) = self.root {
            return Ok(root);
        }
        if self.pages.is_empty() {
            return Err(PdfError::NoPages);
        }

        let total = self.pages.len();
        let leaf_size = self.leaf_size;
        let mut leaf = 1usize;
        let mut level_parents = self.parents.clone();
        let mut level_kids = self.pages.clone();
        let mut depth = 0;

        loop {
            leaf = leaf.saturating_mul(leaf_size);
            depth += 1;
            let mut next_parents = Vec::new();
            let last = level_parents.len() - 1;

            for (p, parent) in level_parents.iter().enumerate() {
                let start = p * leaf_size;
                let end = (start + leaf_size).min(level_kids.len());
                let count = if p == last {
                    match total % leaf {
                        0 => leaf,
                        rest => rest,
                    }
                } else {
                    leaf
                };

                let mut node = LoDictionary::from_iter(vec![
                    ("Type", Object::Name(b"Pages".to_vec())),
                    ("Count", Object::Integer(count as i64)),
                    (
                        "Kids",
                        Object::Array(level_kids[start..end].iter().map(|k| Object::Reference(*k)).collect()),
                    ),
                ]);
                if level_parents.len() > 1 {
                    if p % leaf_size == 0 {
                        next_parents.push(table.allocate());
                    }
                    node.set("Parent", Object::Reference(next_parents[p / leaf_size]));
                } else {
                    node.set("ITXT", Object::string_literal(producer()));
                }
                table.write(*parent, &Object::Dictionary(node))?;
            }

            tracing::debug!(depth, nodes = level_parents.len(), "wrote page tree level");

            if level_parents.len() == 1 {
                let root = level_parents[0];
                self.root = Some(root);
                return Ok(root);
            }
            level_kids = level_parents;
            level_parents = next_parents;
        }
    }
}

/// `<crate>-<version>`, written into the root of the page tree
pub(crate) fn producer() -> String {
    format!("{}-{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}
