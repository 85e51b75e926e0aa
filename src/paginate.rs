//! Page slicing for detail tables.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

pub fn total_pages(total_items: usize, page_size: usize) -> usize {
    if page_size == 0 {
        0
    } else {
        total_items.div_ceil(page_size)
    }
}

/// Slice `list` to its 1-indexed `page`. A page outside `1..=total_pages`
/// is empty rather than an error.
pub fn paginate<T>(list: &[T], page: usize, page_size: usize) -> Page<'_, T> {
    let total_items = list.len();
    let total_pages = total_pages(total_items, page_size);
    let items = if page == 0 || page > total_pages {
        &list[..0]
    } else {
        let start = (page - 1) * page_size;
        let end = (start + page_size).min(total_items);
        &list[start..end]
    };
    Page {
        items,
        page,
        total_pages,
        total_items,
    }
}

/// Page cursor that follows a list whose length changes under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pager {
    page: usize,
    page_size: usize,
    last_len: Option<usize>,
}

impl Pager {
    pub fn new(page_size: usize) -> Self {
        Self {
            page: 1,
            page_size,
            last_len: None,
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Record the current list length. If it changed and the current page
    /// no longer exists, go back to page 1.
    pub fn sync(&mut self, len: usize) {
        if self.last_len != Some(len) && self.page > total_pages(len, self.page_size).max(1) {
            self.page = 1;
        }
        self.last_len = Some(len);
    }

    pub fn next(&mut self) -> bool {
        let last = total_pages(self.last_len.unwrap_or(0), self.page_size);
        if self.page < last {
            self.page += 1;
            true
        } else {
            false
        }
    }

    pub fn prev(&mut self) -> bool {
        if self.page > 1 {
            self.page -= 1;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.page = 1;
    }

    pub fn slice<'a, T>(&mut self, list: &'a [T]) -> Page<'a, T> {
        self.sync(list.len());
        paginate(list, self.page, self.page_size)
    }
}
