//! Slicing ordered report rows into pages.
//!
//! One policy applies to every report: a page number that does not parse,
//! or is zero or negative, selects page 1; a page number past the end
//! selects the last page.

use std::num::NonZeroUsize;

use serde::Serialize;

/// How many rows a page holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSize {
    /// No slicing; every row on one page.
    All,
    /// At most this many rows per page.
    Count(NonZeroUsize),
}

impl PageSize {
    /// Parse a page size input.
    ///
    /// `"all"` (any case) disables slicing; a positive integer sets the
    /// size; anything else, including a missing value, uses `default`.
    #[must_use]
    pub fn parse(raw: Option<&str>, default: NonZeroUsize) -> Self {
        let Some(raw) = raw.map(str::trim) else {
            return Self::Count(default);
        };
        if raw.eq_ignore_ascii_case("all") {
            return Self::All;
        }
        raw.parse::<NonZeroUsize>()
            .map_or(Self::Count(default), Self::Count)
    }
}

impl std::fmt::Display for PageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Count(n) => write!(f, "{n}"),
        }
    }
}

/// A requested page, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageNumber(NonZeroUsize);

impl PageNumber {
    /// The first page.
    pub const FIRST: Self = Self(NonZeroUsize::MIN);

    /// Parse a page number input; anything that is not a positive integer
    /// selects the first page.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        raw.and_then(|r| r.trim().parse::<NonZeroUsize>().ok())
            .map_or(Self::FIRST, Self)
    }

    /// The page number as a plain integer.
    #[must_use]
    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for PageNumber {
    fn default() -> Self {
        Self::FIRST
    }
}

impl From<NonZeroUsize> for PageNumber {
    fn from(n: NonZeroUsize) -> Self {
        Self(n)
    }
}

/// One page of an ordered result list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    /// Rows on this page, in order.
    pub items: Vec<T>,
    /// The page actually served, 1-based.
    pub number: usize,
    /// Number of pages; at least 1 even when there are no rows.
    pub total_pages: usize,
    /// Number of rows across all pages.
    pub total_items: usize,
    /// The page size used.
    pub page_size: PageSize,
    /// Whether the result spans more than one page.
    pub has_multiple_pages: bool,
}

impl<T> Page<T> {
    /// Whether a page follows this one.
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.number < self.total_pages
    }

    /// Whether a page precedes this one.
    #[must_use]
    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    /// Convert the rows while keeping the page metadata.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `f`.
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Page<U>, E> {
        Ok(Page {
            items: self.items.into_iter().map(f).collect::<Result<_, _>>()?,
            number: self.number,
            total_pages: self.total_pages,
            total_items: self.total_items,
            page_size: self.page_size,
            has_multiple_pages: self.has_multiple_pages,
        })
    }
}

/// Slice `items` down to the requested page.
#[must_use]
pub fn paginate<T>(items: Vec<T>, size: PageSize, page: PageNumber) -> Page<T> {
    let total_items = items.len();
    let per_page = match size {
        PageSize::All => None,
        PageSize::Count(n) => Some(n.get()),
    };

    let total_pages = per_page.map_or(1, |n| total_items.div_ceil(n).max(1));
    let number = page.get().min(total_pages);

    let items = match per_page {
        None => items,
        Some(n) => items.into_iter().skip((number - 1) * n).take(n).collect(),
    };

    Page {
        items,
        number,
        total_pages,
        total_items,
        page_size: size,
        has_multiple_pages: total_pages > 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(n: usize) -> PageSize {
        PageSize::Count(NonZeroUsize::new(n).unwrap())
    }

    fn page(n: usize) -> PageNumber {
        PageNumber::from(NonZeroUsize::new(n).unwrap())
    }

    #[test]
    fn test_second_page_holds_remainder() {
        let rows: Vec<u32> = (0..23).collect();
        let result = paginate(rows, size(20), page(2));

        assert_eq!(result.items, vec![20, 21, 22]);
        assert_eq!(result.total_pages, 2);
        assert_eq!(result.total_items, 23);
        assert!(result.has_multiple_pages);
        assert!(result.has_previous());
        assert!(!result.has_next());
    }

    #[test]
    fn test_all_returns_single_page() {
        let rows: Vec<u32> = (0..57).collect();
        let result = paginate(rows.clone(), PageSize::All, page(3));

        assert_eq!(result.items, rows);
        assert_eq!(result.number, 1);
        assert_eq!(result.total_pages, 1);
        assert!(!result.has_multiple_pages);
    }

    #[test]
    fn test_page_past_end_clamps_to_last() {
        let rows: Vec<u32> = (0..45).collect();
        let result = paginate(rows, size(20), page(9));
        assert_eq!(result.number, 3);
        assert_eq!(result.items, vec![40, 41, 42, 43, 44]);
    }

    #[test]
    fn test_empty_input_has_one_empty_page() {
        let result = paginate(Vec::<u32>::new(), size(20), page(4));
        assert!(result.items.is_empty());
        assert_eq!(result.number, 1);
        assert_eq!(result.total_pages, 1);
        assert!(!result.has_multiple_pages);
    }

    #[test]
    fn test_pages_concatenate_to_input() {
        let rows: Vec<u32> = (0..101).collect();
        for per_page in [1, 2, 7, 20, 100, 101, 500] {
            let first = paginate(rows.clone(), size(per_page), PageNumber::FIRST);
            let mut joined = Vec::new();
            for n in 1..=first.total_pages {
                joined.extend(paginate(rows.clone(), size(per_page), page(n)).items);
            }
            assert_eq!(joined, rows, "page size {per_page}");
        }
    }

    #[test]
    fn test_page_number_parse() {
        assert_eq!(PageNumber::parse(Some("3")).get(), 3);
        assert_eq!(PageNumber::parse(Some(" 2 ")).get(), 2);
        assert_eq!(PageNumber::parse(Some("0")), PageNumber::FIRST);
        assert_eq!(PageNumber::parse(Some("-4")), PageNumber::FIRST);
        assert_eq!(PageNumber::parse(Some("last")), PageNumber::FIRST);
        assert_eq!(PageNumber::parse(None), PageNumber::FIRST);
    }

    #[test]
    fn test_page_size_parse() {
        let default = NonZeroUsize::new(20).unwrap();
        assert_eq!(PageSize::parse(Some("all"), default), PageSize::All);
        assert_eq!(PageSize::parse(Some("ALL"), default), PageSize::All);
        assert_eq!(PageSize::parse(Some("50"), default), size(50));
        assert_eq!(PageSize::parse(Some("0"), default), size(20));
        assert_eq!(PageSize::parse(Some("-10"), default), size(20));
        assert_eq!(PageSize::parse(Some("lots"), default), size(20));
        assert_eq!(PageSize::parse(None, default), size(20));
    }

    #[test]
    fn test_try_map_keeps_metadata() {
        let result = paginate(vec![1, 2, 3], size(2), page(2));
        let mapped: Page<String> = result
            .try_map(|n| Ok::<_, std::convert::Infallible>(n.to_string()))
            .unwrap();
        assert_eq!(mapped.items, vec!["3".to_string()]);
        assert_eq!(mapped.number, 2);
        assert_eq!(mapped.total_pages, 2);
    }

    #[test]
    fn test_page_size_display() {
        assert_eq!(PageSize::All.to_string(), "all");
        assert_eq!(size(10).to_string(), "10");
    }
}
