use serde::Serialize;
use std::num::{IntErrorKind, NonZeroU64};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct Paginator {
    per_page: NonZeroU64,
}

/// A `page` query value, before it is checked against the result set.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum PageRequest {
    Number(NonZeroU64),
    /// Below 1 or too large to represent.
    Last,
}

/// Resolved position of a page inside a result set of `count` items.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PageWindow {
    pub number: u64,
    pub num_pages: u64,
    pub count: u64,
    pub offset: u64,
    pub limit: u64,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub count: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl PageRequest {
    /// Missing or non-integer values ask for the first page.
    #[must_use]
    pub fn parse(requested: Option<&str>) -> Self {
        let Some(raw) = requested else {
            return Self::Number(NonZeroU64::MIN);
        };

        match raw.trim().parse::<i64>() {
            Ok(number) => u64::try_from(number)
                .ok()
                .and_then(NonZeroU64::new)
                .map_or(Self::Last, Self::Number),
            Err(err) if matches!(
                err.kind(),
                IntErrorKind::PosOverflow | IntErrorKind::NegOverflow
            ) =>
            {
                Self::Last
            }
            Err(_) => Self::Number(NonZeroU64::MIN),
        }
    }
}

impl Paginator {
    #[must_use]
    pub const fn new(per_page: NonZeroU64) -> Self {
        Self { per_page }
    }

    #[must_use]
    pub const fn per_page(self) -> u64 {
        self.per_page.get()
    }

    #[must_use]
    pub fn num_pages(self, count: u64) -> u64 {
        count.div_ceil(self.per_page()).max(1)
    }

    /// Resolves the raw `page` query value against a result set of `count` items.
    ///
    /// Numbers outside `1..=num_pages` select the last page. An empty result set
    /// still has one (empty) page.
    #[must_use]
    pub fn window(self, requested: Option<&str>, count: u64) -> PageWindow {
        let num_pages = self.num_pages(count);
        let number = match PageRequest::parse(requested) {
            PageRequest::Number(number) if number.get() <= num_pages => number.get(),
            _ => num_pages,
        };

        let offset = (number - 1) * self.per_page();
        PageWindow {
            number,
            num_pages,
            count,
            offset,
            limit: self.per_page().min(count.saturating_sub(offset)),
        }
    }
}

impl PageWindow {
    #[must_use]
    pub fn into_page<T>(self, items: Vec<T>) -> Page<T> {
        Page {
            items,
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
            has_next: self.number < self.num_pages,
            has_previous: self.number > 1,
        }
    }
}

impl<T> Page<T> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use crate::pagination::{PageRequest, PageWindow, Paginator};
    use std::num::NonZeroU64;

    fn paginator(per_page: u64) -> Paginator {
        Paginator::new(NonZeroU64::new(per_page).unwrap())
    }

    #[test]
    fn page_sizes() {
        let paginator = paginator(10);

        assert_eq!(paginator.window(None, 15).limit, 10);
        assert_eq!(paginator.window(Some("2"), 15).limit, 5);
        assert_eq!(paginator.window(Some("2"), 20).limit, 10);
        assert_eq!(paginator.window(None, 3).limit, 3);
    }

    #[test]
    fn empty_result_set_has_one_empty_page() {
        let window = paginator(10).window(Some("3"), 0);

        assert_eq!(
            window,
            PageWindow {
                number: 1,
                num_pages: 1,
                count: 0,
                offset: 0,
                limit: 0,
            }
        );
        let page = window.into_page(Vec::<()>::new());
        assert!(page.is_empty());
        assert!(!page.has_next);
        assert!(!page.has_previous);
    }

    #[test]
    fn out_of_range_selects_last_page() {
        let paginator = paginator(10);

        for requested in ["3", "100", "0", "-1"] {
            let window = paginator.window(Some(requested), 15);
            assert_eq!(window.number, 2, "requested {requested}");
            assert_eq!(window.offset, 10);
            assert_eq!(window.limit, 5);
        }
    }

    #[test]
    fn overflowing_numbers_select_last_page() {
        let paginator = paginator(10);

        for requested in ["99999999999999999999", "-99999999999999999999"] {
            assert_eq!(PageRequest::parse(Some(requested)), PageRequest::Last);
            assert_eq!(paginator.window(Some(requested), 15).number, 2);
        }
    }

    #[test]
    fn page_requests() {
        let number = |n| PageRequest::Number(NonZeroU64::new(n).unwrap());

        assert_eq!(PageRequest::parse(None), number(1));
        assert_eq!(PageRequest::parse(Some("junk")), number(1));
        assert_eq!(PageRequest::parse(Some(" 7 ")), number(7));
        assert_eq!(PageRequest::parse(Some("0")), PageRequest::Last);
    }

    #[test]
    fn unparsable_selects_first_page() {
        let paginator = paginator(10);

        for requested in ["", "two", "1.5"] {
            let window = paginator.window(Some(requested), 15);
            assert_eq!(window.number, 1, "requested {requested:?}");
        }
    }

    #[test]
    fn navigation_flags() {
        let paginator = paginator(5);

        let first = paginator.window(Some("1"), 12).into_page(vec![(); 5]);
        assert!(first.has_next);
        assert!(!first.has_previous);

        let last = paginator.window(Some("3"), 12).into_page(vec![(); 2]);
        assert!(!last.has_next);
        assert!(last.has_previous);
        assert_eq!(last.num_pages, 3);
    }
}
