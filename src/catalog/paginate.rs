//! Pagination stage

use serde::Serialize;

/// 1ページあたりの既定件数
pub const DEFAULT_ITEMS_PER_PAGE: usize = 12;

/// 現在ページと1ページあたり件数
///
/// `1 <= current_page <= max(1, total_pages)` は `clamp` / `go_to` で維持する。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageState {
    current_page: usize,
    items_per_page: usize,
}

impl Default for PageState {
    fn default() -> Self {
        Self::new(DEFAULT_ITEMS_PER_PAGE)
    }
}

/// ページ移動の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageChange {
    pub page: usize,
    /// ページが実際に変わった場合、表示を先頭へスクロールする
    pub scroll_to_top: bool,
}

impl PageState {
    pub fn new(items_per_page: usize) -> Self {
        Self {
            current_page: 1,
            items_per_page: items_per_page.max(1),
        }
    }

    /// 総件数が未確定の時点で要求ページを保持する（`paginate` で丸められる）
    pub fn with_page(mut self, page: usize) -> Self {
        self.current_page = page.max(1);
        self
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn items_per_page(&self) -> usize {
        self.items_per_page
    }

    pub fn total_pages(&self, total_items: usize) -> usize {
        total_items.div_ceil(self.items_per_page)
    }

    /// 先頭アイテムの位置
    pub fn offset(&self) -> usize {
        (self.current_page - 1) * self.items_per_page
    }

    /// 範囲外の現在ページを丸める。変わった場合 true
    pub fn clamp(&mut self, total_items: usize) -> bool {
        let last = self.total_pages(total_items).max(1);
        let clamped = self.current_page.clamp(1, last);
        let changed = clamped != self.current_page;
        self.current_page = clamped;
        changed
    }

    /// 指定ページへ移動（範囲外は丸める。エラーにはしない）
    pub fn go_to(&mut self, page: usize, total_items: usize) -> PageChange {
        let last = self.total_pages(total_items).max(1);
        let target = page.clamp(1, last);
        let scroll_to_top = target != self.current_page;
        self.current_page = target;
        PageChange {
            page: target,
            scroll_to_top,
        }
    }

    pub fn next(&mut self, total_items: usize) -> PageChange {
        self.go_to(self.current_page + 1, total_items)
    }

    pub fn prev(&mut self, total_items: usize) -> PageChange {
        self.go_to(self.current_page.saturating_sub(1), total_items)
    }

    /// 絞り込み・並び替えの変更時に呼ぶ
    pub fn reset(&mut self) {
        self.current_page = 1;
    }

    pub fn set_items_per_page(&mut self, items_per_page: usize, total_items: usize) {
        self.items_per_page = items_per_page.max(1);
        self.clamp(total_items);
    }
}

/// 1ページ分の結果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub items_per_page: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// `[(page-1)*n, page*n)` を切り出す
///
/// `state` の現在ページが範囲外なら丸めたページを返す。
pub fn paginate<T: Clone>(items: &[T], state: &PageState) -> Page<T> {
    let mut state = *state;
    state.clamp(items.len());

    let start = state.offset().min(items.len());
    let end = (start + state.items_per_page).min(items.len());

    Page {
        items: items[start..end].to_vec(),
        page: state.current_page,
        items_per_page: state.items_per_page,
        total_items: items.len(),
        total_pages: state.total_pages(items.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_page_may_be_shorter() {
        let items: Vec<u32> = (0..30).collect();
        let mut state = PageState::default();
        state.go_to(3, items.len());

        let page = paginate(&items, &state);
        assert_eq!(page.items, (24..30u32).collect::<Vec<_>>());
        assert_eq!(page.total_pages, 3);
        assert!(page.has_prev());
        assert!(!page.has_next());
    }

    #[test]
    fn out_of_range_navigation_is_clamped() {
        let mut state = PageState::new(10);
        let change = state.go_to(99, 25);
        assert_eq!(change, PageChange { page: 3, scroll_to_top: true });

        let change = state.go_to(0, 25);
        assert_eq!(change.page, 1);

        // 同じページへの移動ではスクロールしない
        let change = state.go_to(1, 25);
        assert!(!change.scroll_to_top);
    }

    #[test]
    fn clamp_to_one_when_empty() {
        let mut state = PageState::new(12);
        state.go_to(4, 48);
        assert!(state.clamp(0));
        assert_eq!(state.current_page(), 1);
        assert_eq!(state.total_pages(0), 0);
    }

    #[test]
    fn shrinking_page_size_change_clamps_current_page() {
        let mut state = PageState::new(5);
        state.go_to(6, 30);
        state.set_items_per_page(15, 30);
        assert_eq!(state.current_page(), 2);
    }

    #[test]
    fn next_and_prev_stop_at_bounds() {
        let mut state = PageState::new(12);
        assert!(!state.prev(36).scroll_to_top);
        state.next(36);
        state.next(36);
        assert_eq!(state.current_page(), 3);
        assert!(!state.next(36).scroll_to_top);
    }

    #[test]
    fn paginate_with_stale_page_returns_last_page() {
        let items: Vec<u32> = (0..5).collect();
        let mut state = PageState::new(2);
        state.go_to(3, 100);
        let page = paginate(&items[..3], &state);
        assert_eq!(page.page, 2);
        assert_eq!(page.items, vec![2]);
    }
}
