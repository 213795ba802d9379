//! Listing View
//! 一覧画面ごとの状態（絞り込み・並び替え・ページ・読み込み状態）
//!
//! データ源は [`ItemSource`] で差し替える。静的カタログは手元でパイプラインを
//! 実行し、API はサーバー側で絞り込み・ページ分割した結果を返す。
//!
//! 取得は [`FetchTicket`] の世代番号で管理し、最新でない応答は捨てる
//! （並び替えを素早く切り替えたときに古い応答で上書きされない）。

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::catalog::{
    available_brands, run_pipeline, CatalogItem, CatalogVariant, Currency, FilterState,
    PageChange, PageState, SortKey, StaticCategory,
};
use crate::client::{ApiClient, Fetched, ListingQuery};
use crate::error::{CatalogError, StoreError};
use crate::models::Pagination;

// ========================================
// Item Sources
// ========================================

/// 一覧データの取得元
#[async_trait]
pub trait ItemSource: Send + Sync {
    /// 条件に合う1ページ分を取得
    async fn fetch(&self, query: &ListingQuery) -> Result<Fetched, StoreError>;

    /// ログ用の名前
    fn name(&self) -> &str {
        "ItemSource"
    }
}

/// 静的カタログ（デモ・オフライン用）
#[derive(Debug, Clone, Copy)]
pub struct StaticSource {
    category: StaticCategory,
}

impl StaticSource {
    pub fn new(category: StaticCategory) -> Self {
        Self { category }
    }

    pub fn category(&self) -> StaticCategory {
        self.category
    }
}

#[async_trait]
impl ItemSource for StaticSource {
    async fn fetch(&self, query: &ListingQuery) -> Result<Fetched, StoreError> {
        let items: Vec<CatalogItem> = self
            .category
            .items()
            .iter()
            .map(|item| query.currency.convert_item(item))
            .collect();

        let page = run_pipeline(
            &items,
            &query.filters,
            query.sort,
            &query.page,
            CatalogVariant::Static,
        );
        let pagination = Pagination::from(&page);
        Ok(Fetched {
            items: page.items,
            pagination,
        })
    }

    fn name(&self) -> &str {
        self.category.slug()
    }
}

/// バックエンドAPIのカテゴリ別一覧
#[derive(Debug, Clone)]
pub struct RemoteSource {
    client: ApiClient,
    slug: String,
}

impl RemoteSource {
    pub fn new(client: ApiClient, slug: impl Into<String>) -> Self {
        Self {
            client,
            slug: slug.into(),
        }
    }
}

#[async_trait]
impl ItemSource for RemoteSource {
    async fn fetch(&self, query: &ListingQuery) -> Result<Fetched, StoreError> {
        self.client.category_products(&self.slug, query).await
    }

    fn name(&self) -> &str {
        &self.slug
    }
}

// ========================================
// View State
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Idle,
    Loading,
    Ready,
    Failed,
}

/// 発行済みの取得リクエスト
#[derive(Debug, Clone)]
pub struct FetchTicket {
    generation: u64,
    query: ListingQuery,
}

impl FetchTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn query(&self) -> &ListingQuery {
        &self.query
    }
}

/// 一覧画面1つ分の状態
///
/// `data` が `None` なら未取得、`Some` で `items` が空なら「該当なし」。
pub struct ListingView<S> {
    source: S,
    data: Option<Fetched>,
    filters: FilterState,
    sort: SortKey,
    page: PageState,
    currency: Currency,
    status: LoadStatus,
    error: Option<String>,
    generation: u64,
    last_query: Option<ListingQuery>,
}

impl<S: ItemSource> ListingView<S> {
    pub fn new(source: S, items_per_page: usize) -> Self {
        Self {
            source,
            data: None,
            filters: FilterState::new(),
            sort: SortKey::default(),
            page: PageState::new(items_per_page),
            currency: Currency::default(),
            status: LoadStatus::Idle,
            error: None,
            generation: 0,
            last_query: None,
        }
    }

    // ----- Accessors -----

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn data(&self) -> Option<&Fetched> {
        self.data.as_ref()
    }

    /// 表示中の商品（未取得なら空）
    pub fn items(&self) -> &[CatalogItem] {
        self.data.as_ref().map(|d| d.items.as_slice()).unwrap_or(&[])
    }

    pub fn pagination(&self) -> Option<Pagination> {
        self.data.as_ref().map(|d| d.pagination)
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn sort(&self) -> SortKey {
        self.sort
    }

    pub fn page_state(&self) -> PageState {
        self.page
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn status(&self) -> LoadStatus {
        self.status
    }

    pub fn is_loading(&self) -> bool {
        self.status == LoadStatus::Loading
    }

    /// 直近の取得エラー（再試行ボタンと一緒に表示する）
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// 表示中の商品のブランド（絞り込み候補）
    pub fn available_brands(&self) -> Vec<String> {
        available_brands(self.items())
    }

    /// 現在の条件
    pub fn query(&self) -> ListingQuery {
        ListingQuery {
            filters: self.filters.clone(),
            sort: self.sort,
            page: self.page,
            currency: self.currency,
        }
    }

    // ----- Filter / Sort / Page -----
    // 条件を変えたら 1 ページ目に戻る。再取得は呼び出し側で refresh する。

    pub fn set_filters(&mut self, filters: FilterState) {
        self.filters = filters;
        self.page.reset();
    }

    pub fn set_price_range(&mut self, min: f64, max: f64) -> Result<(), CatalogError> {
        self.filters.set_price_range(min, max)?;
        self.page.reset();
        Ok(())
    }

    pub fn set_min_rating(&mut self, rating: f64) -> Result<(), CatalogError> {
        self.filters.set_min_rating(rating)?;
        self.page.reset();
        Ok(())
    }

    pub fn toggle_brand(&mut self, brand: &str) -> bool {
        let selected = self.filters.toggle_brand(brand);
        self.page.reset();
        selected
    }

    pub fn clear_filters(&mut self) {
        self.filters.reset();
        self.page.reset();
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        if self.sort != sort {
            self.sort = sort;
            self.page.reset();
        }
    }

    pub fn set_currency(&mut self, currency: Currency) {
        if self.currency != currency {
            self.currency = currency;
            self.page.reset();
        }
    }

    /// ページ移動（範囲外は丸める）
    pub fn go_to_page(&mut self, page: usize) -> PageChange {
        let total = self.total_items();
        self.page.go_to(page, total)
    }

    pub fn next_page(&mut self) -> PageChange {
        let total = self.total_items();
        self.page.next(total)
    }

    pub fn prev_page(&mut self) -> PageChange {
        let total = self.total_items();
        self.page.prev(total)
    }

    fn total_items(&self) -> usize {
        self.pagination().map_or(0, |p| p.total)
    }

    // ----- Fetching -----

    /// 現在の条件で取得を開始する
    ///
    /// 以前に発行したチケットはこの時点で古くなる。
    pub fn begin_fetch(&mut self) -> FetchTicket {
        let query = self.query();
        self.issue(query)
    }

    fn issue(&mut self, query: ListingQuery) -> FetchTicket {
        self.generation += 1;
        self.status = LoadStatus::Loading;
        self.last_query = Some(query.clone());
        debug!(
            "Fetch issued: source={}, generation={}",
            self.source.name(),
            self.generation
        );
        FetchTicket {
            generation: self.generation,
            query,
        }
    }

    /// 取得結果を反映する
    ///
    /// 最新のチケットでなければ何もせず `false`。
    /// 成功時は条件をチケットの条件に合わせる（表示中のデータと条件が常に一致する）。
    /// ページ幅はサーバーが丸めた `limit` に従う。
    /// 失敗しても前回のデータは残す。
    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<Fetched, StoreError>,
    ) -> bool {
        if ticket.generation != self.generation {
            debug!(
                "Discarding stale response: source={}, generation={} (latest {})",
                self.source.name(),
                ticket.generation,
                self.generation
            );
            return false;
        }

        match result {
            Ok(fetched) => {
                let query = ticket.query;
                self.filters = query.filters;
                self.sort = query.sort;
                self.currency = query.currency;
                // サーバー側で丸められたページとページ幅に合わせる
                self.page = PageState::new(fetched.pagination.limit.max(1))
                    .with_page(fetched.pagination.page);
                info!(
                    "Listing loaded: source={}, page={}/{}, total={}",
                    self.source.name(),
                    fetched.pagination.page,
                    fetched.pagination.total_pages,
                    fetched.pagination.total
                );
                self.data = Some(fetched);
                self.status = LoadStatus::Ready;
                self.error = None;
            }
            Err(e) => {
                warn!("Listing fetch failed: source={}, error={}", self.source.name(), e);
                self.status = LoadStatus::Failed;
                self.error = Some(e.to_string());
            }
        }
        true
    }

    /// 現在の条件で取得して反映する
    pub async fn refresh(&mut self) -> LoadStatus {
        let ticket = self.begin_fetch();
        self.run(ticket).await
    }

    /// 直前のリクエストをもう一度送る（未取得なら現在の条件で取得）
    ///
    /// 成功すると条件も直前のリクエストのものに戻る。
    pub async fn retry(&mut self) -> LoadStatus {
        let query = self.last_query.clone().unwrap_or_else(|| self.query());
        let ticket = self.issue(query);
        self.run(ticket).await
    }

    async fn run(&mut self, ticket: FetchTicket) -> LoadStatus {
        let result = self.source.fetch(ticket.query()).await;
        self.complete_fetch(ticket, result);
        self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_support::item;
    use crate::catalog::{paginate, DEFAULT_ITEMS_PER_PAGE};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// 用意した結果を順に返すデータ源（受け取った並び順を記録する）
    struct ScriptedSource {
        responses: Mutex<VecDeque<Result<Fetched, StoreError>>>,
        seen_sorts: Mutex<Vec<SortKey>>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<Fetched, StoreError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                seen_sorts: Mutex::new(Vec::new()),
            }
        }

        fn seen_sorts(&self) -> Vec<SortKey> {
            self.seen_sorts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ItemSource for ScriptedSource {
        async fn fetch(&self, query: &ListingQuery) -> Result<Fetched, StoreError> {
            self.seen_sorts.lock().unwrap().push(query.sort);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(StoreError::Decode("script exhausted".into())))
        }
    }

    fn fetched(count: usize) -> Fetched {
        let items: Vec<CatalogItem> = (0..count)
            .map(|n| item(&format!("p{n}"), 10.0 + n as f64, 4.0))
            .collect();
        let page = paginate(&items, &PageState::default());
        Fetched {
            pagination: Pagination::from(&page),
            items: page.items,
        }
    }

    fn server_down() -> StoreError {
        StoreError::Api {
            status: 503,
            message: "Service Unavailable".into(),
        }
    }

    #[tokio::test]
    async fn starts_unloaded() {
        let view = ListingView::new(ScriptedSource::new(vec![]), DEFAULT_ITEMS_PER_PAGE);
        assert_eq!(view.status(), LoadStatus::Idle);
        assert!(view.data().is_none());
        assert!(view.items().is_empty());
    }

    #[tokio::test]
    async fn failure_after_success_keeps_items() {
        let source = ScriptedSource::new(vec![Ok(fetched(12)), Err(server_down()), Ok(fetched(3))]);
        let mut view = ListingView::new(source, DEFAULT_ITEMS_PER_PAGE);

        assert_eq!(view.refresh().await, LoadStatus::Ready);
        assert_eq!(view.items().len(), 12);

        assert_eq!(view.refresh().await, LoadStatus::Failed);
        assert_eq!(view.items().len(), 12);
        assert!(view.error().unwrap().contains("Service Unavailable"));

        assert_eq!(view.retry().await, LoadStatus::Ready);
        assert_eq!(view.items().len(), 3);
        assert!(view.error().is_none());
    }

    #[tokio::test]
    async fn retry_brings_back_the_conditions_it_resends() {
        let source = ScriptedSource::new(vec![Err(server_down()), Ok(fetched(3))]);
        let mut view = ListingView::new(source, DEFAULT_ITEMS_PER_PAGE);

        view.set_sort(SortKey::PriceLow);
        assert_eq!(view.refresh().await, LoadStatus::Failed);

        // 失敗後に条件を変えてから再試行
        view.set_sort(SortKey::Rating);
        assert_eq!(view.retry().await, LoadStatus::Ready);

        let sent = view.source().seen_sorts();
        assert_eq!(sent, vec![SortKey::PriceLow, SortKey::PriceLow]);
        assert_eq!(Some(&view.sort()), sent.last());
        assert_eq!(view.query().sort, SortKey::PriceLow);
    }

    #[test]
    fn page_size_follows_server_limit() {
        let mut view = ListingView::new(ScriptedSource::new(vec![]), 200);
        let ticket = view.begin_fetch();
        let capped = Fetched {
            items: Vec::new(),
            pagination: Pagination {
                page: 1,
                limit: 100,
                total: 149,
                total_pages: 2,
            },
        };
        assert!(view.complete_fetch(ticket, Ok(capped)));
        assert_eq!(view.page_state().items_per_page(), 100);

        let change = view.go_to_page(2);
        assert_eq!(change.page, 2);
        assert!(change.scroll_to_top);
        assert_eq!(view.query().page.current_page(), 2);
    }

    #[tokio::test]
    async fn empty_result_is_distinct_from_unloaded() {
        let mut view = ListingView::new(ScriptedSource::new(vec![Ok(fetched(0))]), 12);
        view.refresh().await;
        assert!(view.data().is_some());
        assert!(view.items().is_empty());
        assert_eq!(view.pagination().unwrap().total_pages, 0);
    }

    #[test]
    fn stale_responses_are_discarded() {
        let mut view = ListingView::new(ScriptedSource::new(vec![]), 12);

        view.set_sort(SortKey::PriceLow);
        let slow = view.begin_fetch();
        view.set_sort(SortKey::PriceHigh);
        let fast = view.begin_fetch();
        assert!(fast.generation() > slow.generation());

        assert!(view.complete_fetch(fast, Ok(fetched(2))));
        assert!(!view.complete_fetch(slow, Ok(fetched(12))));

        assert_eq!(view.items().len(), 2);
        assert_eq!(view.status(), LoadStatus::Ready);
    }

    #[test]
    fn stale_failure_does_not_mark_view_failed() {
        let mut view = ListingView::new(ScriptedSource::new(vec![]), 12);
        let old = view.begin_fetch();
        let latest = view.begin_fetch();
        assert!(!view.complete_fetch(old, Err(server_down())));
        assert_eq!(view.status(), LoadStatus::Loading);
        assert!(view.complete_fetch(latest, Ok(fetched(1))));
        assert!(view.error().is_none());
    }

    #[tokio::test]
    async fn changing_sort_or_filters_resets_page() {
        let mut view = ListingView::new(StaticSource::new(StaticCategory::Electronics), 4);
        view.refresh().await;
        assert_eq!(view.go_to_page(3).page, 3);

        view.set_sort(SortKey::Rating);
        assert_eq!(view.page_state().current_page(), 1);

        view.go_to_page(2);
        view.toggle_brand("Apple");
        assert_eq!(view.page_state().current_page(), 1);

        view.go_to_page(2);
        assert!(view.set_price_range(100.0, 10.0).is_err());
        assert_eq!(view.page_state().current_page(), 2);
    }

    #[tokio::test]
    async fn static_source_runs_pipeline_locally() {
        let mut view = ListingView::new(StaticSource::new(StaticCategory::Electronics), 12);
        view.set_filters(FilterState::new().with_brands(["Apple"]));
        view.refresh().await;

        assert_eq!(view.items().len(), 3);
        assert!(view.items().iter().all(|i| i.brand.as_deref() == Some("Apple")));
        assert_eq!(view.available_brands(), vec!["Apple".to_string()]);
    }

    #[tokio::test]
    async fn page_navigation_is_clamped_and_signals_scroll() {
        let mut view = ListingView::new(StaticSource::new(StaticCategory::Electronics), 12);
        view.refresh().await;
        let total_pages = view.pagination().unwrap().total_pages;

        let change = view.go_to_page(99);
        assert_eq!(change.page, total_pages);
        assert!(change.scroll_to_top);

        let again = view.go_to_page(total_pages);
        assert!(!again.scroll_to_top);
    }

    #[tokio::test]
    async fn currency_converts_static_prices() {
        let mut usd = ListingView::new(StaticSource::new(StaticCategory::Books), 12);
        usd.set_sort(SortKey::PriceLow);
        usd.refresh().await;

        let mut inr = ListingView::new(StaticSource::new(StaticCategory::Books), 12);
        inr.set_sort(SortKey::PriceLow);
        inr.set_currency(Currency::Inr);
        inr.refresh().await;

        let cheapest_usd = usd.items()[0].price;
        let cheapest_inr = inr.items()[0].price;
        assert_eq!(cheapest_inr, Currency::Inr.convert(cheapest_usd));
    }
}
