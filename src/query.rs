//! The `ListPage` request/response shapes a transport binding exposes.

use crate::cursor::{parse_anchor, Cursor};
use crate::engine::{AnchorMode, CancelToken, Page, PageEngine};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListPageRequest {
    pub collection: Option<String>,
    pub count: Option<usize>,
    /// Epoch seconds or ISO-8601; normally a cursor from an earlier response.
    pub anchor: Option<String>,
    pub anchor_mode: Option<AnchorMode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventView {
    pub time: Cursor,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListPageResponse {
    pub events: Vec<EventView>,
    pub prev: Option<Cursor>,
    pub next: Option<Cursor>,
}

impl From<Page> for ListPageResponse {
    fn from(page: Page) -> Self {
        Self {
            events: page
                .events
                .iter()
                .map(|event| EventView {
                    time: event.representative_time().into(),
                    files: event.file_names(),
                })
                .collect(),
            prev: page.prev_cursor.map(Cursor),
            next: page.next_cursor.map(Cursor),
        }
    }
}

impl PageEngine {
    /// Validate and default a raw request, then page.
    pub fn list_page(&self, request: &ListPageRequest) -> Result<ListPageResponse> {
        self.list_page_with_cancel(request, &CancelToken::new())
    }

    pub fn list_page_with_cancel(
        &self,
        request: &ListPageRequest,
        cancel: &CancelToken,
    ) -> Result<ListPageResponse> {
        let collection = request
            .collection
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| Error::UnknownCollection(String::new()))?;
        let anchor = request.anchor.as_deref().map(parse_anchor).transpose()?;
        let mode = request.anchor_mode.unwrap_or_default();

        self.page_with_cancel(collection, request.count.unwrap_or(1), anchor, mode, cancel)
            .map(ListPageResponse::from)
    }
}
